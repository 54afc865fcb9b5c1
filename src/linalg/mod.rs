pub mod solver;
pub mod direct;
pub mod lstsq;

pub use solver::{Solver, SolverStats, SolverUtils, LinearOperator};
pub use direct::DirectSolver;
pub use lstsq::{solve_least_squares, DenseLeastSquares, Lsqr};
