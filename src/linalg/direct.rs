use nalgebra::{DMatrix, DVector};
use sprs::CsMat;
use std::time::Instant;

use super::solver::{Solver, SolverStats, SolverUtils};
use crate::error::{MeshError, MeshResult};

/// Copy a sparse matrix into a dense nalgebra matrix
pub(crate) fn to_dense(a: &CsMat<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(a.rows(), a.cols());
    for (&val, (row, col)) in a.iter() {
        dense[(row, col)] += val;
    }
    dense
}

/// Direct solver for square systems using dense LU decomposition
///
/// Good for the small smoothing systems of a single generating cell.
pub struct DirectSolver {
    name: String,
}

impl DirectSolver {
    pub fn new() -> Self {
        Self {
            name: "Direct (Dense LU)".to_string(),
        }
    }
}

impl Default for DirectSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for DirectSolver {
    #[allow(non_snake_case)]
    fn solve(&mut self, A: &CsMat<f64>, b: &[f64]) -> MeshResult<(Vec<f64>, SolverStats)> {
        let start = Instant::now();
        let n = b.len();
        if A.rows() != n || A.cols() != n {
            return Err(MeshError::solver(format!(
                "{} needs a square system, got {}x{} with {} right-hand sides",
                self.name,
                A.rows(),
                A.cols(),
                n
            )));
        }

        let lu = to_dense(A).lu();
        let b_vec = DVector::from_column_slice(b);
        let x_vec = lu
            .solve(&b_vec)
            .ok_or_else(|| MeshError::solver("LU solve failed: matrix is singular"))?;
        let x: Vec<f64> = x_vec.iter().copied().collect();
        if x.iter().any(|v| !v.is_finite()) {
            return Err(MeshError::solver("LU solve produced non-finite values"));
        }

        let stats = SolverUtils::stats(A, &x, b, 0, start.elapsed().as_secs_f64());
        Ok((x, stats))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sprs::TriMat;

    #[test]
    fn test_direct_solver() {
        // [4 1; 1 3] x = [1; 2]
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 4.0);
        triplets.add_triplet(0, 1, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        triplets.add_triplet(1, 1, 3.0);
        let a = triplets.to_csr();

        let mut solver = DirectSolver::new();
        let (x, stats) = solver.solve(&a, &[1.0, 2.0]).unwrap();
        assert_relative_eq!(x[0], 1.0 / 11.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 7.0 / 11.0, epsilon = 1e-12);
        assert!(stats.converged);
        assert!(stats.relative_residual < 1e-12);
    }

    #[test]
    fn test_singular_is_an_error() {
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        let a = triplets.to_csr();
        let mut solver = DirectSolver::new();
        assert!(solver.solve(&a, &[1.0, 2.0]).is_err());
    }
}
