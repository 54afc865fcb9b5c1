use nalgebra::{DMatrix, DVector};
use sprs::CsMat;
use std::time::Instant;

use super::direct::to_dense;
use super::solver::{LinearOperator, Solver, SolverStats, SolverUtils};
use crate::config::SolverSettings;
use crate::error::{MeshError, MeshResult};

/// Dense least squares on A itself
///
/// Householder QR for full-rank tall systems; rank-deficient or wide systems
/// fall back to a minimum-norm SVD solve.
pub struct DenseLeastSquares {
    name: String,
}

impl DenseLeastSquares {
    pub fn new() -> Self {
        Self {
            name: "Dense least squares".to_string(),
        }
    }
}

impl Default for DenseLeastSquares {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for DenseLeastSquares {
    #[allow(non_snake_case)]
    fn solve(&mut self, A: &CsMat<f64>, b: &[f64]) -> MeshResult<(Vec<f64>, SolverStats)> {
        let start = Instant::now();
        if A.rows() != b.len() {
            return Err(MeshError::solver(format!("{} rows but {} right-hand sides", A.rows(), b.len())));
        }
        let dense = to_dense(A);
        let rhs = DVector::from_column_slice(b);

        let x_vec = match qr_solve(&dense, &rhs) {
            Some(x) => x,
            None => {
                log::debug!("least-squares matrix is rank deficient, using SVD");
                dense
                    .svd(true, true)
                    .solve(&rhs, 1e-12)
                    .map_err(|e| MeshError::solver(format!("SVD solve failed: {}", e)))?
            }
        };
        let x: Vec<f64> = x_vec.iter().copied().collect();
        if x.iter().any(|v| !v.is_finite()) {
            return Err(MeshError::solver("least squares produced non-finite values"));
        }
        let stats = SolverUtils::stats(A, &x, b, 0, start.elapsed().as_secs_f64());
        Ok((x, stats))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Solve min |a x - b| through R x = Q^T b, if R is safely invertible
fn qr_solve(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if a.nrows() < a.ncols() || a.ncols() == 0 {
        return None;
    }
    let (q, r) = a.clone().qr().unpack();
    let diag = r.diagonal().map(f64::abs);
    if diag.min() <= 1e-12 * diag.max() {
        return None;
    }
    r.solve_upper_triangular(&q.tr_mul(b))
}

/// LSQR (Paige and Saunders) for large sparse least-squares problems
pub struct Lsqr {
    max_iterations: usize,
    tolerance: f64,
    name: String,
}

impl Lsqr {
    pub fn new() -> Self {
        Self {
            max_iterations: 20_000,
            tolerance: 1e-12,
            name: "LSQR".to_string(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn solve_with_operator<O: LinearOperator>(&self, a: &O, b: &[f64]) -> (Vec<f64>, SolverStats) {
        let start = Instant::now();
        let n = a.cols();
        let mut x = vec![0.0; n];

        let mut u = b.to_vec();
        let mut beta = SolverUtils::norm(&u);
        let b_norm = beta;
        if b_norm == 0.0 {
            return (x, SolverStats {
                converged: true,
                solve_time: start.elapsed().as_secs_f64(),
                ..SolverStats::new()
            });
        }
        u.iter_mut().for_each(|ui| *ui /= beta);
        let mut v = a.apply_transpose(&u);
        let mut alpha = SolverUtils::norm(&v);
        if alpha > 0.0 {
            v.iter_mut().for_each(|vi| *vi /= alpha);
        }
        let mut w = v.clone();
        let mut phibar = beta;
        let mut rhobar = alpha;
        let mut anorm2 = 0.0;

        let mut iteration = 0;
        let mut converged = alpha == 0.0;
        while !converged && iteration < self.max_iterations {
            iteration += 1;

            let av = a.apply(&v);
            for (ui, avi) in u.iter_mut().zip(&av) {
                *ui = avi - alpha * *ui;
            }
            beta = SolverUtils::norm(&u);
            if beta > 0.0 {
                u.iter_mut().for_each(|ui| *ui /= beta);
            }
            anorm2 += alpha * alpha + beta * beta;

            let atu = a.apply_transpose(&u);
            for (vi, atui) in v.iter_mut().zip(&atu) {
                *vi = atui - beta * *vi;
            }
            alpha = SolverUtils::norm(&v);
            if alpha > 0.0 {
                v.iter_mut().for_each(|vi| *vi /= alpha);
            }

            let rho = rhobar.hypot(beta);
            if rho == 0.0 {
                break;
            }
            let c = rhobar / rho;
            let s = beta / rho;
            let theta = s * alpha;
            rhobar = -c * alpha;
            let phi = c * phibar;
            phibar *= s;

            let t1 = phi / rho;
            let t2 = -theta / rho;
            for k in 0..n {
                x[k] += t1 * w[k];
                w[k] = v[k] + t2 * w[k];
            }

            // ||r|| = phibar, ||A^T r|| = phibar * alpha * |c|
            let arnorm = phibar * alpha * c.abs();
            let anorm = anorm2.sqrt();
            if phibar <= self.tolerance * b_norm || arnorm <= self.tolerance * anorm * phibar {
                converged = true;
            }
        }

        let mut stats = SolverUtils::stats(a, &x, b, iteration, start.elapsed().as_secs_f64());
        stats.converged = converged;
        (x, stats)
    }
}

impl Default for Lsqr {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for Lsqr {
    #[allow(non_snake_case)]
    fn solve(&mut self, A: &CsMat<f64>, b: &[f64]) -> MeshResult<(Vec<f64>, SolverStats)> {
        if A.rows() != b.len() {
            return Err(MeshError::solver(format!("{} rows but {} right-hand sides", A.rows(), b.len())));
        }
        let (x, stats) = self.solve_with_operator(A, b);
        if x.iter().any(|v| !v.is_finite()) {
            return Err(MeshError::solver("LSQR produced non-finite values"));
        }
        if !stats.converged {
            log::warn!(
                "LSQR stopped after {} iterations, relative residual {:.3e}",
                stats.iterations,
                stats.relative_residual
            );
        }
        Ok((x, stats))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Least-squares solve, dense for small systems and LSQR beyond `dense_limit`
#[allow(non_snake_case)]
pub fn solve_least_squares(
    A: &CsMat<f64>,
    b: &[f64],
    settings: &SolverSettings,
) -> MeshResult<(Vec<f64>, SolverStats)> {
    let mut solver: Box<dyn Solver> = if A.cols() <= settings.dense_limit {
        Box::new(DenseLeastSquares::new())
    } else {
        Box::new(
            Lsqr::new()
                .with_max_iterations(settings.lsqr_max_iterations)
                .with_tolerance(settings.lsqr_tolerance),
        )
    };
    let (x, stats) = solver.solve(A, b)?;
    log::debug!(
        "{}: {}x{} system, residual {:.3e}, {:.3}s",
        solver.name(),
        A.rows(),
        A.cols(),
        stats.residual_norm,
        stats.solve_time
    );
    Ok((x, stats))
}
