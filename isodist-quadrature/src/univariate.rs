//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::Rule;
use std::f64::consts::PI;

/// Maximum number of Newton iterations per root. Convergence is quadratic from the initial
/// guess, so this is never reached in practice for sensible point counts.
const MAX_NEWTON_ITERATIONS: usize = 100;

/// Legendre polynomial `P_n` and its predecessor `P_{n - 1}` evaluated at `x`.
///
/// The derivative formula is singular at `|x| == 1`, so it is only valid in the open interval
/// `(-1, 1)`, which is where the Gauss points live.
#[derive(Debug, Default, Clone, Copy)]
struct Legendre {
    n: usize,
    x: f64,
    p_n: f64,
    p_n_minus_1: f64,
}

impl Legendre {
    fn evaluate(n: usize, x: f64) -> Self {
        //  m P_m(x) = (2m - 1) x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p_n = 1.0;
        let mut p_n_minus_1 = 0.0;
        for m in 1..=n {
            let m = m as f64;
            let p_n_minus_2 = p_n_minus_1;
            p_n_minus_1 = p_n;
            p_n = ((2.0 * m - 1.0) * x * p_n_minus_1 - (m - 1.0) * p_n_minus_2) / m;
        }

        Self {
            n,
            x,
            p_n,
            p_n_minus_1,
        }
    }

    fn derivative(&self) -> f64 {
        let n = self.n as f64;
        let x = self.x;
        n * (x * self.p_n - self.p_n_minus_1) / (x * x - 1.0)
    }
}

/// Gauss–Legendre quadrature for the reference interval `[-1, 1]`.
///
/// Given `n` points, the rule integrates polynomials of degree up to `2 n - 1` exactly.
/// Points are returned in descending order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    // Roots are symmetric about the origin: only the non-negative half is computed by Newton's
    // method, the rest is mirrored.
    let m = (n + 1) / 2;
    let mut points = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    for i in 0..m {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut legendre = Legendre::evaluate(n, x);
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let dx = -legendre.p_n / legendre.derivative();
            x += dx;
            legendre = Legendre::evaluate(n, x);
            if dx.abs() <= 1e-15 {
                break;
            }
        }

        let dp = legendre.derivative();
        points.push([x]);
        weights.push(2.0 / ((1.0 - x * x) * dp * dp));
    }

    for i in m..n {
        let mirror_idx = n - i - 1;
        points.push([-points[mirror_idx][0]]);
        weights.push(weights[mirror_idx]);
    }

    debug_assert_eq!(points.len(), n);
    (weights, points)
}
