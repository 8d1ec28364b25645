//! Quadrilateral rules formed as tensor products of 1D Gauss rules.

use crate::univariate::gauss;
use crate::{gauss_points_for_strength, Rule};

/// A Gauss quadrature rule for the reference quadrilateral `[-1, 1]^2` with the provided
/// number of points per dimension.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule<2> {
    let (weights, points) = gauss(num_points_per_dim);
    let line: Vec<_> = weights.into_iter().zip(points).map(|(w, [x])| (w, x)).collect();

    // The second coordinate varies fastest
    line.iter()
        .flat_map(|&(wx, x)| line.iter().map(move |&(wy, y)| (wx * wy, [x, y])))
        .unzip()
}

/// The smallest tensor Gauss rule that integrates all polynomials of the given degree in each
/// variable exactly on the reference quadrilateral.
pub fn quadrilateral_gauss_with_strength(strength: usize) -> Rule<2> {
    quadrilateral_gauss(gauss_points_for_strength(strength))
}
