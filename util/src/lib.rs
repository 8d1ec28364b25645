//! Test helpers shared by the workspace crates.

/// Asserts that the largest absolute entry of `x - y` is at most `abstol`.
///
/// Both sides are printed on failure.
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let (x, y) = ($x, $y);
        let diff = x.clone() - y.clone();
        let max_abs_diff = diff.abs().max();
        assert!(
            max_abs_diff <= $tol,
            "matrices differ by {:e} (abstol {:e})\nleft: {}\nright: {}",
            max_abs_diff,
            $tol,
            x,
            y
        );
    }};
}

/// Asserts that every entry of `values` lies in `[min - tol, max + tol]`.
#[macro_export]
macro_rules! assert_all_within {
    ($values:expr, $min:expr, $max:expr, tol = $tol:expr) => {{
        for (i, &v) in $values.iter().enumerate() {
            assert!(
                v >= $min - $tol && v <= $max + $tol,
                "entry {} = {} is outside [{}, {}] (tol {:e})",
                i,
                v,
                $min,
                $max,
                $tol
            );
        }
    }};
}
