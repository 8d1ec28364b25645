use isodist::connectivity::{Quad4d2Connectivity, Tri3d2Connectivity};
use isodist::element::{
    ElementConnectivity, ElementShape, FeOrder, FeType, FiniteElement, Quad4d2Element, ReferenceFiniteElement,
    Tri3d2Element,
};
use matrixcompare::{assert_scalar_eq, prop_assert_matrix_eq, prop_assert_scalar_eq};
use nalgebra::{DMatrix, Matrix1x3, Matrix1x4, Matrix2, Point2, Vector2};
use proptest::prelude::*;
use util::assert_approx_matrix_eq;

fn point_in_tri_ref_domain() -> impl Strategy<Value = Point2<f64>> {
    // Generate points x, y in [-1, 1]^2 such that
    // x + y <= 0
    (-1.0..=1.0)
        .prop_flat_map(|x: f64| (Just(x), -1.0..=-x))
        .prop_map(|(x, y)| Point2::new(x, y))
}

fn point_in_quad_ref_domain() -> impl Strategy<Value = Point2<f64>> {
    (-1.0..=1.0, -1.0..=1.0).prop_map(|(x, y)| Point2::new(x, y))
}

#[test]
fn tri3d2_lagrange_property() {
    // We expect that N_i(x_j) = delta_ij
    // where N_i is the ith basis function, j is the vertex associated with the ith node,
    // and delta_ij is the Kronecker delta.
    let element = Tri3d2Element::<f64>::reference();

    for (i, xi) in element.vertices().iter().enumerate() {
        let phi = element.evaluate_basis(xi);

        let mut expected = Matrix1x3::zeros();
        expected[i] = 1.0;

        assert_approx_matrix_eq!(phi, expected, abstol = 1e-12);
    }
}

#[test]
fn quad4d2_lagrange_property() {
    let element = Quad4d2Element::<f64>::reference();

    for (i, xi) in element.vertices().iter().enumerate() {
        let phi = element.evaluate_basis(xi);

        let mut expected = Matrix1x4::zeros();
        expected[i] = 1.0;

        assert_approx_matrix_eq!(phi, expected, abstol = 1e-12);
    }
}

#[test]
fn reference_elements_have_expected_areas() {
    assert_scalar_eq!(Tri3d2Element::<f64>::reference().signed_area(), 2.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(Quad4d2Element::<f64>::reference().signed_area(), 4.0, comp = abs, tol = 1e-14);

    // Clockwise ordering flips the sign
    let clockwise = Tri3d2Element::from_vertices([Point2::new(0.0, 0.0), Point2::new(0.0, 1.0), Point2::new(1.0, 0.0)]);
    assert_scalar_eq!(clockwise.signed_area(), -0.5, comp = abs, tol = 1e-14);
}

#[test]
fn tri3d2_affine_map_and_jacobian() {
    let element = Tri3d2Element::from_vertices([Point2::new(1.0, 0.0), Point2::new(3.0, 1.0), Point2::new(0.0, 2.0)]);

    for (xi, x) in Tri3d2Element::<f64>::reference()
        .vertices()
        .iter()
        .zip(element.vertices())
    {
        let mapped = element.map_reference_coords(xi);
        assert_approx_matrix_eq!(mapped.coords, x.coords, abstol = 1e-12);
    }

    // The Jacobian of the affine map is constant, with columns (x1 - x0) / 2 and (x2 - x0) / 2
    let expected = Matrix2::new(1.0, -0.5, 0.5, 1.0);
    let jacobian = element.reference_jacobian(&Point2::new(-0.3, 0.1));
    assert_approx_matrix_eq!(jacobian, expected, abstol = 1e-12);
    // det J = A / A_ref
    assert_scalar_eq!(jacobian.determinant(), element.signed_area() / 2.0, comp = abs, tol = 1e-12);
}

#[test]
fn quad4d2_diameter_is_longest_diagonal() {
    let element = Quad4d2Element::from_vertices([
        Point2::new(0.0, 0.0),
        Point2::new(2.0, 0.0),
        Point2::new(2.0, 1.0),
        Point2::new(0.0, 1.0),
    ]);
    assert_scalar_eq!(element.diameter(), 5.0f64.sqrt(), comp = abs, tol = 1e-14);
}

#[test]
fn connectivity_element_lookup() {
    let vertices = vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];

    let quad = Quad4d2Connectivity([0, 1, 2, 3]).element(&vertices).unwrap();
    assert_eq!(quad.vertices(), &[vertices[0], vertices[1], vertices[2], vertices[3]]);

    let tri = Tri3d2Connectivity([0, 2, 3]).element(&vertices).unwrap();
    assert_eq!(tri.vertices(), &[vertices[0], vertices[2], vertices[3]]);

    assert!(ElementConnectivity::<f64>::element(&Tri3d2Connectivity([0, 1, 4]), &vertices).is_none());
    assert_eq!(<Quad4d2Connectivity as ElementConnectivity<f64>>::SHAPE, ElementShape::Quad4);
    assert_eq!(<Tri3d2Connectivity as ElementConnectivity<f64>>::SHAPE, ElementShape::Tri3);
}

#[test]
fn only_first_order_lagrange_is_supported() {
    for shape in [ElementShape::Tri3, ElementShape::Quad4] {
        assert!(shape.supports(&FeType::lagrange(FeOrder::First)));
        assert!(!shape.supports(&FeType::lagrange(FeOrder::Second)));
    }
    assert_eq!(FeType::default().to_string(), "FIRST, LAGRANGE");
}

#[test]
fn populate_basis_matches_fixed_size_evaluation() {
    let element = Quad4d2Element::<f64>::reference();
    let xi = Point2::new(0.25, -0.5);

    let mut basis = vec![0.0; element.num_nodes()];
    element.populate_basis(&mut basis, &xi);
    assert_eq!(basis.as_slice(), element.evaluate_basis(&xi).as_slice());

    let mut gradients = DMatrix::zeros(2, element.num_nodes());
    element.populate_basis_gradients(gradients.as_view_mut(), &xi);
    assert_approx_matrix_eq!(&gradients, element.gradients(&xi), abstol = 1e-14);
}

proptest! {
    #[test]
    fn tri3d2_partition_of_unity(xi in point_in_tri_ref_domain()) {
        let element = Tri3d2Element::<f64>::reference();
        prop_assert_scalar_eq!(element.evaluate_basis(&xi).sum(), 1.0, comp = abs, tol = 1e-12);
        let gradient_sum = element.gradients(&xi).column_sum();
        prop_assert_matrix_eq!(gradient_sum, Vector2::<f64>::zeros(), comp = abs, tol = 1e-12);
    }

    #[test]
    fn quad4d2_partition_of_unity(xi in point_in_quad_ref_domain()) {
        let element = Quad4d2Element::<f64>::reference();
        prop_assert_scalar_eq!(element.evaluate_basis(&xi).sum(), 1.0, comp = abs, tol = 1e-12);
        let gradient_sum = element.gradients(&xi).column_sum();
        prop_assert_matrix_eq!(gradient_sum, Vector2::<f64>::zeros(), comp = abs, tol = 1e-12);
    }

    #[test]
    fn quad4d2_map_reproduces_linear_functions(xi in point_in_quad_ref_domain()) {
        // A parallelogram is an affine image of the reference square
        let element = Quad4d2Element::from_vertices([
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.5),
            Point2::new(3.0, 2.5),
            Point2::new(1.0, 2.0),
        ]);
        let x = element.map_reference_coords(&xi);
        let expected = Point2::new(1.5, 1.25) + element.reference_jacobian(&Point2::origin()) * xi.coords;
        prop_assert_matrix_eq!(x.coords, expected.coords, comp = abs, tol = 1e-12);
    }
}
