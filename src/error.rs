//! Functionality for error estimation.
use crate::assembly::buffers::ElementValues;
use crate::assembly::global::gather_global_to_local;
use crate::assembly::AssemblyError;
use crate::dof_map::DofMap;
use crate::element::ElementConnectivity;
use crate::mesh::Mesh;
use crate::nalgebra::{DVector, DVectorView, Point2, Vector2};
use crate::quadrature::Quadrature;
use crate::Real;

/// Estimate the squared $L^2$ error $\norm{u_h - u}^2_{L^2}$ on an element, given its basis
/// values and the local DOF values of $u_h$.
///
/// # Panics
///
/// Panics if `u_h_element` does not have one entry per node of the element.
#[allow(non_snake_case)]
pub fn estimate_element_L2_error_squared<T: Real>(
    values: &ElementValues<T>,
    u: impl Fn(&Point2<T>) -> T,
    u_h_element: DVectorView<T>,
) -> T {
    let n = values.num_nodes();
    assert_eq!(u_h_element.len(), n);

    let mut result = T::zero();
    for (q, (&jxw, x)) in values.jxw().iter().zip(values.xyz()).enumerate() {
        let u_h = (0..n).fold(T::zero(), |sum, i| sum + u_h_element[i] * values.phi(i, q));
        let error = u_h - u(x);
        result += jxw * error * error;
    }
    result
}

/// Estimate the squared $H^1$ *seminorm* error $\seminorm{u_h - u}^2_{H^1}$ on an element.
///
/// # Panics
///
/// Panics if `u_h_element` does not have one entry per node of the element.
#[allow(non_snake_case)]
pub fn estimate_element_H1_seminorm_error_squared<T: Real>(
    values: &ElementValues<T>,
    u_grad: impl Fn(&Point2<T>) -> Vector2<T>,
    u_h_element: DVectorView<T>,
) -> T {
    let n = values.num_nodes();
    assert_eq!(u_h_element.len(), n);

    let mut result = T::zero();
    for (q, (&jxw, x)) in values.jxw().iter().zip(values.xyz()).enumerate() {
        let u_h_grad = (0..n).fold(Vector2::zeros(), |sum, i| sum + values.dphi(i, q) * u_h_element[i]);
        let error = u_h_grad - u_grad(x);
        result += jxw * error.norm_squared();
    }
    result
}

/// Sums an element-wise error estimate over the active elements of the mesh.
fn accumulate_element_errors<'a, T, C>(
    mesh: &Mesh<T, C>,
    dof_map: &DofMap<T>,
    variable: usize,
    u_h: impl Into<DVectorView<'a, T>>,
    quadrature: &impl Quadrature<T>,
    mut element_error: impl FnMut(&ElementValues<T>, DVectorView<T>) -> T,
) -> eyre::Result<T>
where
    T: Real,
    C: ElementConnectivity<T>,
{
    let u_h = u_h.into();
    let mut values = ElementValues::default();
    let mut dofs = Vec::new();
    let mut u_element = DVector::zeros(0);

    let mut result = T::zero();
    for i in mesh.active_element_indices() {
        let element = mesh
            .get_element(i)
            .ok_or(AssemblyError::InvalidConnectivity { element: i })?;
        values.reinit(&element, quadrature, i)?;
        dof_map.variable_dof_indices(mesh.connectivity()[i].vertex_indices(), variable, &mut dofs);
        u_element.resize_vertically_mut(dofs.len(), T::zero());
        gather_global_to_local(u_h, &mut u_element, &dofs);

        result += element_error(&values, DVectorView::from(&u_element));
    }

    Ok(result)
}

/// Estimate the squared $L^2$ error $\norm{u_h - u}^2_{L^2}$ of one variable over the active
/// elements of the mesh.
#[allow(non_snake_case)]
pub fn estimate_L2_error_squared<'a, T, C>(
    mesh: &Mesh<T, C>,
    dof_map: &DofMap<T>,
    variable: usize,
    u: impl Fn(&Point2<T>) -> T,
    u_h: impl Into<DVectorView<'a, T>>,
    quadrature: &impl Quadrature<T>,
) -> eyre::Result<T>
where
    T: Real,
    C: ElementConnectivity<T>,
{
    accumulate_element_errors(mesh, dof_map, variable, u_h, quadrature, |values, u_h_element| {
        estimate_element_L2_error_squared(values, &u, u_h_element)
    })
}

#[allow(non_snake_case)]
pub fn estimate_L2_error<'a, T, C>(
    mesh: &Mesh<T, C>,
    dof_map: &DofMap<T>,
    variable: usize,
    u: impl Fn(&Point2<T>) -> T,
    u_h: impl Into<DVectorView<'a, T>>,
    quadrature: &impl Quadrature<T>,
) -> eyre::Result<T>
where
    T: Real,
    C: ElementConnectivity<T>,
{
    Ok(estimate_L2_error_squared(mesh, dof_map, variable, u, u_h, quadrature)?.sqrt())
}

/// Estimate the squared $H^1$ *seminorm* error $\seminorm{u_h - u}^2_{H^1}$ of one variable over
/// the active elements of the mesh.
#[allow(non_snake_case)]
pub fn estimate_H1_seminorm_error_squared<'a, T, C>(
    mesh: &Mesh<T, C>,
    dof_map: &DofMap<T>,
    variable: usize,
    u_grad: impl Fn(&Point2<T>) -> Vector2<T>,
    u_h: impl Into<DVectorView<'a, T>>,
    quadrature: &impl Quadrature<T>,
) -> eyre::Result<T>
where
    T: Real,
    C: ElementConnectivity<T>,
{
    accumulate_element_errors(mesh, dof_map, variable, u_h, quadrature, |values, u_h_element| {
        estimate_element_H1_seminorm_error_squared(values, &u_grad, u_h_element)
    })
}

#[allow(non_snake_case)]
pub fn estimate_H1_seminorm_error<'a, T, C>(
    mesh: &Mesh<T, C>,
    dof_map: &DofMap<T>,
    variable: usize,
    u_grad: impl Fn(&Point2<T>) -> Vector2<T>,
    u_h: impl Into<DVectorView<'a, T>>,
    quadrature: &impl Quadrature<T>,
) -> eyre::Result<T>
where
    T: Real,
    C: ElementConnectivity<T>,
{
    estimate_H1_seminorm_error_squared(mesh, dof_map, variable, u_grad, u_h, quadrature).map(|err2| err2.sqrt())
}
