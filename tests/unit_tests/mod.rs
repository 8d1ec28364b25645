mod dof_map;
mod element;
mod quadrature;
mod vtk;
