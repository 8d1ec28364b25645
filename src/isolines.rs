//! Isolines of piecewise linear fields on triangulations.
//!
//! Isolines are extracted triangle by triangle ("marching triangles"). A vertex counts as
//! *above* an isovalue if its value is greater than or equal to it, so each crossing is found
//! exactly once. Crossing points on shared edges are shared between the adjacent triangles, and
//! crossings at vertices are shared between all triangles around the vertex, so that segments
//! can be chained into connected polylines.
use crate::connectivity::Connectivity;
use crate::dof_map::DofMap;
use crate::mesh::Mesh;
use crate::nalgebra::{DVector, Point2, Scalar};
use crate::Real;
use eyre::eyre;
use rustc_hash::{FxHashMap, FxHashSet};

/// A triangulated piecewise linear field.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolineInput<T: Scalar> {
    vertices: Vec<Point2<T>>,
    triangles: Vec<[usize; 3]>,
    values: Vec<T>,
}

impl<T: Real> IsolineInput<T> {
    /// Fails if the number of values differs from the number of vertices, or if a triangle
    /// references a vertex out of bounds.
    pub fn new(vertices: Vec<Point2<T>>, triangles: Vec<[usize; 3]>, values: Vec<T>) -> eyre::Result<Self> {
        if values.len() != vertices.len() {
            return Err(eyre!(
                "got {} values for {} vertices",
                values.len(),
                vertices.len()
            ));
        }
        if let Some(triangle) = triangles
            .iter()
            .find(|triangle| triangle.iter().any(|&v| v >= vertices.len()))
        {
            return Err(eyre!("triangle {:?} references vertices out of bounds", triangle));
        }
        Ok(Self {
            vertices,
            triangles,
            values,
        })
    }

    /// Extracts the field of one variable from the solution of a system.
    ///
    /// Only active elements are included. Quadrilaterals are split into two triangles along the
    /// diagonal from their first to their third node.
    pub fn from_solution<C>(
        mesh: &Mesh<T, C>,
        dof_map: &DofMap<T>,
        variable: usize,
        solution: &DVector<T>,
    ) -> eyre::Result<Self>
    where
        C: Connectivity,
    {
        if variable >= dof_map.n_variables() {
            return Err(eyre!("unknown variable {}", variable));
        }
        if solution.len() != dof_map.n_dofs() || dof_map.n_dofs() != mesh.num_vertices() * dof_map.n_variables() {
            return Err(eyre!(
                "solution of length {} does not match the DOF map of the mesh",
                solution.len()
            ));
        }

        let values = (0..mesh.num_vertices())
            .map(|node| solution[dof_map.dof_index(node, variable)])
            .collect();

        let mut triangles = Vec::new();
        for element in mesh.active_element_indices() {
            match *mesh.connectivity()[element].vertex_indices() {
                [a, b, c] => triangles.push([a, b, c]),
                [a, b, c, d] => triangles.extend([[a, b, c], [a, c, d]]),
                ref other => {
                    return Err(eyre!(
                        "element {} with {} vertices cannot be triangulated",
                        element,
                        other.len()
                    ))
                }
            }
        }

        Self::new(mesh.vertices().to_vec(), triangles, values)
    }

    pub fn vertices(&self) -> &[Point2<T>] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// The smallest and largest value of the field, or `None` if there are no vertices.
    pub fn value_range(&self) -> Option<(T, T)> {
        let first = *self.values.first()?;
        Some(
            self.values
                .iter()
                .fold((first, first), |(min, max), &v| (min.min(v), max.max(v))),
        )
    }

    pub fn extract(&self, isovalues: &[T]) -> Isolines<T> {
        extract_isolines_unchecked(&self.vertices, &self.triangles, &self.values, isovalues)
    }
}

/// `n` isovalues evenly spaced strictly inside `(min, max)`.
///
/// Returns no values if the range is empty.
pub fn evenly_spaced_isovalues<T: Real>(min: T, max: T, n: usize) -> Vec<T> {
    if !(min < max) {
        return Vec::new();
    }
    let Some(intervals) = T::from_usize(n + 1) else {
        return Vec::new();
    };
    (1..=n)
        .filter_map(|k| T::from_usize(k))
        .map(|k| min + (max - min) * k / intervals)
        .collect()
}

/// Extracts the isolines of the piecewise linear field with the given vertex values.
pub fn extract_isolines<T: Real>(
    vertices: &[Point2<T>],
    triangles: &[[usize; 3]],
    values: &[T],
    isovalues: &[T],
) -> eyre::Result<Isolines<T>> {
    let input = IsolineInput::new(vertices.to_vec(), triangles.to_vec(), values.to_vec())?;
    Ok(input.extract(isovalues))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum CrossingKey {
    Vertex(usize),
    /// An edge given by its vertex above and its vertex below the isovalue.
    Edge { above: usize, below: usize },
}

fn extract_isolines_unchecked<T: Real>(
    vertices: &[Point2<T>],
    triangles: &[[usize; 3]],
    values: &[T],
    isovalues: &[T],
) -> Isolines<T> {
    let mut isolines = Isolines {
        isovalues: isovalues.to_vec(),
        points: Vec::new(),
        point_isovalues: Vec::new(),
        segments: Vec::new(),
        segment_isovalues: Vec::new(),
    };

    for (iso_idx, &iso) in isovalues.iter().enumerate() {
        let mut crossings: FxHashMap<CrossingKey, usize> = FxHashMap::default();
        // Edges lying on the isoline are found by both adjacent triangles
        let mut emitted: FxHashSet<(usize, usize)> = FxHashSet::default();
        let mut crossing_point = |above: usize, below: usize, isolines: &mut Isolines<T>| {
            let (v_above, v_below) = (values[above], values[below]);
            let key = if v_above == iso {
                CrossingKey::Vertex(above)
            } else {
                CrossingKey::Edge { above, below }
            };
            *crossings.entry(key).or_insert_with(|| {
                let point = match key {
                    CrossingKey::Vertex(v) => vertices[v],
                    CrossingKey::Edge { .. } => {
                        let t = (v_above - iso) / (v_above - v_below);
                        vertices[above] + (vertices[below] - vertices[above]) * t
                    }
                };
                isolines.points.push(point);
                isolines.point_isovalues.push(iso_idx);
                isolines.points.len() - 1
            })
        };

        for triangle in triangles {
            let mut crossing_indices = Vec::with_capacity(2);
            for k in 0..3 {
                let (a, b) = (triangle[k], triangle[(k + 1) % 3]);
                let (a_above, b_above) = (values[a] >= iso, values[b] >= iso);
                if a_above != b_above {
                    let (above, below) = if a_above { (a, b) } else { (b, a) };
                    crossing_indices.push(crossing_point(above, below, &mut isolines));
                }
            }

            // Triangles with crossings have exactly two crossing edges
            if let [p, q] = crossing_indices[..] {
                if p != q && emitted.insert((p.min(q), p.max(q))) {
                    isolines.segments.push([p, q]);
                    isolines.segment_isovalues.push(iso_idx);
                }
            }
        }
    }

    isolines
}

/// Line segments approximating the isolines of a field, for a list of isovalues.
#[derive(Debug, Clone, PartialEq)]
pub struct Isolines<T: Scalar> {
    isovalues: Vec<T>,
    points: Vec<Point2<T>>,
    point_isovalues: Vec<usize>,
    segments: Vec<[usize; 2]>,
    segment_isovalues: Vec<usize>,
}

/// A connected chain of isoline points.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline<T: Scalar> {
    pub isovalue: T,
    pub points: Vec<Point2<T>>,
    /// Whether the last point connects back to the first.
    pub closed: bool,
}

impl<T: Real> Isolines<T> {
    pub fn isovalues(&self) -> &[T] {
        &self.isovalues
    }

    pub fn points(&self) -> &[Point2<T>] {
        &self.points
    }

    /// The isovalue of each point.
    pub fn point_isovalues(&self) -> impl '_ + Iterator<Item = T> {
        self.point_isovalues.iter().map(|&idx| self.isovalues[idx])
    }

    /// Segments as pairs of indices into [`Isolines::points`].
    pub fn segments(&self) -> &[[usize; 2]] {
        &self.segments
    }

    /// The isovalue of each segment.
    pub fn segment_isovalues(&self) -> impl '_ + Iterator<Item = T> {
        self.segment_isovalues.iter().map(|&idx| self.isovalues[idx])
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Chains the segments into maximal polylines.
    ///
    /// Open polylines start at points with a single segment, the remaining segments form closed
    /// loops.
    pub fn polylines(&self) -> Vec<Polyline<T>> {
        let mut adjacency = vec![Vec::new(); self.points.len()];
        for (seg_idx, &[p, q]) in self.segments.iter().enumerate() {
            adjacency[p].push(seg_idx);
            adjacency[q].push(seg_idx);
        }

        let mut visited = vec![false; self.segments.len()];
        let mut polylines = Vec::new();

        let trace = |start: usize, visited: &mut Vec<bool>| -> Option<Polyline<T>> {
            let mut indices = vec![start];
            let mut current = start;
            while let Some(&seg_idx) = adjacency[current].iter().find(|&&s| !visited[s]) {
                visited[seg_idx] = true;
                let [p, q] = self.segments[seg_idx];
                current = if p == current { q } else { p };
                indices.push(current);
            }
            if indices.len() < 2 {
                return None;
            }
            let closed = indices.len() > 2 && indices.first() == indices.last();
            if closed {
                indices.pop();
            }
            Some(Polyline {
                isovalue: self.isovalues[self.point_isovalues[start]],
                points: indices.iter().map(|&i| self.points[i]).collect(),
                closed,
            })
        };

        // Endpoints of open polylines first, then whatever remains is closed
        for point in 0..self.points.len() {
            if adjacency[point].len() != 2 {
                while let Some(polyline) = trace(point, &mut visited) {
                    polylines.push(polyline);
                }
            }
        }
        for seg_idx in 0..self.segments.len() {
            if !visited[seg_idx] {
                if let Some(polyline) = trace(self.segments[seg_idx][0], &mut visited) {
                    polylines.push(polyline);
                }
            }
        }

        polylines
    }
}
