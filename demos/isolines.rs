use isodist::isolines::{evenly_spaced_isovalues, extract_isolines};
use isodist::nalgebra::Point2;

/// Isolines of the field `x + y` on a square split into four triangles around its center.
fn main() -> eyre::Result<()> {
    let vertices = vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
        Point2::new(0.5, 0.5),
    ];
    let triangles = vec![[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]];
    let values: Vec<f64> = vertices.iter().map(|v| v.x + v.y).collect();

    let isovalues = evenly_spaced_isovalues(0.0, 2.0, 3);
    let isolines = extract_isolines(&vertices, &triangles, &values, &isovalues)?;

    for polyline in isolines.polylines() {
        let points: Vec<_> = polyline
            .points
            .iter()
            .map(|p| format!("({:.3}, {:.3})", p.x, p.y))
            .collect();
        println!(
            "d = {:.3}{}: {}",
            polyline.isovalue,
            if polyline.closed { " (closed)" } else { "" },
            points.join(" -> ")
        );
    }

    Ok(())
}
