//! Grouping polygon rings into polygons.
//!
//! Shapefile polygons are a flat list of rings. Clockwise rings are
//! exteriors and counter-clockwise rings are holes.

use geo::{Contains, LineString, MultiPolygon, Polygon, Winding};
use log::debug;

/// Assemble rings in record order into polygons.
///
/// Each hole joins the first exterior containing one of its vertices. A hole
/// with no containing exterior becomes an exterior of its own.
pub(crate) fn assemble_polygons(rings: Vec<LineString<f64>>) -> MultiPolygon<f64> {
    let (exteriors, holes): (Vec<_>, Vec<_>) = rings
        .into_iter()
        .filter(|ring| !ring.0.is_empty())
        .partition(|ring| ring.is_cw());
    let mut polygons: Vec<Polygon<f64>> = exteriors
        .into_iter()
        .map(|exterior| Polygon::new(exterior, Vec::new()))
        .collect();

    for hole in holes {
        let owner = polygons.iter().position(|polygon| {
            let outline = Polygon::new(polygon.exterior().clone(), Vec::new());
            hole.coords().any(|coord| outline.contains(coord))
        });
        match owner.and_then(|index| polygons.get_mut(index)) {
            Some(polygon) => polygon.interiors_push(hole),
            None => {
                debug!("hole ring has no containing exterior; promoting it");
                polygons.push(Polygon::new(hole, Vec::new()));
            }
        }
    }
    MultiPolygon(polygons)
}
