//! GeoJSON rendering of ingested shapefiles.

use geo::{Coord, Geometry, LineString, Polygon};
use mapmark_core::{AttributeRow, AttributeValue, Shapefile};
use serde_json::{Map, Number, Value, json};

/// Render `shapefile` as a GeoJSON `FeatureCollection`.
pub(crate) fn feature_collection(shapefile: &Shapefile) -> Value {
    let features: Vec<Value> = shapefile
        .features()
        .iter()
        .map(|feature| {
            json!({
                "type": "Feature",
                "geometry": geometry(&feature.geometry),
                "properties": properties(&feature.attributes),
            })
        })
        .collect();
    json!({
        "type": "FeatureCollection",
        "name": shapefile.name(),
        "features": features,
    })
}

fn properties(row: &AttributeRow) -> Value {
    let map: Map<String, Value> = row
        .iter()
        .map(|(name, value)| (name.to_owned(), attribute(value)))
        .collect();
    Value::Object(map)
}

fn attribute(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Text(text) | AttributeValue::Date(text) => Value::String(text.clone()),
        AttributeValue::Number(number) => Number::from_f64(*number).map_or(Value::Null, Value::Number),
        AttributeValue::Boolean(flag) => Value::Bool(*flag),
        AttributeValue::Null => Value::Null,
    }
}

fn position(coord: &Coord<f64>) -> Value {
    json!([coord.x, coord.y])
}

fn line(line: &LineString<f64>) -> Value {
    Value::Array(line.coords().map(position).collect())
}

fn rings(polygon: &Polygon<f64>) -> Value {
    Value::Array(
        std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .map(line)
            .collect(),
    )
}

fn geometry(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(point) => json!({"type": "Point", "coordinates": position(&point.0)}),
        Geometry::MultiPoint(points) => json!({
            "type": "MultiPoint",
            "coordinates": points.iter().map(|point| position(&point.0)).collect::<Vec<_>>(),
        }),
        Geometry::LineString(path) => json!({"type": "LineString", "coordinates": line(path)}),
        Geometry::MultiLineString(paths) => json!({
            "type": "MultiLineString",
            "coordinates": paths.iter().map(line).collect::<Vec<_>>(),
        }),
        Geometry::Polygon(polygon) => json!({"type": "Polygon", "coordinates": rings(polygon)}),
        Geometry::MultiPolygon(polygons) => json!({
            "type": "MultiPolygon",
            "coordinates": polygons.iter().map(rings).collect::<Vec<_>>(),
        }),
        // Ingestion never yields the other kinds.
        Geometry::Line(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_)
        | Geometry::GeometryCollection(_) => Value::Null,
    }
}
