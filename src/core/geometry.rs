//! Geometry normalization: one ordered chain of shape parsers, each either
//! accepting a raw value or passing it to the next. Anything no parser
//! accepts is a valid "no geometry" outcome, not an error.

use crate::domain::model::{GeometryValue, PairOrder};
use serde_json::Value;

type ShapeParser = fn(&Value, PairOrder) -> Option<GeometryValue>;

/// Precedence matters: a bare pair is only ever read as a pair, a
/// `{type, coordinates}` object is only ever read as GeoJSON.
const PARSERS: [ShapeParser; 4] = [pair_point, geojson_geometry, keyed_point, delimited_point];

pub fn normalize(value: &Value, pair_order: PairOrder) -> Option<GeometryValue> {
    PARSERS.iter().find_map(|parse| parse(value, pair_order))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A two-element sequence of numbers, read via the dataset's pair order.
fn pair_point(value: &Value, pair_order: PairOrder) -> Option<GeometryValue> {
    let arr = value.as_array()?;
    if arr.len() != 2 {
        return None;
    }
    let a = number(&arr[0])?;
    let b = number(&arr[1])?;
    Some(pair_order.point(a, b))
}

/// A `{type, coordinates}` mapping. GeoJSON positions are (lon, lat)
/// already; coordinate order is preserved exactly, the pair convention
/// does not apply here. Only the outer ring of each polygon is kept.
fn geojson_geometry(value: &Value, _pair_order: PairOrder) -> Option<GeometryValue> {
    let obj = value.as_object()?;
    let kind = obj.get("type")?.as_str()?;
    let coordinates = obj.get("coordinates")?;

    match kind {
        "Point" => {
            let pos = position(coordinates)?;
            Some(GeometryValue::Point {
                lon: pos.0,
                lat: pos.1,
            })
        }
        "Polygon" => Some(GeometryValue::Polygon {
            ring: outer_ring(coordinates)?,
        }),
        "MultiPolygon" => {
            let polygons = coordinates
                .as_array()?
                .iter()
                .map(outer_ring)
                .collect::<Option<Vec<_>>>()?;
            Some(GeometryValue::MultiPolygon { polygons })
        }
        _ => None,
    }
}

/// A mapping with explicit `lat`/`lon` keys.
fn keyed_point(value: &Value, _pair_order: PairOrder) -> Option<GeometryValue> {
    let obj = value.as_object()?;
    let lat = number(obj.get("lat")?)?;
    let lon = number(obj.get("lon")?)?;
    Some(GeometryValue::Point { lon, lat })
}

/// A comma-delimited two-number string, read via the dataset's pair order.
fn delimited_point(value: &Value, pair_order: PairOrder) -> Option<GeometryValue> {
    let s = value.as_str()?;
    let mut parts = s.split(',');
    let a: f64 = parts.next()?.trim().parse().ok()?;
    let b: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(pair_order.point(a, b))
}

fn position(value: &Value) -> Option<(f64, f64)> {
    let arr = value.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    Some((number(&arr[0])?, number(&arr[1])?))
}

fn outer_ring(polygon: &Value) -> Option<Vec<(f64, f64)>> {
    let rings = polygon.as_array()?;
    let first = rings.first()?.as_array()?;
    first.iter().map(position).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_pair_uses_dataset_convention() {
        // The documented scenario: opendatasoft emits [lat, lon].
        let geom = normalize(&json!([48.85, 2.35]), PairOrder::LatLon).unwrap();
        assert_eq!(
            geom,
            GeometryValue::Point {
                lon: 2.35,
                lat: 48.85
            }
        );

        let geom = normalize(&json!([2.35, 48.85]), PairOrder::LonLat).unwrap();
        assert_eq!(
            geom,
            GeometryValue::Point {
                lon: 2.35,
                lat: 48.85
            }
        );
    }

    #[test]
    fn pair_accepts_numeric_strings() {
        let geom = normalize(&json!(["48.85", "2.35"]), PairOrder::LatLon).unwrap();
        assert_eq!(
            geom,
            GeometryValue::Point {
                lon: 2.35,
                lat: 48.85
            }
        );
    }

    #[test]
    fn geojson_point_keeps_lon_lat_order() {
        let geom = normalize(
            &json!({"type": "Point", "coordinates": [2.35, 48.85]}),
            PairOrder::LatLon,
        )
        .unwrap();
        // pair_order must not flip GeoJSON coordinates
        assert_eq!(
            geom,
            GeometryValue::Point {
                lon: 2.35,
                lat: 48.85
            }
        );
    }

    #[test]
    fn geojson_polygon_keeps_only_outer_ring() {
        let geom = normalize(
            &json!({
                "type": "Polygon",
                "coordinates": [
                    [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 0.0]],
                    [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]]
                ]
            }),
            PairOrder::LatLon,
        )
        .unwrap();

        assert_eq!(
            geom,
            GeometryValue::Polygon {
                ring: vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]
            }
        );
    }

    #[test]
    fn geojson_multipolygon_takes_first_ring_of_each_member() {
        let geom = normalize(
            &json!({
                "type": "MultiPolygon",
                "coordinates": [
                    [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                    [
                        [[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]],
                        [[5.2, 5.2], [5.8, 5.2], [5.8, 5.8], [5.2, 5.2]]
                    ]
                ]
            }),
            PairOrder::LatLon,
        )
        .unwrap();

        match geom {
            GeometryValue::MultiPolygon { polygons } => {
                assert_eq!(polygons.len(), 2);
                assert_eq!(polygons[0].len(), 4);
                assert_eq!(polygons[1][0], (5.0, 5.0));
            }
            other => panic!("expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn keyed_lat_lon_mapping() {
        let geom = normalize(&json!({"lat": 48.85, "lon": 2.35}), PairOrder::LatLon).unwrap();
        assert_eq!(
            geom,
            GeometryValue::Point {
                lon: 2.35,
                lat: 48.85
            }
        );
    }

    #[test]
    fn delimited_string_pair() {
        let geom = normalize(&json!("48.85, 2.35"), PairOrder::LatLon).unwrap();
        assert_eq!(
            geom,
            GeometryValue::Point {
                lon: 2.35,
                lat: 48.85
            }
        );
    }

    #[test]
    fn unrecognized_shapes_yield_none() {
        for value in [
            json!(null),
            json!(42),
            json!([1.0, 2.0, 3.0]),
            json!(["a", "b"]),
            json!({"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}),
            json!({"latitude": 48.85, "longitude": 2.35}),
            json!("48.85; 2.35"),
            json!("48.85, 2.35, 11.0"),
            json!({}),
        ] {
            assert!(
                normalize(&value, PairOrder::LatLon).is_none(),
                "{} should not normalize",
                value
            );
        }
    }

    #[test]
    fn normalization_is_idempotent_over_canonical_encoding() {
        let values = [
            GeometryValue::Point {
                lon: 2.35,
                lat: 48.85,
            },
            GeometryValue::Polygon {
                ring: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)],
            },
            GeometryValue::MultiPolygon {
                polygons: vec![
                    vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)],
                    vec![(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 5.0)],
                ],
            },
        ];

        for geom in values {
            let rebuilt = normalize(&geom.to_geojson(), PairOrder::LatLon).unwrap();
            assert_eq!(rebuilt, geom);
        }
    }
}
