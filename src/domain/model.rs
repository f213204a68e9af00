use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// One row as returned by the catalog API, before any projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub data: HashMap<String, Value>,
}

impl RawRecord {
    pub fn from_object(obj: serde_json::Map<String, Value>) -> Self {
        Self {
            data: obj.into_iter().collect(),
        }
    }

    /// Looks a field up on the record itself first, then inside the nested
    /// `fields` sub-object that v1 search responses wrap records in.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).or_else(|| {
            self.data
                .get("fields")
                .and_then(Value::as_object)
                .and_then(|fields| fields.get(name))
        })
    }
}

/// Which variant of the catalog-search API a dataset is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiFlavor {
    /// `records/1.0/search/` with `dataset`/`rows`/`start` parameters,
    /// an `nhits` total, records wrapping a `fields` sub-object.
    Search,
    /// `explore/v2.1/.../records` with `limit`/`offset` parameters, a
    /// `total_count` total, flat records.
    Explore,
}

/// Interpretation of a bare two-element coordinate pair or a delimited
/// string. Fixed per dataset, never inferred from the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairOrder {
    LatLon,
    LonLat,
}

impl PairOrder {
    pub fn point(self, a: f64, b: f64) -> GeometryValue {
        match self {
            PairOrder::LatLon => GeometryValue::Point { lon: b, lat: a },
            PairOrder::LonLat => GeometryValue::Point { lon: a, lat: b },
        }
    }
}

/// Destination column type for a projected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Double,
    Integer,
    Boolean,
    Json,
}

impl ColumnType {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Integer => "BIGINT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Json => "JSONB",
        }
    }
}

/// One column of the whitelist projection: destination column, source
/// field, destination type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub column: String,
    pub source: String,
    pub ty: ColumnType,
}

impl FieldMapping {
    pub fn new(column: &str, source: &str, ty: ColumnType) -> Self {
        Self {
            column: column.to_string(),
            source: source.to_string(),
            ty,
        }
    }
}

/// Declarative description of one dataset: where it lives remotely, which
/// fields survive projection, and how its geometry is sourced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub key: String,
    pub remote_name: String,
    pub table: String,
    pub flavor: ApiFlavor,
    pub field_map: Vec<FieldMapping>,
    /// Source field names tried in order; the first value the geometry
    /// normalizer accepts wins.
    pub geometry_candidates: Vec<String>,
    pub pair_order: PairOrder,
    /// Datasets whose rows are useless without geometry report `EmptyResult`
    /// when not a single record yields one.
    pub requires_geometry: bool,
}

/// Internal geometry representation. Coordinates are always (lon, lat).
/// Polygons keep only their outer ring; interior rings are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeometryValue {
    Point { lon: f64, lat: f64 },
    Polygon { ring: Vec<(f64, f64)> },
    MultiPolygon { polygons: Vec<Vec<(f64, f64)>> },
}

impl GeometryValue {
    /// Canonical GeoJSON encoding, as fed to `ST_GeomFromGeoJSON`.
    pub fn to_geojson(&self) -> Value {
        match self {
            GeometryValue::Point { lon, lat } => json!({
                "type": "Point",
                "coordinates": [lon, lat],
            }),
            GeometryValue::Polygon { ring } => json!({
                "type": "Polygon",
                "coordinates": [ring_positions(ring)],
            }),
            GeometryValue::MultiPolygon { polygons } => json!({
                "type": "MultiPolygon",
                "coordinates": polygons
                    .iter()
                    .map(|ring| vec![ring_positions(ring)])
                    .collect::<Vec<_>>(),
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GeometryValue::Point { .. } => "Point",
            GeometryValue::Polygon { .. } => "Polygon",
            GeometryValue::MultiPolygon { .. } => "MultiPolygon",
        }
    }
}

fn ring_positions(ring: &[(f64, f64)]) -> Vec<Vec<f64>> {
    ring.iter().map(|(x, y)| vec![*x, *y]).collect()
}

/// One projected record: every declared column present (Null when the
/// source field was absent), plus at most one geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub record_id: String,
    pub scalars: HashMap<String, Value>,
    pub geometry: Option<GeometryValue>,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub key: String,
    pub records: Vec<CleanedRecord>,
}

/// What one extraction pass produced. A failure past the retry budget is
/// carried alongside the pages gathered before it; partial results are
/// valid output.
#[derive(Debug)]
pub struct ExtractOutcome {
    pub records: Vec<RawRecord>,
    pub failure: Option<crate::utils::error::EtlError>,
}

#[derive(Debug, Clone, Default)]
pub struct DatasetLoad {
    pub key: String,
    pub rows_inserted: usize,
    pub geometries_backfilled: usize,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub datasets: Vec<DatasetLoad>,
}

/// Per-dataset counters for the final run summary.
#[derive(Debug, Clone, Default)]
pub struct DatasetReport {
    pub key: String,
    pub extracted: usize,
    pub cleaned: usize,
    pub loaded: usize,
    pub geometries_backfilled: usize,
    pub failure: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub datasets: Vec<DatasetReport>,
}

impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = &DatasetReport> {
        self.datasets.iter().filter(|d| d.failure.is_some())
    }
}
