//! Transactional load into PostGIS: schema reset, bulk scalar insert,
//! keyed geometry backfill, best-effort spatial index. Commits happen in
//! bounded batches; one dataset's failure never aborts its siblings.

use crate::domain::model::{
    CleanedRecord, ColumnType, Dataset, DatasetLoad, DatasetSpec, LoadReport,
};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

/// WGS 84. Applied uniformly to every stored geometry.
pub const SRID: i32 = 4326;

pub struct Loader {
    pool: PgPool,
    batch_size: usize,
}

impl Loader {
    pub fn new(pool: PgPool, batch_size: usize) -> Self {
        Self { pool, batch_size }
    }

    /// Loads every dataset against a freshly reset schema. Tables for all
    /// known keys are dropped and recreated first, whether or not their
    /// dataset produced records this run. Assumes exclusive ownership of
    /// the destination tables for the duration of the call.
    pub async fn load_all(
        &self,
        specs: &[DatasetSpec],
        datasets: Vec<Dataset>,
    ) -> Result<LoadReport> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
            .execute(&self.pool)
            .await?;

        let mut reset_failures: HashMap<String, String> = HashMap::new();
        for spec in specs {
            if let Err(err) = self.reset_schema(spec).await {
                tracing::error!("'{}': schema reset failed: {}", spec.key, err);
                reset_failures.insert(spec.key.clone(), err.to_string());
            }
        }

        let mut report = LoadReport::default();
        for dataset in datasets {
            let Some(spec) = specs.iter().find(|s| s.key == dataset.key) else {
                tracing::warn!("no spec registered for dataset '{}', skipping", dataset.key);
                continue;
            };
            if let Some(reason) = reset_failures.get(&dataset.key) {
                report.datasets.push(DatasetLoad {
                    key: dataset.key.clone(),
                    failure: Some(reason.clone()),
                    ..Default::default()
                });
                continue;
            }
            report
                .datasets
                .push(self.load_dataset(spec, &dataset.records).await);
        }

        Ok(report)
    }

    async fn reset_schema(&self, spec: &DatasetSpec) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", spec.table))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&create_table_sql(spec)).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load_dataset(&self, spec: &DatasetSpec, records: &[CleanedRecord]) -> DatasetLoad {
        let mut load = DatasetLoad {
            key: spec.key.clone(),
            ..Default::default()
        };

        for chunk in records.chunks(self.batch_size) {
            match self.insert_chunk(spec, chunk).await {
                Ok(()) => load.rows_inserted += chunk.len(),
                Err(err) => {
                    let failure = EtlError::LoadFailed {
                        dataset: spec.key.clone(),
                        committed: load.rows_inserted,
                        reason: err.to_string(),
                    };
                    tracing::error!("{}", failure);
                    load.failure = Some(failure.to_string());
                    return load;
                }
            }
        }
        tracing::info!("[load] inserted {} rows into {}", load.rows_inserted, spec.table);

        let geometried: Vec<&CleanedRecord> =
            records.iter().filter(|r| r.geometry.is_some()).collect();
        for chunk in geometried.chunks(self.batch_size) {
            match self.backfill_chunk(spec, chunk).await {
                Ok(()) => load.geometries_backfilled += chunk.len(),
                Err(err) => {
                    let failure = EtlError::LoadFailed {
                        dataset: spec.key.clone(),
                        committed: load.geometries_backfilled,
                        reason: err.to_string(),
                    };
                    tracing::error!("{}", failure);
                    load.failure = Some(failure.to_string());
                    return load;
                }
            }
        }
        if !geometried.is_empty() {
            tracing::info!(
                "[load] backfilled {} geometries in {}",
                load.geometries_backfilled,
                spec.table
            );
        }

        if let Err(err) = self.build_index(spec).await {
            tracing::warn!(
                "'{}': spatial index build failed (non-fatal): {}",
                spec.key,
                err
            );
        }

        load
    }

    async fn insert_chunk(&self, spec: &DatasetSpec, chunk: &[CleanedRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let mut insert = build_insert(spec, chunk);
        insert.build().execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Second pass: attach geometry to rows inserted without it, matched by
    /// the stable `record_id` rather than insertion order.
    async fn backfill_chunk(&self, spec: &DatasetSpec, chunk: &[&CleanedRecord]) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET geom = ST_SetSRID(ST_GeomFromGeoJSON($1), {}) WHERE record_id = $2",
            spec.table, SRID
        );
        let mut tx = self.pool.begin().await?;
        for record in chunk {
            if let Some(geometry) = &record.geometry {
                sqlx::query(&sql)
                    .bind(geometry.to_geojson().to_string())
                    .bind(&record.record_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn build_index(&self, spec: &DatasetSpec) -> Result<()> {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{}_geom ON {} USING GIST (geom)",
            spec.table, spec.table
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Fixed per-key schema: a loader-generated surrogate key, the correlation
/// id, the declared scalar columns, and a nullable geometry column filled
/// by the backfill pass.
fn create_table_sql(spec: &DatasetSpec) -> String {
    let mut columns = vec![
        "id BIGSERIAL PRIMARY KEY".to_string(),
        "record_id TEXT".to_string(),
    ];
    for mapping in &spec.field_map {
        columns.push(format!("{} {}", mapping.column, mapping.ty.sql_type()));
    }
    columns.push(format!("geom geometry(Geometry, {})", SRID));
    format!("CREATE TABLE {} ({})", spec.table, columns.join(", "))
}

/// Multi-row INSERT over the scalar columns only; the geometry column is
/// omitted entirely at this stage.
fn build_insert(spec: &DatasetSpec, chunk: &[CleanedRecord]) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO ");
    qb.push(&spec.table);
    qb.push(" (record_id");
    for mapping in &spec.field_map {
        qb.push(", ");
        qb.push(&mapping.column);
    }
    qb.push(") ");
    qb.push_values(chunk, |mut row, record| {
        row.push_bind(record.record_id.clone());
        for mapping in &spec.field_map {
            match sql_scalar(mapping.ty, record.scalars.get(&mapping.column)) {
                SqlScalar::Text(v) => {
                    row.push_bind(v);
                }
                SqlScalar::Double(v) => {
                    row.push_bind(v);
                }
                SqlScalar::Integer(v) => {
                    row.push_bind(v);
                }
                SqlScalar::Boolean(v) => {
                    row.push_bind(v);
                }
                SqlScalar::Json(v) => {
                    row.push_bind(v);
                }
            }
        }
    });
    qb
}

enum SqlScalar {
    Text(Option<String>),
    Double(Option<f64>),
    Integer(Option<i64>),
    Boolean(Option<bool>),
    Json(Option<Value>),
}

/// Column-typed bind with light coercion: numeric strings parse, anything
/// non-scalar lands in a Text column as its JSON text.
fn sql_scalar(ty: ColumnType, value: Option<&Value>) -> SqlScalar {
    let value = value.filter(|v| !v.is_null());
    match ty {
        ColumnType::Text => SqlScalar::Text(value.map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        ColumnType::Double => SqlScalar::Double(value.and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })),
        ColumnType::Integer => SqlScalar::Integer(value.and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })),
        ColumnType::Boolean => SqlScalar::Boolean(value.and_then(|v| match v {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })),
        ColumnType::Json => SqlScalar::Json(value.cloned()),
    }
}
