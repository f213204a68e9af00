//! Sequential per-dataset orchestration. Failures are contained at dataset
//! granularity; the run always finishes with a full report.

use crate::domain::model::{Dataset, DatasetReport, DatasetSpec, RunReport};
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use chrono::Utc;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    specs: Vec<DatasetSpec>,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P, specs: Vec<DatasetSpec>) -> Self {
        Self { pipeline, specs }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut reports: Vec<DatasetReport> = Vec::new();
        let mut to_load: Vec<Dataset> = Vec::new();

        for spec in &self.specs {
            let mut report = DatasetReport {
                key: spec.key.clone(),
                ..Default::default()
            };

            tracing::info!("📥 Extracting '{}'", spec.key);
            let outcome = self.pipeline.extract(spec).await;
            report.extracted = outcome.records.len();
            tracing::info!("   {} records extracted for '{}'", report.extracted, spec.key);
            if let Some(failure) = outcome.failure {
                tracing::warn!("'{}': extraction stopped early: {}", spec.key, failure);
                report.failure = Some(failure.to_string());
            }

            // Partial extractions still flow through mapping and load.
            match self.pipeline.transform(spec, outcome.records) {
                Ok(records) => {
                    report.cleaned = records.len();
                    tracing::info!("🧹 {} records cleaned for '{}'", report.cleaned, spec.key);
                    to_load.push(Dataset {
                        key: spec.key.clone(),
                        records,
                    });
                }
                Err(err) => {
                    tracing::warn!("'{}': transform failed: {}", spec.key, err);
                    report.failure.get_or_insert(err.to_string());
                }
            }

            reports.push(report);
        }

        tracing::info!("📦 Loading {} dataset(s)", to_load.len());
        let load_report = self.pipeline.load(to_load).await?;
        for load in load_report.datasets {
            if let Some(report) = reports.iter_mut().find(|r| r.key == load.key) {
                report.loaded = load.rows_inserted;
                report.geometries_backfilled = load.geometries_backfilled;
                if let Some(failure) = load.failure {
                    report.failure.get_or_insert(failure);
                }
            }
        }

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            datasets: reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        ApiFlavor, CleanedRecord, ColumnType, DatasetLoad, ExtractOutcome, FieldMapping,
        LoadReport, PairOrder, RawRecord,
    };
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn spec(key: &str) -> DatasetSpec {
        DatasetSpec {
            key: key.to_string(),
            remote_name: format!("{}-remote", key),
            table: key.to_string(),
            flavor: ApiFlavor::Search,
            field_map: vec![FieldMapping::new("name", "name", ColumnType::Text)],
            geometry_candidates: vec!["geo_point_2d".to_string()],
            pair_order: PairOrder::LatLon,
            requires_geometry: false,
        }
    }

    /// Canned stage results keyed by dataset; load failures are reported,
    /// never raised.
    struct StubPipeline {
        extracted: HashMap<String, usize>,
        extract_failure_for: Option<String>,
        transform_failure_for: Option<String>,
        load_failure_for: Option<String>,
    }

    impl StubPipeline {
        fn new(extracted: &[(&str, usize)]) -> Self {
            Self {
                extracted: extracted
                    .iter()
                    .map(|(k, n)| (k.to_string(), *n))
                    .collect(),
                extract_failure_for: None,
                transform_failure_for: None,
                load_failure_for: None,
            }
        }
    }

    #[async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self, spec: &DatasetSpec) -> ExtractOutcome {
            let count = self.extracted.get(&spec.key).copied().unwrap_or(0);
            let records = (0..count)
                .map(|i| {
                    RawRecord::from_object(
                        serde_json::json!({"recordid": format!("{}-{}", spec.key, i)})
                            .as_object()
                            .unwrap()
                            .clone(),
                    )
                })
                .collect();
            let failure = (self.extract_failure_for.as_deref() == Some(spec.key.as_str())).then(|| {
                EtlError::ExtractionFailed {
                    dataset: spec.key.clone(),
                    offset: count,
                    reason: "boom".to_string(),
                }
            });
            ExtractOutcome { records, failure }
        }

        fn transform(
            &self,
            spec: &DatasetSpec,
            raw: Vec<RawRecord>,
        ) -> crate::utils::error::Result<Vec<CleanedRecord>> {
            if self.transform_failure_for.as_deref() == Some(spec.key.as_str()) {
                return Err(EtlError::EmptyResult {
                    dataset: spec.key.clone(),
                });
            }
            Ok(raw
                .into_iter()
                .enumerate()
                .map(|(i, _)| CleanedRecord {
                    record_id: format!("{}-{}", spec.key, i),
                    scalars: HashMap::new(),
                    geometry: None,
                })
                .collect())
        }

        async fn load(&self, datasets: Vec<Dataset>) -> crate::utils::error::Result<LoadReport> {
            Ok(LoadReport {
                datasets: datasets
                    .into_iter()
                    .map(|ds| {
                        if self.load_failure_for.as_deref() == Some(ds.key.as_str()) {
                            DatasetLoad {
                                key: ds.key,
                                rows_inserted: 1,
                                geometries_backfilled: 0,
                                failure: Some("batch 2 rolled back".to_string()),
                            }
                        } else {
                            DatasetLoad {
                                key: ds.key,
                                rows_inserted: ds.records.len(),
                                geometries_backfilled: 0,
                                failure: None,
                            }
                        }
                    })
                    .collect(),
            })
        }
    }

    #[tokio::test]
    async fn run_reports_counts_for_every_dataset() {
        let pipeline = StubPipeline::new(&[("panels", 3), ("events", 5)]);
        let engine = EtlEngine::new(pipeline, vec![spec("panels"), spec("events")]);

        let report = engine.run().await.unwrap();
        assert_eq!(report.datasets.len(), 2);
        assert_eq!(report.datasets[0].key, "panels");
        assert_eq!(report.datasets[0].extracted, 3);
        assert_eq!(report.datasets[0].cleaned, 3);
        assert_eq!(report.datasets[0].loaded, 3);
        assert_eq!(report.datasets[1].loaded, 5);
        assert_eq!(report.failed().count(), 0);
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn extraction_failure_keeps_partials_flowing() {
        let mut pipeline = StubPipeline::new(&[("panels", 2), ("events", 4)]);
        pipeline.extract_failure_for = Some("panels".to_string());
        let engine = EtlEngine::new(pipeline, vec![spec("panels"), spec("events")]);

        let report = engine.run().await.unwrap();
        let panels = &report.datasets[0];
        // partial records were still cleaned and loaded
        assert_eq!(panels.extracted, 2);
        assert_eq!(panels.cleaned, 2);
        assert_eq!(panels.loaded, 2);
        assert!(panels.failure.as_ref().unwrap().contains("panels"));

        // the sibling dataset is untouched
        assert_eq!(report.datasets[1].loaded, 4);
        assert!(report.datasets[1].failure.is_none());
    }

    #[tokio::test]
    async fn transform_failure_skips_load_for_that_dataset_only() {
        let mut pipeline = StubPipeline::new(&[("panels", 2), ("events", 4)]);
        pipeline.transform_failure_for = Some("panels".to_string());
        let engine = EtlEngine::new(pipeline, vec![spec("panels"), spec("events")]);

        let report = engine.run().await.unwrap();
        let panels = &report.datasets[0];
        assert_eq!(panels.extracted, 2);
        assert_eq!(panels.cleaned, 0);
        assert_eq!(panels.loaded, 0);
        assert!(panels.failure.as_ref().unwrap().contains("no usable records"));

        assert_eq!(report.datasets[1].loaded, 4);
        assert_eq!(report.failed().count(), 1);
    }

    #[tokio::test]
    async fn load_failure_is_reported_not_raised() {
        let mut pipeline = StubPipeline::new(&[("panels", 2), ("events", 4)]);
        pipeline.load_failure_for = Some("events".to_string());
        let engine = EtlEngine::new(pipeline, vec![spec("panels"), spec("events")]);

        let report = engine.run().await.unwrap();
        assert!(report.datasets[0].failure.is_none());
        let events = &report.datasets[1];
        assert_eq!(events.loaded, 1);
        assert!(events.failure.as_ref().unwrap().contains("rolled back"));
    }
}
