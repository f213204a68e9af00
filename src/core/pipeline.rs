use crate::core::extract::Extractor;
use crate::core::load::Loader;
use crate::core::transform;
use crate::domain::model::{CleanedRecord, Dataset, DatasetSpec, ExtractOutcome, LoadReport, RawRecord};
use crate::domain::ports::{ConfigProvider, Pipeline};
use crate::utils::error::Result;
use sqlx::PgPool;

/// The shipped pipeline: catalog-search extraction, spec-driven mapping,
/// PostGIS load over an explicitly passed connection pool.
pub struct OpenDataPipeline {
    extractor: Extractor,
    loader: Loader,
    specs: Vec<DatasetSpec>,
}

impl OpenDataPipeline {
    pub fn new<C: ConfigProvider>(config: &C, pool: PgPool, specs: Vec<DatasetSpec>) -> Self {
        Self {
            extractor: Extractor::new(
                config.api_base(),
                config.page_size(),
                config.max_records(),
                config.page_delay_ms(),
            ),
            loader: Loader::new(pool, config.batch_size()),
            specs,
        }
    }
}

#[async_trait::async_trait]
impl Pipeline for OpenDataPipeline {
    async fn extract(&self, spec: &DatasetSpec) -> ExtractOutcome {
        self.extractor.extract(spec).await
    }

    fn transform(&self, spec: &DatasetSpec, raw: Vec<RawRecord>) -> Result<Vec<CleanedRecord>> {
        transform::map_dataset(spec, &raw)
    }

    async fn load(&self, datasets: Vec<Dataset>) -> Result<LoadReport> {
        self.loader.load_all(&self.specs, datasets).await
    }
}
