use crate::domain::model::{CleanedRecord, Dataset, DatasetSpec, ExtractOutcome, LoadReport, RawRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait ConfigProvider: Send + Sync {
    fn api_base(&self) -> &str;
    fn database_url(&self) -> &str;
    fn page_size(&self) -> usize;
    fn max_records(&self) -> usize;
    fn batch_size(&self) -> usize;
    fn page_delay_ms(&self) -> u64;
}

/// The three pipeline stages, one dataset at a time for extract/transform,
/// the whole key→records map at once for load (schema reset covers every
/// known key in one pass).
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self, spec: &DatasetSpec) -> ExtractOutcome;
    fn transform(&self, spec: &DatasetSpec, raw: Vec<RawRecord>) -> Result<Vec<CleanedRecord>>;
    async fn load(&self, datasets: Vec<Dataset>) -> Result<LoadReport>;
}
