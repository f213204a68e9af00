pub mod etl;
pub mod extract;
pub mod geometry;
pub mod load;
pub mod pipeline;
pub mod transform;

pub use crate::domain::model::{
    CleanedRecord, Dataset, DatasetSpec, ExtractOutcome, GeometryValue, LoadReport, RawRecord,
    RunReport,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline};
pub use crate::utils::error::Result;
