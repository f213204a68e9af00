//! Whitelist projection from raw API records to cleaned records, driven
//! entirely by the dataset's declarative spec. Pure: identical raw input
//! always yields identical cleaned output.

use crate::core::geometry;
use crate::domain::model::{CleanedRecord, DatasetSpec, RawRecord};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

const CONTENT_ID_HEX_LEN: usize = 32;

pub fn map_dataset(spec: &DatasetSpec, raw_records: &[RawRecord]) -> Result<Vec<CleanedRecord>> {
    let mut cleaned = Vec::with_capacity(raw_records.len());
    let mut with_geometry = 0usize;

    for raw in raw_records {
        let record_id = raw
            .field("recordid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| content_id(raw));

        let mut scalars = HashMap::with_capacity(spec.field_map.len());
        for mapping in &spec.field_map {
            let value = raw.field(&mapping.source).cloned().unwrap_or(Value::Null);
            scalars.insert(mapping.column.clone(), value);
        }

        let geometry = spec
            .geometry_candidates
            .iter()
            .find_map(|candidate| {
                raw.field(candidate)
                    .and_then(|value| geometry::normalize(value, spec.pair_order))
            });
        if geometry.is_some() {
            with_geometry += 1;
        }

        // Records without geometry are kept; geometry stays null.
        cleaned.push(CleanedRecord {
            record_id,
            scalars,
            geometry,
        });
    }

    if spec.requires_geometry && with_geometry == 0 {
        return Err(EtlError::EmptyResult {
            dataset: spec.key.clone(),
        });
    }

    Ok(cleaned)
}

/// Deterministic fallback id for records the API ships without a
/// `recordid` (the v2 explore shape): SHA-256 over the key-sorted record
/// content. Keeps the mapping stage pure across runs.
fn content_id(raw: &RawRecord) -> String {
    let ordered: BTreeMap<&String, &Value> = raw.data.iter().collect();
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&ordered).unwrap_or_default());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(CONTENT_ID_HEX_LEN);
    hex
}
