//! Paginated extraction from the catalog-search API. One timeout retry per
//! offset, a mandatory pause between pages, and a quiet stop on the
//! out-of-range signal; partial results are always returned.

use crate::domain::model::{ApiFlavor, DatasetSpec, ExtractOutcome, RawRecord};
use crate::utils::error::EtlError;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub struct Extractor {
    client: Client,
    api_base: String,
    page_size: usize,
    max_records: usize,
    page_delay: Duration,
    request_timeout: Duration,
    retry_delay: Duration,
}

struct Page {
    total: Option<usize>,
    records: Vec<RawRecord>,
}

enum PageFailure {
    /// HTTP 400: the remote signals an offset past its window.
    OutOfRange,
    Http(reqwest::Error),
}

impl Extractor {
    pub fn new(api_base: &str, page_size: usize, max_records: usize, page_delay_ms: u64) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            page_size,
            max_records,
            page_delay: Duration::from_millis(page_delay_ms),
            request_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_millis(500),
        }
    }

    pub fn with_timeouts(mut self, request_timeout: Duration, retry_delay: Duration) -> Self {
        self.request_timeout = request_timeout;
        self.retry_delay = retry_delay;
        self
    }

    pub async fn extract(&self, spec: &DatasetSpec) -> ExtractOutcome {
        let mut records = Vec::new();
        let mut offset = 0usize;
        let mut reported_total: Option<usize> = None;

        loop {
            let remaining = self.max_records.saturating_sub(offset);
            if remaining == 0 {
                break;
            }
            if let Some(total) = reported_total {
                if offset >= total {
                    break;
                }
            }
            // The final page shrinks so the cap is hit exactly.
            let limit = self.page_size.min(remaining);

            let page = match self.fetch_page_with_retry(spec, offset, limit).await {
                Ok(page) => page,
                Err(PageFailure::OutOfRange) => {
                    tracing::debug!(
                        "'{}': offset {} out of range, stopping pagination",
                        spec.key,
                        offset
                    );
                    break;
                }
                Err(PageFailure::Http(err)) => {
                    return ExtractOutcome {
                        records,
                        failure: Some(EtlError::ExtractionFailed {
                            dataset: spec.key.clone(),
                            offset,
                            reason: err.to_string(),
                        }),
                    };
                }
            };

            if page.records.is_empty() {
                break;
            }
            reported_total = reported_total.or(page.total);
            tracing::debug!(
                "⬇️ '{}': fetched {} records (offset={})",
                spec.key,
                page.records.len(),
                offset
            );
            records.extend(page.records);
            offset += limit;

            // Pause between pages; politeness to the remote service, not a
            // correctness requirement.
            tokio::time::sleep(self.page_delay).await;
        }

        ExtractOutcome {
            records,
            failure: None,
        }
    }

    async fn fetch_page_with_retry(
        &self,
        spec: &DatasetSpec,
        offset: usize,
        limit: usize,
    ) -> Result<Page, PageFailure> {
        match self.fetch_page(spec, offset, limit).await {
            Err(PageFailure::Http(err)) if err.is_timeout() => {
                tracing::warn!(
                    "'{}': timeout at offset {}, retrying once",
                    spec.key,
                    offset
                );
                tokio::time::sleep(self.retry_delay).await;
                self.fetch_page(spec, offset, limit).await
            }
            other => other,
        }
    }

    async fn fetch_page(
        &self,
        spec: &DatasetSpec,
        offset: usize,
        limit: usize,
    ) -> Result<Page, PageFailure> {
        let request = match spec.flavor {
            ApiFlavor::Search => self
                .client
                .get(format!("{}/records/1.0/search/", self.api_base))
                .query(&[("dataset", spec.remote_name.as_str())])
                .query(&[("rows", limit), ("start", offset)]),
            ApiFlavor::Explore => self
                .client
                .get(format!(
                    "{}/explore/v2.1/catalog/datasets/{}/records",
                    self.api_base, spec.remote_name
                ))
                .query(&[("limit", limit), ("offset", offset)])
                .query(&[("select", "*")]),
        };

        let response = request
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(PageFailure::Http)?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Err(PageFailure::OutOfRange);
        }
        let response = response.error_for_status().map_err(PageFailure::Http)?;
        let body: Value = response.json().await.map_err(PageFailure::Http)?;
        Ok(parse_page(body))
    }
}

/// Both response shapes are read tolerantly: `total_count`/`results` from
/// the explore variant, `nhits`/`records` from the search variant.
fn parse_page(body: Value) -> Page {
    let total = body
        .get("total_count")
        .or_else(|| body.get("nhits"))
        .and_then(Value::as_u64)
        .map(|n| n as usize);
    let records = body
        .get("results")
        .or_else(|| body.get("records"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .cloned()
                .map(RawRecord::from_object)
                .collect()
        })
        .unwrap_or_default();
    Page { total, records }
}
