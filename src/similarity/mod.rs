//! Client for the upstream SemSimian semantic-similarity search service.

pub mod records;

use crate::error::{Result, SemsimKpError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Provenance of the similarity assertions this service emits.
pub const PRIMARY_KNOWLEDGE_SOURCE: &str = "infores:semsimian-kp";
/// Curated source standing behind candidate-to-term associations.
pub const INGEST_KNOWLEDGE_SOURCE: &str = "infores:hpo-annotations";
/// Predicate linking a candidate concept to its associated terms.
pub const MATCH_PREDICATE: &str = "biolink:has_phenotype";

/// Upstream search groups, keyed by the id prefix of their members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemsimSearchCategory {
    Hgnc,
    Mgi,
    Rgd,
    Zfin,
    Wb,
    Mondo,
}

impl SemsimSearchCategory {
    /// Wire value expected by the SemSimian `group` request field.
    pub fn value(&self) -> &'static str {
        match self {
            SemsimSearchCategory::Hgnc => "Human Genes",
            SemsimSearchCategory::Mgi => "Mouse Genes",
            SemsimSearchCategory::Rgd => "Rat Genes",
            SemsimSearchCategory::Zfin => "Zebrafish Genes",
            SemsimSearchCategory::Wb => "C. Elegans Genes",
            SemsimSearchCategory::Mondo => "Human Diseases",
        }
    }
}

/// Coerce a caller-supplied result limit into the 1..=50 range the
/// upstream service accepts; anything outside collapses to the maximum.
pub fn clamp_result_limit(result_limit: i64) -> usize {
    if !(1..=50).contains(&result_limit) {
        50
    } else {
        result_limit as usize
    }
}

#[derive(Debug, Serialize)]
struct SemsimSearchRequest<'a> {
    termset: &'a [String],
    group: &'static str,
    directionality: &'static str,
    limit: usize,
}

/// Interface to the similarity search backend. The HTTP-backed
/// implementation is [`SemsimianClient`]; tests replay canned responses
/// through a stub implementation.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Run one termset search, returning the decoded list of raw
    /// SemSimian result records.
    async fn search(
        &self,
        query_terms: &[String],
        group: SemsimSearchCategory,
        result_limit: i64,
    ) -> Result<Vec<Value>>;
}

/// HTTP-backed SemSimian search client.
pub struct SemsimianClient {
    client: reqwest::Client,
    endpoint: String,
    timeout_ms: u64,
}

impl SemsimianClient {
    pub fn new(endpoint: String, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| SemsimKpError::Config {
                message: format!("Failed to build similarity HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            endpoint,
            timeout_ms,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SimilaritySearch for SemsimianClient {
    async fn search(
        &self,
        query_terms: &[String],
        group: SemsimSearchCategory,
        result_limit: i64,
    ) -> Result<Vec<Value>> {
        let limit = clamp_result_limit(result_limit);
        let body = SemsimSearchRequest {
            termset: query_terms,
            group: group.value(),
            directionality: "object_to_subject",
            limit,
        };
        tracing::debug!(
            "SemSimian search: endpoint={} group='{}' terms={} limit={}",
            self.endpoint,
            body.group,
            query_terms.len(),
            limit
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SemsimKpError::Timeout {
                        operation: "SemSimian search".to_string(),
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    SemsimKpError::from(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(SemsimKpError::Similarity {
                message: format!(
                    "SemSimian at Url: '{}', Query: '{{termset: {:?}, group: \"{}\", limit: {}}}' \
                     returned HTTP error code: '{}'",
                    self.endpoint,
                    query_terms,
                    group.value(),
                    limit,
                    response.status().as_u16()
                ),
            });
        }

        let decoded: Vec<Value> = response.json().await.map_err(|e| SemsimKpError::Similarity {
            message: format!("Failed to decode SemSimian response: {}", e),
        })?;
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped_into_upstream_range() {
        assert_eq!(clamp_result_limit(0), 50);
        assert_eq!(clamp_result_limit(-3), 50);
        assert_eq!(clamp_result_limit(51), 50);
        assert_eq!(clamp_result_limit(1), 1);
        assert_eq!(clamp_result_limit(50), 50);
        assert_eq!(clamp_result_limit(5), 5);
    }

    #[test]
    fn search_category_wire_values() {
        assert_eq!(SemsimSearchCategory::Mondo.value(), "Human Diseases");
        assert_eq!(SemsimSearchCategory::Hgnc.value(), "Human Genes");
    }
}
