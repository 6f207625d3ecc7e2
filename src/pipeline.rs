//! Per-query pipeline: interpret the query graph, call the similarity
//! backend, assemble the TRAPI response, decorate attributes, and apply
//! constraints.
//!
//! Each query runs sequentially through
//! Received -> Validated -> SimilarityCalled -> Parsed -> Assembled ->
//! Filtered -> Emitted; any failure short-circuits to an error response
//! carrying a description and the query-scoped log.

use crate::attributes::transform_attributes;
use crate::assemble::build_message;
use crate::constraints::apply_attribute_constraints;
use crate::error::{Result, SemsimKpError};
use crate::logging::QueryLog;
use crate::model::{Message, ReasonerRequest, WorkflowStep};
use crate::query::{interpret, validate_query_graph};
use crate::similarity::{
    INGEST_KNOWLEDGE_SOURCE, MATCH_PREDICATE, PRIMARY_KNOWLEDGE_SOURCE, SemsimSearchCategory,
    SimilaritySearch,
};
use crate::similarity::records::{QueryResult, parse_records};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome handed back to the HTTP gateway: the response envelope plus
/// whether it should go out as a client error.
pub struct AnswerOutcome {
    pub ok: bool,
    pub response: ReasonerRequest,
}

/// Query-answering service shared across request tasks. All state is
/// immutable apart from the query log, which is internally synchronized.
pub struct QueryService {
    similarity: Arc<dyn SimilaritySearch>,
    query_log: Arc<QueryLog>,
    provenance: String,
    default_result_limit: usize,
}

impl QueryService {
    pub fn new(
        similarity: Arc<dyn SimilaritySearch>,
        query_log: Arc<QueryLog>,
        provenance: String,
        default_result_limit: usize,
    ) -> Self {
        Self {
            similarity,
            query_log,
            provenance,
            default_result_limit,
        }
    }

    pub fn query_log(&self) -> &QueryLog {
        &self.query_log
    }

    /// Parse the application-specific top-level `limit` extension,
    /// falling back to the default on anything non-integer.
    fn result_limit(&self, limit: Option<&Value>, query_id: Uuid) -> i64 {
        match limit {
            None | Some(Value::Null) => self.default_result_limit as i64,
            Some(value) => {
                let parsed = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                parsed.unwrap_or_else(|| {
                    self.query_log.warning(
                        Some(query_id),
                        &format!(
                            "Invalid result limit '{}' in TRAPI Query JSON. \
                             Setting to default {} value.",
                            value, self.default_result_limit
                        ),
                    );
                    self.default_result_limit as i64
                })
            }
        }
    }

    /// Answer one TRAPI request. The response is the request echoed back
    /// with the message completed (or a `description` on failure).
    pub async fn answer(&self, mut request: ReasonerRequest) -> AnswerOutcome {
        let query_id = Uuid::new_v4();

        let workflow = request
            .workflow
            .clone()
            .filter(|w| !w.is_empty())
            .unwrap_or_else(|| vec![WorkflowStep::lookup()]);
        let is_lookup = workflow.iter().any(|step| step.id == "lookup");
        request.workflow = Some(workflow);

        if !is_lookup {
            return AnswerOutcome {
                ok: true,
                response: request,
            };
        }

        let result_limit = self.result_limit(request.limit.as_ref(), query_id);
        match self.run_lookup(&mut request.message, result_limit, query_id).await {
            Ok(()) => {
                request.message.logs = Some(self.query_log.take_logs(query_id));
                AnswerOutcome {
                    ok: true,
                    response: request,
                }
            }
            Err(e) => {
                self.query_log.error(Some(query_id), &e.to_string());
                request.message.logs = Some(self.query_log.take_logs(query_id));
                request.description = Some(e.description());
                AnswerOutcome {
                    ok: false,
                    response: request,
                }
            }
        }
    }

    async fn run_lookup(
        &self,
        message: &mut Message,
        result_limit: i64,
        query_id: Uuid,
    ) -> Result<()> {
        let query_graph = message
            .query_graph
            .as_ref()
            .ok_or_else(|| SemsimKpError::Validation {
                message: "Query graph should contain at least one bound node.".to_string(),
            })?;

        validate_query_graph(query_graph, true)?;
        let params = interpret(query_graph)?;
        self.query_log.info(
            Some(query_id),
            &format!(
                "TRAPI query answering query_graph: {}",
                serde_json::to_string(query_graph)?
            ),
        );

        let start = std::time::Instant::now();
        let raw_records = self
            .similarity
            .search(
                &params.query_terms,
                SemsimSearchCategory::Mondo,
                result_limit,
            )
            .await?;
        self.query_log.info(
            Some(query_id),
            &format!(
                "SemSimian query took {:.3} seconds",
                start.elapsed().as_secs_f64()
            ),
        );

        let result_map = parse_records(&raw_records, &params.category, &self.query_log, query_id);
        if result_map.is_empty() {
            self.query_log.warning(
                Some(query_id),
                "SemSimian search returned no candidate matches",
            );
        }
        let result = QueryResult {
            set_interpretation: params.set_interpretation,
            set_identifier: params.set_identifier.clone(),
            query_terms: params.query_terms.clone(),
            query_term_category: params.category.clone(),
            primary_knowledge_source: PRIMARY_KNOWLEDGE_SOURCE.to_string(),
            ingest_knowledge_source: INGEST_KNOWLEDGE_SOURCE.to_string(),
            match_predicate: MATCH_PREDICATE.to_string(),
            result_map,
        };

        let assembled = build_message(
            &result,
            &params,
            &self.provenance,
            &self.query_log,
            query_id,
        );
        message.knowledge_graph = Some(assembled.knowledge_graph);
        message.auxiliary_graphs = Some(assembled.auxiliary_graphs);
        message.results = Some(assembled.results);

        transform_attributes(message, &self.provenance);
        apply_attribute_constraints(message, &self.query_log, query_id)?;

        Ok(())
    }
}
