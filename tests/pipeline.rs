//! End-to-end pipeline tests driving the query service against a stub
//! similarity backend replaying canned SemSimian responses.

use async_trait::async_trait;
use semsim_kp::constraints::check_attributes;
use semsim_kp::error::{Result, SemsimKpError};
use semsim_kp::logging::QueryLog;
use semsim_kp::model::ReasonerRequest;
use semsim_kp::pipeline::QueryService;
use semsim_kp::similarity::{SemsimSearchCategory, SimilaritySearch, clamp_result_limit};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

const SET_ID: &str = "UUID:4403ddf2-f724-4b3b-a877-de08315b784f";
const APNEA: &str = "HP:0002104";
const FATIGUE: &str = "HP:0012378";

/// Stub backend replaying canned records, recording the outbound limit.
struct StubSimilarity {
    records: Vec<Value>,
    last_limit: Arc<Mutex<Option<usize>>>,
}

#[async_trait]
impl SimilaritySearch for StubSimilarity {
    async fn search(
        &self,
        _query_terms: &[String],
        _group: SemsimSearchCategory,
        result_limit: i64,
    ) -> Result<Vec<Value>> {
        *self.last_limit.lock().unwrap() = Some(clamp_result_limit(result_limit));
        Ok(self.records.clone())
    }
}

struct FailingSimilarity;

#[async_trait]
impl SimilaritySearch for FailingSimilarity {
    async fn search(
        &self,
        _query_terms: &[String],
        _group: SemsimSearchCategory,
        _result_limit: i64,
    ) -> Result<Vec<Value>> {
        Err(SemsimKpError::Similarity {
            message: "SemSimian at Url: 'http://stub' returned HTTP error code: '500'".to_string(),
        })
    }
}

fn object_match(source: &str, target: &str, score: f64, ancestor: &str) -> Value {
    json!({
        "match_source": source,
        "match_source_label": format!("{} (HPO)", source),
        "match_target": target,
        "match_target_label": format!("{} (HPO)", target),
        "score": score,
        "similarity": {"ancestor_id": ancestor}
    })
}

fn canned_records() -> Vec<Value> {
    vec![
        json!({
            "subject": {
                "id": "MONDO:0008807",
                "name": "obsolete apnea, central sleep",
                "category": "biolink:Disease",
                "provided_by": "phenio_nodes"
            },
            "score": 13.074943444390097,
            "similarity": {
                "object_best_matches": {
                    FATIGUE: object_match(FATIGUE, "HP:0001699", 11.262698011936202, "HP:0025142"),
                    APNEA: object_match(APNEA, APNEA, 16.60564375324628, ""),
                }
            }
        }),
        json!({
            "subject": {
                "id": "MONDO:0015317",
                "name": "laryngomalacia",
                "category": "biolink:Disease",
                "provided_by": "phenio_nodes"
            },
            "score": 9.5,
            "similarity": {
                "object_best_matches": {
                    APNEA: object_match(APNEA, APNEA, 9.5, ""),
                }
            }
        }),
    ]
}

fn service_with(records: Vec<Value>) -> (Arc<QueryService>, Arc<Mutex<Option<usize>>>) {
    let last_limit = Arc::new(Mutex::new(None));
    let stub = StubSimilarity {
        records,
        last_limit: last_limit.clone(),
    };
    let service = QueryService::new(
        Arc::new(stub),
        Arc::new(QueryLog::new()),
        "infores:monarchinitiative".to_string(),
        10,
    );
    (Arc::new(service), last_limit)
}

fn mcq_request(set_interpretation: &str, limit: Value) -> ReasonerRequest {
    let request = json!({
        "message": {
            "query_graph": {
                "nodes": {
                    "phenotypes": {
                        "ids": [SET_ID],
                        "categories": ["biolink:PhenotypicFeature"],
                        "is_set": true,
                        "set_interpretation": set_interpretation,
                        "member_ids": [APNEA, FATIGUE]
                    },
                    "diseases": {
                        "categories": ["biolink:Disease"]
                    }
                },
                "edges": {
                    "e01": {
                        "subject": "phenotypes",
                        "object": "diseases",
                        "predicates": ["biolink:similar_to"]
                    }
                }
            }
        },
        "limit": limit
    });
    serde_json::from_value(request).expect("request fixture should deserialize")
}

#[tokio::test]
async fn two_term_many_query_builds_the_expected_graph() {
    let (service, _) = service_with(canned_records());
    let outcome = service.answer(mcq_request("MANY", json!(5))).await;
    assert!(outcome.ok, "MANY query should succeed");

    let message = outcome.response.message;
    let kg = message.knowledge_graph.expect("knowledge graph expected");

    for node_id in [SET_ID, APNEA, FATIGUE, "MONDO:0008807"] {
        assert!(kg.nodes.contains_key(node_id), "missing node {}", node_id);
    }

    let member_of: Vec<_> = kg
        .edges
        .values()
        .filter(|e| e.predicate == "biolink:member_of")
        .collect();
    assert_eq!(member_of.len(), 2);

    let answer = kg
        .edges
        .iter()
        .find(|(_, e)| {
            e.predicate == "biolink:similar_to"
                && e.subject == "MONDO:0008807"
                && e.object == SET_ID
        })
        .map(|(edge_id, _)| edge_id.clone())
        .expect("answer edge expected");
    let support_graph_id = format!("sg-{}", answer);

    let auxiliary_graphs = message.auxiliary_graphs.expect("auxiliary graphs expected");
    let support_graph = &auxiliary_graphs[&support_graph_id];
    let support_predicates: Vec<_> = support_graph
        .edges
        .iter()
        .map(|edge_id| kg.edges[edge_id].predicate.as_str())
        .collect();
    assert!(support_predicates.contains(&"biolink:similar_to"));
    assert!(support_predicates.contains(&"biolink:has_phenotype"));
    assert!(support_predicates.contains(&"biolink:member_of"));

    // The phenio_nodes provided_by alias lands on the candidate node
    assert_eq!(
        kg.nodes["MONDO:0008807"].provided_by,
        Some(vec!["infores:upheno".to_string()])
    );

    let results = message.results.expect("results expected");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].node_bindings["phenotypes"][0].id, SET_ID);

    let logs = message.logs.expect("query log expected in the response");
    assert!(
        logs.iter()
            .any(|entry| entry.message.contains("TRAPI query answering")),
        "query log should capture the inbound query graph"
    );
}

#[tokio::test]
async fn all_interpretation_drops_partial_candidates_end_to_end() {
    let (service, _) = service_with(canned_records());
    let outcome = service.answer(mcq_request("ALL", json!(5))).await;
    assert!(outcome.ok);

    let message = outcome.response.message;
    let kg = message.knowledge_graph.unwrap();
    assert!(!kg.nodes.contains_key("MONDO:0015317"));
    assert!(
        kg.edges
            .values()
            .all(|e| e.subject != "MONDO:0015317" && e.object != "MONDO:0015317")
    );
    let results = message.results.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].node_bindings["diseases"][0].id, "MONDO:0008807");
}

#[tokio::test]
async fn out_of_range_limit_is_coerced_to_the_upstream_maximum() {
    let (service, last_limit) = service_with(canned_records());
    let outcome = service.answer(mcq_request("MANY", json!(0))).await;
    assert!(outcome.ok);
    assert_eq!(*last_limit.lock().unwrap(), Some(50));
}

#[tokio::test]
async fn non_numeric_limit_falls_back_to_the_default() {
    let (service, last_limit) = service_with(canned_records());
    let outcome = service
        .answer(mcq_request("MANY", json!("not-a-number")))
        .await;
    assert!(outcome.ok);
    assert_eq!(*last_limit.lock().unwrap(), Some(10));
    let logs = outcome.response.message.logs.unwrap();
    assert!(
        logs.iter()
            .any(|entry| entry.message.contains("Invalid result limit")),
        "fallback should be logged"
    );
}

#[tokio::test]
async fn unsatisfiable_node_constraint_empties_results_only() {
    let (service, _) = service_with(canned_records());
    let mut request = mcq_request("MANY", json!(5));
    let query_graph = request.message.query_graph.as_mut().unwrap();
    query_graph
        .nodes
        .get_mut("diseases")
        .unwrap()
        .constraints = serde_json::from_value(json!([
        {
            "id": "biolink:p_value",
            "name": "p_value",
            "operator": "<",
            "value": 0.05
        }
    ]))
    .unwrap();

    let outcome = service.answer(request).await;
    assert!(outcome.ok);
    let message = outcome.response.message;
    let kg = message.knowledge_graph.unwrap();
    assert_eq!(
        message.results.unwrap().len(),
        0,
        "no candidate satisfies the constraint"
    );
    // Unbound graph content survives the filter
    assert!(kg.nodes.contains_key(SET_ID));
    assert!(kg.nodes.contains_key(APNEA));
    assert!(
        kg.edges
            .values()
            .any(|e| e.predicate == "biolink:member_of")
    );
    // Constrained candidates and their incident edges are gone
    assert!(!kg.nodes.contains_key("MONDO:0008807"));

    // No auxiliary graph may reference a filtered edge
    if let Some(auxiliary_graphs) = message.auxiliary_graphs {
        for (graph_id, graph) in auxiliary_graphs {
            for edge_id in &graph.edges {
                assert!(
                    kg.edges.contains_key(edge_id),
                    "auxiliary graph {} references filtered edge {}",
                    graph_id,
                    edge_id
                );
            }
        }
    }
}

#[tokio::test]
async fn satisfied_edge_constraints_round_trip() {
    let (service, _) = service_with(canned_records());
    let mut request = mcq_request("MANY", json!(5));
    let constraints = serde_json::from_value(json!([
        {
            "id": "biolink:agent_type",
            "name": "agent_type",
            "operator": "==",
            "value": "automated_agent"
        }
    ]))
    .unwrap();
    request
        .message
        .query_graph
        .as_mut()
        .unwrap()
        .edges
        .get_mut("e01")
        .unwrap()
        .attribute_constraints = constraints;

    let outcome = service.answer(request).await;
    assert!(outcome.ok);
    let message = outcome.response.message;
    let results = message.results.unwrap();
    assert!(!results.is_empty(), "passing constraint keeps results");

    // Every edge still bound in the output passes its constraint
    let kg = message.knowledge_graph.unwrap();
    let query_graph = message.query_graph.unwrap();
    let edge_constraints = &query_graph.edges["e01"].attribute_constraints;
    for result in &results {
        for analysis in &result.analyses {
            for binding in &analysis.edge_bindings["e01"] {
                let edge = &kg.edges[&binding.id];
                assert!(check_attributes(edge_constraints, &edge.attributes).unwrap());
            }
        }
    }
}

#[tokio::test]
async fn unbound_query_graph_is_rejected_with_a_description() {
    let (service, _) = service_with(canned_records());
    let mut request = mcq_request("MANY", json!(5));
    request
        .message
        .query_graph
        .as_mut()
        .unwrap()
        .nodes
        .get_mut("phenotypes")
        .unwrap()
        .ids = None;

    let outcome = service.answer(request).await;
    assert!(!outcome.ok, "unbound lookup query must be rejected");
    assert!(
        outcome
            .response
            .description
            .as_deref()
            .unwrap_or_default()
            .contains("Query graph should contain at least one bound node."),
        "description: {:?}",
        outcome.response.description
    );
}

#[tokio::test]
async fn similarity_failure_surfaces_description_and_logs() {
    let service = QueryService::new(
        Arc::new(FailingSimilarity),
        Arc::new(QueryLog::new()),
        "infores:monarchinitiative".to_string(),
        10,
    );
    let outcome = service.answer(mcq_request("MANY", json!(5))).await;
    assert!(!outcome.ok);
    let description = outcome.response.description.unwrap();
    assert!(description.contains("returned HTTP error code"));
    let logs = outcome.response.message.logs.unwrap();
    assert!(
        logs.iter().any(|entry| entry
            .message
            .contains("returned HTTP error code")),
        "the upstream failure should be in the query log"
    );
}

#[tokio::test]
async fn non_lookup_workflow_passes_the_message_through() {
    let (service, last_limit) = service_with(canned_records());
    let mut request = mcq_request("MANY", json!(5));
    request.workflow = serde_json::from_value(json!([{"id": "overlay"}])).unwrap();

    let outcome = service.answer(request).await;
    assert!(outcome.ok);
    assert!(outcome.response.message.knowledge_graph.is_none());
    assert!(
        last_limit.lock().unwrap().is_none(),
        "no upstream call for non-lookup workflows"
    );
}

#[tokio::test]
async fn default_workflow_is_lookup() {
    let (service, last_limit) = service_with(canned_records());
    let mut request = mcq_request("MANY", json!(5));
    request.workflow = None;

    let outcome = service.answer(request).await;
    assert!(outcome.ok);
    let workflow = outcome.response.workflow.unwrap();
    assert_eq!(workflow.len(), 1);
    assert_eq!(workflow[0].id, "lookup");
    assert!(last_limit.lock().unwrap().is_some(), "lookup ran");
}
