//! Assembly of the TRAPI response body for one multi-CURIE query:
//! knowledge-graph nodes and edges, per-answer auxiliary support graphs,
//! and result bindings.
//!
//! The assembled statement set represents a 'meta' S-P-O assertion like
//!
//! ```text
//! (UUID:... : biolink:PhenotypicFeature)
//!     --[biolink:similar_to]-> (MONDO:... : biolink:Disease)
//! ```
//!
//! where the UUID designates the set of input terms. Each answer edge is
//! justified by a support graph holding the pairwise term-match edges,
//! the candidate-association edges, and the set-membership edges of the
//! matched input terms.

pub mod edge_ids;
pub mod sources;

use crate::categories;
use crate::logging::QueryLog;
use crate::model::{
    Analysis, Attribute, AuxiliaryGraph, EdgeBinding, KgEdge, KgNode, KnowledgeGraph, NodeBinding,
    ResultBinding, SourceEntry,
};
use crate::query::McqParameters;
use crate::similarity::records::{QueryResult, SetInterpretation, TermMatch, dedup_insert};
use edge_ids::EdgeIdAllocator;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

// Synthetic 'original_attribute_name' markers for SemSimian attributes
const AGGREGATE_SIMILARITY_SCORE: &str = "semsimian:score";
const MATCH_TERM_SCORE: &str = "semsimian:object_best_matches.*.score";
const MATCH_TERM: &str = "semsimian:object_best_matches.*.similarity.ancestor_id";

// ECO code for 'author statement supported by traceable reference
// used in manual assertion'
const EVIDENCE_CODE: &str = "ECO:0000304";

/// Provenance of the set node and its membership edges: the caller's
/// user interface defined the set, not this service.
const USER_INTERFACE_PROVENANCE: &str = "infores:user-interface";

const SIMILAR_TO: &str = "biolink:similar_to";
const MEMBER_OF: &str = "biolink:member_of";

/// Knowledge graph, auxiliary graphs and results for one query.
#[derive(Debug, Default)]
pub struct AssembledMessage {
    pub knowledge_graph: KnowledgeGraph,
    pub auxiliary_graphs: BTreeMap<String, AuxiliaryGraph>,
    pub results: Vec<ResultBinding>,
}

fn agent_and_level(agent_type: &str) -> [Attribute; 2] {
    [
        Attribute::tagged("biolink:agent_type", json!(agent_type)),
        Attribute::tagged("biolink:knowledge_level", json!("knowledge_assertion")),
    ]
}

fn float_attribute(
    attribute_type_id: &str,
    original_name: &str,
    value: f64,
    source: &str,
) -> Attribute {
    Attribute {
        attribute_type_id: attribute_type_id.to_string(),
        original_attribute_name: Some(original_name.to_string()),
        value: json!(value),
        value_type_id: Some("linkml:Float".to_string()),
        attribute_source: Some(source.to_string()),
    }
}

/// Build the response message body from the parsed similarity result.
///
/// Edge ids are allocated in a fixed order (membership edges, then
/// candidates in result-map order, then per-candidate support edges in
/// cache insertion order) so identical inputs produce identical output.
pub fn build_message(
    result: &QueryResult,
    params: &McqParameters,
    provenance: &str,
    query_log: &QueryLog,
    query_id: Uuid,
) -> AssembledMessage {
    let mut edge_ids = EdgeIdAllocator::new();
    edge_ids.reset();

    let mut message = AssembledMessage::default();
    let nodes = &mut message.knowledge_graph.nodes;
    let edges = &mut message.knowledge_graph.edges;

    let set_categories = categories::expand(&result.query_term_category);

    // Shared provenance stub for answer and match edges; the candidate's
    // own provided_by joins as an extra supporting source per candidate.
    let common_sources = vec![
        SourceEntry::new(&result.primary_knowledge_source, "primary_knowledge_source"),
        SourceEntry::new(&result.ingest_knowledge_source, "supporting_data_source"),
    ];

    // A node object representing the input query term set, identified by
    // its UUID, with `member_of` edges connecting each member to it.
    nodes.insert(
        result.set_identifier.clone(),
        KgNode {
            name: None,
            categories: set_categories.clone(),
            is_set: Some(true),
            members: Some(result.query_terms.clone()),
            provided_by: Some(vec![USER_INTERFACE_PROVENANCE.to_string()]),
            attributes: Vec::new(),
        },
    );

    let mut membership_edges: HashMap<String, String> = HashMap::new();
    for term_id in &result.query_terms {
        nodes.insert(
            term_id.clone(),
            KgNode {
                name: None,
                categories: set_categories.clone(),
                is_set: Some(false),
                members: None,
                provided_by: Some(vec![USER_INTERFACE_PROVENANCE.to_string()]),
                attributes: Vec::new(),
            },
        );

        let member_edge_id = edge_ids.next_id();
        edges.insert(
            member_edge_id.clone(),
            KgEdge {
                subject: term_id.clone(),
                predicate: MEMBER_OF.to_string(),
                object: result.set_identifier.clone(),
                sources: vec![SourceEntry::new(
                    USER_INTERFACE_PROVENANCE,
                    "primary_knowledge_source",
                )],
                attributes: agent_and_level("manual_agent").to_vec(),
                qualifiers: None,
            },
        );
        membership_edges.insert(term_id.clone(), member_edge_id);
    }

    let query_term_set: HashSet<&str> = result.query_terms.iter().map(String::as_str).collect();

    for (candidate_id, entry) in &result.result_map {
        // Per-candidate term-match cache: one match per associated term,
        // higher score winning, plus the set of input terms observed.
        let mut cache: Vec<TermMatch> = Vec::new();
        for term_match in &entry.matches {
            dedup_insert(&mut cache, term_match.clone());
        }
        let observed: HashSet<&str> = cache
            .iter()
            .map(|m| m.object_id.as_str())
            .filter(|id| query_term_set.contains(id))
            .collect();

        if result.set_interpretation == SetInterpretation::All
            && observed.len() < query_term_set.len()
        {
            query_log.debug(
                Some(query_id),
                &format!(
                    "Candidate '{}' matched {} of {} input terms; \
                     dropped under ALL set interpretation",
                    candidate_id,
                    observed.len(),
                    query_term_set.len()
                ),
            );
            continue;
        }

        // The primary answer node matched, e.g. the identified disease
        if !nodes.contains_key(candidate_id) {
            let category = entry
                .category
                .clone()
                .unwrap_or_else(|| categories::NAMED_THING.to_string());
            nodes.insert(
                candidate_id.clone(),
                KgNode {
                    name: entry.name.clone(),
                    categories: categories::expand(&category),
                    is_set: Some(false),
                    members: None,
                    provided_by: entry.provided_by.clone().map(|p| vec![p]),
                    attributes: Vec::new(),
                },
            );
        }

        let mut answer_sources = common_sources.clone();
        if let Some(provided_by) = &entry.provided_by {
            answer_sources.push(SourceEntry::new(provided_by, "supporting_data_source"));
        }

        // The core similarity 'answer' edge:
        // "Candidate--[similar_to]->Query_Term_Set"
        let answer_edge_id = edge_ids.next_id();
        let support_graph_id = format!("sg-{}", answer_edge_id);
        let mut support_edges: Vec<String> = Vec::new();

        let mut answer_attributes = vec![
            float_attribute(
                "biolink:score",
                AGGREGATE_SIMILARITY_SCORE,
                entry.score,
                &result.primary_knowledge_source,
            ),
            Attribute {
                attribute_type_id: "biolink:support_graphs".to_string(),
                original_attribute_name: None,
                value: json!([support_graph_id]),
                value_type_id: Some("linkml:String".to_string()),
                attribute_source: Some(result.primary_knowledge_source.clone()),
            },
        ];
        answer_attributes.extend(agent_and_level("automated_agent"));
        edges.insert(
            answer_edge_id.clone(),
            KgEdge {
                subject: candidate_id.clone(),
                predicate: SIMILAR_TO.to_string(),
                object: result.set_identifier.clone(),
                sources: answer_sources.clone(),
                attributes: answer_attributes,
                qualifiers: None,
            },
        );

        for term_match in &cache {
            // Both ends of the pairwise match share the query category
            ensure_node(
                nodes,
                &term_match.subject_id,
                term_match.subject_name.as_deref(),
                &term_match.category,
            );
            ensure_node(
                nodes,
                &term_match.object_id,
                term_match.object_name.as_deref(),
                &term_match.category,
            );

            // "Match_Associated_Term--[similar_to]->Input_Query_Term",
            // one pairwise similarity assertion per associated term
            let match_to_input_edge_id = edge_ids.next_id();
            let mut match_attributes = vec![
                float_attribute(
                    "biolink:score",
                    MATCH_TERM_SCORE,
                    term_match.score,
                    &result.primary_knowledge_source,
                ),
                Attribute {
                    attribute_type_id: "biolink:match".to_string(),
                    original_attribute_name: Some(MATCH_TERM.to_string()),
                    value: json!(term_match.matched_term),
                    value_type_id: Some("linkml:Uriorcurie".to_string()),
                    attribute_source: Some(result.primary_knowledge_source.clone()),
                },
            ];
            match_attributes.extend(agent_and_level("automated_agent"));
            edges.insert(
                match_to_input_edge_id.clone(),
                KgEdge {
                    subject: term_match.subject_id.clone(),
                    predicate: SIMILAR_TO.to_string(),
                    object: term_match.object_id.clone(),
                    sources: answer_sources.clone(),
                    attributes: match_attributes,
                    qualifiers: None,
                },
            );

            // "Candidate--[<match_predicate>]->Associated_Term",
            // tying the associated term back to the candidate result
            let matched_term_edge_id = edge_ids.next_id();
            let mut evidence_attributes = vec![Attribute {
                attribute_type_id: "biolink:has_evidence".to_string(),
                original_attribute_name: None,
                value: json!(EVIDENCE_CODE),
                value_type_id: Some("linkml:Uriorcurie".to_string()),
                attribute_source: Some(result.ingest_knowledge_source.clone()),
            }];
            evidence_attributes.extend(agent_and_level("automated_agent"));
            edges.insert(
                matched_term_edge_id.clone(),
                KgEdge {
                    subject: candidate_id.clone(),
                    predicate: result.match_predicate.clone(),
                    object: term_match.subject_id.clone(),
                    sources: vec![SourceEntry::new(
                        &result.ingest_knowledge_source,
                        "primary_knowledge_source",
                    )],
                    attributes: evidence_attributes,
                    qualifiers: None,
                },
            );

            support_edges.push(match_to_input_edge_id);
            support_edges.push(matched_term_edge_id);
            // Every match links back to an input query term, so its set
            // membership edge joins the support graph as well.
            match membership_edges.get(&term_match.object_id) {
                Some(member_edge_id) => support_edges.push(member_edge_id.clone()),
                None => query_log.warning(
                    Some(query_id),
                    &format!(
                        "Match source '{}' for candidate '{}' is not an input query term?",
                        term_match.object_id, candidate_id
                    ),
                ),
            }
        }

        message.auxiliary_graphs.insert(
            support_graph_id,
            AuxiliaryGraph {
                edges: support_edges,
                attributes: Vec::new(),
            },
        );

        message.results.push(ResultBinding {
            node_bindings: BTreeMap::from([
                (
                    params.qnode_subject_key.clone(),
                    vec![NodeBinding {
                        id: result.set_identifier.clone(),
                    }],
                ),
                (
                    params.qnode_object_key.clone(),
                    vec![NodeBinding {
                        id: candidate_id.clone(),
                    }],
                ),
            ]),
            analyses: vec![Analysis {
                resource_id: provenance.to_string(),
                edge_bindings: BTreeMap::from([(
                    params.qedge_key.clone(),
                    vec![EdgeBinding {
                        id: answer_edge_id.clone(),
                    }],
                )]),
            }],
        });
    }

    message
}

/// Add a term node to the catalog if absent, back-filling a missing name
/// when a later match supplies a label for the same id.
fn ensure_node(
    nodes: &mut BTreeMap<String, KgNode>,
    node_id: &str,
    name: Option<&str>,
    category: &str,
) {
    match nodes.get_mut(node_id) {
        Some(existing) => {
            if existing.name.is_none()
                && let Some(name) = name
            {
                existing.name = Some(name.to_string());
            }
        }
        None => {
            nodes.insert(
                node_id.to_string(),
                KgNode {
                    name: name.map(str::to_string),
                    categories: categories::expand(category),
                    is_set: None,
                    members: None,
                    provided_by: None,
                    attributes: Vec::new(),
                },
            );
        }
    }
}
