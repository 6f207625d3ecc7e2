//! Query-graph validation and multi-CURIE (MCQ) parameter extraction.

use crate::categories;
use crate::error::{Result, SemsimKpError};
use crate::model::{QNode, QueryGraph};
use crate::similarity::records::SetInterpretation;

/// Everything extracted from a valid MCQ lookup query graph.
#[derive(Debug, Clone)]
pub struct McqParameters {
    pub qnode_subject_key: String,
    pub qnode_object_key: String,
    pub qedge_key: String,
    pub set_interpretation: SetInterpretation,
    pub set_identifier: String,
    pub query_terms: Vec<String>,
    pub category: String,
}

fn validation_error(message: impl Into<String>) -> SemsimKpError {
    SemsimKpError::Validation {
        message: message.into(),
    }
}

/// Validate the query graph of a lookup request: at least one bound
/// node, and every edge referencing defined node keys. Edges with unset
/// endpoints are rejected outright.
pub fn validate_query_graph(query_graph: &QueryGraph, is_lookup: bool) -> Result<()> {
    if is_lookup {
        let has_bound_node = query_graph
            .nodes
            .values()
            .any(|node| node.ids.as_ref().is_some_and(|ids| !ids.is_empty()));
        if !has_bound_node {
            return Err(validation_error(
                "Query graph should contain at least one bound node.",
            ));
        }
    }

    for (qedge_key, edge) in &query_graph.edges {
        let (Some(subject), Some(object)) = (&edge.subject, &edge.object) else {
            return Err(validation_error(format!(
                "Query graph edge {} must define both subject and object node keys.",
                qedge_key
            )));
        };
        for node_key in [subject, object] {
            if !query_graph.nodes.contains_key(node_key) {
                return Err(validation_error(format!(
                    "Query graph edge {} references missing node key {} \
                     in message.query_graph.nodes .",
                    qedge_key, node_key
                )));
            }
        }
    }

    Ok(())
}

/// A node declares MCQ intent when it is flagged as a set with a
/// set interpretation; the remaining MCQ subject conditions are then
/// mandatory rather than a reason to treat it as an ordinary node.
fn declares_mcq_intent(node: &QNode) -> bool {
    node.is_set == Some(true) && node.set_interpretation.is_some()
}

fn mcq_subject_conditions(qnode_key: &str, node: &QNode) -> Result<(SetInterpretation, String)> {
    let interpretation_token = node.set_interpretation.as_deref().unwrap_or_default();
    let set_interpretation = SetInterpretation::parse(interpretation_token).ok_or_else(|| {
        validation_error(format!(
            "MCQ subject node {} has set_interpretation '{}'; expected MANY or ALL.",
            qnode_key, interpretation_token
        ))
    })?;

    let ids = node.ids.as_deref().unwrap_or_default();
    if ids.len() != 1 {
        return Err(validation_error(format!(
            "MCQ subject node {} must carry exactly one set identifier, found {}.",
            qnode_key,
            ids.len()
        )));
    }
    let set_identifier = ids[0].clone();
    if !set_identifier.to_lowercase().starts_with("uuid:") {
        return Err(validation_error(format!(
            "MCQ subject node {} set identifier '{}' lacks the UUID: prefix.",
            qnode_key, set_identifier
        )));
    }

    if node.member_ids.as_ref().is_none_or(|m| m.is_empty()) {
        return Err(validation_error(format!(
            "MCQ subject node {} must declare a non-empty member_ids list.",
            qnode_key
        )));
    }

    Ok((set_interpretation, set_identifier))
}

/// True iff the node fully qualifies as an MCQ subject node.
pub fn is_mcq_subject_qnode(node: &QNode) -> bool {
    declares_mcq_intent(node) && mcq_subject_conditions("", node).is_ok()
}

/// Locate the MCQ subject node and extract the query parameters.
///
/// The subject qnode key falls back to "n0" and the object key to "n1"
/// when the graph does not supply distinct keys; the edge key is the
/// query's single QEdge.
pub fn interpret(query_graph: &QueryGraph) -> Result<McqParameters> {
    let mut subject: Option<(String, SetInterpretation, String, Vec<String>, String)> = None;
    let mut qnode_object_key = "n1".to_string();

    for (qnode_key, node) in &query_graph.nodes {
        if declares_mcq_intent(node) {
            let (set_interpretation, set_identifier) = mcq_subject_conditions(qnode_key, node)?;
            let query_terms = node.member_ids.clone().unwrap_or_default();
            let category = node
                .categories
                .as_ref()
                .and_then(|c| c.first())
                .cloned()
                .unwrap_or_else(|| categories::NAMED_THING.to_string());
            subject = Some((
                qnode_key.clone(),
                set_interpretation,
                set_identifier,
                query_terms,
                category,
            ));
        } else {
            qnode_object_key = qnode_key.clone();
        }
    }

    let Some((qnode_subject_key, set_interpretation, set_identifier, query_terms, category)) =
        subject
    else {
        return Err(validation_error(
            "Current query graph is missing a properly formulated \
             subject node with query terms for a multi-CURIE query",
        ));
    };

    let qedge_key = query_graph
        .edges
        .keys()
        .next()
        .cloned()
        .unwrap_or_else(|| "e01".to_string());

    Ok(McqParameters {
        qnode_subject_key,
        qnode_object_key,
        qedge_key,
        set_interpretation,
        set_identifier,
        query_terms,
        category,
    })
}
