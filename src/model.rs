//! TRAPI message data model.
//!
//! Serde structs for the reasoner request/response envelope, the query
//! graph, the knowledge graph, auxiliary graphs and result bindings.
//! Maps are `BTreeMap` so serialized key order is stable: edge keys are
//! zero-padded (`e0001`, ...) and therefore sort in allocation order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Top-level TRAPI request/response envelope.
///
/// The response is the request echoed back with the message filled in,
/// so unknown caller-supplied fields are preserved through `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonerRequest {
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Vec<WorkflowStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl WorkflowStep {
    pub fn lookup() -> Self {
        WorkflowStep {
            id: "lookup".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_graph: Option<QueryGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_graph: Option<KnowledgeGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auxiliary_graphs: Option<BTreeMap<String, AuxiliaryGraph>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ResultBinding>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogEntry>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryGraph {
    #[serde(default)]
    pub nodes: BTreeMap<String, QNode>,
    #[serde(default)]
    pub edges: BTreeMap<String, QEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_set: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_interpretation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<AttributeConstraint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicates: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_constraints: Vec<AttributeConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier_constraints: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub nodes: BTreeMap<String, KgNode>,
    #[serde(default)]
    pub edges: BTreeMap<String, KgEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KgNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_set: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KgEdge {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifiers: Option<Vec<Qualifier>>,
}

/// Edge provenance entry. `source_record_urls` and `upstream_resource_ids`
/// serialize as explicit nulls, matching the wire form consumers expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub resource_id: String,
    pub resource_role: String,
    #[serde(default)]
    pub source_record_urls: Option<Vec<String>>,
    #[serde(default)]
    pub upstream_resource_ids: Option<Vec<String>>,
}

impl SourceEntry {
    pub fn new(resource_id: impl Into<String>, resource_role: impl Into<String>) -> Self {
        SourceEntry {
            resource_id: resource_id.into(),
            resource_role: resource_role.into(),
            source_record_urls: None,
            upstream_resource_ids: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_attribute_name: Option<String>,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_source: Option<String>,
}

impl Attribute {
    /// Minimal attribute with only a type id and value.
    pub fn tagged(attribute_type_id: impl Into<String>, value: Value) -> Self {
        Attribute {
            attribute_type_id: attribute_type_id.into(),
            original_attribute_name: None,
            value,
            value_type_id: None,
            attribute_source: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qualifier {
    pub qualifier_type_id: String,
    pub qualifier_value: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuxiliaryGraph {
    pub edges: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBinding {
    pub node_bindings: BTreeMap<String, Vec<NodeBinding>>,
    pub analyses: Vec<Analysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBinding {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub resource_id: String,
    #[serde(default)]
    pub edge_bindings: BTreeMap<String, Vec<EdgeBinding>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeBinding {
    pub id: String,
}

/// TRAPI attribute constraint attached to a query node or edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeConstraint {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub operator: ConstraintOperator,
    pub value: Value,
    #[serde(default)]
    pub negated: bool,
}

/// Closed set of TRAPI constraint operator tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOperator {
    #[serde(rename = "==")]
    EqualTo,
    #[serde(rename = "===")]
    DeepEqualTo,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "matches")]
    Matches,
}

/// Per-query log record surfaced in `message.logs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constraint_operator_tokens_round_trip() {
        for (token, op) in [
            ("==", ConstraintOperator::EqualTo),
            ("===", ConstraintOperator::DeepEqualTo),
            (">", ConstraintOperator::GreaterThan),
            ("<", ConstraintOperator::LessThan),
            ("matches", ConstraintOperator::Matches),
        ] {
            let parsed: ConstraintOperator =
                serde_json::from_value(json!(token)).expect("operator token should parse");
            assert_eq!(parsed, op);
            assert_eq!(serde_json::to_value(op).unwrap(), json!(token));
        }
    }

    #[test]
    fn source_entry_serializes_explicit_nulls() {
        let entry = SourceEntry::new("infores:semsimian-kp", "primary_knowledge_source");
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("source_record_urls").unwrap().is_null());
        assert!(value.get("upstream_resource_ids").unwrap().is_null());
    }

    #[test]
    fn unknown_envelope_fields_survive_round_trip() {
        let raw = json!({
            "message": {},
            "submitter": "ars",
            "limit": 5
        });
        let request: ReasonerRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(request.extra.get("submitter"), Some(&json!("ars")));
        let back = serde_json::to_value(&request).unwrap();
        assert_eq!(back.get("submitter"), Some(&json!("ars")));
    }
}
