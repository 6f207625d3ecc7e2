//! Canonical attribute decoration for knowledge-graph items: qualifier
//! lifting, skip-list pruning, value-type and attribute-type resolution,
//! and finalization of each edge's sources tree.

use crate::assemble::sources::construct_sources_tree;
use crate::model::{Attribute, KgEdge, KgNode, Message, Qualifier};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

/// Generic fallback data type for attribute values.
const GENERIC_DATA_TYPE: &str = "EDAM:data_0006";
/// Generic fallback attribute class.
const GENERIC_ATTRIBUTE: &str = "biolink:Attribute";

/// Attribute names never forwarded to the response.
const SKIP_LIST: &[&str] = &["knowledge_source", "relation", "pubs", "num_source_nodes"];

fn in_skip_list(attribute_name: &str) -> bool {
    SKIP_LIST.iter().any(|skipped| *skipped == attribute_name)
}

/// `original_attribute_name` to canonical value type.
static VALUE_TYPE_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("semsimian:score", "linkml:Float"),
        ("semsimian:object_best_matches.*.score", "linkml:Float"),
        (
            "semsimian:object_best_matches.*.similarity.ancestor_id",
            "linkml:Uriorcurie",
        ),
        ("publications", "linkml:Uriorcurie"),
        ("equivalent_identifiers", "metatype:uriorcurie"),
        ("p_value", "linkml:Float"),
    ])
});

/// `original_attribute_name` to canonical attribute type.
static ATTRIBUTE_TYPE_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("semsimian:score", "biolink:score"),
        ("semsimian:object_best_matches.*.score", "biolink:score"),
        (
            "semsimian:object_best_matches.*.similarity.ancestor_id",
            "biolink:match",
        ),
        ("publications", "biolink:publications"),
        ("equivalent_identifiers", "biolink:same_as"),
        ("p_value", "biolink:p_value"),
    ])
});

/// Slimmed-down Biolink Model slot registry used as the last-resort
/// lookup for attribute names, mirroring slot_uri/range resolution.
static BIOLINK_SLOTS: Lazy<HashMap<&'static str, (&'static str, Option<&'static str>)>> =
    Lazy::new(|| {
        HashMap::from([
            ("score", ("biolink:score", Some("linkml:Float"))),
            ("match", ("biolink:match", Some("linkml:Uriorcurie"))),
            (
                "has_evidence",
                ("biolink:has_evidence", Some("linkml:Uriorcurie")),
            ),
            ("agent_type", ("biolink:agent_type", None)),
            ("knowledge_level", ("biolink:knowledge_level", None)),
            (
                "publications",
                ("biolink:publications", Some("linkml:Uriorcurie")),
            ),
            ("provided_by", ("biolink:provided_by", None)),
            (
                "support_graphs",
                ("biolink:support_graphs", Some("linkml:String")),
            ),
            (
                "species_context_qualifier",
                ("biolink:species_context_qualifier", None),
            ),
            (
                "sex_qualifier",
                ("biolink:sex_qualifier", None),
            ),
        ])
    });

/// Resolve the canonical attribute/value type ids for an attribute name.
/// Returns `None` when the attribute should be dropped instead.
pub fn get_attribute_bl_info(attribute_name: &str) -> Option<(String, String)> {
    if in_skip_list(attribute_name) || matches!(attribute_name, "name" | "id") {
        return None;
    }

    let value_type = VALUE_TYPE_MAP
        .get(attribute_name)
        .copied()
        .unwrap_or(GENERIC_DATA_TYPE);
    if let Some(attribute_type) = ATTRIBUTE_TYPE_MAP.get(attribute_name) {
        return Some((attribute_type.to_string(), value_type.to_string()));
    }

    // Fall back to the model slots, trying the qualifier form as well
    let qualified = format!("{}_qualifier", attribute_name);
    if let Some((slot_uri, range)) = BIOLINK_SLOTS
        .get(attribute_name)
        .or_else(|| BIOLINK_SLOTS.get(qualified.as_str()))
    {
        return Some((slot_uri.to_string(), range.unwrap_or(value_type).to_string()));
    }

    Some((GENERIC_ATTRIBUTE.to_string(), value_type.to_string()))
}

const NODE_CORE_PROPS: &[&str] = &["name", "categories", "is_set", "members", "provided_by"];
const EDGE_CORE_PROPS: &[&str] = &["subject", "predicate", "object", "sources", "qualifiers"];

fn is_qualifier_name(name: &str) -> bool {
    name.contains("qualifie")
}

/// Normalize one attribute list in place: drop skip-listed and
/// core-duplicate entries, default the value type, and resolve missing
/// or placeholder attribute type ids.
fn format_attributes(attributes: Vec<Attribute>, core_props: &[&str]) -> Vec<Attribute> {
    let mut formatted: Vec<Attribute> = Vec::new();
    for mut attribute in attributes {
        if let Some(original_name) = attribute.original_attribute_name.as_deref() {
            if core_props.iter().any(|prop| *prop == original_name)
                || in_skip_list(original_name)
                || is_qualifier_name(original_name)
            {
                continue;
            }
        }

        let original_name = attribute
            .original_attribute_name
            .clone()
            .unwrap_or_default();

        if attribute.value_type_id.is_none() {
            attribute.value_type_id = Some(
                VALUE_TYPE_MAP
                    .get(original_name.as_str())
                    .copied()
                    .unwrap_or(GENERIC_DATA_TYPE)
                    .to_string(),
            );
        }

        if attribute.attribute_type_id.is_empty() || attribute.attribute_type_id == "NA" {
            match get_attribute_bl_info(&original_name) {
                Some((attribute_type_id, value_type_id)) => {
                    attribute.attribute_type_id = attribute_type_id;
                    attribute.value_type_id = Some(value_type_id);
                }
                None => {
                    tracing::warn!(
                        "Attribute '{}' resolved to the skip list; dropped",
                        original_name
                    );
                    continue;
                }
            }
        }

        formatted.push(attribute);
    }
    formatted
}

/// Lift qualifier-bearing attributes off an edge into its `qualifiers`
/// list.
fn extract_qualifiers(edge: &mut KgEdge) {
    let qualifier_attributes: Vec<&Attribute> = edge
        .attributes
        .iter()
        .filter(|a| {
            a.original_attribute_name
                .as_deref()
                .is_some_and(is_qualifier_name)
        })
        .collect();
    if qualifier_attributes.is_empty() {
        return;
    }
    let qualifiers = qualifier_attributes
        .into_iter()
        .map(|attribute| {
            let name = attribute.original_attribute_name.as_deref().unwrap_or("");
            Qualifier {
                qualifier_type_id: if name.starts_with("biolink:") {
                    name.to_string()
                } else {
                    format!("biolink:{}", name)
                },
                qualifier_value: attribute.value.clone(),
            }
        })
        .collect();
    edge.qualifiers = Some(qualifiers);
}

/// Decorate all knowledge-graph nodes.
pub fn format_node_attributes(nodes: &mut BTreeMap<String, KgNode>) {
    for node in nodes.values_mut() {
        let attributes = std::mem::take(&mut node.attributes);
        node.attributes = format_attributes(attributes, NODE_CORE_PROPS);
    }
}

/// Decorate all knowledge-graph edges and finalize their sources trees.
pub fn format_edge_attributes(edges: &mut BTreeMap<String, KgEdge>, provenance: &str) {
    for edge in edges.values_mut() {
        extract_qualifiers(edge);
        let attributes = std::mem::take(&mut edge.attributes);
        edge.attributes = format_attributes(attributes, EDGE_CORE_PROPS);
        edge.sources = construct_sources_tree(&edge.sources, provenance);
    }
}

/// Run the full decoration pass over an assembled message.
pub fn transform_attributes(message: &mut Message, provenance: &str) {
    if let Some(knowledge_graph) = message.knowledge_graph.as_mut() {
        format_node_attributes(&mut knowledge_graph.nodes);
        format_edge_attributes(&mut knowledge_graph.edges, provenance);
    }
    if let Some(results) = message.results.as_mut() {
        for result in results {
            for analysis in &mut result.analyses {
                analysis.resource_id = provenance.to_string();
            }
        }
    }
}
