//! Attribute constraints: operator evaluation and response filtering.
//!
//! Constraints on a query node or edge are ANDed; each must match at
//! least one attribute of the bound knowledge-graph item by
//! `attribute_type_id` and pass its operator. Failing nodes take their
//! incident edges with them, and results whose bindings empty out are
//! dropped.

use crate::error::{Result, SemsimKpError};
use crate::logging::QueryLog;
use crate::model::{
    Attribute, AttributeConstraint, AuxiliaryGraph, ConstraintOperator, Message, ResultBinding,
};
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

fn is_iterable(value: &Value) -> bool {
    // Strings are scalar for constraint purposes, never element-wise
    value.is_array()
}

/// Operand shape compatibility: numbers compare with numbers,
/// collections with collections, otherwise the JSON kinds must agree.
fn is_same_data_type(a: &Value, b: &Value) -> bool {
    (a.is_number() && b.is_number())
        || (is_iterable(a) && is_iterable(b))
        || std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// Structural equality with numeric tolerance (1 == 1.0).
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| value_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| value_eq(v, other)))
        }
        _ => a == b,
    }
}

/// True if any element of the DB collection appears in the constraint
/// collection.
fn any_element_contained(constraint: &[Value], db: &[Value]) -> bool {
    db.iter()
        .any(|x| constraint.iter().any(|c| value_eq(c, x)))
}

fn compare_order(constraint: &Value, db: &Value) -> Option<std::cmp::Ordering> {
    match (constraint, db) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

/// Apply one operator as `op(constraint_value, db_value)`.
pub fn apply_operator(
    operator: ConstraintOperator,
    constraint: &Value,
    db_value: &Value,
) -> Result<bool> {
    if !is_same_data_type(constraint, db_value) {
        return Ok(false);
    }
    let outcome = match operator {
        ConstraintOperator::EqualTo => match (constraint, db_value) {
            (Value::Array(a), Value::Array(b)) => any_element_contained(a, b),
            _ => value_eq(constraint, db_value),
        },
        ConstraintOperator::DeepEqualTo => value_eq(constraint, db_value),
        ConstraintOperator::GreaterThan => {
            compare_order(constraint, db_value) == Some(std::cmp::Ordering::Greater)
        }
        ConstraintOperator::LessThan => {
            compare_order(constraint, db_value) == Some(std::cmp::Ordering::Less)
        }
        ConstraintOperator::Matches => match (constraint, db_value) {
            (Value::String(pattern), Value::String(target)) => {
                let expr = Regex::new(pattern).map_err(|e| SemsimKpError::Validation {
                    message: format!("Invalid 'matches' constraint pattern '{}': {}", pattern, e),
                })?;
                // Left-anchored: the match must begin at the first byte
                expr.find(target).is_some_and(|m| m.start() == 0)
            }
            (Value::Array(a), Value::Array(b)) => any_element_contained(a, b),
            _ => value_eq(constraint, db_value),
        },
    };
    Ok(outcome)
}

/// Evaluate one constraint against one attribute value, honoring negation.
pub fn check_attribute_constraint(
    constraint: &AttributeConstraint,
    db_value: &Value,
) -> Result<bool> {
    let result = apply_operator(constraint.operator, &constraint.value, db_value)?;
    Ok(if constraint.negated { !result } else { result })
}

/// Check that every constraint holds against the attribute list.
///
/// A constraint whose id matches no attribute fails; a matching
/// attribute that fails the operator fails the lot.
pub fn check_attributes(
    constraints: &[AttributeConstraint],
    db_attributes: &[Attribute],
) -> Result<bool> {
    for constraint in constraints {
        let mut constraint_is_applied = false;
        for db_attribute in db_attributes {
            if db_attribute.attribute_type_id == constraint.id {
                constraint_is_applied = true;
                if !check_attribute_constraint(constraint, &db_attribute.value)? {
                    return Ok(false);
                }
            }
        }
        if !constraint_is_applied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Apply the query graph's attribute constraints to the assembled
/// message, pruning failing nodes, their incident edges, independently
/// failing edges, dangling auxiliary-graph references, and results whose
/// bindings become empty.
pub fn apply_attribute_constraints(
    message: &mut Message,
    query_log: &QueryLog,
    query_id: Uuid,
) -> Result<()> {
    let Some(query_graph) = message.query_graph.as_ref() else {
        return Ok(());
    };

    let node_constraints: HashMap<&String, &[AttributeConstraint]> = query_graph
        .nodes
        .iter()
        .filter(|(_, node)| !node.constraints.is_empty())
        .map(|(key, node)| (key, node.constraints.as_slice()))
        .collect();
    let edge_constraints: HashMap<&String, &[AttributeConstraint]> = query_graph
        .edges
        .iter()
        .filter(|(_, edge)| !edge.attribute_constraints.is_empty())
        .map(|(key, edge)| (key, edge.attribute_constraints.as_slice()))
        .collect();

    if node_constraints.is_empty() && edge_constraints.is_empty() {
        return Ok(());
    }

    let Some(knowledge_graph) = message.knowledge_graph.as_mut() else {
        return Ok(());
    };
    let results = message.results.take().unwrap_or_default();

    // Collect the KG ids bound to each constrained query node/edge
    let mut constrained_node_ids: HashMap<String, &[AttributeConstraint]> = HashMap::new();
    let mut constrained_edge_ids: HashMap<String, &[AttributeConstraint]> = HashMap::new();
    for result in &results {
        for (q_id, constraints) in &node_constraints {
            if let Some(bindings) = result.node_bindings.get(*q_id) {
                for binding in bindings {
                    constrained_node_ids.insert(binding.id.clone(), *constraints);
                }
            }
        }
        for (q_id, constraints) in &edge_constraints {
            for analysis in &result.analyses {
                if let Some(bindings) = analysis.edge_bindings.get(*q_id) {
                    for binding in bindings {
                        constrained_edge_ids.insert(binding.id.clone(), *constraints);
                    }
                }
            }
        }
    }

    let mut nodes_to_filter: HashSet<String> = HashSet::new();
    for (node_id, constraints) in &constrained_node_ids {
        let attributes = knowledge_graph
            .nodes
            .get(node_id)
            .map(|node| node.attributes.as_slice())
            .unwrap_or_default();
        if !check_attributes(constraints, attributes)? {
            nodes_to_filter.insert(node_id.clone());
        }
    }

    let mut edges_to_filter: HashSet<String> = HashSet::new();
    for (edge_id, edge) in &knowledge_graph.edges {
        // A filtered node takes its incident edges along
        if nodes_to_filter.contains(&edge.subject) || nodes_to_filter.contains(&edge.object) {
            edges_to_filter.insert(edge_id.clone());
            continue;
        }
        if let Some(constraints) = constrained_edge_ids.get(edge_id)
            && !check_attributes(constraints, &edge.attributes)?
        {
            edges_to_filter.insert(edge_id.clone());
        }
    }

    if !nodes_to_filter.is_empty() || !edges_to_filter.is_empty() {
        query_log.debug(
            Some(query_id),
            &format!(
                "Attribute constraints filtered {} node(s) and {} edge(s)",
                nodes_to_filter.len(),
                edges_to_filter.len()
            ),
        );
    }

    knowledge_graph
        .nodes
        .retain(|node_id, _| !nodes_to_filter.contains(node_id));
    knowledge_graph
        .edges
        .retain(|edge_id, _| !edges_to_filter.contains(edge_id));

    // Keep auxiliary graphs consistent: a support graph whose answer
    // edge is gone disappears with it, and surviving graphs drop any
    // reference to a filtered edge.
    if let Some(auxiliary_graphs) = message.auxiliary_graphs.as_mut() {
        let filtered: BTreeMap<String, AuxiliaryGraph> = auxiliary_graphs
            .iter()
            .filter(|(graph_id, _)| {
                !graph_id
                    .strip_prefix("sg-")
                    .is_some_and(|owner| edges_to_filter.contains(owner))
            })
            .map(|(graph_id, graph)| {
                let mut graph = graph.clone();
                graph.edges.retain(|edge_id| !edges_to_filter.contains(edge_id));
                (graph_id.clone(), graph)
            })
            .collect();
        *auxiliary_graphs = filtered;
    }

    // Rebind results, dropping any whose bindings empty out
    let mut filtered_bindings: Vec<ResultBinding> = Vec::new();
    'results: for mut result in results {
        let mut new_node_bindings = BTreeMap::new();
        for (q_id, bindings) in &result.node_bindings {
            let kept: Vec<_> = bindings
                .iter()
                .filter(|b| !nodes_to_filter.contains(&b.id))
                .cloned()
                .collect();
            if kept.is_empty() {
                continue 'results;
            }
            new_node_bindings.insert(q_id.clone(), kept);
        }
        for analysis in &mut result.analyses {
            let mut new_edge_bindings = BTreeMap::new();
            for (q_id, bindings) in &analysis.edge_bindings {
                let kept: Vec<_> = bindings
                    .iter()
                    .filter(|b| !edges_to_filter.contains(&b.id))
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    continue 'results;
                }
                new_edge_bindings.insert(q_id.clone(), kept);
            }
            analysis.edge_bindings = new_edge_bindings;
        }
        result.node_bindings = new_node_bindings;
        filtered_bindings.push(result);
    }
    message.results = Some(filtered_bindings);

    Ok(())
}
