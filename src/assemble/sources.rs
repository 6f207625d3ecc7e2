//! Edge provenance: expansion of raw source stubs into the full
//! `sources` tree with `upstream_resource_ids` chains and the service's
//! own aggregator entry on top.

use crate::model::SourceEntry;
use std::collections::{BTreeSet, HashMap};

const AGGREGATOR: &str = "aggregator_knowledge_source";
const PRIMARY: &str = "primary_knowledge_source";
const SUPPORTING: &str = "supporting_data_source";

fn top_level_entry(provenance: &str, upstreams: Option<Vec<String>>) -> SourceEntry {
    SourceEntry {
        resource_id: provenance.to_string(),
        resource_role: AGGREGATOR.to_string(),
        source_record_urls: None,
        upstream_resource_ids: upstreams,
    }
}

/// Build the full `sources` annotation for one edge.
///
/// Ids are unioned per role; aggregator entries point upstream at the
/// primary ids and primary entries at the supporting ids. One aggregator
/// entry for this service is always appended, its upstreams taken from
/// the highest populated role (aggregator, then primary, then
/// supporting). Empty input returns just the service entry.
pub fn construct_sources_tree(sources: &[SourceEntry], provenance: &str) -> Vec<SourceEntry> {
    if sources.is_empty() {
        return vec![top_level_entry(provenance, None)];
    }

    // Roles keep first-seen order; ids within a role are unioned and sorted.
    let mut role_order: Vec<String> = Vec::new();
    let mut ids_by_role: HashMap<String, BTreeSet<String>> = HashMap::new();
    let mut urls_by_id: HashMap<String, Option<Vec<String>>> = HashMap::new();

    for source in sources {
        if source.resource_id.is_empty() || source.resource_role.is_empty() {
            tracing::warn!("Invalid edge 'source' entry: '{:?}'? Skipped!", source);
            continue;
        }
        let role = source
            .resource_role
            .strip_prefix("biolink:")
            .unwrap_or(&source.resource_role)
            .to_string();
        if !ids_by_role.contains_key(&role) {
            role_order.push(role.clone());
        }
        urls_by_id.insert(
            source.resource_id.clone(),
            source.source_record_urls.clone(),
        );
        ids_by_role
            .entry(role)
            .or_default()
            .insert(source.resource_id.clone());
    }

    let upstreams_for = |role: &str| -> Option<Vec<String>> {
        let feeding_role = match role {
            AGGREGATOR => PRIMARY,
            PRIMARY => SUPPORTING,
            _ => return None,
        };
        ids_by_role
            .get(feeding_role)
            .filter(|ids| !ids.is_empty())
            .map(|ids| ids.iter().cloned().collect())
    };

    let mut formatted: Vec<SourceEntry> = Vec::new();
    for role in &role_order {
        let upstreams = upstreams_for(role);
        for resource_id in &ids_by_role[role] {
            formatted.push(SourceEntry {
                resource_id: resource_id.clone(),
                resource_role: role.clone(),
                source_record_urls: urls_by_id.get(resource_id).cloned().flatten(),
                upstream_resource_ids: upstreams.clone(),
            });
        }
    }

    let top_level_upstreams = [AGGREGATOR, PRIMARY, SUPPORTING]
        .iter()
        .find_map(|role| ids_by_role.get(*role).filter(|ids| !ids.is_empty()))
        .map(|ids| ids.iter().cloned().collect());
    formatted.push(top_level_entry(provenance, top_level_upstreams));

    formatted
}
