//! Tests for edge `sources` tree construction: per-role id unions,
//! upstream chains, and the service's own aggregator entry.

use semsim_kp::assemble::sources::construct_sources_tree;
use semsim_kp::config::DEFAULT_PROVENANCE;
use semsim_kp::model::SourceEntry;

fn entry(
    resource_id: &str,
    resource_role: &str,
    source_record_urls: Option<Vec<&str>>,
    upstream_resource_ids: Option<Vec<&str>>,
) -> SourceEntry {
    SourceEntry {
        resource_id: resource_id.to_string(),
        resource_role: resource_role.to_string(),
        source_record_urls: source_record_urls
            .map(|urls| urls.into_iter().map(str::to_string).collect()),
        upstream_resource_ids: upstream_resource_ids
            .map(|ids| ids.into_iter().map(str::to_string).collect()),
    }
}

/// Order-insensitive comparison: the wire order of sibling entries is
/// not part of the contract.
fn assert_same_entries(mut actual: Vec<SourceEntry>, mut expected: Vec<SourceEntry>) {
    let key = |e: &SourceEntry| (e.resource_role.clone(), e.resource_id.clone());
    actual.sort_by_key(key);
    expected.sort_by_key(key);
    for entry in actual.iter_mut().chain(expected.iter_mut()) {
        if let Some(upstreams) = entry.upstream_resource_ids.as_mut() {
            upstreams.sort();
        }
    }
    assert_eq!(actual, expected);
}

#[test]
fn empty_sources_return_the_top_level_service_entry() {
    let tree = construct_sources_tree(&[], DEFAULT_PROVENANCE);
    assert_same_entries(
        tree,
        vec![entry(
            DEFAULT_PROVENANCE,
            "aggregator_knowledge_source",
            None,
            None,
        )],
    );
}

#[test]
fn primary_knowledge_source_feeds_the_service_aggregator() {
    let tree = construct_sources_tree(
        &[entry(
            "infores:semsimian-kp",
            "primary_knowledge_source",
            None,
            None,
        )],
        DEFAULT_PROVENANCE,
    );
    assert_same_entries(
        tree,
        vec![
            entry("infores:semsimian-kp", "primary_knowledge_source", None, None),
            entry(
                DEFAULT_PROVENANCE,
                "aggregator_knowledge_source",
                None,
                Some(vec!["infores:semsimian-kp"]),
            ),
        ],
    );
}

#[test]
fn supporting_data_source_feeds_the_primary() {
    let tree = construct_sources_tree(
        &[
            entry("infores:semsimian-kp", "primary_knowledge_source", None, None),
            entry(
                "infores:hpo-annotations",
                "supporting_data_source",
                None,
                None,
            ),
        ],
        DEFAULT_PROVENANCE,
    );
    assert_same_entries(
        tree,
        vec![
            entry(
                "infores:semsimian-kp",
                "primary_knowledge_source",
                None,
                Some(vec!["infores:hpo-annotations"]),
            ),
            entry(
                "infores:hpo-annotations",
                "supporting_data_source",
                None,
                None,
            ),
            entry(
                DEFAULT_PROVENANCE,
                "aggregator_knowledge_source",
                None,
                Some(vec!["infores:semsimian-kp"]),
            ),
        ],
    );
}

#[test]
fn supporting_source_alone_feeds_the_service_aggregator() {
    let tree = construct_sources_tree(
        &[entry(
            "infores:hpo-annotations",
            "supporting_data_source",
            None,
            None,
        )],
        DEFAULT_PROVENANCE,
    );
    assert_same_entries(
        tree,
        vec![
            entry(
                "infores:hpo-annotations",
                "supporting_data_source",
                None,
                None,
            ),
            entry(
                DEFAULT_PROVENANCE,
                "aggregator_knowledge_source",
                None,
                Some(vec!["infores:hpo-annotations"]),
            ),
        ],
    );
}

#[test]
fn source_record_urls_are_preserved() {
    let tree = construct_sources_tree(
        &[entry(
            "infores:hpo-annotations",
            "supporting_data_source",
            Some(vec!["https://hpo.jax.org/app/"]),
            None,
        )],
        DEFAULT_PROVENANCE,
    );
    assert_same_entries(
        tree,
        vec![
            entry(
                "infores:hpo-annotations",
                "supporting_data_source",
                Some(vec!["https://hpo.jax.org/app/"]),
                None,
            ),
            entry(
                DEFAULT_PROVENANCE,
                "aggregator_knowledge_source",
                None,
                Some(vec!["infores:hpo-annotations"]),
            ),
        ],
    );
}

#[test]
fn multiple_supporting_sources_are_unioned() {
    let tree = construct_sources_tree(
        &[
            entry(
                "infores:hpo-annotations",
                "supporting_data_source",
                None,
                None,
            ),
            entry("infores:upheno", "supporting_data_source", None, None),
        ],
        DEFAULT_PROVENANCE,
    );
    assert_same_entries(
        tree,
        vec![
            entry(
                "infores:hpo-annotations",
                "supporting_data_source",
                None,
                None,
            ),
            entry("infores:upheno", "supporting_data_source", None, None),
            entry(
                DEFAULT_PROVENANCE,
                "aggregator_knowledge_source",
                None,
                Some(vec!["infores:hpo-annotations", "infores:upheno"]),
            ),
        ],
    );
}

#[test]
fn primary_upstreams_union_all_supporting_sources() {
    // Primary + two supporting data sources: primary's upstreams are the
    // union of both supporting ids, and the service aggregator's
    // upstream is the primary.
    let tree = construct_sources_tree(
        &[
            entry("infores:semsimian-kp", "primary_knowledge_source", None, None),
            entry(
                "infores:hpo-annotations",
                "supporting_data_source",
                None,
                None,
            ),
            entry("infores:upheno", "supporting_data_source", None, None),
        ],
        DEFAULT_PROVENANCE,
    );

    let primary = tree
        .iter()
        .find(|e| e.resource_role == "primary_knowledge_source")
        .expect("primary entry expected");
    let mut upstreams = primary.upstream_resource_ids.clone().unwrap();
    upstreams.sort();
    assert_eq!(
        upstreams,
        vec![
            "infores:hpo-annotations".to_string(),
            "infores:upheno".to_string()
        ]
    );

    let aggregators: Vec<_> = tree
        .iter()
        .filter(|e| e.resource_role == "aggregator_knowledge_source")
        .collect();
    assert_eq!(aggregators.len(), 1, "exactly one aggregator entry");
    assert_eq!(aggregators[0].resource_id, DEFAULT_PROVENANCE);
    assert_eq!(
        aggregators[0].upstream_resource_ids,
        Some(vec!["infores:semsimian-kp".to_string()])
    );
}

#[test]
fn caller_supplied_aggregators_become_service_upstreams() {
    let tree = construct_sources_tree(
        &[
            entry("infores:semsimian-kp", "primary_knowledge_source", None, None),
            entry(
                "infores:some-other-kp",
                "aggregator_knowledge_source",
                None,
                None,
            ),
        ],
        DEFAULT_PROVENANCE,
    );

    let other = tree
        .iter()
        .find(|e| e.resource_id == "infores:some-other-kp")
        .unwrap();
    assert_eq!(
        other.upstream_resource_ids,
        Some(vec!["infores:semsimian-kp".to_string()])
    );

    let service = tree
        .iter()
        .find(|e| e.resource_id == DEFAULT_PROVENANCE)
        .unwrap();
    assert_eq!(
        service.upstream_resource_ids,
        Some(vec!["infores:some-other-kp".to_string()])
    );
}
