//! Biolink category ancestor expansion.
//!
//! The knowledge graph decorates every node with the full ancestor list
//! of its most specific category. The table below covers the concept
//! families reachable through SemSimian search groups; anything else
//! falls back to the generic `biolink:NamedThing` lineage.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const NAMED_THING: &str = "biolink:NamedThing";
const ENTITY: &str = "biolink:Entity";

static ANCESTORS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    table.insert(
        "biolink:PhenotypicFeature",
        &[
            "biolink:PhenotypicFeature",
            "biolink:DiseaseOrPhenotypicFeature",
            "biolink:BiologicalEntity",
            NAMED_THING,
            ENTITY,
        ],
    );
    table.insert(
        "biolink:BehavioralFeature",
        &[
            "biolink:BehavioralFeature",
            "biolink:PhenotypicFeature",
            "biolink:DiseaseOrPhenotypicFeature",
            "biolink:BiologicalEntity",
            NAMED_THING,
            ENTITY,
        ],
    );
    table.insert(
        "biolink:Disease",
        &[
            "biolink:Disease",
            "biolink:DiseaseOrPhenotypicFeature",
            "biolink:BiologicalEntity",
            NAMED_THING,
            ENTITY,
        ],
    );
    table.insert(
        "biolink:DiseaseOrPhenotypicFeature",
        &[
            "biolink:DiseaseOrPhenotypicFeature",
            "biolink:BiologicalEntity",
            NAMED_THING,
            ENTITY,
        ],
    );
    table.insert(
        "biolink:Gene",
        &[
            "biolink:Gene",
            "biolink:BiologicalEntity",
            NAMED_THING,
            ENTITY,
        ],
    );
    table.insert(
        "biolink:BiologicalEntity",
        &["biolink:BiologicalEntity", NAMED_THING, ENTITY],
    );
    table.insert(NAMED_THING, &[NAMED_THING, ENTITY]);
    table.insert(ENTITY, &[ENTITY]);
    table
});

/// Expand a most-specific category into itself plus its ancestors,
/// most specific first.
pub fn expand(category: &str) -> Vec<String> {
    if let Some(ancestors) = ANCESTORS.get(category) {
        return ancestors.iter().map(|c| c.to_string()).collect();
    }
    // Unknown categories keep their own tag ahead of the generic lineage.
    let mut expanded = vec![category.to_string()];
    for generic in [NAMED_THING, ENTITY] {
        if category != generic {
            expanded.push(generic.to_string());
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phenotypic_feature_expands_to_full_lineage() {
        let expanded = expand("biolink:PhenotypicFeature");
        assert_eq!(expanded[0], "biolink:PhenotypicFeature");
        assert!(expanded.contains(&"biolink:DiseaseOrPhenotypicFeature".to_string()));
        assert!(expanded.contains(&NAMED_THING.to_string()));
    }

    #[test]
    fn unknown_category_falls_back_to_generic_lineage() {
        let expanded = expand("biolink:ChemicalEntity");
        assert_eq!(
            expanded,
            vec![
                "biolink:ChemicalEntity".to_string(),
                NAMED_THING.to_string(),
                "biolink:Entity".to_string()
            ]
        );
    }

    #[test]
    fn named_thing_does_not_duplicate_itself() {
        assert_eq!(expand(NAMED_THING), vec![NAMED_THING, "biolink:Entity"]);
    }
}
