//! Parsing of raw SemSimian result records into the internal results map.

use crate::logging::QueryLog;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Rewrites for upstream `provided_by` tokens that are not already
/// proper infores identifiers.
static SOURCE_ALIASES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("phenio_nodes", "infores:upheno")]));

/// Contract over the input set: `Many` accepts partial matches,
/// `All` requires every member term to be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetInterpretation {
    Many,
    All,
}

impl SetInterpretation {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "MANY" => Some(SetInterpretation::Many),
            "ALL" => Some(SetInterpretation::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SetInterpretation::Many => "MANY",
            SetInterpretation::All => "ALL",
        }
    }
}

/// One pairwise similarity assertion between a candidate-associated term
/// (`subject_id`) and an input query term (`object_id`).
#[derive(Debug, Clone)]
pub struct TermMatch {
    pub subject_id: String,
    pub subject_name: Option<String>,
    pub object_id: String,
    pub object_name: Option<String>,
    pub category: String,
    pub score: f64,
    pub matched_term: String,
}

/// Annotation for one matched candidate concept plus its term matches.
#[derive(Debug, Clone)]
pub struct ResultEntry {
    pub name: Option<String>,
    pub category: Option<String>,
    pub score: f64,
    pub provided_by: Option<String>,
    pub matches: Vec<TermMatch>,
}

/// Everything the response assembler needs for one query: the query-set
/// metadata plus candidate entries in upstream rank order.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub set_interpretation: SetInterpretation,
    pub set_identifier: String,
    pub query_terms: Vec<String>,
    pub query_term_category: String,
    pub primary_knowledge_source: String,
    pub ingest_knowledge_source: String,
    pub match_predicate: String,
    pub result_map: Vec<(String, ResultEntry)>,
}

/// Navigate a dot-delimited tag path into nested JSON, returning the
/// value at the leaf. Missing intermediate tags log at debug level.
pub fn tag_value<'a>(data: &'a Value, tag_path: &str) -> Option<&'a Value> {
    if tag_path.is_empty() {
        tracing::debug!("Empty 'tag_path' argument?");
        return None;
    }
    let mut current = data;
    let mut walked: Vec<&str> = Vec::new();
    for tag in tag_path.split('.') {
        walked.push(tag);
        match current.get(tag) {
            Some(next) => current = next,
            None => {
                tracing::debug!("Missing tag path '{}'?", walked.join("."));
                return None;
            }
        }
    }
    Some(current)
}

fn tag_str(data: &Value, tag_path: &str) -> Option<String> {
    tag_value(data, tag_path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map an upstream `provided_by` token onto an infores identifier.
pub fn map_provided_by(token: &str) -> String {
    if let Some(alias) = SOURCE_ALIASES.get(token) {
        (*alias).to_string()
    } else if token.starts_with("infores:") {
        token.to_string()
    } else {
        format!("infores:{}", token)
    }
}

/// Insert a term match into a per-candidate match list, keeping at most
/// one match per `subject_id`: a higher score replaces, ties keep the
/// first-seen match.
pub fn dedup_insert(matches: &mut Vec<TermMatch>, candidate: TermMatch) {
    if let Some(existing) = matches
        .iter_mut()
        .find(|m| m.subject_id == candidate.subject_id)
    {
        if candidate.score > existing.score {
            *existing = candidate;
        }
        return;
    }
    matches.push(candidate);
}

/// Parse the raw SemSimian result list into candidate entries, in
/// upstream order. The SemSimian 'subject' is the candidate of interest
/// (the assertion is inverted relative to the TRAPI answer edge).
pub fn parse_records(
    full_result: &[Value],
    match_category: &str,
    query_log: &QueryLog,
    query_id: Uuid,
) -> Vec<(String, ResultEntry)> {
    let mut result_map: Vec<(String, ResultEntry)> = Vec::new();

    for record in full_result {
        let Some(subject_id) = tag_str(record, "subject.id") else {
            query_log.warning(
                Some(query_id),
                "SemSimian record lacks a 'subject.id'? Skipped!",
            );
            continue;
        };
        let score = record.get("score").and_then(Value::as_f64).unwrap_or(0.0);

        let mut entry = ResultEntry {
            name: tag_str(record, "subject.name"),
            category: tag_str(record, "subject.category"),
            score,
            provided_by: tag_str(record, "subject.provided_by")
                .map(|token| map_provided_by(&token)),
            matches: Vec::new(),
        };

        if let Some(best_matches) =
            tag_value(record, "similarity.object_best_matches").and_then(Value::as_object)
        {
            for object_match in best_matches.values() {
                let (Some(match_target), Some(match_source)) = (
                    tag_str(object_match, "match_target"),
                    tag_str(object_match, "match_source"),
                ) else {
                    continue;
                };
                // The common subsumer stands in for the matched term
                // whenever the ancestor is reported.
                let matched_term = tag_str(object_match, "similarity.ancestor_id")
                    .unwrap_or_else(|| match_target.clone());
                let term_match = TermMatch {
                    subject_id: match_target,
                    subject_name: tag_str(object_match, "match_target_label"),
                    object_id: match_source,
                    object_name: tag_str(object_match, "match_source_label"),
                    category: match_category.to_string(),
                    score: object_match
                        .get("score")
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0),
                    matched_term,
                };
                dedup_insert(&mut entry.matches, term_match);
            }
        }

        match result_map.iter_mut().find(|(id, _)| *id == subject_id) {
            Some((_, existing)) => {
                query_log.warning(
                    Some(query_id),
                    &format!(
                        "Duplicate SemSimian candidate '{}'; keeping the higher-scoring record",
                        subject_id
                    ),
                );
                if entry.score > existing.score {
                    *existing = entry;
                }
            }
            None => result_map.push((subject_id, entry)),
        }
    }

    result_map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> Value {
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
                    "HP:0012378": {
                        "match_source": "HP:0012378",
                        "match_source_label": "Fatigue (HPO)",
                        "match_target": "HP:0001699",
                        "match_target_label": "Sudden death (HPO)",
                        "score": 11.262698011936202,
                        "similarity": {"ancestor_id": "HP:0025142"}
                    },
                    "HP:0002104": {
                        "match_source": "HP:0002104",
                        "match_source_label": "Apnea (HPO)",
                        "match_target": "HP:0002104",
                        "match_target_label": "Apnea (HPO)",
                        "score": 16.60564375324628,
                        "similarity": {"ancestor_id": ""}
                    }
                }
            }
        })
    }

    #[test]
    fn valid_tag_path_reaches_the_leaf() {
        let record = sample_record();
        assert_eq!(
            tag_value(&record, "subject.id").and_then(Value::as_str),
            Some("MONDO:0008807")
        );
    }

    #[test]
    fn missing_and_empty_tag_paths_yield_none() {
        let record = sample_record();
        assert!(tag_value(&record, "").is_none());
        assert!(tag_value(&record, "subject.four.five").is_none());
        assert!(tag_value(&record, "subject.id.deeper").is_none());
    }

    #[test]
    fn parses_matches_and_maps_provided_by() {
        let log = QueryLog::new();
        let result = parse_records(
            &[sample_record()],
            "biolink:PhenotypicFeature",
            &log,
            Uuid::new_v4(),
        );
        assert_eq!(result.len(), 1);
        let (candidate, entry) = &result[0];
        assert_eq!(candidate, "MONDO:0008807");
        assert_eq!(entry.provided_by.as_deref(), Some("infores:upheno"));
        assert_eq!(entry.matches.len(), 2);

        let sudden_death = entry
            .matches
            .iter()
            .find(|m| m.subject_id == "HP:0001699")
            .expect("match target should be parsed");
        assert_eq!(sudden_death.object_id, "HP:0012378");
        assert_eq!(sudden_death.matched_term, "HP:0025142");

        // Empty ancestor_id falls back to the match target itself
        let apnea = entry
            .matches
            .iter()
            .find(|m| m.subject_id == "HP:0002104")
            .unwrap();
        assert_eq!(apnea.matched_term, "HP:0002104");
    }

    #[test]
    fn duplicate_candidates_keep_higher_score() {
        let log = QueryLog::new();
        let query_id = Uuid::new_v4();
        let mut low = sample_record();
        low["score"] = json!(1.0);
        let result = parse_records(
            &[low, sample_record()],
            "biolink:PhenotypicFeature",
            &log,
            query_id,
        );
        assert_eq!(result.len(), 1);
        assert!(result[0].1.score > 13.0);
        assert_eq!(log.get_logs(query_id).len(), 1);
    }

    #[test]
    fn dedup_insert_prefers_higher_score_and_first_seen_on_tie() {
        let mk = |score: f64, name: &str| TermMatch {
            subject_id: "HP:0000001".to_string(),
            subject_name: Some(name.to_string()),
            object_id: "HP:0000002".to_string(),
            object_name: None,
            category: "biolink:PhenotypicFeature".to_string(),
            score,
            matched_term: "HP:0000001".to_string(),
        };
        let mut matches = Vec::new();
        dedup_insert(&mut matches, mk(1.0, "first"));
        dedup_insert(&mut matches, mk(1.0, "tied"));
        assert_eq!(matches[0].subject_name.as_deref(), Some("first"));
        dedup_insert(&mut matches, mk(2.0, "better"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].subject_name.as_deref(), Some("better"));
    }

    #[test]
    fn provided_by_tokens_keep_existing_infores_prefix() {
        assert_eq!(map_provided_by("infores:mondo"), "infores:mondo");
        assert_eq!(map_provided_by("mondo"), "infores:mondo");
        assert_eq!(map_provided_by("phenio_nodes"), "infores:upheno");
    }
}
