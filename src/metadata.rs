//! Static service metadata: the `/metadata` descriptor and the
//! `/meta_knowledge_graph` document, file-overridable with embedded
//! defaults.

use crate::config::{BIOLINK_VERSION, Config};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub struct GraphMetadata {
    metadata: Value,
    meta_kg: Value,
}

fn load_json_file(path: &str) -> Option<Value> {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Metadata file {} is not valid JSON: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Metadata file {} could not be read: {}", path, e);
            None
        }
    }
}

impl GraphMetadata {
    pub fn load(config: &Config) -> Self {
        let metadata = config
            .runtime
            .metadata_path
            .as_deref()
            .and_then(load_json_file)
            .unwrap_or_else(|| default_metadata(config));
        let meta_kg = config
            .runtime
            .meta_kg_path
            .as_deref()
            .and_then(load_json_file)
            .unwrap_or_else(default_meta_kg);
        Self { metadata, meta_kg }
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn meta_kg(&self) -> &Value {
        &self.meta_kg
    }
}

fn default_metadata(config: &Config) -> Value {
    json!({
        "title": config.service.title,
        "version": config.service.version,
        "infores": config.service.provenance,
        "biolink_version": BIOLINK_VERSION,
        "url": config.service.public_url,
        "operations": ["lookup"],
    })
}

/// Meta knowledge graph for the one supported MCQ shape:
/// phenotype profiles matched against human diseases.
fn default_meta_kg() -> Value {
    json!({
        "nodes": {
            "biolink:PhenotypicFeature": {
                "id_prefixes": ["HP"],
                "attributes": null
            },
            "biolink:Disease": {
                "id_prefixes": ["MONDO"],
                "attributes": null
            }
        },
        "edges": [
            {
                "subject": "biolink:PhenotypicFeature",
                "predicate": "biolink:similar_to",
                "object": "biolink:Disease",
                "attributes": null,
                "qualifiers": null
            }
        ]
    })
}
