pub mod assemble;
pub mod attributes;
pub mod categories;
pub mod config;
pub mod constraints;
pub mod error;
pub mod http;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod similarity;

// Load env from a simple, standardized location resolution.
// This uses dotenvy::dotenv().ok() which loads .env if present and silently ignores if missing.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}
