use serde::{Deserialize, Serialize};

/// Default infores identifier stamped on every aggregator source entry
/// this service appends to edge provenance.
pub const DEFAULT_PROVENANCE: &str = "infores:monarchinitiative";

/// Biolink Model release the category tables and meta graph are aligned to.
pub const BIOLINK_VERSION: &str = "4.1.6";

/// Main configuration structure loaded from semsim_kp.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub similarity: SimilarityConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Service identity reported by the metadata endpoints and
/// used as the aggregator provenance on assembled edges.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub title: String,
    pub version: String,
    pub provenance: String,
    pub public_url: Option<String>,
}

/// Upstream SemSimian search endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimilarityConfig {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub search_path: String,
    pub timeout_ms: u64,
    pub default_result_limit: usize,
}

impl SimilarityConfig {
    /// Full URL of the SemSimian search endpoint.
    pub fn endpoint(&self) -> String {
        let scheme = if self.scheme.is_empty() {
            String::new()
        } else {
            format!("{}://", self.scheme)
        };
        let port = match self.port {
            Some(p) => format!(":{}", p),
            None => String::new(),
        };
        format!("{}{}{}{}", scheme, self.host, port, self.search_path)
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub http_bind: std::net::SocketAddr,
    pub log_level: String,
    pub log_dir: String,
    pub log_max_files: usize,
    pub metadata_path: Option<String>,
    pub meta_kg_path: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            http_bind: "0.0.0.0:8080"
                .parse()
                .expect("default bind address should parse"),
            log_level: "semsim_kp=info".to_string(),
            log_dir: "logs".to_string(),
            log_max_files: 10,
            metadata_path: None,
            meta_kg_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                title: "SemSimian Multi-CURIE KP".to_string(),
                version: "1.5.0".to_string(),
                provenance: DEFAULT_PROVENANCE.to_string(),
                public_url: None,
            },
            similarity: SimilarityConfig {
                scheme: "http".to_string(),
                host: "api-v3.monarchinitiative.org".to_string(),
                port: None,
                search_path: "/v3/api/semsim/search".to_string(),
                timeout_ms: 600_000,
                default_result_limit: 10,
            },
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses SEMSIM_KP_CONFIG environment variable or defaults to "semsim_kp.toml".
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            std::env::var("SEMSIM_KP_CONFIG").unwrap_or_else(|_| "semsim_kp.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        // Apply env overrides for the upstream endpoint (env-first)
        if let Ok(scheme) = std::env::var("SEMSIMIAN_SCHEME") {
            config.similarity.scheme = scheme;
        }
        if let Ok(host) = std::env::var("SEMSIMIAN_HOST") {
            config.similarity.host = host;
        }
        if let Ok(port) = std::env::var("SEMSIMIAN_PORT") {
            // An empty SEMSIMIAN_PORT unsets any TOML-configured port
            config.similarity.port = port.parse::<u16>().ok();
        }
        if let Ok(path) = std::env::var("SEMSIMIAN_SEARCH") {
            config.similarity.search_path = path;
        }
        if let Some(timeout) = std::env::var("SEMSIMIAN_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.similarity.timeout_ms = timeout;
        }

        // Service identity overrides
        if let Ok(tag) = std::env::var("PROVENANCE_TAG") {
            config.service.provenance = tag;
        }
        if let Ok(title) = std::env::var("KP_TITLE") {
            config.service.title = title;
        }
        if let Ok(version) = std::env::var("KP_VERSION") {
            config.service.version = version;
        }
        if let Ok(url) = std::env::var("PUBLIC_URL") {
            config.service.public_url = Some(url);
        }

        // Load runtime configuration from environment variables
        config.runtime = RuntimeConfig::load_from_env();

        // Validate configuration
        if config.similarity.host.is_empty() {
            return Err(anyhow::anyhow!(
                "Similarity host must not be empty (set SEMSIMIAN_HOST)"
            ));
        }
        if !matches!(config.similarity.scheme.as_str(), "" | "http" | "https") {
            tracing::warn!(
                "Similarity scheme '{}' is not http or https",
                config.similarity.scheme
            );
        }
        if config.similarity.default_result_limit == 0 {
            config.similarity.default_result_limit = 10;
        }

        Ok(config)
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("KP_HTTP_BIND")
            && let Ok(bind) = v.parse::<std::net::SocketAddr>()
        {
            cfg.http_bind = bind;
        }
        cfg.log_level =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "semsim_kp=info".to_string());
        if let Ok(dir) = std::env::var("KP_LOG_DIR") {
            cfg.log_dir = dir;
        }
        if let Some(max) = std::env::var("KP_LOG_MAX_FILES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            cfg.log_max_files = max.max(1);
        }
        cfg.metadata_path = std::env::var("KP_METADATA_FILE").ok();
        cfg.meta_kg_path = std::env::var("KP_META_KG_FILE").ok();

        cfg
    }
}
