use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen address (default: 0.0.0.0:8080)
    pub bind_addr: SocketAddr,

    /// Maximum size of the `file` part in bytes (default: 10 MB)
    pub max_upload_size: usize,

    /// Install the Prometheus recorder and expose `/metrics` (default: true)
    pub enable_metrics: bool,

    /// Deadline for a single backend write (default: none)
    pub upload_timeout: Option<Duration>,

    /// Storage backend settings
    pub storage: StorageConfig,
}

/// Overrides applied on top of the ambient AWS configuration.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Custom endpoint, e.g. a MinIO server
    pub endpoint_url: Option<String>,

    /// Static access key; used together with `secret_key`
    pub access_key: Option<String>,

    /// Static secret key; used together with `access_key`
    pub secret_key: Option<String>,

    /// Use path-style bucket addressing (default: false)
    pub force_path_style: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_upload_size: 10 * 1024 * 1024, // 10 MB
            enable_metrics: true,
            upload_timeout: None,
            storage: StorageConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            bind_addr: lookup("BIND_ADDR")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.bind_addr),

            max_upload_size: lookup("MAX_UPLOAD_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            enable_metrics: lookup("ENABLE_METRICS")
                .map(|v| parse_flag(&v))
                .unwrap_or(default.enable_metrics),

            upload_timeout: lookup("UPLOAD_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),

            storage: StorageConfig {
                endpoint_url: lookup("S3_ENDPOINT").filter(|v| !v.is_empty()),
                access_key: lookup("S3_ACCESS_KEY").filter(|v| !v.is_empty()),
                secret_key: lookup("S3_SECRET_KEY").filter(|v| !v.is_empty()),
                force_path_style: lookup("S3_FORCE_PATH_STYLE")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
            },
        }
    }

    /// Local setup against MinIO on its default port
    pub fn development() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            storage: StorageConfig {
                endpoint_url: Some("http://127.0.0.1:9000".to_string()),
                access_key: Some("minioadmin".to_string()),
                secret_key: Some("minioadmin".to_string()),
                force_path_style: true,
            },
            ..Self::default()
        }
    }

    /// Whole-body ceiling: the file part plus room for the text fields and
    /// multipart boundaries.
    pub fn body_limit(&self) -> usize {
        self.max_upload_size.saturating_add(FORM_OVERHEAD)
    }
}

const FORM_OVERHEAD: usize = 64 * 1024;

fn parse_flag(value: &str) -> bool {
    value.to_lowercase() != "false" && value != "0"
}
