use anyhow::Result;

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;

// Page sizes. Unread retrieval is intentionally small; clients page through
// with the returned cursor.
const DEFAULT_UNREAD_PAGE_SIZE: usize = 10;
const DEFAULT_USERS_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 100;

const DEFAULT_MAX_USERNAME_LENGTH: usize = 64;
const DEFAULT_MAX_CONTENT_LENGTH: usize = 4 * 1024;

// ============================================================================
// Configuration Structures
// ============================================================================

/// Which StorageGateway backend to run against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local maps; data is lost on restart. For tests and demos.
    Memory,
    Postgres,
}

/// Database connection pool configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Input and paging limits enforced by the domain services
#[derive(Clone, Debug)]
pub struct LimitsConfig {
    pub max_username_length: usize,
    pub max_content_length: usize,
    pub unread_page_size: usize,
    pub users_page_size: usize,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on wall-clock time per request, enforced by a timeout
    /// layer in the router.
    pub request_timeout_secs: u64,
    pub storage_backend: StorageBackend,
    pub db: DbConfig,
    pub limits: LimitsConfig,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres,
            other => anyhow::bail!("unknown STORAGE_BACKEND '{}'", other),
        };

        let database_url = std::env::var("DATABASE_URL").unwrap_or_default();
        if storage_backend == StorageBackend::Postgres && database_url.is_empty() {
            anyhow::bail!("DATABASE_URL must be set when STORAGE_BACKEND is postgres");
        }

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            storage_backend,
            db: DbConfig {
                url: database_url,
                max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
                acquire_timeout_secs: env_parse(
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
                ),
            },
            limits: LimitsConfig::from_env(),
        })
    }
}

impl LimitsConfig {
    fn from_env() -> Self {
        Self {
            max_username_length: env_parse("MAX_USERNAME_LENGTH", DEFAULT_MAX_USERNAME_LENGTH),
            max_content_length: env_parse("MAX_CONTENT_LENGTH", DEFAULT_MAX_CONTENT_LENGTH),
            unread_page_size: env_parse("UNREAD_PAGE_SIZE", DEFAULT_UNREAD_PAGE_SIZE),
            users_page_size: env_parse("USERS_PAGE_SIZE", DEFAULT_USERS_PAGE_SIZE),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_username_length: DEFAULT_MAX_USERNAME_LENGTH,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            unread_page_size: DEFAULT_UNREAD_PAGE_SIZE,
            users_page_size: DEFAULT_USERS_PAGE_SIZE,
        }
    }
}
