#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// SMTP delivery settings. Absent entirely when the deployment has no mail
/// credentials configured, in which case notifications are logged instead.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_user_agent: String,
    /// Upper bound on keywords processed concurrently in one cycle.
    pub max_concurrent_keywords: usize,
    /// Upper bound on concurrent fetches against any single site.
    pub per_site_fetch_limit: usize,
    /// Jitter slept before dispatching each keyword, in milliseconds.
    pub keyword_jitter_ms: (u64, u64),
    /// Jitter slept before each individual site fetch, in milliseconds.
    pub site_jitter_ms: (u64, u64),
    pub proxy_source_url: String,
    pub smtp: Option<SmtpConfig>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("max_concurrent_keywords", &self.max_concurrent_keywords)
            .field("per_site_fetch_limit", &self.per_site_fetch_limit)
            .field("keyword_jitter_ms", &self.keyword_jitter_ms)
            .field("site_jitter_ms", &self.site_jitter_ms)
            .field("proxy_source_url", &self.proxy_source_url)
            .field("smtp", &self.smtp)
            .finish()
    }
}
