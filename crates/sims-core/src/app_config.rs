#[derive(Debug, Clone, PartialEq, Eq)]
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

/// Field delimiter used by the delimited-text files inside a Darwin Core
/// archive. Archives exported by the submission templates are tab-separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetDelimiter {
    #[default]
    Tab,
    Comma,
}

impl SheetDelimiter {
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            SheetDelimiter::Tab => b'\t',
            SheetDelimiter::Comma => b',',
        }
    }
}

impl std::fmt::Display for SheetDelimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetDelimiter::Tab => write!(f, "tab"),
            SheetDelimiter::Comma => write!(f, "comma"),
        }
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
    /// Upper bound on a full scrape-and-persist pass for one submission.
    pub scrape_timeout_secs: u64,
    pub archive_delimiter: SheetDelimiter,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("scrape_timeout_secs", &self.scrape_timeout_secs)
            .field("archive_delimiter", &self.archive_delimiter)
            .finish()
    }
}
