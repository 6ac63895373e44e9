//! Server configuration.

/// Default maximum number of edits accepted in one batch.
pub const DEFAULT_MAX_BATCH_EDITS: usize = 1000;

/// Configuration for the request handlers.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path of the reverse batch webhook.
    pub webhook_path: String,
    /// Path of the login-completion callback.
    pub login_path: String,
    /// Maximum edits per batch.
    pub max_batch_edits: usize,
}

impl ServerConfig {
    /// Creates a configuration with the default paths.
    pub fn new() -> Self {
        Self {
            webhook_path: "/api/webhook/sheets".to_string(),
            login_path: "/auth/google/callback".to_string(),
            max_batch_edits: DEFAULT_MAX_BATCH_EDITS,
        }
    }

    /// Sets the webhook path.
    pub fn with_webhook_path(mut self, path: impl Into<String>) -> Self {
        self.webhook_path = path.into();
        self
    }

    /// Sets the login-completion path.
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Sets the maximum batch size.
    pub fn with_max_batch_edits(mut self, max: usize) -> Self {
        self.max_batch_edits = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.webhook_path, "/api/webhook/sheets");
        assert_eq!(config.max_batch_edits, 1000);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new()
            .with_webhook_path("/hook")
            .with_login_path("/login/done")
            .with_max_batch_edits(50);

        assert_eq!(config.webhook_path, "/hook");
        assert_eq!(config.login_path, "/login/done");
        assert_eq!(config.max_batch_edits, 50);
    }
}
