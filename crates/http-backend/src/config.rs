/// The base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Builder for [`HttpBackendConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct HttpBackendConfigBuilder {
    base_url: Option<String>,
}

impl HttpBackendConfigBuilder {
    /// Creates a builder with the given base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: Some(base_url.into()),
        }
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> HttpBackendConfig {
        HttpBackendConfig {
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// Configuration for the HTTP backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpBackendConfig {
    pub(crate) base_url: String,
}

impl HttpBackendConfig {
    /// Returns the configured base URL.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for HttpBackendConfig {
    #[inline]
    fn default() -> Self {
        HttpBackendConfigBuilder::default().build()
    }
}
