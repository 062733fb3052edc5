use std::time::Duration;

/// Default socket timeout for Elasticsearch requests.
pub const DEFAULT_ELASTICSEARCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Default index holding POI documents.
pub const DEFAULT_INDEX_NAME: &str = "foodpoi";

/// Default index holding postal-code areas.
pub const DEFAULT_POSTAL_INDEX_NAME: &str = "plz";

/// Default cap on documents returned by a box query.
pub const DEFAULT_RESULT_WINDOW: usize = 10_000;

/// Default user agent for Elasticsearch requests.
const DEFAULT_USER_AGENT: &str = "foodpoi/0.1";

/// Connection settings for [`super::ElasticsearchPoiIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticsearchConfig {
    /// Base URL of the cluster, e.g. `"http://localhost:9200"`.
    pub base_url: String,
    /// Index holding POI documents.
    pub index: String,
    /// Optional HTTP proxy URL used for every request.
    pub proxy: Option<String>,
    /// Connect and request timeout.
    pub timeout: Duration,
    /// Maximum documents returned by a box query.
    pub result_window: usize,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_owned(),
            index: DEFAULT_INDEX_NAME.to_owned(),
            proxy: None,
            timeout: DEFAULT_ELASTICSEARCH_TIMEOUT,
            result_window: DEFAULT_RESULT_WINDOW,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl ElasticsearchConfig {
    /// Create a configuration for the cluster at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the index name.
    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Route requests through `proxy`.
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the box query result cap.
    #[must_use]
    pub const fn with_result_window(mut self, result_window: usize) -> Self {
        self.result_window = result_window;
        self
    }
}
