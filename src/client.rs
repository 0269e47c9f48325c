//! Main TABStack client implementation.

use crate::automate::Automate;
use crate::error::{Error, Result};
use crate::extract::Extract;
use crate::generate::Generate;
use crate::version::build_user_agent;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.tabstack.ai";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 20;
const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "TABSTACK_API_KEY";
/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "TABSTACK_BASE_URL";

const JSON: &str = "application/json";
const EVENT_STREAM: &str = "text/event-stream";

/// Builder for constructing a [`Client`].
pub struct ClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
    connect_timeout: Duration,
    stream_timeout: Option<Duration>,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Duration,
    user_agent_suffix: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            stream_timeout: None,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT_SECS),
            user_agent_suffix: None,
        }
    }

    /// Create a builder from `TABSTACK_API_KEY` and, if set, `TABSTACK_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::Config(format!("{} is not set", API_KEY_ENV)))?;
        let builder = Self::new(api_key);
        Ok(match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.is_empty() => builder.base_url(url),
            _ => builder,
        })
    }

    /// Set the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the timeout for unary requests.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound the total duration of automate streams. Unbounded by default.
    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of idle pooled connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Set how long idle pooled connections are kept alive.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set a custom User-Agent suffix.
    pub fn user_agent_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.user_agent_suffix = Some(suffix.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        if self.api_key.is_empty() {
            return Err(Error::Config("API key is required".into()));
        }
        if self.base_url.is_empty() {
            return Err(Error::Config("base URL must not be empty".into()));
        }

        // Warn about insecure connections
        if !self.base_url.starts_with("https://") {
            warn!(
                base_url = %self.base_url,
                "API base URL is not using HTTPS. This is insecure."
            );
        }

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::Config("API key contains invalid header characters".into()))?;
        authorization.set_sensitive(true);

        let user_agent = HeaderValue::from_str(&build_user_agent(
            self.user_agent_suffix.as_deref(),
        ))
        .map_err(|_| Error::Config("User-Agent suffix contains invalid characters".into()))?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Client {
            base_url: self.base_url,
            http_client,
            authorization,
            user_agent,
            timeout: self.timeout,
            stream_timeout: self.stream_timeout,
        })
    }
}

/// The main TABStack SDK client.
///
/// Cloning is cheap; clones share one connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use tabstack::{Client, MarkdownRequest};
///
/// #[tokio::main]
/// async fn main() -> Result<(), tabstack::Error> {
///     let client = Client::builder("your-api-key").build()?;
///
///     let result = client
///         .extract()
///         .markdown(MarkdownRequest::new("https://example.com"))
///         .await?;
///
///     println!("{}", result.content);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    base_url: String,
    http_client: reqwest::Client,
    authorization: HeaderValue,
    user_agent: HeaderValue,
    timeout: Duration,
    stream_timeout: Option<Duration>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new client builder.
    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> Result<Self> {
        ClientBuilder::from_env()?.build()
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Markdown conversion, schema generation and structured extraction.
    pub fn extract(&self) -> Extract<'_> {
        Extract::new(self)
    }

    /// AI-powered content transformation.
    pub fn generate(&self) -> Generate<'_> {
        Generate::new(self)
    }

    /// Browser automation with streamed progress events.
    pub fn automate(&self) -> Automate<'_> {
        Automate::new(self)
    }

    // === Internal methods ===

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let value = self.post_value(path, body).await?;
        serde_json::from_value(value).map_err(Error::Json)
    }

    /// POST and return the JSON body. An empty body reads as `{}`.
    pub(crate) async fn post_value<B: Serialize>(&self, path: &str, body: &B) -> Result<Value> {
        let url = self.url(path);
        debug!(url = %url, "Sending request");

        let response = self
            .http_client
            .post(&url)
            .headers(self.headers(JSON))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(Error::transport)?;

        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }

        let bytes = response.bytes().await.map_err(Error::transport)?;
        if bytes.is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_slice(&bytes).map_err(Error::Json)
    }

    /// POST and return the response once headers arrive, leaving the body to
    /// be streamed.
    pub(crate) async fn post_stream<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        debug!(url = %url, "Opening event stream");

        let mut request = self
            .http_client
            .post(&url)
            .headers(self.headers(EVENT_STREAM))
            .json(body);
        if let Some(timeout) = self.stream_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(Error::transport)?;

        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with(EVENT_STREAM) {
            warn!(
                content_type = content_type,
                "Expected an event stream response"
            );
        }

        Ok(response)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn headers(&self, accept: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers
    }
}
