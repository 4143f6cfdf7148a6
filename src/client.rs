//! The shared client that every call is configured from.
//!
//! The [`RestClient`] type holds the process-wide setup: transport, default
//! headers, default authorization, default logging sink, application version,
//! tracking counters and the alert window. Use [`RestClientBuilder`] to
//! configure and create clients, then start calls with the verb constructors.

use crate::{
    alerts::{AlertSink, AlertWindow, LogAlertSink},
    auth::{AuthorizationProvider, NoAuthorization},
    connectivity::{AssumeOnline, ConnectivityCheck},
    logging::{LoggingSink, TracingSink},
    tracking::TrackingCounters,
    transport::{ReqwestTransport, Transport},
    Error, RestBuilder, Result, ResultFactory,
};
use bytes::Bytes;
use http::{header::ACCEPT, HeaderMap, HeaderName, HeaderValue, Method};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Shared configuration and state for HTTP calls.
///
/// The client is designed to be reused across many calls and is cheap to
/// clone. Clones share the transport, the defaults, the tracking counters and
/// the alert window.
///
/// # Examples
///
/// ```no_run
/// use restbuilder::{RestClient, StaticToken};
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct CreateUser {
///     name: String,
/// }
///
/// #[derive(Debug, Default, Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), restbuilder::Error> {
/// let client = RestClient::builder()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .authorization(Arc::new(StaticToken::bearer("secret")))
///     .app_version("2.4.1")
///     .build()?;
///
/// // GET request
/// let user = client
///     .get::<User>("/users/123")
///     .tracking_id("RB2001")
///     .execute()
///     .await;
/// println!("User: {:?}", user.result_object);
///
/// // POST request
/// let created = client
///     .post::<User, _>("/users", CreateUser { name: "Alice".to_string() })
///     .tracking_id("RB2002")
///     .on_failure(|record| eprintln!("Create failed with {:?}", record.status))
///     .execute()
///     .await;
/// println!("Created: {}", created.succeeded);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: Option<Url>,
    default_headers: HeaderMap,
    defaults: RwLock<Defaults>,
    connectivity: Arc<dyn ConnectivityCheck>,
    alert_sink: Arc<dyn AlertSink>,
    tracking: TrackingCounters,
    alerts: AlertWindow,
}

struct Defaults {
    authorization: Arc<dyn AuthorizationProvider>,
    logging_sink: Arc<dyn LoggingSink>,
    app_version: Option<String>,
}

impl RestClient {
    /// Creates a new `RestClientBuilder` for configuring a client.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use restbuilder::RestClient;
    ///
    /// # async fn example() -> Result<(), restbuilder::Error> {
    /// let client = RestClient::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::new()
    }

    /// Starts a call with any method, payload and result factory.
    ///
    /// The verb constructors below cover the common cases.
    ///
    /// # Type Parameters
    ///
    /// * `R` - The result object type
    /// * `S` - The send payload type (must implement `Serialize` to execute)
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use http::Method;
    /// use restbuilder::{RestClient, ResultFactory};
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Search { query: String }
    ///
    /// # async fn example() -> Result<(), restbuilder::Error> {
    /// let client = RestClient::builder().build()?;
    ///
    /// let record = client
    ///     .request(
    ///         Method::POST,
    ///         "https://api.example.com/search",
    ///         Some(Search { query: "rust".to_string() }),
    ///         ResultFactory::<Vec<String>>::json(),
    ///     )
    ///     .tracking_id("RB2010")
    ///     .execute()
    ///     .await;
    /// # Ok(())
    /// # }
    /// ```
    pub fn request<R, S>(
        &self,
        method: Method,
        uri: impl Into<String>,
        send_object: Option<S>,
        factory: ResultFactory<R>,
    ) -> RestBuilder<'_, R, S> {
        RestBuilder::new(self, method, uri.into(), send_object, factory)
    }

    /// Starts a GET call whose JSON response decodes into `R`.
    pub fn get<R>(&self, uri: impl Into<String>) -> RestBuilder<'_, R, ()>
    where
        R: DeserializeOwned + Default,
    {
        self.request(Method::GET, uri, None, ResultFactory::json())
    }

    /// Starts a GET call that keeps the response as text.
    pub fn get_text(&self, uri: impl Into<String>) -> RestBuilder<'_, String, ()> {
        self.request(Method::GET, uri, None, ResultFactory::text())
    }

    /// Starts a GET call whose result object is the raw response body.
    pub fn get_raw(&self, uri: impl Into<String>) -> RestBuilder<'_, Bytes, ()> {
        self.request(Method::GET, uri, None, ResultFactory::raw())
    }

    /// Starts a POST call that sends `payload`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use restbuilder::RestClient;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize)]
    /// struct Login { user: String, password: String }
    ///
    /// #[derive(Debug, Default, Deserialize)]
    /// struct Session { token: String }
    ///
    /// # async fn example() -> Result<(), restbuilder::Error> {
    /// let client = RestClient::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let login = Login { user: "alice".to_string(), password: "hunter2".to_string() };
    /// let record = client
    ///     .post::<Session, _>("/login", login)
    ///     .tracking_id("RB2003")
    ///     .no_authorization()
    ///     .exclude_content_logging(true)
    ///     .execute()
    ///     .await;
    /// # Ok(())
    /// # }
    /// ```
    pub fn post<R, S>(&self, uri: impl Into<String>, payload: S) -> RestBuilder<'_, R, S>
    where
        R: DeserializeOwned + Default,
        S: Serialize,
    {
        self.request(Method::POST, uri, Some(payload), ResultFactory::json())
    }

    /// Starts a POST call with no body.
    pub fn post_empty<R>(&self, uri: impl Into<String>) -> RestBuilder<'_, R, ()>
    where
        R: DeserializeOwned + Default,
    {
        self.request(Method::POST, uri, None, ResultFactory::json())
    }

    /// Starts a PUT call that sends `payload`.
    pub fn put<R, S>(&self, uri: impl Into<String>, payload: S) -> RestBuilder<'_, R, S>
    where
        R: DeserializeOwned + Default,
        S: Serialize,
    {
        self.request(Method::PUT, uri, Some(payload), ResultFactory::json())
    }

    /// Starts a PATCH call that sends `payload`.
    pub fn patch<R, S>(&self, uri: impl Into<String>, payload: S) -> RestBuilder<'_, R, S>
    where
        R: DeserializeOwned + Default,
        S: Serialize,
    {
        self.request(Method::PATCH, uri, Some(payload), ResultFactory::json())
    }

    /// Starts a DELETE call. The response is kept as text.
    pub fn delete(&self, uri: impl Into<String>) -> RestBuilder<'_, String, ()> {
        self.request(Method::DELETE, uri, None, ResultFactory::text())
    }

    /// Replaces the authorization provider used by calls that do not set one.
    pub fn set_default_authorization(&self, provider: Arc<dyn AuthorizationProvider>) {
        self.inner.defaults.write().authorization = provider;
    }

    /// Replaces the logging sink used by calls that do not set one.
    pub fn set_default_logging_sink(&self, sink: Arc<dyn LoggingSink>) {
        self.inner.defaults.write().logging_sink = sink;
    }

    /// Sets the application version reported with every metric and fault.
    pub fn set_app_version(&self, version: impl Into<String>) {
        self.inner.defaults.write().app_version = Some(version.into());
    }

    /// Invocation counts per tracking id.
    pub fn tracking(&self) -> &TrackingCounters {
        &self.inner.tracking
    }

    /// Last-fired timestamps of the built-in alerts.
    pub fn alerts(&self) -> &AlertWindow {
        &self.inner.alerts
    }

    /// The application version, if one was set.
    pub fn app_version(&self) -> Option<String> {
        self.inner.defaults.read().app_version.clone()
    }

    pub(crate) fn default_authorization(&self) -> Arc<dyn AuthorizationProvider> {
        self.inner.defaults.read().authorization.clone()
    }

    pub(crate) fn default_logging_sink(&self) -> Arc<dyn LoggingSink> {
        self.inner.defaults.read().logging_sink.clone()
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub(crate) fn connectivity(&self) -> &dyn ConnectivityCheck {
        self.inner.connectivity.as_ref()
    }

    pub(crate) fn alert_sink(&self) -> &dyn AlertSink {
        self.inner.alert_sink.as_ref()
    }

    pub(crate) fn default_headers(&self) -> &HeaderMap {
        &self.inner.default_headers
    }

    /// Joins `uri` onto the base URL, or parses it as absolute when there is none.
    pub(crate) fn resolve_url(&self, uri: &str) -> Result<Url> {
        match &self.inner.base_url {
            Some(base) => Ok(base.join(uri)?),
            None => Ok(Url::parse(uri)?),
        }
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.base_url.as_ref().map(Url::as_str))
            .field("default_headers", &self.inner.default_headers)
            .field("app_version", &self.app_version())
            .finish_non_exhaustive()
    }
}

/// Builder for configuring and creating a [`RestClient`].
///
/// # Examples
///
/// ```no_run
/// use restbuilder::{RestClientBuilder, TracingSink};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), restbuilder::Error> {
/// let client = RestClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .logging_sink(Arc::new(TracingSink))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RestClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
    authorization: Option<Arc<dyn AuthorizationProvider>>,
    logging_sink: Option<Arc<dyn LoggingSink>>,
    app_version: Option<String>,
    connectivity: Option<Arc<dyn ConnectivityCheck>>,
    alert_sink: Option<Arc<dyn AlertSink>>,
}

impl RestClientBuilder {
    /// Creates a new `RestClientBuilder` with default settings.
    ///
    /// Default headers start with `Accept: application/json`.
    pub fn new() -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            base_url: None,
            default_headers,
            timeout: None,
            transport: None,
            authorization: None,
            logging_sink: None,
            app_version: None,
            connectivity: None,
            alert_sink: None,
        }
    }

    /// Sets the base URL that relative call URIs are joined onto.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the request timeout of the default transport.
    ///
    /// Ignored when a custom transport is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the default `reqwest` transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the default authorization provider.
    ///
    /// Without one, calls that require authorization add no header.
    pub fn authorization(mut self, provider: Arc<dyn AuthorizationProvider>) -> Self {
        self.authorization = Some(provider);
        self
    }

    /// Sets the default logging sink. Defaults to [`TracingSink`].
    pub fn logging_sink(mut self, sink: Arc<dyn LoggingSink>) -> Self {
        self.logging_sink = Some(sink);
        self
    }

    /// Sets the application version reported with metrics and faults.
    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    /// Sets the connectivity check used by calls with a precheck.
    /// Defaults to [`AssumeOnline`].
    pub fn connectivity(mut self, check: Arc<dyn ConnectivityCheck>) -> Self {
        self.connectivity = Some(check);
        self
    }

    /// Sets where alerts are shown. Defaults to [`LogAlertSink`].
    pub fn alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    /// Builds the configured `RestClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default transport cannot be built.
    pub fn build(self) -> Result<RestClient> {
        let transport = match self.transport {
            Some(transport) => {
                if self.timeout.is_some() {
                    tracing::debug!("Timeout ignored for a custom transport");
                }
                transport
            }
            None => Arc::new(ReqwestTransport::with_timeout(self.timeout)?),
        };

        let defaults = Defaults {
            authorization: self
                .authorization
                .unwrap_or_else(|| Arc::new(NoAuthorization)),
            logging_sink: self.logging_sink.unwrap_or_else(|| Arc::new(TracingSink)),
            app_version: self.app_version,
        };

        Ok(RestClient {
            inner: Arc::new(ClientInner {
                transport,
                base_url: self.base_url,
                default_headers: self.default_headers,
                defaults: RwLock::new(defaults),
                connectivity: self.connectivity.unwrap_or_else(|| Arc::new(AssumeOnline)),
                alert_sink: self.alert_sink.unwrap_or_else(|| Arc::new(LogAlertSink)),
                tracking: TrackingCounters::new(),
                alerts: AlertWindow::new(),
            }),
        })
    }
}

impl Default for RestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
