//! Fluent per-call configuration.

use crate::{
    auth::AuthorizationProvider,
    connectivity::Connectivity,
    content::{ContentStrategy, ContentType, RequestBody},
    hooks::{StatusHook, StatusHookRegistry},
    logging::LoggingSink,
    request::HeaderList,
    transport::TransportResponse,
    RestClient, Result, ResultFactory, ResultRecord,
};
use futures::future::BoxFuture;
use http::{Method, StatusCode};
use std::sync::Arc;

pub(crate) type Callback<'a, R, S> = Box<dyn FnOnce(&mut ResultRecord<R, S>) + Send + 'a>;
pub(crate) type OfflineCallback<'a, R, S> =
    Box<dyn FnOnce(&mut ResultRecord<R, S>, Connectivity) + Send + 'a>;
pub(crate) type ResultContentFn<'a, R, S> =
    Box<dyn FnOnce(&mut ResultRecord<R, S>) -> Result<()> + Send + 'a>;
pub(crate) type SuccessCriteria<'a> = Box<dyn Fn(&TransportResponse) -> bool + Send + 'a>;

/// A single call, configured fluently and run once with
/// [`execute`](RestBuilder::execute).
///
/// Every setter changes one concern and hands the builder back. Nothing is
/// validated until the call executes. Start one from the verb constructors on
/// [`RestClient`].
///
/// Defaults: authorization required, JSON content, the built-in status hooks,
/// success when the status is in `200..400`.
///
/// # Examples
///
/// ```no_run
/// use restbuilder::{ContentType, RestClient};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Login { user: String, password: String }
///
/// # async fn example() -> Result<(), restbuilder::Error> {
/// let client = RestClient::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let login = Login { user: "alice".to_string(), password: "hunter2".to_string() };
/// let record = client
///     .post::<serde_json::Value, _>("/oauth/token", login)
///     .tracking_id("RB3001")
///     .no_authorization()
///     .content_type(ContentType::FormUrlEncoded)
///     .header("X-Client", "mobile")
///     .on_success(|record| println!("Signed in: {:?}", record.result_object))
///     .on_failure(|record| eprintln!("Rejected: {:?}", record.status))
///     .on_exception(|record| eprintln!("Faulted: {:?}", record.fault))
///     .execute()
///     .await;
/// # Ok(())
/// # }
/// ```
pub struct RestBuilder<'a, R, S> {
    pub(crate) client: &'a RestClient,
    pub(crate) method: Method,
    pub(crate) uri: String,
    pub(crate) send_object: Option<S>,
    pub(crate) factory: ResultFactory<R>,
    pub(crate) tracking_id: String,
    pub(crate) authorization_required: bool,
    pub(crate) authorization: Option<Arc<dyn AuthorizationProvider>>,
    pub(crate) logging_sink: Option<Arc<dyn LoggingSink>>,
    pub(crate) success_criteria: Option<SuccessCriteria<'a>>,
    pub(crate) on_success: Option<Callback<'a, R, S>>,
    pub(crate) on_failure: Option<Callback<'a, R, S>>,
    pub(crate) on_exception: Option<Callback<'a, R, S>>,
    pub(crate) default_result: Option<R>,
    pub(crate) result_content: Option<ResultContentFn<'a, R, S>>,
    pub(crate) connectivity_precheck: bool,
    pub(crate) on_offline: Option<OfflineCallback<'a, R, S>>,
    pub(crate) headers: HeaderList,
    pub(crate) content: ContentStrategy<'a, S>,
    pub(crate) exclude_content_logging: bool,
    pub(crate) status_hooks: StatusHookRegistry<'a, R, S>,
}

impl<'a, R, S> RestBuilder<'a, R, S> {
    pub(crate) fn new(
        client: &'a RestClient,
        method: Method,
        uri: String,
        send_object: Option<S>,
        factory: ResultFactory<R>,
    ) -> Self {
        Self {
            client,
            method,
            uri,
            send_object,
            factory,
            tracking_id: String::new(),
            authorization_required: true,
            authorization: None,
            logging_sink: None,
            success_criteria: None,
            on_success: None,
            on_failure: None,
            on_exception: None,
            default_result: None,
            result_content: None,
            connectivity_precheck: false,
            on_offline: None,
            headers: HeaderList::new(),
            content: ContentStrategy::default(),
            exclude_content_logging: false,
            status_hooks: StatusHookRegistry::new(),
        }
    }

    /// Sets the tracking id that correlates logs and metrics with this call
    /// site. Required; a blank id faults the call before dispatch.
    pub fn tracking_id(mut self, tracking_id: impl Into<String>) -> Self {
        self.tracking_id = tracking_id.into();
        self
    }

    /// Sends the call without an `Authorization` header.
    pub fn no_authorization(mut self) -> Self {
        self.authorization_required = false;
        self
    }

    /// Uses `provider` instead of the client's default. Has no effect after
    /// [`no_authorization`](Self::no_authorization).
    pub fn authorization(mut self, provider: Arc<dyn AuthorizationProvider>) -> Self {
        self.authorization = Some(provider);
        self
    }

    /// Reports this call's metric and fault to `sink` instead of the client's default.
    pub fn logging_sink(mut self, sink: Arc<dyn LoggingSink>) -> Self {
        self.logging_sink = Some(sink);
        self
    }

    /// Decides whether a response counts as a success.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use http::StatusCode;
    /// use restbuilder::RestClient;
    ///
    /// # async fn example() -> Result<(), restbuilder::Error> {
    /// # let client = RestClient::builder().build()?;
    /// // A 404 means "not there yet", which this caller treats as success.
    /// let record = client
    ///     .get_text("https://api.example.com/jobs/42")
    ///     .tracking_id("RB3002")
    ///     .success_criteria(|response| {
    ///         response.is_success_status() || response.status == StatusCode::NOT_FOUND
    ///     })
    ///     .execute()
    ///     .await;
    /// # Ok(())
    /// # }
    /// ```
    pub fn success_criteria<F>(mut self, criteria: F) -> Self
    where
        F: Fn(&TransportResponse) -> bool + Send + 'a,
    {
        self.success_criteria = Some(Box::new(criteria));
        self
    }

    /// Runs after a successful response has been processed.
    ///
    /// A panic here is not caught and unwinds out of `execute`.
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut ResultRecord<R, S>) + Send + 'a,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Runs when a response fails the success criteria.
    ///
    /// A panic here is not caught and unwinds out of `execute`.
    pub fn on_failure<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut ResultRecord<R, S>) + Send + 'a,
    {
        self.on_failure = Some(Box::new(callback));
        self
    }

    /// Runs when the engine catches an error. The fault is already on the record.
    ///
    /// A panic here is not caught and unwinds out of `execute`.
    pub fn on_exception<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut ResultRecord<R, S>) + Send + 'a,
    {
        self.on_exception = Some(Box::new(callback));
        self
    }

    /// The result object the record starts with, kept when the call does not succeed.
    pub fn default_result(mut self, result: R) -> Self {
        self.default_result = Some(result);
        self
    }

    /// Replaces the default decoding of a successful response.
    ///
    /// The transform reads `result_content` and sets `result_object`. An error
    /// it returns faults the call.
    pub fn result_content<F>(mut self, transform: F) -> Self
    where
        F: FnOnce(&mut ResultRecord<R, S>) -> Result<()> + Send + 'a,
    {
        self.result_content = Some(Box::new(transform));
        self
    }

    /// Asks the client's connectivity check before dispatching.
    pub fn connectivity_precheck(mut self, enabled: bool) -> Self {
        self.connectivity_precheck = enabled;
        self
    }

    /// Runs instead of the default offline handling when the precheck fails.
    /// Enables the precheck.
    pub fn on_offline<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut ResultRecord<R, S>, Connectivity) + Send + 'a,
    {
        self.connectivity_precheck = true;
        self.on_offline = Some(Box::new(callback));
        self
    }

    /// Runs `hook` when the response carries `status`, replacing any hook
    /// already registered for it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use http::StatusCode;
    /// use restbuilder::RestClient;
    ///
    /// # async fn example() -> Result<(), restbuilder::Error> {
    /// # let client = RestClient::builder().build()?;
    /// let record = client
    ///     .get_text("https://api.example.com/feed")
    ///     .tracking_id("RB3003")
    ///     .on_status(StatusCode::TOO_MANY_REQUESTS, |record| {
    ///         Box::pin(async move {
    ///             record.result_content = Some("Slow down".to_string());
    ///         })
    ///     })
    ///     .execute()
    ///     .await;
    /// # Ok(())
    /// # }
    /// ```
    pub fn on_status<F>(mut self, status: StatusCode, hook: F) -> Self
    where
        F: for<'r> FnMut(&'r mut ResultRecord<R, S>) -> BoxFuture<'r, ()> + Send + 'a,
    {
        self.status_hooks.register(status, StatusHook::custom(hook));
        self
    }

    /// Maps `status` to a built-in or custom hook.
    pub fn status_hook(mut self, status: StatusCode, hook: StatusHook<'a, R, S>) -> Self {
        self.status_hooks.register(status, hook);
        self
    }

    /// Removes whatever hook is registered for `status`, built-in or custom.
    pub fn clear_status_hook(mut self, status: StatusCode) -> Self {
        self.status_hooks.clear(status);
        self
    }

    /// Adds a request header. The last value for a key wins; empty keys or
    /// values are ignored.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Selects how the payload is encoded.
    ///
    /// [`ContentType::Custom`] needs a generator from
    /// [`custom_content`](Self::custom_content); without one the call faults
    /// before dispatch.
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content.set(content_type);
        self
    }

    /// Encodes the payload with `generator`, which receives the payload and its
    /// JSON text.
    pub fn custom_content<F>(mut self, generator: F) -> Self
    where
        F: FnOnce(&S, &str) -> Result<RequestBody> + Send + 'a,
    {
        self.content.set_custom(Box::new(generator));
        self
    }

    /// Logs `"Excluded"` in place of the send and result content.
    pub fn exclude_content_logging(mut self, exclude: bool) -> Self {
        self.exclude_content_logging = exclude;
        self
    }

    /// The configured tracking id.
    pub fn tracking_id_ref(&self) -> &str {
        &self.tracking_id
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The URI as given, before it is joined onto the base URL.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The selected content type.
    pub fn content_kind(&self) -> ContentType {
        self.content.kind()
    }

    /// The status hooks this call will run.
    pub fn status_hooks(&self) -> &StatusHookRegistry<'a, R, S> {
        &self.status_hooks
    }
}

impl<R, S> std::fmt::Debug for RestBuilder<'_, R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBuilder")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("tracking_id", &self.tracking_id)
            .field("authorization_required", &self.authorization_required)
            .field("content_type", &self.content.kind())
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
