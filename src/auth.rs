//! Authorization providers and header injection.

use crate::{Error, Result};
use async_trait::async_trait;
use http::{header::AUTHORIZATION, HeaderMap, HeaderValue};

/// How a provider's token is turned into an `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// No header is added.
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// `Authorization: <token>`, sent verbatim (shared access signatures).
    Sas,
    /// Reserved for refresh-token flows. Adds nothing today.
    Refresh,
}

/// Supplies the credentials for outbound calls.
///
/// Set a process-wide default with
/// [`RestClientBuilder::authorization`](crate::RestClientBuilder::authorization)
/// or override it per call with
/// [`RestBuilder::authorization`](crate::RestBuilder::authorization).
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use restbuilder::{AuthScheme, AuthorizationProvider};
///
/// struct EnvToken;
///
/// #[async_trait]
/// impl AuthorizationProvider for EnvToken {
///     fn scheme(&self) -> AuthScheme {
///         AuthScheme::Bearer
///     }
///
///     async fn token(&self) -> Option<String> {
///         std::env::var("API_TOKEN").ok()
///     }
/// }
/// ```
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// The scheme this provider's token is used with.
    fn scheme(&self) -> AuthScheme;

    /// Fetches the current token.
    async fn token(&self) -> Option<String>;
}

/// A provider that never authorizes. This is the initial process default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthorization;

#[async_trait]
impl AuthorizationProvider for NoAuthorization {
    fn scheme(&self) -> AuthScheme {
        AuthScheme::None
    }

    async fn token(&self) -> Option<String> {
        None
    }
}

/// A provider with a fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken {
    scheme: AuthScheme,
    token: String,
}

impl StaticToken {
    /// A bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            scheme: AuthScheme::Bearer,
            token: token.into(),
        }
    }

    /// A SAS token, sent verbatim.
    pub fn sas(token: impl Into<String>) -> Self {
        Self {
            scheme: AuthScheme::Sas,
            token: token.into(),
        }
    }
}

#[async_trait]
impl AuthorizationProvider for StaticToken {
    fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    async fn token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}

/// Adds the provider's `Authorization` header to `headers`.
///
/// The token is only requested for schemes that use it.
///
/// # Errors
///
/// Returns a configuration error when a bearer or SAS token is missing or
/// empty, or is not a valid header value.
pub(crate) async fn apply(provider: &dyn AuthorizationProvider, headers: &mut HeaderMap) -> Result<()> {
    let value = match provider.scheme() {
        AuthScheme::None | AuthScheme::Refresh => return Ok(()),
        AuthScheme::Bearer => {
            let token = required_token(provider, "Bearer").await?;
            format!("Bearer {}", token)
        }
        AuthScheme::Sas => required_token(provider, "SAS").await?,
    };

    let value = HeaderValue::try_from(value).map_err(|e| {
        Error::ConfigurationError(format!("Invalid authorization header value: {}", e))
    })?;
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

async fn required_token(provider: &dyn AuthorizationProvider, label: &str) -> Result<String> {
    match provider.token().await {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(Error::ConfigurationError(format!(
            "{} authorization token must be supplied",
            label
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyBearer;

    #[async_trait]
    impl AuthorizationProvider for EmptyBearer {
        fn scheme(&self) -> AuthScheme {
            AuthScheme::Bearer
        }

        async fn token(&self) -> Option<String> {
            Some(String::new())
        }
    }

    struct Refreshing;

    #[async_trait]
    impl AuthorizationProvider for Refreshing {
        fn scheme(&self) -> AuthScheme {
            AuthScheme::Refresh
        }

        async fn token(&self) -> Option<String> {
            panic!("refresh providers are never asked for a token")
        }
    }

    #[tokio::test]
    async fn test_bearer_header() {
        let mut headers = HeaderMap::new();
        apply(&StaticToken::bearer("abc123"), &mut headers)
            .await
            .unwrap();

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc123");
    }

    #[tokio::test]
    async fn test_sas_header_is_verbatim() {
        let mut headers = HeaderMap::new();
        apply(&StaticToken::sas("SharedAccessSignature sr=x&sig=y"), &mut headers)
            .await
            .unwrap();

        assert_eq!(
            headers.get(AUTHORIZATION).unwrap(),
            "SharedAccessSignature sr=x&sig=y"
        );
    }

    #[tokio::test]
    async fn test_empty_bearer_token_is_configuration_error() {
        let mut headers = HeaderMap::new();
        let err = apply(&EmptyBearer, &mut headers).await.unwrap_err();

        assert!(matches!(err, Error::ConfigurationError(_)));
        assert!(headers.is_empty());
    }

    #[tokio::test]
    async fn test_empty_sas_token_is_configuration_error() {
        let mut headers = HeaderMap::new();
        let err = apply(&StaticToken::sas(""), &mut headers).await.unwrap_err();

        assert!(err.to_string().contains("SAS"));
    }

    #[tokio::test]
    async fn test_none_and_refresh_add_nothing() {
        let mut headers = HeaderMap::new();
        apply(&NoAuthorization, &mut headers).await.unwrap();
        apply(&Refreshing, &mut headers).await.unwrap();

        assert!(headers.is_empty());
    }
}
