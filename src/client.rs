use colored::*;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{ApiError, FALLBACK_MESSAGE};
use crate::models::ApiResponse;
use crate::session::Session;

/// What happens once a request comes back 401.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

/// Tells the user to log in again.
pub struct PromptLogin;

impl LoginRedirect for PromptLogin {
    fn redirect_to_login(&self) {
        println!(
            "{} Session expired. Log in again with: {}",
            "↳".blue(),
            "transcribe login".bold()
        );
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    config: Config,
    session: Arc<Session>,
    redirect: Arc<dyn LoginRedirect>,
    // Set once the redirect fired for the current session.
    redirected: AtomicBool,
}

impl ApiClient {
    pub fn new(config: Config, session: Arc<Session>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            config,
            session,
            redirect: Arc::new(PromptLogin),
            redirected: AtomicBool::new(false),
        })
    }

    pub fn with_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Stores a fresh token and re-arms the login redirect.
    pub fn remember_token(&self, token: &str) -> anyhow::Result<()> {
        self.session.set_token(token)?;
        self.redirected.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.config.endpoint(path);
        log::debug!("{} {}", method, url);

        let builder = self.http.request(method, url);
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        Ok(response)
    }

    fn handle_unauthorized(&self) {
        log::warn!("Service answered 401, dropping stored session");
        if let Err(e) = self.session.clear() {
            log::error!("Failed to clear session: {:#}", e);
        }
        if !self.redirected.swap(true, Ordering::SeqCst) {
            self.redirect.redirect_to_login();
        }
    }

    /// Sends the request and returns the raw envelope, `success: false` included.
    pub(crate) async fn envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Sends the request and unwraps `data` from a successful envelope.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let envelope = self.envelope::<T>(request).await?;
        if !envelope.success {
            return Err(ApiError::rejected(envelope.message, envelope.code));
        }
        envelope.data.ok_or(ApiError::MissingData)
    }

    /// Like [`call`](Self::call), but a missing or `null` payload means empty.
    pub(crate) async fn call_or_default<T: DeserializeOwned + Default>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let envelope = self.envelope::<T>(request).await?;
        if !envelope.success {
            return Err(ApiError::rejected(envelope.message, envelope.code));
        }
        Ok(envelope.data.unwrap_or_default())
    }

    /// Like [`call`](Self::call) for endpoints that only report success.
    pub(crate) async fn call_unit(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let envelope = self.envelope::<serde_json::Value>(request).await?;
        if !envelope.success {
            return Err(ApiError::rejected(envelope.message, envelope.code));
        }
        Ok(envelope.message)
    }

    pub(crate) async fn call_bytes(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = self.execute(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub(crate) async fn call_text(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = self.execute(request).await?;
        Ok(response.text().await?)
    }
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = match serde_json::from_str::<ApiResponse<serde_json::Value>>(body) {
        Ok(envelope) if !envelope.message.is_empty() => envelope.message,
        Ok(envelope) => match envelope.code.as_deref() {
            Some(code) => crate::error::error_message(code).to_string(),
            None => FALLBACK_MESSAGE.to_string(),
        },
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => FALLBACK_MESSAGE.to_string(),
    };
    ApiError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_prefers_envelope_message() {
        let err = status_error(
            StatusCode::NOT_FOUND,
            r#"{"success": false, "message": "task not found"}"#,
        );
        assert_eq!(err.to_string(), "Service error (404 Not Found): task not found");
    }

    #[test]
    fn test_status_error_uses_code_or_body() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"success": false, "message": "", "code": "FILE_TOO_LARGE"}"#,
        );
        assert!(err.to_string().ends_with("File exceeds the size limit"));

        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert!(err.to_string().ends_with("upstream down"));

        let err = status_error(StatusCode::BAD_GATEWAY, "");
        assert!(err.to_string().ends_with(FALLBACK_MESSAGE));
    }

    #[test]
    fn test_request_attaches_bearer_token() {
        let session = Arc::new(Session::with_token("secret"));
        let client = ApiClient::new(Config::with_url("http://localhost:1/api"), session).unwrap();
        let request = client.request(Method::GET, "/user/self").build().unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:1/api/user/self");
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer secret"
        );
    }

    #[test]
    fn test_request_without_session_has_no_auth() {
        let client = ApiClient::new(Config::default(), Arc::new(Session::in_memory())).unwrap();
        let request = client.request(Method::GET, "/transcription/languages").build().unwrap();
        assert!(request.headers().get("authorization").is_none());
    }
}
