use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{
    authenticator::{JSON_CONTENT_TYPE, authenticate, bearer},
    bootstrap,
    config::Config,
    errors::Error,
    navigation::{APP_ROOT, LogNavigator, Navigator},
    request::{ApiRequest, RequestBody},
    request_context::RequestDispatchContext,
    telemetry::refresh::RefreshTelemetry,
    token::TokenStore,
    types::{Profile, ReissueResponse},
};

pub const ME_PATH: &str = "/v4/users/me";
pub const REISSUE_PATH: &str = "/v4/auth/reissue";
pub const LOGOUT_PATH: &str = "/v4/auth/logout";

/// HTTP client for the locker backend.
///
/// Every request goes through [`authenticate`]; a first 401 triggers a shared
/// reissue and a single replay. Clones share the token store and refresh slot.
#[derive(Clone)]
pub struct ApiClient {
    ctx: Arc<RequestDispatchContext>,
}

impl ApiClient {
    /// Client whose session-ending redirects are only logged.
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::with_navigator(config, Arc::new(LogNavigator))
    }

    pub fn with_navigator(config: Config, navigator: Arc<dyn Navigator>) -> Result<Self, Error> {
        let ctx = RequestDispatchContext::build(&config, navigator)?;
        Ok(Self { ctx: Arc::new(ctx) })
    }

    pub fn with_token_store(
        config: Config,
        tokens: Arc<TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Error> {
        let ctx = RequestDispatchContext::with_token_store(&config, tokens, navigator)?;
        Ok(Self { ctx: Arc::new(ctx) })
    }

    pub fn tokens(&self) -> Arc<TokenStore> {
        self.ctx.tokens()
    }

    pub fn context(&self) -> &RequestDispatchContext {
        &self.ctx
    }

    /// Consumes a `token` query parameter from the landing URL and returns the
    /// cleaned URL. See [`bootstrap::consume_token_param`].
    pub fn bootstrap(&self, location: &str) -> Result<reqwest::Url, Error> {
        bootstrap::consume_token_param(location, &self.ctx.tokens(), self.ctx.navigator())
    }

    /// Sends `request`, recovering once from an expired credential.
    ///
    /// A 401 on the first attempt joins (or starts) the shared reissue. With a
    /// new credential the request is replayed exactly once and that result is
    /// final, 401 included. If the reissue fails the original 401 is returned.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<Response, Error> {
        let unauthorized = match self.dispatch(&request).await {
            Err(err @ Error::Unauthorized { .. }) => err,
            other => return other,
        };
        if request.skip_reissue || request.retried {
            return Err(unauthorized);
        }
        request.retried = true;

        let client = self.clone();
        let refreshed = self
            .ctx
            .coordinator()
            .refresh(move |telemetry| async move { client.reissue(telemetry).await })
            .await;
        let Some(token) = refreshed else {
            return Err(unauthorized);
        };
        let Some(header) = bearer(&token) else {
            return Err(unauthorized);
        };
        request.headers.insert(AUTHORIZATION, header);
        info!(method = %request.method, path = %request.path, "request.replay");
        self.dispatch(&request).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let resp = self.execute(request).await?;
        Ok(resp.json::<T>().await?)
    }

    /// Asks the backend who the current session belongs to. A 401 means
    /// "no session", not an error.
    pub async fn fetch_me(&self) -> Result<Option<Profile>, Error> {
        match self.execute(ApiRequest::get(ME_PATH).skip_reissue()).await {
            Ok(resp) => Ok(Some(resp.json::<Profile>().await?)),
            Err(Error::Unauthorized { .. }) => {
                debug!("profile fetch returned 401; no session");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Best-effort backend logout, then always drops the local session and
    /// navigates to the application root.
    pub async fn logout(&self) {
        if let Err(err) = self
            .execute(ApiRequest::post(LOGOUT_PATH).skip_reissue())
            .await
        {
            warn!(error = %err, "logout.backend_failed");
        }
        self.ctx.tokens().clear();
        self.ctx.navigator().redirect(APP_ROOT);
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<Response, Error> {
        let mut headers = request.headers.clone();
        let credential = self.ctx.tokens().get();
        authenticate(&mut headers, &request.body, credential.as_deref());

        let builder = self
            .ctx
            .http_client()
            .request(request.method.clone(), self.ctx.url(&request.path))
            .headers(headers);
        let builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(form) => builder.multipart(form.to_multipart()?),
        };

        debug!(
            method = %request.method,
            path = %request.path,
            retried = request.retried,
            "request.send"
        );
        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;
        check_status(resp, &request.path).await
    }

    /// The refresh operation run by the coordinator. Stores the new credential
    /// on success; on failure clears the session and sends the user home.
    async fn reissue(&self, telemetry: RefreshTelemetry) -> Option<String> {
        telemetry.emit_start();
        match self.request_reissue().await {
            Ok(token) => {
                self.ctx.tokens().set(Some(token.clone()));
                telemetry.emit_success();
                Some(token)
            }
            Err(err) => {
                telemetry.emit_failure(&err);
                self.ctx.tokens().clear();
                self.ctx.navigator().redirect(APP_ROOT);
                None
            }
        }
    }

    async fn request_reissue(&self) -> Result<String, Error> {
        let resp = self
            .ctx
            .http_client()
            .post(self.ctx.url(REISSUE_PATH))
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let resp = check_status(resp, REISSUE_PATH).await?;
        let body: ReissueResponse = resp.json().await?;
        if body.access_token.trim().is_empty() {
            return Err(Error::Reissue("empty access token".into()));
        }
        Ok(body.access_token)
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.ctx.timeout())
        } else {
            Error::Transport(err)
        }
    }
}

async fn check_status(resp: Response, path: &str) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        warn!(path, status = status.as_u16(), "request.unauthorized 401");
        Err(Error::Unauthorized { body })
    } else {
        warn!(path, status = status.as_u16(), body = %body, "request.failed");
        Err(Error::Status { status, body })
    }
}
