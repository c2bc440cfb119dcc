use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use awc::http::header::HeaderMap;
use awc::http::StatusCode;
use awc::{Client, ClientRequest, SendClientRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use stratus_config::{AuthTokens, RefreshTokenParams, StratusConfig, TokenStore};
use tracing::{debug, error};

#[derive(Debug)]
pub struct ServerError {
    status: StatusCode,
    message: String,
}

impl ServerError {
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_owned(),
        }
    }

    fn transport(cause: &str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("internal server error: {cause}"),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "response {}: {}", self.status, self.message)
    }
}

impl Error for ServerError {}

/// Whatever the server sent back, delivered verbatim. Business-level errors
/// (4xx/5xx) are values, not `Err`.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| anyhow!(e))
    }
}

pub struct Request {
    request: ClientRequest,
}

impl Request {
    pub fn get(url: &str) -> Self {
        Self {
            request: Client::new()
                .get(url)
                .insert_header(("User-Agent", "stratus")),
        }
    }

    pub fn post(url: &str) -> Self {
        Self {
            request: Client::new()
                .post(url)
                .insert_header(("User-Agent", "stratus")),
        }
    }

    pub fn patch(url: &str) -> Self {
        Self {
            request: Client::new()
                .patch(url)
                .insert_header(("User-Agent", "stratus")),
        }
    }

    pub fn delete(url: &str) -> Self {
        Self {
            request: Client::new()
                .delete(url)
                .insert_header(("User-Agent", "stratus")),
        }
    }

    pub fn query<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.request = self.request.query(value)?;
        Ok(self)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request = self.request.insert_header((key, value));
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.request = self
            .request
            .insert_header(("Authorization", format!("Bearer {token}")));
        self
    }

    pub async fn send(self) -> Result<ApiResponse> {
        Self::response(self.request.send()).await
    }

    pub async fn send_json<T: Serialize>(self, data: &T) -> Result<ApiResponse> {
        Self::response(self.request.send_json(data)).await
    }

    async fn response(send_request: SendClientRequest) -> Result<ApiResponse> {
        let mut response = send_request
            .await
            .map_err(|e| ServerError::transport(&e.to_string()))?;

        let status = response.status();
        debug!("response from server status: {status}");

        let headers = response.headers().clone();
        let body = response
            .body()
            .await
            .map_err(|e| ServerError::transport(&e.to_string()))?;

        Ok(ApiResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

pub struct ApiContext {
    config: StratusConfig,
    tokens: TokenStore,
}

impl ApiContext {
    fn new(config: StratusConfig, tokens: AuthTokens) -> Self {
        Self {
            config,
            tokens: TokenStore::new(tokens),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.config.base_url, self.config.version, path)
    }

    pub fn access_token(&self) -> String {
        self.tokens.access_token()
    }

    pub async fn refresh(&self) -> Result<()> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            error!("no refresh token available");
            bail!("no refresh token available");
        };

        let url = self.url("refresh");
        let params = RefreshTokenParams::new(&refresh_token);
        let response = Request::get(&url).query(&params)?.send().await?;

        if response.status != StatusCode::OK {
            bail!(ServerError::new(
                response.status,
                &format!("token refresh failed: {}", response.text()),
            ));
        }

        self.tokens.replace(response.json()?);
        Ok(())
    }

    /// Runs `call` once; on a 401 refreshes the tokens and re-invokes `call`
    /// exactly once, returning whatever the retry produced. A failed refresh
    /// propagates without a retry.
    pub async fn with_refresh<F, Fut>(&self, call: F) -> Result<ApiResponse>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<ApiResponse>>,
    {
        let response = call().await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("access token rejected, refreshing and retrying once");
        self.refresh().await?;
        call().await
    }
}

pub struct StratusClient {
    ctx: Arc<ApiContext>,
}

impl StratusClient {
    pub fn new(config: StratusConfig, tokens: AuthTokens) -> Self {
        Self {
            ctx: Arc::new(ApiContext::new(config, tokens)),
        }
    }

    pub fn backups(&self) -> BackupsClient {
        BackupsClient::new(Arc::clone(&self.ctx))
    }

    pub fn access_token(&self) -> String {
        self.ctx.access_token()
    }

    pub async fn refresh(&self) -> Result<()> {
        self.ctx.refresh().await
    }
}

pub struct BackupsClient {
    ctx: Arc<ApiContext>,
}

impl BackupsClient {
    fn new(ctx: Arc<ApiContext>) -> Self {
        Self { ctx }
    }

    async fn organization_backups_inner(&self) -> Result<ApiResponse> {
        let url = self.ctx.url("backups");
        Request::get(&url)
            .bearer(&self.ctx.access_token())
            .send()
            .await
    }

    pub async fn organization_backups(&self) -> Result<ApiResponse> {
        self.ctx
            .with_refresh(|| self.organization_backups_inner())
            .await
    }

    async fn cluster_backups_inner(&self, cluster_slug: &str) -> Result<ApiResponse> {
        let url = self.ctx.url(&format!("backups/cluster/{cluster_slug}"));
        Request::get(&url)
            .bearer(&self.ctx.access_token())
            .send()
            .await
    }

    pub async fn cluster_backups(&self, cluster_slug: &str) -> Result<ApiResponse> {
        self.ctx
            .with_refresh(|| self.cluster_backups_inner(cluster_slug))
            .await
    }

    async fn organization_cronjobs_inner(&self) -> Result<ApiResponse> {
        let url = self.ctx.url("backups/jobs");
        Request::get(&url)
            .bearer(&self.ctx.access_token())
            .send()
            .await
    }

    pub async fn organization_cronjobs(&self) -> Result<ApiResponse> {
        self.ctx
            .with_refresh(|| self.organization_cronjobs_inner())
            .await
    }

    async fn cluster_cronjobs_inner(&self, cluster_slug: &str) -> Result<ApiResponse> {
        let url = self
            .ctx
            .url(&format!("backups/jobs/cluster/{cluster_slug}"));
        Request::get(&url)
            .bearer(&self.ctx.access_token())
            .send()
            .await
    }

    pub async fn cluster_cronjobs(&self, cluster_slug: &str) -> Result<ApiResponse> {
        self.ctx
            .with_refresh(|| self.cluster_cronjobs_inner(cluster_slug))
            .await
    }

    async fn cronjob_inner(&self, backup_id: &str) -> Result<ApiResponse> {
        let url = self.ctx.url(&format!("backups/jobs/{backup_id}"));
        Request::get(&url)
            .bearer(&self.ctx.access_token())
            .send()
            .await
    }

    pub async fn cronjob(&self, backup_id: &str) -> Result<ApiResponse> {
        self.ctx.with_refresh(|| self.cronjob_inner(backup_id)).await
    }

    async fn create_cronjob_inner<T: Serialize>(
        &self,
        cluster_slug: &str,
        payload: &T,
    ) -> Result<ApiResponse> {
        let url = self.ctx.url(&format!("backups/jobs/{cluster_slug}"));
        Request::post(&url)
            .bearer(&self.ctx.access_token())
            .send_json(payload)
            .await
    }

    pub async fn create_cronjob<T: Serialize>(
        &self,
        cluster_slug: &str,
        payload: &T,
    ) -> Result<ApiResponse> {
        self.ctx
            .with_refresh(|| self.create_cronjob_inner(cluster_slug, payload))
            .await
    }

    async fn update_cronjob_inner<T: Serialize>(
        &self,
        cluster_slug: &str,
        payload: &T,
    ) -> Result<ApiResponse> {
        let url = self.ctx.url(&format!("backups/jobs/{cluster_slug}"));
        Request::patch(&url)
            .bearer(&self.ctx.access_token())
            .send_json(payload)
            .await
    }

    pub async fn update_cronjob<T: Serialize>(
        &self,
        cluster_slug: &str,
        payload: &T,
    ) -> Result<ApiResponse> {
        self.ctx
            .with_refresh(|| self.update_cronjob_inner(cluster_slug, payload))
            .await
    }

    async fn delete_cronjob_inner(&self, cluster_slug: &str, cronjob_id: &str) -> Result<ApiResponse> {
        let url = self
            .ctx
            .url(&format!("backups/jobs/{cluster_slug}/{cronjob_id}"));
        Request::delete(&url)
            .bearer(&self.ctx.access_token())
            .send()
            .await
    }

    pub async fn delete_cronjob(&self, cluster_slug: &str, cronjob_id: &str) -> Result<ApiResponse> {
        self.ctx
            .with_refresh(|| self.delete_cronjob_inner(cluster_slug, cronjob_id))
            .await
    }
}
