use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ConsoleError;
use crate::session::SessionStore;
use crate::types::{
    DingBotConfig, LoginResponse, NoticeSummary, Page, PluginDescriptor, SaveReceipt,
    SyncTaskConfig, VulnerabilityDetail, VulnerabilitySummary,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const ENV_BASE_URL: &str = "VULNFUSION_BASE_URL";

/// Fixed upper bound per call; exceeding it surfaces as `RequestFailed`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const API_PREFIX: &str = "/api";

/// The seam every controller programs against. `ConsoleClient` is the real
/// transport; tests substitute scripted fakes.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, ConsoleError>;

    async fn list_vulnerabilities(
        &self,
        query: &[(String, String)],
    ) -> Result<Page<VulnerabilitySummary>, ConsoleError>;

    async fn get_vulnerability(&self, id: i64) -> Result<VulnerabilityDetail, ConsoleError>;

    async fn list_notices(
        &self,
        query: &[(String, String)],
    ) -> Result<Page<NoticeSummary>, ConsoleError>;

    async fn get_sync_task(&self) -> Result<Option<SyncTaskConfig>, ConsoleError>;

    async fn save_sync_task(&self, cfg: &SyncTaskConfig) -> Result<SaveReceipt, ConsoleError>;

    async fn get_bot_config(&self) -> Result<Option<DingBotConfig>, ConsoleError>;

    async fn save_bot_config(&self, cfg: &DingBotConfig) -> Result<SaveReceipt, ConsoleError>;

    async fn list_plugins(&self) -> Result<Vec<PluginDescriptor>, ConsoleError>;

    async fn list_notice_sources(&self) -> Result<Vec<PluginDescriptor>, ConsoleError>;
}

/// Single egress point for all backend calls. Attaches the bearer credential
/// on the way out and intercepts authorization failures on the way back;
/// every other failure passes through to the caller untouched.
pub struct ConsoleClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
    session: Arc<SessionStore>,
}

// The backend also sends a redundant `status_code` field; only `data` is read.
#[derive(Debug, serde::Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorEnvelope {
    data: ErrorData,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorData {
    message: String,
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

impl ConsoleClient {
    pub fn new(
        base_url: impl AsRef<str>,
        session: Arc<SessionStore>,
    ) -> Result<Self, ConsoleError> {
        let base_url = normalize_base_url(base_url.as_ref())?;
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            http: reqwest::Client::new(),
            session,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    pub fn login_path() -> &'static str {
        "/login"
    }

    pub fn vulns_path() -> &'static str {
        "/vulns"
    }

    pub fn vuln_path(id: i64) -> String {
        format!("/vulns/{id}")
    }

    pub fn sec_notices_path() -> &'static str {
        "/sec_notices"
    }

    pub fn sync_task_path() -> &'static str {
        "/sync_data_task"
    }

    pub fn bot_config_path() -> &'static str {
        "/ding_bot_config"
    }

    pub fn plugins_path() -> &'static str {
        "/plugins"
    }

    pub fn notice_sources_path() -> &'static str {
        "/notices"
    }

    async fn get_api<T>(&self, path: &str, query: &[(String, String)]) -> Result<T, ConsoleError>
    where
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .get(self.endpoint(path))
            .header("x-request-id", request_id())
            .timeout(self.timeout);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(transport_error)?;
        self.decode(response).await
    }

    async fn post_api<B, T>(&self, path: &str, body: &B) -> Result<T, ConsoleError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(self.endpoint(path))
            .header("x-request-id", request_id())
            .timeout(self.timeout)
            .json(body);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(transport_error)?;
        self.decode(response).await
    }

    async fn decode<T>(&self, response: reqwest::Response) -> Result<T, ConsoleError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;
        self.interpret(status, &bytes)
    }

    /// Response-stage interceptor. Status 401 is the only place token
    /// invalidation happens; everything else maps onto the error taxonomy
    /// without retries or transformation.
    fn interpret<T>(&self, status: StatusCode, bytes: &[u8]) -> Result<T, ConsoleError>
    where
        T: DeserializeOwned,
    {
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("backend rejected credential, clearing session");
            self.session.clear();
            return Err(ConsoleError::AuthExpired);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ConsoleError::NotFound);
        }
        if status == StatusCode::UNPROCESSABLE_ENTITY || status == StatusCode::BAD_REQUEST {
            return Err(ConsoleError::ValidationRejected {
                message: error_message(bytes),
            });
        }
        if !status.is_success() {
            return Err(ConsoleError::Http {
                status,
                body: body_text(bytes),
            });
        }
        serde_json::from_slice::<Envelope<T>>(bytes)
            .map(|envelope| envelope.data)
            .map_err(|err| ConsoleError::Decode {
                message: err.to_string(),
            })
    }
}

#[async_trait]
impl ConsoleApi for ConsoleClient {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, ConsoleError> {
        self.post_api(Self::login_path(), &LoginBody { username, password })
            .await
    }

    async fn list_vulnerabilities(
        &self,
        query: &[(String, String)],
    ) -> Result<Page<VulnerabilitySummary>, ConsoleError> {
        self.get_api(Self::vulns_path(), query).await
    }

    async fn get_vulnerability(&self, id: i64) -> Result<VulnerabilityDetail, ConsoleError> {
        self.get_api(&Self::vuln_path(id), &[]).await
    }

    async fn list_notices(
        &self,
        query: &[(String, String)],
    ) -> Result<Page<NoticeSummary>, ConsoleError> {
        self.get_api(Self::sec_notices_path(), query).await
    }

    async fn get_sync_task(&self) -> Result<Option<SyncTaskConfig>, ConsoleError> {
        self.get_api(Self::sync_task_path(), &[]).await
    }

    async fn save_sync_task(&self, cfg: &SyncTaskConfig) -> Result<SaveReceipt, ConsoleError> {
        self.post_api(Self::sync_task_path(), cfg).await
    }

    async fn get_bot_config(&self) -> Result<Option<DingBotConfig>, ConsoleError> {
        self.get_api(Self::bot_config_path(), &[]).await
    }

    async fn save_bot_config(&self, cfg: &DingBotConfig) -> Result<SaveReceipt, ConsoleError> {
        self.post_api(Self::bot_config_path(), cfg).await
    }

    async fn list_plugins(&self) -> Result<Vec<PluginDescriptor>, ConsoleError> {
        self.get_api(Self::plugins_path(), &[]).await
    }

    async fn list_notice_sources(&self) -> Result<Vec<PluginDescriptor>, ConsoleError> {
        self.get_api(Self::notice_sources_path(), &[]).await
    }
}

/// `VULNFUSION_BASE_URL` when set, local default otherwise. The second value
/// names where the url came from for startup logging.
pub fn resolve_base_url() -> Result<(String, &'static str), ConsoleError> {
    if let Ok(value) = std::env::var(ENV_BASE_URL) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return normalize_base_url(trimmed).map(|url| (url, ENV_BASE_URL));
        }
    }
    normalize_base_url(DEFAULT_BASE_URL).map(|url| (url, "default_local"))
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConsoleError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConsoleError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ConsoleError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConsoleError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

fn transport_error(err: reqwest::Error) -> ConsoleError {
    ConsoleError::RequestFailed {
        message: err.to_string(),
    }
}

fn error_message(bytes: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(bytes) {
        Ok(envelope) => envelope.data.message,
        Err(_) => body_text(bytes),
    }
}

fn body_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "<empty>".to_string()
    } else {
        trimmed.to_string()
    }
}
