//! Eolia 云端网关
//!
//! 封装 Panasonic Eolia 云端 API 的访问：登录、设备列表、状态读写。
//! 引擎侧只依赖 [`CloudGateway`] trait，HTTP 细节（会话 Cookie、
//! operation_token 的铸造）由 [`EoliaClient`] 承担。
//!
//! 错误分层：
//! - 网络 / 协议错误 -> `CloudError::Transport`
//! - 云端返回的业务错误码 -> `CloudError::Rejected`
//! - 会话失效 -> `CloudError::Unauthorized`，由调用方决定是否重新登录

use async_trait::async_trait;
use domain::Status;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// operation_token 的有效期（毫秒）。云端在该窗口内信任本地快照。
pub const OPERATION_TOKEN_LIFETIME_MS: i64 = 600_000;

const BASE_URL: &str = "https://app.rac.apws.panasonic.com/eolia/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("cloud transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("cloud rejected request: code={code} message={message}")]
    Rejected { code: String, message: String },
    #[error("cloud session expired or credentials invalid")]
    Unauthorized,
}

/// 云端登记的设备。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudDevice {
    pub appliance_id: String,
    pub nickname: String,
}

/// 云端访问抽象。测试中以桩实现替换。
#[async_trait]
pub trait CloudGateway: Send + Sync {
    /// 列出账号名下的全部设备。
    async fn list_devices(&self) -> Result<Vec<CloudDevice>, CloudError>;

    /// 读取设备当前状态。
    async fn fetch_status(&self, appliance_id: &str) -> Result<Status, CloudError>;

    /// 下发目标状态。返回云端回显的状态，其中携带新铸造的 operation_token。
    async fn apply_status(&self, status: &Status) -> Result<Status, CloudError>;
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct DeviceListResponse {
    ac_list: Vec<CloudDevice>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// 基于 reqwest 的云端客户端。会话 Cookie 由内置 cookie store 维护。
pub struct EoliaClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    password: String,
}

impl EoliaClient {
    pub fn new(user_id: String, password: String) -> Result<Self, CloudError> {
        Self::with_base_url(BASE_URL.to_string(), user_id, password)
    }

    pub fn with_base_url(
        base_url: String,
        user_id: String,
        password: String,
    ) -> Result<Self, CloudError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            user_id,
            password,
        })
    }

    /// 登录并建立会话。启动时调用一次；会话失效后可重试。
    pub async fn login(&self) -> Result<(), CloudError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&serde_json::json!({
                "idpw": {
                    "id": self.user_id,
                    "pass": self.password,
                    "terminal_type": 3,
                    "next_easy": true,
                }
            }))
            .send()
            .await?;
        let response = check_response(response).await?;
        let body: LoginResponse = response.json().await?;
        debug!(target: "eolia.cloud", has_token = body.access_token.is_some(), "cloud login ok");
        Ok(())
    }
}

/// 非 2xx 响应转换为 CloudError。
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, CloudError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(CloudError::Unauthorized);
    }
    let body: ErrorBody = response.json().await.unwrap_or(ErrorBody {
        code: None,
        message: None,
    });
    Err(CloudError::Rejected {
        code: body.code.unwrap_or_else(|| status.as_u16().to_string()),
        message: body.message.unwrap_or_else(|| "unknown cloud error".to_string()),
    })
}

#[async_trait]
impl CloudGateway for EoliaClient {
    async fn list_devices(&self) -> Result<Vec<CloudDevice>, CloudError> {
        let response = self
            .http
            .get(format!("{}/devices", self.base_url))
            .send()
            .await?;
        let response = check_response(response).await?;
        let body: DeviceListResponse = response.json().await?;
        debug!(target: "eolia.cloud", count = body.ac_list.len(), "cloud device list fetched");
        Ok(body.ac_list)
    }

    async fn fetch_status(&self, appliance_id: &str) -> Result<Status, CloudError> {
        let response = self
            .http
            .get(format!(
                "{}/devices/{appliance_id}/status",
                self.base_url
            ))
            .send()
            .await?;
        let response = check_response(response).await?;
        let status: Status = response.json().await?;
        Ok(status)
    }

    async fn apply_status(&self, status: &Status) -> Result<Status, CloudError> {
        let response = self
            .http
            .put(format!(
                "{}/devices/{}/status",
                self.base_url, status.appliance_id
            ))
            .json(status)
            .send()
            .await?;
        let response = check_response(response).await?;
        let applied: Status = response.json().await?;
        Ok(applied)
    }
}
