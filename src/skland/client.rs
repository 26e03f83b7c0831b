//! HTTP implementation of the attendance service
//!
//! Two hosts are involved: the Hypergryph OAuth endpoint that grants a
//! one-time code for an account token, and the Skland API that exchanges the
//! code for a cred/sign-token pair and serves the binding and attendance
//! endpoints. Both base URLs are overridable so tests can point the client
//! at a mock server.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::error::ServiceError;
use super::{AttendanceOutcome, AttendanceService, Award, Character, Session};

const DEFAULT_AUTH_BASE: &str = "https://as.hypergryph.com";
const DEFAULT_API_BASE: &str = "https://zonai.skland.com";

const GRANT_PATH: &str = "/user/oauth2/v2/grant";
const CRED_PATH: &str = "/api/v1/user/auth/generate_cred_by_code";
const BINDING_PATH: &str = "/api/v1/game/player/binding";
const ATTENDANCE_PATH: &str = "/api/v1/game/attendance";

/// OAuth application code registered for the Skland client
const APP_CODE: &str = "4ca99fa6b56cc2ba";

/// App code identifying Arknights bindings in the binding list
const ARKNIGHTS_APP_CODE: &str = "arknights";

/// Response envelope of the OAuth grant endpoint
#[derive(Debug, Deserialize)]
struct GrantResponse {
    status: i64,
    #[serde(default)]
    msg: String,
    data: Option<GrantData>,
}

#[derive(Debug, Deserialize)]
struct GrantData {
    code: String,
}

/// Response envelope shared by the Skland API endpoints
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredData {
    cred: String,
    token: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct BindingData {
    list: Vec<BindingApp>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BindingApp {
    app_code: String,
    binding_list: Vec<BindingItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BindingItem {
    uid: String,
    channel_master_id: String,
    nick_name: String,
}

#[derive(Debug, Deserialize)]
struct AttendanceData {
    #[serde(default)]
    awards: Vec<AwardItem>,
}

#[derive(Debug, Deserialize)]
struct AwardItem {
    resource: AwardResource,
    count: i64,
}

#[derive(Debug, Deserialize)]
struct AwardResource {
    name: String,
}

/// Reqwest-backed [`AttendanceService`] implementation.
pub struct SklandClient {
    client: Client,
    auth_base: String,
    api_base: String,
}

impl SklandClient {
    /// Create a client against the production endpoints.
    pub fn new() -> Result<Self, ServiceError> {
        Self::with_base_urls(DEFAULT_AUTH_BASE, DEFAULT_API_BASE)
    }

    /// Create a client against custom base URLs (test seam).
    pub fn with_base_urls(auth_base: &str, api_base: &str) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .user_agent(concat!("qiandao/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            auth_base: auth_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Exchange the account token for a one-time OAuth code.
    async fn grant_code(&self, token: &str) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(format!("{}{GRANT_PATH}", self.auth_base))
            .json(&json!({
                "appCode": APP_CODE,
                "token": token,
                "type": 0,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: GrantResponse = response.json().await?;
        if body.status != 0 {
            return Err(ServiceError::Auth(body.msg));
        }
        body.data
            .map(|d| d.code)
            .ok_or_else(|| ServiceError::Auth("grant response carried no code".to_string()))
    }

    /// Exchange the OAuth code for a cred/sign-token pair.
    async fn sign_in(&self, code: &str) -> Result<Session, ServiceError> {
        let response = self
            .client
            .post(format!("{}{CRED_PATH}", self.api_base))
            .json(&json!({
                "code": code,
                "kind": 1,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: ApiResponse<CredData> = response.json().await?;
        if body.code != 0 {
            return Err(ServiceError::Auth(body.message));
        }
        let data = body
            .data
            .ok_or_else(|| ServiceError::Auth("sign-in response carried no cred".to_string()))?;

        Ok(Session {
            cred: data.cred,
            sign_token: data.token,
            user_id: data.user_id,
        })
    }
}

#[async_trait]
impl AttendanceService for SklandClient {
    async fn authorize(&self, token: &str) -> Result<Session, ServiceError> {
        let code = self.grant_code(token).await?;
        let session = self.sign_in(&code).await?;
        tracing::debug!(user_id = %session.user_id, "account authorized");
        Ok(session)
    }

    async fn list_characters(&self, session: &Session) -> Result<Vec<Character>, ServiceError> {
        let response = self
            .client
            .get(format!("{}{BINDING_PATH}", self.api_base))
            .header("cred", &session.cred)
            .header("sign", &session.sign_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: ApiResponse<BindingData> = response.json().await?;
        if body.code != 0 {
            return Err(ServiceError::BindingFetch(body.message));
        }
        let data = body
            .data
            .ok_or_else(|| ServiceError::BindingFetch("binding response carried no list".to_string()))?;

        let characters = data
            .list
            .into_iter()
            .filter(|app| app.app_code == ARKNIGHTS_APP_CODE)
            .flat_map(|app| app.binding_list)
            .map(|item| Character {
                uid: item.uid,
                channel_master_id: item.channel_master_id,
                nick_name: item.nick_name,
            })
            .collect();

        Ok(characters)
    }

    async fn submit_attendance(
        &self,
        session: &Session,
        character: &Character,
    ) -> Result<AttendanceOutcome, ServiceError> {
        let response = self
            .client
            .post(format!("{}{ATTENDANCE_PATH}", self.api_base))
            .header("cred", &session.cred)
            .header("sign", &session.sign_token)
            .json(&json!({
                "uid": character.uid,
                "gameId": character.channel_master_id,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::Status {
                status: response.status().as_u16(),
            });
        }

        // An empty body is the service's way of saying today's attendance
        // already happened on another device.
        let raw = response.text().await?;
        if raw.trim().is_empty() || raw.trim() == "null" {
            return Ok(AttendanceOutcome::AlreadyDone);
        }

        let body: ApiResponse<AttendanceData> =
            serde_json::from_str(&raw).map_err(|e| ServiceError::Rejected {
                code: -1,
                message: format!("unparseable response: {e}"),
            })?;

        if body.code == 0 && body.message == "OK" {
            let awards = body
                .data
                .map(|d| {
                    d.awards
                        .into_iter()
                        .map(|a| Award {
                            name: a.resource.name,
                            count: a.count,
                        })
                        .collect()
                })
                .unwrap_or_default();
            return Ok(AttendanceOutcome::Success { awards });
        }

        Err(ServiceError::Rejected {
            code: body.code,
            message: body.message,
        })
    }
}
