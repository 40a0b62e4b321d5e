//! HTTP client for the campaign backend.
//!
//! The backend owns off-chain campaign records (titles, targets, donation
//! counters, photos) behind a small JSON API:
//!
//! ```text
//! GET    /funds/?limit=&offset=     list campaigns
//! GET    /funds/{id}                one campaign (404 when absent)
//! POST   /funds/                    create
//! PATCH  /funds/{id}                partial update
//! DELETE /funds/{id}                delete
//! POST   /funds/{id}/donate         record an off-chain donation
//! POST   /funds/{id}/upload-photo   multipart photo upload
//! GET    /auth/me                   current user (Bearer token)
//! ```
//!
//! Amounts here are the backend's own integer units and deliberately never
//! mix with on-chain wei. Error responses carry a `detail` field, which is
//! surfaced verbatim in [`ApiError::Api`].

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Matches the client-side request timeout used against the RPC endpoint.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-success status; `detail` is the
    /// server's own message when it sent one.
    #[error("backend returned {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("backend unreachable: {0}")]
    Network(String),

    #[error("malformed backend response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::InvalidResponse(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// WIRE TYPES
// ════════════════════════════════════════════════════════════════════════════

/// A campaign record as the backend stores it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Fund {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub target: u64,
    pub collected: u64,
    pub donate_count: u64,
    pub photo_url: Option<String>,
    pub created_at: String,
}

/// Partial campaign payload for create and update. Absent fields are left
/// untouched by the server.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FundDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donate_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Authenticated user profile. The auth service controls the exact field
/// set, so unrecognized fields are retained rather than dropped.
#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub detail: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PhotoUploadResponse {
    pub photo_url: String,
}

#[derive(Serialize)]
struct DonatePayload {
    amount: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

// ════════════════════════════════════════════════════════════════════════════
// CLIENT
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct BackendClient {
    base: String,
    client: Client,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(base: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        BackendClient {
            base: base.into(),
            client,
            token: None,
        }
    }

    /// Attach a Bearer token for authenticated endpoints.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub async fn list_funds(&self, limit: u32, offset: u32) -> Result<Vec<Fund>, ApiError> {
        let url = format!("{}/funds/?limit={}&offset={}", self.base, limit, offset);
        let resp = self.get(&url).await?;
        let funds = Self::success(resp).await?.json::<Vec<Fund>>().await?;
        Ok(funds)
    }

    /// `Ok(None)` when the campaign does not exist.
    pub async fn get_fund(&self, fund_id: i64) -> Result<Option<Fund>, ApiError> {
        let url = format!("{}/funds/{}", self.base, fund_id);
        let resp = self.get(&url).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let fund = Self::success(resp).await?.json::<Fund>().await?;
        Ok(Some(fund))
    }

    pub async fn create_fund(&self, draft: &FundDraft) -> Result<Fund, ApiError> {
        let url = format!("{}/funds/", self.base);
        let resp = self.post_json(&url, draft).await?;
        let fund = Self::success(resp).await?.json::<Fund>().await?;
        debug!(fund_id = fund.id, "campaign created");
        Ok(fund)
    }

    pub async fn update_fund(&self, fund_id: i64, draft: &FundDraft) -> Result<Fund, ApiError> {
        let url = format!("{}/funds/{}", self.base, fund_id);
        let mut req = self.client.patch(&url).json(draft);
        req = self.authorize(req);
        let resp = req.send().await?;
        let fund = Self::success(resp).await?.json::<Fund>().await?;
        Ok(fund)
    }

    pub async fn delete_fund(&self, fund_id: i64) -> Result<DeleteResponse, ApiError> {
        let url = format!("{}/funds/{}", self.base, fund_id);
        let mut req = self.client.delete(&url);
        req = self.authorize(req);
        let resp = req.send().await?;
        let body = Self::success(resp).await?.json::<DeleteResponse>().await?;
        Ok(body)
    }

    /// Record a donation in the backend's own units. This is bookkeeping
    /// only; the on-chain transfer happens through the donation workflow.
    pub async fn donate(&self, fund_id: i64, amount: u64) -> Result<Fund, ApiError> {
        let url = format!("{}/funds/{}/donate", self.base, fund_id);
        let resp = self.post_json(&url, &DonatePayload { amount }).await?;
        let fund = Self::success(resp).await?.json::<Fund>().await?;
        debug!(fund_id, amount, collected = fund.collected, "donation recorded");
        Ok(fund)
    }

    pub async fn upload_photo(
        &self,
        fund_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<PhotoUploadResponse, ApiError> {
        let url = format!("{}/funds/{}/upload-photo", self.base, fund_id);
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let mut req = self.client.post(&url).multipart(form);
        req = self.authorize(req);
        let resp = req.send().await?;
        let body = Self::success(resp)
            .await?
            .json::<PhotoUploadResponse>()
            .await?;
        Ok(body)
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        let url = format!("{}/auth/me", self.base);
        let resp = self.get(&url).await?;
        let user = Self::success(resp).await?.json::<User>().await?;
        Ok(user)
    }

    // ── plumbing ─────────────────────────────────────────────────────────

    async fn get(&self, url: &str) -> Result<Response, ApiError> {
        let req = self.authorize(self.client.get(url));
        Ok(req.send().await?)
    }

    async fn post_json<T: Serialize>(&self, url: &str, body: &T) -> Result<Response, ApiError> {
        let req = self.authorize(self.client.post(url).json(body));
        Ok(req.send().await?)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Pass a success response through; turn anything else into
    /// [`ApiError::Api`], pulling the server's `detail` out of the body.
    async fn success(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.detail)
            .unwrap_or(text);
        Err(ApiError::Api {
            status: status.as_u16(),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fund_json(id: i64, collected: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "category_id": 4,
            "title": "Shelter support",
            "description": "Food and medical care",
            "target": 100_000,
            "collected": collected,
            "donate_count": 3,
            "photo_url": "/uploads/shelter.jpg",
            "created_at": "2024-05-20T12:00:00"
        })
    }

    #[tokio::test]
    async fn test_list_funds_passes_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/funds/"))
            .and(query_param("limit", "5"))
            .and(query_param("offset", "10"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([fund_json(1, 500)])),
            )
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        let funds = client.list_funds(5, 10).await.unwrap();
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].title, "Shelter support");
        assert_eq!(funds[0].collected, 500);
    }

    #[tokio::test]
    async fn test_get_fund_maps_404_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/funds/99"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"detail": "not found"})),
            )
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        assert!(client.get_fund(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_fund_serializes_only_set_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/funds/"))
            .and(body_json(serde_json::json!({
                "title": "Shelter support",
                "target": 100_000
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(fund_json(7, 0)))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        let draft = FundDraft {
            title: Some("Shelter support".to_string()),
            target: Some(100_000),
            ..FundDraft::default()
        };
        let fund = client.create_fund(&draft).await.unwrap();
        assert_eq!(fund.id, 7);
    }

    #[tokio::test]
    async fn test_update_fund_patches_only_set_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/funds/7"))
            .and(body_json(serde_json::json!({
                "description": "Updated story"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(fund_json(7, 500)))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        let draft = FundDraft {
            description: Some("Updated story".to_string()),
            ..FundDraft::default()
        };
        let fund = client.update_fund(7, &draft).await.unwrap();
        assert_eq!(fund.id, 7);
        assert_eq!(fund.collected, 500);
    }

    #[tokio::test]
    async fn test_upload_photo_sends_multipart_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/funds/7/upload-photo"))
            .and(body_string_contains("name=\"file\""))
            .and(body_string_contains("filename=\"shelter.jpg\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"photo_url": "/uploads/shelter.jpg"})),
            )
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        let resp = client
            .upload_photo(7, "shelter.jpg", b"\x89PNG".to_vec())
            .await
            .unwrap();
        assert_eq!(resp.photo_url, "/uploads/shelter.jpg");
    }

    #[tokio::test]
    async fn test_donate_posts_amount_and_returns_updated_fund() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/funds/1/donate"))
            .and(body_json(serde_json::json!({ "amount": 250 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(fund_json(1, 750)))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        let fund = client.donate(1, 250).await.unwrap();
        assert_eq!(fund.collected, 750);
    }

    #[tokio::test]
    async fn test_error_detail_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/funds/1/donate"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"detail": "amount must be positive"})),
            )
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        match client.donate(1, 0).await {
            Err(ApiError::Api { status, detail }) => {
                assert_eq!(status, 400);
                assert_eq!(detail, "amount must be positive");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_fund_reports_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/funds/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"success": true, "detail": "fund 3 deleted"}),
            ))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri());
        let resp = client.delete_fund(3).await.unwrap();
        assert!(resp.success);
    }

    #[tokio::test]
    async fn test_me_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
                "email": "user@example.com",
                "wallet": "0x1111111111111111111111111111111111111111"
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri()).with_token("tok-123");
        let user = client.me().await.unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.extra["wallet"], "0x1111111111111111111111111111111111111111");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let client = BackendClient::new("http://127.0.0.1:9");
        assert!(matches!(
            client.list_funds(10, 0).await,
            Err(ApiError::Network(_))
        ));
    }
}
