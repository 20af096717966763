use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use nexus_types::api::{
    ApiErrorBody, AuthResponse, CreateMessageRequest, LikeResponse, LoginRequest,
    ProfileUpdateRequest, RegisterRequest, UpdateMessageRequest, UploadResponse,
    ValidateTcRequest, ValidateTcResponse,
};
use nexus_types::models::{Message, Thread, User};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Header carrying the original file name on uploads.
pub const FILENAME_HEADER: &str = "x-filename";

/// Every call the forum client makes against the server. Message calls are
/// always scoped to a thread.
#[async_trait]
pub trait ForumApi: Send + Sync {
    async fn validate_tc(&self, req: &ValidateTcRequest) -> Result<ValidateTcResponse>;

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse>;

    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse>;

    async fn fetch_thread(&self, thread_id: i64) -> Result<Thread>;

    /// Messages in server order; the first one is the originating post.
    async fn fetch_messages(&self, thread_id: i64) -> Result<Vec<Message>>;

    async fn create_message(&self, token: &str, req: &CreateMessageRequest) -> Result<Message>;

    async fn update_message(
        &self,
        token: &str,
        thread_id: i64,
        message_id: i64,
        content: &str,
    ) -> Result<Message>;

    async fn delete_message(&self, token: &str, thread_id: i64, message_id: i64) -> Result<()>;

    async fn like_message(&self, token: &str, thread_id: i64, message_id: i64) -> Result<LikeResponse>;

    async fn upload_file(&self, token: &str, file_name: &str, bytes: Bytes) -> Result<UploadResponse>;

    async fn update_profile(&self, token: &str, req: &ProfileUpdateRequest) -> Result<User>;
}

/// REST/JSON implementation over reqwest.
#[derive(Debug, Clone)]
pub struct HttpForumApi {
    client: Client,
    base_url: String,
}

impl HttpForumApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, &config.api_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Turn non-2xx responses into `ClientError`, keeping the server's message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    warn!("{} {} failed: {}", status.as_u16(), url, message);

    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthenticated);
    }
    Err(ClientError::Api { status, message })
}

#[async_trait]
impl ForumApi for HttpForumApi {
    async fn validate_tc(&self, req: &ValidateTcRequest) -> Result<ValidateTcResponse> {
        debug!("POST /api/auth/validate-tc");
        self.send_json(self.client.post(self.url("/api/auth/validate-tc")).json(req))
            .await
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse> {
        debug!(username = %req.username, "POST /api/auth/register");
        self.send_json(self.client.post(self.url("/api/auth/register")).json(req))
            .await
    }

    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse> {
        debug!(username = %req.username, "POST /api/auth/login");
        self.send_json(self.client.post(self.url("/api/auth/login")).json(req))
            .await
    }

    async fn fetch_thread(&self, thread_id: i64) -> Result<Thread> {
        debug!(thread_id, "GET thread");
        self.send_json(self.client.get(self.url(&format!("/api/threads/{thread_id}"))))
            .await
    }

    async fn fetch_messages(&self, thread_id: i64) -> Result<Vec<Message>> {
        debug!(thread_id, "GET messages");
        self.send_json(
            self.client
                .get(self.url(&format!("/api/threads/{thread_id}/messages"))),
        )
        .await
    }

    async fn create_message(&self, token: &str, req: &CreateMessageRequest) -> Result<Message> {
        debug!(thread_id = req.thread_id, "POST message");
        self.send_json(
            self.client
                .post(self.url("/api/messages"))
                .bearer_auth(token)
                .json(req),
        )
        .await
    }

    async fn update_message(
        &self,
        token: &str,
        thread_id: i64,
        message_id: i64,
        content: &str,
    ) -> Result<Message> {
        debug!(thread_id, message_id, "PATCH message");
        let body = UpdateMessageRequest {
            content: content.to_string(),
        };
        self.send_json(
            self.client
                .patch(self.url(&format!("/api/messages/{message_id}")))
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }

    async fn delete_message(&self, token: &str, thread_id: i64, message_id: i64) -> Result<()> {
        debug!(thread_id, message_id, "DELETE message");
        self.send(
            self.client
                .delete(self.url(&format!(
                    "/api/threads/{thread_id}/messages/{message_id}"
                )))
                .bearer_auth(token),
        )
        .await?;
        Ok(())
    }

    async fn like_message(&self, token: &str, thread_id: i64, message_id: i64) -> Result<LikeResponse> {
        debug!(thread_id, message_id, "POST like");
        self.send_json(
            self.client
                .post(self.url(&format!(
                    "/api/threads/{thread_id}/messages/{message_id}/like"
                )))
                .bearer_auth(token),
        )
        .await
    }

    async fn upload_file(&self, token: &str, file_name: &str, bytes: Bytes) -> Result<UploadResponse> {
        debug!(file_name, size = bytes.len(), "POST upload");
        self.send_json(
            self.client
                .post(self.url("/api/uploads"))
                .bearer_auth(token)
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .header(FILENAME_HEADER, file_name)
                .body(bytes),
        )
        .await
    }

    async fn update_profile(&self, token: &str, req: &ProfileUpdateRequest) -> Result<User> {
        debug!("PATCH /api/users/me");
        self.send_json(
            self.client
                .patch(self.url("/api/users/me"))
                .bearer_auth(token)
                .json(req),
        )
        .await
    }
}
