#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, TimeZone, Utc};
use reqwest::StatusCode;

use nexus_client::api::ForumApi;
use nexus_client::error::{ClientError, Result};
use nexus_client::notify::{Notifier, RecordingNotifier};
use nexus_client::session::SessionHandle;
use nexus_types::api::{
    AuthResponse, CreateMessageRequest, LikeResponse, LoginRequest, ProfileUpdateRequest,
    RegisterRequest, UploadResponse, ValidateTcRequest, ValidateTcResponse,
};
use nexus_types::models::{Message, Thread, User};

pub const THREAD_ID: i64 = 42;

pub fn user(id: i64) -> User {
    User {
        id,
        username: format!("user{id}"),
        display_name: format!("User {id}"),
        avatar: None,
        cover_photo: None,
        tc_no: None,
        email: None,
        bio: None,
    }
}

pub fn message(id: i64, author: i64, content: &str) -> Message {
    Message {
        id,
        thread_id: THREAD_ID,
        user_id: author,
        user: Some(user(author)),
        content: content.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(id),
        is_edited: false,
        likes: 0,
    }
}

pub fn token_for(user_id: i64) -> String {
    format!("token-{user_id}")
}

pub fn signed_in(user_id: i64) -> SessionHandle {
    let session = SessionHandle::new();
    session.begin(AuthResponse {
        user: user(user_id),
        token: token_for(user_id),
    });
    session
}

pub fn notifier() -> (RecordingNotifier, Arc<dyn Notifier>) {
    let recorder = RecordingNotifier::new();
    (recorder.clone(), Arc::new(recorder))
}

pub struct ForumState {
    pub thread: Thread,
    pub messages: Vec<Message>,
    pub next_id: i64,
    pub verify_response: ValidateTcResponse,
    pub registered: Vec<RegisterRequest>,
    pub profile_updates: Vec<ProfileUpdateRequest>,
    pub uploads: Vec<(String, Bytes)>,
}

/// In-memory forum API that records every call.
pub struct FakeForum {
    pub state: Mutex<ForumState>,
    calls: Mutex<Vec<&'static str>>,
    failing: Mutex<HashSet<&'static str>>,
    /// Held by a test to keep requests in flight.
    pub gate: tokio::sync::Mutex<()>,
}

impl FakeForum {
    pub fn new(messages: Vec<Message>) -> Arc<Self> {
        let next_id = messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        Arc::new(Self {
            state: Mutex::new(ForumState {
                thread: Thread {
                    id: THREAD_ID,
                    title: "Borrow checker woes".into(),
                    raw_tag: Some("Question".into()),
                },
                messages,
                next_id,
                verify_response: ValidateTcResponse {
                    success: true,
                    message: None,
                },
                registered: Vec::new(),
                profile_updates: Vec::new(),
                uploads: Vec::new(),
            }),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    pub fn set_verify_response(&self, success: bool, message: Option<&str>) {
        self.state.lock().unwrap().verify_response = ValidateTcResponse {
            success,
            message: message.map(str::to_string),
        };
    }

    async fn enter(&self, op: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(op);
        drop(self.gate.lock().await);
        if self.failing.lock().unwrap().contains(op) {
            return Err(ClientError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("{op} exploded"),
            });
        }
        Ok(())
    }
}

fn user_from_token(token: &str) -> Result<i64> {
    token
        .strip_prefix("token-")
        .and_then(|id| id.parse().ok())
        .ok_or(ClientError::Unauthenticated)
}

fn not_found() -> ClientError {
    ClientError::Api {
        status: StatusCode::NOT_FOUND,
        message: "Message not found".into(),
    }
}

#[async_trait]
impl ForumApi for FakeForum {
    async fn validate_tc(&self, _req: &ValidateTcRequest) -> Result<ValidateTcResponse> {
        self.enter("validate_tc").await?;
        Ok(self.state.lock().unwrap().verify_response.clone())
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse> {
        self.enter("register").await?;
        let mut state = self.state.lock().unwrap();
        state.registered.push(req.clone());
        let id = 100 + state.registered.len() as i64;
        let mut new_user = user(id);
        new_user.username = req.username.clone();
        new_user.display_name = req.display_name.clone();
        new_user.tc_no = Some(req.tc_no.clone());
        Ok(AuthResponse {
            user: new_user,
            token: token_for(id),
        })
    }

    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse> {
        self.enter("login").await?;
        let mut found = user(1);
        found.username = req.username.clone();
        Ok(AuthResponse {
            user: found,
            token: token_for(1),
        })
    }

    async fn fetch_thread(&self, thread_id: i64) -> Result<Thread> {
        self.enter("fetch_thread").await?;
        let state = self.state.lock().unwrap();
        if thread_id != state.thread.id {
            return Err(not_found());
        }
        Ok(state.thread.clone())
    }

    async fn fetch_messages(&self, _thread_id: i64) -> Result<Vec<Message>> {
        self.enter("fetch_messages").await?;
        Ok(self.state.lock().unwrap().messages.clone())
    }

    async fn create_message(&self, token: &str, req: &CreateMessageRequest) -> Result<Message> {
        self.enter("create_message").await?;
        let author = user_from_token(token)?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        let mut created = message(id, author, &req.content);
        created.thread_id = req.thread_id;
        state.messages.push(created.clone());
        Ok(created)
    }

    async fn update_message(
        &self,
        token: &str,
        _thread_id: i64,
        message_id: i64,
        content: &str,
    ) -> Result<Message> {
        self.enter("update_message").await?;
        user_from_token(token)?;
        let mut state = self.state.lock().unwrap();
        let stored = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(not_found)?;
        stored.content = content.to_string();
        stored.is_edited = true;
        Ok(stored.clone())
    }

    async fn delete_message(&self, token: &str, _thread_id: i64, message_id: i64) -> Result<()> {
        self.enter("delete_message").await?;
        user_from_token(token)?;
        let mut state = self.state.lock().unwrap();
        let before = state.messages.len();
        state.messages.retain(|m| m.id != message_id);
        if state.messages.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn like_message(&self, token: &str, _thread_id: i64, message_id: i64) -> Result<LikeResponse> {
        self.enter("like_message").await?;
        user_from_token(token)?;
        let mut state = self.state.lock().unwrap();
        let stored = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(not_found)?;
        stored.likes += 1;
        Ok(LikeResponse { likes: stored.likes })
    }

    async fn upload_file(&self, token: &str, file_name: &str, bytes: Bytes) -> Result<UploadResponse> {
        self.enter("upload_file").await?;
        user_from_token(token)?;
        self.state
            .lock()
            .unwrap()
            .uploads
            .push((file_name.to_string(), bytes));
        Ok(UploadResponse {
            url: format!("http://cdn.test/{file_name}"),
        })
    }

    async fn update_profile(&self, token: &str, req: &ProfileUpdateRequest) -> Result<User> {
        self.enter("update_profile").await?;
        let id = user_from_token(token)?;
        let mut state = self.state.lock().unwrap();
        state.profile_updates.push(req.clone());
        let mut updated = user(id);
        if let Some(username) = &req.username {
            updated.username = username.clone();
        }
        updated.email = req.email.clone();
        updated.bio = req.bio.clone();
        updated.cover_photo = req.cover_photo.clone();
        Ok(updated)
    }
}
