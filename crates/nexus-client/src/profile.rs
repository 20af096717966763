use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::Bytes;
use tracing::{error, info};

use nexus_types::api::ProfileUpdateRequest;
use nexus_types::models::User;

use crate::api::ForumApi;
use crate::error::{ClientError, Result};
use crate::notify::{Notification, Notifier};
use crate::session::SessionHandle;

/// Notification toggles from the settings dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPrefs {
    pub email: bool,
    pub push: bool,
    pub mentions: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email: false,
            push: false,
            mentions: true,
        }
    }
}

struct PendingCover {
    file_name: String,
    bytes: Bytes,
}

/// Editable copy of the signed-in user's profile.
pub struct ProfileSettings<A: ForumApi> {
    api: Arc<A>,
    session: SessionHandle,
    notifier: Arc<dyn Notifier>,
    original: User,

    pub username: String,
    pub email: String,
    pub bio: String,
    pub notifications: NotificationPrefs,
    cover_preview: Option<String>,
    pending_cover: Option<PendingCover>,
}

impl<A: ForumApi> ProfileSettings<A> {
    /// Seed the draft from the session user.
    pub fn open(api: Arc<A>, session: SessionHandle, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let user = session.current_user().ok_or(ClientError::Unauthenticated)?;
        Ok(Self {
            api,
            session,
            notifier,
            username: user.username.clone(),
            email: user.email.clone().unwrap_or_default(),
            bio: user.bio.clone().unwrap_or_default(),
            notifications: NotificationPrefs::default(),
            cover_preview: None,
            pending_cover: None,
            original: user,
        })
    }

    pub fn user(&self) -> &User {
        &self.original
    }

    pub fn verified_badge(&self) -> bool {
        self.original.is_identity_verified()
    }

    pub fn avatar_url(&self) -> &str {
        self.original.avatar_url()
    }

    /// Cover image to show: a freshly picked file wins over the saved one.
    pub fn cover_url(&self) -> Option<&str> {
        self.cover_preview
            .as_deref()
            .or(self.original.cover_photo.as_deref())
    }

    /// Load a cover image from disk and keep a `data:` url preview of it.
    pub async fn set_cover_from_file(&mut self, path: &Path) -> Result<&str> {
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_for(path);
        self.cover_preview = Some(format!("data:{};base64,{}", mime, B64.encode(&bytes)));
        self.pending_cover = Some(PendingCover {
            file_name: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("cover")
                .to_string(),
            bytes: Bytes::from(bytes),
        });
        Ok(self.cover_preview.as_deref().unwrap_or_default())
    }

    /// Fields that differ from the saved profile.
    pub fn changes(&self) -> ProfileUpdateRequest {
        let changed = |draft: &str, saved: Option<&str>| {
            (draft != saved.unwrap_or_default()).then(|| draft.to_string())
        };

        ProfileUpdateRequest {
            username: changed(&self.username, Some(self.original.username.as_str())),
            email: changed(&self.email, self.original.email.as_deref()),
            bio: changed(&self.bio, self.original.bio.as_deref()),
            avatar: None,
            cover_photo: None,
        }
    }

    /// Anything to save: a changed field or a newly picked cover.
    pub fn is_dirty(&self) -> bool {
        self.pending_cover.is_some() || !self.changes().is_empty()
    }

    /// Upload a picked cover, send changed fields, and refresh the session user.
    pub async fn save(&mut self) -> Result<User> {
        let token = self.session.token().ok_or(ClientError::Unauthenticated)?;
        let mut update = self.changes();

        if let Some(cover) = &self.pending_cover {
            let uploaded = self
                .api
                .upload_file(&token, &cover.file_name, cover.bytes.clone())
                .await
                .map_err(|e| self.failed(e))?;
            update.cover_photo = Some(uploaded.url);
        }

        if update.is_empty() {
            return Ok(self.original.clone());
        }

        let user = self
            .api
            .update_profile(&token, &update)
            .await
            .map_err(|e| self.failed(e))?;

        info!(user_id = user.id, "Profile updated");
        self.session.update_user(user.clone());
        self.original = user.clone();
        self.cover_preview = None;
        self.pending_cover = None;
        self.notifier
            .notify(Notification::info("Profile Saved", "Your profile has been updated"));
        Ok(user)
    }

    fn failed(&self, e: ClientError) -> ClientError {
        error!("Failed to save profile: {}", e);
        self.notifier
            .notify(Notification::error("Failed to save profile", e.user_message()));
        e
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
