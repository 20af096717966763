//! Thread view controller.
//!
//! Holds everything a thread screen shows (thread header, ordered messages,
//! composer, per-message edit state) and runs the user's actions against the
//! forum API. Every mutation is followed by a refetch; there is no
//! optimistic local state beyond clearing the composer.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use nexus_types::api::CreateMessageRequest;
use nexus_types::content::{self, Segment};
use nexus_types::models::{Message, Thread};

use crate::api::ForumApi;
use crate::error::{ClientError, Result};
use crate::notify::{Notification, Notifier};
use crate::permissions::MessagePermissions;
use crate::session::{Session, SessionHandle};
use crate::time::relative_time;

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this message?";

/// Asks the user to confirm a destructive action.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    Idle,
    Composing,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    input: String,
    pending_attachment: Option<String>,
    state: ComposerState,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            input: String::new(),
            pending_attachment: None,
            state: ComposerState::Idle,
        }
    }
}

impl Composer {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn pending_attachment(&self) -> Option<&str> {
        self.pending_attachment.as_deref()
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    fn set_input(&mut self, input: String) {
        self.input = input;
        if self.state != ComposerState::Submitting {
            self.state = if self.input.is_empty() {
                ComposerState::Idle
            } else {
                ComposerState::Composing
            };
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageMode {
    Viewing,
    Editing { buffer: String },
}

#[derive(Debug, Clone)]
struct EditState {
    message_id: i64,
    buffer: String,
}

/// One message, ready to draw.
#[derive(Debug, Clone)]
pub struct MessageView {
    pub message: Message,
    pub permissions: MessagePermissions,
    pub segments: Vec<Segment>,
    pub posted: String,
    pub mode: MessageMode,
}

#[derive(Debug, Clone, Default)]
pub struct ThreadLayout {
    pub thread: Option<Thread>,
    /// First message of the thread.
    pub originating: Option<MessageView>,
    /// Everything after the first message, in server order.
    pub replies: Vec<MessageView>,
}

pub struct ThreadView<A: ForumApi> {
    api: Arc<A>,
    session: SessionHandle,
    notifier: Arc<dyn Notifier>,
    confirm: Arc<dyn Confirm>,
    cancel: CancellationToken,

    thread_id: i64,
    thread: Option<Thread>,
    messages: Arc<Vec<Message>>,
    loading: bool,
    composer: Composer,
    editing: Option<EditState>,
    saving_edit: bool,

    scroll_generation: u64,
    scrolled_generation: u64,
}

impl<A: ForumApi> ThreadView<A> {
    pub fn new(
        api: Arc<A>,
        session: SessionHandle,
        notifier: Arc<dyn Notifier>,
        confirm: Arc<dyn Confirm>,
        thread_id: i64,
    ) -> Self {
        Self {
            api,
            session,
            notifier,
            confirm,
            cancel: CancellationToken::new(),
            thread_id,
            thread: None,
            messages: Arc::new(Vec::new()),
            loading: false,
            composer: Composer::default(),
            editing: None,
            saving_edit: false,
            scroll_generation: 0,
            scrolled_generation: 0,
        }
    }

    /// Build the view and load its contents.
    pub async fn open(
        api: Arc<A>,
        session: SessionHandle,
        notifier: Arc<dyn Notifier>,
        confirm: Arc<dyn Confirm>,
        thread_id: i64,
    ) -> Result<Self> {
        let mut view = Self::new(api, session, notifier, confirm, thread_id);
        view.refresh().await?;
        Ok(view)
    }

    // -- Accessors --

    pub fn thread_id(&self) -> i64 {
        self.thread_id
    }

    pub fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }

    pub fn messages(&self) -> &Arc<Vec<Message>> {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn is_saving_edit(&self) -> bool {
        self.saving_edit
    }

    pub fn mode_of(&self, message_id: i64) -> MessageMode {
        match &self.editing {
            Some(edit) if edit.message_id == message_id => MessageMode::Editing {
                buffer: edit.buffer.clone(),
            },
            _ => MessageMode::Viewing,
        }
    }

    pub fn scroll_generation(&self) -> u64 {
        self.scroll_generation
    }

    /// True once after every change of the message collection; the renderer
    /// scrolls to the newest message when it sees it.
    pub fn take_scroll_to_bottom(&mut self) -> bool {
        let pending = self.scrolled_generation != self.scroll_generation;
        self.scrolled_generation = self.scroll_generation;
        pending
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token the owning UI can cancel from outside the view, e.g. when the
    /// screen is dismissed while an action is still running.
    pub fn teardown_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tear the view down. Requests still in flight resolve to
    /// `ClientError::Cancelled` and leave the view untouched.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!(thread_id = self.thread_id, "Thread view closed");
            self.cancel.cancel();
        }
    }

    // -- Layout --

    pub fn layout(&self) -> ThreadLayout {
        self.layout_at(Utc::now())
    }

    pub fn layout_at(&self, now: DateTime<Utc>) -> ThreadLayout {
        let viewer = self.session.current_user();
        let mut views = self.messages.iter().map(|message| MessageView {
            permissions: MessagePermissions::evaluate(viewer.as_ref(), message),
            segments: content::render(&message.content),
            posted: relative_time(message.created_at, now),
            mode: self.mode_of(message.id),
            message: message.clone(),
        });

        ThreadLayout {
            thread: self.thread.clone(),
            originating: views.next(),
            replies: views.collect(),
        }
    }

    // -- Loading --

    /// Refetch the thread and its messages.
    pub async fn refresh(&mut self) -> Result<()> {
        let thread_id = self.thread_id;
        self.loading = true;

        let api = self.api.clone();
        let result = self
            .guard(try_join(
                api.fetch_thread(thread_id),
                api.fetch_messages(thread_id),
            ))
            .await;

        match result {
            Ok((thread, messages)) => {
                self.loading = false;
                debug!(thread_id, count = messages.len(), "Thread loaded");
                self.thread = Some(thread);
                self.replace_messages(messages);
                Ok(())
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => {
                self.loading = false;
                error!(thread_id, "Failed to load thread: {}", e);
                self.notifier
                    .notify(Notification::error("Failed to load thread", e.user_message()));
                Err(e)
            }
        }
    }

    /// Swap in a fresh collection. Edited flags already seen stay set.
    fn replace_messages(&mut self, mut messages: Vec<Message>) {
        let edited: HashSet<i64> = self
            .messages
            .iter()
            .filter(|m| m.is_edited)
            .map(|m| m.id)
            .collect();
        for message in &mut messages {
            if edited.contains(&message.id) {
                message.is_edited = true;
            }
        }

        if let Some(edit) = &self.editing {
            if !messages.iter().any(|m| m.id == edit.message_id) {
                self.editing = None;
            }
        }

        self.messages = Arc::new(messages);
        self.scroll_generation += 1;
    }

    // -- Composer --

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.composer.set_input(input.into());
    }

    pub fn insert_emoji(&mut self, emoji: &str) {
        let input = format!("{}{}", self.composer.input, emoji);
        self.composer.set_input(input);
    }

    /// Append an uploaded file's marker to the composer.
    pub fn attach(&mut self, url: &str) {
        let input = content::append_attachment(&self.composer.input, url);
        self.composer.set_input(input);
        self.composer.pending_attachment = Some(url.to_string());
    }

    /// Upload a local file and attach it to the composer.
    pub async fn upload_attachment(&mut self, path: &Path) -> Result<String> {
        let session = self.require_session()?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let bytes = Bytes::from(tokio::fs::read(path).await?);

        let api = self.api.clone();
        let result = self
            .guard(api.upload_file(&session.token, &file_name, bytes))
            .await;

        match result {
            Ok(upload) => {
                info!(file_name, url = %upload.url, "Attachment uploaded");
                self.attach(&upload.url);
                Ok(upload.url)
            }
            Err(e) => Err(self.mutation_failed("upload file", e)),
        }
    }

    /// Post the composer content to the thread.
    pub async fn send(&mut self) -> Result<Message> {
        self.ensure_open()?;
        let content = self.composer.input.trim().to_string();
        if content.is_empty() {
            return Err(ClientError::validation("content", "Message cannot be empty"));
        }
        let session = self.require_session()?;

        self.composer.state = ComposerState::Submitting;
        let request = CreateMessageRequest {
            thread_id: self.thread_id,
            content,
        };

        let api = self.api.clone();
        let result = self
            .guard(api.create_message(&session.token, &request))
            .await;

        match result {
            Ok(message) => {
                info!(thread_id = self.thread_id, message_id = message.id, "Message sent");
                self.composer.clear();
                self.refresh_after_mutation().await;
                Ok(message)
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => {
                self.composer.state = ComposerState::Composing;
                Err(self.mutation_failed("send message", e))
            }
        }
    }

    // -- Editing --

    /// Enter edit mode for one of the viewer's own messages.
    pub fn begin_edit(&mut self, message_id: i64) -> Result<()> {
        let message = self.find(message_id)?;
        let viewer = self.session.current_user();
        if !MessagePermissions::evaluate(viewer.as_ref(), message).can_edit {
            return Err(ClientError::Forbidden("edit this message"));
        }

        let buffer = message.content.clone();
        self.editing = Some(EditState { message_id, buffer });
        Ok(())
    }

    pub fn set_edit_buffer(&mut self, buffer: impl Into<String>) {
        if let Some(edit) = &mut self.editing {
            edit.buffer = buffer.into();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Save the edit buffer. Empty (after trimming) buffers are rejected
    /// without a request.
    pub async fn save_edit(&mut self) -> Result<Message> {
        let Some(edit) = self.editing.clone() else {
            return Err(ClientError::validation("content", "No message is being edited"));
        };
        self.ensure_open()?;
        let content = edit.buffer.trim().to_string();
        if content.is_empty() {
            return Err(ClientError::validation("content", "Message cannot be empty"));
        }
        let session = self.require_session()?;

        self.saving_edit = true;
        let api = self.api.clone();
        let result = self
            .guard(api.update_message(&session.token, self.thread_id, edit.message_id, &content))
            .await;

        match result {
            Ok(updated) => {
                self.saving_edit = false;
                info!(message_id = edit.message_id, "Message updated");
                self.editing = None;
                let mut messages = (*self.messages).clone();
                if let Some(local) = messages.iter_mut().find(|m| m.id == edit.message_id) {
                    local.apply_edit(updated.clone());
                }
                self.replace_messages(messages);
                self.refresh_after_mutation().await;
                Ok(updated)
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => {
                self.saving_edit = false;
                Err(self.mutation_failed("update message", e))
            }
        }
    }

    // -- Delete / like --

    /// Delete one of the viewer's own messages after explicit confirmation.
    /// Returns `Ok(false)` when the user declined.
    pub async fn delete(&mut self, message_id: i64) -> Result<bool> {
        self.ensure_open()?;
        let session = self.require_session()?;
        let message = self.find(message_id)?;
        if !MessagePermissions::evaluate(Some(&session.user), message).can_delete {
            return Err(ClientError::Forbidden("delete this message"));
        }

        if !self.confirm.confirm(DELETE_PROMPT) {
            debug!(message_id, "Delete declined");
            return Ok(false);
        }

        let api = self.api.clone();
        let result = self
            .guard(api.delete_message(&session.token, self.thread_id, message_id))
            .await;

        match result {
            Ok(()) => {
                info!(message_id, "Message deleted");
                if self.editing.as_ref().is_some_and(|e| e.message_id == message_id) {
                    self.editing = None;
                }
                self.refresh_after_mutation().await;
                Ok(true)
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => Err(self.mutation_failed("delete message", e)),
        }
    }

    /// Like a message. The count shown only changes after the refetch.
    pub async fn like(&mut self, message_id: i64) -> Result<()> {
        let session = self.require_session()?;
        self.find(message_id)?;

        let api = self.api.clone();
        let result = self
            .guard(api.like_message(&session.token, self.thread_id, message_id))
            .await;

        match result {
            Ok(_) => {
                debug!(message_id, "Message liked");
                self.refresh_after_mutation().await;
                Ok(())
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => Err(self.mutation_failed("like message", e)),
        }
    }

    // -- Helpers --

    /// Mutations take `&mut self`, so only a torn-down view can still show
    /// a submit or save in progress.
    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ClientError::Cancelled);
        }
        Ok(())
    }

    fn require_session(&self) -> Result<Session> {
        self.session.current().ok_or(ClientError::Unauthenticated)
    }

    fn find(&self, message_id: i64) -> Result<&Message> {
        self.messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or_else(|| ClientError::validation("message", "Message not found in this thread"))
    }

    /// Run `fut` unless the view is torn down first.
    async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
            result = fut => result,
        }
    }

    async fn refresh_after_mutation(&mut self) {
        if let Err(e) = self.refresh().await {
            warn!(thread_id = self.thread_id, "Refresh after mutation failed: {}", e);
        }
    }

    /// Log a failed mutation and tell the user about it.
    fn mutation_failed(&self, action: &str, e: ClientError) -> ClientError {
        if matches!(e, ClientError::Cancelled) {
            return e;
        }
        error!(thread_id = self.thread_id, "Failed to {}: {}", action, e);
        self.notifier.notify(Notification::error(
            format!("Failed to {action}"),
            e.user_message(),
        ));
        e
    }
}

impl<A: ForumApi> Drop for ThreadView<A> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
