use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Avatar shown for users who never uploaded one.
pub const DEFAULT_AVATAR_URL: &str =
    "https://ui-avatars.com/api/?name=User&background=0084FF&color=fff";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub cover_photo: Option<String>,
    #[serde(default)]
    pub tc_no: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl User {
    /// A user counts as identity-verified once the server has stored a
    /// national-ID number for them.
    pub fn is_identity_verified(&self) -> bool {
        self.tc_no.as_deref().is_some_and(|tc| !tc.is_empty())
    }

    pub fn avatar_url(&self) -> &str {
        self.avatar
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_AVATAR_URL)
    }
}

/// The fixed set of thread tags the forum knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadTag {
    Question,
    Discussion,
    Bug,
    Announcement,
}

impl ThreadTag {
    pub const ALL: [ThreadTag; 4] = [
        ThreadTag::Question,
        ThreadTag::Discussion,
        ThreadTag::Bug,
        ThreadTag::Announcement,
    ];

    /// Case-insensitive lookup. Unknown tags yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "question" => Some(Self::Question),
            "discussion" => Some(Self::Discussion),
            "bug" => Some(Self::Bug),
            "announcement" => Some(Self::Announcement),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Discussion => "discussion",
            Self::Bug => "bug",
            Self::Announcement => "announcement",
        }
    }
}

impl std::fmt::Display for ThreadTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: i64,
    pub title: String,
    /// Raw tag as stored by the server. Use [`Thread::tag`] for the typed view.
    #[serde(default, rename = "tag")]
    pub raw_tag: Option<String>,
}

impl Thread {
    pub fn tag(&self) -> Option<ThreadTag> {
        self.raw_tag.as_deref().and_then(ThreadTag::parse)
    }
}

/// A single post inside a thread. Ordering is owned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub thread_id: i64,
    pub user_id: i64,
    /// Author, embedded by the server when available.
    #[serde(default)]
    pub user: Option<User>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub likes: u32,
}

impl Message {
    pub fn author_id(&self) -> i64 {
        self.user.as_ref().map(|u| u.id).unwrap_or(self.user_id)
    }

    pub fn author_name(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.display_name.as_str())
            .unwrap_or("User")
    }

    /// Merge an updated server copy into this one. The edited flag is sticky:
    /// once set it survives any later copy that omits it.
    pub fn apply_edit(&mut self, updated: Message) {
        let was_edited = self.is_edited;
        let content_changed = self.content != updated.content;
        *self = updated;
        self.is_edited = self.is_edited || was_edited || content_changed;
    }
}
