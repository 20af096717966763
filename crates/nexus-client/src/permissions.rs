use nexus_types::models::{Message, User};

/// What the viewer may do with one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessagePermissions {
    /// The viewer wrote this message.
    pub is_own: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_like: bool,
    pub can_reply: bool,
}

impl MessagePermissions {
    /// Authors edit and delete their own messages; any signed-in user may
    /// like or reply. Anonymous viewers only read.
    pub fn evaluate(viewer: Option<&User>, message: &Message) -> Self {
        let Some(viewer) = viewer else {
            return Self::default();
        };

        let is_own = viewer.id == message.author_id();
        Self {
            is_own,
            can_edit: is_own,
            can_delete: is_own,
            can_like: true,
            can_reply: true,
        }
    }
}
