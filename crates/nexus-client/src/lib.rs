pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod permissions;
pub mod profile;
pub mod registration;
pub mod session;
pub mod thread_view;
pub mod time;
pub mod verification;

pub use api::{ForumApi, HttpForumApi};
pub use config::ClientConfig;
pub use error::{ClientError, FieldError, Result};
pub use session::{Session, SessionHandle};
