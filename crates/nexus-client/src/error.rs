use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, ClientError>;

/// A form field that failed client-side validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Rejected before any request was sent.
    #[error("invalid input: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("identity verification failed: {0}")]
    Verification(String),

    #[error("identity verification is required")]
    NotVerified,

    #[error("not signed in")]
    Unauthenticated,

    #[error("not allowed: {0}")]
    Forbidden(&'static str),

    #[error("server returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Text suitable for a notification shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(fields) => fields
                .first()
                .map(|f| f.message.clone())
                .unwrap_or_else(|| "Invalid input".to_string()),
            Self::Verification(message) => message.clone(),
            Self::NotVerified => {
                "Identity verification is required before registering".to_string()
            }
            Self::Unauthenticated => "Please sign in first".to_string(),
            Self::Forbidden(what) => format!("You cannot {what}"),
            Self::Api { message, .. } => message.clone(),
            Self::Http(_) => "Could not reach the server".to_string(),
            Self::Cancelled => "Request cancelled".to_string(),
            Self::Config(message) => message.clone(),
            Self::Io(e) => e.to_string(),
        }
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
