use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, info};

use nexus_types::api::{AuthResponse, Claims};
use nexus_types::models::User;

/// An authenticated user plus the bearer token the API issued for them.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
    /// Token expiry read from its claims. `None` for opaque tokens.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn start(auth: AuthResponse) -> Self {
        let expires_at = token_expiry(&auth.token);
        info!(user_id = auth.user.id, username = %auth.user.username, "Session started");
        Self {
            user: auth.user,
            token: auth.token,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Read `exp` from a JWT without checking its signature; the server is the
/// one that trusts or rejects the token.
fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => DateTime::from_timestamp(data.claims.exp as i64, 0),
        Err(e) => {
            debug!("Token is not a readable JWT: {}", e);
            None
        }
    }
}

/// Shared, explicitly passed session context. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(session))),
        }
    }

    pub fn begin(&self, auth: AuthResponse) -> Session {
        let session = Session::start(auth);
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        session
    }

    /// End the session, returning it if one was active.
    pub fn end(&self) -> Option<Session> {
        let ended = self.inner.write().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(session) = &ended {
            info!(user_id = session.user.id, "Session ended");
        }
        ended
    }

    /// The live session, or `None` if signed out or the token has expired.
    pub fn current(&self) -> Option<Session> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .filter(|s| !s.is_expired(Utc::now()))
            .cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.current().map(|s| s.user)
    }

    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    /// Replace the stored user (after a profile update).
    pub fn update_user(&self, user: User) {
        if let Some(session) = self.inner.write().unwrap_or_else(|e| e.into_inner()).as_mut() {
            session.user = user;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn user() -> User {
        User {
            id: 4,
            username: "mehmet".into(),
            display_name: "Mehmet".into(),
            avatar: None,
            cover_photo: None,
            tc_no: None,
            email: None,
            bio: None,
        }
    }

    fn token(exp: i64) -> String {
        let claims = Claims {
            sub: serde_json::json!(4),
            username: Some("mehmet".into()),
            exp: exp as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"server-secret")).unwrap()
    }

    #[test]
    fn reads_expiry_from_jwt() {
        let exp = (Utc::now() + chrono::Duration::days(30)).timestamp();
        let session = Session::start(AuthResponse { user: user(), token: token(exp) });
        assert_eq!(session.expires_at.map(|t| t.timestamp()), Some(exp));
        assert!(!session.is_expired(Utc::now()));
    }

    #[test]
    fn opaque_token_never_expires() {
        let session = Session::start(AuthResponse { user: user(), token: "opaque".into() });
        assert!(session.expires_at.is_none());
        assert!(!session.is_expired(Utc::now()));
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let exp = (Utc::now() - chrono::Duration::hours(1)).timestamp();
        let handle = SessionHandle::new();
        handle.begin(AuthResponse { user: user(), token: token(exp) });
        assert!(!handle.is_authenticated());
    }

    #[test]
    fn end_clears_every_clone() {
        let handle = SessionHandle::new();
        let view = handle.clone();
        handle.begin(AuthResponse { user: user(), token: "t".into() });
        assert_eq!(view.current_user().map(|u| u.id), Some(4));

        assert!(handle.end().is_some());
        assert!(!view.is_authenticated());
        assert!(handle.end().is_none());
    }
}
