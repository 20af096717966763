use std::path::Path;

use anyhow::Context as _;
use tracing::debug;

use nexus_client::session::{Session, SessionHandle};
use nexus_types::api::AuthResponse;

/// Read a stored session. A missing file means nobody is signed in.
pub fn load(path: &Path) -> anyhow::Result<SessionHandle> {
    let session = SessionHandle::new();
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(session),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };

    let auth: AuthResponse = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a session file", path.display()))?;
    session.begin(auth);
    if !session.is_authenticated() {
        debug!("Stored session has expired");
    }
    Ok(session)
}

pub fn save(path: &Path, session: &Session) -> anyhow::Result<()> {
    let auth = AuthResponse {
        user: session.user.clone(),
        token: session.token.clone(),
    };
    std::fs::write(path, serde_json::to_vec_pretty(&auth)?)
        .with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), "Session saved");
    Ok(())
}

/// Remove the stored session. Returns whether one existed.
pub fn clear(path: &Path) -> anyhow::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}
