pub mod account;
pub mod profile;
pub mod thread;

use std::path::PathBuf;
use std::sync::Arc;

use nexus_client::notify::Notifier;
use nexus_client::session::SessionHandle;
use nexus_client::{ClientConfig, HttpForumApi};

use crate::output::StderrNotifier;
use crate::session_file;

/// Everything a command needs, built once in `main`.
pub struct Context {
    pub api: Arc<HttpForumApi>,
    pub config: ClientConfig,
    pub session_file: PathBuf,
}

impl Context {
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::new(StderrNotifier)
    }

    pub fn session(&self) -> anyhow::Result<SessionHandle> {
        session_file::load(&self.session_file)
    }

    /// Session that must belong to a signed-in user.
    pub fn signed_in(&self) -> anyhow::Result<SessionHandle> {
        let session = self.session()?;
        if !session.is_authenticated() {
            anyhow::bail!("Not signed in. Run `nexus login` first.");
        }
        Ok(session)
    }
}
