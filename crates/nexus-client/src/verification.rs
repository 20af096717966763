use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{info, warn};

use nexus_identity::checksum;
use nexus_types::api::ValidateTcRequest;

use crate::api::ForumApi;
use crate::error::{ClientError, Result};
use crate::notify::{Notification, Notifier};

const FAILURE_TITLE: &str = "Identity Verification Failed";
const GENERIC_FAILURE: &str = "Identity verification failed";

/// The four identity fields checked against the population registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityFields {
    pub tc_no: String,
    pub first_name: String,
    pub last_name: String,
    pub year_of_birth: String,
}

impl IdentityFields {
    pub fn is_complete(&self) -> bool {
        [&self.tc_no, &self.first_name, &self.last_name, &self.year_of_birth]
            .iter()
            .all(|f| !f.is_empty())
    }

    fn to_request(&self) -> ValidateTcRequest {
        ValidateTcRequest {
            tc_no: self.tc_no.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            year_of_birth: self.year_of_birth.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerificationState {
    pub verified: bool,
    /// A request is outstanding; identity inputs should be disabled.
    pub in_flight: bool,
}

/// Drives the verify button: one request at a time, result kept in a watch
/// channel the form can observe.
pub struct IdentityVerifier<A: ForumApi> {
    api: Arc<A>,
    notifier: Arc<dyn Notifier>,
    precheck: bool,
    state: watch::Sender<VerificationState>,
    /// The exact fields the last successful request vouched for.
    verified_for: Mutex<Option<IdentityFields>>,
}

impl<A: ForumApi> IdentityVerifier<A> {
    pub fn new(api: Arc<A>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            precheck: false,
            state: watch::Sender::new(VerificationState::default()),
            verified_for: Mutex::new(None),
        }
    }

    /// Also run the offline checksum before asking the server.
    pub fn with_precheck(mut self, precheck: bool) -> Self {
        self.precheck = precheck;
        self
    }

    pub fn state(&self) -> VerificationState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<VerificationState> {
        self.state.subscribe()
    }

    pub fn is_verified(&self) -> bool {
        self.state.borrow().verified
    }

    /// Verified, and for exactly these fields.
    pub fn is_verified_for(&self, fields: &IdentityFields) -> bool {
        self.is_verified()
            && self
                .verified_for
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .as_ref()
                == Some(fields)
    }

    pub fn fields_disabled(&self) -> bool {
        self.state.borrow().in_flight
    }

    /// Forget a previous success, e.g. after an identity field changed.
    pub fn invalidate(&self) {
        *self.verified_for.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.state.send_modify(|s| s.verified = false);
    }

    /// Verify `fields` with the server. Returns the resulting verified flag.
    pub async fn verify(&self, fields: &IdentityFields) -> bool {
        if self.state().in_flight {
            return self.is_verified();
        }

        if !fields.is_complete() {
            self.notifier.notify(Notification::error(
                FAILURE_TITLE,
                "Please fill in all identity fields",
            ));
            return self.is_verified();
        }

        match self.request(fields).await {
            Ok(()) => {
                self.notifier.notify(Notification::info(
                    "Identity Verified",
                    "Identity verification completed successfully",
                ));
                true
            }
            Err(e) => {
                let message = match e.user_message() {
                    m if m.is_empty() => "An error occurred during verification".to_string(),
                    m => m,
                };
                self.notifier.notify(Notification::error(FAILURE_TITLE, message));
                false
            }
        }
    }

    /// One verification round trip. A rejection is `ClientError::Verification`
    /// carrying the text to show.
    async fn request(&self, fields: &IdentityFields) -> Result<()> {
        if self.precheck && !checksum::is_valid(&fields.tc_no) {
            self.settle(None);
            return Err(ClientError::Verification("National ID checksum failed".into()));
        }

        self.state.send_modify(|s| s.in_flight = true);
        match self.api.validate_tc(&fields.to_request()).await {
            Ok(response) if response.success => {
                info!("Identity verification succeeded");
                self.settle(Some(fields.clone()));
                Ok(())
            }
            Ok(response) => {
                warn!("Identity verification rejected: {:?}", response.message);
                self.settle(None);
                let message = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| GENERIC_FAILURE.to_string());
                Err(ClientError::Verification(message))
            }
            Err(e) => {
                warn!("Identity verification request failed: {}", e);
                self.settle(None);
                Err(e)
            }
        }
    }

    fn settle(&self, verified_for: Option<IdentityFields>) {
        let verified = verified_for.is_some();
        *self.verified_for.lock().unwrap_or_else(|e| e.into_inner()) = verified_for;
        self.state.send_replace(VerificationState {
            verified,
            in_flight: false,
        });
    }
}
