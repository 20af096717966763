use std::sync::Arc;

use tracing::{error, info};

use nexus_identity::checksum;
use nexus_types::api::RegisterRequest;

use crate::api::ForumApi;
use crate::error::{ClientError, FieldError, Result};
use crate::notify::{Notification, Notifier};
use crate::session::{Session, SessionHandle};
use crate::verification::{IdentityFields, IdentityVerifier};

const FAILURE_TITLE: &str = "Registration Failed";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub username: String,
    pub display_name: String,
    pub identity: IdentityFields,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Every field constraint, all violations reported (at most one per field).
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        min_chars(&mut errors, "username", &self.username, 3, "Username must be at least 3 characters");
        min_chars(
            &mut errors,
            "display_name",
            &self.display_name,
            2,
            "Display name must be at least 2 characters",
        );

        let tc_no = &self.identity.tc_no;
        if tc_no.chars().count() != checksum::TC_NO_LEN {
            errors.push(FieldError::new("tc_no", "National ID must be 11 digits"));
        } else if !checksum::has_valid_format(tc_no) {
            errors.push(FieldError::new("tc_no", "Invalid national ID format"));
        }

        min_chars(
            &mut errors,
            "first_name",
            &self.identity.first_name,
            2,
            "First name must be at least 2 characters",
        );
        min_chars(
            &mut errors,
            "last_name",
            &self.identity.last_name,
            2,
            "Last name must be at least 2 characters",
        );

        if !is_valid_birth_year(&self.identity.year_of_birth) {
            errors.push(FieldError::new(
                "year_of_birth",
                "Enter a valid birth year (e.g. 1990)",
            ));
        }

        min_chars(&mut errors, "password", &self.password, 6, "Password must be at least 6 characters");
        if self.confirm_password != self.password {
            errors.push(FieldError::new("confirm_password", "Passwords don't match"));
        }

        errors
    }

    fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            username: self.username.clone(),
            password: self.password.clone(),
            display_name: self.display_name.clone(),
            tc_no: self.identity.tc_no.clone(),
            first_name: self.identity.first_name.clone(),
            last_name: self.identity.last_name.clone(),
            year_of_birth: self.identity.year_of_birth.clone(),
        }
    }
}

fn min_chars(errors: &mut Vec<FieldError>, field: &'static str, value: &str, min: usize, message: &str) {
    if value.chars().count() < min {
        errors.push(FieldError::new(field, message));
    }
}

/// Four digits starting with 19 or 20.
fn is_valid_birth_year(year: &str) -> bool {
    year.len() == 4
        && year.bytes().all(|b| b.is_ascii_digit())
        && (year.starts_with("19") || year.starts_with("20"))
}

/// Registration dialog state: the form, its identity verifier, and the
/// session the successful registration starts.
pub struct RegistrationFlow<A: ForumApi> {
    api: Arc<A>,
    notifier: Arc<dyn Notifier>,
    session: SessionHandle,
    verifier: IdentityVerifier<A>,
    pub form: RegisterForm,
}

impl<A: ForumApi> RegistrationFlow<A> {
    pub fn new(api: Arc<A>, notifier: Arc<dyn Notifier>, session: SessionHandle) -> Self {
        let verifier = IdentityVerifier::new(api.clone(), notifier.clone());
        Self {
            api,
            notifier,
            session,
            verifier,
            form: RegisterForm::default(),
        }
    }

    pub fn with_precheck(mut self, precheck: bool) -> Self {
        self.verifier = self.verifier.with_precheck(precheck);
        self
    }

    pub fn verifier(&self) -> &IdentityVerifier<A> {
        &self.verifier
    }

    /// Change identity fields. Any change drops an earlier verification.
    pub fn edit_identity(&mut self, edit: impl FnOnce(&mut IdentityFields)) {
        let before = self.form.identity.clone();
        edit(&mut self.form.identity);
        if self.form.identity != before {
            self.verifier.invalidate();
        }
    }

    pub async fn verify_identity(&self) -> bool {
        self.verifier.verify(&self.form.identity).await
    }

    /// Whether the identity currently in the form is the one verified.
    pub fn is_verified(&self) -> bool {
        self.verifier.is_verified_for(&self.form.identity)
    }

    /// Validate, require verification of the identity being submitted, then
    /// register and start a session.
    pub async fn submit(&mut self) -> Result<Session> {
        let errors = self.form.validate();
        if !errors.is_empty() {
            return Err(ClientError::Validation(errors));
        }

        if !self.is_verified() {
            let err = ClientError::NotVerified;
            self.notifier
                .notify(Notification::error(FAILURE_TITLE, err.user_message()));
            return Err(err);
        }

        match self.api.register(&self.form.to_request()).await {
            Ok(auth) => {
                info!(username = %auth.user.username, "Registered");
                let session = self.session.begin(auth);
                self.form = RegisterForm::default();
                self.verifier.invalidate();
                Ok(session)
            }
            Err(e) => {
                error!("Registration failed: {}", e);
                self.notifier
                    .notify(Notification::error(FAILURE_TITLE, e.user_message()));
                Err(e)
            }
        }
    }
}
