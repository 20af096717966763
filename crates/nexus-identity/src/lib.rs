//! Nexus identity helpers
//!
//! National-ID (TC Kimlik No) checks: the offline checksum every valid
//! number satisfies, and the KPS verifier that asks the population registry
//! whether a number belongs to the given person.

pub mod checksum;

#[cfg(feature = "kps")]
pub mod kps;

/// Result of a registry check: whether it matched, and a message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub success: bool,
    pub message: String,
}

impl VerificationOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}
