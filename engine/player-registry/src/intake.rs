//! Registration intake for the HTTP layer
//!
//! Validates incoming sign-up payloads, hands them to the registry and sends
//! the confirmation. Also answers the read-only questions the front-end asks
//! (roster, UID/email availability, tournament status).

use crate::error::RegistryError;
use crate::notify::Notifier;
use crate::registry::PlayerRegistry;
use crate::types::{NewPlayer, Player, TournamentStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Sign-up payload as submitted by the registration form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationRequest {
    pub full_name: String,
    pub in_game_name: String,
    pub uid: String,
    pub email: String,
    pub phone: String,
    pub agreement: bool,
}

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every validation failure found in a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> =
            self.errors.iter().map(|e| format!("{}: {}", e.field, e.message)).collect();
        write!(f, "{}", fields.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    /// Whether the given field failed
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl RegistrationRequest {
    /// Check field formats and produce a registration candidate
    pub fn validate(self) -> Result<NewPlayer, ValidationErrors> {
        let mut errors = Vec::new();
        let mut fail = |field: &str, message: &str| {
            errors.push(FieldError { field: field.to_string(), message: message.to_string() })
        };

        if !char_len_between(&self.full_name, 2, 50) {
            fail("fullName", "Name must be between 2 and 50 characters");
        }
        if !char_len_between(&self.in_game_name, 2, 30) {
            fail("inGameName", "In-game name must be between 2 and 30 characters");
        }
        if !is_valid_uid(&self.uid) {
            fail("uid", "Enter a valid UID (9-12 digits)");
        }
        if !is_valid_email(&self.email) {
            fail("email", "Please enter a valid email address");
        }
        if !is_valid_phone(&self.phone) {
            fail("phone", "Enter a valid phone number");
        }
        if !self.agreement {
            fail("agreement", "You must agree to the tournament rules");
        }

        if !errors.is_empty() {
            return Err(ValidationErrors { errors });
        }

        Ok(NewPlayer {
            full_name: self.full_name,
            in_game_name: self.in_game_name,
            uid: self.uid,
            email: self.email,
            phone: self.phone,
            agreement: self.agreement,
        })
    }
}

fn char_len_between(value: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&value.chars().count())
}

/// 9 to 12 ASCII digits
pub fn is_valid_uid(uid: &str) -> bool {
    (9..=12).contains(&uid.len()) && uid.bytes().all(|b| b.is_ascii_digit())
}

/// Optional leading `+`, then 10 to 15 ASCII digits
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (10..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Loose shape check for `local@domain.tld`
///
/// Deliberately more permissive than RFC 5322: it only requires exactly one
/// `@`, a non-empty local part, a domain of at least two non-empty dotted
/// labels, and no whitespace. Quoted local parts and IP-literal domains are
/// not recognized, and many addresses RFC 5322 rejects pass.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

/// Errors returned to the HTTP layer for a sign-up
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl IntakeError {
    /// HTTP status code for the response
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Registry(e) if e.is_admission_rejection() => 409,
            Self::Registry(_) => 500,
        }
    }

    /// Message shown to the player
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation error",
            Self::Registry(RegistryError::CapacityExceeded { .. }) => {
                "Registration is closed: the tournament is full"
            }
            Self::Registry(RegistryError::DuplicateUid { .. }) => {
                "A player with this UID is already registered"
            }
            Self::Registry(RegistryError::DuplicateEmail { .. }) => {
                "A player with this email is already registered"
            }
            Self::Registry(_) => "Registration failed",
        }
    }
}

/// Result of a successful sign-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub player: Player,
    pub notification_sent: bool,
}

/// Front door of the registry for the route layer
#[derive(Clone)]
pub struct RegistrationDesk {
    registry: Arc<PlayerRegistry>,
    notifier: Arc<dyn Notifier>,
}

impl RegistrationDesk {
    pub fn new(registry: Arc<PlayerRegistry>, notifier: Arc<dyn Notifier>) -> Self {
        Self { registry, notifier }
    }

    pub fn registry(&self) -> &Arc<PlayerRegistry> {
        &self.registry
    }

    /// Validate, register and confirm a sign-up
    ///
    /// A failed confirmation is reported through `notification_sent` and does
    /// not affect the registration.
    pub async fn submit(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationOutcome, IntakeError> {
        let candidate = request.validate()?;
        let player = self.registry.register(candidate).await?;

        let notification_sent = self.notifier.registration_confirmed(&player).await;
        if !notification_sent {
            warn!(
                "Registration ID {} stored but {} confirmation was not sent",
                player.id,
                self.notifier.channel()
            );
        }

        Ok(RegistrationOutcome { player, notification_sent })
    }

    /// Full roster
    pub async fn players(&self) -> Result<Vec<Player>, IntakeError> {
        Ok(self.registry.list_all().await?)
    }

    /// Whether a UID is already registered
    pub async fn uid_taken(&self, uid: &str) -> Result<bool, IntakeError> {
        Ok(self.registry.get_by_uid(uid).await?.is_some())
    }

    /// Whether an email is already registered (case-insensitive)
    pub async fn email_taken(&self, email: &str) -> Result<bool, IntakeError> {
        Ok(self.registry.get_by_email(email).await?.is_some())
    }

    /// Registration count, capacity and free slots
    pub async fn status(&self) -> Result<TournamentStatus, IntakeError> {
        Ok(self.registry.status().await?)
    }
}
