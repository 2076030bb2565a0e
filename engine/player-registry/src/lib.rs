//! Player Registry - Tournament sign-ups with admission control
//!
//! This crate stores tournament registrations in a JSON file and enforces the
//! admission rules: a fixed capacity of 48 players, unique UIDs and unique
//! (case-insensitive) emails.

pub mod config;
pub mod error;
pub mod intake;
pub mod migration;
pub mod notify;
pub mod registry;
pub mod store;
pub mod types;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use intake::{IntakeError, RegistrationDesk, RegistrationOutcome, RegistrationRequest};
pub use migration::NormalizeReport;
pub use notify::{FanoutNotifier, Notifier, TracingNotifier};
pub use registry::PlayerRegistry;
pub use types::{NewPlayer, Player, PlayerId, TournamentStatus, MAX_PLAYERS};
