//! Legacy roster records
//!
//! Early versions of the site wrote records with a `name` key instead of
//! `fullName`, and the very first registration (id 1) was stored without an
//! email. Two entry points handle them:
//!
//! - [`upgrade_record`] reads a stored record into a [`Player`] in memory,
//!   keeping its ID. The file itself is not touched.
//! - [`migrate_records`] is the one-off repair that rewrites a file into the
//!   current shape. It renumbers every record from 1; running it again after
//!   new registrations can change the IDs players already hold.

use crate::types::{email_key, Player, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// The only legacy record allowed to lack an email
const EMAIL_EXEMPT_ID: PlayerId = 1;

/// A roster entry as older versions may have written it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyPlayerRecord {
    pub id: Option<PlayerId>,
    pub full_name: Option<String>,
    pub name: Option<String>,
    pub in_game_name: Option<String>,
    pub uid: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub registered_at: Option<String>,
    pub agreement: Option<bool>,
}

impl LegacyPlayerRecord {
    /// Name under either key, ignoring blank values
    fn display_name(&self) -> Option<&str> {
        non_blank(&self.full_name).or_else(|| non_blank(&self.name))
    }
}

/// Why a legacy record was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscardReason {
    MissingName,
    MissingUid,
    MissingEmail,
    DuplicateUid,
    DuplicateEmail,
}

/// Summary of a normalization pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeReport {
    /// Records written back
    pub kept: usize,
    /// Records dropped, with their position in the original array
    pub discarded: Vec<(usize, DiscardReason)>,
    /// Records that received a generated placeholder email
    pub placeholder_emails: usize,
}

/// Convert legacy records to players, renumbering from 1 in array order
///
/// `normalized_at` is used as the registration time of records that have none.
pub fn migrate_records(
    records: Vec<LegacyPlayerRecord>,
    normalized_at: &str,
) -> (Vec<Player>, NormalizeReport) {
    let mut players = Vec::with_capacity(records.len());
    let mut report = NormalizeReport::default();
    let mut seen_uids = HashSet::new();
    let mut seen_emails = HashSet::new();

    for (position, record) in records.into_iter().enumerate() {
        let full_name = match record.display_name() {
            Some(name) => name.to_string(),
            None => {
                discard(&mut report, position, DiscardReason::MissingName);
                continue;
            }
        };

        let uid = match non_blank(&record.uid) {
            Some(uid) => uid.to_string(),
            None => {
                discard(&mut report, position, DiscardReason::MissingUid);
                continue;
            }
        };

        let (email, placeholder) = match non_blank(&record.email) {
            Some(email) => (email.to_string(), false),
            None if record.id == Some(EMAIL_EXEMPT_ID) => (placeholder_email(&uid), true),
            None => {
                discard(&mut report, position, DiscardReason::MissingEmail);
                continue;
            }
        };

        if seen_uids.contains(&uid) {
            discard(&mut report, position, DiscardReason::DuplicateUid);
            continue;
        }
        if seen_emails.contains(&email_key(&email)) {
            discard(&mut report, position, DiscardReason::DuplicateEmail);
            continue;
        }
        seen_uids.insert(uid.clone());
        seen_emails.insert(email_key(&email));

        if placeholder {
            report.placeholder_emails += 1;
        }

        let in_game_name =
            non_blank(&record.in_game_name).map(str::to_string).unwrap_or_else(|| full_name.clone());

        players.push(Player {
            id: players.len() as PlayerId + 1,
            full_name,
            in_game_name,
            uid,
            email,
            phone: record.phone.unwrap_or_default(),
            registered_at: record.registered_at.unwrap_or_else(|| normalized_at.to_string()),
            agreement: record.agreement.unwrap_or(true),
        });
    }

    report.kept = players.len();
    (players, report)
}

/// Read one stored record into a player without changing its ID
///
/// Accepts `fullName` or the legacy `name` (preferring `fullName`, empty if
/// neither is present) and gives the record with ID 1 a placeholder email if
/// it has none. Any other record missing its ID, UID or email is rejected
/// with the reason.
pub fn upgrade_record(
    position: usize,
    value: serde_json::Value,
) -> std::result::Result<Player, String> {
    let record: LegacyPlayerRecord = serde_json::from_value(value)
        .map_err(|e| format!("record at position {position} is malformed: {e}"))?;

    let id = record.id.ok_or_else(|| format!("record at position {position} has no id"))?;
    let uid = non_blank(&record.uid)
        .map(str::to_string)
        .ok_or_else(|| format!("record {id} has no uid"))?;
    let email = match non_blank(&record.email) {
        Some(email) => email.to_string(),
        None if id == EMAIL_EXEMPT_ID => placeholder_email(&uid),
        None => return Err(format!("record {id} has no email")),
    };

    Ok(Player {
        id,
        full_name: record.display_name().unwrap_or_default().to_string(),
        in_game_name: record.in_game_name.unwrap_or_default(),
        uid,
        email,
        phone: record.phone.unwrap_or_default(),
        registered_at: record.registered_at.unwrap_or_default(),
        agreement: record.agreement.unwrap_or(true),
    })
}

/// Placeholder address for a record that never had an email
pub fn placeholder_email(uid: &str) -> String {
    format!("player-{uid}@placeholder.invalid")
}

fn discard(report: &mut NormalizeReport, position: usize, reason: DiscardReason) {
    warn!("Discarding legacy record at position {}: {:?}", position, reason);
    report.discarded.push((position, reason));
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
