//! Registration confirmation senders
//!
//! Delivery channels (email, chat bots) live outside this crate. They plug in
//! through [`Notifier`] and report success as a plain boolean: a failed
//! confirmation never undoes a registration.

use crate::types::Player;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Sends a confirmation to a freshly registered player
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short channel name used in logs
    fn channel(&self) -> &str;

    /// Deliver the confirmation, returning whether it was sent
    async fn registration_confirmed(&self, player: &Player) -> bool;
}

/// Notifier that only records the confirmation in the log
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    fn channel(&self) -> &str {
        "log"
    }

    async fn registration_confirmed(&self, player: &Player) -> bool {
        info!(
            "Registration confirmed for {} ({}) <{}>, registration ID {}",
            player.full_name, player.in_game_name, player.email, player.id
        );
        true
    }
}

/// Sends through every inner notifier; succeeds if at least one channel did
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    /// Add another channel
    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    fn channel(&self) -> &str {
        "fanout"
    }

    async fn registration_confirmed(&self, player: &Player) -> bool {
        let mut any_sent = false;
        for notifier in &self.notifiers {
            if notifier.registration_confirmed(player).await {
                any_sent = true;
            } else {
                warn!(
                    "Failed to send {} confirmation for registration ID {}",
                    notifier.channel(),
                    player.id
                );
            }
        }
        any_sent
    }
}
