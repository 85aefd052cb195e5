//! Idle sweeper — resets half-finished conversations that went quiet.
//!
//! Runs on its own interval, independent of request handling. The actual
//! reset logic lives in `ConversationEngine::sweep_idle` so it shares the
//! per-identity locks with inbound messages.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::engine::ConversationEngine;

/// Spawn the background task that periodically resets idle conversations.
pub fn spawn_sweep_task(
    engine: Arc<ConversationEngine>,
    sweep_interval: Duration,
    idle_threshold: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        // The first tick fires immediately; skip it so a restart doesn't
        // instantly disconnect everyone who was mid-conversation.
        interval.tick().await;
        loop {
            interval.tick().await;
            let cutoff = Utc::now()
                - chrono::Duration::from_std(idle_threshold)
                    .unwrap_or_else(|_| chrono::Duration::minutes(15));
            if let Err(e) = engine.sweep_idle(cutoff).await {
                warn!(error = %e, "Idle sweep failed");
            }
        }
    })
}
