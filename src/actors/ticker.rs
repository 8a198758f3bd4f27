//! Auto-connect timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::tea::Message;
use crate::vlog_debug;

use super::ActorHandle;

/// Sends [`Message::Tick`] every `interval`.
pub struct TickActor {
    msg_tx: mpsc::UnboundedSender<Message>,
    interval: Duration,
}

impl TickActor {
    pub fn new(msg_tx: mpsc::UnboundedSender<Message>, interval: Duration) -> Self {
        Self { msg_tx, interval }
    }

    pub fn spawn(self) -> ActorHandle {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        vlog_debug!("TickActor::spawn interval={:?}", self.interval);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            // A stalled runtime must not replay a burst of ticks.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancel_clone.cancelled() => {
                        vlog_debug!("TickActor cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        if self.msg_tx.send(Message::Tick).is_err() {
                            vlog_debug!("TickActor: message channel closed");
                            break;
                        }
                    }
                }
            }
        });

        ActorHandle::new(cancel)
    }
}
