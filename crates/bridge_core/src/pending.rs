//! Single-settlement pending operations
//!
//! A pending operation owns the listeners it attaches. The first outcome
//! wins: success signal, error signal, invocation failure or deadline.
//! Settling detaches every listener, so late emissions find nothing.

use crate::signal::{ListenerId, SignalChannel};
use crate::{BridgeError, Result};
use bridge_proto::{OperationId, SignalArgs};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

struct SlotState<T> {
    tx: Option<oneshot::Sender<Result<T>>>,
    registrations: Vec<(Arc<SignalChannel>, ListenerId)>,
}

/// Shared between the operation and its listeners
struct SettleSlot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> SettleSlot<T> {
    /// Record a listener; if already settled, detach it right away
    fn attach(&self, channel: Arc<SignalChannel>, id: ListenerId) {
        let mut state = self.state.lock();
        if state.tx.is_none() {
            drop(state);
            channel.disconnect(id);
            return;
        }
        state.registrations.push((channel, id));
    }

    /// Deliver `outcome` if nothing was delivered yet
    fn settle(&self, outcome: Result<T>) -> bool {
        let (tx, registrations) = {
            let mut state = self.state.lock();
            let Some(tx) = state.tx.take() else {
                return false;
            };
            (tx, std::mem::take(&mut state.registrations))
        };

        // Disconnect outside the lock; a channel may be mid-emit
        for (channel, id) in registrations {
            channel.disconnect(id);
        }
        // Receiver gone means the caller stopped waiting
        let _ = tx.send(outcome);
        true
    }

    fn detach_all(&self) {
        let registrations = std::mem::take(&mut self.state.lock().registrations);
        for (channel, id) in registrations {
            channel.disconnect(id);
        }
    }
}

/// One in-flight request awaiting its terminal signal
pub struct PendingOperation<T> {
    id: OperationId,
    label: &'static str,
    slot: Arc<SettleSlot<T>>,
    rx: Option<oneshot::Receiver<Result<T>>>,
}

impl<T: Send + 'static> PendingOperation<T> {
    pub fn new(label: &'static str) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            id: OperationId::new(),
            label,
            slot: Arc::new(SettleSlot {
                state: Mutex::new(SlotState {
                    tx: Some(tx),
                    registrations: Vec::new(),
                }),
            }),
            rx: Some(rx),
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Listen on `channel`. `on_emit` returns `Some` to settle, `None` to ignore.
    pub fn listen<F>(&self, channel: &Arc<SignalChannel>, on_emit: F)
    where
        F: Fn(&SignalArgs) -> Option<Result<T>> + Send + Sync + 'static,
    {
        let slot = self.slot.clone();
        let id = channel.connect(move |args| {
            if let Some(outcome) = on_emit(args) {
                slot.settle(outcome);
            }
        });
        self.slot.attach(channel.clone(), id);
    }

    pub fn is_settled(&self) -> bool {
        self.slot.state.lock().tx.is_none()
    }

    /// Settle with `error` now and return the winning outcome
    pub fn fail_now(mut self, error: BridgeError) -> Result<T> {
        self.slot.settle(Err(error));
        match self.rx.take().map(|mut rx| rx.try_recv()) {
            Some(Ok(outcome)) => outcome,
            _ => Err(BridgeError::Host(format!("{} abandoned", self.label))),
        }
    }

    /// Wait for the outcome, settling with [`BridgeError::Timeout`] after `deadline`
    pub async fn wait(mut self, deadline: Duration) -> Result<T> {
        let Some(mut rx) = self.rx.take() else {
            return Err(BridgeError::Host(format!("{} already awaited", self.label)));
        };

        match tokio::time::timeout(deadline, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(BridgeError::Host(format!("{} abandoned", self.label))),
            Err(_) => {
                if self.slot.settle(Err(BridgeError::Timeout)) {
                    tracing::warn!(
                        op = %self.id,
                        operation = self.label,
                        timeout_ms = deadline.as_millis() as u64,
                        "Operation timed out"
                    );
                }
                // A signal may have won the race against the deadline
                rx.try_recv().unwrap_or(Err(BridgeError::Timeout))
            }
        }
    }
}

impl<T> Drop for PendingOperation<T> {
    fn drop(&mut self) {
        // Abandoned before settling: listeners must not outlive the request
        self.slot.detach_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_proto::SignalName;

    fn pending_on(channel: &Arc<SignalChannel>) -> PendingOperation<String> {
        let op = PendingOperation::new("test");
        op.listen(channel, |args| args.str_at(0).map(|s| Ok(s.to_string())));
        op
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_outcome_wins() {
        let success = SignalChannel::native(SignalName::FileCreated);
        let failure = SignalChannel::native(SignalName::ErrorOccurred);

        let op = pending_on(&success);
        op.listen(&failure, |args| {
            Some(Err(BridgeError::Host(args.str_at(0).unwrap_or_default().to_string())))
        });
        assert_eq!(success.listener_count(), 1);
        assert_eq!(failure.listener_count(), 1);

        success.emit(&SignalArgs::strings(["a.txt"]));
        // Late error after success: no listener left to hear it
        assert_eq!(failure.emit(&SignalArgs::strings(["boom"])), 0);
        assert_eq!(success.listener_count(), 0);

        assert_eq!(op.wait(Duration::from_secs(5)).await.unwrap(), "a.txt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_emissions_keep_waiting() {
        let success = SignalChannel::native(SignalName::FileCreated);
        let op = pending_on(&success);

        success.emit(&SignalArgs::none());
        assert!(!op.is_settled());

        let channel = success.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            channel.emit(&SignalArgs::strings(["late.txt"]));
        });
        assert_eq!(op.wait(Duration::from_secs(5)).await.unwrap(), "late.txt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_detaches_listeners() {
        let success = SignalChannel::native(SignalName::FileDeleted);
        let op = pending_on(&success);

        let err = op.wait(Duration::from_millis(5000)).await.unwrap_err();
        assert_eq!(err, BridgeError::Timeout);
        assert_eq!(success.listener_count(), 0);
    }

    #[test]
    fn test_fail_now() {
        let success = SignalChannel::native(SignalName::FileChanged);
        let op = pending_on(&success);
        let err = op
            .fail_now(BridgeError::Invocation {
                operation: "change file content".into(),
                message: "denied".into(),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to change file content: denied");
        assert_eq!(success.listener_count(), 0);
    }

    #[test]
    fn test_drop_detaches() {
        let success = SignalChannel::native(SignalName::FileRead);
        let op = pending_on(&success);
        drop(op);
        assert_eq!(success.listener_count(), 0);
    }

    #[test]
    fn test_attach_after_settle() {
        let success = SignalChannel::native(SignalName::FileCreated);
        let other = SignalChannel::native(SignalName::ErrorOccurred);
        let op = pending_on(&success);

        success.emit(&SignalArgs::strings(["done"]));
        assert!(op.is_settled());

        op.listen(&other, |_| None);
        assert_eq!(other.listener_count(), 0);
    }
}
