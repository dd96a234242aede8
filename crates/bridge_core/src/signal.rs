//! Named signal channels with ordered listener lists

use bridge_proto::{SignalArgs, SignalName};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Callback invoked on every emission
pub type Listener = Arc<dyn Fn(&SignalArgs) + Send + Sync>;

/// Handle returned by [`SignalChannel::connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Where a channel's emissions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrigin {
    /// Exposed by the host itself
    Native,
    /// Relayed from a host proxy object's `signalFired`
    Proxied,
    /// Created locally; only local code emits on it
    Emulated,
}

struct Registration {
    id: ListenerId,
    listener: Listener,
    active: AtomicBool,
}

/// One named asynchronous event source
pub struct SignalChannel {
    name: SignalName,
    origin: ChannelOrigin,
    listeners: Mutex<Vec<Arc<Registration>>>,
    next_id: AtomicU64,
}

impl SignalChannel {
    pub fn new(name: SignalName, origin: ChannelOrigin) -> Self {
        Self {
            name,
            origin,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Channel backed by the host
    pub fn native(name: SignalName) -> Arc<Self> {
        Arc::new(Self::new(name, ChannelOrigin::Native))
    }

    /// Locally synthesized channel
    pub fn emulated(name: SignalName) -> Arc<Self> {
        Arc::new(Self::new(name, ChannelOrigin::Emulated))
    }

    pub fn name(&self) -> SignalName {
        self.name
    }

    pub fn origin(&self) -> ChannelOrigin {
        self.origin
    }

    /// Register a listener; it receives every emission until disconnected
    pub fn connect<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SignalArgs) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push(Arc::new(Registration {
            id,
            listener: Arc::new(listener),
            active: AtomicBool::new(true),
        }));
        tracing::debug!(signal = %self.name, listener = id.0, "Listener connected");
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn disconnect(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(index) = listeners.iter().position(|r| r.id == id) else {
            return false;
        };
        let registration = listeners.remove(index);
        registration.active.store(false, Ordering::Release);
        tracing::debug!(signal = %self.name, listener = id.0, "Listener disconnected");
        true
    }

    /// Deliver `args` to every listener in registration order.
    ///
    /// Listeners run on a snapshot taken before the first call, without the
    /// list lock held. One disconnected mid-emission is skipped; one connected
    /// mid-emission waits for the next emission.
    pub fn emit(&self, args: &SignalArgs) -> usize {
        let snapshot: Vec<Arc<Registration>> = self.listeners.lock().clone();
        tracing::debug!(signal = %self.name, listeners = snapshot.len(), ?args, "Emitting");

        let mut invoked = 0;
        for registration in snapshot {
            if !registration.active.load(Ordering::Acquire) {
                continue;
            }
            invoked += 1;
            let listener = &registration.listener;
            if catch_unwind(AssertUnwindSafe(|| listener(args))).is_err() {
                tracing::error!(
                    signal = %self.name,
                    listener = registration.id.0,
                    "Signal listener panicked"
                );
            }
        }
        invoked
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl std::fmt::Debug for SignalChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalChannel")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("listeners", &self.listener_count())
            .finish()
    }
}
