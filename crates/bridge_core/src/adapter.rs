//! Channel-completing decorator over a host object
//!
//! Hosts do not always expose every signal the page expects. Instead of
//! patching the host object, the adapter wraps it and answers `signal()`
//! from its own table:
//! - the host's channel when it has one
//! - a local channel relayed from a `{object}_{signal}` proxy object
//! - an empty local channel, when synthesis is enabled

use crate::config::SignalConfig;
use crate::host::{HostCallError, HostObject, ObjectRegistry};
use crate::signal::{ChannelOrigin, ListenerId, SignalChannel};
use bridge_proto::{signal_proxy_id, HostCommand, HostMethod, SignalArgs, SignalName};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

pub struct SignalAdapter {
    inner: Arc<dyn HostObject>,
    channels: HashMap<SignalName, Arc<SignalChannel>>,
    relays: Vec<(Arc<SignalChannel>, ListenerId)>,
    echo_success_after: Option<Duration>,
}

impl SignalAdapter {
    /// Wrap `inner`, resolving every signal in `required`
    pub fn wrap(
        inner: Arc<dyn HostObject>,
        registry: Option<&ObjectRegistry>,
        required: &[SignalName],
        config: &SignalConfig,
    ) -> Self {
        let mut channels = HashMap::new();
        let mut relays = Vec::new();

        for &name in required {
            if let Some(native) = inner.signal(name) {
                channels.insert(name, native);
                continue;
            }

            if let Some((local, relay)) = registry.and_then(|r| relay_from_proxy(r, inner.object_id(), name)) {
                tracing::info!(object = inner.object_id(), signal = %name, "Relaying signal from proxy object");
                channels.insert(name, local);
                relays.push(relay);
                continue;
            }

            if config.synthesize_missing {
                tracing::info!(object = inner.object_id(), signal = %name, "Creating emulated signal");
                channels.insert(name, SignalChannel::emulated(name));
            } else {
                tracing::warn!(object = inner.object_id(), signal = %name, "Signal unavailable");
            }
        }

        Self {
            inner,
            channels,
            relays,
            echo_success_after: config.echo_success_after(),
        }
    }

    /// How `name` is provided, if at all
    pub fn origin(&self, name: SignalName) -> Option<ChannelOrigin> {
        self.signal(name).map(|c| c.origin())
    }

    /// The wrapped host object
    pub fn inner(&self) -> &Arc<dyn HostObject> {
        &self.inner
    }

    /// Emit the success signal of `command` on its emulated channel after the echo delay
    fn schedule_echo(&self, command: &HostCommand) {
        let Some(delay) = self.echo_success_after else {
            return;
        };
        let Some(signal) = echoed_signal(command) else {
            return;
        };
        let Some(channel) = self.channels.get(&signal).cloned() else {
            return;
        };
        if channel.origin() != ChannelOrigin::Emulated {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(signal = %signal, "No runtime for success echo");
            return;
        };

        let args = SignalArgs::strings([command.path().unwrap_or_default()]);
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(signal = %signal, "Echoing success on emulated channel");
            channel.emit(&args);
        });
    }
}

impl HostObject for SignalAdapter {
    fn object_id(&self) -> &str {
        self.inner.object_id()
    }

    fn supports(&self, method: HostMethod) -> bool {
        self.inner.supports(method)
    }

    fn invoke(&self, command: &HostCommand) -> Result<Option<String>, HostCallError> {
        let reply = self.inner.invoke(command)?;
        self.schedule_echo(command);
        Ok(reply)
    }

    fn signal(&self, name: SignalName) -> Option<Arc<SignalChannel>> {
        self.channels
            .get(&name)
            .cloned()
            .or_else(|| self.inner.signal(name))
    }
}

impl Drop for SignalAdapter {
    fn drop(&mut self) {
        for (proxy, id) in self.relays.drain(..) {
            proxy.disconnect(id);
        }
    }
}

/// Signals the host emits on success of a mutating command
fn echoed_signal(command: &HostCommand) -> Option<SignalName> {
    match command {
        HostCommand::CreateFile { .. } => Some(SignalName::FileCreated),
        HostCommand::CreateDirectory { .. } => Some(SignalName::DirectoryCreated),
        HostCommand::ChangeFileContent { .. } => Some(SignalName::FileChanged),
        HostCommand::DeleteFile { .. } => Some(SignalName::FileDeleted),
        HostCommand::DeleteDirectory { .. } => Some(SignalName::DirectoryDeleted),
        _ => None,
    }
}

fn relay_from_proxy(
    registry: &ObjectRegistry,
    object_id: &str,
    name: SignalName,
) -> Option<(Arc<SignalChannel>, (Arc<SignalChannel>, ListenerId))> {
    let proxy = registry.get(&signal_proxy_id(object_id, name))?;
    let fired = proxy.signal(SignalName::SignalFired)?;

    let local = Arc::new(SignalChannel::new(name, ChannelOrigin::Proxied));
    let target: Weak<SignalChannel> = Arc::downgrade(&local);
    let id = fired.connect(move |args| {
        if let Some(target) = target.upgrade() {
            let payload = args.get(0).cloned().unwrap_or(Value::Null);
            target.emit(&SignalArgs::from_fired(payload));
        }
    });

    Some((local, (fired, id)))
}
