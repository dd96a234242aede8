//! Scripted host objects for unit tests

use crate::host::{HostCallError, HostObject};
use crate::signal::SignalChannel;
use bridge_proto::{HostCommand, HostMethod, SignalArgs, SignalName, FILE_SYSTEM_HANDLER, FILE_SYSTEM_SIGNALS};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

type ArgsFn = Arc<dyn Fn(&HostCommand) -> SignalArgs + Send + Sync>;
type ReturnFn = Arc<dyn Fn(&HostCommand) -> Result<Option<String>, HostCallError> + Send + Sync>;

struct Reaction {
    method: HostMethod,
    signal: SignalName,
    delay: Duration,
    args: ArgsFn,
}

const FILE_SYSTEM_METHODS: &[HostMethod] = &[
    HostMethod::ReadFile,
    HostMethod::CreateFile,
    HostMethod::CreateDirectory,
    HostMethod::ChangeFileContent,
    HostMethod::DeleteFile,
    HostMethod::DeleteDirectory,
    HostMethod::ListDirectory,
    HostMethod::GetDirectoryContents,
    HostMethod::GetCachedDirectoryContents,
    HostMethod::SaveDroppedFile,
    HostMethod::OpenFile,
];

/// Host object whose methods record their calls and react as scripted
pub(crate) struct MockHost {
    id: String,
    methods: HashSet<HostMethod>,
    channels: HashMap<SignalName, Arc<SignalChannel>>,
    returns: HashMap<HostMethod, ReturnFn>,
    reactions: Vec<Reaction>,
    calls: Mutex<Vec<HostCommand>>,
}

impl MockHost {
    /// Object with no methods and no signals
    pub fn named(id: &str) -> Self {
        Self {
            id: id.to_string(),
            methods: HashSet::new(),
            channels: HashMap::new(),
            returns: HashMap::new(),
            reactions: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// File-system handler exposing every method and native signal, answering nothing
    pub fn file_system() -> Self {
        let mut host = Self::named(FILE_SYSTEM_HANDLER).with_methods(FILE_SYSTEM_METHODS);
        for name in FILE_SYSTEM_SIGNALS {
            host = host.with_signal(*name);
        }
        host
    }

    pub fn with_methods(mut self, methods: &[HostMethod]) -> Self {
        self.methods.extend(methods.iter().copied());
        self
    }

    pub fn without_method(mut self, method: HostMethod) -> Self {
        self.methods.remove(&method);
        self
    }

    pub fn with_signal(mut self, name: SignalName) -> Self {
        self.channels.insert(name, SignalChannel::native(name));
        self
    }

    pub fn without_signal(mut self, name: SignalName) -> Self {
        self.channels.remove(&name);
        self
    }

    /// Direct return value of `method`
    pub fn returning<F>(mut self, method: HostMethod, f: F) -> Self
    where
        F: Fn(&HostCommand) -> Option<String> + Send + Sync + 'static,
    {
        let reply: ReturnFn = Arc::new(move |cmd: &HostCommand| -> Result<Option<String>, HostCallError> {
            Ok(f(cmd))
        });
        self.returns.insert(method, reply);
        self
    }

    /// Make `method` fail synchronously
    pub fn failing(mut self, method: HostMethod, message: &str) -> Self {
        let message = message.to_string();
        let reply: ReturnFn = Arc::new(move |_: &HostCommand| -> Result<Option<String>, HostCallError> {
            Err(HostCallError(message.clone()))
        });
        self.returns.insert(method, reply);
        self
    }

    /// Emit `signal` `delay` after each call of `method`
    pub fn reacting<F>(mut self, method: HostMethod, delay: Duration, signal: SignalName, args: F) -> Self
    where
        F: Fn(&HostCommand) -> SignalArgs + Send + Sync + 'static,
    {
        self.reactions.push(Reaction {
            method,
            signal,
            delay,
            args: Arc::new(args),
        });
        self
    }

    /// Emit `signal` with the command path `delay` after each call of `method`
    pub fn echoing_path(self, method: HostMethod, delay: Duration, signal: SignalName) -> Self {
        self.reacting(method, delay, signal, |cmd| {
            SignalArgs::strings([cmd.path().unwrap_or_default()])
        })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn into_object(self) -> Arc<dyn HostObject> {
        Arc::new(self)
    }

    /// Native channel `name`; panics if the mock has none
    pub fn channel(&self, name: SignalName) -> Arc<SignalChannel> {
        self.channels
            .get(&name)
            .cloned()
            .unwrap_or_else(|| panic!("mock has no {} channel", name))
    }

    pub fn calls(&self) -> Vec<HostCommand> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: HostMethod) -> usize {
        self.calls.lock().iter().filter(|c| c.method() == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

impl HostObject for MockHost {
    fn object_id(&self) -> &str {
        &self.id
    }

    fn supports(&self, method: HostMethod) -> bool {
        self.methods.contains(&method)
    }

    fn invoke(&self, command: &HostCommand) -> Result<Option<String>, HostCallError> {
        self.calls.lock().push(command.clone());
        let method = command.method();
        if !self.supports(method) {
            return Err(HostCallError(format!("{} is not a function", method)));
        }

        let reply = match self.returns.get(&method) {
            Some(f) => f(command)?,
            None => None,
        };

        for reaction in self.reactions.iter().filter(|r| r.method == method) {
            let Some(channel) = self.channels.get(&reaction.signal).cloned() else {
                continue;
            };
            let args = (reaction.args)(command);
            let delay = reaction.delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                channel.emit(&args);
            });
        }

        Ok(reply)
    }

    fn signal(&self, name: SignalName) -> Option<Arc<SignalChannel>> {
        self.channels.get(&name).cloned()
    }
}
