//! Directory listing with ordered fallbacks
//!
//! Strategies are tried in configured order. A strategy fails over to the
//! next one when the host lacks the method, the call throws, or the answer
//! is empty or malformed. When all fail, the degrade policy decides between
//! the canned listing and an error.

use crate::adapter::SignalAdapter;
use crate::client::BridgeClient;
use crate::config::{DegradePolicy, ListingStrategy};
use crate::host::HostObject;
use crate::pending::PendingOperation;
use crate::signal::ChannelOrigin;
use crate::{BridgeError, Result};
use bridge_proto::{
    fallback_listing, listing_to_json, parse_listing, DirectoryContentsUpdated, DirectoryEntry, HostCommand,
    HostMethod, SignalArgs, SignalName,
};
use std::sync::Arc;
use thiserror::Error;

/// Where a listing came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    Host(ListingStrategy),
    /// Canned entries; the host produced nothing
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingOutcome {
    pub path: String,
    pub entries: Vec<DirectoryEntry>,
    pub source: ListingSource,
}

impl ListingOutcome {
    pub fn is_degraded(&self) -> bool {
        self.source == ListingSource::Fallback
    }
}

/// Why a single strategy gave up
#[derive(Debug, Error)]
enum StrategyFailure {
    #[error("not supported by host")]
    Unsupported,
    #[error("empty reply")]
    Empty,
    #[error("host call failed: {0}")]
    Host(String),
    #[error("malformed listing: {0}")]
    Malformed(String),
    #[error("no answer in time")]
    NoAnswer,
}

type StrategyResult = std::result::Result<Vec<DirectoryEntry>, StrategyFailure>;

impl BridgeClient {
    /// List `path` ("" is home) and publish the result to subscribers
    pub async fn list_directory(&self, path: &str) -> Result<ListingOutcome> {
        self.session.set_current_path(path);

        let host = match self.session.file_system() {
            Ok(host) => Some(host),
            Err(BridgeError::NotConnected(what)) if self.session.is_open() => {
                tracing::warn!(path, "{} not initialized, skipping host strategies", what);
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(host) = &host {
            for &strategy in &self.config.listing.strategies {
                match self.try_strategy(host, strategy, path).await {
                    Ok(entries) => {
                        tracing::debug!(path, ?strategy, count = entries.len(), "Directory listed");
                        return Ok(self.finish(path, entries, ListingSource::Host(strategy)));
                    }
                    Err(reason) => {
                        tracing::debug!(path, ?strategy, %reason, "Listing strategy failed");
                    }
                }
            }
        }

        self.degrade(host.as_ref(), path)
    }

    async fn try_strategy(&self, host: &Arc<SignalAdapter>, strategy: ListingStrategy, path: &str) -> StrategyResult {
        match strategy {
            ListingStrategy::Direct => list_direct(&**host, path),
            ListingStrategy::Cached => {
                if !host.supports(HostMethod::GetCachedDirectoryContents) {
                    return Err(StrategyFailure::Unsupported);
                }
                match read_cache(&**host, path) {
                    Err(StrategyFailure::Empty) if host.supports(HostMethod::GetDirectoryContents) => {
                        // Populate the cache; a direct answer needs no second look
                        match list_direct(&**host, path) {
                            Ok(entries) => Ok(entries),
                            Err(reason) => {
                                tracing::debug!(path, %reason, "Cache priming returned no listing");
                                tokio::time::sleep(self.config.listing.cache_poll_delay()).await;
                                read_cache(&**host, path)
                            }
                        }
                    }
                    other => other,
                }
            }
            ListingStrategy::Signal => self.list_by_signal(host, path).await,
        }
    }

    async fn list_by_signal(&self, host: &Arc<SignalAdapter>, path: &str) -> StrategyResult {
        if !host.supports(HostMethod::ListDirectory) {
            return Err(StrategyFailure::Unsupported);
        }
        let channel = host
            .signal(SignalName::DirectoryListed)
            .ok_or(StrategyFailure::Unsupported)?;

        let op = PendingOperation::new("list directory");
        let expected = path.to_string();
        op.listen(&channel, move |args| {
            // Listings for other directories are not ours
            if args.str_at(0).unwrap_or_default() != expected {
                return None;
            }
            let outcome = match args.str_at(1) {
                Some(json) => parse_listing(json).map_err(BridgeError::from),
                None => Err(BridgeError::Payload("directoryListed carried no listing".into())),
            };
            Some(outcome)
        });

        host.invoke(&HostCommand::ListDirectory { path: path.to_string() })
            .map_err(|e| StrategyFailure::Host(e.0))?;

        match op.wait(self.config.listing.signal_grace()).await {
            Ok(entries) => Ok(entries),
            Err(BridgeError::Timeout) => Err(StrategyFailure::NoAnswer),
            Err(e) => Err(StrategyFailure::Malformed(e.to_string())),
        }
    }

    fn degrade(&self, host: Option<&Arc<SignalAdapter>>, path: &str) -> Result<ListingOutcome> {
        match self.config.listing.degrade_policy {
            DegradePolicy::Fail => {
                tracing::warn!(path, "No listing strategy succeeded");
                Err(BridgeError::ListingUnavailable(path.to_string()))
            }
            DegradePolicy::Substitute => {
                tracing::warn!(path, "No listing strategy succeeded, using fallback entries");
                let entries = fallback_listing();

                // Listeners on an emulated channel would otherwise never hear anything
                if let Some(channel) = host
                    .and_then(|h| h.signal(SignalName::DirectoryListed))
                    .filter(|c| c.origin() == ChannelOrigin::Emulated)
                {
                    channel.emit(&SignalArgs::strings([path.to_string(), listing_to_json(&entries)]));
                }

                Ok(self.finish(path, entries, ListingSource::Fallback))
            }
        }
    }

    fn finish(&self, path: &str, entries: Vec<DirectoryEntry>, source: ListingSource) -> ListingOutcome {
        let outcome = ListingOutcome {
            path: path.to_string(),
            entries,
            source,
        };
        self.session.publish(DirectoryContentsUpdated {
            path: outcome.path.clone(),
            entries: outcome.entries.clone(),
            degraded: outcome.is_degraded(),
        });
        outcome
    }
}

fn list_direct(host: &dyn HostObject, path: &str) -> StrategyResult {
    if !host.supports(HostMethod::GetDirectoryContents) {
        return Err(StrategyFailure::Unsupported);
    }
    let reply = host
        .invoke(&HostCommand::GetDirectoryContents { path: path.to_string() })
        .map_err(|e| StrategyFailure::Host(e.0))?;
    decode(reply)
}

fn read_cache(host: &dyn HostObject, path: &str) -> StrategyResult {
    let reply = host
        .invoke(&HostCommand::GetCachedDirectoryContents { path: path.to_string() })
        .map_err(|e| StrategyFailure::Host(e.0))?;
    decode(reply)
}

/// An absent or blank reply is empty; `[]` is a valid empty directory
fn decode(reply: Option<String>) -> StrategyResult {
    match reply {
        Some(json) if !json.trim().is_empty() => {
            parse_listing(&json).map_err(|e| StrategyFailure::Malformed(e.to_string()))
        }
        _ => Err(StrategyFailure::Empty),
    }
}
