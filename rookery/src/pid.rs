//! Location-transparent actor handles and their lifecycle state.
//!
//! A [`Pid`] bundles an actor's signal endpoints (mailbox, quit,
//! monitor-subscribe, monitor-unsubscribe) together with the bookkeeping for
//! monitor watchers. The endpoints open and close as one unit: a single
//! [`Lifecycle`] value guards the whole group, so concurrent senders observe
//! the pid either fully open or fully closed, never in between.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::id::Id;
use crate::message::{DownMessage, DynMessage};
use crate::system::System;

/// Monitor-subscribe request. The ack fires once the target's worker has
/// registered the watcher; a dropped ack means the target was already gone.
pub(crate) struct Subscribe {
    pub subscriber: Pid,
    pub ack: oneshot::Sender<()>,
}

/// The four signal endpoints of a live actor.
pub(crate) struct Endpoints {
    pub message: mpsc::Sender<DynMessage>,
    pub quit: mpsc::Sender<()>,
    pub monitor: mpsc::Sender<Subscribe>,
    pub demonitor: mpsc::Sender<Pid>,
}

pub(crate) enum Lifecycle {
    Open(Endpoints),
    Closed,
}

/// Monitor bookkeeping. Both maps are keyed by the subscriber's display
/// form and share one lock so add, remove and cleanup stay mutually atomic.
#[derive(Default)]
struct WatcherTable {
    fire: HashMap<String, oneshot::Sender<()>>,
    cancel: HashMap<String, CancellationToken>,
}

struct PidShared {
    state: RwLock<Lifecycle>,
    watchers: Mutex<WatcherTable>,
}

#[derive(Clone)]
enum Links {
    Live(Arc<PidShared>),
    /// No live endpoints, e.g. a pid that round-tripped through another
    /// machine. Routing re-resolves these against the pid registry.
    Detached,
}

/// Handle identifying an actor, possibly on a remote machine.
///
/// Pids are cheap to clone and safe to share; every operation against a
/// terminated pid degrades to a silent no-op.
#[derive(Clone)]
pub struct Pid {
    machine_id: Arc<str>,
    id: Id,
    links: Links,
}

impl Pid {
    pub(crate) fn live(machine_id: Arc<str>, endpoints: Endpoints) -> Self {
        Self {
            machine_id,
            id: Id::new(),
            links: Links::Live(Arc::new(PidShared {
                state: RwLock::new(Lifecycle::Open(endpoints)),
                watchers: Mutex::new(WatcherTable::default()),
            })),
        }
    }

    /// Handle with no live endpoints, usable only as an address.
    pub fn detached(machine_id: impl Into<Arc<str>>, id: Id) -> Self {
        Self {
            machine_id: machine_id.into(),
            id,
            links: Links::Detached,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    fn endpoints<T>(&self, f: impl FnOnce(&Endpoints) -> T) -> Option<T> {
        let Links::Live(shared) = &self.links else {
            return None;
        };
        match &*shared.state.read() {
            Lifecycle::Open(endpoints) => Some(f(endpoints)),
            Lifecycle::Closed => None,
        }
    }

    pub(crate) fn message_sender(&self) -> Option<mpsc::Sender<DynMessage>> {
        self.endpoints(|e| e.message.clone())
    }

    pub(crate) fn quit_sender(&self) -> Option<mpsc::Sender<()>> {
        self.endpoints(|e| e.quit.clone())
    }

    pub(crate) fn monitor_sender(&self) -> Option<mpsc::Sender<Subscribe>> {
        self.endpoints(|e| e.monitor.clone())
    }

    pub(crate) fn demonitor_sender(&self) -> Option<mpsc::Sender<Pid>> {
        self.endpoints(|e| e.demonitor.clone())
    }

    /// Registers a watcher for `subscriber` and parks it on a fire/cancel
    /// pair. Exactly one of the two ever resolves: fire routes a
    /// [`DownMessage`] to the subscriber, cancel tears the watcher down
    /// silently.
    pub(crate) fn setup_monitor(&self, system: &System, subscriber: Pid) {
        tracing::info!(
            target_pid = %self,
            subscriber_pid = %subscriber,
            "setting up monitor"
        );

        let Links::Live(shared) = &self.links else {
            return;
        };
        let mut watchers = shared.watchers.lock();

        let key = subscriber.to_string();
        let (fire_tx, fire_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        watchers.fire.insert(key.clone(), fire_tx);
        watchers.cancel.insert(key, cancel.clone());

        let system = system.clone();
        let target = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                fired = fire_rx => {
                    if fired.is_ok() {
                        system
                            .route(&subscriber, Box::new(DownMessage { who: target }))
                            .await;
                    }
                }
            }
        });
    }

    /// Cancels the watcher registered for `subscriber`. An entry that is
    /// already gone (fired or cleaned up) is a no-op.
    pub(crate) fn remove_monitor(&self, subscriber: &Pid) {
        let Links::Live(shared) = &self.links else {
            return;
        };
        let mut watchers = shared.watchers.lock();

        let key = subscriber.to_string();
        watchers.fire.remove(&key);
        if let Some(cancel) = watchers.cancel.remove(&key) {
            cancel.cancel();
            tracing::info!(
                target_pid = %self,
                subscriber_pid = %subscriber,
                "monitor removed"
            );
        }
    }

    /// Runs exactly once, from the worker loop's own termination path:
    /// unregisters the pid, closes every endpoint as one lifecycle
    /// transition, then fires all remaining watchers so every live
    /// subscriber still receives its termination notice.
    pub(crate) fn cleanup(&self, system: &System) {
        tracing::info!(pid = %self, "cleaning up pid");

        system.pids().unregister(self.id);

        let Links::Live(shared) = &self.links else {
            return;
        };
        *shared.state.write() = Lifecycle::Closed;

        let mut watchers = shared.watchers.lock();
        if !watchers.fire.is_empty() {
            tracing::debug!(pid = %self, "firing remaining monitor watchers");
        }
        for (_, fire) in watchers.fire.drain() {
            // The watcher is parked on this oneshot, so acceptance is
            // delivery.
            let _ = fire.send(());
        }
        watchers.cancel.clear();
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.machine_id)
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl PartialEq for Pid {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.machine_id == other.machine_id
    }
}

impl Eq for Pid {}

impl Hash for Pid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.machine_id.hash(state);
        self.id.hash(state);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PidParseError {
    #[error("pid must have the form id@machine")]
    InvalidFormat,
    #[error("invalid actor id")]
    InvalidId,
}

impl FromStr for Pid {
    type Err = PidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, machine_id) = s.split_once('@').ok_or(PidParseError::InvalidFormat)?;
        if machine_id.is_empty() {
            return Err(PidParseError::InvalidFormat);
        }
        let id: Id = id.parse().map_err(|_| PidParseError::InvalidId)?;
        Ok(Pid::detached(machine_id, id))
    }
}

// Pids cross machine boundaries as their display form; the deserialized
// handle is detached and gets re-resolved by routing.
impl Serialize for Pid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
