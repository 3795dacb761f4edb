//! Machine-connection registry: the interface the core consumes from the
//! out-of-scope transport layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::message::DynMessage;
use crate::pid::Pid;

/// A message on its way to an actor on another machine.
pub struct RemoteEnvelope {
    pub to: Pid,
    pub message: DynMessage,
}

/// Connection state for one remote machine. The transport layer owns the
/// receiving half of `outbound` and flips the connected flag.
#[derive(Clone)]
pub struct Machine {
    machine_id: Arc<str>,
    connected: Arc<AtomicBool>,
    outbound: mpsc::Sender<RemoteEnvelope>,
}

impl Machine {
    pub fn new(machine_id: impl Into<Arc<str>>, outbound: mpsc::Sender<RemoteEnvelope>) -> Self {
        Self {
            machine_id: machine_id.into(),
            connected: Arc::new(AtomicBool::new(true)),
            outbound,
        }
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub(crate) fn outbound(&self) -> mpsc::Sender<RemoteEnvelope> {
        self.outbound.clone()
    }
}

/// Map from machine id to connection state.
#[derive(Default)]
pub struct MachineRegistry {
    machines: RwLock<HashMap<Arc<str>, Machine>>,
}

impl MachineRegistry {
    pub fn register(&self, machine: Machine) {
        tracing::info!(machine_id = %machine.machine_id(), "registered machine connection");
        self.machines
            .write()
            .insert(machine.machine_id.clone(), machine);
    }

    pub fn lookup(&self, machine_id: &str) -> Option<Machine> {
        self.machines.read().get(machine_id).cloned()
    }

    pub fn remove(&self, machine_id: &str) {
        self.machines.write().remove(machine_id);
    }
}
