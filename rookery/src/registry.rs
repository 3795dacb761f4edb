//! Process-wide registries: live pids and reconstructible message types.
//!
//! Both are plain injectable services with internal locking rather than
//! globals, so tests can substitute their own instances.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::id::Id;
use crate::message::{DynMessage, Message};
use crate::pid::Pid;

#[cfg(test)]
#[path = "registry.test.rs"]
mod tests;

/// Map from actor id to live pid handle. Entries are added at spawn and
/// removed exactly once, at worker-loop exit.
#[derive(Default)]
pub struct PidRegistry {
    pids: RwLock<HashMap<Id, Pid>>,
}

impl PidRegistry {
    pub(crate) fn register(&self, pid: Pid) {
        self.pids.write().insert(pid.id(), pid);
    }

    pub(crate) fn unregister(&self, id: Id) {
        self.pids.write().remove(&id);
    }

    pub fn lookup(&self, id: Id) -> Option<Pid> {
        self.pids.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.pids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.read().is_empty()
    }
}

type Factory = Box<dyn Fn() -> DynMessage + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TypeRegistryError {
    #[error("message tag {tag:?} is already registered")]
    DuplicateTag { tag: &'static str },
}

/// Map from message tag to a zero-value factory, consumed by the wire
/// layer when it rebuilds messages crossing a machine boundary.
#[derive(Default)]
pub struct TypeRegistry {
    factories: RwLock<HashMap<&'static str, Factory>>,
}

impl TypeRegistry {
    pub fn register<M>(&self) -> Result<(), TypeRegistryError>
    where
        M: Message + Default,
    {
        let tag = M::default().tag();
        let mut factories = self.factories.write();
        if factories.contains_key(tag) {
            return Err(TypeRegistryError::DuplicateTag { tag });
        }
        tracing::debug!(tag, "registered message type");
        factories.insert(tag, Box::new(|| Box::new(M::default())));
        Ok(())
    }

    /// Zero-value template for `tag`, if registered.
    pub fn template(&self, tag: &str) -> Option<DynMessage> {
        self.factories.read().get(tag).map(|factory| factory())
    }
}
