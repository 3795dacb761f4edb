//! Message trait, downcasting support and the built-in message variants.
//!
//! Messages are dynamically typed: an actor's mailbox carries boxed
//! [`Message`] values and the behavior downcasts the variants it cares
//! about. Every variant carries a stable string tag so the wire layer can
//! rebuild it on the far side of a machine boundary.

use std::any::Any;
use std::fmt;

use crate::pid::Pid;

/// Upcast to [`Any`] so boxed messages can be downcast to their concrete
/// variant. Blanket-implemented for every eligible type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A value that can be delivered to an actor's mailbox.
///
/// Messages are immutable once sent. The tag identifies the variant across
/// machine boundaries; register user variants with
/// [`TypeRegistry::register`](crate::registry::TypeRegistry::register) if
/// they are expected to cross one.
pub trait Message: AsAny + Send + fmt::Debug + 'static {
    /// Stable string tag identifying this variant.
    fn tag(&self) -> &'static str;
}

/// A boxed message as it travels through mailboxes and routing.
pub type DynMessage = Box<dyn Message>;

impl dyn Message {
    pub fn is<M: Message>(&self) -> bool {
        self.as_any().is::<M>()
    }

    pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
        self.as_any().downcast_ref()
    }

    pub fn downcast<M: Message>(self: Box<Self>) -> Result<Box<M>, Box<dyn Any>> {
        self.into_any().downcast()
    }
}

/// Catch-all payload message for ad-hoc communication.
#[derive(Debug, Default)]
pub struct GenericMessage {
    pub value: String,
}

impl GenericMessage {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl Message for GenericMessage {
    fn tag(&self) -> &'static str {
        "rookery.generic"
    }
}

/// Requests graceful termination of the receiving actor. Delivered through
/// the ordinary mailbox, so it is ordered after earlier messages from the
/// same sender.
#[derive(Debug, Default)]
pub struct PoisonPill;

impl Message for PoisonPill {
    fn tag(&self) -> &'static str {
        "rookery.poison-pill"
    }
}

/// Termination notice delivered to monitors when their target terminates.
#[derive(Debug)]
pub struct DownMessage {
    /// The actor that terminated.
    pub who: Pid,
}

impl Message for DownMessage {
    fn tag(&self) -> &'static str {
        "rookery.down"
    }
}
