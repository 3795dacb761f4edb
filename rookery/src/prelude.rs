//! Commonly used actor runtime types and traits.
//!
//! Import this module to get started with the basic actor functionality.

pub use super::actor::{
    Actor,          // Core behavior trait
    StatelessActor, // Closure-based behavior adapter
    async_trait,    // Async trait macro
};
pub use super::context::{
    Abortable, // Handle for an active monitor subscription
    Context,   // Per-actor capability object
    Flow,      // Behavior verdict (continue or graceful exit)
};
pub use super::id::Id; // Actor identifier
pub use super::machine::{
    Machine,         // Connection state for one remote machine
    MachineRegistry, // Machine id to connection map
    RemoteEnvelope,  // Message handed to a machine's outbound channel
};
pub use super::message::{
    DownMessage,    // Termination notice delivered to monitors
    DynMessage,     // Boxed message as carried by mailboxes
    GenericMessage, // Catch-all payload message
    Message,        // Message trait
    PoisonPill,     // Graceful-termination request
};
pub use super::pid::{Pid, PidParseError};
pub use super::registry::{
    PidRegistry,       // Actor id to live pid map
    TypeRegistry,      // Message tag to zero-value factory map
    TypeRegistryError, // Duplicate-tag registration error
};
pub use super::system::{
    System,       // The actor system itself
    SystemConfig, // System tunables
};
