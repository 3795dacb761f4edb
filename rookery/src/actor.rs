//! Core actor behavior traits.
pub use async_trait::async_trait;

use crate::context::{Context, Flow};
use crate::message::DynMessage;

/// The behavior of an actor.
///
/// Exactly one worker drives an actor, so `init` and `run` never execute
/// concurrently with themselves or each other: the actor author needs no
/// internal synchronization.
#[async_trait]
pub trait Actor: Send + 'static {
    /// Runs once, inside [`System::spawn`](crate::system::System::spawn),
    /// before the pid is handed back to the caller.
    async fn init(&mut self, _ctx: &mut Context) {}

    /// Invoked for every mailbox message that is not a poison pill. The
    /// returned [`Flow`] tells the worker whether to keep going.
    async fn run(&mut self, ctx: &mut Context, message: DynMessage) -> Flow;
}

/// Behavior assembled from a plain closure, for actors that keep their
/// state in the closure's captures (or have none at all).
pub struct StatelessActor<F> {
    run: F,
}

impl<F> StatelessActor<F>
where
    F: FnMut(&mut Context, DynMessage) -> Flow + Send + 'static,
{
    pub fn new(run: F) -> Self {
        Self { run }
    }
}

#[async_trait]
impl<F> Actor for StatelessActor<F>
where
    F: FnMut(&mut Context, DynMessage) -> Flow + Send + 'static,
{
    async fn run(&mut self, ctx: &mut Context, message: DynMessage) -> Flow {
        (self.run)(ctx, message)
    }
}
