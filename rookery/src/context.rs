//! Per-actor capability object handed to behavior code.

use crate::message::{DynMessage, Message};
use crate::pid::Pid;
use crate::system::System;

/// Verdict a behavior hands back to its worker loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Flow {
    /// Keep processing messages.
    Continue,
    /// Graceful termination. Interpreted only at the worker-loop boundary;
    /// obtained from [`Context::quit`].
    Exit,
}

/// Handle for an active monitor subscription.
#[derive(Debug)]
pub enum Abortable {
    /// Live subscription that can still be canceled.
    Monitor { target: Pid, subscriber: Pid },
    /// The target was already gone when the subscription was attempted.
    Noop,
    /// Monitoring across machines is an unimplemented extension point.
    RemoteUnsupported,
}

impl Abortable {
    /// Cancels the subscription. Racing the target's termination is fine:
    /// at most one of {termination notice, successful cancel} occurs.
    pub async fn abort(self) {
        match self {
            Abortable::Monitor { target, subscriber } => {
                if let Some(demonitor) = target.demonitor_sender() {
                    let _ = demonitor.send(subscriber).await;
                }
            }
            Abortable::Noop | Abortable::RemoteUnsupported => {}
        }
    }
}

/// Capabilities available to a running behavior: its own pid, messaging,
/// termination control, monitoring and deferred cleanup actions.
///
/// One context exists per actor, used only by its worker and the behavior
/// code it calls. A context detached from any actor is available through
/// [`System::root_context`].
pub struct Context {
    system: System,
    pid: Pid,
    deferred: Vec<Box<dyn FnOnce() + Send + Sync>>,
}

impl Context {
    pub(crate) fn new(system: System, pid: Pid) -> Self {
        Self {
            system,
            pid,
            deferred: Vec::new(),
        }
    }

    /// This actor's own pid.
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    /// Routes a message to `to`. Returns once the message sits in the
    /// recipient's buffer (or was dropped), which preserves this caller's
    /// send order; it never waits for processing.
    pub async fn send(&self, to: &Pid, message: impl Message) {
        self.system.route(to, Box::new(message)).await;
    }

    /// [`send`](Self::send) for an already-boxed message.
    pub async fn send_dyn(&self, to: &Pid, message: DynMessage) {
        self.system.route(to, message).await;
    }

    /// Asynchronously signals `pid`'s quit endpoint. Does not wait for the
    /// actor to actually stop; a target that is already gone is a no-op.
    pub fn kill(&self, pid: &Pid) {
        self.system.kill(pid);
    }

    /// The graceful-termination sentinel. Return it from `run` to stop this
    /// actor without an abnormal-termination log:
    ///
    /// ```ignore
    /// return ctx.quit();
    /// ```
    pub fn quit(&self) -> Flow {
        Flow::Exit
    }

    /// Subscribes this actor to `pid`'s termination. Blocks until the
    /// target has accepted the subscription; once it has, the target's
    /// termination delivers exactly one [`DownMessage`](crate::message::DownMessage)
    /// here unless the subscription is aborted first.
    pub async fn monitor(&self, pid: &Pid) -> Abortable {
        self.system.monitor(self.pid.clone(), pid).await
    }

    /// Appends an action that runs during this actor's termination,
    /// regardless of cause, in registration order.
    pub fn defer(&mut self, action: impl FnOnce() + Send + Sync + 'static) {
        self.deferred.push(Box::new(action));
    }

    pub(crate) fn take_deferred(&mut self) -> Vec<Box<dyn FnOnce() + Send + Sync>> {
        std::mem::take(&mut self.deferred)
    }
}
