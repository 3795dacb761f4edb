//! System bootstrap, the per-actor worker loop and message routing.
//!
//! The system owns the machine identity, the pid/machine/type registries
//! and the spawn entry points. Each spawned actor gets exactly one worker
//! task that multiplexes its four signal sources; parallelism exists across
//! actors, never within one.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};

use crate::actor::{Actor, StatelessActor};
use crate::context::{Abortable, Context, Flow};
use crate::id::Id;
use crate::machine::{MachineRegistry, RemoteEnvelope};
use crate::message::{DynMessage, PoisonPill};
use crate::pid::{Endpoints, Pid, Subscribe};
use crate::registry::{PidRegistry, TypeRegistry};

/// Tunables for a system instance.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Overrides the generated machine id. Useful in tests and for
    /// deployments with stable machine names.
    pub machine_id: Option<String>,
    /// Capacity of every actor mailbox. Bounds memory and gives senders
    /// non-blocking fire-and-forget up to this bound.
    pub mailbox_capacity: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            machine_id: None,
            mailbox_capacity: 2000,
        }
    }
}

struct SystemShared {
    machine_id: Arc<str>,
    mailbox_capacity: usize,
    pids: PidRegistry,
    machines: MachineRegistry,
    types: TypeRegistry,
    dropped: AtomicU64,
    active: watch::Sender<usize>,
}

/// One actor system per host process ("machine"). Cheap to clone; all
/// clones share the same registries.
#[derive(Clone)]
pub struct System {
    shared: Arc<SystemShared>,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl System {
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    pub fn with_config(config: SystemConfig) -> Self {
        let machine_id: Arc<str> = match config.machine_id {
            Some(id) => id.into(),
            None => default_machine_id().into(),
        };
        tracing::info!(machine_id = %machine_id, "starting actor system");

        let (active, _) = watch::channel(0usize);
        Self {
            shared: Arc::new(SystemShared {
                machine_id,
                mailbox_capacity: config.mailbox_capacity,
                pids: PidRegistry::default(),
                machines: MachineRegistry::default(),
                types: TypeRegistry::default(),
                dropped: AtomicU64::new(0),
                active,
            }),
        }
    }

    pub fn machine_id(&self) -> &str {
        &self.shared.machine_id
    }

    pub fn pids(&self) -> &PidRegistry {
        &self.shared.pids
    }

    pub fn machines(&self) -> &MachineRegistry {
        &self.shared.machines
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.shared.types
    }

    /// Messages dropped so far because their target was gone or
    /// unreachable. Drops are never surfaced to senders.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Context usable outside any actor, for external code to send, kill
    /// and monitor into the actor graph. It is bound to a detached local
    /// pid, so notices addressed to it fall out through normal routing.
    pub fn root_context(&self) -> Context {
        let pid = Pid::detached(self.shared.machine_id.clone(), Id::new());
        Context::new(self.clone(), pid)
    }

    /// Spawns `actor`: allocates its signal endpoints, registers the pid,
    /// runs `init` to completion and only then starts the worker and hands
    /// the pid back. There is no race on the actor's initial state.
    pub async fn spawn<A: Actor>(&self, mut actor: A) -> Pid {
        let (message_tx, message_rx) = mpsc::channel(self.shared.mailbox_capacity);
        let (quit_tx, quit_rx) = mpsc::channel(1);
        let (monitor_tx, monitor_rx) = mpsc::channel(1);
        let (demonitor_tx, demonitor_rx) = mpsc::channel(1);

        let pid = Pid::live(
            self.shared.machine_id.clone(),
            Endpoints {
                message: message_tx,
                quit: quit_tx,
                monitor: monitor_tx,
                demonitor: demonitor_tx,
            },
        );
        self.shared.pids.register(pid.clone());
        self.shared.active.send_modify(|n| *n += 1);

        let mut ctx = Context::new(self.clone(), pid.clone());
        actor.init(&mut ctx).await;

        tracing::info!(pid = %pid, "starting actor");
        let worker = Worker {
            system: self.clone(),
            actor,
            ctx,
            message_rx,
            quit_rx,
            monitor_rx,
            demonitor_rx,
        };
        tokio::spawn(worker.run());

        pid
    }

    /// Spawns a [`StatelessActor`] built from `run`.
    pub async fn spawn_fn<F>(&self, run: F) -> Pid
    where
        F: FnMut(&mut Context, DynMessage) -> Flow + Send + 'static,
    {
        self.spawn(StatelessActor::new(run)).await
    }

    /// Resolves once every spawned actor has terminated and been cleaned
    /// up.
    pub async fn wait_idle(&self) {
        let mut active = self.shared.active.subscribe();
        let _ = active.wait_for(|n| *n == 0).await;
    }

    fn count_drop(&self, to: &Pid, reason: &'static str) {
        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(pid = %to, reason, "dropped message");
    }

    /// Delivery decision point for every message. Local targets get the
    /// message buffered into their mailbox; targets on another machine are
    /// handed to that machine's outbound channel. The await resolves at
    /// handoff (or drop), which is what preserves per-caller send order.
    pub(crate) async fn route(&self, to: &Pid, message: DynMessage) {
        if to.machine_id() != self.machine_id() {
            let Some(machine) = self.shared.machines.lookup(to.machine_id()) else {
                self.count_drop(to, "unknown machine");
                return;
            };
            if !machine.is_connected() {
                self.count_drop(to, "machine disconnected");
                return;
            }
            let envelope = RemoteEnvelope {
                to: to.clone(),
                message,
            };
            if machine.outbound().send(envelope).await.is_err() {
                self.count_drop(to, "machine channel closed");
            }
            return;
        }

        if let Some(mailbox) = to.message_sender() {
            if mailbox.send(message).await.is_err() {
                self.count_drop(to, "actor terminated");
            }
            return;
        }

        // Stale handle, e.g. a pid that round-tripped through another
        // machine. Re-resolve the live instance by id.
        let Some(live) = self.shared.pids.lookup(to.id()) else {
            self.count_drop(to, "not registered");
            return;
        };
        let Some(mailbox) = live.message_sender() else {
            self.count_drop(to, "actor terminated");
            return;
        };
        if mailbox.send(message).await.is_err() {
            self.count_drop(to, "actor terminated");
        }
    }

    pub(crate) fn kill(&self, pid: &Pid) {
        if pid.machine_id() != self.machine_id() {
            // Extension point: kill for actors on other machines.
            tracing::debug!(pid = %pid, "kill for a remote pid is not supported");
            return;
        }
        let Some(quit) = pid.quit_sender() else {
            return;
        };
        tokio::spawn(async move {
            let _ = quit.send(()).await;
        });
    }

    pub(crate) async fn monitor(&self, subscriber: Pid, target: &Pid) -> Abortable {
        if target.machine_id() != self.machine_id() {
            // Extension point: monitoring actors on other machines.
            tracing::debug!(pid = %target, "monitor for a remote pid is not supported");
            return Abortable::RemoteUnsupported;
        }
        let Some(monitor) = target.monitor_sender() else {
            return Abortable::Noop;
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        let request = Subscribe {
            subscriber: subscriber.clone(),
            ack: ack_tx,
        };
        if monitor.send(request).await.is_err() {
            return Abortable::Noop;
        }
        // The ack resolves once the target's worker has registered the
        // watcher; a dropped ack means the target terminated first.
        match ack_rx.await {
            Ok(()) => Abortable::Monitor {
                target: target.clone(),
                subscriber,
            },
            Err(_) => Abortable::Noop,
        }
    }
}

/// The per-actor scheduling unit: exactly one per actor, sole reader of its
/// mailbox. Within one (sender, recipient) pair, delivery order therefore
/// equals send order.
struct Worker<A: Actor> {
    system: System,
    actor: A,
    ctx: Context,
    message_rx: mpsc::Receiver<DynMessage>,
    quit_rx: mpsc::Receiver<()>,
    monitor_rx: mpsc::Receiver<Subscribe>,
    demonitor_rx: mpsc::Receiver<Pid>,
}

impl<A: Actor> Worker<A> {
    async fn run(mut self) {
        let pid = self.ctx.pid().clone();

        loop {
            tokio::select! {
                _ = self.quit_rx.recv() => {
                    tracing::info!(pid = %pid, "actor received quit signal");
                    break;
                }
                Some(message) = self.message_rx.recv() => {
                    if message.is::<PoisonPill>() {
                        tracing::info!(pid = %pid, "actor received poison pill");
                        break;
                    }
                    let run = AssertUnwindSafe(self.actor.run(&mut self.ctx, message));
                    match run.catch_unwind().await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Exit) => {
                            tracing::info!(pid = %pid, "actor quit");
                            break;
                        }
                        Err(panic) => {
                            tracing::warn!(
                                pid = %pid,
                                panic = panic_message(panic.as_ref()),
                                "actor terminated by panic"
                            );
                            break;
                        }
                    }
                }
                Some(subscribe) = self.monitor_rx.recv() => {
                    tracing::info!(
                        pid = %pid,
                        subscriber_pid = %subscribe.subscriber,
                        "actor received monitor request"
                    );
                    pid.setup_monitor(&self.system, subscribe.subscriber);
                    let _ = subscribe.ack.send(());
                }
                Some(subscriber) = self.demonitor_rx.recv() => {
                    tracing::info!(
                        pid = %pid,
                        subscriber_pid = %subscriber,
                        "actor received demonitor request"
                    );
                    pid.remove_monitor(&subscriber);
                }
            }
        }

        let deferred = self.ctx.take_deferred();
        if !deferred.is_empty() {
            tracing::debug!(pid = %pid, count = deferred.len(), "running deferred actions");
            for action in deferred {
                // One failing action must not keep the rest from running.
                let _ = std::panic::catch_unwind(AssertUnwindSafe(action));
            }
        }

        pid.cleanup(&self.system);
        self.system.shared.active.send_modify(|n| *n -= 1);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "opaque panic payload"
    }
}

fn default_machine_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", host, &suffix[..8])
}

#[cfg(test)]
#[path = "system.test.rs"]
mod tests;
