//! rookery — an actor-model runtime with location-transparent addressing.
//!
//! Independent units of behavior ("actors") communicate exclusively through
//! asynchronous message passing into per-actor bounded mailboxes. Each actor
//! is addressed by a [`Pid`](prelude::Pid) handle that works the same
//! whether the actor lives in this process or on another machine; fault
//! detection is available through monitoring, and termination can be
//! graceful (poison pill, quit) or forced (kill).

pub mod actor;
pub mod context;
pub mod id;
pub mod machine;
pub mod message;
pub mod pid;
pub mod prelude;
pub mod registry;
pub mod system;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::EnvFilter;

    /// Initialize tracing for tests
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive("rookery=debug".parse().unwrap())
                    .add_directive("test=debug".parse().unwrap()),
            )
            .with_target(false)
            .try_init();
    }

    /// Collects the payloads of every GenericMessage it receives.
    fn collector(
        seen: Arc<Mutex<Vec<String>>>,
    ) -> StatelessActor<impl FnMut(&mut Context, DynMessage) -> Flow + Send + 'static> {
        StatelessActor::new(move |_ctx, message| {
            if let Some(m) = message.downcast_ref::<GenericMessage>() {
                seen.lock().push(m.value.clone());
            }
            Flow::Continue
        })
    }

    /// Monitors `target` at init and records every termination notice.
    struct Watcher {
        target: Pid,
        notices: Arc<Mutex<Vec<Pid>>>,
        quit_on_notice: bool,
    }

    #[async_trait]
    impl Actor for Watcher {
        async fn init(&mut self, ctx: &mut Context) {
            let _ = ctx.monitor(&self.target).await;
        }

        async fn run(&mut self, ctx: &mut Context, message: DynMessage) -> Flow {
            if let Some(down) = message.downcast_ref::<DownMessage>() {
                self.notices.lock().push(down.who.clone());
                if self.quit_on_notice {
                    return ctx.quit();
                }
            }
            Flow::Continue
        }
    }

    #[tokio::test]
    async fn test_send_preserves_per_sender_order() {
        init_tracing();
        let system = System::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recipient = system.spawn(collector(seen.clone())).await;

        let root = system.root_context();
        for i in 0..100 {
            root.send(&recipient, GenericMessage::new(i.to_string()))
                .await;
        }
        root.send(&recipient, PoisonPill).await;
        system.wait_idle().await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 100);
        for (i, value) in seen.iter().enumerate() {
            assert_eq!(value, &i.to_string());
        }
    }

    #[tokio::test]
    async fn test_monitor_with_kill() {
        init_tracing();
        let system = System::new();
        let target = system.spawn_fn(|_, _| Flow::Continue).await;

        let notices = Arc::new(Mutex::new(Vec::new()));
        system
            .spawn(Watcher {
                target: target.clone(),
                notices: notices.clone(),
                quit_on_notice: true,
            })
            .await;

        system.root_context().kill(&target);
        system.wait_idle().await;

        let notices = notices.lock();
        assert_eq!(notices.as_slice(), &[target]);
    }

    #[tokio::test]
    async fn test_monitor_with_poison_pill() {
        init_tracing();
        let system = System::new();
        let target = system.spawn_fn(|_, _| Flow::Continue).await;

        let notices = Arc::new(Mutex::new(Vec::new()));
        system
            .spawn(Watcher {
                target: target.clone(),
                notices: notices.clone(),
                quit_on_notice: true,
            })
            .await;

        system.root_context().send(&target, PoisonPill).await;
        system.wait_idle().await;

        let notices = notices.lock();
        assert_eq!(notices.as_slice(), &[target]);
    }

    /// Monitors its target, then tears the subscription down again when it
    /// receives the "abort" command.
    struct AbortingWatcher {
        target: Pid,
        subscription: Option<Abortable>,
        notices: Arc<Mutex<Vec<Pid>>>,
    }

    #[async_trait]
    impl Actor for AbortingWatcher {
        async fn init(&mut self, ctx: &mut Context) {
            self.subscription = Some(ctx.monitor(&self.target).await);
        }

        async fn run(&mut self, _ctx: &mut Context, message: DynMessage) -> Flow {
            if let Some(down) = message.downcast_ref::<DownMessage>() {
                self.notices.lock().push(down.who.clone());
            } else if message.is::<GenericMessage>() {
                if let Some(subscription) = self.subscription.take() {
                    subscription.abort().await;
                }
            }
            Flow::Continue
        }
    }

    #[tokio::test]
    async fn test_aborted_monitor_receives_no_notice() {
        init_tracing();
        let system = System::new();
        let target = system.spawn_fn(|_, _| Flow::Continue).await;

        let notices = Arc::new(Mutex::new(Vec::new()));
        let watcher = system
            .spawn(AbortingWatcher {
                target: target.clone(),
                subscription: None,
                notices: notices.clone(),
            })
            .await;

        let root = system.root_context();
        root.send(&watcher, GenericMessage::new("abort")).await;
        // Let the target's worker process the demonitor request before the
        // kill races it.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        root.kill(&target);
        root.kill(&watcher);
        system.wait_idle().await;

        assert!(notices.lock().is_empty());
    }

    #[tokio::test]
    async fn test_send_to_terminated_pid_is_a_silent_noop() {
        init_tracing();
        let system = System::new();
        let pid = system.spawn_fn(|_, _| Flow::Continue).await;

        let root = system.root_context();
        root.kill(&pid);
        system.wait_idle().await;
        assert!(system.pids().is_empty());

        let dropped_before = system.dropped();
        root.send(&pid, GenericMessage::new("into the void")).await;
        root.send(&pid, PoisonPill).await;
        root.kill(&pid);
        assert_eq!(system.dropped(), dropped_before + 2);
    }

    #[tokio::test]
    async fn test_monitor_of_terminated_pid_is_noop() {
        init_tracing();
        let system = System::new();
        let pid = system.spawn_fn(|_, _| Flow::Continue).await;

        let root = system.root_context();
        root.kill(&pid);
        system.wait_idle().await;

        assert_matches::assert_matches!(root.monitor(&pid).await, Abortable::Noop);
    }

    #[tokio::test]
    async fn test_monitor_of_remote_pid_is_unsupported() {
        init_tracing();
        let system = System::new();
        let remote = Pid::detached("somewhere-else", Id::new());
        let root = system.root_context();
        assert_matches::assert_matches!(root.monitor(&remote).await, Abortable::RemoteUnsupported);
    }

    #[tokio::test]
    async fn test_quit_skips_rest_of_invocation_and_later_messages() {
        init_tracing();
        let system = System::new();
        let invocations = Arc::new(AtomicUsize::new(0));
        let witness = invocations.clone();
        let pid = system
            .spawn_fn(move |ctx, _message| {
                witness.fetch_add(1, Ordering::SeqCst);
                ctx.quit()
            })
            .await;

        let root = system.root_context();
        root.send(&pid, GenericMessage::new("first")).await;
        root.send(&pid, GenericMessage::new("second")).await;
        system.wait_idle().await;

        // The first invocation quit the actor; the second message was never
        // processed.
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert!(system.pids().is_empty());
    }

    /// Registers a deferred action at init; its behavior terminates by
    /// whatever means the test chooses.
    struct Deferring {
        counter: Arc<AtomicUsize>,
        on_message: fn(&mut Context, DynMessage) -> Flow,
    }

    #[async_trait]
    impl Actor for Deferring {
        async fn init(&mut self, ctx: &mut Context) {
            let counter = self.counter.clone();
            ctx.defer(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        async fn run(&mut self, ctx: &mut Context, message: DynMessage) -> Flow {
            (self.on_message)(ctx, message)
        }
    }

    #[tokio::test]
    async fn test_deferred_actions_run_once_on_every_termination_path() {
        init_tracing();
        let system = System::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let quits = system
            .spawn(Deferring {
                counter: counter.clone(),
                on_message: |ctx, _| ctx.quit(),
            })
            .await;
        let panics = system
            .spawn(Deferring {
                counter: counter.clone(),
                on_message: |_, _| panic!("boom"),
            })
            .await;
        let poisoned = system
            .spawn(Deferring {
                counter: counter.clone(),
                on_message: |_, _| Flow::Continue,
            })
            .await;
        let killed = system
            .spawn(Deferring {
                counter: counter.clone(),
                on_message: |_, _| Flow::Continue,
            })
            .await;

        let root = system.root_context();
        root.send(&quits, GenericMessage::new("go")).await;
        root.send(&panics, GenericMessage::new("go")).await;
        root.send(&poisoned, PoisonPill).await;
        root.kill(&killed);
        system.wait_idle().await;

        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert!(system.pids().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_senders_each_keep_their_own_order() {
        init_tracing();
        let system = System::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recipient = system.spawn(collector(seen.clone())).await;

        let mut tasks = Vec::new();
        for prefix in ["a", "b"] {
            let ctx = system.root_context();
            let to = recipient.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    ctx.send(&to, GenericMessage::new(format!("{prefix}-{i}")))
                        .await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        system.root_context().send(&recipient, PoisonPill).await;
        system.wait_idle().await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 100);
        for prefix in ["a", "b"] {
            let own: Vec<_> = seen
                .iter()
                .filter(|v| v.starts_with(prefix))
                .cloned()
                .collect();
            let expected: Vec<_> = (0..50).map(|i| format!("{prefix}-{i}")).collect();
            assert_eq!(own, expected);
        }
    }

    #[tokio::test]
    async fn test_spawn_and_kill_many_actors_leaves_registry_empty() {
        init_tracing();
        let system = System::new();
        let root = system.root_context();

        let mut pids = Vec::with_capacity(10_000);
        for _ in 0..10_000 {
            pids.push(system.spawn_fn(|_, _| Flow::Continue).await);
        }
        assert_eq!(system.pids().len(), 10_000);

        for pid in &pids {
            root.kill(pid);
        }
        system.wait_idle().await;

        assert!(system.pids().is_empty());
    }
}
