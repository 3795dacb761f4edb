use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::*;
use crate::machine::Machine;
use crate::message::GenericMessage;
use crate::prelude::Flow;

fn system_on(machine_id: &str) -> System {
    System::with_config(SystemConfig {
        machine_id: Some(machine_id.to_string()),
        ..SystemConfig::default()
    })
}

#[test_log::test(tokio::test)]
async fn test_route_hands_remote_pids_to_the_machine_channel() {
    let system = system_on("machine-a");
    let (outbound, mut inbound) = mpsc::channel(16);
    system.machines().register(Machine::new("machine-b", outbound));

    let remote = Pid::detached("machine-b", Id::new());
    system
        .route(&remote, Box::new(GenericMessage::new("hello")))
        .await;

    let envelope = inbound.recv().await.unwrap();
    assert_eq!(envelope.to, remote);
    let message = envelope.message.downcast_ref::<GenericMessage>().unwrap();
    assert_eq!(message.value, "hello");
    assert_eq!(system.dropped(), 0);
}

#[test_log::test(tokio::test)]
async fn test_route_drops_for_unknown_machines() {
    let system = system_on("machine-a");
    let remote = Pid::detached("machine-x", Id::new());
    system
        .route(&remote, Box::new(GenericMessage::new("lost")))
        .await;
    assert_eq!(system.dropped(), 1);
}

#[test_log::test(tokio::test)]
async fn test_route_drops_for_disconnected_machines() {
    let system = system_on("machine-a");
    let (outbound, mut inbound) = mpsc::channel(16);
    let machine = Machine::new("machine-b", outbound);
    system.machines().register(machine.clone());
    machine.mark_disconnected();

    let remote = Pid::detached("machine-b", Id::new());
    system
        .route(&remote, Box::new(GenericMessage::new("lost")))
        .await;

    assert_eq!(system.dropped(), 1);
    assert!(inbound.try_recv().is_err());
}

#[test_log::test(tokio::test)]
async fn test_route_re_resolves_stale_local_handles() {
    let system = system_on("machine-a");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let pid = system
        .spawn_fn(move |_ctx, message| {
            if let Some(m) = message.downcast_ref::<GenericMessage>() {
                sink.lock().push(m.value.clone());
                return Flow::Exit;
            }
            Flow::Continue
        })
        .await;

    // A pid that round-tripped through its display form has no live
    // endpoints and must be re-resolved against the registry.
    let stale: Pid = pid.to_string().parse().unwrap();
    system
        .route(&stale, Box::new(GenericMessage::new("resolved")))
        .await;
    system.wait_idle().await;

    assert_eq!(seen.lock().as_slice(), ["resolved".to_string()].as_slice());
    assert_eq!(system.dropped(), 0);
}

#[test_log::test(tokio::test)]
async fn test_route_drops_stale_handles_of_unregistered_actors() {
    let system = system_on("machine-a");
    let stale = Pid::detached("machine-a", Id::new());
    system
        .route(&stale, Box::new(GenericMessage::new("lost")))
        .await;
    assert_eq!(system.dropped(), 1);
}

#[test_log::test(tokio::test)]
async fn test_kill_of_a_remote_pid_is_an_unimplemented_noop() {
    let system = system_on("machine-a");
    let remote = Pid::detached("machine-b", Id::new());
    // Extension point: must neither panic nor block.
    system.kill(&remote);
}

#[test_log::test(tokio::test)]
async fn test_default_machine_ids_are_unique() {
    let a = System::new();
    let b = System::new();
    assert_ne!(a.machine_id(), b.machine_id());
}
