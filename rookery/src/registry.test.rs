use assert_matches::assert_matches;

use super::*;
use crate::prelude::*;

#[derive(Debug, Default)]
struct HandshakeMessage {
    greeting: String,
}

impl Message for HandshakeMessage {
    fn tag(&self) -> &'static str {
        "test.handshake"
    }
}

#[test]
fn test_type_registry_returns_zero_value_templates() {
    let types = TypeRegistry::default();
    types.register::<HandshakeMessage>().unwrap();

    let template = types.template("test.handshake").unwrap();
    let template = template.downcast_ref::<HandshakeMessage>().unwrap();
    assert_eq!(template.greeting, "");
}

#[test]
fn test_type_registry_rejects_duplicate_tags() {
    let types = TypeRegistry::default();
    types.register::<HandshakeMessage>().unwrap();
    assert_matches!(
        types.register::<HandshakeMessage>(),
        Err(TypeRegistryError::DuplicateTag {
            tag: "test.handshake"
        })
    );
}

#[test]
fn test_type_registry_unknown_tag_is_none() {
    let types = TypeRegistry::default();
    assert!(types.template("test.unknown").is_none());
}

#[test]
fn test_pid_registry_register_lookup_unregister() {
    let pids = PidRegistry::default();
    assert!(pids.is_empty());

    let pid = Pid::detached("machine-a", Id::new());
    pids.register(pid.clone());
    assert_eq!(pids.len(), 1);
    assert_eq!(pids.lookup(pid.id()), Some(pid.clone()));

    pids.unregister(pid.id());
    assert!(pids.is_empty());
    assert_eq!(pids.lookup(pid.id()), None);
}
