use std::collections::BTreeMap;

use kameo::actor::Spawn;
use kameo::error::SendError;

use fleetpack_api::{App, Spec};
use fleetpack_core::*;
use fleetpack_packet::{Packet, Payload, PayloadEntry, SealedPacket};

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn numbered_packet(i: usize) -> SealedPacket {
    let mut payload = Payload::new();
    payload
        .push(PayloadEntry::file("number", 0o644, i.to_string().into_bytes()))
        .unwrap();
    let n = i.to_string();
    let even = (i % 2 == 0).to_string();
    let odd = (i % 2 == 1).to_string();
    let packet = Packet::new(
        "test-packet",
        labels(&[("n", n.as_str()), ("even", even.as_str()), ("odd", odd.as_str())]),
    )
    .with_payload(payload);
    SealedPacket::seal(packet).unwrap()
}

fn simple_packet(name: &str, pairs: &[(&str, &str)]) -> SealedPacket {
    SealedPacket::seal(Packet::new(name, labels(pairs))).unwrap()
}

#[tokio::test]
async fn test_best_match_end_to_end() {
    let registry = RegistryActor::spawn(RegistryActorArgs::default());

    let mut hashes = Vec::new();
    for i in 0..20 {
        let info = registry
            .ask(SavePacket {
                packet: numbered_packet(i),
            })
            .await
            .unwrap();
        hashes.push(info.hash);
    }

    let best = registry
        .ask(BestMatch {
            name: "test-packet".to_string(),
            labels: labels(&[
                ("n", "3"),
                ("even", "false"),
                ("odd", "true"),
                ("doesnt", "exist"),
            ]),
        })
        .await
        .unwrap();
    assert_eq!(best.hash, hashes[3]);
    assert_eq!(best.labels.get("n").map(String::as_str), Some("3"));

    registry
        .ask(DeletePacket { hash: best.hash })
        .await
        .unwrap();

    let infos = registry
        .ask(GetInfos {
            name: "test-packet".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(infos.len(), 19);

    registry.stop_gracefully().await.unwrap();
}

#[tokio::test]
async fn test_save_replaces_same_identity() {
    let registry = RegistryActor::spawn(RegistryActorArgs::default());

    let first = simple_packet("web", &[("tier", "stable")]);
    let first_hash = first.hash().to_string();
    registry.ask(SavePacket { packet: first }).await.unwrap();

    let mut payload = Payload::new();
    payload
        .push(PayloadEntry::file("index.html", 0o644, b"v2".to_vec()))
        .unwrap();
    let second = SealedPacket::seal(
        Packet::new("web", labels(&[("tier", "stable")])).with_payload(payload),
    )
    .unwrap();
    let second_hash = second.hash().to_string();
    registry.ask(SavePacket { packet: second }).await.unwrap();

    let infos = registry
        .ask(GetInfos {
            name: "web".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].hash, second_hash);

    let err = registry
        .ask(GetPacketInfo { hash: first_hash })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SendError::HandlerError(CoreError::PacketNotFound(_))
    ));
}

#[tokio::test]
async fn test_spec_merge_follows_registry() {
    let registry = RegistryActor::spawn(RegistryActorArgs::default());

    registry
        .ask(CreateSpec {
            spec: Spec::new("a").with_target("a", "a").with_app(App::new("foo")),
        })
        .await
        .unwrap();
    registry
        .ask(CreateSpec {
            spec: Spec::new("b").with_target("b", "b").with_app(App::new("bar")),
        })
        .await
        .unwrap();

    let request = labels(&[("a", "a"), ("b", "b")]);
    let merged = registry
        .ask(ComputeSpec {
            labels: request.clone(),
        })
        .await
        .unwrap();
    let names: Vec<_> = merged.apps.iter().map(|a| a.name.clone()).collect();
    assert_eq!(names, vec!["foo", "bar"]);

    registry
        .ask(DeleteSpec {
            id: "a".to_string(),
        })
        .await
        .unwrap();

    let merged = registry.ask(ComputeSpec { labels: request }).await.unwrap();
    let names: Vec<_> = merged.apps.iter().map(|a| a.name.clone()).collect();
    assert_eq!(names, vec!["bar"]);
}

#[tokio::test]
async fn test_spec_crud_rules() {
    let registry = RegistryActor::spawn(RegistryActorArgs::default());

    registry
        .ask(CreateSpec {
            spec: Spec::new("first"),
        })
        .await
        .unwrap();
    registry
        .ask(CreateSpec {
            spec: Spec::new("second"),
        })
        .await
        .unwrap();

    let err = registry
        .ask(CreateSpec {
            spec: Spec::new("first"),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SendError::HandlerError(CoreError::SpecAlreadyExists(_))
    ));

    let err = registry
        .ask(CreateSpec {
            spec: Spec::new(""),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SendError::HandlerError(CoreError::InvalidSpec(_))
    ));

    let replaced = registry
        .ask(ReplaceSpec {
            id: "first".to_string(),
            spec: Spec::new("ignored").with_app(App::new("x")),
        })
        .await
        .unwrap();
    assert_eq!(replaced.id, "first");

    let ids: Vec<_> = registry
        .ask(ListSpecs)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["first", "second"]);

    let err = registry
        .ask(ReplaceSpec {
            id: "missing".to_string(),
            spec: Spec::default(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SendError::HandlerError(CoreError::SpecNotFound(_))
    ));
}

#[tokio::test]
async fn test_desired_state_partial_failure() {
    let registry = RegistryActor::spawn(RegistryActorArgs::default());

    let present = simple_packet("present", &[]);
    let present_hash = present.hash().to_string();
    registry.ask(SavePacket { packet: present }).await.unwrap();
    registry
        .ask(CreateSpec {
            spec: Spec::new("s")
                .with_app(App::new("missing"))
                .with_app(App::new("present")),
        })
        .await
        .unwrap();

    let state = registry
        .ask(ComputeDesiredState {
            labels: BTreeMap::new(),
        })
        .await
        .unwrap();

    assert_eq!(state.apps.len(), 1);
    assert_eq!(state.apps[0].hash, present_hash);
    assert_eq!(state.unresolved_names().into_iter().collect::<Vec<_>>(), vec!["missing"]);
}

#[tokio::test]
async fn test_snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let args = RegistryActorArgs {
        data_dir: Some(dir.path().to_path_buf()),
    };

    let registry = RegistryActor::spawn(args.clone());
    let packet = simple_packet("persisted", &[("os", "linux")]);
    let hash = packet.hash().to_string();
    registry.ask(SavePacket { packet }).await.unwrap();
    registry
        .ask(CreateSpec {
            spec: Spec::new("keep").with_app(App::new("persisted")),
        })
        .await
        .unwrap();
    registry.stop_gracefully().await.unwrap();
    registry.wait_for_shutdown().await;

    let restarted = RegistryActor::spawn(args);
    let stats = restarted.ask(GetStats).await.unwrap();
    assert_eq!(stats, RegistryStats { packets: 1, specs: 1 });

    let data = restarted.ask(GetPacketData { hash: hash.clone() }).await.unwrap();
    assert_eq!(fleetpack_packet::hash_bytes(&data), hash);
}

#[tokio::test]
async fn test_failed_index_write_leaves_registry_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let registry = RegistryActor::spawn(RegistryActorArgs {
        data_dir: Some(dir.path().to_path_buf()),
    });
    let kept = simple_packet("kept", &[]);
    registry.ask(SavePacket { packet: kept.clone() }).await.unwrap();
    registry
        .ask(CreateSpec {
            spec: Spec::new("base"),
        })
        .await
        .unwrap();

    // a directory where the index file belongs makes every index write fail
    let index = dir.path().join("index.json");
    std::fs::remove_file(&index).unwrap();
    std::fs::create_dir(&index).unwrap();

    let err = registry
        .ask(CreateSpec {
            spec: Spec::new("s"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SendError::HandlerError(CoreError::Storage(_))));

    let fresh = simple_packet("fresh", &[]);
    let fresh_file = dir.path().join(format!("packets/{}.jpk", fresh.hash()));
    assert!(registry.ask(SavePacket { packet: fresh }).await.is_err());
    assert!(!fresh_file.exists());

    assert!(
        registry
            .ask(DeletePacket {
                hash: kept.hash().to_string(),
            })
            .await
            .is_err()
    );
    assert!(
        registry
            .ask(DeleteSpec {
                id: "base".to_string(),
            })
            .await
            .is_err()
    );

    let stats = registry.ask(GetStats).await.unwrap();
    assert_eq!(stats, RegistryStats { packets: 1, specs: 1 });
    assert!(
        dir.path()
            .join(format!("packets/{}.jpk", kept.hash()))
            .exists()
    );

    // once storage recovers the same create goes through
    std::fs::remove_dir(&index).unwrap();
    registry
        .ask(CreateSpec {
            spec: Spec::new("s"),
        })
        .await
        .unwrap();
    let ids: Vec<_> = registry
        .ask(ListSpecs)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["base", "s"]);
}
