#![allow(clippy::unwrap_used)]
// Integration tests for listener fan-out and digital twin mirroring.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tsnctl_core::{
    Command, Controller, CoreConfig, CoreError, DeviceProfile, DigitalTwinSink, MemoryRepository,
    NoAlgorithms, TwinEntity,
};

use common::{controller_with, drain, import, stream};

// ── Helpers ─────────────────────────────────────────────────────────

/// Twin that records `upsert:<kind>:<id>` / `remove:<kind>:<id>` lines.
#[derive(Default)]
struct RecordingTwin {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingTwin {
    fn record(&self, op: &str, entity: TwinEntity<'_>) -> Result<(), CoreError> {
        let line = match entity {
            TwinEntity::Project(p) => format!("{op}:project:{}", p.id),
            TwinEntity::DeviceProfile(p) => format!("{op}:profile:{}", p.id),
        };
        self.calls.lock().unwrap().push(line);
        if self.fail {
            return Err(CoreError::Internal("twin offline".into()));
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl DigitalTwinSink for RecordingTwin {
    fn upsert(&self, entity: TwinEntity<'_>) -> Result<(), CoreError> {
        self.record("upsert", entity)
    }

    fn remove(&self, entity: TwinEntity<'_>) -> Result<(), CoreError> {
        self.record("remove", entity)
    }
}

async fn setup(twin: Arc<RecordingTwin>) -> Controller {
    controller_with(
        Arc::new(MemoryRepository::new()),
        twin,
        Arc::new(NoAlgorithms),
    )
    .await
}

fn profile(id: i64) -> DeviceProfile {
    DeviceProfile {
        id,
        model_name: "TSN-G5008".into(),
        default_gcl: None,
    }
}

// ── Project scope ───────────────────────────────────────────────────

#[tokio::test]
async fn test_project_listener_receives_features_on_register() {
    let controller = setup(Arc::default()).await;
    let id = import(&controller, "notify").await;

    let mut sub = controller.register_listener(Some(id)).await.unwrap();
    let messages = drain(&mut sub);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["OpCode"], 0x1002);
    assert_eq!(messages[0]["StatusCode"], 200);
    assert_eq!(
        messages[0]["Data"],
        serde_json::json!({ "Undo": false, "Redo": false, "Deploy": false })
    );
}

#[tokio::test]
async fn test_edit_flushes_patches_in_entity_order() {
    let controller = setup(Arc::default()).await;
    let id = import(&controller, "notify").await;
    let mut sub = controller.register_listener(Some(id)).await.unwrap();
    drain(&mut sub);

    controller
        .execute(Command::CreateStreams {
            project_id: id,
            streams: vec![stream("s1", (1, 1), (3, 1))],
        })
        .await
        .unwrap();
    controller
        .execute(Command::DeleteLink {
            project_id: id,
            link_id: 2,
        })
        .await
        .unwrap();

    let messages = drain(&mut sub);
    let patches: Vec<(String, String)> = messages
        .iter()
        .filter(|m| m.get("Path").is_some())
        .map(|m| {
            (
                m["Action"].as_str().unwrap().to_owned(),
                m["Path"].as_str().unwrap().to_owned(),
            )
        })
        .collect();
    assert_eq!(
        patches,
        vec![
            ("create".to_owned(), format!("Projects/{id}/Streams/50001")),
            // Both endpoints of link 2 lose their used interface
            ("update".to_owned(), format!("Projects/{id}/Devices/2")),
            ("update".to_owned(), format!("Projects/{id}/Devices/3")),
            ("delete".to_owned(), format!("Projects/{id}/Links/2")),
            ("delete".to_owned(), format!("Projects/{id}/Streams/50001")),
        ]
    );

    // Every edit ends with the feature flags.
    let features = messages.iter().filter(|m| m["OpCode"] == 0x1002).count();
    assert_eq!(features, 2);
}

#[tokio::test]
async fn test_listener_of_other_project_sees_nothing() {
    let controller = setup(Arc::default()).await;
    let a = import(&controller, "a").await;
    let b = import(&controller, "b").await;
    let mut other = controller.register_listener(Some(b)).await.unwrap();
    drain(&mut other);

    controller
        .execute(Command::CreateStreams {
            project_id: a,
            streams: vec![stream("s1", (1, 1), (3, 1))],
        })
        .await
        .unwrap();

    assert!(drain(&mut other).is_empty());
}

// ── System scope ────────────────────────────────────────────────────

#[tokio::test]
async fn test_system_listener_sees_project_lifecycle_and_profiles() {
    let controller = setup(Arc::default()).await;
    let mut system = controller.register_listener(None).await.unwrap();

    let id = import(&controller, "lifecycle").await;
    controller
        .execute(Command::UpsertDeviceProfile {
            profile: Box::new(profile(7)),
        })
        .await
        .unwrap();
    controller
        .execute(Command::DeleteProject { project_id: id })
        .await
        .unwrap();

    let messages = drain(&mut system);
    let seen: Vec<(String, String)> = messages
        .iter()
        .map(|m| {
            (
                m["Action"].as_str().unwrap().to_owned(),
                m["Path"].as_str().unwrap().to_owned(),
            )
        })
        .collect();
    assert_eq!(
        seen,
        vec![
            ("create".to_owned(), format!("Projects/{id}")),
            ("create".to_owned(), "DeviceProfiles/7".to_owned()),
            ("delete".to_owned(), format!("Projects/{id}")),
        ]
    );
}

#[tokio::test]
async fn test_deleting_project_closes_its_listeners() {
    let controller = setup(Arc::default()).await;
    let id = import(&controller, "closing").await;
    let mut sub = controller.register_listener(Some(id)).await.unwrap();
    drain(&mut sub);

    controller
        .execute(Command::DeleteProject { project_id: id })
        .await
        .unwrap();
    assert!(sub.recv().await.is_none());
}

// ── Registry limits ─────────────────────────────────────────────────

#[tokio::test]
async fn test_listener_cap_is_enforced() {
    let config = CoreConfig {
        max_listeners: 2,
        poll_interval: Duration::from_secs(1),
        ..CoreConfig::default()
    };
    let controller = Controller::new(
        config,
        Arc::new(MemoryRepository::new()),
        Arc::new(RecordingTwin::default()),
        Arc::new(NoAlgorithms),
    );
    controller.start().await.unwrap();

    let first = controller.register_listener(None).await.unwrap();
    let _second = controller.register_listener(None).await.unwrap();
    let err = controller.register_listener(None).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "WebSocket connection count(2) exceeds the limit(2)"
    );

    assert!(controller.unregister_listener(first.id));
    assert!(!controller.unregister_listener(first.id));
    controller.register_listener(None).await.unwrap();
}

#[tokio::test]
async fn test_listener_stream_yields_messages() {
    let controller = setup(Arc::default()).await;
    let id = import(&controller, "streamed").await;
    let sub = controller.register_listener(Some(id)).await.unwrap();

    let mut stream = tokio_test::task::spawn(sub.into_stream());
    let first = tokio_test::assert_ready!(stream.poll_next()).unwrap();
    assert!(stream.poll_next().is_pending());
    let json: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(json["OpCode"], 0x1002);
}

// ── Digital twin ────────────────────────────────────────────────────

#[tokio::test]
async fn test_twin_mirrors_projects_and_profiles() {
    let twin = Arc::new(RecordingTwin::default());
    let controller = setup(Arc::clone(&twin)).await;

    let id = import(&controller, "mirrored").await;
    controller
        .execute(Command::CreateStreams {
            project_id: id,
            streams: vec![stream("s1", (1, 1), (3, 1))],
        })
        .await
        .unwrap();
    controller
        .execute(Command::UpsertDeviceProfile {
            profile: Box::new(profile(3)),
        })
        .await
        .unwrap();
    controller
        .execute(Command::RemoveDeviceProfile { profile_id: 3 })
        .await
        .unwrap();

    assert_eq!(
        twin.calls(),
        vec![
            format!("upsert:project:{id}"),
            format!("upsert:project:{id}"),
            "upsert:profile:3".to_owned(),
            "remove:profile:3".to_owned(),
        ]
    );
}

#[tokio::test]
async fn test_twin_failure_does_not_block_listeners() {
    let twin = Arc::new(RecordingTwin {
        fail: true,
        ..RecordingTwin::default()
    });
    let controller = setup(Arc::clone(&twin)).await;
    let mut system = controller.register_listener(None).await.unwrap();

    let id = import(&controller, "offline").await;

    assert_eq!(twin.calls(), vec![format!("upsert:project:{id}")]);
    let messages = drain(&mut system);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["Action"], "create");
}

#[tokio::test]
async fn test_removing_unknown_profile_is_not_found() {
    let controller = setup(Arc::default()).await;
    let err = controller
        .execute(Command::RemoveDeviceProfile { profile_id: 42 })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Device profile not found: 42");
}
