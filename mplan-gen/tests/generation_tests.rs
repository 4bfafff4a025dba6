//! Integration tests for the synchronous generation path
//!
//! The coordinator runs against shell script fixtures that speak the
//! marker protocol, backed by a tempfile SQLite database.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mplan_common::events::{EventBus, MplanEvent};
use mplan_gen::db;
use mplan_gen::models::{GenerationMode, GenerationRequest};
use mplan_gen::services::coordinator::{GenerateError, GenerationCoordinator};
use mplan_gen::services::{GenerationGuard, GeneratorInvoker};

/// Write an executable shell script fixture
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

struct Harness {
    _temp: tempfile::TempDir,
    pool: sqlx::SqlitePool,
    event_bus: EventBus,
    coordinator: GenerationCoordinator,
}

async fn harness(script_body: &str) -> Harness {
    harness_with_cap(script_body, None).await
}

async fn harness_with_cap(script_body: &str, cap: Option<Duration>) -> Harness {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    let script = write_script(root, "generate.sh", script_body);

    let pool = db::init_database_pool(&root.join("mplan.db")).await.unwrap();
    let event_bus = EventBus::new(100);
    let mut coordinator = GenerationCoordinator::new(
        GeneratorInvoker::new(&script, root),
        pool.clone(),
        event_bus.clone(),
    );
    if let Some(cap) = cap {
        coordinator = coordinator.with_timeout_cap(cap);
    }

    Harness {
        _temp: temp,
        pool,
        event_bus,
        coordinator,
    }
}

fn standard_request() -> GenerationRequest {
    GenerationRequest {
        mode: Some(GenerationMode::Standard),
        artist: Some("nova".to_string()),
        concept: Some("city lights".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn successful_generation_persists_a_record() {
    let h = harness(
        r#"echo "rendering $1 / $2"
echo "AUDIO_FILE=/tmp/mplan_test_song.wav"
echo "SONG_ID=42""#,
    )
    .await;

    let outcome = h
        .coordinator
        .generate("user-1", &standard_request())
        .await
        .unwrap();

    let record = outcome.record.expect("record should be persisted");
    assert_eq!(record.artifact, "/tmp/mplan_test_song.wav");
    assert_eq!(record.song_id, Some(42));
    assert_eq!(record.mode, "standard");
    assert_eq!(record.owner, "user-1");
    assert_eq!(record.artist.as_deref(), Some("nova"));

    let loaded = db::songs::load_song(&h.pool, record.record_id)
        .await
        .unwrap()
        .expect("record should be in the database");
    assert_eq!(loaded.artifact, record.artifact);
    assert_eq!(loaded.song_id, Some(42));
}

#[tokio::test]
async fn lyrics_block_is_captured_into_the_record() {
    let h = harness(
        r#"echo "AUDIO_FILE=/tmp/mplan_test_song.wav"
echo "LYRICS_START"
echo "verse one"
echo "verse two"
echo "LYRICS_END""#,
    )
    .await;

    let outcome = h
        .coordinator
        .generate("user-1", &standard_request())
        .await
        .unwrap();

    let record = outcome.record.unwrap();
    assert_eq!(record.lyrics.as_deref(), Some("verse one\nverse two"));
}

#[tokio::test]
async fn success_without_artifact_yields_no_record() {
    let h = harness(r#"echo "nothing rendered, text only""#).await;

    let outcome = h
        .coordinator
        .generate("user-1", &standard_request())
        .await
        .unwrap();

    assert!(outcome.record.is_none());
    assert!(outcome.output.contains("text only"));
    assert_eq!(db::songs::count_songs(&h.pool, "user-1").await.unwrap(), 0);
}

#[tokio::test]
async fn hard_failure_without_artifact_is_execution_failed() {
    let h = harness(
        r#"echo "model exploded" >&2
exit 2"#,
    )
    .await;

    let err = h
        .coordinator
        .generate("user-1", &standard_request())
        .await
        .unwrap_err();

    match err {
        GenerateError::ExecutionFailed { exit_code, output } => {
            assert_eq!(exit_code, Some(2));
            assert!(output.contains("model exploded"));
        }
        other => panic!("expected ExecutionFailed, got {:?}", other),
    }
    // No partial record on failure
    assert_eq!(db::songs::count_songs(&h.pool, "user-1").await.unwrap(), 0);
}

#[tokio::test]
async fn soft_failure_with_artifact_keeps_the_record() {
    // Non-zero exit but an artifact marker was emitted (one take of several
    // failed); the artifact is kept
    let h = harness(
        r#"echo "AUDIO_FILE=/tmp/mplan_partial.wav"
exit 1"#,
    )
    .await;

    let outcome = h
        .coordinator
        .generate("user-1", &standard_request())
        .await
        .unwrap();

    let record = outcome.record.expect("artifact should be kept");
    assert_eq!(record.artifact, "/tmp/mplan_partial.wav");
    assert_eq!(db::songs::count_songs(&h.pool, "user-1").await.unwrap(), 1);
}

#[tokio::test]
async fn timeout_yields_timed_out_with_no_record_and_a_free_actor() {
    let cap = Duration::from_millis(200);
    let h = harness_with_cap("sleep 30", Some(cap)).await;

    // Lease held across the call, as the request handler holds it
    let guard = GenerationGuard::new();
    {
        let _lease = guard.try_acquire("user-1").unwrap();
        let err = h
            .coordinator
            .generate("user-1", &standard_request())
            .await
            .unwrap_err();
        match err {
            GenerateError::TimedOut(budget) => assert_eq!(budget, cap),
            other => panic!("expected TimedOut, got {:?}", other),
        }
    }

    assert!(!guard.is_busy("user-1"));
    assert_eq!(db::songs::count_songs(&h.pool, "user-1").await.unwrap(), 0);
}

#[tokio::test]
async fn missing_executable_is_launch_failed() {
    let temp = tempfile::tempdir().unwrap();
    let pool = db::init_database_pool(&temp.path().join("mplan.db"))
        .await
        .unwrap();
    let coordinator = GenerationCoordinator::new(
        GeneratorInvoker::new(temp.path().join("no-such-generator"), temp.path()),
        pool,
        EventBus::new(16),
    );

    let err = coordinator
        .generate("user-1", &standard_request())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::LaunchFailed(_)));
}

#[tokio::test]
async fn invalid_request_fails_before_invocation() {
    // Fixture would fail loudly if invoked; a missing required parameter
    // must be rejected first
    let h = harness("exit 99").await;

    let request = GenerationRequest {
        mode: Some(GenerationMode::Collab),
        artist: Some("ghost".to_string()),
        concept: Some("toxic love".to_string()),
        ..Default::default()
    };
    let err = h.coordinator.generate("user-1", &request).await.unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Common(mplan_common::Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn ansi_sequences_are_stripped_from_display_output() {
    let h = harness(r#"printf '\033[31mred alert\033[0m\n'"#).await;

    let outcome = h
        .coordinator
        .generate("user-1", &standard_request())
        .await
        .unwrap();

    assert!(outcome.output.contains("red alert"));
    assert!(!outcome.output.contains('\u{1b}'));
}

#[tokio::test]
async fn lifecycle_events_are_broadcast() {
    let h = harness(r#"echo "AUDIO_FILE=/tmp/mplan_test_song.wav""#).await;
    let mut rx = h.event_bus.subscribe();

    h.coordinator
        .generate("user-1", &standard_request())
        .await
        .unwrap();

    let started = rx.recv().await.unwrap();
    assert!(matches!(started, MplanEvent::GenerationStarted { .. }));

    let completed = rx.recv().await.unwrap();
    match completed {
        MplanEvent::GenerationCompleted { actor, artifact, .. } => {
            assert_eq!(actor, "user-1");
            assert_eq!(artifact.as_deref(), Some("/tmp/mplan_test_song.wav"));
        }
        other => panic!("expected GenerationCompleted, got {:?}", other),
    }
}

#[tokio::test]
async fn failure_events_are_broadcast() {
    let h = harness("exit 7").await;
    let mut rx = h.event_bus.subscribe();

    let _ = h.coordinator.generate("user-1", &standard_request()).await;

    let started = rx.recv().await.unwrap();
    assert!(matches!(started, MplanEvent::GenerationStarted { .. }));
    let failed = rx.recv().await.unwrap();
    assert!(matches!(failed, MplanEvent::GenerationFailed { .. }));
}

#[tokio::test]
async fn artist_detail_uses_the_show_keyword() {
    let h = harness(
        r#"if [ "$1" = "--show" ] && [ "$2" = "nova" ]; then echo "Artist: nova (synthwave)"; else exit 1; fi"#,
    )
    .await;

    let detail = h.coordinator.show_artist("nova").await.unwrap();
    assert!(detail.contains("Artist: nova"));
}

#[tokio::test]
async fn listing_returns_cleaned_roster_text() {
    let h = harness(
        r#"if [ "$1" = "--list" ]; then printf '\033[1mnova\033[0m\nvelvet\n'; else exit 1; fi"#,
    )
    .await;

    let roster = h.coordinator.list_artists().await.unwrap();
    assert!(roster.contains("nova"));
    assert!(roster.contains("velvet"));
    assert!(!roster.contains('\u{1b}'));
}
