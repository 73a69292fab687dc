use autosave_core::SyncConfig;
use autosave_journal::SaveOutcome;
use autosave_session::SaveStatus;
use cli_lib::script::{replay, Script};

fn statuses(replay: &cli_lib::script::Replay) -> Vec<(u64, SaveStatus)> {
    replay.statuses.iter().map(|t| (t.at_ms, t.value)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_bio_edit_saves_once() {
    let script = Script::from_json(
        r#"{
            "owner": "user-1",
            "profile": { "username": "spacewolf99", "display_name": "Logan" },
            "store_latency_ms": 150,
            "steps": [
                { "at_ms": 0, "action": "edit", "edit": { "field": "bio", "value": "Veteran" } },
                { "at_ms": 400, "action": "edit", "edit": { "field": "bio", "value": "Veteran painter" } }
            ]
        }"#,
    )
    .unwrap();

    let replay = replay(script, SyncConfig::default()).await.unwrap();

    assert_eq!(
        statuses(&replay),
        vec![
            (1400, SaveStatus::Saving),
            (1550, SaveStatus::Saved),
            (3550, SaveStatus::Idle)
        ]
    );
    assert_eq!(replay.writes.len(), 1);
    assert_eq!(replay.writes[0].record.bio.as_deref(), Some("Veteran painter"));
    assert_eq!(replay.writes[0].record.display_name.as_deref(), Some("Logan"));
    assert_eq!(replay.baseline.bio.as_deref(), Some("Veteran painter"));
    assert_eq!(replay.history.len(), 1);
    assert_eq!(replay.history[0].outcome, SaveOutcome::Succeeded);
    assert!(replay.validations.is_empty());
    assert!(!replay.discarded_edits);
}

#[tokio::test(start_paused = true)]
async fn test_taken_handle_is_never_written() {
    let script = Script::from_json(
        r#"{
            "profile": { "username": "spacewolf99" },
            "taken_handles": { "ragnar": "user-2" },
            "directory_latency_ms": 100,
            "steps": [
                { "at_ms": 0, "action": "edit", "edit": { "field": "username", "value": "Ragnar" } },
                { "at_ms": 0, "action": "edit", "edit": { "field": "bio", "value": "Fenris" } }
            ]
        }"#,
    )
    .unwrap();

    let replay = replay(script, SyncConfig::default()).await.unwrap();

    let states: Vec<(&str, &str)> = replay
        .validations
        .iter()
        .map(|t| (t.value.candidate.as_str(), t.value.state.as_str()))
        .collect();
    assert_eq!(
        states,
        vec![
            ("ragnar", "unchecked"),
            ("ragnar", "pending"),
            ("ragnar", "taken")
        ]
    );
    assert!(replay.writes.is_empty());
    assert!(replay.statuses.is_empty());
    assert_eq!(replay.baseline.username, "spacewolf99");
    let last = replay.final_validation().unwrap();
    assert_eq!((last.candidate.as_str(), last.state.as_str()), ("ragnar", "taken"));
}

#[tokio::test(start_paused = true)]
async fn test_tag_past_limit_is_rejected() {
    let script = Script::from_json(
        r#"{
            "profile": { "username": "spacewolf99" },
            "steps": [
                { "at_ms": 0, "action": "toggle_tag", "tag": "necrons" },
                { "at_ms": 10, "action": "toggle_tag", "tag": "orks" },
                { "at_ms": 20, "action": "toggle_tag", "tag": "tau" },
                { "at_ms": 30, "action": "toggle_tag", "tag": "eldar" }
            ]
        }"#,
    )
    .unwrap();

    let replay = replay(script, SyncConfig::default()).await.unwrap();

    assert_eq!(replay.rejected.len(), 1);
    assert_eq!(replay.rejected[0].at_ms, 30);
    let tags: Vec<&str> = replay.baseline.tags.iter().map(|t| t.0.as_str()).collect();
    assert_eq!(tags, vec!["necrons", "orks", "tau"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_reports_error_status() {
    let script = Script::from_json(
        r#"{
            "profile": { "username": "spacewolf99" },
            "fail_writes": 1,
            "steps": [
                { "at_ms": 0, "action": "edit", "edit": { "field": "location", "value": "Fenris" } }
            ]
        }"#,
    )
    .unwrap();

    let replay = replay(script, SyncConfig::default()).await.unwrap();

    let values: Vec<SaveStatus> = replay.statuses.iter().map(|t| t.value).collect();
    assert_eq!(values, vec![SaveStatus::Saving, SaveStatus::Error, SaveStatus::Idle]);
    assert_eq!(replay.writes.len(), 1);
    assert!(!replay.writes[0].succeeded);
    assert_eq!(replay.baseline.location, None);
}

#[tokio::test(start_paused = true)]
async fn test_signed_out_script_never_writes() {
    let script = Script::from_json(
        r#"{
            "owner": null,
            "profile": { "username": "spacewolf99" },
            "steps": [
                { "at_ms": 0, "action": "edit", "edit": { "field": "bio", "value": "x" } },
                { "at_ms": 0, "action": "flush" }
            ]
        }"#,
    )
    .unwrap();

    let replay = replay(script, SyncConfig::default()).await.unwrap();
    assert!(replay.writes.is_empty());
    assert_eq!(replay.final_status, SaveStatus::Idle);
}

#[test]
fn test_unknown_script_field_is_rejected() {
    let err = Script::from_json(r#"{ "profile": { "username": "a" }, "steps": [], "bogus": 1 }"#)
        .unwrap_err();
    assert!(format!("{err:#}").contains("bogus"));
}

#[test]
fn test_unit_action_parses() {
    let script = Script::from_json(
        r#"{ "profile": { "username": "abc" }, "steps": [ { "at_ms": 5, "action": "sign_out" } ] }"#,
    )
    .unwrap();
    assert_eq!(script.steps.len(), 1);
    assert_eq!(script.steps[0].at_ms, 5);
}
