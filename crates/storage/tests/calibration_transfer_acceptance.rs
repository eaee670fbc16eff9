use std::fs;

use shared::ErrorKind;
use storage::{propagate_calibration, CalibrationArtifact};

#[test]
fn leader_artifact_is_byte_identical_to_follower_artifact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let follower = dir.path().join("robots").join("lelamp_follower").join("lamp7.json");
    let leader = dir
        .path()
        .join("teleoperators")
        .join("lelamp_leader")
        .join("lamp7.json");

    let mut artifact = CalibrationArtifact::new();
    artifact.insert("base_yaw.homing_offset", -41.0);
    artifact.insert("elbow.homing_offset", 12.5);
    artifact.save(&follower).expect("write follower artifact");

    let entries = propagate_calibration(&follower, &leader).expect("propagate");

    assert_eq!(entries, 2);
    assert_eq!(
        fs::read(&leader).expect("leader bytes"),
        fs::read(&follower).expect("follower bytes")
    );
    assert_eq!(CalibrationArtifact::load(&leader).expect("leader artifact"), artifact);
}

#[test]
fn compact_document_is_copied_verbatim() {
    let dir = tempfile::tempdir().expect("tempdir");
    let follower = dir.path().join("follower.json");
    let leader = dir.path().join("leader").join("lamp7.json");
    fs::write(&follower, r#"{"elbow":12.5}"#).expect("write follower");

    propagate_calibration(&follower, &leader).expect("propagate");

    assert_eq!(fs::read_to_string(&leader).expect("leader"), r#"{"elbow":12.5}"#);
}

#[test]
fn missing_follower_artifact_is_a_transfer_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let leader = dir.path().join("leader.json");

    let err = propagate_calibration(&dir.path().join("absent.json"), &leader)
        .expect_err("missing source");

    assert_eq!(err.kind(), ErrorKind::Transfer);
    assert!(!leader.exists());
}

#[test]
fn unparsable_follower_artifact_is_a_transfer_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let follower = dir.path().join("follower.json");
    let leader = dir.path().join("leader.json");

    fs::write(&follower, "{\"elbow\": ").expect("write truncated");
    let err = propagate_calibration(&follower, &leader).expect_err("truncated json");
    assert_eq!(err.kind(), ErrorKind::Transfer);

    fs::write(&follower, "[1, 2, 3]").expect("write array");
    let err = propagate_calibration(&follower, &leader).expect_err("not an object");
    assert_eq!(err.kind(), ErrorKind::Transfer);
    assert!(!leader.exists());
}

#[test]
fn unwritable_leader_location_is_a_transfer_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let follower = dir.path().join("follower.json");
    fs::write(&follower, r#"{"elbow":12.5}"#).expect("write follower");
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "plain file").expect("write blocker");

    let err = propagate_calibration(&follower, &blocker.join("lamp7.json"))
        .expect_err("parent is a file");
    assert_eq!(err.kind(), ErrorKind::Transfer);
}
