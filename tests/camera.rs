mod common;

use std::time::Duration;

use common::{RecordingMap, point_feature, polygon_feature};
use geodraw::camera::{
    CameraController, CameraState, Easing, ROTATION_INTERVAL, ROTATION_STEP_DEGREES, ScheduledTask,
};
use geodraw::feature::{Bounds, Feature, LngLat};

#[test]
fn test_fit_to_empty_features_is_a_no_op() {
    let camera = CameraController::new();
    let mut map = RecordingMap::new();

    let fitted = camera.fit_to_bounds(&Vec::<Feature>::new(), &mut map);

    assert!(!fitted);
    assert!(map.calls.is_empty());
}

#[test]
fn test_fit_to_bounds_frames_every_position() {
    let camera = CameraController::new();
    let mut map = RecordingMap::new();
    let features = vec![polygon_feature(1, 0.0, 0.0), point_feature(10.0, -5.0)];

    assert!(camera.fit_to_bounds(&features, &mut map));

    assert_eq!(
        map.fits(),
        vec![Bounds {
            west: 0.0,
            south: -5.0,
            east: 10.0,
            north: 1.0,
        }]
    );
}

#[test]
fn test_rotation_advances_longitude_each_tick() {
    let mut camera = CameraController::new();
    let mut map = RecordingMap::new();
    map.center = LngLat::new(10.0, 20.0);

    let ticks = camera.advance(ROTATION_INTERVAL, &mut map);

    assert_eq!(ticks, 1);
    let eases = map.eases();
    assert_eq!(eases.len(), 1);
    assert_eq!(eases[0].center, LngLat::new(10.0 + ROTATION_STEP_DEGREES, 20.0));
    assert_eq!(eases[0].easing, Easing::Linear);
}

#[test]
fn test_rotation_waits_for_a_full_interval() {
    let mut camera = CameraController::new();
    let mut map = RecordingMap::new();

    assert_eq!(camera.advance(ROTATION_INTERVAL / 2, &mut map), 0);
    assert!(map.calls.is_empty());
    assert_eq!(camera.advance(ROTATION_INTERVAL / 2, &mut map), 1);
}

#[test]
fn test_ticks_are_no_ops_until_the_map_is_ready() {
    let mut camera = CameraController::new();
    let mut map = RecordingMap::new();
    map.ready = false;

    camera.advance(ROTATION_INTERVAL * 3, &mut map);

    assert!(map.calls.is_empty());
    assert!(camera.is_rotating());
}

#[test]
fn test_rotation_wraps_at_the_antimeridian() {
    let mut camera = CameraController::new();
    let mut map = RecordingMap::new();
    map.center = LngLat::new(179.75, 0.0);

    camera.advance(ROTATION_INTERVAL, &mut map);

    assert_eq!(map.eases()[0].center, LngLat::new(-179.75, 0.0));
}

#[test]
fn test_stop_is_idempotent_and_terminal() {
    let mut camera = CameraController::new();
    let mut map = RecordingMap::new();

    assert!(camera.stop());
    assert!(!camera.stop());
    assert_eq!(camera.state(), CameraState::Idle);

    // No resumption after stopping
    assert_eq!(camera.advance(Duration::from_secs(5), &mut map), 0);
    assert!(map.calls.is_empty());
}

#[test]
fn test_user_interaction_stops_rotation() {
    let mut camera = CameraController::new();

    assert!(camera.on_user_interaction());
    assert!(!camera.is_rotating());
    assert!(!camera.on_user_interaction());
}

#[test]
fn test_cancelled_task_never_ticks() {
    let mut task = ScheduledTask::every(Duration::from_millis(10));
    assert_eq!(task.advance(Duration::from_millis(35)), 3);

    task.cancel();

    assert!(task.is_cancelled());
    assert_eq!(task.advance(Duration::from_secs(1)), 0);
}
