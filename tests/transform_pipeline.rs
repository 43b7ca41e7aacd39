mod common;

use common::{MapCall, MemoryDrawSurface, RecordingMap, StubService, polygon_feature, square};
use geodraw::error::{PipelineError, ServiceError};
use geodraw::event::{EventHandler, SessionEvent};
use geodraw::feature::{Bounds, Feature, FeatureCollection, Provenance};
use geodraw::service::ServiceReply;
use geodraw::session::{Session, Surfaces};
use geodraw::transform::{BufferUnits, Crs, OutputFormat, PipelineState, TransformKind, TransformOperation};

use parking_lot::Mutex;
use std::sync::Arc;

fn buffer_100m() -> TransformOperation {
    TransformOperation::Buffer {
        distance: 100,
        units: BufferUnits::Meters,
    }
}

// Session seeded with two drawn polygons.
fn session_with_two_polygons(map: &mut RecordingMap, draw: &mut MemoryDrawSurface) -> Session {
    let mut session = Session::new();
    draw.features = vec![polygon_feature(1, 0.0, 0.0), polygon_feature(2, 2.0, 2.0)];
    session
        .handle_draw_event(
            geodraw::draw_surface::DrawEvent::user(geodraw::draw_surface::DrawEventKind::Create),
            Surfaces {
                map: &mut *map,
                draw: &mut *draw,
            },
        )
        .unwrap();
    map.calls.clear();
    session
}

#[derive(Clone, Default)]
struct EventLog(Arc<Mutex<Vec<SessionEvent>>>);

impl EventHandler for EventLog {
    fn handle_event(&mut self, event: &SessionEvent) {
        self.0.lock().push(event.clone());
    }
}

#[test]
fn test_buffer_replaces_registry_and_fits_camera() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    let buffered = Feature::new(square(-0.1, -0.1, 3.2)).with_id(1u64);
    let service = StubService::with_features(&FeatureCollection::new(vec![buffered.clone()]));

    session
        .run_transform(&buffer_100m(), &service, Surfaces { map: &mut map, draw: &mut draw })
        .unwrap();

    assert_eq!(service.calls(), 1);
    assert_eq!(session.registry().features(), &[buffered.clone()]);
    assert_eq!(draw.features, vec![buffered]);
    let fits = map.fits();
    assert_eq!(fits.len(), 1);
    let Bounds { west, south, east, north } = fits[0];
    assert!((west - -0.1).abs() < 1e-9 && (south - -0.1).abs() < 1e-9);
    assert!((east - 3.1).abs() < 1e-9 && (north - 3.1).abs() < 1e-9);
    assert!(!session.camera().is_rotating());
    assert_eq!(session.pipeline().state(), PipelineState::Idle);
}

#[test]
fn test_buffer_request_carries_parameters_and_snapshot() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    let service = StubService::with_features(&FeatureCollection::default());

    session
        .run_transform(&buffer_100m(), &service, Surfaces { map: &mut map, draw: &mut draw })
        .unwrap();

    let requests = service.requests.lock();
    let body = &requests[0];
    assert_eq!(body["output_format"], "geojson");
    assert_eq!(body["output_crs"], "EPSG:4326");
    assert_eq!(body["input_geojson"]["features"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["transformations"][0]["type"], "buffer");
    assert_eq!(body["transformations"][0]["distance"], 100);
    assert_eq!(body["transformations"][0]["units"], "meters");
}

#[test]
fn test_second_transform_while_pending_is_refused() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    let service = StubService::default();

    let _ticket = session.begin_transform(&TransformOperation::Union).unwrap();

    assert!(!session.can_transform(&TransformOperation::Union));
    let surfaces = Surfaces { map: &mut map, draw: &mut draw };
    let second = session.run_transform(&buffer_100m(), &service, surfaces);
    assert_eq!(second, Err(PipelineError::Busy));
    assert_eq!(service.calls(), 0);
}

#[test]
fn test_remote_error_is_surfaced_and_registry_kept() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    let before = session.registry().snapshot();
    let log = EventLog::default();
    session.subscribe(Box::new(log.clone()));
    let service = StubService::replying(vec![Ok(ServiceReply::new(
        422,
        r#"{"message":"invalid distance"}"#,
    ))]);

    let surfaces = Surfaces { map: &mut map, draw: &mut draw };
    let result = session.run_transform(&buffer_100m(), &service, surfaces);

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "error from geoflip - invalid distance");
    assert_eq!(session.error_message(), Some("error from geoflip - invalid distance"));
    assert_eq!(session.registry().snapshot(), before);
    assert_eq!(draw.set_calls, 0);
    assert!(map.calls.is_empty());
    assert!(session.camera().is_rotating());
    assert_eq!(session.pipeline().state(), PipelineState::Idle);
    assert!(log.0.lock().contains(&SessionEvent::TransformFailed {
        message: "error from geoflip - invalid distance".into(),
    }));
}

#[test]
fn test_transport_failure_gets_generic_message() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    let service = StubService::replying(vec![Ok(ServiceReply::new(502, "Bad Gateway"))]);

    let surfaces = Surfaces { map: &mut map, draw: &mut draw };
    let result = session.run_transform(&TransformOperation::Union, &service, surfaces);

    assert_eq!(
        result,
        Err(PipelineError::Service(ServiceError::UnreadableErrorBody { status: 502 }))
    );
    assert_eq!(
        session.error_message(),
        Some("An unexpected error occurred. Please try again.")
    );
    assert_eq!(session.registry().len(), 2);
}

#[test]
fn test_stale_reply_is_discarded() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    let reply = |features: Vec<Feature>| -> Result<ServiceReply, ServiceError> {
        Ok(ServiceReply::new(
            200,
            serde_json::to_vec(&FeatureCollection::new(features)).unwrap(),
        ))
    };

    let first = session.begin_transform(&TransformOperation::Union).unwrap();
    session
        .finish_transform(
            first.generation(),
            reply(vec![polygon_feature(10, 0.0, 0.0)]),
            Surfaces { map: &mut map, draw: &mut draw },
        )
        .unwrap();
    let second = session.begin_transform(&TransformOperation::Union).unwrap();
    assert!(second.generation() > first.generation());

    // A late duplicate of the first reply is ignored.
    session
        .finish_transform(first.generation(), reply(vec![]), Surfaces { map: &mut map, draw: &mut draw })
        .unwrap();
    assert_eq!(session.registry().len(), 1);
    assert!(session.pipeline().is_pending());

    let both = vec![polygon_feature(11, 1.0, 1.0), polygon_feature(12, 2.0, 2.0)];
    session
        .finish_transform(
            second.generation(),
            reply(both),
            Surfaces { map: &mut map, draw: &mut draw },
        )
        .unwrap();
    assert_eq!(session.registry().len(), 2);
}

#[test]
fn test_erase_sends_operand_and_clears_it_on_success() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    assert!(!session.can_transform(&TransformOperation::Erase));

    let mask = FeatureCollection::new(vec![Feature::new(square(0.5, 0.5, 1.0))]);
    let erased = FeatureCollection::new(vec![polygon_feature(1, 0.0, 0.0)]);
    let service = StubService::replying(vec![
        Ok(ServiceReply::new(200, serde_json::to_vec(&mask).unwrap())),
        Ok(ServiceReply::new(200, serde_json::to_vec(&erased).unwrap())),
    ]);
    let upload = geodraw::exchange::UploadRequest::new(
        geodraw::exchange::InputFormat::Shapefile,
        "mask.zip",
        vec![1, 2, 3],
        None,
    )
    .unwrap();
    session
        .run_import(upload, Provenance::EraseOperand, &service, Surfaces { map: &mut map, draw: &mut draw })
        .unwrap();
    assert!(session.can_transform(&TransformOperation::Erase));

    session
        .run_transform(&TransformOperation::Erase, &service, Surfaces { map: &mut map, draw: &mut draw })
        .unwrap();

    let requests = service.requests.lock();
    let erase = &requests[1]["transformations"][0];
    assert_eq!(erase["type"], "erase");
    assert_eq!(erase["erasing_geojson"]["features"][0]["properties"]["style"], "red");
    assert_eq!(session.registry().operand_len(Provenance::EraseOperand), 0);
    assert_eq!(session.registry().len(), 1);
}

#[test]
fn test_applied_transform_emits_events() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    let log = EventLog::default();
    session.subscribe(Box::new(log.clone()));
    let result = FeatureCollection::new(vec![polygon_feature(3, 0.0, 0.0)]);
    let service = StubService::with_features(&result);

    session
        .run_transform(&TransformOperation::Union, &service, Surfaces { map: &mut map, draw: &mut draw })
        .unwrap();

    let events = log.0.lock();
    assert_eq!(events[0], SessionEvent::RotationStopped);
    assert!(events.contains(&SessionEvent::TransformApplied {
        kind: TransformKind::Union,
        feature_count: 1,
    }));
}

#[test]
fn test_transforms_stay_on_wgs84_after_projected_export() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    let service = StubService::replying(vec![
        Ok(ServiceReply::new(200, vec![0x50, 0x4b])),
        Ok(ServiceReply::new(
            200,
            serde_json::to_vec(&FeatureCollection::new(vec![polygon_feature(1, 0.0, 0.0)])).unwrap(),
        )),
    ]);

    session
        .run_export(OutputFormat::Shapefile, Crs::epsg(28355), &service)
        .unwrap();
    session
        .run_transform(&buffer_100m(), &service, Surfaces { map: &mut map, draw: &mut draw })
        .unwrap();

    let requests = service.requests.lock();
    assert_eq!(requests[0]["output_crs"], "EPSG:28355");
    assert_eq!(requests[1]["output_crs"], "EPSG:4326");
    assert_eq!(session.pipeline().output_crs(), Crs::WGS84);
}

#[test]
fn test_clip_sends_orange_operand_and_clears_it_on_success() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    assert!(!session.can_transform(&TransformOperation::Clip));

    let boundary = FeatureCollection::new(vec![Feature::new(square(-1.0, -1.0, 2.5))]);
    let clipped = FeatureCollection::new(vec![polygon_feature(1, 0.0, 0.0)]);
    let service = StubService::replying(vec![
        Ok(ServiceReply::new(200, serde_json::to_vec(&boundary).unwrap())),
        Ok(ServiceReply::new(200, serde_json::to_vec(&clipped).unwrap())),
    ]);
    let upload = geodraw::exchange::UploadRequest::new(
        geodraw::exchange::InputFormat::GeoPackage,
        "boundary.gpkg",
        vec![1, 2, 3],
        None,
    )
    .unwrap();
    session
        .run_import(upload, Provenance::ClipOperand, &service, Surfaces { map: &mut map, draw: &mut draw })
        .unwrap();
    assert!(session.can_transform(&TransformOperation::Clip));

    session
        .run_transform(&TransformOperation::Clip, &service, Surfaces { map: &mut map, draw: &mut draw })
        .unwrap();

    let requests = service.requests.lock();
    let clip = &requests[1]["transformations"][0];
    assert_eq!(clip["type"], "clip");
    assert_eq!(clip["clipping_geojson"]["type"], "FeatureCollection");
    assert_eq!(clip["clipping_geojson"]["features"][0]["properties"]["style"], "orange");
    assert_eq!(requests[1]["input_geojson"]["features"].as_array().map(Vec::len), Some(2));
    assert_eq!(session.registry().operand_len(Provenance::ClipOperand), 0);
    assert_eq!(session.registry().len(), 1);
}

#[test]
fn test_applied_transform_pushes_sources_before_fitting() {
    let mut map = RecordingMap::new();
    let mut draw = MemoryDrawSurface::new();
    let mut session = session_with_two_polygons(&mut map, &mut draw);
    let result = FeatureCollection::new(vec![polygon_feature(3, 0.0, 0.0)]);
    let service = StubService::with_features(&result);

    session
        .run_transform(&TransformOperation::Union, &service, Surfaces { map: &mut map, draw: &mut draw })
        .unwrap();

    let last_source = map
        .calls
        .iter()
        .rposition(|call| matches!(call, MapCall::SetSourceData(..)))
        .unwrap();
    let fit = map
        .calls
        .iter()
        .position(|call| matches!(call, MapCall::FitBounds(_)))
        .unwrap();
    assert!(last_source < fit);
    assert_eq!(map.last_source(), Some(&result));
}
