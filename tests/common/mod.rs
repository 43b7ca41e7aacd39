#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use geodraw::camera::{CameraTransition, FitBoundsOptions, MapSurface};
use geodraw::draw_surface::{DrawEvent, DrawEventKind, DrawSurface};
use geodraw::error::ServiceError;
use geodraw::exchange::UploadRequest;
use geodraw::feature::{Bounds, Feature, FeatureCollection, Geometry, LngLat};
use geodraw::service::{ServiceReply, TransformService};
use geodraw::transform::TransformRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    EaseTo(CameraTransition),
    FitBounds(Bounds),
    SetSourceData(String, FeatureCollection),
}

/// Map double that records every mutating call.
#[derive(Debug)]
pub struct RecordingMap {
    pub ready: bool,
    pub center: LngLat,
    pub calls: Vec<MapCall>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self {
            ready: true,
            center: LngLat::new(0.0, 0.0),
            calls: Vec::new(),
        }
    }

    pub fn fits(&self) -> Vec<Bounds> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                MapCall::FitBounds(bounds) => Some(*bounds),
                _ => None,
            })
            .collect()
    }

    pub fn eases(&self) -> Vec<CameraTransition> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                MapCall::EaseTo(transition) => Some(*transition),
                _ => None,
            })
            .collect()
    }

    pub fn last_source(&self) -> Option<&FeatureCollection> {
        self.calls.iter().rev().find_map(|call| match call {
            MapCall::SetSourceData(_, data) => Some(data),
            _ => None,
        })
    }

    pub fn camera_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| !matches!(call, MapCall::SetSourceData(..)))
            .count()
    }
}

impl MapSurface for RecordingMap {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn center(&self) -> LngLat {
        self.center
    }

    fn ease_to(&mut self, transition: CameraTransition) {
        self.center = transition.center;
        self.calls.push(MapCall::EaseTo(transition));
    }

    fn fit_bounds(&mut self, bounds: Bounds, _options: FitBoundsOptions) {
        self.calls.push(MapCall::FitBounds(bounds));
    }

    fn set_source_data(&mut self, source_id: &str, data: &FeatureCollection) {
        self.calls
            .push(MapCall::SetSourceData(source_id.to_owned(), data.clone()));
    }
}

/// In-memory drawing UI. When `echo` is set it raises an event for every
/// programmatic change, the way a real drawing widget does.
#[derive(Debug, Default)]
pub struct MemoryDrawSurface {
    pub features: Vec<Feature>,
    pub echo: bool,
    pub echoes: Vec<DrawEvent>,
    pub set_calls: usize,
}

impl MemoryDrawSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Simulates the user finishing a shape.
    pub fn user_draws(&mut self, feature: Feature) -> DrawEvent {
        self.features.push(feature);
        DrawEvent::user(DrawEventKind::Create)
    }
}

impl DrawSurface for MemoryDrawSurface {
    fn get_all(&self) -> FeatureCollection {
        FeatureCollection::new(self.features.clone())
    }

    fn set(&mut self, collection: &FeatureCollection) {
        self.features = collection.features.clone();
        self.set_calls += 1;
        if self.echo {
            self.echoes.push(DrawEvent::echo(DrawEventKind::Update));
        }
    }

    fn delete_all(&mut self) {
        self.features.clear();
        if self.echo {
            self.echoes.push(DrawEvent::echo(DrawEventKind::Delete));
        }
    }
}

/// Service double returning canned replies in order.
#[derive(Debug, Default)]
pub struct StubService {
    replies: Mutex<VecDeque<Result<ServiceReply, ServiceError>>>,
    calls: AtomicUsize,
    pub requests: Mutex<Vec<serde_json::Value>>,
}

impl StubService {
    pub fn replying(replies: Vec<Result<ServiceReply, ServiceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn with_features(collection: &FeatureCollection) -> Self {
        let body = serde_json::to_vec(collection).unwrap();
        Self::replying(vec![Ok(ServiceReply::new(200, body))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> Result<ServiceReply, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Transport("no canned reply".into())))
    }
}

impl TransformService for StubService {
    fn post_geojson(&self, request: &TransformRequest) -> Result<ServiceReply, ServiceError> {
        self.requests.lock().push(serde_json::to_value(request).unwrap());
        self.next_reply()
    }

    fn post_upload(&self, upload: &UploadRequest) -> Result<ServiceReply, ServiceError> {
        self.requests
            .lock()
            .push(serde_json::to_value(upload.config()).unwrap());
        self.next_reply()
    }
}

pub fn square(west: f64, south: f64, size: f64) -> Geometry {
    Geometry::polygon(&[
        LngLat::new(west, south),
        LngLat::new(west + size, south),
        LngLat::new(west + size, south + size),
        LngLat::new(west, south + size),
    ])
}

pub fn polygon_feature(id: u64, west: f64, south: f64) -> Feature {
    Feature::new(square(west, south, 1.0)).with_id(id)
}

pub fn point_feature(lng: f64, lat: f64) -> Feature {
    Feature::new(Geometry::point(lng, lat))
}
