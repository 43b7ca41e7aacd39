use std::collections::HashMap;
use std::time::Duration;

use eframe::egui::{Rect, Vec2};

use crate::camera::{CameraTransition, Easing, FitBoundsOptions, INITIAL_CENTER, INITIAL_ZOOM, MapSurface};
use crate::feature::{Bounds, FeatureCollection, LngLat};
use crate::renderer::Projection;

const MIN_ZOOM: f64 = 0.0;
const MAX_ZOOM: f64 = 20.0;
const SCROLL_ZOOM_RATE: f64 = 1.0 / 200.0;

#[derive(Debug, Clone, Copy)]
struct Animation {
    from_center: LngLat,
    from_zoom: f64,
    to_center: LngLat,
    to_zoom: f64,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl Animation {
    fn sample(&self) -> (LngLat, f64) {
        let t = if self.duration.is_zero() {
            1.0
        } else {
            (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()) as f32
        };
        let t = f64::from(self.easing.apply(t));
        let lng = self.from_center.lng + shortest_lng_delta(self.from_center.lng, self.to_center.lng) * t;
        let lat = self.from_center.lat + (self.to_center.lat - self.from_center.lat) * t;
        let zoom = self.from_zoom + (self.to_zoom - self.from_zoom) * t;
        (LngLat::new(lng, lat).wrapped(), zoom)
    }

    fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

fn shortest_lng_delta(from: f64, to: f64) -> f64 {
    (to - from + 540.0).rem_euclid(360.0) - 180.0
}

/// The on-screen map: an animated camera over named vector sources.
#[derive(Debug)]
pub struct MapCanvas {
    center: LngLat,
    zoom: f64,
    viewport: Option<Rect>,
    animation: Option<Animation>,
    sources: HashMap<String, FeatureCollection>,
}

impl Default for MapCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl MapCanvas {
    pub fn new() -> Self {
        Self {
            center: INITIAL_CENTER,
            zoom: INITIAL_ZOOM,
            viewport: None,
            animation: None,
            sources: HashMap::new(),
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn source(&self, source_id: &str) -> Option<&FeatureCollection> {
        self.sources.get(source_id)
    }

    /// Records the screen area assigned this frame. The map is ready once
    /// it has one.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = Some(viewport);
    }

    pub fn projection(&self) -> Option<Projection> {
        self.viewport.map(|viewport| Projection {
            center: self.center,
            zoom: self.zoom,
            viewport,
        })
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Steps the running camera animation by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        let Some(animation) = self.animation.as_mut() else {
            return;
        };
        animation.elapsed += dt;
        let (center, zoom) = animation.sample();
        let finished = animation.is_finished();
        self.center = center;
        self.zoom = zoom;
        if finished {
            self.animation = None;
        }
    }

    /// Drag in screen points. Interrupts any animation.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.animation = None;
        let scale = Projection::points_per_degree(self.zoom);
        self.center = LngLat::new(
            self.center.lng - f64::from(delta.x) / scale,
            (self.center.lat + f64::from(delta.y) / scale).clamp(-90.0, 90.0),
        )
        .wrapped();
    }

    pub fn zoom_by_scroll(&mut self, scroll: f32) {
        self.animation = None;
        self.zoom = (self.zoom + f64::from(scroll) * SCROLL_ZOOM_RATE).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn animate_to(&mut self, center: LngLat, zoom: f64, duration: Duration, easing: Easing) {
        self.animation = Some(Animation {
            from_center: self.center,
            from_zoom: self.zoom,
            to_center: center,
            to_zoom: zoom,
            duration,
            elapsed: Duration::ZERO,
            easing,
        });
    }
}

impl MapSurface for MapCanvas {
    fn is_ready(&self) -> bool {
        self.viewport.is_some()
    }

    fn center(&self) -> LngLat {
        self.center
    }

    fn ease_to(&mut self, transition: CameraTransition) {
        self.animate_to(transition.center, self.zoom, transition.duration, transition.easing);
    }

    fn fit_bounds(&mut self, bounds: Bounds, options: FitBoundsOptions) {
        let Some(viewport) = self.viewport else {
            log::debug!("fit_bounds before the map has a viewport");
            return;
        };
        let padding = f64::from(options.padding) * 2.0;
        let available_w = (f64::from(viewport.width()) - padding).max(1.0);
        let available_h = (f64::from(viewport.height()) - padding).max(1.0);
        let span_lng = bounds.east - bounds.west;
        let span_lat = bounds.north - bounds.south;

        let zoom_for = |available: f64, span: f64| {
            if span <= f64::EPSILON {
                f64::INFINITY
            } else {
                (available * 360.0 / (crate::renderer::TILE_SIZE * span)).log2()
            }
        };
        let zoom = zoom_for(available_w, span_lng)
            .min(zoom_for(available_h, span_lat))
            .min(options.max_zoom)
            .clamp(MIN_ZOOM, MAX_ZOOM);

        self.animate_to(bounds.center(), zoom, options.duration, Easing::EaseInOut);
    }

    fn set_source_data(&mut self, source_id: &str, data: &FeatureCollection) {
        self.sources.insert(source_id.to_owned(), data.clone());
    }
}
