use eframe::egui::{self, Color32, Pos2, Rect, Shape, Stroke};

use crate::feature::{Feature, FeatureCollection, Geometry, LngLat, Position};
use crate::layers::{LayerKind, LayerStyle, layer_styles};

/// Screen size of the whole world at zoom 0, in points.
pub const TILE_SIZE: f64 = 256.0;

const POINT_RADIUS: f32 = 5.0;
const GRATICULE_STEP_DEGREES: f64 = 30.0;
const GRATICULE_COLOR: Color32 = Color32::from_gray(60);
const LAND_BACKGROUND: Color32 = Color32::from_rgb(22, 32, 44);

/// Plate carrée projection of the camera onto a screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub center: LngLat,
    pub zoom: f64,
    pub viewport: Rect,
}

impl Projection {
    /// Screen points per degree at `zoom`. Both axes share the scale.
    pub fn points_per_degree(zoom: f64) -> f64 {
        TILE_SIZE * 2f64.powf(zoom) / 360.0
    }

    pub fn to_screen(&self, position: LngLat) -> Pos2 {
        let scale = Self::points_per_degree(self.zoom);
        let origin = self.viewport.center();
        Pos2::new(
            origin.x + ((position.lng - self.center.lng) * scale) as f32,
            origin.y - ((position.lat - self.center.lat) * scale) as f32,
        )
    }

    pub fn to_lng_lat(&self, point: Pos2) -> LngLat {
        let scale = Self::points_per_degree(self.zoom);
        let origin = self.viewport.center();
        LngLat::new(
            self.center.lng + f64::from(point.x - origin.x) / scale,
            (self.center.lat - f64::from(point.y - origin.y) / scale).clamp(-90.0, 90.0),
        )
    }

    fn position(&self, position: &Position) -> Option<Pos2> {
        match position.as_slice() {
            [lng, lat, ..] => Some(self.to_screen(LngLat::new(*lng, *lat))),
            _ => None,
        }
    }

    fn path(&self, positions: &[Position]) -> Vec<Pos2> {
        positions.iter().filter_map(|p| self.position(p)).collect()
    }
}

#[derive(Debug, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Paints the background, a graticule and every feature of `source`
    /// through the rendering layers, in layer order.
    pub fn render(&self, painter: &egui::Painter, projection: &Projection, source: &FeatureCollection) {
        painter.rect_filled(projection.viewport, 0.0, LAND_BACKGROUND);
        self.render_graticule(painter, projection);

        for style in layer_styles() {
            for feature in source.iter().filter(|f| style.matches(f)) {
                self.render_feature(painter, projection, style, feature);
            }
        }
    }

    /// Highlights a feature, e.g. the current selection.
    pub fn render_highlight(&self, painter: &egui::Painter, projection: &Projection, feature: &Feature) {
        let stroke = Stroke::new(3.0, Color32::YELLOW);
        if let Some(geometry) = &feature.geometry {
            for_each_part(geometry, &mut |part| match part {
                Part::Point(p) => {
                    if let Some(center) = projection.position(p) {
                        painter.circle_stroke(center, POINT_RADIUS + 3.0, stroke);
                    }
                }
                Part::Line(line) => {
                    painter.add(Shape::line(projection.path(line), stroke));
                }
                Part::Polygon(rings) => {
                    for ring in rings {
                        painter.add(Shape::closed_line(projection.path(ring), stroke));
                    }
                }
            });
        }
    }

    fn render_graticule(&self, painter: &egui::Painter, projection: &Projection) {
        let stroke = Stroke::new(1.0, GRATICULE_COLOR);
        let mut lng = -180.0;
        while lng <= 180.0 {
            let top = projection.to_screen(LngLat::new(lng, 90.0));
            let bottom = projection.to_screen(LngLat::new(lng, -90.0));
            painter.line_segment([top, bottom], stroke);
            lng += GRATICULE_STEP_DEGREES;
        }
        let mut lat = -90.0;
        while lat <= 90.0 {
            let west = projection.to_screen(LngLat::new(-180.0, lat));
            let east = projection.to_screen(LngLat::new(180.0, lat));
            painter.line_segment([west, east], stroke);
            lat += GRATICULE_STEP_DEGREES;
        }
    }

    fn render_feature(
        &self,
        painter: &egui::Painter,
        projection: &Projection,
        style: &LayerStyle,
        feature: &Feature,
    ) {
        let Some(geometry) = &feature.geometry else {
            return;
        };
        let stroke = Stroke::new(style.width, style.color);
        for_each_part(geometry, &mut |part| match (style.kind, part) {
            (LayerKind::Circle, Part::Point(p)) => {
                if let Some(center) = projection.position(p) {
                    painter.circle(center, POINT_RADIUS, style.fill, stroke);
                }
            }
            (LayerKind::Line, Part::Line(line)) => {
                painter.add(Shape::line(projection.path(line), stroke));
            }
            (LayerKind::Fill, Part::Polygon(rings)) => {
                if let Some(outer) = rings.first() {
                    painter.add(Shape::convex_polygon(
                        projection.path(outer),
                        style.fill,
                        Stroke::NONE,
                    ));
                }
            }
            (LayerKind::Outline, Part::Polygon(rings)) => {
                for ring in rings {
                    painter.add(Shape::closed_line(projection.path(ring), stroke));
                }
            }
            _ => {}
        });
    }
}

enum Part<'a> {
    Point(&'a Position),
    Line(&'a [Position]),
    Polygon(&'a [Vec<Position>]),
}

/// Splits multi-geometries into their single parts.
fn for_each_part<'a>(geometry: &'a Geometry, f: &mut impl FnMut(Part<'a>)) {
    match geometry {
        Geometry::Point(p) => f(Part::Point(p)),
        Geometry::MultiPoint(points) => points.iter().for_each(|p| f(Part::Point(p))),
        Geometry::LineString(line) => f(Part::Line(line)),
        Geometry::MultiLineString(lines) => lines.iter().for_each(|l| f(Part::Line(l))),
        Geometry::Polygon(rings) => f(Part::Polygon(rings)),
        Geometry::MultiPolygon(polygons) => polygons.iter().for_each(|r| f(Part::Polygon(r))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_round_trips_through_the_screen() {
        let projection = Projection {
            center: LngLat::new(10.0, 20.0),
            zoom: 3.0,
            viewport: Rect::from_min_size(Pos2::ZERO, egui::vec2(800.0, 600.0)),
        };
        assert_eq!(projection.to_screen(projection.center), Pos2::new(400.0, 300.0));

        let back = projection.to_lng_lat(projection.to_screen(LngLat::new(12.5, 18.0)));
        assert!((back.lng - 12.5).abs() < 1e-3);
        assert!((back.lat - 18.0).abs() < 1e-3);
    }
}
