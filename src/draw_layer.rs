use eframe::egui::{self, Color32, Pos2, Stroke};

use crate::draw_surface::{DrawEvent, DrawEventKind, DrawSurface};
use crate::feature::{Feature, FeatureCollection, FeatureId, Geometry, LngLat};
use crate::renderer::{Projection, Renderer};

/// Screen distance within which a click hits a vertex.
const HIT_RADIUS: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    /// Pan the map and select features.
    #[default]
    Select,
    Point,
    Line,
    Polygon,
}

impl DrawMode {
    pub const ALL: [DrawMode; 4] = [DrawMode::Select, DrawMode::Point, DrawMode::Line, DrawMode::Polygon];

    pub fn name(self) -> &'static str {
        match self {
            DrawMode::Select => "Select",
            DrawMode::Point => "Point",
            DrawMode::Line => "Line",
            DrawMode::Polygon => "Polygon",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            DrawMode::Select => "↖",
            DrawMode::Point => "•",
            DrawMode::Line => "╱",
            DrawMode::Polygon => "⬠",
        }
    }

    fn min_vertices(self) -> usize {
        match self {
            DrawMode::Line => 2,
            DrawMode::Polygon => 3,
            DrawMode::Select | DrawMode::Point => 1,
        }
    }
}

/// In-app drawing tool: owns the features being edited and reports every
/// change as a [`DrawEvent`].
///
/// Changes made through [`DrawSurface`] are reported as echoes so the
/// session can tell them apart from user edits.
#[derive(Debug, Default)]
pub struct DrawLayer {
    features: Vec<Feature>,
    mode: DrawMode,
    vertices: Vec<LngLat>,
    selected: Option<usize>,
    events: Vec<DrawEvent>,
}

impl DrawLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DrawMode) {
        if self.mode != mode {
            log::debug!("Draw mode: {}", mode.name());
            self.vertices.clear();
            self.mode = mode;
        }
    }

    pub fn selected(&self) -> Option<&Feature> {
        self.selected.and_then(|index| self.features.get(index))
    }

    /// Events raised since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<DrawEvent> {
        std::mem::take(&mut self.events)
    }

    /// Feeds one frame of pointer input on the map. Returns true when the
    /// input was consumed by drawing, so the map should not pan.
    pub fn handle_input(&mut self, response: &egui::Response, projection: &Projection) -> bool {
        let pointer = response.interact_pointer_pos();

        if response.double_clicked() && matches!(self.mode, DrawMode::Line | DrawMode::Polygon) {
            self.finish_shape();
            return true;
        }

        if response.clicked() {
            let Some(pos) = pointer else {
                return false;
            };
            match self.mode {
                DrawMode::Select => self.selected = self.hit_test(pos, projection),
                DrawMode::Point => {
                    self.vertices.push(projection.to_lng_lat(pos));
                    self.finish_shape();
                }
                DrawMode::Line | DrawMode::Polygon => {
                    self.vertices.push(projection.to_lng_lat(pos));
                }
            }
            return self.mode != DrawMode::Select;
        }
        self.mode != DrawMode::Select && response.dragged()
    }

    /// Ends the shape under construction, if it has enough vertices.
    pub fn finish_shape(&mut self) {
        let vertices = std::mem::take(&mut self.vertices);
        if vertices.len() < self.mode.min_vertices() {
            return;
        }
        let geometry = match self.mode {
            DrawMode::Point => Geometry::point(vertices[0].lng, vertices[0].lat),
            DrawMode::Line => Geometry::line_string(&vertices),
            DrawMode::Polygon => Geometry::polygon(&vertices),
            DrawMode::Select => return,
        };
        let id = FeatureId::Text(uuid::Uuid::new_v4().to_string());
        self.features.push(Feature::new(geometry).with_id(id));
        self.events.push(DrawEvent::user(DrawEventKind::Create));
    }

    pub fn cancel_shape(&mut self) {
        self.vertices.clear();
    }

    pub fn delete_selected(&mut self) {
        let Some(index) = self.selected.take() else {
            return;
        };
        if index < self.features.len() {
            self.features.remove(index);
            self.events.push(DrawEvent::user(DrawEventKind::Delete));
        }
    }

    /// Paints the selection and the shape under construction on top of the map.
    pub fn render(&self, painter: &egui::Painter, projection: &Projection, renderer: &Renderer) {
        if let Some(feature) = self.selected() {
            renderer.render_highlight(painter, projection, feature);
        }

        let points: Vec<Pos2> = self.vertices.iter().map(|v| projection.to_screen(*v)).collect();
        let stroke = Stroke::new(2.0, Color32::WHITE);
        if points.len() > 1 {
            painter.add(egui::Shape::dashed_line(&points, stroke, 6.0, 4.0));
        }
        for point in points {
            painter.circle(point, 4.0, Color32::WHITE, Stroke::new(1.0, Color32::BLACK));
        }
    }

    fn hit_test(&self, pos: Pos2, projection: &Projection) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (index, feature) in self.features.iter().enumerate() {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            geometry.for_each_position(&mut |position| {
                if let [lng, lat, ..] = position.as_slice() {
                    let distance = projection.to_screen(LngLat::new(*lng, *lat)).distance(pos);
                    if distance <= HIT_RADIUS && best.is_none_or(|(_, d)| distance < d) {
                        best = Some((index, distance));
                    }
                }
            });
        }
        best.map(|(index, _)| index)
    }
}

impl DrawSurface for DrawLayer {
    fn get_all(&self) -> FeatureCollection {
        FeatureCollection::new(self.features.clone())
    }

    fn set(&mut self, collection: &FeatureCollection) {
        self.features = collection.features.clone();
        self.selected = None;
        self.events.push(DrawEvent::echo(DrawEventKind::Update));
    }

    fn delete_all(&mut self) {
        self.features.clear();
        self.vertices.clear();
        self.selected = None;
        self.events.push(DrawEvent::echo(DrawEventKind::Delete));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw_surface::ChangeOrigin;

    #[test]
    fn finished_polygon_becomes_a_feature() {
        let mut layer = DrawLayer::new();
        layer.set_mode(DrawMode::Polygon);
        layer.vertices = vec![
            LngLat::new(0.0, 0.0),
            LngLat::new(1.0, 0.0),
            LngLat::new(1.0, 1.0),
        ];
        layer.finish_shape();

        let all = layer.get_all();
        assert_eq!(all.len(), 1);
        assert!(all.features[0].id.is_some());
        assert_eq!(layer.take_events(), vec![DrawEvent::user(DrawEventKind::Create)]);
    }

    #[test]
    fn too_few_vertices_are_discarded() {
        let mut layer = DrawLayer::new();
        layer.set_mode(DrawMode::Line);
        layer.vertices = vec![LngLat::new(0.0, 0.0)];
        layer.finish_shape();
        assert!(layer.get_all().is_empty());
        assert!(layer.take_events().is_empty());
    }

    #[test]
    fn programmatic_changes_are_echoes() {
        let mut layer = DrawLayer::new();
        layer.set(&FeatureCollection::new(vec![Feature::new(Geometry::point(0.0, 0.0))]));
        layer.delete_all();
        let events = layer.take_events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.origin == ChangeOrigin::Registry));
    }
}
