use egui::Color32;

use crate::feature::{Feature, GeometryKind, Provenance};

/// Vector source holding canonical and operand features together.
pub const COMBINED_SOURCE_ID: &str = "combined-features";

const PRIMARY: Color32 = Color32::from_rgb(59, 178, 208);
const ERASE: Color32 = Color32::from_rgb(229, 57, 53);
const ERASE_POINT_FILL: Color32 = Color32::from_rgb(255, 205, 210);
const CLIP: Color32 = Color32::from_rgb(239, 108, 0);
const CLIP_POINT_FILL: Color32 = Color32::from_rgb(237, 167, 116);

// 30% opacity, premultiplied.
const PRIMARY_FILL: Color32 = Color32::from_rgba_premultiplied(18, 53, 62, 77);
const ERASE_FILL: Color32 = Color32::from_rgba_premultiplied(69, 17, 16, 77);
const CLIP_FILL: Color32 = Color32::from_rgba_premultiplied(72, 32, 0, 77);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Fill,
    Outline,
    Line,
    Circle,
}

/// A rendering layer over the combined source, filtered by provenance and
/// geometry kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    pub id: &'static str,
    pub kind: LayerKind,
    pub provenance: Provenance,
    pub geometry: GeometryKind,
    pub color: Color32,
    /// Interior colour: circle centre or translucent polygon fill.
    pub fill: Color32,
    pub width: f32,
}

impl LayerStyle {
    pub fn matches(&self, feature: &Feature) -> bool {
        feature.provenance == self.provenance
            && feature
                .geometry
                .as_ref()
                .is_some_and(|g| g.kind() == self.geometry)
    }
}

const fn fill(id: &'static str, provenance: Provenance, color: Color32, translucent: Color32) -> LayerStyle {
    LayerStyle {
        id,
        kind: LayerKind::Fill,
        provenance,
        geometry: GeometryKind::Polygon,
        color,
        fill: translucent,
        width: 0.0,
    }
}

const fn line(
    id: &'static str,
    kind: LayerKind,
    provenance: Provenance,
    geometry: GeometryKind,
    color: Color32,
) -> LayerStyle {
    LayerStyle {
        id,
        kind,
        provenance,
        geometry,
        color,
        fill: Color32::TRANSPARENT,
        width: 2.0,
    }
}

const fn circle(id: &'static str, provenance: Provenance, color: Color32, inner: Color32) -> LayerStyle {
    LayerStyle {
        id,
        kind: LayerKind::Circle,
        provenance,
        geometry: GeometryKind::Point,
        color,
        fill: inner,
        width: 2.0,
    }
}

static LAYER_STYLES: [LayerStyle; 12] = [
    fill("primary-fill", Provenance::Primary, PRIMARY, PRIMARY_FILL),
    line("primary-outline", LayerKind::Outline, Provenance::Primary, GeometryKind::Polygon, PRIMARY),
    line("primary-line", LayerKind::Line, Provenance::Primary, GeometryKind::LineString, PRIMARY),
    circle("primary-point", Provenance::Primary, PRIMARY, Color32::WHITE),
    fill("red-fill", Provenance::EraseOperand, ERASE, ERASE_FILL),
    line("red-outline", LayerKind::Outline, Provenance::EraseOperand, GeometryKind::Polygon, ERASE),
    line("red-line", LayerKind::Line, Provenance::EraseOperand, GeometryKind::LineString, ERASE),
    circle("red-point", Provenance::EraseOperand, ERASE, ERASE_POINT_FILL),
    fill("orange-fill", Provenance::ClipOperand, CLIP, CLIP_FILL),
    line("orange-outline", LayerKind::Outline, Provenance::ClipOperand, GeometryKind::Polygon, CLIP),
    line("orange-line", LayerKind::Line, Provenance::ClipOperand, GeometryKind::LineString, CLIP),
    circle("orange-point", Provenance::ClipOperand, CLIP, CLIP_POINT_FILL),
];

/// All layers drawn from the combined source, in paint order.
pub fn layer_styles() -> &'static [LayerStyle] {
    &LAYER_STYLES
}

/// Layers whose filter matches `feature`.
pub fn layers_for(feature: &Feature) -> impl Iterator<Item = &'static LayerStyle> + '_ {
    LAYER_STYLES.iter().filter(move |style| style.matches(feature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Geometry, LngLat};

    fn sample(kind: GeometryKind) -> Geometry {
        match kind {
            GeometryKind::Point => Geometry::point(0.0, 0.0),
            GeometryKind::LineString => {
                Geometry::line_string(&[LngLat::new(0.0, 0.0), LngLat::new(1.0, 1.0)])
            }
            GeometryKind::Polygon => Geometry::polygon(&[
                LngLat::new(0.0, 0.0),
                LngLat::new(1.0, 0.0),
                LngLat::new(1.0, 1.0),
            ]),
        }
    }

    #[test]
    fn every_provenance_and_geometry_has_a_layer() {
        for provenance in Provenance::ALL {
            for kind in GeometryKind::ALL {
                let feature = Feature::new(sample(kind)).with_provenance(provenance);
                assert!(
                    layers_for(&feature).next().is_some(),
                    "no layer for {provenance:?} {kind:?}"
                );
            }
        }
    }

    #[test]
    fn erase_features_only_match_red_layers() {
        let feature = Feature::new(sample(GeometryKind::Polygon))
            .with_provenance(Provenance::EraseOperand);
        let ids: Vec<_> = layers_for(&feature).map(|style| style.id).collect();
        assert_eq!(ids, vec!["red-fill", "red-outline"]);
    }
}
