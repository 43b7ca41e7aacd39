use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::util::parse::leading_int;

/// Property key carrying the provenance tag on the wire.
pub const STYLE_PROPERTY: &str = "style";

/// A GeoJSON position. Only the first two ordinates (lng, lat) are interpreted.
pub type Position = Vec<f64>;

/// A (longitude, latitude) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Returns the same position with longitude folded into [-180, 180).
    pub fn wrapped(self) -> Self {
        let lng = (self.lng + 180.0).rem_euclid(360.0) - 180.0;
        Self { lng, lat: self.lat }
    }
}

/// Axis-aligned lon/lat bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    fn from_point(lng: f64, lat: f64) -> Self {
        Self {
            west: lng,
            south: lat,
            east: lng,
            north: lat,
        }
    }

    fn extend(&mut self, lng: f64, lat: f64) {
        self.west = self.west.min(lng);
        self.south = self.south.min(lat);
        self.east = self.east.max(lng);
        self.north = self.north.max(lat);
    }

    pub fn center(&self) -> LngLat {
        LngLat::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }

    /// Bounding box of every position in `features`, or `None` when there is
    /// nothing to frame.
    pub fn of<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for feature in features {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            geometry.for_each_position(&mut |position| {
                let (Some(&lng), Some(&lat)) = (position.first(), position.get(1)) else {
                    return;
                };
                match bounds.as_mut() {
                    Some(b) => b.extend(lng, lat),
                    None => bounds = Some(Bounds::from_point(lng, lat)),
                }
            });
        }
        bounds
    }
}

/// Base geometry kind, as matched by rendering-layer filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 3] = [
        GeometryKind::Point,
        GeometryKind::LineString,
        GeometryKind::Polygon,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiPoint(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    pub fn point(lng: f64, lat: f64) -> Self {
        Geometry::Point(vec![lng, lat])
    }

    pub fn line_string(points: &[LngLat]) -> Self {
        Geometry::LineString(points.iter().map(|p| vec![p.lng, p.lat]).collect())
    }

    /// Builds a single-ring polygon, closing the ring if needed.
    pub fn polygon(ring: &[LngLat]) -> Self {
        let mut coords: Vec<Position> = ring.iter().map(|p| vec![p.lng, p.lat]).collect();
        if let (Some(first), Some(last)) = (coords.first().cloned(), coords.last()) {
            if &first != last {
                coords.push(first);
            }
        }
        Geometry::Polygon(vec![coords])
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) | Geometry::MultiPoint(_) => GeometryKind::Point,
            Geometry::LineString(_) | Geometry::MultiLineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => GeometryKind::Polygon,
        }
    }

    pub fn for_each_position(&self, f: &mut impl FnMut(&Position)) {
        match self {
            Geometry::Point(p) => f(p),
            Geometry::LineString(line) | Geometry::MultiPoint(line) => line.iter().for_each(f),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                rings.iter().flatten().for_each(f)
            }
            Geometry::MultiPolygon(polygons) => polygons.iter().flatten().flatten().for_each(f),
        }
    }
}

/// Identity of a feature. GeoJSON allows either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    /// Any JSON number, including floats and values past `i64::MAX`.
    Number(Number),
    Text(String),
}

impl FeatureId {
    /// Integer value used when allocating fresh identities: leading decimal
    /// digits are read, anything non-numeric or negative counts as 0.
    pub fn numeric_value(&self) -> u64 {
        match self {
            FeatureId::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|v| *v > 0.0).map(|v| v.floor() as u64))
                .unwrap_or(0),
            FeatureId::Text(text) => leading_int(text).map_or(0, |v| v.max(0) as u64),
        }
    }

    /// Comparison key: `7`, `"7"` and `"007"` all normalise to `"7"`.
    pub fn normalized(&self) -> String {
        match self {
            FeatureId::Number(n) => match n.as_f64() {
                Some(v) if !n.is_f64() || v.fract() != 0.0 => n.to_string(),
                Some(v) if v.abs() < i64::MAX as f64 => (v as i64).to_string(),
                _ => n.to_string(),
            },
            FeatureId::Text(text) => match text.trim().parse::<i64>() {
                Ok(n) => n.to_string(),
                Err(_) => text.clone(),
            },
        }
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{n}"),
            FeatureId::Text(text) => f.write_str(text),
        }
    }
}

impl From<u64> for FeatureId {
    fn from(value: u64) -> Self {
        FeatureId::Text(value.to_string())
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        FeatureId::Text(value.to_owned())
    }
}

/// Role of a feature for rendering and for transform operands.
///
/// Serialized as the `style` property: primary features carry no tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Provenance {
    #[default]
    Primary,
    EraseOperand,
    ClipOperand,
}

impl Provenance {
    pub const ALL: [Provenance; 3] = [
        Provenance::Primary,
        Provenance::EraseOperand,
        Provenance::ClipOperand,
    ];

    pub fn tag(self) -> Option<&'static str> {
        match self {
            Provenance::Primary => None,
            Provenance::EraseOperand => Some("red"),
            Provenance::ClipOperand => Some("orange"),
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Provenance::ALL
            .into_iter()
            .find(|provenance| provenance.tag() == Some(tag))
    }

    pub fn is_operand(self) -> bool {
        self != Provenance::Primary
    }
}

#[derive(Serialize, Deserialize)]
enum FeatureType {
    Feature,
}

#[derive(Serialize, Deserialize)]
struct RawFeature {
    #[serde(rename = "type")]
    kind: FeatureType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<FeatureId>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// A geometry plus its property bag and identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFeature", into = "RawFeature")]
pub struct Feature {
    pub id: Option<FeatureId>,
    pub geometry: Option<Geometry>,
    pub properties: Map<String, Value>,
    pub provenance: Provenance,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            geometry: Some(geometry),
            properties: Map::new(),
            provenance: Provenance::Primary,
        }
    }

    pub fn with_id(mut self, id: impl Into<FeatureId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_owned(), value.into());
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Moves the feature to `provenance`. A `style` value that was read as a
    /// tag goes back into the properties when the feature becomes primary.
    pub fn retag(&mut self, provenance: Provenance) {
        if !provenance.is_operand() {
            if let Some(tag) = self.provenance.tag() {
                self.properties
                    .insert(STYLE_PROPERTY.to_owned(), Value::String(tag.to_owned()));
            }
        }
        self.provenance = provenance;
    }
}

impl From<RawFeature> for Feature {
    fn from(raw: RawFeature) -> Self {
        let mut properties = raw.properties.unwrap_or_default();
        let provenance = match properties.get(STYLE_PROPERTY) {
            Some(Value::String(tag)) => Provenance::from_tag(tag),
            _ => None,
        };
        // Unknown style values stay in the bag untouched.
        if provenance.is_some() {
            properties.remove(STYLE_PROPERTY);
        }
        Self {
            id: raw.id,
            geometry: raw.geometry,
            properties,
            provenance: provenance.unwrap_or_default(),
        }
    }
}

impl From<Feature> for RawFeature {
    fn from(feature: Feature) -> Self {
        let mut properties = feature.properties;
        if let Some(tag) = feature.provenance.tag() {
            properties.insert(STYLE_PROPERTY.to_owned(), Value::String(tag.to_owned()));
        }
        Self {
            kind: FeatureType::Feature,
            id: feature.id,
            geometry: feature.geometry,
            properties: Some(properties),
        }
    }
}

#[derive(Serialize, Deserialize)]
enum FeatureCollectionType {
    FeatureCollection,
}

#[derive(Serialize, Deserialize)]
struct RawFeatureCollection {
    #[serde(rename = "type")]
    kind: FeatureCollectionType,
    #[serde(default)]
    features: Vec<Feature>,
}

/// Ordered group of features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFeatureCollection", into = "RawFeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of(&self.features)
    }
}

impl From<Vec<Feature>> for FeatureCollection {
    fn from(features: Vec<Feature>) -> Self {
        Self { features }
    }
}

impl From<RawFeatureCollection> for FeatureCollection {
    fn from(raw: RawFeatureCollection) -> Self {
        Self {
            features: raw.features,
        }
    }
}

impl From<FeatureCollection> for RawFeatureCollection {
    fn from(collection: FeatureCollection) -> Self {
        Self {
            kind: FeatureCollectionType::FeatureCollection,
            features: collection.features,
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
