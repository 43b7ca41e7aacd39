use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::feature::{FeatureCollection, Provenance};
use crate::registry::FeatureRegistry;
use crate::util::parse::positive_integer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Buffer,
    Erase,
    Clip,
    Union,
}

impl TransformKind {
    pub const ALL: [TransformKind; 4] = [
        TransformKind::Buffer,
        TransformKind::Erase,
        TransformKind::Clip,
        TransformKind::Union,
    ];

    /// Operand role a binary operation reads its second input from.
    pub fn operand_role(self) -> Option<Provenance> {
        match self {
            TransformKind::Erase => Some(Provenance::EraseOperand),
            TransformKind::Clip => Some(Provenance::ClipOperand),
            TransformKind::Buffer | TransformKind::Union => None,
        }
    }
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TransformKind::Buffer => "Buffer",
            TransformKind::Erase => "Erase",
            TransformKind::Clip => "Clip",
            TransformKind::Union => "Union",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferUnits {
    #[default]
    Meters,
    Kilometers,
    Miles,
    Feet,
}

impl BufferUnits {
    pub const ALL: [BufferUnits; 4] = [
        BufferUnits::Meters,
        BufferUnits::Kilometers,
        BufferUnits::Miles,
        BufferUnits::Feet,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BufferUnits::Meters => "Meters",
            BufferUnits::Kilometers => "Kilometers",
            BufferUnits::Miles => "Miles",
            BufferUnits::Feet => "Feet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "geojson")]
    GeoJson,
    #[default]
    #[serde(rename = "shp")]
    Shapefile,
    #[serde(rename = "gpkg")]
    GeoPackage,
    #[serde(rename = "dxf")]
    Dxf,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Shapefile,
        OutputFormat::GeoPackage,
        OutputFormat::Dxf,
        OutputFormat::GeoJson,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::GeoJson => "geojson",
            OutputFormat::Shapefile => "shp",
            OutputFormat::GeoPackage => "gpkg",
            OutputFormat::Dxf => "dxf",
        }
    }

    /// Extension of the downloaded file. Shapefiles arrive zipped.
    pub fn file_extension(self) -> &'static str {
        match self {
            OutputFormat::Shapefile => "zip",
            other => other.as_str(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::GeoJson => "GeoJSON",
            OutputFormat::Shapefile => "Shapefile",
            OutputFormat::GeoPackage => "Geopackage",
            OutputFormat::Dxf => "DXF",
        }
    }
}

/// An EPSG coordinate reference system, written `EPSG:<code>` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    code: u32,
}

impl Crs {
    pub const WGS84: Crs = Crs { code: 4326 };

    pub fn epsg(code: u32) -> Option<Self> {
        (code > 0).then_some(Self { code })
    }

    /// Reads a user-typed EPSG code; invalid input leaves it unset.
    pub fn from_input(input: &str) -> Option<Self> {
        positive_integer(input).map(|code| Self { code })
    }

    pub fn code(self) -> u32 {
        self.code
    }
}

impl Default for Crs {
    fn default() -> Self {
        Crs::WGS84
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.code)
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Crs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.strip_prefix("EPSG:")
            .and_then(|code| code.parse().ok())
            .and_then(Crs::epsg)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid CRS {text:?}")))
    }
}

/// A transform chosen by the user, with parameters already validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOperation {
    Buffer { distance: u32, units: BufferUnits },
    Erase,
    Clip,
    Union,
}

impl TransformOperation {
    /// Buffer with a distance that may still be unset after input parsing.
    pub fn buffer(distance: Option<u32>, units: BufferUnits) -> Result<Self, ValidationError> {
        let distance = distance.ok_or(ValidationError::MissingParameter("distance"))?;
        Ok(TransformOperation::Buffer { distance, units })
    }

    pub fn kind(&self) -> TransformKind {
        match self {
            TransformOperation::Buffer { .. } => TransformKind::Buffer,
            TransformOperation::Erase => TransformKind::Erase,
            TransformOperation::Clip => TransformKind::Clip,
            TransformOperation::Union => TransformKind::Union,
        }
    }

    /// Whether the trigger for this operation may be enabled.
    pub fn check_preconditions(&self, registry: &FeatureRegistry) -> Result<(), ValidationError> {
        if registry.is_empty() {
            return Err(ValidationError::NoActiveFeatures);
        }
        if let Some(role) = self.kind().operand_role() {
            if registry.operand_len(role) == 0 {
                return Err(ValidationError::MissingOperand(self.kind()));
            }
        }
        Ok(())
    }
}

/// One step of the server-side transformation chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transformation {
    Buffer {
        distance: u32,
        units: BufferUnits,
    },
    Erase {
        erasing_geojson: FeatureCollection,
    },
    Union,
    Clip {
        clipping_geojson: FeatureCollection,
    },
}

/// Request body for `POST /transform/geojson`. Built fresh per call and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformRequest {
    input_geojson: FeatureCollection,
    output_format: OutputFormat,
    output_crs: Crs,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    transformations: Vec<Transformation>,
}

impl TransformRequest {
    /// Builds a GeoJSON-to-GeoJSON transform over the registry's canonical
    /// collection, pulling the operand for binary operations.
    pub fn transform(
        operation: &TransformOperation,
        registry: &FeatureRegistry,
        output_crs: Crs,
    ) -> Result<Self, ValidationError> {
        operation.check_preconditions(registry)?;

        let transformation = match *operation {
            TransformOperation::Buffer { distance, units } => {
                Transformation::Buffer { distance, units }
            }
            TransformOperation::Erase => Transformation::Erase {
                erasing_geojson: registry.operand(Provenance::EraseOperand),
            },
            TransformOperation::Clip => Transformation::Clip {
                clipping_geojson: registry.operand(Provenance::ClipOperand),
            },
            TransformOperation::Union => Transformation::Union,
        };

        Ok(Self {
            input_geojson: registry.snapshot(),
            output_format: OutputFormat::GeoJson,
            output_crs,
            transformations: vec![transformation],
        })
    }

    /// Format conversion of `features` with no transformation steps.
    pub fn export(features: FeatureCollection, output_format: OutputFormat, output_crs: Crs) -> Self {
        Self {
            input_geojson: features,
            output_format,
            output_crs,
            transformations: Vec::new(),
        }
    }

    pub fn input(&self) -> &FeatureCollection {
        &self.input_geojson
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn output_crs(&self) -> Crs {
        self.output_crs
    }

    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Geometry};
    use serde_json::json;

    fn registry_with_point() -> FeatureRegistry {
        let mut registry = FeatureRegistry::new();
        registry
            .replace_all(vec![Feature::new(Geometry::point(1.0, 2.0)).with_id(1u64)])
            .unwrap();
        registry
    }

    #[test]
    fn buffer_request_serializes_to_wire_format() {
        let registry = registry_with_point();
        let op = TransformOperation::buffer(Some(100), BufferUnits::Meters).unwrap();
        let request = TransformRequest::transform(&op, &registry, Crs::WGS84).unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["output_format"], "geojson");
        assert_eq!(value["output_crs"], "EPSG:4326");
        assert_eq!(value["input_geojson"]["type"], "FeatureCollection");
        assert_eq!(
            value["transformations"],
            json!([{ "type": "buffer", "distance": 100, "units": "meters" }])
        );
    }

    #[test]
    fn union_has_no_parameters() {
        let registry = registry_with_point();
        let request =
            TransformRequest::transform(&TransformOperation::Union, &registry, Crs::WGS84).unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["transformations"], json!([{ "type": "union" }]));
    }

    #[test]
    fn export_omits_transformations() {
        let request = TransformRequest::export(
            FeatureCollection::default(),
            OutputFormat::Shapefile,
            Crs::epsg(3857).unwrap(),
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["output_format"], "shp");
        assert_eq!(value["output_crs"], "EPSG:3857");
        assert!(value.get("transformations").is_none());
    }

    #[test]
    fn erase_requires_an_operand() {
        let registry = registry_with_point();
        assert_eq!(
            TransformOperation::Erase.check_preconditions(&registry),
            Err(ValidationError::MissingOperand(TransformKind::Erase))
        );
        assert_eq!(
            TransformOperation::Union.check_preconditions(&FeatureRegistry::new()),
            Err(ValidationError::NoActiveFeatures)
        );
    }

    #[test]
    fn unset_distance_is_rejected() {
        assert_eq!(
            TransformOperation::buffer(None, BufferUnits::Feet),
            Err(ValidationError::MissingParameter("distance"))
        );
    }

    #[test]
    fn crs_parses_user_input() {
        assert_eq!(Crs::from_input("28355").map(Crs::code), Some(28355));
        assert_eq!(Crs::from_input("0"), None);
        assert_eq!(Crs::from_input("EPSG"), None);
        let crs: Crs = serde_json::from_str("\"EPSG:4326\"").unwrap();
        assert_eq!(crs, Crs::WGS84);
    }

    #[test]
    fn shapefile_downloads_as_zip() {
        assert_eq!(OutputFormat::Shapefile.file_extension(), "zip");
        assert_eq!(OutputFormat::GeoPackage.file_extension(), "gpkg");
        assert_eq!(OutputFormat::Dxf.file_extension(), "dxf");
        assert_eq!(OutputFormat::GeoJson.file_extension(), "geojson");
    }
}
