//! File import and export through the transform service.
//!
//! Imports upload a binary file and get GeoJSON back; exports send the active
//! features and get a binary file back. Each direction has its own slot so an
//! import, an operand import and an export can overlap, but never two of the
//! same kind.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, ValidationError};
use crate::feature::Provenance;
use crate::registry::FeatureRegistry;
use crate::transform::{Crs, OutputFormat, TransformRequest};
use crate::util::time::file_name_timestamp;

/// Stem of every downloaded file name.
pub const DOWNLOAD_PREFIX: &str = "geoflip";

/// Upload formats the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputFormat {
    Shapefile,
    Dxf,
    GeoPackage,
}

impl InputFormat {
    pub const ALL: [InputFormat; 3] = [
        InputFormat::Shapefile,
        InputFormat::Dxf,
        InputFormat::GeoPackage,
    ];

    /// Endpoint segment: `/transform/{shp|dxf|gpkg}`.
    pub fn as_str(self) -> &'static str {
        match self {
            InputFormat::Shapefile => "shp",
            InputFormat::Dxf => "dxf",
            InputFormat::GeoPackage => "gpkg",
        }
    }

    /// File extension accepted for this format. Shapefiles travel zipped.
    pub fn extension(self) -> &'static str {
        match self {
            InputFormat::Shapefile => "zip",
            InputFormat::Dxf => "dxf",
            InputFormat::GeoPackage => "gpkg",
        }
    }

    /// DXF carries no embedded CRS, so the user has to name one.
    pub fn requires_input_crs(self) -> bool {
        self == InputFormat::Dxf
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(extension))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            InputFormat::Shapefile => "Shapefile",
            InputFormat::Dxf => "DXF",
            InputFormat::GeoPackage => "Geopackage",
        })
    }
}

/// The `config` field of an upload. Imports always come back as GeoJSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadConfig {
    pub output_format: OutputFormat,
    pub output_crs: Crs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_crs: Option<Crs>,
}

/// A validated multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    format: InputFormat,
    file_name: String,
    bytes: Vec<u8>,
    config: UploadConfig,
}

impl UploadRequest {
    pub fn new(
        format: InputFormat,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        input_crs: Option<Crs>,
    ) -> Result<Self, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::EmptyUpload);
        }
        if format.requires_input_crs() && input_crs.is_none() {
            return Err(ValidationError::MissingInputCrs(format));
        }
        Ok(Self {
            format,
            file_name: file_name.into(),
            bytes,
            config: UploadConfig {
                output_format: OutputFormat::GeoJson,
                output_crs: Crs::WGS84,
                input_crs: input_crs.filter(|_| format.requires_input_crs()),
            },
        })
    }

    pub fn format(&self) -> InputFormat {
        self.format
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }
}

/// Builds the format conversion request for an export.
pub fn export_request(
    registry: &FeatureRegistry,
    format: OutputFormat,
    output_crs: Option<Crs>,
) -> Result<TransformRequest, ValidationError> {
    let output_crs = output_crs.ok_or(ValidationError::MissingParameter("output CRS"))?;
    if registry.is_empty() {
        return Err(ValidationError::NoActiveFeatures);
    }
    Ok(TransformRequest::export(registry.snapshot(), format, output_crs))
}

/// `geoflip_2024-05-01T12-30-00-000Z.zip`
pub fn download_file_name(format: OutputFormat, at: DateTime<Utc>) -> String {
    format!(
        "{DOWNLOAD_PREFIX}_{}.{}",
        file_name_timestamp(at),
        format.file_extension()
    )
}

/// An exported file held in memory until the user saves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn new(format: OutputFormat, bytes: Vec<u8>, at: DateTime<Utc>) -> Self {
        Self {
            file_name: download_file_name(format, at),
            bytes,
        }
    }

    /// Writes the file into `dir` and returns its full path.
    pub fn save_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        log::info!("Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Import,
    OperandImport,
    Export,
}

impl Slot {
    pub fn for_import(provenance: Provenance) -> Self {
        if provenance.is_operand() {
            Slot::OperandImport
        } else {
            Slot::Import
        }
    }
}

/// Tracks which exchange slots have a request in flight.
#[derive(Debug, Default)]
pub struct ExchangeSlots {
    pending: BTreeSet<Slot>,
}

impl ExchangeSlots {
    pub fn is_pending(&self, slot: Slot) -> bool {
        self.pending.contains(&slot)
    }

    pub fn acquire(&mut self, slot: Slot) -> Result<(), PipelineError> {
        if self.pending.insert(slot) {
            Ok(())
        } else {
            Err(PipelineError::Busy)
        }
    }

    pub fn release(&mut self, slot: Slot) {
        self.pending.remove(&slot);
    }
}

/// A dispatched upload and the provenance its features will be merged with.
#[derive(Debug, Clone)]
pub struct ImportTicket {
    pub provenance: Provenance,
    pub request: UploadRequest,
}

impl ImportTicket {
    pub fn slot(&self) -> Slot {
        Slot::for_import(self.provenance)
    }
}

#[derive(Debug, Clone)]
pub struct ExportTicket {
    pub format: OutputFormat,
    pub request: TransformRequest,
}
