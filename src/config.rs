use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::transform::{BufferUnits, Crs, OutputFormat};

pub const DEFAULT_BASE_URL: &str = "https://api.geoflip.io/v1";
pub const API_URL_VAR: &str = "GEOFLIP_API_URL";
pub const API_KEY_VAR: &str = "GEOFLIP_API_KEY";

/// Where the transform service lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            base_url: read(API_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            api_key: read(API_KEY_VAR),
        }
    }
}

/// UI choices restored between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // settings saved by older builds may lack newer fields
pub struct AppSettings {
    /// CRS of exported files. Transforms always run in EPSG:4326.
    #[serde(alias = "output_crs")]
    pub export_crs: Crs,
    pub export_format: OutputFormat,
    pub buffer_units: BufferUnits,
    pub export_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            export_crs: Crs::WGS84,
            export_format: OutputFormat::default(),
            buffer_units: BufferUnits::default(),
            export_dir: None,
        }
    }
}
