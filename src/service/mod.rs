//! The remote transformation service, treated as a black-box RPC.

mod http;

pub use http::HttpTransformService;

use serde::Deserialize;

use crate::error::ServiceError;
use crate::exchange::UploadRequest;
use crate::feature::FeatureCollection;
use crate::transform::TransformRequest;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "apiKey";

/// Blocking access to the transform endpoints. Implementations return the
/// raw status and body for every reply they receive and reserve `Err` for
/// requests that produced no reply at all.
pub trait TransformService: Send + Sync {
    /// `POST /transform/geojson` with a JSON body.
    fn post_geojson(&self, request: &TransformRequest) -> Result<ServiceReply, ServiceError>;

    /// `POST /transform/{shp|dxf|gpkg}` with a multipart body.
    fn post_upload(&self, upload: &UploadRequest) -> Result<ServiceReply, ServiceError>;
}

/// Status and body of a service reply, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl ServiceReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes a success body as a GeoJSON feature collection.
    pub fn into_features(self) -> Result<FeatureCollection, ServiceError> {
        if !self.is_success() {
            return Err(self.into_error());
        }
        serde_json::from_slice(&self.body)
            .map_err(|err| ServiceError::InvalidResponse(format!("malformed GeoJSON: {err}")))
    }

    /// Returns a success body untouched, e.g. an exported file.
    pub fn into_bytes(self) -> Result<Vec<u8>, ServiceError> {
        if !self.is_success() {
            return Err(self.into_error());
        }
        Ok(self.body)
    }

    fn into_error(self) -> ServiceError {
        match serde_json::from_slice::<ErrorBody>(&self.body) {
            Ok(body) => ServiceError::Remote {
                status: self.status,
                message: body.message,
            },
            Err(_) => ServiceError::UnreadableErrorBody {
                status: self.status,
            },
        }
    }
}
