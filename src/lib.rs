#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod camera;
pub mod components;
pub mod config;
pub mod draw_layer;
pub mod draw_surface;
pub mod error;
pub mod event;
pub mod exchange;
pub mod feature;
pub mod file_handler;
pub mod layers;
pub mod map_canvas;
pub mod panels;
pub mod registry;
pub mod renderer;
pub mod service;
pub mod session;
pub mod task;
pub mod transform;
pub mod util;

pub use app::GeoDrawApp;
pub use camera::{CameraController, MapSurface};
pub use draw_surface::{DrawEvent, DrawSurface, DrawSurfaceAdapter};
pub use error::{PipelineError, RegistryError, ServiceError, ValidationError};
pub use feature::{Feature, FeatureCollection, FeatureId, Geometry, Provenance};
pub use registry::FeatureRegistry;
pub use service::{HttpTransformService, TransformService};
pub use session::{Session, Surfaces};
pub use transform::{TransformOperation, TransformPipeline, TransformRequest};
