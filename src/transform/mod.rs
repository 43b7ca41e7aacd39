//! Transform requests and the request/response pipeline that applies them.

mod pipeline;
mod request;

pub use pipeline::{DispatchTicket, PipelineState, Resolution, TransformPipeline};
pub use request::{
    BufferUnits, Crs, OutputFormat, TransformKind, TransformOperation, TransformRequest,
    Transformation,
};
