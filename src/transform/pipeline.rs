use crate::error::{PipelineError, ServiceError};
use crate::feature::FeatureCollection;
use crate::registry::FeatureRegistry;
use crate::service::ServiceReply;
use crate::transform::{Crs, TransformKind, TransformOperation, TransformRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Pending { generation: u64, kind: TransformKind },
}

/// A dispatched transform: the immutable request plus the generation that
/// its reply must present to be accepted.
#[derive(Debug, Clone)]
pub struct DispatchTicket {
    generation: u64,
    kind: TransformKind,
    request: TransformRequest,
}

impl DispatchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    pub fn request(&self) -> &TransformRequest {
        &self.request
    }
}

/// Outcome of matching a service reply against the pipeline state.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Replace the registry with `features`.
    Apply {
        kind: TransformKind,
        features: FeatureCollection,
    },
    /// Surface the error; nothing is mutated.
    Failed(ServiceError),
    /// The reply belongs to a request that is no longer the latest.
    Stale,
}

/// At-most-one-in-flight transform state machine.
#[derive(Debug)]
pub struct TransformPipeline {
    state: PipelineState,
    latest_generation: u64,
    output_crs: Crs,
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new(Crs::WGS84)
    }
}

impl TransformPipeline {
    pub fn new(output_crs: Crs) -> Self {
        Self {
            state: PipelineState::Idle,
            latest_generation: 0,
            output_crs,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, PipelineState::Pending { .. })
    }

    pub fn output_crs(&self) -> Crs {
        self.output_crs
    }

    /// Whether `operation` could be dispatched right now.
    pub fn can_begin(&self, operation: &TransformOperation, registry: &FeatureRegistry) -> bool {
        !self.is_pending() && operation.check_preconditions(registry).is_ok()
    }

    /// Validates `operation`, builds its request and marks the pipeline
    /// pending. Refused with [`PipelineError::Busy`] while a request is out.
    pub fn begin(
        &mut self,
        operation: &TransformOperation,
        registry: &FeatureRegistry,
    ) -> Result<DispatchTicket, PipelineError> {
        if self.is_pending() {
            return Err(PipelineError::Busy);
        }
        let request = TransformRequest::transform(operation, registry, self.output_crs)?;

        self.latest_generation += 1;
        let kind = operation.kind();
        self.state = PipelineState::Pending {
            generation: self.latest_generation,
            kind,
        };
        log::info!(
            "Dispatching {kind} over {} features (generation {})",
            request.input().len(),
            self.latest_generation
        );
        Ok(DispatchTicket {
            generation: self.latest_generation,
            kind,
            request,
        })
    }

    /// Interprets the reply for `generation` and returns the pipeline to
    /// `Idle`. Replies for any other generation are reported as stale and
    /// leave the state alone.
    pub fn resolve(
        &mut self,
        generation: u64,
        reply: Result<ServiceReply, ServiceError>,
    ) -> Resolution {
        let kind = match self.state {
            PipelineState::Pending {
                generation: pending,
                kind,
            } if pending == generation => kind,
            _ => {
                log::warn!("Discarding stale transform reply (generation {generation})");
                return Resolution::Stale;
            }
        };
        self.state = PipelineState::Idle;

        match reply.and_then(ServiceReply::into_features) {
            Ok(features) => Resolution::Apply { kind, features },
            Err(err) => Resolution::Failed(err),
        }
    }
}
