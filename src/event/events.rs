use crate::feature::{FeatureCollection, Provenance};
use crate::transform::TransformKind;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The canonical collection changed; carries the new contents. Clear-all
    /// announces an empty collection.
    FeaturesChanged(FeatureCollection),
    OperandChanged {
        provenance: Provenance,
        count: usize,
    },
    TransformApplied {
        kind: TransformKind,
        feature_count: usize,
    },
    TransformFailed {
        message: String,
    },
    ImportMerged {
        provenance: Provenance,
        count: usize,
    },
    ExportReady {
        file_name: String,
    },
    RotationStopped,
}
