use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{EventHandler, SessionEvent};
use crate::feature::FeatureCollection;

/// Writes every session event to the log.
#[derive(Debug, Default)]
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn handle_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::FeaturesChanged(features) => {
                log::debug!("Active features: {}", features.len())
            }
            SessionEvent::TransformFailed { message } => log::warn!("Transform failed: {message}"),
            other => log::info!("{other:?}"),
        }
    }
}

/// Keeps the most recent collection announced by `FeaturesChanged`. Clones
/// share the same slot.
#[derive(Debug, Clone, Default)]
pub struct ObservedFeatures {
    latest: Arc<Mutex<Option<FeatureCollection>>>,
}

impl ObservedFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent collection seen, if any event has arrived yet.
    pub fn latest(&self) -> Option<FeatureCollection> {
        self.latest.lock().clone()
    }
}

impl EventHandler for ObservedFeatures {
    fn handle_event(&mut self, event: &SessionEvent) {
        if let SessionEvent::FeaturesChanged(features) = event {
            *self.latest.lock() = Some(features.clone());
        }
    }
}
