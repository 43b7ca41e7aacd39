//! Bridge between the freehand drawing UI and the feature registry.
//!
//! Two one-directional channels:
//! - user edits flow UI -> registry through [`DrawSurfaceAdapter::handle_event`],
//! - registry replacements flow registry -> UI through [`DrawSurfaceAdapter::push`].
//!
//! Events caused by a push are tagged [`ChangeOrigin::Registry`] and are never
//! fed back into the registry.

use crate::camera::MapSurface;
use crate::error::RegistryError;
use crate::event::{EventBus, SessionEvent};
use crate::feature::FeatureCollection;
use crate::layers::COMBINED_SOURCE_ID;
use crate::registry::FeatureRegistry;

/// The drawing UI's own feature store.
pub trait DrawSurface {
    fn get_all(&self) -> FeatureCollection;

    fn set(&mut self, collection: &FeatureCollection);

    fn delete_all(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawEventKind {
    Create,
    Update,
    Delete,
}

/// Who caused a change inside the drawing UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    User,
    Registry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawEvent {
    pub kind: DrawEventKind,
    pub origin: ChangeOrigin,
}

impl DrawEvent {
    pub fn user(kind: DrawEventKind) -> Self {
        Self {
            kind,
            origin: ChangeOrigin::User,
        }
    }

    /// An event the drawing UI raised while applying a registry push.
    pub fn echo(kind: DrawEventKind) -> Self {
        Self {
            kind,
            origin: ChangeOrigin::Registry,
        }
    }
}

#[derive(Debug, Default)]
pub struct DrawSurfaceAdapter {
    last_writer: Option<ChangeOrigin>,
}

impl DrawSurfaceAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Side that last wrote the shared feature set.
    pub fn last_writer(&self) -> Option<ChangeOrigin> {
        self.last_writer
    }

    /// Republishes the drawing UI's full feature set as the registry contents.
    ///
    /// Returns `Ok(false)` for echoes of a registry push, which are dropped.
    pub fn handle_event(
        &mut self,
        event: DrawEvent,
        surface: &dyn DrawSurface,
        registry: &mut FeatureRegistry,
        map: &mut dyn MapSurface,
        bus: &EventBus,
    ) -> Result<bool, RegistryError> {
        if event.origin == ChangeOrigin::Registry {
            log::trace!("Ignoring echoed draw event {:?}", event.kind);
            return Ok(false);
        }

        registry.sync_from_surface(surface.get_all())?;
        self.last_writer = Some(ChangeOrigin::User);
        log::debug!(
            "Draw {:?}: {} active features",
            event.kind,
            registry.len()
        );

        map.set_source_data(COMBINED_SOURCE_ID, &registry.combined());
        bus.emit(SessionEvent::FeaturesChanged(registry.snapshot()));
        Ok(true)
    }

    /// Mirrors the registry's combined view into the drawing UI and the
    /// rendering source.
    pub fn push(
        &mut self,
        registry: &FeatureRegistry,
        surface: &mut dyn DrawSurface,
        map: &mut dyn MapSurface,
    ) {
        let combined = registry.combined();
        surface.set(&combined);
        map.set_source_data(COMBINED_SOURCE_ID, &combined);
        self.last_writer = Some(ChangeOrigin::Registry);
    }

    /// Empties the drawing UI and the registry together, then announces an
    /// empty collection.
    pub fn clear_all(
        &mut self,
        registry: &mut FeatureRegistry,
        surface: &mut dyn DrawSurface,
        map: &mut dyn MapSurface,
        bus: &EventBus,
    ) {
        surface.delete_all();
        registry.clear();
        map.set_source_data(COMBINED_SOURCE_ID, &FeatureCollection::default());
        self.last_writer = Some(ChangeOrigin::Registry);
        log::info!("Cleared all features");
        bus.emit(SessionEvent::FeaturesChanged(FeatureCollection::default()));
    }
}
