//! The orchestrator that owns the feature registry and mediates every
//! mutation to it.
//!
//! The `Session` wires the registry, the camera controller, the draw-surface
//! adapter, the transform pipeline and the import/export slots together. It
//! never talks to the network itself: each flow is split into a `begin_*`
//! step that validates input and hands back an immutable request, and a
//! `finish_*` step that takes the raw service reply and applies it.
//!
//! # Flows
//!
//! - `begin_transform` / `finish_transform`: at most one transform in flight.
//!   A successful reply stops the camera, replaces the registry, pushes the
//!   new set into the drawing UI and fits the camera to it, in that order.
//! - `begin_import` / `finish_import`: uploads merged into the registry with
//!   fresh identities, tagged when they are operands.
//! - `begin_export` / `finish_export`: the active features converted to a
//!   file, held as a [`Download`] until the user saves it.
//!
//! The `run_*` variants compose both halves around a blocking
//! [`TransformService`] call.
//!
//! # Example
//!
//! ```rust,no_run
//! use geodraw::session::{Session, Surfaces};
//! use geodraw::transform::{BufferUnits, TransformOperation};
//! # fn demo(
//! #     service: &dyn geodraw::service::TransformService,
//! #     map: &mut dyn geodraw::camera::MapSurface,
//! #     draw: &mut dyn geodraw::draw_surface::DrawSurface,
//! # ) {
//! let mut session = Session::new();
//! let buffer = TransformOperation::Buffer { distance: 100, units: BufferUnits::Meters };
//!
//! if let Err(e) = session.run_transform(&buffer, service, Surfaces { map, draw }) {
//!     println!("Transform failed: {e}");
//! }
//! # }
//! ```
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::camera::{CameraController, MapSurface};
use crate::draw_surface::{DrawEvent, DrawSurface, DrawSurfaceAdapter};
use crate::error::{PipelineError, PipelineResult, ServiceError};
use crate::event::{EventBus, EventHandler, SessionEvent};
use crate::exchange::{
    Download, ExchangeSlots, ExportTicket, ImportTicket, Slot, UploadRequest, export_request,
};
use crate::feature::{LngLat, Provenance};
use crate::registry::FeatureRegistry;
use crate::service::{ServiceReply, TransformService};
use crate::transform::{
    Crs, DispatchTicket, OutputFormat, Resolution, TransformOperation, TransformPipeline,
};

/// The two opaque collaborators a flow may touch, borrowed for one call.
pub struct Surfaces<'a> {
    pub map: &'a mut dyn MapSurface,
    pub draw: &'a mut dyn DrawSurface,
}

#[derive(Debug, Default)]
pub struct Session {
    registry: FeatureRegistry,
    camera: CameraController,
    draw: DrawSurfaceAdapter,
    pipeline: TransformPipeline,
    slots: ExchangeSlots,
    events: EventBus,
    error_message: Option<String>,
    download: Option<Download>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.events.subscribe(handler);
    }

    /// Text of the last failure, shown until the next request starts.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Shows a failure that never reached the service, e.g. an unreadable file.
    pub fn set_error_message(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn dismiss_error(&mut self) {
        self.error_message = None;
    }

    pub fn download(&self) -> Option<&Download> {
        self.download.as_ref()
    }

    pub fn take_download(&mut self) -> Option<Download> {
        self.download.take()
    }

    pub fn is_slot_pending(&self, slot: Slot) -> bool {
        self.slots.is_pending(slot)
    }

    /// Whether the trigger for `operation` should be enabled.
    pub fn can_transform(&self, operation: &TransformOperation) -> bool {
        self.pipeline.can_begin(operation, &self.registry)
    }

    pub fn can_export(&self, output_crs: Option<Crs>) -> bool {
        output_crs.is_some() && !self.registry.is_empty() && !self.slots.is_pending(Slot::Export)
    }

    // --- transform ---

    pub fn begin_transform(&mut self, operation: &TransformOperation) -> PipelineResult<DispatchTicket> {
        self.error_message = None;
        self.pipeline.begin(operation, &self.registry)
    }

    /// Applies the reply for the transform dispatched as `generation`.
    /// Replies for anything but the latest request are dropped.
    pub fn finish_transform(
        &mut self,
        generation: u64,
        reply: Result<ServiceReply, ServiceError>,
        surfaces: Surfaces<'_>,
    ) -> PipelineResult<()> {
        let (kind, features) = match self.pipeline.resolve(generation, reply) {
            Resolution::Apply { kind, features } => (kind, features),
            Resolution::Failed(err) => return Err(self.fail(err.into())),
            Resolution::Stale => return Ok(()),
        };

        self.stop_rotation();
        if let Err(err) = self.registry.replace_all(features) {
            return Err(self.fail(err.into()));
        }
        self.draw.push(&self.registry, surfaces.draw, surfaces.map);
        self.camera.fit_to_bounds(self.registry.features(), surfaces.map);

        log::info!("{kind} applied: {} features", self.registry.len());
        self.events.emit(SessionEvent::FeaturesChanged(self.registry.snapshot()));
        self.events.emit(SessionEvent::TransformApplied {
            kind,
            feature_count: self.registry.len(),
        });
        Ok(())
    }

    pub fn run_transform(
        &mut self,
        operation: &TransformOperation,
        service: &dyn TransformService,
        surfaces: Surfaces<'_>,
    ) -> PipelineResult<()> {
        let ticket = self.begin_transform(operation)?;
        let reply = service.post_geojson(ticket.request());
        self.finish_transform(ticket.generation(), reply, surfaces)
    }

    // --- import ---

    pub fn begin_import(
        &mut self,
        request: UploadRequest,
        provenance: Provenance,
    ) -> PipelineResult<ImportTicket> {
        self.slots.acquire(Slot::for_import(provenance))?;
        self.error_message = None;
        log::info!(
            "Uploading {} as {} ({} bytes)",
            request.file_name(),
            request.format(),
            request.bytes().len()
        );
        Ok(ImportTicket { provenance, request })
    }

    /// Merges an upload reply into the registry. Returns how many features
    /// were merged.
    pub fn finish_import(
        &mut self,
        provenance: Provenance,
        reply: Result<ServiceReply, ServiceError>,
        surfaces: Surfaces<'_>,
    ) -> PipelineResult<usize> {
        self.slots.release(Slot::for_import(provenance));
        let imported = match reply.and_then(ServiceReply::into_features) {
            Ok(imported) => imported,
            Err(err) => return Err(self.fail(err.into())),
        };
        let merged = match self.registry.merge_imported(imported, provenance) {
            Ok(merged) => merged,
            Err(err) => return Err(self.fail(err.into())),
        };

        self.stop_rotation();
        self.draw.push(&self.registry, surfaces.draw, surfaces.map);
        self.camera
            .fit_to_bounds(self.registry.combined().iter(), surfaces.map);

        let count = merged.len();
        if provenance.is_operand() {
            self.events.emit(SessionEvent::OperandChanged {
                provenance,
                count: self.registry.operand_len(provenance),
            });
        } else {
            self.events.emit(SessionEvent::FeaturesChanged(self.registry.snapshot()));
        }
        self.events.emit(SessionEvent::ImportMerged { provenance, count });
        Ok(count)
    }

    pub fn run_import(
        &mut self,
        request: UploadRequest,
        provenance: Provenance,
        service: &dyn TransformService,
        surfaces: Surfaces<'_>,
    ) -> PipelineResult<usize> {
        let ticket = self.begin_import(request, provenance)?;
        let reply = service.post_upload(&ticket.request);
        self.finish_import(ticket.provenance, reply, surfaces)
    }

    // --- export ---

    pub fn begin_export(
        &mut self,
        format: OutputFormat,
        output_crs: Option<Crs>,
    ) -> PipelineResult<ExportTicket> {
        let request = export_request(&self.registry, format, output_crs)?;
        self.slots.acquire(Slot::Export)?;
        self.error_message = None;
        self.download = None;
        log::info!(
            "Exporting {} features as {}",
            request.input().len(),
            format.label()
        );
        Ok(ExportTicket { format, request })
    }

    /// Stores the exported file for the user to save.
    pub fn finish_export(
        &mut self,
        format: OutputFormat,
        reply: Result<ServiceReply, ServiceError>,
        at: DateTime<Utc>,
    ) -> PipelineResult<&Download> {
        self.slots.release(Slot::Export);
        let bytes = match reply.and_then(ServiceReply::into_bytes) {
            Ok(bytes) => bytes,
            Err(err) => return Err(self.fail(err.into())),
        };
        let download = Download::new(format, bytes, at);
        self.events.emit(SessionEvent::ExportReady {
            file_name: download.file_name.clone(),
        });
        Ok(&*self.download.insert(download))
    }

    pub fn run_export(
        &mut self,
        format: OutputFormat,
        output_crs: Option<Crs>,
        service: &dyn TransformService,
    ) -> PipelineResult<&Download> {
        let ticket = self.begin_export(format, output_crs)?;
        let reply = service.post_geojson(&ticket.request);
        self.finish_export(ticket.format, reply, Utc::now())
    }

    // --- drawing and camera ---

    pub fn handle_draw_event(&mut self, event: DrawEvent, surfaces: Surfaces<'_>) -> PipelineResult<bool> {
        let handled = self.draw.handle_event(
            event,
            surfaces.draw,
            &mut self.registry,
            surfaces.map,
            &self.events,
        );
        handled.map_err(|err| self.fail(err.into()))
    }

    pub fn clear_all(&mut self, surfaces: Surfaces<'_>) {
        self.draw
            .clear_all(&mut self.registry, surfaces.draw, surfaces.map, &self.events);
    }

    /// Advances the rotation task by one frame's worth of time.
    pub fn tick(&mut self, dt: Duration, map: &mut dyn MapSurface) {
        self.camera.advance(dt, map);
    }

    pub fn on_user_interaction(&mut self) {
        if self.camera.on_user_interaction() {
            self.events.emit(SessionEvent::RotationStopped);
        }
    }

    pub fn on_camera_moved(&mut self, center: LngLat) {
        self.camera.on_camera_moved(center);
    }

    fn stop_rotation(&mut self) {
        if self.camera.stop() {
            self.events.emit(SessionEvent::RotationStopped);
        }
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        let message = err.to_string();
        log::warn!("Request failed: {message}");
        self.events.emit(SessionEvent::TransformFailed {
            message: message.clone(),
        });
        self.error_message = Some(message);
        err
    }
}
