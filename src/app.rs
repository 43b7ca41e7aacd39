use std::sync::Arc;

use chrono::Utc;

use crate::camera::MapSurface;
use crate::config::AppSettings;
use crate::draw_layer::DrawLayer;
use crate::error::ServiceError;
use crate::event::LoggingEventHandler;
use crate::exchange::{ImportTicket, UploadRequest};
use crate::feature::Provenance;
use crate::file_handler::{self, FileHandler, LoadedFile};
use crate::map_canvas::MapCanvas;
use crate::panels;
use crate::renderer::Renderer;
use crate::service::{ServiceReply, TransformService};
use crate::session::{Session, Surfaces};
use crate::task::InFlight;
use crate::transform::{Crs, OutputFormat, TransformKind, TransformOperation};
use crate::util::parse::positive_integer;

type Reply = Result<ServiceReply, ServiceError>;

/// Raw contents of the control panel inputs.
#[derive(Debug, Clone)]
pub struct ControlsForm {
    pub transform: TransformKind,
    pub distance: String,
    pub input_crs: String,
    pub export_crs: String,
    pub upload_path: String,
    /// Role given to the next uploaded file.
    pub upload_role: Provenance,
}

impl ControlsForm {
    fn new(settings: &AppSettings) -> Self {
        Self {
            transform: TransformKind::Buffer,
            distance: String::new(),
            input_crs: String::new(),
            export_crs: settings.export_crs.code().to_string(),
            upload_path: String::new(),
            upload_role: Provenance::Primary,
        }
    }

    /// The operation the form describes, if its inputs are valid. Invalid
    /// numbers leave the parameter unset.
    pub fn operation(&self, settings: &AppSettings) -> Option<TransformOperation> {
        match self.transform {
            TransformKind::Buffer => {
                TransformOperation::buffer(positive_integer(&self.distance), settings.buffer_units).ok()
            }
            TransformKind::Erase => Some(TransformOperation::Erase),
            TransformKind::Clip => Some(TransformOperation::Clip),
            TransformKind::Union => Some(TransformOperation::Union),
        }
    }

    pub fn export_crs(&self) -> Option<Crs> {
        Crs::from_input(&self.export_crs)
    }

    pub fn input_crs(&self) -> Option<Crs> {
        Crs::from_input(&self.input_crs)
    }
}

pub struct GeoDrawApp {
    session: Session,
    map: MapCanvas,
    draw: DrawLayer,
    renderer: Renderer,
    service: Arc<dyn TransformService>,
    settings: AppSettings,
    form: ControlsForm,
    file_handler: FileHandler,
    transform_task: Option<(u64, InFlight<Reply>)>,
    import_tasks: Vec<(Provenance, InFlight<Reply>)>,
    export_task: Option<(OutputFormat, InFlight<Reply>)>,
}

impl GeoDrawApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, service: Arc<dyn TransformService>) -> Self {
        let settings: AppSettings = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();

        let session = Session::new();
        session.subscribe(Box::new(LoggingEventHandler));

        Self {
            session,
            map: MapCanvas::new(),
            draw: DrawLayer::new(),
            renderer: Renderer::new(),
            service,
            form: ControlsForm::new(&settings),
            settings,
            file_handler: FileHandler::new(),
            transform_task: None,
            import_tasks: Vec::new(),
            export_task: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut AppSettings {
        &mut self.settings
    }

    pub fn form(&self) -> &ControlsForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ControlsForm {
        &mut self.form
    }

    pub fn draw_layer(&self) -> &DrawLayer {
        &self.draw
    }

    pub fn draw_layer_mut(&mut self) -> &mut DrawLayer {
        &mut self.draw
    }

    pub fn map(&self) -> &MapCanvas {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MapCanvas {
        &mut self.map
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn is_transform_pending(&self) -> bool {
        self.transform_task.is_some()
    }

    pub fn start_transform(&mut self, ctx: &egui::Context) {
        let Some(operation) = self.form.operation(&self.settings) else {
            return;
        };
        let ticket = match self.session.begin_transform(&operation) {
            Ok(ticket) => ticket,
            Err(err) => {
                self.show_error(err);
                return;
            }
        };
        let service = Arc::clone(&self.service);
        let request = ticket.request().clone();
        let task = InFlight::spawn("transform", move || service.post_geojson(&request), waker(ctx));
        self.transform_task = Some((ticket.generation(), task));
    }

    pub fn upload(&mut self, file: LoadedFile, ctx: &egui::Context) {
        let provenance = self.form.upload_role;
        let request = match UploadRequest::new(file.format, file.name, file.bytes, self.form.input_crs()) {
            Ok(request) => request,
            Err(err) => {
                self.show_error(err);
                return;
            }
        };
        let ImportTicket { provenance, request } = match self.session.begin_import(request, provenance) {
            Ok(ticket) => ticket,
            Err(err) => {
                self.show_error(err);
                return;
            }
        };
        let service = Arc::clone(&self.service);
        let task = InFlight::spawn("upload", move || service.post_upload(&request), waker(ctx));
        self.import_tasks.push((provenance, task));
    }

    pub fn start_export(&mut self, ctx: &egui::Context) {
        let format = self.settings.export_format;
        let ticket = match self.session.begin_export(format, self.form.export_crs()) {
            Ok(ticket) => ticket,
            Err(err) => {
                self.show_error(err);
                return;
            }
        };
        let service = Arc::clone(&self.service);
        let request = ticket.request;
        let task = InFlight::spawn("export", move || service.post_geojson(&request), waker(ctx));
        self.export_task = Some((ticket.format, task));
    }

    /// Writes the finished export into the configured directory. The file
    /// stays available if saving fails.
    pub fn save_download(&mut self) {
        let Some(download) = self.session.download() else {
            return;
        };
        let dir = self
            .settings
            .export_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();
        let failure = download
            .save_to(&dir)
            .err()
            .map(|err| format!("Failed to save {}: {err}", download.file_name));
        match failure {
            Some(message) => self.show_error(message),
            None => {
                self.session.take_download();
            }
        }
    }

    /// Uploads the file named in the path field.
    pub fn upload_from_path(&mut self, ctx: &egui::Context) {
        let path = std::path::PathBuf::from(self.form.upload_path.trim());
        match file_handler::load_path(&path) {
            Ok(file) => self.upload(file, ctx),
            Err(err) => self.show_error(err),
        }
    }

    pub fn clear_all(&mut self) {
        let Self { session, map, draw, .. } = self;
        session.clear_all(Surfaces { map, draw });
    }

    /// Records a failure that happened before anything was sent.
    pub fn show_error(&mut self, err: impl std::fmt::Display) {
        log::warn!("{err}");
        self.session.set_error_message(err.to_string());
    }

    /// Hands finished worker results back to the session.
    fn poll_tasks(&mut self) {
        let finished = self
            .transform_task
            .as_mut()
            .and_then(|(generation, task)| task.poll().map(|result| (*generation, result)));
        if let Some((generation, result)) = finished {
            self.transform_task = None;
            let reply = result.unwrap_or_else(|_| Err(worker_lost()));
            let Self { session, map, draw, .. } = self;
            if let Err(err) = session.finish_transform(generation, reply, Surfaces { map, draw }) {
                log::debug!("Transform finished with error: {err}");
            }
        }

        let mut index = 0;
        while index < self.import_tasks.len() {
            let Some(result) = self.import_tasks[index].1.poll() else {
                index += 1;
                continue;
            };
            let (provenance, _) = self.import_tasks.remove(index);
            let reply = result.unwrap_or_else(|_| Err(worker_lost()));
            let Self { session, map, draw, .. } = self;
            if let Err(err) = session.finish_import(provenance, reply, Surfaces { map, draw }) {
                log::debug!("Upload finished with error: {err}");
            }
        }

        let finished = self
            .export_task
            .as_mut()
            .and_then(|(format, task)| task.poll().map(|result| (*format, result)));
        if let Some((format, result)) = finished {
            self.export_task = None;
            let reply = result.unwrap_or_else(|_| Err(worker_lost()));
            if let Err(err) = self.session.finish_export(format, reply, Utc::now()) {
                log::debug!("Export finished with error: {err}");
            }
        }
    }

    /// Routes queued drawing events to the session. Echoes of registry
    /// pushes are dropped there.
    fn sync_draw_events(&mut self) {
        for event in self.draw.take_events() {
            let Self { session, map, draw, .. } = self;
            if let Err(err) = session.handle_draw_event(event, Surfaces { map, draw }) {
                log::debug!("Draw sync failed: {err}");
            }
        }
    }
}

fn waker(ctx: &egui::Context) -> impl FnOnce() + Send + 'static {
    let ctx = ctx.clone();
    move || ctx.request_repaint()
}

fn worker_lost() -> ServiceError {
    ServiceError::Transport("the request worker stopped unexpectedly".to_owned())
}

impl eframe::App for GeoDrawApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Some(crs) = self.form.export_crs() {
            self.settings.export_crs = crs;
        }
        eframe::set_value(storage, eframe::APP_KEY, &self.settings);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let dt = std::time::Duration::from_secs_f32(ctx.input(|i| i.stable_dt).min(0.1));

        self.poll_tasks();

        if self.file_handler.check_for_dropped_files(ctx) {
            for loaded in self.file_handler.take_dropped_files() {
                match loaded {
                    Ok(file) => self.upload(file, ctx),
                    Err(err) => self.show_error(err),
                }
            }
        }

        panels::controls_panel(self, ctx);
        panels::status_panel(self, ctx);
        panels::central_panel(self, ctx);

        self.sync_draw_events();

        self.session.tick(dt, &mut self.map);
        self.map.advance(dt);
        self.session.on_camera_moved(self.map.center());

        self.file_handler.preview_files_being_dropped(ctx);

        if self.session.camera().is_rotating() || self.map.is_animating() || self.has_pending_work() {
            ctx.request_repaint();
        }
    }
}

impl GeoDrawApp {
    fn has_pending_work(&self) -> bool {
        self.transform_task.is_some() || !self.import_tasks.is_empty() || self.export_task.is_some()
    }
}
