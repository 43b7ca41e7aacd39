use crate::GeoDrawApp;
use crate::components::ToolButton;
use crate::draw_layer::DrawMode;
use crate::exchange::Slot;
use crate::feature::Provenance;
use crate::transform::{BufferUnits, OutputFormat, TransformKind};

pub fn controls_panel(app: &mut GeoDrawApp, ctx: &egui::Context) {
    egui::SidePanel::left("controls_panel")
        .resizable(true)
        .default_width(260.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                draw_section(app, ui);
                ui.separator();
                transform_section(app, ui, ctx);
                ui.separator();
                upload_section(app, ui, ctx);
                ui.separator();
                export_section(app, ui, ctx);
                error_section(app, ui);
            });
        });
}

fn draw_section(app: &mut GeoDrawApp, ui: &mut egui::Ui) {
    ui.heading("Draw");
    let active = app.draw_layer().mode();
    ui.horizontal(|ui| {
        for mode in DrawMode::ALL {
            if ToolButton::new(mode, active == mode).show(ui).clicked() {
                log::info!("Tool selected from UI: {}", mode.name());
                app.draw_layer_mut().set_mode(mode);
            }
        }
    });
    ui.horizontal(|ui| {
        if ui.button("Finish shape").clicked() {
            app.draw_layer_mut().finish_shape();
        }
        let has_selection = app.draw_layer().selected().is_some();
        if ui.add_enabled(has_selection, egui::Button::new("Delete")).clicked() {
            app.draw_layer_mut().delete_selected();
        }
        if ui.button("Clear all").clicked() {
            app.clear_all();
        }
    });
}

fn transform_section(app: &mut GeoDrawApp, ui: &mut egui::Ui, ctx: &egui::Context) {
    ui.heading("Transform");

    let mut kind = app.form().transform;
    egui::ComboBox::from_id_salt("transform_kind")
        .selected_text(kind.to_string())
        .show_ui(ui, |ui| {
            for option in TransformKind::ALL {
                ui.selectable_value(&mut kind, option, option.to_string());
            }
        });
    app.form_mut().transform = kind;

    match kind {
        TransformKind::Buffer => {
            ui.horizontal(|ui| {
                ui.label("Distance");
                ui.text_edit_singleline(&mut app.form_mut().distance);
            });
            let mut units = app.settings().buffer_units;
            egui::ComboBox::from_id_salt("buffer_units")
                .selected_text(units.label())
                .show_ui(ui, |ui| {
                    for option in BufferUnits::ALL {
                        ui.selectable_value(&mut units, option, option.label());
                    }
                });
            app.settings_mut().buffer_units = units;
        }
        TransformKind::Erase | TransformKind::Clip => {
            if let Some(role) = kind.operand_role() {
                let count = app.session().registry().operand_len(role);
                ui.label(format!("{} operand features: {count}", role_label(role)));
                if count == 0 {
                    ui.weak("Upload an operand file below.");
                }
            }
        }
        TransformKind::Union => {}
    }

    let operation = app.form().operation(app.settings());
    let enabled = !app.is_transform_pending()
        && operation.is_some_and(|op| app.session().can_transform(&op));
    ui.horizontal(|ui| {
        if ui.add_enabled(enabled, egui::Button::new("Apply")).clicked() {
            app.start_transform(ctx);
        }
        if app.is_transform_pending() {
            ui.spinner();
        }
    });
}

fn upload_section(app: &mut GeoDrawApp, ui: &mut egui::Ui, ctx: &egui::Context) {
    ui.heading("Upload");

    let mut role = app.form().upload_role;
    ui.horizontal(|ui| {
        for option in Provenance::ALL {
            ui.radio_value(&mut role, option, role_label(option));
        }
    });
    app.form_mut().upload_role = role;

    ui.horizontal(|ui| {
        ui.label("Input EPSG (DXF)");
        ui.text_edit_singleline(&mut app.form_mut().input_crs);
    });
    ui.horizontal(|ui| {
        ui.text_edit_singleline(&mut app.form_mut().upload_path)
            .on_hover_text("Path to a .zip, .dxf or .gpkg file");
        let busy = app.session().is_slot_pending(Slot::for_import(role));
        let has_path = !app.form().upload_path.trim().is_empty();
        if ui.add_enabled(has_path && !busy, egui::Button::new("Upload")).clicked() {
            app.upload_from_path(ctx);
        }
        if busy {
            ui.spinner();
        }
    });
    ui.weak("Files can also be dropped onto the window.");
}

fn export_section(app: &mut GeoDrawApp, ui: &mut egui::Ui, ctx: &egui::Context) {
    ui.heading("Export");

    let mut format = app.settings().export_format;
    egui::ComboBox::from_id_salt("export_format")
        .selected_text(format.label())
        .show_ui(ui, |ui| {
            for option in OutputFormat::ALL {
                ui.selectable_value(&mut format, option, option.label());
            }
        });
    app.settings_mut().export_format = format;

    ui.horizontal(|ui| {
        ui.label("Output EPSG");
        ui.text_edit_singleline(&mut app.form_mut().export_crs);
    });

    let output_crs = app.form().export_crs();
    ui.horizontal(|ui| {
        if ui
            .add_enabled(app.session().can_export(output_crs), egui::Button::new("Export"))
            .clicked()
        {
            app.start_export(ctx);
        }
        if app.session().is_slot_pending(Slot::Export) {
            ui.spinner();
        }
    });

    if let Some(file_name) = app.session().download().map(|d| d.file_name.clone()) {
        if ui.button(format!("Save {file_name}")).clicked() {
            app.save_download();
        }
    }
}

fn error_section(app: &mut GeoDrawApp, ui: &mut egui::Ui) {
    let Some(message) = app.session().error_message().map(str::to_owned) else {
        return;
    };
    ui.separator();
    ui.colored_label(ui.visuals().error_fg_color, message);
    if ui.small_button("Dismiss").clicked() {
        app.session_mut().dismiss_error();
    }
}

fn role_label(role: Provenance) -> &'static str {
    match role {
        Provenance::Primary => "Primary",
        Provenance::EraseOperand => "Erase",
        Provenance::ClipOperand => "Clip",
    }
}
