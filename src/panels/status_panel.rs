use crate::GeoDrawApp;

/// Map centre and active feature count, bottom-left over the map.
pub fn status_panel(app: &mut GeoDrawApp, ctx: &egui::Context) {
    egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let center = app.session().camera().center();
            ui.label(format!("Lat: {:.2}", center.lat));
            ui.label(format!("Lng: {:.2}", center.lng));
            ui.separator();
            ui.label(format!("Features: {}", app.session().registry().len()));
            if app.is_transform_pending() {
                ui.separator();
                ui.spinner();
                ui.label("Transforming...");
            }
        });
    });
}
