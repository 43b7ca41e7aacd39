use crate::GeoDrawApp;
use crate::layers::COMBINED_SOURCE_ID;

pub fn central_panel(app: &mut GeoDrawApp, ctx: &egui::Context) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none())
        .show(ctx, |ui| {
            let canvas_rect = ui.available_rect_before_wrap();
            let response = ui.allocate_rect(canvas_rect, egui::Sense::click_and_drag());
            app.map_mut().set_viewport(canvas_rect);

            // Any press on the map counts as interaction, before it turns into a click or drag.
            if response.hovered() && ui.input(|i| i.pointer.any_pressed()) {
                app.session_mut().on_user_interaction();
            }

            if let Some(projection) = app.map().projection() {
                let consumed = app.draw_layer_mut().handle_input(&response, &projection);
                if !consumed && response.dragged() {
                    app.map_mut().pan_by(response.drag_delta());
                }
            }
            if response.hovered() {
                let scroll = ui.input(|i| i.smooth_scroll_delta.y);
                if scroll != 0.0 {
                    app.session_mut().on_user_interaction();
                    app.map_mut().zoom_by_scroll(scroll);
                }
                if ui.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
                    app.draw_layer_mut().delete_selected();
                }
                if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    app.draw_layer_mut().finish_shape();
                }
                if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                    app.draw_layer_mut().cancel_shape();
                }
            }

            // Render the map
            let Some(projection) = app.map().projection() else {
                return;
            };
            let painter = ui.painter_at(canvas_rect);
            let empty = Default::default();
            let source = app.map().source(COMBINED_SOURCE_ID).unwrap_or(&empty);
            app.renderer().render(&painter, &projection, source);
            app.draw_layer().render(&painter, &projection, app.renderer());
        });
}
