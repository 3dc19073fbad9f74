use eframe::egui::{self, Align, Context, Layout, RichText, Vec2};

use super::super::{FeedStatus, LiveGraphApp};

impl LiveGraphApp {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("livegraph");
                    ui.separator();
                    if let Some(name) = self
                        .widget
                        .store()
                        .graph_attributes()
                        .get("name")
                        .and_then(|name| name.as_str())
                    {
                        ui.label(RichText::new(name).strong());
                        ui.separator();
                    }
                    ui.label(format!("source: {}", self.settings.input.describe()));
                    ui.label(format!("nodes: {}", self.widget.store().node_count()));
                    ui.label(format!("links: {}", self.widget.store().link_count()));
                    ui.label(format!("events: {}", self.applied));
                    if self.dropped > 0 {
                        ui.label(
                            RichText::new(format!("dropped: {}", self.dropped))
                                .color(ui.visuals().warn_fg_color),
                        );
                    }

                    let replay = ui
                        .add_enabled(
                            self.settings.input.can_replay(),
                            egui::Button::new("Replay"),
                        )
                        .on_hover_text("Clear the graph and read the event file again.");
                    if replay.clicked() {
                        self.replay(ctx);
                    }
                    if ui.button("Fit").clicked() {
                        self.pan = Vec2::ZERO;
                        self.zoom = 1.0;
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        self.draw_feed_status(ui);
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.widget.store().is_empty() && matches!(self.status, FeedStatus::Streaming) {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Waiting for update events...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }

    fn draw_feed_status(&self, ui: &mut egui::Ui) {
        match &self.status {
            FeedStatus::Streaming => {
                ui.spinner();
                ui.label("streaming");
            }
            FeedStatus::Finished { lines } => {
                ui.label(format!("stream ended after {lines} lines"));
            }
            FeedStatus::Failed(error) => {
                ui.label(RichText::new(error.as_str()).color(ui.visuals().error_fg_color));
            }
        }
    }
}
