use std::ops::RangeInclusive;

use eframe::egui::{self, Ui};
use livegraph::{GraphStore, SimulationConfig};

use super::super::LiveGraphApp;

#[derive(Default)]
pub(in crate::app) struct AttributeTable {
    revision: Option<u64>,
    rows: Vec<(String, String)>,
}

impl AttributeTable {
    pub(in crate::app) fn refresh(&mut self, store: &GraphStore) -> bool {
        let revision = store.revision();
        if self.revision == Some(revision) {
            return false;
        }

        self.revision = Some(revision);
        self.rows = store
            .graph_attributes()
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect();
        true
    }
}

fn config_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hover: &str,
) -> bool {
    ui.add(
        egui::Slider::new(value, range)
            .text(text)
            .clamping(egui::SliderClamping::Always),
    )
    .on_hover_text(hover)
    .changed()
}

impl LiveGraphApp {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Layout");
        ui.separator();
        ui.add_space(4.0);

        let mut config = self.settings.config;
        let mut changed = false;

        ui.label("Defaults for entities without overrides");
        changed |= config_slider(
            ui,
            &mut config.charge,
            -1500.0..=0.0,
            "Charge",
            "Charge of nodes without a `charge` attribute. Negative values repel.",
        );
        changed |= config_slider(
            ui,
            &mut config.link_distance,
            1.0..=300.0,
            "Link distance",
            "Rest length of links without a `distance` attribute.",
        );
        changed |= config_slider(
            ui,
            &mut config.link_strength,
            0.0..=1.0,
            "Link strength",
            "Stiffness of links without a `strength` attribute.",
        );

        ui.collapsing("Simulation tuning", |ui| {
            changed |= config_slider(
                ui,
                &mut config.gravity,
                0.0..=1.0,
                "Gravity",
                "Pull toward the canvas center.",
            );
            changed |= config_slider(
                ui,
                &mut config.friction,
                0.0..=0.99,
                "Friction",
                "Share of velocity kept from one tick to the next.",
            );
            changed |= config_slider(
                ui,
                &mut config.theta,
                0.1..=1.5,
                "Theta",
                "Barnes–Hut accuracy. Lower is more exact and slower.",
            );
            changed |= config_slider(
                ui,
                &mut config.alpha_decay,
                0.9..=0.999,
                "Cooling",
                "Alpha is multiplied by this every tick.",
            );
        });

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if ui.button("Reheat").clicked() {
                self.widget.restart();
            }
            if ui.button("Reset defaults").clicked() {
                config = SimulationConfig::default();
                changed = true;
            }
        });

        if changed {
            self.set_config(config);
        }

        ui.separator();
        self.draw_simulation_status(ui);
    }

    fn draw_simulation_status(&self, ui: &mut Ui) {
        let simulation = self.widget.simulation();
        if simulation.is_running() {
            ui.label(format!("alpha: {:.4}", simulation.alpha()));
        } else {
            ui.label("layout at rest");
        }

        if let Some(tick) = self.last_tick.get() {
            ui.label(format!("tick {}: energy {:.5}", tick.tick, tick.kinetic_energy));
        }
        ui.label(format!("ticks run: {}", simulation.ticks()));

        let rows = &self.attribute_table.rows;
        if !rows.is_empty() {
            ui.separator();
            ui.label("Graph attributes");
            egui::Grid::new("graph_attributes")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    for (key, value) in rows {
                        ui.label(key.as_str());
                        ui.label(value.as_str());
                        ui.end_row();
                    }
                });
        }
    }
}
