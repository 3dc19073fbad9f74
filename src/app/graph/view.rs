use eframe::egui::{Align2, Color32, FontId, Sense, Stroke, Ui};

use super::super::LiveGraphApp;
use super::super::render_utils::{blend_color, draw_background};

const HOVER_RING: Color32 = Color32::from_rgb(255, 214, 102);

impl LiveGraphApp {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_drag(rect, &response);
        self.update_hover(ui, rect);

        let viewport = self.viewport(rect);
        let painter = ui.painter_at(rect);
        draw_background(&painter, viewport, self.widget.simulation().size());

        let reconciler = self.widget.reconciler();
        for edge in reconciler.edges() {
            let from = viewport.to_screen(edge.from);
            let to = viewport.to_screen(edge.to);
            let width = viewport.scale(edge.stroke_width).max(0.5);
            if !viewport.segment_visible(from, to, width) {
                continue;
            }
            painter.line_segment([from, to], Stroke::new(width, edge.stroke));
        }

        for node in reconciler.nodes() {
            let center = viewport.to_screen(node.position);
            let radius = viewport.scale(node.circle.radius);
            if !viewport.circle_visible(center, radius) {
                continue;
            }

            let hovered = self.hovered.as_ref() == Some(&node.id);
            let stroke = if hovered {
                Stroke::new(
                    viewport.scale(node.circle.stroke_width).max(1.5),
                    blend_color(node.circle.stroke, HOVER_RING, 0.7),
                )
            } else {
                Stroke::new(viewport.scale(node.circle.stroke_width), node.circle.stroke)
            };
            painter.circle(center, radius, node.circle.fill, stroke);

            if !node.label.text.is_empty() {
                painter.text(
                    center + node.label.offset * viewport.zoom,
                    Align2::CENTER_BOTTOM,
                    &node.label.text,
                    FontId::proportional(viewport.scale(node.label.font_size).max(1.0)),
                    node.label.color,
                );
            }
        }

        if let Some(id) = &self.hovered {
            response.on_hover_text(id.as_str());
        }

        if self.dragging.is_some() {
            ui.ctx().request_repaint();
        }
    }
}
