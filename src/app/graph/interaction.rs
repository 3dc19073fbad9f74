use eframe::egui::{self, PointerButton, Rect, Ui};

use super::super::LiveGraphApp;
use super::super::render_utils::Viewport;

impl LiveGraphApp {
    pub(in crate::app) fn viewport(&self, rect: Rect) -> Viewport {
        Viewport {
            rect,
            pan: self.pan,
            zoom: self.zoom,
            origin: self.widget.simulation().center(),
        }
    }

    pub(in crate::app) fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = self.viewport(rect).to_world(pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.1, 8.0);

        let world_after = self.viewport(rect).to_world(pointer);
        self.pan += (world_after - world_before) * self.zoom;
    }

    pub(in crate::app) fn handle_graph_drag(&mut self, rect: Rect, response: &egui::Response) {
        let viewport = self.viewport(rect);

        if response.drag_started_by(PointerButton::Primary) {
            self.dragging = response
                .interact_pointer_pos()
                .and_then(|pointer| self.widget.reconciler().node_at(viewport.to_world(pointer)))
                .map(|element| element.id.clone());
        }

        match &self.dragging {
            Some(id) if response.dragged_by(PointerButton::Primary) => {
                if let Some(pointer) = response.interact_pointer_pos() {
                    self.widget
                        .pin_node(id.as_str(), viewport.to_world(pointer).to_vec2());
                }
            }
            _ if response.dragged() => self.pan += response.drag_delta(),
            _ => {}
        }

        if response.drag_stopped()
            && let Some(id) = self.dragging.take()
        {
            self.widget.release_node(id.as_str());
        }
    }

    pub(in crate::app) fn update_hover(&mut self, ui: &Ui, rect: Rect) {
        let viewport = self.viewport(rect);
        self.hovered = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))
            .and_then(|pointer| self.widget.reconciler().node_at(viewport.to_world(pointer)))
            .map(|element| element.id.clone());
    }
}
