mod style;

use std::collections::HashMap;

use eframe::egui::{Color32, Pos2, Vec2, vec2};
use tracing::trace;

use crate::graph::{Dimension, GraphStore, LinkKey, Node, NodeId};
pub use style::{
    DEFAULT_EDGE_STROKE, DEFAULT_EDGE_STROKE_WIDTH, DEFAULT_FONT_SIZE, DEFAULT_LABEL_COLOR,
    DEFAULT_LABEL_DX, DEFAULT_LABEL_DY, DEFAULT_NODE_STROKE, DEFAULT_NODE_STROKE_WIDTH,
    DEFAULT_RADIUS, Palette, parse_color,
};

#[derive(Clone, Debug, PartialEq)]
pub struct CircleStyle {
    pub radius: f32,
    pub fill: Color32,
    pub stroke: Color32,
    pub stroke_width: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelStyle {
    pub text: String,
    /// Pixels.
    pub font_size: f32,
    pub color: Color32,
    pub offset: Vec2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeElement {
    pub id: NodeId,
    pub position: Pos2,
    pub circle: CircleStyle,
    pub label: LabelStyle,
}

impl NodeElement {
    fn enter(node: &Node) -> Self {
        Self {
            id: node.id().clone(),
            position: node.position().to_pos2(),
            circle: CircleStyle {
                radius: DEFAULT_RADIUS,
                fill: Color32::TRANSPARENT,
                stroke: DEFAULT_NODE_STROKE,
                stroke_width: DEFAULT_NODE_STROKE_WIDTH,
            },
            label: LabelStyle {
                text: String::new(),
                font_size: DEFAULT_FONT_SIZE.to_px(),
                color: DEFAULT_LABEL_COLOR,
                offset: vec2(DEFAULT_LABEL_DX, DEFAULT_LABEL_DY),
            },
        }
    }

    pub fn contains(&self, point: Pos2) -> bool {
        self.position.distance(point) <= self.circle.radius
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeElement {
    pub key: LinkKey,
    pub from: Pos2,
    pub to: Pos2,
    pub stroke: Color32,
    pub stroke_width: f32,
}

impl EdgeElement {
    fn enter(key: LinkKey) -> Self {
        Self {
            key,
            from: Pos2::ZERO,
            to: Pos2::ZERO,
            stroke: DEFAULT_EDGE_STROKE,
            stroke_width: DEFAULT_EDGE_STROKE_WIDTH.to_px(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResyncReport {
    pub entered: usize,
    pub exited: usize,
}

impl ResyncReport {
    pub fn is_unchanged(&self) -> bool {
        self.entered == 0 && self.exited == 0
    }
}

#[derive(Debug, Default)]
pub struct RenderReconciler {
    nodes: Vec<NodeElement>,
    edges: Vec<EdgeElement>,
    node_slots: HashMap<NodeId, usize>,
    edge_slots: HashMap<LinkKey, usize>,
    palette: Palette,
}

impl RenderReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resync(&mut self, graph: &GraphStore) -> ResyncReport {
        let mut report = ResyncReport::default();

        let mut previous_nodes = self
            .nodes
            .drain(..)
            .map(|element| (element.id.clone(), element))
            .collect::<HashMap<_, _>>();
        for node in graph.nodes() {
            let element = previous_nodes.remove(node.id()).unwrap_or_else(|| {
                report.entered += 1;
                NodeElement::enter(node)
            });
            self.nodes.push(element);
        }
        report.exited += previous_nodes.len();

        let mut previous_edges = self
            .edges
            .drain(..)
            .map(|element| (element.key.clone(), element))
            .collect::<HashMap<_, _>>();
        for link in graph.links() {
            let element = previous_edges.remove(link.key()).unwrap_or_else(|| {
                report.entered += 1;
                EdgeElement::enter(link.key().clone())
            });
            self.edges.push(element);
        }
        report.exited += previous_edges.len();

        self.node_slots = self
            .nodes
            .iter()
            .enumerate()
            .map(|(slot, element)| (element.id.clone(), slot))
            .collect();
        self.edge_slots = self
            .edges
            .iter()
            .enumerate()
            .map(|(slot, element)| (element.key.clone(), slot))
            .collect();

        self.apply_tick(graph);
        trace!(
            entered = report.entered,
            exited = report.exited,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "render elements resynced"
        );
        report
    }

    pub fn apply_tick(&mut self, graph: &GraphStore) {
        self.apply_styles(graph);
        self.apply_positions(graph);
    }

    pub fn apply_styles(&mut self, graph: &GraphStore) {
        for node in graph.nodes() {
            let Some(&slot) = self.node_slots.get(node.id()) else {
                continue;
            };
            let attributes = node.attributes();
            let element = &mut self.nodes[slot];

            element.circle.radius = extent(attributes.r, DEFAULT_RADIUS);
            element.circle.fill = match attributes.fill.as_deref().and_then(parse_color) {
                Some(fill) => fill,
                None => self.palette.color_for(attributes.group.as_deref()),
            };
            element.circle.stroke = attributes
                .stroke
                .as_deref()
                .and_then(parse_color)
                .unwrap_or(DEFAULT_NODE_STROKE);
            element.circle.stroke_width =
                extent(attributes.strokewidth, DEFAULT_NODE_STROKE_WIDTH);

            element.label.text = attributes.label.clone().unwrap_or_default();
            element.label.font_size = extent(attributes.font_size, DEFAULT_FONT_SIZE.to_px());
            element.label.color = attributes
                .color
                .as_deref()
                .and_then(parse_color)
                .unwrap_or(DEFAULT_LABEL_COLOR);
            element.label.offset = vec2(
                offset(attributes.dx, DEFAULT_LABEL_DX),
                offset(attributes.dy, DEFAULT_LABEL_DY),
            );
        }

        for link in graph.links() {
            let Some(&slot) = self.edge_slots.get(link.key()) else {
                continue;
            };
            let attributes = link.attributes();
            let element = &mut self.edges[slot];

            element.stroke = attributes
                .stroke
                .as_deref()
                .and_then(parse_color)
                .unwrap_or(DEFAULT_EDGE_STROKE);
            element.stroke_width =
                extent(attributes.strokewidth, DEFAULT_EDGE_STROKE_WIDTH.to_px());
        }
    }

    pub fn apply_positions(&mut self, graph: &GraphStore) {
        for node in graph.nodes() {
            if let Some(&slot) = self.node_slots.get(node.id()) {
                self.nodes[slot].position = node.position().to_pos2();
            }
        }

        for element in &mut self.edges {
            let endpoint = |id: &NodeId| {
                self.node_slots
                    .get(id)
                    .map(|&slot| self.nodes[slot].position)
            };
            if let (Some(from), Some(to)) = (endpoint(&element.key.source), endpoint(&element.key.target)) {
                element.from = from;
                element.to = to;
            }
        }
    }

    /// Node elements, to be drawn after `edges`.
    pub fn nodes(&self) -> &[NodeElement] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeElement] {
        &self.edges
    }

    pub fn node_element(&self, id: &str) -> Option<&NodeElement> {
        self.node_slots.get(id).map(|&slot| &self.nodes[slot])
    }

    pub fn edge_element(&self, source: &str, target: &str) -> Option<&EdgeElement> {
        self.edge_slots
            .get(&LinkKey::new(source, target))
            .map(|&slot| &self.edges[slot])
    }

    pub fn node_at(&self, point: Pos2) -> Option<&NodeElement> {
        self.nodes.iter().rev().find(|element| element.contains(point))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

fn extent(length: Option<Dimension>, fallback: f32) -> f32 {
    length
        .map(Dimension::to_px)
        .filter(|px| px.is_finite() && *px >= 0.0)
        .unwrap_or(fallback)
}

fn offset(length: Option<Dimension>, fallback: f32) -> f32 {
    length
        .map(Dimension::to_px)
        .filter(|px| px.is_finite())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;
    use serde_json::json;

    use super::*;
    use crate::graph::{LinkAttributes, NodeAttributes};

    fn attrs(value: serde_json::Value) -> NodeAttributes {
        NodeAttributes::from_value(Some(&value))
    }

    #[test]
    fn radius_falls_back_to_default() {
        let mut graph = GraphStore::new();
        graph.upsert_node("plain", NodeAttributes::default());
        graph.upsert_node("big", attrs(json!({"r": 20})));
        let mut reconciler = RenderReconciler::new();
        reconciler.resync(&graph);

        assert_eq!(reconciler.node_element("plain").map(|e| e.circle.radius), Some(8.0));
        assert_eq!(reconciler.node_element("big").map(|e| e.circle.radius), Some(20.0));
    }

    #[test]
    fn resync_reports_enter_and_exit() {
        let mut graph = GraphStore::new();
        graph.upsert_link("a", "b", LinkAttributes::default());
        let mut reconciler = RenderReconciler::new();

        assert_eq!(
            reconciler.resync(&graph),
            ResyncReport {
                entered: 3,
                exited: 0
            }
        );
        assert!(reconciler.resync(&graph).is_unchanged());

        graph.remove_node("a");
        graph.upsert_node("c", NodeAttributes::default());
        assert_eq!(
            reconciler.resync(&graph),
            ResyncReport {
                entered: 1,
                exited: 2
            }
        );
        let ids = reconciler
            .nodes()
            .iter()
            .map(|element| element.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["b", "c"]);
        assert!(reconciler.edges().is_empty());
    }

    #[test]
    fn kept_elements_pick_up_new_styles() {
        let mut graph = GraphStore::new();
        graph.upsert_node("a", NodeAttributes::default());
        let mut reconciler = RenderReconciler::new();
        reconciler.resync(&graph);

        graph.upsert_node("a", attrs(json!({"fill": "#ff0000", "label": "A", "dy": 0})));
        reconciler.apply_tick(&graph);

        let Some(element) = reconciler.node_element("a") else {
            panic!("element should exist");
        };
        assert_eq!(element.circle.fill, Color32::from_rgb(255, 0, 0));
        assert_eq!(element.label.text, "A");
        assert_eq!(element.label.offset, vec2(0.0, 0.0));
    }

    #[test]
    fn unset_attributes_use_documented_defaults() {
        let mut graph = GraphStore::new();
        graph.upsert_link("a", "b", LinkAttributes::default());
        graph.upsert_node("a", attrs(json!({"stroke": "not-a-color"})));
        let mut reconciler = RenderReconciler::new();
        reconciler.resync(&graph);

        let Some(node) = reconciler.node_element("a") else {
            panic!("node element should exist");
        };
        assert_eq!(node.circle.stroke, Color32::WHITE);
        assert_eq!(node.circle.stroke_width, 1.0);
        assert_eq!(node.label.text, "");
        assert!((node.label.font_size - 11.0 * 4.0 / 3.0).abs() < 1e-4);
        assert_eq!(node.label.color, Color32::WHITE);
        assert_eq!(node.label.offset, vec2(0.0, 5.0));

        let Some(edge) = reconciler.edge_element("a", "b") else {
            panic!("edge element should exist");
        };
        assert_eq!(edge.stroke, Color32::from_rgb(0x99, 0x99, 0x99));
        assert_eq!(edge.stroke_width, 1.5);
    }

    #[test]
    fn unusable_lengths_fall_back_to_defaults() {
        let mut graph = GraphStore::new();
        graph.upsert_link(
            "a",
            "b",
            LinkAttributes::from_value(Some(&json!({"strokewidth": "-2px"}))),
        );
        graph.upsert_node(
            "a",
            attrs(json!({
                "r": "-3",
                "strokewidth": "-1px",
                "font_size": "3e38pt",
                "dx": "-4",
                "dy": 1e300
            })),
        );
        let mut reconciler = RenderReconciler::new();
        reconciler.resync(&graph);

        let Some(node) = reconciler.node_element("a") else {
            panic!("node element should exist");
        };
        assert_eq!(node.circle.radius, DEFAULT_RADIUS);
        assert_eq!(node.circle.stroke_width, DEFAULT_NODE_STROKE_WIDTH);
        assert_eq!(node.label.font_size, DEFAULT_FONT_SIZE.to_px());
        assert_eq!(node.label.offset, vec2(-4.0, DEFAULT_LABEL_DY));
        assert_eq!(
            reconciler.edge_element("a", "b").map(|edge| edge.stroke_width),
            Some(1.5)
        );
    }

    #[test]
    fn groups_share_palette_colors() {
        let mut graph = GraphStore::new();
        graph.upsert_node("a", attrs(json!({"group": 1})));
        graph.upsert_node("b", attrs(json!({"group": 2})));
        graph.upsert_node("c", attrs(json!({"group": "1"})));
        let mut reconciler = RenderReconciler::new();
        reconciler.resync(&graph);

        let fill = |id: &str| reconciler.node_element(id).map(|e| e.circle.fill);
        assert_eq!(fill("a"), fill("c"));
        assert_ne!(fill("a"), fill("b"));
        assert_eq!(fill("a"), Some(Color32::from_rgb(0x1f, 0x77, 0xb4)));
    }

    #[test]
    fn edges_follow_their_endpoints() {
        let mut graph = GraphStore::new();
        graph.upsert_link("a", "b", LinkAttributes::default());
        for node in graph.nodes_mut() {
            node.body.position = if node.id().as_str() == "a" {
                vec2(10.0, 20.0)
            } else {
                vec2(30.0, 40.0)
            };
        }
        let mut reconciler = RenderReconciler::new();
        reconciler.resync(&graph);

        let Some(edge) = reconciler.edge_element("a", "b") else {
            panic!("edge element should exist");
        };
        assert_eq!((edge.from, edge.to), (pos2(10.0, 20.0), pos2(30.0, 40.0)));
        assert_eq!(
            reconciler.node_at(pos2(12.0, 22.0)).map(|e| e.id.as_str()),
            Some("a")
        );
        assert!(reconciler.node_at(pos2(100.0, 100.0)).is_none());
    }
}
