use std::collections::HashMap;

use eframe::egui::Vec2;
use serde_json::{Map, Value};

use super::attributes::{LinkAttributes, NodeAttributes};
use super::{LinkKey, NodeId};

/// Simulation-owned kinematic state of a node. Velocity is implicit in the
/// difference between `position` and `previous`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub previous: Vec2,
    pub pinned: bool,
    pub placed: bool,
}

#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    attributes: NodeAttributes,
    pub(crate) body: Body,
}

impl Node {
    fn new(id: NodeId, attributes: NodeAttributes) -> Self {
        Self {
            id,
            attributes,
            body: Body::default(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn attributes(&self) -> &NodeAttributes {
        &self.attributes
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.body.position - self.body.previous
    }
}

#[derive(Clone, Debug)]
pub struct Link {
    key: LinkKey,
    attributes: LinkAttributes,
}

impl Link {
    pub fn key(&self) -> &LinkKey {
        &self.key
    }

    pub fn source(&self) -> &NodeId {
        &self.key.source
    }

    pub fn target(&self) -> &NodeId {
        &self.key.target
    }

    pub fn attributes(&self) -> &LinkAttributes {
        &self.attributes
    }
}

#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    links: Vec<Link>,
    node_index: HashMap<NodeId, usize>,
    link_index: HashMap<LinkKey, usize>,
    graph_attributes: Map<String, Value>,
    revision: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_node(&mut self, id: impl Into<NodeId>, attributes: NodeAttributes) -> &Node {
        let index = self.ensure_node(id.into());
        self.nodes[index].attributes.merge(attributes);
        self.revision = self.revision.wrapping_add(1);
        &self.nodes[index]
    }

    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(&index) = self.node_index.get(id) else {
            return false;
        };

        self.remove_links_touching(id);
        self.nodes.remove(index);
        self.reindex_nodes();
        self.revision = self.revision.wrapping_add(1);
        true
    }

    pub fn upsert_link(
        &mut self,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        attributes: LinkAttributes,
    ) -> &Link {
        let key = LinkKey::new(source, target);
        self.ensure_node(key.source.clone());
        self.ensure_node(key.target.clone());

        let index = match self.link_index.get(&key) {
            Some(&index) => index,
            None => {
                let index = self.links.len();
                self.link_index.insert(key.clone(), index);
                self.links.push(Link {
                    key,
                    attributes: LinkAttributes::default(),
                });
                index
            }
        };

        self.links[index].attributes.merge(attributes);
        self.revision = self.revision.wrapping_add(1);
        &self.links[index]
    }

    pub fn remove_links_from(&mut self, source: &str) -> usize {
        self.retain_links(|link| link.key.source.as_str() != source)
    }

    pub fn remove_links_touching(&mut self, id: &str) -> usize {
        self.retain_links(|link| !link.key.touches(id))
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&index| &self.nodes[index])
    }

    pub fn find_link(&self, source: &str, target: &str) -> Option<&Link> {
        self.link_index
            .get(&LinkKey::new(source, target))
            .map(|&index| &self.links[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn graph_attributes(&self) -> &Map<String, Value> {
        &self.graph_attributes
    }

    pub fn set_graph_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.graph_attributes.insert(key.into(), value);
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn remove_graph_attribute(&mut self, key: &str) -> Option<Value> {
        let removed = self.graph_attributes.remove(key);
        if removed.is_some() {
            self.revision = self.revision.wrapping_add(1);
        }
        removed
    }

    // Positions are the only node state handed out mutably.
    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    fn ensure_node(&mut self, id: NodeId) -> usize {
        if let Some(&index) = self.node_index.get(&id) {
            return index;
        }

        let index = self.nodes.len();
        self.node_index.insert(id.clone(), index);
        self.nodes.push(Node::new(id, NodeAttributes::default()));
        index
    }

    fn retain_links(&mut self, mut keep: impl FnMut(&Link) -> bool) -> usize {
        let before = self.links.len();
        self.links.retain(|link| keep(link));
        let removed = before - self.links.len();
        if removed > 0 {
            self.reindex_links();
            self.revision = self.revision.wrapping_add(1);
        }
        removed
    }

    fn reindex_nodes(&mut self) {
        self.node_index.clear();
        for (index, node) in self.nodes.iter().enumerate() {
            self.node_index.insert(node.id.clone(), index);
        }
    }

    fn reindex_links(&mut self) {
        self.link_index.clear();
        for (index, link) in self.links.iter().enumerate() {
            self.link_index.insert(link.key.clone(), index);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::graph::Dimension;

    fn node_attrs(value: serde_json::Value) -> NodeAttributes {
        NodeAttributes::from_value(Some(&value))
    }

    fn link_attrs(value: serde_json::Value) -> LinkAttributes {
        LinkAttributes::from_value(Some(&value))
    }

    fn assert_consistent(store: &GraphStore) {
        let ids = store
            .nodes()
            .iter()
            .map(|node| node.id().clone())
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), store.node_count(), "node ids must be unique");

        let mut keys = HashSet::new();
        for link in store.links() {
            assert!(ids.contains(link.source()), "dangling source in {}", link.key());
            assert!(ids.contains(link.target()), "dangling target in {}", link.key());
            assert!(keys.insert(link.key().clone()), "duplicate link {}", link.key());
        }

        for (index, node) in store.nodes().iter().enumerate() {
            assert_eq!(store.index_of(node.id().as_str()), Some(index));
        }
        for link in store.links() {
            let found = store
                .find_link(link.source().as_str(), link.target().as_str())
                .map(|found| found.key().clone());
            assert_eq!(found.as_ref(), Some(link.key()));
        }
    }

    #[test]
    fn upsert_node_is_idempotent() {
        let mut store = GraphStore::new();
        store.upsert_node("a", node_attrs(json!({ "r": 20, "label": "A" })));
        let once = store.find_node("a").map(|node| node.attributes().clone());
        store.upsert_node("a", node_attrs(json!({ "r": 20, "label": "A" })));
        let twice = store.find_node("a").map(|node| node.attributes().clone());

        assert_eq!(once, twice);
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn upsert_node_merges_attributes() {
        let mut store = GraphStore::new();
        store.upsert_node("n", node_attrs(json!({ "a": 1 })));
        let node = store.upsert_node("n", node_attrs(json!({ "b": 2 })));

        assert_eq!(node.attributes().extra.get("a"), Some(&json!(1)));
        assert_eq!(node.attributes().extra.get("b"), Some(&json!(2)));
    }

    #[test]
    fn upsert_link_creates_missing_endpoints() {
        let mut store = GraphStore::new();
        store.upsert_link("X", "Y", LinkAttributes::default());

        assert_eq!(store.node_count(), 2);
        assert!(store.find_node("X").is_some_and(|node| node.attributes().is_empty()));
        assert!(store.find_node("Y").is_some_and(|node| node.attributes().is_empty()));
        assert!(store.find_link("X", "Y").is_some());
        assert!(store.find_link("Y", "X").is_none());
    }

    #[test]
    fn repeated_upsert_link_keeps_one_link_with_merged_attributes() {
        let mut store = GraphStore::new();
        store.upsert_link("s", "t", link_attrs(json!({ "strength": 0.5 })));
        store.upsert_link("s", "t", link_attrs(json!({ "distance": 60 })));
        store.upsert_link("s", "t", link_attrs(json!({ "strength": 0.8 })));

        assert_eq!(store.link_count(), 1);
        let link = store.find_link("s", "t").map(|link| link.attributes().clone());
        assert_eq!(
            link.map(|attributes| (attributes.strength, attributes.distance)),
            Some((Some(0.8), Some(60.0)))
        );
    }

    #[test]
    fn remove_node_cascades_to_links() {
        let mut store = GraphStore::new();
        store.upsert_link("a", "b", LinkAttributes::default());
        store.upsert_link("c", "a", LinkAttributes::default());
        store.upsert_link("b", "c", LinkAttributes::default());

        assert!(store.remove_node("a"));
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.link_count(), 1);
        assert!(store.find_link("b", "c").is_some());
        assert_consistent(&store);
    }

    #[test]
    fn removing_unknown_entities_is_a_no_op() {
        let mut store = GraphStore::new();
        store.upsert_node("a", NodeAttributes::default());
        let revision = store.revision();

        assert!(!store.remove_node("missing"));
        assert_eq!(store.remove_links_from("a"), 0);
        assert_eq!(store.remove_links_touching("missing"), 0);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn remove_links_from_leaves_incoming_links() {
        let mut store = GraphStore::new();
        for target in ["b", "c", "d"] {
            store.upsert_link("a", target, LinkAttributes::default());
        }
        store.upsert_link("b", "a", LinkAttributes::default());

        assert_eq!(store.remove_links_from("a"), 3);
        assert_eq!(store.link_count(), 1);
        assert!(store.find_link("b", "a").is_some());
        assert_eq!(store.node_count(), 4);
        assert_consistent(&store);
    }

    #[test]
    fn adjacent_matches_are_all_removed() {
        let mut store = GraphStore::new();
        store.upsert_link("a", "b", LinkAttributes::default());
        store.upsert_link("a", "c", LinkAttributes::default());
        store.upsert_link("x", "y", LinkAttributes::default());
        store.upsert_link("a", "d", LinkAttributes::default());
        store.upsert_link("a", "e", LinkAttributes::default());

        assert_eq!(store.remove_links_touching("a"), 4);
        assert_eq!(store.link_count(), 1);
        assert_consistent(&store);
    }

    #[test]
    fn nodes_keep_insertion_order_after_removal() {
        let mut store = GraphStore::new();
        for id in ["a", "b", "c", "d"] {
            store.upsert_node(id, NodeAttributes::default());
        }
        store.remove_node("b");

        let ids = store
            .nodes()
            .iter()
            .map(|node| node.id().as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["a", "c", "d"]);
        assert_consistent(&store);
    }

    #[test]
    fn merged_dimension_replaces_previous_value() {
        let mut store = GraphStore::new();
        store.upsert_node("a", node_attrs(json!({ "r": 4 })));
        let node = store.upsert_node("a", node_attrs(json!({ "r": "12px" })));
        assert_eq!(node.attributes().r, Some(Dimension::Px(12.0)));
    }

    #[test]
    fn graph_attributes_are_tracked() {
        let mut store = GraphStore::new();
        store.set_graph_attribute("name", json!("karate"));
        assert_eq!(store.graph_attributes().get("name"), Some(&json!("karate")));
        assert_eq!(store.remove_graph_attribute("name"), Some(json!("karate")));
        assert!(store.graph_attributes().is_empty());
    }

    #[derive(Clone, Debug)]
    enum Op {
        UpsertNode(u8),
        RemoveNode(u8),
        UpsertLink(u8, u8),
        RemoveLinksFrom(u8),
        RemoveLinksTouching(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let id = 0u8..6;
        prop_oneof![
            id.clone().prop_map(Op::UpsertNode),
            id.clone().prop_map(Op::RemoveNode),
            (id.clone(), id.clone()).prop_map(|(source, target)| Op::UpsertLink(source, target)),
            id.clone().prop_map(Op::RemoveLinksFrom),
            id.prop_map(Op::RemoveLinksTouching),
        ]
    }

    fn name(id: u8) -> String {
        format!("n{id}")
    }

    proptest! {
        #[test]
        fn store_never_holds_dangling_or_duplicate_links(
            ops in prop::collection::vec(op_strategy(), 0..80)
        ) {
            let mut store = GraphStore::new();
            for op in &ops {
                match *op {
                    Op::UpsertNode(id) => {
                        store.upsert_node(name(id), NodeAttributes::default());
                    }
                    Op::RemoveNode(id) => {
                        store.remove_node(&name(id));
                        prop_assert!(store.links().iter().all(|link| !link.key().touches(&name(id))));
                    }
                    Op::UpsertLink(source, target) => {
                        store.upsert_link(name(source), name(target), LinkAttributes::default());
                        let matching = store
                            .links()
                            .iter()
                            .filter(|link| {
                                link.source().as_str() == name(source)
                                    && link.target().as_str() == name(target)
                            })
                            .count();
                        prop_assert_eq!(matching, 1);
                    }
                    Op::RemoveLinksFrom(id) => {
                        store.remove_links_from(&name(id));
                        prop_assert!(store.links().iter().all(|link| link.source().as_str() != name(id)));
                    }
                    Op::RemoveLinksTouching(id) => {
                        store.remove_links_touching(&name(id));
                    }
                }
                assert_consistent(&store);
            }
        }
    }
}
