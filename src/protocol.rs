use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::graph::{GraphStore, LinkAttributes, NodeAttributes};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Node,
    Adjacency,
    Graph,
}

impl Scope {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "node" => Some(Self::Node),
            "adjacency" | "adj" => Some(Self::Adjacency),
            "graph" => Some(Self::Graph),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Adjacency => "adjacency",
            Self::Graph => "graph",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Add,
    Set,
    Del,
}

impl Action {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "add" => Some(Self::Add),
            "set" => Some(Self::Set),
            "del" => Some(Self::Del),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Set => "set",
            Self::Del => "del",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed update event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown scope `{0}`")]
    UnknownScope(String),
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("event key must be a string, number or boolean, got {0}")]
    InvalidKey(Value),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(alias = "dict")]
    scope: String,
    action: String,
    key: Value,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateEvent {
    pub scope: Scope,
    pub action: Action,
    pub key: String,
    pub value: Option<Value>,
}

impl UpdateEvent {
    pub fn new(scope: Scope, action: Action, key: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            scope,
            action,
            key: key.into(),
            value,
        }
    }

    pub fn add_node(key: impl Into<String>, value: Value) -> Self {
        Self::new(Scope::Node, Action::Add, key, Some(value))
    }

    pub fn del_node(key: impl Into<String>) -> Self {
        Self::new(Scope::Node, Action::Del, key, None)
    }

    pub fn add_adjacency(key: impl Into<String>, value: Value) -> Self {
        Self::new(Scope::Adjacency, Action::Add, key, Some(value))
    }

    pub fn del_adjacency(key: impl Into<String>) -> Self {
        Self::new(Scope::Adjacency, Action::Del, key, None)
    }

    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        let raw: RawEvent = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let raw = RawEvent::deserialize(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEvent) -> Result<Self, DecodeError> {
        let scope = Scope::parse(&raw.scope).ok_or(DecodeError::UnknownScope(raw.scope))?;
        let action = Action::parse(&raw.action).ok_or(DecodeError::UnknownAction(raw.action))?;
        let key = match raw.key {
            Value::String(key) => key,
            key @ (Value::Number(_) | Value::Bool(_)) => key.to_string(),
            other => return Err(DecodeError::InvalidKey(other)),
        };

        Ok(Self {
            scope,
            action,
            key,
            value: raw.value,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Effects {
    pub resync: bool,
    pub restart: bool,
}

impl Effects {
    pub const ALL: Self = Self {
        resync: true,
        restart: true,
    };
}

#[derive(Debug, Default)]
pub struct ProtocolHandler {
    applied: u64,
    rejected: u64,
}

impl ProtocolHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn receive(&mut self, graph: &mut GraphStore, text: &str) -> Result<Effects, DecodeError> {
        match UpdateEvent::from_json(text) {
            Ok(event) => Ok(self.apply(graph, &event)),
            Err(error) => {
                self.rejected += 1;
                Err(error)
            }
        }
    }

    /// Applies a decoded event. Always asks for a resync and a restart, even
    /// when the event turned out to be a no-op.
    pub fn apply(&mut self, graph: &mut GraphStore, event: &UpdateEvent) -> Effects {
        let key = event.key.as_str();
        match (event.scope, event.action) {
            (Scope::Node, Action::Add | Action::Set) => {
                graph.upsert_node(key, NodeAttributes::from_value(event.value.as_ref()));
            }
            (Scope::Node, Action::Del) => {
                if !graph.remove_node(key) {
                    debug!(node = key, "delete of unknown node ignored");
                }
            }
            (Scope::Adjacency, Action::Add | Action::Set) => match &event.value {
                Some(Value::Object(targets)) => {
                    for (target, attributes) in targets {
                        graph.upsert_link(key, target, LinkAttributes::from_value(Some(attributes)));
                    }
                }
                Some(Value::Null) | None => {}
                Some(other) => {
                    warn!(source = key, payload = %other, "adjacency payload is not an object");
                }
            },
            (Scope::Adjacency, Action::Del) => {
                let removed = graph.remove_links_from(key);
                debug!(source = key, removed, "removed outgoing links");
            }
            (Scope::Graph, Action::Add | Action::Set) => match &event.value {
                Some(value) if !value.is_null() => graph.set_graph_attribute(key, value.clone()),
                _ => {
                    graph.remove_graph_attribute(key);
                }
            },
            (Scope::Graph, Action::Del) => {
                graph.remove_graph_attribute(key);
            }
        }

        self.applied += 1;
        Effects::ALL
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::graph::Dimension;

    #[test]
    fn decodes_the_original_wire_names() {
        let event = UpdateEvent::from_json(
            r#"{"dict": "adj", "action": "add", "key": "a", "value": {"b": {"strength": 0.5}}}"#,
        )
        .unwrap();

        assert_eq!(event.scope, Scope::Adjacency);
        assert_eq!(event.action, Action::Add);
        assert_eq!(event.key, "a");
        assert_eq!(event.value, Some(json!({"b": {"strength": 0.5}})));
    }

    #[test]
    fn scalar_keys_become_strings() {
        let event = UpdateEvent::from_value(json!({
            "scope": "node", "action": "set", "key": 42
        }))
        .unwrap();
        assert_eq!(event.key, "42");
        assert_eq!(event.value, None);
    }

    #[test]
    fn rejects_unknown_scope_action_and_key_shapes() {
        assert!(matches!(
            UpdateEvent::from_value(json!({"scope": "edge", "action": "add", "key": "a"})),
            Err(DecodeError::UnknownScope(scope)) if scope == "edge"
        ));
        assert!(matches!(
            UpdateEvent::from_value(json!({"scope": "node", "action": "upsert", "key": "a"})),
            Err(DecodeError::UnknownAction(action)) if action == "upsert"
        ));
        assert!(matches!(
            UpdateEvent::from_value(json!({"scope": "node", "action": "add", "key": ["a"]})),
            Err(DecodeError::InvalidKey(_))
        ));
        assert!(matches!(
            UpdateEvent::from_json(r#"{"scope": "node", "action": "add"}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(UpdateEvent::from_json("{not json"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn node_events_upsert_and_delete() {
        let mut graph = GraphStore::new();
        let mut handler = ProtocolHandler::new();

        handler.apply(&mut graph, &UpdateEvent::add_node("a", json!({"r": 20, "label": "A"})));
        handler.apply(&mut graph, &UpdateEvent::add_node("a", json!({"fill": "red"})));

        let Some(node) = graph.find_node("a") else {
            panic!("node a should exist");
        };
        assert_eq!(node.attributes().r, Some(Dimension::Px(20.0)));
        assert_eq!(node.attributes().label.as_deref(), Some("A"));
        assert_eq!(node.attributes().fill.as_deref(), Some("red"));

        handler.apply(&mut graph, &UpdateEvent::del_node("a"));
        assert!(graph.is_empty());
        assert_eq!(handler.applied(), 3);
    }

    #[test]
    fn adjacency_events_create_endpoints_and_links() {
        let mut graph = GraphStore::new();
        let mut handler = ProtocolHandler::new();

        handler.apply(
            &mut graph,
            &UpdateEvent::add_adjacency("a", json!({"b": {"distance": 80}, "c": {}})),
        );

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.link_count(), 2);
        assert_eq!(
            graph.find_link("a", "b").and_then(|link| link.attributes().distance),
            Some(80.0)
        );
        assert!(graph.find_link("b", "a").is_none());

        handler.apply(&mut graph, &UpdateEvent::add_adjacency("c", json!({"a": {}})));
        handler.apply(&mut graph, &UpdateEvent::del_adjacency("a"));
        assert_eq!(graph.link_count(), 1);
        assert!(graph.find_link("c", "a").is_some());
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn non_object_adjacency_payload_changes_nothing() {
        let mut graph = GraphStore::new();
        let mut handler = ProtocolHandler::new();

        let effects = handler.apply(&mut graph, &UpdateEvent::add_adjacency("a", json!(["b"])));
        assert_eq!(effects, Effects::ALL);
        assert!(graph.is_empty());
    }

    #[test]
    fn no_op_deletes_still_request_resync_and_restart() {
        let mut graph = GraphStore::new();
        let mut handler = ProtocolHandler::new();

        assert_eq!(handler.apply(&mut graph, &UpdateEvent::del_node("ghost")), Effects::ALL);
        assert_eq!(handler.apply(&mut graph, &UpdateEvent::del_adjacency("ghost")), Effects::ALL);
    }

    #[test]
    fn graph_scope_mirrors_attributes() {
        let mut graph = GraphStore::new();
        let mut handler = ProtocolHandler::new();

        handler
            .receive(&mut graph, r#"{"scope": "graph", "action": "set", "key": "name", "value": "demo"}"#)
            .unwrap();
        assert_eq!(graph.graph_attributes().get("name"), Some(&json!("demo")));

        handler
            .receive(&mut graph, r#"{"scope": "graph", "action": "del", "key": "name"}"#)
            .unwrap();
        assert!(graph.graph_attributes().is_empty());
    }

    #[test]
    fn rejected_events_are_counted_and_leave_the_store_alone() {
        let mut graph = GraphStore::new();
        let mut handler = ProtocolHandler::new();

        assert!(handler.receive(&mut graph, r#"{"scope": "nodes"}"#).is_err());
        assert!(
            handler
                .receive(&mut graph, r#"{"scope": "nodes", "action": "add", "key": "a"}"#)
                .is_err()
        );
        assert_eq!(handler.rejected(), 2);
        assert_eq!(handler.applied(), 0);
        assert_eq!(graph.revision(), 0);
    }
}
