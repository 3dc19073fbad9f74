pub mod graph;
pub mod physics;
pub mod protocol;
pub mod render;
pub mod scheduler;
mod util;
pub mod widget;

pub use graph::{Dimension, GraphStore, Link, LinkAttributes, LinkKey, Node, NodeAttributes, NodeId};
pub use physics::{ForceSimulation, SimulationConfig, TickEvent};
pub use protocol::{Action, DecodeError, Effects, ProtocolHandler, Scope, UpdateEvent};
pub use render::{EdgeElement, NodeElement, RenderReconciler, ResyncReport};
pub use scheduler::{Scheduler, TaskControl, TaskHandle};
pub use widget::{GraphView, GraphWidget};
