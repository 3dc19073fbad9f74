mod forces;
mod quadtree;

use eframe::egui::{Vec2, vec2};
use tracing::{debug, trace};

use crate::graph::GraphStore;
use crate::util::{golden_direction, stable_jitter};
use forces::{Spring, accumulate_repulsion, apply_gravity, relax_springs};
use quadtree::QuadNode;

pub const DEFAULT_CHARGE: f32 = -280.0;
pub const DEFAULT_LINK_DISTANCE: f32 = 30.0;
pub const DEFAULT_LINK_STRENGTH: f32 = 0.3;

const NEIGHBOUR_SPAWN_RADIUS: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    pub charge: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub gravity: f32,
    pub friction: f32,
    pub theta: f32,
    pub alpha_start: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub energy_epsilon: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            charge: DEFAULT_CHARGE,
            link_distance: DEFAULT_LINK_DISTANCE,
            link_strength: DEFAULT_LINK_STRENGTH,
            gravity: 0.1,
            friction: 0.9,
            theta: 0.8,
            alpha_start: 0.1,
            alpha_decay: 0.99,
            alpha_min: 0.005,
            energy_epsilon: 1e-3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickEvent {
    pub tick: u64,
    pub alpha: f32,
    pub kinetic_energy: f32,
    /// Set on the last tick of a run, whether it came to rest or cooled out.
    pub settled: bool,
}

type TickCallback = Box<dyn FnMut(&TickEvent, &GraphStore)>;

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    charges: Vec<f32>,
    pinned: Vec<bool>,
    degree: Vec<f32>,
    springs: Vec<Spring>,
    kicks: Vec<Vec2>,
}

pub struct ForceSimulation {
    config: SimulationConfig,
    size: Vec2,
    alpha: f32,
    running: bool,
    ticks: u64,
    callbacks: Vec<TickCallback>,
    scratch: Scratch,
}

impl ForceSimulation {
    pub fn new(config: SimulationConfig, width: f32, height: f32) -> Self {
        Self {
            config,
            size: vec2(width.max(1.0), height.max(1.0)),
            alpha: 0.0,
            running: false,
            ticks: 0,
            callbacks: Vec::new(),
            scratch: Scratch::default(),
        }
    }

    pub fn configure(&mut self, width: f32, height: f32) {
        self.size = vec2(width.max(1.0), height.max(1.0));
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn center(&self) -> Vec2 {
        self.size * 0.5
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SimulationConfig) {
        self.config = config;
    }

    pub fn restart(&mut self) {
        self.alpha = self.config.alpha_start;
        if !self.running {
            debug!(alpha = self.alpha, "force simulation started");
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.alpha = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn on_tick(&mut self, callback: impl FnMut(&TickEvent, &GraphStore) + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn place_unplaced(&mut self, graph: &mut GraphStore) -> usize {
        let node_count = graph.node_count();
        let mut anchors = graph
            .nodes()
            .iter()
            .map(|node| node.body().placed.then(|| node.position()))
            .collect::<Vec<_>>();
        if anchors.iter().all(Option::is_some) {
            return 0;
        }

        let mut neighbours = vec![Vec::new(); node_count];
        for link in graph.links() {
            if let (Some(source), Some(target)) = (
                graph.index_of(link.source().as_str()),
                graph.index_of(link.target().as_str()),
            ) {
                neighbours[source].push(target);
                neighbours[target].push(source);
            }
        }

        let mut placed = 0usize;
        for (index, node) in graph.nodes().iter().enumerate() {
            if anchors[index].is_some() {
                continue;
            }

            let jitter = stable_jitter(node.id().as_str());
            let anchor = neighbours[index].iter().find_map(|&other| anchors[other]);
            anchors[index] = Some(match anchor {
                Some(anchor) => {
                    let direction = if jitter.length_sq() > 1e-6 {
                        jitter.normalized()
                    } else {
                        golden_direction(index, node_count)
                    };
                    anchor + direction * NEIGHBOUR_SPAWN_RADIUS
                }
                None => (jitter * 0.5 + vec2(0.5, 0.5)) * self.size,
            });
            placed += 1;
        }

        for (node, anchor) in graph.nodes_mut().iter_mut().zip(anchors) {
            if node.body.placed {
                continue;
            }
            if let Some(position) = anchor {
                node.body.position = position;
                node.body.previous = position;
                node.body.placed = true;
            }
        }

        trace!(placed, "placed new nodes");
        placed
    }

    /// Holds a node at `position` until released. Does not restart the run.
    pub fn pin(&mut self, graph: &mut GraphStore, id: &str, position: Vec2) -> bool {
        let Some(index) = graph.index_of(id) else {
            return false;
        };

        let body = &mut graph.nodes_mut()[index].body;
        body.position = position;
        body.previous = position;
        body.pinned = true;
        body.placed = true;
        true
    }

    pub fn release(&mut self, graph: &mut GraphStore, id: &str) -> bool {
        let Some(index) = graph.index_of(id) else {
            return false;
        };

        graph.nodes_mut()[index].body.pinned = false;
        true
    }

    /// Advances one step. Returns `None` while idle.
    pub fn tick(&mut self, graph: &mut GraphStore) -> Option<TickEvent> {
        if !self.running {
            return None;
        }

        self.alpha *= self.config.alpha_decay;
        if self.alpha < self.config.alpha_min {
            debug!(ticks = self.ticks, "force simulation cooled down");
            self.stop();
            return None;
        }

        self.place_unplaced(graph);
        self.load(graph);

        let alpha = self.alpha;
        let center = self.center();
        let scratch = &mut self.scratch;
        relax_springs(&mut scratch.positions, &scratch.springs, &scratch.degree, alpha);
        apply_gravity(&mut scratch.positions, center, alpha * self.config.gravity);

        scratch.kicks.clear();
        scratch.kicks.resize(scratch.positions.len(), Vec2::ZERO);
        if let Some(tree) = QuadNode::build(&scratch.positions, &scratch.charges) {
            for (index, kick) in scratch.kicks.iter_mut().enumerate() {
                if scratch.pinned[index] {
                    continue;
                }
                accumulate_repulsion(
                    &tree,
                    index,
                    &scratch.positions,
                    &scratch.charges,
                    self.config.theta,
                    kick,
                );
            }
        }

        let kinetic_energy = self.integrate(graph);
        self.ticks += 1;

        let cooled = self.alpha * self.config.alpha_decay < self.config.alpha_min;
        let settled = kinetic_energy < self.config.energy_epsilon || cooled;
        if settled {
            debug!(ticks = self.ticks, kinetic_energy, cooled, "force simulation settled");
            self.running = false;
        }

        let event = TickEvent {
            tick: self.ticks,
            alpha,
            kinetic_energy,
            settled,
        };
        for callback in &mut self.callbacks {
            callback(&event, graph);
        }
        Some(event)
    }

    fn load(&mut self, graph: &GraphStore) {
        let alpha = self.alpha;
        let config = self.config;
        let scratch = &mut self.scratch;
        let node_count = graph.node_count();

        scratch.positions.clear();
        scratch.charges.clear();
        scratch.pinned.clear();
        for node in graph.nodes() {
            let charge = node
                .attributes()
                .charge
                .filter(|charge| charge.is_finite())
                .unwrap_or(config.charge);
            scratch.positions.push(node.position());
            scratch.charges.push(alpha * charge);
            scratch.pinned.push(node.body().pinned);
        }

        scratch.degree.clear();
        scratch.degree.resize(node_count, 0.0);
        scratch.springs.clear();
        for link in graph.links() {
            let (Some(source), Some(target)) = (
                graph.index_of(link.source().as_str()),
                graph.index_of(link.target().as_str()),
            ) else {
                continue;
            };

            let attributes = link.attributes();
            scratch.degree[source] += 1.0;
            scratch.degree[target] += 1.0;
            scratch.springs.push(Spring {
                source,
                target,
                distance: attributes
                    .distance
                    .filter(|distance| distance.is_finite())
                    .unwrap_or(config.link_distance),
                strength: attributes
                    .strength
                    .filter(|strength| strength.is_finite())
                    .unwrap_or(config.link_strength)
                    .clamp(0.0, 1.0),
            });
        }
    }

    // Position Verlet with friction. Returns mean squared displacement of the
    // free nodes.
    fn integrate(&mut self, graph: &mut GraphStore) -> f32 {
        let friction = self.config.friction;
        let scratch = &self.scratch;
        let mut energy = 0.0_f32;
        let mut moving = 0usize;

        for (index, node) in graph.nodes_mut().iter_mut().enumerate() {
            let body = &mut node.body;
            if body.pinned {
                body.position = body.previous;
                continue;
            }

            let relaxed = scratch.positions[index];
            let previous = body.previous - scratch.kicks[index];
            let next = relaxed + (relaxed - previous) * friction;

            energy += (next - body.position).length_sq();
            moving += 1;
            body.previous = relaxed;
            body.position = next;
        }

        if moving == 0 { 0.0 } else { energy / moving as f32 }
    }
}

impl Default for ForceSimulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default(), 400.0, 300.0)
    }
}
