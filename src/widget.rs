use eframe::egui::Vec2;
use tracing::{debug, info, warn};

use crate::graph::GraphStore;
use crate::physics::{ForceSimulation, SimulationConfig, TickEvent};
use crate::protocol::{Effects, ProtocolHandler, UpdateEvent};
use crate::render::{RenderReconciler, ResyncReport};
use crate::scheduler::{Scheduler, TaskControl, TaskHandle};

pub struct GraphView {
    store: GraphStore,
    simulation: ForceSimulation,
    reconciler: RenderReconciler,
    handler: ProtocolHandler,
    painted: bool,
}

impl GraphView {
    fn first_paint(&mut self) {
        let report = self.reconciler.resync(&self.store);
        self.painted = true;
        info!(
            nodes = self.store.node_count(),
            links = self.store.link_count(),
            entered = report.entered,
            "first paint"
        );
    }

    fn step(&mut self) -> TaskControl {
        match self.simulation.tick(&mut self.store) {
            Some(_) => {
                self.reconciler.apply_tick(&self.store);
                TaskControl::Continue
            }
            None => TaskControl::Finish,
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn simulation(&self) -> &ForceSimulation {
        &self.simulation
    }

    pub fn reconciler(&self) -> &RenderReconciler {
        &self.reconciler
    }

    pub fn handler(&self) -> &ProtocolHandler {
        &self.handler
    }

    pub fn is_painted(&self) -> bool {
        self.painted
    }
}

pub struct GraphWidget {
    view: GraphView,
    scheduler: Scheduler<GraphView>,
    tick_task: Option<TaskHandle>,
}

impl GraphWidget {
    pub fn mount(width: f32, height: f32, config: SimulationConfig) -> Self {
        let mut scheduler = Scheduler::<GraphView>::new();
        scheduler.defer(GraphView::first_paint);
        info!(width, height, "graph widget mounted");

        Self {
            view: GraphView {
                store: GraphStore::new(),
                simulation: ForceSimulation::new(config, width, height),
                reconciler: RenderReconciler::new(),
                handler: ProtocolHandler::new(),
                painted: false,
            },
            scheduler,
            tick_task: None,
        }
    }

    pub fn handle_event(&mut self, event: &UpdateEvent) -> Effects {
        let effects = self.view.handler.apply(&mut self.view.store, event);
        debug!(scope = %event.scope, action = %event.action, key = event.key.as_str(), "applied update");
        self.apply_effects(effects);
        effects
    }

    pub fn receive(&mut self, text: &str) -> bool {
        match self.view.handler.receive(&mut self.view.store, text) {
            Ok(effects) => {
                self.apply_effects(effects);
                true
            }
            Err(error) => {
                warn!(%error, "dropping update event");
                false
            }
        }
    }

    fn apply_effects(&mut self, effects: Effects) {
        if effects.resync {
            self.resync();
        }
        if effects.restart {
            self.restart();
        }
    }

    pub fn resync(&mut self) -> ResyncReport {
        self.view.reconciler.resync(&self.view.store)
    }

    pub fn restart(&mut self) {
        if let Some(handle) = self.tick_task.take() {
            self.scheduler.cancel(handle);
        }
        self.view.simulation.restart();
        self.tick_task = Some(self.scheduler.every_tick(GraphView::step));
    }

    pub fn end_phase(&mut self) -> usize {
        self.scheduler.run_deferred(&mut self.view)
    }

    /// Advances the per-tick tasks once. Returns whether the layout is still
    /// animating.
    pub fn clock_tick(&mut self) -> bool {
        self.scheduler.run_tick(&mut self.view);
        if !self.scheduler.has_recurring() {
            self.tick_task = None;
        }
        self.is_animating()
    }

    pub fn is_animating(&self) -> bool {
        self.tick_task
            .is_some_and(|handle| self.scheduler.is_scheduled(handle))
    }

    pub fn pin_node(&mut self, id: &str, position: Vec2) -> bool {
        if !self
            .view
            .simulation
            .pin(&mut self.view.store, id, position)
        {
            return false;
        }
        self.view.reconciler.apply_positions(&self.view.store);
        self.restart();
        true
    }

    pub fn release_node(&mut self, id: &str) -> bool {
        self.view.simulation.release(&mut self.view.store, id)
    }

    pub fn on_tick(&mut self, callback: impl FnMut(&TickEvent, &GraphStore) + 'static) {
        self.view.simulation.on_tick(callback);
    }

    pub fn set_config(&mut self, config: SimulationConfig) {
        self.view.simulation.set_config(config);
        self.restart();
    }

    pub fn view(&self) -> &GraphView {
        &self.view
    }

    pub fn store(&self) -> &GraphStore {
        &self.view.store
    }

    pub fn simulation(&self) -> &ForceSimulation {
        &self.view.simulation
    }

    pub fn reconciler(&self) -> &RenderReconciler {
        &self.view.reconciler
    }
}
