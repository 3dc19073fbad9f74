use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use eframe::egui::{Context, Vec2};
use livegraph::{GraphWidget, NodeId, SimulationConfig, TickEvent};
use tracing::info;

mod graph;
mod render_utils;
mod source;
mod ui;

pub use source::EventInput;
use source::{FeedMessage, spawn_feed};
use ui::AttributeTable;

pub struct AppSettings {
    pub input: EventInput,
    pub event_delay: Duration,
    pub width: f32,
    pub height: f32,
    pub config: SimulationConfig,
}

enum FeedStatus {
    Streaming,
    Finished { lines: usize },
    Failed(String),
}

pub struct LiveGraphApp {
    settings: AppSettings,
    widget: GraphWidget,
    feed: Option<Receiver<FeedMessage>>,
    status: FeedStatus,
    applied: usize,
    dropped: usize,
    last_tick: Rc<Cell<Option<TickEvent>>>,
    pan: Vec2,
    zoom: f32,
    dragging: Option<NodeId>,
    hovered: Option<NodeId>,
    attribute_table: AttributeTable,
}

impl LiveGraphApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let last_tick = Rc::new(Cell::new(None));
        let widget = Self::mount(&settings, &last_tick);
        let feed = spawn_feed(cc.egui_ctx.clone(), settings.input.clone(), settings.event_delay);
        info!(source = %settings.input.describe(), "reading update events");

        Self {
            settings,
            widget,
            feed: Some(feed),
            status: FeedStatus::Streaming,
            applied: 0,
            dropped: 0,
            last_tick,
            pan: Vec2::ZERO,
            zoom: 1.0,
            dragging: None,
            hovered: None,
            attribute_table: AttributeTable::default(),
        }
    }

    fn mount(settings: &AppSettings, last_tick: &Rc<Cell<Option<TickEvent>>>) -> GraphWidget {
        let mut widget = GraphWidget::mount(settings.width, settings.height, settings.config);
        let sink = Rc::clone(last_tick);
        widget.on_tick(move |event, _| sink.set(Some(*event)));
        widget
    }

    fn replay(&mut self, ctx: &Context) {
        if !self.settings.input.can_replay() {
            return;
        }

        self.last_tick.set(None);
        self.widget = Self::mount(&self.settings, &self.last_tick);
        self.feed = Some(spawn_feed(
            ctx.clone(),
            self.settings.input.clone(),
            self.settings.event_delay,
        ));
        self.status = FeedStatus::Streaming;
        self.applied = 0;
        self.dropped = 0;
        self.dragging = None;
        self.hovered = None;
        self.attribute_table = AttributeTable::default();
        info!(source = %self.settings.input.describe(), "replaying update events");
    }

    fn drain_feed(&mut self) {
        let Some(rx) = self.feed.take() else {
            return;
        };

        loop {
            match rx.try_recv() {
                Ok(FeedMessage::Line(line)) => {
                    if self.widget.receive(&line) {
                        self.applied += 1;
                    } else {
                        self.dropped += 1;
                    }
                }
                Ok(FeedMessage::Finished { lines }) => {
                    self.status = FeedStatus::Finished { lines };
                    return;
                }
                Ok(FeedMessage::Failed(error)) => {
                    self.status = FeedStatus::Failed(error);
                    return;
                }
                Err(TryRecvError::Empty) => {
                    self.feed = Some(rx);
                    return;
                }
                Err(TryRecvError::Disconnected) => {
                    self.status = FeedStatus::Failed("event reader disconnected".to_owned());
                    return;
                }
            }
        }
    }

    fn set_config(&mut self, config: SimulationConfig) {
        self.settings.config = config;
        self.widget.set_config(config);
    }
}

impl eframe::App for LiveGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.drain_feed();
        self.attribute_table.refresh(self.widget.store());

        if self.widget.clock_tick() {
            ctx.request_repaint();
        }

        self.show(ctx);

        // Anything deferred while building this frame (the first paint) runs
        // once the frame's synchronous work is done.
        if self.widget.end_phase() > 0 {
            ctx.request_repaint();
        }
    }
}
