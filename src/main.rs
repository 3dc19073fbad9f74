mod app;

use std::time::Duration;

use clap::Parser;
use livegraph::SimulationConfig;
use tracing_subscriber::EnvFilter;

use crate::app::{AppSettings, EventInput, LiveGraphApp};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON-lines file of update events, or `-` for stdin.
    #[arg(default_value = "-")]
    events: String,
    /// Layout canvas width.
    #[arg(long, default_value_t = 400.0)]
    width: f32,
    /// Layout canvas height.
    #[arg(long, default_value_t = 300.0)]
    height: f32,
    /// Charge for nodes without a `charge` attribute.
    #[arg(long, allow_negative_numbers = true)]
    charge: Option<f32>,
    /// Rest length for links without a `distance` attribute.
    #[arg(long)]
    link_distance: Option<f32>,
    /// Stiffness for links without a `strength` attribute.
    #[arg(long)]
    link_strength: Option<f32>,
    /// Pause between consecutive events, in milliseconds.
    #[arg(long, default_value_t = 0)]
    event_delay_ms: u64,
    /// Initial window width.
    #[arg(long, default_value_t = 960.0)]
    window_width: f32,
    /// Initial window height.
    #[arg(long, default_value_t = 720.0)]
    window_height: f32,
}

impl Args {
    fn simulation_config(&self) -> SimulationConfig {
        let defaults = SimulationConfig::default();
        SimulationConfig {
            charge: self.charge.unwrap_or(defaults.charge),
            link_distance: self.link_distance.unwrap_or(defaults.link_distance),
            link_strength: self
                .link_strength
                .unwrap_or(defaults.link_strength)
                .clamp(0.0, 1.0),
            ..defaults
        }
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("livegraph=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = AppSettings {
        input: EventInput::parse(&args.events),
        event_delay: Duration::from_millis(args.event_delay_ms),
        width: args.width.max(1.0),
        height: args.height.max(1.0),
        config: args.simulation_config(),
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([args.window_width, args.window_height]),
        ..Default::default()
    };

    eframe::run_native(
        "livegraph",
        options,
        Box::new(move |cc| Ok(Box::new(LiveGraphApp::new(cc, settings)))),
    )
}
