use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, Result};
use eframe::egui::Context;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventInput {
    Stdin,
    File(PathBuf),
}

impl EventInput {
    pub fn parse(argument: &str) -> Self {
        if argument == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(argument))
        }
    }

    pub(super) fn describe(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_owned(),
            Self::File(path) => path.display().to_string(),
        }
    }

    /// Stdin can only be consumed once.
    pub(super) fn can_replay(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

pub(super) enum FeedMessage {
    Line(String),
    Finished { lines: usize },
    Failed(String),
}

pub(super) fn spawn_feed(ctx: Context, input: EventInput, delay: Duration) -> Receiver<FeedMessage> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let notify = || ctx.request_repaint();
        let result = match &input {
            EventInput::Stdin => forward_lines(io::stdin().lock(), &tx, delay, notify),
            EventInput::File(path) => File::open(path)
                .with_context(|| format!("failed to open event stream {}", path.display()))
                .and_then(|file| forward_lines(BufReader::new(file), &tx, delay, notify)),
        };

        let message = match result {
            Ok(lines) => {
                info!(lines, source = %input.describe(), "event stream finished");
                FeedMessage::Finished { lines }
            }
            Err(error) => {
                warn!(error = %format!("{error:#}"), "event stream failed");
                FeedMessage::Failed(format!("{error:#}"))
            }
        };
        let _ = tx.send(message);
        ctx.request_repaint();
    });

    rx
}

pub(super) fn forward_lines<R: BufRead>(
    reader: R,
    tx: &Sender<FeedMessage>,
    delay: Duration,
    notify: impl Fn(),
) -> Result<usize> {
    let mut forwarded = 0;
    for (number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read event line {}", number + 1))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if tx.send(FeedMessage::Line(line.to_owned())).is_err() {
            break;
        }
        forwarded += 1;
        notify();

        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    Ok(forwarded)
}
