// ABOUTME: Terminal feedback for deploy, rollback and backup listing.
// ABOUTME: Renders human lines, bare results for CI, or one JSON object per line.

use serde::Serialize;
use std::time::Instant;

/// How results are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Step-by-step progress on stdout.
    Normal,
    /// Final outcome only.
    Quiet,
    /// JSON lines for scripting.
    Json,
}

/// Presents pipeline progress according to the selected [`OutputMode`].
pub struct Output {
    mode: OutputMode,
    started: Option<Instant>,
}

/// One JSON line. Free-form messages and structured records share the
/// `event` key so consumers can dispatch on it.
#[derive(Serialize)]
#[serde(untagged)]
enum Event<'a, T: Serialize> {
    Message {
        event: &'static str,
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_secs: Option<f64>,
    },
    Record {
        event: &'a str,
        data: &'a T,
    },
}

type MessageEvent<'a> = Event<'a, ()>;

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            started: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Marks the start of the run; later successes report the elapsed time.
    pub fn start_timer(&mut self) {
        self.started = Some(Instant::now());
    }

    fn duration_secs(&self) -> Option<f64> {
        self.started.map(|at| at.elapsed().as_secs_f64())
    }

    /// Progress line, shown only in normal mode.
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    pub fn success(&self, message: &str) {
        match (self.mode, self.duration_secs()) {
            (OutputMode::Normal, Some(secs)) => println!("{message} ({secs:.1}s)"),
            (OutputMode::Normal | OutputMode::Quiet, _) => println!("{message}"),
            (OutputMode::Json, duration_secs) => println!(
                "{}",
                to_line(&MessageEvent::Message {
                    event: "success",
                    message,
                    duration_secs,
                })
            ),
        }
    }

    /// Non-fatal problem. Quiet mode drops these; the final result still
    /// reflects them through the step journal.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("  ⚠ {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => println!(
                "{}",
                to_line(&MessageEvent::Message {
                    event: "warning",
                    message,
                    duration_secs: None,
                })
            ),
        }
    }

    /// Fatal error, always on stderr.
    pub fn error(&self, message: &str) {
        if self.mode == OutputMode::Json {
            eprintln!(
                "{}",
                to_line(&MessageEvent::Message {
                    event: "error",
                    message,
                    duration_secs: self.duration_secs(),
                })
            );
        } else {
            eprintln!("Error: {message}");
        }
    }

    /// Structured result as `{"event": .., "data": ..}`; JSON mode only.
    pub fn record<T: Serialize>(&self, event: &str, data: &T) {
        if self.mode == OutputMode::Json {
            println!("{}", to_line(&Event::Record { event, data }));
        }
    }
}

fn to_line<T: Serialize>(event: &Event<'_, T>) -> String {
    serde_json::to_string(event).unwrap_or_else(|e| {
        format!(r#"{{"event":"error","message":"unserializable output: {e}"}}"#)
    })
}
