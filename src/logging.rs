/// Logging Module
///
/// Tracing setup for the binary and the logging snippets.
///
/// The driver emits its own events (through the `tracing-unstable` feature)
/// under the `mongodb::command`, `mongodb::connection`,
/// `mongodb::server_selection` and `mongodb::topology` targets. Per-component
/// levels from `[logging].components` become `EnvFilter` directives for those
/// targets.

use crate::config::LoggingConfig;
use crate::core::{Result, SnippetError};
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::{Directive, EnvFilter, LevelFilter};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Driver log components that can be tuned individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Command,
    Connection,
    ServerSelection,
    Topology,
}

impl LogComponent {
    pub const ALL: [LogComponent; 4] = [
        LogComponent::Command,
        LogComponent::Connection,
        LogComponent::ServerSelection,
        LogComponent::Topology,
    ];

    /// Tracing target the driver logs this component under.
    pub fn target(&self) -> &'static str {
        match self {
            LogComponent::Command => "mongodb::command",
            LogComponent::Connection => "mongodb::connection",
            LogComponent::ServerSelection => "mongodb::server_selection",
            LogComponent::Topology => "mongodb::topology",
        }
    }
}

impl FromStr for LogComponent {
    type Err = SnippetError;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "command" => Ok(LogComponent::Command),
            "connection" => Ok(LogComponent::Connection),
            "server_selection" | "serverselection" => Ok(LogComponent::ServerSelection),
            "topology" => Ok(LogComponent::Topology),
            _ => Err(SnippetError::Config(format!(
                "unknown log component '{}'; expected command, connection, server_selection or topology",
                name
            ))),
        }
    }
}

fn parse_level(level: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(level.trim())
        .map_err(|_| SnippetError::Config(format!("invalid log level '{}'", level)))
}

/// Builds the filter directives for the crate level plus each driver component.
pub fn filter_directives(config: &LoggingConfig, level_override: Option<&str>) -> Result<Vec<String>> {
    let level = parse_level(level_override.unwrap_or(&config.level))?;
    let mut directives = vec![format!("driver_snippets={}", level)];

    for (name, component_level) in &config.components {
        let component: LogComponent = name.parse()?;
        let component_level = parse_level(component_level)?;
        directives.push(format!("{}={}", component.target(), component_level));
    }

    Ok(directives)
}

/// Assembles an `EnvFilter` from explicit directives, ignoring `RUST_LOG`.
pub fn filter_from_directives(directives: &[String]) -> Result<EnvFilter> {
    let mut filter = EnvFilter::new("");
    for directive in directives {
        let parsed: Directive = directive
            .parse()
            .map_err(|e| SnippetError::Config(format!("invalid filter '{}': {}", directive, e)))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

/// Initializes the process-wide subscriber. `RUST_LOG` wins over the config.
pub fn init_tracing(config: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_from_directives(&filter_directives(config, level_override)?)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| SnippetError::Config(format!("failed to initialize logging: {}", e)))
}

/// Shared in-memory sink written by [`CaptureLayer`].
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    pub fn contents(&self) -> String {
        let mut out = String::new();
        for line in self.lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

#[derive(Default)]
struct EventFields {
    message: Option<String>,
    rest: Vec<String>,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.rest.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.rest.push(format!("{}={:?}", field.name(), value));
        }
    }
}

/// A layer that formats each event as one line into a [`LogBuffer`].
pub struct CaptureLayer {
    buffer: LogBuffer,
}

impl CaptureLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        CaptureLayer { buffer }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        let meta = event.metadata();
        let mut line = format!(
            "level: {} target: {}, message: {}",
            meta.level(),
            meta.target(),
            fields.message.unwrap_or_default()
        );
        if !fields.rest.is_empty() {
            let _ = write!(line, " [{}]", fields.rest.join(" "));
        }
        self.buffer.push(line);
    }
}

/// Subscriber writing filtered events to stderr.
pub fn stderr_subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
}

/// Subscriber writing filtered events into `buffer`.
pub fn capture_subscriber(filter: EnvFilter, buffer: LogBuffer) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(filter)
        .with(CaptureLayer::new(buffer))
}
