//! Log output
//!
//! Every event becomes one line on stdout:
//!
//! ```text
//! [18.10.2026 14:03:27] client-12: Connected to target.test:80
//! ```
//!
//! The name comes from the event's `client` field. Events without one are
//! attributed to the program itself.

use crate::Error;
use chrono::Local;
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// `DD.MM.YYYY HH:MM:SS`
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Name printed for events that carry no `client` field
pub const DEFAULT_SOURCE: &str = "slowpost";

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init(level: &str) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| Error::Logging(format!("invalid log level '{}': {}", level, e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .event_format(ClientLineFormat)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

/// Render one log line without the trailing newline
pub fn render_line(timestamp: &str, source: &str, message: &str) -> String {
    format!("[{}] {}: {}", timestamp, source, message)
}

/// Event formatter producing `[timestamp] <client>: <message>`
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientLineFormat;

impl<S, N> FormatEvent<S, N> for ClientLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = LineFields::default();
        event.record(&mut fields);

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let source = fields.client.as_deref().unwrap_or(DEFAULT_SOURCE);
        writeln!(writer, "{}", render_line(&timestamp, source, &fields.message()))
    }
}

#[derive(Default)]
struct LineFields {
    client: Option<String>,
    message: String,
    extra: String,
}

impl LineFields {
    fn message(&self) -> String {
        if self.extra.is_empty() {
            self.message.clone()
        } else {
            format!("{}{}", self.message, self.extra)
        }
    }
}

impl Visit for LineFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "client" => self.client = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            name => {
                let _ = write!(self.extra, " {}={}", name, value);
            }
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "client" => self.client = Some(format!("{:?}", value)),
            "message" => self.message = format!("{:?}", value),
            name => {
                let _ = write!(self.extra, " {}={:?}", name, value);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::capture::Capture;
    use super::*;

    fn capture(f: impl FnOnce()) -> String {
        let sink = Capture::default();
        {
            let _guard = sink.set_default();
            f();
        }
        sink.contents()
    }

    #[test]
    fn test_render_line() {
        assert_eq!(
            render_line("18.10.2026 14:03:27", "client-3", "Connected"),
            "[18.10.2026 14:03:27] client-3: Connected"
        );
    }

    #[test]
    fn test_client_field_names_the_line() {
        let name = "client-9".to_string();
        let output = capture(|| {
            tracing::info!(client = %name, "Sent {} of {} bytes", 40, 100);
        });

        let line = output.trim_end();
        assert!(line.starts_with('['));
        assert!(line.ends_with("] client-9: Sent 40 of 100 bytes"), "{}", line);

        // [DD.MM.YYYY HH:MM:SS]
        let stamp = &line[1..20];
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[2..3], ".");
        assert_eq!(&stamp[5..6], ".");
        assert_eq!(&stamp[13..14], ":");
    }

    #[test]
    fn test_event_without_client() {
        let output = capture(|| {
            tracing::info!(clients = 3, "Starting");
        });
        assert!(output.trim_end().ends_with("] slowpost: Starting clients=3"));
    }
}
