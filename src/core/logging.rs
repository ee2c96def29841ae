//! Run log: every tracing event is appended to the configured log file as
//! `<timestamp> - <message>`.

use chrono::Local;
use std::fmt;
use std::path::Path;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

struct DashFormat;

impl<S, N> FormatEvent<S, N> for DashFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{} - ", Local::now().format(TIMESTAMP_FORMAT))?;
        let level = *event.metadata().level();
        if level != Level::INFO {
            write!(writer, "{} ", level)?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber. Keep the returned guard alive for the
/// whole run or buffered lines are lost on exit.
pub fn init(log_file: &Path) -> Result<WorkerGuard> {
    let dir = match log_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = log_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            Error::config_invalid_value(
                "log_file",
                Some(log_file.display().to_string()),
                "Log file path has no file name",
            )
        })?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("open {}", log_file.display())))
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .event_format(DashFormat);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| Error::internal_unexpected(format!("install log subscriber: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(emit: impl FnOnce()) -> Vec<String> {
        let captured = Captured::default();
        let sink = captured.clone();
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .event_format(DashFormat);

        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), emit);

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn split_line(line: &str) -> (&str, &str) {
        line.split_once(" - ").unwrap()
    }

    #[test]
    fn info_lines_are_timestamp_dash_message() {
        let lines = capture(|| tracing::info!("job mgr busy"));

        assert_eq!(lines.len(), 1);
        let (timestamp, message) = split_line(&lines[0]);
        assert_eq!(message, "job mgr busy");
        // 2024-03-09 07:05:01,123
        assert_eq!(timestamp.len(), 23);
        assert_eq!(&timestamp[4..5], "-");
        assert_eq!(&timestamp[10..11], " ");
        assert_eq!(&timestamp[19..20], ",");
    }

    #[test]
    fn other_levels_carry_a_prefix() {
        let lines = capture(|| {
            tracing::warn!("notification not delivered");
            tracing::error!("pdb failed");
        });

        assert_eq!(split_line(&lines[0]).1, "WARN notification not delivered");
        assert_eq!(split_line(&lines[1]).1, "ERROR pdb failed");
    }
}
