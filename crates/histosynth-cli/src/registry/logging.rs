use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::span::EnteredSpan;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

use super::{RegistryError, RegistryResult};

/// Pipeline crates log at `info`, everything else at `warn`.
pub const DEFAULT_DIRECTIVES: &str =
    "warn,histosynth=info,histosynth_core=info,histosynth_generate=info,histosynth_eval=info";

/// Keeps the `histosynth_run` span entered; drop it when the run ends.
#[must_use]
pub struct RunLogGuard {
    _span: EnteredSpan,
}

/// Route tracing events as JSON lines into the run's `logs.ndjson`.
///
/// Every line carries the `run_id` through the enclosing `histosynth_run`
/// span, so logs of several runs can be concatenated and split again.
/// `RUST_LOG` replaces [`DEFAULT_DIRECTIVES`].
pub fn init_run_logging(path: &Path, run_id: &str) -> RegistryResult<RunLogGuard> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let file = Arc::new(Mutex::new(file));

    let make_writer = BoxMakeWriter::new(move || LogFileWriter {
        file: Arc::clone(&file),
    });

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(make_writer);

    tracing_subscriber::registry()
        .with(run_filter(std::env::var("RUST_LOG").ok().as_deref())?)
        .with(layer)
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))?;

    let span = tracing::info_span!("histosynth_run", run_id = %run_id).entered();
    Ok(RunLogGuard { _span: span })
}

/// Filter from `RUST_LOG` when set and non-empty, else the crate defaults.
fn run_filter(env: Option<&str>) -> RegistryResult<EnvFilter> {
    let directives = match env.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => DEFAULT_DIRECTIVES,
    };
    EnvFilter::try_new(directives)
        .map_err(|err| RegistryError::Logging(format!("invalid log filter `{directives}`: {err}")))
}

struct LogFileWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("logs.ndjson writer lock poisoned"))?;
        file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("logs.ndjson writer lock poisoned"))?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_names_every_pipeline_crate() {
        let filter = run_filter(None).expect("default filter");
        let rendered = filter.to_string();
        for target in [
            "histosynth",
            "histosynth_core",
            "histosynth_generate",
            "histosynth_eval",
        ] {
            assert!(rendered.contains(&format!("{target}=info")), "{rendered}");
        }
    }

    #[test]
    fn blank_rust_log_falls_back_to_defaults() {
        let filter = run_filter(Some("  ")).expect("filter");
        assert!(filter.to_string().contains("histosynth_generate=info"));
    }

    #[test]
    fn malformed_rust_log_is_a_logging_error() {
        let err = run_filter(Some("histosynth_generate=loud")).unwrap_err();
        assert!(matches!(err, RegistryError::Logging(message) if message.contains("loud")));
    }
}
