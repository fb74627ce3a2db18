//! Tracing subscriber setup.
//!
//! Builds the logging stack from the `[log]` config table: a level
//! filter, a format chosen by mode (`dev` is human-readable, `prod` is
//! JSON), and one output layer per configured target (`stdout`,
//! `stderr`, or a file path).

use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Logging setup errors.
#[derive(Error, Debug)]
pub enum LogError {
    /// A file output could not be opened.
    #[error("failed to open log output {path}: {source}")]
    Output {
        /// The configured output path.
        path: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development.
    Dev,
    /// JSON format for production.
    Prod,
}

/// Resolved logging options.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Whether logging is enabled at all.
    pub enabled: bool,
    /// Output format.
    pub format: LogFormat,
    /// Level directive (e.g. `error`, `info`, `sifter_server=debug`).
    pub level: String,
    /// Output targets: `stdout`, `stderr`, or file paths.
    pub outputs: Vec<String>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Prod,
            level: "error".to_string(),
            outputs: vec!["stdout".to_string()],
        }
    }
}

/// A file handle shared across log layers.
#[derive(Clone)]
struct SharedFile(Arc<Mutex<File>>);

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().flush()
    }
}

/// Initializes the global tracing subscriber.
///
/// With `enabled: false` no subscriber is installed and all macros are
/// no-ops.
pub fn init(options: &LogOptions) -> Result<(), LogError> {
    if !options.enabled {
        return Ok(());
    }

    let filter = EnvFilter::try_new(&options.level)
        .unwrap_or_else(|_| EnvFilter::new("error"));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    for output in &options.outputs {
        let layer: Box<dyn Layer<Registry> + Send + Sync> = match output.as_str() {
            "stdout" => format_layer(options.format, io::stdout),
            "stderr" => format_layer(options.format, io::stderr),
            path => {
                let file = File::options()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| LogError::Output {
                        path: path.to_string(),
                        source,
                    })?;
                let writer = SharedFile(Arc::new(Mutex::new(file)));
                format_layer(options.format, move || writer.clone())
            }
        };
        layers.push(layer);
    }

    tracing_subscriber::registry().with(layers).with(filter).init();
    Ok(())
}

fn format_layer<W>(format: LogFormat, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'a> tracing_subscriber::fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    match format {
        LogFormat::Dev => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Prod => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
    }
}
