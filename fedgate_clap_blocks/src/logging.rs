//! CLI config for logging.
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{
    EnvFilter, filter::ParseError, fmt, fmt::MakeWriter, layer::SubscriberExt,
};

/// Filter used when neither `--log-filter` nor `-v` is given.
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid log filter '{filter}': {source}")]
    InvalidFilter { filter: String, source: ParseError },

    #[error("cannot install global log subscriber: {0}")]
    InstallGlobal(#[from] SetGlobalDefaultError),
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// human-readable, single line
    #[default]
    Full,
    /// human-readable, multi line
    Pretty,
    /// machine-parseable, one JSON object per line
    Json,
}

/// CLI config for the logging related subset of options.
#[derive(Debug, Clone, clap::Parser)]
pub struct LoggingConfig {
    /// Logs: filter directive
    ///
    /// Configures log severity level filter, by target.
    ///
    /// Simplest options: error, warn, info, debug, trace
    ///
    /// Levels for different modules can be specified. For example
    /// `debug,fedgate_cache=info` specifies debug logging for all modules
    /// except for the `fedgate_cache` crate which will only display info
    /// level logging.
    ///
    /// Overridden by `-v`.
    #[clap(long = "log-filter", env = "LOG_FILTER")]
    pub log_filter: Option<String>,

    /// Logs: filter short-hand
    ///
    /// Convenient way to set log severity level filter.
    /// Overrides `--log-filter`.
    ///
    /// -v   'info'
    ///
    /// -vv  'debug'
    ///
    /// -vvv 'trace'
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub log_verbose_count: u8,

    /// Logs: message format
    #[clap(long = "log-format", env = "LOG_FORMAT", default_value = "full", value_enum)]
    pub log_format: LogFormat,
}

impl LoggingConfig {
    /// The filter selected by `-v` or `--log-filter`, in that order.
    pub fn env_filter(&self) -> Result<EnvFilter, Error> {
        let filter = match self.log_verbose_count {
            0 => self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER),
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        EnvFilter::try_new(filter).map_err(|source| Error::InvalidFilter {
            filter: filter.to_owned(),
            source,
        })
    }

    /// Build a subscriber writing formatted log lines to `make_writer`.
    pub fn build_subscriber<W>(
        &self,
        make_writer: W,
    ) -> Result<Box<dyn tracing::Subscriber + Send + Sync>, Error>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let registry = tracing_subscriber::registry().with(self.env_filter()?);

        Ok(match self.log_format {
            LogFormat::Full => Box::new(registry.with(fmt::layer().with_writer(make_writer))),
            LogFormat::Pretty => {
                Box::new(registry.with(fmt::layer().pretty().with_writer(make_writer)))
            }
            LogFormat::Json => {
                Box::new(registry.with(fmt::layer().json().with_writer(make_writer)))
            }
        })
    }

    /// Build a subscriber logging to stdout and install it as the global default for all
    /// threads.
    pub fn install_global_subscriber(&self) -> Result<(), Error> {
        let subscriber = self.build_subscriber(std::io::stdout)?;
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(())
    }
}
