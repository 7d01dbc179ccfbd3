use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use clap::Parser;
use query_guard_config::Config;
use serde_json::{Map, Value};
use tracing::Subscriber;
use tracing_subscriber::{registry::LookupSpan, Layer};

mod log;

pub(crate) use log::LogLevel;

use self::log::LogStyle;

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

#[derive(Debug, Parser)]
#[command(name = "query-guard", version)]
/// Checks a GraphQL operation against the query cost policy without executing it
pub struct Args {
    /// Path to the TOML configuration file. Built-in defaults are used without one.
    #[arg(long, short, env = "QUERY_GUARD_CONFIG_PATH")]
    pub config: Option<PathBuf>,
    /// Operation to check when the document defines several
    #[arg(long, short = 'o')]
    pub operation_name: Option<String>,
    /// Path to a JSON file holding the request variables
    #[arg(long)]
    pub variables: Option<PathBuf>,
    /// Set the logging level
    #[arg(long = "log", env = "QUERY_GUARD_LOG")]
    pub log_level: Option<LogLevel>,
    /// Set the style of log output
    #[arg(long, env = "QUERY_GUARD_LOG_STYLE", value_enum, default_value_t)]
    log_style: LogStyle,
    /// Path to the GraphQL document, `-` reads it from standard input
    pub query: PathBuf,
}

pub(crate) fn parse() -> Args {
    Args::parse()
}

impl Args {
    pub fn log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_default()
    }

    pub fn config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Ok(Config::load(path)?),
            None => Ok(Config::default()),
        }
    }

    pub fn query(&self) -> anyhow::Result<String> {
        if self.query == Path::new("-") {
            let mut query = String::new();
            io::stdin()
                .read_to_string(&mut query)
                .context("error reading the query from standard input")?;
            return Ok(query);
        }

        fs::read_to_string(&self.query).with_context(|| format!("error loading query {}", self.query.display()))
    }

    pub fn variables(&self) -> anyhow::Result<Map<String, Value>> {
        let Some(path) = &self.variables else {
            return Ok(Map::new());
        };

        let variables = fs::read_to_string(path).map_err(|e| anyhow!("error loading variables:\n{e}"))?;

        match serde_json::from_str(&variables)? {
            Value::Object(variables) => Ok(variables),
            Value::Null => Ok(Map::new()),
            _ => Err(anyhow!("variables must be a JSON object")),
        }
    }

    pub fn log_format<S>(&self) -> BoxedLayer<S>
    where
        S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
    {
        let layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

        match self.log_style {
            // for interactive terminals we provide colored output
            LogStyle::Text if atty::is(atty::Stream::Stderr) => layer.with_ansi(true).boxed(),
            LogStyle::Text => layer.with_ansi(false).boxed(),
            LogStyle::Json => layer.json().boxed(),
        }
    }
}
