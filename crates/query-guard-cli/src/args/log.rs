use clap::ValueEnum;

/// Crates logging below the trace level. Everything else is silenced.
const GUARD_TARGETS: [&str; 2] = ["query_guard", "query_cost"];

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogLevel {
    /// No logs at all
    Off,
    /// Errors only
    Error,
    /// Suspicious configuration, such as overlapping filter argument lists
    Warn,
    #[default]
    Info,
    /// Every admitted or rejected operation with its cost and depth
    Debug,
    /// Everything, dependencies included
    Trace,
}

impl LogLevel {
    /// `EnvFilter` directives for this level.
    pub(crate) fn filter_directives(self) -> String {
        let level = match self {
            LogLevel::Off => return String::from("off"),
            LogLevel::Trace => return String::from("trace"),
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };

        let mut directives = GUARD_TARGETS.map(|target| format!("{target}={level}")).join(",");
        directives.push_str(",off");
        directives
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogStyle {
    /// Human readable lines, colored on a terminal
    #[default]
    Text,
    /// One JSON object per event
    Json,
}
