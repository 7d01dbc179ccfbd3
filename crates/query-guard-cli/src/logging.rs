use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::args::Args;

/// Logs go to stderr, stdout carries the report.
pub(crate) fn init(args: &Args) {
    let filter = args.log_level().filter_directives();

    tracing_subscriber::registry()
        .with(args.log_format())
        .with(EnvFilter::new(filter))
        .init();
}
