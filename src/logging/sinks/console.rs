use std::io::{self, Stdout};

use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{
    config::LoggingConfig,
    formatter::{self, FormatOptions},
};

/// Console layer по конфигурации.
pub fn layer_with_config<S>(config: &LoggingConfig) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let opts = FormatOptions {
        format: config.console_format(),
        with_ansi: config.console.with_ansi,
        with_target: config.console.with_target,
        with_thread_ids: config.console.with_thread_ids,
    };
    let writer: fn() -> Stdout = io::stdout;

    formatter::build_formatter(opts, writer)
}
