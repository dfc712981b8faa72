use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{
    config::{LoggingConfig, Rotation},
    formatter::{self, FormatOptions},
    LoggingError,
};

/// File layer с ротацией и неблокирующим writer'ом.
///
/// `WorkerGuard` нужно держать живым, пока нужна запись: при его drop
/// буфер сбрасывается в файл.
pub fn layer_with_config<S>(
    config: &LoggingConfig
) -> Result<(Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard), LoggingError>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let rotation = match config.file.rotation {
        Rotation::Minutely => rolling::Rotation::MINUTELY,
        Rotation::Hourly => rolling::Rotation::HOURLY,
        Rotation::Daily => rolling::Rotation::DAILY,
        Rotation::Never => rolling::Rotation::NEVER,
    };
    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.file.filename.as_str())
        .build(&config.file.dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let opts = FormatOptions {
        format: config.file.format,
        with_ansi: false,
        with_target: true,
        with_thread_ids: true,
    };

    Ok((formatter::build_formatter(opts, writer), guard))
}
