use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления lifecycle логирования.
///
/// Держит guard неблокирующего file writer'а: пока handle жив, фоновый
/// поток пишет события в файл.
#[derive(Debug, Default)]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Завершает логирование: сбрасывает буферы file writer'а.
    pub fn shutdown(mut self) {
        tracing::info!(file_sink = self.has_file_sink(), "logging shutdown");
        drop(self.file_guard.take());
    }
}
