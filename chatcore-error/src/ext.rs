use std::{any::Any, error::Error};

use crate::StatusCode;

/// Общее расширение для ошибок брокера (object-safe).
///
/// Даёт транспортному слою (websocket/HTTP-обработчику) единый способ
/// получить статус-код, безопасный текст для клиента и теги для метрик,
/// не зная конкретного типа ошибки.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Статус-код ошибки. По умолчанию [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Ошибка как [`Any`] для downcast к конкретному типу.
    fn as_any(&self) -> &dyn Any;

    /// Сообщение, которое можно отдать клиенту.
    ///
    /// Для внутренних ошибок детали скрываются.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::Unknown | StatusCode::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Детализированное сообщение для логов.
    fn log_message(&self) -> String {
        format!("{self:?}")
    }

    /// Теги для метрик: тип ошибки и статус-код.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().to_string()),
        ]
    }

    /// Короткое имя типа ошибки (без пути модулей).
    fn type_name(&self) -> String {
        std::any::type_name::<Self>()
            .split("::")
            .last()
            .unwrap_or("Unknown")
            .to_string()
    }
}

/// Обёртка над любой ошибкой, реализующей `ErrorExt`.
pub struct BoxedError {
    inner: Box<dyn ErrorExt>,
}

impl BoxedError {
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            inner: Box::new(err),
        }
    }

    pub fn into_inner(self) -> Box<dyn ErrorExt> {
        self.inner
    }

    /// Пытается получить ссылку на исходную ошибку конкретного типа.
    pub fn downcast_ref<E: ErrorExt>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref::<E>()
    }
}

impl std::fmt::Debug for BoxedError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{:?}", self.inner)
    }
}

impl std::fmt::Display for BoxedError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl Error for BoxedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source()
    }
}

impl ErrorExt for BoxedError {
    fn status_code(&self) -> StatusCode {
        self.inner.status_code()
    }

    fn as_any(&self) -> &dyn Any {
        self.inner.as_any()
    }

    fn client_message(&self) -> String {
        self.inner.client_message()
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        self.inner.metrics_tags()
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;
    use crate::{PublishError, RunError};

    // Ошибка без переопределения status_code (default = Internal).
    #[derive(Debug)]
    struct Opaque;

    impl fmt::Display for Opaque {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "opaque failure with secrets")
        }
    }

    impl Error for Opaque {}

    impl ErrorExt for Opaque {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Тест проверяет, что внутренняя ошибка не раскрывает детали клиенту.
    #[test]
    fn test_client_message_hides_internal() {
        let e = Opaque;
        assert_eq!(e.status_code(), StatusCode::Internal);
        assert_eq!(e.client_message(), "Internal server error");
        assert!(e.log_message().contains("Opaque"));
    }

    /// Тест проверяет, что `BoxedError` сохраняет статус-код и позволяет
    /// выполнить downcast.
    #[test]
    fn test_boxed_error_preserves_status_and_downcast() {
        let boxed: BoxedError = PublishError::QueueFull { capacity: 8 }.into();
        assert_eq!(boxed.status_code(), StatusCode::QueueFull);
        assert!(boxed.to_string().contains('8'));

        let inner = boxed.downcast_ref::<PublishError>();
        assert_eq!(inner, Some(&PublishError::QueueFull { capacity: 8 }));
        assert!(boxed.downcast_ref::<RunError>().is_none());
    }

    /// Тест проверяет, что `type_name` возвращает короткое имя типа.
    #[test]
    fn test_type_name_is_short() {
        let e = RunError::AlreadyStarted;
        assert_eq!(e.type_name(), "RunError");
    }
}
