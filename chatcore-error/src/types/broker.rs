use std::any::Any;

use thiserror::Error;

use crate::{BoxedError, ErrorExt, StatusCode};

/// Ошибки, которые `publish` возвращает синхронно вызывающему коду.
///
/// Потери при асинхронной маршрутизации (переполненный inbox получателя,
/// неизвестный получатель) сюда не попадают: они не наблюдаемы для
/// отправителя и учитываются только в статистике брокера.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// Сработал токен отмены или брокер остановлен.
    #[error("broker is cancelled")]
    Cancelled,

    /// Входная очередь заполнена в момент вызова.
    #[error("broker input queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },
}

/// Ошибки регистрации получателя.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Пустой идентификатор пользователя.
    #[error("identity must not be empty")]
    EmptyIdentity,

    /// Передан канал, у которого уже нет приёмника.
    #[error("inbox for '{identity}' is already closed")]
    InboxClosed { identity: String },
}

/// Ошибки запуска event loop'а.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// `run` уже вызывался для этого брокера.
    #[error("broker event loop has already been started")]
    AlreadyStarted,
}

/// Ошибка неблокирующего чтения из inbox подписчика.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryRecvError {
    #[error("no messages available")]
    Empty,

    #[error("inbox is disconnected")]
    Disconnected,
}

impl ErrorExt for PublishError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Cancelled => StatusCode::Cancelled,
            Self::QueueFull { .. } => StatusCode::QueueFull,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::Cancelled => "Chat is shutting down".to_string(),
            Self::QueueFull { .. } => "Chat is busy, try again".to_string(),
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "broker_publish".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        if let Self::QueueFull { capacity } = self {
            tags.push(("capacity", capacity.to_string()));
        }
        tags
    }
}

impl ErrorExt for RegisterError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyIdentity => StatusCode::InvalidIdentity,
            Self::InboxClosed { .. } => StatusCode::ChannelClosed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "broker_register".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        if let Self::InboxClosed { identity } = self {
            tags.push(("identity", identity.clone()));
        }
        tags
    }
}

impl ErrorExt for RunError {
    fn status_code(&self) -> StatusCode {
        StatusCode::AlreadyStarted
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for TryRecvError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Empty => StatusCode::Empty,
            Self::Disconnected => StatusCode::ChannelClosed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl From<PublishError> for BoxedError {
    fn from(err: PublishError) -> Self {
        BoxedError::new(err)
    }
}

impl From<RegisterError> for BoxedError {
    fn from(err: RegisterError) -> Self {
        BoxedError::new(err)
    }
}

impl From<RunError> for BoxedError {
    fn from(err: RunError) -> Self {
        BoxedError::new(err)
    }
}
