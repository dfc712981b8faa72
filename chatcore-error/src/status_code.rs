use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Коды статуса для категоризации ошибок брокера.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки данных (некорректные аргументы вызова)
/// - 4xxx: Ёмкость и ограничения
/// - 6xxx: Каналы и жизненный цикл
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Internal = 1001,
    InvalidArgs = 1002,

    // === 2xxx: Ошибки данных ===
    NotFound = 2000,
    InvalidIdentity = 2001,

    // === 4xxx: Ёмкость ===
    QueueFull = 4000,

    // === 6xxx: Каналы/жизненный цикл ===
    ChannelClosed = 6000,
    Cancelled = 6001,
    AlreadyStarted = 6002,
    Empty = 6003,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Имеет ли смысл повторить операцию позже.
    ///
    /// Переполненная очередь освобождается по мере работы event loop'а.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QueueFull | Self::Empty)
    }

    /// Ошибка со стороны вызывающего кода (диапазоны `2xxx` и `InvalidArgs`).
    pub fn is_client_error(&self) -> bool {
        (2000..=2999).contains(&self.code()) || matches!(self, Self::InvalidArgs)
    }

    /// Ошибка жизненного цикла брокера или канала (диапазон `6xxx`).
    pub fn is_lifecycle_error(&self) -> bool {
        (6000..=6999).contains(&self.code())
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::Empty => LogLevel::Trace,
            Self::QueueFull | Self::Cancelled | Self::ChannelClosed => LogLevel::Debug,
            Self::InvalidArgs | Self::InvalidIdentity => LogLevel::Info,
            Self::AlreadyStarted => LogLevel::Warn,
            Self::Unknown | Self::Internal => LogLevel::Error,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
