//! Маршрутизация сообщений чата внутри процесса.
//!
//! - `broker`: входная очередь, event loop и маршрутизация (личные сообщения
//!   и рассылка всем).
//! - `message`: сообщение чата.
//! - `registry`: реестр получателей (идентификатор → inbox).
//! - `stats`: счётчики публикаций, доставок и потерь.
//! - `subscriber`: дескриптор получателя с автоматической отпиской.

pub mod broker;
pub mod message;
pub mod registry;
pub mod stats;
pub mod subscriber;

// Публичный экспорт типов из вложенных модулей, чтобы упростить доступ к
// ним из внешнего кода.
pub use broker::*;
pub use message::*;
pub use registry::*;
pub use stats::*;
pub use subscriber::*;
