/// Settings loading (defaults, file, `CHATCORE_*` environment).
pub mod config;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// In-process message routing: Broker, Registry, Subscriber, Message.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Error types and status codes.
pub use chatcore_error::{
    BoxedError, ChatResult, ErrorExt, PublishError, RegisterError, RunError, StatusCode,
    TryRecvError,
};
/// Configuration.
pub use config::{BrokerConfig, Settings};
/// Logging bootstrap.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Broker API.
pub use pubsub::{
    inbox, Broker, BrokerStats, Inbox, Message, Registry, StatsSnapshot, Subscriber,
    DEFAULT_QUEUE_CAPACITY,
};
/// Cancellation token accepted by [`Broker::new`].
pub use tokio_util::sync::CancellationToken;
