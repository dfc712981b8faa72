use std::sync::{Arc, Weak};

use tokio::sync::mpsc;

use super::{Message, Registry};
use crate::TryRecvError;

/// Дескриптор получателя, созданный через [`Broker::subscribe`].
///
/// Владеет приёмной стороной inbox'а. Регистрация снимается автоматически
/// при `Drop`, но только если реестр всё ещё указывает на этот же канал.
/// Поток сообщений заканчивается (`recv` возвращает `None`), когда запись
/// удалена из реестра и буфер вычитан.
///
/// [`Broker::subscribe`]: crate::Broker::subscribe
pub struct Subscriber {
    identity: Arc<str>,
    inner: mpsc::Receiver<Message>,
    inbox: mpsc::WeakSender<Message>,
    registry: Weak<Registry>,
}

impl Subscriber {
    pub(crate) fn new(
        identity: &str,
        inner: mpsc::Receiver<Message>,
        inbox: mpsc::WeakSender<Message>,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            identity: Arc::from(identity),
            inner,
            inbox,
            registry,
        }
    }

    /// Асинхронно ожидает следующее сообщение.
    ///
    /// `None` означает, что регистрация снята и буфер пуст.
    pub async fn recv(&mut self) -> Option<Message> {
        self.inner.recv().await
    }

    /// Пытается получить сообщение без ожидания.
    pub fn try_recv(&mut self) -> Result<Message, TryRecvError> {
        self.inner.try_recv().map_err(|err| match err {
            mpsc::error::TryRecvError::Empty => TryRecvError::Empty,
            mpsc::error::TryRecvError::Disconnected => TryRecvError::Disconnected,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Количество сообщений в буфере.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Явно снимает регистрацию. Аналогично `drop(self)`.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let (Some(registry), Some(inbox)) = (self.registry.upgrade(), self.inbox.upgrade()) else {
            return;
        };
        if registry.unregister_if_same(&self.identity, &inbox) {
            tracing::debug!(identity = %self.identity, "subscriber dropped, registration removed");
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("identity", &self.identity)
            .field("buffered", &self.inner.len())
            .finish()
    }
}
