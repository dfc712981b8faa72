use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use super::{inbox, BrokerStats, Inbox, Message, Registry, StatsSnapshot, Subscriber};
use crate::{config::BrokerConfig, PublishError, RegisterError, RunError};

/// Ёмкость входной очереди по умолчанию.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Внутрипроцессный брокер сообщений чата.
///
/// Производители вызывают [`publish`](Self::publish), который только кладёт
/// сообщение в ограниченную входную очередь. Единственный event loop
/// ([`run`](Self::run)) забирает сообщения по порядку и раскладывает их по
/// inbox'ам получателей через `try_send`:
/// - заполненный inbox получателя — сообщение для него отбрасывается,
///   остальные получатели не затрагиваются;
/// - неизвестный получатель личного сообщения — сообщение отбрасывается.
///
/// Ни одна из этих потерь не возвращается отправителю, они видны только в
/// [`stats`](Self::stats). Брокер никогда не ждёт медленного получателя.
///
/// Цикл завершается по внешнему токену отмены или по [`stop`](Self::stop).
/// Сообщения, оставшиеся в очереди, при этом отбрасываются.
pub struct Broker {
    input: mpsc::Sender<Message>,
    /// Приёмник очереди; забирается при первом вызове `run`.
    queue: Mutex<Option<mpsc::Receiver<Message>>>,
    registry: Arc<Registry>,
    /// Внешний токен: брокер только наблюдает его.
    cancel: CancellationToken,
    /// Собственный сигнал остановки.
    stop: CancellationToken,
    capacity: usize,
    stats: BrokerStats,
}

impl Broker {
    /// Создаёт брокер с очередью на [`DEFAULT_QUEUE_CAPACITY`] сообщений.
    pub fn new(cancel: CancellationToken) -> Self {
        Self::with_capacity(cancel, DEFAULT_QUEUE_CAPACITY)
    }

    /// Создаёт брокер с заданной ёмкостью входной очереди (не меньше 1).
    pub fn with_capacity(
        cancel: CancellationToken,
        capacity: usize,
    ) -> Self {
        let capacity = capacity.max(1);
        let (input, queue) = mpsc::channel(capacity);
        Self {
            input,
            queue: Mutex::new(Some(queue)),
            registry: Arc::new(Registry::new()),
            cancel,
            stop: CancellationToken::new(),
            capacity,
            stats: BrokerStats::new(),
        }
    }

    pub fn from_config(
        cancel: CancellationToken,
        config: &BrokerConfig,
    ) -> Self {
        Self::with_capacity(cancel, config.queue_capacity)
    }

    /// Запускает event loop и ждёт его завершения.
    ///
    /// Брокер одноразовый: повторный вызов возвращает
    /// [`RunError::AlreadyStarted`].
    pub async fn run(&self) -> Result<(), RunError> {
        let mut queue = self.queue.lock().take().ok_or(RunError::AlreadyStarted)?;

        tracing::info!(capacity = self.capacity, "broker event loop started");

        // Сигналы завершения проверяются раньше очереди: после отмены
        // не маршрутизируется ни одно сообщение, даже если очередь не пуста.
        let reason = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break "cancelled",
                _ = self.stop.cancelled() => break "stopped",
                msg = queue.recv() => match msg {
                    Some(msg) => self.route_message(msg),
                    None => break "closed",
                },
            }
        };

        // Дальнейшие publish должны падать, а не висеть в закрытой очереди.
        self.stop.cancel();
        queue.close();
        let discarded = queue.len();
        drop(queue);

        tracing::info!(reason, discarded, "broker event loop stopped");
        Ok(())
    }

    /// Запускает [`run`](Self::run) в отдельной tokio-задаче.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<Result<(), RunError>> {
        let broker = Arc::clone(self);
        tokio::spawn(async move { broker.run().await })
    }

    /// Посылает сигнал остановки. Повторные вызовы ничего не делают.
    pub fn stop(&self) {
        if !self.stop.is_cancelled() {
            tracing::debug!("broker stop requested");
            self.stop.cancel();
        }
    }

    /// `true`, если сработал внешний токен или брокер остановлен.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.stop.is_cancelled()
    }

    /// Неблокирующая публикация.
    ///
    /// Успех означает только то, что сообщение принято в очередь:
    /// подтверждения доставки нет.
    pub fn publish(
        &self,
        msg: Message,
    ) -> Result<(), PublishError> {
        if self.is_stopped() {
            BrokerStats::incr(&self.stats.rejected_cancelled);
            return Err(PublishError::Cancelled);
        }

        match self.input.try_send(msg) {
            Ok(()) => {
                BrokerStats::incr(&self.stats.published);
                Ok(())
            }
            Err(TrySendError::Full(msg)) => {
                BrokerStats::incr(&self.stats.rejected_full);
                tracing::debug!(
                    sender = %msg.sender,
                    capacity = self.capacity,
                    "input queue full, message rejected"
                );
                Err(PublishError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => {
                BrokerStats::incr(&self.stats.rejected_cancelled);
                Err(PublishError::Cancelled)
            }
        }
    }

    /// Регистрирует inbox пользователя, заменяя предыдущий.
    ///
    /// Канал создаёт и читает вызывающий код. Уже закрытый канал отвергается
    /// сразу, а не молча теряет все будущие сообщения.
    pub fn register_user(
        &self,
        identity: &str,
        inbox: Inbox,
    ) -> Result<(), RegisterError> {
        if identity.is_empty() {
            return Err(RegisterError::EmptyIdentity);
        }
        if inbox.is_closed() {
            return Err(RegisterError::InboxClosed {
                identity: identity.to_string(),
            });
        }

        let replaced = self.registry.register(identity, inbox).is_some();
        tracing::debug!(identity, replaced, "user registered");
        Ok(())
    }

    /// Снимает регистрацию. Неизвестный пользователь — не ошибка.
    pub fn unregister_user(
        &self,
        identity: &str,
    ) {
        if self.registry.unregister(identity) {
            tracing::debug!(identity, "user unregistered");
        }
    }

    /// Создаёт inbox заданной ёмкости, регистрирует его и возвращает
    /// дескриптор получателя.
    pub fn subscribe(
        &self,
        identity: &str,
        capacity: usize,
    ) -> Result<Subscriber, RegisterError> {
        let (tx, rx) = inbox(capacity);
        let weak = tx.downgrade();
        self.register_user(identity, tx)?;
        Ok(Subscriber::new(
            identity,
            rx,
            weak,
            Arc::downgrade(&self.registry),
        ))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn queue_capacity(&self) -> usize {
        self.capacity
    }

    /// Сколько сообщений сейчас ждёт в очереди.
    pub fn queued(&self) -> usize {
        self.capacity - self.input.capacity()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn route_message(
        &self,
        msg: Message,
    ) {
        BrokerStats::incr(&self.stats.routed);

        if msg.broadcast {
            // Отправитель тоже получает свою рассылку.
            let targets = self.registry.snapshot();
            tracing::trace!(sender = %msg.sender, fanout = targets.len(), "routing broadcast");
            for (identity, tx) in &targets {
                self.deliver(identity, tx, msg.clone());
            }
            return;
        }

        match self.registry.lookup(&msg.recipient) {
            Some(tx) => {
                let recipient = msg.recipient.clone();
                self.deliver(&recipient, &tx, msg);
            }
            None => {
                BrokerStats::incr(&self.stats.unknown_recipient);
                tracing::trace!(
                    sender = %msg.sender,
                    recipient = %msg.recipient,
                    "unknown recipient, message discarded"
                );
            }
        }
    }

    fn deliver(
        &self,
        identity: &str,
        tx: &Inbox,
        msg: Message,
    ) {
        match tx.try_send(msg) {
            Ok(()) => BrokerStats::incr(&self.stats.delivered),
            Err(TrySendError::Full(_)) => {
                BrokerStats::incr(&self.stats.dropped_full);
                tracing::trace!(identity, "inbox full, message dropped");
            }
            Err(TrySendError::Closed(_)) => {
                BrokerStats::incr(&self.stats.dropped_closed);
                tracing::trace!(identity, "inbox closed, message dropped");
            }
        }
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("capacity", &self.capacity)
            .field("users", &self.registry.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    fn broker() -> Broker {
        Broker::new(CancellationToken::new())
    }

    /// Тест проверяет, что личное сообщение попадает только адресату.
    #[test]
    fn test_route_private_only_to_recipient() {
        let broker = broker();
        let (a_tx, mut a_rx) = inbox(2);
        let (b_tx, mut b_rx) = inbox(2);
        broker.register_user("a", a_tx).unwrap();
        broker.register_user("b", b_tx).unwrap();

        broker.route_message(Message::private("a", "b", "hi", 1));

        assert_eq!(b_rx.try_recv().unwrap().content, "hi");
        assert!(a_rx.try_recv().is_err());
        assert_eq!(broker.stats().delivered, 1);
    }

    /// Тест проверяет, что рассылка доходит и до отправителя.
    #[test]
    fn test_route_broadcast_includes_sender() {
        let broker = broker();
        let (a_tx, mut a_rx) = inbox(1);
        let (b_tx, mut b_rx) = inbox(1);
        broker.register_user("a", a_tx).unwrap();
        broker.register_user("b", b_tx).unwrap();

        broker.route_message(Message::broadcast("a", "all", 1));

        assert_eq!(a_rx.try_recv().unwrap().sender, "a");
        assert_eq!(b_rx.try_recv().unwrap().content, "all");
    }

    /// Тест проверяет отбрасывание для заполненного и закрытого inbox и для
    /// неизвестного получателя, с учётом в статистике.
    #[test]
    fn test_route_drops_are_counted() {
        let broker = broker();
        let (full_tx, _full_rx) = inbox(1);
        full_tx.try_send(Message::broadcast("x", "filler", 0)).unwrap();
        let (closed_tx, closed_rx) = inbox(1);
        broker.register_user("full", full_tx).unwrap();
        broker.register_user("closed", closed_tx).unwrap();
        drop(closed_rx);

        broker.route_message(Message::broadcast("x", "lost", 1));
        broker.route_message(Message::private("x", "nobody", "lost", 2));

        let stats = broker.stats();
        assert_eq!(stats.routed, 2);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.dropped_full, 1);
        assert_eq!(stats.dropped_closed, 1);
        assert_eq!(stats.unknown_recipient, 1);
    }

    /// Тест проверяет, что без работающего цикла очередь заполняется и
    /// `publish` сразу возвращает `QueueFull`.
    #[test]
    fn test_publish_queue_full() {
        let broker = Broker::with_capacity(CancellationToken::new(), 2);

        broker.publish(Message::broadcast("a", "1", 1)).unwrap();
        broker.publish(Message::broadcast("a", "2", 2)).unwrap();
        assert_eq!(broker.queued(), 2);

        let err = broker.publish(Message::broadcast("a", "3", 3)).unwrap_err();
        assert_eq!(err, PublishError::QueueFull { capacity: 2 });
        assert_eq!(broker.stats().rejected_full, 1);
    }

    /// Тест проверяет, что после отмены `publish` возвращает `Cancelled`.
    #[test]
    fn test_publish_after_cancel() {
        let token = CancellationToken::new();
        let broker = Broker::new(token.clone());
        token.cancel();

        assert!(broker.is_stopped());
        assert_eq!(
            broker.publish(Message::broadcast("a", "x", 1)),
            Err(PublishError::Cancelled)
        );
        assert_eq!(broker.stats().rejected_cancelled, 1);
    }

    /// Тест проверяет, что ёмкость очереди не может быть нулевой.
    #[test]
    fn test_zero_capacity_is_clamped() {
        let broker = Broker::with_capacity(CancellationToken::new(), 0);
        assert_eq!(broker.queue_capacity(), 1);
        assert_eq!(broker.queued(), 0);
    }

    /// Тест проверяет валидацию аргументов регистрации.
    #[test]
    fn test_register_user_validation() {
        let broker = broker();
        let (tx, rx) = inbox(1);
        drop(rx);

        assert_eq!(
            broker.register_user("", inbox(1).0),
            Err(RegisterError::EmptyIdentity)
        );
        assert_eq!(
            broker.register_user("zed", tx),
            Err(RegisterError::InboxClosed {
                identity: "zed".into()
            })
        );
        assert!(broker.registry().is_empty());
    }

    /// Тест проверяет, что повторный запуск цикла запрещён.
    #[tokio::test]
    async fn test_run_twice_fails() {
        let broker = Arc::new(broker());
        let handle = broker.spawn();
        tokio::task::yield_now().await;

        // Первый запуск забирает очередь и завершается по stop, второй
        // очередь уже не получит.
        broker.stop();
        let first = handle.await.unwrap();
        let second = broker.run().await;

        assert!(first.is_ok());
        assert_eq!(second, Err(RunError::AlreadyStarted));
    }

    /// Тест проверяет, что после отмены цикл не маршрутизирует сообщения,
    /// оставшиеся в очереди.
    #[tokio::test]
    async fn test_cancel_discards_queued_messages() {
        let token = CancellationToken::new();
        let broker = Broker::new(token.clone());
        let (tx, mut rx) = inbox(8);
        broker.register_user("a", tx).unwrap();

        for i in 0..5 {
            broker.publish(Message::private("b", "a", "late", i)).unwrap();
        }
        token.cancel();

        timeout(Duration::from_millis(500), broker.run())
            .await
            .expect("run did not return")
            .unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(broker.stats().routed, 0);
    }

    /// Тест проверяет, что `stop` до запуска приводит к немедленному
    /// завершению `run`, а публикация после этого отвергается.
    #[tokio::test]
    async fn test_stop_before_run() {
        let broker = broker();
        broker.stop();
        broker.stop();

        timeout(Duration::from_millis(500), broker.run())
            .await
            .expect("run did not return")
            .unwrap();
        assert_eq!(
            broker.publish(Message::broadcast("a", "x", 1)),
            Err(PublishError::Cancelled)
        );
    }
}
