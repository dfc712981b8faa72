use std::sync::atomic::{AtomicU64, Ordering};

/// Счётчики брокера.
///
/// Потери при маршрутизации не возвращаются отправителю, поэтому это
/// единственное место, где их видно.
#[derive(Debug, Default)]
pub struct BrokerStats {
    /// Сообщения, принятые во входную очередь.
    pub published: AtomicU64,
    /// Отказы `publish` из-за заполненной очереди.
    pub rejected_full: AtomicU64,
    /// Отказы `publish` после отмены или остановки.
    pub rejected_cancelled: AtomicU64,
    /// Сообщения, извлечённые event loop'ом из очереди.
    pub routed: AtomicU64,
    /// Успешные отправки в inbox получателей.
    pub delivered: AtomicU64,
    /// Отброшено из-за заполненного inbox получателя.
    pub dropped_full: AtomicU64,
    /// Отброшено из-за закрытого inbox (получатель не снял регистрацию).
    pub dropped_closed: AtomicU64,
    /// Личные сообщения незарегистрированным получателям.
    pub unknown_recipient: AtomicU64,
}

/// Снимок счётчиков на момент вызова.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub published: u64,
    pub rejected_full: u64,
    pub rejected_cancelled: u64,
    pub routed: u64,
    pub delivered: u64,
    pub dropped_full: u64,
    pub dropped_closed: u64,
    pub unknown_recipient: u64,
}

impl BrokerStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            rejected_full: self.rejected_full.load(Ordering::Relaxed),
            rejected_cancelled: self.rejected_cancelled.load(Ordering::Relaxed),
            routed: self.routed.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            unknown_recipient: self.unknown_recipient.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Все потери при маршрутизации.
    pub fn dropped(&self) -> u64 {
        self.dropped_full + self.dropped_closed + self.unknown_recipient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что снимок отражает инкременты и суммирует потери.
    #[test]
    fn test_snapshot_and_dropped_total() {
        let stats = BrokerStats::new();
        BrokerStats::incr(&stats.published);
        BrokerStats::incr(&stats.published);
        BrokerStats::incr(&stats.dropped_full);
        BrokerStats::incr(&stats.unknown_recipient);
        BrokerStats::incr(&stats.dropped_closed);

        let snap = stats.snapshot();
        assert_eq!(snap.published, 2);
        assert_eq!(snap.delivered, 0);
        assert_eq!(snap.dropped(), 3);
    }
}
