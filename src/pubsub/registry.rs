use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::Message;

/// Канал доставки получателя.
///
/// Создаёт и читает его сам получатель; реестр хранит только клон
/// отправляющей половины и никогда не закрывает канал.
pub type Inbox = mpsc::Sender<Message>;

type Identity = Arc<str>;

/// Создаёт пару (inbox, receiver) для нового получателя.
///
/// Ёмкость ограничивается снизу единицей.
pub fn inbox(capacity: usize) -> (Inbox, mpsc::Receiver<Message>) {
    mpsc::channel(capacity.max(1))
}

/// Реестр получателей: идентификатор → inbox.
///
/// Чтение (поиск, снимок для рассылки) идёт параллельно под read-lock'ом,
/// регистрация и удаление берут write-lock. Блокировка удерживается только
/// на время работы с картой, отправки выполняются уже после её снятия.
#[derive(Debug, Default)]
pub struct Registry {
    users: RwLock<HashMap<Identity, Inbox>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Сохраняет или заменяет inbox для `identity`.
    ///
    /// Возвращает ранее зарегистрированный inbox, если он был.
    pub fn register(
        &self,
        identity: &str,
        inbox: Inbox,
    ) -> Option<Inbox> {
        self.users.write().insert(Arc::from(identity), inbox)
    }

    /// Удаляет запись. Отсутствие записи не является ошибкой.
    pub fn unregister(
        &self,
        identity: &str,
    ) -> bool {
        self.users.write().remove(identity).is_some()
    }

    /// Удаляет запись, только если она всё ещё указывает на тот же канал.
    ///
    /// Нужна для устаревших дескрипторов: повторная регистрация с новым
    /// каналом не должна сниматься старым владельцем.
    pub fn unregister_if_same(
        &self,
        identity: &str,
        inbox: &Inbox,
    ) -> bool {
        let mut users = self.users.write();
        let same = users
            .get(identity)
            .is_some_and(|current| current.same_channel(inbox));
        if same {
            users.remove(identity);
        }
        same
    }

    /// Текущий inbox получателя.
    pub fn lookup(
        &self,
        identity: &str,
    ) -> Option<Inbox> {
        self.users.read().get(identity).cloned()
    }

    /// Снимок всех записей на момент вызова для широковещательной рассылки.
    pub fn snapshot(&self) -> Vec<(Identity, Inbox)> {
        self.users
            .read()
            .iter()
            .map(|(id, tx)| (id.clone(), tx.clone()))
            .collect()
    }

    pub fn contains(
        &self,
        identity: &str,
    ) -> bool {
        self.users.read().contains_key(identity)
    }

    /// Отсортированный список зарегистрированных идентификаторов.
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.users.read().keys().map(|k| k.to_string()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}
