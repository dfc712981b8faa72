use serde::{Deserialize, Serialize};

/// Сообщение чата.
///
/// Значение неизменяемо после создания. Брокер не интерпретирует `content`
/// и не проверяет `timestamp`: время проставляет вызывающий код.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    /// Получатель; игнорируется при `broadcast == true`.
    pub recipient: String,
    pub content: String,
    pub broadcast: bool,
    pub timestamp: i64,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
        broadcast: bool,
        timestamp: i64,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            content: content.into(),
            broadcast,
            timestamp,
        }
    }

    /// Личное сообщение ровно одному получателю.
    pub fn private(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self::new(sender, recipient, content, false, timestamp)
    }

    /// Сообщение всем зарегистрированным пользователям, включая отправителя.
    pub fn broadcast(
        sender: impl Into<String>,
        content: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self::new(sender, String::new(), content, true, timestamp)
    }

    pub fn is_broadcast(&self) -> bool {
        self.broadcast
    }

    pub fn is_private(&self) -> bool {
        !self.broadcast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет создание личного сообщения.
    #[test]
    fn test_private_message() {
        let msg = Message::private("alice", "bob", "hi", 1_700_000_000);

        assert_eq!(msg.sender, "alice");
        assert_eq!(msg.recipient, "bob");
        assert_eq!(msg.content, "hi");
        assert!(msg.is_private());
        assert!(!msg.is_broadcast());
        assert_eq!(msg.timestamp, 1_700_000_000);
    }

    /// Тест проверяет, что у широковещательного сообщения пустой получатель.
    #[test]
    fn test_broadcast_message_has_no_recipient() {
        let msg = Message::broadcast("alice", "hello all", 42);

        assert!(msg.is_broadcast());
        assert!(msg.recipient.is_empty());
        assert_eq!(msg.content, "hello all");
    }

    /// Тест проверяет, что содержимое и время не изменяются и не
    /// проверяются (допускаются пустые строки и отрицательное время).
    #[test]
    fn test_content_and_timestamp_are_opaque() {
        let msg = Message::new("", "", "", false, -1);

        assert_eq!(msg.sender, "");
        assert_eq!(msg.content, "");
        assert_eq!(msg.timestamp, -1);
    }

    /// Тест проверяет имена полей в JSON-представлении, которое использует
    /// транспортный слой.
    #[test]
    fn test_json_field_names() {
        let msg = Message::private("alice", "bob", "hi", 7);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["sender"], "alice");
        assert_eq!(json["recipient"], "bob");
        assert_eq!(json["content"], "hi");
        assert_eq!(json["broadcast"], false);
        assert_eq!(json["timestamp"], 7);
    }
}
