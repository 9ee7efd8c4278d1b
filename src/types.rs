use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Opaque identifier issued by the identity provider.
///
/// Correlates an initiated authentication attempt with its eventual outcome;
/// every `collect` and `cancel` call is keyed by it.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct OrderRef(pub String);

impl OrderRef {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Server-generated identifier for a memory-backed session.
///
/// Only meaningful to the process that generated it; the browser holds it as
/// an opaque cookie value.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_ref_from_string() {
        let order = OrderRef::from("ORD-1".to_string());
        assert_eq!(order.to_string(), "ORD-1");
        assert_eq!(order.as_str(), "ORD-1");
    }

    #[test]
    fn session_id_from_string() {
        let id = SessionId::from("sess-abc".to_string());
        assert_eq!(id.to_string(), "sess-abc");
    }

    #[test]
    fn order_ref_serde_transparent() {
        let order = OrderRef::from("ORD-1".to_string());
        let json = serde_json::to_string(&order).unwrap();
        assert_eq!(json, "\"ORD-1\"");
        let parsed: OrderRef = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, order);
    }

    #[test]
    fn newtypes_prevent_mixing() {
        fn takes_order_ref(_: &OrderRef) {}
        fn takes_session_id(_: &SessionId) {}

        let order = OrderRef::from("id".to_string());
        let session = SessionId::from("id".to_string());

        takes_order_ref(&order);
        takes_session_id(&session);
        // takes_order_ref(&session);  // Compile error!
        // takes_session_id(&order);   // Compile error!
    }
}
