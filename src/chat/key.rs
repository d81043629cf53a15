use std::fmt;

/// Canonical identity of the conversation between two users, independent of
/// which side a message travels. `pair(a, b)` and `pair(b, a)` are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn pair(user_a: &str, user_b: &str) -> ConversationId {
        let (low, high) = if user_a <= user_b {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        };
        ConversationId(format!("{low}:{high}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
