use std::collections::HashMap;

use crate::include_res;

use super::store::{MessageStore, StoreError, StoredMessage};

/// Fetch the ordered history for a pair, fresh from the store on every call.
/// The pairing is order-independent: `(a, b)` and `(b, a)` load the same
/// sequence. No prior messages is an empty sequence, not an error.
pub async fn load(
    store: &dyn MessageStore,
    user_a: &str,
    user_b: &str,
) -> Result<Vec<StoredMessage>, StoreError> {
    store.query_by_pair(user_a, user_b).await
}

/// Render loaded history for the conversation page. `aliases` maps the two
/// participants' user ids to their display names.
pub fn render(messages: &[StoredMessage], aliases: &HashMap<String, String>) -> String {
    messages
        .iter()
        .map(|message| {
            let alias = aliases
                .get(&message.from)
                .map_or(message.from.as_str(), String::as_str);

            let mut body = String::new();
            pulldown_cmark::html::push_html(
                &mut body,
                pulldown_cmark::Parser::new(&message.body),
            );

            include_res!(str, "/pages/chat/message.html")
                .replace("{from}", &message.from)
                .replace("{alias}", alias)
                .replace("{body}", &body)
        })
        .collect()
}
