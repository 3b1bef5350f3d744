/// Write-only sink for `(from, to, payload)` triples: user-visible
/// chat UI and message history storage are out of scope for this crate, so
/// the agent only ever writes to this trait and never reads back through it.
pub trait MessageStore: Send {
    fn record(&mut self, from: &str, to: &str, payload: &[u8]);
}

/// A stored message, as captured by [`InMemoryMessageStore`]. Useful for
/// tests and for a minimal standalone binary that has no real chat UI to
/// hand the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub from: String,
    pub to: String,
    pub payload: Vec<u8>,
}

/// Default, in-process [`MessageStore`] that just accumulates messages. Logs
/// every write at `debug!` so a binary using it still gets observability
/// without a real store plugged in.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: Vec<StoredMessage>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[StoredMessage] {
        &self.messages
    }
}

impl MessageStore for InMemoryMessageStore {
    fn record(&mut self, from: &str, to: &str, payload: &[u8]) {
        tracing::debug!(from, to, len = payload.len(), "storing message");
        self.messages.push(StoredMessage {
            from: from.to_string(),
            to: to.to_string(),
            payload: payload.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_kept_in_order() {
        let mut store = InMemoryMessageStore::new();
        store.record("alice", "bob", b"hi");
        store.record("", "bob", b"anon");
        assert_eq!(
            store.messages(),
            &[
                StoredMessage {
                    from: "alice".into(),
                    to: "bob".into(),
                    payload: b"hi".to_vec()
                },
                StoredMessage {
                    from: "".into(),
                    to: "bob".into(),
                    payload: b"anon".to_vec()
                },
            ]
        );
    }
}
