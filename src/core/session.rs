/// Session Manager
///
/// Each streaming client gets a session: an id plus an unbounded FIFO queue of
/// JSON events. Any task may push onto a session by id; the session's single
/// consumer pops with a timeout so it can emit keepalives while idle. Closing
/// a session cancels its token, which wakes a consumer parked in
/// `pop_with_timeout`.

use dashmap::DashMap;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type SessionId = String;

/// Result of waiting on a session queue.
#[derive(Debug, Clone, PartialEq)]
pub enum PopOutcome {
    /// The next queued event, in push order.
    Event(Value),
    /// Nothing arrived within the timeout; the caller should send a keepalive.
    Timeout,
    /// The session is closed or never existed.
    Closed,
}

struct Session {
    sender: mpsc::UnboundedSender<Value>,
    receiver: Mutex<mpsc::UnboundedReceiver<Value>>,
    closed: CancellationToken,
}

/// Registry of open sessions.
///
/// The table is sharded, so operations on different sessions never contend on
/// a common lock. Cloning shares the same table.
#[derive(Clone, Default)]
pub struct SessionManager {
    sessions: Arc<DashMap<SessionId, Arc<Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session with an empty queue and return its id.
    pub fn create(&self) -> SessionId {
        let id = Uuid::new_v4().to_string();
        let (sender, receiver) = mpsc::unbounded_channel();
        let session = Session {
            sender,
            receiver: Mutex::new(receiver),
            closed: CancellationToken::new(),
        };
        self.sessions.insert(id.clone(), Arc::new(session));
        tracing::info!(session = %id, "session opened");
        id
    }

    /// Queue an event for a session.
    ///
    /// Events for a session that is closed or unknown have no recipient and
    /// are dropped without error.
    pub fn push(&self, id: &str, event: Value) {
        match self.lookup(id) {
            Some(session) => {
                // The receiver lives as long as the session entry; a failed
                // send means it closed between lookup and send.
                let _ = session.sender.send(event);
            }
            None => tracing::debug!(session = id, "dropping event for unknown session"),
        }
    }

    /// Wait up to `timeout` for the next event on a session.
    ///
    /// Only the calling task is suspended. Returns `Closed` immediately for an
    /// unknown id, and promptly if the session is closed while waiting.
    pub async fn pop_with_timeout(&self, id: &str, timeout: Duration) -> PopOutcome {
        let Some(session) = self.lookup(id) else {
            return PopOutcome::Closed;
        };

        tokio::select! {
            biased;
            _ = session.closed.cancelled() => PopOutcome::Closed,
            received = async {
                let mut receiver = session.receiver.lock().await;
                tokio::time::timeout(timeout, receiver.recv()).await
            } => match received {
                Ok(Some(event)) => PopOutcome::Event(event),
                Ok(None) => PopOutcome::Closed,
                Err(_) => PopOutcome::Timeout,
            },
        }
    }

    /// Close a session, discarding any queued events. Closing twice is a no-op.
    pub fn close(&self, id: &str) {
        if let Some((_, session)) = self.sessions.remove(id) {
            session.closed.cancel();
            tracing::info!(session = id, "session closed");
        }
    }

    #[cfg(test)]
    pub fn is_open(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Open a session and expose it as an event stream.
    ///
    /// The first item announces the session id, then queued events follow in
    /// order, with a `{"type": "ping"}` keepalive after every idle `keepalive`
    /// period. The stream ends when the session is closed, and dropping the
    /// stream closes the session.
    pub fn subscribe(&self, keepalive: Duration) -> (SessionId, BoxStream<'static, Value>) {
        let id = self.create();
        let guard = SessionGuard {
            manager: self.clone(),
            id: id.clone(),
        };

        let announce = stream::iter([json!({"type": "session", "id": id})]);
        let events = stream::unfold(guard, move |guard| async move {
            match guard.manager.pop_with_timeout(&guard.id, keepalive).await {
                PopOutcome::Event(event) => Some((event, guard)),
                PopOutcome::Timeout => Some((json!({"type": "ping"}), guard)),
                PopOutcome::Closed => None,
            }
        });

        (id, announce.chain(events).boxed())
    }

    fn lookup(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }
}

/// Closes its session when the owning stream is dropped.
struct SessionGuard {
    manager: SessionManager,
    id: SessionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.manager.close(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn events_are_delivered_in_push_order() {
        let manager = SessionManager::new();
        let id = manager.create();

        for n in 1..=3 {
            manager.push(&id, json!({"n": n}));
        }

        for n in 1..=3 {
            let outcome = manager.pop_with_timeout(&id, Duration::from_secs(1)).await;
            assert_eq!(outcome, PopOutcome::Event(json!({"n": n})));
        }
    }

    #[tokio::test]
    async fn push_to_unknown_or_closed_session_is_a_no_op() {
        let manager = SessionManager::new();
        manager.push("not-a-session", json!({"lost": true}));
        assert!(manager.is_empty());

        let id = manager.create();
        manager.close(&id);
        manager.push(&id, json!({"lost": true}));

        assert!(!manager.is_open(&id));
        assert_eq!(manager.len(), 0);
        assert_eq!(
            manager.pop_with_timeout(&id, Duration::from_millis(10)).await,
            PopOutcome::Closed
        );
    }

    #[tokio::test]
    async fn empty_queue_times_out() {
        let manager = SessionManager::new();
        let id = manager.create();

        let started = Instant::now();
        let outcome = manager.pop_with_timeout(&id, Duration::from_millis(30)).await;
        let elapsed = started.elapsed();

        assert_eq!(outcome, PopOutcome::Timeout);
        assert!(elapsed >= Duration::from_millis(30));
        assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
        assert!(manager.is_open(&id));
    }

    #[tokio::test]
    async fn close_wakes_a_waiting_consumer() {
        let manager = SessionManager::new();
        let id = manager.create();

        let waiter = {
            let manager = manager.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                let outcome = manager.pop_with_timeout(&id, Duration::from_secs(30)).await;
                (outcome, started.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.close(&id);
        manager.close(&id);

        let (outcome, elapsed) = waiter.await.unwrap();
        assert_eq!(outcome, PopOutcome::Closed);
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let manager = SessionManager::new();
        let a = manager.create();
        let b = manager.create();
        assert_ne!(a, b);

        manager.push(&a, json!("for-a"));

        assert_eq!(
            manager.pop_with_timeout(&b, Duration::from_millis(10)).await,
            PopOutcome::Timeout
        );
        assert_eq!(
            manager.pop_with_timeout(&a, Duration::from_millis(10)).await,
            PopOutcome::Event(json!("for-a"))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_keep_per_producer_order() {
        let manager = SessionManager::new();
        let id = manager.create();

        let mut producers = Vec::new();
        for producer in 0..4 {
            let manager = manager.clone();
            let id = id.clone();
            producers.push(tokio::spawn(async move {
                for seq in 0..50 {
                    manager.push(&id, json!({"producer": producer, "seq": seq}));
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        let mut last_seen = [-1i64; 4];
        for _ in 0..200 {
            let PopOutcome::Event(event) =
                manager.pop_with_timeout(&id, Duration::from_secs(1)).await
            else {
                panic!("expected an event");
            };
            let producer = event["producer"].as_u64().unwrap() as usize;
            let seq = event["seq"].as_i64().unwrap();
            assert!(seq > last_seen[producer]);
            last_seen[producer] = seq;
        }
        assert_eq!(last_seen, [49; 4]);
    }

    #[tokio::test]
    async fn subscribe_announces_session_then_streams_events_and_pings() {
        let manager = SessionManager::new();
        let (id, mut events) = manager.subscribe(Duration::from_millis(20));

        let first = events.next().await.unwrap();
        assert_eq!(first, json!({"type": "session", "id": id}));

        manager.push(&id, json!({"hello": "world"}));
        assert_eq!(events.next().await.unwrap(), json!({"hello": "world"}));
        assert_eq!(events.next().await.unwrap(), json!({"type": "ping"}));

        manager.close(&id);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn dropping_the_stream_closes_the_session() {
        let manager = SessionManager::new();
        let (id, events) = manager.subscribe(Duration::from_secs(30));
        assert!(manager.is_open(&id));

        drop(events);

        assert!(!manager.is_open(&id));
        assert!(manager.is_empty());
    }
}
