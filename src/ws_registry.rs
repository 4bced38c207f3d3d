//! WebSocket connection registry: maps an authenticated user id to exactly one live connection
//! and fans frames out to every registered connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Handle to one live socket: the sender half of the channel drained by the socket task.
#[derive(Debug)]
pub struct ConnectionEntry {
    pub conn_id: u64,
    tx: mpsc::Sender<String>,
}

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(0);

fn next_conn_id() -> u64 {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

impl ConnectionEntry {
    /// Allocate a handle with a fresh process-local id. The receiver belongs to the socket task;
    /// once it is dropped the handle reports itself closed.
    pub fn open(buffer: usize) -> (Arc<ConnectionEntry>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        let entry = Arc::new(ConnectionEntry {
            conn_id: next_conn_id(),
            tx,
        });
        (entry, rx)
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a frame without waiting. Returns false if the frame was dropped
    /// (buffer full or socket task gone).
    pub fn send(&self, frame: String) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(conn_id = self.conn_id, "ws send buffer full, frame dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Registry of authenticated connections, one per user id. Thread-safe; shared via Arc.
///
/// Register, unregister and the broadcast pass all take the same lock, so a broadcast never
/// observes a half-applied registration or removal.
pub struct ConnectionRegistry {
    inner: Mutex<HashMap<i32, Arc<ConnectionEntry>>>,
    gauge: Option<prometheus::IntGauge>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            gauge: None,
        }
    }

    /// Registry that mirrors its size into `gauge`.
    pub fn with_gauge(gauge: prometheus::IntGauge) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            gauge: Some(gauge),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i32, Arc<ConnectionEntry>>> {
        // Every critical section leaves the map consistent, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_gauge(&self, len: usize) {
        if let Some(gauge) = &self.gauge {
            gauge.set(len as i64);
        }
    }

    /// Insert or overwrite the entry for `uid`. Returns the superseded handle, if any.
    /// The superseded socket is left open; it just stops receiving broadcasts.
    pub fn register(&self, uid: i32, entry: Arc<ConnectionEntry>) -> Option<Arc<ConnectionEntry>> {
        let mut map = self.lock();
        let previous = map.insert(uid, entry);
        self.update_gauge(map.len());
        previous
    }

    /// Remove whatever entry holds connection `conn_id`, found by scanning. The socket may close
    /// without ever knowing which user it was registered under. Returns the removed user ids;
    /// empty if nothing matched.
    pub fn unregister(&self, conn_id: u64) -> Vec<i32> {
        let mut map = self.lock();
        let mut removed = Vec::new();
        map.retain(|&uid, entry| {
            if entry.conn_id == conn_id {
                removed.push(uid);
                false
            } else {
                true
            }
        });
        self.update_gauge(map.len());
        removed
    }

    /// Send `message` to every registered connection whose transport is still open. Closed
    /// handles are skipped, not removed; removal happens on disconnect. Returns how many
    /// connections accepted the frame.
    pub fn broadcast(&self, message: &str) -> usize {
        let map = self.lock();
        let mut delivered = 0;
        for (uid, entry) in map.iter() {
            if !entry.is_open() {
                tracing::trace!(uid, conn_id = entry.conn_id, "ws broadcast skipped closed connection");
                continue;
            }
            if entry.send(message.to_string()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Connection id currently registered for `uid`.
    pub fn connection_for(&self, uid: i32) -> Option<u64> {
        self.lock().get(&uid).map(|entry| entry.conn_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
