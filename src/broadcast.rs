//! Process-local broadcast bus, the stand-in for platform inter-component
//! messaging.
//!
//! Receivers register for a single action string. Delivery happens on a
//! dispatch thread owned by the bus, in broadcast order; [`BroadcastBus::broadcast`]
//! never blocks on receivers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

use crossbeam_channel::{Sender, unbounded};

/// Addressed message carried over the bus.
///
/// Extras are typed key-value slots; the purchase flow rides an integer
/// response code and a serialized-purchase blob.
#[derive(Debug, Clone)]
pub struct Intent {
    action: String,
    ints: HashMap<String, i64>,
    strings: HashMap<String, String>,
    blobs: HashMap<String, Vec<u8>>,
}

impl Intent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ints: HashMap::new(),
            strings: HashMap::new(),
            blobs: HashMap::new(),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn with_int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.ints.insert(key.into(), value);
        self
    }

    pub fn with_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.strings.insert(key.into(), value.into());
        self
    }

    pub fn with_blob(mut self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.blobs.insert(key.into(), value);
        self
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.ints.get(key).copied()
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    pub fn blob(&self, key: &str) -> Option<&[u8]> {
        self.blobs.get(key).map(Vec::as_slice)
    }
}

/// Handle for a registered receiver; pass it back to
/// [`BroadcastBus::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverId(u64);

type Handler = Arc<dyn Fn(&Intent) + Send + Sync>;

struct Registration {
    id: u64,
    action: String,
    handler: Handler,
}

#[derive(Clone)]
pub struct BroadcastBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    tx: Sender<Intent>,
    receivers: Arc<Mutex<Vec<Registration>>>,
    next_id: AtomicU64,
}

impl BroadcastBus {
    /// Create a bus with its own dispatch thread.
    pub fn new() -> Self {
        let (tx, rx) = unbounded::<Intent>();
        let receivers: Arc<Mutex<Vec<Registration>>> = Arc::new(Mutex::new(Vec::new()));
        let dispatch_receivers = Arc::clone(&receivers);
        thread::spawn(move || {
            for intent in rx {
                // Snapshot matching handlers so receivers may register or
                // unregister from inside a callback.
                let handlers: Vec<Handler> = {
                    let guard = dispatch_receivers
                        .lock()
                        .unwrap_or_else(|e| e.into_inner());
                    guard
                        .iter()
                        .filter(|r| r.action == intent.action())
                        .map(|r| Arc::clone(&r.handler))
                        .collect()
                };
                for handler in handlers {
                    handler(&intent);
                }
            }
        });
        Self {
            inner: Arc::new(BusInner {
                tx,
                receivers,
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// The process-wide bus, created on first use.
    pub fn local() -> BroadcastBus {
        static LOCAL: OnceLock<BroadcastBus> = OnceLock::new();
        LOCAL.get_or_init(BroadcastBus::new).clone()
    }

    /// Register a receiver for one action.
    pub fn register(
        &self,
        action: impl Into<String>,
        handler: impl Fn(&Intent) + Send + Sync + 'static,
    ) -> ReceiverId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self
            .inner
            .receivers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        guard.push(Registration {
            id,
            action: action.into(),
            handler: Arc::new(handler),
        });
        ReceiverId(id)
    }

    /// Unregistering an unknown id is a no-op.
    pub fn unregister(&self, id: ReceiverId) {
        let mut guard = self
            .inner
            .receivers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        guard.retain(|r| r.id != id.0);
    }

    /// Queue an intent for delivery and return immediately.
    pub fn broadcast(&self, intent: Intent) {
        if self.inner.tx.send(intent).is_err() {
            log::warn!("broadcast dispatch thread is gone; dropping intent");
        }
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}
