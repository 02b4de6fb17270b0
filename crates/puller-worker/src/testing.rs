//! In-memory doubles for the object store and broker deliveries.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io::Cursor;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use puller_nats::object::{DeleteOutcome, ObjectDigest};
use puller_nats::stream::DeliveryInfo;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::{Notify, Semaphore};

use crate::{Delivery, FetchedObject, ObjectSource};

#[derive(Clone)]
enum Behavior {
    Intact,
    Corrupted,
    Truncated(usize),
    Gated(Arc<Semaphore>),
}

#[derive(Clone)]
struct StoredObject {
    data: Vec<u8>,
    deleted: bool,
    behavior: Behavior,
}

/// Object store kept in memory.
#[derive(Clone, Default)]
pub struct MemorySource {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    removed: Arc<Mutex<Vec<String>>>,
    failing_removes: Arc<Mutex<HashSet<String>>>,
    opened: Arc<Notify>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(self, key: &str, data: &[u8], deleted: bool, behavior: Behavior) -> Self {
        self.objects.lock().unwrap().insert(
            key.to_owned(),
            StoredObject {
                data: data.to_vec(),
                deleted,
                behavior,
            },
        );
        self
    }

    pub fn with_object(self, key: &str, data: &[u8]) -> Self {
        self.insert(key, data, false, Behavior::Intact)
    }

    /// Delete marker whose content is already purged.
    pub fn with_deleted_object(self, key: &str) -> Self {
        self.insert(key, &[], true, Behavior::Intact)
    }

    pub fn with_corrupted_object(self, key: &str, data: &[u8]) -> Self {
        self.insert(key, data, false, Behavior::Corrupted)
    }

    pub fn with_truncated_object(self, key: &str, data: &[u8], len: usize) -> Self {
        self.insert(key, data, false, Behavior::Truncated(len))
    }

    /// Object whose content never arrives.
    pub fn with_stalled_object(self, key: &str, data: &[u8]) -> Self {
        self.insert(key, data, false, Behavior::Gated(Arc::new(Semaphore::new(0))))
    }

    /// Object whose content arrives once `gate` receives a permit.
    pub fn with_gated_object(self, key: &str, data: &[u8], gate: Arc<Semaphore>) -> Self {
        self.insert(key, data, false, Behavior::Gated(gate))
    }

    pub fn with_failing_remove(self, key: &str) -> Self {
        self.failing_removes.lock().unwrap().insert(key.to_owned());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    /// Resolves once an object has been opened.
    pub async fn wait_opened(&self) {
        self.opened.notified().await;
    }
}

#[async_trait]
impl ObjectSource for MemorySource {
    async fn open(&self, key: &str) -> puller_nats::Result<FetchedObject> {
        let stored = self.objects.lock().unwrap().get(key).cloned();
        let Some(stored) = stored else {
            return Err(puller_nats::Error::object_not_found("uploads", key));
        };
        if stored.deleted {
            return Err(puller_nats::Error::object_deleted("uploads", key));
        }
        self.opened.notify_one();

        let size = stored.data.len() as u64;
        let digest: [u8; 32] = match stored.behavior {
            Behavior::Corrupted => Sha256::digest(b"something else").into(),
            _ => Sha256::digest(&stored.data).into(),
        };
        let (content, gate) = match stored.behavior {
            Behavior::Truncated(len) => (stored.data[..len].to_vec(), None),
            Behavior::Gated(gate) => (stored.data, Some(gate)),
            _ => (stored.data, None),
        };

        Ok(FetchedObject {
            reader: Box::pin(GatedReader::new(content, gate)),
            size,
            digest: Some(ObjectDigest::from(digest)),
        })
    }

    async fn remove(&self, key: &str) -> puller_nats::Result<DeleteOutcome> {
        if self.failing_removes.lock().unwrap().contains(key) {
            return Err(puller_nats::Error::operation("delete", "store unavailable"));
        }

        let mut objects = self.objects.lock().unwrap();
        match objects.get(key) {
            Some(stored) if !stored.deleted => {
                objects.remove(key);
                self.removed.lock().unwrap().push(key.to_owned());
                Ok(DeleteOutcome::Removed)
            }
            _ => Ok(DeleteOutcome::AlreadyAbsent),
        }
    }
}

type Gate = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Reader that yields nothing until its gate opens.
struct GatedReader {
    gate: Option<Gate>,
    content: Cursor<Vec<u8>>,
}

impl GatedReader {
    fn new(content: Vec<u8>, gate: Option<Arc<Semaphore>>) -> Self {
        let gate = gate.map(|gate| -> Gate {
            Box::pin(async move {
                if let Ok(permit) = gate.acquire_owned().await {
                    permit.forget();
                }
            })
        });

        Self {
            gate,
            content: Cursor::new(content),
        }
    }
}

impl AsyncRead for GatedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if let Some(gate) = self.gate.as_mut() {
            if gate.as_mut().poll(cx).is_pending() {
                return Poll::Pending;
            }
            self.gate = None;
        }
        Pin::new(&mut self.content).poll_read(cx, buf)
    }
}

/// Terminal signal recorded by [`FakeDelivery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Ack,
    Nak(Duration),
    Term,
}

/// Delivery that records the signals it receives.
#[derive(Clone)]
pub struct FakeDelivery {
    payload: Vec<u8>,
    info: DeliveryInfo,
    signals: Arc<Mutex<Vec<Signal>>>,
    failing_ack: bool,
    observed: Option<PathBuf>,
    seen_at_ack: Arc<Mutex<Option<Option<Vec<u8>>>>>,
}

impl FakeDelivery {
    pub fn new(payload: impl AsRef<[u8]>) -> Self {
        Self {
            payload: payload.as_ref().to_vec(),
            info: DeliveryInfo::new(1, 1, Duration::from_secs(300)),
            signals: Arc::default(),
            failing_ack: false,
            observed: None,
            seen_at_ack: Arc::default(),
        }
    }

    pub fn with_failing_ack(mut self) -> Self {
        self.failing_ack = true;
        self
    }

    /// Records the content of `path` at the moment the ack is sent.
    pub fn observing(mut self, path: impl Into<PathBuf>) -> Self {
        self.observed = Some(path.into());
        self
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }

    /// Content of the observed path when the ack was sent; `None` if no ack was sent.
    pub fn seen_at_ack(&self) -> Option<Option<Vec<u8>>> {
        self.seen_at_ack.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for FakeDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn info(&self) -> &DeliveryInfo {
        &self.info
    }

    async fn ack(&self, _deadline: Duration) -> puller_nats::Result<()> {
        if let Some(path) = &self.observed {
            *self.seen_at_ack.lock().unwrap() = Some(std::fs::read(path).ok());
        }
        self.signals.lock().unwrap().push(Signal::Ack);
        if self.failing_ack {
            return Err(puller_nats::Error::Ack("broker did not confirm".into()));
        }
        Ok(())
    }

    async fn nak(&self, delay: Duration, _deadline: Duration) -> puller_nats::Result<()> {
        self.signals.lock().unwrap().push(Signal::Nak(delay));
        Ok(())
    }

    async fn term(&self, _deadline: Duration) -> puller_nats::Result<()> {
        self.signals.lock().unwrap().push(Signal::Term);
        Ok(())
    }
}
