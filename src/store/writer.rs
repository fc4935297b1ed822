use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use crate::store::KeyValueStorage;

enum WriteRequest {
    Put { key: String, value: Vec<u8> },
    Flush(mpsc::Sender<()>),
}

/// Background writer shared by every dataset's disabled set.
///
/// Requests are applied by a single thread in the order they were sent.
/// Whatever has queued up while a write was in flight is drained in one
/// batch and collapsed to the newest value per key, so the stored value of a
/// key always ends at the last value handed to [`WriteQueue::put`].
pub struct WriteQueue {
    tx: Option<mpsc::Sender<WriteRequest>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl WriteQueue {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || run(storage, rx));
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Queues a write and returns immediately.
    pub fn put(&self, key: &str, value: Vec<u8>) {
        let request = WriteRequest::Put {
            key: key.to_string(),
            value,
        };
        if let Some(tx) = &self.tx
            && tx.send(request).is_err()
        {
            tracing::warn!("writer thread has stopped; dropping write for {key}");
        }
    }

    /// Blocks until everything queued before this call has been written.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else { return };
        let (ack_tx, ack_rx) = mpsc::channel();
        if tx.send(WriteRequest::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker finish the backlog and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("writer thread panicked");
        }
    }
}

fn run(storage: Arc<dyn KeyValueStorage>, rx: mpsc::Receiver<WriteRequest>) {
    while let Ok(first) = rx.recv() {
        let mut pending: Vec<(String, Vec<u8>)> = Vec::new();
        let mut acks = Vec::new();

        let mut next = Some(first);
        while let Some(request) = next {
            match request {
                WriteRequest::Put { key, value } => {
                    match pending.iter_mut().find(|(k, _)| *k == key) {
                        Some(slot) => slot.1 = value,
                        None => pending.push((key, value)),
                    }
                }
                WriteRequest::Flush(ack) => acks.push(ack),
            }
            next = rx.try_recv().ok();
        }

        for (key, value) in pending {
            match storage.write(&key, &value) {
                Ok(()) => tracing::trace!("wrote {} bytes to {key}", value.len()),
                Err(e) => tracing::warn!("{e}"),
            }
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
}
