use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot, watch};

use crate::Item;

/// What actually travels through a lane.
enum Envelope<T> {
    Queued(Item<T>),
    /// Rendezvous hand-off. The producer may withdraw the item from `slot`
    /// until a consumer has taken it.
    Handoff {
        slot: Arc<Mutex<Option<Item<T>>>>,
        taken: oneshot::Sender<()>,
    },
}

/// A bounded FIFO queue of [`Item`]s.
///
/// A lane is the unit of parallelism of a [`ResourceBus`](crate::ResourceBus):
/// producers push into it, a single consumer task drains it. Pushing into a
/// full lane suspends the producer until space frees up. A lane with capacity
/// `0` buffers nothing: every push suspends until a consumer has taken the item.
///
/// Once [`close`](Lane::close)d, no further pushes are accepted, and pushes
/// still suspended on the lane fail. Every item already queued is still handed
/// out by [`pop`](Lane::pop) before it starts returning `None`.
///
/// # Examples
///
/// ```
/// use mainbus::{Item, Lane};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let lane = Lane::new(2);
///
/// lane.push(Item::new(0, "iron", "Iron Plate")).await.unwrap();
/// lane.push(Item::new(1, "iron", "Iron Plate")).await.unwrap();
/// lane.close();
///
/// assert_eq!(lane.pop().await.map(|item| item.id()), Some(0));
/// assert_eq!(lane.pop().await.map(|item| item.id()), Some(1));
/// assert!(lane.pop().await.is_none());
/// # });
/// ```
pub struct Lane<T> {
    capacity: usize,
    sender: Mutex<Option<mpsc::Sender<Envelope<T>>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Envelope<T>>>,
    closed: watch::Sender<bool>,
}

impl<T> Lane<T> {
    /// Creates an empty, open lane holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        // tokio channels need at least one slot; a rendezvous lane uses it to
        // hand the envelope over while the producer waits for the ack.
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        Self {
            capacity,
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
            closed,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` once [`close`](Lane::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Enqueues an item at the back of the lane.
    ///
    /// Suspends while the lane is full. On a zero-capacity lane, suspends
    /// until a consumer has taken the item. A close that lands while the push
    /// is suspended fails it.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once the item is queued (or taken, for capacity `0`)
    /// * `Err(item)` if the lane was closed before the item got in; the item
    ///   is handed back untouched
    pub async fn push(&self, item: Item<T>) -> Result<(), Item<T>> {
        // Subscribe before looking at the sender so a close between the two
        // is still observed.
        let mut closed = self.closed.subscribe();
        let sender = match self.current_sender() {
            Some(sender) => sender,
            None => return Err(item),
        };

        let permit = tokio::select! {
            biased;
            _ = wait_closed(&mut closed) => return Err(item),
            permit = sender.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => return Err(item),
            },
        };

        if self.capacity > 0 {
            permit.send(Envelope::Queued(item));
            return Ok(());
        }

        let slot = Arc::new(Mutex::new(Some(item)));
        let (taken_tx, taken_rx) = oneshot::channel();
        permit.send(Envelope::Handoff {
            slot: Arc::clone(&slot),
            taken: taken_tx,
        });
        drop(sender);

        tokio::select! {
            biased;
            // An error means the envelope was dropped unread, which only
            // happens when the lane itself is being torn down.
            _ = taken_rx => Ok(()),
            _ = wait_closed(&mut closed) => match take_slot(&slot) {
                Some(item) => Err(item),
                // A consumer got to it first.
                None => Ok(()),
            },
        }
    }

    /// Removes the item at the front of the lane.
    ///
    /// Suspends while the lane is empty and still open. Returns `None` only
    /// once the lane is closed and every queued item has been handed out.
    pub async fn pop(&self) -> Option<Item<T>> {
        let mut receiver = self.receiver.lock().await;
        loop {
            match receiver.recv().await? {
                Envelope::Queued(item) => return Some(item),
                Envelope::Handoff { slot, taken } => {
                    // An empty slot was withdrawn by its producer on close.
                    if let Some(item) = take_slot(&slot) {
                        let _ = taken.send(());
                        return Some(item);
                    }
                }
            }
        }
    }

    /// Closes the lane for production.
    ///
    /// Items already queued are unaffected; pushes still suspended on the
    /// lane fail. Returns `true` if this call closed the lane, `false` if it
    /// was already closed.
    pub fn close(&self) -> bool {
        let was_open = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if was_open {
            self.closed.send_replace(true);
        }
        was_open
    }

    fn current_sender(&self) -> Option<mpsc::Sender<Envelope<T>>> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

fn take_slot<T>(slot: &Mutex<Option<Item<T>>>) -> Option<Item<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

impl<T> std::fmt::Debug for Lane<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lane")
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
