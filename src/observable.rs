//! Hot state channels for the presentation layer.
//!
//! An [`Observable`] always holds a value. Subscribers see the latest value
//! immediately and are woken on every publish. Only the owning service can
//! publish; consumers get read access through `get`, `subscribe` and `stream`.

use futures::stream::{self, Stream};
use tokio::sync::watch;

#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Receiver positioned at the current value.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Stream that yields the current value first, then every published value.
    ///
    /// Values published faster than the consumer polls are coalesced to the
    /// latest one. The stream ends when the owning service is dropped.
    pub fn stream(&self) -> impl Stream<Item = T> + Send + 'static
    where
        T: Send + Sync + 'static,
    {
        let rx = self.tx.subscribe();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let value = rx.borrow_and_update().clone();
            Some((value, (rx, false)))
        })
    }

    /// Store `value` and wake every subscriber, even if nobody is listening.
    pub(crate) fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }
}

impl<T: Clone + PartialEq> Observable<T> {
    /// Publish only when `value` differs from the current one.
    pub(crate) fn publish_if_changed(&self, value: T) {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
