//! Event bus for snapshot notifications.
//!
//! The coordinator publishes one event per refresh outcome. Consumers
//! subscribe and re-read their values from the latest snapshot when notified.

use tokio::sync::broadcast;

use crate::event::{DucoEvent, EventMetadata};

/// Events buffered per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fan-out of [`DucoEvent`]s to every interested consumer of one box.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<(DucoEvent, EventMetadata)>,
    /// Identifies the bus, usually after the box it serves
    name: String,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus keeping up to `capacity` undelivered events per subscriber.
    ///
    /// A CLI polling every few seconds never gets close; a slow consumer
    /// loses the oldest notifications and re-reads the latest snapshot.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            name: "default".to_string(),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receivers currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish from the generic `system` source.
    ///
    /// Returns `false` when nobody is listening, which is not an error.
    pub fn publish(&self, event: DucoEvent) -> bool {
        self.publish_with_source(event, "system")
    }

    pub fn publish_with_source(&self, event: DucoEvent, source: impl Into<String>) -> bool {
        self.tx.send((event, EventMetadata::new(source))).is_ok()
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> EventBusReceiver {
        EventBusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Receive only the events `filter` accepts.
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&DucoEvent) -> bool + Send + 'static,
    {
        FilteredReceiver::new(self.tx.subscribe(), filter)
    }

    /// Receive refresh outcomes (published or failed) only.
    pub fn refresh_events(&self) -> FilteredReceiver<fn(&DucoEvent) -> bool> {
        self.subscribe_filtered(DucoEvent::is_refresh_event as fn(&DucoEvent) -> bool)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Unfiltered subscription.
pub struct EventBusReceiver {
    rx: broadcast::Receiver<(DucoEvent, EventMetadata)>,
}

impl EventBusReceiver {
    /// Next event. Events lost to lagging are skipped; `None` once every
    /// bus handle is gone.
    pub async fn recv(&mut self) -> Option<(DucoEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("event receiver lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<(DucoEvent, EventMetadata)> {
        self.rx.try_recv().ok()
    }
}

/// Subscription that drops events its filter rejects.
pub struct FilteredReceiver<F>
where
    F: Fn(&DucoEvent) -> bool + Send,
{
    rx: broadcast::Receiver<(DucoEvent, EventMetadata)>,
    filter: F,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&DucoEvent) -> bool + Send,
{
    fn new(rx: broadcast::Receiver<(DucoEvent, EventMetadata)>, filter: F) -> Self {
        Self { rx, filter }
    }

    /// Next accepted event.
    pub async fn recv(&mut self) -> Option<(DucoEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok((event, meta)) => {
                    if (self.filter)(&event) {
                        return Some((event, meta));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drain queued events up to the first accepted one.
    pub fn try_recv(&mut self) -> Option<(DucoEvent, EventMetadata)> {
        while let Ok((event, meta)) = self.rx.try_recv() {
            if (self.filter)(&event) {
                return Some((event, meta));
            }
        }
        None
    }
}
