//! Boundary to the platform MIDI layer.
//!
//! The rest of the crate only talks to [`MidiTransport`] and
//! [`MidiConnection`], [`HostedTransport`] is the implementation
//! backed by the system MIDI host.

mod hosted;

pub use hosted::*;

use crate::midi::RawMidiMessage;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, PoisonError,
};

pub type MessageCallback = Box<dyn FnMut(&RawMidiMessage<'_>) + Send>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("MIDI backend failure : {0}")]
    Backend(String),
    #[error("no MIDI device with id {0}")]
    DeviceNotFound(String),
    #[error("connection is already closed")]
    Closed,
    #[error("subscription token is not registered on this connection")]
    UnknownToken,
    #[error("connection already has a subscriber")]
    AlreadySubscribed,
}

/// Which devices an enumeration should report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelector {
    name_filter: Option<String>,
}

impl DeviceSelector {
    pub fn midi_inputs() -> Self {
        Self::default()
    }

    pub fn with_name_filter(mut self, filter: impl Into<String>) -> Self {
        self.name_filter = Some(filter.into());
        self
    }

    pub fn matches(&self, device: &DeviceInfo) -> bool {
        match &self.name_filter {
            Some(filter) => device
                .name
                .to_lowercase()
                .contains(&filter.to_lowercase()),
            None => true,
        }
    }
}

/// A device as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

#[cfg_attr(test, mockall::automock)]
pub trait MidiTransport: Send + Sync {
    fn enumerate(&self, selector: &DeviceSelector) -> Result<Vec<DeviceInfo>, TransportError>;
    fn connect(&self, device_id: &str) -> Result<Box<dyn MidiConnection>, TransportError>;
}

pub trait MidiConnection: Send {
    /// Registers the single message callback of this connection.
    fn subscribe(&mut self, callback: MessageCallback)
        -> Result<SubscriptionToken, TransportError>;
    /// Once this returns, the callback is not running and will not run again.
    fn unsubscribe(&mut self, token: SubscriptionToken) -> Result<(), TransportError>;
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Holds the subscriber of a connection.
///
/// Delivery runs the callback while holding the slot lock, and
/// removal takes the callback out under the same lock, so
/// [`CallbackSlot::remove`] waits for an in-flight delivery and
/// nothing is delivered afterwards. A callback must not remove
/// itself.
#[derive(Default)]
pub struct CallbackSlot {
    subscriber: Mutex<Option<(SubscriptionToken, MessageCallback)>>,
    next_token: AtomicU64,
}

impl CallbackSlot {
    pub fn install(&self, callback: MessageCallback) -> Result<SubscriptionToken, TransportError> {
        let mut subscriber = self.subscriber.lock().unwrap_or_else(PoisonError::into_inner);
        if subscriber.is_some() {
            return Err(TransportError::AlreadySubscribed);
        }

        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        *subscriber = Some((token, callback));
        Ok(token)
    }

    pub fn remove(&self, token: SubscriptionToken) -> Result<(), TransportError> {
        let mut subscriber = self.subscriber.lock().unwrap_or_else(PoisonError::into_inner);
        match subscriber.as_ref() {
            Some((installed, _)) if *installed == token => {
                subscriber.take();
                Ok(())
            }
            _ => Err(TransportError::UnknownToken),
        }
    }

    /// Returns `false` when nobody is subscribed.
    pub fn dispatch(&self, message: &RawMidiMessage<'_>) -> bool {
        let mut subscriber = self.subscriber.lock().unwrap_or_else(PoisonError::into_inner);
        match subscriber.as_mut() {
            Some((_, callback)) => {
                callback(message);
                true
            }
            None => false,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
