//! Forwards the transport's message callbacks to the message log
//! and to the consumer's note action.

mod sink;

pub use sink::*;

use crate::{
    devices::DeviceDescriptor,
    midi::decode,
    session::Session,
    transport::{MessageCallback, MidiConnection, SubscriptionToken, TransportError},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bridge is already registered")]
    AlreadyRegistered,
    #[error("bridge is not registered")]
    NotRegistered,
    #[error("bridge is closed")]
    Closed,
    #[error("bridge has no open connection")]
    NoConnection,
    #[error("failed to subscribe to the connection : {0}")]
    Subscribe(TransportError),
    #[error("failed to unsubscribe from the connection : {0}")]
    Unsubscribe(TransportError),
    #[error("failed to close the connection : {0}")]
    Close(TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Unregistered,
    Registered,
    Deregistering,
    Closed,
}

/// Receives the note number of every note-on.
///
/// Runs on the transport's delivery thread: a slow action holds
/// up the delivery of the following messages.
pub trait NoteAction: Send + 'static {
    fn on_note(&mut self, note: u8);
}

impl<F: FnMut(u8) + Send + 'static> NoteAction for F {
    fn on_note(&mut self, note: u8) {
        self(note)
    }
}

pub struct EventBridge {
    device: DeviceDescriptor,
    connection: Option<Box<dyn MidiConnection>>,
    action: Arc<Mutex<dyn NoteAction>>,
    log: MessageLog,
    token: Option<SubscriptionToken>,
    state: BridgeState,
    is_active: Arc<AtomicBool>,
}

impl EventBridge {
    pub fn new(session: Session, action: impl NoteAction, log: MessageLog) -> Self {
        let (device, connection) = session.into_parts();

        Self {
            device,
            connection: Some(connection),
            action: Arc::new(Mutex::new(action)),
            log,
            token: None,
            state: BridgeState::Unregistered,
            is_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Register the single message callback on the connection.
    pub fn start(&mut self) -> Result<(), Error> {
        match self.state {
            BridgeState::Unregistered => (),
            BridgeState::Registered | BridgeState::Deregistering => {
                return Err(Error::AlreadyRegistered)
            }
            BridgeState::Closed => return Err(Error::Closed),
        }

        let connection = self.connection.as_mut().ok_or(Error::NoConnection)?;

        self.is_active.store(true, Ordering::SeqCst);
        let callback = message_callback(
            self.is_active.clone(),
            self.log.submitter(),
            self.action.clone(),
        );

        match connection.subscribe(callback) {
            Ok(token) => {
                self.token = Some(token);
                self.state = BridgeState::Registered;
                log::trace!("[ MIDI ] : listening to {}", self.device.display_name);
                Ok(())
            }
            Err(e) => {
                self.is_active.store(false, Ordering::SeqCst);
                Err(Error::Subscribe(e))
            }
        }
    }

    /// Deregister the callback, then close the connection.
    ///
    /// Once the callback is deregistered no delivery is running or
    /// will start for this bridge. Lines already queued on the
    /// message log are still written.
    pub fn stop(&mut self) -> Result<(), Error> {
        if self.state != BridgeState::Registered {
            return Err(Error::NotRegistered);
        }

        self.state = BridgeState::Deregistering;
        self.is_active.store(false, Ordering::SeqCst);

        let mut connection = self.connection.take().ok_or(Error::NoConnection)?;

        let deregistered = match self.token.take() {
            Some(token) => connection.unsubscribe(token).map_err(Error::Unsubscribe),
            None => Err(Error::NotRegistered),
        };
        let closed = connection.close().map_err(Error::Close);

        self.state = BridgeState::Closed;
        self.log.shutdown();
        log::trace!("[ MIDI ] : stopped listening to {}", self.device.display_name);

        deregistered.and(closed)
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        if self.state == BridgeState::Registered {
            if let Err(e) = self.stop() {
                log::error!("[ MIDI ] : failed to tear down the bridge : {e}");
            }
        }
    }
}

fn message_callback(
    is_active: Arc<AtomicBool>,
    submitter: LogSubmitter,
    action: Arc<Mutex<dyn NoteAction>>,
) -> MessageCallback {
    Box::new(move |message| {
        if !is_active.load(Ordering::SeqCst) {
            return;
        }

        submitter.submit(message.to_owned_data());

        if let Some(note) = decode(message).kind.note_on() {
            action
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .on_note(note);
        }
    })
}
