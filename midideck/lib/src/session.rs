use crate::{
    devices::{DeviceDescriptor, DeviceDirectory},
    transport::{DeviceSelector, MidiConnection, MidiTransport, TransportError},
};
use crossbeam::channel::RecvTimeoutError;
use std::{sync::Arc, time::Duration};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("device enumeration failed : {0}")]
    Enumeration(TransportError),
    #[error("no MIDI input device available")]
    NoDeviceAvailable,
    #[error("selection {index} is out of range, there are {count} device(s)")]
    SelectionOutOfRange { index: usize, count: usize },
    #[error("connection not opened within {0:?}")]
    ConnectionTimeout(Duration),
    #[error("failed to open the connection : {0}")]
    Connection(TransportError),
}

/// What a [`ChoiceSource`] answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Index(usize),
    /// Input that could not be read as an index.
    Malformed(String),
}

/// Picks one device out of the presented list.
pub trait ChoiceSource {
    /// `None` when no choice will ever be made (cancelled, end of input).
    fn choose(&mut self, devices: &[DeviceDescriptor]) -> Option<Selection>;
}

impl ChoiceSource for usize {
    fn choose(&mut self, _: &[DeviceDescriptor]) -> Option<Selection> {
        Some(Selection::Index(*self))
    }
}

impl<C: ChoiceSource + ?Sized> ChoiceSource for Box<C> {
    fn choose(&mut self, devices: &[DeviceDescriptor]) -> Option<Selection> {
        (**self).choose(devices)
    }
}

/// An open connection to the chosen device.
pub struct Session {
    device: DeviceDescriptor,
    connection: Box<dyn MidiConnection>,
}

impl Session {
    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub(crate) fn into_parts(self) -> (DeviceDescriptor, Box<dyn MidiConnection>) {
        (self.device, self.connection)
    }
}

pub struct SessionNegotiator<C> {
    transport: Arc<dyn MidiTransport>,
    choice: C,
    selector: DeviceSelector,
    directory: DeviceDirectory,
    connect_timeout: Duration,
}

impl<C: ChoiceSource> SessionNegotiator<C> {
    pub fn new(transport: Arc<dyn MidiTransport>, choice: C) -> Self {
        Self {
            transport,
            choice,
            selector: DeviceSelector::midi_inputs(),
            directory: DeviceDirectory::default(),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn with_selector(mut self, selector: DeviceSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The devices found by the last negotiation.
    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    /// Enumerate, ask for a choice and connect to it.
    /// Every failure ends this attempt, nothing is retried.
    pub fn select_and_connect(&mut self) -> Result<Session, Error> {
        self.directory
            .refresh(self.transport.clone(), self.selector.clone())
            .map_err(Error::Enumeration)?;

        if self.directory.is_empty() {
            return Err(Error::NoDeviceAvailable);
        }

        let index = match self.choice.choose(self.directory.devices()) {
            Some(Selection::Index(index)) => index,
            Some(Selection::Malformed(input)) => {
                log::warn!("[ MIDI ] : unusable device selection : {input:?}");
                return Err(Error::NoDeviceAvailable);
            }
            None => return Err(Error::NoDeviceAvailable),
        };

        let Some(device) = self.directory.get(index).cloned() else {
            return Err(Error::SelectionOutOfRange {
                index,
                count: self.directory.len(),
            });
        };

        let connection = self.connect(&device.id)?;
        log::trace!("[ MIDI ] : session opened on {}", device.display_name);

        Ok(Session { device, connection })
    }

    fn connect(&self, device_id: &str) -> Result<Box<dyn MidiConnection>, Error> {
        let (tx, rx) = crossbeam::channel::bounded(1);

        std::thread::spawn({
            let transport = self.transport.clone();
            let device_id = device_id.to_owned();

            move || {
                // a late connection is dropped here, unopened
                if tx.send(transport.connect(&device_id)).is_err() {
                    log::warn!("[ MIDI ] : discarding connection to {device_id} opened after timeout");
                }
            }
        });

        match rx.recv_timeout(self.connect_timeout) {
            Ok(result) => result.map_err(Error::Connection),
            Err(RecvTimeoutError::Timeout) => Err(Error::ConnectionTimeout(self.connect_timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Connection(TransportError::Backend(
                "connection request stopped without a result".to_owned(),
            ))),
        }
    }
}
