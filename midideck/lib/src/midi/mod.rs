mod message;

pub use message::*;

use std::time::Duration;

/// A message as handed over by the transport for the duration
/// of a single callback. The borrow makes it impossible to keep
/// it around; use [`RawMidiMessage::to_owned_data`] to capture it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMidiMessage<'a> {
    timestamp: Duration,
    bytes: &'a [u8],
}

impl<'a> RawMidiMessage<'a> {
    pub fn new(timestamp: Duration, bytes: &'a [u8]) -> Self {
        Self { timestamp, bytes }
    }

    /// Message type tag: the status byte, with the channel
    /// nibble cleared for channel voice messages.
    /// An empty message has tag 0.
    pub fn tag(&self) -> u8 {
        match self.bytes.first() {
            Some(&status @ 0x80..=0xEF) => status & 0xF0,
            Some(&status) => status,
            None => 0,
        }
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn to_owned_data(&self) -> MidiData {
        MidiData {
            timestamp: self.timestamp,
            bytes: self.bytes.to_vec(),
        }
    }
}

/// Owned copy of a received message, safe to move across threads.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct MidiData {
    pub timestamp: Duration,
    pub bytes: Vec<u8>,
}

impl MidiData {
    pub fn as_raw(&self) -> RawMidiMessage<'_> {
        RawMidiMessage::new(self.timestamp, &self.bytes)
    }

    /// `"{timestamp in ns}, {rendered message}"`
    pub fn log_line(&self) -> String {
        let raw = self.as_raw();
        format!("{}, {}", self.timestamp.as_nanos(), decode(&raw))
    }
}
