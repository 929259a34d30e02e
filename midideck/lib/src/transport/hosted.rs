use super::*;
use midir::{MidiInput, MidiInputConnection};
use std::{sync::Arc, time::Duration};

const CLIENT_NAME: &str = "midideck-midi-in";
const PORT_NAME: &str = "midideck-read-input";

/// Transport backed by the system MIDI host through `midir`.
pub struct HostedTransport {
    client_name: String,
}

impl Default for HostedTransport {
    fn default() -> Self {
        Self {
            client_name: CLIENT_NAME.to_owned(),
        }
    }
}

impl HostedTransport {
    fn host(&self) -> Result<MidiInput, TransportError> {
        MidiInput::new(&self.client_name).map_err(|e| TransportError::Backend(e.to_string()))
    }
}

impl MidiTransport for HostedTransport {
    fn enumerate(&self, selector: &DeviceSelector) -> Result<Vec<DeviceInfo>, TransportError> {
        let host = self.host()?;
        let ports = host.ports();
        let mut devices = Vec::with_capacity(ports.len());

        for port in &ports {
            let device = DeviceInfo {
                name: host
                    .port_name(port)
                    .map_err(|e| TransportError::Backend(e.to_string()))?,
                id: port.id(),
            };

            if selector.matches(&device) {
                devices.push(device);
            }
        }

        Ok(devices)
    }

    fn connect(&self, device_id: &str) -> Result<Box<dyn MidiConnection>, TransportError> {
        let host = self.host()?;
        let port = host
            .find_port_by_id(device_id.to_owned())
            .ok_or_else(|| TransportError::DeviceNotFound(device_id.to_owned()))?;

        let slot = Arc::new(CallbackSlot::default());

        let callback = {
            let slot = slot.clone();

            move |timestamp: u64, bytes: &[u8], _: &mut ()| {
                slot.dispatch(&RawMidiMessage::new(Duration::from_micros(timestamp), bytes));
            }
        };

        let connection = host
            .connect(&port, PORT_NAME, callback, ())
            .map_err(|e| TransportError::Backend(e.to_string()))?;

        log::trace!("[ MIDI ] : connected to {device_id}");

        Ok(Box::new(HostedConnection {
            connection: Some(connection),
            slot,
        }))
    }
}

pub struct HostedConnection {
    connection: Option<MidiInputConnection<()>>,
    slot: Arc<CallbackSlot>,
}

impl MidiConnection for HostedConnection {
    fn subscribe(
        &mut self,
        callback: MessageCallback,
    ) -> Result<SubscriptionToken, TransportError> {
        if self.connection.is_none() {
            return Err(TransportError::Closed);
        }
        self.slot.install(callback)
    }

    fn unsubscribe(&mut self, token: SubscriptionToken) -> Result<(), TransportError> {
        self.slot.remove(token)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let connection = self.connection.take().ok_or(TransportError::Closed)?;
        let _ = connection.close();
        log::trace!("[ MIDI ] : connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn closed_connection() -> HostedConnection {
        HostedConnection {
            connection: None,
            slot: Arc::default(),
        }
    }

    #[test]
    fn closing_twice_reports_closed() {
        let mut connection = closed_connection();
        assert_eq!(connection.close(), Err(TransportError::Closed));
        assert_eq!(connection.close(), Err(TransportError::Closed));
    }

    #[test]
    fn closed_connections_refuse_subscribers() {
        let mut connection = closed_connection();
        let outcome = connection.subscribe(Box::new(|_| {}));

        assert_eq!(outcome, Err(TransportError::Closed));
        assert!(!connection.slot.is_installed());
    }
}
