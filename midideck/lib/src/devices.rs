use crate::transport::{DeviceInfo, DeviceSelector, MidiTransport, TransportError};
use crossbeam::channel::Receiver;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    /// Extracts the 8 hex digit part of a platform device id,
    /// e.g. `...#MIDII_1A2B3C4D.P_0000#...`.
    static ref HEX_ID_PATTERN: Regex =
        Regex::new(r"#MIDII_([0-9A-F]{8})\..+#").expect("hex id pattern is valid");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub name: String,
    pub id: String,
    pub hex_id: Option<String>,
    pub display_name: String,
}

impl From<DeviceInfo> for DeviceDescriptor {
    fn from(DeviceInfo { name, id }: DeviceInfo) -> Self {
        match HEX_ID_PATTERN.captures(&id).and_then(|c| c.get(1)) {
            Some(hex_id) => Self {
                hex_id: Some(hex_id.as_str().to_owned()),
                display_name: format!("{name} [ {id} ]"),
                name,
                id,
            },
            None => Self {
                hex_id: None,
                display_name: name.clone(),
                name,
                id,
            },
        }
    }
}

/// The devices found by the last completed enumeration, in
/// enumeration order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceDirectory {
    devices: Vec<DeviceDescriptor>,
}

impl DeviceDirectory {
    /// Starts an enumeration in the background.
    pub fn discover(transport: Arc<dyn MidiTransport>, selector: DeviceSelector) -> Discovery {
        let (tx, rx) = crossbeam::channel::bounded(1);

        std::thread::spawn(move || {
            let devices = transport.enumerate(&selector).map(|found| {
                found
                    .into_iter()
                    .map(DeviceDescriptor::from)
                    .collect::<Vec<_>>()
            });

            if tx.send(devices).is_err() {
                log::warn!("[ MIDI ] : device discovery finished after its caller left");
            }
        });

        Discovery { rx }
    }

    /// Replaces the whole directory with a fresh enumeration. On
    /// failure the previous content is kept.
    pub fn refresh(
        &mut self,
        transport: Arc<dyn MidiTransport>,
        selector: DeviceSelector,
    ) -> Result<&[DeviceDescriptor], TransportError> {
        *self = Self::discover(transport, selector).wait()?;
        Ok(self.devices())
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        self.devices.as_slice()
    }

    pub fn get(&self, index: usize) -> Option<&DeviceDescriptor> {
        self.devices.get(index)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// A running enumeration.
pub struct Discovery {
    rx: Receiver<Result<Vec<DeviceDescriptor>, TransportError>>,
}

impl Discovery {
    /// Block until the enumeration completes.
    pub fn wait(self) -> Result<DeviceDirectory, TransportError> {
        let devices = self.rx.recv().map_err(|_| {
            TransportError::Backend("device discovery stopped without a result".to_owned())
        })??;

        log::trace!("[ MIDI ] : discovered {} device(s)", devices.len());
        Ok(DeviceDirectory { devices })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::MockMidiTransport;

    fn info(name: &str, id: &str) -> DeviceInfo {
        DeviceInfo {
            name: name.to_owned(),
            id: id.to_owned(),
        }
    }

    #[test]
    fn extracts_the_hex_id_from_platform_ids() {
        let id = r"\\?\SWD#MMDEVAPI#MIDII_1A2B3C4D.P_0000#{6dc23320-ab33-4ce4-80d4-bbb3ebbf2814}";
        let device = DeviceDescriptor::from(info("USB MIDI", id));

        assert_eq!(device.hex_id.as_deref(), Some("1A2B3C4D"));
        assert_eq!(device.display_name, format!("USB MIDI [ {id} ]"));
    }

    #[test]
    fn captures_exactly_the_first_hex_group() {
        let device = DeviceDescriptor::from(info("Pad", "#MIDII_0BADF00D.x#MIDII_DEADBEEF.y#"));
        assert_eq!(device.hex_id.as_deref(), Some("0BADF00D"));
    }

    #[test]
    fn non_matching_ids_fall_back_to_the_name() {
        for id in [
            "usb-midi-0",
            "#MIDII_1a2b3c4d.x#",
            "#MIDII_1A2B3C4.x#",
            "#MIDII_1A2B3C4D#",
            "#MIDII_1A2B3C4D.x",
        ] {
            let device = DeviceDescriptor::from(info("Keys", id));
            assert_eq!(device.hex_id, None, "{id}");
            assert_eq!(device.display_name, "Keys", "{id}");
        }
    }

    #[test]
    fn refresh_replaces_the_previous_devices() {
        let mut transport = MockMidiTransport::new();
        let mut enumerations = vec![
            vec![info("b", "id-b")],
            vec![info("a", "id-a"), info("c", "#MIDII_00000001.p#")],
        ];
        transport
            .expect_enumerate()
            .times(2)
            .returning(move |_| Ok(enumerations.pop().unwrap_or_default()));
        let transport: Arc<dyn MidiTransport> = Arc::new(transport);

        let mut directory = DeviceDirectory::default();
        directory
            .refresh(transport.clone(), DeviceSelector::midi_inputs())
            .unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.get(0).unwrap().name, "a");
        assert_eq!(directory.get(1).unwrap().hex_id.as_deref(), Some("00000001"));

        directory
            .refresh(transport, DeviceSelector::midi_inputs())
            .unwrap();
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get(0).unwrap().name, "b");
    }

    #[test]
    fn failed_refresh_keeps_the_previous_devices() {
        let mut transport = MockMidiTransport::new();
        let mut results = vec![
            Err(TransportError::Backend("gone".into())),
            Ok(vec![info("a", "id-a")]),
        ];
        transport
            .expect_enumerate()
            .returning(move |_| results.pop().unwrap_or(Ok(vec![])));
        let transport: Arc<dyn MidiTransport> = Arc::new(transport);

        let mut directory = DeviceDirectory::default();
        directory
            .refresh(transport.clone(), DeviceSelector::midi_inputs())
            .unwrap();

        let err = directory
            .refresh(transport, DeviceSelector::midi_inputs())
            .unwrap_err();
        assert_eq!(err, TransportError::Backend("gone".into()));
        assert_eq!(directory.len(), 1);
    }
}
