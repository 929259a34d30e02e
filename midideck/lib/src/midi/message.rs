use super::RawMidiMessage;
use midly::{
    live::{LiveEvent, MtcQuarterFrameMessage, SystemCommon},
    MidiMessage,
};
use std::fmt;

pub const SYSTEM_EXCLUSIVE: u8 = 0xF0;
pub const TUNE_REQUEST: u8 = 0xF6;
pub const END_SYSTEM_EXCLUSIVE: u8 = 0xF7;
pub const TIMING_CLOCK: u8 = 0xF8;
pub const START: u8 = 0xFA;
pub const CONTINUE: u8 = 0xFB;
pub const STOP: u8 = 0xFC;
pub const ACTIVE_SENSING: u8 = 0xFE;
pub const SYSTEM_RESET: u8 = 0xFF;

/// Every kind of message the decoder knows about, carrying only
/// the fields that matter for that kind. Values are taken as-is,
/// no range checks are done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    PolyphonicKeyPressure { channel: u8, note: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    PitchBendChange { channel: u8, bend: u16 },
    SystemExclusive,
    TimeCode { frame_type: u8 },
    SongPositionPointer { beats: u16 },
    SongSelect { song: u8 },
    TuneRequest,
    EndSystemExclusive,
    TimingClock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    SystemReset,
    Unknown(u8),
}

impl MessageKind {
    /// The note number of a note-on, `None` for anything else.
    pub fn note_on(&self) -> Option<u8> {
        match *self {
            MessageKind::NoteOn { note, .. } => Some(note),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MessageKind::NoteOff {
                channel,
                note,
                velocity,
            } => write!(
                f,
                "note off: channel {channel}, note {note}, velocity {velocity}"
            ),
            MessageKind::NoteOn {
                channel,
                note,
                velocity,
            } => write!(
                f,
                "note on: channel {channel}, note {note}, velocity {velocity}"
            ),
            MessageKind::PolyphonicKeyPressure {
                channel,
                note,
                pressure,
            } => write!(
                f,
                "polytouch: channel {channel}, note {note}, pressure {pressure}"
            ),
            MessageKind::ControlChange {
                channel,
                controller,
                value,
            } => write!(
                f,
                "control change: channel {channel}, controller {controller}, control value {value}"
            ),
            MessageKind::ProgramChange { channel, program } => {
                write!(f, "program change: channel {channel}, program {program}")
            }
            MessageKind::ChannelPressure { channel, pressure } => {
                write!(f, "channel pressure: channel {channel}, pressure {pressure}")
            }
            MessageKind::PitchBendChange { channel, bend } => {
                write!(f, "pitch wheel: channel {channel}, bend {bend}")
            }
            MessageKind::SystemExclusive => f.write_str("sysex"),
            MessageKind::TimeCode { frame_type } => {
                write!(f, "time code: frame type {frame_type}")
            }
            MessageKind::SongPositionPointer { beats } => write!(f, "songpos: beats {beats}"),
            MessageKind::SongSelect { song } => write!(f, "song select: song {song}"),
            MessageKind::TuneRequest => f.write_str("tune request"),
            MessageKind::EndSystemExclusive => f.write_str("sysex eox"),
            MessageKind::TimingClock => f.write_str("clock"),
            // same text as TimingClock
            MessageKind::Start => f.write_str("clock"),
            MessageKind::Continue => f.write_str("continue"),
            MessageKind::Stop => f.write_str("stop"),
            MessageKind::ActiveSensing => f.write_str("active sensing"),
            MessageKind::SystemReset => f.write_str("system reset"),
            MessageKind::Unknown(tag) => write!(f, "unknown ({tag})"),
        }
    }
}

/// A decoded message together with the raw bytes it came from.
/// Displaying it never fails: the kind-specific text is always
/// followed by a hex dump of every raw byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedMessage<'a> {
    pub kind: MessageKind,
    pub raw: &'a [u8],
}

impl fmt::Display for DecodedMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},", self.kind)?;
        for byte in self.raw {
            write!(f, " {byte:02x}")?;
        }
        Ok(())
    }
}

pub fn decode<'a>(message: &RawMidiMessage<'a>) -> DecodedMessage<'a> {
    let kind = match message.tag() {
        SYSTEM_EXCLUSIVE => MessageKind::SystemExclusive,
        END_SYSTEM_EXCLUSIVE => MessageKind::EndSystemExclusive,
        TUNE_REQUEST => MessageKind::TuneRequest,
        TIMING_CLOCK => MessageKind::TimingClock,
        START => MessageKind::Start,
        CONTINUE => MessageKind::Continue,
        STOP => MessageKind::Stop,
        ACTIVE_SENSING => MessageKind::ActiveSensing,
        SYSTEM_RESET => MessageKind::SystemReset,
        tag => parse_fields(message.bytes()).unwrap_or(MessageKind::Unknown(tag)),
    };

    DecodedMessage {
        kind,
        raw: message.bytes(),
    }
}

pub fn render(message: &DecodedMessage<'_>) -> String {
    message.to_string()
}

fn parse_fields(bytes: &[u8]) -> Option<MessageKind> {
    let kind = match LiveEvent::parse(bytes).ok()? {
        LiveEvent::Midi { channel, message } => {
            let channel = channel.as_int();

            match message {
                MidiMessage::NoteOff { key, vel } => MessageKind::NoteOff {
                    channel,
                    note: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::NoteOn { key, vel } => MessageKind::NoteOn {
                    channel,
                    note: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::Aftertouch { key, vel } => MessageKind::PolyphonicKeyPressure {
                    channel,
                    note: key.as_int(),
                    pressure: vel.as_int(),
                },
                MidiMessage::Controller { controller, value } => MessageKind::ControlChange {
                    channel,
                    controller: controller.as_int(),
                    value: value.as_int(),
                },
                MidiMessage::ProgramChange { program } => MessageKind::ProgramChange {
                    channel,
                    program: program.as_int(),
                },
                MidiMessage::ChannelAftertouch { vel } => MessageKind::ChannelPressure {
                    channel,
                    pressure: vel.as_int(),
                },
                MidiMessage::PitchBend { bend } => MessageKind::PitchBendChange {
                    channel,
                    bend: bend.0.as_int(),
                },
            }
        }
        LiveEvent::Common(SystemCommon::MidiTimeCodeQuarterFrame(frame, _)) => {
            MessageKind::TimeCode {
                frame_type: frame_type(frame),
            }
        }
        LiveEvent::Common(SystemCommon::SongPosition(beats)) => MessageKind::SongPositionPointer {
            beats: beats.as_int(),
        },
        LiveEvent::Common(SystemCommon::SongSelect(song)) => MessageKind::SongSelect {
            song: song.as_int(),
        },
        _ => return None,
    };

    Some(kind)
}

fn frame_type(frame: MtcQuarterFrameMessage) -> u8 {
    match frame {
        MtcQuarterFrameMessage::FramesLow => 0,
        MtcQuarterFrameMessage::FramesHigh => 1,
        MtcQuarterFrameMessage::SecondsLow => 2,
        MtcQuarterFrameMessage::SecondsHigh => 3,
        MtcQuarterFrameMessage::MinutesLow => 4,
        MtcQuarterFrameMessage::MinutesHigh => 5,
        MtcQuarterFrameMessage::HoursLow => 6,
        MtcQuarterFrameMessage::HoursHigh => 7,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn rendered(bytes: &[u8]) -> String {
        render(&decode(&RawMidiMessage::new(Duration::ZERO, bytes)))
    }

    #[test]
    fn renders_channel_voice_messages() {
        assert_eq!(
            rendered(&[0x80, 60, 0]),
            "note off: channel 0, note 60, velocity 0, 80 3c 00"
        );
        assert_eq!(
            rendered(&[0x9A, 36, 127]),
            "note on: channel 10, note 36, velocity 127, 9a 24 7f"
        );
        assert_eq!(
            rendered(&[0xA1, 64, 30]),
            "polytouch: channel 1, note 64, pressure 30, a1 40 1e"
        );
        assert_eq!(
            rendered(&[0xB2, 7, 100]),
            "control change: channel 2, controller 7, control value 100, b2 07 64"
        );
        assert_eq!(
            rendered(&[0xC3, 5]),
            "program change: channel 3, program 5, c3 05"
        );
        assert_eq!(
            rendered(&[0xD4, 90]),
            "channel pressure: channel 4, pressure 90, d4 5a"
        );
        assert_eq!(
            rendered(&[0xE5, 0x00, 0x40]),
            "pitch wheel: channel 5, bend 8192, e5 00 40"
        );
    }

    #[test]
    fn renders_system_common_messages() {
        assert_eq!(
            rendered(&[0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7]),
            "sysex, f0 7e 7f 06 01 f7"
        );
        assert_eq!(rendered(&[0xF1, 0x35]), "time code: frame type 3, f1 35");
        assert_eq!(rendered(&[0xF2, 0x10, 0x01]), "songpos: beats 144, f2 10 01");
        assert_eq!(rendered(&[0xF3, 0x07]), "song select: song 7, f3 07");
        assert_eq!(rendered(&[0xF6]), "tune request, f6");
        assert_eq!(rendered(&[0xF7]), "sysex eox, f7");
    }

    #[test]
    fn renders_realtime_messages() {
        assert_eq!(rendered(&[0xF8]), "clock, f8");
        assert_eq!(rendered(&[0xFA]), "clock, fa");
        assert_eq!(rendered(&[0xFB]), "continue, fb");
        assert_eq!(rendered(&[0xFC]), "stop, fc");
        assert_eq!(rendered(&[0xFE]), "active sensing, fe");
        assert_eq!(rendered(&[0xFF]), "system reset, ff");
    }

    #[test]
    fn unknown_tags_render_instead_of_failing() {
        assert_eq!(rendered(&[0xF4]), "unknown (244), f4");
        assert_eq!(rendered(&[0xFD]), "unknown (253), fd");
        assert_eq!(rendered(&[]), "unknown (0),");
    }

    #[test]
    fn truncated_and_statusless_messages_are_unknown() {
        assert_eq!(rendered(&[0x90, 0x3C]), "unknown (144), 90 3c");
        assert_eq!(rendered(&[0x90, 0x80, 0x64]), "unknown (144), 90 80 64");
        assert_eq!(rendered(&[0xF2, 0x01]), "unknown (242), f2 01");
        assert_eq!(rendered(&[0x3C]), "unknown (60), 3c");

        let truncated = decode(&RawMidiMessage::new(Duration::ZERO, &[0x90, 0x3C]));
        assert_eq!(truncated.kind, MessageKind::Unknown(0x90));
        assert_eq!(truncated.kind.note_on(), None);
    }

    #[test]
    fn only_note_on_yields_a_note() {
        let note_on = decode(&RawMidiMessage::new(Duration::ZERO, &[0x90, 60, 100]));
        assert_eq!(note_on.kind.note_on(), Some(60));

        let note_off = decode(&RawMidiMessage::new(Duration::ZERO, &[0x80, 60, 100]));
        assert_eq!(note_off.kind.note_on(), None);

        let clock = decode(&RawMidiMessage::new(Duration::ZERO, &[0xF8]));
        assert_eq!(clock.kind.note_on(), None);
    }
}
