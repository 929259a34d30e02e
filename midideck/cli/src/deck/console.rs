use midideck::{
    devices::DeviceDescriptor,
    session::{ChoiceSource, Selection},
};
use std::io::{self, BufRead, Write};

/// Prints the device list and reads the chosen index from a line
/// of input.
pub struct ConsoleChoice<R, W> {
    input: R,
    output: W,
}

impl ConsoleChoice<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleChoice<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn prompt(&mut self, devices: &[DeviceDescriptor]) -> io::Result<()> {
        print_devices(&mut self.output, devices)?;
        write!(self.output, "\nSelect number > ")?;
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> ChoiceSource for ConsoleChoice<R, W> {
    fn choose(&mut self, devices: &[DeviceDescriptor]) -> Option<Selection> {
        if let Err(e) = self.prompt(devices) {
            log::error!("failed to print the device list : {e}");
            return None;
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(parse_selection(&line)),
            Err(e) => {
                log::error!("failed to read the device selection : {e}");
                None
            }
        }
    }
}

pub fn print_devices(out: &mut impl Write, devices: &[DeviceDescriptor]) -> io::Result<()> {
    writeln!(out, "\nMIDI IN ports\n")?;
    for (i, device) in devices.iter().enumerate() {
        writeln!(out, "{i}: {}", device.display_name)?;
    }
    Ok(())
}

pub fn parse_selection(line: &str) -> Selection {
    let line = line.trim();
    match line.parse() {
        Ok(index) => Selection::Index(index),
        Err(_) => Selection::Malformed(line.to_owned()),
    }
}
