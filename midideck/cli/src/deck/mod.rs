mod bindings;
mod console;

use bindings::{Binding, NoteBindings};
use console::ConsoleChoice;
use midideck::{
    bridge::{EventBridge, LineSink, MessageLog, DEFAULT_RENDER_WORKERS},
    devices::{DeviceDescriptor, DeviceDirectory},
    session::{self, ChoiceSource, SessionNegotiator},
    transport::{DeviceSelector, HostedTransport, MidiTransport},
};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, clap::Parser)]
pub struct Options {
    /// Index of the MIDI input to open, skips the console prompt
    #[arg(long)]
    pub(crate) device: Option<usize>,

    /// Only offer MIDI inputs whose name contains this text
    #[arg(long)]
    filter: Option<String>,

    /// Launch COMMAND whenever NOTE is played, e.g. `--bind 36=notepad.exe`
    #[arg(long = "bind", value_name = "NOTE=COMMAND", value_parser = bindings::parse_binding)]
    pub(crate) bindings: Vec<Binding>,

    /// Bind notes 36, 38 and 50 to notepad, Chrome and the calculator
    #[arg(long, default_value_t = false)]
    default_bindings: bool,

    /// Path to log file to write to. Defaults
    /// to system log file at ~/.midideck/log/midideck.log
    #[arg(long)]
    log: Option<PathBuf>,

    /// Number of threads rendering the message log
    #[arg(long, default_value_t = DEFAULT_RENDER_WORKERS)]
    pub(crate) workers: usize,
}

#[derive(Debug, clap::Parser)]
pub struct ListOptions {
    /// Only list MIDI inputs whose name contains this text
    #[arg(long)]
    filter: Option<String>,
}

fn selector(filter: Option<String>) -> DeviceSelector {
    match filter {
        Some(filter) => DeviceSelector::midi_inputs().with_name_filter(filter),
        None => DeviceSelector::midi_inputs(),
    }
}

pub fn list(opts: ListOptions) -> anyhow::Result<()> {
    let transport: Arc<dyn MidiTransport> = Arc::new(HostedTransport::default());

    let directory = DeviceDirectory::discover(transport, selector(opts.filter)).wait()?;
    console::print_devices(&mut std::io::stdout(), directory.devices())?;

    Ok(())
}

pub fn run(opts: Options, common_opts: crate::CommonOptions) -> anyhow::Result<()> {
    if let Some(log_file) = opts.log.or_else(|| crate::locations::log_file("midideck")) {
        crate::logger::start("midideck", log_file, common_opts.verbose)?;
    }

    let mut bindings = NoteBindings::default();
    if opts.default_bindings {
        bindings = bindings.with_defaults();
    }
    bindings.extend(opts.bindings);
    if bindings.is_empty() {
        log::warn!("no note bindings, messages will only be logged");
    } else {
        log::info!("{} note binding(s)", bindings.len());
    }

    let choice: Box<dyn ChoiceSource> = match opts.device {
        Some(index) => Box::new(index),
        None => Box::new(ConsoleChoice::stdio()),
    };

    let transport: Arc<dyn MidiTransport> = Arc::new(HostedTransport::default());
    let mut negotiator =
        SessionNegotiator::new(transport, choice).with_selector(selector(opts.filter));

    let session = match negotiator.select_and_connect() {
        Ok(session) => session,
        Err(e) => {
            report_failure(&e);
            println!("Error: MIDI IN is not opened");
            return Err(e.into());
        }
    };

    report_selection(negotiator.directory(), session.device());
    println!("Success Opening your selected Device's Port.");

    let log = MessageLog::new(LineSink::new(std::io::stdout()), opts.workers);
    let mut bridge = EventBridge::new(session, bindings, log);

    println!("Callback starting...");
    bridge.start()?;
    println!("Started");

    wait_for_ctrl_c()?;

    bridge.stop()?;
    log::info!("stopped listening to {}", bridge.device().display_name);

    Ok(())
}

fn report_selection(directory: &DeviceDirectory, device: &DeviceDescriptor) {
    let index = directory
        .devices()
        .iter()
        .position(|d| d == device)
        .unwrap_or_default();

    println!(
        "\nSelected: {index}, {}, {}, {}, {}",
        device.name,
        device.id,
        device.hex_id.as_deref().unwrap_or_default(),
        device.display_name
    );
}

fn report_failure(error: &session::Error) {
    match error {
        session::Error::SelectionOutOfRange { index, count } => {
            println!("Error. Please Select Correct Number.");
            println!("Your choice is: {index}");
            println!("However, you have {count} devices.");
        }
        session::Error::ConnectionTimeout(_) => println!("Timeout"),
        _ => (),
    }
}

fn wait_for_ctrl_c() -> anyhow::Result<()> {
    let running = Arc::new(AtomicBool::new(true));

    ctrlc::set_handler({
        let running = running.clone();
        move || running.store(false, Ordering::SeqCst)
    })?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(SHUTDOWN_POLL_INTERVAL);
    }

    Ok(())
}
