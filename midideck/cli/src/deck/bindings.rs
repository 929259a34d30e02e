use midideck::bridge::NoteAction;
use std::{
    collections::BTreeMap,
    process::{Command, Stdio},
};

/// Bindings installed by `--default-bindings`.
pub const DEFAULT_BINDINGS: [(u8, &str); 3] =
    [(36, "notepad.exe"), (38, "start Chrome.exe"), (50, "calc.exe")];

const MAX_NOTE: u8 = 127;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("expected NOTE=COMMAND, got {0:?}")]
    MissingSeparator(String),
    #[error("{0:?} is not a MIDI note number (0-127)")]
    InvalidNote(String),
    #[error("no command given for note {0}")]
    EmptyCommand(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub note: u8,
    pub command: String,
}

/// Parses `NOTE=COMMAND`, e.g. `36=notepad.exe`.
pub fn parse_binding(arg: &str) -> Result<Binding, BindingError> {
    let (note, command) = arg
        .split_once('=')
        .ok_or_else(|| BindingError::MissingSeparator(arg.to_owned()))?;

    let note = note
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|note| *note <= MAX_NOTE)
        .ok_or_else(|| BindingError::InvalidNote(note.to_owned()))?;

    let command = command.trim();
    if command.is_empty() {
        return Err(BindingError::EmptyCommand(note));
    }

    Ok(Binding {
        note,
        command: command.to_owned(),
    })
}

/// Launches a shell command for every bound note.
#[derive(Debug, Default, Clone)]
pub struct NoteBindings {
    commands: BTreeMap<u8, String>,
}

impl NoteBindings {
    pub fn with_defaults(mut self) -> Self {
        for (note, command) in DEFAULT_BINDINGS {
            self.commands.insert(note, command.to_owned());
        }
        self
    }

    /// Later bindings of the same note replace earlier ones.
    pub fn bind(&mut self, binding: Binding) {
        self.commands.insert(binding.note, binding.command);
    }

    pub fn command_for(&self, note: u8) -> Option<&str> {
        self.commands.get(&note).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Extend<Binding> for NoteBindings {
    fn extend<T: IntoIterator<Item = Binding>>(&mut self, iter: T) {
        iter.into_iter().for_each(|binding| self.bind(binding));
    }
}

impl NoteAction for NoteBindings {
    fn on_note(&mut self, note: u8) {
        if let Some(command) = self.command_for(note) {
            launch(command);
        }
    }
}

fn shell(command: &str) -> Command {
    let mut shell = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C");
        cmd
    } else {
        let mut sh = Command::new("sh");
        sh.arg("-c");
        sh
    };

    shell.arg(command);
    shell
}

/// Spawns without waiting, the child is reaped on its own thread.
fn launch(command: &str) {
    let child = shell(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match child {
        Ok(mut child) => {
            log::info!("[ MIDI ] : launched {command:?}");
            std::thread::spawn(move || {
                if let Err(e) = child.wait() {
                    log::warn!("[ MIDI ] : failed to wait on launched command : {e}");
                }
            });
        }
        Err(e) => log::error!("[ MIDI ] : failed to launch {command:?} : {e}"),
    }
}
