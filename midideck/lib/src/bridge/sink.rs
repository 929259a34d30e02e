use crate::midi::MidiData;
use crossbeam::channel::{Receiver, Sender};
use std::{
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
    thread::JoinHandle,
};

pub const DEFAULT_RENDER_WORKERS: usize = 2;

/// Append-only text stream shared by the render workers.
/// Each line is written and flushed under the lock, so lines
/// never interleave.
#[derive(Clone)]
pub struct LineSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl LineSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    pub fn append(&self, line: &str) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}")?;
        out.flush()
    }
}

/// Hands captured messages to the render workers without waiting.
#[derive(Clone)]
pub struct LogSubmitter {
    tx: Sender<MidiData>,
}

impl LogSubmitter {
    pub fn submit(&self, midi: MidiData) {
        if let Err(e) = self.tx.send(midi) {
            log::warn!("[ MIDI ] : message log is gone, dropping : {:?}", e.0);
        }
    }
}

/// The MIDI message log: a [`LineSink`] fed by a small pool of
/// worker threads that decode and render each message.
///
/// Lines may come out of order across workers, each line is
/// written whole.
pub struct MessageLog {
    tx: Sender<MidiData>,
    shutdown: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl MessageLog {
    pub fn new(sink: LineSink, num_workers: usize) -> Self {
        let (tx, rx) = crossbeam::channel::unbounded();
        let (shutdown, shutdown_rx) = crossbeam::channel::bounded(0);

        let workers = (0..num_workers.max(1))
            .map(|_| {
                let sink = sink.clone();
                let rx = rx.clone();
                let shutdown_rx = shutdown_rx.clone();
                std::thread::spawn(move || render_lines(sink, rx, shutdown_rx))
            })
            .collect();

        Self {
            tx,
            shutdown: Some(shutdown),
            workers,
        }
    }

    pub fn stdout() -> Self {
        Self::new(LineSink::new(io::stdout()), DEFAULT_RENDER_WORKERS)
    }

    pub fn submitter(&self) -> LogSubmitter {
        LogSubmitter {
            tx: self.tx.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// Stop the workers once every queued message has been written.
    pub fn shutdown(&mut self) {
        // dropping the sender disconnects every worker's shutdown receiver
        if self.shutdown.take().is_none() {
            return;
        }

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("[ MIDI ] : a render worker panicked");
            }
        }
    }
}

impl Drop for MessageLog {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn render_lines(sink: LineSink, rx: Receiver<MidiData>, shutdown: Receiver<()>) {
    let write = |midi: MidiData| {
        if let Err(e) = sink.append(&midi.log_line()) {
            log::error!("[ MIDI ] : failed to write message log : {e}");
        }
    };

    loop {
        crossbeam::channel::select! {
            recv(rx) -> midi => match midi {
                Ok(midi) => write(midi),
                Err(_) => return,
            },
            recv(shutdown) -> _ => {
                rx.try_iter().for_each(write);
                return;
            }
        }
    }
}
