use log::LevelFilter;
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Once,
    },
};

static INIT: Once = Once::new();
static IS_INITIALIZED: AtomicBool = AtomicBool::new(false);

pub fn is_active() -> bool {
    IS_INITIALIZED.load(Ordering::SeqCst)
}

/// Filters for the application and for the `midideck_lib` traces.
/// Library lifecycle traces only show up with `--verbose`.
fn levels(verbose: bool) -> (LevelFilter, LevelFilter) {
    if verbose {
        (LevelFilter::Trace, LevelFilter::Trace)
    } else {
        (LevelFilter::Debug, LevelFilter::Info)
    }
}

pub fn start(id: &str, file: impl AsRef<Path>, verbose: bool) -> anyhow::Result<()> {
    let (app_level, lib_level) = levels(verbose);

    if is_active() {
        anyhow::bail!("attempted to setup logger more than once");
    }

    if let Some(dir) = file.as_ref().parent() {
        std::fs::create_dir_all(dir)?;
    }

    let id = format!("{id}:{}", std::process::id());

    fern::Dispatch::new()
        .format(move |out, msg, record| {
            let time = humantime::format_rfc3339_seconds(std::time::SystemTime::now());

            if cfg!(debug_assertions) {
                out.finish(format_args!(
                    "[ {id} ] : [ {time} ] : [ {} {} ] : {msg}",
                    record.target(),
                    record.level(),
                ))
            } else {
                out.finish(format_args!("[ {id} ] : [ {time} ] : {msg}"))
            }
        })
        .level(app_level)
        .level_for("midideck_lib", lib_level)
        .level_for("midir", LevelFilter::Warn)
        .chain(fern::log_file(file.as_ref())?)
        .apply()?;

    log::trace!("started");

    INIT.call_once(|| IS_INITIALIZED.store(true, Ordering::SeqCst));
    Ok(())
}
