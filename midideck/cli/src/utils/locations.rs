/// Default locations stored in `~/.midideck`
///
/// .
/// └── log
///    └── midideck.log
///
use std::path::PathBuf;

pub fn midideck() -> Option<PathBuf> {
    Some(dirs::home_dir()?.join(".midideck"))
}

pub fn log() -> Option<PathBuf> {
    Some(midideck()?.join("log"))
}

pub fn log_file(name: &str) -> Option<PathBuf> {
    Some(log()?.join(format!("{name}.log")))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn log_file_lives_under_the_log_directory() {
        if let Some(file) = log_file("midideck") {
            assert!(file.ends_with(".midideck/log/midideck.log"));
        }
    }
}
