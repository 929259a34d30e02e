mod deck;
mod utils;
pub use utils::*;

use clap::{Args, CommandFactory, Parser, Subcommand};
use std::io::Write;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: CommonOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
pub struct CommonOptions {
    /// Log verbosity level
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a MIDI input and run note bindings until Ctrl-C
    Run(deck::Options),
    /// List the available MIDI inputs
    List(deck::ListOptions),
    /// `midideck completions --generate=zsh > midideck.zsh`
    Completions(Completions),
}

#[derive(Debug, Parser)]
#[command(arg_required_else_help(true))]
struct Completions {
    /// shell to generate the completion script for
    #[arg(long = "generate", value_enum)]
    shell: Option<clap_complete::Shell>,
}

impl Completions {
    fn generate(&self) -> anyhow::Result<()> {
        let Some(shell) = self.shell else {
            anyhow::bail!("no shell specified for autocompletion generation");
        };

        let mut stdout = std::io::stdout();
        stdout.flush()?;

        let mut cli = Cli::command();
        clap_complete::generate(shell, &mut cli, "midideck", &mut stdout);

        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let app_result = match args.command {
        Commands::Run(opts) => deck::run(opts, args.opts),
        Commands::List(opts) => deck::list(opts),
        Commands::Completions(ref c) => c.generate(),
    };

    if let Err(e) = app_result {
        if logger::is_active() {
            log::error!("{e}");
        } else {
            use colored::*;
            eprintln!("{} {}", "Error:".red().bold(), format!("{e}").bold());
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_repeated_bindings() {
        let cli = Cli::try_parse_from([
            "midideck",
            "run",
            "--device",
            "1",
            "--bind",
            "36=notepad.exe",
            "--bind",
            "50=calc.exe",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.opts.verbose);
        let Commands::Run(opts) = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(opts.device, Some(1));
        assert_eq!(opts.bindings.len(), 2);
        assert_eq!(opts.workers, midideck::bridge::DEFAULT_RENDER_WORKERS);
    }

    #[test]
    fn run_rejects_malformed_bindings() {
        assert!(Cli::try_parse_from(["midideck", "run", "--bind", "200=calc.exe"]).is_err());
        assert!(Cli::try_parse_from(["midideck", "run", "--bind", "calc.exe"]).is_err());
    }
}
