use clap::{Parser, Subcommand};
use formulation::{BuildModel, Decode};
use generate::VrbspGenerator;
use tracing_subscriber::FmtSubscriber;

mod instance;
mod tables;
mod generate;
mod formulation;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct VrbspTools {
    /// Set the logging level
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate random instances
    Generate(VrbspGenerator),
    /// Build the MILP of an instance and write it as an LP file
    Model(BuildModel),
    /// Check a solver solution and print the schedule it encodes
    Decode(Decode),
}

fn main() {
    // usage errors exit with 1, help and version with 0
    let cli = VrbspTools::try_parse().unwrap_or_else(|e| {
        let code = if e.use_stderr() { 1 } else { 0 };
        let _ = e.print();
        std::process::exit(code);
    });

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("cannot install logger: {e}");
    }

    let result = match cli.command {
        Command::Generate(generate) => generate.generate(),
        Command::Model(model) => model.build(),
        Command::Decode(decode) => decode.decode(),
    };
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
