use crate::demo::{run_check, run_demo, CheckArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use talent_flow::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Talent Flow",
    about = "Run the assessment service or exercise the builder from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Build, preview, take and submit an assessment against an in-memory store
    Demo(DemoArgs),
    /// Validate an assessment JSON file and report dependency findings
    Check(CheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Check(args) => run_check(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["talent-flow-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn demo_and_check_parse_their_arguments() {
        let cli = Cli::try_parse_from(["talent-flow-api", "demo", "--job-id", "4"]).expect("demo");
        assert!(matches!(cli.command, Some(Command::Demo(DemoArgs { job_id: 4 }))));

        let cli = Cli::try_parse_from(["talent-flow-api", "check", "assessment.json"])
            .expect("check");
        match cli.command {
            Some(Command::Check(args)) => assert_eq!(args.file, PathBuf::from("assessment.json")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_overrides_are_optional() {
        let cli = Cli::try_parse_from(["talent-flow-api", "serve", "--port", "9090"])
            .expect("serve");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(9090));
                assert!(args.host.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
