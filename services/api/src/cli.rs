use crate::admin::{run_audit, run_terms, AuditArgs, TermsCommand};
use crate::server;
use award_workflow::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "award-workflow-api",
    about = "Run the award nomination service and administer academic terms",
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
    /// Manage academic terms and their current / registration flags
    Terms {
        #[command(subcommand)]
        command: TermsCommand,
    },
    /// Print the audit trail of one award form
    Audit(AuditArgs),
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
        Command::Terms { command } => run_terms(command),
        Command::Audit(args) => run_audit(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_term_administration_commands() {
        let cli = Cli::try_parse_from([
            "award-workflow-api",
            "terms",
            "create",
            "--year",
            "2024",
            "--semester",
            "2",
            "--start",
            "2024-11-01",
            "--end",
            "2025-03-31",
        ])
        .expect("valid command line");
        match cli.command {
            Some(Command::Terms {
                command: TermsCommand::Create(args),
            }) => {
                assert_eq!(args.year, 2024);
                assert_eq!(args.semester, 2);
                assert_eq!(args.start.to_string(), "2024-11-01");
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["award-workflow-api", "terms", "set-current", "3"])
            .expect("valid command line");
        assert!(matches!(
            cli.command,
            Some(Command::Terms {
                command: TermsCommand::SetCurrent(_)
            })
        ));
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["award-workflow-api"]).expect("valid command line");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["award-workflow-api", "serve", "--port", "8080"])
            .expect("valid command line");
        match cli.command {
            Some(Command::Serve(args)) => assert_eq!(args.port, Some(8080)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        let result = Cli::try_parse_from([
            "award-workflow-api",
            "terms",
            "create",
            "--year",
            "2024",
            "--semester",
            "1",
            "--start",
            "June 1",
            "--end",
            "2024-10-31",
        ]);
        assert!(result.is_err());
    }
}
