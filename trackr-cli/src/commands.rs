//! Subcommand dispatch.

use std::sync::Arc;

use trackr_core::{IssueId, ProjectId};

use crate::app::App;
use crate::cli::{CacheCommands, Cli, Commands};
use crate::config::TrackrConfig;
use crate::error::CliResult;
use crate::logging;
use crate::tools::ToolServer;

pub async fn run(cli: Cli) -> CliResult<()> {
    let config = TrackrConfig::load(cli.config.as_deref(), cli.token)?;
    logging::init(config.log_format)?;

    let app = App::from_config(&config)?;
    let identity = app.identity(None);
    let identity = identity.as_ref();

    match cli.command {
        Commands::Member { project, query } => {
            let resolved = app
                .resolve_member(identity, &ProjectId::new(project), &query)
                .await?;
            println!("{}", resolved.value);
        }
        Commands::Value {
            project,
            field,
            query,
        } => {
            let resolved = app
                .resolve_value(identity, &ProjectId::new(project), &field, &query)
                .await?;
            println!("{}", resolved.value);
        }
        Commands::Rewrite { project, command } => {
            let rewritten = app
                .rewrite(identity, &ProjectId::new(project), &command)
                .await?;
            println!("{}", rewritten);
        }
        Commands::Apply {
            issue,
            command,
            project,
        } => {
            let applied = app
                .apply(
                    identity,
                    &IssueId::new(issue),
                    &command,
                    project.map(ProjectId::new),
                )
                .await?;
            println!("Applied to {}: {}", applied.issue, applied.command);
        }
        Commands::LastProject => match app.last_project(identity) {
            Some(project) => println!("{}", project),
            None => println!("(none)"),
        },
        Commands::Cache {
            command: CacheCommands::Drop { project },
        } => {
            let project = project.map(ProjectId::new);
            let removed = app.drop_cache(project.as_ref()).await;
            println!("Dropped {} cache entries", removed);
        }
        Commands::Tools => {
            let server = ToolServer::new(Arc::new(app));
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            server.serve(stdin, tokio::io::stdout()).await?;
        }
    }
    Ok(())
}
