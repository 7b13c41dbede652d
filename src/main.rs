use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use repo_pilot::config::AppConfig;
use repo_pilot::credentials::types::RepositoryIdentity;
use repo_pilot::workspace::ChangeSet;
use repo_pilot::{AutomationPlan, RepositoryAutomationClient};

#[derive(Parser)]
#[command(
    name = "repo-pilot",
    about = "Clone, change and open pull requests with short-lived installation tokens"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clone, branch, write files, commit, push and open a pull request
    Run(RunArgs),
    /// Fetch a credential and show what it grants (tokens are not printed)
    Token(TargetArgs),
}

#[derive(Args)]
struct TargetArgs {
    /// Repository id known to the token service
    #[arg(long)]
    repo_id: Option<u64>,
    /// Organization name (with --repo)
    #[arg(long)]
    org: Option<String>,
    /// Repository name (with --org)
    #[arg(long)]
    repo: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Branch to create and push
    #[arg(short, long, default_value = "repo-pilot-changes")]
    branch: String,

    /// Branch the pull request targets
    #[arg(long, default_value = "main")]
    base: String,

    /// Pull request title
    #[arg(short, long, default_value = "Internal API Integration Example")]
    title: String,

    /// Pull request body (defaults to github.default_pr_body)
    #[arg(long)]
    body: Option<String>,

    /// Commit message
    #[arg(short, long, default_value = "Add API example file")]
    message: String,

    /// Write CONTENT to DEST inside the checkout (repeatable)
    #[arg(long = "write", value_name = "DEST=CONTENT")]
    writes: Vec<String>,

    /// Copy LOCAL_FILE to DEST inside the checkout (repeatable)
    #[arg(long = "copy", value_name = "DEST=LOCAL_FILE")]
    copies: Vec<String>,

    /// Clone into this directory and leave it in place
    #[arg(long)]
    path: Option<PathBuf>,

    /// Keep the temporary checkout after the run
    #[arg(long)]
    keep: bool,
}

impl TargetArgs {
    fn identity(&self) -> anyhow::Result<RepositoryIdentity> {
        match (self.repo_id, &self.org, &self.repo) {
            (Some(id), None, None) => Ok(RepositoryIdentity::by_id(id)),
            (None, Some(org), Some(repo)) => Ok(RepositoryIdentity::by_name(org, repo)),
            (Some(_), _, _) => bail!("use either --repo-id or --org/--repo, not both"),
            _ => bail!("either --repo-id or both --org and --repo are required"),
        }
    }
}

fn split_pair(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((dest, value)) if !dest.is_empty() => Ok((dest, value)),
        _ => bail!("expected DEST=VALUE, got: {raw}"),
    }
}

impl RunArgs {
    fn change_set(&self) -> anyhow::Result<ChangeSet> {
        let mut changes = ChangeSet::new();

        for raw in &self.writes {
            let (dest, content) = split_pair(raw)?;
            changes.push(dest, content);
        }

        for raw in &self.copies {
            let (dest, source) = split_pair(raw)?;
            let content = std::fs::read_to_string(source)
                .with_context(|| format!("Failed to read {source}"))?;
            changes.push(dest, content);
        }

        if changes.is_empty() {
            changes.push(
                "repo-pilot-example.txt",
                format!(
                    "This file was created by repo-pilot!\n\nTimestamp: {}",
                    chrono::Local::now().to_rfc2822()
                ),
            );
        }

        Ok(changes)
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => {
            config.workspace.keep |= args.keep;
            let client = RepositoryAutomationClient::from_config(&config)?;

            let plan = AutomationPlan {
                identity: args.target.identity()?,
                branch: args.branch.clone(),
                base: args.base.clone(),
                title: args.title.clone(),
                body: args
                    .body
                    .clone()
                    .unwrap_or_else(|| config.github.default_pr_body.clone()),
                commit_message: args.message.clone(),
                changes: args.change_set()?,
                checkout_path: args.path.clone(),
            };

            tracing::info!(repo = %plan.identity, branch = %plan.branch, "Starting automation run");
            let report = client.run(&plan).await?;

            println!("Repository: {}", report.repository);
            println!("Token expires: {}", report.expires_at);
            if report.checkout_retained {
                println!("Checkout: {}", report.checkout.display());
            }
            println!("Created PR: {}", report.pull_request.html_url);
        }
        Command::Token(target) => {
            let client = RepositoryAutomationClient::from_config(&config)?;
            let bundle = client.acquire_credential(&target.identity()?).await?;

            println!("Repository: {}", bundle.full_name());
            println!("URL: {}", bundle.repository_url);
            println!("Token expires: {}", bundle.expires_at);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(repo_id: Option<u64>, org: Option<&str>, repo: Option<&str>) -> TargetArgs {
        TargetArgs {
            repo_id,
            org: org.map(str::to_string),
            repo: repo.map(str::to_string),
        }
    }

    #[test]
    fn test_identity_modes() {
        assert_eq!(
            target(Some(5), None, None).identity().unwrap(),
            RepositoryIdentity::by_id(5)
        );
        assert_eq!(
            target(None, Some("myorg"), Some("myrepo")).identity().unwrap(),
            RepositoryIdentity::by_name("myorg", "myrepo")
        );
        assert!(target(None, Some("myorg"), None).identity().is_err());
        assert!(target(Some(5), Some("myorg"), Some("myrepo")).identity().is_err());
        assert!(target(None, None, None).identity().is_err());
    }

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("a/b.txt=x=y").unwrap(), ("a/b.txt", "x=y"));
        assert_eq!(split_pair("empty.txt=").unwrap(), ("empty.txt", ""));
        assert!(split_pair("no-separator").is_err());
        assert!(split_pair("=content").is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "repo-pilot",
            "run",
            "--org",
            "myorg",
            "--repo",
            "myrepo",
            "--branch",
            "python-api-changes",
            "--write",
            "notes.txt=hello",
        ])
        .unwrap();

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.base, "main");
                let changes = args.change_set().unwrap();
                assert_eq!(changes.len(), 1);
                let change = changes.iter().next().unwrap();
                assert_eq!(change.path, PathBuf::from("notes.txt"));
                assert_eq!(change.content, "hello");
            }
            Command::Token(_) => panic!("expected run"),
        }
    }

    #[test]
    fn test_default_change_when_none_given() {
        let cli = Cli::try_parse_from(["repo-pilot", "run", "--repo-id", "1"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let changes = args.change_set().unwrap();
        let change = changes.iter().next().unwrap();
        assert_eq!(change.path, PathBuf::from("repo-pilot-example.txt"));
        assert!(change.content.starts_with("This file was created by repo-pilot!"));
    }
}
