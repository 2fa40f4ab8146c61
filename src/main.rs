use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

use gitpush::git::{ConflictPhase, ConflictTracker};
use gitpush::{
    classify, config, init_telemetry, shutdown_telemetry, ConflictOperation, ErrorContext,
    ExecutionResult, GitService, RepositoryContext, ResolutionStrategy,
};

#[derive(Parser)]
#[command(name = "gitpush")]
#[command(about = "Run git commands and explain their failures")]
#[command(long_about = "gitpush runs git against a repository folder and prints every result as JSON. \
                       Failed commands carry a classified error with a human-readable explanation \
                       and, where one is safe, a proposed fix command.")]
struct Cli {
    /// Repository folder to operate on
    #[arg(long, global = true, help = "Repository folder (defaults to the current directory)")]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the folder is inside a git work tree
    IsRepo,
    /// Short-format status
    Status,
    /// Current branch name
    Branch,
    /// Create a repository in the folder
    Init,
    /// Stage files
    Add {
        #[arg(default_value = ".")]
        files: String,
    },
    /// Commit staged changes
    Commit { message: String },
    /// Push a branch
    Push {
        remote: Option<String>,
        branch: Option<String>,
    },
    /// Pull a branch
    Pull {
        remote: Option<String>,
        branch: Option<String>,
    },
    /// Fetch from the default remote
    Fetch,
    /// Clone a repository into a target folder
    Clone { url: String, target: String },
    /// List remotes
    Remotes,
    /// Add a remote
    RemoteAdd { name: String, url: String },
    /// Remove a remote
    RemoteRemove { name: String },
    /// Recent commit history
    Log,
    /// Read a global git setting
    ConfigGet { key: String },
    /// Write a global git setting
    ConfigSet { key: String, value: String },
    /// List conflicted files
    Conflicts {
        #[arg(long, help = "Treat the conflicts as belonging to a merge instead of a rebase")]
        merge: bool,
    },
    /// Resolve one conflicted file by taking a side
    Resolve {
        file: String,
        #[arg(long, value_enum)]
        strategy: StrategyArg,
        #[arg(long, help = "Treat the conflicts as belonging to a merge instead of a rebase")]
        merge: bool,
    },
    /// Abort the rebase (or merge)
    Abort {
        #[arg(long)]
        merge: bool,
    },
    /// Continue the rebase (or merge) once all conflicts are resolved
    Continue {
        #[arg(long)]
        merge: bool,
    },
    /// Ahead/behind counts against the upstream
    Divergence,
    /// Fetch and report whether the upstream has new commits
    CheckUpdates,
    /// Most recent tag
    LatestTag,
    /// Commits since a tag
    CommitDelta { tag: String },
    /// Run a raw git command line, e.g. "git log -n 3"
    Exec { line: String },
    /// Classify error text read from stdin
    Classify {
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        remote: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Git LFS helpers
    Lfs {
        #[command(subcommand)]
        action: LfsAction,
    },
}

#[derive(Subcommand)]
enum LfsAction {
    /// Check whether git-lfs is available
    Installed,
    /// Install the LFS hooks
    Install,
    /// Track a file pattern
    Track { pattern: String },
    /// List tracked patterns
    Tracked,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Ours,
    Theirs,
}

impl From<StrategyArg> for ResolutionStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Ours => ResolutionStrategy::Ours,
            StrategyArg::Theirs => ResolutionStrategy::Theirs,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConflictReport<'a> {
    phase: ConflictPhase,
    files: &'a [String],
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config()?;
    init_telemetry(&config.logging)?;

    let succeeded = tokio::runtime::Runtime::new()?.block_on(run(cli, config))?;

    shutdown_telemetry();
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn operation(merge: bool) -> ConflictOperation {
    if merge {
        ConflictOperation::Merge
    } else {
        ConflictOperation::Rebase
    }
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn emit_result(result: &ExecutionResult) -> Result<bool> {
    emit(result)?;
    Ok(result.success())
}

async fn run(cli: Cli, config: &gitpush::GitPushConfig) -> Result<bool> {
    let settings = &config.git;
    let git = GitService::from_settings(settings);

    let repo = match cli.repo {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let ctx = RepositoryContext::at(repo);

    match cli.command {
        Commands::IsRepo => {
            let is_repo = git.is_repo(&ctx).await;
            emit(&is_repo)?;
            Ok(is_repo)
        }
        Commands::Status => {
            emit(&git.status(&ctx).await)?;
            Ok(true)
        }
        Commands::Branch => {
            let branch = git.current_branch(&ctx).await;
            emit(&branch)?;
            Ok(branch.name().is_some())
        }
        Commands::Init => emit_result(&git.init(&ctx).await),
        Commands::Add { files } => emit_result(&git.add(&ctx, &files).await),
        Commands::Commit { message } => emit_result(&git.commit(&ctx, &message).await),
        Commands::Push { remote, branch } => {
            let remote = remote.unwrap_or_else(|| settings.default_remote.clone());
            let branch = branch.unwrap_or_else(|| settings.default_branch.clone());
            emit_result(&git.push(&ctx, &remote, &branch).await)
        }
        Commands::Pull { remote, branch } => {
            let remote = remote.unwrap_or_else(|| settings.default_remote.clone());
            let branch = branch.unwrap_or_else(|| settings.default_branch.clone());
            emit_result(&git.pull(&ctx, &remote, &branch).await)
        }
        Commands::Fetch => emit_result(&git.fetch(&ctx).await),
        Commands::Clone { url, target } => emit_result(&git.clone_repository(&url, &target).await),
        Commands::Remotes => {
            emit(&git.remote_list(&ctx).await)?;
            Ok(true)
        }
        Commands::RemoteAdd { name, url } => emit_result(&git.add_remote(&ctx, &name, &url).await),
        Commands::RemoteRemove { name } => emit_result(&git.remove_remote(&ctx, &name).await),
        Commands::Log => {
            emit(&git.commits(&ctx).await)?;
            Ok(true)
        }
        Commands::ConfigGet { key } => {
            emit(&git.config_get(&ctx, &key).await)?;
            Ok(true)
        }
        Commands::ConfigSet { key, value } => emit_result(&git.config_set(&ctx, &key, &value).await),
        Commands::Conflicts { merge } => {
            let mut tracker = ConflictTracker::new(operation(merge));
            let phase = tracker.refresh(&git, &ctx).await;
            emit(&ConflictReport {
                phase,
                files: tracker.pending(),
            })?;
            Ok(true)
        }
        Commands::Resolve {
            file,
            strategy,
            merge,
        } => {
            let mut tracker = ConflictTracker::new(operation(merge));
            tracker.refresh(&git, &ctx).await;
            let result = tracker.resolve(&git, &ctx, &file, strategy.into()).await?;
            emit_result(&result)
        }
        Commands::Abort { merge } => {
            let mut tracker = ConflictTracker::new(operation(merge));
            emit_result(&tracker.abort(&git, &ctx).await)
        }
        Commands::Continue { merge } => {
            let mut tracker = ConflictTracker::new(operation(merge));
            let result = tracker.continue_operation(&git, &ctx).await?;
            emit_result(&result)
        }
        Commands::Divergence => {
            emit(&git.divergence(&ctx).await)?;
            Ok(true)
        }
        Commands::CheckUpdates => {
            emit(&git.check_updates(&ctx).await)?;
            Ok(true)
        }
        Commands::LatestTag => {
            emit(&git.latest_tag(&ctx).await)?;
            Ok(true)
        }
        Commands::CommitDelta { tag } => {
            emit(&git.commit_delta(&ctx, &tag).await)?;
            Ok(true)
        }
        Commands::Exec { line } => {
            let result = git.run_raw(&ctx, &line).await?;
            emit_result(&result)
        }
        Commands::Classify {
            branch,
            remote,
            url,
        } => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read error text from stdin")?;

            let mut hints = ErrorContext::new();
            if let Some(branch) = branch {
                hints = hints.with_branch(branch);
            }
            if let Some(remote) = remote {
                hints = hints.with_remote(remote);
            }
            if let Some(url) = url {
                hints = hints.with_url(url);
            }

            emit(&classify(&text, Some(&hints)))?;
            Ok(true)
        }
        Commands::Lfs { action } => match action {
            LfsAction::Installed => {
                let installed = git.lfs_installed(&ctx).await;
                emit(&installed)?;
                Ok(installed)
            }
            LfsAction::Install => emit_result(&git.lfs_install(&ctx).await),
            LfsAction::Track { pattern } => emit_result(&git.lfs_track(&ctx, &pattern).await),
            LfsAction::Tracked => {
                emit(&git.lfs_tracked(&ctx).await)?;
                Ok(true)
            }
        },
    }
}
