use anyhow::Context;
use backlog_core::constants::{DEFAULT_SYNC_MESSAGE, OVERVIEW_FILE_NAME};
use backlog_core::text_layout::valid_file_name;
use backlog_core::view::status_table_title;
use backlog_core::{
    author_from_env_values, new_item, resolve_root_dir, Backlog, BacklogConfig, BacklogItem,
    BacklogItemStatus, BacklogOverview, BacklogView, GitService, SyncAction,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "backlog")]
#[command(about = "Markdown backlogs kept in Git")]
struct Cli {
    /// Backlog root directory (defaults to BACKLOG_ROOT, then the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a backlog directory with an empty overview
    CreateBacklog {
        /// Directory name under the root
        backlog: String,
        /// Overview title (defaults to the directory name)
        #[arg(long)]
        title: Option<String>,
    },
    /// Create a backlog item
    CreateItem {
        /// Backlog directory name under the root
        backlog: String,
        /// Item title
        title: String,
        /// Initial status, by name or code
        #[arg(long, default_value = "hangar")]
        status: String,
        /// Person the item is assigned to
        #[arg(long)]
        assigned: Option<String>,
        /// Estimate in points
        #[arg(long)]
        estimate: Option<String>,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Free-text description
        #[arg(long)]
        description: Option<String>,
    },
    /// Change the status of an item
    ChangeStatus {
        /// Backlog directory name under the root
        backlog: String,
        /// Item name (file name without `.md`)
        item: String,
        /// New status, by name or code
        status: String,
    },
    /// List the items of a backlog in overview order
    List {
        /// Backlog directory name under the root
        backlog: String,
        /// Only list this status, by name or code
        #[arg(long)]
        status: Option<String>,
        /// Print markdown tables instead of plain text
        #[arg(long)]
        markdown: bool,
    },
    /// Refresh overviews and generated pages, then sync with the remote
    Sync {
        /// Commit message for local changes
        #[arg(long, default_value = DEFAULT_SYNC_MESSAGE)]
        message: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("backlog=info".parse()?)
                .add_directive("backlog_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let root_override = cli
        .root
        .or_else(|| std::env::var_os("BACKLOG_ROOT").map(PathBuf::from));
    let cwd = std::env::current_dir().context("can't read the current directory")?;
    let root_dir = resolve_root_dir(root_override, &cwd)?;

    match cli.command {
        Some(Commands::CreateBacklog { backlog, title }) => {
            let dir = root_dir.join(&backlog);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("can't create {}", dir.display()))?;
            let path = dir.join(OVERVIEW_FILE_NAME);
            if path.exists() {
                anyhow::bail!("backlog {backlog} already exists");
            }
            let overview = BacklogOverview::new(&path, title.as_deref().unwrap_or(&backlog));
            overview.save()?;
            println!("Created backlog {}", dir.display());
        }
        Some(Commands::CreateItem {
            backlog,
            title,
            status,
            assigned,
            estimate,
            tags,
            description,
        }) => {
            let dir = backlog_dir(&root_dir, &backlog)?;
            let status: BacklogItemStatus = status.parse()?;
            let name = valid_file_name(&title).to_lowercase();
            if name.is_empty() {
                anyhow::bail!("title {title:?} gives an empty file name");
            }
            let author = std::env::var("BACKLOG_AUTHOR_NAME").unwrap_or_default();

            let mut item = new_item(&dir, name, &title, author.trim(), status);
            if item.location().exists() {
                anyhow::bail!("item {} already exists", item.name());
            }
            if let Some(assigned) = assigned {
                item.set_assigned(&assigned);
            }
            if let Some(estimate) = estimate {
                item.set_estimate(&estimate);
            }
            item.set_tags(&tags);
            if let Some(description) = description {
                item.set_description(&description);
            }
            item.save()?;
            println!("Created item {}", item.location().display());
        }
        Some(Commands::ChangeStatus {
            backlog,
            item,
            status,
        }) => {
            let dir = backlog_dir(&root_dir, &backlog)?;
            let status: BacklogItemStatus = status.parse()?;
            let path = dir.join(format!("{item}.md"));
            if !path.is_file() {
                anyhow::bail!("no item {item} in backlog {backlog}");
            }
            let mut item = BacklogItem::load(&path)?;
            item.set_status(status);
            item.touch_modified();
            item.save()?;
            println!("{} is now {}", item.name(), status.description());
        }
        Some(Commands::List {
            backlog,
            status,
            markdown,
        }) => {
            let dir = backlog_dir(&root_dir, &backlog)?;
            let statuses = match status {
                Some(status) => vec![status.parse::<BacklogItemStatus>()?],
                None => BacklogItemStatus::ALL.to_vec(),
            };
            let overview = BacklogOverview::load(dir.join(OVERVIEW_FILE_NAME))?;
            let items = Backlog::load(&dir)?;

            for status in statuses {
                let ordered = overview.ordered_items(status, items.items());
                if ordered.is_empty() {
                    continue;
                }
                let lines = if markdown {
                    let mut lines = vec![format!("### {}", status.description()), String::new()];
                    lines.extend(BacklogView.write_markdown_table(&ordered, &dir));
                    lines
                } else {
                    BacklogView.write_ascii_table(&ordered, &status_table_title(status), true)
                };
                println!("{}\n", lines.join("\n"));
            }
        }
        Some(Commands::Sync { message }) => {
            let author = author_from_env_values(
                std::env::var("BACKLOG_AUTHOR_NAME").ok(),
                std::env::var("BACKLOG_AUTHOR_EMAIL").ok(),
            )?;
            let config = BacklogConfig::new(root_dir, author)?
                .with_remote(std::env::var("BACKLOG_REMOTE").ok())
                .with_branch(std::env::var("BACKLOG_BRANCH").ok());

            let git = GitService::open(config.root_dir())?
                .with_remote(config.remote())
                .with_branch(config.branch());
            let outcome = SyncAction::new(&config, message).execute(&git)?;
            tracing::info!(?outcome, "sync complete");
        }
        None => {
            println!("Use 'backlog --help' for commands");
        }
    }

    Ok(())
}

fn backlog_dir(root_dir: &Path, backlog: &str) -> anyhow::Result<PathBuf> {
    let dir = root_dir.join(backlog);
    if !dir.join(OVERVIEW_FILE_NAME).is_file() {
        anyhow::bail!("{} is not a backlog directory", dir.display());
    }
    Ok(dir)
}
