use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    process::ExitCode,
    sync::{Arc, Mutex},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use fileshelf::{
    api::{RemoteStore, StoreClient},
    config::{get_config_path, Config},
    logic::{
        filter::{FilterSpec, KindFilter, SearchMode},
        formatting::format_bytes,
        path,
    },
    model::{BatchItem, Browser, ItemDescriptor},
    services::{
        listing::{self, ListingSource},
        transfer::{BatchState, BatchSummary, TransferOrchestrator},
        upload_plan::plan_upload,
    },
    utils,
};

/// Command-line client for a remote file store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging to the temp dir (fileshelf-debug.log)
    #[arg(short, long)]
    debug: bool,

    /// Path to config file (default: platform-specific, see docs)
    #[arg(short, long)]
    config: Option<String>,

    /// Root folder, overriding the config
    #[arg(long)]
    root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a folder
    Ls {
        path: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Filter a folder, or query the whole store with --global
    Search {
        query: Option<String>,
        path: Option<String>,
        /// Comma-separated extensions, e.g. "jpg,png"
        #[arg(long)]
        ext: Option<String>,
        #[arg(long)]
        min_size: Option<String>,
        #[arg(long)]
        max_size: Option<String>,
        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        global: bool,
        #[arg(long)]
        regex: bool,
        #[arg(long)]
        case_sensitive: bool,
        #[arg(long = "type", value_enum, default_value_t = KindArg::All)]
        kind: KindArg,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Upload local files or folders
    Upload {
        #[arg(required = true)]
        local: Vec<PathBuf>,
        /// Remote destination folder (default: root)
        #[arg(long)]
        to: Option<String>,
    },
    /// Download a remote file
    Get {
        path: String,
        /// Local file to write (default: the remote file name)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Move remote items into a folder
    Mv {
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long)]
        to: String,
        #[arg(long)]
        overwrite: bool,
    },
    /// Move remote items to the trash
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Create a folder
    Mkdir {
        name: String,
        #[arg(long = "in")]
        parent: Option<String>,
    },
    /// Print the server-side checksum of a file
    Checksum { path: String },
    /// Inspect or manage the trash
    Trash {
        #[command(subcommand)]
        action: TrashCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TrashCommand {
    List,
    Restore { id: String },
    Purge { id: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    All,
    Folders,
    Files,
}

impl From<KindArg> for KindFilter {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::All => KindFilter::All,
            KindArg::Folders => KindFilter::FoldersOnly,
            KindArg::Files => KindFilter::FilesOnly,
        }
    }
}

fn init_debug_logging() -> Result<()> {
    let log_path = utils::get_debug_log_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open debug log {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .init();
    Ok(())
}

/// Resolve a user-supplied remote path against the root
fn remote_path(root: &str, arg: Option<&str>) -> String {
    match arg {
        None => root.to_string(),
        Some(p) if path::is_within(p, root) => path::segments(p).join("/"),
        Some(p) => {
            let mut full = path::segments(root);
            full.extend(path::segments(p));
            full.join("/")
        }
    }
}

fn print_items(items: &[ItemDescriptor], current_path: &str) {
    for item in items {
        let size = if item.is_folder() {
            "-".to_string()
        } else {
            format_bytes(item.size_bytes)
        };
        let modified = item
            .last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let kind = if item.is_folder() { "d" } else { "-" };
        let shown = match &item.path {
            Some(_) => item.full_path(current_path),
            None => item.name.clone(),
        };
        println!("{} {:>12} {:16} {}", kind, size, modified, shown);
    }
}

fn print_progress(state: &BatchState) {
    let mut err = std::io::stderr();
    let _ = write!(
        err,
        "\r{:>3}% {}/{} items  {} / {}  {}    ",
        state.percent,
        state.attempted_items(),
        state.total_items,
        format_bytes(state.transferred_bytes),
        format_bytes(state.total_bytes),
        state.speed()
    );
    let _ = err.flush();
}

fn print_download_progress(loaded: u64, total: u64) {
    let mut err = std::io::stderr();
    let _ = if total > 0 {
        write!(
            err,
            "\r{:>3}% {} / {}    ",
            (loaded.min(total) * 100 / total),
            format_bytes(loaded),
            format_bytes(total)
        )
    } else {
        write!(err, "\r{}    ", format_bytes(loaded))
    };
    let _ = err.flush();
}

fn print_summary(summary: &BatchSummary) -> ExitCode {
    eprintln!();
    for failure in &summary.failures {
        eprintln!("failed: {}: {}", failure.source_path, failure.error);
    }
    let bytes = summary
        .byte_totals()
        .map(|(done, total)| format!(", {} of {}", format_bytes(done), format_bytes(total)))
        .unwrap_or_default();
    eprintln!(
        "{} done, {} failed, {} total{}{}",
        summary.completed_items,
        summary.failed_items,
        summary.total_items,
        bytes,
        if summary.cancelled { " (cancelled)" } else { "" }
    );

    if summary.failed_items > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling batch");
            token.cancel();
        }
    });
}

/// Look up remote entries so batch items know whether they are folders
async fn lookup_items(
    store: &dyn RemoteStore,
    root: &str,
    paths: &[String],
) -> Result<Vec<BatchItem>> {
    let mut items = Vec::with_capacity(paths.len());

    for arg in paths {
        let full = remote_path(root, Some(arg));
        let mut parts = path::segments(&full);
        let name = parts
            .pop()
            .with_context(|| format!("Not an item path: {}", arg))?;
        let parent = parts.join("/");

        let entry = listing::find_child(store, &parent, &name)
            .await
            .with_context(|| format!("Failed to list {}", parent))?
            .with_context(|| format!("No such item: {}", full))?;
        items.push(entry.to_batch_item(&parent));
    }
    Ok(items)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command-line arguments
    let args = Args::parse();

    if args.debug {
        init_debug_logging()?;
        debug!("Debug mode enabled");
    }

    // Determine config file path
    let config_path = get_config_path(args.config)?;
    debug!("Loading config from: {:?}", config_path);
    let mut config = Config::load(&config_path)?;

    // Override config with CLI flags
    if let Some(root) = args.root {
        config.root_path = root;
    }
    let root = path::segments(&config.root_path).join("/");

    let client = StoreClient::new(config.base_url.clone(), config.token.clone(), config.timeout())?;
    let store: Arc<dyn RemoteStore> = Arc::new(client);

    match args.command {
        Command::Ls {
            path: dir,
            page,
            page_size,
        } => {
            let mut browser = Browser::new(root.clone(), page_size.unwrap_or(config.page_size));
            let target = remote_path(&root, dir.as_deref());
            if target != browser.current_path() {
                navigate_to(&mut browser, &target);
            }
            fetch_page(&mut browser, store.as_ref(), page).await?;
            print_items(browser.display_items(), browser.current_path());
            eprintln!(
                "page {}/{} ({} items)",
                page,
                browser.total_pages(),
                browser.total_count()
            );
        }
        Command::Search {
            query,
            path: dir,
            ext,
            min_size,
            max_size,
            from,
            to,
            global,
            regex,
            case_sensitive,
            kind,
            page,
        } => {
            let spec = FilterSpec::default()
                .with_name_query(query.unwrap_or_default())
                .with_regex(regex)
                .with_case_sensitive(case_sensitive)
                .with_kind(kind.into())
                .with_extensions(ext.as_deref().unwrap_or(""))
                .with_size_min(min_size.as_deref().unwrap_or(""))
                .with_size_max(max_size.as_deref().unwrap_or(""))
                .with_date_from(from.as_deref().unwrap_or(""))
                .with_date_to(to.as_deref().unwrap_or(""))
                .with_mode(if global {
                    SearchMode::Global
                } else {
                    SearchMode::Local
                });

            let mut browser = Browser::new(root.clone(), config.page_size);
            let target = remote_path(&root, dir.as_deref());
            if target != browser.current_path() {
                navigate_to(&mut browser, &target);
            }
            browser.set_filter(spec);
            fetch_page(&mut browser, store.as_ref(), page).await?;
            print_items(browser.display_items(), browser.current_path());
            eprintln!(
                "{} match(es), page {}/{}",
                browser.display_items().len(),
                page,
                browser.total_pages()
            );
        }
        Command::Upload { local, to } => {
            let base = remote_path(&root, to.as_deref());
            let plan = plan_upload(&local, &base)?;
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(&cancel);

            let mut orchestrator = TransferOrchestrator::new(store);
            let summary = orchestrator.upload(plan, &cancel, print_progress).await?;
            return Ok(print_summary(&summary));
        }
        Command::Get { path: file, out } => {
            let target = remote_path(&root, Some(&file));
            let name = path::segments(&target)
                .pop()
                .with_context(|| format!("Not a file path: {}", file))?;
            let local = out.unwrap_or_else(|| PathBuf::from(name));
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(&cancel);

            let mut on_progress = print_download_progress;
            let written = store
                .download_item(&target, &local, &mut on_progress, &cancel)
                .await?;
            eprintln!();
            println!("{} -> {} ({})", target, local.display(), format_bytes(written));
        }
        Command::Mv {
            paths,
            to,
            overwrite,
        } => {
            let items = lookup_items(store.as_ref(), &root, &paths).await?;
            let destination = remote_path(&root, Some(&to));
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(&cancel);

            let mut orchestrator = TransferOrchestrator::new(store);
            let summary = orchestrator
                .move_items(
                    items,
                    &destination,
                    overwrite || config.move_overwrite,
                    &cancel,
                    print_progress,
                )
                .await?;
            return Ok(print_summary(&summary));
        }
        Command::Rm { paths } => {
            let items = lookup_items(store.as_ref(), &root, &paths).await?;
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(&cancel);

            let mut orchestrator = TransferOrchestrator::new(store);
            let summary = orchestrator.delete(items, &cancel, print_progress).await?;
            return Ok(print_summary(&summary));
        }
        Command::Mkdir { name, parent } => {
            let parent = remote_path(&root, parent.as_deref());
            store.create_folder(&parent, &name).await?;
            println!("{}", path::join(&parent, &name));
        }
        Command::Checksum { path: file } => {
            let target = remote_path(&root, Some(&file));
            let sum = store.checksum(&target).await?;
            println!("{}  {}  {}", sum.algorithm, sum.checksum, target);
        }
        Command::Trash { action } => match action {
            TrashCommand::List => {
                for entry in store.list_trash().await? {
                    let deleted = entry
                        .deleted_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    println!(
                        "{:<24} {:>12} {:16} {}  ({})",
                        entry.id,
                        format_bytes(entry.size_bytes),
                        deleted,
                        entry.name,
                        entry.original_path
                    );
                }
            }
            TrashCommand::Restore { id } => store.restore_trash(&id).await?,
            TrashCommand::Purge { id } => store.purge_trash(&id).await?,
        },
    }

    Ok(ExitCode::SUCCESS)
}

/// Fetch one page of the browser's current view
///
/// Global mode without any query term lists nothing.
async fn fetch_page(browser: &mut Browser, store: &dyn RemoteStore, page: u32) -> Result<()> {
    if page <= 1 {
        listing::refresh(browser, store).await?;
        return Ok(());
    }
    if let Some(source) = ListingSource::for_browser(browser) {
        let fetched = source.fetch(store, page, browser.page_size()).await?;
        browser.apply_page(fetched);
    }
    Ok(())
}

/// Walk the browser down to `target` through its crumbs
fn navigate_to(browser: &mut Browser, target: &str) {
    for segment in path::breadcrumbs(browser.root_path(), target) {
        browser.open_folder(&ItemDescriptor::folder(segment));
    }
}
