//! share - mirror files between a local root and a shared root.
//!
//! Usage:
//!   share put <PATH>...      Copy to shared, always overwriting
//!   share push <PATH>...     Copy to shared if local is new or newer
//!   share get <PATH>...      Copy from shared, always overwriting
//!   share pull <PATH>...     Copy from shared if shared is new or newer
//!   share sync <PATH>...     Copy whichever side is newer
//!   share check <PATH>...    Show the sync state of each path
//!   share rm <PATH>...       Remove the shared copy
//!   share audit <PATH>...    Compare content of pairs that look synced
//!   share pushall | pullall | syncall | auditall
//!   share status             Group every tracked file by state
//!   share list               List every tracked file

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use share_analyze::{AuditOutcome, StatusReport, format_since};
use share_core::{
    ConfigSources, Decision, Direction, ManagedEntry, SideState, SyncConfig, parse_shared_root,
    paths::resolve_path, resolve_config,
};
use share_ops::{EventSink, Runner, ShareOp, SyncEvent};
use share_scan::SkipReason;

/// Status groups longer than this are truncated unless they need action.
const LIST_LIMIT: usize = 5;

#[derive(Parser)]
#[command(
    name = "share",
    version,
    about = "Mirror files between a local root and a shared root",
    long_about = "share keeps a tree under a local root mirrored at a shared root \
                  (a directory or user@host:path), copying whichever side is newer.\n\n\
                  Roots come from ~/.sharepath and ~/.shareroot, the nearest \
                  .shareoverride, the user config file, or the flags below."
)]
struct Cli {
    /// Show what would happen without changing anything
    #[arg(short = 'n', long, global = true)]
    preview: bool,

    /// Only print transfers, errors and summaries
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Local root (overrides configuration)
    #[arg(long, global = true, value_name = "DIR")]
    local_root: Option<PathBuf>,

    /// Shared root, a directory or user@host:path (overrides configuration)
    #[arg(long, global = true, value_name = "ROOT")]
    shared_root: Option<String>,

    /// Timestamp tolerance in seconds (default 1)
    #[arg(long, global = true, value_name = "SECS")]
    tolerance: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy file(s) to shared, always overwriting
    Put {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Copy file(s) to shared only if local is new or newer
    Push {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Push every tracked file whose local copy is newer
    #[command(name = "pushall")]
    PushAll,

    /// Copy file(s) from shared, always overwriting
    Get {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Copy file(s) from shared only if shared is new or newer
    Pull {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Pull every tracked file whose shared copy is new or newer
    #[command(name = "pullall")]
    PullAll,

    /// Copy whichever side is newer
    Sync {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Sync every tracked file
    #[command(name = "syncall")]
    SyncAll,

    /// Show the sync state of file(s)
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Remove file(s) from the shared location
    #[command(alias = "remove")]
    Rm {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Compare content of file(s) whose timestamps agree
    Audit {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Audit every tracked file whose timestamps agree
    #[command(name = "auditall")]
    AuditAll,

    /// Show the state of the entire shared directory
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List all files in the shared directory
    List,
}

impl Command {
    fn op(&self) -> ShareOp {
        match self {
            Self::Put { .. } => ShareOp::Put,
            Self::Push { .. } => ShareOp::Push,
            Self::PushAll => ShareOp::PushAll,
            Self::Get { .. } => ShareOp::Get,
            Self::Pull { .. } => ShareOp::Pull,
            Self::PullAll => ShareOp::PullAll,
            Self::Sync { .. } => ShareOp::Sync,
            Self::SyncAll => ShareOp::SyncAll,
            Self::Check { .. } => ShareOp::Check,
            Self::Rm { .. } => ShareOp::Remove,
            Self::Audit { .. } => ShareOp::Audit,
            Self::AuditAll => ShareOp::AuditAll,
            Self::Status { .. } => ShareOp::Status,
            Self::List => ShareOp::List,
        }
    }

    fn paths(&self) -> &[PathBuf] {
        match self {
            Self::Put { paths }
            | Self::Push { paths }
            | Self::Get { paths }
            | Self::Pull { paths }
            | Self::Sync { paths }
            | Self::Check { paths }
            | Self::Rm { paths }
            | Self::Audit { paths } => paths,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    let config = load_config(&cli, &cwd)?;
    debug!(?config, "resolved configuration");

    let sink = ConsoleSink::new(cli.quiet);
    let mut runner = Runner::new(&config, &cwd, sink).with_preview(cli.preview);
    let op = cli.command.op();

    let success = match &cli.command {
        Command::PushAll | Command::PullAll | Command::SyncAll | Command::AuditAll => {
            run_sweep(&mut runner, op)
        }
        Command::Status { format } => run_status(&mut runner, *format, cli.quiet)?,
        Command::List => run_list(&runner),
        command => run_paths(&mut runner, op, command.paths(), cli.quiet),
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {e}"))
}

/// Resolve configuration once, then apply command-line overrides.
fn load_config(cli: &Cli, cwd: &Path) -> Result<SyncConfig> {
    let home = dirs::home_dir();
    let sources = ConfigSources::new(home.clone(), dirs::config_dir());
    let mut config = resolve_config(cwd, &sources).context("Failed to resolve share roots")?;

    if let Some(local_root) = &cli.local_root {
        config.local_root = Some(resolve_path(local_root, cwd));
    }
    if let Some(shared_root) = &cli.shared_root {
        config.shared_root = parse_shared_root(shared_root, cwd, home.as_deref())
            .context("Invalid --shared-root")?;
    }
    if let Some(secs) = cli.tolerance {
        config.tolerance = Duration::try_from_secs_f64(secs)
            .map_err(|e| eyre!("Invalid --tolerance {secs}: {e}"))?;
    }
    Ok(config)
}

fn run_paths(
    runner: &mut Runner<'_, ConsoleSink>,
    op: ShareOp,
    paths: &[PathBuf],
    quiet: bool,
) -> bool {
    let summary = runner.run_paths(op, paths);
    if op == ShareOp::Audit && !quiet {
        println!("✓ {}", summary.sweep_message());
    }
    if paths.len() > 1 {
        if let Some(message) = summary.error_message() {
            println!("⚠ {message}");
        }
    }
    summary.is_success()
}

fn run_sweep(runner: &mut Runner<'_, ConsoleSink>, op: ShareOp) -> bool {
    match runner.sweep(op) {
        Ok(summary) => {
            println!("✓ {}", summary.sweep_message());
            if let Some(message) = summary.error_message() {
                println!("⚠ {message}");
            }
            summary.is_success()
        }
        Err(e) => {
            println!("✗ Error: {e}");
            false
        }
    }
}

fn run_status(
    runner: &mut Runner<'_, ConsoleSink>,
    format: OutputFormat,
    quiet: bool,
) -> Result<bool> {
    let report = match runner.status() {
        Ok(report) => report,
        Err(e) => {
            println!("✗ Error: {e}");
            return Ok(false);
        }
    };

    match format {
        OutputFormat::Text => print_status(&report, quiet),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(true)
}

fn run_list(runner: &Runner<'_, ConsoleSink>) -> bool {
    match runner.list() {
        Ok(paths) => {
            for path in paths {
                println!("{}", path.display());
            }
            true
        }
        Err(e) => {
            println!("✗ Error: {e}");
            false
        }
    }
}

fn print_status(report: &StatusReport, quiet: bool) {
    if report.is_empty() {
        println!("No files tracked");
        return;
    }

    println!("Shared directory: {}", report.shared_root);
    match &report.local_root {
        Some(root) => println!("Local root: {}", root.display()),
        None => println!("Local root: Not set"),
    }
    println!("Total files tracked: {}", report.total());
    println!();

    print_group("✓ Synced", &report.synced, Some(LIST_LIMIT), quiet);
    print_group("⚠ Need push (local newer)", &report.need_push, None, quiet);
    print_group("⚠ Need pull (shared newer)", &report.need_pull, None, quiet);
    print_group("⊘ Only in shared", &report.only_shared, Some(LIST_LIMIT), quiet);
}

fn print_group(title: &str, paths: &[PathBuf], limit: Option<usize>, quiet: bool) {
    if paths.is_empty() {
        return;
    }
    println!("{title}: {} files", paths.len());
    if !quiet {
        let shown = limit.unwrap_or(paths.len());
        for path in paths.iter().take(shown) {
            println!("  {}", path.display());
        }
        if paths.len() > shown {
            println!("  ... and {} more", paths.len() - shown);
        }
    }
    println!();
}

/// Renders events as status lines on stdout.
struct ConsoleSink {
    quiet: bool,
    now: SystemTime,
}

impl ConsoleSink {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            now: SystemTime::now(),
        }
    }

    fn extra(&self, line: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", line.as_ref());
        }
    }

    fn print_check(&self, entry: &ManagedEntry, decision: Decision) {
        println!("File: {}", entry.local.display());
        println!("Shared path: {}", entry.shared);
        println!();

        match decision {
            Decision::Neither => println!("Status: ✗ Does not exist in either location"),
            Decision::PushNew => {
                println!("Status: ⊘ Not shared (only exists locally)");
                if let Some(state) = &entry.local_state {
                    self.extra(format!("Local: {}", self.describe_side(state)));
                }
                self.extra("→ Use 'share put' or 'share push' to share");
            }
            Decision::PullNew => {
                println!("Status: ⊘ Only in shared (not in local)");
                if let Some(state) = &entry.shared_state {
                    self.extra(format!("Shared: {}", self.describe_side(state)));
                }
                self.extra("→ Use 'share get' or 'share pull' to retrieve");
            }
            Decision::PushNewer | Decision::PullNewer | Decision::Synced => {
                if let (Some(local), Some(shared)) = (&entry.local_state, &entry.shared_state) {
                    self.extra(format!("Local:  {}", self.describe_side(local)));
                    self.extra(format!("Shared: {}", self.describe_side(shared)));
                    self.extra("");
                }
                match decision {
                    Decision::PushNewer => {
                        println!("Status: ⚠ Local is newer");
                        println!("→ Use 'share push' to update shared");
                    }
                    Decision::PullNewer => {
                        println!("Status: ⚠ Shared is newer");
                        println!("→ Use 'share pull' to update local");
                    }
                    _ => println!("Status: ✓ Synced"),
                }
            }
        }
    }

    fn describe_side(&self, state: &SideState) -> String {
        let stamp = DateTime::<Local>::from(state.modified).format("%Y-%m-%d %H:%M:%S");
        let age = format_since(state.modified, self.now);
        match state.size {
            Some(size) => format!("Modified {age} ({stamp}), {}", format_size(size)),
            None => format!("Modified {age} ({stamp})"),
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Transferred {
                op,
                local,
                shared,
                direction,
                decision,
                preview,
            } => {
                let prefix = if preview { "(preview) " } else { "" };
                let local = local.display();
                let line = match (op, direction, decision) {
                    (ShareOp::Put, ..) => format!("Put: {local} → {shared}"),
                    (ShareOp::Get, ..) => format!("Got: {shared} → {local}"),
                    (ShareOp::Sync | ShareOp::SyncAll, Direction::Push, d) => {
                        format!("Synced: {local} → shared ({})", reason(d))
                    }
                    (ShareOp::Sync | ShareOp::SyncAll, Direction::Pull, d) => {
                        format!("Synced: shared → {local} ({})", reason(d))
                    }
                    (_, Direction::Push, Some(Decision::PushNew)) => {
                        format!("Pushed: {local} → {shared} (new)")
                    }
                    (_, Direction::Push, d) => format!("Pushed: {local} ({})", reason(d)),
                    (_, Direction::Pull, Some(Decision::PullNew)) => {
                        format!("Pulled: {local} (new locally)")
                    }
                    (_, Direction::Pull, d) => format!("Pulled: {local} ({})", reason(d)),
                };
                println!("✓ {prefix}{line}");
            }
            SyncEvent::Unchanged { op, local, .. } => {
                let local = local.display();
                match op {
                    ShareOp::Push => self.extra(format!("⊘ Not pushed: {local} (shared is newer or same)")),
                    ShareOp::Pull => self.extra(format!("⊘ Not pulled: {local} (local is newer or same)")),
                    _ => self.extra(format!("✓ Already synced: {local}")),
                }
            }
            SyncEvent::Skipped { path, reason } => match reason {
                SkipReason::Private => {
                    self.extra(format!("⚠ {} looks like private; skipping.", path.display()))
                }
                SkipReason::Pattern(pattern) => {
                    debug!(path = %path.display(), %pattern, "ignored");
                }
            },
            SyncEvent::Checked { entry, decision } => self.print_check(&entry, decision),
            SyncEvent::Removed {
                shared, preview, ..
            } => {
                let prefix = if preview { "(preview) " } else { "" };
                println!("✓ {prefix}Removed from shared: {shared}");
            }
            SyncEvent::NotShared { local } => {
                println!("⊘ File not in shared: {}", local.display());
            }
            SyncEvent::Audited(finding) => {
                let local = finding.local.display();
                match finding.outcome {
                    AuditOutcome::Verified { .. } => self.extra(format!("✓ Verified: {local}")),
                    AuditOutcome::Mismatched { .. } => println!(
                        "⚠ Content differs: {local} ↔ {} (timestamps agree; resolve manually)",
                        finding.shared
                    ),
                    AuditOutcome::Unauditable => {
                        println!("⊘ Cannot audit: {local} (shared root is remote)")
                    }
                    AuditOutcome::NotSynced { decision } => {
                        self.extra(format!("⊘ Not audited: {local} ({})", decision.reason()))
                    }
                    AuditOutcome::Failed { message } => println!("✗ Error: {local}: {message}"),
                }
            }
            SyncEvent::RootCreated { root, preview } => {
                if preview {
                    self.extra(format!("⊘ Shared directory does not exist: {}", root.display()));
                } else {
                    self.extra(format!("✓ Created shared directory: {}", root.display()));
                }
            }
            SyncEvent::Failed { error, .. } => println!("✗ Error: {error}"),
        }
    }
}

fn reason(decision: Option<Decision>) -> &'static str {
    decision.map(Decision::reason).unwrap_or("forced")
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
