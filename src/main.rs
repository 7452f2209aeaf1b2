use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use vitals_core::{AnalysisWindow, ChangeEvent, OutputFormat, VitalsConfig};
use vitals_gitpulse::compare::{compare_hotspots, ComparisonReport};
use vitals_gitpulse::coupling::{analyze_coupling, CouplingReport};
use vitals_gitpulse::hotspots::{analyze_hotspots, HotspotReport};
use vitals_gitpulse::knowledge::{analyze_knowledge, KnowledgeReport};
use vitals_gitpulse::mining::GitSource;
use vitals_gitpulse::source::{resolve_reference, ChangeSource};
use vitals_insight::cluster::{analyze_clusters, ClusterReport};
use vitals_insight::dx::DxReport;
use vitals_insight::effort::EffortReport;
use vitals_insight::pipeline::{analyze_window, load_complexity, HealthReport};
use vitals_insight::sink::{JsonDirSink, ReportSink};

#[derive(Parser)]
#[command(
    name = "vitals",
    version,
    about = "Engineering-health analytics from git history",
    long_about = "Vitals mines per-commit file changes and reports which files are hotspots,\n\
                   who holds the knowledge, which files change together, what kind of work\n\
                   the team is doing, where effort goes, and a composite DX score.\n\n\
                   Examples:\n  \
                     vitals analyze --path .               Every report for the last 90 days\n  \
                     vitals hotspots --days 30             Hottest files this month\n  \
                     vitals compare --from v1.0 --to HEAD  How hotspots moved between refs\n  \
                     vitals init                           Write a default .vitals.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .vitals.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Human-readable tables and summaries (default)\n  \
                         json  Machine-readable JSON with camelCase keys"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct WindowArgs {
    /// Repository path (default: current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Window length in days (default: from config, 90)
    #[arg(long)]
    days: Option<u32>,

    /// End of the window: ISO date, RFC 3339 timestamp, or git revision (default: now)
    #[arg(long)]
    until: Option<String>,

    /// Maximum rows to show in text output (default: 20)
    #[arg(long, default_value = "20")]
    limit: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Run every engine and print the full health report
    #[command(long_about = "Run every engine over one window.\n\n\
        Hotspots, knowledge, coupling/PAIN, work-type clusters, effort, and DX.\n\
        With --out-dir the JSON report is also stored as <dir>/<run-id>.json.\n\n\
        Examples:\n  vitals analyze --path .\n  vitals analyze --complexity complexity.json --out-dir .vitals/runs")]
    Analyze {
        #[command(flatten)]
        window: WindowArgs,

        /// JSON object mapping file paths to average complexity
        #[arg(long)]
        complexity: Option<PathBuf>,

        /// Directory to store the JSON report in
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Run identifier for the stored report (default: UTC timestamp)
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Rank files by recency-weighted change frequency and churn
    Hotspots {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Knowledge concentration, islands, and bus factor
    Knowledge {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Temporal coupling pairs and PAIN scores
    Coupling {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Cluster commits into work types and show drift
    Clusters {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Relative effort index per file
    Effort {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Developer-experience composite score
    Dx {
        #[command(flatten)]
        window: WindowArgs,

        /// JSON object mapping file paths to average complexity
        #[arg(long)]
        complexity: Option<PathBuf>,
    },
    /// Compare hotspots between two references
    #[command(long_about = "Compare hotspots between two references.\n\n\
        Each reference may be an ISO date, an RFC 3339 timestamp, or a git revision.\n\
        Both sides are analyzed over the configured window ending at the reference.\n\n\
        Examples:\n  vitals compare --from v1.0 --to HEAD\n  vitals compare --from 2024-01-01 --to 2024-04-01")]
    Compare {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Baseline reference
        #[arg(long)]
        from: String,

        /// Target reference
        #[arg(long)]
        to: String,

        /// Window length in days (default: from config, 90)
        #[arg(long)]
        days: Option<u32>,

        /// Maximum rows to show in text output (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Create a default .vitals.toml configuration file
    Init,
}

const CONFIG_FILE: &str = ".vitals.toml";

const DEFAULT_CONFIG: &str = r#"# Vitals Configuration

[window]
# days = 90

[history]
# max_files_per_commit = 25
# branch = "main"

[hotspot]
# half_life_days = 30.0
# rework_window_days = 14

[knowledge]
# half_life_days = 90.0
# island_threshold = 0.8

[coupling]
# half_life_days = 90.0
# min_shared_commits = 2

[clustering]
# seed = 42
# k = 4
# k_min = 2
# k_max = 8
# max_iterations = 100

[effort]
# alpha = 1.0
# alpha_grid = [0.1, 0.5, 1.0, 2.0, 5.0]

[dx]
# max_daily_rate = 10.0

[dx.weights]
# throughput = 0.25
# feedback_delay = 0.25
# focus = 0.25
# cognitive_load = 0.25

[dx.label_weights]
# feature = 1.0
# refactoring = 0.8
# bugfix = 0.5
# mixed = 0.5
# config = 0.3
"#;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<VitalsConfig> {
    let config = match path {
        Some(path) => VitalsConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                VitalsConfig::from_file(default_path)?
            } else {
                VitalsConfig::default()
            }
        }
    };
    Ok(config)
}

fn open_source(path: &Path, config: &VitalsConfig) -> Result<GitSource> {
    if !path.join(".git").exists() && git2::Repository::discover(path).is_err() {
        miette::bail!(miette::miette!(
            help = "Run vitals from inside a git repository, or specify --path to one",
            "Not a git repository: {}",
            path.display()
        ));
    }
    Ok(GitSource::new(path, config.history.clone()))
}

/// Events, sizes, and the resolved window for one `WindowArgs`.
struct Loaded {
    window: AnalysisWindow,
    events: Vec<ChangeEvent>,
    sizes: HashMap<String, u64>,
}

fn load_window(args: &WindowArgs, config: &mut VitalsConfig) -> Result<Loaded> {
    if let Some(days) = args.days {
        config.window.days = days;
    }
    let source = open_source(&args.path, config)?;

    let (to, size_ref) = match &args.until {
        Some(reference) => (resolve_reference(&source, reference)?, reference.as_str()),
        None => (Utc::now(), "HEAD"),
    };
    let window = AnalysisWindow::ending_at(to, config.window.days);

    eprintln!(
        "Mining git history at {} ({} to {})...",
        args.path.display(),
        window.from.format("%Y-%m-%d"),
        window.to.format("%Y-%m-%d")
    );
    let events = window.scope(&source.changes(window.from, window.to)?);
    let sizes = source.file_sizes(size_ref)?;
    eprintln!("Loaded {} file changes.", events.len());

    Ok(Loaded {
        window,
        events,
        sizes,
    })
}

fn complexity_map(path: Option<&Path>) -> Result<HashMap<String, f64>> {
    match path {
        Some(path) => Ok(load_complexity(path)?),
        None => Ok(HashMap::new()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).into_diagnostic()?
    );
    Ok(())
}

fn print_hotspots(report: &HotspotReport, limit: usize) {
    println!("Hotspots ({} commits)\n", report.total_commits);
    if report.files.is_empty() {
        println!("No changes in window.\n");
        return;
    }
    println!(
        "{:>4}  {:>6}  {:>5}  {:>7}  {:>6}  File",
        "Rank", "Score", "Revs", "Churn", "Rework"
    );
    for (i, f) in report.files.iter().take(limit).enumerate() {
        println!(
            "{:>4}  {:>6.3}  {:>5}  {:>7}  {:>6.2}  {}",
            i + 1,
            f.hotspot_score,
            f.change_frequency,
            f.code_churn,
            f.rework_ratio,
            f.file_path
        );
    }
    println!();
}

fn print_knowledge(report: &KnowledgeReport, limit: usize) {
    println!(
        "Knowledge: bus factor {}, {} islands, {} single-author files\n",
        report.developer_risk_index, report.knowledge_islands, report.single_author_files
    );
    for f in report.files.iter().take(limit) {
        let island = if f.is_knowledge_island { "  [island]" } else { "" };
        println!(
            "  {:.2}  {} ({} {:.0}%){}",
            f.knowledge_concentration,
            f.file_path,
            f.primary_author,
            f.primary_author_pct * 100.0,
            island
        );
    }
    println!();
}

fn print_coupling(report: &CouplingReport, limit: usize) {
    println!("Temporal coupling\n");
    if report.coupling_pairs.is_empty() {
        println!("No significant coupling detected.\n");
    } else {
        for pair in report.coupling_pairs.iter().take(limit) {
            println!(
                "  {:.2}  lift {:.2}  {} <-> {} ({} shared)",
                pair.coupling_strength,
                pair.lift,
                pair.file_a,
                pair.file_b,
                pair.shared_commits
            );
        }
        println!();
    }

    println!("PAIN\n");
    for p in report.pain.iter().filter(|p| p.pain_score > 0.0).take(limit) {
        println!("  {:.4}  {}", p.pain_score, p.file_path);
    }
    println!();
}

fn print_clusters(report: &ClusterReport) {
    println!(
        "Work types: k = {}, silhouette {:.3}\n",
        report.k, report.silhouette
    );
    for c in &report.clusters {
        println!(
            "  #{} {:<12} {:>4} commits  ~{:.1} files  ~{:.0} lines",
            c.id,
            c.label.to_string(),
            c.size,
            c.mean_features.file_count,
            c.mean_features.total_churn
        );
    }
    if !report.drift.is_empty() {
        println!("\nDrift (first half -> second half)\n");
        for d in &report.drift {
            println!(
                "  {:<12} {:>5.1}% -> {:>5.1}%  ({:+.1}, {:?})",
                d.label.to_string(),
                d.first_half_pct,
                d.second_half_pct,
                d.drift,
                d.trend
            );
        }
    }
    println!();
}

fn print_effort(report: &EffortReport, limit: usize) {
    match report.alpha {
        Some(alpha) if report.trained => println!(
            "Effort model: ridge alpha {alpha}, R² {:.3}\n",
            report.r_squared
        ),
        _ => println!("Effort model: equal weights (not enough files to train)\n"),
    }
    for f in report.files.iter().take(limit) {
        let top = f
            .attributions
            .first()
            .map(|a| a.feature.as_str())
            .unwrap_or("-");
        println!("  {:.3}  {}  (driver: {})", f.rei_score, f.file_path, top);
    }
    println!();
}

fn print_dx(report: &DxReport) {
    println!("DX score: {:.3}\n", report.dx_score);
    println!("  throughput      {:.3}", report.throughput);
    println!("  feedback delay  {:.3}", report.feedback_delay);
    println!("  focus ratio     {:.3}", report.focus_ratio);
    println!("  cognitive load  {:.3}", report.cognitive_load);
    println!();
}

fn print_health(report: &HealthReport, limit: usize) {
    println!(
        "Window {} to {}: {} commits, {} files\n",
        report.window.from.format("%Y-%m-%d"),
        report.window.to.format("%Y-%m-%d"),
        report.total_commits,
        report.total_files
    );
    print_hotspots(&report.hotspots, limit);
    print_knowledge(&report.knowledge, limit);
    print_coupling(&report.coupling, limit);
    print_clusters(&report.clusters);
    print_effort(&report.effort, limit);
    print_dx(&report.dx);
}

fn print_comparison(report: &ComparisonReport, limit: usize) {
    let s = &report.summary;
    println!(
        "{} ({}) -> {} ({})",
        report.from_ref,
        report.from_date.format("%Y-%m-%d"),
        report.to_ref,
        report.to_date.format("%Y-%m-%d")
    );
    println!(
        "{} degraded, {} improved, {} new, {} removed, {} unchanged\n",
        s.degraded, s.improved, s.new, s.removed, s.unchanged
    );
    for f in report.files.iter().take(limit) {
        println!(
            "  {:+.3}  {:<9}  {}",
            f.score_delta,
            format!("{:?}", f.status).to_lowercase(),
            f.file_path
        );
    }
}

fn default_run_id(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    tracing::debug!(format = %cli.format, "configuration loaded");

    match cli.command {
        Command::Analyze {
            ref window,
            ref complexity,
            ref out_dir,
            ref run_id,
        } => {
            let loaded = load_window(window, &mut config)?;
            let complexity = complexity_map(complexity.as_deref())?;
            let report = analyze_window(
                &loaded.events,
                &loaded.window,
                &loaded.sizes,
                &complexity,
                &config,
            );

            if let Some(dir) = out_dir {
                let sink = JsonDirSink::new(dir);
                let run_id = run_id.clone().unwrap_or_else(|| default_run_id(Utc::now()));
                sink.store(&run_id, &report)?;
                eprintln!("Stored report at {}", sink.path_for(&run_id).display());
            }

            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print_health(&report, window.limit),
            }
        }
        Command::Hotspots { ref window } => {
            let loaded = load_window(window, &mut config)?;
            let report = analyze_hotspots(
                &loaded.events,
                &loaded.window,
                &loaded.sizes,
                &config.hotspot,
            );
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print_hotspots(&report, window.limit),
            }
        }
        Command::Knowledge { ref window } => {
            let loaded = load_window(window, &mut config)?;
            let report = analyze_knowledge(&loaded.events, &loaded.window, &config.knowledge);
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print_knowledge(&report, window.limit),
            }
        }
        Command::Coupling { ref window } => {
            let loaded = load_window(window, &mut config)?;
            let report = analyze_coupling(&loaded.events, &loaded.window, &config.coupling);
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print_coupling(&report, window.limit),
            }
        }
        Command::Clusters { ref window } => {
            let loaded = load_window(window, &mut config)?;
            let report = analyze_clusters(&loaded.events, &loaded.window, &config.clustering);
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print_clusters(&report),
            }
        }
        Command::Effort { ref window } => {
            let loaded = load_window(window, &mut config)?;
            let report = analyze_window(
                &loaded.events,
                &loaded.window,
                &loaded.sizes,
                &HashMap::new(),
                &config,
            );
            match cli.format {
                OutputFormat::Json => print_json(&report.effort)?,
                OutputFormat::Text => print_effort(&report.effort, window.limit),
            }
        }
        Command::Dx {
            ref window,
            ref complexity,
        } => {
            let loaded = load_window(window, &mut config)?;
            let complexity = complexity_map(complexity.as_deref())?;
            let report = analyze_window(
                &loaded.events,
                &loaded.window,
                &loaded.sizes,
                &complexity,
                &config,
            );
            match cli.format {
                OutputFormat::Json => print_json(&report.dx)?,
                OutputFormat::Text => print_dx(&report.dx),
            }
        }
        Command::Compare {
            ref path,
            ref from,
            ref to,
            days,
            limit,
        } => {
            if let Some(days) = days {
                config.window.days = days;
            }
            let source = open_source(path, &config)?;
            let report = compare_hotspots(&source, from, to, &config)?;
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print_comparison(&report, limit),
            }
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_config_parses() {
        let config = VitalsConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.window.days, 90);
        assert_eq!(config.clustering.seed, 42);
    }

    #[test]
    fn run_id_is_compact_utc() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 6).unwrap();
        assert_eq!(default_run_id(at), "20240309T140506Z");
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["vitals", "hotspots", "--days", "30", "--format", "json"])
            .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Command::Hotspots { ref window } if window.days == Some(30)
        ));
    }
}
