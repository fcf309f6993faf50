//! WP Site Analyzer CLI - architecture reports for WordPress sites

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use wp_site_analyzer::{
    AdminAction, AdminResponse, AdminService, CacheHandler, Caller, Error, ExportFormat,
    LocalCollector, OptionStore, RemoteCollector, Settings, SiteSnapshot, collect,
    output::{OutputConfig, OutputFormat, OutputSort, output_envelope, output_progress, output_record},
};

/// WordPress site analyzer - post types, taxonomies, fields, plugins, theme and design tokens
#[derive(Parser, Debug)]
#[command(name = "wp-site-analyzer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: wp-site-analyzer.toml in this or a parent directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect site data and run the scanners
    Scan {
        #[command(flatten)]
        source: SourceArgs,

        /// Scanners to run (default: all)
        #[arg(long, value_delimiter = ',')]
        scanners: Vec<String>,

        /// Output format
        #[arg(short = 'o', long = "output", default_value = "human", value_enum)]
        output_format: OutputFormatArg,

        /// Row order of the summary table
        #[arg(long = "sort", default_value = "registry", value_enum)]
        sort: OutputSortArg,
    },
    /// Collect site data and save it as a snapshot file
    Snapshot {
        #[command(flatten)]
        source: SourceArgs,

        /// Where to write the snapshot
        #[arg(long)]
        out: PathBuf,
    },
    /// Show the progress of the running or last scan
    Progress {
        #[arg(short = 'o', long = "output", default_value = "human", value_enum)]
        output_format: OutputFormatArg,
    },
    /// Export the cached scan results
    Export {
        #[arg(short, long, default_value = "json", value_enum)]
        format: ExportFormatArg,

        /// Output file (default: the export's own file name in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render the cached scan results as an HTML report
    Report {
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Inspect or clear the scan cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,

        #[arg(short = 'o', long = "output", default_value = "human", value_enum, global = true)]
        output_format: OutputFormatArg,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Delete cached results, progress and the last-scan time
    Clear,
    /// Cache backend summary
    Stats,
    /// Detailed state of the cached scan results
    Diagnose,
}

/// Where site data comes from
#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// Site URL (default: [site] url from the configuration)
    #[arg(long)]
    url: Option<String>,

    /// Read a saved snapshot instead of contacting the site
    #[arg(long, conflicts_with = "url")]
    snapshot: Option<PathBuf>,

    /// Local theme directory to read stylesheets and templates from
    #[arg(long)]
    theme_dir: Option<PathBuf>,

    /// Local WordPress root to read configuration and file permissions from
    #[arg(long)]
    wp_root: Option<PathBuf>,

    /// Allow private/internal IP addresses (localhost, 192.168.x.x, etc.)
    #[arg(long = "allow-private")]
    allow_private: bool,
}

/// Output format argument
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormatArg {
    Human,
    Json,
    None,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::None => OutputFormat::None,
        }
    }
}

/// Output sort argument
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputSortArg {
    /// Scanner registry order (default)
    Registry,
    /// Alphabetically by scanner name
    Name,
    /// Failed scanners first
    Status,
}

impl From<OutputSortArg> for OutputSort {
    fn from(arg: OutputSortArg) -> Self {
        match arg {
            OutputSortArg::Registry => OutputSort::Registry,
            OutputSortArg::Name => OutputSort::Name,
            OutputSortArg::Status => OutputSort::Status,
        }
    }
}

/// Export format argument
#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExportFormatArg {
    Json,
    Markdown,
    AiOptimized,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Json => ExportFormat::Json,
            ExportFormatArg::Markdown => ExportFormat::Markdown,
            ExportFormatArg::AiOptimized => ExportFormat::AiOptimized,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> wp_site_analyzer::Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::discover(),
    };

    let data_dir = settings.data_dir();
    let cache = CacheHandler::new(&data_dir)
        .with_object_cache(settings.object_cache)
        .with_caching_enabled(settings.enable_caching);
    let options = OptionStore::new(&data_dir);
    let service = AdminService::new(&cache, &options, &settings);

    let caller = Caller::administrator(settings.admin.user.clone());
    let nonce = service.mint_nonce(&caller.user);
    let handle = |action: AdminAction| service.handle(&caller, &nonce, action);

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    match cli.command {
        Command::Scan {
            source,
            scanners,
            output_format,
            sort,
        } => {
            if matches!(output_format, OutputFormatArg::Human) {
                print_banner();
            }
            let site = collect_site(&source, &settings).await?;
            let response = handle(AdminAction::Scan {
                site: Box::new(site),
                scanners,
            })?;
            if let AdminResponse::Scan(envelope) = response {
                let config = OutputConfig::new(output_format.into(), sort.into());
                output_envelope(&envelope, &config, &mut writer)?;
            }
        }
        Command::Snapshot { source, out } => {
            let site = collect_site(&source, &settings).await?;
            site.save(&out)?;
            tracing::info!("snapshot written to {}", out.display());
        }
        Command::Progress { output_format } => {
            if let AdminResponse::Progress(progress) = handle(AdminAction::Progress)? {
                let config = OutputConfig::new(output_format.into(), OutputSort::default());
                output_progress(&progress, &config, &mut writer)?;
            }
        }
        Command::Export { format, out } => {
            if let AdminResponse::Download(download) = handle(AdminAction::Export {
                format: format.into(),
            })? {
                let path = out.unwrap_or_else(|| PathBuf::from(download.filename()));
                write_file(&path, &download.body)?;
                writeln!(
                    writer,
                    "Exported {} bytes ({}) to {}",
                    download.content_length,
                    download.content_type,
                    path.display()
                )
                .map_err(Error::OutputFailed)?;
            }
        }
        Command::Report { out } => {
            if let AdminResponse::Html(html) = handle(AdminAction::Report)? {
                match out {
                    Some(path) => write_file(&path, &html)?,
                    None => writeln!(writer, "{}", html).map_err(Error::OutputFailed)?,
                }
            }
        }
        Command::Cache {
            action,
            output_format,
        } => {
            let config = OutputConfig::new(output_format.into(), OutputSort::default());
            match action {
                CacheCommand::Clear => {
                    if let AdminResponse::Message(message) = handle(AdminAction::ClearCache)? {
                        writeln!(writer, "{}", message).map_err(Error::OutputFailed)?;
                    }
                }
                CacheCommand::Stats => {
                    if let AdminResponse::Diagnostics(diagnostics) =
                        handle(AdminAction::CacheDiagnostics)?
                    {
                        output_record(&diagnostics.cache_stats, &config, &mut writer)?;
                    }
                }
                CacheCommand::Diagnose => {
                    if let AdminResponse::Diagnostics(diagnostics) =
                        handle(AdminAction::CacheDiagnostics)?
                    {
                        output_record(&*diagnostics, &config, &mut writer)?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Build the snapshot from a saved file or the live site, then overlay local files
async fn collect_site(source: &SourceArgs, settings: &Settings) -> wp_site_analyzer::Result<SiteSnapshot> {
    let url = source.url.clone().or_else(|| settings.site.url.clone());
    let has_local = source.theme_dir.is_some() || source.wp_root.is_some();

    let mut snapshot = if let Some(path) = &source.snapshot {
        collect::from_file(path)?
    } else if let Some(url) = url {
        let mut site = settings.site.clone();
        site.url = Some(url);
        site.allow_private |= source.allow_private;
        RemoteCollector::from_settings(&site)?.collect().await?
    } else if has_local {
        SiteSnapshot::default()
    } else {
        return Err(Error::MissingData("site url"));
    };

    if has_local {
        let mut local = LocalCollector::new();
        if let Some(dir) = &source.theme_dir {
            local = local.theme_dir(dir);
        }
        if let Some(root) = &source.wp_root {
            local = local.wordpress_root(root);
        }
        local.apply(&mut snapshot)?;
    }
    Ok(snapshot)
}

fn write_file(path: &Path, contents: &str) -> wp_site_analyzer::Result<()> {
    std::fs::write(path, contents).map_err(|e| Error::io(path, e))
}

fn print_banner() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    println!("WP Site Analyzer v{}", VERSION);
    println!();
}
