//! CLI binary for substack2mdx.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `MigrationConfig`, runs a migration or a validation, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use substack2mdx::{
    migrate_manifest_file, validate_posts, MigrationConfig, MigrationProgressCallback,
    ProgressCallback, ValidationReport,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over documents, one log line per
/// document and per failed image.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} posts  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Migrating");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl MigrationProgressCallback for CliProgressCallback {
    fn on_migration_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_documents} posts to MDX…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, slug: &str, image_count: usize) {
        self.bar
            .set_message(format!("{slug} ({image_count} images)"));
    }

    fn on_image_error(&self, slug: &str, filename: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "    {} {:<40}  {}",
            red("✗"),
            format!("{slug}/{filename}"),
            red(&msg),
        ));
    }

    fn on_document_complete(&self, index: usize, total: usize, slug: &str) {
        self.bar.println(format!(
            "  {} Post {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(slug),
        ));
        self.bar.inc(1);
    }

    fn on_migration_complete(&self, total_documents: usize, failed_images: usize) {
        self.bar.finish_and_clear();

        if failed_images == 0 {
            eprintln!(
                "{} {} posts converted",
                green("✔"),
                bold(&total_documents.to_string())
            );
        } else {
            eprintln!(
                "{} {} posts converted  ({} images failed)",
                cyan("⚠"),
                bold(&total_documents.to_string()),
                red(&failed_images.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every post listed in posts.toml
  substack2mdx convert

  # Custom locations
  substack2mdx convert archive.toml --source-dir ~/Downloads/export/posts \
      --output-dir app/posts --images-dir public/images/posts

  # Regenerate text only, keep existing images
  substack2mdx convert --no-images

  # Check SEO metadata of every post
  substack2mdx validate app/posts

MANIFEST FORMAT (TOML):
  [[posts]]
  file = "137157899.waist.html"
  slug = "waist"
  title = "W.A.I.S.T."
  date = "2023-09-18"
  subtitle = ""

ENVIRONMENT VARIABLES:
  RUST_LOG                    Override log filter (e.g. substack2mdx=debug)
  SUBSTACK2MDX_SOURCE_DIR     Default for --source-dir
  SUBSTACK2MDX_OUTPUT_DIR     Default for --output-dir
  SUBSTACK2MDX_IMAGES_DIR     Default for --images-dir
"#;

/// Migrate a Substack export to MDX posts and validate post metadata.
#[derive(Parser, Debug)]
#[command(
    name = "substack2mdx",
    version,
    about = "Migrate a Substack export to MDX posts and validate post metadata",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SUBSTACK2MDX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SUBSTACK2MDX_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert the posts listed in a manifest to MDX and download their images.
    Convert(ConvertArgs),
    /// Check every post directory for required SEO metadata.
    Validate(ValidateArgs),
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// TOML manifest listing the posts to migrate.
    #[arg(default_value = "posts.toml")]
    manifest: PathBuf,

    /// Directory containing the exported HTML files.
    #[arg(long, env = "SUBSTACK2MDX_SOURCE_DIR", default_value = "export/posts")]
    source_dir: PathBuf,

    /// Directory receiving `{slug}/page.mdx`.
    #[arg(long, env = "SUBSTACK2MDX_OUTPUT_DIR", default_value = "app/posts")]
    output_dir: PathBuf,

    /// Directory receiving downloaded images.
    #[arg(long, env = "SUBSTACK2MDX_IMAGES_DIR", default_value = "public/images/posts")]
    images_dir: PathBuf,

    /// Public URL path the images directory is served under.
    #[arg(long, env = "SUBSTACK2MDX_IMAGE_URL_PREFIX", default_value = "/images/posts")]
    image_url_prefix: String,

    /// Do not download images; only (re)write the MDX files.
    #[arg(long)]
    no_images: bool,

    /// Images of one post downloaded at once.
    #[arg(long, env = "SUBSTACK2MDX_IMAGE_CONCURRENCY", default_value_t = 1)]
    image_concurrency: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SUBSTACK2MDX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Maximum redirects followed per image.
    #[arg(long, env = "SUBSTACK2MDX_MAX_REDIRECTS", default_value_t = 10)]
    max_redirects: u32,

    /// Print the run result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SUBSTACK2MDX_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::Args, Debug)]
struct ValidateArgs {
    /// Directory whose subdirectories each hold a `page.mdx`.
    #[arg(default_value = "app/posts")]
    posts_dir: PathBuf,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs during conversion.
    let show_progress = match &cli.command {
        Command::Convert(args) => !cli.quiet && !args.no_progress && !args.json,
        Command::Validate(_) => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Convert(ref args) => run_convert(args, cli.quiet, show_progress).await,
        Command::Validate(ref args) => run_validate(args, cli.quiet).await,
    }
}

async fn run_convert(args: &ConvertArgs, quiet: bool, show_progress: bool) -> Result<ExitCode> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn MigrationProgressCallback>)
    } else {
        None
    };

    let config = build_config(args, progress_cb)?;
    let output = migrate_manifest_file(&args.manifest, &config)
        .await
        .context("Migration failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !quiet {
        // The progress callback already printed each failure as it happened.
        if !show_progress {
            for (slug, outcome) in output.failed_images() {
                if let Some(ref e) = outcome.error {
                    eprintln!("  {} {}: {}", red("✗"), slug, e);
                }
            }
        }
        let stats = &output.stats;
        eprintln!(
            "{}  {} posts  {}/{} images  {}ms  →  {}",
            if stats.images_failed == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.documents,
            stats.images_fetched,
            stats.images_found,
            stats.total_duration_ms,
            bold(&config.output_dir.display().to_string()),
        );
        if stats.images_skipped > 0 {
            eprintln!("   {}", dim(&format!("{} image downloads skipped", stats.images_skipped)));
        }
    }

    // Image failures are reported, not fatal.
    Ok(ExitCode::SUCCESS)
}

async fn run_validate(args: &ValidateArgs, quiet: bool) -> Result<ExitCode> {
    let report = validate_posts(&args.posts_dir)
        .await
        .with_context(|| format!("Failed to validate {}", args.posts_dir.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        print_report(&report, quiet);
    }

    Ok(if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// `  OK    slug` per clean post, `  FAIL  slug: issue` per issue, then a summary.
fn print_report(report: &ValidationReport, quiet: bool) {
    for post in &report.posts {
        if post.is_ok() {
            if !quiet {
                println!("  {}    {}", green("OK"), post.slug);
            }
        } else {
            for issue in &post.issues {
                eprintln!("  {}  {}: {}", red("FAIL"), post.slug, issue);
            }
        }
    }
    if !quiet {
        println!(
            "\n{} posts checked, {} error(s)",
            report.posts.len(),
            report.error_count()
        );
    }
}

/// Map CLI args to `MigrationConfig`.
fn build_config(args: &ConvertArgs, progress: Option<ProgressCallback>) -> Result<MigrationConfig> {
    let mut builder = MigrationConfig::builder()
        .source_dir(&args.source_dir)
        .output_dir(&args.output_dir)
        .images_dir(&args.images_dir)
        .image_url_prefix(&args.image_url_prefix)
        .download_images(!args.no_images)
        .image_concurrency(args.image_concurrency)
        .download_timeout_secs(args.download_timeout)
        .max_redirects(args.max_redirects);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
