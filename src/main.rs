use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use simgroup::{ScanOptions, SimilarityGroup, SimilarityScanner};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod history;
mod report;
mod review;

#[derive(Parser, Debug)]
#[command(
    name = "simgroup",
    version,
    about = "Find groups of visually similar images using perceptual hashing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find and list groups of similar images
    Scan {
        #[command(flatten)]
        scan: ScanArgs,
        /// Save results to a file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Format of the saved results
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Step through groups and move unwanted images to the trash
    Review {
        #[command(flatten)]
        scan: ScanArgs,
        /// Only show what would be moved to the trash
        #[arg(long)]
        dry_run: bool,
    },

    /// Work with review history
    History {
        #[command(subcommand)]
        command: HistoryCmd,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directory to scan
    #[arg(short, long, value_name = "DIR")]
    path: PathBuf,
    /// Similarity threshold (0-20 is typical, lower = stricter) [default: 5]
    #[arg(short, long)]
    threshold: Option<u32>,
    /// Number of images hashed in parallel [default: number of CPUs]
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,
    /// JSON file with scan options; flags given on the command line win
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum HistoryCmd {
    /// List all review history records
    List {
        /// Directory that was reviewed
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl ScanArgs {
    fn options(&self) -> Result<ScanOptions> {
        let mut options = match &self.config {
            Some(config) => load_options(config)?,
            None => ScanOptions::default(),
        };
        if let Some(threshold) = self.threshold {
            options.threshold = threshold;
        }
        if let Some(jobs) = self.jobs {
            options.max_parallelism = Some(jobs);
        }
        Ok(options)
    }
}

fn load_options(path: &Path) -> Result<ScanOptions> {
    let f = File::open(path).with_context(|| format!("Could not open config file {:?}", path))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("Invalid config file {:?}", path))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            scan,
            output,
            format,
        } => {
            let options = scan.options()?;
            println!("▶ Scanning folder: {}", scan.path.display());
            println!("  Threshold: {}", options.threshold);
            println!("{}", "-".repeat(80));

            let groups = find_groups(&scan.path, options.clone())?;
            if groups.is_empty() {
                println!("\nNo similar images found. Try increasing the threshold.");
                return Ok(());
            }

            println!("\nFound {} groups of similar images:\n", groups.len());
            let lines = report::group_lines(&groups);
            for line in &lines {
                println!("{}", line);
            }

            if let Some(output) = output {
                report::save_report(&output, format, &scan.path, &options, &groups, &lines)?;
                println!("Results saved to: {}", output.display());
            }
            println!("Total: {} groups found", groups.len());
        }

        Commands::Review { scan, dry_run } => {
            let options = scan.options()?;
            println!("▶ Reviewing similar images in: {}", scan.path.display());

            let groups = find_groups(&scan.path, options)?;
            if groups.is_empty() {
                println!("No similar images found. Try increasing the threshold.");
                return Ok(());
            }
            println!("Found {} groups of similar images", groups.len());
            review::review_groups(&scan.path, groups, dry_run)?;
        }

        Commands::History { command } => match command {
            HistoryCmd::List { path } => history::print_history(&path)?,
        },
    }

    Ok(())
}

/// Run a scan behind a spinner that shows the scanner's progress messages.
fn find_groups(path: &Path, options: ScanOptions) -> Result<Vec<SimilarityGroup>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template(
        "{spinner:.green} {msg} [{elapsed_precise}]",
    )?);
    spinner.set_message("Scanning images…");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let scanner = SimilarityScanner::new(options).with_progress_reporter(spinner.clone());
    let result = scanner
        .scan(path)
        .with_context(|| format!("Failed to scan {}", path.display()));

    match &result {
        Ok(_) => spinner.finish_with_message("Scan complete"),
        Err(_) => spinner.abandon_with_message("Scan failed"),
    }
    result
}
