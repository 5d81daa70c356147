use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use histkit::color::ColorScheme;
use histkit::data::load_file;
use histkit::extract::{self, read_table, HistogramKind};
use histkit::plot::{self, LogScale, PlotConfig, DEFAULT_OUTPUT};
use histkit::source::{Axis, BinnedHistogram};
use histkit::{HistError, HistFileOpener};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(
    name = "histkit",
    version,
    about = "Extract histogram bins to text and overlay histograms across files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract one histogram from one file into `{histname}_{stem}.txt`
    Extract {
        /// Path to the input histogram file
        rootfile: PathBuf,
        /// Name of the histogram
        histname: String,
        /// Directory the table is written to
        #[arg(long, env = "HISTKIT_OUT_DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// Extract one histogram from every file matching a wildcard pattern
    ExtractBatch {
        /// Wildcard pattern, quoted so the shell does not expand it
        files_pattern: String,
        /// Name of the histogram
        histname: String,
        /// Directory the tables are written to
        #[arg(long, env = "HISTKIT_OUT_DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// Overlay one histogram from every file matching a pattern into one image
    Plot {
        /// Wildcard pattern, quoted so the shell does not expand it
        files_pattern: String,
        /// Name of the histogram to plot
        hist_name: String,
        /// Plot with x-axis in log scale
        #[arg(long)]
        xlog: bool,
        /// Plot with y-axis in log scale
        #[arg(long)]
        ylog: bool,
        /// Plot with both axes in log scale
        #[arg(long)]
        loglog: bool,
        /// Output image
        #[arg(short, long, env = "HISTKIT_PLOT_OUTPUT", default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
        /// How series colours are chosen
        #[arg(long, value_enum, default_value_t = ColorScheme::Root)]
        colors: ColorScheme,
    },

    /// List the histograms stored in a file
    List {
        file: PathBuf,
    },

    /// Print an extracted table
    Show {
        table: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract {
            rootfile,
            histname,
            out_dir,
        } => run_extract(&rootfile, &histname, &out_dir),
        Command::ExtractBatch {
            files_pattern,
            histname,
            out_dir,
        } => run_extract_batch(&files_pattern, &histname, &out_dir),
        Command::Plot {
            files_pattern,
            hist_name,
            xlog,
            ylog,
            loglog,
            output,
            width,
            height,
            colors,
        } => {
            let config = PlotConfig {
                output,
                width,
                height,
                scale: LogScale::from_flags(xlog, ylog, loglog),
                colors,
            };
            run_plot(&files_pattern, &hist_name, &config)
        }
        Command::List { file } => run_list(&file),
        Command::Show { table } => run_show(&table),
    }
}

/// Per-file problems are reported, not turned into a failing exit status.
fn run_extract(path: &Path, hist_name: &str, out_dir: &Path) -> Result<()> {
    match extract::extract_file(&HistFileOpener, path, hist_name, out_dir) {
        Ok(output) => println!("Data saved to {}", output.display()),
        Err(e) if e.is_per_file() => eprintln!("Error: {e}"),
        Err(e) => return Err(e).context("extraction failed"),
    }
    Ok(())
}

fn run_extract_batch(pattern: &str, hist_name: &str, out_dir: &Path) -> Result<()> {
    let report = match extract::extract_pattern(&HistFileOpener, pattern, hist_name, out_dir) {
        Ok(report) => report,
        Err(e @ HistError::NoMatchingFiles { .. }) => {
            println!("No files found matching pattern: {pattern}");
            log::debug!("{e}");
            return Ok(());
        }
        Err(e) => return Err(e).context("batch extraction failed"),
    };

    for output in &report.written {
        println!("Data saved to {}", output.display());
    }
    for failure in &report.failures {
        eprintln!("Error: {}", failure.error);
    }
    Ok(())
}

fn run_plot(pattern: &str, hist_name: &str, config: &PlotConfig) -> Result<()> {
    match plot::plot(&HistFileOpener, pattern, hist_name, config) {
        Ok(summary) => {
            for skipped in &summary.state.skipped {
                eprintln!("{}", skipped.error);
            }
            println!(
                "Plot with {} histograms saved to {}",
                summary.state.series.len(),
                summary.output.display()
            );
            Ok(())
        }
        Err(HistError::NoMatchingFiles { .. }) => {
            println!("No files found matching pattern: {pattern}");
            Ok(())
        }
        Err(e) => Err(e).context("plotting failed"),
    }
}

fn run_list(path: &Path) -> Result<()> {
    let file = load_file(path).with_context(|| format!("opening {}", path.display()))?;
    for hist in file.histograms() {
        let kind = match HistogramKind::of(hist) {
            HistogramKind::OneDimensional => "1D".to_string(),
            HistogramKind::TwoDimensional => "2D".to_string(),
            HistogramKind::Unsupported(n) => format!("{n}D"),
        };
        let bins: Vec<String> = (0..hist.dimensionality())
            .filter_map(Axis::from_position)
            .map(|axis| format!("{axis}:{}", hist.bin_count(axis)))
            .collect();
        println!("{}\t{kind}\t{}\t{}", hist.name(), bins.join(" "), hist.title());
    }
    Ok(())
}

fn run_show(path: &Path) -> Result<()> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let table = read_table(file).with_context(|| format!("parsing {}", path.display()))?;

    let header = table.header();
    println!("{}", header.iter().map(|h| format!("{h:>14}")).collect::<String>());
    for record in &table.records {
        let row: String = record.fields().iter().map(|v| format!("{v:>14.6}")).collect();
        println!("{row}");
    }
    println!("({} bins)", table.records.len());
    Ok(())
}
