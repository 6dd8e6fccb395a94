//! priocomp CLI - rank and compare spatial conservation prioritizations

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use priocomp_algorithms::compare::{cross_compare, write_comparison_tables, ComparisonParams, ThresholdPair};
use priocomp_algorithms::coverage::{expand_value_coverage, FillPolicy};
use priocomp_algorithms::ilp::{cost_raster, parse_budgets, selections_to_rank};
use priocomp_algorithms::normalize::NormalizeMethod;
use priocomp_algorithms::parallel::ProcessingMode;
use priocomp_algorithms::rank::TieBreak;
use priocomp_algorithms::regions::{aggregate_regions, RegionSummary, DEFAULT_ID_COLUMN};
use priocomp_algorithms::result::{classify_all, MethodResult};
use priocomp_algorithms::rwr::{load_stack, read_manifest, rwr_feature_sets, RwrParams};
use priocomp_algorithms::statistics::{read_zone_names, zonal_means, zone_raster};
use priocomp_core::io::{read_geotiff, write_geotiff};
use priocomp_core::{classify, FeatureSet, Raster, ResultCache};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "priocomp")]
#[command(author, version, about = "Rank and compare spatial conservation prioritizations", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Rescale a raster's valid cells
    Normalize {
        /// Input raster file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Method: minmax, occurrence, zscore, iqr
        #[arg(short, long, default_value = "minmax")]
        method: String,
    },
    /// Rarity-weighted richness ranking of a feature stack
    Rwr {
        /// Feature manifest CSV (path,category,weight)
        #[arg(short, long)]
        manifest: PathBuf,
        /// Feature sets, comma-separated: ALL, ALL_WEIGHTED, ES, BD
        #[arg(short, long, default_value = "ALL")]
        feature_set: String,
        /// Output rank raster; a directory of rwr_<set>.tif files when
        /// several feature sets are given
        output: PathBuf,
        /// Tie-break among equal scores: random, average
        #[arg(short, long, default_value = "random")]
        tie_break: String,
        /// Seed for random tie-breaking
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Also write the raw RWR score raster here (single feature set only)
        #[arg(long)]
        score: Option<PathBuf>,
        /// Worker threads across feature sets (default: all cores)
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Expand a rank raster onto a template footprint
    Expand {
        /// Rank raster to expand
        target: PathBuf,
        /// Raster whose valid cells define the output footprint
        template: PathBuf,
        /// Output file
        output: PathBuf,
        /// Fill for new cells: lowest, or a rank in [0, 1]
        #[arg(short, long, default_value = "lowest")]
        fill: String,
    },
    /// Constant 1.0 cost layer for the ILP solver
    Cost {
        /// Raster whose valid cells define the footprint
        template: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// Stack ILP selection rasters into a rank raster
    IlpRank {
        /// Budget fractions, one per selection raster, increasing
        #[arg(short, long)]
        budgets: String,
        /// Selection rasters (non-zero = selected), in budget order
        #[arg(required = true)]
        selections: Vec<PathBuf>,
        /// Output rank raster
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Compare all pairs of rank rasters
    Compare {
        /// Rank rasters, classified by file name
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for the comparison tables
        #[arg(short, long)]
        out_dir: PathBuf,
        /// Jaccard quantile pairs as lo:hi, comma-separated
        #[arg(long, default_value = "0.0:0.1,0.9:1.0")]
        thresholds: String,
        /// Worker threads (default: all cores)
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Mean rank per region of a zone raster
    Zonal {
        /// Rank raster, classified by file name
        rank: PathBuf,
        /// Region raster (integer ids, 0 = outside)
        regions: PathBuf,
        /// Output CSV
        output: PathBuf,
        /// CSV mapping zone ids to region names (columns zone,<id column>)
        #[arg(long)]
        names: Option<PathBuf>,
        /// Region id column name
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id_column: String,
    },
    /// Join per-region mean ranks across method results
    Regions {
        /// Region summary CSVs, classified by file name
        #[arg(required = true)]
        summaries: Vec<PathBuf>,
        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,
        /// Region id column name
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id_column: String,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {} ({})", raster.cols(), raster.rows(), path.display());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path).with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn create_file(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_feature_sets(s: &str) -> Result<Vec<FeatureSet>> {
    let mut sets: Vec<FeatureSet> = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let set: FeatureSet = part.parse()?;
        if !sets.contains(&set) {
            sets.push(set);
        }
    }
    if sets.is_empty() {
        bail!("No feature set given");
    }
    Ok(sets)
}

fn parse_tie_break(s: &str, seed: u64) -> Result<TieBreak> {
    match s.to_lowercase().as_str() {
        "random" | "rand" => Ok(TieBreak::Random { seed }),
        "average" | "avg" | "mean" => Ok(TieBreak::Average),
        _ => bail!("Unknown tie-break: {}. Use random or average.", s),
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            match raster.crs() {
                Some(crs) => println!("CRS: {}", crs),
                None => println!("CRS: none"),
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            if let Ok(key) = classify(&input) {
                println!("Method result: {}", key);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
            println!("  NoData cells: {}", stats.nodata_count);
        }

        // ── Normalize ────────────────────────────────────────────────
        Commands::Normalize {
            input,
            output,
            method,
        } => {
            let method: NormalizeMethod = method.parse()?;
            let raster = read_raster(&input)?;
            let start = Instant::now();
            let fitted = method
                .fit(&raster)
                .with_context(|| format!("Failed to fit {:?} normalization", method))?;
            info!("Fitted {:?}", fitted);
            let result = fitted.apply(&raster);
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Normalized raster", &output, elapsed);
        }

        // ── RWR ──────────────────────────────────────────────────────
        Commands::Rwr {
            manifest,
            feature_set,
            output,
            tie_break,
            seed,
            score,
            threads,
        } => {
            let sets = parse_feature_sets(&feature_set)?;
            if sets.len() > 1 && score.is_some() {
                bail!("--score needs a single feature set");
            }
            let params = RwrParams {
                tie_break: parse_tie_break(&tie_break, seed)?,
            };

            let pb = spinner("Reading features...");
            let entries = read_manifest(&manifest)
                .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
            let stack = load_stack(&entries).context("Failed to load feature stack")?;
            pb.finish_and_clear();
            info!("Loaded {} features", stack.len());

            let start = Instant::now();
            let cache = ResultCache::new(stack.len().max(1));
            let runs = rwr_feature_sets(
                &stack,
                &sets,
                &params,
                ProcessingMode::from_threads(threads),
                &cache,
            )?;
            let elapsed = start.elapsed();

            if sets.len() > 1 {
                std::fs::create_dir_all(&output)
                    .with_context(|| format!("Failed to create {}", output.display()))?;
            }
            let mut failed = 0;
            for (set, outcome) in runs {
                let result = match outcome {
                    Ok(result) => result,
                    Err(e) => {
                        warn!("{}", e);
                        failed += 1;
                        continue;
                    }
                };
                let path = if sets.len() > 1 {
                    output.join(format!("rwr_{}.tif", set.label().to_lowercase()))
                } else {
                    output.clone()
                };
                if let Some(score_path) = &score {
                    write_result(&result.score, score_path)?;
                }
                write_result(&result.rank, &path)?;
                done(&format!("RWR {} rank", set), &path, elapsed);
            }
            if failed > 0 {
                bail!("RWR failed for {} of {} feature set(s)", failed, sets.len());
            }
        }

        // ── Coverage ─────────────────────────────────────────────────
        Commands::Expand {
            target,
            template,
            output,
            fill,
        } => {
            let policy: FillPolicy = fill.parse()?;
            let target_raster = read_raster(&target)?;
            let template_raster = read_raster(&template)?;
            let start = Instant::now();
            let result = expand_value_coverage(&target_raster, &template_raster, policy)
                .with_context(|| {
                    format!(
                        "Failed to expand {} onto {}",
                        target.display(),
                        template.display()
                    )
                })?;
            let elapsed = start.elapsed();
            info!(
                "Footprint: {} -> {} cells",
                target_raster.valid_count(),
                result.valid_count()
            );
            write_result(&result, &output)?;
            done("Expanded rank", &output, elapsed);
        }

        // ── ILP glue ─────────────────────────────────────────────────
        Commands::Cost { template, output } => {
            let template_raster = read_raster(&template)?;
            let start = Instant::now();
            let result = cost_raster(&template_raster);
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Cost raster", &output, elapsed);
        }

        Commands::IlpRank {
            budgets,
            selections,
            output,
        } => {
            let budgets = parse_budgets(&budgets)?;
            if budgets.len() != selections.len() {
                bail!(
                    "{} budgets given for {} selection rasters",
                    budgets.len(),
                    selections.len()
                );
            }
            let mut stacked = Vec::with_capacity(selections.len());
            for (budget, path) in budgets.into_iter().zip(&selections) {
                stacked.push((budget, read_raster(path)?));
            }
            let start = Instant::now();
            let result = selections_to_rank(&stacked).context("Failed to stack selections")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("ILP rank", &output, elapsed);
        }

        // ── Compare ──────────────────────────────────────────────────
        Commands::Compare {
            inputs,
            out_dir,
            thresholds,
            threads,
        } => {
            // Every name must classify before any raster is read
            let keys = classify_all(&inputs)?;
            for (key, path) in &keys {
                info!("{} <- {}", key, path.display());
            }

            let params = ComparisonParams {
                thresholds: ThresholdPair::parse_list(&thresholds)?,
                mode: ProcessingMode::from_threads(threads),
            };

            let pb = spinner("Reading rank rasters...");
            let results = inputs
                .iter()
                .map(|p| MethodResult::load(p).with_context(|| format!("Failed to load {}", p.display())))
                .collect::<Result<Vec<_>>>()?;
            pb.finish_and_clear();

            let start = Instant::now();
            let report = cross_compare(&results, &params)?;
            let elapsed = start.elapsed();

            let written = write_comparison_tables(&report, &out_dir)
                .with_context(|| format!("Failed to write tables to {}", out_dir.display()))?;
            for path in &written {
                println!("Table saved to: {}", path.display());
            }
            println!(
                "  {} pairs compared in {:.2?}",
                report.records.len(),
                elapsed
            );

            if !report.is_complete() {
                for failure in &report.failures {
                    warn!("{}", failure);
                }
                bail!(
                    "{} of {} pairs failed",
                    report.failures.len(),
                    report.failures.len() + report.records.len()
                );
            }
        }

        // ── Regions ──────────────────────────────────────────────────
        Commands::Zonal {
            rank,
            regions,
            output,
            names,
            id_column,
        } => {
            let key = classify(&rank)?;
            let rank_raster = read_raster(&rank)?;
            let zones = zone_raster(&read_raster(&regions)?)
                .with_context(|| format!("Invalid region raster {}", regions.display()))?;
            let lookup: Option<HashMap<i32, String>> = match &names {
                Some(path) => {
                    let file = File::open(path)
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    Some(read_zone_names(file, &id_column)?)
                }
                None => None,
            };

            let start = Instant::now();
            let summary = zonal_means(&rank_raster, &zones, key, &id_column, lookup.as_ref())
                .with_context(|| format!("Failed to compute zonal means of {}", rank.display()))?;
            let elapsed = start.elapsed();
            info!("{}: {} regions", key, summary.len());

            summary.write_csv(create_file(&output)?)?;
            done("Region summary", &output, elapsed);
        }

        Commands::Regions {
            summaries,
            output,
            id_column,
        } => {
            classify_all(&summaries)?;
            let start = Instant::now();
            let loaded = summaries
                .iter()
                .map(|p| {
                    RegionSummary::from_path(p, &id_column)
                        .with_context(|| format!("Failed to read {}", p.display()))
                })
                .collect::<Result<Vec<_>>>()?;
            let table = aggregate_regions(&loaded)?;
            let elapsed = start.elapsed();
            info!(
                "{} regions across {} method results",
                table.rows().len(),
                table.keys().len()
            );

            table.write_csv(create_file(&output)?)?;
            done("Region table", &output, elapsed);
        }
    }

    Ok(())
}
