//! Metawalk CLI
//!
//! - `walk`: load a JSON-lines graph, sample self-avoiding walks, write id
//!   tables and the metapath artifact (checkpointed, resumable)
//! - `post-process`: expand, remap and collapse the artifact into labelled
//!   records
//! - `tabulate`: summarize processed records as TSV
//! - `filter-nodes`: drop nodes no edge refers to

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use metawalk_canon::{
    canonicalize_dir, read_records, write_records, write_report_file, Abbreviations,
    RemapConfig, PROCESSED_METAPATHS, TABULATED_METAPATHS,
};
use metawalk_graph::artifact::Checkpointer;
use metawalk_graph::filter::filter_nodes;
use metawalk_graph::tables::{verify_id_tables, write_id_tables};
use metawalk_graph::{
    load_graph, run_sampling, ClosureTypeHierarchy, FlatTypeHierarchy, JobConfig,
    LoaderConfig, MetapathTable, SamplerConfig, StopToken, TypeHierarchy,
};

#[derive(Parser)]
#[command(name = "metawalk")]
#[command(
    author,
    version,
    about = "Metawalk: Monte-Carlo metapath statistics for knowledge graphs"
)]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample walks and count metapaths.
    Walk {
        /// Node file (one JSON record per line)
        nodes: PathBuf,
        /// Edge file (one JSON record per line)
        edges: PathBuf,
        /// Output directory for id tables and artifacts
        out_dir: PathBuf,
        /// Number of walks to count (resumed walks included)
        num_walks: u64,
        /// Hops per walk
        walk_length: usize,
        /// Type closure JSON (`{type: [descendants]}`); all labels are kept without it
        #[arg(long)]
        hierarchy: Option<PathBuf>,
        #[arg(long, default_value_t = 100_000_000)]
        checkpoint_every: u64,
        /// Fixed RNG seed (a fresh one is drawn and logged otherwise)
        #[arg(long)]
        seed: Option<u64>,
        /// Worker threads (0 = one per core)
        #[arg(long, default_value_t = 0)]
        threads: usize,
        #[arg(long, default_value_t = 1)]
        attempts_per_start: u32,
        #[arg(long, default_value_t = 10_000_000)]
        max_attempts: u64,
        /// Log loader progress every N records
        #[arg(long, default_value_t = 10_000_000)]
        progress_every: u64,
        /// Continue from the counts already in the output directory
        #[arg(long)]
        resume: bool,
    },

    /// Expand, remap and collapse the final artifact of a walk run.
    PostProcess {
        /// Directory written by `walk`
        dir: PathBuf,
        /// Remap configuration JSON (built-in Biolink tables otherwise)
        #[arg(long)]
        remap: Option<PathBuf>,
        /// Output file (default: <dir>/processed_metapaths.json)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Tabulate processed metapaths.
    Tabulate {
        /// Directory holding processed_metapaths.json
        dir: PathBuf,
        /// Abbreviation table JSON (`{"label,label": "ABBR"}`)
        #[arg(long)]
        abbreviations: Option<PathBuf>,
        /// Output file (default: <dir>/tabulated_metapaths.tsv)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Keep only nodes referenced by at least one edge.
    FilterNodes {
        edges: PathBuf,
        nodes_in: PathBuf,
        nodes_out: PathBuf,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => tracing::Level::WARN,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Walk {
            nodes,
            edges,
            out_dir,
            num_walks,
            walk_length,
            hierarchy,
            checkpoint_every,
            seed,
            threads,
            attempts_per_start,
            max_attempts,
            progress_every,
            resume,
        } => {
            let config = JobConfig {
                num_walks,
                checkpoint_every,
                seed,
                threads,
                sampler: SamplerConfig {
                    length: walk_length,
                    attempts_per_start,
                    max_attempts,
                },
            };
            cmd_walk(
                &nodes,
                &edges,
                &out_dir,
                hierarchy.as_deref(),
                &config,
                LoaderConfig { progress_every },
                resume,
            )
        }
        Commands::PostProcess { dir, remap, out } => {
            cmd_post_process(&dir, remap.as_deref(), out.as_deref())
        }
        Commands::Tabulate {
            dir,
            abbreviations,
            out,
        } => cmd_tabulate(&dir, abbreviations.as_deref(), out.as_deref()),
        Commands::FilterNodes {
            edges,
            nodes_in,
            nodes_out,
        } => cmd_filter_nodes(&edges, &nodes_in, &nodes_out),
    }
}

fn open(path: &Path) -> Result<BufReader<fs::File>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn install_stop_handler() -> Result<StopToken> {
    let stop = StopToken::new();
    #[cfg(unix)]
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, stop.flag())
            .map_err(|e| anyhow!("failed to register signal {signal}: {e}"))?;
    }
    Ok(stop)
}

fn cmd_walk(
    nodes: &Path,
    edges: &Path,
    out_dir: &Path,
    hierarchy: Option<&Path>,
    config: &JobConfig,
    loader: LoaderConfig,
    resume: bool,
) -> Result<()> {
    println!(
        "{} {} + {}",
        "Loading".green().bold(),
        nodes.display(),
        edges.display()
    );

    let closure;
    let types: &dyn TypeHierarchy = match hierarchy {
        Some(path) => {
            closure = ClosureTypeHierarchy::from_json_reader(open(path)?)?;
            println!("  {} {} types in closure", "→".cyan(), closure.len());
            &closure
        }
        None => &FlatTypeHierarchy,
    };

    let (graph, report) = load_graph(open(nodes)?, open(edges)?, types, loader)?;
    println!(
        "  {} {} nodes, {} edges, {} edge types, {} categories",
        "→".cyan(),
        report.nodes,
        report.edges,
        graph.registry().len(),
        graph.categories().len()
    );
    if report.rejected_edge_count() + report.rejected_node_count() > 0 {
        println!(
            "  {} rejected {} nodes, {} edges {:?}",
            "!".yellow(),
            report.rejected_node_count(),
            report.rejected_edge_count(),
            report.rejected_edges
        );
    }

    let mut checkpointer = Checkpointer::new(out_dir);
    let resumed = if resume { checkpointer.resume()? } else { None };
    if resumed.is_some() {
        // The checkpoint's ids must mean the same labels before the tables are rewritten.
        verify_id_tables(out_dir, &graph)?;
    }

    write_id_tables(out_dir, &graph)?;
    println!("  {} id tables in {}", "→".cyan(), out_dir.display());

    let mut table = match resumed {
        Some(table) => {
            println!(
                "  {} resuming from {} walks",
                "→".yellow(),
                table.absorbed()
            );
            table
        }
        None => MetapathTable::new(),
    };

    println!(
        "{} {} walks of length {}",
        "Sampling".green().bold(),
        config.num_walks,
        config.sampler.length
    );
    let stop = install_stop_handler()?;
    let outcome = run_sampling(&graph, config, &mut table, &mut checkpointer, &stop)?;

    println!(
        "  {} {} walks ({} this run), {} metapaths, seed {}, {:.1}s",
        "→".cyan(),
        outcome.absorbed,
        outcome.sampled,
        table.len(),
        outcome.seed,
        outcome.elapsed.as_secs_f64()
    );
    if checkpointer.failures() > 0 {
        println!(
            "  {} {} checkpoint writes failed",
            "!".yellow(),
            checkpointer.failures()
        );
    }
    if outcome.stopped {
        println!(
            "  {} stopped; resume with --resume from {}",
            "!".yellow(),
            checkpointer.working_path().display()
        );
    } else {
        println!("  {} {}", "→".cyan(), checkpointer.final_path().display());
    }
    Ok(())
}

fn cmd_post_process(dir: &Path, remap: Option<&Path>, out: Option<&Path>) -> Result<()> {
    println!("{} {}", "Post-processing".green().bold(), dir.display());
    let remap = match remap {
        Some(path) => RemapConfig::from_json_reader(open(path)?)?,
        None => RemapConfig::default(),
    };
    let records = canonicalize_dir(dir, &remap)?;
    let out = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(PROCESSED_METAPATHS));
    write_records(&out, &records)?;
    println!(
        "  {} {} ({} metapaths)",
        "→".cyan(),
        out.display(),
        records.len()
    );
    Ok(())
}

fn cmd_tabulate(dir: &Path, abbreviations: Option<&Path>, out: Option<&Path>) -> Result<()> {
    // Validate the abbreviation table before touching any output.
    let abbreviations = match abbreviations {
        Some(path) => Abbreviations::from_json_reader(open(path)?)?,
        None => Abbreviations::default(),
    };
    println!("{} {}", "Tabulating".green().bold(), dir.display());
    let records = read_records(&dir.join(PROCESSED_METAPATHS))?;
    let out = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(TABULATED_METAPATHS));
    let rows = write_report_file(&out, &records, &abbreviations)?;
    println!("  {} {} ({} rows)", "→".cyan(), out.display(), rows);
    Ok(())
}

fn cmd_filter_nodes(edges: &Path, nodes_in: &Path, nodes_out: &Path) -> Result<()> {
    println!("{} {}", "Filtering".green().bold(), nodes_in.display());
    let out = BufWriter::new(
        fs::File::create(nodes_out).with_context(|| format!("create {}", nodes_out.display()))?,
    );
    let report = filter_nodes(open(edges)?, open(nodes_in)?, out)?;
    println!(
        "  {} {} kept, {} dropped, {} malformed lines",
        "→".cyan(),
        report.kept,
        report.dropped,
        report.malformed
    );
    println!("  {} {}", "→".cyan(), nodes_out.display());
    Ok(())
}
