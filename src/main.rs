#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use nizk_mobile_bench::config::{RunnerConfig, load_config};
use nizk_mobile_bench::native::{MockConfig, MockLibrary, NativeLibrary};
use nizk_mobile_bench::runner::{INITIAL_OUTPUT, stager_from_config};
use nizk_mobile_bench::{BenchError, BenchResult, BenchmarkKind, BenchmarkRunner, ResultSink, UiLoop};

#[derive(Parser, Debug)]
#[command(name = "nizk-mobile-bench")]
#[command(about = "Desktop harness for the mobile NIZK benchmark bridge", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set NIZK_BENCH_LOG)
    #[arg(long)]
    verbose: bool,

    /// Runner configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available benchmarks and their artifacts
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stage the artifacts of a benchmark and print their paths and SHA-256
    Stage {
        #[arg(long, value_enum)]
        benchmark: BenchmarkKind,
    },

    /// Run one or more benchmarks concurrently and print each result
    Run {
        #[arg(long = "benchmark", value_enum, required = true)]
        benchmarks: Vec<BenchmarkKind>,
        /// Use the mock native library instead of the linked prover
        #[arg(long)]
        mock: bool,
        /// Give up waiting for results after this many seconds (0 = wait forever)
        #[arg(long, default_value_t = 0)]
        timeout: u64,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("NIZK_BENCH_LOG").unwrap_or_else(|_| {
        if verbose { "nizk_mobile_bench=debug".to_string() } else { "nizk_mobile_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

struct ConsoleSink {
    done: AtomicUsize,
}

impl ResultSink for ConsoleSink {
    fn show_result(&self, kind: BenchmarkKind, text: &str) {
        println!("== {} ==\n{}", kind.title(), text.trim_end());
        self.done.fetch_add(1, Ordering::SeqCst);
    }

    fn show_notice(&self, text: &str) {
        eprintln!("{text}");
        self.done.fetch_add(1, Ordering::SeqCst);
    }
}

fn list(json: bool) -> BenchResult<()> {
    if json {
        let rows: Vec<_> = BenchmarkKind::ALL
            .iter()
            .map(|k| {
                serde_json::json!({
                    "benchmark": k,
                    "title": k.title(),
                    "circuit": k.artifacts().circuit.as_str(),
                    "witness": k.artifacts().witness.as_str(),
                })
            })
            .collect();
        let out = serde_json::to_string_pretty(&rows).map_err(anyhow::Error::from)?;
        println!("{out}");
    } else {
        for k in BenchmarkKind::ALL {
            let pair = k.artifacts();
            println!("{:<32} {} + {}", k.slug(), pair.circuit, pair.witness);
        }
    }
    Ok(())
}

fn stage(config: &RunnerConfig, kind: BenchmarkKind) -> BenchResult<()> {
    let stager = stager_from_config(config)?;
    let staged = stager.stage_pair(kind.artifacts())?;
    for path in [&staged.circuit, &staged.witness] {
        let bytes = std::fs::read(path).map_err(|e| BenchError::Message(format!("{}: {e}", path.display())))?;
        println!("{}  {}", nizk_mobile_bench::sha256_hex(&bytes), path.display());
    }
    Ok(())
}

fn native_library(config: &RunnerConfig, mock: bool) -> BenchResult<Arc<dyn NativeLibrary>> {
    if mock {
        return Ok(Arc::new(MockLibrary::new(
            MockConfig::new("mock").with_convention(config.convention),
        )));
    }
    #[cfg(any(feature = "linked", feature = "linked-direct"))]
    {
        let library = nizk_mobile_bench::native::linked::linked_library();
        if library.convention() != config.convention {
            tracing::warn!(
                configured = ?config.convention,
                linked = ?library.convention(),
                "configured convention ignored; using the linked library's"
            );
        }
        Ok(Arc::new(library))
    }
    #[cfg(not(any(feature = "linked", feature = "linked-direct")))]
    {
        Err(BenchError::Message(
            "built without a linked prover; pass --mock or rebuild with --features linked (or linked-direct)".into(),
        ))
    }
}

fn run(config: &RunnerConfig, benchmarks: Vec<BenchmarkKind>, mock: bool, timeout: u64) -> BenchResult<()> {
    let (ui_loop, ui) = UiLoop::new();
    let runner = BenchmarkRunner::from_config(config, native_library(config, mock)?, ui)?;
    let sink = Arc::new(ConsoleSink { done: AtomicUsize::new(0) });
    println!("{INITIAL_OUTPUT}");

    let expected = benchmarks.len();
    for kind in benchmarks {
        runner.run(kind, sink.clone());
    }
    let wait = if timeout == 0 { Duration::MAX } else { Duration::from_secs(timeout) };
    let finished = ui_loop.run_until(wait, || sink.done.load(Ordering::SeqCst) == expected);
    if !finished {
        return Err(BenchError::Message(format!("timed out after {timeout}s waiting for results")));
    }
    Ok(())
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = (|| -> BenchResult<()> {
        let config = match &cli.config {
            Some(path) => load_config(path)?,
            None => RunnerConfig::default(),
        };
        match cli.command {
            Commands::List { json } => list(json),
            Commands::Stage { benchmark } => stage(&config, benchmark),
            Commands::Run { benchmarks, mock, timeout } => run(&config, benchmarks, mock, timeout),
        }
    })();

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
