//! `cnn1d`: command-line interface for the fused Conv1D + Dense kernel.
//!
//! ```text
//! USAGE:
//!   cnn1d info <model>                         Dimensions, parameters, cycle estimate
//!   cnn1d run <model> --values 1,2,3,4         One inference over the word stream
//!   cnn1d run <model> --input vec.txt --words  Same, input from file, dump output words
//!   cnn1d verify <model> [--samples N]         Fused kernel against the f64 reference
//!   cnn1d zoo                                  List built-in models
//!   cnn1d export <name> <path>                 Write a zoo model as a .c1dn blob
//! ```
//!
//! `<model>` is either a `.c1dn` file or a zoo model name.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cnn1d_driver::{
    schedule_for, Cnn1dKernel, FusedBackend, InferenceExecutor, Lanes, Sequential, WorkerPool,
};
use cnn1d_ip::{ResourceBudget, StreamWord};
use cnn1d_models::{
    compare_backends, Model, ReferenceModel, SampleGenerator, ZooModel, DEFAULT_ABS_TOLERANCE,
    DEFAULT_REL_TOLERANCE,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cnn1d", about = "Fused Conv1D + Dense streaming inference", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print dimensions, parameter count and latency estimate for a model.
    Info {
        /// Model file (.c1dn) or zoo model name.
        model: String,
        /// Multiplier limit for the cycle estimate.
        #[arg(long, default_value_t = cnn1d_ip::resources::DEFAULT_MUL_LIMIT)]
        mul_limit: usize,
    },
    /// Run one input vector through the kernel.
    Run {
        /// Model file (.c1dn) or zoo model name.
        model: String,
        /// Comma-separated input values.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, conflicts_with = "input")]
        values: Option<Vec<f32>>,
        /// File with whitespace or comma separated input values.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Worker threads, each owning a band of classes.
        #[arg(long, default_value_t = 1)]
        workers: usize,
        /// Multiplier lanes per worker.
        #[arg(long, default_value_t = 1)]
        lanes: usize,
        /// Also print raw output words with their end-of-message flags.
        #[arg(long)]
        words: bool,
    },
    /// Compare the fused kernel against the unfused f64 reference.
    Verify {
        /// Model file (.c1dn) or zoo model name.
        model: String,
        /// Number of synthetic input vectors.
        #[arg(long, default_value_t = 64)]
        samples: usize,
        /// Seed for the synthetic inputs.
        #[arg(long, default_value_t = 0x00C0_FFEE)]
        seed: u64,
    },
    /// List built-in zoo models.
    Zoo,
    /// Write a zoo model to a .c1dn file.
    Export {
        /// Zoo model name.
        name: String,
        /// Output path.
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Info { model, mul_limit } => cmd_info(&model, mul_limit)?,
        Cmd::Run {
            model,
            values,
            input,
            workers,
            lanes,
            words,
        } => cmd_run(&model, values, input.as_deref(), workers, lanes, words)?,
        Cmd::Verify {
            model,
            samples,
            seed,
        } => cmd_verify(&model, samples, seed)?,
        Cmd::Zoo => cmd_zoo(),
        Cmd::Export { name, path } => cmd_export(&name, &path)?,
    }

    Ok(())
}

/// File path first, then zoo name.
fn load_model(name_or_path: &str) -> Result<Model> {
    let path = Path::new(name_or_path);
    if path.exists() {
        return Model::from_file(path).with_context(|| format!("loading {}", path.display()));
    }
    let zoo: ZooModel = name_or_path
        .parse()
        .with_context(|| format!("{name_or_path} is neither a file nor a zoo model"))?;
    Ok(zoo.build()?)
}

fn build_kernel(model: &Model, workers: usize, lanes: usize) -> Result<Cnn1dKernel> {
    if workers == 0 || lanes == 0 {
        bail!("--workers and --lanes must be at least 1");
    }
    let kernel = model.kernel();
    Ok(match (workers, lanes) {
        (1, 1) => kernel.with_schedule(Sequential),
        (1, l) => kernel.with_schedule(Lanes::new(l)),
        (w, l) => kernel.with_schedule(WorkerPool::new(w, l)?),
    })
}

fn parse_values(text: &str) -> Result<Vec<f32>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f32>()
                .with_context(|| format!("not a number: {s:?}"))
        })
        .collect()
}

/// One line per received word, flag as observed on the stream.
fn word_lines(words: &[StreamWord]) -> Vec<String> {
    words
        .iter()
        .enumerate()
        .map(|(c, w)| format!("word {c:>3}: 0x{:08x} last={}", w.data, w.last))
        .collect()
}

fn cmd_info(name_or_path: &str, mul_limit: usize) -> Result<()> {
    let model = load_model(name_or_path)?;
    let dims = model.dims();
    let budget = ResourceBudget::with_mul_limit(mul_limit);
    let cycles = budget.cycle_estimate(&dims);
    let schedule = schedule_for(budget, &dims)?;

    println!("Dimensions   : {dims}");
    println!("Parameters   : {}", model.parameter_count());
    println!("Blob size    : {} bytes", model.blob_size());
    println!("Multiplies   : {} per call", dims.multiplies_per_call());
    println!("Input words  : {}", dims.input_words());
    println!("Output words : {}", dims.output_words());
    println!("Mul limit    : {mul_limit}");
    println!("Schedule     : {}", schedule.describe());
    println!(
        "Cycles       : {} (read {} + init {} + sweep {} + write {})",
        cycles.total(),
        cycles.read,
        cycles.init,
        cycles.sweep,
        cycles.write
    );

    Ok(())
}

fn cmd_run(
    name_or_path: &str,
    values: Option<Vec<f32>>,
    input: Option<&Path>,
    workers: usize,
    lanes: usize,
    words: bool,
) -> Result<()> {
    let model = load_model(name_or_path)?;
    let x = match (values, input) {
        (Some(v), _) => v,
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_values(&text)?
        }
        (None, None) => bail!("one of --values or --input is required"),
    };

    let kernel = build_kernel(&model, workers, lanes)?;
    tracing::info!("schedule: {}", kernel.schedule().describe());
    let executor = InferenceExecutor::new(kernel);
    let result = executor.infer(&x)?;

    for (c, v) in result.logits.iter().enumerate() {
        println!("class {c:>3}: {v}");
    }
    if words {
        for line in word_lines(&result.words) {
            println!("{line}");
        }
    }
    println!("latency    : {:.1} µs", result.latency_us());

    Ok(())
}

fn cmd_verify(name_or_path: &str, samples: usize, seed: u64) -> Result<()> {
    let model = load_model(name_or_path)?;
    let dims = model.dims();
    let inputs = SampleGenerator::new(&dims, seed).take_vectors(samples);
    let reference = ReferenceModel::new(model.tables().clone());

    let fused = FusedBackend::new(model.kernel());
    let report = compare_backends(&fused, &reference, &inputs)?;
    println!(
        "parity       : {} logits, max_abs={:.3e} max_rel={:.3e}",
        report.compared, report.max_abs, report.max_rel
    );

    // Every budget must reproduce the sequential bits exactly.
    let baseline: Vec<Vec<u32>> = inputs
        .iter()
        .map(|x| Ok(model.kernel().infer(x)?.to_bits()))
        .collect::<Result<_>>()?;
    for limit in [2, 8, cnn1d_ip::resources::DEFAULT_MUL_LIMIT] {
        let kernel = model.kernel_with_budget(ResourceBudget::with_mul_limit(limit))?;
        for (x, want) in inputs.iter().zip(&baseline) {
            if &kernel.infer(x)?.to_bits() != want {
                bail!("{} diverged from sequential", kernel.schedule().describe());
            }
        }
        println!("schedule     : {} identical", kernel.schedule().describe());
    }

    if !report.within(DEFAULT_REL_TOLERANCE, DEFAULT_ABS_TOLERANCE) {
        bail!(
            "fused kernel deviates from reference beyond rel={DEFAULT_REL_TOLERANCE:e} abs={DEFAULT_ABS_TOLERANCE:e}"
        );
    }
    println!("OK");
    Ok(())
}

fn cmd_zoo() {
    println!("{:<15} {:<22} {:>10}  Description", "Name", "Dimensions", "Multiplies");
    for m in ZooModel::all() {
        println!(
            "{:<15} {:<22} {:>10}  {}",
            m.name(),
            format!("{}x{}x{}", m.dims().d_in, m.dims().conv_out, m.dims().classes),
            m.dims().multiplies_per_call(),
            m.description()
        );
    }
}

fn cmd_export(name: &str, path: &Path) -> Result<()> {
    let zoo: ZooModel = name.parse()?;
    zoo.build()?.write_file(path)?;
    println!("Wrote {} to {}", zoo, path.display());
    Ok(())
}
