//! Inference latency benchmark: in-memory sweep and full word stream.
//!
//! Three measurements per model:
//!   sweep   : `Cnn1dKernel::infer`, no channels
//!   stream  : `InferenceExecutor::infer`, kernel on a worker thread,
//!             bounded channels both ways, framing checked host-side
//!   pipeline: one long-lived kernel thread serving back-to-back vectors
//!
//! Usage:
//!   cargo run --release --bin bench_latency
//!   cargo run --release --bin bench_latency -- --model gesture --iterations 5000

use anyhow::Result;
use cnn1d_driver::{frame_vector, InferenceExecutor};
use cnn1d_ip::StreamWord;
use cnn1d_models::{SampleGenerator, ZooModel};
use crossbeam_channel::bounded;
use std::thread;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const DEFAULT_ITERATIONS: usize = 1000;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let iterations = parse_arg(&args, "--iterations", DEFAULT_ITERATIONS).max(1);
    let models: Vec<ZooModel> = match find_arg(&args, "--model") {
        Some(name) => vec![name.parse()?],
        None => ZooModel::all().to_vec(),
    };

    println!("Inference latency benchmark");
    println!("===========================");
    println!("Iterations : {iterations}");
    println!();

    for zoo in models {
        let model = zoo.build()?;
        let dims = model.dims();
        let inputs = SampleGenerator::new(&dims, 7).take_vectors(64);
        println!("{zoo}  ({dims}, {} multiplies)", dims.multiplies_per_call());

        let kernel = model.kernel();
        for x in &inputs {
            kernel.infer(x)?;
        }
        let mut sweep = Vec::with_capacity(iterations);
        for i in 0..iterations {
            let t0 = Instant::now();
            kernel.infer(&inputs[i % inputs.len()])?;
            sweep.push(t0.elapsed().as_secs_f64() * 1e6);
        }
        report("sweep", &mut sweep);

        let executor = InferenceExecutor::new(model.kernel());
        let mut stream = Vec::with_capacity(iterations);
        for i in 0..iterations {
            let r = executor.infer(&inputs[i % inputs.len()])?;
            stream.push(r.latency_us());
        }
        report("stream", &mut stream);

        let per_vector = pipeline(&model.kernel(), &inputs, iterations)?;
        println!(
            "  {:<9} {:>9.2} µs/vector  ({:.0} vectors/s)",
            "pipeline",
            per_vector,
            1e6 / per_vector
        );
        println!();
    }

    Ok(())
}

/// Back-to-back vectors through one kernel thread.
fn pipeline(kernel: &cnn1d_driver::Cnn1dKernel, inputs: &[Vec<f32>], n: usize) -> Result<f64> {
    let dims = kernel.dims();
    let (in_tx, mut in_rx) = bounded::<StreamWord>(dims.d_in.max(1));
    let (mut out_tx, out_rx) = bounded::<StreamWord>(dims.classes.max(1));

    let t0 = Instant::now();
    thread::scope(|s| -> Result<()> {
        let worker = s.spawn(move || -> cnn1d_driver::Result<()> {
            for _ in 0..n {
                kernel.invoke(&mut in_rx, &mut out_tx)?;
            }
            Ok(())
        });
        let feeder = s.spawn(move || {
            for i in 0..n {
                for w in frame_vector(&inputs[i % inputs.len()]) {
                    if in_tx.send(w).is_err() {
                        return;
                    }
                }
            }
        });
        for _ in 0..n * dims.classes {
            out_rx.recv()?;
        }
        feeder.join().map_err(|_| anyhow::anyhow!("feeder panicked"))?;
        worker.join().map_err(|_| anyhow::anyhow!("kernel panicked"))??;
        Ok(())
    })?;
    Ok(t0.elapsed().as_secs_f64() * 1e6 / n as f64)
}

fn report(label: &str, samples_us: &mut [f64]) {
    samples_us.sort_by(f64::total_cmp);
    let n = samples_us.len();
    let mean = samples_us.iter().sum::<f64>() / n as f64;
    let pct = |p: f64| samples_us[((n as f64 * p) as usize).min(n - 1)];
    println!(
        "  {label:<9} mean {mean:>8.2} µs  p50 {:>8.2}  p95 {:>8.2}  p99 {:>8.2}  max {:>8.2}",
        pct(0.50),
        pct(0.95),
        pct(0.99),
        samples_us[n - 1]
    );
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg(args: &[String], flag: &str, default: usize) -> usize {
    find_arg(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
