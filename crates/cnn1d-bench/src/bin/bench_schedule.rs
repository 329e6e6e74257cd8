// SPDX-License-Identifier: AGPL-3.0-only
//! Multiplier budget sweep.
//!
//! For each multiplier limit, size a schedule with `schedule_for`, report
//! the cycle model's latency next to measured wall time, and check that
//! the logits are bit-identical to the sequential schedule.
//!
//! Usage:
//!   cargo run --release --bin bench_schedule
//!   cargo run --release --bin bench_schedule -- --model gesture-small --iterations 500

use anyhow::{bail, Result};
use cnn1d_ip::ResourceBudget;
use cnn1d_models::{SampleGenerator, ZooModel};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const LIMITS: [usize; 8] = [1, 2, 4, 8, 16, 32, 64, 180];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let iterations: usize = args
        .windows(2)
        .find(|w| w[0] == "--iterations")
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(200)
        .max(1);
    let zoo: ZooModel = args
        .windows(2)
        .find(|w| w[0] == "--model")
        .map_or(Ok(ZooModel::Gesture), |w| w[1].parse())?;

    let model = zoo.build()?;
    let dims = model.dims();
    let inputs = SampleGenerator::new(&dims, 11).take_vectors(32);
    let baseline: Vec<Vec<u32>> = inputs
        .iter()
        .map(|x| model.kernel().infer(x).map(|l| l.to_bits()))
        .collect::<Result<_, _>>()?;

    println!("Schedule sweep: {zoo} ({dims})");
    println!("================================");
    println!(
        "  {:>6}  {:<28}  {:>8}  {:>10}  {:>12}  {:>9}",
        "limit", "schedule", "budget", "cycles", "µs/vector", "identical"
    );

    for limit in LIMITS {
        let budget = ResourceBudget::with_mul_limit(limit);
        let kernel = model.kernel_with_budget(budget)?;
        let schedule = kernel.schedule();
        if schedule.mul_budget() > limit {
            bail!("{} exceeds limit {limit}", schedule.describe());
        }

        let identical = inputs
            .iter()
            .zip(&baseline)
            .all(|(x, want)| kernel.infer(x).is_ok_and(|l| &l.to_bits() == want));

        let t0 = Instant::now();
        for i in 0..iterations {
            kernel.infer(&inputs[i % inputs.len()])?;
        }
        let us = t0.elapsed().as_secs_f64() * 1e6 / iterations as f64;

        println!(
            "  {:>6}  {:<28}  {:>8}  {:>10}  {:>12.2}  {:>9}",
            limit,
            schedule.describe(),
            schedule.mul_budget(),
            budget.cycle_estimate(&dims).total(),
            us,
            if identical { "yes" } else { "NO" }
        );
        if !identical {
            bail!("schedule {} changed the logits", schedule.describe());
        }
    }

    Ok(())
}
