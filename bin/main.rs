use std::path::PathBuf;

use clap::Parser;
use vmpack_sim::driver::{Config, Simulation};

#[derive(Debug, clap::Parser)]
#[command(long_about = None)]
struct Args {
    /// Number of VMs to generate when `--input` is not given.
    #[arg(long, default_value_t = 1000)]
    num_vms: u64,
    /// Number of slots to simulate.
    #[arg(long, default_value_t = 1000)]
    num_slots: u64,
    /// Number of PMs in the pool. Defaults to `num_vms`, matching the
    /// original simulation's `num_pms = num_vms`.
    #[arg(long)]
    num_pms: Option<u64>,
    /// Seed for the pseudo-random VM generator.
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Lower bound of the generated per-slot demand range.
    #[arg(long, default_value_t = 0.05)]
    demand_low: f64,
    /// Upper bound of the generated per-slot demand range.
    #[arg(long, default_value_t = 1.0)]
    demand_high: f64,
    /// Load VMs from this CSV instead of generating them.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Write a per-slot active-PM-count summary to this CSV.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Check P1-P6 invariants after every slot; aborts the run on the first violation.
    #[arg(long, default_value_t = false)]
    validate: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let num_pms = args.num_pms.unwrap_or(args.num_vms);

    let config = Config::new(
        args.num_vms,
        args.num_slots,
        num_pms,
        args.seed,
        args.demand_low,
        args.demand_high,
        args.input.clone(),
        args.output.clone(),
        args.validate,
    )?;

    let vms = match &args.input {
        Some(path) => vmpack_sim::csv_io::load_vms(path)?,
        None => vmpack_sim::vm_gen::generate(&config)?,
    };

    let mut sim = Simulation::new(config, vms);
    let report = sim.run()?;
    log::info!("{report}");
    println!("{report}");

    Ok(())
}
