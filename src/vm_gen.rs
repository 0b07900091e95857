//! Synthetic VM arrival generator. Not the interesting part of this crate —
//! a thin, swappable stand-in for whatever workload trace a real deployment
//! would replay, analogous to `gen_data`/`vm.csv` in the Python original.

use rand::distributions::Distribution;
use rand::SeedableRng;
use rand_distr::Uniform;

use crate::driver::Config;
use crate::error::SchedulerError;
use crate::machine::VirtualMachine;

/// Draw `config.num_vms` VMs with a uniformly random start time in
/// `[0, num_slots)`, a uniformly random duration, and a per-slot demand trace
/// sampled uniformly from `(demand_low, demand_high]`.
pub fn generate(config: &Config) -> Result<Vec<VirtualMachine>, SchedulerError> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
    let start_rv = Uniform::new(0, config.num_slots);
    let demand_rv = Uniform::new_inclusive(config.demand_low, config.demand_high);

    let mut vms = Vec::with_capacity(config.num_vms as usize);
    for id in 0..config.num_vms {
        let start_time = start_rv.sample(&mut rng);
        let length = Uniform::new_inclusive(1, (config.num_slots - start_time).max(1)).sample(&mut rng);
        let end_time = start_time + length - 1;
        let demands: Vec<f64> = (0..length).map(|_| demand_rv.sample(&mut rng)).collect();
        vms.push(VirtualMachine::new(id, start_time, end_time, demands)?);
    }
    Ok(vms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_respects_bounds() {
        let config = Config {
            num_vms: 50,
            num_slots: 20,
            num_pms: 50,
            seed: 7,
            demand_low: 0.05,
            demand_high: 1.0,
            input_csv: None,
            output_csv: None,
            validate: false,
        };
        let vms = generate(&config).unwrap();
        assert_eq!(vms.len(), 50);
        for vm in &vms {
            assert!(vm.start_time < config.num_slots);
            assert!(vm.end_time < config.num_slots);
            assert!(vm.end_time >= vm.start_time);
        }
    }

    #[test]
    fn generate_is_deterministic_for_a_seed() {
        let config = Config {
            num_vms: 10,
            num_slots: 20,
            num_pms: 10,
            seed: 42,
            demand_low: 0.05,
            demand_high: 1.0,
            input_csv: None,
            output_csv: None,
            validate: false,
        };
        let a = generate(&config).unwrap();
        let b = generate(&config).unwrap();
        let a_starts: Vec<u64> = a.iter().map(|vm| vm.start_time).collect();
        let b_starts: Vec<u64> = b.iter().map(|vm| vm.start_time).collect();
        assert_eq!(a_starts, b_starts);
    }
}
