//! The simulation driver: owns the arrival queue and runs the fixed per-slot
//! pipeline (insert -> vm_re_categorize -> pm_re_categorize -> change ->
//! integrate_vm_set -> pm_re_categorize -> pm_group_renew) from slot 0 through
//! `config.num_slots`, following `original_source/simulation.py`'s loop.

use std::collections::{BinaryHeap, HashMap};
use std::path::PathBuf;

use crate::machine::VirtualMachine;
use crate::scheduler::Scheduler;

#[derive(Debug)]
pub struct Config {
    pub num_vms: u64,
    pub num_slots: u64,
    pub num_pms: u64,
    pub seed: u64,
    pub demand_low: f64,
    pub demand_high: f64,
    pub input_csv: Option<PathBuf>,
    pub output_csv: Option<PathBuf>,
    pub validate: bool,
}

impl Config {
    pub fn new(
        num_vms: u64,
        num_slots: u64,
        num_pms: u64,
        seed: u64,
        demand_low: f64,
        demand_high: f64,
        input_csv: Option<PathBuf>,
        output_csv: Option<PathBuf>,
        validate: bool,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(num_slots > 0, "vanishing number of slots");
        anyhow::ensure!(num_pms > 0, "vanishing PM pool");
        anyhow::ensure!(
            demand_low > 0.0 && demand_low <= demand_high && demand_high <= 1.0,
            "demand range must satisfy 0 < low <= high <= 1"
        );
        Ok(Self {
            num_vms,
            num_slots,
            num_pms,
            seed,
            demand_low,
            demand_high,
            input_csv,
            output_csv,
            validate,
        })
    }
}

/// Aggregate output of a run.
#[derive(Debug)]
pub struct SimulationReport {
    pub slots_run: u64,
    pub peak_active_pms: usize,
    pub avg_active_pms: f64,
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "slots_run={}, peak_active_pms={}, avg_active_pms={:.3}",
            self.slots_run, self.peak_active_pms, self.avg_active_pms
        )
    }
}

/// An arrival pending dispatch, ordered by ascending `start_time` (a min-heap
/// built on the standard library's max-heap `BinaryHeap` by reversing `Ord`).
#[derive(PartialEq, Eq)]
struct Arrival {
    start_time: u64,
    vm_id: u64,
}

#[allow(clippy::non_canonical_partial_ord_impl)]
impl PartialOrd for Arrival {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        other.start_time.partial_cmp(&self.start_time)
    }
}

impl Ord for Arrival {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap()
    }
}

pub struct Simulation {
    scheduler: Scheduler,
    pending: HashMap<u64, VirtualMachine>,
    queue: BinaryHeap<Arrival>,
    config: Config,
}

impl Simulation {
    pub fn new(config: Config, vms: Vec<VirtualMachine>) -> Self {
        let mut pending = HashMap::with_capacity(vms.len());
        let mut queue = BinaryHeap::with_capacity(vms.len());
        for vm in vms {
            queue.push(Arrival {
                start_time: vm.start_time,
                vm_id: vm.id,
            });
            pending.insert(vm.id, vm);
        }
        Self {
            scheduler: Scheduler::new(config.num_pms),
            pending,
            queue,
            config,
        }
    }

    /// Run the slot loop `0..=num_slots`, returning the aggregate report.
    pub fn run(&mut self) -> anyhow::Result<SimulationReport> {
        let mut peak_active = 0usize;
        let mut sum_active = 0u64;
        let mut slot_summary = Vec::new();

        for t in 0..=self.config.num_slots {
            log::info!("The {t}th slot.");

            let mut arrivals = Vec::new();
            while matches!(self.queue.peek(), Some(a) if a.start_time == t) {
                let arrival = self.queue.pop().expect("just peeked");
                if let Some(vm) = self.pending.remove(&arrival.vm_id) {
                    arrivals.push(vm);
                }
            }

            self.scheduler.stage_arrivals(t, arrivals);
            self.scheduler.insert()?;
            self.scheduler.vm_re_categorize(t);
            self.scheduler.pm_re_categorize();
            self.scheduler.change()?;
            self.scheduler.integrate_vm_set();
            self.scheduler.pm_re_categorize();
            self.scheduler.pm_group_renew();

            if self.config.validate {
                crate::validator::check_invariants(self.scheduler.pool(), self.scheduler.vm_store())?;
            }

            let active = self.scheduler.pool().active_count();
            peak_active = peak_active.max(active);
            sum_active += active as u64;
            slot_summary.push((t, active));
        }

        if let Some(path) = &self.config.output_csv {
            crate::csv_io::write_slot_summary(path, &slot_summary)?;
        }

        Ok(SimulationReport {
            slots_run: self.config.num_slots + 1,
            peak_active_pms: peak_active,
            avg_active_pms: sum_active as f64 / (self.config.num_slots + 1) as f64,
        })
    }
}
