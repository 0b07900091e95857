//! The PM pool: idle/active partitioning and the class index (PM class -> set
//! of active PM ids). Rebuilt each slot from the current running-VM sets
//! rather than maintained incrementally: with `|active|` bounded and per-slot
//! work already `O(|active|)`, a full rebuild is cheap and removes a whole
//! class of staleness bugs a maintained index would invite.

use std::collections::{BTreeSet, HashMap};

use crate::classify::{pm_class, ItemCounts, PmClass};
use crate::error::SchedulerError;
use crate::machine::{PhysicalMachine, VirtualMachine};

pub struct PmPool {
    pm_set: HashMap<u64, PhysicalMachine>,
    idle: BTreeSet<u64>,
    active: BTreeSet<u64>,
    groups: HashMap<PmClass, BTreeSet<u64>>,
}

impl PmPool {
    pub fn new(num_pms: u64) -> Self {
        let mut pm_set = HashMap::with_capacity(num_pms as usize);
        let mut idle = BTreeSet::new();
        for i in 1..=num_pms {
            pm_set.insert(i, PhysicalMachine::new(i));
            idle.insert(i);
        }
        let mut groups = HashMap::new();
        for class in PmClass::ALL {
            groups.insert(class, BTreeSet::new());
        }
        Self {
            pm_set,
            idle,
            active: BTreeSet::new(),
            groups,
        }
    }

    pub fn pm(&self, pm_id: u64) -> &PhysicalMachine {
        self.pm_set.get(&pm_id).expect("unknown PM id")
    }

    pub fn pm_mut(&mut self, pm_id: u64) -> &mut PhysicalMachine {
        self.pm_set.get_mut(&pm_id).expect("unknown PM id")
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_ids(&self) -> impl Iterator<Item = &u64> {
        self.active.iter()
    }

    pub fn is_active(&self, pm_id: u64) -> bool {
        self.active.contains(&pm_id)
    }

    pub fn idle_ids(&self) -> impl Iterator<Item = &u64> {
        self.idle.iter()
    }

    /// Pop an id from `idle`, move it to `active`. Fatal if `idle` is empty.
    pub fn allocate_idle(&mut self, slot: u64) -> Result<u64, SchedulerError> {
        let pm_id = *self
            .idle
            .iter()
            .next()
            .ok_or(SchedulerError::PoolExhausted { slot })?;
        self.idle.remove(&pm_id);
        self.active.insert(pm_id);
        Ok(pm_id)
    }

    /// Empty `pm_id`'s running set and return it to idle, dropping it from
    /// every class bucket. The PM is fully reset: callers that want to keep a
    /// PM's VMs alive must relocate them first (see [`crate::scheduler`]'s
    /// `release`).
    pub fn release(&mut self, pm_id: u64) {
        let pm = self.pm_set.get_mut(&pm_id).expect("unknown PM id");
        pm.running_vms.clear();
        pm.gap = pm.capacity;
        pm.category = None;
        self.active.remove(&pm_id);
        for bucket in self.groups.values_mut() {
            bucket.remove(&pm_id);
        }
        self.idle.insert(pm_id);
    }

    /// Recompute `gap` and `category` for `pm_id` from its current running
    /// set. Does not touch the class index; callers rebuild that separately
    /// with [`PmPool::pm_group_renew`].
    pub(crate) fn reindex(&mut self, pm_id: u64, vm_set: &HashMap<u64, VirtualMachine>) {
        let pm = self.pm_set.get_mut(&pm_id).expect("unknown PM id");
        let classes: Vec<_> = pm
            .running_vms
            .iter()
            .filter_map(|vm_id| vm_set.get(vm_id).and_then(|vm| vm.category))
            .collect();
        let total: f64 = pm
            .running_vms
            .iter()
            .filter_map(|vm_id| vm_set.get(vm_id).map(|vm| vm.current_demand))
            .sum();
        pm.gap = pm.capacity - total;
        pm.category = pm_class(ItemCounts::from_classes(classes.iter()), total);
    }

    /// Re-categorize every active PM. A PM whose running set has gone empty
    /// (VMs retired or moved away) is released to idle; everything else gets
    /// its `gap`/`category` recomputed in place. The class index itself is
    /// rebuilt separately by [`PmPool::pm_group_renew`].
    pub fn pm_re_categorize(&mut self, vm_set: &HashMap<u64, VirtualMachine>) {
        let empties: Vec<u64> = self
            .active
            .iter()
            .copied()
            .filter(|id| self.pm_set[id].running_vms.is_empty())
            .collect();
        for pm_id in empties {
            self.release(pm_id);
        }
        let active: Vec<u64> = self.active.iter().copied().collect();
        for pm_id in active {
            self.reindex(pm_id, vm_set);
        }
    }

    /// Fully rebuild the class index: re-categorize every active PM (releasing
    /// any that have become empty), then drop any PM whose running set is
    /// non-empty but whose category came back `None` (transiently
    /// "uncategorized" mid-slot) out of the index while keeping it active, and
    /// insert every other active PM into its class bucket.
    pub fn pm_group_renew(&mut self, vm_set: &HashMap<u64, VirtualMachine>) {
        self.pm_re_categorize(vm_set);
        for bucket in self.groups.values_mut() {
            bucket.clear();
        }
        let active: Vec<u64> = self.active.iter().copied().collect();
        for pm_id in active {
            if let Some(class) = self.pm_set[&pm_id].category {
                self.groups.get_mut(&class).expect("known class").insert(pm_id);
            }
        }
    }

    /// `true` iff some active PM other than `excluding` is in class `class`.
    pub fn exists(&self, class: PmClass, excluding: Option<u64>) -> bool {
        self.get(class, excluding).is_some()
    }

    /// An arbitrary PM id in class `class`, excluding `excluding` if given.
    /// Deterministic tie-break: lowest PM id first.
    pub fn get(&self, class: PmClass, excluding: Option<u64>) -> Option<u64> {
        self.groups[&class]
            .iter()
            .find(|&&id| Some(id) != excluding)
            .copied()
    }

    pub fn class_bucket(&self, class: PmClass) -> &BTreeSet<u64> {
        &self.groups[&class]
    }
}
