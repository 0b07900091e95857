//! Placement primitives (`new`, `move`, `release`, `divide`) and the
//! rule-driven scheduling engine (`insert`, `fill`, `fillwith`, `adjust`,
//! `insert_s_item`, `change`) that keeps every active PM's class invariant
//! intact across arrivals, departures and mid-slot demand shifts.
//!
//! Set-pop order: wherever a rule allows picking an arbitrary member of a
//! bucket, this implementation picks the lowest PM (or VM) id, since the
//! index and every running-VM set are ordered collections (`BTreeSet`). This
//! makes runs reproducible for a given seed.

use std::collections::HashMap;

use crate::classify::{ItemClass, PmClass};
use crate::error::SchedulerError;
use crate::machine::VirtualMachine;
use crate::pool::PmPool;

pub struct Scheduler {
    pool: PmPool,
    vm_store: HashMap<u64, VirtualMachine>,
    vm_set_ids: Vec<u64>,
    /// Arrivals for the current slot, staged by the driver before `insert`.
    arrivals: Vec<VirtualMachine>,
    /// Ids placed by `insert` this slot, integrated into `vm_set_ids` by
    /// `integrate_vm_set` after `change` has run.
    newly_arrived_ids: Vec<u64>,
    current_slot: u64,
}

impl Scheduler {
    pub fn new(num_pms: u64) -> Self {
        Self {
            pool: PmPool::new(num_pms),
            vm_store: HashMap::new(),
            vm_set_ids: Vec::new(),
            arrivals: Vec::new(),
            newly_arrived_ids: Vec::new(),
            current_slot: 0,
        }
    }

    pub fn pool(&self) -> &PmPool {
        &self.pool
    }

    pub fn vm_store(&self) -> &HashMap<u64, VirtualMachine> {
        &self.vm_store
    }

    pub fn vm_count(&self) -> usize {
        self.vm_set_ids.len()
    }

    /// Stage this slot's arrivals for the next call to `insert`.
    pub fn stage_arrivals(&mut self, slot: u64, vms: Vec<VirtualMachine>) {
        self.current_slot = slot;
        self.arrivals = vms;
    }

    // ---- placement primitives -----------------------------------------

    /// Allocate a fresh PM, host `vm_ids` on it, return its id.
    fn new_pm(&mut self, vm_ids: &[u64]) -> Result<u64, SchedulerError> {
        let pm_id = self.pool.allocate_idle(self.current_slot)?;
        for &vm_id in vm_ids {
            self.vm_store.get_mut(&vm_id).expect("unknown VM id").current_pm_id = Some(pm_id);
            self.pool.pm_mut(pm_id).running_vms.insert(vm_id);
        }
        self.pool.pm_group_renew(&self.vm_store);
        Ok(pm_id)
    }

    /// Move `vm_ids` onto `dest`. Detaches each VM from its current host
    /// first (releasing that host if it becomes empty); no capacity check —
    /// callers are responsible for choosing a `dest` that restores the class
    /// invariants. Transient over-capacity mid-slot is expected and resolved
    /// by `adjust` before the slot ends.
    fn move_vms(&mut self, vm_ids: &[u64], dest: u64) {
        for &vm_id in vm_ids {
            let old_pm_id = self.vm_store[&vm_id].current_pm_id;
            if let Some(old_id) = old_pm_id {
                if old_id != dest {
                    self.pool.pm_mut(old_id).running_vms.remove(&vm_id);
                    if self.pool.pm(old_id).running_vms.is_empty() {
                        self.pool.release(old_id);
                    }
                }
            }
            self.vm_store.get_mut(&vm_id).expect("unknown VM id").current_pm_id = Some(dest);
            self.pool.pm_mut(dest).running_vms.insert(vm_id);
        }
        self.pool.pm_group_renew(&self.vm_store);
    }

    /// Empty `pm_id` by repeatedly evicting one VM and re-placing it with
    /// `fillwith`, then return `pm_id` to idle (law L3). VMs are popped one
    /// at a time rather than all at once, so `pm_id` stays active with its
    /// shrinking remainder until the last VM leaves it, and `fillwith` is
    /// told to exclude `pm_id` itself — without both, a stale class-index
    /// entry for `pm_id` (not yet rebuilt since the last VM left) could send
    /// a later evicted VM right back onto the PM it was just evicted from.
    fn release(&mut self, pm_id: u64) -> Result<(), SchedulerError> {
        while let Some(&vm_id) = self.pool.pm(pm_id).running_vms.iter().next() {
            self.pool.pm_mut(pm_id).running_vms.remove(&vm_id);
            self.fillwith_excluding(vm_id, Some(pm_id))?;
        }
        if self.pool.is_active(pm_id) {
            self.pool.release(pm_id);
        }
        self.pool.pm_group_renew(&self.vm_store);
        Ok(())
    }

    /// Partition `pm_id`'s T-items into groups each with `Σ d <= 1/3`, built
    /// greedily by repeatedly taking the largest remaining item; when it
    /// would tip a group over 1/3 the group is closed and the item starts the
    /// next one. Returned in construction order — callers consume from the
    /// back (`.pop()`) to get the last-built group first.
    fn divide(&self, pm_id: u64) -> Vec<Vec<u64>> {
        let mut remaining: Vec<(f64, u64)> = self
            .pool
            .pm(pm_id)
            .running_vms
            .iter()
            .filter_map(|&vm_id| {
                let vm = &self.vm_store[&vm_id];
                (vm.category == Some(ItemClass::T)).then_some((vm.current_demand, vm_id))
            })
            .collect();
        remaining.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("demand is never NaN"));

        let mut groups = Vec::new();
        let mut current: Vec<(f64, u64)> = Vec::new();
        while let Some(item) = remaining.pop() {
            current.push(item);
            let total: f64 = current.iter().map(|(d, _)| d).sum();
            if total > 1.0 / 3.0 {
                let excess = current.pop().expect("just pushed");
                remaining.insert(0, excess);
                groups.push(std::mem::take(&mut current));
            }
        }
        groups.push(current);

        groups
            .into_iter()
            .map(|g| g.into_iter().map(|(_, id)| id).collect())
            .collect()
    }

    fn hot(&self, pm_id: u64) -> bool {
        let total: f64 = self
            .pool
            .pm(pm_id)
            .running_vms
            .iter()
            .map(|id| self.vm_store[id].current_demand)
            .sum();
        total > self.pool.pm(pm_id).capacity
    }

    fn exists_s_item(&self, pm_id: u64, excluding: Option<u64>) -> bool {
        self.get_s_item(pm_id, excluding).is_some()
    }

    fn get_s_item(&self, pm_id: u64, excluding: Option<u64>) -> Option<u64> {
        self.pool.pm(pm_id).running_vms.iter().copied().find(|&id| {
            Some(id) != excluding && self.vm_store[&id].category == Some(ItemClass::S)
        })
    }

    fn exists_l_item(&self, pm_id: u64, excluding: Option<u64>) -> bool {
        self.get_l_item(pm_id, excluding).is_some()
    }

    fn get_l_item(&self, pm_id: u64, excluding: Option<u64>) -> Option<u64> {
        self.pool.pm(pm_id).running_vms.iter().copied().find(|&id| {
            Some(id) != excluding && self.vm_store[&id].category == Some(ItemClass::L)
        })
    }

    // ---- scheduling rules ----------------------------------------------

    /// Place `vm_x` into an under-full bin if one exists (ULLT preferred over
    /// UT), else start a fresh PM for it. The fallback to `new_pm` always
    /// terminates: the pool is finite, but so is demand for it, since
    /// `fillwith` never recurses without first trying an existing bin.
    fn fillwith(&mut self, vm_x: u64) -> Result<(), SchedulerError> {
        self.fillwith_excluding(vm_x, None)
    }

    /// As [`Scheduler::fillwith`], but never selects `excluding` as a
    /// destination even if it still has a stale under-full bucket entry.
    fn fillwith_excluding(&mut self, vm_x: u64, excluding: Option<u64>) -> Result<(), SchedulerError> {
        if self.pool.exists(PmClass::Ullt, excluding) {
            let dest = self.pool.get(PmClass::Ullt, excluding).expect("just checked");
            self.move_vms(&[vm_x], dest);
        } else if self.pool.exists(PmClass::Ut, excluding) {
            let dest = self.pool.get(PmClass::Ut, excluding).expect("just checked");
            self.move_vms(&[vm_x], dest);
        } else {
            self.new_pm(&[vm_x])?;
        }
        Ok(())
    }

    /// Pack T-groups into `pm_b`'s residual gap until the gap drops below
    /// 1/3 or no T-class source bin remains. Only applies to L/LT bins.
    ///
    /// Any PM hosting only T-items (UT or T) counts as a source here,
    /// matching this spec's wording ("there exists any T-class bin"); UT
    /// bins are tried first. Restricting the loop condition to the plain T
    /// bucket alone (as a narrower reading of the same sentence might
    /// suggest) would make UT-only pools permanently unusable as fill
    /// sources, which contradicts "prefer UT over T".
    fn fill(&mut self, pm_b: u64) {
        let category = self.pool.pm(pm_b).category;
        if !matches!(category, Some(PmClass::L) | Some(PmClass::Lt)) {
            return;
        }
        loop {
            if self.pool.pm(pm_b).gap < 1.0 / 3.0 {
                break;
            }
            let source = if self.pool.exists(PmClass::Ut, None) {
                self.pool.get(PmClass::Ut, None)
            } else if self.pool.exists(PmClass::T, None) {
                self.pool.get(PmClass::T, None)
            } else {
                None
            };
            let Some(pm_s) = source else { break };
            let mut groups = self.divide(pm_s);
            let Some(g) = groups.pop() else { break };
            if g.is_empty() {
                break;
            }
            self.move_vms(&g, pm_b);
        }
    }

    /// Re-home `vm_x` to an existing S-bin (forming SS), else start a fresh PM.
    fn insert_s_item(&mut self, vm_x: u64) -> Result<(), SchedulerError> {
        if self.pool.exists(PmClass::S, None) {
            let dest = self.pool.get(PmClass::S, None).expect("just checked");
            self.move_vms(&[vm_x], dest);
        } else {
            self.new_pm(&[vm_x])?;
        }
        Ok(())
    }

    /// Applied to an LT or T bin: evict VMs via `fillwith` until it's no
    /// longer hot, then top it back up with `fill` if a >= 1/3 gap opened.
    fn adjust(&mut self, pm_b: u64) -> Result<(), SchedulerError> {
        let category = self.pool.pm(pm_b).category;
        if !matches!(category, Some(PmClass::Lt) | Some(PmClass::T)) {
            return Ok(());
        }
        while self.hot(pm_b) {
            let vm_id = *self
                .pool
                .pm(pm_b)
                .running_vms
                .iter()
                .next()
                .expect("hot PM must host at least one VM");
            self.pool.pm_mut(pm_b).running_vms.remove(&vm_id);
            self.pool.reindex(pm_b, &self.vm_store);
            self.fillwith(vm_id)?;
        }
        if self.pool.pm(pm_b).gap >= 1.0 / 3.0 {
            self.fill(pm_b);
        }
        Ok(())
    }

    /// Place every staged arrival onto a suitable PM, branching on its item class.
    pub fn insert(&mut self) -> Result<(), SchedulerError> {
        let arrivals = std::mem::take(&mut self.arrivals);
        for vm in arrivals {
            let vm_id = vm.id;
            let category = vm.category;
            log::info!("VM-{vm_id} starts running now.");
            self.vm_store.insert(vm_id, vm);
            self.newly_arrived_ids.push(vm_id);
            match category {
                Some(ItemClass::B) => {
                    self.new_pm(&[vm_id])?;
                }
                Some(ItemClass::L) => {
                    let pm_id = self.new_pm(&[vm_id])?;
                    self.fill(pm_id);
                }
                Some(ItemClass::S) => {
                    self.insert_s_item(vm_id)?;
                }
                Some(ItemClass::T) => {
                    self.fillwith(vm_id)?;
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Retire VMs whose `end_time == t`, then age every surviving VM's
    /// demand to slot `t`.
    pub fn vm_re_categorize(&mut self, t: u64) {
        let finished: Vec<u64> = self
            .vm_set_ids
            .iter()
            .copied()
            .filter(|id| self.vm_store[id].end_time == t)
            .collect();
        for &vm_id in &finished {
            if let Some(pm_id) = self.vm_store[&vm_id].current_pm_id {
                self.pool.pm_mut(pm_id).running_vms.remove(&vm_id);
            }
            log::info!("VM-{vm_id} finishes its work.");
            self.vm_store.remove(&vm_id);
        }
        if !finished.is_empty() {
            self.vm_set_ids.retain(|id| !finished.contains(id));
        }
        for &vm_id in &self.vm_set_ids {
            self.vm_store.get_mut(&vm_id).expect("unknown VM id").update(t);
        }
    }

    pub fn pm_re_categorize(&mut self) {
        self.pool.pm_re_categorize(&self.vm_store);
    }

    pub fn pm_group_renew(&mut self) {
        self.pool.pm_group_renew(&self.vm_store);
    }

    /// Apply the pre->cur transition table to every VM already integrated
    /// into the main set (arrivals from this slot are excluded: their
    /// `pre_category` is `None`, a no-op by the table).
    pub fn change(&mut self) -> Result<(), SchedulerError> {
        for vm_id in self.vm_set_ids.clone() {
            let (pre, cur, pm) = {
                let vm = &self.vm_store[&vm_id];
                let Some(pm) = vm.current_pm_id else { continue };
                (vm.pre_category, vm.category, pm)
            };
            self.apply_transition(vm_id, pre, cur, pm)?;
        }
        Ok(())
    }

    fn apply_transition(
        &mut self,
        vm_id: u64,
        pre: Option<ItemClass>,
        cur: Option<ItemClass>,
        pm: u64,
    ) -> Result<(), SchedulerError> {
        use ItemClass::*;
        match (pre, cur) {
            (Some(B), Some(L)) => self.fill(pm),
            (Some(B), Some(S)) => {
                if let Some(pm_b) = self.pool.get(PmClass::S, Some(pm)) {
                    self.move_vms(&[vm_id], pm_b);
                }
            }
            (Some(B), Some(T)) => {
                if let Some(pm_b) = self.pool.get(PmClass::Ullt, Some(pm)) {
                    self.move_vms(&[vm_id], pm_b);
                } else if let Some(pm_b) = self.pool.get(PmClass::Ut, Some(pm)) {
                    self.move_vms(&[vm_id], pm_b);
                }
            }
            (Some(L), Some(B)) => self.release(pm)?,
            (Some(L), Some(L)) => self.adjust(pm)?,
            (Some(L), Some(S)) => {
                if let Some(pm_b) = self.pool.get(PmClass::S, Some(pm)) {
                    self.move_vms(&[vm_id], pm_b);
                }
            }
            (Some(L), Some(T)) => {
                if self.pool.exists(PmClass::T, Some(pm)) {
                    while self.pool.exists(PmClass::Ut, Some(pm)) {
                        let pm_b = self.pool.get(PmClass::Ut, None).expect("just checked");
                        let mut groups = self.divide(pm);
                        let Some(g) = groups.pop() else { break };
                        if g.is_empty() {
                            break;
                        }
                        self.move_vms(&g, pm_b);
                    }
                } else {
                    while self.pool.exists(PmClass::Ullt, Some(pm)) {
                        let pm_b = self.pool.get(PmClass::Ullt, Some(pm)).expect("just checked");
                        let mut groups = self.divide(pm);
                        let Some(g) = groups.pop() else { break };
                        if g.is_empty() {
                            break;
                        }
                        self.move_vms(&g, pm_b);
                    }
                }
            }
            (Some(S), Some(B)) => {
                if let Some(s_item) = self.get_s_item(pm, None) {
                    self.insert_s_item(s_item)?;
                }
            }
            (Some(S), Some(L)) => {
                if let Some(s_item) = self.get_s_item(pm, None) {
                    self.insert_s_item(s_item)?;
                    self.fill(pm);
                }
            }
            (Some(S), Some(T)) => {
                if self.exists_s_item(pm, None) {
                    if let Some(pm_b) = self.pool.get(PmClass::S, Some(pm)) {
                        let s_item = self.get_s_item(pm, None).expect("just checked");
                        self.move_vms(&[s_item], pm_b);
                    }
                }
                if let Some(pm_b) = self.pool.get(PmClass::Ullt, Some(pm)) {
                    self.move_vms(&[vm_id], pm_b);
                } else if let Some(pm_b) = self.pool.get(PmClass::Ut, Some(pm)) {
                    self.move_vms(&[vm_id], pm_b);
                } else if self.exists_s_item(pm, None) {
                    self.pool.pm_mut(pm).running_vms.remove(&vm_id);
                    self.new_pm(&[vm_id])?;
                    self.pool.pm_group_renew(&self.vm_store);
                }
            }
            (Some(T), Some(B)) => {
                if let Some(vm_x) = self.get_l_item(pm, None) {
                    self.pool.pm_mut(pm).running_vms.remove(&vm_x);
                    self.new_pm(&[vm_x])?;
                    self.release(pm)?;
                }
            }
            (Some(T), Some(L)) => {
                if let Some(vm_x) = self.get_l_item(pm, Some(vm_id)) {
                    self.pool.pm_mut(pm).running_vms.remove(&vm_x);
                    let new_pm_id = self.new_pm(&[vm_x])?;
                    self.fill(new_pm_id);
                    self.adjust(pm)?;
                }
            }
            (Some(T), Some(S)) => {
                if let Some(vm_x) = self.get_l_item(pm, None) {
                    self.insert_s_item(vm_id)?;
                    let host = self.vm_store[&vm_x].current_pm_id.expect("just placed");
                    self.fill(host);
                } else if let Some(pm_b) = self.pool.get(PmClass::S, None) {
                    let mut t_group = self.divide(pm);
                    while self.pool.exists(PmClass::Ut, Some(pm)) && !t_group.is_empty() {
                        let pm_c = self.pool.get(PmClass::Ut, Some(pm)).expect("just checked");
                        let g = t_group.pop().expect("just checked non-empty");
                        if g.is_empty() {
                            continue;
                        }
                        self.move_vms(&g, pm_c);
                    }
                    self.move_vms(&[vm_id], pm_b);
                } else {
                    self.release(pm)?;
                }
            }
            (Some(T), Some(T)) => {
                if self.exists_l_item(pm, Some(vm_id)) {
                    self.adjust(pm)?;
                } else if self.hot(pm) {
                    self.fillwith(vm_id)?;
                } else {
                    while self.pool.pm(pm).gap >= 1.0 / 3.0 && self.pool.exists(PmClass::Ut, Some(pm)) {
                        let pm_b = self.pool.get(PmClass::Ut, Some(pm)).expect("just checked");
                        let mut t_group = self.divide(pm_b);
                        let Some(g) = t_group.pop() else { break };
                        if g.is_empty() {
                            break;
                        }
                        self.move_vms(&g, pm);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Fold this slot's arrivals into the main VM set, after `change` has run.
    pub fn integrate_vm_set(&mut self) {
        log::info!("{} PMs is in active state.", self.pool.active_count());
        self.vm_set_ids.append(&mut self.newly_arrived_ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::VirtualMachine;

    fn vm(id: u64, start: u64, end: u64, demands: Vec<f64>) -> VirtualMachine {
        VirtualMachine::new(id, start, end, demands).unwrap()
    }

    /// Drive one full slot through a scheduler: stage arrivals, then run the
    /// same fixed pipeline the simulation driver runs each slot.
    fn run_slot(sched: &mut Scheduler, t: u64, arrivals: Vec<VirtualMachine>) {
        sched.stage_arrivals(t, arrivals);
        sched.insert().unwrap();
        sched.vm_re_categorize(t);
        sched.pm_re_categorize();
        sched.change().unwrap();
        sched.integrate_vm_set();
        sched.pm_re_categorize();
        sched.pm_group_renew();
    }

    #[test]
    fn s1_trivial_s_item_lifecycle() {
        let mut sched = Scheduler::new(1);
        run_slot(&mut sched, 0, vec![vm(1, 0, 0, vec![0.5])]);
        assert_eq!(sched.pool().active_count(), 1);
        let pm_id = sched.vm_store()[&1].current_pm_id.unwrap();
        assert_eq!(sched.pool().pm(pm_id).category, Some(PmClass::S));

        run_slot(&mut sched, 1, vec![]);
        assert_eq!(sched.pool().active_count(), 0);
    }

    #[test]
    fn s2_t_packs_into_l() {
        let mut sched = Scheduler::new(2);
        run_slot(
            &mut sched,
            0,
            vec![
                vm(1, 0, 1, vec![0.6, 0.6]),
                vm(2, 0, 1, vec![0.3, 0.3]),
            ],
        );
        let host1 = sched.vm_store()[&1].current_pm_id.unwrap();
        let host2 = sched.vm_store()[&2].current_pm_id.unwrap();
        assert_eq!(host1, host2, "T should pack onto L's PM");
        assert_eq!(sched.pool().pm(host1).category, Some(PmClass::Lt));
        assert_eq!(sched.pool().active_count(), 1);
    }

    #[test]
    fn s3_ss_formation() {
        let mut sched = Scheduler::new(2);
        run_slot(
            &mut sched,
            0,
            vec![vm(1, 0, 1, vec![0.4, 0.4]), vm(2, 0, 1, vec![0.4, 0.4])],
        );
        let host1 = sched.vm_store()[&1].current_pm_id.unwrap();
        let host2 = sched.vm_store()[&2].current_pm_id.unwrap();
        assert_eq!(host1, host2);
        assert_eq!(sched.pool().pm(host1).category, Some(PmClass::Ss));
        assert_eq!(sched.pool().active_count(), 1);
    }

    #[test]
    fn s4_l_to_b_migrates_t_companion() {
        let mut sched = Scheduler::new(3);
        run_slot(
            &mut sched,
            0,
            vec![
                vm(1, 0, 2, vec![0.6, 0.9, 0.9]),
                vm(2, 0, 2, vec![0.2, 0.2, 0.2]),
            ],
        );
        let host_before = sched.vm_store()[&1].current_pm_id.unwrap();
        assert_eq!(sched.vm_store()[&2].current_pm_id.unwrap(), host_before);

        run_slot(&mut sched, 1, vec![]);
        let host_after = sched.vm_store()[&1].current_pm_id.unwrap();
        assert_eq!(sched.pool().pm(host_after).category, Some(PmClass::B));
        assert_ne!(
            sched.vm_store()[&2].current_pm_id.unwrap(),
            host_after,
            "T companion must migrate off the B-singleton"
        );
    }

    #[test]
    fn l3_release_never_places_an_evicted_vm_back_on_its_own_pm() {
        // Two VMs share a PM; an L->B transition releases the whole PM.
        // Neither evicted VM may end up back on that same PM id, even
        // though the id gets reset and re-enters the idle pool mid-release.
        let mut sched = Scheduler::new(3);
        run_slot(
            &mut sched,
            0,
            vec![
                vm(1, 0, 2, vec![0.6, 0.9, 0.9]),
                vm(2, 0, 2, vec![0.2, 0.2, 0.2]),
            ],
        );
        let released_pm = sched.vm_store()[&1].current_pm_id.unwrap();
        assert_eq!(sched.vm_store()[&2].current_pm_id.unwrap(), released_pm);

        run_slot(&mut sched, 1, vec![]);
        assert_ne!(sched.vm_store()[&1].current_pm_id.unwrap(), released_pm);
        assert_ne!(sched.vm_store()[&2].current_pm_id.unwrap(), released_pm);
    }

    #[test]
    fn s5_t_to_b_relocates_l_companion() {
        let mut sched = Scheduler::new(3);
        run_slot(
            &mut sched,
            0,
            vec![
                vm(1, 0, 2, vec![0.6, 0.6, 0.6]),
                vm(2, 0, 2, vec![0.3, 0.9, 0.9]),
            ],
        );
        let shared_host = sched.vm_store()[&1].current_pm_id.unwrap();
        assert_eq!(sched.vm_store()[&2].current_pm_id.unwrap(), shared_host);

        run_slot(&mut sched, 1, vec![]);
        let l_host = sched.vm_store()[&1].current_pm_id.unwrap();
        let b_host = sched.vm_store()[&2].current_pm_id.unwrap();
        assert_ne!(l_host, b_host);
        assert_eq!(sched.pool().pm(b_host).category, Some(PmClass::B));
    }

    #[test]
    fn s6_hot_recovery_cools_down() {
        let mut sched = Scheduler::new(3);
        run_slot(
            &mut sched,
            0,
            vec![
                vm(1, 0, 2, vec![0.6, 0.6, 0.6]),
                vm(2, 0, 2, vec![0.3, 0.3, 0.3]),
            ],
        );
        run_slot(&mut sched, 1, vec![]);
        let host = sched.vm_store()[&1].current_pm_id.unwrap();
        let total: f64 = sched
            .pool()
            .pm(host)
            .running_vms
            .iter()
            .map(|id| sched.vm_store()[id].current_demand)
            .sum();
        assert!(total <= 1.0 + 1e-9, "no active PM should remain hot after change");
    }

    #[test]
    fn l2_divide_partitions_and_respects_third() {
        let mut sched = Scheduler::new(1);
        run_slot(
            &mut sched,
            0,
            vec![vm(1, 0, 0, vec![0.9])], // B, hosts alone on its own PM
        );
        let pm_id = sched.vm_store()[&1].current_pm_id.unwrap();
        // Stuff a few T-items directly for a divide() unit check.
        for (id, d) in [(10u64, 0.2), (11, 0.25), (12, 0.1)] {
            let vm = vm(id, 0, 0, vec![d]);
            sched.vm_store.insert(id, vm);
            sched.pool.pm_mut(pm_id).running_vms.insert(id);
        }
        let groups = sched.divide(pm_id);
        let mut seen = std::collections::HashSet::new();
        for g in &groups {
            let total: f64 = g.iter().map(|id| sched.vm_store[id].current_demand).sum();
            assert!(total <= 1.0 / 3.0 + 1e-9);
            for id in g {
                seen.insert(*id);
            }
        }
        assert_eq!(seen, [10u64, 11, 12].into_iter().collect());
    }
}
