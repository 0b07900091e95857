//! VM and PM entities: identity, lifespan/capacity, and the derived category that
//! [`crate::classify`] computes from their current state.

use std::collections::BTreeSet;

use crate::classify::{item_class, ItemClass, PmClass};
use crate::error::SchedulerError;

/// A virtual machine with a known lifespan and a per-slot demand trace.
///
/// Carries identity, lifespan, demand trace, current class and current host PM
/// id. The demand trace is owned exclusively by the VM; a PM only ever refers
/// to a VM by id (see [`crate::pool`] and [`crate::scheduler`]), never by value.
#[derive(Debug, Clone)]
pub struct VirtualMachine {
    pub id: u64,
    pub start_time: u64,
    pub end_time: u64,
    demands: Vec<f64>,
    pub current_demand: f64,
    pub category: Option<ItemClass>,
    pub pre_category: Option<ItemClass>,
    pub current_pm_id: Option<u64>,
}

impl VirtualMachine {
    /// Construct a VM. `demands` must have exactly `end_time - start_time + 1`
    /// entries, each in (0, 1]; both are checked here (spec: "demand out of
    /// range" and "fatal at construction time").
    pub fn new(
        id: u64,
        start_time: u64,
        end_time: u64,
        demands: Vec<f64>,
    ) -> Result<Self, SchedulerError> {
        let expected_len = (end_time - start_time + 1) as usize;
        if demands.len() != expected_len {
            return Err(SchedulerError::InvariantViolation {
                detail: format!(
                    "VM-{id} has {} demand samples, expected {expected_len}",
                    demands.len()
                ),
            });
        }
        for &d in &demands {
            if d <= 0.0 || d > 1.0 {
                return Err(SchedulerError::DemandOutOfRange { vm_id: id, demand: d });
            }
        }
        let current_demand = demands[0];
        let category = item_class(current_demand);
        Ok(Self {
            id,
            start_time,
            end_time,
            demands,
            current_demand,
            category,
            pre_category: None,
            current_pm_id: None,
        })
    }

    pub fn length(&self) -> u64 {
        self.end_time - self.start_time + 1
    }

    /// Advance to slot `t`: save the previous category, load the demand for
    /// `t`, and reclassify. A no-op past the VM's lifespan.
    pub fn update(&mut self, t: u64) {
        if t < self.start_time || t > self.end_time {
            return;
        }
        self.pre_category = self.category;
        self.current_demand = self.demands[(t - self.start_time) as usize];
        self.category = item_class(self.current_demand);
    }
}

impl std::fmt::Display for VirtualMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VirtualMachine(id={}, start={}, end={}, demand={:.3})",
            self.id, self.start_time, self.end_time, self.current_demand
        )
    }
}

/// A unit-capacity physical machine. Holds the set of running VM ids (the PM
/// does not own VM structs; the scheduler's VM store does), plus the derived
/// gap and category.
#[derive(Debug, Clone)]
pub struct PhysicalMachine {
    pub id: u64,
    pub capacity: f64,
    pub running_vms: BTreeSet<u64>,
    pub gap: f64,
    pub category: Option<PmClass>,
}

impl PhysicalMachine {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            capacity: 1.0,
            running_vms: BTreeSet::new(),
            gap: 1.0,
            category: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.running_vms.is_empty()
    }
}

impl std::fmt::Display for PhysicalMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PhysicalMachine(id={}, category={:?}, gap={:.3}, vms={})",
            self.id,
            self.category,
            self.gap,
            self.running_vms.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_ctor_rejects_bad_length() {
        let err = VirtualMachine::new(1, 0, 2, vec![0.5, 0.5]).unwrap_err();
        assert!(matches!(err, SchedulerError::InvariantViolation { .. }));
    }

    #[test]
    fn vm_ctor_rejects_demand_out_of_range() {
        let err = VirtualMachine::new(1, 0, 0, vec![0.0]).unwrap_err();
        assert!(matches!(err, SchedulerError::DemandOutOfRange { .. }));
        let err = VirtualMachine::new(1, 0, 0, vec![1.5]).unwrap_err();
        assert!(matches!(err, SchedulerError::DemandOutOfRange { .. }));
    }

    #[test]
    fn vm_update_ages_demand() {
        let mut vm = VirtualMachine::new(1, 0, 1, vec![0.5, 0.9]).unwrap();
        assert_eq!(vm.category, Some(ItemClass::S));
        vm.update(1);
        assert_eq!(vm.pre_category, Some(ItemClass::S));
        assert_eq!(vm.category, Some(ItemClass::B));
        assert_eq!(vm.current_demand, 0.9);
    }

    #[test]
    fn pm_starts_idle_and_empty() {
        let pm = PhysicalMachine::new(7);
        assert!(!pm.is_active());
        assert_eq!(pm.gap, 1.0);
        assert_eq!(pm.category, None);
    }
}
