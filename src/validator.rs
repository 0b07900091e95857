//! Optional post-slot invariant checker, enabled by `--validate`. Off by
//! default: it's `O(|active|)` extra work the scheduler itself doesn't need
//! to stay correct, only to catch a regression early.

use std::collections::HashMap;

use crate::classify::{item_class, pm_class, ItemCounts};
use crate::error::SchedulerError;
use crate::machine::VirtualMachine;
use crate::pool::PmPool;

/// Check P1-P6 against the current state. Returns the first violation found.
pub fn check_invariants(
    pool: &PmPool,
    vm_store: &HashMap<u64, VirtualMachine>,
) -> Result<(), SchedulerError> {
    for &pm_id in pool.idle_ids() {
        if !pool.pm(pm_id).running_vms.is_empty() {
            return Err(SchedulerError::InvariantViolation {
                detail: format!("P2: idle PM-{pm_id} hosts VMs"),
            });
        }
    }

    for &pm_id in pool.active_ids() {
        let pm = pool.pm(pm_id);
        if pm.running_vms.is_empty() {
            return Err(SchedulerError::InvariantViolation {
                detail: format!("P2: active PM-{pm_id} has no VMs"),
            });
        }

        let mut total = 0.0;
        let mut classes = Vec::new();
        for &vm_id in &pm.running_vms {
            let vm = vm_store.get(&vm_id).ok_or_else(|| SchedulerError::InvariantViolation {
                detail: format!("P1: PM-{pm_id} references unknown VM-{vm_id}"),
            })?;
            if vm.current_pm_id != Some(pm_id) {
                return Err(SchedulerError::InvariantViolation {
                    detail: format!(
                        "P1: VM-{vm_id} back-pointer disagrees with PM-{pm_id}'s running set"
                    ),
                });
            }
            let expected = item_class(vm.current_demand);
            if vm.category != expected {
                return Err(SchedulerError::InvariantViolation {
                    detail: format!(
                        "P5: VM-{vm_id} category {:?} does not match demand {}",
                        vm.category, vm.current_demand
                    ),
                });
            }
            total += vm.current_demand;
            if let Some(c) = vm.category {
                classes.push(c);
            }
        }
        if total > pm.capacity + 1e-9 {
            return Err(SchedulerError::InvariantViolation {
                detail: format!("P3: PM-{pm_id} is hot, total demand {total}"),
            });
        }
        let expected_class = pm_class(ItemCounts::from_classes(classes.iter()), total);
        if expected_class != pm.category {
            return Err(SchedulerError::InvariantViolation {
                detail: format!(
                    "P4: PM-{pm_id} category {:?} does not match contents (expected {:?})",
                    pm.category, expected_class
                ),
            });
        }
        if let Some(class) = pm.category {
            if !pool.class_bucket(class).contains(&pm_id) {
                return Err(SchedulerError::InvariantViolation {
                    detail: format!("P6: PM-{pm_id} missing from its own class bucket {class}"),
                });
            }
        }
    }

    for class in crate::classify::PmClass::ALL {
        for &pm_id in pool.class_bucket(class) {
            if !pool.is_active(pm_id) || pool.pm(pm_id).category != Some(class) {
                return Err(SchedulerError::InvariantViolation {
                    detail: format!("P6: PM-{pm_id} in bucket {class} but not actually that class"),
                });
            }
        }
    }

    for (&vm_id, vm) in vm_store {
        match vm.current_pm_id {
            Some(pm_id) => {
                if !pool.pm(pm_id).running_vms.contains(&vm_id) {
                    return Err(SchedulerError::InvariantViolation {
                        detail: format!("P1: VM-{vm_id} claims PM-{pm_id} but isn't in its set"),
                    });
                }
            }
            None => {
                return Err(SchedulerError::InvariantViolation {
                    detail: format!("P1: VM-{vm_id} is not hosted anywhere"),
                });
            }
        }
    }

    Ok(())
}
