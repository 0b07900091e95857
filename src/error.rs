/// Fatal conditions the scheduler can hit.
///
/// None of these are retried: every scheduling operation is deterministic given
/// its inputs, so a failure here means the caller gave the scheduler an
/// unsatisfiable workload (not enough PMs, bad input data) or the scheduler
/// itself has a bug (an invariant violation).
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("PM pool exhausted at slot {slot}: no idle PM available")]
    PoolExhausted { slot: u64 },

    #[error("VM-{vm_id} has demand {demand} outside (0, 1]")]
    DemandOutOfRange { vm_id: u64, demand: f64 },

    #[error("invariant violation: {detail}")]
    InvariantViolation { detail: String },
}
