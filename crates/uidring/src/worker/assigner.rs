use crate::Result;

/// Assigns the worker id encoded into every UID this process issues.
///
/// Production deployments back this with a durable registry following the
/// disposable contract: every process start inserts a fresh
/// [`WorkerNode`](crate::WorkerNode) row and takes the auto-incremented key
/// as its id. Ids are never reused within an epoch, so a crashed worker's id
/// simply retires with it.
pub trait WorkerIdAssigner {
    /// Assigns a worker id in `[0, max_worker_id]`.
    fn assign_worker_id(&self) -> Result<i64>;
}

/// Assigner with a predetermined id, for tests and statically provisioned
/// fleets.
#[derive(Debug, Clone, Copy)]
pub struct FixedWorkerIdAssigner {
    worker_id: i64,
}

impl FixedWorkerIdAssigner {
    pub const fn new(worker_id: i64) -> Self {
        Self { worker_id }
    }
}

impl WorkerIdAssigner for FixedWorkerIdAssigner {
    fn assign_worker_id(&self) -> Result<i64> {
        Ok(self.worker_id)
    }
}
