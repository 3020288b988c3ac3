mod cached;
mod default;
mod interface;

pub use cached::*;
pub use default::*;
pub use interface::*;

use crate::bits::BitsAllocator;
use crate::worker::WorkerIdAssigner;
use crate::{Error, Result};

/// Resolves the worker id once at startup and checks it fits the layout.
pub(crate) fn resolve_worker_id<A>(assigner: &A, allocator: &BitsAllocator) -> Result<i64>
where
    A: WorkerIdAssigner + ?Sized,
{
    let worker_id = assigner.assign_worker_id()?;
    if !(0..=allocator.max_worker_id()).contains(&worker_id) {
        return Err(Error::WorkerIdOverflow {
            worker_id,
            max_worker_id: allocator.max_worker_id(),
        });
    }
    Ok(worker_id)
}
