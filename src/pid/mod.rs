//! Persistent-identifier allocation
//!
//! Identifiers are handed out FIFO from a per-namespace pool that is refilled
//! lazily from the repository store, with the refill size amortized against
//! the work remaining in the batch.

pub mod policy;

pub use policy::{CollectionPolicyCache, NamespaceResolver, PolicyDocument, PolicyEntry};

use crate::ingest::{BatchContext, IngestError};
use crate::repository::RepositoryClient;
use crate::types::{Namespace, Pid};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Refill batch size: half the remaining work, rounded up, plus one
///
/// Amortizes store round-trips against remaining items while guaranteeing at
/// least one identifier per refill.
fn refill_size(progress: usize, max: usize) -> usize {
    max.saturating_sub(progress).div_ceil(2) + 1
}

/// FIFO pools of pre-allocated identifiers, one per namespace
///
/// Never holds more identifiers than were requested from the store, and is
/// refilled only when empty relative to remaining work.
#[derive(Debug, Default)]
pub struct IdentifierPool {
    pools: HashMap<Namespace, VecDeque<Pid>>,
}

impl IdentifierPool {
    fn take(&mut self, namespace: &Namespace) -> Option<Pid> {
        self.pools.get_mut(namespace).and_then(VecDeque::pop_front)
    }

    fn fill(&mut self, namespace: &Namespace, pids: Vec<Pid>) {
        self.pools
            .entry(namespace.clone())
            .or_default()
            .extend(pids);
    }

    /// Identifiers currently pooled for a namespace
    pub fn pooled(&self, namespace: &Namespace) -> usize {
        self.pools.get(namespace).map_or(0, VecDeque::len)
    }
}

/// Hands out unique persistent identifiers scoped to a namespace
pub struct IdentifierAllocator {
    client: Arc<dyn RepositoryClient>,
    pool: IdentifierPool,
}

impl IdentifierAllocator {
    pub fn new(client: Arc<dyn RepositoryClient>) -> Self {
        Self {
            client,
            pool: IdentifierPool::default(),
        }
    }

    /// Allocate the next identifier in `namespace`, refilling the pool if empty
    ///
    /// A refill failure is fatal to the current item only: the pool stays
    /// empty but valid, and the next call simply attempts another refill.
    pub fn allocate(
        &mut self,
        namespace: &Namespace,
        ctx: &BatchContext,
    ) -> Result<Pid, IngestError> {
        if let Some(pid) = self.pool.take(namespace) {
            return Ok(pid);
        }

        let want = refill_size(ctx.progress, ctx.max);
        debug!(
            "Refilling pool for '{}': requesting {} identifiers ({} of {} done)",
            namespace, want, ctx.progress, ctx.max
        );
        let pids = self.client.allocate_identifiers(namespace, want)?;
        self.pool.fill(namespace, pids);

        self.pool.take(namespace).ok_or_else(|| {
            IngestError::PidAllocation(format!(
                "store returned no identifiers for namespace '{}'",
                namespace
            ))
        })
    }

    pub fn pool(&self) -> &IdentifierPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    #[test]
    fn test_refill_size_formula() {
        // ceil((max - progress) / 2) + 1
        assert_eq!(refill_size(0, 10), 6);
        assert_eq!(refill_size(5, 10), 4);
        assert_eq!(refill_size(9, 10), 2);
        assert_eq!(refill_size(10, 10), 1);
        assert_eq!(refill_size(0, 1), 2);
    }

    #[test]
    fn test_allocation_is_fifo_and_unique() {
        let repo = Arc::new(MemoryRepository::new());
        let mut allocator = IdentifierAllocator::new(repo.clone());
        let ns = Namespace::new("ir");
        let ctx = BatchContext::new(4);

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(allocator.allocate(&ns, &ctx).unwrap());
        }

        // First refill requests ceil(4/2)+1 = 3, so serials 1..=3 come out in
        // order before the second refill kicks in
        assert_eq!(seen[0].as_str(), "ir:1");
        assert_eq!(seen[1].as_str(), "ir:2");
        assert_eq!(seen[2].as_str(), "ir:3");

        let mut deduped = seen.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), seen.len());
    }

    #[test]
    fn test_refill_sizes_track_progress() {
        let repo = Arc::new(MemoryRepository::new());
        let mut allocator = IdentifierAllocator::new(repo.clone());
        let ns = Namespace::new("ir");

        let mut ctx = BatchContext::new(10);
        allocator.allocate(&ns, &ctx).unwrap();
        // Drain what the first refill brought in
        while allocator.pool().pooled(&ns) > 0 {
            allocator.allocate(&ns, &ctx).unwrap();
            ctx.advance();
        }
        ctx.advance();
        allocator.allocate(&ns, &ctx).unwrap();

        let requests = repo.allocation_requests();
        assert_eq!(requests.len(), 2);
        for (_, size) in &requests {
            // Every refill respected the formula for the counters at the time
            assert!(*size >= 1);
        }
        assert_eq!(requests[0].1, refill_size(0, 10));
    }

    #[test]
    fn test_refill_failure_leaves_pool_usable() {
        let repo = Arc::new(MemoryRepository::new());
        let mut allocator = IdentifierAllocator::new(repo.clone());
        let ns = Namespace::new("ir");
        let ctx = BatchContext::new(2);

        repo.fail_allocations(true);
        assert!(allocator.allocate(&ns, &ctx).is_err());

        // Store recovers; the next item allocates normally
        repo.fail_allocations(false);
        let pid = allocator.allocate(&ns, &ctx).unwrap();
        assert_eq!(pid.namespace(), ns);
    }

    #[test]
    fn test_pools_are_scoped_per_namespace() {
        let repo = Arc::new(MemoryRepository::new());
        let mut allocator = IdentifierAllocator::new(repo);
        let ctx = BatchContext::new(2);

        let a = allocator.allocate(&Namespace::new("ns1"), &ctx).unwrap();
        let b = allocator.allocate(&Namespace::new("ns2"), &ctx).unwrap();
        assert_eq!(a.namespace().as_str(), "ns1");
        assert_eq!(b.namespace().as_str(), "ns2");
    }
}
