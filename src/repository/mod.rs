//! Repository store collaborator
//!
//! The physical network client is out of scope; the pipeline talks to the
//! store through [`RepositoryClient`]. [`MemoryRepository`] is the in-tree
//! implementation used by tests and dry runs, with failure injection for
//! exercising the error paths.

use crate::datastream::DatastreamDescriptor;
use crate::ingest::IngestError;
use crate::types::{Namespace, Pid};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// A repository object as the store sees it
#[derive(Debug, Clone)]
pub struct ObjectRecord {
    pub pid: Pid,
    pub label: String,
    pub datastreams: Vec<DatastreamDescriptor>,
    /// Store-assigned creation token
    pub token: Uuid,
}

/// Boundary to the repository store
pub trait RepositoryClient: Send + Sync {
    /// Reserve `count` fresh identifiers in `namespace`
    fn allocate_identifiers(
        &self,
        namespace: &Namespace,
        count: usize,
    ) -> Result<Vec<Pid>, IngestError>;

    /// Fetch an existing object, if any
    fn load_object(&self, pid: &Pid) -> Result<Option<ObjectRecord>, IngestError>;

    /// Create an empty object under `pid` with the given label
    fn create_object(&self, pid: &Pid, label: &str) -> Result<(), IngestError>;

    /// Attach a finalized datastream to an existing object
    fn attach_datastream(
        &self,
        pid: &Pid,
        descriptor: &DatastreamDescriptor,
    ) -> Result<(), IngestError>;

    /// Raw collection-policy XML of a parent container, if it has one
    fn load_policy(&self, parent: &Pid) -> Result<Option<String>, IngestError>;
}

/// In-memory repository store
///
/// Single-writer, read-mostly locking so committing drafts from multiple
/// workers stays safe.
#[derive(Default)]
pub struct MemoryRepository {
    objects: RwLock<HashMap<Pid, ObjectRecord>>,
    serials: Mutex<HashMap<Namespace, u64>>,
    policies: RwLock<HashMap<Pid, String>>,
    policy_loads: Mutex<HashMap<Pid, usize>>,
    allocation_requests: Mutex<Vec<(Namespace, usize)>>,
    fail_allocations: AtomicBool,
    reject_datastreams_for: RwLock<HashSet<Pid>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection-policy document for a parent container
    pub fn set_policy(&self, parent: Pid, policy_xml: impl Into<String>) {
        self.policies.write().insert(parent, policy_xml.into());
    }

    /// Make all further identifier allocations fail (store unreachable)
    pub fn fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::SeqCst);
    }

    /// Reject every datastream attachment for the given object
    pub fn reject_datastreams_for(&self, pid: Pid) {
        self.reject_datastreams_for.write().insert(pid);
    }

    /// Allocation batches requested so far, in order: (namespace, size)
    pub fn allocation_requests(&self) -> Vec<(Namespace, usize)> {
        self.allocation_requests.lock().clone()
    }

    /// How many times the policy of `parent` was loaded
    pub fn policy_load_count(&self, parent: &Pid) -> usize {
        self.policy_loads.lock().get(parent).copied().unwrap_or(0)
    }

    /// Snapshot of a stored object
    pub fn object(&self, pid: &Pid) -> Option<ObjectRecord> {
        self.objects.read().get(pid).cloned()
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }
}

impl RepositoryClient for MemoryRepository {
    fn allocate_identifiers(
        &self,
        namespace: &Namespace,
        count: usize,
    ) -> Result<Vec<Pid>, IngestError> {
        if self.fail_allocations.load(Ordering::SeqCst) {
            return Err(IngestError::PidAllocation(format!(
                "store unreachable while refilling namespace '{}'",
                namespace
            )));
        }

        self.allocation_requests
            .lock()
            .push((namespace.clone(), count));

        let mut serials = self.serials.lock();
        let next = serials.entry(namespace.clone()).or_insert(0);
        let pids = (0..count)
            .map(|_| {
                *next += 1;
                Pid::new(namespace, *next)
            })
            .collect();
        Ok(pids)
    }

    fn load_object(&self, pid: &Pid) -> Result<Option<ObjectRecord>, IngestError> {
        Ok(self.objects.read().get(pid).cloned())
    }

    fn create_object(&self, pid: &Pid, label: &str) -> Result<(), IngestError> {
        let mut objects = self.objects.write();
        if objects.contains_key(pid) {
            return Err(IngestError::StoreRejected(format!(
                "object '{}' already exists",
                pid
            )));
        }
        objects.insert(
            pid.clone(),
            ObjectRecord {
                pid: pid.clone(),
                label: label.to_string(),
                datastreams: Vec::new(),
                token: Uuid::new_v4(),
            },
        );
        Ok(())
    }

    fn attach_datastream(
        &self,
        pid: &Pid,
        descriptor: &DatastreamDescriptor,
    ) -> Result<(), IngestError> {
        if self.reject_datastreams_for.read().contains(pid) {
            return Err(IngestError::StoreRejected(format!(
                "datastream '{}' rejected for '{}'",
                descriptor.dsid, pid
            )));
        }

        let mut objects = self.objects.write();
        let object = objects.get_mut(pid).ok_or_else(|| {
            IngestError::StoreRejected(format!("no such object '{}'", pid))
        })?;
        object.datastreams.push(descriptor.clone());
        Ok(())
    }

    fn load_policy(&self, parent: &Pid) -> Result<Option<String>, IngestError> {
        *self.policy_loads.lock().entry(parent.clone()).or_insert(0) += 1;
        Ok(self.policies.read().get(parent).cloned())
    }
}
