//! In-memory log unit
//!
//! Holds one slot per position behind a mutex; write-if-empty happens inside a
//! single critical section. Can be switched offline to exercise network-error
//! paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{ReplicationError, ReplicationResult};
use crate::traits::{LogData, LogUnit, WriteOutcome};
use crate::types::LogPosition;

/// Log unit backed by a `HashMap`
pub struct InMemoryLogUnit {
    name: String,
    slots: Mutex<HashMap<LogPosition, LogData>>,

    /// Fail every request with a network error while set
    offline: AtomicBool,

    peek_count: AtomicUsize,
    write_count: AtomicUsize,
}

impl InMemoryLogUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            peek_count: AtomicUsize::new(0),
            write_count: AtomicUsize::new(0),
        }
    }

    /// Simulate losing (or regaining) connectivity to this unit
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of slots holding a value
    pub fn len(&self) -> usize {
        self.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of peek calls served or refused
    pub fn peek_calls(&self) -> usize {
        self.peek_count.load(Ordering::SeqCst)
    }

    /// Number of write calls served or refused
    pub fn write_calls(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> ReplicationResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ReplicationError::Network(format!(
                "log unit {} unreachable",
                self.name
            )));
        }
        Ok(())
    }

    fn lock(&self) -> ReplicationResult<std::sync::MutexGuard<'_, HashMap<LogPosition, LogData>>> {
        self.slots.lock().map_err(|_| ReplicationError::Inconsistent {
            position: LogPosition::ZERO,
            detail: format!("log unit {} lock poisoned", self.name),
        })
    }
}

#[async_trait]
impl LogUnit for InMemoryLogUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn peek(&self, position: LogPosition) -> ReplicationResult<Option<LogData>> {
        self.peek_count.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        Ok(self.lock()?.get(&position).cloned())
    }

    async fn write(&self, position: LogPosition, data: LogData) -> ReplicationResult<WriteOutcome> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let mut slots = self.lock()?;
        match slots.get(&position) {
            Some(existing) => Ok(WriteOutcome::Conflict(existing.clone())),
            None => {
                slots.insert(position, data);
                Ok(WriteOutcome::Written)
            }
        }
    }
}
