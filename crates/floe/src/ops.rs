// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Table operations: the seam between snapshot production and the catalog
//! that stores the table's current-metadata pointer.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::io::FileIO;
use crate::spec::{Snapshot, TableMetadata, TableMetadataRef};
use crate::{Error, ErrorKind, Result};

/// Operations a snapshot update needs from the component that owns the
/// table's current-metadata pointer.
///
/// The commit is an atomic compare-and-swap: it succeeds only if the table
/// still points at `base`, and fails with a retryable
/// [`ErrorKind::CatalogCommitConflicts`] error otherwise.
#[async_trait]
pub trait TableOperations: Send + Sync {
    /// The file io used to read and write table files.
    fn io(&self) -> &FileIO;

    /// The most recently loaded table metadata.
    fn current(&self) -> TableMetadataRef;

    /// Reloads and returns the table metadata.
    async fn refresh(&self) -> Result<TableMetadataRef>;

    /// Atomically swaps the table from `base` to `base.replacing(snapshot)`.
    async fn commit(&self, base: &TableMetadata, snapshot: Snapshot) -> Result<()>;
}

/// A [`TableOperations`] keeping the current metadata pointer in memory.
///
/// Useful for tests and for embedding the library without a catalog
/// service. Commit conflicts can be injected with
/// [`MemoryTableOperations::fail_next_commits`].
#[derive(Debug)]
pub struct MemoryTableOperations {
    io: FileIO,
    state: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    current: TableMetadataRef,
    fail_next_commits: usize,
}

impl MemoryTableOperations {
    /// Creates table operations for the given metadata.
    pub fn new(io: FileIO, metadata: TableMetadata) -> Arc<Self> {
        Arc::new(Self {
            io,
            state: Mutex::new(MemoryState {
                current: Arc::new(metadata),
                fail_next_commits: 0,
            }),
        })
    }

    /// Makes the next `count` commits fail with a retryable conflict.
    pub fn fail_next_commits(&self, count: usize) {
        self.lock_state().fail_next_commits = count;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // a poisoned lock means a writer panicked, nothing to recover
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TableOperations for MemoryTableOperations {
    fn io(&self) -> &FileIO {
        &self.io
    }

    fn current(&self) -> TableMetadataRef {
        self.lock_state().current.clone()
    }

    async fn refresh(&self) -> Result<TableMetadataRef> {
        Ok(self.current())
    }

    async fn commit(&self, base: &TableMetadata, snapshot: Snapshot) -> Result<()> {
        let mut state = self.lock_state();

        if state.fail_next_commits > 0 {
            state.fail_next_commits -= 1;
            return Err(Error::new(
                ErrorKind::CatalogCommitConflicts,
                "Injected commit conflict",
            )
            .with_retryable(true));
        }

        if state.current.current_snapshot_id() != base.current_snapshot_id() {
            return Err(Error::new(
                ErrorKind::CatalogCommitConflicts,
                format!(
                    "Cannot commit: table changed, expected current snapshot {:?}, found {:?}",
                    base.current_snapshot_id(),
                    state.current.current_snapshot_id()
                ),
            )
            .with_retryable(true));
        }

        state.current = Arc::new(base.replacing(snapshot));
        Ok(())
    }
}
