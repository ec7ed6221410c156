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

//! Snapshots of a table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use typed_builder::TypedBuilder;

use crate::spec::ManifestFile;

/// Reference to [`Snapshot`].
pub type SnapshotRef = Arc<Snapshot>;

/// The operation a snapshot performed on the table.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operation {
    /// Only data files were added and no files were removed.
    Append,
    /// Data files were added and removed in a logical overwrite.
    Overwrite,
    /// Data files were removed and their contents logically deleted.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Append => write!(f, "append"),
            Operation::Overwrite => write!(f, "overwrite"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// A summary of what a snapshot changed.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Summary {
    /// The operation of the snapshot.
    pub operation: Operation,
    /// Additional properties of the summary, e.g. file counts.
    pub additional_properties: HashMap<String, String>,
}

/// A snapshot: the complete, ordered set of manifests defining the live
/// data files of a table at one point in time.
///
/// The order of `manifests` is significant and preserved across merges.
#[derive(Debug, PartialEq, Eq, Clone, TypedBuilder)]
#[builder(field_defaults(setter(prefix = "with_")))]
pub struct Snapshot {
    snapshot_id: i64,
    #[builder(default)]
    parent_snapshot_id: Option<i64>,
    timestamp_ms: i64,
    manifests: Vec<ManifestFile>,
    summary: Summary,
}

impl Snapshot {
    /// The id of this snapshot.
    pub fn snapshot_id(&self) -> i64 {
        self.snapshot_id
    }

    /// The id of the snapshot this one derives from.
    pub fn parent_snapshot_id(&self) -> Option<i64> {
        self.parent_snapshot_id
    }

    /// The timestamp this snapshot was created at, in milliseconds since
    /// the unix epoch.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// The ordered manifests of this snapshot.
    pub fn manifests(&self) -> &[ManifestFile] {
        &self.manifests
    }

    /// The summary of this snapshot.
    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}
