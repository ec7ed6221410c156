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

//! The metadata of a table: schema, partition specs, properties and
//! snapshots.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::spec::{PartitionSpecRef, SchemaRef, Snapshot, SnapshotRef};
use crate::{Error, ErrorKind, Result};

/// Reference to [`TableMetadata`].
pub type TableMetadataRef = Arc<TableMetadata>;

/// The state of a table at one point in time. Immutable; a commit swaps the
/// table's current-metadata pointer to a successor produced by
/// [`TableMetadata::replacing`].
#[derive(Debug, PartialEq, Clone, TypedBuilder)]
#[builder(field_defaults(setter(prefix = "with_")))]
pub struct TableMetadata {
    #[builder(default = Uuid::new_v4())]
    table_uuid: Uuid,
    location: String,
    #[builder(default)]
    last_updated_ms: i64,
    schema: SchemaRef,
    partition_specs: HashMap<i32, PartitionSpecRef>,
    default_spec_id: i32,
    #[builder(default)]
    properties: HashMap<String, String>,
    #[builder(default)]
    snapshots: Vec<SnapshotRef>,
    #[builder(default)]
    current_snapshot_id: Option<i64>,
}

impl TableMetadata {
    /// The unique id of the table.
    pub fn table_uuid(&self) -> Uuid {
        self.table_uuid
    }

    /// The base location of the table.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The timestamp of the last table update in milliseconds since the
    /// unix epoch.
    pub fn last_updated_ms(&self) -> i64 {
        self.last_updated_ms
    }

    /// The current schema of the table.
    pub fn current_schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// The partition spec new data files are written with.
    pub fn default_spec(&self) -> Result<&PartitionSpecRef> {
        self.spec_by_id(self.default_spec_id)
    }

    /// Looks up a partition spec by id.
    pub fn spec_by_id(&self, spec_id: i32) -> Result<&PartitionSpecRef> {
        self.partition_specs.get(&spec_id).ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("Partition spec not found in table metadata: {spec_id}"),
            )
        })
    }

    /// The table properties.
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Reads a property as the requested type, falling back to `default`
    /// when the property is absent or unparsable.
    pub fn property_as<T: FromStr>(&self, name: &str, default: T) -> T {
        self.properties
            .get(name)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    /// All snapshots of the table.
    pub fn snapshots(&self) -> impl Iterator<Item = &SnapshotRef> {
        self.snapshots.iter()
    }

    /// Looks up a snapshot by id.
    pub fn snapshot_by_id(&self, snapshot_id: i64) -> Option<&SnapshotRef> {
        self.snapshots
            .iter()
            .find(|s| s.snapshot_id() == snapshot_id)
    }

    /// The id of the current snapshot, if the table has one.
    pub fn current_snapshot_id(&self) -> Option<i64> {
        self.current_snapshot_id
    }

    /// The current snapshot, if the table has one.
    pub fn current_snapshot(&self) -> Option<&SnapshotRef> {
        self.current_snapshot_id
            .and_then(|id| self.snapshot_by_id(id))
    }

    /// Produces the successor metadata with `snapshot` appended and made
    /// current.
    pub fn replacing(&self, snapshot: Snapshot) -> TableMetadata {
        let mut next = self.clone();
        next.last_updated_ms = snapshot.timestamp_ms();
        next.current_snapshot_id = Some(snapshot.snapshot_id());
        next.snapshots.push(Arc::new(snapshot));
        next
    }
}
