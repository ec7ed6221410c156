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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::io::{FileIO, OutputFile};
use crate::spec::{ManifestFile, Operation, Snapshot, Summary, TableMetadata};
use crate::Result;

const META_ROOT_PATH: &str = "metadata";
const MANIFEST_FILE_SUFFIX: &str = "json";

/// Generates a snapshot id that no snapshot of the table uses yet.
pub(crate) fn generate_unique_snapshot_id(metadata: &TableMetadata) -> i64 {
    let generate_random_id = || -> i64 {
        let (lhs, rhs) = Uuid::new_v4().as_u64_pair();
        let snapshot_id = (lhs ^ rhs) as i64;
        snapshot_id.abs()
    };
    let mut snapshot_id = generate_random_id();

    while metadata
        .snapshots()
        .any(|s| s.snapshot_id() == snapshot_id)
    {
        snapshot_id = generate_random_id();
    }
    snapshot_id
}

/// The path of a manifest output file, unique per `(snapshot_id, counter)`.
pub(crate) fn new_manifest_path(location: &str, snapshot_id: i64, counter: u64) -> String {
    format!("{location}/{META_ROOT_PATH}/{snapshot_id}-m{counter}.{MANIFEST_FILE_SUFFIX}")
}

/// Hands out uniquely named manifest output files for one snapshot update.
pub(crate) struct ManifestOutputContext<'a> {
    file_io: &'a FileIO,
    location: &'a str,
    snapshot_id: i64,
    manifest_counter: &'a AtomicU64,
}

impl<'a> ManifestOutputContext<'a> {
    pub(crate) fn new(
        file_io: &'a FileIO,
        location: &'a str,
        snapshot_id: i64,
        manifest_counter: &'a AtomicU64,
    ) -> Self {
        Self {
            file_io,
            location,
            snapshot_id,
            manifest_counter,
        }
    }

    pub(crate) fn file_io(&self) -> &FileIO {
        self.file_io
    }

    pub(crate) fn new_manifest_output(&self) -> Result<OutputFile> {
        self.file_io.new_output(new_manifest_path(
            self.location,
            self.snapshot_id,
            self.manifest_counter.fetch_add(1, Ordering::SeqCst),
        ))
    }
}

/// Assembles the snapshot record for an applied manifest list.
///
/// The summary counts only changes made by this snapshot: entries of
/// manifests written by it. Untouched manifests carried over from the base
/// contribute to the totals alone.
pub(crate) fn build_snapshot(
    snapshot_id: i64,
    parent_snapshot_id: Option<i64>,
    operation: Operation,
    manifests: Vec<ManifestFile>,
) -> Snapshot {
    let mut added_files: u64 = 0;
    let mut deleted_files: u64 = 0;
    let mut total_files: u64 = 0;
    for manifest in &manifests {
        if manifest.added_snapshot_id == snapshot_id {
            added_files += manifest.added_files_count.unwrap_or(0) as u64;
            deleted_files += manifest.deleted_files_count.unwrap_or(0) as u64;
        }
        total_files += manifest.added_files_count.unwrap_or(0) as u64
            + manifest.existing_files_count.unwrap_or(0) as u64;
    }

    let additional_properties = HashMap::from([
        ("added-data-files".to_string(), added_files.to_string()),
        ("deleted-data-files".to_string(), deleted_files.to_string()),
        ("total-data-files".to_string(), total_files.to_string()),
        ("total-manifests".to_string(), manifests.len().to_string()),
    ]);

    Snapshot::builder()
        .with_snapshot_id(snapshot_id)
        .with_parent_snapshot_id(parent_snapshot_id)
        .with_timestamp_ms(chrono::Utc::now().timestamp_millis())
        .with_manifests(manifests)
        .with_summary(Summary {
            operation,
            additional_properties,
        })
        .build()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::spec::{NestedField, PartitionSpec, PrimitiveType, Schema};

    fn metadata_with_snapshot_ids(ids: &[i64]) -> TableMetadata {
        let mut metadata = TableMetadata::builder()
            .with_location("memory:/tbl".to_string())
            .with_schema(Arc::new(
                Schema::builder()
                    .with_fields(vec![NestedField::required(1, "id", PrimitiveType::Long)])
                    .build()
                    .unwrap(),
            ))
            .with_partition_specs(HashMap::from([(
                0,
                Arc::new(PartitionSpec::unpartition_spec()),
            )]))
            .with_default_spec_id(0)
            .build();
        for id in ids {
            metadata = metadata.replacing(build_snapshot(*id, None, Operation::Append, vec![]));
        }
        metadata
    }

    #[test]
    fn test_unique_snapshot_id() {
        let metadata = metadata_with_snapshot_ids(&[1, 2, 3]);
        let id = generate_unique_snapshot_id(&metadata);
        assert!(id > 0);
        assert!(metadata.snapshot_by_id(id).is_none());
    }

    #[test]
    fn test_manifest_path_is_unique_per_counter() {
        let p0 = new_manifest_path("memory:/tbl", 7, 0);
        let p1 = new_manifest_path("memory:/tbl", 7, 1);
        assert_eq!(p0, "memory:/tbl/metadata/7-m0.json");
        assert_ne!(p0, p1);
    }

    #[test]
    fn test_snapshot_summary_counts() {
        let own = ManifestFile::builder()
            .manifest_path("memory:/tbl/metadata/7-m0.json".to_string())
            .manifest_length(10)
            .partition_spec_id(0)
            .added_snapshot_id(7)
            .added_files_count(3)
            .existing_files_count(2)
            .deleted_files_count(1)
            .build();
        let carried = ManifestFile::builder()
            .manifest_path("memory:/tbl/metadata/5-m0.json".to_string())
            .manifest_length(10)
            .partition_spec_id(0)
            .added_snapshot_id(5)
            .added_files_count(4)
            .existing_files_count(0)
            .deleted_files_count(2)
            .build();

        let snapshot = build_snapshot(7, Some(5), Operation::Overwrite, vec![own, carried]);

        let props = &snapshot.summary().additional_properties;
        assert_eq!(props["added-data-files"], "3");
        assert_eq!(props["deleted-data-files"], "1");
        assert_eq!(props["total-data-files"], "9");
        assert_eq!(props["total-manifests"], "2");
        assert_eq!(snapshot.parent_snapshot_id(), Some(5));
    }
}
