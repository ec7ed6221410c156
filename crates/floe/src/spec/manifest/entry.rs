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

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::spec::DataFile;

/// Reference to [`ManifestEntry`].
pub type ManifestEntryRef = Arc<ManifestEntry>;

/// A manifest entry tracks one data file together with the status of its
/// membership in the snapshot that wrote the manifest.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestEntry {
    /// Used to track additions and deletions.
    pub status: ManifestStatus,
    /// For `Added` and `Deleted` entries, the id of the snapshot that
    /// performed the addition or deletion. For `Existing` entries, the id
    /// of the snapshot that originally added the file.
    pub snapshot_id: i64,
    /// File path, partition tuple, metrics.
    pub data_file: DataFile,
}

impl ManifestEntry {
    /// Check if this manifest entry is still part of the table.
    pub fn is_alive(&self) -> bool {
        matches!(
            self.status,
            ManifestStatus::Added | ManifestStatus::Existing
        )
    }

    /// Status of this manifest entry.
    pub fn status(&self) -> ManifestStatus {
        self.status
    }

    /// Snapshot id of this manifest entry.
    #[inline]
    pub fn snapshot_id(&self) -> i64 {
        self.snapshot_id
    }

    /// Data file path of this manifest entry.
    #[inline]
    pub fn file_path(&self) -> &str {
        &self.data_file.file_path
    }

    /// Data file record count of this manifest entry.
    #[inline]
    pub fn record_count(&self) -> u64 {
        self.data_file.record_count
    }

    /// Get a reference to the actual data file.
    #[inline]
    pub fn data_file(&self) -> &DataFile {
        &self.data_file
    }
}

/// Used to track additions and deletions in ManifestEntry.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestStatus {
    /// The file was added by an earlier snapshot and is still live.
    Existing,
    /// The file was added by the snapshot that wrote this manifest.
    Added,
    /// The file was removed by the snapshot that wrote this manifest.
    /// Deletes are informational only and not used in scans.
    Deleted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{DataFileFormat, Struct};

    fn entry(status: ManifestStatus) -> ManifestEntry {
        ManifestEntry::builder()
            .status(status)
            .snapshot_id(42)
            .data_file(
                DataFile::builder()
                    .file_path("/data/f.parquet".to_string())
                    .file_format(DataFileFormat::Parquet)
                    .partition(Struct::empty())
                    .partition_spec_id(0)
                    .record_count(10)
                    .file_size_in_bytes(128)
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_is_alive() {
        assert!(entry(ManifestStatus::Added).is_alive());
        assert!(entry(ManifestStatus::Existing).is_alive());
        assert!(!entry(ManifestStatus::Deleted).is_alive());
    }

    #[test]
    fn test_entry_json_roundtrip() {
        let entry = entry(ManifestStatus::Deleted);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""status":"deleted""#));
        assert_eq!(serde_json::from_str::<ManifestEntry>(&json).unwrap(), entry);
    }
}
