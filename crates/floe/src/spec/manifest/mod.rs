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

//! Manifest files: lists of data file entries sharing one partition spec.

mod data_file;
pub use data_file::*;
mod entry;
pub use entry::*;
mod writer;
pub use writer::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::io::FileIO;
use crate::spec::PartitionSpec;
use crate::Result;

/// Metadata stored in the header of a manifest.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestMetadata {
    /// The partition spec all entries of the manifest conform to.
    partition_spec: PartitionSpec,
}

impl ManifestMetadata {
    /// The partition spec of this manifest.
    pub fn partition_spec(&self) -> &PartitionSpec {
        &self.partition_spec
    }
}

/// An in-memory manifest: its metadata header and the ordered entries.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Manifest {
    metadata: ManifestMetadata,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Create a manifest from its metadata and entries.
    pub fn new(metadata: ManifestMetadata, entries: Vec<ManifestEntry>) -> Self {
        Self { metadata, entries }
    }

    /// The metadata header of this manifest.
    pub fn metadata(&self) -> &ManifestMetadata {
        &self.metadata
    }

    /// The ordered entries of this manifest.
    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    /// Consumes the manifest and returns its entries and metadata.
    pub fn into_parts(self) -> (Vec<ManifestEntry>, ManifestMetadata) {
        (self.entries, self.metadata)
    }

    /// Parse a manifest document.
    pub fn parse_json_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Reference to [`ManifestFile`].
pub type ManifestFileRef = Arc<ManifestFile>;

/// The metadata handle for an on-disk manifest, carried in a snapshot's
/// manifest list. Manifests are immutable once written, so the whole record
/// is the cache identity of the file it points to.
#[derive(Debug, PartialEq, Eq, Clone, Hash, TypedBuilder)]
pub struct ManifestFile {
    /// Location of the manifest file.
    pub manifest_path: String,
    /// Length of the manifest file in bytes.
    pub manifest_length: u64,
    /// Id of the partition spec used to write the manifest.
    pub partition_spec_id: i32,
    /// Id of the snapshot that created the manifest.
    pub added_snapshot_id: i64,
    /// Number of entries in the manifest that have status `Added`.
    #[builder(default, setter(strip_option))]
    pub added_files_count: Option<u32>,
    /// Number of entries in the manifest that have status `Existing`.
    #[builder(default, setter(strip_option))]
    pub existing_files_count: Option<u32>,
    /// Number of entries in the manifest that have status `Deleted`.
    #[builder(default, setter(strip_option))]
    pub deleted_files_count: Option<u32>,
}

impl ManifestFile {
    /// Whether the manifest has entries with status `Added`. Defaults to
    /// true when the count is unknown.
    pub fn has_added_files(&self) -> bool {
        self.added_files_count.map(|c| c > 0).unwrap_or(true)
    }

    /// Whether the manifest has entries with status `Existing`. Defaults to
    /// true when the count is unknown.
    pub fn has_existing_files(&self) -> bool {
        self.existing_files_count.map(|c| c > 0).unwrap_or(true)
    }

    /// Loads and parses the manifest this handle points to.
    pub async fn load_manifest(&self, file_io: &FileIO) -> Result<Manifest> {
        let bytes = file_io.new_input(&self.manifest_path)?.read().await?;
        Manifest::parse_json_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::io::FileIOBuilder;
    use crate::spec::Datum;

    fn test_data_file(path: &str) -> DataFile {
        DataFile::builder()
            .file_path(path.to_string())
            .file_format(DataFileFormat::Parquet)
            .partition(vec![Some(Datum::int(1))].into_iter().collect())
            .partition_spec_id(0)
            .record_count(100)
            .file_size_in_bytes(1024)
            .value_counts(HashMap::from([(1, 100)]))
            .null_value_counts(HashMap::from([(1, 0)]))
            .build()
    }

    #[tokio::test]
    async fn test_write_and_load_manifest() {
        let file_io = FileIOBuilder::new("memory").build().unwrap();
        let output = file_io.new_output("memory:/tbl/metadata/m0.json").unwrap();

        let mut writer = ManifestWriter::new(output, 7, PartitionSpec::unpartition_spec());
        writer
            .add_all(vec![
                test_data_file("/data/f1.parquet"),
                test_data_file("/data/f2.parquet"),
            ])
            .unwrap();
        let manifest_file = writer.write_manifest_file().await.unwrap();

        assert_eq!(manifest_file.manifest_path, "memory:/tbl/metadata/m0.json");
        assert_eq!(manifest_file.added_snapshot_id, 7);
        assert_eq!(manifest_file.added_files_count, Some(2));
        assert_eq!(manifest_file.existing_files_count, Some(0));
        assert!(manifest_file.manifest_length > 0);

        let manifest = manifest_file.load_manifest(&file_io).await.unwrap();
        let entries: Vec<_> = manifest.entries().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status(), ManifestStatus::Added);
        assert_eq!(entries[0].snapshot_id(), 7);
        assert_eq!(entries[0].file_path(), "/data/f1.parquet");
        assert_eq!(entries[1].file_path(), "/data/f2.parquet");
    }

    #[test]
    fn test_has_files_defaults() {
        let manifest = ManifestFile::builder()
            .manifest_path("/tbl/metadata/m1.json".to_string())
            .manifest_length(100)
            .partition_spec_id(0)
            .added_snapshot_id(1)
            .build();
        assert!(manifest.has_added_files());
        assert!(manifest.has_existing_files());

        let manifest = ManifestFile::builder()
            .manifest_path("/tbl/metadata/m2.json".to_string())
            .manifest_length(100)
            .partition_spec_id(0)
            .added_snapshot_id(1)
            .added_files_count(0)
            .existing_files_count(0)
            .deleted_files_count(4)
            .build();
        assert!(!manifest.has_added_files());
        assert!(!manifest.has_existing_files());
    }
}
