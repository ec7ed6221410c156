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

use bytes::Bytes;

use crate::io::OutputFile;
use crate::spec::{
    DataFile, Manifest, ManifestEntry, ManifestFile, ManifestMetadata, ManifestStatus,
    PartitionSpec,
};
use crate::Result;

/// A manifest writer.
///
/// Entries are kept in insertion order. Closing the writer serializes the
/// manifest, emits it at the pre-chosen output path and reports the file
/// length together with per-status counters.
pub struct ManifestWriter {
    output: OutputFile,

    snapshot_id: i64,

    added_files: u32,
    added_rows: u64,
    existing_files: u32,
    existing_rows: u64,
    deleted_files: u32,
    deleted_rows: u64,

    manifest_entries: Vec<ManifestEntry>,

    metadata: ManifestMetadata,
}

impl ManifestWriter {
    /// Create a new manifest writer for the given output path, writing
    /// snapshot and partition spec.
    pub fn new(output: OutputFile, snapshot_id: i64, partition_spec: PartitionSpec) -> Self {
        Self {
            output,
            snapshot_id,
            added_files: 0,
            added_rows: 0,
            existing_files: 0,
            existing_rows: 0,
            deleted_files: 0,
            deleted_rows: 0,
            manifest_entries: Vec::new(),
            metadata: ManifestMetadata::builder()
                .partition_spec(partition_spec)
                .build(),
        }
    }

    /// Add a new manifest entry. The entry's status becomes `Added` and its
    /// snapshot id becomes the writing snapshot's id.
    pub fn add_entry(&mut self, mut entry: ManifestEntry) -> Result<()> {
        entry.status = ManifestStatus::Added;
        entry.snapshot_id = self.snapshot_id;
        self.add_entry_inner(entry);
        Ok(())
    }

    /// Add every data file as an `Added` entry of the writing snapshot.
    pub fn add_all(&mut self, data_files: impl IntoIterator<Item = DataFile>) -> Result<()> {
        for data_file in data_files {
            self.add_entry(
                ManifestEntry::builder()
                    .status(ManifestStatus::Added)
                    .snapshot_id(self.snapshot_id)
                    .data_file(data_file)
                    .build(),
            )?;
        }
        Ok(())
    }

    /// Add an existing manifest entry. The entry's status becomes
    /// `Existing`; its snapshot id is preserved, still naming the snapshot
    /// that originally added the file.
    pub fn add_existing_entry(&mut self, mut entry: ManifestEntry) -> Result<()> {
        entry.status = ManifestStatus::Existing;
        self.add_entry_inner(entry);
        Ok(())
    }

    /// Add a delete manifest entry. The entry's status becomes `Deleted`
    /// and its snapshot id becomes the writing snapshot's id.
    pub fn add_delete_entry(&mut self, mut entry: ManifestEntry) -> Result<()> {
        entry.status = ManifestStatus::Deleted;
        entry.snapshot_id = self.snapshot_id;
        self.add_entry_inner(entry);
        Ok(())
    }

    fn add_entry_inner(&mut self, entry: ManifestEntry) {
        match entry.status {
            ManifestStatus::Added => {
                self.added_files += 1;
                self.added_rows += entry.data_file.record_count;
            }
            ManifestStatus::Existing => {
                self.existing_files += 1;
                self.existing_rows += entry.data_file.record_count;
            }
            ManifestStatus::Deleted => {
                self.deleted_files += 1;
                self.deleted_rows += entry.data_file.record_count;
            }
        }
        self.manifest_entries.push(entry);
    }

    /// Serialize the manifest, write it out, and return the
    /// [`ManifestFile`] handle pointing at it.
    pub async fn write_manifest_file(self) -> Result<ManifestFile> {
        let partition_spec_id = self.metadata.partition_spec().spec_id;
        let manifest = Manifest::new(self.metadata, self.manifest_entries);
        let bytes = serde_json::to_vec(&manifest)?;
        let manifest_length = bytes.len() as u64;

        self.output.write(Bytes::from(bytes)).await?;

        Ok(ManifestFile::builder()
            .manifest_path(self.output.location().to_string())
            .manifest_length(manifest_length)
            .partition_spec_id(partition_spec_id)
            .added_snapshot_id(self.snapshot_id)
            .added_files_count(self.added_files)
            .existing_files_count(self.existing_files)
            .deleted_files_count(self.deleted_files)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::FileIOBuilder;
    use crate::spec::{DataFileFormat, Struct};

    fn test_entry(path: &str, snapshot_id: i64) -> ManifestEntry {
        ManifestEntry::builder()
            .status(ManifestStatus::Added)
            .snapshot_id(snapshot_id)
            .data_file(
                DataFile::builder()
                    .file_path(path.to_string())
                    .file_format(DataFileFormat::Parquet)
                    .partition(Struct::empty())
                    .partition_spec_id(0)
                    .record_count(10)
                    .file_size_in_bytes(256)
                    .build(),
            )
            .build()
    }

    #[tokio::test]
    async fn test_counters_and_statuses() {
        let file_io = FileIOBuilder::new("memory").build().unwrap();
        let output = file_io.new_output("memory:/tbl/metadata/m1.json").unwrap();

        let mut writer = ManifestWriter::new(output, 9, PartitionSpec::unpartition_spec());
        writer.add_entry(test_entry("/data/added.parquet", 1)).unwrap();
        writer
            .add_existing_entry(test_entry("/data/existing.parquet", 1))
            .unwrap();
        writer
            .add_delete_entry(test_entry("/data/deleted.parquet", 1))
            .unwrap();

        let manifest_file = writer.write_manifest_file().await.unwrap();
        assert_eq!(manifest_file.added_files_count, Some(1));
        assert_eq!(manifest_file.existing_files_count, Some(1));
        assert_eq!(manifest_file.deleted_files_count, Some(1));

        let manifest = manifest_file.load_manifest(&file_io).await.unwrap();
        let entries: Vec<_> = manifest.entries().collect();

        // insertion order is preserved
        assert_eq!(entries[0].file_path(), "/data/added.parquet");
        assert_eq!(entries[0].status(), ManifestStatus::Added);
        assert_eq!(entries[0].snapshot_id(), 9);

        // existing entries keep the snapshot that added them
        assert_eq!(entries[1].status(), ManifestStatus::Existing);
        assert_eq!(entries[1].snapshot_id(), 1);

        // deletes are re-stamped with the writing snapshot
        assert_eq!(entries[2].status(), ManifestStatus::Deleted);
        assert_eq!(entries[2].snapshot_id(), 9);
    }
}
