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

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use log::warn;

use crate::expr::Predicate;
use crate::ops::TableOperations;
use crate::spec::{
    DataFile, ManifestFile, ManifestStatus, ManifestWriter, Operation, PartitionSpecRef,
    Snapshot, Struct, TableMetadata,
};
use crate::transaction::lock;
use crate::transaction::manifest_filter::ManifestFilter;
use crate::transaction::snapshot::{
    build_snapshot, generate_unique_snapshot_id, ManifestOutputContext,
};
use crate::utils::bin::ListPacker;
use crate::{Error, ErrorKind, Result};

/// Target size of manifest files produced by merging.
pub const MANIFEST_TARGET_SIZE_BYTES: &str = "commit.manifest.target-size-bytes";
const MANIFEST_TARGET_SIZE_BYTES_DEFAULT: u64 = 8 * 1024 * 1024; // 8 MiB
/// Minimum number of manifests before a bin holding the in-memory new-files
/// manifest is merged.
pub const MANIFEST_MIN_MERGE_COUNT: &str = "commit.manifest.min-count-to-merge";
const MANIFEST_MIN_MERGE_COUNT_DEFAULT: usize = 100;
/// Number of times a commit is retried after a conflict.
pub const COMMIT_NUM_RETRIES: &str = "commit.retry.num-retries";
const COMMIT_NUM_RETRIES_DEFAULT: usize = 4;

const DEFAULT_FILTER_CONCURRENCY: usize = 8;

/// An in-flight snapshot update that appends data files and applies deletes
/// expressed as file paths, partition tuples or row predicates, merging
/// small manifests along the way.
///
/// [`apply`](Self::apply) is functional with respect to its input base:
/// re-applying against an unchanged base yields the identical manifest
/// list, and a retry against a moved base reuses every filtered and merged
/// output whose inputs did not change. [`commit`](Self::commit) drives the
/// retry loop; [`clean_uncommitted`](Self::clean_uncommitted) removes
/// every output file the committed snapshot does not reference.
pub struct MergingSnapshotUpdate {
    ops: Arc<dyn TableOperations>,

    snapshot_id: i64,
    write_spec: PartitionSpecRef,
    manifest_target_size_bytes: u64,
    min_count_to_merge: usize,
    commit_retries: usize,
    concurrency: usize,

    manifest_counter: AtomicU64,

    // update data
    new_files: Vec<DataFile>,
    delete_paths: HashSet<String>,
    drop_partitions: HashSet<Struct>,
    delete_expression: Predicate,
    fail_any_delete: bool,
    fail_missing_delete_paths: bool,

    // cache the new-files manifest once it is written
    new_manifest: Option<ManifestFile>,
    has_new_files: bool,

    // cache merge results to reuse when retrying
    merge_manifests: Mutex<HashMap<Vec<ManifestFile>, ManifestFile>>,

    // cache filtered manifests to avoid extra work when commits fail
    filtered_manifests: Mutex<HashMap<ManifestFile, ManifestFile>>,

    // tracking where files were deleted to validate retries quickly
    filtered_manifest_to_deleted_files: Mutex<HashMap<ManifestFile, HashSet<String>>>,

    // set when a delete criterion changes, to invalidate filtered outputs
    filter_updated: bool,
}

impl MergingSnapshotUpdate {
    /// Creates an update against the table owned by `ops`.
    pub fn new(ops: Arc<dyn TableOperations>) -> Result<Self> {
        let current = ops.current();
        let snapshot_id = generate_unique_snapshot_id(&current);
        let write_spec = current.default_spec()?.clone();
        let manifest_target_size_bytes =
            current.property_as(MANIFEST_TARGET_SIZE_BYTES, MANIFEST_TARGET_SIZE_BYTES_DEFAULT);
        let min_count_to_merge =
            current.property_as(MANIFEST_MIN_MERGE_COUNT, MANIFEST_MIN_MERGE_COUNT_DEFAULT);
        let commit_retries = current.property_as(COMMIT_NUM_RETRIES, COMMIT_NUM_RETRIES_DEFAULT);

        Ok(Self {
            ops,
            snapshot_id,
            write_spec,
            manifest_target_size_bytes,
            min_count_to_merge,
            commit_retries,
            concurrency: DEFAULT_FILTER_CONCURRENCY,
            manifest_counter: AtomicU64::new(0),
            new_files: Vec::new(),
            delete_paths: HashSet::new(),
            drop_partitions: HashSet::new(),
            delete_expression: Predicate::AlwaysFalse,
            fail_any_delete: false,
            fail_missing_delete_paths: false,
            new_manifest: None,
            has_new_files: false,
            merge_manifests: Mutex::new(HashMap::new()),
            filtered_manifests: Mutex::new(HashMap::new()),
            filtered_manifest_to_deleted_files: Mutex::new(HashMap::new()),
            filter_updated: false,
        })
    }

    /// Sets how many manifests are filtered at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The id of the snapshot this update will produce.
    pub fn snapshot_id(&self) -> i64 {
        self.snapshot_id
    }

    /// Adds a data file to the new snapshot.
    pub fn add(&mut self, file: DataFile) {
        self.has_new_files = true;
        self.new_files.push(file);
    }

    /// Adds a data file to the new snapshot.
    pub fn append_file(&mut self, file: DataFile) {
        self.add(file);
    }

    /// Adds a specific path to be deleted in the new snapshot.
    pub fn delete(&mut self, path: impl Into<String>) {
        self.filter_updated = true;
        self.delete_paths.insert(path.into());
    }

    /// Adds a row filter matching files to delete. A file is deleted when
    /// all of the rows it contains match this or any other filter passed to
    /// this method.
    pub fn delete_by_row_filter(&mut self, expression: Predicate) {
        self.filter_updated = true;
        self.delete_expression = self.delete_expression.clone().or(expression);
    }

    /// Adds a partition tuple to drop from the table during the delete
    /// phase.
    pub fn drop_partition(&mut self, partition: Struct) {
        self.filter_updated = true;
        self.drop_partitions.insert(partition);
    }

    /// Makes the update fail if any file would be deleted.
    pub fn fail_any_delete(&mut self) {
        self.fail_any_delete = true;
    }

    /// Makes the update fail unless every path passed to
    /// [`delete`](Self::delete) matches a file that is actually deleted.
    pub fn fail_missing_delete_paths(&mut self) {
        self.fail_missing_delete_paths = true;
    }

    /// Produces the ordered manifest list of the new snapshot against
    /// `base`.
    ///
    /// Groups of a higher partition spec id precede lower ones; within a
    /// spec, the new-files manifest precedes the filtered base manifests,
    /// which keep their original relative order.
    pub async fn apply(&mut self, base: &TableMetadata) -> Result<Vec<ManifestFile>> {
        if self.filter_updated {
            self.clean_uncommitted_filters(&HashSet::new()).await?;
            self.filter_updated = false;
        }

        // groups iterate highest spec id first; within a group the
        // new-files manifest comes before the filtered base manifests
        let mut groups: BTreeMap<i32, Vec<ManifestFile>> = BTreeMap::new();

        if !self.new_files.is_empty() {
            let new_manifest = self.new_files_as_manifest(base).await?;
            groups
                .entry(new_manifest.partition_spec_id)
                .or_default()
                .push(new_manifest);
        }

        let schema = base.current_schema();
        let bound_delete_expression = match self.delete_expression.clone().rewrite_not() {
            Predicate::AlwaysFalse => None,
            expression => Some(expression.bind(schema)?),
        };

        let mut deleted_files: HashSet<String> = HashSet::new();

        if let Some(current) = base.current_snapshot() {
            let file_io = self.ops.io();
            let filter = ManifestFilter::new(
                ManifestOutputContext::new(
                    file_io,
                    base.location(),
                    self.snapshot_id,
                    &self.manifest_counter,
                ),
                self.snapshot_id,
                schema,
                &self.delete_expression,
                bound_delete_expression.as_ref(),
                &self.delete_paths,
                &self.drop_partitions,
                self.fail_any_delete,
                &self.filtered_manifests,
                &self.filtered_manifest_to_deleted_files,
            );

            // Filter the base manifests in parallel. `buffered` returns
            // results in input order no matter when tasks finish, and the
            // collect drives every in-flight task to completion before the
            // first failure surfaces.
            let results: Vec<Result<ManifestFile>> = stream::iter(
                current
                    .manifests()
                    .iter()
                    .map(|manifest| filter.filter_manifest(manifest)),
            )
            .buffered(self.concurrency)
            .collect()
            .await;
            let filtered = results.into_iter().collect::<Result<Vec<_>>>()?;

            {
                let deleted_map = lock(&self.filtered_manifest_to_deleted_files);
                for manifest in &filtered {
                    if let Some(paths) = deleted_map.get(manifest) {
                        deleted_files.extend(paths.iter().cloned());
                    }
                }
            }

            for manifest in filtered {
                groups
                    .entry(manifest.partition_spec_id)
                    .or_default()
                    .push(manifest);
            }
        }

        let mut manifests = Vec::new();
        for (spec_id, group) in groups.into_iter().rev() {
            manifests.extend(self.merge_group(base, spec_id, group).await?);
        }

        if self.fail_missing_delete_paths {
            let mut missing: Vec<&String> = self
                .delete_paths
                .iter()
                .filter(|path| !deleted_files.contains(path.as_str()))
                .collect();
            if !missing.is_empty() {
                missing.sort();
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!(
                        "Missing required files to delete: {}",
                        missing.iter().join(", ")
                    ),
                ));
            }
        }

        Ok(manifests)
    }

    /// Commits the update: applies it against the freshest base, writes the
    /// snapshot through the table operations and retries on commit
    /// conflicts. Every output file the final outcome does not reference is
    /// removed.
    pub async fn commit(&mut self) -> Result<Snapshot> {
        let mut attempt = 0;
        loop {
            let base = self.ops.refresh().await?;

            let manifests = match self.apply(&base).await {
                Ok(manifests) => manifests,
                Err(err) => {
                    self.clean_all().await;
                    return Err(err);
                }
            };

            let snapshot = build_snapshot(
                self.snapshot_id,
                base.current_snapshot_id(),
                self.operation(),
                manifests,
            );

            match self.ops.commit(&base, snapshot.clone()).await {
                Ok(()) => {
                    let committed: HashSet<ManifestFile> =
                        snapshot.manifests().iter().cloned().collect();
                    self.clean_uncommitted(&committed).await?;
                    return Ok(snapshot);
                }
                Err(err)
                    if err.kind() == ErrorKind::CatalogCommitConflicts
                        && err.retryable()
                        && attempt < self.commit_retries =>
                {
                    attempt += 1;
                    warn!(
                        "Retrying commit of snapshot {} after conflict (attempt {attempt}): {err}",
                        self.snapshot_id
                    );
                }
                Err(err) => {
                    self.clean_all().await;
                    return Err(err);
                }
            }
        }
    }

    /// Deletes every file written by this update that `committed` does not
    /// reference. Files in `committed` are never deleted.
    pub async fn clean_uncommitted(&mut self, committed: &HashSet<ManifestFile>) -> Result<()> {
        if let Some(new_manifest) = &self.new_manifest {
            if !committed.contains(new_manifest) {
                let path = new_manifest.manifest_path.clone();
                self.ops.io().delete(&path).await?;
                self.new_manifest = None;
            }
        }
        self.clean_uncommitted_merges(committed).await?;
        self.clean_uncommitted_filters(committed).await?;
        Ok(())
    }

    fn operation(&self) -> Operation {
        let has_deletes = !self.delete_paths.is_empty()
            || !self.drop_partitions.is_empty()
            || self.delete_expression != Predicate::AlwaysFalse;
        match (has_deletes, self.new_files.is_empty()) {
            (false, _) => Operation::Append,
            (true, true) => Operation::Delete,
            (true, false) => Operation::Overwrite,
        }
    }

    async fn clean_all(&mut self) {
        if let Err(err) = self.clean_uncommitted(&HashSet::new()).await {
            warn!("Failed to clean up uncommitted manifests: {err}");
        }
    }

    async fn clean_uncommitted_merges(&self, committed: &HashSet<ManifestFile>) -> Result<()> {
        let stale: Vec<(Vec<ManifestFile>, ManifestFile)> = lock(&self.merge_manifests)
            .iter()
            .filter(|(_, merged)| !committed.contains(*merged))
            .map(|(bin, merged)| (bin.clone(), merged.clone()))
            .collect();

        for (bin, merged) in stale {
            self.ops.io().delete(&merged.manifest_path).await?;
            lock(&self.merge_manifests).remove(&bin);
        }
        Ok(())
    }

    async fn clean_uncommitted_filters(&self, committed: &HashSet<ManifestFile>) -> Result<()> {
        let stale: Vec<(ManifestFile, ManifestFile)> = lock(&self.filtered_manifests)
            .iter()
            .filter(|(_, filtered)| !committed.contains(*filtered))
            .map(|(input, filtered)| (input.clone(), filtered.clone()))
            .collect();

        for (input, filtered) in stale {
            // only delete when a filtered copy was actually written
            if input != filtered {
                self.ops.io().delete(&filtered.manifest_path).await?;
            }
            lock(&self.filtered_manifests).remove(&input);
            lock(&self.filtered_manifest_to_deleted_files).remove(&filtered);
        }
        Ok(())
    }

    async fn new_files_as_manifest(&mut self, base: &TableMetadata) -> Result<ManifestFile> {
        // files were added since the manifest was written, rewrite it
        if self.has_new_files {
            if let Some(stale) = self.new_manifest.take() {
                self.ops.io().delete(&stale.manifest_path).await?;
            }
        }

        if let Some(manifest) = &self.new_manifest {
            return Ok(manifest.clone());
        }

        let output_ctx = ManifestOutputContext::new(
            self.ops.io(),
            base.location(),
            self.snapshot_id,
            &self.manifest_counter,
        );
        let mut writer = ManifestWriter::new(
            output_ctx.new_manifest_output()?,
            self.snapshot_id,
            self.write_spec.as_ref().clone(),
        );
        writer.add_all(self.new_files.iter().cloned())?;
        let manifest = writer.write_manifest_file().await?;

        self.new_manifest = Some(manifest.clone());
        self.has_new_files = false;
        Ok(manifest)
    }

    /// Merges one partition-spec group into manifests of roughly the target
    /// size. Bins are processed in parallel; results keep bin order.
    async fn merge_group(
        &self,
        base: &TableMetadata,
        spec_id: i32,
        group: Vec<ManifestFile>,
    ) -> Result<Vec<ManifestFile>> {
        let spec = base.spec_by_id(spec_id)?.clone();

        // Pack from the end with a lookback of 1 so manifests keep their
        // order and the under-filled bin is the first one, which the next
        // update's merge will pick up again.
        let packer: ListPacker<ManifestFile> =
            ListPacker::new(self.manifest_target_size_bytes, 1);
        let bins = packer.pack_end(group, |manifest| manifest.manifest_length);

        let bin_futures = bins.into_iter().map(|bin| {
            let spec = spec.clone();
            async move {
                if bin.len() == 1 {
                    // no need to rewrite
                    return Ok(bin);
                }

                // If the bin holds the new-files manifest, only merge once
                // enough manifests accumulated. This applies only to such
                // bins so that large manifests don't prevent merging older
                // groups.
                let contains_new_manifest = self
                    .new_manifest
                    .as_ref()
                    .is_some_and(|manifest| bin.contains(manifest));
                if contains_new_manifest && bin.len() < self.min_count_to_merge {
                    Ok(bin)
                } else {
                    Ok(vec![self.create_manifest(base, spec, bin).await?])
                }
            }
        });

        let results: Vec<Result<Vec<ManifestFile>>> = join_all(bin_futures).await;
        let merged = results.into_iter().collect::<Result<Vec<_>>>()?;
        Ok(merged.into_iter().flatten().collect())
    }

    /// Writes one merged manifest holding the entries of every manifest in
    /// `bin`, in order.
    async fn create_manifest(
        &self,
        base: &TableMetadata,
        spec: PartitionSpecRef,
        bin: Vec<ManifestFile>,
    ) -> Result<ManifestFile> {
        // If this merge was already rewritten, use the existing file. When
        // the new-files manifest is part of the bin its handle changed, so
        // the lookup misses and the bin is merged again.
        if let Some(merged) = lock(&self.merge_manifests).get(&bin) {
            return Ok(merged.clone());
        }

        let output_ctx = ManifestOutputContext::new(
            self.ops.io(),
            base.location(),
            self.snapshot_id,
            &self.manifest_counter,
        );
        let mut writer = ManifestWriter::new(
            output_ctx.new_manifest_output()?,
            self.snapshot_id,
            spec.as_ref().clone(),
        );

        for manifest in &bin {
            let loaded = manifest.load_manifest(self.ops.io()).await?;
            for entry in loaded.entries() {
                if entry.status() == ManifestStatus::Deleted
                    && entry.snapshot_id() == self.snapshot_id
                {
                    // only files deleted by this snapshot are carried over
                    writer.add_delete_entry(entry.clone())?;
                } else if entry.status() == ManifestStatus::Added
                    && entry.snapshot_id() == self.snapshot_id
                {
                    // adds from this snapshot are still adds
                    writer.add_entry(entry.clone())?;
                } else if entry.status() != ManifestStatus::Deleted {
                    // everything else from the old manifests is existing
                    writer.add_existing_entry(entry.clone())?;
                }
            }
        }

        let manifest = writer.write_manifest_file().await?;

        lock(&self.merge_manifests).insert(bin, manifest.clone());

        Ok(manifest)
    }
}
