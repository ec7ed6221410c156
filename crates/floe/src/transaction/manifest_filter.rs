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

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use log::warn;

use crate::expr::visitors::expression_evaluator::ExpressionEvaluator;
use crate::expr::visitors::inclusive_projection::InclusiveProjection;
use crate::expr::visitors::strict_projection::StrictProjection;
use crate::expr::visitors::strict_metrics_evaluator::StrictMetricsEvaluator;
use crate::expr::{BoundPredicate, Predicate};
use crate::spec::{
    DataFile, ManifestFile, ManifestWriter, PartitionSpec, SchemaRef, Struct,
};
use crate::transaction::lock;
use crate::transaction::snapshot::ManifestOutputContext;
use crate::{Error, ErrorKind, Result};

/// The inclusive and strict partition evaluators for one partition spec.
struct PartitionEvaluators {
    inclusive: ExpressionEvaluator,
    strict: ExpressionEvaluator,
}

/// Rewrites manifests to mark entries matching the delete criteria of an
/// in-flight snapshot update as deleted.
///
/// A filter is built per application of an update and may be used from
/// many tasks at once; the result caches it writes into outlive it on the
/// update, keyed by manifest identity, so a retried application reuses
/// filtered outputs instead of redoing io.
pub(crate) struct ManifestFilter<'a> {
    output_ctx: ManifestOutputContext<'a>,
    snapshot_id: i64,
    schema: &'a SchemaRef,
    /// The row filter as handed in by the caller, for error messages.
    delete_expression: &'a Predicate,
    /// The row filter rewritten and bound to the table schema, `None` when
    /// no row filter is set.
    bound_delete_expression: Option<&'a BoundPredicate>,
    delete_paths: &'a HashSet<String>,
    drop_partitions: &'a HashSet<Struct>,
    fail_any_delete: bool,

    /// Partition evaluators per spec id, shared across manifests.
    evaluators: RwLock<HashMap<i32, Arc<PartitionEvaluators>>>,

    filtered_manifests: &'a Mutex<HashMap<ManifestFile, ManifestFile>>,
    filtered_manifest_to_deleted_files: &'a Mutex<HashMap<ManifestFile, HashSet<String>>>,
}

impl<'a> ManifestFilter<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        output_ctx: ManifestOutputContext<'a>,
        snapshot_id: i64,
        schema: &'a SchemaRef,
        delete_expression: &'a Predicate,
        bound_delete_expression: Option<&'a BoundPredicate>,
        delete_paths: &'a HashSet<String>,
        drop_partitions: &'a HashSet<Struct>,
        fail_any_delete: bool,
        filtered_manifests: &'a Mutex<HashMap<ManifestFile, ManifestFile>>,
        filtered_manifest_to_deleted_files: &'a Mutex<HashMap<ManifestFile, HashSet<String>>>,
    ) -> Self {
        Self {
            output_ctx,
            snapshot_id,
            schema,
            delete_expression,
            bound_delete_expression,
            delete_paths,
            drop_partitions,
            fail_any_delete,
            evaluators: RwLock::new(HashMap::new()),
            filtered_manifests,
            filtered_manifest_to_deleted_files,
        }
    }

    fn nothing_to_filter(&self) -> bool {
        self.bound_delete_expression.is_none()
            && self.delete_paths.is_empty()
            && self.drop_partitions.is_empty()
    }

    /// Returns the filtered version of `manifest`: the manifest itself when
    /// no entry matches the delete criteria, a rewritten copy with matched
    /// entries marked deleted otherwise.
    pub(crate) async fn filter_manifest(&self, manifest: &ManifestFile) -> Result<ManifestFile> {
        if let Some(cached) = lock(self.filtered_manifests).get(manifest) {
            return Ok(cached.clone());
        }

        if self.nothing_to_filter() {
            lock(self.filtered_manifests).insert(manifest.clone(), manifest.clone());
            return Ok(manifest.clone());
        }

        let (entries, metadata) = manifest
            .load_manifest(self.output_ctx.file_io())
            .await?
            .into_parts();
        let spec = metadata.partition_spec();
        let evaluators = self.evaluators_for(spec)?;

        // This assumes the manifest has no entries to delete and streams
        // through it without writing anything. Only if an entry matching the
        // delete criteria is found does the rewrite below run.
        let mut has_deleted_files = false;
        for entry in &entries {
            if !entry.is_alive() {
                continue;
            }
            let file = entry.data_file();
            let file_delete = self.is_file_delete(file);
            if file_delete || evaluators.inclusive.eval(file.partition())? {
                self.validate_full_match(&evaluators, file, file_delete)?;

                if self.fail_any_delete {
                    return Err(Error::new(
                        ErrorKind::PreconditionFailed,
                        "Operation would delete existing data",
                    )
                    .with_context("partition", spec.partition_to_path(file.partition())));
                }

                // as soon as a deleted file is detected, stop scanning
                has_deleted_files = true;
                break;
            }
        }

        if !has_deleted_files {
            lock(self.filtered_manifests).insert(manifest.clone(), manifest.clone());
            return Ok(manifest.clone());
        }

        // At least one file in the manifest must be deleted. Produce a copy
        // with every matched entry marked deleted by this snapshot.
        let mut writer = ManifestWriter::new(
            self.output_ctx.new_manifest_output()?,
            self.snapshot_id,
            spec.clone(),
        );
        let mut deleted_paths: HashSet<String> = HashSet::new();

        for entry in &entries {
            // deletes from previous snapshots are dropped from the copy
            if !entry.is_alive() {
                continue;
            }
            let file = entry.data_file();
            let file_delete = self.is_file_delete(file);
            if file_delete || evaluators.inclusive.eval(file.partition())? {
                self.validate_full_match(&evaluators, file, file_delete)?;

                writer.add_delete_entry(entry.clone())?;

                if !deleted_paths.insert(file.file_path().to_string()) {
                    warn!(
                        "Deleting a duplicate path from manifest {}: {}",
                        manifest.manifest_path,
                        file.file_path()
                    );
                }
            } else {
                writer.add_existing_entry(entry.clone())?;
            }
        }

        let filtered = writer.write_manifest_file().await?;

        lock(self.filtered_manifests).insert(manifest.clone(), filtered.clone());
        lock(self.filtered_manifest_to_deleted_files).insert(filtered.clone(), deleted_paths);

        Ok(filtered)
    }

    fn is_file_delete(&self, file: &DataFile) -> bool {
        self.delete_paths.contains(file.file_path())
            || self.drop_partitions.contains(file.partition())
    }

    /// A file may only be deleted when the whole file matches: it was named
    /// explicitly, or its partition strictly matches the row filter, or its
    /// metrics prove that every row matches.
    fn validate_full_match(
        &self,
        evaluators: &PartitionEvaluators,
        file: &DataFile,
        file_delete: bool,
    ) -> Result<()> {
        let full_match = file_delete
            || evaluators.strict.eval(file.partition())?
            || self.metrics_match(file)?;

        if !full_match {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Cannot delete file where some, but not all, rows match filter {}: {}",
                    self.delete_expression,
                    file.file_path()
                ),
            ));
        }
        Ok(())
    }

    fn metrics_match(&self, file: &DataFile) -> Result<bool> {
        match self.bound_delete_expression {
            Some(bound) => StrictMetricsEvaluator::eval(bound, file),
            None => Ok(false),
        }
    }

    fn evaluators_for(&self, spec: &PartitionSpec) -> Result<Arc<PartitionEvaluators>> {
        {
            let read = self.evaluators.read().map_err(|_| {
                Error::new(
                    ErrorKind::Unexpected,
                    "Partition evaluator RwLock was poisoned",
                )
            })?;
            if let Some(evaluators) = read.get(&spec.spec_id) {
                return Ok(evaluators.clone());
            }
        }

        let spec_ref = Arc::new(spec.clone());
        let partition_schema = spec.partition_schema(self.schema)?;

        let (inclusive, strict) = match self.bound_delete_expression {
            Some(bound) => (
                InclusiveProjection::new(spec_ref.clone()).project(bound)?,
                StrictProjection::new(spec_ref).project(bound)?,
            ),
            None => (Predicate::AlwaysFalse, Predicate::AlwaysFalse),
        };

        let evaluators = Arc::new(PartitionEvaluators {
            inclusive: ExpressionEvaluator::new(inclusive.bind(&partition_schema)?),
            strict: ExpressionEvaluator::new(strict.bind(&partition_schema)?),
        });

        let mut write = self.evaluators.write().map_err(|_| {
            Error::new(
                ErrorKind::Unexpected,
                "Partition evaluator RwLock was poisoned",
            )
        })?;
        write.insert(spec.spec_id, evaluators.clone());

        Ok(evaluators)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use super::*;
    use crate::expr::Reference;
    use crate::io::{FileIO, FileIOBuilder};
    use crate::spec::{
        DataFileFormat, Datum, ManifestEntry, ManifestStatus, NestedField, PartitionField,
        PrimitiveType, Schema, Transform,
    };

    const SNAPSHOT_ID: i64 = 77;

    struct TestFixture {
        file_io: FileIO,
        schema: SchemaRef,
        spec: PartitionSpec,
        manifest_counter: AtomicU64,
        filtered_manifests: Mutex<HashMap<ManifestFile, ManifestFile>>,
        filtered_manifest_to_deleted_files: Mutex<HashMap<ManifestFile, HashSet<String>>>,
    }

    impl TestFixture {
        fn new() -> Self {
            let schema = Schema::builder()
                .with_fields(vec![
                    NestedField::required(1, "x", PrimitiveType::Long),
                    NestedField::optional(2, "p", PrimitiveType::Int),
                ])
                .build()
                .unwrap();
            let spec = PartitionSpec::new(0, vec![PartitionField::builder()
                .source_id(2)
                .field_id(1000)
                .name("p".to_string())
                .transform(Transform::Identity)
                .build()]);
            Self {
                file_io: FileIOBuilder::new("memory").build().unwrap(),
                schema: Arc::new(schema),
                spec,
                manifest_counter: AtomicU64::new(0),
                filtered_manifests: Mutex::new(HashMap::new()),
                filtered_manifest_to_deleted_files: Mutex::new(HashMap::new()),
            }
        }

        fn data_file(&self, path: &str, p: i32, x_bounds: (i64, i64)) -> DataFile {
            DataFile::builder()
                .file_path(path.to_string())
                .file_format(DataFileFormat::Parquet)
                .partition(vec![Some(Datum::int(p))].into_iter().collect())
                .partition_spec_id(self.spec.spec_id)
                .record_count(100)
                .file_size_in_bytes(1024)
                .value_counts(HashMap::from([(1, 100)]))
                .null_value_counts(HashMap::from([(1, 0)]))
                .lower_bounds(HashMap::from([(1, Datum::long(x_bounds.0))]))
                .upper_bounds(HashMap::from([(1, Datum::long(x_bounds.1))]))
                .build()
        }

        async fn write_manifest(&self, entries: Vec<ManifestEntry>) -> ManifestFile {
            let path = format!(
                "memory:/tbl/metadata/base-m{}.json",
                self.manifest_counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            );
            let mut writer = ManifestWriter::new(
                self.file_io.new_output(path).unwrap(),
                1,
                self.spec.clone(),
            );
            for entry in entries {
                match entry.status() {
                    ManifestStatus::Added => writer.add_entry(entry).unwrap(),
                    ManifestStatus::Existing => writer.add_existing_entry(entry).unwrap(),
                    ManifestStatus::Deleted => writer.add_delete_entry(entry).unwrap(),
                }
            }
            writer.write_manifest_file().await.unwrap()
        }

        fn added_entry(&self, file: DataFile) -> ManifestEntry {
            ManifestEntry::builder()
                .status(ManifestStatus::Added)
                .snapshot_id(1)
                .data_file(file)
                .build()
        }

        fn filter<'a>(
            &'a self,
            delete_expression: &'a Predicate,
            bound: Option<&'a BoundPredicate>,
            delete_paths: &'a HashSet<String>,
            drop_partitions: &'a HashSet<Struct>,
            fail_any_delete: bool,
        ) -> ManifestFilter<'a> {
            ManifestFilter::new(
                ManifestOutputContext::new(
                    &self.file_io,
                    "memory:/tbl",
                    SNAPSHOT_ID,
                    &self.manifest_counter,
                ),
                SNAPSHOT_ID,
                &self.schema,
                delete_expression,
                bound,
                delete_paths,
                drop_partitions,
                fail_any_delete,
                &self.filtered_manifests,
                &self.filtered_manifest_to_deleted_files,
            )
        }
    }

    #[tokio::test]
    async fn test_no_criteria_returns_input() {
        let fixture = TestFixture::new();
        let manifest = fixture
            .write_manifest(vec![
                fixture.added_entry(fixture.data_file("/data/f1.parquet", 1, (0, 9))),
            ])
            .await;

        let expression = Predicate::AlwaysFalse;
        let paths = HashSet::new();
        let partitions = HashSet::new();
        let filter = fixture.filter(&expression, None, &paths, &partitions, false);

        let filtered = filter.filter_manifest(&manifest).await.unwrap();
        assert_eq!(filtered, manifest);
        assert_eq!(
            lock(&fixture.filtered_manifests).get(&manifest),
            Some(&manifest)
        );
    }

    #[tokio::test]
    async fn test_delete_by_path_rewrites_manifest() {
        let fixture = TestFixture::new();
        let manifest = fixture
            .write_manifest(vec![
                fixture.added_entry(fixture.data_file("/data/keep.parquet", 1, (0, 9))),
                fixture.added_entry(fixture.data_file("/data/drop.parquet", 2, (0, 9))),
            ])
            .await;

        let expression = Predicate::AlwaysFalse;
        let paths = HashSet::from(["/data/drop.parquet".to_string()]);
        let partitions = HashSet::new();
        let filter = fixture.filter(&expression, None, &paths, &partitions, false);

        let filtered = filter.filter_manifest(&manifest).await.unwrap();
        assert_ne!(filtered, manifest);
        assert_eq!(filtered.added_files_count, Some(0));
        assert_eq!(filtered.existing_files_count, Some(1));
        assert_eq!(filtered.deleted_files_count, Some(1));

        let loaded = filtered.load_manifest(&fixture.file_io).await.unwrap();
        let entries: Vec<_> = loaded.entries().cloned().collect();
        assert_eq!(entries[0].file_path(), "/data/keep.parquet");
        assert_eq!(entries[0].status(), ManifestStatus::Existing);
        assert_eq!(entries[0].snapshot_id(), 1);
        assert_eq!(entries[1].file_path(), "/data/drop.parquet");
        assert_eq!(entries[1].status(), ManifestStatus::Deleted);
        assert_eq!(entries[1].snapshot_id(), SNAPSHOT_ID);

        let deleted = lock(&fixture.filtered_manifest_to_deleted_files);
        assert_eq!(
            deleted.get(&filtered),
            Some(&HashSet::from(["/data/drop.parquet".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_drop_partition_deletes_whole_partition() {
        let fixture = TestFixture::new();
        let manifest = fixture
            .write_manifest(vec![
                fixture.added_entry(fixture.data_file("/data/p1.parquet", 1, (0, 9))),
                fixture.added_entry(fixture.data_file("/data/p2.parquet", 2, (0, 9))),
            ])
            .await;

        let expression = Predicate::AlwaysFalse;
        let paths = HashSet::new();
        let partitions: HashSet<Struct> =
            HashSet::from([vec![Some(Datum::int(1))].into_iter().collect()]);
        let filter = fixture.filter(&expression, None, &paths, &partitions, false);

        let filtered = filter.filter_manifest(&manifest).await.unwrap();
        let loaded = filtered.load_manifest(&fixture.file_io).await.unwrap();
        let statuses: Vec<_> = loaded.entries().map(|e| e.status()).collect();
        assert_eq!(statuses, vec![ManifestStatus::Deleted, ManifestStatus::Existing]);
    }

    #[tokio::test]
    async fn test_partial_row_match_fails() {
        let fixture = TestFixture::new();
        let manifest = fixture
            .write_manifest(vec![
                // x ranges up to 20, so `x < 10` matches only part of the file
                fixture.added_entry(fixture.data_file("/data/partial.parquet", 1, (0, 20))),
            ])
            .await;

        let expression = Reference::new("x").less_than(Datum::long(10));
        let bound = expression.clone().rewrite_not().bind(&fixture.schema).unwrap();
        let paths = HashSet::new();
        let partitions = HashSet::new();
        let filter = fixture.filter(&expression, Some(&bound), &paths, &partitions, false);

        let err = filter.filter_manifest(&manifest).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
        assert!(err.message().contains("some, but not all"));
        assert!(err.message().contains("/data/partial.parquet"));
    }

    #[tokio::test]
    async fn test_metrics_prove_full_match() {
        let fixture = TestFixture::new();
        let manifest = fixture
            .write_manifest(vec![
                // every row has x < 10
                fixture.added_entry(fixture.data_file("/data/full.parquet", 1, (0, 9))),
            ])
            .await;

        let expression = Reference::new("x").less_than(Datum::long(10));
        let bound = expression.clone().rewrite_not().bind(&fixture.schema).unwrap();
        let paths = HashSet::new();
        let partitions = HashSet::new();
        let filter = fixture.filter(&expression, Some(&bound), &paths, &partitions, false);

        let filtered = filter.filter_manifest(&manifest).await.unwrap();
        assert_eq!(filtered.deleted_files_count, Some(1));
        assert_eq!(filtered.existing_files_count, Some(0));
    }

    #[tokio::test]
    async fn test_fail_any_delete() {
        let fixture = TestFixture::new();
        let manifest = fixture
            .write_manifest(vec![
                fixture.added_entry(fixture.data_file("/data/f.parquet", 3, (0, 9))),
            ])
            .await;

        let expression = Predicate::AlwaysFalse;
        let paths = HashSet::from(["/data/f.parquet".to_string()]);
        let partitions = HashSet::new();
        let filter = fixture.filter(&expression, None, &paths, &partitions, true);

        let err = filter.filter_manifest(&manifest).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert!(err.to_string().contains("p=3"));
    }

    #[tokio::test]
    async fn test_old_deletes_are_dropped_from_rewrite() {
        let fixture = TestFixture::new();
        let manifest = fixture
            .write_manifest(vec![
                fixture.added_entry(fixture.data_file("/data/keep.parquet", 1, (0, 9))),
                ManifestEntry::builder()
                    .status(ManifestStatus::Deleted)
                    .snapshot_id(1)
                    .data_file(fixture.data_file("/data/old-delete.parquet", 1, (0, 9)))
                    .build(),
                fixture.added_entry(fixture.data_file("/data/drop.parquet", 1, (0, 9))),
            ])
            .await;

        let expression = Predicate::AlwaysFalse;
        let paths = HashSet::from(["/data/drop.parquet".to_string()]);
        let partitions = HashSet::new();
        let filter = fixture.filter(&expression, None, &paths, &partitions, false);

        let filtered = filter.filter_manifest(&manifest).await.unwrap();
        let loaded = filtered.load_manifest(&fixture.file_io).await.unwrap();
        let paths_in_copy: Vec<_> = loaded.entries().map(|e| e.file_path()).collect();
        assert_eq!(paths_in_copy, vec!["/data/keep.parquet", "/data/drop.parquet"]);
    }

    #[tokio::test]
    async fn test_filter_result_is_cached() {
        let fixture = TestFixture::new();
        let manifest = fixture
            .write_manifest(vec![
                fixture.added_entry(fixture.data_file("/data/drop.parquet", 1, (0, 9))),
            ])
            .await;

        let expression = Predicate::AlwaysFalse;
        let paths = HashSet::from(["/data/drop.parquet".to_string()]);
        let partitions = HashSet::new();
        let filter = fixture.filter(&expression, None, &paths, &partitions, false);

        let first = filter.filter_manifest(&manifest).await.unwrap();
        let second = filter.filter_manifest(&manifest).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(lock(&fixture.filtered_manifests).len(), 1);
    }
}
