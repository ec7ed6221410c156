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

/*!
 * Partitioning
*/

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::spec::{NestedField, Schema, Struct, Transform};
use crate::{Error, ErrorKind, Result};

/// Partition field ids start at 1000 to avoid colliding with schema
/// field ids.
pub const INITIAL_PARTITION_FIELD_ID: i32 = 1000;

/// Reference to [`PartitionSpec`].
pub type PartitionSpecRef = Arc<PartitionSpec>;

/// Partition fields capture the transform from table data to partition
/// values.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, TypedBuilder)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionField {
    /// A source column id from the table's schema
    pub source_id: i32,
    /// A partition field id unique within a partition spec
    pub field_id: i32,
    /// A partition name
    pub name: String,
    /// A transform that is applied to the source column to produce
    /// a partition value
    pub transform: Transform,
}

/// Partition spec that defines how to produce a tuple of partition values
/// from a record.
///
/// Two specs are compatible for merging snapshots iff their `spec_id` is
/// equal; specs are never re-compared structurally.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionSpec {
    /// Identifier for the partition spec, monotonically assigned per table
    pub spec_id: i32,
    /// Details of the partition spec
    pub fields: Vec<PartitionField>,
}

impl PartitionSpec {
    /// Create a partition spec.
    pub fn new(spec_id: i32, fields: Vec<PartitionField>) -> Self {
        Self { spec_id, fields }
    }

    /// The spec for an unpartitioned table.
    pub fn unpartition_spec() -> Self {
        Self {
            spec_id: 0,
            fields: vec![],
        }
    }

    /// Whether this spec partitions data at all.
    pub fn is_unpartitioned(&self) -> bool {
        self.fields.is_empty()
    }

    /// Derives the schema of partition tuples produced by this spec, with
    /// partition field ids and names, ordered as the spec's fields. Fails
    /// if a source column is absent from `schema`.
    pub fn partition_schema(&self, schema: &Schema) -> Result<Schema> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let source = schema.field_by_id(field.source_id).ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    format!(
                        "Partition source column not found in schema: {}",
                        field.source_id
                    ),
                )
            })?;
            fields.push(NestedField::optional(
                field.field_id,
                field.name.clone(),
                field.transform.result_type(source.field_type),
            ));
        }
        Schema::builder().with_fields(fields).build()
    }

    /// Renders a partition tuple as a human readable path fragment, e.g.
    /// `p=1/bucket=7`.
    pub fn partition_to_path(&self, partition: &Struct) -> String {
        self.fields
            .iter()
            .enumerate()
            .map(|(pos, field)| match partition.get(pos) {
                Some(value) => format!("{}={}", field.name, value),
                None => format!("{}=null", field.name),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}
