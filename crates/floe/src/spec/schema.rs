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

//! Table schema.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::spec::{NestedField, NestedFieldRef};
use crate::{Error, ErrorKind, Result};

/// Reference to [`Schema`].
pub type SchemaRef = Arc<Schema>;

/// The schema of a table: an ordered list of uniquely named, uniquely
/// identified fields.
#[derive(Debug, Clone)]
pub struct Schema {
    schema_id: i32,
    fields: Vec<NestedFieldRef>,

    id_to_pos: HashMap<i32, usize>,
    name_to_pos: HashMap<String, usize>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.schema_id == other.schema_id && self.fields == other.fields
    }
}

impl Eq for Schema {}

impl Schema {
    /// Create a schema builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            schema_id: 0,
            fields: vec![],
        }
    }

    /// The id of this schema.
    pub fn schema_id(&self) -> i32 {
        self.schema_id
    }

    /// The ordered fields of this schema.
    pub fn fields(&self) -> &[NestedFieldRef] {
        &self.fields
    }

    /// Looks up a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&NestedFieldRef> {
        self.name_to_pos.get(name).map(|pos| &self.fields[*pos])
    }

    /// Looks up a field by id.
    pub fn field_by_id(&self, id: i32) -> Option<&NestedFieldRef> {
        self.id_to_pos.get(&id).map(|pos| &self.fields[*pos])
    }

    /// The position of a field within this schema.
    pub fn index_by_name(&self, name: &str) -> Option<usize> {
        self.name_to_pos.get(name).copied()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "table {{")?;
        for field in &self.fields {
            writeln!(f, "  {field}")?;
        }
        write!(f, "}}")
    }
}

/// Builder for [`Schema`].
pub struct SchemaBuilder {
    schema_id: i32,
    fields: Vec<NestedFieldRef>,
}

impl SchemaBuilder {
    /// Set the schema id.
    pub fn with_schema_id(mut self, schema_id: i32) -> Self {
        self.schema_id = schema_id;
        self
    }

    /// Add fields to the schema.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = NestedField>) -> Self {
        self.fields.extend(fields.into_iter().map(Arc::new));
        self
    }

    /// Build the schema, validating field id and name uniqueness.
    pub fn build(self) -> Result<Schema> {
        let mut id_to_pos = HashMap::with_capacity(self.fields.len());
        let mut name_to_pos = HashMap::with_capacity(self.fields.len());

        for (pos, field) in self.fields.iter().enumerate() {
            if id_to_pos.insert(field.id, pos).is_some() {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!("Duplicate field id in schema: {}", field.id),
                ));
            }
            if name_to_pos.insert(field.name.clone(), pos).is_some() {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!("Duplicate field name in schema: {}", field.name),
                ));
            }
        }

        Ok(Schema {
            schema_id: self.schema_id,
            fields: self.fields,
            id_to_pos,
            name_to_pos,
        })
    }
}
