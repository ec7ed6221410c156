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

//! Data types of a table schema.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Primitive types of a column.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// True or False
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// Arbitrary-length character sequences encoded in utf-8
    String,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Boolean => write!(f, "boolean"),
            PrimitiveType::Int => write!(f, "int"),
            PrimitiveType::Long => write!(f, "long"),
            PrimitiveType::String => write!(f, "string"),
        }
    }
}

/// Reference to [`NestedField`].
pub type NestedFieldRef = Arc<NestedField>;

/// A field of a table schema.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct NestedField {
    /// Field id unique in table schema
    pub id: i32,
    /// Field name
    pub name: String,
    /// Whether the field is nullable
    pub required: bool,
    /// Field type
    pub field_type: PrimitiveType,
}

impl NestedField {
    /// Construct a required field.
    pub fn required(id: i32, name: impl Into<String>, field_type: PrimitiveType) -> Self {
        Self {
            id,
            name: name.into(),
            required: true,
            field_type,
        }
    }

    /// Construct an optional field.
    pub fn optional(id: i32, name: impl Into<String>, field_type: PrimitiveType) -> Self {
        Self {
            id,
            name: name.into(),
            required: false,
            field_type,
        }
    }
}

impl fmt::Display for NestedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: ", self.id, self.name)?;
        if self.required {
            write!(f, "required ")?;
        } else {
            write!(f, "optional ")?;
        }
        write!(f, "{}", self.field_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_display() {
        let field = NestedField::required(1, "id", PrimitiveType::Long);
        assert_eq!(field.to_string(), "1: id: required long");

        let field = NestedField::optional(2, "name", PrimitiveType::String);
        assert_eq!(field.to_string(), "2: name: optional string");
    }
}
