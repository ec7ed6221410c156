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

//! Typed literal values and partition tuples.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::spec::PrimitiveType;

/// A typed literal value.
///
/// Values of different types never compare; [`PartialOrd`] returns `None`
/// for them and binding rejects predicates whose literal type does not
/// match the referenced column.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datum {
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer value
    Int(i32),
    /// 64-bit signed integer value
    Long(i64),
    /// Utf-8 string value
    String(String),
}

impl Datum {
    /// Creates a boolean value.
    pub fn bool(v: bool) -> Self {
        Datum::Boolean(v)
    }

    /// Creates a 32-bit integer value.
    pub fn int(v: impl Into<i32>) -> Self {
        Datum::Int(v.into())
    }

    /// Creates a 64-bit integer value.
    pub fn long(v: impl Into<i64>) -> Self {
        Datum::Long(v.into())
    }

    /// Creates a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Datum::String(v.into())
    }

    /// The primitive type of this value.
    pub fn r#type(&self) -> PrimitiveType {
        match self {
            Datum::Boolean(_) => PrimitiveType::Boolean,
            Datum::Int(_) => PrimitiveType::Int,
            Datum::Long(_) => PrimitiveType::Long,
            Datum::String(_) => PrimitiveType::String,
        }
    }
}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Datum::Boolean(lhs), Datum::Boolean(rhs)) => lhs.partial_cmp(rhs),
            (Datum::Int(lhs), Datum::Int(rhs)) => lhs.partial_cmp(rhs),
            (Datum::Long(lhs), Datum::Long(rhs)) => lhs.partial_cmp(rhs),
            (Datum::String(lhs), Datum::String(rhs)) => lhs.partial_cmp(rhs),
            _ => None,
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Boolean(v) => write!(f, "{v}"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Long(v) => write!(f, "{v}"),
            Datum::String(v) => write!(f, "\"{v}\""),
        }
    }
}

/// A tuple of partition values, positionally aligned with the fields of a
/// partition spec. A `None` member is a null partition value.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Default, Serialize, Deserialize)]
pub struct Struct {
    fields: Vec<Option<Datum>>,
}

impl Struct {
    /// The empty tuple, used for unpartitioned tables.
    pub fn empty() -> Self {
        Self { fields: vec![] }
    }

    /// The number of members in this tuple.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether this tuple has no members.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The value at `pos`, `None` when null or out of range.
    pub fn get(&self, pos: usize) -> Option<&Datum> {
        self.fields.get(pos).and_then(|v| v.as_ref())
    }

    /// Iterates the members of this tuple.
    pub fn iter(&self) -> impl Iterator<Item = Option<&Datum>> {
        self.fields.iter().map(|v| v.as_ref())
    }
}

impl FromIterator<Option<Datum>> for Struct {
    fn from_iter<I: IntoIterator<Item = Option<Datum>>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Some(v) => write!(f, "{v}")?,
                None => write!(f, "null")?,
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datum_ordering() {
        assert!(Datum::long(1) < Datum::long(2));
        assert!(Datum::string("a") < Datum::string("b"));
        assert_eq!(
            Datum::long(1).partial_cmp(&Datum::int(1)),
            None,
            "values of different types must not compare"
        );
    }

    #[test]
    fn test_datum_json_roundtrip() {
        let datum = Datum::long(42);
        let json = serde_json::to_string(&datum).unwrap();
        assert_eq!(json, r#"{"long":42}"#);
        assert_eq!(serde_json::from_str::<Datum>(&json).unwrap(), datum);
    }

    #[test]
    fn test_struct_access() {
        let partition: Struct = vec![Some(Datum::int(7)), None].into_iter().collect();
        assert_eq!(partition.len(), 2);
        assert_eq!(partition.get(0), Some(&Datum::int(7)));
        assert_eq!(partition.get(1), None);
        assert_eq!(partition.get(9), None);
        assert_eq!(partition.to_string(), "(7, null)");
    }
}
