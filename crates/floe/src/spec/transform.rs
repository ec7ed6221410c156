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

//! Transforms from table data to partition values.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::expr::{BinaryExpression, BoundPredicate, Predicate, Reference, UnaryExpression};
use crate::spec::PrimitiveType;
use crate::{Error, ErrorKind, Result};

/// A transform applied to a source column to produce a partition value.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Transform {
    /// Source value, unmodified
    Identity,
    /// Hash of value, mod `N`
    Bucket(u32),
    /// Value truncated to width `W`
    Truncate(u32),
    /// Extract a timestamp year, as years from 1970
    Year,
    /// Extract a timestamp month, as months from 1970-01-01
    Month,
    /// Extract a timestamp day, as days from 1970-01-01
    Day,
    /// Extract a timestamp hour, as hours from 1970-01-01 00:00:00
    Hour,
    /// Always produces `null`
    Void,
}

impl Transform {
    /// The type a partition value produced by this transform has for the
    /// given source type.
    pub fn result_type(&self, source_type: PrimitiveType) -> PrimitiveType {
        match self {
            Transform::Identity | Transform::Truncate(_) | Transform::Void => source_type,
            Transform::Bucket(_)
            | Transform::Year
            | Transform::Month
            | Transform::Day
            | Transform::Hour => PrimitiveType::Int,
        }
    }

    /// Projects a bound row predicate on the source column to a predicate
    /// on the partition value named `name`, such that any row matching the
    /// input predicate lives in a partition matching the output predicate.
    ///
    /// Only the identity transform projects losslessly; every other
    /// transform declines, which widens the projected predicate.
    pub fn project(&self, name: &str, predicate: &BoundPredicate) -> Result<Option<Predicate>> {
        match self {
            Transform::Identity => Ok(Some(Self::rename(name, predicate)?)),
            _ => Ok(None),
        }
    }

    /// Projects a bound row predicate to a partition predicate that holds
    /// only when every row in a matching partition satisfies the input
    /// predicate.
    ///
    /// Only the identity transform can make that guarantee; every other
    /// transform declines, which narrows the projected predicate.
    pub fn project_strict(
        &self,
        name: &str,
        predicate: &BoundPredicate,
    ) -> Result<Option<Predicate>> {
        match self {
            Transform::Identity => Ok(Some(Self::rename(name, predicate)?)),
            _ => Ok(None),
        }
    }

    fn rename(name: &str, predicate: &BoundPredicate) -> Result<Predicate> {
        match predicate {
            BoundPredicate::Unary(expr) => Ok(Predicate::Unary(UnaryExpression::new(
                expr.op(),
                Reference::new(name),
            ))),
            BoundPredicate::Binary(expr) => Ok(Predicate::Binary(BinaryExpression::new(
                expr.op(),
                Reference::new(name),
                expr.literal().clone(),
            ))),
            _ => Err(Error::new(
                ErrorKind::DataInvalid,
                "Transform projection expects a unary or binary predicate",
            )),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Identity => write!(f, "identity"),
            Transform::Bucket(n) => write!(f, "bucket[{n}]"),
            Transform::Truncate(w) => write!(f, "truncate[{w}]"),
            Transform::Year => write!(f, "year"),
            Transform::Month => write!(f, "month"),
            Transform::Day => write!(f, "day"),
            Transform::Hour => write!(f, "hour"),
            Transform::Void => write!(f, "void"),
        }
    }
}

impl FromStr for Transform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse_param = |s: &str, prefix: &str| -> Result<u32> {
            s[prefix.len()..s.len() - 1].parse::<u32>().map_err(|e| {
                Error::new(
                    ErrorKind::DataInvalid,
                    format!("Invalid transform parameter: {s}"),
                )
                .with_source(e)
            })
        };

        match s {
            "identity" => Ok(Transform::Identity),
            "year" => Ok(Transform::Year),
            "month" => Ok(Transform::Month),
            "day" => Ok(Transform::Day),
            "hour" => Ok(Transform::Hour),
            "void" => Ok(Transform::Void),
            s if s.starts_with("bucket[") && s.ends_with(']') => {
                Ok(Transform::Bucket(parse_param(s, "bucket[")?))
            }
            s if s.starts_with("truncate[") && s.ends_with(']') => {
                Ok(Transform::Truncate(parse_param(s, "truncate[")?))
            }
            s => Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Invalid transform: {s}"),
            )),
        }
    }
}

impl Serialize for Transform {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_string_roundtrip() {
        for transform in [
            Transform::Identity,
            Transform::Bucket(16),
            Transform::Truncate(4),
            Transform::Year,
            Transform::Month,
            Transform::Day,
            Transform::Hour,
            Transform::Void,
        ] {
            let s = transform.to_string();
            assert_eq!(s.parse::<Transform>().unwrap(), transform);
        }

        assert!("bucket[x]".parse::<Transform>().is_err());
        assert!("unknown".parse::<Transform>().is_err());
    }

    #[test]
    fn test_result_type() {
        assert_eq!(
            Transform::Identity.result_type(PrimitiveType::Long),
            PrimitiveType::Long
        );
        assert_eq!(
            Transform::Bucket(8).result_type(PrimitiveType::String),
            PrimitiveType::Int
        );
        assert_eq!(
            Transform::Day.result_type(PrimitiveType::Long),
            PrimitiveType::Int
        );
    }
}
