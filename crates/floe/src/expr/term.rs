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

//! Terms of expressions.

use std::fmt::{Display, Formatter};

use crate::expr::{BinaryExpression, Predicate, PredicateOperator, UnaryExpression};
use crate::spec::{Datum, NestedFieldRef};

/// A named reference to a column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    name: String,
}

impl Reference {
    /// Create a reference to a column named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The name of the referenced column.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Reference {
    /// Creates an `IS NULL` predicate, e.g. `Reference::new("a").is_null()`.
    pub fn is_null(self) -> Predicate {
        Predicate::Unary(UnaryExpression::new(PredicateOperator::IsNull, self))
    }

    /// Creates an `IS NOT NULL` predicate.
    pub fn not_null(self) -> Predicate {
        Predicate::Unary(UnaryExpression::new(PredicateOperator::NotNull, self))
    }

    /// Creates a less-than predicate, e.g.
    /// `Reference::new("a").less_than(Datum::long(10))`.
    pub fn less_than(self, datum: Datum) -> Predicate {
        Predicate::Binary(BinaryExpression::new(
            PredicateOperator::LessThan,
            self,
            datum,
        ))
    }

    /// Creates a less-than-or-equal predicate.
    pub fn less_than_or_eq(self, datum: Datum) -> Predicate {
        Predicate::Binary(BinaryExpression::new(
            PredicateOperator::LessThanOrEq,
            self,
            datum,
        ))
    }

    /// Creates a greater-than predicate.
    pub fn greater_than(self, datum: Datum) -> Predicate {
        Predicate::Binary(BinaryExpression::new(
            PredicateOperator::GreaterThan,
            self,
            datum,
        ))
    }

    /// Creates a greater-than-or-equal predicate.
    pub fn greater_than_or_eq(self, datum: Datum) -> Predicate {
        Predicate::Binary(BinaryExpression::new(
            PredicateOperator::GreaterThanOrEq,
            self,
            datum,
        ))
    }

    /// Creates an equality predicate.
    pub fn equal_to(self, datum: Datum) -> Predicate {
        Predicate::Binary(BinaryExpression::new(PredicateOperator::Eq, self, datum))
    }

    /// Creates an inequality predicate.
    pub fn not_equal_to(self, datum: Datum) -> Predicate {
        Predicate::Binary(BinaryExpression::new(PredicateOperator::NotEq, self, datum))
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A reference resolved against a schema: it carries the referenced field
/// and its position within the binding schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundReference {
    field: NestedFieldRef,
    pos: usize,
}

impl BoundReference {
    /// Creates a bound reference.
    pub fn new(field: NestedFieldRef, pos: usize) -> Self {
        Self { field, pos }
    }

    /// The referenced field.
    pub fn field(&self) -> &NestedFieldRef {
        &self.field
    }

    /// The position of the referenced field in the binding schema.
    pub fn pos(&self) -> usize {
        self.pos
    }
}

impl Display for BoundReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field.name)
    }
}
