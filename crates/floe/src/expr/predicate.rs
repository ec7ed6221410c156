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

//! Predicates over table rows, unbound and bound.

use std::fmt::{Display, Formatter};

use crate::expr::{BoundReference, PredicateOperator, Reference};
use crate::spec::{Datum, Schema};
use crate::{Error, ErrorKind, Result};

/// An expression of a single operator with no literal, e.g. `a IS NULL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryExpression<T> {
    op: PredicateOperator,
    term: T,
}

impl<T> UnaryExpression<T> {
    /// Creates a unary expression.
    pub fn new(op: PredicateOperator, term: T) -> Self {
        Self { op, term }
    }

    /// The operator of this expression.
    pub fn op(&self) -> PredicateOperator {
        self.op
    }

    /// The term of this expression.
    pub fn term(&self) -> &T {
        &self.term
    }
}

impl<T: Display> Display for UnaryExpression<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.term, self.op)
    }
}

/// An expression comparing a term with a literal, e.g. `a < 10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryExpression<T> {
    op: PredicateOperator,
    term: T,
    literal: Datum,
}

impl<T> BinaryExpression<T> {
    /// Creates a binary expression.
    pub fn new(op: PredicateOperator, term: T, literal: Datum) -> Self {
        Self { op, term, literal }
    }

    /// The operator of this expression.
    pub fn op(&self) -> PredicateOperator {
        self.op
    }

    /// The term of this expression.
    pub fn term(&self) -> &T {
        &self.term
    }

    /// The literal of this expression.
    pub fn literal(&self) -> &Datum {
        &self.literal
    }
}

impl<T: Display> Display for BinaryExpression<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.term, self.op, self.literal)
    }
}

/// An unbound predicate over named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every row.
    AlwaysTrue,
    /// Matches no row.
    AlwaysFalse,
    /// Both inputs must match.
    And(Box<Predicate>, Box<Predicate>),
    /// At least one input must match.
    Or(Box<Predicate>, Box<Predicate>),
    /// The input must not match.
    Not(Box<Predicate>),
    /// A unary expression, e.g. `a IS NULL`.
    Unary(UnaryExpression<Reference>),
    /// A binary expression, e.g. `a < 10`.
    Binary(BinaryExpression<Reference>),
}

impl Predicate {
    /// Combines with another predicate conjunctively.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::AlwaysFalse, _) | (_, Predicate::AlwaysFalse) => Predicate::AlwaysFalse,
            (Predicate::AlwaysTrue, rhs) => rhs,
            (lhs, Predicate::AlwaysTrue) => lhs,
            (lhs, rhs) => Predicate::And(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Combines with another predicate disjunctively.
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::AlwaysTrue, _) | (_, Predicate::AlwaysTrue) => Predicate::AlwaysTrue,
            (Predicate::AlwaysFalse, rhs) => rhs,
            (lhs, Predicate::AlwaysFalse) => lhs,
            (lhs, rhs) => Predicate::Or(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Returns a predicate matching exactly the rows this one rejects.
    pub fn negate(self) -> Predicate {
        match self {
            Predicate::AlwaysTrue => Predicate::AlwaysFalse,
            Predicate::AlwaysFalse => Predicate::AlwaysTrue,
            Predicate::And(lhs, rhs) => {
                Predicate::Or(Box::new(lhs.negate()), Box::new(rhs.negate()))
            }
            Predicate::Or(lhs, rhs) => {
                Predicate::And(Box::new(lhs.negate()), Box::new(rhs.negate()))
            }
            Predicate::Not(inner) => *inner,
            Predicate::Unary(expr) => {
                Predicate::Unary(UnaryExpression::new(expr.op.negate(), expr.term))
            }
            Predicate::Binary(expr) => {
                Predicate::Binary(BinaryExpression::new(expr.op.negate(), expr.term, expr.literal))
            }
        }
    }

    /// Rewrites the predicate to an equivalent one without `NOT` nodes, by
    /// pushing negation down to the leaf operators.
    pub fn rewrite_not(self) -> Predicate {
        match self {
            Predicate::And(lhs, rhs) => {
                Predicate::And(Box::new(lhs.rewrite_not()), Box::new(rhs.rewrite_not()))
            }
            Predicate::Or(lhs, rhs) => {
                Predicate::Or(Box::new(lhs.rewrite_not()), Box::new(rhs.rewrite_not()))
            }
            Predicate::Not(inner) => inner.negate().rewrite_not(),
            p => p,
        }
    }

    /// Binds the predicate against a schema, resolving references to fields
    /// and checking that literal types match the referenced columns.
    pub fn bind(&self, schema: &Schema) -> Result<BoundPredicate> {
        Ok(match self {
            Predicate::AlwaysTrue => BoundPredicate::AlwaysTrue,
            Predicate::AlwaysFalse => BoundPredicate::AlwaysFalse,
            Predicate::And(lhs, rhs) => BoundPredicate::And(
                Box::new(lhs.bind(schema)?),
                Box::new(rhs.bind(schema)?),
            ),
            Predicate::Or(lhs, rhs) => BoundPredicate::Or(
                Box::new(lhs.bind(schema)?),
                Box::new(rhs.bind(schema)?),
            ),
            Predicate::Not(inner) => BoundPredicate::Not(Box::new(inner.bind(schema)?)),
            Predicate::Unary(expr) => {
                let bound_term = Self::bind_reference(expr.term(), schema)?;
                BoundPredicate::Unary(UnaryExpression::new(expr.op(), bound_term))
            }
            Predicate::Binary(expr) => {
                let bound_term = Self::bind_reference(expr.term(), schema)?;
                let field_type = bound_term.field().field_type;
                if expr.literal().r#type() != field_type {
                    return Err(Error::new(
                        ErrorKind::DataInvalid,
                        format!(
                            "Cannot compare column {} of type {} with literal {}",
                            expr.term(),
                            field_type,
                            expr.literal()
                        ),
                    ));
                }
                BoundPredicate::Binary(BinaryExpression::new(
                    expr.op(),
                    bound_term,
                    expr.literal().clone(),
                ))
            }
        })
    }

    fn bind_reference(reference: &Reference, schema: &Schema) -> Result<BoundReference> {
        let pos = schema.index_by_name(reference.name()).ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("Column not found in schema: {}", reference.name()),
            )
        })?;
        Ok(BoundReference::new(schema.fields()[pos].clone(), pos))
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::AlwaysTrue => write!(f, "TRUE"),
            Predicate::AlwaysFalse => write!(f, "FALSE"),
            Predicate::And(lhs, rhs) => write!(f, "({lhs}) AND ({rhs})"),
            Predicate::Or(lhs, rhs) => write!(f, "({lhs}) OR ({rhs})"),
            Predicate::Not(inner) => write!(f, "NOT ({inner})"),
            Predicate::Unary(expr) => write!(f, "{expr}"),
            Predicate::Binary(expr) => write!(f, "{expr}"),
        }
    }
}

/// A predicate bound against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundPredicate {
    /// Matches every row.
    AlwaysTrue,
    /// Matches no row.
    AlwaysFalse,
    /// Both inputs must match.
    And(Box<BoundPredicate>, Box<BoundPredicate>),
    /// At least one input must match.
    Or(Box<BoundPredicate>, Box<BoundPredicate>),
    /// The input must not match.
    Not(Box<BoundPredicate>),
    /// A bound unary expression.
    Unary(UnaryExpression<BoundReference>),
    /// A bound binary expression.
    Binary(BinaryExpression<BoundReference>),
}

impl Display for BoundPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundPredicate::AlwaysTrue => write!(f, "TRUE"),
            BoundPredicate::AlwaysFalse => write!(f, "FALSE"),
            BoundPredicate::And(lhs, rhs) => write!(f, "({lhs}) AND ({rhs})"),
            BoundPredicate::Or(lhs, rhs) => write!(f, "({lhs}) OR ({rhs})"),
            BoundPredicate::Not(inner) => write!(f, "NOT ({inner})"),
            BoundPredicate::Unary(expr) => write!(f, "{expr}"),
            BoundPredicate::Binary(expr) => write!(f, "{expr}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{NestedField, PrimitiveType};

    fn schema() -> Schema {
        Schema::builder()
            .with_fields(vec![
                NestedField::required(1, "x", PrimitiveType::Long),
                NestedField::optional(2, "s", PrimitiveType::String),
            ])
            .build()
            .unwrap()
    }

    #[test]
    fn test_display() {
        let pred = Reference::new("x")
            .less_than(Datum::long(10))
            .or(Reference::new("s").is_null());
        assert_eq!(pred.to_string(), "(x < 10) OR (s IS NULL)");
    }

    #[test]
    fn test_and_or_simplification() {
        let pred = Reference::new("x").less_than(Datum::long(10));
        assert_eq!(pred.clone().and(Predicate::AlwaysTrue), pred);
        assert_eq!(
            pred.clone().and(Predicate::AlwaysFalse),
            Predicate::AlwaysFalse
        );
        assert_eq!(pred.clone().or(Predicate::AlwaysFalse), pred);
        assert_eq!(pred.or(Predicate::AlwaysTrue), Predicate::AlwaysTrue);
    }

    #[test]
    fn test_rewrite_not() {
        let pred = Predicate::Not(Box::new(
            Reference::new("x")
                .less_than(Datum::long(10))
                .and(Reference::new("s").is_null()),
        ))
        .rewrite_not();

        assert_eq!(
            pred,
            Reference::new("x")
                .greater_than_or_eq(Datum::long(10))
                .or(Reference::new("s").not_null())
        );
    }

    #[test]
    fn test_bind() {
        let schema = schema();
        let bound = Reference::new("x")
            .less_than(Datum::long(10))
            .bind(&schema)
            .unwrap();
        match bound {
            BoundPredicate::Binary(expr) => {
                assert_eq!(expr.term().field().id, 1);
                assert_eq!(expr.term().pos(), 0);
                assert_eq!(expr.literal(), &Datum::long(10));
            }
            other => panic!("unexpected binding: {other:?}"),
        }
    }

    #[test]
    fn test_bind_unknown_column() {
        let err = Reference::new("missing")
            .is_null()
            .bind(&schema())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    #[test]
    fn test_bind_type_mismatch() {
        let err = Reference::new("x")
            .equal_to(Datum::string("ten"))
            .bind(&schema())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }
}
