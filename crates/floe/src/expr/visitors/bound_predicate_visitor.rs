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

use crate::expr::{BoundPredicate, BoundReference, PredicateOperator};
use crate::spec::Datum;
use crate::{Error, ErrorKind, Result};

/// A visitor over [`BoundPredicate`] nodes, dispatched by [`visit`].
pub(crate) trait BoundPredicateVisitor {
    type T;

    fn always_true(&mut self) -> Result<Self::T>;
    fn always_false(&mut self) -> Result<Self::T>;
    fn and(&mut self, lhs: Self::T, rhs: Self::T) -> Result<Self::T>;
    fn or(&mut self, lhs: Self::T, rhs: Self::T) -> Result<Self::T>;
    fn not(&mut self, inner: Self::T) -> Result<Self::T>;

    fn is_null(
        &mut self,
        reference: &BoundReference,
        predicate: &BoundPredicate,
    ) -> Result<Self::T>;

    fn not_null(
        &mut self,
        reference: &BoundReference,
        predicate: &BoundPredicate,
    ) -> Result<Self::T>;

    fn less_than(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        predicate: &BoundPredicate,
    ) -> Result<Self::T>;

    fn less_than_or_eq(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        predicate: &BoundPredicate,
    ) -> Result<Self::T>;

    fn greater_than(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        predicate: &BoundPredicate,
    ) -> Result<Self::T>;

    fn greater_than_or_eq(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        predicate: &BoundPredicate,
    ) -> Result<Self::T>;

    fn eq(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        predicate: &BoundPredicate,
    ) -> Result<Self::T>;

    fn not_eq(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        predicate: &BoundPredicate,
    ) -> Result<Self::T>;
}

/// Walks a [`BoundPredicate`], combining the visitor's leaf results through
/// its logical methods.
pub(crate) fn visit<V: BoundPredicateVisitor>(
    visitor: &mut V,
    predicate: &BoundPredicate,
) -> Result<V::T> {
    match predicate {
        BoundPredicate::AlwaysTrue => visitor.always_true(),
        BoundPredicate::AlwaysFalse => visitor.always_false(),
        BoundPredicate::And(lhs, rhs) => {
            let lhs_result = visit(visitor, lhs)?;
            let rhs_result = visit(visitor, rhs)?;
            visitor.and(lhs_result, rhs_result)
        }
        BoundPredicate::Or(lhs, rhs) => {
            let lhs_result = visit(visitor, lhs)?;
            let rhs_result = visit(visitor, rhs)?;
            visitor.or(lhs_result, rhs_result)
        }
        BoundPredicate::Not(inner) => {
            let inner_result = visit(visitor, inner)?;
            visitor.not(inner_result)
        }
        BoundPredicate::Unary(expr) => match expr.op() {
            PredicateOperator::IsNull => visitor.is_null(expr.term(), predicate),
            PredicateOperator::NotNull => visitor.not_null(expr.term(), predicate),
            op => Err(Error::new(
                ErrorKind::Unexpected,
                format!("Unexpected unary operator: {op}"),
            )),
        },
        BoundPredicate::Binary(expr) => match expr.op() {
            PredicateOperator::LessThan => {
                visitor.less_than(expr.term(), expr.literal(), predicate)
            }
            PredicateOperator::LessThanOrEq => {
                visitor.less_than_or_eq(expr.term(), expr.literal(), predicate)
            }
            PredicateOperator::GreaterThan => {
                visitor.greater_than(expr.term(), expr.literal(), predicate)
            }
            PredicateOperator::GreaterThanOrEq => {
                visitor.greater_than_or_eq(expr.term(), expr.literal(), predicate)
            }
            PredicateOperator::Eq => visitor.eq(expr.term(), expr.literal(), predicate),
            PredicateOperator::NotEq => visitor.not_eq(expr.term(), expr.literal(), predicate),
            op => Err(Error::new(
                ErrorKind::Unexpected,
                format!("Unexpected binary operator: {op}"),
            )),
        },
    }
}
