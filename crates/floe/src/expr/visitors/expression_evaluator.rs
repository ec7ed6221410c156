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

use std::cmp::Ordering;

use crate::expr::visitors::bound_predicate_visitor::{visit, BoundPredicateVisitor};
use crate::expr::{BoundPredicate, BoundReference};
use crate::spec::{Datum, Struct};
use crate::{Error, ErrorKind, Result};

/// Evaluates a predicate bound to a partition schema against partition
/// tuples.
#[derive(Debug)]
pub(crate) struct ExpressionEvaluator {
    partition_filter: BoundPredicate,
}

impl ExpressionEvaluator {
    /// Creates a new [`ExpressionEvaluator`].
    pub(crate) fn new(partition_filter: BoundPredicate) -> Self {
        Self { partition_filter }
    }

    /// Evaluate this [`ExpressionEvaluator`]'s partition filter against
    /// the provided partition tuple.
    pub(crate) fn eval(&self, partition: &Struct) -> Result<bool> {
        let mut visitor = ExpressionEvaluatorVisitor { partition };

        visit(&mut visitor, &self.partition_filter)
    }
}

#[derive(Debug)]
struct ExpressionEvaluatorVisitor<'a> {
    partition: &'a Struct,
}

impl ExpressionEvaluatorVisitor<'_> {
    fn compare(
        &self,
        reference: &BoundReference,
        literal: &Datum,
        test: fn(Ordering) -> bool,
    ) -> Result<bool> {
        match self.partition.get(reference.pos()) {
            // null never satisfies a comparison
            None => Ok(false),
            Some(value) => match value.partial_cmp(literal) {
                Some(ordering) => Ok(test(ordering)),
                None => Err(Error::new(
                    ErrorKind::Unexpected,
                    format!("Cannot compare partition value {value} with literal {literal}"),
                )),
            },
        }
    }
}

impl BoundPredicateVisitor for ExpressionEvaluatorVisitor<'_> {
    type T = bool;

    fn always_true(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn always_false(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn and(&mut self, lhs: bool, rhs: bool) -> Result<bool> {
        Ok(lhs && rhs)
    }

    fn or(&mut self, lhs: bool, rhs: bool) -> Result<bool> {
        Ok(lhs || rhs)
    }

    fn not(&mut self, _inner: bool) -> Result<bool> {
        Err(Error::new(
            ErrorKind::Unexpected,
            "Expressions must be rewritten to remove NOT nodes before evaluation",
        ))
    }

    fn is_null(
        &mut self,
        reference: &BoundReference,
        _predicate: &BoundPredicate,
    ) -> Result<bool> {
        Ok(self.partition.get(reference.pos()).is_none())
    }

    fn not_null(
        &mut self,
        reference: &BoundReference,
        _predicate: &BoundPredicate,
    ) -> Result<bool> {
        Ok(self.partition.get(reference.pos()).is_some())
    }

    fn less_than(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        _predicate: &BoundPredicate,
    ) -> Result<bool> {
        self.compare(reference, literal, Ordering::is_lt)
    }

    fn less_than_or_eq(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        _predicate: &BoundPredicate,
    ) -> Result<bool> {
        self.compare(reference, literal, Ordering::is_le)
    }

    fn greater_than(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        _predicate: &BoundPredicate,
    ) -> Result<bool> {
        self.compare(reference, literal, Ordering::is_gt)
    }

    fn greater_than_or_eq(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        _predicate: &BoundPredicate,
    ) -> Result<bool> {
        self.compare(reference, literal, Ordering::is_ge)
    }

    fn eq(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        _predicate: &BoundPredicate,
    ) -> Result<bool> {
        self.compare(reference, literal, Ordering::is_eq)
    }

    fn not_eq(
        &mut self,
        reference: &BoundReference,
        literal: &Datum,
        _predicate: &BoundPredicate,
    ) -> Result<bool> {
        Ok(!self.compare(reference, literal, Ordering::is_eq)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Reference;
    use crate::spec::{NestedField, PrimitiveType, Schema};

    fn partition_schema() -> Schema {
        Schema::builder()
            .with_fields(vec![NestedField::optional(
                1000,
                "p",
                PrimitiveType::Int,
            )])
            .build()
            .unwrap()
    }

    fn evaluator(predicate: crate::expr::Predicate) -> ExpressionEvaluator {
        ExpressionEvaluator::new(predicate.bind(&partition_schema()).unwrap())
    }

    fn tuple(value: Option<Datum>) -> Struct {
        vec![value].into_iter().collect()
    }

    #[test]
    fn test_comparisons() {
        let eval = evaluator(Reference::new("p").less_than(Datum::int(5)));
        assert!(eval.eval(&tuple(Some(Datum::int(4)))).unwrap());
        assert!(!eval.eval(&tuple(Some(Datum::int(5)))).unwrap());
        assert!(!eval.eval(&tuple(None)).unwrap());

        let eval = evaluator(Reference::new("p").equal_to(Datum::int(5)));
        assert!(eval.eval(&tuple(Some(Datum::int(5)))).unwrap());
        assert!(!eval.eval(&tuple(Some(Datum::int(4)))).unwrap());
    }

    #[test]
    fn test_null_checks() {
        let eval = evaluator(Reference::new("p").is_null());
        assert!(eval.eval(&tuple(None)).unwrap());
        assert!(!eval.eval(&tuple(Some(Datum::int(1)))).unwrap());

        let eval = evaluator(Reference::new("p").not_null());
        assert!(!eval.eval(&tuple(None)).unwrap());
    }

    #[test]
    fn test_logical_connectives() {
        let eval = evaluator(
            Reference::new("p")
                .greater_than_or_eq(Datum::int(0))
                .and(Reference::new("p").less_than(Datum::int(10))),
        );
        assert!(eval.eval(&tuple(Some(Datum::int(3)))).unwrap());
        assert!(!eval.eval(&tuple(Some(Datum::int(11)))).unwrap());
    }
}
