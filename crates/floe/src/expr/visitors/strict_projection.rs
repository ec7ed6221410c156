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

use crate::expr::{BoundPredicate, Predicate};
use crate::spec::PartitionSpecRef;
use crate::{Error, ErrorKind, Result};

/// Projects a bound row predicate to a strict partition predicate: a
/// partition tuple matches the projection only if every row with that
/// partition satisfies the input predicate.
pub(crate) struct StrictProjection {
    partition_spec: PartitionSpecRef,
}

impl StrictProjection {
    pub(crate) fn new(partition_spec: PartitionSpecRef) -> Self {
        Self { partition_spec }
    }

    pub(crate) fn project(&self, predicate: &BoundPredicate) -> Result<Predicate> {
        self.visit(predicate)
    }

    fn visit(&self, bound_predicate: &BoundPredicate) -> Result<Predicate> {
        Ok(match bound_predicate {
            BoundPredicate::AlwaysTrue => Predicate::AlwaysTrue,
            BoundPredicate::AlwaysFalse => Predicate::AlwaysFalse,
            BoundPredicate::And(lhs, rhs) => self.visit(lhs)?.and(self.visit(rhs)?),
            BoundPredicate::Or(lhs, rhs) => self.visit(lhs)?.or(self.visit(rhs)?),
            BoundPredicate::Not(_) => {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    "Cannot project a predicate that contains a NOT node, rewrite it first",
                ));
            }
            bp => self.visit_bound_predicate(bp)?,
        })
    }

    fn visit_bound_predicate(&self, predicate: &BoundPredicate) -> Result<Predicate> {
        let field_id = match predicate {
            BoundPredicate::Unary(expr) => expr.term().field().id,
            BoundPredicate::Binary(expr) => expr.term().field().id,
            _ => {
                return Err(Error::new(
                    ErrorKind::Unexpected,
                    "Expected a unary or binary predicate",
                ));
            }
        };

        // Any single partition field that projects strictly is enough to
        // prove every row matches; a transform that cannot project strictly
        // contributes nothing and keeps the projection strict.
        let mut result = Predicate::AlwaysFalse;
        for part in &self.partition_spec.fields {
            if part.source_id == field_id {
                if let Some(projected) = part.transform.project_strict(&part.name, predicate)? {
                    result = result.or(projected);
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::expr::Reference;
    use crate::spec::{
        Datum, NestedField, PartitionField, PartitionSpec, PrimitiveType, Schema, Transform,
    };

    fn schema() -> Schema {
        Schema::builder()
            .with_fields(vec![
                NestedField::required(1, "x", PrimitiveType::Long),
                NestedField::optional(2, "p", PrimitiveType::Int),
            ])
            .build()
            .unwrap()
    }

    fn spec_identity_on_p() -> PartitionSpecRef {
        Arc::new(PartitionSpec::new(1, vec![PartitionField::builder()
            .source_id(2)
            .field_id(1000)
            .name("p".to_string())
            .transform(Transform::Identity)
            .build()]))
    }

    #[test]
    fn test_identity_projects_strictly() {
        let schema = schema();
        let bound = Reference::new("p").equal_to(Datum::int(3)).bind(&schema).unwrap();

        let projected = StrictProjection::new(spec_identity_on_p())
            .project(&bound)
            .unwrap();

        assert_eq!(projected, Reference::new("p").equal_to(Datum::int(3)));
    }

    #[test]
    fn test_unpartitioned_source_projects_to_false() {
        let schema = schema();
        // No partition value can prove that every row satisfies a predicate
        // on a column the spec does not cover.
        let bound = Reference::new("x").less_than(Datum::long(10)).bind(&schema).unwrap();

        let projected = StrictProjection::new(spec_identity_on_p())
            .project(&bound)
            .unwrap();

        assert_eq!(projected, Predicate::AlwaysFalse);
    }

    #[test]
    fn test_bucket_projects_to_false() {
        let schema = schema();
        let spec = Arc::new(PartitionSpec::new(1, vec![PartitionField::builder()
            .source_id(2)
            .field_id(1000)
            .name("p_bucket".to_string())
            .transform(Transform::Bucket(16))
            .build()]));
        let bound = Reference::new("p").equal_to(Datum::int(3)).bind(&schema).unwrap();

        let projected = StrictProjection::new(spec).project(&bound).unwrap();

        assert_eq!(projected, Predicate::AlwaysFalse);
    }

    #[test]
    fn test_strict_implies_inclusive() {
        use crate::expr::visitors::inclusive_projection::InclusiveProjection;

        let schema = schema();
        let spec = spec_identity_on_p();
        let bound = Reference::new("p")
            .less_than(Datum::int(5))
            .or(Reference::new("x").equal_to(Datum::long(1)))
            .bind(&schema)
            .unwrap();

        let strict = StrictProjection::new(spec.clone()).project(&bound).unwrap();
        let inclusive = InclusiveProjection::new(spec).project(&bound).unwrap();

        // The strict projection of this predicate cannot hold anywhere the
        // inclusive projection does not.
        assert_eq!(strict, Reference::new("p").less_than(Datum::int(5)));
        assert_eq!(inclusive, Predicate::AlwaysTrue);
    }
}
