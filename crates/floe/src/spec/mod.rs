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

//! Spec module of floe: the data model of the table format.

mod datatypes;
pub use datatypes::*;
mod schema;
pub use schema::*;
mod values;
pub use values::*;
mod transform;
pub use transform::*;
mod partition;
pub use partition::*;
mod manifest;
pub use manifest::*;
mod snapshot;
pub use snapshot::*;
mod table_metadata;
pub use table_metadata::*;
