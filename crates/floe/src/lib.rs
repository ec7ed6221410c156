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

//! Floe is a table format for large, partitioned, append-only tables. This
//! crate implements its snapshot core: producing a new table snapshot by
//! merging newly added data files with the existing table state, applying
//! deletes expressed as file paths, partition tuples or row predicates,
//! and compacting small manifests along the way.

#![deny(missing_docs)]

mod error;
pub use error::{Error, ErrorKind, Result};

pub mod expr;
pub mod io;
pub mod ops;
pub mod spec;
pub mod transaction;

mod utils;
