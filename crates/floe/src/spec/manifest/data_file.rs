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

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::spec::{Datum, Struct};
use crate::{Error, ErrorKind};

/// Format of an on-disk data file.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFileFormat {
    /// Avro file format: <https://avro.apache.org/>
    Avro,
    /// Orc file format: <https://orc.apache.org/>
    Orc,
    /// Parquet file format: <https://parquet.apache.org/>
    Parquet,
}

impl FromStr for DataFileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "avro" => Ok(Self::Avro),
            "orc" => Ok(Self::Orc),
            "parquet" => Ok(Self::Parquet),
            _ => Err(Error::new(
                ErrorKind::FeatureUnsupported,
                format!("Unsupported data file format: {}", s),
            )),
        }
    }
}

impl fmt::Display for DataFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFileFormat::Avro => write!(f, "avro"),
            DataFileFormat::Orc => write!(f, "orc"),
            DataFileFormat::Parquet => write!(f, "parquet"),
        }
    }
}

/// An immutable description of one on-disk data file. Its identity is
/// `file_path`.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "kebab-case")]
pub struct DataFile {
    /// Full URI for the file with a FS scheme.
    pub file_path: String,
    /// File format of the data file.
    pub file_format: DataFileFormat,
    /// Partition data tuple, schema based on the partition spec output using
    /// partition field ids.
    pub partition: Struct,
    /// Id of the partition spec the partition tuple conforms to.
    pub partition_spec_id: i32,
    /// Number of records in this file.
    pub record_count: u64,
    /// Total file size in bytes.
    pub file_size_in_bytes: u64,
    /// Map from column id to number of values in the column, including null
    /// and NaN values.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub value_counts: HashMap<i32, u64>,
    /// Map from column id to number of null values in the column.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub null_value_counts: HashMap<i32, u64>,
    /// Map from column id to the column's lower bound among its non-null
    /// values.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub lower_bounds: HashMap<i32, Datum>,
    /// Map from column id to the column's upper bound among its non-null
    /// values.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub upper_bounds: HashMap<i32, Datum>,
}

impl DataFile {
    /// The full path of this data file.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// The partition tuple of this data file.
    pub fn partition(&self) -> &Struct {
        &self.partition
    }

    /// The number of records in this data file.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// The size of this data file in bytes.
    pub fn file_size_in_bytes(&self) -> u64 {
        self.file_size_in_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Datum;

    #[test]
    fn test_data_file_json_roundtrip() {
        let file = DataFile::builder()
            .file_path("/data/p=1/f1.parquet".to_string())
            .file_format(DataFileFormat::Parquet)
            .partition(vec![Some(Datum::int(1))].into_iter().collect())
            .partition_spec_id(0)
            .record_count(100)
            .file_size_in_bytes(2048)
            .lower_bounds(HashMap::from([(1, Datum::long(0))]))
            .upper_bounds(HashMap::from([(1, Datum::long(99))]))
            .build();

        let json = serde_json::to_string(&file).unwrap();
        let parsed: DataFile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, file);
    }

    #[test]
    fn test_data_file_format_from_str() {
        assert_eq!("PARQUET".parse::<DataFileFormat>().unwrap(), DataFileFormat::Parquet);
        assert!("csv".parse::<DataFileFormat>().is_err());
    }
}
