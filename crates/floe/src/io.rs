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

//! File io for table metadata and manifests.
//!
//! All paths passed to [`FileIO`] must be absolute paths starting with the
//! scheme string used to construct it, e.g. `memory:/tbl/metadata/m0.json`
//! or `file:/tmp/tbl/metadata/m0.json`.

use std::sync::Arc;

use bytes::Bytes;
use opendal::layers::RetryLayer;
use opendal::services::{FsConfig, MemoryConfig};
use opendal::Operator;

use crate::{Error, ErrorKind, Result};

/// FileIO implementation, used to manipulate files in underlying storage.
///
/// Supported storages:
///
/// | Storage            | Schemes      |
/// |--------------------|--------------|
/// | Memory             | `memory`     |
/// | Local file system  | `file`, `` |
#[derive(Clone, Debug)]
pub struct FileIO {
    inner: Arc<Storage>,
}

impl FileIO {
    /// Deletes file.
    pub async fn delete(&self, path: impl AsRef<str>) -> Result<()> {
        let (op, relative_path) = self.inner.create_operator(&path)?;
        Ok(op.delete(relative_path).await?)
    }

    /// Check file exists.
    pub async fn exists(&self, path: impl AsRef<str>) -> Result<bool> {
        let (op, relative_path) = self.inner.create_operator(&path)?;
        Ok(op.exists(relative_path).await?)
    }

    /// Creates input file.
    pub fn new_input(&self, path: impl AsRef<str>) -> Result<InputFile> {
        let (op, relative_path) = self.inner.create_operator(&path)?;
        let path = path.as_ref().to_string();
        let relative_path_pos = path.len() - relative_path.len();
        Ok(InputFile {
            op,
            path,
            relative_path_pos,
        })
    }

    /// Creates output file.
    pub fn new_output(&self, path: impl AsRef<str>) -> Result<OutputFile> {
        let (op, relative_path) = self.inner.create_operator(&path)?;
        let path = path.as_ref().to_string();
        let relative_path_pos = path.len() - relative_path.len();
        Ok(OutputFile {
            op,
            path,
            relative_path_pos,
        })
    }
}

/// Builder for [`FileIO`].
#[derive(Debug)]
pub struct FileIOBuilder {
    /// This is used to infer the scheme of the operator.
    ///
    /// If this is `None`, then [`FileIOBuilder::build`](FileIOBuilder::build)
    /// will build a local file io.
    scheme_str: Option<String>,
}

impl FileIOBuilder {
    /// Creates a new builder with scheme.
    /// See [`FileIO`] for supported schemes.
    pub fn new(scheme_str: impl ToString) -> Self {
        Self {
            scheme_str: Some(scheme_str.to_string()),
        }
    }

    /// Creates a new builder for local file io.
    pub fn new_fs_io() -> Self {
        Self { scheme_str: None }
    }

    /// Builds [`FileIO`].
    pub fn build(self) -> Result<FileIO> {
        let storage = Storage::build(self)?;
        Ok(FileIO {
            inner: Arc::new(storage),
        })
    }
}

#[derive(Debug)]
enum Storage {
    Memory(Operator),
    LocalFs,
}

impl Storage {
    fn build(file_io_builder: FileIOBuilder) -> Result<Self> {
        let scheme_str = file_io_builder.scheme_str.unwrap_or_default();
        match scheme_str.as_str() {
            "memory" => {
                let op = Operator::from_config(MemoryConfig::default())?.finish();
                Ok(Self::Memory(op))
            }
            "file" | "" => Ok(Self::LocalFs),
            s => Err(Error::new(
                ErrorKind::FeatureUnsupported,
                format!("Constructing file io from scheme: {s} not supported now"),
            )),
        }
    }

    /// Creates the operator for a path together with the path relative to
    /// the operator root.
    fn create_operator<'a>(&self, path: &'a impl AsRef<str>) -> Result<(Operator, &'a str)> {
        let path = path.as_ref();
        let (operator, relative_path): (Operator, &str) = match self {
            Storage::Memory(op) => {
                if let Some(stripped) = path.strip_prefix("memory:/") {
                    (op.clone(), stripped)
                } else {
                    (op.clone(), &path[1..])
                }
            }
            Storage::LocalFs => {
                let mut cfg = FsConfig::default();
                cfg.root = Some("/".to_string());
                let op = Operator::from_config(cfg)?.finish();

                if let Some(stripped) = path.strip_prefix("file:/") {
                    (op, stripped)
                } else {
                    (op, &path[1..])
                }
            }
        };

        // Transient errors are common for object stores; there's no harm in
        // retrying temporary failures for the local backends either.
        let operator = operator.layer(RetryLayer::new());

        Ok((operator, relative_path))
    }
}

/// The struct that represents the metadata of a file.
pub struct FileMetadata {
    /// The size of the file.
    pub size: u64,
}

/// Input file is used for reading from files.
#[derive(Debug)]
pub struct InputFile {
    op: Operator,
    /// Absolute path of file.
    path: String,
    /// Relative path of file to uri, starts at [`relative_path_pos`].
    relative_path_pos: usize,
}

impl InputFile {
    /// Absolute path to root uri.
    pub fn location(&self) -> &str {
        &self.path
    }

    /// Check if file exists.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.op.exists(&self.path[self.relative_path_pos..]).await?)
    }

    /// Fetch and returns metadata of file.
    pub async fn metadata(&self) -> Result<FileMetadata> {
        let meta = self.op.stat(&self.path[self.relative_path_pos..]).await?;

        Ok(FileMetadata {
            size: meta.content_length(),
        })
    }

    /// Read and returns whole content of file.
    pub async fn read(&self) -> Result<Bytes> {
        Ok(self
            .op
            .read(&self.path[self.relative_path_pos..])
            .await?
            .to_bytes())
    }
}

/// Output file is used for writing to files.
#[derive(Debug)]
pub struct OutputFile {
    op: Operator,
    /// Absolute path of file.
    path: String,
    /// Relative path of file to uri, starts at [`relative_path_pos`].
    relative_path_pos: usize,
}

impl OutputFile {
    /// Absolute path to root uri.
    pub fn location(&self) -> &str {
        &self.path
    }

    /// Checks if file exists.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.op.exists(&self.path[self.relative_path_pos..]).await?)
    }

    /// Converts into [`InputFile`].
    pub fn to_input_file(self) -> InputFile {
        InputFile {
            op: self.op,
            path: self.path,
            relative_path_pos: self.relative_path_pos,
        }
    }

    /// Write the given bytes to the output file.
    ///
    /// # Notes
    ///
    /// Calling `write` will overwrite the file if it exists.
    pub async fn write(&self, bs: Bytes) -> Result<()> {
        Ok(self
            .op
            .write(&self.path[self.relative_path_pos..], bs)
            .await
            .map(|_| ())?)
    }
}
