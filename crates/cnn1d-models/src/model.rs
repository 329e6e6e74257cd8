//! Deployable model: dimensions plus weight tables

use crate::error::{ModelError, Result};
use crate::parser;
use bytes::Bytes;
use cnn1d_driver::{Cnn1dKernel, Tables};
use cnn1d_ip::{Dims, ResourceBudget};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Loaded Conv1D + Dense model
#[derive(Debug, Clone)]
pub struct Model {
    /// Weight tables, shared with every kernel built from this model
    tables: Arc<Tables>,

    /// Blob this model was parsed from, if any
    data: Option<Bytes>,
}

impl Model {
    /// Wrap already validated tables.
    pub fn new(tables: Tables) -> Self {
        Self {
            tables: Arc::new(tables),
            data: None,
        }
    }

    /// Load model from file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        tracing::info!("Loading model from: {}", path.display());

        if !path.exists() {
            return Err(ModelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Parse model from bytes
    ///
    /// # Errors
    ///
    /// Returns error if parsing fails.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        tracing::debug!("Parsing model ({} bytes)", data.len());

        let tables = parser::parse(&data)?;
        tracing::info!(
            "Model loaded: {} ({} parameters)",
            tables.dims(),
            tables.dims().parameter_count()
        );

        Ok(Self {
            tables: Arc::new(tables),
            data: Some(data),
        })
    }

    /// Serialise to the blob format.
    ///
    /// # Errors
    ///
    /// Returns error if a dimension does not fit the header.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match &self.data {
            Some(data) => Ok(data.clone()),
            None => parser::pack(&self.tables),
        }
    }

    /// Write the blob to `path`.
    ///
    /// # Errors
    ///
    /// Returns error if packing or writing fails.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let blob = self.to_bytes()?;
        fs::write(path, &blob)?;
        tracing::info!("Wrote {} bytes to {}", blob.len(), path.display());
        Ok(())
    }

    /// Model dimensions
    pub fn dims(&self) -> Dims {
        self.tables.dims()
    }

    /// Shared weight tables
    pub fn tables(&self) -> &Arc<Tables> {
        &self.tables
    }

    /// Total number of weights and biases
    pub fn parameter_count(&self) -> usize {
        self.dims().parameter_count()
    }

    /// Size of the serialised blob in bytes
    pub fn blob_size(&self) -> usize {
        self.data
            .as_ref()
            .map_or_else(|| parser::encoded_len(&self.dims()), Bytes::len)
    }

    /// Sequential kernel over this model's tables.
    pub fn kernel(&self) -> Cnn1dKernel {
        Cnn1dKernel::new(Arc::clone(&self.tables))
    }

    /// Kernel sized to a multiplier budget.
    ///
    /// # Errors
    ///
    /// Returns error if a worker pool cannot be built.
    pub fn kernel_with_budget(&self, budget: ResourceBudget) -> Result<Cnn1dKernel> {
        Ok(self.kernel().with_budget(budget)?)
    }
}

impl From<Tables> for Model {
    fn from(tables: Tables) -> Self {
        Self::new(tables)
    }
}
