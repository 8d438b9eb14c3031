//! Result matrix
//!
//! One write-once slot per document ordinal. Owned and mutated only by the
//! coordinator's distribution loop.

use crate::distributed::protocol::{expect_vector_len, ProtocolError};
use crate::error::try_reserve;
use crate::profile::ProfileVector;
use crate::Result;

/// Ordinal → profile storage
#[derive(Debug)]
pub struct ResultMatrix {
    dict_size: usize,
    rows: Vec<Option<ProfileVector>>,
    filled: usize,
}

impl ResultMatrix {
    /// Reserve one slot per document for profiles of `dict_size` counters
    pub fn new(documents: usize, dict_size: usize) -> Result<Self> {
        let mut rows = Vec::new();
        try_reserve(&mut rows, documents, "result matrix")?;
        rows.resize_with(documents, || None);

        Ok(Self {
            dict_size,
            rows,
            filled: 0,
        })
    }

    pub fn dict_size(&self) -> usize {
        self.dict_size
    }

    /// Number of documents the matrix holds
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of ordinals written so far
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.rows.len()
    }

    /// Store the profile for `ordinal`
    pub fn record(&mut self, ordinal: usize, vector: ProfileVector) -> Result<()> {
        expect_vector_len(&vector, self.dict_size)?;
        let slot = self
            .rows
            .get_mut(ordinal)
            .ok_or(ProtocolError::UnknownOrdinal(ordinal))?;
        if slot.is_some() {
            return Err(ProtocolError::DuplicateResult(ordinal).into());
        }
        *slot = Some(vector);
        self.filled += 1;
        Ok(())
    }

    /// Profile for `ordinal`, if recorded
    pub fn get(&self, ordinal: usize) -> Option<&ProfileVector> {
        self.rows.get(ordinal).and_then(|r| r.as_ref())
    }

    /// Hand off the completed rows in ordinal order
    pub fn into_rows(self) -> Result<Vec<ProfileVector>> {
        if !self.is_complete() {
            return Err(ProtocolError::Incomplete {
                recorded: self.filled,
                expected: self.rows.len(),
            }
            .into());
        }
        Ok(self.rows.into_iter().flatten().collect())
    }
}
