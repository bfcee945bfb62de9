//! Reference store: append-only cells addressed by index.

use crate::error::{dangling, EvalResult};
use crate::value::Value;

/// Cells live for the rest of the run; nothing is ever freed.
#[derive(Debug, Clone, Default)]
pub struct Store {
    cells: Vec<Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell and return its address.
    pub fn newref(&mut self, value: Value) -> usize {
        self.cells.push(value);
        self.cells.len() - 1
    }

    pub fn deref(&self, index: usize) -> EvalResult<Value> {
        self.cells.get(index).cloned().ok_or_else(|| dangling(index))
    }

    pub fn assign(&mut self, index: usize, value: Value) -> EvalResult<()> {
        let cell = self.cells.get_mut(index).ok_or_else(|| dangling(index))?;
        *cell = value;
        Ok(())
    }

    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
