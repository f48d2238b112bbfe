// In-memory implementation of PatternSource.
//
// Backs a store with a plain vector of lines: handy for tests and for
// embedders that manage persistence themselves.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::core::patterns::{PatternError, PatternSource};

pub struct InMemoryPatternSource {
    lines: Mutex<Vec<String>>,
}

impl InMemoryPatternSource {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn with_lines(lines: &[&str]) -> Self {
        Self {
            lines: Mutex::new(lines.iter().map(|l| l.to_string()).collect()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for InMemoryPatternSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatternSource for InMemoryPatternSource {
    async fn read_lines(&self) -> Result<Vec<String>, PatternError> {
        Ok(self.lines())
    }

    async fn append_line(&self, line: &str) -> Result<(), PatternError> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }

    async fn write_lines(&self, lines: &[String]) -> Result<(), PatternError> {
        *self.lines.lock().unwrap_or_else(PoisonError::into_inner) = lines.to_vec();
        Ok(())
    }
}
