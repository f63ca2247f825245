//! Canned-distribution backend for development and tests.
//!
//! Lets the whole cycle run without a trained artifact: the distribution
//! is fixed at construction, so arbitration and dispatch behavior can be
//! exercised end to end.

use tracing::debug;

use crate::classifier::CommandModel;
use crate::error::Result;

pub struct StubModel {
    probs: Vec<f32>,
}

impl StubModel {
    /// Always answer with the given distribution.
    pub fn fixed(probs: Vec<f32>) -> Self {
        Self { probs }
    }

    /// Uniform over `n` classes, the "undecided" development default.
    pub fn uniform(n: usize) -> Self {
        let p = if n == 0 { 0.0 } else { 1.0 / n as f32 };
        Self { probs: vec![p; n] }
    }
}

impl CommandModel for StubModel {
    fn warm_up(&mut self) -> Result<()> {
        debug!(classes = self.probs.len(), "stub model ready");
        Ok(())
    }

    fn infer(&mut self, _features: &[f32]) -> Result<Vec<f32>> {
        Ok(self.probs.clone())
    }
}
