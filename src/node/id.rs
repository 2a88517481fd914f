//! Node identity generation.
//!
//! Identities are strings unique within the generating process. They are
//! never persisted; restarting the process restarts the sequence.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{IrError, Result};

static GLOBAL: Lazy<IdGenerator> = Lazy::new(IdGenerator::sequential);

/// How [`IdGenerator::next_id`] produces identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// `<prefix>_<n>` with an increasing counter, optionally zero-padded.
    Sequential,
    /// `<prefix>_<hex>` from a random UUID, truncated to the width.
    Random,
}

/// Generator of process-unique node ids.
#[derive(Debug)]
pub struct IdGenerator {
    strategy: IdStrategy,
    width: Option<usize>,
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn sequential() -> Self {
        Self {
            strategy: IdStrategy::Sequential,
            width: None,
            counter: AtomicU64::new(1),
        }
    }

    /// Random ids of `width` hex characters (must be > 4 and <= 32).
    pub fn random(width: usize) -> Result<Self> {
        check_random_width(width)?;
        Ok(Self {
            strategy: IdStrategy::Random,
            width: Some(width),
            counter: AtomicU64::new(1),
        })
    }

    pub fn with_strategy(strategy: IdStrategy, width: Option<usize>) -> Result<Self> {
        match strategy {
            IdStrategy::Sequential => {
                if width == Some(0) {
                    return Err(IrError::Config(
                        "sequential id width must be a positive number".into(),
                    ));
                }
                Ok(Self {
                    width,
                    ..Self::sequential()
                })
            }
            IdStrategy::Random => Self::random(width.unwrap_or(8)),
        }
    }

    /// The process-wide generator used when a node is built without one.
    pub fn global() -> &'static IdGenerator {
        &GLOBAL
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    /// Next id following the configured strategy.
    pub fn next_id(&self, prefix: Option<&str>) -> String {
        match self.strategy {
            IdStrategy::Sequential => self.format_sequential(prefix, self.width),
            IdStrategy::Random => random_hex(prefix, self.width.unwrap_or(8)),
        }
    }

    /// Next sequential id, regardless of the configured strategy.
    pub fn sequential_id(&self, prefix: Option<&str>, width: Option<usize>) -> Result<String> {
        if width == Some(0) {
            return Err(IrError::Config(
                "sequential id width must be a positive number".into(),
            ));
        }
        Ok(self.format_sequential(prefix, width))
    }

    /// A random id, regardless of the configured strategy.
    pub fn random_id(&self, prefix: Option<&str>, width: usize) -> Result<String> {
        check_random_width(width)?;
        Ok(random_hex(prefix, width))
    }

    /// Restart the sequence at `start`.
    ///
    /// Restarting below the next pending value can hand out ids that were
    /// already issued, so uniqueness is no longer guaranteed afterwards.
    pub fn reset_sequence(&self, start: u64) {
        let previous = self.counter.swap(start, Ordering::SeqCst);
        if start < previous {
            tracing::warn!(
                start,
                previous,
                "unsafe reset of id sequence: ids may repeat"
            );
        }
    }

    fn format_sequential(&self, prefix: Option<&str>, width: Option<usize>) -> String {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        let digits = match width {
            Some(w) => format!("{:0w$}", count, w = w),
            None => count.to_string(),
        };
        with_prefix(prefix, digits)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::sequential()
    }
}

fn check_random_width(width: usize) -> Result<()> {
    if width <= 4 || width > 32 {
        return Err(IrError::Config(format!(
            "random id width must be in 5..=32 ({} provided)",
            width
        )));
    }
    Ok(())
}

fn random_hex(prefix: Option<&str>, width: usize) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    with_prefix(prefix, hex[..width].to_string())
}

fn with_prefix(prefix: Option<&str>, body: String) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}_{}", p, body),
        _ => body,
    }
}
