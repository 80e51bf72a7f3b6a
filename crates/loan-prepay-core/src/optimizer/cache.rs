//! Memoised simulations for one optimisation run.
//!
//! Keyed by the full strategy tuple (lump sum, recurring extra, duration
//! cap) for a single loan configuration. Each key owns a `OnceLock`, so
//! concurrent workers asking for the same strategy block on one evaluation
//! and share its result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::amortization::{LedgerMode, SimulationEngine, SimulationResult, StrategyParameters};
use crate::LoanPrepayResult;

type Slot = Arc<OnceLock<Arc<SimulationResult>>>;

#[derive(Debug)]
pub struct SimulationCache {
    engine: SimulationEngine,
    slots: Mutex<HashMap<StrategyParameters, Slot>>,
    evaluations: AtomicUsize,
    hits: AtomicUsize,
}

/// Counters exposed for instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub evaluations: usize,
    pub hits: usize,
}

impl SimulationCache {
    pub fn new(engine: SimulationEngine) -> Self {
        Self {
            engine,
            slots: Mutex::new(HashMap::new()),
            evaluations: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    /// Summary simulation of `strategy`, computed at most once.
    pub fn get_or_simulate(
        &self,
        strategy: &StrategyParameters,
    ) -> LoanPrepayResult<Arc<SimulationResult>> {
        strategy.validate()?;

        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            slots
                .entry(strategy.clone())
                .or_insert_with(|| Arc::new(OnceLock::new()))
                .clone()
        };

        let mut computed = false;
        let result = slot.get_or_init(|| {
            computed = true;
            self.evaluations.fetch_add(1, Ordering::Relaxed);
            Arc::new(self.engine.run(strategy, LedgerMode::SummaryOnly))
        });
        if !computed {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Arc::clone(result))
    }

    /// Number of underlying engine runs so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .slots
            .lock()
            .map(|slots| slots.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len());
        CacheStats {
            entries,
            evaluations: self.evaluations(),
            hits: self.hits(),
        }
    }
}
