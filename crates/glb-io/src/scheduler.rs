//! Task scheduling for conversion units.
//!
//! Every attribute of every primitive becomes one [`ConversionUnit`]: a
//! source window, the converter selected for it, an optional sparse patch,
//! and the exclusively borrowed slice it writes into. Units never share a
//! destination, so a [`Batch`] can run them in any order or in parallel and
//! the result is the same. [`Batch::wait_all`] is the only join point.
//!
//! ```ignore
//! let scheduler = TaskScheduler::new(ExecutionStrategy::Parallel);
//! let mut batch = scheduler.batch();
//! batch.enqueue(ConversionUnit::new(label, plan, Destination::F32 { data, components: 3 }));
//! batch.wait_all()?;
//! ```

use std::mem;

use glb_core::{
    flip_triangles, select, Converter, ConverterKey, DecodeError, DecodeResult, Destination, OutputKind,
    ResolvedWindow, Semantic, SparsePatcher, SparseWindows, Winding,
};

use crate::assembler::AttributeSlot;
use crate::options::ExecutionStrategy;

/// Identifies the output a unit writes: which primitive of the batch, and
/// which attribute of that primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitLabel {
    pub primitive: usize,
    pub slot: AttributeSlot,
}

impl UnitLabel {
    pub fn new(primitive: usize, slot: AttributeSlot) -> Self {
        Self { primitive, slot }
    }
}

/// Outcome of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    pub label: UnitLabel,
    pub result: DecodeResult<()>,
}

/// Everything a unit needs except its destination.
#[derive(Debug, Clone, Copy)]
pub struct ConversionPlan<'a> {
    window: ResolvedWindow<'a>,
    converter: Converter,
    sparse: Option<SparsePatcher<'a>>,
    flip_after_patch: bool,
}

impl<'a> ConversionPlan<'a> {
    /// Selects the converters for `window` in the role `semantic`.
    ///
    /// A sparse index buffer is converted unflipped, patched, then flipped,
    /// so sparse indices keep addressing the original positions.
    pub fn new(
        semantic: Semantic,
        window: ResolvedWindow<'a>,
        sparse: Option<SparseWindows<'a>>,
        winding: Winding,
    ) -> DecodeResult<Self> {
        let flip_after_patch = sparse.is_some() && semantic == Semantic::TriangleIndex && winding == Winding::Flip;
        let key_winding = if flip_after_patch { Winding::Preserve } else { winding };

        let converter = select(ConverterKey::for_window(semantic, &window, key_winding))?;
        let sparse = sparse
            .map(|windows| SparsePatcher::new(windows, converter.key()))
            .transpose()?;

        if flip_after_patch && window.count % 3 != 0 {
            return Err(DecodeError::structural(format!(
                "Cannot flip winding of {} indices, not a multiple of 3",
                window.count
            )));
        }

        Ok(Self {
            window,
            converter,
            sparse,
            flip_after_patch,
        })
    }

    pub fn output(&self) -> OutputKind {
        self.converter.output()
    }

    /// Number of output elements.
    pub fn count(&self) -> usize {
        self.window.count
    }

    pub fn window(&self) -> &ResolvedWindow<'a> {
        &self.window
    }
}

/// One schedulable conversion.
#[derive(Debug)]
pub struct ConversionUnit<'a> {
    label: UnitLabel,
    plan: ConversionPlan<'a>,
    destination: Destination<'a>,
}

impl<'a> ConversionUnit<'a> {
    pub fn new(label: UnitLabel, plan: ConversionPlan<'a>, destination: Destination<'a>) -> Self {
        Self {
            label,
            plan,
            destination,
        }
    }

    pub fn label(&self) -> UnitLabel {
        self.label
    }

    /// Converts, patches and (if deferred) flips into the destination.
    pub fn run(mut self) -> DecodeResult<()> {
        log::trace!(
            "Converting {:?} of primitive {} ({} elements, {})",
            self.label.slot,
            self.label.primitive,
            self.plan.window.count,
            self.plan.converter.key()
        );
        self.plan.converter.run(&self.plan.window, &mut self.destination)?;
        if let Some(patcher) = &self.plan.sparse {
            patcher.apply(&mut self.destination)?;
        }
        if self.plan.flip_after_patch {
            if let Destination::I32(indices) = &mut self.destination {
                flip_triangles(indices)?;
            }
        }
        Ok(())
    }
}

/// Runs batches of conversion units with a fixed execution strategy.
#[derive(Debug)]
pub struct TaskScheduler {
    strategy: ExecutionStrategy,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(ExecutionStrategy::default())
    }
}

impl TaskScheduler {
    pub fn new(strategy: ExecutionStrategy) -> Self {
        #[cfg(feature = "parallel")]
        {
            let pool = match strategy {
                ExecutionStrategy::Pool { threads } => {
                    match rayon::ThreadPoolBuilder::new().num_threads(threads.max(1)).build() {
                        Ok(pool) => Some(pool),
                        Err(e) => {
                            log::warn!("Falling back to the global pool: {}", e);
                            None
                        }
                    }
                }
                _ => None,
            };
            Self { strategy, pool }
        }
        #[cfg(not(feature = "parallel"))]
        {
            Self { strategy }
        }
    }

    /// A scheduler with a dedicated pool of `threads` workers.
    pub fn with_threads(threads: usize) -> Self {
        Self::new(ExecutionStrategy::Pool { threads })
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Starts an empty batch.
    pub fn batch<'a>(&self) -> Batch<'_, 'a> {
        Batch {
            scheduler: self,
            units: Vec::new(),
        }
    }

    fn execute(&self, units: Vec<ConversionUnit<'_>>) -> Vec<UnitReport> {
        match self.strategy {
            ExecutionStrategy::Sequential => run_sequential(units),
            #[cfg(feature = "parallel")]
            ExecutionStrategy::Parallel => run_parallel(units),
            #[cfg(feature = "parallel")]
            ExecutionStrategy::Pool { .. } => match &self.pool {
                Some(pool) => pool.install(|| run_parallel(units)),
                None => run_parallel(units),
            },
            #[cfg(not(feature = "parallel"))]
            _ => run_sequential(units),
        }
    }
}

fn run_unit(unit: ConversionUnit<'_>) -> UnitReport {
    let label = unit.label();
    UnitReport {
        label,
        result: unit.run(),
    }
}

fn run_sequential(units: Vec<ConversionUnit<'_>>) -> Vec<UnitReport> {
    units.into_iter().map(run_unit).collect()
}

#[cfg(feature = "parallel")]
fn run_parallel(units: Vec<ConversionUnit<'_>>) -> Vec<UnitReport> {
    use rayon::prelude::*;

    units.into_par_iter().map(run_unit).collect()
}

/// A set of units joined by a single wait.
///
/// Units only run inside [`Batch::wait_all`] or [`Batch::wait_all_reports`].
/// Dropping a batch without waiting abandons it: nothing runs and the
/// destination storage keeps whatever it held before.
#[derive(Debug)]
pub struct Batch<'s, 'a> {
    scheduler: &'s TaskScheduler,
    units: Vec<ConversionUnit<'a>>,
}

impl<'s, 'a> Batch<'s, 'a> {
    pub fn enqueue(&mut self, unit: ConversionUnit<'a>) {
        self.units.push(unit);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Runs every unit and returns the first error in enqueue order.
    ///
    /// All units run to completion even when one fails.
    pub fn wait_all(self) -> DecodeResult<()> {
        self.wait_all_reports()
            .into_iter()
            .find_map(|report| report.result.err())
            .map_or(Ok(()), Err)
    }

    /// Runs every unit and returns one report per unit, in enqueue order.
    pub fn wait_all_reports(mut self) -> Vec<UnitReport> {
        let units = mem::take(&mut self.units);
        log::debug!(
            "Running batch of {} units ({:?})",
            units.len(),
            self.scheduler.strategy()
        );
        self.scheduler.execute(units)
    }
}

impl Drop for Batch<'_, '_> {
    fn drop(&mut self) {
        if !self.units.is_empty() {
            log::debug!("Abandoning batch of {} units", self.units.len());
        }
    }
}
