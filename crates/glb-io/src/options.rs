use glb_core::Winding;

/// How conversion units are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// On the calling thread, in enqueue order.
    Sequential,
    /// On the global rayon pool.
    #[default]
    Parallel,
    /// On a dedicated pool of `threads` workers.
    Pool { threads: usize },
}

/// What happens when an optional attribute fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionalAttributePolicy {
    /// The whole primitive fails.
    #[default]
    Fail,
    /// The attribute is dropped and recorded in `DecodedPrimitive::skipped`.
    Skip,
}

/// How `decode_all_primitives` groups units into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchGranularity {
    /// One batch and one join per primitive.
    #[default]
    PerPrimitive,
    /// A single batch for the whole asset.
    WholeAsset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    winding: Winding,
    execution: ExecutionStrategy,
    optional_policy: OptionalAttributePolicy,
    batching: BatchGranularity,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn winding(&self) -> Winding {
        self.winding
    }

    pub fn with_winding(mut self, winding: Winding) -> Self {
        self.winding = winding;
        self
    }

    pub fn execution(&self) -> ExecutionStrategy {
        self.execution
    }

    pub fn with_execution(mut self, execution: ExecutionStrategy) -> Self {
        self.execution = execution;
        self
    }

    pub fn optional_policy(&self) -> OptionalAttributePolicy {
        self.optional_policy
    }

    pub fn with_optional_policy(mut self, policy: OptionalAttributePolicy) -> Self {
        self.optional_policy = policy;
        self
    }

    pub fn batching(&self) -> BatchGranularity {
        self.batching
    }

    pub fn with_batching(mut self, batching: BatchGranularity) -> Self {
        self.batching = batching;
        self
    }
}
