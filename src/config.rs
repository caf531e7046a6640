//! Growth policy for the nodes of a [`Queue`](crate::Queue).
//!
//! A queue starts with a small first node that grows in place up to a ceiling. Once that
//! ceiling is reached, every further node is allocated at the internal node capacity. Small
//! queues therefore pay for a single tiny allocation, while large queues amortize allocation
//! over many elements per node.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Errors produced when building a [`SliceSizes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The first node must be able to hold at least one element.
    #[error("first node capacity ceiling must be at least 1")]
    ZeroCeiling,

    /// Internal nodes must be able to hold at least one element.
    #[error("internal node capacity must be at least 1")]
    ZeroInternalCapacity,

    /// The first node cannot start out larger than it is allowed to grow.
    #[error("first node initial capacity {initial} exceeds its ceiling {ceiling}")]
    InitialExceedsCeiling {
        /// The requested initial capacity.
        initial: usize,
        /// The requested ceiling.
        ceiling: usize,
    },
}

/// Node sizes used when a queue allocates new nodes.
///
/// # Examples
///
/// ```
/// use segmented_queue::{ConfigError, SliceSizes};
///
/// let sizes = SliceSizes::new(4, 32, 256).unwrap();
/// assert_eq!(sizes.first_node_capacity_ceiling(), 32);
///
/// assert_eq!(
///     SliceSizes::new(8, 4, 256),
///     Err(ConfigError::InitialExceedsCeiling { initial: 8, ceiling: 4 }),
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliceSizes {
    first_initial: usize,
    first_ceiling: usize,
    internal: usize,
}

impl SliceSizes {
    /// The default policy: a first node of 1 element growing up to 16, then nodes of 128.
    pub const DEFAULT: SliceSizes = SliceSizes {
        first_initial: 1,
        first_ceiling: 16,
        internal: 128,
    };

    /// Creates a validated growth policy.
    pub const fn new(
        first_node_initial_capacity: usize,
        first_node_capacity_ceiling: usize,
        internal_node_capacity: usize,
    ) -> Result<SliceSizes, ConfigError> {
        if first_node_capacity_ceiling == 0 {
            return Err(ConfigError::ZeroCeiling);
        }
        if internal_node_capacity == 0 {
            return Err(ConfigError::ZeroInternalCapacity);
        }
        if first_node_initial_capacity > first_node_capacity_ceiling {
            return Err(ConfigError::InitialExceedsCeiling {
                initial: first_node_initial_capacity,
                ceiling: first_node_capacity_ceiling,
            });
        }

        Ok(SliceSizes {
            first_initial: first_node_initial_capacity,
            first_ceiling: first_node_capacity_ceiling,
            internal: internal_node_capacity,
        })
    }

    /// Capacity the first node is allocated with.
    #[inline]
    pub const fn first_node_initial_capacity(&self) -> usize {
        self.first_initial
    }

    /// Number of elements the first node may hold before a second node is started.
    #[inline]
    pub const fn first_node_capacity_ceiling(&self) -> usize {
        self.first_ceiling
    }

    /// Capacity of every node after the first.
    #[inline]
    pub const fn internal_node_capacity(&self) -> usize {
        self.internal
    }
}

impl Default for SliceSizes {
    #[inline]
    fn default() -> Self {
        SliceSizes::DEFAULT
    }
}

static FIRST_INITIAL: AtomicUsize = AtomicUsize::new(SliceSizes::DEFAULT.first_initial);
static FIRST_CEILING: AtomicUsize = AtomicUsize::new(SliceSizes::DEFAULT.first_ceiling);
static INTERNAL: AtomicUsize = AtomicUsize::new(SliceSizes::DEFAULT.internal);

/// Returns the process-wide growth policy.
///
/// Queues created with [`Queue::new()`](crate::Queue::new) read this policy every time they
/// allocate a node.
pub fn default_slice_sizes() -> SliceSizes {
    let first_initial = FIRST_INITIAL.load(Ordering::Acquire);
    let first_ceiling = FIRST_CEILING.load(Ordering::Acquire);
    let internal = INTERNAL.load(Ordering::Acquire);

    // The three values are stored separately, so a concurrent update may be observed halfway.
    // Clamping keeps the mix valid.
    SliceSizes {
        first_initial: first_initial.min(first_ceiling),
        first_ceiling,
        internal,
    }
}

/// Replaces the process-wide growth policy.
///
/// Nodes that already exist keep their size; only nodes allocated afterwards by queues that
/// follow the process-wide policy are affected.
pub fn set_default_slice_sizes(sizes: SliceSizes) {
    // Lower the initial capacity first so readers never see it above the ceiling for long.
    FIRST_INITIAL.store(0, Ordering::Release);
    FIRST_CEILING.store(sizes.first_ceiling, Ordering::Release);
    INTERNAL.store(sizes.internal, Ordering::Release);
    FIRST_INITIAL.store(sizes.first_initial, Ordering::Release);

    tracing::debug!(
        first_initial = sizes.first_initial,
        first_ceiling = sizes.first_ceiling,
        internal = sizes.internal,
        "updated default slice sizes"
    );
}

/// Which growth policy a queue consults when it allocates a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sizing {
    /// Follow the process-wide policy, read at every allocation.
    Global,

    /// Use a policy pinned to this queue.
    Fixed(SliceSizes),
}

impl Sizing {
    /// The policy in force right now.
    #[inline]
    pub(crate) fn current(&self) -> SliceSizes {
        match self {
            Sizing::Global => default_slice_sizes(),
            Sizing::Fixed(sizes) => *sizes,
        }
    }
}
