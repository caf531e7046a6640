//! An unbounded, thread-safe FIFO queue built from a chain of growable slices.
//!
//! Elements are stored in a singly linked list of nodes. The first node starts tiny and grows
//! in place up to a small ceiling, so queues that stay short cost a single small allocation.
//! Once it is full, every further node is allocated at a larger fixed capacity, amortizing
//! allocation over many elements for queues that grow long. Drained nodes are released as soon
//! as their last element leaves the queue.
//!
//! All state sits behind one reader/writer lock: mutations take it exclusively, inspections
//! share it. Nothing ever blocks waiting for elements; popping an empty queue returns `None`.
//!
//! The node sizes are tunable, either per queue with [`Queue::with_sizes()`] or for the whole
//! process with [`set_default_slice_sizes()`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use segmented_queue::Queue;
//!
//! let queue = Arc::new(Queue::new());
//!
//! // Fill the queue from another thread.
//! thread::spawn({
//!     let queue = queue.clone();
//!     move || {
//!         queue.enqueue(0..100);
//!         queue.push(100);
//!     }
//! })
//! .join()
//! .unwrap();
//!
//! assert_eq!(queue.len(), 101);
//! assert_eq!(queue.pop(), Some(0));
//! assert_eq!(queue.dequeue(3), [1, 2, 3]);
//! assert_eq!(queue.front(), Some(4));
//! ```

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

mod chain;
mod config;
mod sync;

pub use config::{default_slice_sizes, set_default_slice_sizes, ConfigError, SliceSizes};

use chain::Chain;
use config::Sizing;
use sync::RwLock;

use core::fmt::{self, Write as _};

/// An unbounded FIFO queue of `T`, safe to share between threads.
///
/// [`push()`][Queue::push], [`pop()`][Queue::pop], [`enqueue()`][Queue::enqueue] and
/// [`dequeue()`][Queue::dequeue] hold the queue's lock exclusively for their whole duration.
/// Read-only operations such as [`front()`][Queue::front] and [`len()`][Queue::len] share it.
///
/// There is no atomicity across calls: a `pop()` followed by a `push()` may interleave with
/// operations from other threads.
pub struct Queue<T> {
    chain: RwLock<Chain<T>>,
}

impl<T> Queue<T> {
    /// Creates an empty queue that follows the process-wide growth policy.
    ///
    /// No memory is allocated until the first element is added.
    ///
    /// # Examples
    ///
    /// ```
    /// use segmented_queue::Queue;
    ///
    /// let queue = Queue::<i32>::new();
    /// assert!(queue.is_empty());
    /// assert_eq!(queue.node_count(), 0);
    /// ```
    pub fn new() -> Queue<T> {
        Queue::with_sizing(Sizing::Global)
    }

    /// Creates an empty queue with its own growth policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use segmented_queue::{Queue, SliceSizes};
    ///
    /// let queue = Queue::with_sizes(SliceSizes::new(2, 4, 8).unwrap());
    /// queue.enqueue(0..10);
    ///
    /// // The first node holds 4 elements, the rest go into a node of 8.
    /// assert_eq!(queue.node_lens(), [4, 6]);
    /// ```
    pub fn with_sizes(sizes: SliceSizes) -> Queue<T> {
        Queue::with_sizing(Sizing::Fixed(sizes))
    }

    fn with_sizing(sizing: Sizing) -> Queue<T> {
        Queue {
            chain: RwLock::new(Chain::new(sizing)),
        }
    }

    /// Adds an element to the back of the queue.
    ///
    /// # Examples
    ///
    /// ```
    /// use segmented_queue::Queue;
    ///
    /// let queue = Queue::new();
    /// queue.push('a');
    /// queue.push('b');
    ///
    /// assert_eq!(queue.len(), 2);
    /// assert_eq!(queue.pop(), Some('a'));
    /// ```
    pub fn push(&self, value: T) {
        sync::write(&self.chain).push(value);
    }

    /// Adds every element of `values` to the back of the queue, keeping their order.
    ///
    /// `values` is collected before the lock is taken, and other threads observe either none
    /// or all of the new elements. Space left in the last node is filled first; the remainder
    /// goes into as few new nodes as the growth policy allows.
    ///
    /// # Examples
    ///
    /// ```
    /// use segmented_queue::Queue;
    ///
    /// let queue = Queue::new();
    /// queue.push(0);
    /// queue.enqueue(vec![1, 2, 3]);
    ///
    /// assert_eq!(queue.dequeue(4), [0, 1, 2, 3]);
    /// ```
    pub fn enqueue<I>(&self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() {
            return;
        }

        sync::write(&self.chain).enqueue(values);
    }

    /// Removes the element at the front of the queue.
    ///
    /// Returns `None` if the queue is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use segmented_queue::Queue;
    ///
    /// let queue = Queue::new();
    /// assert_eq!(queue.pop(), None);
    ///
    /// queue.push(5);
    /// assert_eq!(queue.pop(), Some(5));
    /// assert_eq!(queue.pop(), None);
    /// ```
    pub fn pop(&self) -> Option<T> {
        sync::write(&self.chain).pop()
    }

    /// Removes up to `count` elements from the front of the queue, in order.
    ///
    /// If the queue holds fewer than `count` elements, all of them are returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use segmented_queue::Queue;
    ///
    /// let queue: Queue<i32> = (1..=5).collect();
    ///
    /// assert_eq!(queue.dequeue(2), [1, 2]);
    /// assert_eq!(queue.dequeue(10), [3, 4, 5]);
    /// assert!(queue.dequeue(10).is_empty());
    /// ```
    pub fn dequeue(&self, count: usize) -> Vec<T> {
        if count == 0 {
            return Vec::new();
        }

        sync::write(&self.chain).dequeue(count)
    }

    /// Calls `f` with the element at the front of the queue without removing it.
    ///
    /// The shared lock is held while `f` runs, so `f` must not add or remove elements of this
    /// queue.
    ///
    /// # Examples
    ///
    /// ```
    /// use segmented_queue::Queue;
    ///
    /// let queue = Queue::new();
    /// queue.push(String::from("hello"));
    ///
    /// assert_eq!(queue.front_with(|s| s.len()), Some(5));
    /// ```
    pub fn front_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        sync::read(&self.chain).front().map(f)
    }

    /// Returns the number of elements in the queue.
    #[inline]
    pub fn len(&self) -> usize {
        sync::read(&self.chain).len()
    }

    /// Returns `true` if the queue holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of nodes currently allocated.
    ///
    /// This walks the whole chain and is meant for diagnostics.
    pub fn node_count(&self) -> usize {
        sync::read(&self.chain).node_count()
    }

    /// Returns the number of live elements in each node, front node first.
    ///
    /// This walks the whole chain and is meant for diagnostics.
    pub fn node_lens(&self) -> Vec<usize> {
        sync::read(&self.chain).segments().map(<[_]>::len).collect()
    }

    /// Removes every element and releases every node.
    ///
    /// The queue keeps its growth policy and can be used again right away.
    ///
    /// # Examples
    ///
    /// ```
    /// use segmented_queue::Queue;
    ///
    /// let queue: Queue<i32> = (0..300).collect();
    /// queue.reset();
    ///
    /// assert!(queue.is_empty());
    /// assert_eq!(queue.node_count(), 0);
    /// ```
    pub fn reset(&self) {
        let mut chain = sync::write(&self.chain);
        let dropped = chain.len();
        chain.clear();
        drop(chain);

        tracing::debug!(dropped, "reset queue");
    }

    /// Returns the growth policy used for the next node allocation.
    pub fn sizes(&self) -> SliceSizes {
        sync::read(&self.chain).sizing().current()
    }

    /// Pins this queue to `sizes` for every node allocated from now on.
    ///
    /// Nodes that already exist keep their capacity.
    pub fn set_sizes(&self, sizes: SliceSizes) {
        sync::write(&self.chain).set_sizing(Sizing::Fixed(sizes));
        tracing::debug!(?sizes, "pinned queue slice sizes");
    }

    /// Makes this queue follow the process-wide growth policy again.
    pub fn use_default_sizes(&self) {
        sync::write(&self.chain).set_sizing(Sizing::Global);
    }
}

impl<T: Clone> Queue<T> {
    /// Returns a clone of the element at the front of the queue.
    ///
    /// Returns `None` if the queue is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use segmented_queue::Queue;
    ///
    /// let queue = Queue::<i32>::new();
    /// assert_eq!(queue.front(), None);
    ///
    /// queue.push(1);
    /// queue.push(2);
    /// assert_eq!(queue.front(), Some(1));
    /// assert_eq!(queue.len(), 2);
    /// ```
    pub fn front(&self) -> Option<T> {
        self.front_with(T::clone)
    }
}

impl<T: fmt::Debug> Queue<T> {
    /// Renders the live contents of every node, one line per node.
    ///
    /// # Examples
    ///
    /// ```
    /// use segmented_queue::{Queue, SliceSizes};
    ///
    /// let queue = Queue::<i32>::with_sizes(SliceSizes::new(1, 2, 4).unwrap());
    /// assert_eq!(queue.dump(), "Queue is Empty\n");
    ///
    /// queue.enqueue([1, 2, 3]);
    /// queue.pop();
    /// assert_eq!(queue.dump(), "Slice [2], Length = 1\nSlice [3], Length = 1\n");
    /// ```
    pub fn dump(&self) -> String {
        let chain = sync::read(&self.chain);
        let mut out = String::new();

        if chain.len() == 0 {
            out.push_str("Queue is Empty\n");
            return out;
        }

        for segment in chain.segments() {
            let live: Vec<&T> = segment.iter().filter_map(Option::as_ref).collect();
            // Writing into a `String` cannot fail.
            let _ = writeln!(out, "Slice {:?}, Length = {}", live, live.len());
        }

        out
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Queue<T> {
        Queue::new()
    }
}

impl<T> FromIterator<T> for Queue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Queue<T> {
        let queue = Queue::new();
        queue.enqueue(iter);
        queue
    }
}

impl<T> Extend<T> for Queue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.enqueue(iter);
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain = match sync::try_read(&self.chain) {
            Some(chain) => chain,
            None => {
                return f
                    .debug_tuple("Queue")
                    .field(&format_args!("<locked>"))
                    .finish()
            }
        };

        f.debug_struct("Queue")
            .field("len", &chain.len())
            .field("nodes", &chain.node_count())
            .finish()
    }
}
