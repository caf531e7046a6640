//! The unsynchronized chain of nodes behind a [`Queue`](crate::Queue).
//!
//! Elements live in a singly linked list of nodes. Each node owns a buffer that is filled from
//! the back and drained from the front by advancing `head_offset`; the buffer itself is never
//! shifted. Drained slots are left as `None` until the whole node is released.
//!
//! Nodes are heap-allocated with `Box::into_raw` and reached only through raw pointers, so the
//! head and tail may point at the same node. A node is freed with `Box::from_raw` when it is
//! unlinked from the head or when the chain is cleared.

use crate::config::Sizing;

use core::iter;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// A single segment of the chain.
pub(crate) struct Node<T> {
    /// Elements of this node. Slots before the head offset have already been moved out.
    slots: Vec<Option<T>>,

    /// The node after this one.
    next: Option<NonNull<Node<T>>>,
}

impl<T> Node<T> {
    /// Allocates an empty node on the heap.
    fn alloc(capacity: usize) -> NonNull<Node<T>> {
        let node = Box::new(Node {
            slots: Vec::with_capacity(capacity),
            next: None,
        });

        // SAFETY: `Box::into_raw` never returns a null pointer.
        unsafe { NonNull::new_unchecked(Box::into_raw(node)) }
    }

    /// Number of slots written to this node, drained or not.
    #[inline]
    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Makes room for `additional` more elements without exceeding `ceiling`.
    ///
    /// The buffer grows by doubling, so a first node that starts small reaches its ceiling
    /// after a logarithmic number of reallocations.
    fn reserve(&mut self, additional: usize, ceiling: usize) {
        let needed = self.slots.len() + additional;
        let capacity = self.slots.capacity();
        debug_assert!(needed <= ceiling);

        if needed > capacity {
            let target = needed.max(capacity * 2).min(ceiling);
            self.slots.reserve_exact(target - self.slots.len());
        }
    }

    #[inline]
    fn push(&mut self, value: T, ceiling: usize) {
        self.reserve(1, ceiling);
        self.slots.push(Some(value));
    }

    fn extend<I>(&mut self, values: I, count: usize, ceiling: usize)
    where
        I: Iterator<Item = T>,
    {
        self.reserve(count, ceiling);
        self.slots.extend(values.map(Some));
    }
}

/// The state guarded by the queue's lock.
pub(crate) struct Chain<T> {
    /// The node being drained.
    head: Option<NonNull<Node<T>>>,

    /// The last node of the chain, used for appends.
    ///
    /// `None` exactly when `head` is.
    tail: Option<NonNull<Node<T>>>,

    /// Index of the next element to remove from `head`.
    head_offset: usize,

    /// Number of slots written to `tail`.
    tail_offset: usize,

    /// Total number of live elements.
    len: usize,

    /// Element limit of the tail node.
    last_ceiling: usize,

    /// Growth policy for nodes allocated from now on.
    sizing: Sizing,

    /// The chain owns every node reachable from `head`.
    _marker: PhantomData<Box<Node<T>>>,
}

// SAFETY: every node is owned by exactly one chain and only touched through `&self` or
// `&mut self`, so the chain is exactly as thread-safe as the elements it owns.
unsafe impl<T: Send> Send for Chain<T> {}
unsafe impl<T: Sync> Sync for Chain<T> {}

impl<T> Chain<T> {
    /// Create a new, empty chain.
    pub(crate) fn new(sizing: Sizing) -> Self {
        Chain {
            head: None,
            tail: None,
            head_offset: 0,
            tail_offset: 0,
            len: 0,
            last_ceiling: 0,
            sizing,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn sizing(&self) -> Sizing {
        self.sizing
    }

    /// Swap the growth policy. Existing nodes keep their capacity and ceiling.
    pub(crate) fn set_sizing(&mut self, sizing: Sizing) {
        self.sizing = sizing;
    }

    /// Add a single element at the tail.
    pub(crate) fn push(&mut self, value: T) {
        let mut tail = self.writable_tail();
        let ceiling = self.last_ceiling;

        // SAFETY: `tail` is a live node of this chain and `&mut self` makes this the only
        // reference to it.
        unsafe { tail.as_mut() }.push(value, ceiling);

        self.tail_offset += 1;
        self.len += 1;
    }

    /// Add all `values` at the tail, filling the current tail before allocating new nodes.
    pub(crate) fn enqueue(&mut self, values: Vec<T>) {
        let count = values.len();
        let mut values = values.into_iter();
        let mut remaining = count;

        while remaining > 0 {
            let mut tail = self.writable_tail();
            let ceiling = self.last_ceiling;
            let batch = remaining.min(ceiling - self.tail_offset);

            // SAFETY: `tail` is a live node of this chain and `&mut self` makes this the only
            // reference to it.
            unsafe { tail.as_mut() }.extend(values.by_ref().take(batch), batch, ceiling);

            self.tail_offset += batch;
            remaining -= batch;
        }

        self.len += count;
    }

    /// Remove the element at the head.
    pub(crate) fn pop(&mut self) -> Option<T> {
        let mut head = self.head?;

        // SAFETY: `head` is a live node of this chain and `&mut self` makes this the only
        // reference to it. The reference is not used past `unlink_head`.
        let node = unsafe { head.as_mut() };
        let value = node.slots[self.head_offset].take();
        debug_assert!(value.is_some(), "live slot was already drained");

        self.head_offset += 1;
        self.len -= 1;

        if self.head_offset >= node.len() {
            self.unlink_head();
        }

        value
    }

    /// Remove up to `count` elements from the head, in order.
    pub(crate) fn dequeue(&mut self, mut count: usize) -> Vec<T> {
        let mut items = Vec::with_capacity(count.min(self.len));

        while count > 0 {
            let mut head = match self.head {
                Some(head) => head,
                None => break,
            };

            // SAFETY: `head` is a live node of this chain and `&mut self` makes this the only
            // reference to it. The reference is not used past `unlink_head`.
            let node = unsafe { head.as_mut() };
            let start = self.head_offset;
            let available = node.len() - start;

            if count < available {
                let end = start + count;
                items.extend(node.slots[start..end].iter_mut().filter_map(Option::take));

                self.head_offset = end;
                self.len -= count;
                break;
            }

            items.extend(node.slots[start..].iter_mut().filter_map(Option::take));
            count -= available;
            self.len -= available;
            self.unlink_head();
        }

        items
    }

    /// The element at the head, if any.
    #[inline]
    pub(crate) fn front(&self) -> Option<&T> {
        let head = self.head?;

        // SAFETY: `head` is a live node of this chain; `&self` rules out concurrent mutation.
        let node = unsafe { head.as_ref() };
        node.slots.get(self.head_offset)?.as_ref()
    }

    /// The live part of every node, head first.
    pub(crate) fn segments(&self) -> impl Iterator<Item = &[Option<T>]> + '_ {
        let head_offset = self.head_offset;

        self.nodes().enumerate().map(move |(i, node)| {
            if i == 0 {
                &node.slots[head_offset..]
            } else {
                &node.slots[..]
            }
        })
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes().count()
    }

    /// Release every node and reset the cursors. The growth policy is kept.
    pub(crate) fn clear(&mut self) {
        let mut next = self.head.take();

        // Reset before dropping any element, so a panicking destructor leaves an empty chain.
        // The nodes after the panicking one are leaked.
        self.tail = None;
        self.head_offset = 0;
        self.tail_offset = 0;
        self.len = 0;
        self.last_ceiling = 0;

        while let Some(node) = next {
            // SAFETY: `node` was allocated by `Node::alloc` and is no longer reachable from
            // the chain, so it is freed exactly once.
            let node = unsafe { Box::from_raw(node.as_ptr()) };
            next = node.next;
        }
    }

    fn nodes(&self) -> impl Iterator<Item = &Node<T>> + '_ {
        // SAFETY: every pointer reachable from `head` is a live node of this chain, and
        // `&self` rules out concurrent mutation.
        let first = self.head.map(|node| unsafe { &*node.as_ptr() });
        iter::successors(first, |node| node.next.map(|next| unsafe { &*next.as_ptr() }))
    }

    /// Return a tail node with room for at least one more element, allocating one if needed.
    fn writable_tail(&mut self) -> NonNull<Node<T>> {
        match self.tail {
            None => {
                let sizes = self.sizing.current();
                self.link(
                    sizes.first_node_initial_capacity(),
                    sizes.first_node_capacity_ceiling(),
                )
            }
            Some(_) if self.tail_offset >= self.last_ceiling => {
                let internal = self.sizing.current().internal_node_capacity();
                self.link(internal, internal)
            }
            Some(tail) => tail,
        }
    }

    /// Append a fresh node and make it the tail.
    fn link(&mut self, capacity: usize, ceiling: usize) -> NonNull<Node<T>> {
        let node = Node::alloc(capacity);

        match self.tail {
            None => self.head = Some(node),
            // SAFETY: `tail` is a live node of this chain and `&mut self` makes this the only
            // reference to it.
            Some(mut tail) => unsafe {
                debug_assert!(tail.as_ref().next.is_none());
                tail.as_mut().next = Some(node);
            },
        }

        self.tail = Some(node);
        self.tail_offset = 0;
        self.last_ceiling = ceiling;

        tracing::trace!(capacity, ceiling, len = self.len, "allocated queue node");
        node
    }

    /// Free the head node and move on to the next one.
    fn unlink_head(&mut self) {
        if let Some(head) = self.head {
            // SAFETY: `head` was allocated by `Node::alloc`; it is unlinked right here, so it is
            // freed exactly once.
            let head = unsafe { Box::from_raw(head.as_ptr()) };
            self.head = head.next;
            self.head_offset = 0;

            if self.head.is_none() {
                self.tail = None;
                self.tail_offset = 0;
                self.last_ceiling = 0;
            }

            tracing::trace!(drained = head.len(), len = self.len, "released queue node");
        }
    }
}

impl<T> Drop for Chain<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SliceSizes;

    fn chain(first_initial: usize, first_ceiling: usize, internal: usize) -> Chain<u32> {
        Chain::new(Sizing::Fixed(
            SliceSizes::new(first_initial, first_ceiling, internal).unwrap(),
        ))
    }

    fn capacities(chain: &Chain<u32>) -> Vec<usize> {
        chain.nodes().map(|node| node.slots.capacity()).collect()
    }

    #[test]
    fn first_node_grows_up_to_ceiling() {
        let mut chain = chain(1, 10, 32);

        chain.push(0);
        assert_eq!(capacities(&chain), [1]);
        chain.push(1);
        assert_eq!(capacities(&chain), [2]);
        chain.push(2);
        assert_eq!(capacities(&chain), [4]);

        for i in 3..10 {
            chain.push(i);
        }
        assert_eq!(capacities(&chain), [10]);

        chain.push(10);
        assert_eq!(capacities(&chain), [10, 32]);
    }

    #[test]
    fn zero_initial_capacity() {
        let mut chain = chain(0, 4, 8);
        chain.push(7);
        assert_eq!(capacities(&chain), [1]);
        assert_eq!(chain.pop(), Some(7));
        assert!(chain.head.is_none());
    }

    #[test]
    fn tail_offset_tracks_tail_fill() {
        let mut chain = chain(1, 4, 8);

        chain.push(0);
        chain.push(1);
        assert_eq!(chain.tail_offset, 2);

        chain.enqueue((2..7).collect());
        assert_eq!(chain.tail_offset, 3);
        assert_eq!(chain.segments().map(<[_]>::len).collect::<Vec<_>>(), [4, 3]);

        chain.push(7);
        assert_eq!(chain.tail_offset, 4);
    }

    #[test]
    fn tail_cleared_when_drained() {
        let mut chain = chain(1, 4, 8);

        chain.enqueue((0..6).collect());
        assert_eq!(chain.dequeue(6), [0, 1, 2, 3, 4, 5]);
        assert!(chain.head.is_none());
        assert!(chain.tail.is_none());
        assert_eq!(chain.tail_offset, 0);

        // A drained chain starts over with a first node.
        chain.push(9);
        assert_eq!(capacities(&chain), [1]);
    }

    #[test]
    fn drained_slots_are_emptied() {
        let mut chain = chain(4, 4, 4);

        chain.enqueue((0..4).collect());
        assert_eq!(chain.dequeue(2), [0, 1]);

        let head = chain.nodes().next().unwrap();
        assert_eq!(head.slots, [None, None, Some(2), Some(3)]);
        assert_eq!(chain.front(), Some(&2));
    }

    #[test]
    fn push_after_pop_on_single_node() {
        let mut chain = chain(4, 4, 8);

        // Head and tail are the same node while it is written through both.
        chain.push(0);
        chain.push(1);
        assert_eq!(chain.pop(), Some(0));
        chain.push(2);

        assert_eq!(chain.node_count(), 1);
        assert_eq!(chain.front(), Some(&1));
        assert_eq!(chain.segments().next().unwrap(), [Some(1), Some(2)]);

        chain.enqueue((3..6).collect());
        assert_eq!(chain.node_count(), 2);
        assert_eq!(chain.dequeue(5), [1, 2, 3, 4, 5]);
        assert!(chain.head.is_none());
        assert!(chain.tail.is_none());
    }

    #[test]
    fn clear_handles_long_chains() {
        let mut chain = chain(1, 1, 1);
        chain.enqueue((0..100_000).collect());
        assert_eq!(chain.node_count(), 100_000);

        chain.clear();
        assert_eq!(chain.node_count(), 0);
        assert_eq!(chain.len(), 0);
    }
}
