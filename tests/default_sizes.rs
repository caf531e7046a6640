//! The process-wide growth policy.
//!
//! Kept in its own test binary with a single test, since it mutates global state.

use segmented_queue::{default_slice_sizes, set_default_slice_sizes, Queue, SliceSizes};

#[test]
fn process_wide_sizes() {
    assert_eq!(default_slice_sizes(), SliceSizes::DEFAULT);

    let following = Queue::new();
    let pinned = Queue::with_sizes(SliceSizes::DEFAULT);

    following.enqueue(0..20);
    pinned.enqueue(0..20);
    assert_eq!(following.node_lens(), [16, 4]);
    assert_eq!(pinned.node_lens(), [16, 4]);

    let small = SliceSizes::new(2, 4, 6).unwrap();
    set_default_slice_sizes(small);
    assert_eq!(default_slice_sizes(), small);
    assert_eq!(following.sizes(), small);
    assert_eq!(pinned.sizes(), SliceSizes::DEFAULT);

    // Existing nodes are untouched; the next node follows the new policy.
    following.enqueue(20..144);
    assert_eq!(following.node_lens(), [16, 128]);
    following.push(144);
    assert_eq!(following.node_lens(), [16, 128, 1]);
    following.enqueue(145..150);
    assert_eq!(following.node_lens(), [16, 128, 6]);

    // The pinned queue ignores the process-wide change.
    pinned.enqueue(20..150);
    assert_eq!(pinned.node_lens(), [16, 128, 6]);
    pinned.reset();
    pinned.enqueue(0..20);
    assert_eq!(pinned.node_lens(), [16, 4]);

    // A fresh queue starts with the new first node ceiling.
    let fresh = Queue::new();
    fresh.enqueue(0..11);
    assert_eq!(fresh.node_lens(), [4, 6, 1]);

    // Switching a pinned queue back to the process-wide policy.
    pinned.use_default_sizes();
    assert_eq!(pinned.sizes(), small);
    pinned.reset();
    pinned.enqueue(0..5);
    assert_eq!(pinned.node_lens(), [4, 1]);

    set_default_slice_sizes(SliceSizes::DEFAULT);
    assert_eq!(default_slice_sizes(), SliceSizes::DEFAULT);
    assert_eq!(following.dequeue(150), (0..150).collect::<Vec<_>>());
}
