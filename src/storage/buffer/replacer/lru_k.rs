use std::collections::{HashMap, VecDeque};
use crate::common::types::FrameId;

/// How a frame was touched. Recorded alongside the timestamp so smarter
/// policies (scan-resistant variants) can weigh accesses differently;
/// plain LRU-K ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessType {
    #[default]
    Unknown,
    Lookup,
    Scan,
    Index,
}

/// Per-frame access history tracked by the replacer.
#[derive(Debug)]
struct LruKNode {
    /// Up to `k` most recent access timestamps, oldest at the front.
    history: VecDeque<u64>,
    evictable: bool,
}

impl LruKNode {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            evictable: false,
        }
    }

    /// Oldest retained timestamp. With a full history this is the k-th
    /// most recent access; with a partial one it is the first access.
    fn oldest_timestamp(&self) -> u64 {
        *self
            .history
            .front()
            .expect("tracked frame with empty access history")
    }
}

/// LRU-K page replacement policy
///
/// Each frame's backward k-distance is the logical time since its k-th
/// most recent access, or +inf when fewer than k accesses are recorded.
/// Eviction picks the evictable frame with the largest backward
/// k-distance; frames with +inf distance take precedence and tie-break on
/// their earliest recorded access, which degrades to classical LRU for
/// cold frames.
pub struct LruKReplacer {
    node_store: HashMap<FrameId, LruKNode>,
    current_timestamp: u64,
    evictable_count: usize,
    capacity: usize,
    k: usize,
}

impl LruKReplacer {
    pub fn new(capacity: usize, k: usize) -> Self {
        assert!(k > 0, "history depth k must be at least 1");
        Self {
            node_store: HashMap::with_capacity(capacity),
            current_timestamp: 0,
            evictable_count: 0,
            capacity,
            k,
        }
    }

    /// Record an access to a frame at the current logical time
    ///
    /// Creates the node (non-evictable) on first access. Panics if the
    /// frame id is outside the pool.
    pub fn record_access(&mut self, frame_id: FrameId, _access_type: AccessType) {
        assert!(
            (frame_id as usize) < self.capacity,
            "frame id {} out of range (capacity {})",
            frame_id,
            self.capacity
        );

        let node = self
            .node_store
            .entry(frame_id)
            .or_insert_with(LruKNode::new);
        node.history.push_back(self.current_timestamp);
        if node.history.len() > self.k {
            node.history.pop_front();
        }
        self.current_timestamp += 1;
    }

    /// Mark a frame as an eviction candidate (or withdraw it)
    ///
    /// Unknown frames are ignored.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let Some(node) = self.node_store.get_mut(&frame_id) else {
            return;
        };
        if node.evictable != evictable {
            node.evictable = evictable;
            if evictable {
                self.evictable_count += 1;
            } else {
                self.evictable_count -= 1;
            }
        }
    }

    /// Select and remove the eviction victim, if any frame is evictable
    pub fn evict(&mut self) -> Option<FrameId> {
        let mut victim: Option<(bool, u64, FrameId)> = None;

        for (&frame_id, node) in &self.node_store {
            if !node.evictable {
                continue;
            }
            let infinite = node.history.len() < self.k;
            let oldest = node.oldest_timestamp();
            let better = match victim {
                None => true,
                // An under-k frame always loses to nothing and beats any
                // full-history frame; within a class the older oldest
                // timestamp wins (timestamps are unique).
                Some((v_infinite, v_oldest, _)) => {
                    if infinite != v_infinite {
                        infinite
                    } else {
                        oldest < v_oldest
                    }
                }
            };
            if better {
                victim = Some((infinite, oldest, frame_id));
            }
        }

        let (_, _, frame_id) = victim?;
        self.node_store.remove(&frame_id);
        self.evictable_count -= 1;
        Some(frame_id)
    }

    /// Drop a frame's history, e.g. when the frame is reset or deleted
    ///
    /// Silent on unknown frames. Panics if the frame is tracked but not
    /// evictable; callers must make it evictable first.
    pub fn remove(&mut self, frame_id: FrameId) {
        let Some(node) = self.node_store.get(&frame_id) else {
            return;
        };
        assert!(
            node.evictable,
            "removing frame {} while it is not evictable",
            frame_id
        );
        self.node_store.remove(&frame_id);
        self.evictable_count -= 1;
    }

    /// Number of evictable frames
    pub fn size(&self) -> usize {
        self.evictable_count
    }
}
