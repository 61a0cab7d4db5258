use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;

use heapvis_types::{Graph, HeapSnapshot, TrackedObject};

/// One captured state of the tracked objects. Never mutated once pushed.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub sequence: u64,
    pub captured_at: SystemTime,
    /// Unpruned reference graph.
    pub graph: Graph,
    pub heap: Arc<HeapSnapshot>,
    /// Registry contents at capture time.
    pub tracked: Vec<TrackedObject>,
}

impl Snapshot {
    pub fn empty(sequence: u64) -> Self {
        Self {
            sequence,
            captured_at: SystemTime::now(),
            graph: Graph::default(),
            heap: Arc::new(HeapSnapshot::default()),
            tracked: Vec::new(),
        }
    }

    /// Milliseconds since the Unix epoch.
    pub fn captured_at_ms(&self) -> u64 {
        self.captured_at
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Snapshots newest first, with a cursor selecting the one on display.
///
/// Never empty: `0 <= cursor < len` holds after every operation.
#[derive(Debug)]
pub struct History {
    snapshots: VecDeque<Arc<Snapshot>>,
    cursor: usize,
    capacity: Option<usize>,
    next_sequence: u64,
}

impl History {
    pub fn new(capacity: Option<usize>) -> Self {
        let mut history = Self {
            snapshots: VecDeque::new(),
            cursor: 0,
            capacity: capacity.map(|c| c.max(1)),
            next_sequence: 0,
        };
        history.clear();
        history
    }

    /// Sequence number for the next snapshot.
    pub fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Prepends `snapshot`. The cursor keeps pointing at the snapshot on
    /// display, so it only follows the new one when it was already at 0.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push_front(Arc::new(snapshot));
        if self.cursor > 0 {
            self.cursor += 1;
        }
        self.evict();
    }

    /// Prepends `snapshot` and displays it.
    pub fn push_latest(&mut self, snapshot: Snapshot) {
        self.snapshots.push_front(Arc::new(snapshot));
        self.cursor = 0;
        self.evict();
    }

    /// Sets the cursor to `f(cursor)` clamped into range.
    pub fn move_cursor(&mut self, f: impl FnOnce(isize) -> isize) {
        let last = self.snapshots.len().saturating_sub(1) as isize;
        let target = f(self.cursor as isize).clamp(0, last);
        self.cursor = target as usize;
    }

    /// Moves the cursor by `delta`; positive values go back in time.
    pub fn step(&mut self, delta: isize) {
        self.move_cursor(|cursor| cursor.saturating_add(delta));
    }

    /// Back to a single empty snapshot.
    pub fn clear(&mut self) {
        let sequence = self.next_sequence();
        self.snapshots.clear();
        self.snapshots.push_front(Arc::new(Snapshot::empty(sequence)));
        self.cursor = 0;
    }

    /// The snapshot on display.
    pub fn current(&self) -> Arc<Snapshot> {
        self.snapshots[self.cursor].clone()
    }

    pub fn latest(&self) -> Arc<Snapshot> {
        self.snapshots[0].clone()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Snapshot>> {
        self.snapshots.get(index)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn evict(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.snapshots.len() > capacity {
            let oldest = self.snapshots.len() - 1;
            if self.cursor == oldest {
                // The displayed snapshot stays; the one just newer goes.
                // A cursor past 0 means there were at least two entries
                // before the push, so that neighbour exists.
                self.snapshots.remove(oldest - 1);
                self.cursor -= 1;
            } else {
                self.snapshots.pop_back();
            }
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(None)
    }
}
