use super::value::MatchObject;
use crate::flags::ChunkClass;

/// Bounded array of matches; the unit of allocation for the match store.
pub struct MatchChunk {
    capacity: usize,
    used: usize,
    objects: Vec<MatchObject>,
}

impl MatchChunk {
    pub fn new(class: ChunkClass) -> MatchChunk {
        let capacity = class.capacity();
        MatchChunk {
            capacity,
            used: 0,
            objects: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn is_full(&self) -> bool {
        self.used >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn free_space(&self) -> usize {
        self.capacity - self.used
    }

    pub fn objects(&self) -> &[MatchObject] {
        &self.objects[..self.used]
    }

    /// Appends `obj`; callers must check `is_full` first.
    pub fn push(&mut self, obj: MatchObject) {
        debug_assert!(!self.is_full());
        if self.objects.len() > self.used {
            self.objects[self.used] = obj;
        } else {
            self.objects.push(obj);
        }
        self.used += 1;
    }

    /// Swap-delete slot `i` with the last used slot; unordered, O(1).
    pub fn delete(&mut self, i: usize) {
        debug_assert!(i < self.used);
        let last = self.used - 1;
        self.objects.swap(i, last);
        self.used -= 1;
    }

    /// Appends as many objects as fit from `src`'s tail, removing them from
    /// `src`. Returns the count moved.
    fn absorb_from_tail(&mut self, src: &mut MatchChunk) -> usize {
        let mut moved = 0;
        while self.free_space() > 0 && src.used > 0 {
            let obj = src.objects[src.used - 1];
            src.used -= 1;
            self.push(obj);
            moved += 1;
        }
        moved
    }
}

/// `{ chunks: ordered list of MatchChunk; size: total used }`.
#[derive(Default)]
pub struct MatchList {
    chunks: Vec<MatchChunk>,
    default_class: Option<ChunkClass>,
}

impl MatchList {
    pub fn new() -> MatchList {
        MatchList {
            chunks: Vec::new(),
            default_class: None,
        }
    }

    pub fn with_chunk_class(class: ChunkClass) -> MatchList {
        MatchList {
            chunks: Vec::new(),
            default_class: Some(class),
        }
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    pub fn size(&self) -> usize {
        self.chunks.iter().map(|c| c.used()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> &[MatchChunk] {
        &self.chunks
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchObject> {
        self.chunks.iter().flat_map(|c| c.objects().iter())
    }

    /// Appends `obj`, allocating a new chunk (of the list's default class,
    /// `Huge` if unset) when the current tail chunk is full.
    pub fn insert(&mut self, obj: MatchObject) {
        if self.chunks.last().map_or(true, |c| c.is_full()) {
            let class = self.default_class.unwrap_or(ChunkClass::Huge);
            self.chunks.push(MatchChunk::new(class));
        }
        self.chunks.last_mut().unwrap().push(obj);
    }

    /// Retains only objects for which `keep(orig)` holds. `keep` is
    /// expected to re-read `orig.addr` itself (typically against a live
    /// tracee through a `ProcessOps` backend) and apply a predicate to the
    /// `(orig, new)` pair; the match store itself has no memory access.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&MatchObject) -> bool,
    {
        for chunk in &mut self.chunks {
            let mut i = 0;
            while i < chunk.used() {
                let orig = chunk.objects()[i];
                if keep(&orig) {
                    i += 1;
                } else {
                    chunk.delete(i);
                }
            }
        }
        self.drop_empty_chunks();
        self.compact();
    }

    fn drop_empty_chunks(&mut self) {
        self.chunks.retain(|c| !c.is_empty());
    }

    /// After a filter pass: pick a "current" chunk with free space, and
    /// absorb every other non-full chunk into it, preferring to grow into
    /// the larger-capacity chunk. Bounds total waste to roughly one chunk
    /// per size class.
    pub fn compact(&mut self) {
        let mut current: Option<usize> = None;

        let mut i = 0;
        while i < self.chunks.len() {
            if self.chunks[i].is_full() {
                i += 1;
                continue;
            }

            let cur = match current {
                None => {
                    current = Some(i);
                    i += 1;
                    continue;
                }
                Some(c) => c,
            };

            // Prefer absorbing into whichever of the two has more room,
            // i.e. is the larger capacity class, so small chunks get freed
            // rather than large ones.
            let (dst, src) = if self.chunks[cur].capacity() >= self.chunks[i].capacity() {
                (cur, i)
            } else {
                (i, cur)
            };

            let (dst_chunk, src_chunk) = index_pair_mut(&mut self.chunks, dst, src);
            dst_chunk.absorb_from_tail(src_chunk);

            if self.chunks[src].is_empty() {
                self.chunks.remove(src);
                if src < i {
                    i -= 1;
                }
                current = Some(if dst > src { dst - 1 } else { dst });
            } else {
                // dst is now full (src had more than fit); src becomes the
                // new current, dst stays as a completed chunk.
                current = Some(src);
                i += 1;
            }
        }
    }
}

fn index_pair_mut<T>(slice: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b);
    if a < b {
        let (left, right) = slice.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = slice.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchengine::value::TypedValue;

    fn obj(addr: u64) -> MatchObject {
        MatchObject::new(addr, TypedValue::zeroed())
    }

    #[test]
    fn insertion_allocates_a_new_chunk_when_full() {
        let mut list = MatchList::with_chunk_class(ChunkClass::Tiny);
        for i in 0..51 {
            list.insert(obj(i));
        }
        assert_eq!(list.size(), 51);
        assert_eq!(list.chunk_count(), 2);
    }

    #[test]
    fn deletion_swaps_with_last_and_shrinks() {
        let mut chunk = MatchChunk::new(ChunkClass::Tiny);
        for i in 0..5 {
            chunk.push(obj(i));
        }
        chunk.delete(0);
        assert_eq!(chunk.used(), 4);
        // slot 0 now holds what was slot 4.
        assert_eq!(chunk.objects()[0].addr, 4);
    }

    #[test]
    fn compaction_consolidates_three_huge_chunks_into_one() {
        let mut list = MatchList::with_chunk_class(ChunkClass::Huge);
        for i in 0..800u64 {
            list.insert(obj(i));
        }
        for i in 800..900u64 {
            list.insert(obj(i));
        }
        for i in 900..1000u64 {
            list.insert(obj(i));
        }
        assert_eq!(list.chunk_count(), 3);

        // Simulate a filter pass that keeps only the first 800 (chunk 1)
        // and drops everything from chunks 2 and 3.
        list.retain(|o| o.addr < 800);

        assert_eq!(list.size(), 800);
        assert_eq!(list.chunk_count(), 1);
        assert_eq!(list.chunks()[0].used(), 800);
    }

    #[test]
    fn compaction_bounds_total_chunks() {
        let mut list = MatchList::with_chunk_class(ChunkClass::Small);
        for i in 0..250u64 {
            list.insert(obj(i));
        }
        list.retain(|o| o.addr % 2 == 0);
        let expected_size = 125;
        assert_eq!(list.size(), expected_size);
        let capacity = ChunkClass::Small.capacity();
        let max_chunks = (expected_size + capacity - 1) / capacity + 1;
        assert!(list.chunk_count() <= max_chunks);
    }

    #[test]
    fn clear_then_retain_is_a_no_op() {
        let mut list = MatchList::new();
        list.insert(obj(1));
        list.clear();
        list.retain(|_| true);
        assert!(list.is_empty());
    }
}
