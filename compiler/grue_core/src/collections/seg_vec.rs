use std::fmt;

/// Elements per segment.
const SEGMENT_LEN: usize = 1024;

/// A growable vector built from fixed-size segments.
///
/// Growing appends a segment instead of reallocating, so existing elements
/// never move and pushing is O(1) without the copy spike of a doubling
/// `Vec`. The heap stores its object slots here.
pub struct SegVec<T> {
    segments: Vec<Box<[Option<T>]>>,
    len: usize,
}

impl<T> SegVec<T> {
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `value`, returning its index.
    pub fn push(&mut self, value: T) -> usize {
        let index = self.len;
        let (segment, offset) = split(index);
        if segment == self.segments.len() {
            self.segments
                .push(std::iter::repeat_with(|| None).take(SEGMENT_LEN).collect());
        }
        self.segments[segment][offset] = Some(value);
        self.len += 1;
        index
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let (segment, offset) = split(index);
        self.segments[segment][offset].as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        let (segment, offset) = split(index);
        self.segments[segment][offset].as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.segments
            .iter()
            .flat_map(|segment| segment.iter())
            .take(self.len)
            .filter_map(Option::as_ref)
    }

    /// Reserved bytes, for memory accounting.
    pub fn heap_size(&self) -> usize {
        self.segments.len() * SEGMENT_LEN * std::mem::size_of::<Option<T>>()
    }
}

#[inline]
const fn split(index: usize) -> (usize, usize) {
    (index / SEGMENT_LEN, index % SEGMENT_LEN)
}

impl<T> Default for SegVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for SegVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
