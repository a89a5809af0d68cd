#![allow(missing_docs)]

use core::fmt;
use core::mem::{swap, ManuallyDrop};
use core::ptr;

use thiserror::Error;
use tracing::{debug, trace};

pub mod list;

/// Branching factor used by [`MAryHeap::new`] and the `From`/`FromIterator` impls.
pub const DEFAULT_ARITY: usize = 2;

/// Smallest branching factor a heap will accept. Lower requests are raised to this.
pub const MIN_ARITY: usize = 2;

pub type Result<T, E = EmptyContainerError> = std::result::Result<T, E>;

/// The heap operation that was attempted on an empty heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapOp {
    Top,
    Pop,
}

impl fmt::Display for HeapOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapOp::Top => f.write_str("top"),
            HeapOp::Pop => f.write_str("pop"),
        }
    }
}

/// Returned by [`MAryHeap::top`] and [`MAryHeap::pop`] when the heap holds no elements.
///
/// The heap is left untouched, so the caller can keep using it after handling the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("{op}() on empty heap")]
pub struct EmptyContainerError {
    op: HeapOp,
}

impl EmptyContainerError {
    pub fn new(op: HeapOp) -> Self {
        EmptyContainerError { op }
    }

    /// The operation that failed.
    pub fn op(&self) -> HeapOp {
        self.op
    }
}

/// A priority relation over `T`.
///
/// `higher_priority(a, b)` returns `true` iff `a` must leave the heap before `b`.
/// Implementations must be a strict weak ordering: irreflexive, asymmetric and
/// transitive. Any `Fn(&T, &T) -> bool` closure is a comparator.
pub trait Compare<T: ?Sized> {
    fn higher_priority(&self, a: &T, b: &T) -> bool;
}

impl<T: ?Sized, F> Compare<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn higher_priority(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}

/// Smallest element first. This is the default comparator, so an [`MAryHeap`] is a
/// min-heap unless told otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Less;

impl<T: PartialOrd + ?Sized> Compare<T> for Less {
    #[inline]
    fn higher_priority(&self, a: &T, b: &T) -> bool {
        a < b
    }
}

/// Greatest element first (max-heap).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Greater;

impl<T: PartialOrd + ?Sized> Compare<T> for Greater {
    #[inline]
    fn higher_priority(&self, a: &T, b: &T) -> bool {
        a > b
    }
}

/// Orders records by a key derived from each of them, smallest key first.
///
/// Wrap the key in [`core::cmp::Reverse`] to get the largest key first.
///
/// ```
/// use mary_heap::{ByKey, MAryHeap};
///
/// let mut heap: MAryHeap<(&str, u32), _> =
///     MAryHeap::with_compare(3, ByKey(|job: &(&str, u32)| job.1));
/// heap.push(("compile", 20));
/// heap.push(("lint", 5));
/// heap.push(("test", 10));
///
/// assert_eq!(heap.pop().map(|job| job.0), Ok("lint"));
/// assert_eq!(heap.pop().map(|job| job.0), Ok("test"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ByKey<F>(pub F);

impl<T: ?Sized, K: PartialOrd, F> Compare<T> for ByKey<F>
where
    F: Fn(&T) -> K,
{
    #[inline]
    fn higher_priority(&self, a: &T, b: &T) -> bool {
        (self.0)(a) < (self.0)(b)
    }
}

/// A priority queue implemented with an m-ary heap.
///
/// Elements live in a flat `Vec` that encodes a complete tree in which every node has up
/// to `arity` children: the children of index `i` are `i * arity + 1 ..= i * arity + arity`
/// and its parent is `(i - 1) / arity`. No child ever has a strictly higher priority than
/// its parent under the comparator `C`.
///
/// With the default [`Less`] comparator this is a min-heap.
///
/// It is a logic error for an item to be modified in such a way that its priority
/// relative to any other item, as determined by `C`, changes while it is in the heap.
/// The behavior resulting from such a logic error is not specified but will not be
/// undefined behavior.
///
/// # Examples
///
/// ```
/// use mary_heap::MAryHeap;
///
/// let mut heap = MAryHeap::new();
///
/// // Looking at an empty heap is an error, not a panic.
/// assert!(heap.top().is_err());
///
/// heap.push(5);
/// heap.push(3);
/// heap.push(8);
/// heap.push(1);
///
/// assert_eq!(heap.top(), Ok(&1));
/// assert_eq!(heap.len(), 4);
///
/// // Popping yields the smallest remaining item each time.
/// assert_eq!(heap.pop(), Ok(1));
/// assert_eq!(heap.pop(), Ok(3));
/// assert_eq!(heap.pop(), Ok(5));
/// assert_eq!(heap.pop(), Ok(8));
/// assert!(heap.pop().is_err());
///
/// assert!(heap.is_empty());
/// ```
///
/// ## Max-heap with a wider tree
///
/// ```
/// use mary_heap::{Greater, MAryHeap};
///
/// let mut heap = MAryHeap::with_compare(4, Greater);
/// heap.push(10);
/// heap.push(30);
/// heap.push(20);
///
/// assert_eq!(heap.top(), Ok(&30));
/// heap.pop().unwrap();
/// assert_eq!(heap.top(), Ok(&20));
/// ```
///
/// ## Custom comparator
///
/// Any closure `Fn(&T, &T) -> bool` works, where `true` means the first argument
/// leaves the heap first.
///
/// ```
/// use mary_heap::MAryHeap;
///
/// let mut heap: MAryHeap<&str, _> =
///     MAryHeap::with_compare(3, |a: &&str, b: &&str| a.len() > b.len());
/// heap.push("ab");
/// heap.push("abcd");
/// heap.push("a");
///
/// assert_eq!(heap.pop(), Ok("abcd"));
/// ```
///
/// # Time complexity
///
/// | [push]             | [pop]                   | [top]  |
/// |--------------------|-------------------------|--------|
/// | *O*(log*m*(*n*))   | *O*(*m* log*m*(*n*))    | *O*(1) |
///
/// [push]: MAryHeap::push
/// [pop]: MAryHeap::pop
/// [top]: MAryHeap::top
#[derive(Clone)]
pub struct MAryHeap<T, C = Less> {
    data: Vec<T>,
    arity: usize,
    cmp: C,
}

fn clamp_arity(requested: usize) -> usize {
    if requested < MIN_ARITY {
        debug!(requested, arity = MIN_ARITY, "clamping heap arity");
        MIN_ARITY
    } else {
        requested
    }
}

impl<T: PartialOrd> Default for MAryHeap<T, Less> {
    /// Creates an empty binary min-heap.
    #[inline]
    fn default() -> MAryHeap<T, Less> {
        MAryHeap::new()
    }
}

impl<T: fmt::Debug, C> fmt::Debug for MAryHeap<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

impl<T: PartialOrd> MAryHeap<T, Less> {
    /// Creates an empty binary min-heap.
    ///
    /// ```
    /// use mary_heap::MAryHeap;
    /// let mut heap = MAryHeap::new();
    /// heap.push(4);
    /// assert_eq!(heap.arity(), 2);
    /// ```
    #[must_use]
    pub fn new() -> MAryHeap<T, Less> {
        MAryHeap::with_compare(DEFAULT_ARITY, Less)
    }

    /// Creates an empty min-heap where every node has up to `arity` children.
    ///
    /// An `arity` below 2 is raised to 2.
    ///
    /// ```
    /// use mary_heap::MAryHeap;
    /// let heap = MAryHeap::<u8>::with_arity(1);
    /// assert_eq!(heap.arity(), 2);
    /// ```
    #[must_use]
    pub fn with_arity(arity: usize) -> MAryHeap<T, Less> {
        MAryHeap::with_compare(arity, Less)
    }

    /// Creates an empty min-heap with room for `capacity` elements before reallocating.
    #[must_use]
    pub fn with_capacity(arity: usize, capacity: usize) -> MAryHeap<T, Less> {
        MAryHeap::with_capacity_and_compare(arity, capacity, Less)
    }
}

#[allow(unused_unsafe)]
impl<T, C: Compare<T>> MAryHeap<T, C> {
    /// Creates an empty heap ordered by `cmp`, where every node has up to `arity`
    /// children. An `arity` below 2 is raised to 2.
    #[must_use]
    pub fn with_compare(arity: usize, cmp: C) -> MAryHeap<T, C> {
        MAryHeap {
            data: Vec::new(),
            arity: clamp_arity(arity),
            cmp,
        }
    }

    #[must_use]
    pub fn with_capacity_and_compare(arity: usize, capacity: usize, cmp: C) -> MAryHeap<T, C> {
        MAryHeap {
            data: Vec::with_capacity(capacity),
            arity: clamp_arity(arity),
            cmp,
        }
    }

    /// Builds a heap out of `vec` in *O*(*n*) time.
    ///
    /// ```
    /// use mary_heap::{Greater, MAryHeap};
    ///
    /// let mut heap = MAryHeap::from_vec_compare(vec![3, 9, 1, 7], 3, Greater);
    /// assert_eq!(heap.pop(), Ok(9));
    /// assert_eq!(heap.pop(), Ok(7));
    /// ```
    #[must_use]
    pub fn from_vec_compare(vec: Vec<T>, arity: usize, cmp: C) -> MAryHeap<T, C> {
        let mut heap = MAryHeap {
            data: vec,
            arity: clamp_arity(arity),
            cmp,
        };
        heap.rebuild();
        heap
    }

    /// Removes the highest priority item from the heap and returns it.
    ///
    /// Fails with [`EmptyContainerError`] if the heap is empty, in which case the heap
    /// is left unchanged.
    ///
    /// ```
    /// use mary_heap::{HeapOp, MAryHeap};
    /// let mut heap = MAryHeap::from(vec![1, 3]);
    ///
    /// assert_eq!(heap.pop(), Ok(1));
    /// assert_eq!(heap.pop(), Ok(3));
    /// assert_eq!(heap.pop().unwrap_err().op(), HeapOp::Pop);
    /// ```
    ///
    /// # Time complexity
    ///
    /// The worst case cost of `pop` on a heap containing *n* elements is
    /// *O*(*m* log*m*(*n*)) comparisons.
    pub fn pop(&mut self) -> Result<T> {
        let mut item = self
            .data
            .pop()
            .ok_or_else(|| EmptyContainerError::new(HeapOp::Pop))?;

        if !self.is_empty() {
            swap(&mut item, &mut self.data[0]);
            // SAFETY: !self.is_empty() means that self.len() > 0
            unsafe { self.sift_down(0) };
        }

        Ok(item)
    }

    /// Pushes an item onto the heap.
    ///
    /// ```
    /// use mary_heap::MAryHeap;
    /// let mut heap = MAryHeap::with_arity(3);
    /// heap.push(3);
    /// heap.push(5);
    /// heap.push(1);
    ///
    /// assert_eq!(heap.len(), 3);
    /// assert_eq!(heap.top(), Ok(&1));
    /// ```
    ///
    /// # Time complexity
    ///
    /// *O*(log*m*(*n*)) comparisons, plus an occasional reallocation of the
    /// backing storage.
    pub fn push(&mut self, item: T) {
        let old_len = self.len();
        self.data.push(item);
        // SAFETY: Since we pushed a new item it means that
        //  old_len = self.len() - 1 < self.len()
        unsafe { self.sift_up(old_len) };
    }

    /// Consumes the heap and returns its elements in the order `pop` would have
    /// produced them, highest priority first.
    ///
    /// ```
    /// use mary_heap::MAryHeap;
    ///
    /// let mut heap = MAryHeap::from(vec![4, 2, 7, 5, 1]);
    /// heap.push(6);
    /// heap.push(3);
    ///
    /// assert_eq!(heap.into_sorted_vec(), [1, 2, 3, 4, 5, 6, 7]);
    /// ```
    #[must_use = "`self` will be dropped if the result is not used"]
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        let mut end = self.len();
        while end > 1 {
            end -= 1;
            self.data.swap(0, end);
            // SAFETY: `end` goes from `self.len() - 1` to 1 (both included) so:
            //  0 < 1 <= end <= self.len() - 1 < self.len()
            unsafe { self.sift_down_range(0, end) };
        }
        // The loop leaves the lowest priority element at the front.
        self.data.reverse();
        self.data
    }

    /// Returns `true` if no element has a strictly higher priority than its parent.
    pub fn is_valid(&self) -> bool {
        (1..self.data.len()).all(|i| {
            let parent = (i - 1) / self.arity;
            !self.cmp.higher_priority(&self.data[i], &self.data[parent])
        })
    }

    // The implementations of sift_up and sift_down use unsafe blocks in
    // order to move an element out of the vector (leaving behind a
    // hole), shift along the others and move the removed element back into the
    // vector at the final location of the hole.
    // The `Hole` type is used to represent this, and make sure
    // the hole is filled back at the end of its scope, even if the comparator panics.

    /// # Safety
    ///
    /// The caller must guarantee that `pos < self.len()`.
    unsafe fn sift_up(&mut self, pos: usize) {
        // SAFETY: The caller guarantees that pos < self.len()
        let mut hole = unsafe { Hole::new(&mut self.data, pos) };

        while hole.pos() > 0 {
            let parent = (hole.pos() - 1) / self.arity;

            // SAFETY: hole.pos() > 0 so parent < hole.pos(), which makes it
            //  a valid index that is also != hole.pos().
            if !self
                .cmp
                .higher_priority(hole.element(), unsafe { hole.get(parent) })
            {
                break;
            }

            // SAFETY: Same as above
            unsafe { hole.move_to(parent) };
        }
    }

    /// Take the element at `pos` and move it down the heap while one of its
    /// children within `..end` outranks it.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `pos < end <= self.len()`.
    unsafe fn sift_down_range(&mut self, pos: usize, end: usize) {
        let arity = self.arity;
        // SAFETY: The caller guarantees that pos < end <= self.len().
        let mut hole = unsafe { Hole::new(&mut self.data, pos) };

        loop {
            let first = match hole.pos().checked_mul(arity).and_then(|i| i.checked_add(1)) {
                Some(first) if first < end => first,
                _ => return,
            };
            let last = first.saturating_add(arity).min(end);

            // SAFETY: every child index lies in first..last, so it is
            //  < end <= self.len() and > hole.pos().
            let mut best = first;
            for child in first + 1..last {
                if self
                    .cmp
                    .higher_priority(unsafe { hole.get(child) }, unsafe { hole.get(best) })
                {
                    best = child;
                }
            }

            // if we are already in order, stop.
            if !self
                .cmp
                .higher_priority(unsafe { hole.get(best) }, hole.element())
            {
                return;
            }

            // SAFETY: same as above.
            unsafe { hole.move_to(best) };
        }
    }

    /// # Safety
    ///
    /// The caller must guarantee that `pos < self.len()`.
    unsafe fn sift_down(&mut self, pos: usize) {
        let len = self.len();
        // SAFETY: pos < len is guaranteed by the caller and
        //  obviously len = self.len() <= self.len().
        unsafe { self.sift_down_range(pos, len) };
    }

    /// Restore heap order over the whole vector, bottom up.
    fn rebuild(&mut self) {
        let len = self.len();
        if len < 2 {
            return;
        }
        trace!(len, arity = self.arity, "rebuilding heap");

        // Index of the last node that has a child, plus one.
        let mut n = (len - 2) / self.arity + 1;
        while n > 0 {
            n -= 1;
            // SAFETY: n <= (len - 2) / arity < len.
            unsafe { self.sift_down(n) };
        }
    }

    /// Rebuild assuming data[0..start] is still a proper heap.
    fn rebuild_tail(&mut self, start: usize) {
        if start == self.len() {
            return;
        }

        let tail_len = self.len() - start;

        // A full rebuild is linear, while sifting up each appended element
        // costs about tail_len * log_m(start) comparisons.
        if start < tail_len {
            self.rebuild();
        } else {
            for i in start..self.len() {
                // SAFETY: The index `i` is always less than self.len().
                unsafe { self.sift_up(i) };
            }
        }
    }
}

impl<T, C> MAryHeap<T, C> {
    /// Returns the highest priority item in the heap.
    ///
    /// Fails with [`EmptyContainerError`] if the heap is empty.
    ///
    /// ```
    /// use mary_heap::MAryHeap;
    /// let mut heap = MAryHeap::new();
    /// assert!(heap.top().is_err());
    ///
    /// heap.push(1);
    /// heap.push(5);
    /// heap.push(2);
    /// assert_eq!(heap.top(), Ok(&1));
    /// ```
    ///
    /// # Time complexity
    ///
    /// Cost is *O*(1) in the worst case.
    pub fn top(&self) -> Result<&T> {
        self.data
            .first()
            .ok_or_else(|| EmptyContainerError::new(HeapOp::Top))
    }

    /// Maximum number of children per node. Never below [`MIN_ARITY`].
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The comparator that orders this heap.
    #[inline]
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Returns the number of elements the heap can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows `usize`.
    pub fn reserve(&mut self, additional: usize) {
        self.data.reserve(additional);
    }

    /// Discards as much additional capacity as possible.
    pub fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
    }

    /// Consumes the heap and returns the underlying vector in arbitrary (heap) order.
    ///
    /// ```
    /// use mary_heap::MAryHeap;
    /// let heap = MAryHeap::from(vec![1, 2, 3, 4, 5, 6, 7]);
    /// let vec = heap.into_vec();
    /// assert_eq!(vec.len(), 7);
    /// ```
    #[must_use = "`self` will be dropped if the result is not used"]
    pub fn into_vec(self) -> Vec<T> {
        self.into()
    }

    /// Returns the number of elements in the heap.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks if the heap is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all items from the heap.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Hole represents a hole in a slice i.e., an index without valid value
/// (because it was moved from or duplicated).
/// In drop, `Hole` will restore the slice by filling the hole
/// position with the value that was originally removed.
struct Hole<'a, T: 'a> {
    data: &'a mut [T],
    elt: ManuallyDrop<T>,
    pos: usize,
}

impl<'a, T> Hole<'a, T> {
    /// Create a new `Hole` at index `pos`.
    ///
    /// Unsafe because pos must be within the data slice.
    #[inline]
    #[allow(unused_unsafe)]
    unsafe fn new(data: &'a mut [T], pos: usize) -> Self {
        debug_assert!(pos < data.len());
        // SAFE: pos should be inside the slice
        let elt = unsafe { ptr::read(data.get_unchecked(pos)) };
        Hole {
            data,
            elt: ManuallyDrop::new(elt),
            pos,
        }
    }

    #[inline]
    fn pos(&self) -> usize {
        self.pos
    }

    /// Returns a reference to the element removed.
    #[inline]
    fn element(&self) -> &T {
        &self.elt
    }

    /// Returns a reference to the element at `index`.
    ///
    /// Unsafe because index must be within the data slice and not equal to pos.
    #[inline]
    #[allow(unused_unsafe)]
    unsafe fn get(&self, index: usize) -> &T {
        debug_assert!(index != self.pos);
        debug_assert!(index < self.data.len());
        unsafe { self.data.get_unchecked(index) }
    }

    /// Move hole to new location
    ///
    /// Unsafe because index must be within the data slice and not equal to pos.
    #[inline]
    #[allow(unused_unsafe)]
    unsafe fn move_to(&mut self, index: usize) {
        debug_assert!(index != self.pos);
        debug_assert!(index < self.data.len());
        unsafe {
            let ptr = self.data.as_mut_ptr();
            let index_ptr: *const _ = ptr.add(index);
            let hole_ptr = ptr.add(self.pos);
            ptr::copy_nonoverlapping(index_ptr, hole_ptr, 1);
        }
        self.pos = index;
    }
}

impl<T> Drop for Hole<'_, T> {
    #[inline]
    fn drop(&mut self) {
        // fill the hole again
        unsafe {
            let pos = self.pos;
            ptr::copy_nonoverlapping(&*self.elt, self.data.get_unchecked_mut(pos), 1);
        }
    }
}

impl<T: PartialOrd> From<Vec<T>> for MAryHeap<T, Less> {
    /// Converts a `Vec<T>` into a binary min-heap.
    ///
    /// This conversion happens in-place, and has *O*(*n*) time complexity.
    fn from(vec: Vec<T>) -> MAryHeap<T, Less> {
        MAryHeap::from_vec_compare(vec, DEFAULT_ARITY, Less)
    }
}

impl<T: PartialOrd, const N: usize> From<[T; N]> for MAryHeap<T, Less> {
    /// ```
    /// use mary_heap::MAryHeap;
    ///
    /// let h1 = MAryHeap::from([1, 4, 2, 3]);
    /// let h2: MAryHeap<_> = [1, 4, 2, 3].into_iter().collect();
    /// assert_eq!(h1.into_sorted_vec(), h2.into_sorted_vec());
    /// ```
    fn from(arr: [T; N]) -> Self {
        Self::from(Vec::from(arr))
    }
}

impl<T, C> From<MAryHeap<T, C>> for Vec<T> {
    /// Converts the heap into a `Vec<T>` in heap order.
    ///
    /// This conversion requires no data movement or allocation.
    fn from(heap: MAryHeap<T, C>) -> Vec<T> {
        heap.data
    }
}

impl<T: PartialOrd> FromIterator<T> for MAryHeap<T, Less> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> MAryHeap<T, Less> {
        MAryHeap::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T, C: Compare<T>> Extend<T> for MAryHeap<T, C> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let start = self.len();
        self.data.extend(iter);
        self.rebuild_tail(start);
    }
}

impl<'a, T: 'a + Copy, C: Compare<T>> Extend<&'a T> for MAryHeap<T, C> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}
