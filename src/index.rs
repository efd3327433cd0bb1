use crate::error::{AllocError, Result};
use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::ops::Range;
use log::{debug, trace, warn};

/// Number of addressable bits in a buffer of `byte_count` bytes.
///
/// # Examples
/// ```
/// use free_index::bit_count;
///
/// assert_eq!(bit_count(0), 0);
/// assert_eq!(bit_count(3), 24);
/// ```
pub const fn bit_count(byte_count: usize) -> usize {
    byte_count * 8
}

/// Computes the number of bytes needed to track `bit_count` slots.
///
/// # Examples
/// ```
/// use free_index::byte_count_for;
///
/// assert_eq!(byte_count_for(9), 2);
/// assert_eq!(byte_count_for(16), 2);
/// assert_eq!(byte_count_for(17), 3);
/// ```
pub const fn byte_count_for(bit_count: usize) -> usize {
    bit_count.div_ceil(8)
}

/// Byte count that [`FreeIndex::resize_smart`] allocates when asked to move
/// from `current` to `target` bytes.
///
/// Growing overshoots the target by half the distance travelled
/// (`target + (target - current) / 2`), shrinking only goes half the way
/// (`current - (current - target) / 2`). Integer division truncates. Growth
/// saturates at `usize::MAX`.
///
/// # Examples
/// ```
/// use free_index::smart_byte_count;
///
/// assert_eq!(smart_byte_count(4, 10), 13);
/// assert_eq!(smart_byte_count(10, 4), 7);
/// assert_eq!(smart_byte_count(6, 6), 6);
/// ```
pub const fn smart_byte_count(current: usize, target: usize) -> usize {
    if current > target {
        current - (current - target) / 2
    } else {
        target.saturating_add((target - current) / 2)
    }
}

pub(crate) const fn ones_mask(start_bit: usize, width: usize) -> u8 {
    if width >= 8 {
        // shift would be undefined / panic on u8
        !0u8
    } else {
        // if `1u8 << shift_amount` == 0 wrap around
        (1u8 << width).wrapping_sub(1) << start_bit
    }
}

#[inline]
const fn idxs(bit: usize) -> (usize, usize) {
    (bit / 8, bit % 8)
}

fn alloc_failed(requested: usize, source: TryReserveError) -> AllocError {
    warn!("free index allocation of {requested} bytes failed: {source}");
    AllocError::new(requested, source)
}

fn zeroed(byte_count: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(byte_count)
        .map_err(|source| alloc_failed(byte_count, source))?;
    bytes.resize(byte_count, 0);
    Ok(bytes)
}

/// Outcome of [`FreeIndex::next_free`] and [`FreeIndex::prev_free`].
///
/// `bit` is only meaningful when `found` is `true`; it is `0` otherwise,
/// which is also a valid bit index, so always check `found` (or use
/// [`get`](Scan::get)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Scan {
    /// Index of the free bit that was found, `0` if none was.
    pub bit: usize,
    /// Whether a free bit was found.
    pub found: bool,
}

impl Scan {
    /// The result of a scan that found nothing.
    pub const NOT_FOUND: Self = Self {
        bit: 0,
        found: false,
    };

    const fn at(bit: usize) -> Self {
        Self { bit, found: true }
    }

    /// Returns the found bit index, or `None`.
    ///
    /// # Examples
    /// ```
    /// use free_index::Scan;
    ///
    /// assert_eq!(Scan::NOT_FOUND.get(), None);
    /// assert_eq!(Scan { bit: 0, found: true }.get(), Some(0));
    /// ```
    #[inline]
    pub const fn get(self) -> Option<usize> {
        if self.found { Some(self.bit) } else { None }
    }
}

/// A resizable occupancy index over `byte_count * 8` slots.
///
/// Internally stores bits in a `Vec<u8>` whose length is always exactly the
/// byte count. Free slots are `0` bits, used slots are `1` bits, addressed
/// LSB-first within each byte.
///
/// Single-bit accessors do not report errors. Passing a bit index
/// `>= bit_count()` is a caller bug and panics.
#[derive(Clone)]
pub struct FreeIndex {
    pub(crate) bytes: Vec<u8>,
    // Target of the last growing `resize_smart`; requests between it and the
    // current byte count are already satisfied.
    reserved_for: Option<usize>,
}

impl FreeIndex {
    /// Creates an empty index of zero bytes. Does not allocate.
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let index = FreeIndex::new();
    /// assert!(index.is_empty());
    /// assert!(!index.next_free(0).found);
    /// ```
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            reserved_for: None,
        }
    }

    /// Creates an index of `byte_count` bytes with every slot free.
    ///
    /// # Errors
    /// Returns [`AllocError`] if the buffer cannot be allocated. Nothing is
    /// leaked in that case.
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let index = FreeIndex::try_new(4).unwrap();
    /// assert_eq!(index.byte_count(), 4);
    /// assert_eq!(index.free_count(), 32);
    /// ```
    pub fn try_new(byte_count: usize) -> Result<Self> {
        let bytes = zeroed(byte_count)?;
        debug!("created free index of {byte_count} bytes");
        Ok(Self {
            bytes,
            reserved_for: None,
        })
    }

    /// Adopts an existing occupancy buffer as is.
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let index = FreeIndex::from_bytes(vec![0b1110_1111]);
    /// assert_eq!(index.next_free(0).get(), Some(4));
    /// ```
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            reserved_for: None,
        }
    }

    /// (Re)initializes a caller-owned index with `byte_count` free bytes.
    ///
    /// `slot` is reset to an empty index first, releasing whatever buffer it
    /// held. On failure it stays empty, never half initialized.
    ///
    /// # Errors
    /// Returns [`AllocError`] if the buffer cannot be allocated.
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let mut index = FreeIndex::new();
    /// FreeIndex::init_in_place(&mut index, 2).unwrap();
    /// assert_eq!(index.bit_count(), 16);
    /// ```
    pub fn init_in_place(slot: &mut Self, byte_count: usize) -> Result<()> {
        *slot = Self::new();
        slot.bytes = zeroed(byte_count)?;
        debug!("initialized free index in place with {byte_count} bytes");
        Ok(())
    }

    /// Consumes the index, releasing its buffer.
    pub fn destroy(self) {
        debug!("destroying free index of {} bytes", self.byte_count());
    }

    /// Releases the backing buffer but keeps the index itself usable.
    ///
    /// Afterwards the index is empty, as if created by [`new`](Self::new).
    /// Calling it again is harmless.
    pub fn release_buffer(&mut self) {
        if !self.bytes.is_empty() {
            debug!("releasing free index buffer of {} bytes", self.byte_count());
        }
        *self = Self::new();
    }

    /// Current capacity in bytes.
    #[inline]
    pub fn byte_count(&self) -> usize {
        self.bytes.len()
    }

    /// Number of addressable bits, `byte_count() * 8`.
    #[inline]
    pub fn bit_count(&self) -> usize {
        bit_count(self.bytes.len())
    }

    /// Returns `true` if the index has no addressable bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw occupancy bytes, LSB-first.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Resizes the buffer to exactly `byte_count` bytes.
    ///
    /// Growing appends free slots. Shrinking drops the trailing bytes and the
    /// slots they tracked. Resizing to the current size does nothing.
    ///
    /// # Errors
    /// Returns [`AllocError`] if the new buffer cannot be allocated. The index
    /// is left unchanged in that case.
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let mut index = FreeIndex::try_new(1).unwrap();
    /// index.set_used(3);
    /// index.resize(3).unwrap();
    /// assert!(index.is_used(3));
    /// assert!(index.is_free(23));
    /// ```
    pub fn resize(&mut self, byte_count: usize) -> Result<()> {
        let current = self.bytes.len();
        if byte_count == current {
            return Ok(());
        }

        if byte_count > current {
            self.bytes
                .try_reserve_exact(byte_count - current)
                .map_err(|source| alloc_failed(byte_count, source))?;
            self.bytes.resize(byte_count, 0);
        } else {
            let mut bytes = Vec::new();
            bytes
                .try_reserve_exact(byte_count)
                .map_err(|source| alloc_failed(byte_count, source))?;
            bytes.extend_from_slice(&self.bytes[..byte_count]);
            self.bytes = bytes;
        }
        self.reserved_for = None;
        debug!("resized free index from {current} to {byte_count} bytes");
        Ok(())
    }

    /// Amortized resize towards `target` bytes.
    ///
    /// Allocates [`smart_byte_count`]`(byte_count(), target)` bytes, so a
    /// series of growing (or shrinking) requests needs only a logarithmic
    /// number of reallocations. After growing, repeating a request for any
    /// size between the requested target and the allocated size is a no-op.
    ///
    /// # Errors
    /// Forwards the [`AllocError`] of the underlying [`resize`](Self::resize).
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let mut index = FreeIndex::try_new(4).unwrap();
    /// index.resize_smart(10).unwrap();
    /// assert_eq!(index.byte_count(), 13);
    /// index.resize_smart(10).unwrap();
    /// assert_eq!(index.byte_count(), 13);
    /// ```
    pub fn resize_smart(&mut self, target: usize) -> Result<()> {
        let current = self.bytes.len();
        if target == current {
            return Ok(());
        }
        if let Some(reserved) = self.reserved_for {
            if (reserved..=current).contains(&target) {
                trace!("smart resize to {target} bytes already satisfied by {current}");
                return Ok(());
            }
        }

        self.resize(smart_byte_count(current, target))?;
        if target > current {
            self.reserved_for = Some(target);
        }
        Ok(())
    }

    /// Marks the slot at `bit` as used.
    ///
    /// # Panics
    /// Panics if `bit >= bit_count()`.
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let mut index = FreeIndex::try_new(1).unwrap();
    /// index.set_used(3);
    /// assert!(!index.is_free(3));
    /// ```
    #[inline]
    pub fn set_used(&mut self, bit: usize) {
        self.debug_check(bit);
        let (byte_idx, bit_idx) = idxs(bit);
        self.bytes[byte_idx] |= 1 << bit_idx;
    }

    /// Marks the slot at `bit` as free.
    ///
    /// # Panics
    /// Panics if `bit >= bit_count()`.
    #[inline]
    pub fn set_free(&mut self, bit: usize) {
        self.debug_check(bit);
        let (byte_idx, bit_idx) = idxs(bit);
        self.bytes[byte_idx] &= !(1 << bit_idx);
    }

    /// Returns `true` if the slot at `bit` is free.
    ///
    /// # Panics
    /// Panics if `bit >= bit_count()`.
    #[inline]
    pub fn is_free(&self, bit: usize) -> bool {
        self.debug_check(bit);
        let (byte_idx, bit_idx) = idxs(bit);
        self.bytes[byte_idx] & 1 << bit_idx == 0
    }

    /// Returns `true` if the slot at `bit` is used.
    ///
    /// # Panics
    /// Panics if `bit >= bit_count()`.
    #[inline]
    pub fn is_used(&self, bit: usize) -> bool {
        !self.is_free(bit)
    }

    #[inline]
    fn debug_check(&self, bit: usize) {
        debug_assert!(bit < self.bit_count(), "Bit index {bit} out of bounds");
    }

    /// Marks every slot in `range` as used.
    ///
    /// # Panics
    /// Panics if `range.end > bit_count()`.
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let mut index = FreeIndex::try_new(1).unwrap();
    /// index.set_used_range(2..6);
    /// assert!(index.is_used(2));
    /// assert!(index.is_used(5));
    /// assert!(index.is_free(6));
    /// ```
    pub fn set_used_range(&mut self, range: Range<usize>) {
        self.check_range(&range);
        if range.start >= range.end {
            return;
        }

        let (start_byte, start_bit) = idxs(range.start);
        let (end_byte, end_bit) = idxs(range.end - 1);

        // all within one byte
        if start_byte == end_byte {
            self.bytes[start_byte] |= ones_mask(start_bit, end_bit - start_bit + 1);
            return;
        }

        self.bytes[start_byte] |= !0u8 << start_bit;
        self.bytes[start_byte + 1..end_byte].fill(!0);
        self.bytes[end_byte] |= ones_mask(0, end_bit + 1);
    }

    /// Marks every slot in `range` as free.
    ///
    /// # Panics
    /// Panics if `range.end > bit_count()`.
    pub fn set_free_range(&mut self, range: Range<usize>) {
        self.check_range(&range);
        if range.start >= range.end {
            return;
        }

        let (start_byte, start_bit) = idxs(range.start);
        let (end_byte, end_bit) = idxs(range.end - 1);

        if start_byte == end_byte {
            self.bytes[start_byte] &= !ones_mask(start_bit, end_bit - start_bit + 1);
            return;
        }

        self.bytes[start_byte] &= (1u8 << start_bit) - 1;
        self.bytes[start_byte + 1..end_byte].fill(0);
        self.bytes[end_byte] &= !ones_mask(0, end_bit + 1);
    }

    fn check_range(&self, range: &Range<usize>) {
        assert!(
            range.end <= self.bit_count(),
            "Range end {} out of bounds",
            range.end
        );
    }

    /// Finds the lowest free slot at or above `start`.
    ///
    /// Scans `[start, bit_count())`. A `start` past the end finds nothing.
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let mut index = FreeIndex::try_new(1).unwrap();
    /// index.set_used_range(0..8);
    /// index.set_free(4);
    /// assert_eq!(index.next_free(0).get(), Some(4));
    /// assert_eq!(index.next_free(4).get(), Some(4));
    /// assert!(!index.next_free(5).found);
    /// ```
    pub fn next_free(&self, start: usize) -> Scan {
        let scan = self.scan_forward(start);
        trace!("next free from bit {start}: {scan:?}");
        scan
    }

    fn scan_forward(&self, start: usize) -> Scan {
        if start >= self.bit_count() {
            return Scan::NOT_FOUND;
        }
        let (mut byte_idx, bit_idx) = idxs(start);
        let mut free = !self.bytes[byte_idx] & (!0u8 << bit_idx);
        loop {
            if free != 0 {
                return Scan::at(byte_idx * 8 + free.trailing_zeros() as usize);
            }
            byte_idx += 1;
            match self.bytes.get(byte_idx) {
                Some(byte) => free = !byte,
                None => return Scan::NOT_FOUND,
            }
        }
    }

    /// Finds the highest free slot strictly above `end`.
    ///
    /// Scans downwards from the last slot, stopping before `end`: unlike
    /// [`next_free`](Self::next_free), the bound itself is never reported.
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let mut index = FreeIndex::try_new(1).unwrap();
    /// index.set_used_range(0..8);
    /// index.set_free(5);
    /// assert!(!index.prev_free(5).found);
    /// assert_eq!(index.prev_free(4).get(), Some(5));
    /// ```
    pub fn prev_free(&self, end: usize) -> Scan {
        let scan = self.scan_backward(end);
        trace!("prev free above bit {end}: {scan:?}");
        scan
    }

    fn scan_backward(&self, end: usize) -> Scan {
        let lowest = match end.checked_add(1) {
            Some(lowest) if lowest < self.bit_count() => lowest,
            _ => return Scan::NOT_FOUND,
        };
        let (low_byte, low_bit) = idxs(lowest);
        let mut byte_idx = self.bytes.len() - 1;
        loop {
            let mut free = !self.bytes[byte_idx];
            if byte_idx == low_byte {
                free &= !0u8 << low_bit;
            }
            if free != 0 {
                return Scan::at(byte_idx * 8 + 7 - free.leading_zeros() as usize);
            }
            if byte_idx == low_byte {
                return Scan::NOT_FOUND;
            }
            byte_idx -= 1;
        }
    }

    /// Number of used slots.
    pub fn used_count(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Number of free slots.
    pub fn free_count(&self) -> usize {
        self.bit_count() - self.used_count()
    }

    /// Returns an iterator over the indices of all free slots, in ascending
    /// order.
    ///
    /// # Examples
    /// ```
    /// use free_index::FreeIndex;
    ///
    /// let index = FreeIndex::from_bytes(vec![0b1111_0101]);
    /// assert!(index.iter_free().eq([1, 3]));
    /// ```
    #[inline]
    pub fn iter_free(&self) -> IterFree<'_> {
        IterFree {
            bytes: &self.bytes,
            byte_idx: 0,
            current: self.bytes.first().map_or(0, |b| !b),
        }
    }

    /// Returns an iterator over the indices of all used slots, in ascending
    /// order.
    #[inline]
    pub fn iter_used(&self) -> IterUsed<'_> {
        IterUsed {
            bytes: &self.bytes,
            byte_idx: 0,
            current: self.bytes.first().copied().unwrap_or(0),
        }
    }
}

impl Default for FreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for FreeIndex {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for FreeIndex {}

impl Hash for FreeIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl Debug for FreeIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "LSB -> ")?;
        for (byte_idx, byte) in self.bytes.iter().enumerate() {
            if byte_idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}: ", byte_idx * 8)?;
            for bit_idx in 0..8 {
                write!(f, "{}", if byte & 1 << bit_idx != 0 { '1' } else { '0' })?;
            }
        }
        write!(f, " <- MSB")
    }
}

/// Iterator over the indices of free slots.
///
/// Returned by [`FreeIndex::iter_free()`].
#[derive(Clone, Copy)]
pub struct IterFree<'index> {
    bytes: &'index [u8],
    byte_idx: usize,
    current: u8,
}

impl Iterator for IterFree<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        while self.byte_idx < self.bytes.len() {
            if self.current != 0 {
                let idx = self.byte_idx * 8 + self.current.trailing_zeros() as usize;
                self.current &= self.current - 1; // unset LSB
                return Some(idx);
            }

            self.byte_idx += 1;
            self.current = self.bytes.get(self.byte_idx).map_or(0, |b| !b);
        }
        None
    }
}

impl FusedIterator for IterFree<'_> {}

/// Iterator over the indices of used slots.
///
/// Returned by [`FreeIndex::iter_used()`].
#[derive(Clone, Copy)]
pub struct IterUsed<'index> {
    bytes: &'index [u8],
    byte_idx: usize,
    current: u8,
}

impl Iterator for IterUsed<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        while self.byte_idx < self.bytes.len() {
            if self.current != 0 {
                let idx = self.byte_idx * 8 + self.current.trailing_zeros() as usize;
                self.current &= self.current - 1; // unset LSB
                return Some(idx);
            }

            self.byte_idx += 1;
            self.current = self.bytes.get(self.byte_idx).copied().unwrap_or(0);
        }
        None
    }
}

impl FusedIterator for IterUsed<'_> {}
