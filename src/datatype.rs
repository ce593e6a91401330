//! Describing typed buffers.
//!
//! A typed buffer is a logically contiguous vector of `count` elements of
//! some datatype. The datatype carries an *extent* (stride between
//! successive elements) and a *span* (the smallest contiguous byte range
//! covering `count` elements, together with a leading *gap*). The core
//! algorithms never allocate `count * size_of::<T>()` bytes directly;
//! they ask the datatype for its span and gap and allocate exactly that,
//! so that a datatype whose representation is not simply "N elements
//! back to back" (a real opaque MPI datatype, for instance) is handled
//! correctly. This crate's [`Dense`] reference datatype happens to have
//! zero gap, but the contract does not assume that in general.

use crate::error::{Error, Result};

/// The byte span and leading gap of `count` elements of some datatype,
/// expressed in units of the element type `T` for convenience (this
/// core never crosses an untyped byte boundary, unlike a real datatype
/// engine working over raw memory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Number of `T`-sized slots that must be allocated to hold `count`
    /// elements, including any leading/trailing padding the datatype
    /// requires.
    pub len: usize,
    /// Offset, in `T`-sized slots, of element `0` from the start of the
    /// allocation described by `len`.
    pub gap: usize,
}

/// The datatype contract the collective algorithms are written against.
///
/// A real embedding of this core behind an actual MPI binding would
/// implement this trait over an opaque, possibly strided datatype
/// handle; the reference [`Dense`] implementation below is simply "N
/// elements, no padding," which is sufficient for every type this crate
/// tests against.
pub trait Datatype<T> {
    /// Returns the span and gap describing `count` contiguous elements
    /// of this datatype.
    ///
    /// Implementations that cannot satisfy the request (for example, a
    /// test double simulating resource exhaustion) return
    /// [`Error::OutOfResource`] or [`Error::Datatype`].
    fn span(&self, count: usize) -> Result<Span>;
}

/// The default, dependency-free datatype: `count` elements of `T` laid
/// out back to back with no gap.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dense;

impl<T> Datatype<T> for Dense {
    fn span(&self, count: usize) -> Result<Span> {
        Ok(Span { len: count, gap: 0 })
    }
}

/// An RAII scratch buffer realizing the base-offset-minus-gap idiom:
/// `storage` is the raw allocation, and valid elements live at
/// `storage[gap..gap + count]`. The accessors never form a pointer or
/// range outside `storage`'s bounds, which keeps the idiom safe in Rust
/// even though the motivating C pattern (`base = alloc - gap`) would be
/// undefined behavior if ported literally.
pub struct ScratchBuffer<T> {
    storage: Box<[T]>,
    gap: usize,
    count: usize,
}

impl<T: Clone + Default> ScratchBuffer<T> {
    /// Allocates a scratch buffer for `count` elements of the given
    /// datatype, default-initialized.
    ///
    /// Returns [`Error::OutOfResource`] if the datatype reports a span
    /// too large to allocate, or if the allocator itself fails.
    pub fn new(dtype: &impl Datatype<T>, count: usize) -> Result<Self> {
        let span = dtype.span(count)?;
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(span.len)
            .map_err(|e| Error::OutOfResource(format!("scratch buffer of {} elements: {e}", span.len)))?;
        storage.resize(span.len, T::default());
        Ok(ScratchBuffer {
            storage: storage.into_boxed_slice(),
            gap: span.gap,
            count,
        })
    }

    /// The logical (gap-adjusted) read view of this buffer's elements.
    pub fn as_slice(&self) -> &[T] {
        &self.storage[self.gap..self.gap + self.count]
    }

    /// The logical (gap-adjusted) read/write view of this buffer's
    /// elements.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.storage[self.gap..self.gap + self.count]
    }

    /// Number of logical elements this buffer holds.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether this buffer holds zero logical elements.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
