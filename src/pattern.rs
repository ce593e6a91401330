//! Typed scatter-pattern construction.
//!
//! The recursive doubling variant needs to send or receive "every block
//! except those owned by a given subtree" in one message. A real MPI
//! datatype engine expresses this as a two-run indexed datatype
//! (`blocklens`/`displs` pairs); this crate's fabric moves already-typed
//! `Vec<T>` data rather than raw bytes across an FFI boundary, so the
//! same two-run shape is expressed here as a plain value, [`PatternRun`]
//! pair, with [`gather`]/[`scatter_into`] standing in for the datatype
//! engine's internal pack/unpack.

/// One contiguous run of a two-run pattern: `len` elements starting at
/// element offset `offset` in the logical `p * m`-element buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRun {
    /// Element offset of the run's first element.
    pub offset: usize,
    /// Number of elements in the run.
    pub len: usize,
}

impl PatternRun {
    const EMPTY: PatternRun = PatternRun { offset: 0, len: 0 };
}

/// The two runs describing "every block outside the subtree rooted at
/// `cur_root` of width `mask`" over a buffer of `p` blocks of `m`
/// elements each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScatterPattern {
    /// The prefix run: blocks `0..cur_root`.
    pub run0: PatternRun,
    /// The suffix run: blocks `cur_root + mask..p`, possibly empty.
    pub run1: PatternRun,
}

impl ScatterPattern {
    /// Total element count covered by both runs.
    pub fn len(&self) -> usize {
        self.run0.len + self.run1.len
    }

    /// Whether both runs are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the two-run pattern excluding the subtree `[cur_root, cur_root
/// + mask)` from a buffer of `p` blocks of `m` elements.
///
/// `mask` need not be a power of two for this function's purposes, but
/// every caller in this crate passes a power of two.
pub fn scatter_pattern(p: usize, m: usize, cur_root: usize, mask: usize) -> ScatterPattern {
    let run0 = PatternRun {
        offset: 0,
        len: m * cur_root,
    };
    let suffix_start = cur_root + mask;
    let run1 = if suffix_start >= p {
        PatternRun::EMPTY
    } else {
        PatternRun {
            offset: m * suffix_start,
            len: m * (p - suffix_start),
        }
    };
    ScatterPattern { run0, run1 }
}

/// Copies the two runs described by `pattern` out of `buf` into a fresh,
/// contiguous wire buffer, run 0 first.
pub fn gather<T: Clone>(buf: &[T], pattern: &ScatterPattern) -> Vec<T> {
    let mut wire = Vec::with_capacity(pattern.len());
    wire.extend_from_slice(&buf[pattern.run0.offset..pattern.run0.offset + pattern.run0.len]);
    wire.extend_from_slice(&buf[pattern.run1.offset..pattern.run1.offset + pattern.run1.len]);
    wire
}

/// Copies a contiguous wire buffer back into the two runs described by
/// `pattern` within `buf`.
///
/// Panics if `wire.len() != pattern.len()`, which would indicate a bug
/// internal to the calling algorithm rather than a caller-reachable
/// error.
pub fn scatter_into<T: Clone>(wire: &[T], pattern: &ScatterPattern, buf: &mut [T]) {
    assert_eq!(wire.len(), pattern.len(), "wire buffer does not match pattern length");
    let (first, rest) = wire.split_at(pattern.run0.len);
    buf[pattern.run0.offset..pattern.run0.offset + pattern.run0.len].clone_from_slice(first);
    buf[pattern.run1.offset..pattern.run1.offset + pattern.run1.len].clone_from_slice(rest);
}
