//! The narrow transport contract the collective algorithms consume.
//!
//! The wider MPI runtime, process launch, and fabric transport are out
//! of scope for this crate; what remains is the small set of operations
//! the three reduce-scatter-block algorithms actually call. They are
//! expressed here as traits rather than concrete networking code so the
//! algorithms can be driven, in tests, by an in-process simulated group
//! (see `tests/support`) instead of a real fabric.

use crate::error::Result;

/// Rank within a [`Communicator`]'s group.
pub type Rank = i32;

/// Message-matching tag.
pub type Tag = i32;

/// The tag reserved for this collective's point-to-point traffic,
/// distinct from any tag a caller's own messages might use.
pub const TAG_REDUCE_SCATTER_BLOCK: Tag = -101;

/// Identifies a peer's position in its group.
pub trait Communicator {
    /// This process's rank within the group, in `[0, size())`.
    fn rank(&self) -> Rank;

    /// Number of ranks in the group.
    fn size(&self) -> Rank;
}

/// A handle to a previously posted nonblocking receive.
///
/// Unlike the teacher's `ReceiveFuture`, which writes through a raw
/// pointer into a caller-held buffer, `wait` here returns an owned
/// `Vec<T>`. This trades one extra copy for never requiring `unsafe` at
/// the call sites in `collective::*`, where buffers are already
/// threaded through enough borrows that a raw-pointer-writing future
/// would force awkward lifetime gymnastics for no benefit in a
/// simulated, in-process fabric.
pub trait Request<T> {
    /// Blocks until the receive completes and returns its data.
    fn wait(self) -> Result<Vec<T>>;
}

/// Point-to-point operations over a fixed peer group.
pub trait PointToPoint<T> {
    /// The in-flight receive handle type this implementation returns
    /// from [`PointToPoint::ireceive`].
    type Request: Request<T>;

    /// Blocking send of `buf` to `peer` tagged `tag`.
    fn send(&self, buf: &[T], peer: Rank, tag: Tag) -> Result<()>;

    /// Posts a nonblocking receive of `count` elements from `peer`
    /// tagged `tag`; completion is observed via the returned request's
    /// `wait`.
    fn ireceive(&self, count: usize, peer: Rank, tag: Tag) -> Result<Self::Request>;
}

/// The two collective primitives the basic variant delegates to.
pub trait CollectiveOps<T> {
    /// Reduces `sbuf` element-wise across the group into `rbuf` on
    /// `root`, preserving ascending-rank order for non-commutative
    /// operators. `rbuf` is only meaningful on `root`.
    fn reduce(&self, sbuf: &[T], rbuf: &mut [T], root: Rank, op: &dyn crate::operator::Operator<T>) -> Result<()>;

    /// Scatters `sbuf` (meaningful only on `root`, `size() * rcount`
    /// elements) into each rank's `rbuf` of `rcount` elements.
    fn scatter(&self, sbuf: &[T], rbuf: &mut [T], rcount: usize, root: Rank) -> Result<()>;
}

/// Posts a receive, sends, then waits: a synchronous pairwise exchange
/// with a single peer on both sides, mirroring the teacher's
/// `send_receive_into` but over the [`PointToPoint`] contract above.
pub fn sendrecv<T, P>(fabric: &P, sbuf: &[T], speer: Rank, rcount: usize, rpeer: Rank, tag: Tag) -> Result<Vec<T>>
where
    P: PointToPoint<T>,
{
    let request = fabric.ireceive(rcount, rpeer, tag)?;
    fabric.send(sbuf, speer, tag)?;
    request.wait()
}
