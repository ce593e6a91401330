//! Reduce-scatter-block: three interchangeable implementations sharing
//! one signature and one externally observable postcondition.
//!
//! Given `p` peer processes each holding a `p * m`-element vector, the
//! collective reduces the vectors element-wise with a caller-supplied
//! operator and leaves rank `i` holding the `i`-th `m`-element block of
//! the result. Algorithm selection is external to the core (see
//! [`Algorithm`]); the wider module-selection policy that would pick one
//! automatically is out of scope here.

pub mod basic;
pub mod recursive_doubling;
pub mod recursive_halving;

use crate::datatype::Datatype;
use crate::error::{Error, Result};
use crate::fabric::{Communicator, PointToPoint};
use crate::operator::Operator;

/// The input side of a reduce-scatter-block call.
///
/// A raw `IN_PLACE` sentinel pointer does not translate into safe Rust,
/// since a single buffer cannot simultaneously be borrowed as `&[T]`
/// and `&mut [T]`. `InPlace` instead tells the implementation to treat
/// the caller's receive buffer as already holding the full `p * m`
/// elements of local input on entry, matching the real in-place
/// contract for this specific collective.
pub enum ReduceScatterInput<'a, T> {
    /// A separate `p * m`-element input buffer.
    Separate(&'a [T]),
    /// The receive buffer already holds the full `p * m`-element input.
    InPlace,
}

/// Which of the three algorithms to run. Selecting one is the caller's
/// responsibility (or that of an external, out-of-scope module-selection
/// policy); the core does not choose for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Reduce into a root followed by a scatter.
    Basic,
    /// Order-preserving recursive distance doubling; any operator, any
    /// group size.
    RecursiveDoubling,
    /// Recursive vector halving; commutative operators only, lower
    /// bandwidth. Falls back to [`Algorithm::Basic`] for non-commutative
    /// operators.
    RecursiveHalving,
}

/// Runs reduce-scatter-block using `algorithm`, falling back from
/// [`Algorithm::RecursiveHalving`] to [`Algorithm::Basic`] when the
/// operator is non-commutative.
#[allow(clippy::too_many_arguments)]
pub fn reduce_scatter_block<T, C, F, D, O>(
    comm: &C,
    fabric: &F,
    input: ReduceScatterInput<'_, T>,
    rbuf: &mut [T],
    rcount: usize,
    dtype: &D,
    op: &O,
    algorithm: Algorithm,
) -> Result<()>
where
    T: Clone + Default + Copy,
    C: Communicator + crate::fabric::CollectiveOps<T>,
    F: PointToPoint<T>,
    D: Datatype<T>,
    O: Operator<T>,
{
    let p = comm.size();
    if p <= 0 {
        return Err(Error::Transport("group size must be positive".into()));
    }
    match algorithm {
        Algorithm::Basic => basic::basic(comm, input, rbuf, rcount, dtype, op),
        Algorithm::RecursiveDoubling => {
            recursive_doubling::recursive_doubling(comm, fabric, input, rbuf, rcount, dtype, op)
        }
        Algorithm::RecursiveHalving => {
            if op.is_commutative() {
                recursive_halving::recursive_halving(comm, fabric, input, rbuf, rcount, dtype, op)
            } else {
                basic::basic(comm, input, rbuf, rcount, dtype, op)
            }
        }
    }
}
