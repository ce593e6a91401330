//! The basic reduce-then-scatter implementation.
//!
//! Root 0 reduces every rank's contribution into a scratch buffer, then
//! scatters `m`-element blocks of that buffer back out. Correctness for
//! non-commutative operators is inherited from the underlying `reduce`
//! collective, which is contractually order-preserving; this variant
//! adds nothing of its own on that front.

use super::ReduceScatterInput;
use crate::datatype::{Datatype, ScratchBuffer};
use crate::error::Result;
use crate::fabric::{CollectiveOps, Communicator, Rank};
use crate::operator::Operator;

const ROOT: Rank = 0;

/// Runs the basic variant of reduce-scatter-block.
pub fn basic<T, C, D, O>(
    comm: &C,
    input: ReduceScatterInput<'_, T>,
    rbuf: &mut [T],
    rcount: usize,
    dtype: &D,
    op: &O,
) -> Result<()>
where
    T: Clone + Default + Copy,
    C: Communicator + CollectiveOps<T>,
    D: Datatype<T>,
    O: Operator<T>,
{
    let rank = comm.rank();
    let p = comm.size() as usize;
    tracing::debug!(rank, comm_size = p, rcount, "reduce_scatter_block: basic");

    if rcount == 0 {
        return Ok(());
    }

    if p == 1 {
        if let ReduceScatterInput::Separate(sbuf) = input {
            rbuf[..rcount].clone_from_slice(&sbuf[..rcount]);
        }
        return Ok(());
    }

    let mut scratch = if rank == ROOT {
        Some(ScratchBuffer::<T>::new(dtype, p * rcount)?)
    } else {
        None
    };
    let reduce_dst: &mut [T] = match scratch.as_mut() {
        Some(s) => s.as_mut_slice(),
        None => &mut [],
    };

    match input {
        ReduceScatterInput::Separate(sbuf) => comm.reduce(sbuf, reduce_dst, ROOT, op)?,
        ReduceScatterInput::InPlace => comm.reduce(&*rbuf, reduce_dst, ROOT, op)?,
    }

    let scatter_src: &[T] = match scratch.as_ref() {
        Some(s) => s.as_slice(),
        None => &[],
    };
    comm.scatter(scatter_src, rbuf, rcount, ROOT)
}
