//! Recursive distance doubling: order-preserving, any operator, any
//! group size.
//!
//! At step `s` (`mask = 2^s`), rank `r` exchanges "everything outside my
//! current subtree" with `r xor mask`. Non-power-of-two group sizes are
//! handled by a recursive-halving forwarding search nested inside each
//! doubling step, relaying the already-exchanged data to ranks whose
//! distance-doubling partner fell outside the group.

use conv::ConvUtil;

use super::ReduceScatterInput;
use crate::datatype::{Datatype, ScratchBuffer};
use crate::error::Result;
use crate::fabric::{sendrecv, Communicator, PointToPoint, Rank, TAG_REDUCE_SCATTER_BLOCK};
use crate::operator::Operator;
use crate::pattern::{gather, scatter_into, scatter_pattern};
use crate::rank::round_down;

/// Runs the recursive distance doubling variant of
/// reduce-scatter-block.
pub fn recursive_doubling<T, C, F, D, O>(
    comm: &C,
    fabric: &F,
    input: ReduceScatterInput<'_, T>,
    rbuf: &mut [T],
    rcount: usize,
    dtype: &D,
    op: &O,
) -> Result<()>
where
    T: Clone + Default + Copy,
    C: Communicator,
    F: PointToPoint<T>,
    D: Datatype<T>,
    O: Operator<T>,
{
    let rank = comm.rank();
    let size = comm.size();
    tracing::debug!(rank, comm_size = size, rcount, "reduce_scatter_block: recursive_doubling");

    if rcount == 0 || size < 2 {
        if size < 2 {
            if let ReduceScatterInput::Separate(sbuf) = input {
                rbuf[..rcount].clone_from_slice(&sbuf[..rcount]);
            }
        }
        return Ok(());
    }

    let p = size.value_as::<usize>().expect("comm size fits in usize");
    let totalcount = p * rcount;

    let mut tmpbuf = ScratchBuffer::<T>::new(dtype, totalcount)?;
    let mut tmprecv = ScratchBuffer::<T>::new(dtype, totalcount)?;

    match input {
        ReduceScatterInput::Separate(sbuf) => tmpbuf.as_mut_slice().clone_from_slice(&sbuf[..totalcount]),
        ReduceScatterInput::InPlace => {
            let src = rbuf[..totalcount].to_vec();
            tmpbuf.as_mut_slice().clone_from_slice(&src);
        }
    }

    let is_commutative = op.is_commutative();

    let mut mask: i32 = 1;
    while mask < size {
        let remote = rank ^ mask;
        let cur_tree_root = round_down(rank, mask);
        let remote_tree_root = round_down(remote, mask);

        let send_pattern = scatter_pattern(p, rcount, cur_tree_root as usize, mask as usize);
        let recv_pattern = scatter_pattern(p, rcount, remote_tree_root as usize, mask as usize);

        let mut is_block_received = false;

        if remote < size {
            let send_wire = gather(tmpbuf.as_slice(), &send_pattern);
            let recv_wire = sendrecv(
                fabric,
                &send_wire,
                remote,
                recv_pattern.len(),
                remote,
                TAG_REDUCE_SCATTER_BLOCK,
            )?;
            scatter_into(&recv_wire, &recv_pattern, tmprecv.as_mut_slice());
            is_block_received = true;
        }

        // Non-power-of-two: forward the already-exchanged data to ranks
        // whose own distance-doubling partner fell outside the group.
        if remote_tree_root + mask > size {
            let nprocs_alldata = size - cur_tree_root - mask;
            let mut rhalving_mask = mask >> 1;
            while rhalving_mask > 0 {
                let remote2 = rank ^ rhalving_mask;
                let tree_root2 = round_down(rank, rhalving_mask << 1);

                if remote2 > rank && rank < tree_root2 + nprocs_alldata && remote2 >= tree_root2 + nprocs_alldata {
                    let wire = gather(tmprecv.as_slice(), &recv_pattern);
                    fabric.send(&wire, remote2, TAG_REDUCE_SCATTER_BLOCK)?;
                } else if remote2 < rank && remote2 < tree_root2 + nprocs_alldata && rank >= tree_root2 + nprocs_alldata {
                    let request = fabric.ireceive(recv_pattern.len(), remote2, TAG_REDUCE_SCATTER_BLOCK)?;
                    let wire = request.wait()?;
                    scatter_into(&wire, &recv_pattern, tmprecv.as_mut_slice());
                    is_block_received = true;
                }

                rhalving_mask >>= 1;
            }
        }

        if is_block_received {
            if is_commutative || remote_tree_root < cur_tree_root {
                let (tb0, tb1) = run_slices_mut(tmpbuf.as_mut_slice(), &recv_pattern);
                let (tr0, tr1) = run_slices(tmprecv.as_slice(), &recv_pattern);
                op.apply(tr0, tb0)?;
                op.apply(tr1, tb1)?;
            } else {
                let (tr0, tr1) = run_slices_mut(tmprecv.as_mut_slice(), &recv_pattern);
                let (tb0, tb1) = run_slices(tmpbuf.as_slice(), &recv_pattern);
                op.apply(tb0, tr0)?;
                op.apply(tb1, tr1)?;
                let run0 = recv_pattern.run0;
                let run1 = recv_pattern.run1;
                let recv_slice = tmprecv.as_slice();
                let run0_copy = recv_slice[run0.offset..run0.offset + run0.len].to_vec();
                let run1_copy = recv_slice[run1.offset..run1.offset + run1.len].to_vec();
                let dst = tmpbuf.as_mut_slice();
                dst[run0.offset..run0.offset + run0.len].clone_from_slice(&run0_copy);
                dst[run1.offset..run1.offset + run1.len].clone_from_slice(&run1_copy);
            }
        }

        mask <<= 1;
    }

    let my_offset = rank.value_as::<usize>().expect("rank fits in usize") * rcount;
    rbuf[..rcount].clone_from_slice(&tmpbuf.as_slice()[my_offset..my_offset + rcount]);
    Ok(())
}

fn run_slices<'a, T>(buf: &'a [T], pattern: &crate::pattern::ScatterPattern) -> (&'a [T], &'a [T]) {
    let r0 = &buf[pattern.run0.offset..pattern.run0.offset + pattern.run0.len];
    let r1 = if pattern.run1.len == 0 {
        &buf[0..0]
    } else {
        &buf[pattern.run1.offset..pattern.run1.offset + pattern.run1.len]
    };
    (r0, r1)
}

fn run_slices_mut<'a, T>(buf: &'a mut [T], pattern: &crate::pattern::ScatterPattern) -> (&'a mut [T], &'a mut [T]) {
    // run0 always starts at 0 and ends at run0.len; a nonempty run1
    // always starts at or after run0.len (it begins at cur_tree_root +
    // mask), so splitting the buffer at run0.len is always valid and
    // gives two independent mutable views.
    let split = pattern.run0.len;
    let (left, right) = buf.split_at_mut(split);
    let r0 = &mut left[..];
    let r1 = if pattern.run1.len == 0 {
        &mut right[0..0]
    } else {
        let rel = pattern.run1.offset - split;
        &mut right[rel..rel + pattern.run1.len]
    };
    (r0, r1)
}
