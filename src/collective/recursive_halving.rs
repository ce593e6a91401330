//! Recursive vector halving: commutative operators only, lower
//! bandwidth than distance doubling.
//!
//! Phase 1 folds the group down to the nearest lower power of two by
//! pairing up the first `2 * nprocs_rem` physical ranks. Phase 2 runs a
//! standard recursive-halving reduce-scatter over the folded
//! power-of-two virtual group. Phase 3 relays each folded-out even
//! rank's final block back from the odd partner that computed it.

use conv::ConvUtil;

use super::ReduceScatterInput;
use crate::datatype::{Datatype, ScratchBuffer};
use crate::error::Result;
use crate::fabric::{CollectiveOps, Communicator, PointToPoint, Rank, TAG_REDUCE_SCATTER_BLOCK};
use crate::operator::Operator;
use crate::rank::{next_pow2_leq, range_sum};

/// Runs the recursive vector halving variant of reduce-scatter-block.
///
/// Falls back to [`super::basic::basic`] if `op` is not commutative,
/// re-checking the precondition even when the dispatcher in
/// [`super::reduce_scatter_block`] would normally have routed around
/// this function entirely.
pub fn recursive_halving<T, C, F, D, O>(
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
    C: Communicator + CollectiveOps<T>,
    F: PointToPoint<T>,
    D: Datatype<T>,
    O: Operator<T>,
{
    let rank = comm.rank();
    let size = comm.size();
    tracing::debug!(rank, comm_size = size, rcount, "reduce_scatter_block: recursive_halving");

    if rcount == 0 || size < 2 {
        if size < 2 {
            if let ReduceScatterInput::Separate(sbuf) = input {
                rbuf[..rcount].clone_from_slice(&sbuf[..rcount]);
            }
        }
        return Ok(());
    }

    if !op.is_commutative() {
        return super::basic::basic(comm, input, rbuf, rcount, dtype, op);
    }

    let p = size.value_as::<usize>().expect("comm size fits in usize");
    let totalcount = p * rcount;

    let mut tmpbuf = ScratchBuffer::<T>::new(dtype, totalcount)?;
    match input {
        ReduceScatterInput::Separate(sbuf) => tmpbuf.as_mut_slice().clone_from_slice(&sbuf[..totalcount]),
        ReduceScatterInput::InPlace => {
            let src = rbuf[..totalcount].to_vec();
            tmpbuf.as_mut_slice().clone_from_slice(&src);
        }
    }

    let nprocs_pof2 = next_pow2_leq(size);
    let nprocs_rem = size - nprocs_pof2;

    // Step 1: fold the first 2 * nprocs_rem physical ranks down to
    // nprocs_rem virtual ranks; the rest simply renumber.
    let vrank: Rank;
    if rank < 2 * nprocs_rem {
        if rank % 2 == 0 {
            fabric.send(tmpbuf.as_slice(), rank + 1, TAG_REDUCE_SCATTER_BLOCK)?;
            vrank = -1;
        } else {
            let request = fabric.ireceive(totalcount, rank - 1, TAG_REDUCE_SCATTER_BLOCK)?;
            let recv = request.wait()?;
            op.apply(&recv, tmpbuf.as_mut_slice())?;
            vrank = rank / 2;
        }
    } else {
        vrank = rank - nprocs_rem;
    }

    if vrank != -1 {
        // Step 2: recursive halving over the nprocs_pof2 virtual ranks.
        let mut send_index: i32 = 0;
        let mut recv_index: i32 = 0;
        let mut last_index: i32 = nprocs_pof2;
        let mut mask = nprocs_pof2 >> 1;

        while mask > 0 {
            let vpeer = vrank ^ mask;
            let peer = if vpeer < nprocs_rem { vpeer * 2 + 1 } else { vpeer + nprocs_rem };

            let (send_blocks, recv_blocks) = if vrank < vpeer {
                send_index = recv_index + mask;
                (
                    range_sum(send_index, last_index - 1, nprocs_rem - 1),
                    range_sum(recv_index, send_index - 1, nprocs_rem - 1),
                )
            } else {
                recv_index = send_index + mask;
                (
                    range_sum(send_index, recv_index - 1, nprocs_rem - 1),
                    range_sum(recv_index, last_index - 1, nprocs_rem - 1),
                )
            };
            let send_count = send_blocks.value_as::<usize>().expect("block count fits in usize") * rcount;
            let recv_count = recv_blocks.value_as::<usize>().expect("block count fits in usize") * rcount;

            let rdispl = block_displacement(recv_index, nprocs_rem) * rcount;
            let sdispl = block_displacement(send_index, nprocs_rem) * rcount;

            let mut pending = None;
            if recv_count > 0 {
                pending = Some(fabric.ireceive(recv_count, peer, TAG_REDUCE_SCATTER_BLOCK)?);
            }
            if send_count > 0 {
                fabric.send(&tmpbuf.as_slice()[sdispl..sdispl + send_count], peer, TAG_REDUCE_SCATTER_BLOCK)?;
            }
            if let Some(request) = pending {
                let recv = request.wait()?;
                op.apply(&recv, &mut tmpbuf.as_mut_slice()[rdispl..rdispl + recv_count])?;
            }

            send_index = recv_index;
            last_index = recv_index + mask;
            mask >>= 1;
        }

        let my_offset = rank.value_as::<usize>().expect("rank fits in usize") * rcount;
        rbuf[..rcount].clone_from_slice(&tmpbuf.as_slice()[my_offset..my_offset + rcount]);
    }

    // Step 3: relay the final block back to each folded-out even rank.
    if rank < 2 * nprocs_rem {
        if rank % 2 == 0 {
            let request = fabric.ireceive(rcount, rank + 1, TAG_REDUCE_SCATTER_BLOCK)?;
            let recv = request.wait()?;
            rbuf[..rcount].clone_from_slice(&recv);
        } else {
            let offset = (rank - 1).value_as::<usize>().expect("rank fits in usize") * rcount;
            fabric.send(&tmpbuf.as_slice()[offset..offset + rcount], rank - 1, TAG_REDUCE_SCATTER_BLOCK)?;
        }
    }

    Ok(())
}

/// Maps a virtual block index to its physical element-block
/// displacement: the first `nprocs_rem` virtual indices each absorbed
/// an even neighbor and so own two physical blocks, placing them at
/// `2 * idx`; the rest own a single physical block at `nprocs_rem +
/// idx`.
fn block_displacement(idx: i32, nprocs_rem: i32) -> usize {
    let blocks = if idx <= nprocs_rem - 1 { 2 * idx } else { nprocs_rem + idx };
    blocks.value_as::<usize>().expect("block displacement fits in usize")
}
