//! In-process, thread-and-channel simulated process group.
//!
//! Stands in for a real fabric/communicator so the integration tests can
//! drive every reduce-scatter-block algorithm end to end without a real
//! MPI runtime. One OS thread per simulated rank, `std::sync::mpsc`
//! channels per ordered (source, destination) pair for point-to-point
//! traffic.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use coll_reduce_scatter_block::error::{Error, Result};
use coll_reduce_scatter_block::fabric::{CollectiveOps, Communicator, PointToPoint, Rank, Request, Tag};
use coll_reduce_scatter_block::operator::Operator;

/// Tag reserved for this harness's own `reduce`/`scatter` traffic,
/// distinct from the crate's `TAG_REDUCE_SCATTER_BLOCK`.
const TAG_HARNESS_COLLECTIVE: Tag = -202;

struct Message<T> {
    tag: Tag,
    data: Vec<T>,
}

/// One simulated rank's view of the group: its own rank/size and a
/// matrix of channel endpoints to every peer.
pub struct RankHandle<T> {
    rank: Rank,
    size: Rank,
    senders: Vec<Sender<Message<T>>>,
    receivers: Vec<Arc<Mutex<Receiver<Message<T>>>>>,
}

/// A posted-but-not-yet-awaited receive. The actual blocking `recv`
/// happens in [`Request::wait`], not here, so posting a receive on every
/// peer before sending anywhere (the shape every algorithm in this
/// crate uses) never deadlocks.
pub struct PendingReceive<T> {
    receiver: Arc<Mutex<Receiver<Message<T>>>>,
    expected_tag: Tag,
    expected_count: usize,
}

impl<T> Request<T> for PendingReceive<T> {
    fn wait(self) -> Result<Vec<T>> {
        let msg = self
            .receiver
            .lock()
            .expect("channel mutex poisoned")
            .recv()
            .map_err(|_| Error::Transport("peer disconnected before sending".into()))?;
        debug_assert_eq!(msg.tag, self.expected_tag, "tag mismatch in simulated harness");
        debug_assert_eq!(msg.data.len(), self.expected_count, "length mismatch in simulated harness");
        Ok(msg.data)
    }
}

impl<T> Communicator for RankHandle<T> {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> Rank {
        self.size
    }
}

impl<T: Clone + Send + 'static> PointToPoint<T> for RankHandle<T> {
    type Request = PendingReceive<T>;

    fn send(&self, buf: &[T], peer: Rank, tag: Tag) -> Result<()> {
        self.senders[peer as usize]
            .send(Message { tag, data: buf.to_vec() })
            .map_err(|_| Error::Transport("peer disconnected before receiving".into()))
    }

    fn ireceive(&self, count: usize, peer: Rank, tag: Tag) -> Result<Self::Request> {
        Ok(PendingReceive {
            receiver: Arc::clone(&self.receivers[peer as usize]),
            expected_tag: tag,
            expected_count: count,
        })
    }
}

impl<T: Clone + Send + 'static> CollectiveOps<T> for RankHandle<T> {
    fn reduce(&self, sbuf: &[T], rbuf: &mut [T], root: Rank, op: &dyn Operator<T>) -> Result<()> {
        if self.rank != root {
            return self.send(sbuf, root, TAG_HARNESS_COLLECTIVE);
        }

        let mut contributions: Vec<Vec<T>> = Vec::with_capacity(self.size as usize);
        for src in 0..self.size {
            if src == root {
                contributions.push(sbuf.to_vec());
            } else {
                let request = self.ireceive(sbuf.len(), src, TAG_HARNESS_COLLECTIVE)?;
                contributions.push(request.wait()?);
            }
        }

        // Fold strictly in ascending rank order so non-commutative
        // operators see the same order they would under any other
        // correct implementation of `reduce`.
        let mut acc = contributions[0].clone();
        for next in contributions.iter_mut().skip(1) {
            op.apply(&acc, next)?;
            acc = std::mem::take(next);
        }
        rbuf.clone_from_slice(&acc);
        Ok(())
    }

    fn scatter(&self, sbuf: &[T], rbuf: &mut [T], rcount: usize, root: Rank) -> Result<()> {
        if self.rank == root {
            for dst in 0..self.size {
                let offset = dst as usize * rcount;
                let block = &sbuf[offset..offset + rcount];
                if dst == root {
                    rbuf[..rcount].clone_from_slice(block);
                } else {
                    self.send(block, dst, TAG_HARNESS_COLLECTIVE)?;
                }
            }
            Ok(())
        } else {
            let request = self.ireceive(rcount, root, TAG_HARNESS_COLLECTIVE)?;
            let data = request.wait()?;
            rbuf[..rcount].clone_from_slice(&data);
            Ok(())
        }
    }
}

/// Builds `size` [`RankHandle`]s, fully connected by point-to-point
/// channels, ready to be handed one per simulated-rank thread.
pub fn build_group<T>(size: Rank) -> Vec<RankHandle<T>> {
    let size_usize = size as usize;
    // channel_senders[from][to]
    let mut channel_senders: Vec<Vec<Sender<Message<T>>>> = Vec::with_capacity(size_usize);
    let mut channel_receivers: Vec<Vec<Arc<Mutex<Receiver<Message<T>>>>>> = Vec::with_capacity(size_usize);
    for _ in 0..size_usize {
        channel_senders.push(Vec::with_capacity(size_usize));
        channel_receivers.push(Vec::with_capacity(size_usize));
    }
    for from in 0..size_usize {
        for _to in 0..size_usize {
            let (tx, rx) = channel();
            channel_senders[from].push(tx);
            channel_receivers[from].push(Arc::new(Mutex::new(rx)));
        }
    }

    (0..size_usize)
        .map(|rank| {
            let senders = (0..size_usize).map(|to| channel_senders[rank][to].clone()).collect();
            let receivers = (0..size_usize).map(|from| Arc::clone(&channel_receivers[from][rank])).collect();
            RankHandle {
                rank: rank as Rank,
                size,
                senders,
                receivers,
            }
        })
        .collect()
}

/// Runs `body` once per simulated rank on its own OS thread and
/// collects the results in rank order, propagating the first panic (if
/// any) to the caller.
pub fn run_group<T, R, F>(size: Rank, body: F) -> Vec<R>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(RankHandle<T>) -> R + Send + Sync + 'static,
{
    let group = build_group::<T>(size);
    let body = Arc::new(body);
    let handles: Vec<_> = group
        .into_iter()
        .map(|rank_handle| {
            let body = Arc::clone(&body);
            thread::spawn(move || body(rank_handle))
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().expect("simulated rank thread panicked"))
        .collect()
}
