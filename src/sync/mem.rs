//!
//! An in-memory reference transport, backed by channels.
//!
//! Intended for tests and examples: each participating "process" is a
//! thread, links are FIFO channels, and the exchange primitive rides on a
//! [`std::sync::Barrier`]. Real deployments supply their own
//! [`Transport`] over MPI, sockets or similar.
//!

use super::{Envelope, SyncSummary, Transport};
use crate::error::Error;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Barrier};

///
/// Creates `size` linked [`MemTransport`]s, one per simulated process.
///
/// ```
/// use descore::sync::mem;
///
/// let mut transports = mem::cluster(3);
/// assert_eq!(transports.len(), 3);
/// let t0 = transports.remove(0);
/// // move t0 into the thread running rank 0 ...
/// ```
///
#[must_use]
pub fn cluster(size: u32) -> Vec<MemTransport> {
    assert!(size > 0, "a cluster needs at least one process");

    let mut data_tx = Vec::with_capacity(size as usize);
    let mut data_rx = Vec::with_capacity(size as usize);
    let mut ctrl_tx = Vec::with_capacity(size as usize);
    let mut ctrl_rx = Vec::with_capacity(size as usize);
    for _ in 0..size {
        let (tx, rx) = mpsc::channel();
        data_tx.push(tx);
        data_rx.push(rx);
        let (tx, rx) = mpsc::channel();
        ctrl_tx.push(tx);
        ctrl_rx.push(rx);
    }

    let barrier = Arc::new(Barrier::new(size as usize));

    data_rx
        .into_iter()
        .zip(ctrl_rx)
        .enumerate()
        .map(|(rank, (data, ctrl))| MemTransport {
            rank: rank as u32,
            size,
            data_tx: data_tx.clone(),
            data_rx: data,
            ctrl_tx: ctrl_tx.clone(),
            ctrl_rx: ctrl,
            barrier: Arc::clone(&barrier),
        })
        .collect()
}

///
/// One process's endpoint of an in-memory cluster; see [`cluster`].
///
pub struct MemTransport {
    rank: u32,
    size: u32,
    data_tx: Vec<Sender<(u32, Envelope)>>,
    data_rx: Receiver<(u32, Envelope)>,
    ctrl_tx: Vec<Sender<(u32, SyncSummary)>>,
    ctrl_rx: Receiver<(u32, SyncSummary)>,
    barrier: Arc<Barrier>,
}

fn broken_pipe(msg: &str) -> Error {
    Error::Transport(io::Error::new(io::ErrorKind::BrokenPipe, msg.to_string()))
}

impl Transport for MemTransport {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn send(&mut self, dest: u32, envelope: Envelope) -> Result<(), Error> {
        // A peer that has already finished dropped its receiver; late
        // bound updates to it are irrelevant.
        let _ = self.data_tx[dest as usize].send((self.rank, envelope));
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Option<(u32, Envelope)>, Error> {
        match self.data_rx.try_recv() {
            Ok(pair) => Ok(Some(pair)),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn recv(&mut self) -> Result<(u32, Envelope), Error> {
        self.data_rx
            .recv()
            .map_err(|_| broken_pipe("all peers disconnected while messages were expected"))
    }

    fn barrier(&mut self) -> Result<(), Error> {
        self.barrier.wait();
        Ok(())
    }

    fn exchange(&mut self, local: SyncSummary) -> Result<Vec<SyncSummary>, Error> {
        self.barrier.wait();

        for (rank, tx) in self.ctrl_tx.iter().enumerate() {
            if rank as u32 != self.rank {
                tx.send((self.rank, local))
                    .map_err(|_| broken_pipe("peer left during summary exchange"))?;
            }
        }

        let mut all = vec![local; self.size as usize];
        for _ in 0..self.size - 1 {
            let (rank, summary) = self
                .ctrl_rx
                .recv()
                .map_err(|_| broken_pipe("peer left during summary exchange"))?;
            all[rank as usize] = summary;
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::EnvelopeKind;
    use crate::time::SimTime;
    use std::thread;

    #[test]
    fn per_link_fifo() {
        let mut transports = cluster(2);
        let mut b = transports.pop().unwrap();
        let mut a = transports.pop().unwrap();

        for ticks in [1i64, 2, 3] {
            a.send(
                1,
                Envelope {
                    time: SimTime::from_ticks(ticks),
                    kind: EnvelopeKind::Null,
                },
            )
            .unwrap();
        }

        let mut seen = Vec::new();
        while let Some((src, envelope)) = b.try_recv().unwrap() {
            assert_eq!(src, 0);
            seen.push(envelope.time.ticks());
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn exchange_gathers_all_ranks() {
        let transports = cluster(3);
        let handles: Vec<_> = transports
            .into_iter()
            .map(|mut t| {
                thread::spawn(move || {
                    let local = SyncSummary {
                        next_event: SimTime::from_ticks(i64::from(t.rank())),
                        sent: u64::from(t.rank()),
                        received: 0,
                    };
                    t.exchange(local).unwrap()
                })
            })
            .collect();

        for handle in handles {
            let all = handle.join().unwrap();
            assert_eq!(all.len(), 3);
            for (rank, summary) in all.iter().enumerate() {
                assert_eq!(summary.next_event, SimTime::from_ticks(rank as i64));
                assert_eq!(summary.sent, rank as u64);
            }
        }
    }
}
