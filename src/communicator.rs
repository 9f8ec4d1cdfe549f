//! Process group abstraction used for the end-of-run collective merge.
//!
//! Every process in a group must take part in each collective call, in the
//! same order, or the group deadlocks. Payloads are plain bytes; typed
//! values go through `serde_json`.

use crate::error::{Result, SourceError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::sync::mpsc::{channel, Receiver, Sender};

pub trait Communicator: Send {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Collect one payload from every process on `root`.
    ///
    /// The root gets every payload ordered by rank; the other processes get
    /// None.
    fn gather(&self, payload: Vec<u8>, root: usize) -> Result<Option<Vec<Vec<u8>>>>;

    /// Block until every process in the group has reached the barrier
    fn barrier(&self) -> Result<()>;
}

/// Gather a serializable value from every process on `root`
pub fn gather_values<T>(comm: &dyn Communicator, value: &T, root: usize) -> Result<Option<Vec<T>>>
where
    T: Serialize + DeserializeOwned,
{
    let payload = serde_json::to_vec(value)?;
    match comm.gather(payload, root)? {
        Some(payloads) => {
            let values = payloads
                .iter()
                .map(|bytes| serde_json::from_slice(bytes))
                .collect::<std::result::Result<Vec<T>, _>>()?;
            Ok(Some(values))
        }
        None => Ok(None),
    }
}

fn check_root(root: usize, size: usize) -> Result<()> {
    if root >= size {
        return Err(SourceError::Communication(format!(
            "root rank {} is outside a group of size {}",
            root, size
        )));
    }
    Ok(())
}

/// A group of one
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn gather(&self, payload: Vec<u8>, root: usize) -> Result<Option<Vec<Vec<u8>>>> {
        check_root(root, 1)?;
        Ok(Some(vec![payload]))
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct Envelope {
    epoch: u64,
    source: usize,
    payload: Vec<u8>,
}

/// One member of a channel-backed process group. Each member is meant to
/// be moved onto its own thread.
#[derive(Debug)]
pub struct InMemoryCommunicator {
    rank: usize,
    senders: Vec<Sender<Envelope>>,
    receiver: Receiver<Envelope>,
    // Collective calls made so far; tags messages so that consecutive
    // collectives cannot be confused.
    epoch: Cell<u64>,
    pending: RefCell<Vec<Envelope>>,
}

impl InMemoryCommunicator {
    /// Create every member of a group of `size` processes, ordered by rank
    pub fn group(size: usize) -> Vec<InMemoryCommunicator> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| channel()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| InMemoryCommunicator {
                rank,
                senders: senders.clone(),
                receiver,
                epoch: Cell::new(0),
                pending: RefCell::new(Vec::new()),
            })
            .collect()
    }

    fn next_epoch(&self) -> u64 {
        let epoch = self.epoch.get();
        self.epoch.set(epoch + 1);
        epoch
    }

    fn send(&self, destination: usize, epoch: u64, payload: Vec<u8>) -> Result<()> {
        self.senders[destination]
            .send(Envelope {
                epoch,
                source: self.rank,
                payload,
            })
            .map_err(|_| {
                SourceError::Communication(format!(
                    "rank {} could not reach rank {}",
                    self.rank, destination
                ))
            })
    }

    fn receive(&self, epoch: u64) -> Result<Envelope> {
        let mut pending = self.pending.borrow_mut();
        if let Some(pos) = pending.iter().position(|message| message.epoch == epoch) {
            return Ok(pending.swap_remove(pos));
        }
        loop {
            let message = self.receiver.recv().map_err(|_| {
                SourceError::Communication(format!("rank {} lost its group", self.rank))
            })?;
            if message.epoch == epoch {
                return Ok(message);
            }
            pending.push(message);
        }
    }
}

impl Communicator for InMemoryCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn gather(&self, payload: Vec<u8>, root: usize) -> Result<Option<Vec<Vec<u8>>>> {
        check_root(root, self.size())?;
        let epoch = self.next_epoch();

        if self.rank != root {
            self.send(root, epoch, payload)?;
            return Ok(None);
        }

        let mut payloads = vec![Vec::new(); self.size()];
        payloads[root] = payload;
        for _ in 1..self.size() {
            let message = self.receive(epoch)?;
            payloads[message.source] = message.payload;
        }
        Ok(Some(payloads))
    }

    fn barrier(&self) -> Result<()> {
        let epoch = self.next_epoch();
        if self.rank == 0 {
            for _ in 1..self.size() {
                self.receive(epoch)?;
            }
            for destination in 1..self.size() {
                self.send(destination, epoch, Vec::new())?;
            }
        } else {
            self.send(0, epoch, Vec::new())?;
            self.receive(epoch)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_serial_gather() {
        let comm = SerialCommunicator;
        let gathered = gather_values(&comm, &42u64, 0).unwrap().unwrap();
        assert_eq!(gathered, vec![42]);
        assert!(comm.gather(Vec::new(), 1).is_err());
    }

    #[test]
    fn test_in_memory_gather_orders_by_rank() {
        let handles: Vec<_> = InMemoryCommunicator::group(4)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let value = comm.rank() as u64 * 10;
                    gather_values(&comm, &value, 2).unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for (rank, result) in results.iter().enumerate() {
            if rank == 2 {
                assert_eq!(result.as_ref().unwrap(), &vec![0, 10, 20, 30]);
            } else {
                assert!(result.is_none());
            }
        }
    }

    #[test]
    fn test_consecutive_collectives_do_not_mix() {
        let handles: Vec<_> = InMemoryCommunicator::group(3)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let first = gather_values(&comm, &(comm.rank() as u64), 0).unwrap();
                    comm.barrier().unwrap();
                    let second = gather_values(&comm, &(100 + comm.rank() as u64), 0).unwrap();
                    (first, second)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0].0.as_ref().unwrap(), &vec![0, 1, 2]);
        assert_eq!(results[0].1.as_ref().unwrap(), &vec![100, 101, 102]);
        assert!(results[1].0.is_none());
    }
}
