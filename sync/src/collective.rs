use anyhow::{anyhow, bail, ensure, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Rank of the coordinator. All collectives funnel through this rank.
pub const COORDINATOR: usize = 0;

#[derive(Debug)]
enum Frame {
    /// Announces the byte length of the payload frame that follows.
    Size(u64),
    Payload(Vec<u8>),
    Arrive,
    Release,
}

enum Links {
    /// Rank 0 holds one channel pair per other rank, indexed by rank - 1.
    Coordinator {
        to_workers: Vec<Sender<Frame>>,
        from_workers: Vec<Receiver<Frame>>,
    },
    Worker {
        to_coordinator: Sender<Frame>,
        from_coordinator: Receiver<Frame>,
    },
}

/// One rank's endpoint of a fixed worker group.
///
/// Every rank must execute the same sequence of collective calls; the
/// frames on each link are consumed strictly in program order, so there is
/// no tagging or reordering. A rank that never reaches a collective blocks
/// the whole group; detecting that is an operational concern outside this
/// layer.
pub struct Collective {
    rank: usize,
    world_size: usize,
    links: Links,
}

impl Collective {
    /// Creates the endpoints for a group of `world_size` ranks. The first
    /// element is the coordinator.
    pub fn group(world_size: usize) -> Vec<Collective> {
        assert!(world_size >= 1, "world_size must be at least 1");

        let mut to_workers = Vec::with_capacity(world_size - 1);
        let mut from_workers = Vec::with_capacity(world_size - 1);
        let mut endpoints = Vec::with_capacity(world_size);

        for rank in 1..world_size {
            let (up_tx, up_rx) = unbounded();
            let (down_tx, down_rx) = unbounded();

            to_workers.push(down_tx);
            from_workers.push(up_rx);

            endpoints.push(Collective {
                rank,
                world_size,
                links: Links::Worker {
                    to_coordinator: up_tx,
                    from_coordinator: down_rx,
                },
            });
        }

        endpoints.insert(
            0,
            Collective {
                rank: COORDINATOR,
                world_size,
                links: Links::Coordinator {
                    to_workers,
                    from_workers,
                },
            },
        );

        endpoints
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn world_size(&self) -> usize {
        self.world_size
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR
    }

    /// This rank's share of `total` units of work. The remainder of the
    /// floor division goes to the lowest ranks, one unit each, so no work
    /// is ever dropped and the shares sum to `total`.
    pub fn partition(&self, total: usize) -> usize {
        total / self.world_size + usize::from(self.rank < total % self.world_size)
    }

    /// Collects every rank's `local` items at the coordinator, in rank
    /// order. Returns `Some` with the union at the coordinator and `None`
    /// everywhere else.
    pub fn gather<T>(&self, local: Vec<T>) -> Result<Option<Vec<T>>>
    where
        T: Serialize + DeserializeOwned,
    {
        match &self.links {
            Links::Worker { to_coordinator, .. } => {
                send_sized(to_coordinator, &serde_json::to_vec(&local)?)?;
                Ok(None)
            }
            Links::Coordinator { from_workers, .. } => {
                let mut all = local;

                for from_worker in from_workers {
                    let payload = recv_sized(from_worker)?;
                    let contributed: Vec<T> = serde_json::from_slice(&payload)?;
                    all.extend(contributed);
                }

                Ok(Some(all))
            }
        }
    }

    /// Replicates the coordinator's value to every rank. The coordinator
    /// must supply `Some`; the other ranks pass `None` and receive the
    /// decoded copy. The payload is framed in two phases, size then data,
    /// and a receiver never decodes a payload before checking it against
    /// the announced size.
    pub fn broadcast<T>(&self, value: Option<T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        match &self.links {
            Links::Coordinator { to_workers, .. } => {
                let value =
                    value.ok_or_else(|| anyhow!("broadcast requires a value at the coordinator"))?;
                let bytes = serde_json::to_vec(&value)?;

                for to_worker in to_workers {
                    send_sized(to_worker, &bytes)?;
                }

                Ok(value)
            }
            Links::Worker {
                from_coordinator, ..
            } => {
                let payload = recv_sized(from_coordinator)?;
                Ok(serde_json::from_slice(&payload)?)
            }
        }
    }

    /// Blocks until every rank in the group has arrived.
    pub fn barrier(&self) -> Result<()> {
        match &self.links {
            Links::Worker {
                to_coordinator,
                from_coordinator,
            } => {
                send(to_coordinator, Frame::Arrive)?;

                match recv(from_coordinator)? {
                    Frame::Release => Ok(()),
                    frame => bail!("barrier protocol error: expected release, got {:?}", frame),
                }
            }
            Links::Coordinator {
                to_workers,
                from_workers,
            } => {
                for from_worker in from_workers {
                    match recv(from_worker)? {
                        Frame::Arrive => {}
                        frame => {
                            bail!("barrier protocol error: expected arrive, got {:?}", frame)
                        }
                    }
                }

                for to_worker in to_workers {
                    send(to_worker, Frame::Release)?;
                }

                Ok(())
            }
        }
    }
}

fn send(tx: &Sender<Frame>, frame: Frame) -> Result<()> {
    tx.send(frame)
        .map_err(|_| anyhow!("collective link closed: peer rank is gone"))
}

fn recv(rx: &Receiver<Frame>) -> Result<Frame> {
    rx.recv()
        .map_err(|_| anyhow!("collective link closed: peer rank is gone"))
}

fn send_sized(tx: &Sender<Frame>, bytes: &[u8]) -> Result<()> {
    send(tx, Frame::Size(bytes.len() as u64))?;
    send(tx, Frame::Payload(bytes.to_vec()))
}

fn recv_sized(rx: &Receiver<Frame>) -> Result<Vec<u8>> {
    let size = match recv(rx)? {
        Frame::Size(size) => size,
        frame => bail!("collective protocol error: expected size, got {:?}", frame),
    };

    let payload = match recv(rx)? {
        Frame::Payload(payload) => payload,
        frame => bail!(
            "collective protocol error: expected payload, got {:?}",
            frame
        ),
    };

    ensure!(
        payload.len() as u64 == size,
        "collective protocol error: payload of {} bytes does not match announced size {}",
        payload.len(),
        size
    );

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_partition_distributes_remainder_to_low_ranks() {
        let group = Collective::group(3);

        let shares: Vec<_> = group.iter().map(|c| c.partition(10)).collect();

        assert_eq!(shares, vec![4, 3, 3]);
        assert_eq!(shares.iter().sum::<usize>(), 10);
    }

    #[test]
    fn test_partition_even_split() {
        let group = Collective::group(4);

        let shares: Vec<_> = group.iter().map(|c| c.partition(12)).collect();

        assert_eq!(shares, vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_gather_unions_in_rank_order() {
        let group = Collective::group(3);

        crossbeam::scope(|s| {
            let handles: Vec<_> = group
                .iter()
                .map(|collective| {
                    s.spawn(move |_| {
                        let local: Vec<u32> =
                            (0..4).map(|i| (collective.rank() * 10 + i) as u32).collect();
                        collective.gather(local).unwrap()
                    })
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            let gathered = results[0].as_ref().expect("coordinator receives the union");
            assert_eq!(gathered.len(), 3 * 4);
            assert_eq!(
                gathered,
                &vec![0, 1, 2, 3, 10, 11, 12, 13, 20, 21, 22, 23]
            );

            assert!(results[1].is_none());
            assert!(results[2].is_none());
        })
        .unwrap();
    }

    #[test]
    fn test_broadcast_replicates_coordinator_value() {
        let group = Collective::group(3);
        let payload: Vec<u8> = (0..=255).collect();

        crossbeam::scope(|s| {
            let handles: Vec<_> = group
                .iter()
                .map(|collective| {
                    let value = collective.is_coordinator().then(|| payload.clone());
                    s.spawn(move |_| collective.broadcast(value).unwrap())
                })
                .collect();

            for handle in handles {
                assert_eq!(handle.join().unwrap(), payload);
            }
        })
        .unwrap();
    }

    #[test]
    fn test_broadcast_requires_coordinator_value() {
        let group = Collective::group(1);

        let res = group[0].broadcast::<Vec<u8>>(None);

        assert!(res.is_err());
    }

    #[test]
    fn test_barrier_waits_for_all_ranks() {
        let group = Collective::group(4);
        let arrived = AtomicUsize::new(0);
        let arrived = &arrived;

        crossbeam::scope(|s| {
            for collective in &group {
                s.spawn(move |_| {
                    arrived.fetch_add(1, Ordering::SeqCst);
                    collective.barrier().unwrap();
                    assert_eq!(arrived.load(Ordering::SeqCst), 4);
                });
            }
        })
        .unwrap();
    }

    #[test]
    fn test_single_rank_group_is_degenerate() {
        let group = Collective::group(1);
        let collective = &group[0];

        assert!(collective.is_coordinator());
        assert_eq!(collective.partition(7), 7);
        assert_eq!(
            collective.gather(vec![1u32, 2, 3]).unwrap(),
            Some(vec![1, 2, 3])
        );
        assert_eq!(collective.broadcast(Some(42u32)).unwrap(), 42);
        collective.barrier().unwrap();
    }
}
