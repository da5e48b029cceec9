use super::{CommError, CommResult, Envelope, Tag};
use crate::config;
use crate::warnings::RuntimeWarning;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The endpoint one PE uses to talk to every other PE of an in-process world.
///
/// Every PE owns one inbox; envelopes that arrive before they are asked for are
/// parked in `pending` so receives can match on (source, tag) while keeping
/// per-source FIFO order.
pub(crate) struct LocalComm {
    my_pe: usize,
    num_pes: usize,
    outboxes: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    pending: Mutex<VecDeque<Envelope>>,
    abort: Arc<AtomicBool>,
    bytes_sent: AtomicUsize,
    poll_interval: Duration,
    deadlock_timeout: Duration,
    stalls: AtomicUsize,
}

impl std::fmt::Debug for LocalComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalComm {{ my_pe: {}, num_pes: {} }}", self.my_pe, self.num_pes)
    }
}

/// Wire up `num_pes` endpoints, element `i` belongs to pe `i`
pub(crate) fn create_fabric(num_pes: usize, abort: Arc<AtomicBool>) -> Vec<LocalComm> {
    let (outboxes, inboxes): (Vec<_>, Vec<_>) = (0..num_pes).map(|_| unbounded()).unzip();
    let poll_interval = Duration::from_micros(config().poll_interval_us.max(1));
    let deadlock_timeout = Duration::from_secs_f64(config().deadlock_timeout.max(0.0));
    inboxes
        .into_iter()
        .enumerate()
        .map(|(my_pe, inbox)| LocalComm {
            my_pe,
            num_pes,
            outboxes: outboxes.clone(),
            inbox,
            pending: Mutex::new(VecDeque::new()),
            abort: abort.clone(),
            bytes_sent: AtomicUsize::new(0),
            poll_interval,
            deadlock_timeout,
            stalls: AtomicUsize::new(0),
        })
        .collect()
}

impl LocalComm {
    pub(crate) fn my_pe(&self) -> usize {
        self.my_pe
    }

    pub(crate) fn num_pes(&self) -> usize {
        self.num_pes
    }

    pub(crate) fn bytes_sent(&self) -> usize {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Flag the whole pe set as failed, blocked receives on every pe return [CommError::Aborted]
    pub(crate) fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    pub(crate) fn aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// How many times a receive on this pe waited longer than the deadlock timeout
    pub(crate) fn stalls(&self) -> usize {
        self.stalls.load(Ordering::Relaxed)
    }

    fn check_pe(&self, pe: usize) -> CommResult<()> {
        if pe < self.num_pes {
            Ok(())
        } else {
            Err(CommError::InvalidPe {
                pe,
                num_pes: self.num_pes,
            })
        }
    }

    pub(crate) fn send<T: Serialize + ?Sized>(&self, pe: usize, tag: Tag, data: &T) -> CommResult<()> {
        self.check_pe(pe)?;
        let payload = crate::serialize(data).map_err(CommError::Codec)?;
        self.bytes_sent.fetch_add(payload.len(), Ordering::Relaxed);
        tracing::trace!(src = self.my_pe, dst = pe, ?tag, bytes = payload.len(), "send");
        self.outboxes[pe]
            .send(Envelope {
                src: self.my_pe,
                tag,
                payload,
            })
            .map_err(|_| CommError::Disconnected {
                pe: self.my_pe,
                peer: pe,
            })
    }

    pub(crate) fn recv<T: DeserializeOwned>(&self, src: usize, tag: Tag) -> CommResult<T> {
        self.check_pe(src)?;
        let envelope = self.recv_envelope(src, tag)?;
        crate::deserialize(&envelope.payload).map_err(CommError::Codec)
    }

    fn take_pending(&self, src: usize, tag: Tag) -> Option<Envelope> {
        let mut pending = self.pending.lock();
        let idx = pending.iter().position(|e| e.src == src && e.tag == tag)?;
        pending.remove(idx)
    }

    fn recv_envelope(&self, src: usize, tag: Tag) -> CommResult<Envelope> {
        if let Some(envelope) = self.take_pending(src, tag) {
            return Ok(envelope);
        }
        let mut waiting = Instant::now();
        loop {
            if self.aborted() {
                return Err(CommError::Aborted { pe: self.my_pe });
            }
            match self.inbox.recv_timeout(self.poll_interval) {
                Ok(envelope) if envelope.src == src && envelope.tag == tag => return Ok(envelope),
                Ok(envelope) => self.pending.lock().push_back(envelope),
                Err(RecvTimeoutError::Timeout) => {
                    let elapsed = waiting.elapsed();
                    if elapsed > self.deadlock_timeout {
                        self.stalls.fetch_add(1, Ordering::Relaxed);
                        RuntimeWarning::RecvTimeout {
                            pe: self.my_pe,
                            src,
                            tag,
                            elapsed: elapsed.as_secs_f64(),
                            timeout: self.deadlock_timeout.as_secs_f64(),
                        }
                        .print();
                        waiting = Instant::now();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CommError::Disconnected {
                        pe: self.my_pe,
                        peer: src,
                    })
                }
            }
        }
    }

    /// Send `data` to `dst` and replace it with the value received from `src`.
    ///
    /// Sends never block (unbounded inboxes), so a ring of pes all exchanging at once cannot deadlock.
    pub(crate) fn exchange<T: Serialize + DeserializeOwned>(
        &self,
        data: &T,
        dst: usize,
        src: usize,
        tag: Tag,
    ) -> CommResult<T> {
        self.send(dst, tag, data)?;
        self.recv(src, tag)
    }

    /// Only `root` evaluates `value`, every other pe receives a copy of the result
    pub(crate) fn broadcast<T, F>(&self, root: usize, tag: Tag, value: F) -> CommResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.check_pe(root)?;
        if self.my_pe == root {
            let value = value();
            for pe in (0..self.num_pes).filter(|pe| *pe != root) {
                self.send(pe, tag, &value)?;
            }
            Ok(value)
        } else {
            self.recv(root, tag)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fabric(num_pes: usize) -> Vec<LocalComm> {
        create_fabric(num_pes, Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn slow_sender_trips_the_deadlock_timeout_and_still_delivers() {
        let mut comms = fabric(2);
        comms[0].deadlock_timeout = Duration::from_millis(1);
        let sender = comms.pop().unwrap();
        let receiver = comms.pop().unwrap();
        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(50));
                sender.send(0, Tag::Result, &42u64).unwrap();
            });
            let got: u64 = receiver.recv(1, Tag::Result).unwrap();
            assert_eq!(42, got);
        });
        assert!(receiver.stalls() > 0);
        assert_eq!(0, sender.stalls());
    }

    #[test]
    fn default_deadlock_timeout_comes_from_config() {
        let comms = fabric(1);
        assert_eq!(
            Duration::from_secs_f64(config().deadlock_timeout),
            comms[0].deadlock_timeout
        );
    }

    #[test]
    fn out_of_order_tags_are_parked() {
        let comms = fabric(2);
        comms[0].send(1, Tag::ScatterA, &vec![1.0f64, 2.0]).unwrap();
        comms[0].send(1, Tag::ScatterB, &vec![3.0f64]).unwrap();
        let b: Vec<f64> = comms[1].recv(0, Tag::ScatterB).unwrap();
        let a: Vec<f64> = comms[1].recv(0, Tag::ScatterA).unwrap();
        assert_eq!(vec![3.0], b);
        assert_eq!(vec![1.0, 2.0], a);
    }

    #[test]
    fn same_tag_keeps_fifo_order() {
        let comms = fabric(3);
        comms[2].send(0, Tag::SkewA, &1u32).unwrap();
        comms[1].send(0, Tag::SkewA, &10u32).unwrap();
        comms[2].send(0, Tag::SkewA, &2u32).unwrap();
        assert_eq!(10u32, comms[0].recv(1, Tag::SkewA).unwrap());
        assert_eq!(1u32, comms[0].recv(2, Tag::SkewA).unwrap());
        assert_eq!(2u32, comms[0].recv(2, Tag::SkewA).unwrap());
    }

    #[test]
    fn self_exchange() {
        let comms = fabric(1);
        let got: Vec<f64> = comms[0].exchange(&vec![4.0], 0, 0, Tag::ShiftA).unwrap();
        assert_eq!(vec![4.0], got);
        assert!(comms[0].bytes_sent() > 0);
    }

    #[test]
    fn invalid_pe() {
        let comms = fabric(2);
        assert!(matches!(
            comms[0].send(2, Tag::Gather, &0u8),
            Err(CommError::InvalidPe { pe: 2, num_pes: 2 })
        ));
        assert!(matches!(
            comms[0].recv::<u8>(5, Tag::Gather),
            Err(CommError::InvalidPe { pe: 5, num_pes: 2 })
        ));
    }

    #[test]
    fn abort_releases_blocked_receive() {
        let comms = fabric(2);
        comms[1].abort();
        assert!(matches!(
            comms[0].recv::<u8>(1, Tag::Result),
            Err(CommError::Aborted { pe: 0 })
        ));
    }

    #[test]
    fn codec_errors_are_reported() {
        let comms = fabric(2);
        comms[0].send(1, Tag::User(7), &1u8).unwrap();
        assert!(matches!(
            comms[1].recv::<Vec<f64>>(0, Tag::User(7)),
            Err(CommError::Codec(_))
        ));
    }
}
