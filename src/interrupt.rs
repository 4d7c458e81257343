//! Shared interrupt slot between the VM loop and an external producer thread.
//!
//! Grounded in the condition-variable handshake of the original C sources'
//! `interrupt.h`/`parallel.c` (a single `current_interrupt` global guarded by
//! a mutex plus a condvar signalled by the VM once the slot is drained), and
//! in the `Arc<Mutex<_>>` shared-state-between-threads shape this corpus uses
//! elsewhere for a producer/consumer pair of threads (audio callback vs.
//! emulator loop). The wire format below follows the external contract
//! described by the specification (a named FIFO carrying single identifying
//! bytes), not the original's configurable AF_UNIX socket listener.

use log::{debug, warn};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

/// Default path of the named pipe an external producer writes to.
pub const DEFAULT_FIFO_PATH: &str = "/tmp/picovmint.in";

/// One of the three parallel-port interrupt sources.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InterruptId {
    P0,
    P1,
    P2,
}

impl InterruptId {
    /// Maps the single byte the FIFO protocol carries (0/1/2) to an id.
    fn from_byte(b: u8) -> Option<InterruptId> {
        match b {
            0 => Some(InterruptId::P0),
            1 => Some(InterruptId::P1),
            2 => Some(InterruptId::P2),
            _ => None,
        }
    }

    /// Index into [`crate::constants::INTERRUPT_VECTORS`].
    pub fn vector_index(self) -> usize {
        match self {
            InterruptId::P0 => 0,
            InterruptId::P1 => 1,
            InterruptId::P2 => 2,
        }
    }
}

struct Slot {
    pending: Mutex<Option<InterruptId>>,
    drained: Condvar,
}

/// Handle to the single-slot mailbox shared with the producer thread.
///
/// The VM side calls [`InterruptHandle::take`] between instructions; the
/// producer side calls [`InterruptHandle::post`] and then blocks on the
/// condition variable until the VM has drained the slot.
#[derive(Clone)]
pub struct InterruptHandle {
    slot: Arc<Slot>,
}

impl InterruptHandle {
    fn new() -> InterruptHandle {
        InterruptHandle {
            slot: Arc::new(Slot {
                pending: Mutex::new(None),
                drained: Condvar::new(),
            }),
        }
    }

    /// Called by the VM loop. Returns the pending interrupt, if any, clearing
    /// the slot and waking the producer so it may post the next one.
    pub fn take(&self) -> Option<InterruptId> {
        let mut pending = self.slot.pending.lock().unwrap();
        let id = pending.take();
        if id.is_none() {
            self.slot.drained.notify_one();
        }
        id
    }

    /// Called by the producer thread to post a new pending interrupt. Visible
    /// within the crate so tests can post without a real FIFO producer.
    pub(crate) fn post(&self, id: InterruptId) {
        let mut pending = self.slot.pending.lock().unwrap();
        while pending.is_some() {
            pending = self.slot.drained.wait(pending).unwrap();
        }
        *pending = Some(id);
    }
}

/// Spawns the FIFO-reading producer thread and returns a handle the VM loop
/// polls between instructions.
///
/// Opening the named pipe blocks until a writer connects, matching the usual
/// semantics of POSIX FIFOs; this happens on the spawned thread so it never
/// stalls VM startup.
pub fn spawn_fifo_producer(fifo_path: impl AsRef<Path>) -> InterruptHandle {
    let handle = InterruptHandle::new();
    let producer_handle = handle.clone();
    let path: PathBuf = fifo_path.as_ref().to_path_buf();

    thread::spawn(move || run_producer(&path, producer_handle));

    handle
}

fn run_producer(path: &Path, handle: InterruptHandle) {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!("interrupt FIFO {} unavailable: {}", path.display(), err);
            return;
        }
    };

    let mut byte = [0u8; 1];
    loop {
        match file.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                if let Some(id) = InterruptId::from_byte(byte[0]) {
                    debug!("interrupt FIFO posted {:?}", id);
                    handle.post(id);
                } else {
                    warn!("interrupt FIFO sent unrecognised byte {}", byte[0]);
                }
            }
            Err(err) => {
                warn!("interrupt FIFO read error: {}", err);
                break;
            }
        }
    }
}

/// A handle with no producer thread attached; [`InterruptHandle::take`]
/// always returns `None`. Used when interrupts are not wired up (e.g. tests).
pub fn disabled() -> InterruptHandle {
    InterruptHandle::new()
}
