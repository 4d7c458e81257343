use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Conditions that abort a running VM. Division by zero and out-of-range
/// branch targets are deliberately absent: the former yields zero, the
/// latter is executed as whatever happens to be in memory.
#[derive(Debug)]
pub enum RuntimeError {
    /// ROM image longer than the ROM region.
    RomTooLarge { len: usize, max: usize },
    /// The interrupt FIFO could not be opened or read.
    InterruptFifo(io::Error),
    /// A `READIN`/`WRITEOUT` instruction failed on its external byte stream.
    Stream(io::Error),
    /// A memory access (`LOAD`/`STOR`) addressed outside the storage range.
    BadMemoryAccess { address: u16 },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuntimeError::RomTooLarge { len, max } => write!(
                f,
                "ROM image is {} bytes, exceeds the {} byte ROM region",
                len, max
            ),
            RuntimeError::InterruptFifo(err) => write!(f, "interrupt FIFO error: {}", err),
            RuntimeError::Stream(err) => write!(f, "byte stream I/O error: {}", err),
            RuntimeError::BadMemoryAccess { address } => {
                write!(f, "memory access out of range at address {:#06x}", address)
            }
        }
    }
}

impl StdError for RuntimeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RuntimeError::InterruptFifo(err) | RuntimeError::Stream(err) => Some(err),
            _ => None,
        }
    }
}
