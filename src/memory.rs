use crate::constants;
use crate::error::RuntimeError;
use byteorder::ByteOrder;
use util::Endian;

/// A byte-addressable storage unit with big-endian multi-byte accessors.
///
/// Mirrors the `Storage` trait of the teaching codebase this VM is built
/// from, trimmed to the word sizes picovm actually uses (bytes and 16-bit
/// halves; picovm has no 32-bit memory operand).
pub trait Storage {
    /// Total addressable length in bytes.
    fn length(&self) -> usize;

    /// Whether `[address, address+len)` lies within the storage.
    fn check_range(&self, address: u16, len: u16) -> bool;

    fn borrow_slice(&self, address: u16, len: u16) -> Result<&[u8], ()>;
    fn borrow_slice_mut(&mut self, address: u16, len: u16) -> Result<&mut [u8], ()>;

    fn read_byte(&self, address: u16) -> Result<u8, ()> {
        Ok(self.borrow_slice(address, 1)?[0])
    }

    fn read_word(&self, address: u16) -> Result<u16, ()> {
        Ok(Endian::read_u16(self.borrow_slice(address, 2)?))
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), ()> {
        self.borrow_slice_mut(address, 1)?[0] = value;
        Ok(())
    }

    fn write_word(&mut self, address: u16, value: u16) -> Result<(), ()> {
        Endian::write_u16(self.borrow_slice_mut(address, 2)?, value);
        Ok(())
    }
}

/// The VM's flat 64 KiB address space.
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Constructs a zeroed 64 KiB memory.
    pub fn new() -> Memory {
        Memory {
            data: vec![0; constants::MEMORY_SIZE],
        }
    }

    /// Copies `rom` into the ROM load region at [`constants::ROM_BASE`].
    ///
    /// # Errors
    /// Returns [`RuntimeError::RomTooLarge`] if `rom` is longer than the ROM region.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), RuntimeError> {
        if rom.len() > constants::ROM_LEN {
            return Err(RuntimeError::RomTooLarge {
                len: rom.len(),
                max: constants::ROM_LEN,
            });
        }
        let base = constants::ROM_BASE as usize;
        self.data[base..base + rom.len()].copy_from_slice(rom);
        Ok(())
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }
}

impl Default for Memory {
    fn default() -> Memory {
        Memory::new()
    }
}

impl Storage for Memory {
    fn length(&self) -> usize {
        self.data.len()
    }

    fn check_range(&self, address: u16, len: u16) -> bool {
        (address as u32 + len as u32) <= self.data.len() as u32
    }

    fn borrow_slice(&self, address: u16, len: u16) -> Result<&[u8], ()> {
        if self.check_range(address, len) {
            Ok(&self.data[address as usize..(address as usize + len as usize)])
        } else {
            Err(())
        }
    }

    fn borrow_slice_mut(&mut self, address: u16, len: u16) -> Result<&mut [u8], ()> {
        if self.check_range(address, len) {
            Ok(&mut self.data[address as usize..(address as usize + len as usize)])
        } else {
            Err(())
        }
    }
}
