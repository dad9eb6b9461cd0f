//! The flat addressable memory of the board.
use crate::{
    definitions::{display::fontset, memory},
    opcode::Opcode,
    MemoryError,
};

/// - `0x000-0x1FF` - Interpreter area (contains the font set)
/// - `0x050-0x09F` - Used for the built in `4x5` pixel font set (`0-F`)
/// - `0x200-0xFFF` - Program ROM and work RAM
///
/// Addresses outside of the memory are always rejected, they never wrap.
#[derive(Clone)]
pub struct Memory {
    data: Box<[u8; memory::SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Will create a new memory block with the font set already written.
    pub fn new() -> Self {
        let mut mem = Self {
            data: Box::new([0; memory::SIZE]),
        };
        mem.reset();
        mem
    }

    /// Zeroes the whole memory and writes the font set back to its location.
    pub fn reset(&mut self) {
        self.data.fill(0);

        let location = fontset::LOCATION as usize;
        self.data[location..(location + fontset::FONTSET.len())]
            .copy_from_slice(&fontset::FONTSET);
    }

    /// The amount of bytes the memory can hold.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    fn check(&self, address: usize) -> Result<(), MemoryError> {
        if address < self.data.len() {
            Ok(())
        } else {
            Err(MemoryError::OutOfRange {
                address,
                len: self.data.len(),
            })
        }
    }

    /// Will read a single byte.
    pub fn read(&self, address: usize) -> Result<u8, MemoryError> {
        self.check(address)?;
        Ok(self.data[address])
    }

    /// Will write a single byte.
    pub fn write(&mut self, address: usize, value: u8) -> Result<(), MemoryError> {
        self.check(address)?;
        self.data[address] = value;
        Ok(())
    }

    /// Writes the data sequentially from the given address on. The write is
    /// not atomic, if it runs out of memory all bytes before the failing one
    /// stay written and the error reports how many that were.
    ///
    /// Returns the amount of bytes written.
    pub fn write_bulk(&mut self, address: usize, data: &[u8]) -> Result<usize, MemoryError> {
        for (written, value) in data.iter().enumerate() {
            let at = address + written;
            if self.write(at, *value).is_err() {
                return Err(MemoryError::PartialWrite {
                    address: at,
                    written,
                });
            }
        }
        Ok(data.len())
    }

    /// Will build the big-endian opcode stored at `address` and `address + 1`.
    pub fn read_opcode(&self, address: usize) -> Result<Opcode, MemoryError> {
        let high = self.read(address)?;
        let low = self.read(address + 1)?;
        Ok(Opcode::from_be_bytes([high, low]))
    }

    /// Read only view onto `len` bytes starting at `address`.
    pub fn range(&self, address: usize, len: usize) -> Result<&[u8], MemoryError> {
        match address.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(&self.data[address..end]),
            _ => Err(MemoryError::OutOfRange {
                address: address.saturating_add(len).saturating_sub(1),
                len: self.data.len(),
            }),
        }
    }

    /// The whole memory block.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }
}

/// Will return the address of the font glyph for the given hex digit.
///
/// # Example
/// ```rust
/// # use chip::memory::font_glyph_pointer;
/// assert_eq!(font_glyph_pointer(0x0), Ok(0x050));
/// assert_eq!(font_glyph_pointer(0xA), Ok(0x082));
/// assert!(font_glyph_pointer(0x10).is_err());
/// ```
pub fn font_glyph_pointer(digit: u8) -> Result<u16, MemoryError> {
    if digit > fontset::LAST_DIGIT {
        return Err(MemoryError::FontDigit(digit));
    }
    Ok(fontset::LOCATION + fontset::GLYPH_SIZE * digit as u16)
}
