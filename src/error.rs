use thiserror::Error;

use crate::opcode::Opcode;

/// The abstract failure classes a board operation can end in.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    /// An address, register, stack slot, font digit or key outside of its bounds.
    OutOfRange,
    /// The fetched opcode did not decode into an instruction.
    InvalidOpcode,
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProcessError {
    #[error("Invalid opcode state '{0}'.")]
    Opcode(#[from] OpcodeError),
    #[error("Invalid memory access '{0}'.")]
    Memory(#[from] MemoryError),
    #[error("Invalid stack state '{0}'.")]
    Stack(#[from] StackError),
    #[error("Invalid register access '{0}'.")]
    Register(#[from] RegisterError),
    #[error("Invalid key '{0}'.")]
    Key(#[from] KeyError),
}

impl ProcessError {
    /// Maps the error onto the failure class it belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::Opcode(_) => ErrorKind::InvalidOpcode,
            ProcessError::Memory(_)
            | ProcessError::Stack(_)
            | ProcessError::Register(_)
            | ProcessError::Key(_) => ErrorKind::OutOfRange,
        }
    }

    pub fn is_out_of_range(&self) -> bool {
        self.kind() == ErrorKind::OutOfRange
    }
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum OpcodeError {
    #[error("An unsupported opcode was used {0:#06X?}.")]
    InvalidOpcode(Opcode),
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum MemoryError {
    #[error("Address {address:#06X} is out of range, the memory size is {len:#06X}.")]
    OutOfRange { address: usize, len: usize },
    #[error("Bulk write stopped at {address:#06X} after {written} bytes.")]
    PartialWrite { address: usize, written: usize },
    #[error("There is no font glyph for the digit {0:#04X}.")]
    FontDigit(u8),
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum StackError {
    #[error("Stack is full!")]
    Full,
    #[error("Stack is empty!")]
    Empty,
    #[error("There is no stack slot {0}.")]
    Slot(usize),
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("There is no register V{0:X}.")]
pub struct RegisterError(pub usize);

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("There is no key {0:#04X} on the keypad.")]
pub struct KeyError(pub usize);

/// The errors that can happen while loading a rom.
#[derive(Error, Debug)]
pub enum RomError {
    #[error("Unable to read the rom: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to extract the rom from the archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("The rom '{0}' is empty.")]
    Empty(String),
    #[error("The rom '{name}' is {len} bytes long, but only {capacity} bytes are available.")]
    TooLarge {
        name: String,
        len: usize,
        capacity: usize,
    },
}
