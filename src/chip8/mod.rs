//! The full implementation of the chip8 board, from the opcodes to an option to pretty
//! print them.
mod board;
mod cpu;
mod opcodes;
mod print;

/// reexport the board and cpu structs for simpler usage
pub use board::*;
pub use cpu::*;
