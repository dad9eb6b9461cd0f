use std::fmt::Write;

use super::Cpu;
use crate::{
    audio::Beeper,
    definitions::{cpu, memory},
    devices::{Keypad, Screen, Tone, PIXEL_OFF, PIXEL_ON},
    display::PixelGrid,
    memory::Memory,
    opcode::{self, Operation},
    resources::Rom,
    ErrorKind, ProcessError,
};

/// The amount of bytes [`Board::dump_memory`] writes per line.
const DUMP_LINE: usize = 16;

/// Everything the cpu works on that is not part of the cpu itself.
pub struct Peripherals<S, T> {
    pub(crate) memory: Memory,
    pub(crate) screen: S,
    pub(crate) tone: T,
    pub(crate) keypad: Keypad,
}

impl<S, T> Peripherals<S, T>
where
    S: Screen,
    T: Tone,
{
    pub fn new(screen: S, tone: T) -> Self {
        Self {
            memory: Memory::new(),
            screen,
            tone,
            keypad: Keypad::new(),
        }
    }

    pub fn reset(&mut self) {
        self.memory.reset();
        self.screen.reset();
        self.tone.reset();
        self.keypad.reset();
    }
}

/// The board owns the cpu and all of the peripherals, every mutating
/// operation goes through here.
pub struct Board<S, T> {
    pub(super) cpu: Cpu,
    pub(super) bus: Peripherals<S, T>,
    /// Set on an invalid opcode, the host has to intervene.
    pub(super) break_flag: bool,
    pub(super) shutdown: bool,
}

impl Board<PixelGrid, Beeper> {
    /// A board without any host attached.
    pub fn headless() -> Self {
        Self::new(PixelGrid::new(), Beeper::new())
    }
}

impl<S, T> Board<S, T>
where
    S: Screen,
    T: Tone,
{
    pub fn new(screen: S, tone: T) -> Self {
        Self::with_program_start(screen, tone, cpu::PROGRAM_COUNTER)
    }

    /// Will create a board whose program counter starts at the given address.
    pub fn with_program_start(screen: S, tone: T, program_start: u16) -> Self {
        Self::with_cpu(screen, tone, Cpu::with_program_start(program_start))
    }

    /// Will create a board around an already configured cpu.
    pub fn with_cpu(screen: S, tone: T, cpu: Cpu) -> Self {
        let mut board = Self {
            cpu,
            bus: Peripherals::new(screen, tone),
            break_flag: false,
            shutdown: false,
        };
        board.reset();
        board
    }

    /// Will restore the power on state, the loaded program is gone afterwards.
    pub fn reset(&mut self) {
        log::debug!("reset");
        self.bus.reset();
        self.cpu.reset();
        self.break_flag = false;
        self.shutdown = false;
    }

    /// Will write the binary into memory starting at `origin`, the program
    /// counter is not touched.
    pub fn load_binary(&mut self, data: &[u8], origin: u16) -> Result<usize, ProcessError> {
        let written = self.bus.memory.write_bulk(origin as usize, data)?;
        log::debug!("loaded {} bytes at {:#05X}", written, origin);
        Ok(written)
    }

    /// Will load the binary to the default program location.
    pub fn load_program(&mut self, data: &[u8]) -> Result<usize, ProcessError> {
        self.load_binary(data, cpu::PROGRAM_COUNTER)
    }

    /// Will load the rom to where the program counter starts.
    pub fn load_rom(&mut self, rom: &Rom) -> Result<usize, ProcessError> {
        log::debug!("loading rom '{}'", rom.get_name());
        self.load_binary(rom.get_data(), self.cpu.program_start())
    }

    /// Will execute a single instruction, an invalid opcode sets the break flag.
    pub fn step(&mut self) -> Result<Operation, ProcessError> {
        let res = self.cpu.step(&mut self.bus);
        if let Err(err) = &res {
            if err.kind() == ErrorKind::InvalidOpcode {
                self.break_flag = true;
            }
        }
        res
    }

    /// Will count the timers down, has to be called at 60 hertz.
    pub fn timer_step(&mut self) {
        self.cpu.timer_step(&mut self.bus.tone);
    }

    /// Will update the keypad, a key press also resolves a pending key wait.
    pub fn handle_key(&mut self, key: usize, down: bool) -> Result<(), ProcessError> {
        self.bus.keypad.set_key(key, down)?;
        log::debug!("key {:X} {}", key, if down { "pressed" } else { "released" });
        if down {
            self.cpu.key_event(key)?;
        }
        Ok(())
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn memory(&self) -> &Memory {
        &self.bus.memory
    }

    pub fn screen(&self) -> &S {
        &self.bus.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.bus.screen
    }

    pub fn tone(&self) -> &T {
        &self.bus.tone
    }

    pub fn keypad(&self) -> &Keypad {
        &self.bus.keypad
    }

    pub fn set_break(&mut self, value: bool) {
        self.break_flag = value;
    }

    pub fn is_break(&self) -> bool {
        self.break_flag
    }

    pub fn set_shutdown(&mut self, value: bool) {
        self.shutdown = value;
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Will render `len` bytes starting at `offset`, sixteen per line.
    /// The dump ends with the memory.
    pub fn dump_memory(&self, offset: u16, len: usize) -> String {
        let mut res = String::new();
        let start = offset as usize;
        let stop = start.saturating_add(len).min(self.bus.memory.capacity());
        for line in (start..stop).step_by(DUMP_LINE) {
            let end = (line + DUMP_LINE).min(stop);
            // writing into a string can not fail
            let _ = write!(res, "{:#05x}\t", line);
            for (column, address) in (line..end).enumerate() {
                if let Ok(byte) = self.bus.memory.read(address) {
                    if column > 0 && column % 4 == 0 {
                        res.push(' ');
                    }
                    let _ = write!(res, "{:02x} ", byte);
                }
            }
            res.truncate(res.trim_end().len());
            res.push('\n');
        }
        res
    }

    /// Will disassemble `count` instructions starting at `offset`.
    /// Stops at the first instruction that does not fit into memory.
    pub fn disassemble(&self, offset: u16, count: usize) -> String {
        let mut res = String::new();
        let addresses = (offset as usize..self.bus.memory.capacity())
            .step_by(memory::opcodes::SIZE as usize)
            .take(count);
        for address in addresses {
            let opcode = match self.bus.memory.read_opcode(address) {
                Ok(opcode) => opcode,
                Err(_) => break,
            };
            let _ = writeln!(
                res,
                "{:#05X}\t{:04X}\t{}",
                address,
                opcode,
                opcode::disassemble(opcode)
            );
        }
        res
    }

    /// Will render the byte at `offset` as a single sprite row.
    pub fn sprite_line(&self, offset: u16) -> Result<String, ProcessError> {
        let sprite = self.bus.memory.read(offset as usize)?;
        let line: String = (0..8)
            .map(|bit| {
                if sprite & (0x80 >> bit) != 0 {
                    PIXEL_ON
                } else {
                    PIXEL_OFF
                }
            })
            .collect();
        Ok(format!("{:#05X}\t{:02X}\t[{}]", offset, sprite, line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{MockScreen, MockTone};

    #[test]
    fn test_reset_resets_devices() {
        let mut screen = MockScreen::new();
        screen.expect_reset().times(2).return_const(());
        let mut tone = MockTone::new();
        tone.expect_reset().times(2).return_const(());

        let mut board = Board::new(screen, tone);
        board.load_program(&[0x12, 0x00]).unwrap();
        board.set_break(true);
        board.set_shutdown(true);

        board.reset();

        assert!(!board.is_break());
        assert!(!board.is_shutdown());
        assert_eq!(board.memory().read(0x200), Ok(0));
        assert_eq!(board.cpu().program_counter(), cpu::PROGRAM_COUNTER);
    }

    #[test]
    fn test_load_binary_keeps_pc() {
        let mut board = Board::headless();

        assert_eq!(board.load_binary(&[0xAB, 0xCD], 0x300), Ok(2));
        assert_eq!(board.memory().range(0x300, 2), Ok(&[0xAB, 0xCD][..]));
        assert_eq!(board.cpu().program_counter(), cpu::PROGRAM_COUNTER);

        let err = board.load_binary(&[1, 2, 3], 0xFFE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_dump_memory() {
        let mut board = Board::headless();
        board
            .load_program(&(0..20).collect::<Vec<u8>>())
            .unwrap();

        let dump = board.dump_memory(0x200, 20);
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(
            lines,
            [
                "0x200\t00 01 02 03  04 05 06 07  08 09 0a 0b  0c 0d 0e 0f",
                "0x210\t10 11 12 13",
            ]
        );

        // only the bytes inside of the memory are written
        assert_eq!(board.dump_memory(0xFFE, 4), "0xffe\t00 00\n");
        assert_eq!(board.dump_memory(0xFFE, usize::MAX), "0xffe\t00 00\n");
        assert_eq!(board.dump_memory(0xFFFF, usize::MAX), "");
    }

    #[test]
    fn test_disassemble() {
        let mut board = Board::headless();
        board.load_program(&[0x00, 0xE0, 0xA2, 0x2A, 0x51, 0x21]).unwrap();

        assert_eq!(
            board.disassemble(0x200, 3),
            "0x200\t00E0\tCLS\n0x202\tA22A\tLD I, 0x22A\n0x204\t5121\t[UNKNOWN]\n"
        );
        assert_eq!(board.disassemble(0xFFF, 1), "");
        assert_eq!(
            board.disassemble(0xFFC, usize::MAX),
            "0xFFC\t0000\t[UNKNOWN]\n0xFFE\t0000\t[UNKNOWN]\n"
        );
        assert_eq!(board.disassemble(0xFFFF, usize::MAX), "");
    }

    #[test]
    fn test_sprite_line() {
        let board = Board::headless();

        // the glyph for zero starts with 0xF0
        assert_eq!(board.sprite_line(0x50), Ok("0x050\tF0\t[****____]".to_string()));
        assert_eq!(board.sprite_line(0x51), Ok("0x051\t90\t[*__*____]".to_string()));
        assert!(board.sprite_line(0x1000).is_err());
    }
}
