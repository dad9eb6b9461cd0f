use rand::RngCore;
use tinyvec::ArrayVec;

use super::{opcodes::Execution, Peripherals};
use crate::{
    definitions::{cpu, keyboard},
    devices::{Screen, Tone},
    opcode::{ChipOpcodes, Instruction, Operation},
    KeyError, ProcessError, RegisterError, StackError,
};

/// The execution state of the cpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    /// Instructions are fetched and executed.
    Running,
    /// The cpu is parked until the next key press, which will be written to the given register.
    AwaitingKey(usize),
}

/// The Cpu struct represents the processor state of the board, everything
/// else it works on is borrowed from the [`Peripherals`](super::Peripherals)
/// for the duration of a single step.
pub struct Cpu {
    /// `8-bit` data registers named `V0` to `VF`. The `VF` register doubles as a flag for some
    /// instructions. In an addition operation, `VF` is the carry flag, while in subtraction, it
    /// is the "no borrow" flag. In the draw instruction `VF` is set upon pixel collision.
    pub(super) registers: [u8; cpu::register::SIZE],
    /// The index register `I`
    pub(super) index_register: u16,
    /// The address of the next instruction to be executed from memory.
    pub(super) program_counter: u16,
    /// The stack is only used to store return addresses when subroutines are called.
    /// The stack pointer is the length of the stack.
    pub(super) stack: ArrayVec<[u16; cpu::stack::SIZE]>,
    /// Counts down at 60 hertz, until it reaches 0.
    pub(super) delay_timer: u8,
    /// Counts down at 60 hertz, until it reaches 0. While nonzero the tone is on.
    pub(super) sound_timer: u8,
    pub(super) state: CpuState,
    /// Where the program counter is set to on reset.
    pub(super) program_start: u16,
    /// This stores the random number generator, it is stored into the cpu
    /// so as to enable simple mocking of the given type.
    pub(super) rng: Box<dyn RngCore + Send>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self::with_program_start(cpu::PROGRAM_COUNTER)
    }

    /// Will create a cpu which starts executing at the given address.
    pub fn with_program_start(program_start: u16) -> Self {
        Self {
            registers: [0; cpu::register::SIZE],
            index_register: 0,
            program_counter: program_start,
            stack: ArrayVec::new(),
            delay_timer: 0,
            sound_timer: 0,
            state: CpuState::Running,
            program_start,
            rng: Box::new(rand::rngs::OsRng),
        }
    }

    /// Will replace the random number generator used by `CXNN`.
    pub fn with_rng<R>(mut self, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        self.rng = Box::new(rng);
        self
    }

    /// Will restore the power on state, the random number generator is kept.
    pub fn reset(&mut self) {
        self.registers = [0; cpu::register::SIZE];
        self.index_register = 0;
        self.program_counter = self.program_start;
        self.stack.clear();
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.state = CpuState::Running;
    }

    /// Will execute a single instruction.
    ///
    /// While the cpu is awaiting a key press nothing is executed and
    /// [`Operation::Wait`](Operation::Wait) is returned. An instruction that fails leaves the
    /// program counter where it was.
    pub fn step<S, T>(&mut self, bus: &mut Peripherals<S, T>) -> Result<Operation, ProcessError>
    where
        S: Screen,
        T: Tone,
    {
        if self.is_awaiting_key() {
            return Ok(Operation::Wait);
        }

        let pc = self.program_counter;
        let opcode = bus.memory.read_opcode(pc as usize)?;
        let instruction = Instruction::try_from(opcode).map_err(|err| {
            log::error!("fault at {:#05X}: {}", pc, err);
            err
        })?;
        log::trace!("{:#05X}\t{:04X}\t{}", pc, opcode, instruction);

        Execution { cpu: self, bus }.calc(&instruction)
    }

    /// Will count both timers down by one and switch the tone accordingly.
    pub fn timer_step<T: Tone>(&mut self, tone: &mut T) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);

        if self.sound_timer > 0 {
            tone.start();
        } else {
            tone.stop();
        }
    }

    /// Will resolve a pending key wait, does nothing otherwise.
    pub fn key_event(&mut self, key: usize) -> Result<(), KeyError> {
        if key >= keyboard::SIZE {
            return Err(KeyError(key));
        }
        if let CpuState::AwaitingKey(x) = self.state {
            log::debug!("key {:X} resolved the wait on V{:X}", key, x);
            self.registers[x] = key as u8;
            self.state = CpuState::Running;
        }
        Ok(())
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn is_awaiting_key(&self) -> bool {
        matches!(self.state, CpuState::AwaitingKey(_))
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn set_program_counter(&mut self, pc: u16) {
        self.program_counter = pc;
    }

    pub fn program_start(&self) -> u16 {
        self.program_start
    }

    pub fn index_register(&self) -> u16 {
        self.index_register
    }

    pub fn set_index_register(&mut self, value: u16) {
        self.index_register = value;
    }

    /// The amount of return addresses on the stack.
    pub fn stack_pointer(&self) -> u8 {
        self.stack.len() as u8
    }

    /// Will read the given stack slot, slots above the stack pointer read as `0`.
    pub fn stack_value(&self, slot: usize) -> Result<u16, StackError> {
        if slot >= cpu::stack::SIZE {
            return Err(StackError::Slot(slot));
        }
        Ok(self.stack.get(slot).copied().unwrap_or_default())
    }

    /// The live part of the stack.
    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn register(&self, x: usize) -> Result<u8, RegisterError> {
        self.registers.get(x).copied().ok_or(RegisterError(x))
    }

    pub fn set_register(&mut self, x: usize, value: u8) -> Result<(), RegisterError> {
        let register = self.registers.get_mut(x).ok_or(RegisterError(x))?;
        *register = value;
        Ok(())
    }

    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }
}
