//! Opcode abstractions, decoding and the instruction dispatch table.
use std::fmt;

use crate::{definitions::memory, OpcodeError, ProcessError};

/// the base mask used for generating all the other sub masks
pub(crate) const OPCODE_MASK_FFFF: u16 = u16::MAX;

/// the mask for the upper twelve bits
pub(crate) const OPCODE_MASK_FFF0: u16 = OPCODE_MASK_FFFF << 4;

/// the mask for the upper eight bits
pub(crate) const OPCODE_MASK_FF00: u16 = OPCODE_MASK_FFFF << 8;

/// the mask for the upper four bits
pub(crate) const OPCODE_MASK_F000: u16 = OPCODE_MASK_FFFF << 12;

/// the mask for the lower four bits
pub(crate) const OPCODE_MASK_000F: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FFF0;

/// the mask for the lower eight bits
pub(crate) const OPCODE_MASK_00FF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FF00;

/// the mask for the lower twelve bits
pub(crate) const OPCODE_MASK_0FFF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_F000;

/// the size of a single nibble
const NIBBLE: u16 = 4;

/// a wrapper type for u16 to make it clear what is meant to be used
pub type Opcode = u16;

/// Bit field extractors for the opcode word. None of them can fail.
pub trait OpcodeTrait {
    /// The opcode class, bits `15..12`.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.class(), 0x1);
    /// ```
    fn class(&self) -> u8;

    /// The first register index `X`, bits `11..8`.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.x(), 0xE);
    /// ```
    fn x(&self) -> usize;

    /// The second register index `Y`, bits `7..4`.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.y(), 0xD);
    /// ```
    fn y(&self) -> usize;

    /// The 4 bit immediate `N`, bits `3..0`.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.n(), 0xA);
    /// ```
    fn n(&self) -> u8;

    /// The 8 bit immediate `NN`, bits `7..0`.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.nn(), 0xDA);
    /// ```
    fn nn(&self) -> u8;

    /// The 12 bit address `NNN`, bits `11..0`.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.nnn(), 0xEDA);
    /// ```
    fn nnn(&self) -> u16;
}

impl OpcodeTrait for Opcode {
    fn class(&self) -> u8 {
        ((self & OPCODE_MASK_F000) >> (3 * NIBBLE)) as u8
    }

    fn x(&self) -> usize {
        ((self & OPCODE_MASK_0FFF & OPCODE_MASK_FF00) >> (2 * NIBBLE)) as usize
    }

    fn y(&self) -> usize {
        const MASK: u16 = OPCODE_MASK_00FF ^ OPCODE_MASK_000F;
        ((self & MASK) >> NIBBLE) as usize
    }

    fn n(&self) -> u8 {
        (self & OPCODE_MASK_000F) as u8
    }

    fn nn(&self) -> u8 {
        (self & OPCODE_MASK_00FF) as u8
    }

    fn nnn(&self) -> u16 {
        self & OPCODE_MASK_0FFF
    }
}

/// The register to register operations of the `8XYT` class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    /// `8XY0` - `Vx = Vy`
    Assign,
    /// `8XY1` - `Vx |= Vy`
    Or,
    /// `8XY2` - `Vx &= Vy`
    And,
    /// `8XY3` - `Vx ^= Vy`
    Xor,
    /// `8XY4` - `Vx += Vy`, `VF` is the carry
    Add,
    /// `8XY5` - `Vx -= Vy`, `VF` is set when `Vx > Vy`
    Sub,
    /// `8XY6` - `Vx >>= 1`, `VF` is the shifted out bit
    ShiftRight,
    /// `8XY7` - `Vx = Vy - Vx`, `VF` is set when `Vy > Vx`
    SubReverse,
    /// `8XYE` - `Vx <<= 1`, `VF` is the shifted out bit
    ShiftLeft,
}

impl TryFrom<u8> for Arithmetic {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let op = match value {
            0x0 => Arithmetic::Assign,
            0x1 => Arithmetic::Or,
            0x2 => Arithmetic::And,
            0x3 => Arithmetic::Xor,
            0x4 => Arithmetic::Add,
            0x5 => Arithmetic::Sub,
            0x6 => Arithmetic::ShiftRight,
            0x7 => Arithmetic::SubReverse,
            0xE => Arithmetic::ShiftLeft,
            _ => return Err(()),
        };
        Ok(op)
    }
}

/// The conditions of all the skip instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCondition {
    /// `3XNN` - `Vx == NN`
    Equal { x: usize, nn: u8 },
    /// `4XNN` - `Vx != NN`
    NotEqual { x: usize, nn: u8 },
    /// `5XY0` - `Vx == Vy`
    RegisterEqual { x: usize, y: usize },
    /// `9XY0` - `Vx != Vy`
    RegisterNotEqual { x: usize, y: usize },
    /// `EX9E` - key `Vx` is down
    KeyDown { x: usize },
    /// `EXA1` - key `Vx` is up
    KeyUp { x: usize },
}

/// The operations of the `FXTT` class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misc {
    /// `FX07` - `Vx = delay_timer`
    GetDelayTimer,
    /// `FX0A` - `Vx = await_key()`
    AwaitKeyPress,
    /// `FX15` - `delay_timer = Vx`
    SetDelayTimer,
    /// `FX18` - `sound_timer = Vx`
    SetSoundTimer,
    /// `FX1E` - `I += Vx`
    AddVxToI,
    /// `FX29` - `I = glyph(Vx)`
    SetIToSprite,
    /// `FX33` - `memory[I..I+3] = bcd(Vx)`
    StoreBCD,
    /// `FX55` - `memory[I..] = V0..=Vx`
    StoreV0ToVx,
    /// `FX65` - `V0..=Vx = memory[I..]`
    FillV0ToVx,
}

impl TryFrom<u8> for Misc {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let op = match value {
            0x07 => Misc::GetDelayTimer,
            0x0A => Misc::AwaitKeyPress,
            0x15 => Misc::SetDelayTimer,
            0x18 => Misc::SetSoundTimer,
            0x1E => Misc::AddVxToI,
            0x29 => Misc::SetIToSprite,
            0x33 => Misc::StoreBCD,
            0x55 => Misc::StoreV0ToVx,
            0x65 => Misc::FillV0ToVx,
            _ => return Err(()),
        };
        Ok(op)
    }
}

/// A fully decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `00E0`
    Clear,
    /// `00EE`
    Return,
    /// `1NNN`
    Jump { nnn: u16 },
    /// `2NNN`
    Call { nnn: u16 },
    /// `3XNN`, `4XNN`, `5XY0`, `9XY0`, `EX9E`, `EXA1`
    Skip(SkipCondition),
    /// `6XNN`
    Load { x: usize, nn: u8 },
    /// `7XNN`
    Add { x: usize, nn: u8 },
    /// `8XYT`
    Arithmetic { op: Arithmetic, x: usize, y: usize },
    /// `ANNN`
    LoadIndex { nnn: u16 },
    /// `BNNN`
    JumpOffset { nnn: u16 },
    /// `CXNN`
    Random { x: usize, nn: u8 },
    /// `DXYN`
    Draw { x: usize, y: usize, n: u8 },
    /// `FXTT`
    Misc { op: Misc, x: usize },
}

impl TryFrom<Opcode> for Instruction {
    type Error = OpcodeError;

    fn try_from(value: Opcode) -> Result<Self, Self::Error> {
        let err = || OpcodeError::InvalidOpcode(value);
        let (x, y, n, nn, nnn) = (value.x(), value.y(), value.n(), value.nn(), value.nnn());

        let instruction = match value.class() {
            0x0 => match value {
                0x00E0 => Instruction::Clear,
                0x00EE => Instruction::Return,
                _ => return Err(err()),
            },
            0x1 => Instruction::Jump { nnn },
            0x2 => Instruction::Call { nnn },
            0x3 => Instruction::Skip(SkipCondition::Equal { x, nn }),
            0x4 => Instruction::Skip(SkipCondition::NotEqual { x, nn }),
            0x5 if n == 0 => Instruction::Skip(SkipCondition::RegisterEqual { x, y }),
            0x6 => Instruction::Load { x, nn },
            0x7 => Instruction::Add { x, nn },
            0x8 => {
                let op = Arithmetic::try_from(n).map_err(|_| err())?;
                Instruction::Arithmetic { op, x, y }
            }
            0x9 if n == 0 => Instruction::Skip(SkipCondition::RegisterNotEqual { x, y }),
            0xA => Instruction::LoadIndex { nnn },
            0xB => Instruction::JumpOffset { nnn },
            0xC => Instruction::Random { x, nn },
            0xD => Instruction::Draw { x, y, n },
            0xE => match nn {
                0x9E => Instruction::Skip(SkipCondition::KeyDown { x }),
                0xA1 => Instruction::Skip(SkipCondition::KeyUp { x }),
                _ => return Err(err()),
            },
            0xF => {
                let op = Misc::try_from(nn).map_err(|_| err())?;
                Instruction::Misc { op, x }
            }
            _ => return Err(err()),
        };
        Ok(instruction)
    }
}

/// Mnemonic rendering used by the disassembler.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Clear => write!(f, "CLS"),
            Instruction::Return => write!(f, "RET"),
            Instruction::Jump { nnn } => write!(f, "JP 0x{:X}", nnn),
            Instruction::Call { nnn } => write!(f, "CALL 0x{:X}", nnn),
            Instruction::Skip(cond) => match cond {
                SkipCondition::Equal { x, nn } => write!(f, "SE V{:X}, 0x{:X}", x, nn),
                SkipCondition::NotEqual { x, nn } => write!(f, "SNE V{:X}, 0x{:X}", x, nn),
                SkipCondition::RegisterEqual { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
                SkipCondition::RegisterNotEqual { x, y } => {
                    write!(f, "SNE V{:X}, V{:X}", x, y)
                }
                SkipCondition::KeyDown { x } => write!(f, "SKP V{:X}", x),
                SkipCondition::KeyUp { x } => write!(f, "SKNP V{:X}", x),
            },
            Instruction::Load { x, nn } => write!(f, "LD V{:X}, 0x{:X}", x, nn),
            Instruction::Add { x, nn } => write!(f, "ADD V{:X}, 0x{:X}", x, nn),
            Instruction::Arithmetic { op, x, y } => match op {
                Arithmetic::Assign => write!(f, "LD V{:X}, V{:X}", x, y),
                Arithmetic::Or => write!(f, "OR V{:X}, V{:X}", x, y),
                Arithmetic::And => write!(f, "AND V{:X}, V{:X}", x, y),
                Arithmetic::Xor => write!(f, "XOR V{:X}, V{:X}", x, y),
                Arithmetic::Add => write!(f, "ADD V{:X}, V{:X}", x, y),
                Arithmetic::Sub => write!(f, "SUB V{:X}, V{:X}", x, y),
                Arithmetic::ShiftRight => write!(f, "SHR V{:X} {{, V{:X}}}", x, y),
                Arithmetic::SubReverse => write!(f, "SUBN V{:X}, V{:X}", x, y),
                Arithmetic::ShiftLeft => write!(f, "SHL V{:X} {{, V{:X}}}", x, y),
            },
            Instruction::LoadIndex { nnn } => write!(f, "LD I, 0x{:X}", nnn),
            Instruction::JumpOffset { nnn } => write!(f, "JP V0, 0x{:X}", nnn),
            Instruction::Random { x, nn } => write!(f, "RND V{:X}, 0x{:X}", x, nn),
            Instruction::Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, 0x{:X}", x, y, n),
            Instruction::Misc { op, x } => match op {
                Misc::GetDelayTimer => write!(f, "LD V{:X}, DT", x),
                Misc::AwaitKeyPress => write!(f, "LD V{:X}, K", x),
                Misc::SetDelayTimer => write!(f, "LD DT, V{:X}", x),
                Misc::SetSoundTimer => write!(f, "LD ST, V{:X}", x),
                Misc::AddVxToI => write!(f, "ADD I, V{:X}", x),
                Misc::SetIToSprite => write!(f, "LD F, V{:X}", x),
                Misc::StoreBCD => write!(f, "LD B, V{:X}", x),
                Misc::StoreV0ToVx => write!(f, "LD [I], V{:X}", x),
                Misc::FillV0ToVx => write!(f, "LD V{:X}, [I]", x),
            },
        }
    }
}

/// The mnemonic written for opcodes without an instruction.
pub const UNKNOWN_MNEMONIC: &str = "[UNKNOWN]";

/// Will render the mnemonic of any opcode, invalid ones included.
///
/// # Example
/// ```rust
/// # use chip::opcode::disassemble;
/// assert_eq!(disassemble(0xD125), "DRW V1, V2, 0x5");
/// assert_eq!(disassemble(0x5121), "[UNKNOWN]");
/// ```
pub fn disassemble(opcode: Opcode) -> String {
    match Instruction::try_from(opcode) {
        Ok(instruction) => instruction.to_string(),
        Err(_) => UNKNOWN_MNEMONIC.to_string(),
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Represents the program steps that the cpu
/// can take.
pub enum ProgramCounterStep {
    /// Will move the program counter to the next instruction
    Next,
    /// Will move the program counter past the next instruction
    Skip,
    /// Will simply move the program counter to the given location.
    Jump(u16),
}

impl ProgramCounterStep {
    /// Will return a Skip if the condition is true.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next, ProgramCounterStep::cond(false));
    /// assert_eq!(ProgramCounterStep::Skip, ProgramCounterStep::cond(true));
    /// ```
    #[inline]
    pub fn cond(cond: bool) -> Self {
        if cond {
            ProgramCounterStep::Skip
        } else {
            ProgramCounterStep::Next
        }
    }

    /// Will apply the step to the given program counter.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next.apply(0x200), 0x202);
    /// assert_eq!(ProgramCounterStep::Skip.apply(0x200), 0x204);
    /// assert_eq!(ProgramCounterStep::Jump(0x300).apply(0x200), 0x300);
    /// ```
    #[inline]
    pub fn apply(&self, pc: u16) -> u16 {
        match *self {
            ProgramCounterStep::Next => pc.wrapping_add(memory::opcodes::SIZE),
            // a skip is the normal advance plus one more
            ProgramCounterStep::Skip => pc
                .wrapping_add(memory::opcodes::SIZE)
                .wrapping_add(memory::opcodes::SIZE),
            ProgramCounterStep::Jump(pointer) => pointer,
        }
    }
}

/// Represents a step of the program counter
/// this requires the enum ProgramCounterStep
/// to work.
pub trait ProgramCounter {
    /// will move the program counter forward by a step.
    fn step(&mut self, step: ProgramCounterStep);
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Represents a command from the interpreter up to the host.
pub enum Operation {
    /// If no action has to be taken.
    None,
    /// The cpu is parked until the next key press
    Wait,
    /// The screen changed and should be redrawn
    Draw,
}

/// These are the traits that have to be full filled for a working opcode
/// table.
///
/// This trait requires the implementation of the [`ProgramCounter`](ProgramCounter) trait, as
/// the program counter is only moved after the instruction itself ran without error.
pub trait ChipOpcodes: ProgramCounter {
    /// will execute the given instruction and move the program counter accordingly
    fn calc(&mut self, instruction: &Instruction) -> Result<Operation, ProcessError> {
        let mut operation = Operation::None;
        let mut step_op = |(step, op): (ProgramCounterStep, Operation)| {
            operation = op;
            step
        };

        let step = match *instruction {
            Instruction::Clear => self.clear().map(&mut step_op),
            Instruction::Return => self.ret(),
            Instruction::Jump { nnn } => Ok(ProgramCounterStep::Jump(nnn)),
            Instruction::Call { nnn } => self.call(nnn),
            Instruction::Skip(cond) => self.skip(cond),
            Instruction::Load { x, nn } => self.load(x, nn),
            Instruction::Add { x, nn } => self.add(x, nn),
            Instruction::Arithmetic { op, x, y } => self.arithmetic(op, x, y),
            Instruction::LoadIndex { nnn } => self.load_index(nnn),
            Instruction::JumpOffset { nnn } => self.jump_offset(nnn),
            Instruction::Random { x, nn } => self.random(x, nn),
            Instruction::Draw { x, y, n } => self.draw(x, y, n).map(&mut step_op),
            Instruction::Misc { op, x } => self.misc(op, x).map(&mut step_op),
        }?;

        self.step(step);
        Ok(operation)
    }

    /// - `00E0` - Display  - `disp_clear()`        - Clears the screen.
    fn clear(&mut self) -> Result<(ProgramCounterStep, Operation), ProcessError>;

    /// - `00EE` - Flow     - `return;`             - Returns from a subroutine.
    fn ret(&mut self) -> Result<ProgramCounterStep, ProcessError>;

    /// - `2NNN` - Flow     - `*(0xNNN)()`          - Calls subroutine at `NNN`.
    fn call(&mut self, nnn: u16) -> Result<ProgramCounterStep, ProcessError>;

    /// - `3XNN`, `4XNN`, `5XY0`, `9XY0`, `EX9E`, `EXA1` - Cond - Skips the next instruction
    ///   if the condition holds.
    fn skip(&self, cond: SkipCondition) -> Result<ProgramCounterStep, ProcessError>;

    /// - `6XNN` - Const    - `Vx = NN`             - Sets `VX` to `NN`.
    fn load(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `7XNN` - Const    - `Vx += NN`            - Adds `NN` to `VX`. (Carry flag is not changed)
    fn add(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `8XYT` - Math and BitOp on `VX` and `VY`, see [`Arithmetic`](Arithmetic).
    fn arithmetic(
        &mut self,
        op: Arithmetic,
        x: usize,
        y: usize,
    ) -> Result<ProgramCounterStep, ProcessError>;

    /// - `ANNN` - MEM      - `I = NNN`             - Sets `I` to the address `NNN`.
    fn load_index(&mut self, nnn: u16) -> Result<ProgramCounterStep, ProcessError>;

    /// - `BNNN` - Flow     - `PC=V0+NNN`           - Jumps to the address `NNN` plus `V0`.
    fn jump_offset(&self, nnn: u16) -> Result<ProgramCounterStep, ProcessError>;

    /// - `CXNN` - Rand     - `Vx=rand()&NN`        - Sets `VX` to a random byte masked by `NN`.
    fn random(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `DXYN` - Disp     - `draw(Vx,Vy,N)`       - Draws the `N` byte sprite at `I` to
    ///   `(VX, VY)`, `VF` is set to `1` if any pixel was switched off.
    fn draw(
        &mut self,
        x: usize,
        y: usize,
        n: u8,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError>;

    /// - `FXTT` - Timers, key wait and memory transfers, see [`Misc`](Misc).
    fn misc(&mut self, op: Misc, x: usize)
        -> Result<(ProgramCounterStep, Operation), ProcessError>;
}
