use rand::RngCore;

use super::{Cpu, CpuState, Peripherals};
use crate::{
    definitions::cpu,
    devices::{Screen, Tone},
    memory::font_glyph_pointer,
    opcode::{
        Arithmetic, ChipOpcodes, Misc, Operation, ProgramCounter, ProgramCounterStep,
        SkipCondition,
    },
    ProcessError, StackError,
};

/// The cpu bound to the peripherals for the duration of a single instruction.
pub(super) struct Execution<'a, S, T> {
    pub(super) cpu: &'a mut Cpu,
    pub(super) bus: &'a mut Peripherals<S, T>,
}

impl<S, T> Execution<'_, S, T> {
    #[inline]
    fn set_flag(&mut self, flag: bool) {
        self.cpu.registers[cpu::register::LAST] = flag as u8;
    }
}

impl<S, T> ProgramCounter for Execution<'_, S, T> {
    fn step(&mut self, step: ProgramCounterStep) {
        self.cpu.program_counter = step.apply(self.cpu.program_counter);
    }
}

impl<S, T> ChipOpcodes for Execution<'_, S, T>
where
    S: Screen,
    T: Tone,
{
    fn clear(&mut self) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        self.bus.screen.clear();
        Ok((ProgramCounterStep::Next, Operation::Draw))
    }

    fn ret(&mut self) -> Result<ProgramCounterStep, ProcessError> {
        let pc = self.cpu.stack.pop().ok_or(StackError::Empty)?;
        log::debug!("return to {:#05X}", pc);
        Ok(ProgramCounterStep::Jump(pc))
    }

    fn call(&mut self, nnn: u16) -> Result<ProgramCounterStep, ProcessError> {
        let next = ProgramCounterStep::Next.apply(self.cpu.program_counter);
        if self.cpu.stack.try_push(next).is_some() {
            return Err(StackError::Full.into());
        }
        Ok(ProgramCounterStep::Jump(nnn))
    }

    fn skip(&self, cond: SkipCondition) -> Result<ProgramCounterStep, ProcessError> {
        let reg = &self.cpu.registers;
        let holds = match cond {
            SkipCondition::Equal { x, nn } => reg[x] == nn,
            SkipCondition::NotEqual { x, nn } => reg[x] != nn,
            SkipCondition::RegisterEqual { x, y } => reg[x] == reg[y],
            SkipCondition::RegisterNotEqual { x, y } => reg[x] != reg[y],
            SkipCondition::KeyDown { x } => self.bus.keypad.is_down(reg[x] as usize)?,
            SkipCondition::KeyUp { x } => !self.bus.keypad.is_down(reg[x] as usize)?,
        };
        Ok(ProgramCounterStep::cond(holds))
    }

    fn load(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        self.cpu.registers[x] = nn;
        Ok(ProgramCounterStep::Next)
    }

    fn add(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        // let VX overflow, but ignore carry
        self.cpu.registers[x] = self.cpu.registers[x].wrapping_add(nn);
        Ok(ProgramCounterStep::Next)
    }

    fn arithmetic(
        &mut self,
        op: Arithmetic,
        x: usize,
        y: usize,
    ) -> Result<ProgramCounterStep, ProcessError> {
        let (vx, vy) = (self.cpu.registers[x], self.cpu.registers[y]);

        // the flag is calculated from the values before the write, VF may be X or Y
        let (res, flag) = match op {
            Arithmetic::Assign => (vy, None),
            Arithmetic::Or => (vx | vy, None),
            Arithmetic::And => (vx & vy, None),
            Arithmetic::Xor => (vx ^ vy, None),
            Arithmetic::Add => {
                let (res, carry) = vx.overflowing_add(vy);
                (res, Some(carry))
            }
            Arithmetic::Sub => (vx.wrapping_sub(vy), Some(vx > vy)),
            Arithmetic::ShiftRight => (vx >> 1, Some(vx & 0x01 == 0x01)),
            Arithmetic::SubReverse => (vy.wrapping_sub(vx), Some(vy > vx)),
            Arithmetic::ShiftLeft => (vx << 1, Some(vx & 0x80 == 0x80)),
        };

        self.cpu.registers[x] = res;
        if let Some(flag) = flag {
            self.set_flag(flag);
        }
        Ok(ProgramCounterStep::Next)
    }

    fn load_index(&mut self, nnn: u16) -> Result<ProgramCounterStep, ProcessError> {
        self.cpu.index_register = nnn;
        Ok(ProgramCounterStep::Next)
    }

    fn jump_offset(&self, nnn: u16) -> Result<ProgramCounterStep, ProcessError> {
        Ok(ProgramCounterStep::Jump(self.cpu.registers[0] as u16 + nnn))
    }

    fn random(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        let byte = self.cpu.rng.next_u32() as u8;
        self.cpu.registers[x] = byte & nn;
        Ok(ProgramCounterStep::Next)
    }

    fn draw(
        &mut self,
        x: usize,
        y: usize,
        n: u8,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        let (vx, vy) = (
            self.cpu.registers[x] as usize,
            self.cpu.registers[y] as usize,
        );
        let index = self.cpu.index_register as usize;

        let mut collision = false;
        for row in 0..n as usize {
            let sprite = self.bus.memory.read(index + row)?;
            collision |= self.bus.screen.flip_sprite(vx, vy + row, sprite);
        }
        self.set_flag(collision);

        Ok((ProgramCounterStep::Next, Operation::Draw))
    }

    fn misc(
        &mut self,
        op: Misc,
        x: usize,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        let vx = self.cpu.registers[x];
        match op {
            Misc::GetDelayTimer => self.cpu.registers[x] = self.cpu.delay_timer,
            Misc::AwaitKeyPress => {
                log::debug!("awaiting key press for V{:X}", x);
                self.cpu.state = CpuState::AwaitingKey(x);
                return Ok((ProgramCounterStep::Next, Operation::Wait));
            }
            Misc::SetDelayTimer => self.cpu.delay_timer = vx,
            Misc::SetSoundTimer => self.cpu.sound_timer = vx,
            Misc::AddVxToI => {
                self.cpu.index_register = self.cpu.index_register.wrapping_add(vx as u16)
            }
            Misc::SetIToSprite => self.cpu.index_register = font_glyph_pointer(vx)?,
            Misc::StoreBCD => {
                let index = self.cpu.index_register as usize;
                let digits = [vx / 100, (vx / 10) % 10, vx % 10];
                for (offset, digit) in digits.into_iter().enumerate() {
                    self.bus.memory.write(index + offset, digit)?;
                }
            }
            Misc::StoreV0ToVx => {
                for register in 0..=x {
                    let index = self.cpu.index_register as usize;
                    self.bus.memory.write(index, self.cpu.registers[register])?;
                    self.cpu.index_register = self.cpu.index_register.wrapping_add(1);
                }
            }
            Misc::FillV0ToVx => {
                for register in 0..=x {
                    let index = self.cpu.index_register as usize;
                    self.cpu.registers[register] = self.bus.memory.read(index)?;
                    self.cpu.index_register = self.cpu.index_register.wrapping_add(1);
                }
            }
        }
        Ok((ProgramCounterStep::Next, Operation::None))
    }
}
