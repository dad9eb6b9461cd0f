//! The pretty print implementation written for both the [`Board`](super::Board) and the
//! [`Cpu`](super::Cpu). This was split up into this file for smaller file sizes and higher
//! cohesion.
use std::fmt;

use num_traits::Unsigned;
use once_cell::sync::Lazy;

use super::{Board, Cpu};
use crate::{
    definitions::{cpu, memory},
    opcode::Opcode,
};

/// The amount of values printed per row
const ROW_SIZE: usize = 8;
/// The amount of registers per line in the cpu dump
const CPU_ROW_SIZE: usize = 4;

const END_OF_LINE: char = '\n';
const INDENT: &str = "\t\t";
/// The values that are used when there are at least two rows of zeros.
const FILLER_BASE: &str = "...";

/// will format all integer types, the prefix included six symbols long
fn hex<T>(value: T) -> String
where
    T: fmt::UpperHex + Unsigned + Copy,
{
    format!("{:#06X}", value)
}

/// the range label in front of every row
fn label(from: usize, to: usize) -> String {
    format!("{:#06X} - {:#06X} :", from, to)
}

static HEX_LEN: Lazy<usize> = Lazy::new(|| hex(0u8).len());

/// Prepares the line that will be used for a run of rows with only zeros.
static ZERO_FILLER: Lazy<String> = Lazy::new(|| {
    let zero = hex(0u16);
    let width = *HEX_LEN * (ROW_SIZE - 2) + (ROW_SIZE - 1) - FILLER_BASE.len();
    let filler = " ".repeat(width / 2);
    format!("{}{}{}{}{}", zero, filler, FILLER_BASE, filler, zero)
});

/// the boolean cells are padded to the width of the integer cells
static TRUE: Lazy<String> = Lazy::new(|| format!("{:<1$}", "true", *HEX_LEN));
static FALSE: Lazy<String> = Lazy::new(|| format!("{:<1$}", "false", *HEX_LEN));

fn flag(value: bool) -> &'static str {
    if value {
        TRUE.as_str()
    } else {
        FALSE.as_str()
    }
}

/// will pretty print all the integer data given, the offset is
/// calculated from the beginning of the data block
fn value_rows<T>(data: &[T]) -> Vec<String>
where
    T: fmt::UpperHex + Unsigned + Copy,
{
    data.chunks(ROW_SIZE)
        .enumerate()
        .map(|(index, chunk)| {
            let from = index * ROW_SIZE;
            let cells: Vec<_> = chunk.iter().map(|value| hex(*value)).collect();
            format!("{} {}", label(from, from + chunk.len() - 1), cells.join(" "))
        })
        .collect()
}

/// will pretty print all the boolean data given
fn flag_rows(data: &[bool]) -> Vec<String> {
    data.chunks(ROW_SIZE)
        .enumerate()
        .map(|(index, chunk)| {
            let from = index * ROW_SIZE;
            let cells: Vec<_> = chunk.iter().map(|value| flag(*value)).collect();
            let row = format!("{} {}", label(from, from + chunk.len() - 1), cells.join(" "));
            row.trim_end().to_string()
        })
        .collect()
}

/// a single row of opcodes, possibly standing in for a run of empty rows
struct MemoryRow {
    from: usize,
    to: usize,
    opcodes: Vec<Opcode>,
    only_null: bool,
}

impl fmt::Display for MemoryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", label(self.from, self.to))?;
        if self.only_null {
            return write!(f, "{}", *ZERO_FILLER);
        }
        let cells: Vec<_> = self.opcodes.iter().map(|opcode| hex(*opcode)).collect();
        write!(f, "{}", cells.join(" "))
    }
}

/// will pretty print the content of the raw memory as opcodes, runs of
/// empty rows are collapsed into one
fn memory_rows(data: &[u8]) -> Vec<String> {
    let step = ROW_SIZE * memory::opcodes::SIZE as usize;
    let mut rows: Vec<MemoryRow> = Vec::with_capacity(data.len() / step);

    for (index, chunk) in data.chunks(step).enumerate() {
        let from = index * step;
        let to = from + chunk.len() - 1;
        let opcodes: Vec<Opcode> = chunk
            .chunks(memory::opcodes::SIZE as usize)
            .map(|pair| Opcode::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
            .collect();
        let only_null = opcodes.iter().all(|opcode| *opcode == 0);

        if only_null {
            if let Some(last) = rows.last_mut().filter(|last| last.only_null) {
                last.to = to;
                continue;
            }
        }
        rows.push(MemoryRow {
            from,
            to,
            opcodes,
            only_null,
        });
    }

    rows.iter().map(ToString::to_string).collect()
}

fn section(f: &mut fmt::Formatter<'_>, title: &str, lines: &[String]) -> fmt::Result {
    write!(f, "\t{} :{}", title, END_OF_LINE)?;
    for line in lines {
        write!(f, "{}{}{}", INDENT, line, END_OF_LINE)?;
    }
    Ok(())
}

impl<S, T> fmt::Display for Board<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chip = &self.cpu;

        // the stack is filled up with zeros so that all the slots show
        let mut stack = [0; cpu::stack::SIZE];
        stack[..chip.stack.len()].copy_from_slice(&chip.stack);

        write!(f, "Board {{{}", END_OF_LINE)?;
        section(f, "Break", &[flag(self.break_flag).trim_end().to_string()])?;
        section(f, "Program Counter", &[hex(chip.program_counter)])?;
        section(f, "Index Register", &[hex(chip.index_register)])?;
        section(f, "Stack Pointer", &[hex(chip.stack.len())])?;
        section(f, "Delay Timer", &[hex(chip.delay_timer)])?;
        section(f, "Sound Timer", &[hex(chip.sound_timer)])?;
        section(f, "Memory", &memory_rows(self.bus.memory.as_slice()))?;
        section(f, "Keypad", &flag_rows(self.bus.keypad.get_keys()))?;
        section(f, "Stack", &value_rows(&stack))?;
        section(f, "Register", &value_rows(&chip.registers))?;
        write!(f, "}}")
    }
}

/// The compact dump used by the host after a halt.
impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = vec![
            format!("PC: {:04x}", self.program_counter),
            format!("SP: {:04x}", self.stack.len()),
            format!("I: {:04x}", self.index_register),
        ];

        for (row, chunk) in self.registers.chunks(CPU_ROW_SIZE).enumerate() {
            let cells: Vec<_> = chunk
                .iter()
                .enumerate()
                .map(|(column, value)| {
                    format!("V{:X}: {:02x} {:3}", row * CPU_ROW_SIZE + column, value, value)
                })
                .collect();
            lines.push(cells.join("  "));
        }

        lines.push(format!(
            "TIMERS: Dt: {:03x} {} St: {:03x} {}",
            self.delay_timer, self.delay_timer, self.sound_timer, self.sound_timer
        ));

        lines.push("Stack:".to_string());
        for chunk in (0..cpu::stack::SIZE).collect::<Vec<_>>().chunks(CPU_ROW_SIZE) {
            let cells: Vec<_> = chunk
                .iter()
                .map(|slot| format!("{:04x}", self.stack.get(*slot).copied().unwrap_or(0)))
                .collect();
            lines.push(format!("\t{}", cells.join("  ")));
        }

        write!(f, "{}", lines.join("\n"))
    }
}
