//! The bytecode interpreter: a stack machine over a read-only instruction
//! buffer.
//!
//! # Frame convention
//!
//! `bp` points one slot past the saved-pc slot of the current frame, so
//! `stack[bp-1]` is the saved pc and `stack[bp-2]` is the saved bp; locals
//! sit at `stack[bp+k]`. `CALL` pushes `(saved_bp, saved_pc)` and sets
//! `bp = stack.len()` (i.e. one past what it just pushed); `RETURN` reads
//! them back out of `stack[bp-2..bp]`. See `codegen.rs` for the matching
//! parameter/return-slot offset derivation.
//!
//! # Jump convention
//!
//! Every `JUMP_BY`/`JUMP_BY_IF_ZERO`/`CALL` sets `pc` directly to
//! `pc + p2` (no implicit `+1` on top); every other opcode falls through to
//! `pc += 1` after executing. `codegen.rs` computes every `p2` as
//! `target - index_of_the_jump_instruction_itself` to match.

use std::fmt;

use super::instr::{Instruction, Opcode};

/// Sentinel saved pc that marks "no caller, halt" — real program counters
/// are always non-negative.
const HALT: i16 = -1;

#[derive(Debug)]
pub enum RuntimeError {
    StackUnderflow,
    StackOutOfBounds { bp: i64, offset: i16 },
    ProgramCounterOutOfBounds(usize),
    JumpOutOfBounds { from: usize, offset: i16 },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackUnderflow => write!(f, "operand stack underflow"),
            RuntimeError::StackOutOfBounds { bp, offset } => {
                write!(f, "frame-relative access out of bounds (bp={bp}, offset={offset})")
            }
            RuntimeError::ProgramCounterOutOfBounds(pc) => write!(f, "program counter {pc} out of bounds"),
            RuntimeError::JumpOutOfBounds { from, offset } => {
                write!(f, "jump from {from} by {offset} lands outside the instruction buffer")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Run `code` starting at `entry` with the given arguments, and return the
/// 16-bit value left in the caller-reserved return slot.
///
/// A return slot is always pushed (whether or not the entry function
/// actually returns something), so the result is always well-defined; a
/// function with no return statement simply leaves it at 0.
pub fn run(code: &[Instruction], entry: usize, args: &[i16]) -> Result<i16, RuntimeError> {
    let mut stack: Vec<i16> = Vec::with_capacity(args.len() + 8);
    stack.push(0); // caller-reserved return slot
    stack.extend_from_slice(args);
    stack.push(0); // sentinel saved bp
    stack.push(HALT); // sentinel saved pc: halts execution on return
    let mut bp = stack.len();
    let mut pc = entry;

    loop {
        let Instruction { opcode, p2, .. } =
            *code.get(pc).ok_or(RuntimeError::ProgramCounterOutOfBounds(pc))?;

        match opcode {
            Opcode::PushInt => {
                stack.push(p2);
                pc += 1;
            }
            Opcode::PopInt => {
                stack.pop().ok_or(RuntimeError::StackUnderflow)?;
                pc += 1;
            }
            Opcode::AddInt => {
                let b = pop(&mut stack)?;
                let a = pop(&mut stack)?;
                stack.push(a.wrapping_add(b));
                pc += 1;
            }
            Opcode::CompIntLt => {
                let b = pop(&mut stack)?;
                let a = pop(&mut stack)?;
                stack.push(if a < b { 1 } else { 0 });
                pc += 1;
            }
            Opcode::PrintInt => {
                let a = pop(&mut stack)?;
                println!("{a}");
                pc += 1;
            }
            Opcode::LoadIntBasepointerRelative => {
                let idx = frame_index(bp, p2)?;
                let value = *stack.get(idx).ok_or(RuntimeError::StackOutOfBounds { bp: bp as i64, offset: p2 })?;
                stack.push(value);
                pc += 1;
            }
            Opcode::StoreIntBasepointerRelative => {
                let value = pop(&mut stack)?;
                let idx = frame_index(bp, p2)?;
                let slot = stack.get_mut(idx).ok_or(RuntimeError::StackOutOfBounds { bp: bp as i64, offset: p2 })?;
                *slot = value;
                pc += 1;
            }
            Opcode::JumpBy => {
                pc = jump_target(code, pc, p2)?;
            }
            Opcode::JumpByIfZero => {
                let a = pop(&mut stack)?;
                if a == 0 {
                    pc = jump_target(code, pc, p2)?;
                } else {
                    pc += 1;
                }
            }
            Opcode::Call => {
                let target = jump_target(code, pc, p2)?;
                stack.push(bp as i16);
                stack.push((pc as i64 + 1) as i16);
                bp = stack.len();
                pc = target;
            }
            Opcode::Return => {
                if bp < 2 {
                    return Err(RuntimeError::StackUnderflow);
                }
                let saved_pc = stack[bp - 1];
                let saved_bp = stack[bp - 2];
                stack.truncate(bp - 2);
                if saved_pc == HALT {
                    break;
                }
                pc = saved_pc as usize;
                bp = saved_bp as usize;
            }
        }
    }

    Ok(stack[0])
}

fn pop(stack: &mut Vec<i16>) -> Result<i16, RuntimeError> {
    stack.pop().ok_or(RuntimeError::StackUnderflow)
}

fn frame_index(bp: usize, offset: i16) -> Result<usize, RuntimeError> {
    let idx = bp as i64 + offset as i64;
    if idx < 0 {
        return Err(RuntimeError::StackOutOfBounds { bp: bp as i64, offset });
    }
    Ok(idx as usize)
}

fn jump_target(code: &[Instruction], from: usize, offset: i16) -> Result<usize, RuntimeError> {
    let target = from as i64 + offset as i64;
    if target < 0 || target as usize >= code.len() {
        return Err(RuntimeError::JumpOutOfBounds { from, offset });
    }
    Ok(target as usize)
}
