//! The instruction model: the closed opcode set and the instruction record.

use derive_more::Display;

/// The bytecode's closed opcode enumeration. Numeric codes are an
/// implementation detail with no ABI stability requirement (the bytecode is
/// never persisted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Opcode {
    #[display("push_int")]
    PushInt,
    #[display("pop_int")]
    PopInt,
    #[display("add_int")]
    AddInt,
    #[display("comp_int_lt")]
    CompIntLt,
    #[display("print_int")]
    PrintInt,
    #[display("load_int_bp_rel")]
    LoadIntBasepointerRelative,
    #[display("store_int_bp_rel")]
    StoreIntBasepointerRelative,
    #[display("jump_by")]
    JumpBy,
    #[display("jump_by_if_zero")]
    JumpByIfZero,
    #[display("call")]
    Call,
    #[display("return")]
    Return,
}

/// One instruction: an opcode, a reserved byte (always 0 in the core), and a
/// signed 16-bit immediate used as a literal, a frame offset, or a relative
/// jump distance depending on the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{opcode} {p1} {p2}")]
pub struct Instruction {
    pub opcode: Opcode,
    pub p1: u8,
    pub p2: i16,
}

impl Instruction {
    pub fn new(opcode: Opcode, p2: i16) -> Self {
        Instruction { opcode, p1: 0, p2 }
    }
}
