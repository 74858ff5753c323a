//! The back-end: the instruction model, the code generator, and the stack
//! machine that executes what the code generator produces.

pub mod codegen;
pub mod instr;
pub mod interp;

pub use codegen::*;
pub use instr::*;
pub use interp::*;

#[cfg(test)]
mod tests;
