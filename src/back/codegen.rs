//! The code generator: lowers an [`ast::Program`] into a single flat
//! instruction buffer plus a symbol table resolving function names to entry
//! offsets.
//!
//! # Frame layout and the `-2-N`/`-1-N` ambiguity
//!
//! The frame-pointer convention used here is: `bp` points one past the
//! saved-pc slot (i.e. `stack[bp-1]` is the saved pc and `stack[bp-2]` is the
//! saved bp), and locals sit at `stack[bp+k]` for local `k`. Working that
//! layout backwards through a call with `N` arguments gives:
//!
//! - parameter `k` at offset `-2-N+k` from `bp`,
//! - the caller-reserved return slot (one slot below argument 0) at offset
//!   `-3-N`.
//!
//! This was hand-verified against a nested-call trace (`add3(a,b,c) { return
//! a+b+c }` called as `add3(1,2,4)`) — see `DESIGN.md` for the worked
//! arithmetic and the matching interpreter convention in `interp.rs`.

use std::fmt;

use crate::common::{Id, Map};
use crate::front::ast::{self, BinOp, Statement, Type};

use super::instr::{Instruction, Opcode};

#[derive(Debug, Clone, Copy)]
pub struct FunctionInfo {
    pub entry: usize,
    pub param_count: usize,
    pub returns_something: bool,
}

#[derive(Debug)]
pub enum CodegenError {
    UnknownVariable(Id),
    UnknownFunction(Id),
    ArityMismatch { name: Id, expected: usize, found: usize },
    BadIntrinsicUsage { name: &'static str, found: usize },
    MalformedOperatorCall(&'static str),
    AssignToParameter(Id),
    MissingMain,
    LiteralOutOfRange(String),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::UnknownVariable(name) => write!(f, "unknown variable '{name}'"),
            CodegenError::UnknownFunction(name) => write!(f, "unknown function '{name}'"),
            CodegenError::ArityMismatch { name, expected, found } => write!(
                f,
                "'{name}' expects {expected} argument(s), found {found}"
            ),
            CodegenError::BadIntrinsicUsage { name, found } => {
                write!(f, "'{name}' expects exactly one argument, found {found}")
            }
            CodegenError::MalformedOperatorCall(op) => write!(f, "malformed '{op}' operator call"),
            CodegenError::AssignToParameter(name) => {
                write!(f, "cannot assign to parameter '{name}'")
            }
            CodegenError::MissingMain => write!(f, "program has no 'main' function"),
            CodegenError::LiteralOutOfRange(text) => {
                write!(f, "literal '{text}' is outside the 16-bit signed range (-32768..=32767)")
            }
        }
    }
}

impl std::error::Error for CodegenError {}

/// Per-function bookkeeping threaded through the two lowering passes.
struct FnCtx {
    locals: Map<Id, i16>,
    params: Map<Id, usize>,
    param_count: i16,
}

/// Lower a whole program into one instruction buffer plus a symbol table.
pub fn compile(program: &ast::Program) -> Result<(Vec<Instruction>, Map<Id, FunctionInfo>), CodegenError> {
    let main_name: Id = internment::Intern::new("main".to_string());
    if !program.functions.contains_key(&main_name) {
        return Err(CodegenError::MissingMain);
    }

    // Signatures are known in full up front (no codegen needed to know them),
    // so arity/existence checks never depend on compilation order.
    let signatures: Map<Id, (usize, bool)> = program
        .functions
        .values()
        .map(|def| (def.name, (def.params.len(), def.returns_something)))
        .collect();

    let mut code = Vec::new();
    let mut symbols: Map<Id, FunctionInfo> = Map::new();
    // Calls to a function not yet compiled (forward references, mutual
    // recursion) are patched once every function's entry offset is known,
    // mirroring the pending-jump backpatch already used for `return`.
    let mut pending_calls: Vec<(usize, Id)> = Vec::new();

    for def in program.functions.values() {
        compile_function(def, &mut code, &mut symbols, &signatures, &mut pending_calls)?;
    }

    for (call_idx, callee) in pending_calls {
        let info = symbols.get(&callee).copied().ok_or(CodegenError::UnknownFunction(callee))?;
        code[call_idx].p2 = (info.entry as i64 - call_idx as i64) as i16;
    }

    Ok((code, symbols))
}

fn compile_function(
    def: &ast::FunctionDefinition,
    code: &mut Vec<Instruction>,
    symbols: &mut Map<Id, FunctionInfo>,
    signatures: &Map<Id, (usize, bool)>,
    pending_calls: &mut Vec<(usize, Id)>,
) -> Result<(), CodegenError> {
    symbols.insert(
        def.name,
        FunctionInfo {
            entry: code.len(),
            param_count: def.params.len(),
            returns_something: def.returns_something,
        },
    );

    let mut ctx = FnCtx {
        locals: Map::new(),
        params: def.params.iter().enumerate().map(|(i, p)| (p.name, i)).collect(),
        param_count: def.params.len() as i16,
    };

    // Prologue: allocate every INT32 local up front, in declaration order,
    // recursing into while-loop bodies (the language has no block scoping).
    let mut local_count: i16 = 0;
    prologue_pass(&def.body, code, &mut ctx.locals, &mut local_count)?;

    // Body: emit every statement's code; literal initializers were already
    // pushed by the prologue, so the second pass skips them.
    let mut return_patches = Vec::new();
    for stmt in &def.body {
        lower_stmt(stmt, &ctx, code, symbols, signatures, pending_calls, &mut return_patches)?;
    }

    let cleanup_offset = code.len();
    for idx in return_patches {
        code[idx].p2 = (cleanup_offset as i64 - idx as i64) as i16;
    }
    for _ in 0..local_count {
        code.push(Instruction::new(Opcode::PopInt, 0));
    }
    code.push(Instruction::new(Opcode::Return, 0));

    Ok(())
}

/// Parse an `INT32` literal's textual form, rejecting anything outside the
/// 16-bit signed range instead of silently wrapping it — per §9, exceeding
/// the range is undefined in the source and must be diagnosed here.
fn parse_int32_literal(text: &str) -> Result<i16, CodegenError> {
    match text.parse::<i64>() {
        Ok(value) if (i16::MIN as i64..=i16::MAX as i64).contains(&value) => Ok(value as i16),
        _ => Err(CodegenError::LiteralOutOfRange(text.to_string())),
    }
}

fn prologue_pass(
    stmts: &[Statement],
    code: &mut Vec<Instruction>,
    locals: &mut Map<Id, i16>,
    local_count: &mut i16,
) -> Result<(), CodegenError> {
    for stmt in stmts {
        match stmt {
            Statement::VariableDeclaration { name, ty: Type::Int32, init } => {
                let value = match init.as_deref() {
                    Some(Statement::Literal { text, .. }) => parse_int32_literal(text)?,
                    _ => 0,
                };
                code.push(Instruction::new(Opcode::PushInt, value));
                locals.insert(*name, *local_count);
                *local_count += 1;
            }
            Statement::VariableDeclaration { .. } => {} // reserved types: no storage, no code
            Statement::WhileLoop { body, .. } => prologue_pass(body, code, locals, local_count)?,
            _ => {}
        }
    }
    Ok(())
}

fn lower_stmt(
    stmt: &Statement,
    ctx: &FnCtx,
    code: &mut Vec<Instruction>,
    symbols: &Map<Id, FunctionInfo>,
    signatures: &Map<Id, (usize, bool)>,
    pending_calls: &mut Vec<(usize, Id)>,
    return_patches: &mut Vec<usize>,
) -> Result<(), CodegenError> {
    match stmt {
        Statement::VariableDeclaration { ty: Type::Int32, name, init: Some(init) } if !matches!(init.as_ref(), Statement::Literal { .. }) => {
            lower_expr(init, ctx, code, symbols, signatures, pending_calls)?;
            let offset = *ctx.locals.get(name).ok_or(CodegenError::UnknownVariable(*name))?;
            code.push(Instruction::new(Opcode::StoreIntBasepointerRelative, offset));
            Ok(())
        }
        Statement::VariableDeclaration { .. } => Ok(()), // literal/no initializer, or a reserved type

        Statement::WhileLoop { cond, body } => {
            let condition_offset = code.len();
            lower_expr(cond, ctx, code, symbols, signatures, pending_calls)?;
            let branch_offset = code.len();
            code.push(Instruction::new(Opcode::JumpByIfZero, 0));
            for s in body {
                lower_stmt(s, ctx, code, symbols, signatures, pending_calls, return_patches)?;
            }
            let back = condition_offset as i64 - code.len() as i64;
            code.push(Instruction::new(Opcode::JumpBy, back as i16));
            let forward = code.len() as i64 - branch_offset as i64;
            code[branch_offset].p2 = forward as i16;
            Ok(())
        }

        Statement::Assign { name, rhs } => {
            if ctx.params.contains_key(name) {
                return Err(CodegenError::AssignToParameter(*name));
            }
            lower_expr(rhs, ctx, code, symbols, signatures, pending_calls)?;
            let offset = *ctx.locals.get(name).ok_or(CodegenError::UnknownVariable(*name))?;
            code.push(Instruction::new(Opcode::StoreIntBasepointerRelative, offset));
            Ok(())
        }

        Statement::FunctionCall { name, args } if *name == id("return") => {
            if args.len() != 1 {
                return Err(CodegenError::BadIntrinsicUsage { name: "return", found: args.len() });
            }
            lower_expr(&args[0], ctx, code, symbols, signatures, pending_calls)?;
            code.push(Instruction::new(Opcode::StoreIntBasepointerRelative, -3 - ctx.param_count));
            let jump_idx = code.len();
            code.push(Instruction::new(Opcode::JumpBy, 0)); // patched once the epilogue offset is known
            return_patches.push(jump_idx);
            Ok(())
        }

        Statement::FunctionCall { name, args } if *name == id("printNum") => {
            if args.len() != 1 {
                return Err(CodegenError::BadIntrinsicUsage { name: "printNum", found: args.len() });
            }
            lower_expr(&args[0], ctx, code, symbols, signatures, pending_calls)?;
            code.push(Instruction::new(Opcode::PrintInt, 0));
            Ok(())
        }

        Statement::FunctionCall { name, args } => {
            let returns_something = lower_call(*name, args, ctx, code, symbols, signatures, pending_calls)?;
            if returns_something {
                // the statement-level call discards its unused result
                code.push(Instruction::new(Opcode::PopInt, 0));
            }
            Ok(())
        }

        Statement::Literal { .. } | Statement::VariableName(_) | Statement::OperatorCall { .. } => {
            Err(CodegenError::MalformedOperatorCall("bare expression used as a statement"))
        }
    }
}

fn lower_expr(
    stmt: &Statement,
    ctx: &FnCtx,
    code: &mut Vec<Instruction>,
    symbols: &Map<Id, FunctionInfo>,
    signatures: &Map<Id, (usize, bool)>,
    pending_calls: &mut Vec<(usize, Id)>,
) -> Result<(), CodegenError> {
    match stmt {
        Statement::Literal { ty: Type::Int32, text } => {
            let value = parse_int32_literal(text)?;
            code.push(Instruction::new(Opcode::PushInt, value));
            Ok(())
        }
        Statement::Literal { .. } => Ok(()), // reserved type: no value, no code

        Statement::VariableName(name) => {
            if let Some(&offset) = ctx.locals.get(name) {
                code.push(Instruction::new(Opcode::LoadIntBasepointerRelative, offset));
                Ok(())
            } else if let Some(&k) = ctx.params.get(name) {
                let offset = -2 - ctx.param_count + k as i16;
                code.push(Instruction::new(Opcode::LoadIntBasepointerRelative, offset));
                Ok(())
            } else {
                Err(CodegenError::UnknownVariable(*name))
            }
        }

        Statement::OperatorCall { op, lhs, rhs } => {
            lower_expr(lhs, ctx, code, symbols, signatures, pending_calls)?;
            lower_expr(rhs, ctx, code, symbols, signatures, pending_calls)?;
            let opcode = match op {
                BinOp::Add => Opcode::AddInt,
                BinOp::Lt => Opcode::CompIntLt,
            };
            code.push(Instruction::new(opcode, 0));
            Ok(())
        }

        Statement::Assign { .. } => Err(CodegenError::MalformedOperatorCall("=")),

        Statement::FunctionCall { name, args } if *name == id("return") || *name == id("printNum") => {
            Err(CodegenError::BadIntrinsicUsage {
                name: if *name == id("return") { "return" } else { "printNum" },
                found: args.len(),
            })
        }

        Statement::FunctionCall { name, args } => {
            let returns_something = lower_call(*name, args, ctx, code, symbols, signatures, pending_calls)?;
            if !returns_something {
                return Err(CodegenError::BadIntrinsicUsage { name: "<void call in expression>", found: args.len() });
            }
            Ok(())
        }

        Statement::VariableDeclaration { .. } | Statement::WhileLoop { .. } => {
            Err(CodegenError::MalformedOperatorCall("statement used where an expression was expected"))
        }
    }
}

/// Lower a user-defined function call, following the calling convention of
/// §4.2/§4.4.4: push the return slot (if any), push arguments left to right,
/// `CALL`, then pop the argument slots (the return value, if any, stays on
/// the stack for the caller). Returns whether the callee returns a value.
fn lower_call(
    name: Id,
    args: &[Statement],
    ctx: &FnCtx,
    code: &mut Vec<Instruction>,
    symbols: &Map<Id, FunctionInfo>,
    signatures: &Map<Id, (usize, bool)>,
    pending_calls: &mut Vec<(usize, Id)>,
) -> Result<bool, CodegenError> {
    let &(expected, returns_something) = signatures.get(&name).ok_or(CodegenError::UnknownFunction(name))?;
    if args.len() != expected {
        return Err(CodegenError::ArityMismatch { name, expected, found: args.len() });
    }

    if returns_something {
        code.push(Instruction::new(Opcode::PushInt, 0));
    }
    for arg in args {
        lower_expr(arg, ctx, code, symbols, signatures, pending_calls)?;
    }

    let call_idx = code.len();
    match symbols.get(&name) {
        Some(info) => code.push(Instruction::new(Opcode::Call, (info.entry as i64 - call_idx as i64) as i16)),
        None => {
            code.push(Instruction::new(Opcode::Call, 0));
            pending_calls.push((call_idx, name));
        }
    }

    for _ in 0..args.len() {
        code.push(Instruction::new(Opcode::PopInt, 0));
    }

    Ok(returns_something)
}

fn id(s: &str) -> Id {
    internment::Intern::new(s.to_string())
}
