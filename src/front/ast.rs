//! The abstract syntax tree.

use crate::common::{Id, Map};

/// A declared type. Only [`Type::Int32`] carries runtime behavior; the rest
/// are reserved placeholders codegen accepts syntactically and silently skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Void,
    Int8,
    Uint8,
    Int32,
    Uint32,
    Double,
    Struct,
}

/// The two binary operators (`+` and `<`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Lt,
}

/// A statement or expression node. The language has no separate expression
/// type: everything that produces or consumes a value is a `Statement`.
/// Modeled as a closed enum with one variant per node shape rather than a
/// generic `{kind, name, children}` triple, so the lowering passes get
/// exhaustiveness checking from the compiler instead of runtime tag dispatch.
#[derive(Debug, Clone)]
pub enum Statement {
    VariableDeclaration {
        name: Id,
        ty: Type,
        init: Option<Box<Statement>>,
    },
    Literal {
        ty: Type,
        text: String,
    },
    VariableName(Id),
    OperatorCall {
        op: BinOp,
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    /// An assignment statement: `lhs = rhs`. Kept distinct from
    /// [`Statement::OperatorCall`] since its left-hand side is constrained to
    /// a variable name, not an arbitrary expression.
    Assign {
        name: Id,
        rhs: Box<Statement>,
    },
    FunctionCall {
        name: Id,
        args: Vec<Statement>,
    },
    WhileLoop {
        cond: Box<Statement>,
        body: Vec<Statement>,
    },
}

/// One parameter of a [`FunctionDefinition`].
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Id,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub name: Id,
    pub params: Vec<Param>,
    pub returns_something: bool,
    pub body: Vec<Statement>,
}

#[derive(Debug, Default)]
pub struct Program {
    pub functions: Map<Id, FunctionDefinition>,
}
