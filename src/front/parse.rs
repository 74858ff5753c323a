//! The parser.
//!
//! A small hand-written recursive-descent parser over a flat token list.
//! Grammar (semicolon-terminated statements, brace-delimited blocks):
//!
//! ```text
//! program    := function*
//! function   := "fn" id "(" (param ("," param)*)? ")" ("->" type)? block
//! param      := id ":" type
//! type       := "void" | "int8" | "uint8" | "int32" | "uint32" | "double" | "struct"
//! block      := "{" stmt* "}"
//! stmt       := vardecl ";" | while_loop | expr_stmt ";"
//! vardecl    := type id ("=" expr)?
//! while_loop := "while" "(" expr ")" block
//! expr_stmt  := id "=" expr | call
//! call       := id "(" (expr ("," expr)*)? ")"
//! expr       := term (("+" | "<") term)*
//! term       := id | call | num | "(" expr ")"
//! ```

use std::fmt::Debug;

use derive_more::Display;

use super::ast::*;
use super::lex::*;
use crate::common::{Id, Map};

#[derive(Display)]
#[display("Parse error: {_0}")]
pub struct ParseError(String);

impl Debug for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError(e.to_string())
    }
}

pub fn parse(input: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser { tokens, pos: 0 }.parse_program()
}

struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'src>> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<Token<'src>> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, ParseError> {
        match self.bump() {
            Some(tok) if tok.kind == kind => Ok(tok),
            Some(tok) => Err(ParseError(format!("expected {kind}, found {tok}"))),
            None => Err(ParseError(format!("expected {kind}, found end of input"))),
        }
    }

    fn expect_id(&mut self) -> Result<Id, ParseError> {
        let tok = self.expect(TokenKind::Id)?;
        Ok(internment::Intern::new(tok.text.to_string()))
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut functions = Map::new();
        while self.peek().is_some() {
            let def = self.parse_function()?;
            functions.insert(def.name, def);
        }
        if !functions.contains_key(&internment::Intern::new("main".to_string())) {
            return Err(ParseError("program has no 'main' function".to_string()));
        }
        Ok(Program { functions })
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let tok = self
            .bump()
            .ok_or_else(|| ParseError("expected a type, found end of input".to_string()))?;
        match tok.kind {
            TokenKind::KwVoid => Ok(Type::Void),
            TokenKind::KwInt8 => Ok(Type::Int8),
            TokenKind::KwUint8 => Ok(Type::Uint8),
            TokenKind::KwInt32 => Ok(Type::Int32),
            TokenKind::KwUint32 => Ok(Type::Uint32),
            TokenKind::KwDouble => Ok(Type::Double),
            TokenKind::KwStruct => Ok(Type::Struct),
            _ => Err(ParseError(format!("expected a type, found {tok}"))),
        }
    }

    fn is_type_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                TokenKind::KwVoid
                    | TokenKind::KwInt8
                    | TokenKind::KwUint8
                    | TokenKind::KwInt32
                    | TokenKind::KwUint32
                    | TokenKind::KwDouble
                    | TokenKind::KwStruct
            )
        )
    }

    fn parse_function(&mut self) -> Result<FunctionDefinition, ParseError> {
        self.expect(TokenKind::KwFn)?;
        let name = self.expect_id()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.peek_kind() != Some(TokenKind::RParen) {
            loop {
                let pname = self.expect_id()?;
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                params.push(Param { name: pname, ty });
                if self.peek_kind() == Some(TokenKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let returns_something = if self.peek_kind() == Some(TokenKind::Arrow) {
            self.bump();
            self.parse_type()?;
            true
        } else {
            false
        };
        let body = self.parse_block()?;
        Ok(FunctionDefinition { name, params, returns_something, body })
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while self.peek_kind() != Some(TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Statement, ParseError> {
        if self.is_type_start() {
            let stmt = self.parse_vardecl()?;
            self.expect(TokenKind::Semicolon)?;
            Ok(stmt)
        } else if self.peek_kind() == Some(TokenKind::KwWhile) {
            self.parse_while()
        } else {
            let stmt = self.parse_expr_stmt()?;
            self.expect(TokenKind::Semicolon)?;
            Ok(stmt)
        }
    }

    fn parse_vardecl(&mut self) -> Result<Statement, ParseError> {
        let ty = self.parse_type()?;
        let name = self.expect_id()?;
        let init = if self.peek_kind() == Some(TokenKind::Assign) {
            self.bump();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(Statement::VariableDeclaration { name, ty, init })
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::KwWhile)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Statement::WhileLoop { cond: Box::new(cond), body })
    }

    /// An assignment (`id = expr`) or a bare call used as a statement.
    fn parse_expr_stmt(&mut self) -> Result<Statement, ParseError> {
        if self.peek_kind() == Some(TokenKind::Id) && self.peek_at(1).map(|t| t.kind) == Some(TokenKind::Assign) {
            let name = self.expect_id()?;
            self.expect(TokenKind::Assign)?;
            let rhs = self.parse_expr()?;
            Ok(Statement::Assign { name, rhs: Box::new(rhs) })
        } else {
            self.parse_call()
        }
    }

    fn parse_call(&mut self) -> Result<Statement, ParseError> {
        let name = self.expect_id()?;
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.peek_kind() != Some(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.peek_kind() == Some(TokenKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Statement::FunctionCall { name, args })
    }

    /// `term (("+" | "<") term)*`, left-associative.
    fn parse_expr(&mut self) -> Result<Statement, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Lt) => BinOp::Lt,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_term()?;
            lhs = Statement::OperatorCall { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Statement, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Num) => {
                let tok = self.bump().expect("peeked Some above");
                Ok(Statement::Literal { ty: Type::Int32, text: tok.text.to_string() })
            }
            Some(TokenKind::LParen) => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            Some(TokenKind::Id) if self.peek_at(1).map(|t| t.kind) == Some(TokenKind::LParen) => self.parse_call(),
            Some(TokenKind::Id) => {
                let name = self.expect_id()?;
                Ok(Statement::VariableName(name))
            }
            Some(kind) => Err(ParseError(format!("unexpected token {kind} in expression"))),
            None => Err(ParseError("unexpected end of input in expression".to_string())),
        }
    }
}
