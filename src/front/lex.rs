//! The lexer.

use derive_more::Display;
use regex::Regex;
use std::fmt;

/// Tokens in the program.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{kind}: '{text}'")]
pub struct Token<'src> {
    /// What token class this token belongs to.
    pub kind: TokenKind,
    /// What part of the input this token carries.
    pub text: &'src str,
}

/// Token classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TokenKind {
    #[display("id")]
    Id,
    #[display("num")]
    Num,
    #[display("fn")]
    KwFn,
    #[display("while")]
    KwWhile,
    #[display("void")]
    KwVoid,
    #[display("int8")]
    KwInt8,
    #[display("uint8")]
    KwUint8,
    #[display("int32")]
    KwInt32,
    #[display("uint32")]
    KwUint32,
    #[display("double")]
    KwDouble,
    #[display("struct")]
    KwStruct,
    #[display("->")]
    Arrow,
    #[display("=")]
    Assign,
    #[display("+")]
    Plus,
    #[display("<")]
    Lt,
    #[display("(")]
    LParen,
    #[display(")")]
    RParen,
    #[display("{{")]
    LBrace,
    #[display("}}")]
    RBrace,
    #[display(",")]
    Comma,
    #[display(";")]
    Semicolon,
    #[display(":")]
    Colon,
}

pub struct LexError(pub usize, pub char);

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lexer error: unexpected character {:?} at {}", self.1, self.0)
    }
}

impl fmt::Debug for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

pub struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    whitespace: Regex,
    matchers: Vec<(Regex, TokenKind)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        // Keywords come before the generic identifier matcher so that, say,
        // `while` isn't lexed as an Id; matchers are tried in order and the
        // first match wins.
        let kw = |word: &str| Regex::new(&format!(r"\A{}\b", word)).unwrap();
        let matchers = vec![
            (kw("fn"), TokenKind::KwFn),
            (kw("while"), TokenKind::KwWhile),
            (kw("void"), TokenKind::KwVoid),
            (kw("int8"), TokenKind::KwInt8),
            (kw("uint8"), TokenKind::KwUint8),
            (kw("int32"), TokenKind::KwInt32),
            (kw("uint32"), TokenKind::KwUint32),
            (kw("double"), TokenKind::KwDouble),
            (kw("struct"), TokenKind::KwStruct),
            (Regex::new(r"\A[A-Za-z_][A-Za-z0-9_]*").unwrap(), TokenKind::Id),
            (Regex::new(r"\A-?[0-9]+").unwrap(), TokenKind::Num),
            (Regex::new(r"\A->").unwrap(), TokenKind::Arrow),
            (Regex::new(r"\A=").unwrap(), TokenKind::Assign),
            (Regex::new(r"\A\+").unwrap(), TokenKind::Plus),
            (Regex::new(r"\A<").unwrap(), TokenKind::Lt),
            (Regex::new(r"\A\(").unwrap(), TokenKind::LParen),
            (Regex::new(r"\A\)").unwrap(), TokenKind::RParen),
            (Regex::new(r"\A\{").unwrap(), TokenKind::LBrace),
            (Regex::new(r"\A\}").unwrap(), TokenKind::RBrace),
            (Regex::new(r"\A,").unwrap(), TokenKind::Comma),
            (Regex::new(r"\A;").unwrap(), TokenKind::Semicolon),
            (Regex::new(r"\A:").unwrap(), TokenKind::Colon),
        ];
        Lexer {
            input,
            pos: 0,
            whitespace: Regex::new(r"\A(?:[ \t\f\r\n\v]|(?://[^\n]*))*").unwrap(),
            matchers,
        }
    }

    /// Has the lexer reached the end of input?
    pub fn end_of_input(&self) -> bool {
        self.pos == self.input.len()
    }

    // Skip comments and whitespace
    fn skip_whitespace(&mut self) {
        if let Some(m) = self.whitespace.find(&self.input[self.pos..]) {
            self.pos += m.end()
        }
    }

    /// Get the next token if possible.
    ///
    /// The return type distinguishes between end-of-input and lexer error.
    pub fn next(&mut self) -> Result<Option<Token<'input>>, LexError> {
        self.skip_whitespace();
        if self.end_of_input() {
            return Ok(None);
        }
        let rest = &self.input[self.pos..];
        for (re, kind) in &self.matchers {
            if let Some(m) = re.find(rest) {
                let text = &rest[..m.end()];
                self.pos += m.end();
                return Ok(Some(Token { kind: *kind, text }));
            }
        }
        let bad = rest.chars().next().expect("not at end of input");
        Err(LexError(self.pos, bad))
    }

    /// Lex the whole input into a flat token list.
    pub fn tokenize(mut self) -> Result<Vec<Token<'input>>, LexError> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }
}
