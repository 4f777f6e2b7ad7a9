//! Sandboxed numeric constraint expressions.
//!
//! A constraint such as `x >= 1000` or `x % 2 == 0` narrows the values a
//! numeric field accepts. Expressions are tokenized and parsed by a small
//! recursive-descent parser into a general syntax tree, checked, and then
//! lowered into a restricted tree made only of the variable `x`, numeric
//! literals, `%` and comparison operators. Evaluation walks that tree
//! directly; nothing is ever handed to a general-purpose evaluator.
//!
//! Integer literals are kept exact, so an integral value compared against
//! integral literals is evaluated without rounding through `f64`.
//!
//! Checks run in a fixed order so the reported error is deterministic:
//!
//! 1. syntax ([`ConstraintError::Parse`]),
//! 2. free variables (exactly one, named `x`),
//! 3. operator whitelist (`<`, `<=`, `>`, `>=`, `==`, `!=`/`<>`, `%`),
//! 4. shape (the expression must be a comparison).
//!
//! # Examples
//!
//! ```
//! use mlspec_core::{Constraint, ConstraintError};
//!
//! let even = Constraint::compile("x % 2 == 0").unwrap();
//! assert!(even.check(4.0));
//! assert!(!even.check(3.0));
//!
//! let range = Constraint::compile("0 <= x < 10").unwrap();
//! assert!(range.check(0.0));
//! assert!(!range.check(10.0));
//!
//! assert!(matches!(
//!     Constraint::compile("x > y"),
//!     Err(ConstraintError::TooManyVariables(_))
//! ));
//! ```

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// The only identifier a constraint may reference.
pub const CONSTRAINT_VARIABLE: &str = "x";

/// Maximum nesting of parentheses, unary operators and operator chains.
const MAX_NESTING: usize = 64;

/// Constraint compilation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    /// The text is not a syntactically valid comparison expression.
    #[error("could not parse constraint '{expression}': {reason}")]
    Parse { expression: String, reason: String },
    /// The expression references no variable at all.
    #[error("no variables were detected in constraint '{0}'")]
    NoVariable(String),
    /// The expression references more than one distinct variable.
    #[error("only one variable ('x') is supported in constraints; found: {}", .0.join(", "))]
    TooManyVariables(Vec<String>),
    /// The expression references a single variable that is not `x`.
    #[error("only the variable 'x' is supported in constraints; found '{0}'")]
    WrongVariableName(String),
    /// The expression uses an operator outside the whitelist.
    #[error("operator '{0}' is not allowed in constraints")]
    DisallowedOperator(String),
}

/// A compiled constraint predicate over the single variable `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    source: String,
    first: Operand,
    rest: Vec<(Comparison, Operand)>,
}

impl Constraint {
    /// Compiles a constraint expression.
    ///
    /// # Errors
    ///
    /// Returns a [`ConstraintError`] describing the first check that failed.
    pub fn compile(expression: &str) -> Result<Self, ConstraintError> {
        let parse_error = |reason: String| ConstraintError::Parse {
            expression: expression.to_string(),
            reason,
        };

        let tokens = tokenize(expression).map_err(parse_error)?;
        if tokens.is_empty() {
            return Err(parse_error("expression is empty".to_string()));
        }
        let syntax = Parser::new(tokens).parse().map_err(parse_error)?;

        let mut names = BTreeSet::new();
        syntax.collect_names(&mut names);
        match names.len() {
            0 => return Err(ConstraintError::NoVariable(expression.to_string())),
            1 => {
                let name = names.iter().next().map(String::as_str).unwrap_or_default();
                if name != CONSTRAINT_VARIABLE {
                    return Err(ConstraintError::WrongVariableName(name.to_string()));
                }
            }
            _ => return Err(ConstraintError::TooManyVariables(names.into_iter().collect())),
        }

        syntax.check_operators()?;

        let Syntax::Compare { first, rest } = syntax else {
            return Err(parse_error("expression must be a comparison".to_string()));
        };
        let first = first.lower().map_err(parse_error)?;
        let rest = rest
            .into_iter()
            .map(|(op, operand)| {
                let comparison = Comparison::from_symbol(op)
                    .ok_or_else(|| ConstraintError::DisallowedOperator(op.to_string()))?;
                Ok((comparison, operand.lower().map_err(parse_error)?))
            })
            .collect::<Result<Vec<_>, ConstraintError>>()?;

        Ok(Self {
            source: expression.trim().to_string(),
            first,
            rest,
        })
    }

    /// Returns the original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the predicate with `x` bound to `value`.
    ///
    /// Chained comparisons hold only if every link holds. A modulo by zero
    /// makes the predicate false.
    pub fn check(&self, value: f64) -> bool {
        self.check_number(Number::Float(value))
    }

    /// Evaluates the predicate with `x` bound to an integer.
    ///
    /// Comparisons against integer literals stay exact beyond 2^53.
    pub fn check_int(&self, value: i64) -> bool {
        self.check_number(Number::Int(value))
    }

    fn check_number(&self, x: Number) -> bool {
        let Some(mut left) = self.first.eval(x) else {
            return false;
        };
        for (comparison, operand) in &self.rest {
            let Some(right) = operand.eval(x) else {
                return false;
            };
            if !comparison.apply(left, right) {
                return false;
            }
            left = right;
        }
        true
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "<" => Some(Comparison::Lt),
            "<=" => Some(Comparison::Le),
            ">" => Some(Comparison::Gt),
            ">=" => Some(Comparison::Ge),
            "==" => Some(Comparison::Eq),
            "!=" | "<>" => Some(Comparison::Ne),
            _ => None,
        }
    }

    fn apply(self, left: Number, right: Number) -> bool {
        match (left, right) {
            (Number::Int(l), Number::Int(r)) => self.compare(l, r),
            _ => self.compare(left.as_f64(), right.as_f64()),
        }
    }

    fn compare<T: PartialOrd>(self, left: T, right: T) -> bool {
        match self {
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn negate(self) -> Number {
        match self {
            Number::Int(i) => i.checked_neg().map_or(Number::Float(-(i as f64)), Number::Int),
            Number::Float(f) => Number::Float(-f),
        }
    }

    /// Modulo whose result takes the sign of the divisor; `None` on zero.
    fn modulo(self, divisor: Number) -> Option<Number> {
        if let (Number::Int(l), Number::Int(r)) = (self, divisor) {
            if r == 0 {
                return None;
            }
            if let Some(rem) = l.checked_rem(r) {
                let adjusted = if rem != 0 && (rem < 0) != (r < 0) { rem + r } else { rem };
                return Some(Number::Int(adjusted));
            }
        }
        let (l, r) = (self.as_f64(), divisor.as_f64());
        if r == 0.0 {
            return None;
        }
        Some(Number::Float(l - r * (l / r).floor()))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Variable,
    Number(Number),
    Modulo(Box<Operand>, Box<Operand>),
}

impl Operand {
    fn eval(&self, x: Number) -> Option<Number> {
        match self {
            Operand::Variable => Some(x),
            Operand::Number(n) => Some(*n),
            Operand::Modulo(lhs, rhs) => lhs.eval(x)?.modulo(rhs.eval(x)?),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Ident(String),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Ident(name) => f.write_str(name),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Op(op) => f.write_str(op),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::Comma => f.write_str(","),
            Token::Dot => f.write_str("."),
        }
    }
}

const TWO_CHAR_OPS: &[&str] = &["<=", ">=", "==", "!=", "<>", "**", "//", "<<", ">>"];
const ONE_CHAR_OPS: &[&str] = &["<", ">", "+", "-", "*", "/", "%", "&", "|", "^", "~"];
const KEYWORD_OPS: &[&str] = &["and", "or", "not", "in", "is"];

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                i += 1;
                if i < chars.len() && matches!(chars[i], '+' | '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let literal: String = chars[start..i].iter().collect();
            let number = match literal.parse::<i64>() {
                Ok(int) => Number::Int(int),
                Err(_) => literal
                    .parse::<f64>()
                    .map(Number::Float)
                    .map_err(|_| format!("invalid number literal '{literal}'"))?,
            };
            tokens.push(Token::Number(number));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match KEYWORD_OPS.iter().find(|k| **k == word) {
                Some(keyword) => tokens.push(Token::Op(*keyword)),
                None => tokens.push(Token::Ident(word)),
            }
            continue;
        }

        if c == '\'' || c == '"' {
            let start = i + 1;
            i = start;
            while i < chars.len() && chars[i] != c {
                i += 1;
            }
            if i >= chars.len() {
                return Err("unterminated string literal".to_string());
            }
            tokens.push(Token::Str(chars[start..i].iter().collect()));
            i += 1;
            continue;
        }

        let single = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ',' => Some(Token::Comma),
            '.' => Some(Token::Dot),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(token);
            i += 1;
            continue;
        }

        let pair: String = chars[i..(i + 2).min(chars.len())].iter().collect();
        if let Some(op) = TWO_CHAR_OPS.iter().find(|op| **op == pair) {
            tokens.push(Token::Op(*op));
            i += 2;
            continue;
        }
        let one = c.to_string();
        if let Some(op) = ONE_CHAR_OPS.iter().find(|op| **op == one) {
            tokens.push(Token::Op(*op));
            i += 1;
            continue;
        }

        return Err(format!("unexpected character '{c}'"));
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Syntax {
    Number(Number),
    Name(String),
    Str(String),
    Unary {
        op: &'static str,
        operand: Box<Syntax>,
    },
    Binary {
        op: &'static str,
        lhs: Box<Syntax>,
        rhs: Box<Syntax>,
    },
    Compare {
        first: Box<Syntax>,
        rest: Vec<(&'static str, Syntax)>,
    },
    Call {
        callee: Box<Syntax>,
        args: Vec<Syntax>,
    },
    Attribute {
        object: Box<Syntax>,
        name: String,
    },
    Subscript {
        object: Box<Syntax>,
        index: Box<Syntax>,
    },
}

impl Syntax {
    fn collect_names(&self, names: &mut BTreeSet<String>) {
        match self {
            Syntax::Name(name) => {
                names.insert(name.clone());
            }
            Syntax::Number(_) | Syntax::Str(_) => {}
            Syntax::Unary { operand, .. } => operand.collect_names(names),
            Syntax::Binary { lhs, rhs, .. } => {
                lhs.collect_names(names);
                rhs.collect_names(names);
            }
            Syntax::Compare { first, rest } => {
                first.collect_names(names);
                for (_, operand) in rest {
                    operand.collect_names(names);
                }
            }
            Syntax::Call { callee, args } => {
                callee.collect_names(names);
                for arg in args {
                    arg.collect_names(names);
                }
            }
            Syntax::Attribute { object, .. } => object.collect_names(names),
            Syntax::Subscript { object, index } => {
                object.collect_names(names);
                index.collect_names(names);
            }
        }
    }

    /// `%` is accepted only as the left operand of a comparison, and never
    /// nested under another `%`.
    fn check_operators(&self) -> Result<(), ConstraintError> {
        match self {
            Syntax::Compare { first, rest } => {
                first.check_operand(true)?;
                for (op, operand) in rest {
                    if Comparison::from_symbol(op).is_none() {
                        return Err(ConstraintError::DisallowedOperator(op.to_string()));
                    }
                    operand.check_operand(false)?;
                }
                Ok(())
            }
            other => other.check_operand(true),
        }
    }

    fn check_operand(&self, modulo_allowed: bool) -> Result<(), ConstraintError> {
        let disallowed = |op: &str| Err(ConstraintError::DisallowedOperator(op.to_string()));
        match self {
            Syntax::Number(_) | Syntax::Name(_) | Syntax::Str(_) => Ok(()),
            // Negative literals only.
            Syntax::Unary { op: "-", operand } if matches!(**operand, Syntax::Number(_)) => Ok(()),
            Syntax::Unary { op, .. } => disallowed(op),
            Syntax::Binary { op: "%", lhs, rhs } if modulo_allowed => {
                lhs.check_operand(false)?;
                rhs.check_operand(false)
            }
            Syntax::Binary { op, .. } => disallowed(op),
            Syntax::Compare { .. } => self.check_operators(),
            Syntax::Call { .. } => disallowed("function call"),
            Syntax::Attribute { .. } => disallowed("attribute access"),
            Syntax::Subscript { .. } => disallowed("subscript"),
        }
    }

    fn lower(self) -> Result<Operand, String> {
        match self {
            Syntax::Number(n) => Ok(Operand::Number(n)),
            Syntax::Name(_) => Ok(Operand::Variable),
            Syntax::Unary { op: "-", operand } => match *operand {
                Syntax::Number(n) => Ok(Operand::Number(n.negate())),
                _ => Err("negation is only supported on numeric literals".to_string()),
            },
            Syntax::Binary { op: "%", lhs, rhs } => Ok(Operand::Modulo(
                Box::new(lhs.lower()?),
                Box::new(rhs.lower()?),
            )),
            Syntax::Str(_) => Err("only numeric literals are supported".to_string()),
            Syntax::Compare { .. } => Err("nested comparisons are not supported".to_string()),
            other => Err(format!("unsupported expression {other:?}")),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn enter(&mut self) -> Result<(), String> {
        if self.depth >= MAX_NESTING {
            return Err(format!("expression nests deeper than {MAX_NESTING} levels"));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn parse(mut self) -> Result<Syntax, String> {
        let expr = self.parse_or()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(format!("unexpected token '{token}'")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected '{expected}', found '{token}'")),
            None => Err(format!("expected '{expected}', found end of expression")),
        }
    }

    fn binary_level(
        &mut self,
        ops: &[&'static str],
        next: fn(&mut Self) -> Result<Syntax, String>,
    ) -> Result<Syntax, String> {
        let mut lhs = next(self)?;
        // Each link deepens the left-leaning tree.
        let mut links = 0;
        while let Some(op) = self.eat_op(ops) {
            self.enter()?;
            links += 1;
            let rhs = next(self)?;
            lhs = Syntax::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.leave(links);
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Syntax, String> {
        self.binary_level(&["or"], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Syntax, String> {
        self.binary_level(&["and"], Self::parse_not)
    }

    fn parse_not(&mut self) -> Result<Syntax, String> {
        if self.eat_op(&["not"]).is_some() {
            self.enter()?;
            let operand = self.parse_not()?;
            self.leave(1);
            return Ok(Syntax::Unary {
                op: "not",
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Syntax, String> {
        const COMPARISON_OPS: &[&str] = &["<", "<=", ">", ">=", "==", "!=", "<>", "in", "is"];
        let first = self.parse_bitor()?;
        let mut rest = Vec::new();
        while let Some(op) = self.eat_op(COMPARISON_OPS) {
            rest.push((op, self.parse_bitor()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Syntax::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn parse_bitor(&mut self) -> Result<Syntax, String> {
        self.binary_level(&["|"], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> Result<Syntax, String> {
        self.binary_level(&["^"], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> Result<Syntax, String> {
        self.binary_level(&["&"], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> Result<Syntax, String> {
        self.binary_level(&["<<", ">>"], Self::parse_arith)
    }

    fn parse_arith(&mut self) -> Result<Syntax, String> {
        self.binary_level(&["+", "-"], Self::parse_term)
    }

    fn parse_term(&mut self) -> Result<Syntax, String> {
        self.binary_level(&["*", "/", "//", "%"], Self::parse_factor)
    }

    fn parse_factor(&mut self) -> Result<Syntax, String> {
        if let Some(op) = self.eat_op(&["-", "+", "~"]) {
            self.enter()?;
            let operand = self.parse_factor()?;
            self.leave(1);
            return Ok(Syntax::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Syntax, String> {
        let base = self.parse_postfix()?;
        if self.eat_op(&["**"]).is_some() {
            self.enter()?;
            let exponent = self.parse_factor()?;
            self.leave(1);
            return Ok(Syntax::Binary {
                op: "**",
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Syntax, String> {
        let mut expr = self.parse_atom()?;
        let mut links = 0;
        loop {
            if matches!(
                self.peek(),
                Some(Token::LParen | Token::Dot | Token::LBracket)
            ) {
                self.enter()?;
                links += 1;
            }
            match self.peek() {
                Some(Token::LParen) => {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.parse_or()?);
                            if self.peek() == Some(&Token::Comma) {
                                self.pos += 1;
                                continue;
                            }
                            break;
                        }
                    }
                    self.expect(&Token::RParen)?;
                    expr = Syntax::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Ident(name)) => {
                            expr = Syntax::Attribute {
                                object: Box::new(expr),
                                name,
                            };
                        }
                        _ => return Err("expected attribute name after '.'".to_string()),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_or()?;
                    self.expect(&Token::RBracket)?;
                    expr = Syntax::Subscript {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => {
                    self.leave(links);
                    return Ok(expr);
                }
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Syntax, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Syntax::Number(n)),
            Some(Token::Ident(name)) => Ok(Syntax::Name(name)),
            Some(Token::Str(s)) => Ok(Syntax::Str(s)),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                self.leave(1);
                Ok(inner)
            }
            Some(token) => Err(format!("unexpected token '{token}'")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}
