//! Recursive-descent parser from tokens to a [`Program`].
//!
//! Precedence, loosest first: `?:`, `??`, `||`, `^^`, `&&`, `== != =~ !=~`,
//! `< <= > >=`, `+ -`, `* / // %`, `.`, unary `! - +`, `**` (right
//! associative), postfix indexing.

use crate::error::{PipelineError, Result};
use crate::infer::{InferenceMode, infer_kind};
use crate::script::ast::{BinaryOp, ContextVar, Expr, LValue, Program, Statement, UnaryOp};
use crate::script::functions;
use crate::script::lexer::{Spanned, Token, tokenize};
use crate::value::{Kind, Value};

/// Parse a complete program.
pub fn parse_program(src: &str) -> Result<Program> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.program()
}

const ASSIGNMENT_OPS: &[(&str, Option<BinaryOp>)] = &[
    ("=", None),
    ("+=", Some(BinaryOp::Plus)),
    ("-=", Some(BinaryOp::Minus)),
    ("*=", Some(BinaryOp::Times)),
    ("/=", Some(BinaryOp::Divide)),
    ("//=", Some(BinaryOp::IntDivide)),
    ("%=", Some(BinaryOp::Modulus)),
    ("**=", Some(BinaryOp::Power)),
    (".=", Some(BinaryOp::Dot)),
    ("&&=", Some(BinaryOp::And)),
    ("||=", Some(BinaryOp::Or)),
];

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> PipelineError {
        let at = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        PipelineError::Script {
            line: at.line,
            column: at.column,
            message: message.into(),
        }
    }

    fn at_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Token::Punct(q) if *q == p)
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(w) if w == word)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.at_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{p}', found {}", describe(self.peek()))))
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn program(&mut self) -> Result<Program> {
        let mut program = Program::default();
        loop {
            while self.eat_punct(";") {}
            if *self.peek() == Token::Eof {
                return Ok(program);
            }
            if self.at_keyword("begin") {
                self.advance();
                program.begin.push(self.block()?);
            } else if self.at_keyword("end") {
                self.advance();
                program.end.push(self.block()?);
            } else {
                let (statement, braced) = self.statement()?;
                program.main.push(statement);
                if !braced {
                    self.separator()?;
                }
            }
        }
    }

    /// After a statement: `;`, end of input, or a closing brace (not eaten).
    fn separator(&mut self) -> Result<()> {
        if self.eat_punct(";") || self.at_punct("}") || *self.peek() == Token::Eof {
            Ok(())
        } else {
            Err(self.error(format!("expected ';', found {}", describe(self.peek()))))
        }
    }

    fn block(&mut self) -> Result<Vec<Statement>> {
        self.expect_punct("{")?;
        let mut statements = Vec::new();
        loop {
            while self.eat_punct(";") {}
            if self.eat_punct("}") {
                return Ok(statements);
            }
            if *self.peek() == Token::Eof {
                return Err(self.error("unexpected end of input; expected '}'"));
            }
            let (statement, braced) = self.statement()?;
            statements.push(statement);
            if !braced {
                self.separator()?;
            }
        }
    }

    /// One statement, and whether it ended with a closing brace.
    fn statement(&mut self) -> Result<(Statement, bool)> {
        if let Token::Ident(word) = self.peek().clone() {
            match word.as_str() {
                "unset" => {
                    self.advance();
                    let mut targets = vec![self.lvalue()?];
                    while self.eat_punct(",") {
                        targets.push(self.lvalue()?);
                    }
                    return Ok((Statement::Unset(targets), false));
                }
                "filter" => {
                    self.advance();
                    return Ok((Statement::Filter(self.expr()?), false));
                }
                "print" => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.at_punct(";") && !self.at_punct("}") && *self.peek() != Token::Eof {
                        args.push(self.expr()?);
                        while self.eat_punct(",") {
                            args.push(self.expr()?);
                        }
                    }
                    return Ok((Statement::Print(args), false));
                }
                "emit" => {
                    self.advance();
                    let target = self.lvalue()?;
                    if matches!(target, LValue::Field(_) | LValue::FullRecord) {
                        return Err(self.error("emit takes an out-of-stream variable"));
                    }
                    let mut names = Vec::new();
                    while self.eat_punct(",") {
                        names.push(self.expr()?);
                    }
                    return Ok((Statement::Emit(target, names), false));
                }
                "dump" => {
                    self.advance();
                    let target = if self.at_punct(";") || self.at_punct("}") || *self.peek() == Token::Eof {
                        None
                    } else {
                        Some(self.expr()?)
                    };
                    return Ok((Statement::Dump(target), false));
                }
                "if" => {
                    self.advance();
                    return Ok((self.if_chain()?, true));
                }
                "begin" | "end" => {
                    return Err(self.error(format!("{word} blocks must be at top level")));
                }
                _ => {}
            }
        }

        let expr = self.expr()?;
        if let Token::Punct(p) = self.peek() {
            if let Some((_, op)) = ASSIGNMENT_OPS.iter().find(|(q, _)| q == p) {
                let op = *op;
                self.advance();
                let target = self.to_lvalue(&expr)?;
                let rhs = self.expr()?;
                let rhs = match op {
                    Some(op) => Expr::Binary(op, Box::new(expr), Box::new(rhs)),
                    None => rhs,
                };
                return Ok((Statement::Assign(target, rhs), false));
            }
        }
        if self.at_punct("{") {
            let body = self.block()?;
            return Ok((Statement::Pattern(expr, body), true));
        }
        Ok((Statement::Bare(expr), false))
    }

    fn if_chain(&mut self) -> Result<Statement> {
        let mut arms = Vec::new();
        self.expect_punct("(")?;
        let condition = self.expr()?;
        self.expect_punct(")")?;
        arms.push((condition, self.block()?));
        let mut otherwise = None;
        loop {
            if self.at_keyword("elif") {
                self.advance();
                self.expect_punct("(")?;
                let condition = self.expr()?;
                self.expect_punct(")")?;
                arms.push((condition, self.block()?));
            } else if self.at_keyword("else") {
                self.advance();
                otherwise = Some(self.block()?);
                break;
            } else {
                break;
            }
        }
        Ok(Statement::If(arms, otherwise))
    }

    fn lvalue(&mut self) -> Result<LValue> {
        let expr = self.postfix()?;
        self.to_lvalue(&expr)
    }

    fn to_lvalue(&self, expr: &Expr) -> Result<LValue> {
        match expr {
            Expr::Field(name) => Ok(LValue::Field(name.clone())),
            Expr::FullRecord => Ok(LValue::FullRecord),
            Expr::Oosvar(name) => Ok(LValue::Oosvar(name.clone(), Vec::new())),
            Expr::AllOosvars => Ok(LValue::AllOosvars),
            Expr::Index(base, index) => match self.to_lvalue(base)? {
                LValue::Oosvar(name, mut indices) => {
                    indices.push((**index).clone());
                    Ok(LValue::Oosvar(name, indices))
                }
                _ => Err(self.error("only out-of-stream variables can be indexed on assignment")),
            },
            _ => Err(self.error("left-hand side is not assignable")),
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn expr(&mut self) -> Result<Expr> {
        self.ternary()
    }

    fn ternary(&mut self) -> Result<Expr> {
        let condition = self.binary_level(0)?;
        if self.eat_punct("?") {
            let yes = self.ternary()?;
            self.expect_punct(":")?;
            let no = self.ternary()?;
            return Ok(Expr::Ternary(Box::new(condition), Box::new(yes), Box::new(no)));
        }
        Ok(condition)
    }

    /// Left-associative binary levels, loosest first.
    fn binary_level(&mut self, level: usize) -> Result<Expr> {
        const LEVELS: &[&[(&str, BinaryOp)]] = &[
            &[("??", BinaryOp::AbsentCoalesce)],
            &[("||", BinaryOp::Or)],
            &[("^^", BinaryOp::Xor)],
            &[("&&", BinaryOp::And)],
            &[
                ("==", BinaryOp::Equal),
                ("!=", BinaryOp::NotEqual),
                ("=~", BinaryOp::Matches),
                ("!=~", BinaryOp::NotMatches),
            ],
            &[
                ("<", BinaryOp::Less),
                ("<=", BinaryOp::LessEqual),
                (">", BinaryOp::Greater),
                (">=", BinaryOp::GreaterEqual),
            ],
            &[("+", BinaryOp::Plus), ("-", BinaryOp::Minus)],
            &[
                ("*", BinaryOp::Times),
                ("/", BinaryOp::Divide),
                ("//", BinaryOp::IntDivide),
                ("%", BinaryOp::Modulus),
            ],
            &[(".", BinaryOp::Dot)],
        ];
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary_level(level + 1)?;
        loop {
            let found = match self.peek() {
                Token::Punct(p) => ops.iter().find(|(q, _)| q == p).map(|(_, op)| *op),
                _ => None,
            };
            let Some(op) = found else {
                return Ok(lhs);
            };
            self.advance();
            let rhs = self.binary_level(level + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Token::Punct("!") => Some(UnaryOp::Not),
            Token::Punct("-") => Some(UnaryOp::Negate),
            Token::Punct("+") => Some(UnaryOp::Plus),
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                Ok(Expr::Unary(op, Box::new(self.unary()?)))
            }
            None => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.postfix()?;
        if self.eat_punct("**") {
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinaryOp::Power, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        while self.eat_punct("[") {
            let index = self.expr()?;
            self.expect_punct("]")?;
            expr = Expr::Index(Box::new(expr), Box::new(index));
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            Token::Number(text) => {
                let kind = infer_kind(&text, InferenceMode::Normal);
                if !matches!(kind, Kind::Int(_) | Kind::Float(_)) {
                    return Err(self.error(format!("malformed number \"{text}\"")));
                }
                self.advance();
                Ok(Expr::Literal(Value::from_text_and_kind(text, kind)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::from_string(s)))
            }
            Token::Field(name) => {
                self.advance();
                Ok(Expr::Field(name))
            }
            Token::FullRecord => {
                self.advance();
                Ok(Expr::FullRecord)
            }
            Token::Oosvar(name) => {
                self.advance();
                Ok(Expr::Oosvar(name))
            }
            Token::AllOosvars => {
                self.advance();
                Ok(Expr::AllOosvars)
            }
            Token::Ident(word) => {
                self.advance();
                self.identifier(word)
            }
            Token::Punct("(") => {
                self.advance();
                let inner = self.expr()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Token::Punct("{") => {
                self.advance();
                let mut pairs = Vec::new();
                if !self.eat_punct("}") {
                    loop {
                        let key = self.expr()?;
                        self.expect_punct(":")?;
                        let value = self.expr()?;
                        pairs.push((key, value));
                        if self.eat_punct("}") {
                            break;
                        }
                        self.expect_punct(",")?;
                    }
                }
                Ok(Expr::MapLiteral(pairs))
            }
            Token::Punct("[") => {
                self.advance();
                let mut items = Vec::new();
                if !self.eat_punct("]") {
                    loop {
                        items.push(self.expr()?);
                        if self.eat_punct("]") {
                            break;
                        }
                        self.expect_punct(",")?;
                    }
                }
                Ok(Expr::ArrayLiteral(items))
            }
            other => Err(self.error(format!("unexpected {}", describe(&other)))),
        }
    }

    fn identifier(&mut self, word: String) -> Result<Expr> {
        let context = match word.as_str() {
            "true" => return Ok(Expr::Literal(Value::from_bool(true))),
            "false" => return Ok(Expr::Literal(Value::from_bool(false))),
            "NR" => Some(ContextVar::Nr),
            "FNR" => Some(ContextVar::Fnr),
            "FILENAME" => Some(ContextVar::Filename),
            "FILENUM" => Some(ContextVar::Filenum),
            "M_PI" => Some(ContextVar::Pi),
            "M_E" => Some(ContextVar::E),
            _ => None,
        };
        if let Some(var) = context {
            return Ok(Expr::Context(var));
        }
        if !self.at_punct("(") {
            return Err(self.error(format!("unknown identifier \"{word}\"")));
        }
        self.advance();
        let mut args = Vec::new();
        if !self.eat_punct(")") {
            loop {
                args.push(self.expr()?);
                if self.eat_punct(")") {
                    break;
                }
                self.expect_punct(",")?;
            }
        }
        functions::check_arity(&word, args.len()).map_err(|message| self.error(message))?;
        Ok(Expr::Call(word, args))
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("number {n}"),
        Token::Str(s) => format!("string \"{s}\""),
        Token::Field(name) => format!("${name}"),
        Token::FullRecord => "$*".to_string(),
        Token::Oosvar(name) => format!("@{name}"),
        Token::AllOosvars => "@*".to_string(),
        Token::Ident(word) => format!("\"{word}\""),
        Token::Punct(p) => format!("'{p}'"),
        Token::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_of(src: &str) -> Vec<Statement> {
        parse_program(src).unwrap().main
    }

    #[test]
    fn test_precedence() {
        let statements = main_of("$y = 1 + 2 * 3 ** 2");
        let Statement::Assign(LValue::Field(name), Expr::Binary(BinaryOp::Plus, _, rhs)) =
            &statements[0]
        else {
            panic!("unexpected shape: {statements:?}");
        };
        assert_eq!(name, "y");
        let Expr::Binary(BinaryOp::Times, _, power) = rhs.as_ref() else {
            panic!("unexpected shape: {rhs:?}");
        };
        assert!(matches!(power.as_ref(), Expr::Binary(BinaryOp::Power, _, _)));
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let statements = main_of("-2 ** 2");
        let Statement::Bare(Expr::Unary(UnaryOp::Negate, inner)) = &statements[0] else {
            panic!("unexpected shape: {statements:?}");
        };
        assert!(matches!(inner.as_ref(), Expr::Binary(BinaryOp::Power, _, _)));
    }

    #[test]
    fn test_compound_assignment_expands() {
        let statements = main_of("@sum[$a] += $x");
        let Statement::Assign(LValue::Oosvar(name, indices), Expr::Binary(BinaryOp::Plus, ..)) =
            &statements[0]
        else {
            panic!("unexpected shape: {statements:?}");
        };
        assert_eq!(name, "sum");
        assert_eq!(indices.len(), 1);
    }

    #[test]
    fn test_blocks_and_separators() {
        let program = parse_program(
            "begin { @count = 0 } @count += 1; NR == 2 { $second = true } end { emit @count }",
        )
        .unwrap();
        assert_eq!(program.begin.len(), 1);
        assert_eq!(program.end.len(), 1);
        assert_eq!(program.main.len(), 2);
        assert!(matches!(program.main[1], Statement::Pattern(..)));
    }

    #[test]
    fn test_if_elif_else() {
        let statements = main_of("if ($x > 1) { $y = 1 } elif ($x > 0) { $y = 2 } else { $y = 3 }");
        let Statement::If(arms, Some(otherwise)) = &statements[0] else {
            panic!("unexpected shape: {statements:?}");
        };
        assert_eq!(arms.len(), 2);
        assert_eq!(otherwise.len(), 1);
    }

    #[test]
    fn test_literals() {
        let statements = main_of("$m = {\"a\": 1, \"b\": [1, 2.5]}; $h = 0xff");
        assert_eq!(statements.len(), 2);
        let Statement::Assign(_, Expr::Literal(v)) = &statements[1] else {
            panic!("unexpected shape: {statements:?}");
        };
        assert_eq!(v.as_int(), Some(255));
        assert_eq!(v.to_string(), "0xff");
    }

    #[test]
    fn test_errors() {
        assert!(parse_program("$y = ").is_err());
        assert!(parse_program("$y = 1 $z = 2").is_err());
        assert!(parse_program("1 = 2").is_err());
        assert!(parse_program("$y = nosuch(1)").is_err());
        assert!(parse_program("$y = strlen(1, 2)").is_err());
        assert!(parse_program("$y = undefined").is_err());
        assert!(parse_program("if ($x) { begin { } }").is_err());
        assert!(parse_program("emit $x").is_err());
        assert!(parse_program("$y = 1abc").is_err());
    }

    #[test]
    fn test_error_position() {
        let err = parse_program("$y = 1;\n$z = )").unwrap_err();
        assert_eq!(err.to_string(), "parse error at 2:6: unexpected ')'");
    }

    #[test]
    fn test_empty_program() {
        let program = parse_program("  # nothing\n ;; ").unwrap();
        assert!(program.main.is_empty());
    }
}
