//! Tokenizer for `put`/`filter` expressions.

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Number literal, kept as written.
    Number(String),
    Str(String),
    /// `$name` or `${name}`.
    Field(String),
    /// `$*`
    FullRecord,
    /// `@name`
    Oosvar(String),
    /// `@*`
    AllOosvars,
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Longest first, so `**=` wins over `**` and `*`.
const PUNCTUATION: &[&str] = &[
    "**=", "//=", "!=~", "&&=", "||=", "??", "**", "//", "==", "!=", "<=", ">=", "&&", "||", "^^",
    "=~", "+=", "-=", "*=", "/=", "%=", ".=", "+", "-", "*", "/", "%", ".", "<", ">", "!", "=",
    "?", ":", "(", ")", "{", "}", "[", "]", ",", ";",
];

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Lexer<'a> {
    fn error(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::Script {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    self.take_while(|c| c != '\n');
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    // Regex escapes such as \d and \. pass through.
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> String {
        let start = self.pos;
        let mut prev = ' ';
        let hex = self.src[self.pos..].starts_with("0x") || self.src[self.pos..].starts_with("0X");
        while let Some(c) = self.peek() {
            let exponent_sign = !hex && (c == '+' || c == '-') && (prev == 'e' || prev == 'E');
            if is_name_char(c) || c == '.' || exponent_sign {
                prev = c;
                self.bump();
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    fn next_token(&mut self) -> Result<Spanned> {
        self.skip_trivia();
        let (line, column) = (self.line, self.column);
        let spanned = |token| Ok(Spanned {
            token,
            line,
            column,
        });
        let Some(c) = self.peek() else {
            return spanned(Token::Eof);
        };

        if c == '"' {
            let s = self.string()?;
            return spanned(Token::Str(s));
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_second().is_some_and(|d| d.is_ascii_digit())) {
            let n = self.number();
            return spanned(Token::Number(n));
        }
        if c == '$' || c == '@' {
            self.bump();
            match self.peek() {
                Some('*') => {
                    self.bump();
                    return spanned(if c == '$' { Token::FullRecord } else { Token::AllOosvars });
                }
                Some('{') => {
                    self.bump();
                    let name = self.take_while(|c| c != '}').to_string();
                    if self.bump() != Some('}') {
                        return Err(self.error("unterminated ${...} name"));
                    }
                    return spanned(if c == '$' { Token::Field(name) } else { Token::Oosvar(name) });
                }
                _ => {
                    let name = self.take_while(is_name_char).to_string();
                    if name.is_empty() {
                        return Err(self.error(format!("expected a name after '{c}'")));
                    }
                    return spanned(if c == '$' { Token::Field(name) } else { Token::Oosvar(name) });
                }
            }
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let name = self.take_while(is_name_char).to_string();
            return spanned(Token::Ident(name));
        }
        let rest = &self.src[self.pos..];
        if let Some(p) = PUNCTUATION.iter().find(|p| rest.starts_with(**p)) {
            for _ in 0..p.len() {
                self.bump();
            }
            return spanned(Token::Punct(p));
        }
        Err(self.error(format!("unexpected character '{c}'")))
    }
}

/// Split an expression into tokens, ending with [`Token::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Spanned>> {
    let mut lexer = Lexer {
        src,
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();
    loop {
        let t = lexer.next_token()?;
        let end = t.token == Token::Eof;
        tokens.push(t);
        if end {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_fields_and_operators() {
        assert_eq!(
            kinds("$y=$i*2"),
            vec![
                Token::Field("y".into()),
                Token::Punct("="),
                Token::Field("i".into()),
                Token::Punct("*"),
                Token::Number("2".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_longest_punctuation_wins() {
        assert_eq!(
            kinds("$x **= 2 // 3 !=~ \"a\""),
            vec![
                Token::Field("x".into()),
                Token::Punct("**="),
                Token::Number("2".into()),
                Token::Punct("//"),
                Token::Number("3".into()),
                Token::Punct("!=~"),
                Token::Str("a".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("1.5e-3")[0], Token::Number("1.5e-3".into()));
        assert_eq!(kinds("0xff")[0], Token::Number("0xff".into()));
        assert_eq!(kinds(".5")[0], Token::Number(".5".into()));
        assert_eq!(
            kinds("0xe-1"),
            vec![
                Token::Number("0xe".into()),
                Token::Punct("-"),
                Token::Number("1".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_braced_names_and_specials() {
        assert_eq!(
            kinds("${a b} @count @* $* # comment\nNR"),
            vec![
                Token::Field("a b".into()),
                Token::Oosvar("count".into()),
                Token::AllOosvars,
                Token::FullRecord,
                Token::Ident("NR".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r#""a\"b\n\d""#)[0], Token::Str("a\"b\n\\d".into()));
    }

    #[test]
    fn test_positions_and_errors() {
        let tokens = tokenize("$a\n  + 1").unwrap();
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
        let err = tokenize("$a ~ 1").unwrap_err();
        assert_eq!(err.to_string(), "parse error at 1:4: unexpected character '~'");
        assert!(tokenize("\"open").is_err());
    }
}
