//! MapCSS tokenizer
//!
//! Hand-written scanner with line/column tracking. Comments are skipped,
//! numeric literals absorb their unit suffix, and regex literals are lexed
//! on demand (only the parser knows when `/` starts a regex rather than a
//! division).

use std::fmt;

use crate::color::Color;
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Number(f64),
    HexColor(Color),
    Regex(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    DoubleColon,
    Semicolon,
    Comma,
    Dot,
    Bang,
    Question,
    Eq,
    NotEq,
    RegexMatch,
    NotRegexMatch,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AndAnd,
    OrOr,
    /// The `|z` prefix of a zoom range.
    ZoomPrefix,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "'{s}'"),
            TokenKind::Str(_) => write!(f, "string"),
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::HexColor(_) => write!(f, "color"),
            TokenKind::Regex(_) => write!(f, "regex"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::DoubleColon => write!(f, "'::'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::RegexMatch => write!(f, "'=~'"),
            TokenKind::NotRegexMatch => write!(f, "'!~'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::OrOr => write!(f, "'||'"),
            TokenKind::ZoomPrefix => write!(f, "'|z'"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0, line: 1, column: 1, peeked: None }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_char2(&self) -> Option<char> {
        let mut it = self.src[self.pos..].chars();
        it.next();
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(self.line, self.column, message)
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_char2() == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek_char() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(ParseError::syntax(line, column, "unterminated comment"))
                            }
                        }
                    }
                }
                Some('/') if self.peek_char2() == Some('/') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Next token without consuming it.
    pub fn peek(&mut self) -> Result<&Token, ParseError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lex()?);
        }
        Ok(self.peeked.as_ref().expect("just set"))
    }

    /// Next token.
    pub fn next(&mut self) -> Result<Token, ParseError> {
        match self.peeked.take() {
            Some(t) => Ok(t),
            None => self.lex(),
        }
    }

    /// Lexes a `/pattern/` regex literal. Must be called only directly after
    /// consuming `=~` or `!~`, before any peek.
    pub fn next_regex(&mut self) -> Result<Token, ParseError> {
        if self.peeked.is_some() {
            return Err(self.error("internal: regex requested after lookahead"));
        }
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        if self.bump() != Some('/') {
            return Err(ParseError::syntax(line, column, "expected regex literal"));
        }
        let mut pattern = String::new();
        loop {
            match self.bump() {
                Some('/') => break,
                Some('\\') => match self.bump() {
                    // \/ unescapes to a literal slash, anything else is kept
                    // for the regex engine to interpret
                    Some('/') => pattern.push('/'),
                    Some(c) => {
                        pattern.push('\\');
                        pattern.push(c);
                    }
                    None => return Err(ParseError::syntax(line, column, "unterminated regex")),
                },
                Some(c) => pattern.push(c),
                None => return Err(ParseError::syntax(line, column, "unterminated regex")),
            }
        }
        Ok(Token { kind: TokenKind::Regex(pattern), line, column })
    }

    fn lex(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        let token = |kind| Ok(Token { kind, line, column });
        let c = match self.peek_char() {
            Some(c) => c,
            None => return token(TokenKind::Eof),
        };
        match c {
            '{' => {
                self.bump();
                token(TokenKind::LBrace)
            }
            '}' => {
                self.bump();
                token(TokenKind::RBrace)
            }
            '[' => {
                self.bump();
                token(TokenKind::LBracket)
            }
            ']' => {
                self.bump();
                token(TokenKind::RBracket)
            }
            '(' => {
                self.bump();
                token(TokenKind::LParen)
            }
            ')' => {
                self.bump();
                token(TokenKind::RParen)
            }
            ';' => {
                self.bump();
                token(TokenKind::Semicolon)
            }
            ',' => {
                self.bump();
                token(TokenKind::Comma)
            }
            '?' => {
                self.bump();
                token(TokenKind::Question)
            }
            ':' => {
                self.bump();
                if self.peek_char() == Some(':') {
                    self.bump();
                    token(TokenKind::DoubleColon)
                } else {
                    token(TokenKind::Colon)
                }
            }
            '!' => {
                self.bump();
                match self.peek_char() {
                    Some('=') => {
                        self.bump();
                        token(TokenKind::NotEq)
                    }
                    Some('~') => {
                        self.bump();
                        token(TokenKind::NotRegexMatch)
                    }
                    _ => token(TokenKind::Bang),
                }
            }
            '=' => {
                self.bump();
                match self.peek_char() {
                    Some('~') => {
                        self.bump();
                        token(TokenKind::RegexMatch)
                    }
                    Some('=') => {
                        self.bump();
                        token(TokenKind::Eq)
                    }
                    _ => token(TokenKind::Eq),
                }
            }
            '<' => {
                self.bump();
                if self.peek_char() == Some('=') {
                    self.bump();
                    token(TokenKind::Le)
                } else {
                    token(TokenKind::Lt)
                }
            }
            '>' => {
                self.bump();
                if self.peek_char() == Some('=') {
                    self.bump();
                    token(TokenKind::Ge)
                } else {
                    token(TokenKind::Gt)
                }
            }
            '+' => {
                self.bump();
                token(TokenKind::Plus)
            }
            '-' => {
                self.bump();
                token(TokenKind::Minus)
            }
            '*' => {
                self.bump();
                token(TokenKind::Star)
            }
            '/' => {
                self.bump();
                token(TokenKind::Slash)
            }
            '%' => {
                self.bump();
                token(TokenKind::Percent)
            }
            '&' => {
                self.bump();
                if self.peek_char() == Some('&') {
                    self.bump();
                    token(TokenKind::AndAnd)
                } else {
                    Err(ParseError::syntax(line, column, "expected '&&'"))
                }
            }
            '|' => {
                self.bump();
                match self.peek_char() {
                    Some('|') => {
                        self.bump();
                        token(TokenKind::OrOr)
                    }
                    Some('z') => {
                        self.bump();
                        token(TokenKind::ZoomPrefix)
                    }
                    _ => Err(ParseError::syntax(line, column, "expected '||' or '|z'")),
                }
            }
            '"' | '\'' => {
                let quote = c;
                self.bump();
                let mut s = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some('\\') => match self.bump() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(c) => s.push(c),
                            None => {
                                return Err(ParseError::syntax(line, column, "unterminated string"))
                            }
                        },
                        Some('\n') | None => {
                            return Err(ParseError::syntax(line, column, "unterminated string"))
                        }
                        Some(c) => s.push(c),
                    }
                }
                token(TokenKind::Str(s))
            }
            '#' => {
                self.bump();
                let start = self.pos;
                while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                    self.bump();
                }
                let hex = &self.src[start..self.pos];
                match Color::from_hex(&format!("#{hex}")) {
                    Some(color) => token(TokenKind::HexColor(color)),
                    None => Err(ParseError::syntax(line, column, format!("invalid color '#{hex}'"))),
                }
            }
            c if c.is_ascii_digit() || (c == '.' && self.peek_char2().is_some_and(|d| d.is_ascii_digit())) => {
                self.lex_number(line, column)
            }
            '.' => {
                self.bump();
                token(TokenKind::Dot)
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = self.pos;
                while let Some(c) = self.peek_char() {
                    if c.is_alphanumeric() || c == '_' {
                        self.bump();
                    } else if c == '-'
                        && self
                            .peek_char2()
                            .is_some_and(|d| d.is_alphanumeric() || d == '_' || d == '-')
                    {
                        self.bump();
                    } else {
                        break;
                    }
                }
                token(TokenKind::Ident(self.src[start..self.pos].to_string()))
            }
            c => Err(ParseError::syntax(line, column, format!("unexpected character '{c}'"))),
        }
    }

    fn lex_number(&mut self, line: u32, column: u32) -> Result<Token, ParseError> {
        let start = self.pos;
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek_char() == Some('.') && self.peek_char2().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = &self.src[start..self.pos];
        let value: f64 = text
            .parse()
            .map_err(|_| ParseError::syntax(line, column, format!("invalid number '{text}'")))?;
        let value = self.apply_unit(value);
        Ok(Token { kind: TokenKind::Number(value), line, column })
    }

    /// Consumes a unit suffix directly following a number, if present, and
    /// scales the value: angle units convert to radians, `%` to a fraction,
    /// `pt` to pixels.
    fn apply_unit(&mut self, value: f64) -> f64 {
        let rest = &self.src[self.pos..];
        let units: &[(&str, f64)] = &[
            ("turn", std::f64::consts::TAU),
            ("deg", std::f64::consts::PI / 180.0),
            ("\u{b0}", std::f64::consts::PI / 180.0),
            ("rad", 1.0),
            ("px", 1.0),
            ("pt", 96.0 / 72.0),
        ];
        for &(unit, factor) in units {
            if rest.starts_with(unit) {
                let after = rest[unit.len()..].chars().next();
                if !after.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-') {
                    for _ in unit.chars() {
                        self.bump();
                    }
                    return value * factor;
                }
            }
        }
        if rest.starts_with('%') {
            self.bump();
            return value / 100.0;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let t = lexer.next().unwrap();
            if t.kind == TokenKind::Eof {
                break;
            }
            out.push(t.kind);
        }
        out
    }

    #[test]
    fn test_simple_rule_tokens() {
        let toks = kinds("node[highway=crossing] { icon-image: \"a.svg\"; }");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("node".into()),
                TokenKind::LBracket,
                TokenKind::Ident("highway".into()),
                TokenKind::Eq,
                TokenKind::Ident("crossing".into()),
                TokenKind::RBracket,
                TokenKind::LBrace,
                TokenKind::Ident("icon-image".into()),
                TokenKind::Colon,
                TokenKind::Str("a.svg".into()),
                TokenKind::Semicolon,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let toks = kinds("/* c */ node // line\n way");
        assert_eq!(toks, vec![TokenKind::Ident("node".into()), TokenKind::Ident("way".into())]);
    }

    #[test]
    fn test_number_units() {
        let toks = kinds("0.5turn 90deg 50% 2px 1.5");
        let nums: Vec<f64> = toks
            .iter()
            .map(|k| match k {
                TokenKind::Number(n) => *n,
                other => panic!("not a number: {other}"),
            })
            .collect();
        assert!((nums[0] - std::f64::consts::PI).abs() < 1e-12);
        assert!((nums[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((nums[2] - 0.5).abs() < 1e-12);
        assert!((nums[3] - 2.0).abs() < 1e-12);
        assert!((nums[4] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_degree_sign_unit() {
        let toks = kinds("22.5\u{b0}; 45\u{b0}");
        assert_eq!(toks.len(), 3);
        let TokenKind::Number(n) = toks[0] else { panic!("not a number: {}", toks[0]) };
        assert!((n - 22.5_f64.to_radians()).abs() < 1e-12);
        let TokenKind::Number(n) = toks[2] else { panic!("not a number: {}", toks[2]) };
        assert!((n - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_prefix_and_operators() {
        let toks = kinds("|z12-14 >= <= != =~");
        assert_eq!(
            toks,
            vec![
                TokenKind::ZoomPrefix,
                TokenKind::Number(12.0),
                TokenKind::Minus,
                TokenKind::Number(14.0),
                TokenKind::Ge,
                TokenKind::Le,
                TokenKind::NotEq,
                TokenKind::RegexMatch,
            ]
        );
    }

    #[test]
    fn test_regex_literal() {
        let mut lexer = Lexer::new("=~ /foo\\/bar.*/ ");
        assert_eq!(lexer.next().unwrap().kind, TokenKind::RegexMatch);
        let tok = lexer.next_regex().unwrap();
        assert_eq!(tok.kind, TokenKind::Regex("foo/bar.*".into()));
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let mut lexer = Lexer::new("\"abc");
        assert!(lexer.next().is_err());
    }

    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new("node\n  way");
        let n = lexer.next().unwrap();
        assert_eq!((n.line, n.column), (1, 1));
        let w = lexer.next().unwrap();
        assert_eq!((w.line, w.column), (2, 3));
    }
}
