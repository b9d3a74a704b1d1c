use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    errors::errors::{SyntaxError, SyntaxErrorKind},
    Position, Span, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Token, TokenKind, RESERVED_LOOKUP};

/// Called with the text matched at the current position. Every handler
/// must advance the lexer by at least one byte.
pub type RegexHandler = fn(&mut Lexer, &str);

pub struct RegexPattern {
    regex: Regex,
    handler: RegexHandler,
}

macro_rules! pattern {
    ($regex:expr, $handler:expr) => {
        RegexPattern {
            regex: Regex::new($regex).unwrap(),
            handler: $handler,
        }
    };
}

lazy_static! {
    // Anchored patterns, tried in order. Longer operators come first.
    static ref PATTERNS: Vec<RegexPattern> = vec![
        pattern!(r"^\s+", skip_handler),
        pattern!(r"^//[^\n]*", skip_handler),
        pattern!(r"(?s)^/\*.*?\*/", skip_handler),
        pattern!(r"(?s)^/\*.*", unterminated_comment_handler),
        pattern!(r"^0[xX][0-9a-fA-F]+", hex_handler),
        pattern!(
            r"^([0-9]+\.[0-9]*([eE][+-]?[0-9]+)?|\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+)[fF]?",
            float_handler
        ),
        pattern!(r"^[0-9]+", integer_handler),
        pattern!(r#"(?s)^"(\\.|[^\\"])*""#, string_handler),
        pattern!(r#"(?s)^".*"#, unterminated_string_handler),
        pattern!(r"^[a-zA-Z_][a-zA-Z0-9_]*", symbol_handler),
        pattern!(r"^<<", MK_DEFAULT_HANDLER!(TokenKind::LeftShift, "<<")),
        pattern!(r"^>>", MK_DEFAULT_HANDLER!(TokenKind::RightShift, ">>")),
        pattern!(r"^==", MK_DEFAULT_HANDLER!(TokenKind::Equals, "==")),
        pattern!(r"^!=", MK_DEFAULT_HANDLER!(TokenKind::NotEquals, "!=")),
        pattern!(r"^<=", MK_DEFAULT_HANDLER!(TokenKind::LessEquals, "<=")),
        pattern!(r"^>=", MK_DEFAULT_HANDLER!(TokenKind::GreaterEquals, ">=")),
        pattern!(r"^\|\|", MK_DEFAULT_HANDLER!(TokenKind::Or, "||")),
        pattern!(r"^&&", MK_DEFAULT_HANDLER!(TokenKind::And, "&&")),
        pattern!(r"^\+\+", MK_DEFAULT_HANDLER!(TokenKind::PlusPlus, "++")),
        pattern!(r"^--", MK_DEFAULT_HANDLER!(TokenKind::MinusMinus, "--")),
        pattern!(r"^\+=", MK_DEFAULT_HANDLER!(TokenKind::PlusEquals, "+=")),
        pattern!(r"^-=", MK_DEFAULT_HANDLER!(TokenKind::MinusEquals, "-=")),
        pattern!(r"^\*=", MK_DEFAULT_HANDLER!(TokenKind::StarEquals, "*=")),
        pattern!(r"^/=", MK_DEFAULT_HANDLER!(TokenKind::SlashEquals, "/=")),
        pattern!(r"^%=", MK_DEFAULT_HANDLER!(TokenKind::PercentEquals, "%=")),
        pattern!(r"^\[", MK_DEFAULT_HANDLER!(TokenKind::OpenBracket, "[")),
        pattern!(r"^\]", MK_DEFAULT_HANDLER!(TokenKind::CloseBracket, "]")),
        pattern!(r"^\{", MK_DEFAULT_HANDLER!(TokenKind::OpenCurly, "{")),
        pattern!(r"^\}", MK_DEFAULT_HANDLER!(TokenKind::CloseCurly, "}")),
        pattern!(r"^\(", MK_DEFAULT_HANDLER!(TokenKind::OpenParen, "(")),
        pattern!(r"^\)", MK_DEFAULT_HANDLER!(TokenKind::CloseParen, ")")),
        pattern!(r"^=", MK_DEFAULT_HANDLER!(TokenKind::Assignment, "=")),
        pattern!(r"^!", MK_DEFAULT_HANDLER!(TokenKind::Not, "!")),
        pattern!(r"^~", MK_DEFAULT_HANDLER!(TokenKind::Tilde, "~")),
        pattern!(r"^<", MK_DEFAULT_HANDLER!(TokenKind::Less, "<")),
        pattern!(r"^>", MK_DEFAULT_HANDLER!(TokenKind::Greater, ">")),
        pattern!(r"^&", MK_DEFAULT_HANDLER!(TokenKind::BitAnd, "&")),
        pattern!(r"^\|", MK_DEFAULT_HANDLER!(TokenKind::BitOr, "|")),
        pattern!(r"^\^", MK_DEFAULT_HANDLER!(TokenKind::BitXor, "^")),
        pattern!(r"^\.", MK_DEFAULT_HANDLER!(TokenKind::Dot, ".")),
        pattern!(r"^;", MK_DEFAULT_HANDLER!(TokenKind::Semicolon, ";")),
        pattern!(r"^,", MK_DEFAULT_HANDLER!(TokenKind::Comma, ",")),
        pattern!(r"^@", MK_DEFAULT_HANDLER!(TokenKind::At, "@")),
        pattern!(r"^\+", MK_DEFAULT_HANDLER!(TokenKind::Plus, "+")),
        pattern!(r"^-", MK_DEFAULT_HANDLER!(TokenKind::Dash, "-")),
        pattern!(r"^/", MK_DEFAULT_HANDLER!(TokenKind::Slash, "/")),
        pattern!(r"^\*", MK_DEFAULT_HANDLER!(TokenKind::Star, "*")),
        pattern!(r"^%", MK_DEFAULT_HANDLER!(TokenKind::Percent, "%")),
    ];
}

pub struct Lexer {
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
    source: String,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Lexer {
        Lexer {
            tokens: vec![],
            errors: vec![],
            source: source.to_string(),
            pos: 0,
            line: 1,
            column: 0,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.pos as u32, self.line, self.column)
    }

    /// Moves forward `n` bytes, keeping line and column in step.
    pub fn advance_n(&mut self, n: usize) {
        let end = (self.pos + n).min(self.source.len());
        for ch in self.source[self.pos..end].chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.pos = end;
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn error(&mut self, error: SyntaxError) {
        self.errors.push(error);
    }

    pub fn remainder(&self) -> &str {
        &self.source[self.pos..]
    }

    pub fn at(&self) -> Option<char> {
        self.remainder().chars().next()
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Pushes a token for `matched` and steps over it.
    fn push_matched(&mut self, kind: TokenKind, matched: &str) {
        let start = self.position();
        self.advance_n(matched.len());
        let span = Span::new(start, self.position());
        self.push(MK_TOKEN!(kind, matched.to_string(), span));
    }
}

fn skip_handler(lexer: &mut Lexer, matched: &str) {
    lexer.advance_n(matched.len());
}

fn unterminated_comment_handler(lexer: &mut Lexer, matched: &str) {
    let start = lexer.position();
    lexer.advance_n(matched.len());
    let span = Span::new(start, lexer.position());
    lexer.error(SyntaxError::new(
        SyntaxErrorKind::UnterminatedComment,
        "/*",
        String::from("unterminated block comment"),
        span,
    ));
}

fn unterminated_string_handler(lexer: &mut Lexer, matched: &str) {
    let start = lexer.position();
    lexer.advance_n(matched.len());
    let span = Span::new(start, lexer.position());
    lexer.error(SyntaxError::new(
        SyntaxErrorKind::UnterminatedString,
        "\"",
        String::from("unterminated string literal"),
        span,
    ));
}

fn hex_handler(lexer: &mut Lexer, matched: &str) {
    lexer.push_matched(TokenKind::Hex, matched);
}

fn float_handler(lexer: &mut Lexer, matched: &str) {
    lexer.push_matched(TokenKind::Float, matched);
}

fn integer_handler(lexer: &mut Lexer, matched: &str) {
    lexer.push_matched(TokenKind::Integer, matched);
}

/// String tokens keep their quotes; `decode_string` produces the value.
fn string_handler(lexer: &mut Lexer, matched: &str) {
    lexer.push_matched(TokenKind::String, matched);
}

fn symbol_handler(lexer: &mut Lexer, matched: &str) {
    let kind = RESERVED_LOOKUP
        .get(matched)
        .copied()
        .unwrap_or(TokenKind::Identifier);
    lexer.push_matched(kind, matched);
}

/// Decodes the body of a quoted string literal. `\t` expands to four
/// spaces and unknown escapes keep only the escaped character.
pub fn decode_string(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);

    let mut result = String::new();
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }

        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push_str("    "),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}

/// Splits `source` into tokens. Lexical errors are collected and the
/// offending text skipped, so a token stream is always produced. The
/// stream always ends with an `EOF` token.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<SyntaxError>) {
    let mut lex = Lexer::new(source);

    while !lex.at_eof() {
        let matched = PATTERNS.iter().find_map(|pattern| {
            pattern
                .regex
                .find(lex.remainder())
                .filter(|m| m.start() == 0 && !m.is_empty())
                .map(|m| (pattern.handler, m.as_str().to_string()))
        });

        match matched {
            Some((handler, text)) => handler(&mut lex, &text),
            None => {
                let ch = lex.at().unwrap_or('\0');
                let start = lex.position();
                lex.advance_n(ch.len_utf8());
                let span = Span::new(start, lex.position());
                lex.error(SyntaxError::new(
                    SyntaxErrorKind::UnrecognisedToken,
                    &ch.to_string(),
                    format!("token recognition error at: '{}'", ch),
                    span,
                ));
            }
        }
    }

    let end = lex.position();
    lex.push(MK_TOKEN!(TokenKind::EOF, String::from("<EOF>"), Span::new(end, end)));

    log::trace!(
        "tokenized {} bytes into {} tokens ({} errors)",
        source.len(),
        lex.tokens.len(),
        lex.errors.len()
    );

    (lex.tokens, lex.errors)
}
