use lazy_static::lazy_static;
use std::{collections::HashMap, fmt::Display};

use crate::Span;

lazy_static! {
    pub static ref RESERVED_LOOKUP: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("default", TokenKind::Default);
        map.insert("state", TokenKind::State);
        map.insert("jump", TokenKind::Jump);
        map.insert("return", TokenKind::Return);
        map.insert("if", TokenKind::If);
        map.insert("else", TokenKind::Else);
        map.insert("for", TokenKind::For);
        map.insert("do", TokenKind::Do);
        map.insert("while", TokenKind::While);
        map.insert("integer", TokenKind::Type);
        map.insert("float", TokenKind::Type);
        map.insert("string", TokenKind::Type);
        map.insert("key", TokenKind::Type);
        map.insert("vector", TokenKind::Type);
        map.insert("rotation", TokenKind::Type);
        map.insert("quaternion", TokenKind::Type);
        map.insert("list", TokenKind::Type);
        map
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    EOF,
    Integer,
    Hex,
    Float,
    String,
    Identifier,
    /// Any type keyword; the keyword itself is the token value.
    Type,

    OpenBracket,
    CloseBracket,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,

    Assignment, // =
    Equals,     // ==
    Not,        // !
    NotEquals,  // !=
    Tilde,      // ~

    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    LeftShift,
    RightShift,

    Or,
    And,
    BitAnd,
    BitOr,
    BitXor,

    Dot,
    Semicolon,
    Comma,
    At,

    PlusPlus,
    MinusMinus,
    PlusEquals,
    MinusEquals,
    StarEquals,
    SlashEquals,
    PercentEquals,

    Plus,
    Dash,
    Slash,
    Star,
    Percent,

    // Reserved
    Default,
    State,
    Jump,
    Return,
    If,
    Else,
    For,
    Do,
    While,
}

impl TokenKind {
    /// Name used when listing expected tokens in grammar errors.
    pub fn grammar_name(&self) -> &'static str {
        match self {
            TokenKind::EOF => "<EOF>",
            TokenKind::Integer => "INT",
            TokenKind::Hex => "HEX_LITERAL",
            TokenKind::Float => "FLOAT",
            TokenKind::String => "QUOTED_STRING",
            TokenKind::Identifier => "ID",
            TokenKind::Type => "TYPE",
            TokenKind::OpenBracket => "'['",
            TokenKind::CloseBracket => "']'",
            TokenKind::OpenCurly => "'{'",
            TokenKind::CloseCurly => "'}'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::Assignment => "'='",
            TokenKind::Equals => "'=='",
            TokenKind::Not => "'!'",
            TokenKind::NotEquals => "'!='",
            TokenKind::Tilde => "'~'",
            TokenKind::Less => "'<'",
            TokenKind::LessEquals => "'<='",
            TokenKind::Greater => "'>'",
            TokenKind::GreaterEquals => "'>='",
            TokenKind::LeftShift => "'<<'",
            TokenKind::RightShift => "'>>'",
            TokenKind::Or => "'||'",
            TokenKind::And => "'&&'",
            TokenKind::BitAnd => "'&'",
            TokenKind::BitOr => "'|'",
            TokenKind::BitXor => "'^'",
            TokenKind::Dot => "'.'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::At => "'@'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::PlusEquals => "'+='",
            TokenKind::MinusEquals => "'-='",
            TokenKind::StarEquals => "'*='",
            TokenKind::SlashEquals => "'/='",
            TokenKind::PercentEquals => "'%='",
            TokenKind::Plus => "'+'",
            TokenKind::Dash => "'-'",
            TokenKind::Slash => "'/'",
            TokenKind::Star => "'*'",
            TokenKind::Percent => "'%'",
            TokenKind::Default => "'default'",
            TokenKind::State => "'state'",
            TokenKind::Jump => "'jump'",
            TokenKind::Return => "'return'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::For => "'for'",
            TokenKind::Do => "'do'",
            TokenKind::While => "'while'",
        }
    }

    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            TokenKind::Assignment
                | TokenKind::PlusEquals
                | TokenKind::MinusEquals
                | TokenKind::StarEquals
                | TokenKind::SlashEquals
                | TokenKind::PercentEquals
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.kind == TokenKind::EOF {
            write!(f, "<EOF>")
        } else {
            write!(f, "{}", self.value)
        }
    }
}

impl Token {
    pub fn is_one_of_many(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }
}
