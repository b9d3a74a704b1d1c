//! Type system definitions for the AST.
//!
//! The script language has a closed set of seven value types plus `Void`
//! for functions and calls that produce nothing. The discriminant values
//! are stable and appear in generated helper names.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum LslType {
    #[default]
    Void = 0,
    Integer = 1,
    Float = 2,
    String = 3,
    Key = 4,
    Vector = 5,
    Rotation = 6,
    List = 7,
}

impl LslType {
    pub const ALL: [LslType; 7] = [
        LslType::Integer,
        LslType::Float,
        LslType::String,
        LslType::Key,
        LslType::Vector,
        LslType::Rotation,
        LslType::List,
    ];

    /// Resolves a source-level type keyword.
    pub fn from_keyword(keyword: &str) -> Option<LslType> {
        match keyword {
            "integer" => Some(LslType::Integer),
            "float" => Some(LslType::Float),
            "string" => Some(LslType::String),
            "key" => Some(LslType::Key),
            "vector" => Some(LslType::Vector),
            "rotation" | "quaternion" => Some(LslType::Rotation),
            "list" => Some(LslType::List),
            _ => None,
        }
    }

    /// Resolves the capitalised names used by library descriptors.
    pub fn from_library_name(name: &str) -> Option<LslType> {
        match name {
            "Void" => Some(LslType::Void),
            "Integer" => Some(LslType::Integer),
            "Float" => Some(LslType::Float),
            "String" => Some(LslType::String),
            "Key" => Some(LslType::Key),
            "Vector" => Some(LslType::Vector),
            "Rotation" | "Quaternion" => Some(LslType::Rotation),
            "List" => Some(LslType::List),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            LslType::Void => "void",
            LslType::Integer => "integer",
            LslType::Float => "float",
            LslType::String => "string",
            LslType::Key => "key",
            LslType::Vector => "vector",
            LslType::Rotation => "rotation",
            LslType::List => "list",
        }
    }

    pub fn library_name(&self) -> &'static str {
        match self {
            LslType::Void => "Void",
            LslType::Integer => "Integer",
            LslType::Float => "Float",
            LslType::String => "String",
            LslType::Key => "Key",
            LslType::Vector => "Vector",
            LslType::Rotation => "Rotation",
            LslType::List => "List",
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Whether a value of type `self` may be stored in a slot of type
    /// `target` without an explicit cast.
    pub fn implicitly_converts_to(&self, target: LslType) -> bool {
        if *self == LslType::Void || target == LslType::Void {
            return false;
        }

        *self == target
            || matches!(
                (self, target),
                (LslType::Integer, LslType::Float)
                    | (LslType::String, LslType::Key)
                    | (LslType::Key, LslType::String)
            )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, LslType::Integer | LslType::Float)
    }
}

impl Display for LslType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}
