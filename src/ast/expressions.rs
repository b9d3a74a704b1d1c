use std::fmt::Display;

use crate::{lexer::tokens::TokenKind, signatures::signatures::FunctionSignature};

use super::ast::NodeId;

/// Binary operators. Discriminants are stable and used in stub names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOperator {
    Add = 0,
    AddAssign = 1,
    Subtract = 2,
    SubtractAssign = 3,
    Multiply = 4,
    MultiplyAssign = 5,
    Divide = 6,
    DivideAssign = 7,
    Modulus = 8,
    ModulusAssign = 9,
    Assign = 10,
    BitwiseXor = 11,
    BitwiseAnd = 12,
    BitwiseOr = 13,
    LogicalOr = 14,
    LogicalAnd = 15,
    LessThan = 16,
    LessThanEqual = 17,
    GreaterThan = 18,
    GreaterThanEqual = 19,
    LeftShift = 20,
    RightShift = 21,
    Equals = 22,
    NotEquals = 23,
}

impl BinaryOperator {
    pub fn from_token(kind: TokenKind) -> Option<BinaryOperator> {
        let operator = match kind {
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::PlusEquals => BinaryOperator::AddAssign,
            TokenKind::Dash => BinaryOperator::Subtract,
            TokenKind::MinusEquals => BinaryOperator::SubtractAssign,
            TokenKind::Star => BinaryOperator::Multiply,
            TokenKind::StarEquals => BinaryOperator::MultiplyAssign,
            TokenKind::Slash => BinaryOperator::Divide,
            TokenKind::SlashEquals => BinaryOperator::DivideAssign,
            TokenKind::Percent => BinaryOperator::Modulus,
            TokenKind::PercentEquals => BinaryOperator::ModulusAssign,
            TokenKind::Assignment => BinaryOperator::Assign,
            TokenKind::BitXor => BinaryOperator::BitwiseXor,
            TokenKind::BitAnd => BinaryOperator::BitwiseAnd,
            TokenKind::BitOr => BinaryOperator::BitwiseOr,
            TokenKind::Or => BinaryOperator::LogicalOr,
            TokenKind::And => BinaryOperator::LogicalAnd,
            TokenKind::Less => BinaryOperator::LessThan,
            TokenKind::LessEquals => BinaryOperator::LessThanEqual,
            TokenKind::Greater => BinaryOperator::GreaterThan,
            TokenKind::GreaterEquals => BinaryOperator::GreaterThanEqual,
            TokenKind::LeftShift => BinaryOperator::LeftShift,
            TokenKind::RightShift => BinaryOperator::RightShift,
            TokenKind::Equals => BinaryOperator::Equals,
            TokenKind::NotEquals => BinaryOperator::NotEquals,
            _ => return None,
        };

        Some(operator)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::AddAssign => "+=",
            BinaryOperator::Subtract => "-",
            BinaryOperator::SubtractAssign => "-=",
            BinaryOperator::Multiply => "*",
            BinaryOperator::MultiplyAssign => "*=",
            BinaryOperator::Divide => "/",
            BinaryOperator::DivideAssign => "/=",
            BinaryOperator::Modulus => "%",
            BinaryOperator::ModulusAssign => "%=",
            BinaryOperator::Assign => "=",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::LogicalOr => "||",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanEqual => ">=",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// `=` and every compound assignment.
    pub fn is_assignment(&self) -> bool {
        *self == BinaryOperator::Assign || self.is_modifying_assignment()
    }

    /// Compound assignments such as `+=`.
    pub fn is_modifying_assignment(&self) -> bool {
        matches!(
            self,
            BinaryOperator::AddAssign
                | BinaryOperator::SubtractAssign
                | BinaryOperator::MultiplyAssign
                | BinaryOperator::DivideAssign
                | BinaryOperator::ModulusAssign
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr)
    }

    /// The arithmetic operator behind a compound assignment.
    pub fn underlying(&self) -> BinaryOperator {
        match self {
            BinaryOperator::AddAssign => BinaryOperator::Add,
            BinaryOperator::SubtractAssign => BinaryOperator::Subtract,
            BinaryOperator::MultiplyAssign => BinaryOperator::Multiply,
            BinaryOperator::DivideAssign => BinaryOperator::Divide,
            BinaryOperator::ModulusAssign => BinaryOperator::Modulus,
            other => *other,
        }
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOperator {
    Negate,
    Not,
    BitwiseNot,
    Increment,
    Decrement,
}

impl PrefixOperator {
    pub fn from_token(kind: TokenKind) -> Option<PrefixOperator> {
        match kind {
            TokenKind::Dash => Some(PrefixOperator::Negate),
            TokenKind::Not => Some(PrefixOperator::Not),
            TokenKind::Tilde => Some(PrefixOperator::BitwiseNot),
            TokenKind::PlusPlus => Some(PrefixOperator::Increment),
            TokenKind::MinusMinus => Some(PrefixOperator::Decrement),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            PrefixOperator::Negate => "-",
            PrefixOperator::Not => "!",
            PrefixOperator::BitwiseNot => "~",
            PrefixOperator::Increment => "++",
            PrefixOperator::Decrement => "--",
        }
    }

    pub fn is_increment_or_decrement(&self) -> bool {
        matches!(self, PrefixOperator::Increment | PrefixOperator::Decrement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostfixOperator {
    Increment,
    Decrement,
}

impl PostfixOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            PostfixOperator::Increment => "++",
            PostfixOperator::Decrement => "--",
        }
    }
}

/// Vector and rotation components reachable through `.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    X,
    Y,
    Z,
    S,
}

impl Component {
    pub fn from_name(name: &str) -> Option<Component> {
        match name {
            "x" => Some(Component::X),
            "y" => Some(Component::Y),
            "z" => Some(Component::Z),
            "s" => Some(Component::S),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Component::X => "x",
            Component::Y => "y",
            Component::Z => "z",
            Component::S => "s",
        }
    }
}

/// What a variable reference resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    #[default]
    Unresolved,
    Global(NodeId),
    Local(NodeId),
    Parameter(NodeId),
    LibraryConstant,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CallTarget {
    #[default]
    Unresolved,
    User(NodeId),
    Library(FunctionSignature),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerLiteral {
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HexLiteral {
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatLiteral {
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    /// Source text including the quotes.
    pub raw: String,
    /// Value after escape processing.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorLiteral {
    pub x: NodeId,
    pub y: NodeId,
    pub z: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RotationLiteral {
    pub x: NodeId,
    pub y: NodeId,
    pub z: NodeId,
    pub s: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListLiteral {
    pub elements: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    pub name: String,
    pub binding: Binding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: NodeId,
    pub target: CallTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: NodeId,
    pub operator: BinaryOperator,
    pub right: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrefixExpr {
    pub operator: PrefixOperator,
    pub operand: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostfixExpr {
    pub operand: NodeId,
    pub operator: PostfixOperator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypecastExpr {
    pub cast_type: super::types::LslType,
    pub operand: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParenthesizedExpr {
    pub inner: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentAccess {
    pub target: NodeId,
    pub component: Component,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(IntegerLiteral),
    Hex(HexLiteral),
    Float(FloatLiteral),
    String(StringLiteral),
    Vector(VectorLiteral),
    Rotation(RotationLiteral),
    List(ListLiteral),
    Variable(VariableRef),
    Call(FunctionCall),
    Binary(BinaryExpr),
    Prefix(PrefixExpr),
    Postfix(PostfixExpr),
    Cast(TypecastExpr),
    Parenthesized(ParenthesizedExpr),
    Component(ComponentAccess),
}

impl Expr {
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Expr::Integer(_)
            | Expr::Hex(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::Variable(_) => vec![],
            Expr::Vector(v) => vec![v.x, v.y, v.z],
            Expr::Rotation(r) => vec![r.x, r.y, r.z, r.s],
            Expr::List(l) => vec![l.elements],
            Expr::Call(c) => vec![c.arguments],
            Expr::Binary(b) => vec![b.left, b.right],
            Expr::Prefix(p) => vec![p.operand],
            Expr::Postfix(p) => vec![p.operand],
            Expr::Cast(c) => vec![c.operand],
            Expr::Parenthesized(p) => vec![p.inner],
            Expr::Component(c) => vec![c.target],
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Integer(_) | Expr::Hex(_) | Expr::Float(_) | Expr::String(_)
        )
    }
}

/// Where an expression list appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionListKind {
    FunctionArguments,
    ListLiteral,
    ForLoopInit,
    ForLoopAfterthought,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionList {
    pub kind: ExpressionListKind,
    pub expressions: Vec<NodeId>,
}
