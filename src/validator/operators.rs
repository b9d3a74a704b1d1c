use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::ast::{
    expressions::{BinaryOperator, PostfixOperator, PrefixOperator},
    types::LslType,
};

use LslType::{Float, Integer, Key, List, Rotation, String, Vector};

type BinaryKey = (LslType, BinaryOperator, LslType);

fn arithmetic_rules() -> Vec<(LslType, BinaryOperator, LslType, LslType)> {
    use BinaryOperator::*;

    let mut rules = vec![
        (Integer, Add, Integer, Integer),
        (Integer, Add, Float, Float),
        (Float, Add, Integer, Float),
        (Float, Add, Float, Float),
        (String, Add, String, String),
        (Vector, Add, Vector, Vector),
        (Rotation, Add, Rotation, Rotation),
        (Integer, Subtract, Integer, Integer),
        (Integer, Subtract, Float, Float),
        (Float, Subtract, Integer, Float),
        (Float, Subtract, Float, Float),
        (Vector, Subtract, Vector, Vector),
        (Rotation, Subtract, Rotation, Rotation),
        (Integer, Multiply, Integer, Integer),
        (Integer, Multiply, Float, Float),
        (Float, Multiply, Integer, Float),
        (Float, Multiply, Float, Float),
        (Vector, Multiply, Float, Vector),
        (Vector, Multiply, Integer, Vector),
        (Float, Multiply, Vector, Vector),
        (Integer, Multiply, Vector, Vector),
        (Vector, Multiply, Vector, Float),
        (Vector, Multiply, Rotation, Vector),
        (Rotation, Multiply, Rotation, Rotation),
        (Integer, Divide, Integer, Integer),
        (Integer, Divide, Float, Float),
        (Float, Divide, Integer, Float),
        (Float, Divide, Float, Float),
        (Vector, Divide, Float, Vector),
        (Vector, Divide, Integer, Vector),
        (Vector, Divide, Rotation, Vector),
        (Rotation, Divide, Rotation, Rotation),
        (Integer, Modulus, Integer, Integer),
        (Vector, Modulus, Vector, Vector),
    ];

    // Anything joins a list.
    for ty in [Integer, Float, String, Key, Vector, Rotation] {
        rules.push((List, Add, ty, List));
        rules.push((ty, Add, List, List));
    }
    rules.push((List, Add, List, List));

    rules
}

fn comparison_rules() -> Vec<(LslType, BinaryOperator, LslType, LslType)> {
    use BinaryOperator::*;

    let mut rules = vec![];
    for operator in [Equals, NotEquals] {
        for (left, right) in [
            (Integer, Integer),
            (Integer, Float),
            (Float, Integer),
            (Float, Float),
            (String, String),
            (String, Key),
            (Key, String),
            (Key, Key),
            (Vector, Vector),
            (Rotation, Rotation),
            (List, List),
        ] {
            rules.push((left, operator, right, Integer));
        }
    }

    for operator in [LessThan, LessThanEqual, GreaterThan, GreaterThanEqual] {
        for (left, right) in [
            (Integer, Integer),
            (Integer, Float),
            (Float, Integer),
            (Float, Float),
        ] {
            rules.push((left, operator, right, Integer));
        }
    }

    for operator in [
        LogicalAnd,
        LogicalOr,
        BitwiseAnd,
        BitwiseOr,
        BitwiseXor,
        LeftShift,
        RightShift,
    ] {
        rules.push((Integer, operator, Integer, Integer));
    }

    rules
}

lazy_static! {
    static ref BINARY_OPERATIONS: HashMap<BinaryKey, LslType> = {
        let mut table = HashMap::new();
        for (left, operator, right, result) in arithmetic_rules()
            .into_iter()
            .chain(comparison_rules())
        {
            table.insert((left, operator, right), result);
        }
        table
    };
}

/// Result type of `left operator right` for non-assignment operators.
pub fn binary_result(left: LslType, operator: BinaryOperator, right: LslType) -> Option<LslType> {
    BINARY_OPERATIONS.get(&(left, operator, right)).copied()
}

/// Result type of an assignment, which is always the type of the target.
pub fn assignment_result(
    left: LslType,
    operator: BinaryOperator,
    right: LslType,
) -> Option<LslType> {
    if left == LslType::Void || right == LslType::Void {
        return None;
    }

    if operator == BinaryOperator::Assign {
        return right.implicitly_converts_to(left).then_some(left);
    }

    // integer *= float is accepted and rounds back to an integer.
    if operator == BinaryOperator::MultiplyAssign && left == Integer && right == Float {
        return Some(Integer);
    }

    let result = binary_result(left, operator.underlying(), right)?;
    result.implicitly_converts_to(left).then_some(left)
}

pub fn prefix_result(operator: PrefixOperator, operand: LslType) -> Option<LslType> {
    match (operator, operand) {
        (PrefixOperator::Negate, Integer | Float | Vector | Rotation) => Some(operand),
        (PrefixOperator::Not | PrefixOperator::BitwiseNot, Integer) => Some(Integer),
        (PrefixOperator::Increment | PrefixOperator::Decrement, Integer | Float) => Some(operand),
        _ => None,
    }
}

pub fn postfix_result(_operator: PostfixOperator, operand: LslType) -> Option<LslType> {
    match operand {
        Integer | Float => Some(operand),
        _ => None,
    }
}

/// Whether an explicit `(to)from` cast is allowed.
pub fn is_valid_cast(from: LslType, to: LslType) -> bool {
    if from == to {
        return from != LslType::Void;
    }

    match from {
        Integer | Float => matches!(to, Integer | Float | String | List),
        String => to != LslType::Void,
        Key => matches!(to, String | List),
        Vector | Rotation => matches!(to, String | List),
        List => to == String,
        LslType::Void => false,
    }
}

/// Whether values of this type may be stored in a list literal.
pub fn is_valid_list_element(ty: LslType) -> bool {
    !matches!(ty, LslType::Void | LslType::List)
}
