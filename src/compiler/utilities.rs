use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::{ast::types::LslType, errors::errors::CompilerError};

/// Helper class compiled into every script. `{LSLType.X}` placeholders are
/// replaced with the runtime type names.
const UTILITY_LIBRARY: &str = "
//============================
//== Compiler Utility Class ==
//============================
private static class UTILITIES
{
    public static void ForceStatement<T>(T val) {}

    public static bool ToBool({LSLType.String} str)
    {
        return str.Length != 0;
    }

    public static {LSLType.Rotation} Negate({LSLType.Rotation} rot)
    {
        rot.x=(-rot.x);
        rot.y=(-rot.y);
        rot.z=(-rot.z);
        rot.s=(-rot.s);
        return rot;
    }
    public static {LSLType.Vector} Negate({LSLType.Vector} vec)
    {
        vec.x=(-vec.x);
        vec.y=(-vec.y);
        vec.z=(-vec.z);
        return vec;
    }
}
";

/// Smallest positive single precision value.
const FLOAT_EPSILON: f64 = 1.401_298_464_324_817e-45;

lazy_static! {
    static ref TYPE_PLACEHOLDER: Regex = Regex::new(r"\{\s*LSLType\.([A-Za-z]+)\s*\}").unwrap();
}

/// Runtime type used for a script type. Keys become strings when
/// `key_as_string` is set.
pub fn csharp_type(ty: LslType, key_as_string: bool) -> &'static str {
    match ty {
        LslType::Vector => "LSL_Types.Vector3",
        LslType::Rotation => "LSL_Types.Quaternion",
        LslType::List => "LSL_Types.list",
        LslType::Key if key_as_string => "LSL_Types.LSLString",
        LslType::Key => "LSL_Types.key",
        LslType::Integer => "LSL_Types.LSLInteger",
        LslType::String => "LSL_Types.LSLString",
        LslType::Float => "LSL_Types.LSLFloat",
        LslType::Void => "void",
    }
}

/// Value given to declarations without an initializer and to hoisted
/// declarations.
pub fn default_initializer(ty: LslType) -> String {
    match ty {
        LslType::String | LslType::Key => String::from("\"\""),
        LslType::Integer => String::from("0"),
        LslType::Float => String::from("0.0"),
        LslType::Rotation => format!("new {}(0,0,0,1)", csharp_type(ty, false)),
        LslType::Vector => format!("new {}(0,0,0)", csharp_type(ty, false)),
        _ => format!("new {}()", csharp_type(ty, false)),
    }
}

/// The utility class with its type placeholders filled in.
pub fn utility_library() -> Result<String, CompilerError> {
    let mut error = None;

    let text = TYPE_PLACEHOLDER.replace_all(UTILITY_LIBRARY, |captures: &Captures| {
        match LslType::from_library_name(&captures[1]) {
            Some(ty) => csharp_type(ty, false).to_string(),
            None => {
                error = Some(CompilerError::Internal(format!(
                    "unexpected type placeholder {:?} in the utility library",
                    &captures[1]
                )));
                String::new()
            }
        }
    });

    match error {
        Some(error) => Err(error),
        None => Ok(text.into_owned()),
    }
}

/// Escapes processed string contents into a quoted target literal.
pub fn string_code_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralOverflow {
    None,
    Overflow,
    Underflow,
}

/// Decimal integer literals must fit a signed 32 bit integer. The sign is a
/// separate operator, so `-2147483648` overflows as well.
pub fn integer_overflow(raw: &str) -> LiteralOverflow {
    match raw.parse::<i32>() {
        Ok(_) => LiteralOverflow::None,
        Err(_) => LiteralOverflow::Overflow,
    }
}

/// Hex literals wrap in 32 bits, so only values wider than 32 bits overflow.
pub fn hex_overflow(raw: &str) -> LiteralOverflow {
    let digits = raw.trim_start_matches("0x").trim_start_matches("0X");

    match u64::from_str_radix(digits, 16) {
        Ok(value) if value <= u32::MAX as u64 => LiteralOverflow::None,
        _ => LiteralOverflow::Overflow,
    }
}

fn float_digits(raw: &str) -> &str {
    raw.trim_end_matches(['f', 'F'])
}

/// Floats are single precision: too large is infinity, too small is zero.
pub fn float_overflow(raw: &str) -> LiteralOverflow {
    match float_digits(raw).parse::<f64>() {
        Ok(value) if value.is_infinite() || value > f32::MAX as f64 => LiteralOverflow::Overflow,
        Ok(value) if value != 0.0 && value < FLOAT_EPSILON => LiteralOverflow::Underflow,
        Ok(_) => LiteralOverflow::None,
        Err(_) => LiteralOverflow::Overflow,
    }
}

/// Rewrites a script float literal into a form the target accepts:
/// `1.` becomes `1.0`, `.5` becomes `0.5` and the `f` suffix is dropped.
pub fn format_float(raw: &str) -> String {
    let digits = float_digits(raw);

    let (mantissa, exponent) = match digits.find(['e', 'E']) {
        Some(index) => digits.split_at(index),
        None => (digits, ""),
    };

    let mut mantissa = mantissa.to_string();
    if mantissa.starts_with('.') {
        mantissa.insert(0, '0');
    }
    if mantissa.ends_with('.') {
        mantissa.push('0');
    }
    if !mantissa.contains('.') {
        mantissa.push_str(".0");
    }

    format!("{}{}", mantissa, exponent)
}

/// Kind of literal being emitted, for boxing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Integer,
    Hex,
    Float,
    String,
}

/// What directly holds a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralParent {
    /// Operand of a binary operator that goes through a stub or assignment.
    Operator,
    /// Operand of `&&` or `||`.
    LogicalOperator,
    VectorOrRotation,
    /// Argument of a call. `mod_invoke` is set for library functions invoked
    /// through `modInvoke`.
    CallArgument { mod_invoke: bool },
    VariableInitializer,
    Other,
}

/// Whether a literal must be wrapped in its runtime type's constructor.
pub fn should_box(literal: LiteralKind, parent: LiteralParent) -> bool {
    use LiteralKind::*;
    use LiteralParent::*;

    match (literal, parent) {
        (_, Operator) => false,
        (_, LogicalOperator) => true,

        (Hex, _) => true,

        (Integer | Float, VectorOrRotation) => false,
        (Integer | Float, CallArgument { mod_invoke }) => mod_invoke,
        (Integer | Float, VariableInitializer | Other) => true,

        (String, CallArgument { mod_invoke }) => mod_invoke,
        (String, VariableInitializer) => false,
        (String, VectorOrRotation | Other) => true,
    }
}

/// `modInvoke` entry point for a return type.
pub fn mod_invoke_function(return_type: LslType) -> &'static str {
    match return_type {
        LslType::Void => "modInvokeN",
        LslType::String => "modInvokeS",
        LslType::Integer => "modInvokeI",
        LslType::Float => "modInvokeF",
        LslType::Key => "modInvokeK",
        LslType::List => "modInvokeL",
        LslType::Vector => "modInvokeV",
        LslType::Rotation => "modInvokeR",
    }
}

/// Formats seconds since the Unix epoch as `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_timestamp(seconds: u64) -> String {
    let time_of_day = seconds % 86_400;
    let (year, month, day) = days_to_date(seconds / 86_400);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        time_of_day / 3_600,
        (time_of_day % 3_600) / 60,
        time_of_day % 60
    )
}

fn days_to_date(mut days: u64) -> (u64, u64, u64) {
    let mut year = 1970;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let february = if is_leap_year(year) { 29 } else { 28 };
    let month_lengths = [31, february, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

    let mut month = 1;
    for length in month_lengths {
        if days < length {
            break;
        }
        days -= length;
        month += 1;
    }

    (year, month, days + 1)
}

fn is_leap_year(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
