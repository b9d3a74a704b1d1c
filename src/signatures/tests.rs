//! Unit tests for signatures.

use std::collections::HashSet;

use crate::ast::types::LslType;
use crate::errors::errors::CompilerError;

use super::signatures::{
    validate_identifier, ConstantSignature, EventSignature, FunctionSignature, ParameterSignature,
};

fn param(name: &str, ty: LslType) -> ParameterSignature {
    ParameterSignature::new(name, ty, false, 0)
}

#[test]
fn test_identifier_rules() {
    assert!(validate_identifier("llSay").is_ok());
    assert!(validate_identifier("_hidden1").is_ok());
    assert!(matches!(
        validate_identifier("1abc"),
        Err(CompilerError::InvalidSymbolName { .. })
    ));
    assert!(validate_identifier("has space").is_err());
    assert!(validate_identifier("").is_err());
}

#[test]
fn test_signature_matches_ignores_parameter_names() {
    let a = EventSignature::with_parameters("touch_start", vec![param("num", LslType::Integer)])
        .unwrap();
    let b =
        EventSignature::with_parameters("touch_start", vec![param("total", LslType::Integer)])
            .unwrap();
    let c = EventSignature::with_parameters("touch_start", vec![param("num", LslType::Float)])
        .unwrap();

    assert!(a.signature_matches(&b));
    assert_eq!(a, b);
    assert!(!a.signature_matches(&c));

    let mut set = HashSet::new();
    set.insert(a);
    assert!(set.contains(&b));
    assert!(!set.contains(&c));
}

#[test]
fn test_event_rejects_void_parameter() {
    let result = EventSignature::with_parameters("timer", vec![param("x", LslType::Void)]);
    assert!(matches!(result, Err(CompilerError::InvalidSignature(_))));
}

#[test]
fn test_event_rejects_variadic_parameter() {
    let result = EventSignature::with_parameters(
        "timer",
        vec![ParameterSignature::new("rest", LslType::Integer, true, 0)],
    );
    assert!(result.is_err());
}

#[test]
fn test_event_rejects_bad_name() {
    assert!(matches!(
        EventSignature::new("9lives"),
        Err(CompilerError::InvalidSymbolName { .. })
    ));
}

#[test]
fn test_duplicate_parameter_names() {
    let result = FunctionSignature::with_parameters(
        LslType::Void,
        "f",
        vec![param("a", LslType::Integer), param("a", LslType::Float)],
    );
    assert!(result.is_err());
}

#[test]
fn test_parameter_indices_are_assigned() {
    let signature = FunctionSignature::with_parameters(
        LslType::Integer,
        "f",
        vec![param("a", LslType::Integer), param("b", LslType::String)],
    )
    .unwrap();

    assert_eq!(signature.parameters()[0].index, 0);
    assert_eq!(signature.parameters()[1].index, 1);
}

#[test]
fn test_variadic_must_be_last() {
    let mut signature = FunctionSignature::new(LslType::Void, "f").unwrap();
    signature
        .add_parameter(ParameterSignature::new("rest", LslType::Void, true, 0))
        .unwrap();

    assert!(signature.has_variadic_parameter());
    assert!(signature.add_parameter(param("b", LslType::Integer)).is_err());
}

#[test]
fn test_function_accepts() {
    let signature = FunctionSignature::parse("float llPow(float base, float exponent)").unwrap();

    assert!(signature.accepts(&[LslType::Float, LslType::Float], true));
    assert!(!signature.accepts(&[LslType::Integer, LslType::Float], true));
    assert!(signature.accepts(&[LslType::Integer, LslType::Float], false));
    assert!(!signature.accepts(&[LslType::Float], false));
}

#[test]
fn test_variadic_accepts() {
    let signature = FunctionSignature::parse("list osList(string first, any... rest)").unwrap();

    assert!(signature.has_variadic_parameter());
    assert_eq!(signature.concrete_parameter_count(), 1);
    assert!(signature.accepts(&[LslType::String], false));
    assert!(signature.accepts(&[LslType::Key, LslType::Vector, LslType::List], false));
    assert!(!signature.accepts(&[], false));
}

#[test]
fn test_parse_event_signature() {
    let signature = EventSignature::parse("listen(integer channel, string name, key id, string message)")
        .unwrap();

    assert_eq!(signature.name(), "listen");
    assert_eq!(
        signature.parameter_types(),
        vec![LslType::Integer, LslType::String, LslType::Key, LslType::String]
    );
    assert_eq!(
        signature.signature_string(),
        "listen(integer channel, string name, key id, string message)"
    );
}

#[test]
fn test_parse_function_signature() {
    let signature = FunctionSignature::parse("llSay(integer channel, string text);").unwrap();
    assert_eq!(signature.return_type(), LslType::Void);
    assert_eq!(signature.signature_string(), "llSay(integer channel, string text)");

    let signature = FunctionSignature::parse("quaternion llEuler2Rot(vector v)").unwrap();
    assert_eq!(signature.return_type(), LslType::Rotation);

    assert!(FunctionSignature::parse("integer 2fast()").is_err());
    assert!(FunctionSignature::parse("widget f()").is_err());
}

#[test]
fn test_constant_signature() {
    let constant = ConstantSignature::new(LslType::Integer, "TRUE", "1").unwrap();
    assert_eq!(constant.signature_string(), "integer TRUE = 1;");

    assert!(ConstantSignature::new(LslType::Void, "NOTHING", "").is_err());
}
