use std::{
    fmt::Display,
    hash::{Hash, Hasher},
};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{ast::types::LslType, errors::errors::CompilerError};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
    static ref EVENT_SIGNATURE: Regex =
        Regex::new(r"^\s*([^\s(]+)\s*\((.*)\)\s*;?\s*$").unwrap();
    static ref FUNCTION_SIGNATURE: Regex =
        Regex::new(r"^\s*(?:([a-zA-Z]+)\s+)?([^\s(]+)\s*\((.*)\)\s*;?\s*$").unwrap();
    static ref PARAMETER: Regex =
        Regex::new(r"^\s*([a-zA-Z]+)\s*(\.\.\.)?\s+([^\s,]+)\s*$").unwrap();
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Fails with `InvalidSymbolName` unless `name` is a letter or underscore
/// followed by letters, digits and underscores.
pub fn validate_identifier(name: &str) -> Result<(), CompilerError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(CompilerError::InvalidSymbolName {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSignature {
    pub name: String,
    /// `Void` on a variadic parameter accepts any type.
    pub ty: LslType,
    pub variadic: bool,
    pub index: usize,
}

impl ParameterSignature {
    pub fn new(name: &str, ty: LslType, variadic: bool, index: usize) -> Self {
        ParameterSignature {
            name: name.to_string(),
            ty,
            variadic,
            index,
        }
    }

    fn signature_string(&self) -> String {
        let ty = if self.variadic && self.ty == LslType::Void {
            "any"
        } else {
            self.ty.keyword()
        };

        if self.variadic {
            format!("{}... {}", ty, self.name)
        } else {
            format!("{} {}", ty, self.name)
        }
    }
}

fn parse_parameters(text: &str) -> Result<Vec<ParameterSignature>, CompilerError> {
    if text.trim().is_empty() {
        return Ok(vec![]);
    }

    text.split(',')
        .enumerate()
        .map(|(index, part)| {
            let captures = PARAMETER.captures(part).ok_or_else(|| {
                CompilerError::InvalidSignature(format!("malformed parameter {:?}", part.trim()))
            })?;
            let variadic = captures.get(2).is_some();
            let type_name = &captures[1];
            let ty = match LslType::from_keyword(type_name) {
                Some(ty) => ty,
                None if variadic && type_name == "any" => LslType::Void,
                None if type_name == "void" => LslType::Void,
                None => {
                    return Err(CompilerError::InvalidSignature(format!(
                        "unknown parameter type {:?}",
                        type_name
                    )))
                }
            };

            Ok(ParameterSignature::new(&captures[3], ty, variadic, index))
        })
        .collect()
}

/// Event handler signature. Events take no `Void` and no variadic parameters.
#[derive(Debug, Clone)]
pub struct EventSignature {
    name: String,
    parameters: Vec<ParameterSignature>,
}

impl EventSignature {
    pub fn new(name: &str) -> Result<Self, CompilerError> {
        validate_identifier(name)?;

        Ok(EventSignature {
            name: name.to_string(),
            parameters: vec![],
        })
    }

    pub fn with_parameters(
        name: &str,
        parameters: Vec<ParameterSignature>,
    ) -> Result<Self, CompilerError> {
        let mut signature = EventSignature::new(name)?;
        for parameter in parameters {
            signature.add_parameter(parameter)?;
        }
        Ok(signature)
    }

    pub fn add_parameter(&mut self, mut parameter: ParameterSignature) -> Result<(), CompilerError> {
        validate_identifier(&parameter.name)?;

        if parameter.variadic {
            return Err(CompilerError::InvalidSignature(format!(
                "event handler {:?} cannot have variadic parameter {:?}",
                self.name, parameter.name
            )));
        }
        if parameter.ty == LslType::Void {
            return Err(CompilerError::InvalidSignature(format!(
                "event handler {:?} parameter {:?} cannot be void",
                self.name, parameter.name
            )));
        }
        if self.parameters.iter().any(|p| p.name == parameter.name) {
            return Err(CompilerError::InvalidSignature(format!(
                "event handler {:?} declares parameter {:?} twice",
                self.name, parameter.name
            )));
        }

        parameter.index = self.parameters.len();
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ParameterSignature] {
        &self.parameters
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_types(&self) -> Vec<LslType> {
        self.parameters.iter().map(|p| p.ty).collect()
    }

    /// Same name and same parameter types in order.
    pub fn signature_matches(&self, other: &EventSignature) -> bool {
        self.name == other.name
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(other.parameters.iter())
                .all(|(a, b)| a.ty == b.ty)
    }

    pub fn signature_string(&self) -> String {
        let parameters: Vec<String> = self
            .parameters
            .iter()
            .map(|p| p.signature_string())
            .collect();
        format!("{}({})", self.name, parameters.join(", "))
    }

    /// Parses text such as `touch_start(integer num_detected)`.
    pub fn parse(text: &str) -> Result<Self, CompilerError> {
        let captures = EVENT_SIGNATURE.captures(text).ok_or_else(|| {
            CompilerError::InvalidSignature(format!("malformed event signature {:?}", text))
        })?;

        EventSignature::with_parameters(&captures[1], parse_parameters(&captures[2])?)
    }
}

impl PartialEq for EventSignature {
    fn eq(&self, other: &Self) -> bool {
        self.signature_matches(other)
    }
}

impl Eq for EventSignature {}

impl Hash for EventSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for parameter in &self.parameters {
            parameter.ty.hash(state);
        }
    }
}

impl Display for EventSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.signature_string())
    }
}

/// Function signature. A single trailing variadic parameter is allowed.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    name: String,
    return_type: LslType,
    parameters: Vec<ParameterSignature>,
}

impl FunctionSignature {
    pub fn new(return_type: LslType, name: &str) -> Result<Self, CompilerError> {
        validate_identifier(name)?;

        Ok(FunctionSignature {
            name: name.to_string(),
            return_type,
            parameters: vec![],
        })
    }

    pub fn with_parameters(
        return_type: LslType,
        name: &str,
        parameters: Vec<ParameterSignature>,
    ) -> Result<Self, CompilerError> {
        let mut signature = FunctionSignature::new(return_type, name)?;
        for parameter in parameters {
            signature.add_parameter(parameter)?;
        }
        Ok(signature)
    }

    pub fn add_parameter(&mut self, mut parameter: ParameterSignature) -> Result<(), CompilerError> {
        validate_identifier(&parameter.name)?;

        if self.has_variadic_parameter() {
            return Err(CompilerError::InvalidSignature(format!(
                "function {:?} has parameters after its variadic parameter",
                self.name
            )));
        }
        if parameter.ty == LslType::Void && !parameter.variadic {
            return Err(CompilerError::InvalidSignature(format!(
                "function {:?} parameter {:?} cannot be void",
                self.name, parameter.name
            )));
        }
        if self.parameters.iter().any(|p| p.name == parameter.name) {
            return Err(CompilerError::InvalidSignature(format!(
                "function {:?} declares parameter {:?} twice",
                self.name, parameter.name
            )));
        }

        parameter.index = self.parameters.len();
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> LslType {
        self.return_type
    }

    pub fn parameters(&self) -> &[ParameterSignature] {
        &self.parameters
    }

    pub fn has_variadic_parameter(&self) -> bool {
        self.parameters.last().map(|p| p.variadic).unwrap_or(false)
    }

    /// Number of parameters excluding the variadic tail.
    pub fn concrete_parameter_count(&self) -> usize {
        if self.has_variadic_parameter() {
            self.parameters.len() - 1
        } else {
            self.parameters.len()
        }
    }

    /// Whether arguments of the given types can be passed. With `exact`
    /// set, no implicit conversions are applied.
    pub fn accepts(&self, argument_types: &[LslType], exact: bool) -> bool {
        let concrete = self.concrete_parameter_count();
        let arity_ok = if self.has_variadic_parameter() {
            argument_types.len() >= concrete
        } else {
            argument_types.len() == concrete
        };
        if !arity_ok {
            return false;
        }

        let converts = |from: LslType, to: LslType| {
            if exact {
                from == to
            } else {
                from.implicitly_converts_to(to)
            }
        };

        argument_types.iter().enumerate().all(|(index, ty)| {
            if index < concrete {
                converts(*ty, self.parameters[index].ty)
            } else {
                let variadic = &self.parameters[concrete];
                *ty != LslType::Void && (variadic.ty == LslType::Void || converts(*ty, variadic.ty))
            }
        })
    }

    pub fn signature_matches(&self, other: &FunctionSignature) -> bool {
        self.name == other.name
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(other.parameters.iter())
                .all(|(a, b)| a.ty == b.ty && a.variadic == b.variadic)
    }

    pub fn signature_string(&self) -> String {
        let parameters: Vec<String> = self
            .parameters
            .iter()
            .map(|p| p.signature_string())
            .collect();

        if self.return_type == LslType::Void {
            format!("{}({})", self.name, parameters.join(", "))
        } else {
            format!("{} {}({})", self.return_type, self.name, parameters.join(", "))
        }
    }

    /// Parses text such as `integer llAbs(integer value)`.
    pub fn parse(text: &str) -> Result<Self, CompilerError> {
        let captures = FUNCTION_SIGNATURE.captures(text).ok_or_else(|| {
            CompilerError::InvalidSignature(format!("malformed function signature {:?}", text))
        })?;

        let return_type = match captures.get(1) {
            Some(ty) => LslType::from_keyword(ty.as_str()).ok_or_else(|| {
                CompilerError::InvalidSignature(format!("unknown return type {:?}", ty.as_str()))
            })?,
            None => LslType::Void,
        };

        FunctionSignature::with_parameters(return_type, &captures[2], parse_parameters(&captures[3])?)
    }
}

impl PartialEq for FunctionSignature {
    fn eq(&self, other: &Self) -> bool {
        self.signature_matches(other)
    }
}

impl Eq for FunctionSignature {}

impl Hash for FunctionSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for parameter in &self.parameters {
            parameter.ty.hash(state);
            parameter.variadic.hash(state);
        }
    }
}

impl Display for FunctionSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.signature_string())
    }
}

/// Named constant with a type and its value written as source text.
#[derive(Debug, Clone)]
pub struct ConstantSignature {
    name: String,
    ty: LslType,
    value_string: String,
}

impl ConstantSignature {
    pub fn new(ty: LslType, name: &str, value_string: &str) -> Result<Self, CompilerError> {
        validate_identifier(name)?;

        if ty == LslType::Void {
            return Err(CompilerError::InvalidSignature(format!(
                "constant {:?} cannot be void",
                name
            )));
        }

        Ok(ConstantSignature {
            name: name.to_string(),
            ty,
            value_string: value_string.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> LslType {
        self.ty
    }

    pub fn value_string(&self) -> &str {
        &self.value_string
    }

    pub fn signature_string(&self) -> String {
        format!("{} {} = {};", self.ty, self.name, self.value_string)
    }
}

impl PartialEq for ConstantSignature {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ConstantSignature {}

impl Hash for ConstantSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
