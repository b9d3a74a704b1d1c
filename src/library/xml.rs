use quick_xml::{events::BytesStart, events::Event, Reader};

use crate::{
    ast::types::LslType,
    errors::errors::CompilerError,
    signatures::signatures::{
        validate_identifier, ConstantSignature, EventSignature, FunctionSignature,
        ParameterSignature,
    },
};

use super::library::{
    LibraryConstantSignature, LibraryData, LibraryEventSignature, LibraryFunctionSignature,
    LibraryMetadata,
};

const ROOT_ELEMENT: &str = "LibraryData";
const FUNCTION_ELEMENT: &str = "LibraryFunction";
const EVENT_ELEMENT: &str = "EventHandler";
const CONSTANT_ELEMENT: &str = "LibraryConstant";
const PARAMETER_ELEMENT: &str = "Parameter";
const DOCUMENTATION_ELEMENT: &str = "DocumentationString";
const PROPERTY_ELEMENT: &str = "Property";

#[derive(Debug, Clone, Copy, PartialEq)]
enum SignatureElement {
    Function,
    Event,
    Constant,
}

impl SignatureElement {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            FUNCTION_ELEMENT => Some(SignatureElement::Function),
            EVENT_ELEMENT => Some(SignatureElement::Event),
            CONSTANT_ELEMENT => Some(SignatureElement::Constant),
            _ => None,
        }
    }

    fn element_name(&self) -> &'static str {
        match self {
            SignatureElement::Function => FUNCTION_ELEMENT,
            SignatureElement::Event => EVENT_ELEMENT,
            SignatureElement::Constant => CONSTANT_ELEMENT,
        }
    }
}

/// Signature element whose closing tag has not been read yet.
#[derive(Debug)]
struct PendingSignature {
    element: SignatureElement,
    name: String,
    ty: LslType,
    value: String,
    parameters: Vec<ParameterSignature>,
    metadata: LibraryMetadata,
}

impl PendingSignature {
    fn describe(&self) -> String {
        format!("{} '{}'", self.element.element_name(), self.name)
    }
}

struct LibraryXmlReader<'a> {
    xml: &'a str,
    position: usize,
}

impl<'a> LibraryXmlReader<'a> {
    fn line(&self) -> usize {
        let end = self.position.min(self.xml.len());
        self.xml.as_bytes()[..end]
            .iter()
            .filter(|byte| **byte == b'\n')
            .count()
            + 1
    }

    fn error(&self, message: impl Into<String>) -> CompilerError {
        CompilerError::LibraryData {
            line: self.line(),
            message: message.into(),
        }
    }
}

fn attributes(element: &BytesStart) -> Vec<(String, String)> {
    element
        .attributes()
        .flatten()
        .map(|attr| {
            (
                String::from_utf8_lossy(attr.key.as_ref()).to_string(),
                String::from_utf8_lossy(&attr.value).to_string(),
            )
        })
        .collect()
}

fn parse_type(reader: &LibraryXmlReader, context: &str, text: &str) -> Result<LslType, CompilerError> {
    LslType::from_library_name(text)
        .ok_or_else(|| reader.error(format!("{}: Unknown type '{}'.", context, text)))
}

/// Reads library descriptor XML into `data`.
///
/// Signatures outside the active subsets of `data` are read and checked but
/// not kept. Any malformed element aborts the load with the line it was on.
pub fn load_library_xml(xml: &str, data: &mut LibraryData) -> Result<(), CompilerError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut state = LibraryXmlReader { xml, position: 0 };
    let mut buf = Vec::new();
    let mut seen_root = false;
    let mut in_documentation = false;
    let mut pending: Option<PendingSignature> = None;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf);
        state.position = reader.buffer_position() as usize;
        let event = event.map_err(|e| state.error(e.to_string()))?;
        let is_empty = matches!(event, Event::Empty(_));

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if !seen_root {
                    if name != ROOT_ELEMENT {
                        return Err(state.error(format!(
                            "Expected root element '{}', found '{}'.",
                            ROOT_ELEMENT, name
                        )));
                    }
                    seen_root = true;
                    continue;
                }

                if let Some(element) = SignatureElement::from_name(&name) {
                    if let Some(open) = &pending {
                        return Err(state.error(format!(
                            "{}: Unexpected nested element '{}'.",
                            open.describe(),
                            name
                        )));
                    }

                    let signature = begin_signature(&state, element, e)?;
                    if is_empty {
                        finish_signature(&state, signature, data)?;
                    } else {
                        pending = Some(signature);
                    }
                    continue;
                }

                let Some(open) = pending.as_mut() else {
                    return Err(state.error(format!("Unexpected element '{}'.", name)));
                };

                match name.as_str() {
                    PARAMETER_ELEMENT => read_parameter(&state, open, e)?,
                    PROPERTY_ELEMENT => read_property(&state, open, e)?,
                    DOCUMENTATION_ELEMENT => in_documentation = !is_empty,
                    _ => {
                        return Err(state.error(format!(
                            "{}: Unexpected element '{}'.",
                            open.describe(),
                            name
                        )))
                    }
                }
            }
            Event::Text(e) => {
                if in_documentation {
                    if let Some(open) = pending.as_mut() {
                        let text = e.unescape().unwrap_or_default().trim().to_string();
                        if !open.metadata.documentation.is_empty() {
                            open.metadata.documentation.push('\n');
                        }
                        open.metadata.documentation.push_str(&text);
                    }
                }
            }
            Event::CData(e) => {
                if in_documentation {
                    if let Some(open) = pending.as_mut() {
                        open.metadata
                            .documentation
                            .push_str(String::from_utf8_lossy(&e).trim());
                    }
                }
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    DOCUMENTATION_ELEMENT => in_documentation = false,
                    FUNCTION_ELEMENT | EVENT_ELEMENT | CONSTANT_ELEMENT => {
                        if let Some(signature) = pending.take() {
                            finish_signature(&state, signature, data)?;
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(state.error(format!("Missing root element '{}'.", ROOT_ELEMENT)));
    }

    if let Some(open) = pending {
        return Err(state.error(format!("{}: Element was never closed.", open.describe())));
    }

    Ok(())
}

fn begin_signature(
    reader: &LibraryXmlReader,
    element: SignatureElement,
    start: &BytesStart,
) -> Result<PendingSignature, CompilerError> {
    let mut name: Option<String> = None;
    let mut subsets: Option<String> = None;
    let mut type_name: Option<String> = None;
    let mut value: Option<String> = None;

    for (key, attr_value) in attributes(start) {
        match (key.as_str(), element) {
            ("Name", _) => name = Some(attr_value),
            ("Subsets", _) => subsets = Some(attr_value),
            ("ReturnType", SignatureElement::Function) | ("Type", SignatureElement::Constant) => {
                type_name = Some(attr_value)
            }
            ("Value", SignatureElement::Constant) => value = Some(attr_value),
            _ => {
                return Err(reader.error(format!(
                    "{}: Unknown attribute '{}'.",
                    element.element_name(),
                    key
                )))
            }
        }
    }

    let Some(name) = name else {
        return Err(reader.error(format!(
            "{}: Missing Name attribute.",
            element.element_name()
        )));
    };
    let context = format!("{} '{}'", element.element_name(), name);

    validate_identifier(&name).map_err(|e| reader.error(format!("{}: {}", context, e)))?;

    let Some(subsets) = subsets else {
        return Err(reader.error(format!("{}: Missing Subsets attribute.", context)));
    };

    let mut metadata = LibraryMetadata::new();
    metadata
        .set_subsets(&subsets)
        .map_err(|e| reader.error(format!("{}: {}", context, e)))?;

    let ty = match (element, type_name) {
        (SignatureElement::Event, _) => LslType::Void,
        (SignatureElement::Function, None) => LslType::Void,
        (SignatureElement::Function, Some(text)) => parse_type(reader, &context, &text)?,
        (SignatureElement::Constant, None) => {
            return Err(reader.error(format!("{}: Missing Type attribute.", context)))
        }
        (SignatureElement::Constant, Some(text)) => parse_type(reader, &context, &text)?,
    };

    let value = match (element, value) {
        (SignatureElement::Constant, None) => {
            return Err(reader.error(format!("{}: Missing Value attribute.", context)))
        }
        (_, value) => value.unwrap_or_default(),
    };

    Ok(PendingSignature {
        element,
        name,
        ty,
        value,
        parameters: Vec::new(),
        metadata,
    })
}

fn read_parameter(
    reader: &LibraryXmlReader,
    open: &mut PendingSignature,
    start: &BytesStart,
) -> Result<(), CompilerError> {
    let context = open.describe();
    if open.element == SignatureElement::Constant {
        return Err(reader.error(format!("{}: Constants take no parameters.", context)));
    }

    let mut name: Option<String> = None;
    let mut type_name: Option<String> = None;
    let mut variadic = false;

    for (key, value) in attributes(start) {
        match key.as_str() {
            "Name" => name = Some(value),
            "Type" => type_name = Some(value),
            "Variadic" => variadic = value.eq_ignore_ascii_case("true"),
            _ => {
                return Err(reader.error(format!(
                    "{}: Unknown Parameter attribute '{}'.",
                    context, key
                )))
            }
        }
    }

    let Some(name) = name else {
        return Err(reader.error(format!("{}: Parameter missing Name attribute.", context)));
    };
    let Some(type_name) = type_name else {
        return Err(reader.error(format!(
            "{}: Parameter '{}' missing Type attribute.",
            context, name
        )));
    };

    validate_identifier(&name).map_err(|e| reader.error(format!("{}: {}", context, e)))?;
    let ty = parse_type(reader, &context, &type_name)?;

    let index = open.parameters.len();
    open.parameters
        .push(ParameterSignature::new(&name, ty, variadic, index));
    Ok(())
}

fn read_property(
    reader: &LibraryXmlReader,
    open: &mut PendingSignature,
    start: &BytesStart,
) -> Result<(), CompilerError> {
    let context = open.describe();
    let mut name: Option<String> = None;
    let mut value: Option<String> = None;

    for (key, attr_value) in attributes(start) {
        match key.as_str() {
            "Name" => name = Some(attr_value),
            "Value" => value = Some(attr_value),
            _ => {
                return Err(reader.error(format!(
                    "{}: Unknown Property attribute '{}'.",
                    context, key
                )))
            }
        }
    }

    let (Some(name), Some(value)) = (name, value) else {
        return Err(reader.error(format!(
            "{}: Property requires Name and Value attributes.",
            context
        )));
    };

    if open.metadata.property(&name).is_some() {
        return Err(reader.error(format!(
            "{}: Property '{}' defined more than once.",
            context, name
        )));
    }

    open.metadata.set_property(&name, &value);
    Ok(())
}

fn finish_signature(
    reader: &LibraryXmlReader,
    pending: PendingSignature,
    data: &mut LibraryData,
) -> Result<(), CompilerError> {
    let context = pending.describe();
    let wrap = |e: CompilerError| reader.error(format!("{}: {}", context, e));

    match pending.element {
        SignatureElement::Function => {
            let signature =
                FunctionSignature::with_parameters(pending.ty, &pending.name, pending.parameters)
                    .map_err(wrap)?;
            data.add_function(LibraryFunctionSignature::new(signature, pending.metadata))
                .map_err(wrap)?;
        }
        SignatureElement::Event => {
            let signature =
                EventSignature::with_parameters(&pending.name, pending.parameters).map_err(wrap)?;
            data.add_event(LibraryEventSignature::new(signature, pending.metadata))
                .map_err(wrap)?;
        }
        SignatureElement::Constant => {
            let signature =
                ConstantSignature::new(pending.ty, &pending.name, &pending.value).map_err(wrap)?;
            data.add_constant(LibraryConstantSignature::new(signature, pending.metadata))
                .map_err(wrap)?;
        }
    }

    Ok(())
}
