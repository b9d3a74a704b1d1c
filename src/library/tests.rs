//! Unit tests for library data loading and lookup.

use crate::{ast::types::LslType, errors::errors::CompilerError};

use super::{
    library::{LibraryData, LibraryMetadata},
    provider::LibraryDataProvider,
};

const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<LibraryData>
  <LibraryFunction Name="llSay" Subsets="lsl">
    <Parameter Name="channel" Type="Integer" />
    <Parameter Name="msg" Type="String" />
    <DocumentationString>Says msg on channel.</DocumentationString>
  </LibraryFunction>
  <LibraryFunction Name="llAbs" ReturnType="Integer" Subsets="lsl">
    <Parameter Name="val" Type="Integer" />
  </LibraryFunction>
  <LibraryFunction Name="llAbs" ReturnType="Float" Subsets="lsl">
    <Parameter Name="val" Type="Float" />
  </LibraryFunction>
  <LibraryFunction Name="osMessage" Subsets="os-lsl,ossl">
    <Parameter Name="target" Type="Key" />
    <Parameter Name="rest" Type="Void" Variadic="true" />
    <Property Name="ModInvoke" Value="true" />
  </LibraryFunction>
  <LibraryFunction Name="llOldThing" Subsets="lsl">
    <Property Name="Deprecated" Value="TRUE" />
  </LibraryFunction>
  <EventHandler Name="touch_start" Subsets="lsl">
    <Parameter Name="num_detected" Type="Integer" />
  </EventHandler>
  <EventHandler Name="state_entry" Subsets="lsl" />
  <LibraryConstant Name="ZERO_VECTOR" Type="Vector" Value="0.0, 0.0, 0.0" Subsets="lsl">
    <Property Name="Expand" Value="true" />
  </LibraryConstant>
  <LibraryConstant Name="NULL_KEY" Type="Key" Value="00000000-0000-0000-0000-000000000000" Subsets="lsl" />
  <LibraryConstant Name="OS_ONLY" Type="Integer" Value="3" Subsets="ossl" />
</LibraryData>
"#;

fn wrap(body: &str) -> String {
    format!("<LibraryData>\n{}\n</LibraryData>", body)
}

fn load_error_line(xml: &str) -> (usize, String) {
    match LibraryData::from_xml_str(xml, &["lsl"]) {
        Err(CompilerError::LibraryData { line, message }) => (line, message),
        other => panic!("expected library data error, got {:?}", other),
    }
}

#[test]
fn test_load_sample_with_subset_filtering() {
    let data = LibraryData::from_xml_str(SAMPLE, &["lsl"]).unwrap();

    assert!(data.library_function_exists("llSay"));
    assert!(!data.library_function_exists("osMessage"));
    assert!(data.constant_signature_exists("OS_ONLY").is_none());
    assert_eq!(data.get_library_function_signatures("llAbs").unwrap().len(), 2);
    assert_eq!(data.events().count(), 2);

    let with_os = LibraryData::from_xml_str(SAMPLE, &["lsl", "ossl"]).unwrap();
    assert!(with_os.library_function_exists("osMessage"));
    assert!(with_os.constant_signature_exists("OS_ONLY").is_some());
}

#[test]
fn test_overload_resolution_prefers_exact_match() {
    let data = LibraryData::from_xml_str(SAMPLE, &["lsl"]).unwrap();

    let float = data
        .function_signature_exists("llAbs", &[LslType::Float])
        .unwrap();
    assert_eq!(float.return_type(), LslType::Float);

    let integer = data
        .function_signature_exists("llAbs", &[LslType::Integer])
        .unwrap();
    assert_eq!(integer.return_type(), LslType::Integer);

    assert!(data
        .function_signature_exists("llAbs", &[LslType::String])
        .is_none());
    assert!(data
        .function_signature_exists("llSay", &[LslType::Integer])
        .is_none());
    assert!(data.function_signature_exists("llNothing", &[]).is_none());
}

#[test]
fn test_variadic_and_metadata() {
    let data = LibraryData::from_xml_str(SAMPLE, &["ossl"]).unwrap();
    let message = data
        .function_signature_exists(
            "osMessage",
            &[LslType::Key, LslType::Integer, LslType::List],
        )
        .unwrap();

    assert!(message.has_variadic_parameter());
    assert!(message.metadata.mod_invoke());
    assert!(message.metadata.subsets().contains("os-lsl"));
    assert!(data
        .function_signature_exists("osMessage", &[LslType::Key])
        .is_some());
}

#[test]
fn test_flags_and_documentation() {
    let data = LibraryData::from_xml_str(SAMPLE, &["lsl"]).unwrap();

    let old = &data.get_library_function_signatures("llOldThing").unwrap()[0];
    assert!(old.metadata.deprecated());

    let say = &data.get_library_function_signatures("llSay").unwrap()[0];
    assert!(!say.metadata.deprecated());
    assert_eq!(
        say.signature_and_documentation(),
        "llSay(integer channel, string msg);\n\nSays msg on channel."
    );

    let zero = data.constant_signature_exists("ZERO_VECTOR").unwrap();
    assert!(zero.metadata.expand());
    assert_eq!(zero.value_string_as_code_literal(), "<0.0, 0.0, 0.0>");

    let null_key = data.constant_signature_exists("NULL_KEY").unwrap();
    assert!(!null_key.metadata.expand());
    assert_eq!(
        null_key.value_string_as_code_literal(),
        "\"00000000-0000-0000-0000-000000000000\""
    );
}

#[test]
fn test_metadata_subsets() {
    let mut metadata = LibraryMetadata::new();
    metadata.set_subsets("lsl, os-lsl").unwrap();
    assert_eq!(metadata.subsets().len(), 2);

    assert!(matches!(
        metadata.add_subset("bad name"),
        Err(CompilerError::InvalidSubsetName { .. })
    ));

    metadata.set_deprecated(true);
    assert!(metadata.deprecated());
    metadata.set_deprecated(false);
    assert!(metadata.property("Deprecated").is_none());

    assert!(LibraryData::new(&["9lives"]).is_err());
}

#[test]
fn test_event_parameter_cannot_be_void() {
    let (line, message) = load_error_line(&wrap(
        "  <EventHandler Name=\"touch\" Subsets=\"lsl\">\n    <Parameter Name=\"x\" Type=\"Void\" />\n  </EventHandler>",
    ));

    assert_eq!(line, 4);
    assert!(message.starts_with("EventHandler 'touch'"));
}

#[test]
fn test_invalid_names_are_rejected() {
    let (_, message) = load_error_line(&wrap(
        "  <LibraryFunction Name=\"1llSay\" Subsets=\"lsl\" />",
    ));
    assert!(message.contains("1llSay"));

    let (line, _) = load_error_line(&wrap(
        "  <LibraryFunction Name=\"llSay\" Subsets=\"lsl\">\n    <Parameter Name=\"bad name\" Type=\"String\" />\n  </LibraryFunction>",
    ));
    assert_eq!(line, 3);
}

#[test]
fn test_missing_and_unknown_attributes() {
    let (line, message) = load_error_line(&wrap("  <EventHandler Name=\"timer\" />"));
    assert_eq!(line, 2);
    assert_eq!(message, "EventHandler 'timer': Missing Subsets attribute.");

    let (_, message) = load_error_line(&wrap(
        "  <EventHandler Name=\"timer\" Subsets=\"lsl\" Colour=\"red\" />",
    ));
    assert_eq!(message, "EventHandler: Unknown attribute 'Colour'.");

    let (_, message) = load_error_line(&wrap(
        "  <LibraryConstant Name=\"X\" Type=\"Integer\" Subsets=\"lsl\" />",
    ));
    assert_eq!(message, "LibraryConstant 'X': Missing Value attribute.");

    let (_, message) = load_error_line(&wrap(
        "  <LibraryConstant Name=\"X\" Type=\"Number\" Value=\"1\" Subsets=\"lsl\" />",
    ));
    assert!(message.contains("Unknown type 'Number'"));
}

#[test]
fn test_duplicates_are_rejected() {
    let (_, message) = load_error_line(&wrap(
        "  <LibraryConstant Name=\"X\" Type=\"Integer\" Value=\"1\" Subsets=\"lsl\" />\n  <LibraryConstant Name=\"X\" Type=\"Integer\" Value=\"2\" Subsets=\"lsl\" />",
    ));
    assert!(message.contains("duplicate"));

    let (_, message) = load_error_line(&wrap(
        "  <EventHandler Name=\"listen\" Subsets=\"lsl\">\n    <Parameter Name=\"a\" Type=\"Integer\" />\n    <Parameter Name=\"a\" Type=\"String\" />\n  </EventHandler>",
    ));
    assert!(message.starts_with("EventHandler 'listen'"));

    // Duplicates outside the active subsets are never added, so they pass.
    assert!(LibraryData::from_xml_str(
        &wrap("  <LibraryConstant Name=\"X\" Type=\"Integer\" Value=\"1\" Subsets=\"ossl\" />\n  <LibraryConstant Name=\"X\" Type=\"Integer\" Value=\"2\" Subsets=\"ossl\" />"),
        &["lsl"],
    )
    .is_ok());
}

#[test]
fn test_structure_errors() {
    assert!(LibraryData::from_xml_str("<Other />", &["lsl"]).is_err());
    assert!(LibraryData::from_xml_str("", &["lsl"]).is_err());

    let (_, message) = load_error_line(&wrap(
        "  <LibraryFunction Name=\"f\" Subsets=\"lsl\">\n    <EventHandler Name=\"e\" Subsets=\"lsl\" />\n  </LibraryFunction>",
    ));
    assert!(message.contains("nested"));
}

#[test]
fn test_from_xml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, SAMPLE.as_bytes()).unwrap();

    let data = LibraryData::from_xml_file(file.path(), &["lsl"]).unwrap();
    assert!(data.event_signature_exists("touch_start").is_some());

    assert!(matches!(
        LibraryData::from_xml_file("/nonexistent/library.xml", &["lsl"]),
        Err(CompilerError::Io(_))
    ));
}

#[test]
fn test_default_library_loads() {
    let data = LibraryData::default_library().unwrap();

    assert!(data.library_function_exists("llSay"));
    assert!(data.event_signature_exists("state_entry").is_some());
    assert!(data.event_signature_exists("listen").unwrap().parameter_count() == 4);
    assert!(data
        .constant_signature_exists("ZERO_VECTOR")
        .unwrap()
        .metadata
        .expand());
    assert_eq!(
        data.constant_signature_exists("TRUE").unwrap().ty(),
        LslType::Integer
    );
}
