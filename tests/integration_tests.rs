//! Integration tests for end-to-end compilation.
//!
//! These tests verify that the complete pipeline works from script source
//! through tokenizing, parsing and validation to the generated C# text.

use std::{fs, thread};

use lslcc::{
    compile_source,
    compiler::settings::CompilerSettings,
    display_diagnostic,
    errors::errors::{CompilerError, Diagnostic},
    library::library::LibraryData,
};
use pretty_assertions::assert_eq;

const SCRIPT: &str = r#"
integer counter = 0;

string describe(integer n)
{
    if (n > 1) return "many";
    else if (n == 1) return "one";
    return "none";
}

default
{
    state_entry()
    {
        llSay(0, describe(counter));
    }

    touch_start(integer num_detected)
    {
        counter += num_detected;
        state active;
    }
}

state active
{
    state_entry()
    {
        llOwnerSay("active");
        state default;
    }
}
"#;

fn compile_with(
    source: &str,
    library: &LibraryData,
    settings: &CompilerSettings,
) -> (String, Vec<Diagnostic>) {
    let mut diagnostics = vec![];
    let mut output = vec![];
    compile_source(source, library, settings, &mut diagnostics, &mut output).unwrap();
    (String::from_utf8(output).unwrap(), diagnostics)
}

/// Output without the timestamp line.
fn without_timestamp(output: &str) -> String {
    output
        .lines()
        .filter(|line| !line.starts_with("//Compiled by lslcc"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_compile_complete_script() {
    let library = LibraryData::default_library().unwrap();
    let (output, diagnostics) = compile_with(SCRIPT, &library, &CompilerSettings::default());

    assert!(diagnostics.iter().all(|d| !d.is_error()), "{:?}", diagnostics);

    for expected in [
        "public LSL_Types.LSLInteger GV_counter;",
        "GV_counter = new LSL_Types.LSLInteger(0);",
        "public LSL_Types.LSLString FN_describe(LSL_Types.LSLInteger PM_n)",
        "if(_o1181(1,PM_n))",
        "else if(_o1221(1,PM_n))",
        "return new LSL_Types.LSLString(\"many\");",
        "this.llSay(0,FN_describe(this.GV_counter));",
        "public void default_event_touch_start(LSL_Types.LSLInteger PM_num_detected)",
        "this.GV_counter = _o101(PM_num_detected,this.GV_counter);",
        "this.state(\"active\");",
        "public void active_event_state_entry()",
        "this.state(\"default\");",
    ] {
        assert!(output.contains(expected), "missing {:?} in:\n{}", expected, output);
    }

    let sections = [
        "User Defined Functions",
        "User Defined State Event Handlers",
        "Default State Event Handlers",
        "Binary Operator Stubs",
    ];
    let positions: Vec<usize> = sections
        .iter()
        .map(|section| output.find(section).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn test_output_is_deterministic() {
    let library = LibraryData::default_library().unwrap();
    let settings = CompilerSettings::default();

    let (first, _) = compile_with(SCRIPT, &library, &settings);
    let (second, _) = compile_with(SCRIPT, &library, &settings);

    assert_eq!(without_timestamp(&first), without_timestamp(&second));
}

#[test]
fn test_script_with_errors_generates_nothing() {
    let library = LibraryData::default_library().unwrap();
    let source = "default { state_entry() { integer x = ; } }";
    let (output, diagnostics) = compile_with(source, &library, &CompilerSettings::default());

    assert!(output.is_empty());
    let error = diagnostics.iter().find(|d| d.is_error()).unwrap();
    assert_eq!(error.get_error_name(), "SyntaxError");

    let rendered = display_diagnostic(error, source, "broken.lsl");
    assert!(rendered.starts_with("Error: SyntaxError"));
    assert!(rendered.contains("-> broken.lsl:1:"));
    assert!(rendered.contains('^'));
}

#[test]
fn test_library_and_settings_from_files() {
    let dir = tempfile::tempdir().unwrap();

    let library_path = dir.path().join("library.xml");
    fs::write(
        &library_path,
        r#"<LibraryData>
  <LibraryFunction Name="sayHello" Subsets="custom">
    <Parameter Name="who" Type="Key" />
  </LibraryFunction>
  <EventHandler Name="state_entry" Subsets="custom" />
</LibraryData>
"#,
    )
    .unwrap();

    let settings_path = dir.path().join("settings.json");
    fs::write(
        &settings_path,
        r#"{ "generated_class_name": "Custom", "keys_are_strings": true }"#,
    )
    .unwrap();

    let library = LibraryData::from_xml_file(&library_path, &["custom"]).unwrap();
    let settings = CompilerSettings::from_json_file(&settings_path).unwrap();

    let (output, diagnostics) = compile_with(
        "default { state_entry() { sayHello(\"x\"); } }",
        &library,
        &settings,
    );

    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert!(output.contains("public class Custom"));
    assert!(output.contains("this.sayHello(\"x\");"));
}

#[test]
fn test_broken_library_file_reports_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xml");
    fs::write(
        &path,
        "<LibraryData>\n  <LibraryFunction Name=\"f\" ReturnType=\"Number\" Subsets=\"lsl\" />\n</LibraryData>\n",
    )
    .unwrap();

    match LibraryData::from_xml_file(&path, &["lsl"]) {
        Err(CompilerError::LibraryData { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected a library data error, got {:?}", other),
    }
}

#[test]
fn test_concurrent_compilations_share_library() {
    let library = LibraryData::default_library().unwrap();
    let plain = CompilerSettings::default();
    let opensim = CompilerSettings::opensim_runtime();

    let (class_output, runtime_output) = thread::scope(|scope| {
        let class = scope.spawn(|| compile_with(SCRIPT, &library, &plain).0);
        let runtime = scope.spawn(|| compile_with(SCRIPT, &library, &opensim).0);
        (class.join().unwrap(), runtime.join().unwrap())
    });

    assert!(class_output.contains("public class LSLScript"));
    assert!(!runtime_output.contains("public class LSLScript"));
    assert!(runtime_output.contains("this.Globals.V_counter"));
    assert!(runtime_output.contains("opensim_reserved_CheckForCoopTermination();"));
}
