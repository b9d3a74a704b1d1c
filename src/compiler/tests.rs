//! Unit tests for the code generator.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    ast::{expressions::BinaryOperator, types::LslType},
    compile_source,
    errors::errors::{CompilerError, Diagnostic},
    library::{library::LibraryData, provider::LibraryDataProvider},
    validator::validator::validate_source,
};

use super::{
    compiler::{compile, BinaryOperationSignature},
    settings::{Accessibility, CompilerSettings},
    utilities::{
        default_initializer, float_overflow, format_float, format_timestamp, hex_overflow,
        integer_overflow, should_box, string_code_literal, utility_library, LiteralKind,
        LiteralOverflow, LiteralParent,
    },
};

const MOD_LIBRARY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<LibraryData>
  <LibraryFunction Name="modSendCommand" ReturnType="String" Subsets="os">
    <Parameter Name="module" Type="String" />
    <Parameter Name="count" Type="Integer" />
    <Property Name="ModInvoke" Value="true" />
  </LibraryFunction>
  <LibraryFunction Name="modPing" Subsets="os">
    <Property Name="ModInvoke" Value="true" />
  </LibraryFunction>
  <EventHandler Name="state_entry" Subsets="os" />
  <LibraryConstant Name="OS_DEFAULTS" Type="List" Value='"a", 1, -2.5, (key)"k"' Subsets="os">
    <Property Name="Expand" Value="true" />
  </LibraryConstant>
</LibraryData>
"#;

lazy_static! {
    static ref LOCAL_X: Regex = Regex::new(r"LSL_Types\.LSLInteger LV\d+_x = 0;").unwrap();
}

fn generate_with(
    source: &str,
    library: &dyn LibraryDataProvider,
    settings: &CompilerSettings,
) -> String {
    let mut diagnostics: Vec<Diagnostic> = vec![];
    let mut output = vec![];

    let ast = compile_source(source, library, settings, &mut diagnostics, &mut output).unwrap();
    assert!(!ast.has_errors(), "unexpected errors: {:?}", diagnostics);

    String::from_utf8(output).unwrap()
}

fn generate(source: &str, settings: &CompilerSettings) -> String {
    let library = LibraryData::default_library().unwrap();
    generate_with(source, &library, settings)
}

#[test]
fn test_literal_boxing_table() {
    use LiteralKind::*;

    assert!(!should_box(Integer, LiteralParent::Operator));
    assert!(!should_box(Hex, LiteralParent::Operator));
    assert!(should_box(String, LiteralParent::LogicalOperator));
    assert!(should_box(Hex, LiteralParent::VectorOrRotation));
    assert!(!should_box(Float, LiteralParent::VectorOrRotation));
    assert!(!should_box(Integer, LiteralParent::CallArgument { mod_invoke: false }));
    assert!(should_box(Integer, LiteralParent::CallArgument { mod_invoke: true }));
    assert!(should_box(Hex, LiteralParent::CallArgument { mod_invoke: false }));
    assert!(should_box(Float, LiteralParent::VariableInitializer));
    assert!(!should_box(String, LiteralParent::VariableInitializer));
    assert!(should_box(String, LiteralParent::Other));
}

#[test]
fn test_literal_overflow() {
    assert_eq!(integer_overflow("2147483647"), LiteralOverflow::None);
    assert_eq!(integer_overflow("007"), LiteralOverflow::None);
    assert_eq!(integer_overflow("2147483648"), LiteralOverflow::Overflow);
    assert_eq!(integer_overflow("99999999999999999999999"), LiteralOverflow::Overflow);

    assert_eq!(hex_overflow("0xFFFFFFFF"), LiteralOverflow::None);
    assert_eq!(hex_overflow("0x100000000"), LiteralOverflow::Overflow);

    assert_eq!(float_overflow("1e39"), LiteralOverflow::Overflow);
    assert_eq!(float_overflow("1e-46"), LiteralOverflow::Underflow);
    assert_eq!(float_overflow("0.0"), LiteralOverflow::None);
    assert_eq!(float_overflow("3.5f"), LiteralOverflow::None);
}

#[test]
fn test_format_float() {
    assert_eq!(format_float("1."), "1.0");
    assert_eq!(format_float(".5"), "0.5");
    assert_eq!(format_float("2"), "2.0");
    assert_eq!(format_float("1.5e3f"), "1.5e3");
    assert_eq!(format_float("2e5"), "2.0e5");
    assert_eq!(format_float("3.25"), "3.25");
}

#[test]
fn test_format_timestamp() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
    assert_eq!(format_timestamp(951_782_400 + 3_661), "2000-02-29 01:01:01");
    assert_eq!(format_timestamp(94_694_399), "1972-12-31 23:59:59");
    // 2100 is not a leap year.
    assert_eq!(format_timestamp(4_107_542_400), "2100-03-01 00:00:00");
}

#[test]
fn test_string_code_literal_and_defaults() {
    assert_eq!(string_code_literal("a\"b\\c\n"), r#""a\"b\\c\n""#);
    assert_eq!(default_initializer(LslType::Key), "\"\"");
    assert_eq!(default_initializer(LslType::Vector), "new LSL_Types.Vector3(0,0,0)");
    assert_eq!(default_initializer(LslType::List), "new LSL_Types.list()");

    let utilities = utility_library().unwrap();
    assert!(utilities.contains("public static LSL_Types.Quaternion Negate(LSL_Types.Quaternion rot)"));
    assert!(utilities.contains("public static bool ToBool(LSL_Types.LSLString str)"));
    assert!(!utilities.contains("{LSLType"));
}

#[test]
fn test_settings_validation() {
    assert!(CompilerSettings::default().validate().is_ok());

    let settings = CompilerSettings {
        generated_class_name: Some(String::from("1Script")),
        ..Default::default()
    };
    assert!(matches!(
        settings.validate(),
        Err(CompilerError::InvalidSetting { setting, .. }) if setting == "generated_class_name"
    ));

    let settings = CompilerSettings {
        generated_constructor_signature: Some(String::from("(int a) : base(a)")),
        coop_termination_function_call: Some(String::from("Yield()")),
        generated_inheritance_list: vec![String::from("Base<int>"), String::from("IScript")],
        ..Default::default()
    };
    assert!(settings.validate().is_ok());
    assert_eq!(settings.inheritance_clause(), ": Base<int>, IScript");
    assert_eq!(settings.coop_termination_call(), "Yield()");

    let settings = CompilerSettings {
        coop_termination_function_call: Some(String::from("Yield(); Evil()")),
        ..Default::default()
    };
    assert!(settings.validate().is_err());
}

#[test]
fn test_settings_json() {
    let settings = CompilerSettings::from_json(
        r#"{ "generate_class": false, "generated_class_name": "Widget", "generated_class_accessibility": "internal" }"#,
    )
    .unwrap();

    assert!(!settings.generate_class);
    assert_eq!(settings.class_name(), "Widget");
    assert_eq!(settings.generated_class_accessibility, Accessibility::Internal);
    assert_eq!(settings.constructor_signature(), "()");

    let round_trip = CompilerSettings::from_json(&settings.to_json().unwrap()).unwrap();
    assert_eq!(round_trip, settings);

    assert!(CompilerSettings::from_json(r#"{ "generated_class_namespace": "a..b" }"#).is_err());
    assert!(matches!(
        CompilerSettings::from_json("{"),
        Err(CompilerError::Json(_))
    ));
}

#[test]
fn test_stub_names() {
    let signature = BinaryOperationSignature {
        left: LslType::Integer,
        operator: BinaryOperator::LessThan,
        right: LslType::Float,
        returns: LslType::Integer,
    };
    assert_eq!(signature.stub_name(), "_o1162");
}

#[test]
fn test_class_output() {
    let output = generate(
        r#"default { state_entry() { llSay(0, "hello"); } }"#,
        &CompilerSettings::default(),
    );

    assert!(output.starts_with("//Compiled by lslcc, Date: "));
    assert!(output.contains("public class LSLScript\n{\n\n"));
    assert!(output.contains("\tprivate static class UTILITIES\n"));
    assert!(output.contains("\tpublic LSLScript()\n\t{\n\t}\n"));
    assert!(output.contains("\tpublic void default_event_state_entry()\n\t{\n"));
    assert!(output.contains("\t\tthis.llSay(0,\"hello\");\n"));
    assert!(!output.contains("Binary Operator Stubs"));
    assert!(output.ends_with("\t}\n}\n"));
}

#[test]
fn test_class_wrapper_settings() {
    let settings = CompilerSettings {
        script_header: String::from("// header"),
        generated_class_namespace: Some(String::from("Scripts.Generated")),
        generated_namespace_imports: vec![String::from("System")],
        generated_inheritance_list: vec![String::from("ScriptBase")],
        generated_constructor_signature: Some(String::from("() : base()")),
        generated_constructor_accessibility: Accessibility::Default,
        ..Default::default()
    };

    let output = generate("default { state_entry() { } }", &settings);

    assert!(output.starts_with("// header\n\n//Compiled by lslcc, Date: "));
    assert!(output.contains(
        "using System;\n\nnamespace Scripts.Generated\n{\n\tpublic class LSLScript : ScriptBase\n\t{\n"
    ));
    assert!(output.contains("\t\tLSLScript() : base()\n"));
    assert!(output.ends_with("\t}\n}\n"));
}

#[test]
fn test_stubs_are_deduplicated() {
    let output = generate(
        r#"default {
            state_entry() {
                integer a = 1;
                integer b = a + 2;
                integer c = a + b;
                llSay(b + c, "");
            }
        }"#,
        &CompilerSettings::default(),
    );

    let declaration =
        "private LSL_Types.LSLInteger _o101(LSL_Types.LSLInteger right, LSL_Types.LSLInteger left)";
    assert_eq!(output.matches(declaration).count(), 1);
    assert!(output.contains("return left+right;"));
    assert!(output.contains("_o101(2,LV"));
}

#[test]
fn test_unreferenced_code_is_pruned() {
    let output = generate(
        r#"
        integer g_unused;
        integer g_used = 3;
        unused() { }
        integer used() { return 1; }
        default {
            state_entry() {
                integer unused_local = 5;
                llSay(g_used + used(), "");
            }
        }"#,
        &CompilerSettings::default(),
    );

    assert!(!output.contains("g_unused"));
    assert!(output.contains("public LSL_Types.LSLInteger GV_g_used;"));
    assert!(output.contains("GV_g_used = new LSL_Types.LSLInteger(3);"));
    assert!(!output.contains("FN_unused"));
    assert!(output.contains("public LSL_Types.LSLInteger FN_used()"));
    assert!(output.contains("return new LSL_Types.LSLInteger(1);"));
    assert!(output.contains("_o101(FN_used(),this.GV_g_used)"));
    assert!(!output.contains("unused_local"));
}

#[test]
fn test_key_string_duality() {
    let source = r#"default {
        state_entry() {
            string s = "abc";
            key k = s;
            key j = "def";
            llOwnerSay((string)k + (string)j);
        }
    }"#;

    let output = generate(source, &CompilerSettings::default());
    assert!(output.contains("_k = new LSL_Types.key(LV"));
    assert!(output.contains("_j = \"def\";"));
    assert!(output.contains("(LSL_Types.LSLString)(LV"));

    let settings = CompilerSettings {
        keys_are_strings: true,
        ..Default::default()
    };
    let output = generate(source, &settings);
    assert!(!output.contains("LSL_Types.key"));
    assert!(output.contains("LSL_Types.LSLString LV"));
}

/// Index of the first line, at or after `from`, that `matches` accepts.
fn line_index(lines: &[&str], from: usize, matches: impl Fn(&str) -> bool) -> usize {
    lines
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, line)| matches(line.trim()))
        .map(|(index, _)| index)
        .unwrap_or_else(|| panic!("no matching line after {} in:\n{}", from, lines.join("\n")))
}

#[test]
fn test_declarations_skipped_by_jumps_are_hoisted() {
    let settings = CompilerSettings {
        insert_coop_termination_calls: true,
        ..Default::default()
    };
    let output = generate(
        r#"default {
            state_entry() {
                jump over;
                integer x = llAbs(-5);
                @over;
                llSay(x, "done");
            }
        }"#,
        &settings,
    );
    let lines: Vec<&str> = output.lines().collect();

    let handler = line_index(&lines, 0, |line| line.contains("default_event_state_entry"));
    let open = line_index(&lines, handler, |line| line == "{");
    let hoisted = line_index(&lines, handler, |line| LOCAL_X.is_match(line));
    let coop = line_index(&lines, handler, |line| {
        line == "opensim_reserved_CheckForCoopTermination();"
    });
    let jump = line_index(&lines, handler, |line| line == "goto LSLLabel_over;");

    assert_eq!(hoisted, open + 1);
    assert_eq!(coop, hoisted + 1);
    assert_eq!(jump, coop + 1);
    assert!(output.contains("LSLLabel_over:\n"));
    assert!(!output.contains("llAbs"));
}

#[test]
fn test_hoisted_declaration_in_function() {
    let output = generate(
        r#"integer first() {
            llOwnerSay("x");
            jump L;
            integer a = 5;
            @L;
            return a;
        }
        default {
            state_entry() { llOwnerSay((string)first()); }
        }"#,
        &CompilerSettings::default(),
    );
    let lines: Vec<&str> = output.lines().collect();

    let function = line_index(&lines, 0, |line| line.contains("FN_first()"));
    let open = line_index(&lines, function, |line| line == "{");
    let hoisted = line_index(&lines, function, |line| {
        line.starts_with("LSL_Types.LSLInteger LV") && line.ends_with("_a = 0;")
    });
    let say = line_index(&lines, function, |line| line.starts_with("this.llOwnerSay("));
    let jump = line_index(&lines, function, |line| line == "goto LSLLabel_L;");
    let ret = line_index(&lines, function, |line| {
        line.starts_with("return LV") && line.ends_with("_a;")
    });

    assert_eq!(hoisted, open + 1);
    assert!(hoisted < say && say < jump && jump < ret);
    assert!(!output.contains("= 5"));
    assert!(!output.contains("LSLInteger(5)"));
}

#[test]
fn test_declaration_after_return_in_jumped_over_code_is_hoisted() {
    let output = generate(
        r#"default {
            state_entry() {
                jump a;
                @b;
                return;
                integer v = 1;
                @a;
                v++;
                if (v < 3) jump b;
                llSay(v, "");
            }
        }"#,
        &CompilerSettings::default(),
    );
    let lines: Vec<&str> = output.lines().collect();

    let handler = line_index(&lines, 0, |line| line.contains("default_event_state_entry"));
    let hoisted = line_index(&lines, handler, |line| {
        line.starts_with("LSL_Types.LSLInteger LV") && line.ends_with("_v = 0;")
    });
    let jump = line_index(&lines, handler, |line| line == "goto LSLLabel_a;");
    let increment = line_index(&lines, handler, |line| {
        line.starts_with("LV") && line.ends_with("_v++;")
    });

    assert!(hoisted < jump && jump < increment);
    assert!(output.contains("LSLLabel_b:"));
    assert!(output.contains("LSLLabel_a:"));
    assert!(!output.contains("LSLInteger(1)"));
}

#[test]
fn test_event_handler_return_value_still_returns() {
    let output = generate(
        r#"default {
            touch_start(integer n) {
                if (n) return 1;
                llSay(0, "after");
            }
        }"#,
        &CompilerSettings::default(),
    );
    let lines: Vec<&str> = output.lines().collect();

    let forced = line_index(&lines, 0, |line| line.starts_with("UTILITIES.ForceStatement("));
    assert_eq!(lines[forced + 1].trim(), "return;");

    let after = line_index(&lines, 0, |line| line.contains("\"after\""));
    assert!(forced < after);
}

#[test]
fn test_overflowing_integers_ignore_sign() {
    let output = generate(
        r#"default {
            state_entry() {
                integer low = -2147483648;
                integer high = 2147483648;
                llSay(low, (string)high);
            }
        }"#,
        &CompilerSettings::default(),
    );

    assert!(!output.contains("2147483648"));
    assert!(output.contains("-(new LSL_Types.LSLInteger(1))"));
    assert!(output.contains("new LSL_Types.LSLInteger(-1)"));
}

#[test]
fn test_opensim_runtime_output() {
    let output = generate(
        r#"
        integer count;
        default {
            state_entry() {
                while (count < 10) { count++; }
            }
        }"#,
        &CompilerSettings::opensim_runtime(),
    );

    assert!(!output.contains("class LSLScript"));
    assert!(output.contains("private class GLOBALS"));
    assert!(output.contains("public LSL_Types.LSLInteger V_count;"));
    assert!(output.contains("this.V_count = 0;"));
    assert!(output.contains("GLOBALS Globals = new GLOBALS();"));
    assert!(output.contains("this.Globals.V_count++;"));
    assert!(output.contains("while(_o1161(10,this.Globals.V_count))"));
    assert!(output.matches("opensim_reserved_CheckForCoopTermination();").count() >= 2);
}

#[test]
fn test_expression_forms() {
    let output = generate(
        r#"default {
            state_entry() {
                integer a = 1;
                integer i = 2;
                string s = "x";
                vector v = <1, 2, 3>;
                i *= 1.5;
                v = -v;
                if (a && 0) llSay(i, "");
                if (s) llOwnerSay((string)v);
            }
        }"#,
        &CompilerSettings::default(),
    );

    assert!(output.contains("(new LSL_Types.Vector3(1, 2, 3))"));
    assert!(output.contains(" = new LSL_Types.LSLInteger(System.Math.Round((double)LV"));
    assert!(output.contains("UTILITIES.Negate(LV"));
    assert!(output.contains("if(((bool)(new LSL_Types.LSLInteger(0))) & ((bool)(LV"));
    assert!(output.contains("if(UTILITIES.ToBool(LV"));
}

#[test]
fn test_expanded_constants() {
    let output = generate(
        r#"default {
            state_entry() {
                vector v = ZERO_VECTOR;
                key k = NULL_KEY;
                llOwnerSay((string)v + (string)k + EOF + (string)PI);
            }
        }"#,
        &CompilerSettings::default(),
    );

    assert!(output.contains("new LSL_Types.Vector3(0.0, 0.0, 0.0)"));
    assert!(output.contains("new LSL_Types.key(\"00000000-0000-0000-0000-000000000000\")"));
    assert!(output.contains("new LSL_Types.LSLString(\"\\n\\n\\n\")"));
    assert!(output.contains("(LSL_Types.LSLString)(PI)"));
}

#[test]
fn test_mod_invoke_and_list_constants() {
    let library = LibraryData::from_xml_str(MOD_LIBRARY, &["os"]).unwrap();
    let output = generate_with(
        r#"default {
            state_entry() {
                modPing();
                string r = modSendCommand("radar", 3);
                list l = OS_DEFAULTS;
                modSendCommand(r + (string)l, 0);
            }
        }"#,
        &library,
        &CompilerSettings::default(),
    );

    assert!(output.contains("this.modInvokeN(\"modPing\");"));
    assert!(output.contains(
        "this.modInvokeS(\"modSendCommand\", new LSL_Types.LSLString(\"radar\"),new LSL_Types.LSLInteger(3))"
    ));
    assert!(output.contains(
        "new LSL_Types.list(new LSL_Types.LSLString(\"a\"), new LSL_Types.LSLInteger(1), new LSL_Types.LSLFloat(-2.5), new LSL_Types.key(\"k\"))"
    ));
}

#[test]
fn test_compile_rejects_invalid_input() {
    let library = LibraryData::default_library().unwrap();
    let mut diagnostics = vec![];
    let ast = validate_source("default { state_entry() { x = 1; } }", &library, &mut diagnostics);
    assert!(ast.has_errors());

    let mut output = vec![];
    let result = compile(&ast, &library, &CompilerSettings::default(), &mut output);
    assert!(matches!(result, Err(CompilerError::InvalidArgument(_))));
    assert!(output.is_empty());

    let ast = validate_source("default { state_entry() { } }", &library, &mut diagnostics);
    let settings = CompilerSettings {
        generated_class_name: Some(String::from("not a name")),
        ..Default::default()
    };
    let result = compile(&ast, &library, &settings, &mut output);
    assert!(matches!(result, Err(CompilerError::InvalidSetting { .. })));
    assert!(output.is_empty());
}
