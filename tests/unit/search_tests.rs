use coder_bridge::search::{collect_matches, definition_pattern};

#[test]
fn rust_definition_pattern_targets_declarations() {
    let pattern = definition_pattern("parse_frame", Some("rust"));

    assert!(pattern.contains("fn|struct|enum|trait"));
    assert!(pattern.contains("parse_frame"));
    assert!(pattern.ends_with(r"\b"));
}

#[test]
fn python_definition_pattern_targets_def_and_class() {
    let pattern = definition_pattern("Widget", Some("python"));

    assert!(pattern.starts_with("(def|class)"));
    assert!(pattern.contains("Widget"));
}

#[test]
fn unknown_language_falls_back_to_generic_pattern() {
    let pattern = definition_pattern("thing", Some("cobol"));

    assert!(pattern.contains("def"));
    assert!(pattern.contains("function"));
}

#[test]
fn symbol_is_regex_escaped() {
    let pattern = definition_pattern("operator++", None);

    assert!(pattern.contains(r"operator\+\+"));
}

#[test]
fn collect_matches_parses_ripgrep_lines() {
    let output = "src/lib.rs:10:fn parse() {\nsrc/main.rs:3:use lib::parse;\n";

    let result = collect_matches(output, 50);

    assert_eq!(result.matches.len(), 2);
    assert_eq!(result.matches[0].file, "src/lib.rs");
    assert_eq!(result.matches[0].line, 10);
    assert_eq!(result.matches[0].text, "fn parse() {");
    assert!(!result.truncated);
}

#[test]
fn collect_matches_keeps_colons_in_text() {
    let output = "a.rs:1:let x: u32 = 0;\n";

    let result = collect_matches(output, 50);

    assert_eq!(result.matches[0].text, "let x: u32 = 0;");
}

#[test]
fn collect_matches_skips_malformed_lines() {
    let output = "no-line-number\nfile.rs:notanumber:text\nok.rs:2:fine\n";

    let result = collect_matches(output, 50);

    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].file, "ok.rs");
}

#[test]
fn collect_matches_caps_and_flags_truncation() {
    let output = "a.rs:1:x\na.rs:2:y\na.rs:3:z\n";

    let result = collect_matches(output, 2);

    assert_eq!(result.matches.len(), 2);
    assert!(result.truncated);
}
