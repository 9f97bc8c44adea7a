//! Integration tests for directive checking and diagnostic reports

use std::path::Path;

use storefront_templates::{ComponentDataRegistry, DiagnosticKind, Script, TemplateEngine};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(path).expect("fixture must exist")
}

#[test]
fn test_cart_template_is_clean() {
    let source = fixture("cart.tpl");
    assert!(Script::parse(&source).check().is_empty());
}

#[test]
fn test_broken_template_reports_each_problem() {
    let source = fixture("broken.tpl");
    let diagnostics = Script::parse(&source).check();
    let kinds: Vec<DiagnosticKind> = diagnostics.iter().map(|d| d.kind).collect();

    assert_eq!(diagnostics.len(), 5, "{:#?}", diagnostics);
    for expected in [
        DiagnosticKind::MalformedForeach,
        DiagnosticKind::MissingContextBinding,
        DiagnosticKind::UnterminatedLoop,
        DiagnosticKind::UndefinedAlias,
        DiagnosticKind::IgnoredLoop,
    ] {
        assert!(kinds.contains(&expected), "missing {}", expected);
    }

    let spans: Vec<usize> = diagnostics.iter().map(|d| d.span.start).collect();
    let mut sorted = spans.clone();
    sorted.sort();
    assert_eq!(spans, sorted);
}

#[test]
fn test_diagnostic_report_points_at_source() {
    let source = fixture("broken.tpl");
    let diagnostics = Script::parse(&source).check();
    let malformed = diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::MalformedForeach)
        .unwrap();

    assert_eq!(&source[malformed.span.clone()], ")");
    let report = malformed.format(&source, "broken.tpl");
    assert!(report.contains("broken.tpl"));
    assert!(report.contains("malformed-foreach"));
    assert!(report.contains("unexpected ')'"));
}

#[test]
fn test_diagnostics_do_not_change_output() {
    let source = fixture("broken.tpl");
    let engine = TemplateEngine::new();
    let html = engine
        .render_source(&source, Path::new("broken.tpl"), &ComponentDataRegistry::new())
        .unwrap();
    assert!(html.contains("<table><tbody></tbody></table>"));
}
