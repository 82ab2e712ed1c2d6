use std::fs;
use std::path::Path;
use tempfile::tempdir;

use code_explainer::config::Config;
use code_explainer::contract::{FunctionMetrics, MockChatClient, MockMetricsExtractor};
use code_explainer::llm::LlmError;
use code_explainer::report::{build_report, generate_report, ReportError, REPORT_PDF};

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn test_config(output_dir: &Path) -> Config {
    let mut config = Config::with_api_key("test-key");
    config.output_dir = output_dir.to_path_buf();
    config
}

/// Per-file explanations, then a summary and recommendations with a stray
/// non-ASCII glyph each.
fn reviewer_client() -> MockChatClient {
    let mut client = MockChatClient::new();
    client
        .expect_complete()
        .withf(|system, _| system.contains("programming tutor"))
        .returning(|_, _| Ok("Does a thing.".into()));
    client
        .expect_complete()
        .withf(|system, prompt| system.contains("senior software engineer") && prompt.contains("overview"))
        .times(1)
        .returning(|_, _| Ok("A tiny calculator \u{2714}".into()));
    client
        .expect_complete()
        .withf(|system, prompt| system.contains("senior software engineer") && prompt.contains("improvements"))
        .times(1)
        .returning(|_, _| Ok("Add tests \u{1F680}".into()));
    client
}

fn fixed_extractor() -> MockMetricsExtractor {
    let mut extractor = MockMetricsExtractor::new();
    extractor.expect_analyze_file().returning(|path| {
        let name = path.file_stem().unwrap().to_string_lossy().into_owned();
        Ok(vec![FunctionMetrics {
            name,
            cyclomatic_complexity: 2,
            length: 7,
        }])
    });
    extractor
}

#[tokio::test]
async fn report_has_three_ascii_sections() {
    let project = tempdir().unwrap();
    write(project.path(), "calc.py", "def add(a, b):\n    return a + b\n");
    write(project.path(), "ui/view.js", "function v() {}\n");
    let out = tempdir().unwrap();

    let report = build_report(project.path(), &test_config(out.path()), &reviewer_client(), &fixed_extractor())
        .await
        .expect("report should build");

    assert_eq!(report.summary, "A tiny calculator ");
    assert_eq!(report.recommendations, "Add tests ");
    assert_eq!(report.complexity, "calc - CC: 2 - LOC: 7\nview - CC: 2 - LOC: 7");
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn empty_project_skips_the_model_and_still_writes_a_pdf() {
    let project = tempdir().unwrap();
    let out = tempdir().unwrap();
    let mut client = MockChatClient::new();
    client.expect_complete().never();
    let mut extractor = MockMetricsExtractor::new();
    extractor.expect_analyze_file().never();

    let output = generate_report(project.path(), &test_config(out.path()), &client, &extractor)
        .await
        .expect("report should be written");

    assert_eq!(output, out.path().join(REPORT_PDF));
    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[0..4], b"%PDF", "PDF file missing magic header");
}

#[tokio::test]
async fn generate_report_writes_pdf() {
    let project = tempdir().unwrap();
    write(project.path(), "calc.py", "def add(a, b):\n    return a + b\n");
    let out = tempdir().unwrap();

    let output = generate_report(project.path(), &test_config(out.path()), &reviewer_client(), &fixed_extractor())
        .await
        .unwrap();

    let metadata = fs::metadata(&output).unwrap();
    assert!(metadata.len() > 100, "Output PDF is too small and may not exist");
}

#[tokio::test]
async fn failed_summary_request_aborts_the_report() {
    let project = tempdir().unwrap();
    write(project.path(), "calc.py", "x = 1\n");
    let out = tempdir().unwrap();

    let mut client = MockChatClient::new();
    client
        .expect_complete()
        .withf(|system, _| system.contains("programming tutor"))
        .returning(|_, _| Ok("Sets x.".into()));
    client
        .expect_complete()
        .withf(|system, _| system.contains("senior software engineer"))
        .returning(|_, _| Err(LlmError::MalformedResponse("no choices".into())));
    let mut extractor = MockMetricsExtractor::new();
    extractor.expect_analyze_file().never();

    let err = generate_report(project.path(), &test_config(out.path()), &client, &extractor)
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Summary(LlmError::MalformedResponse(_))));
    assert!(!out.path().join(REPORT_PDF).exists());
}
