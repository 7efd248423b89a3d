//! Tests for replay-script flushing and failure-artifact persistence.

use chrono::{Local, TimeZone};

use prowl::browser::{ConsoleEntry, ConsoleLevel};
use prowl::script::{self, ActionLog, ActionRecord};

fn fixed_now() -> chrono::DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 3, 5, 10, 20, 30)
        .single()
        .expect("fixed timestamp")
}

#[test]
fn flushed_scripts_use_sanitized_names_with_second_timestamps() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut log = ActionLog::start("https://app.test/start");
    log.push_suppressed(ActionRecord::scroll(200));

    let paths = script::flush_scripts(dir.path(), "https://app.test/form?q=1", &log, fixed_now())
        .expect("script paths");

    assert_eq!(
        paths.selenium.file_name().map(|n| n.to_string_lossy().into_owned()),
        Some("Steps_https___app.test_form_q_1_20240305102030.py".to_owned())
    );
    assert_eq!(
        paths.uft.file_name().map(|n| n.to_string_lossy().into_owned()),
        Some("UFT_Steps_https___app.test_form_q_1_20240305102030.txt".to_owned())
    );
}

#[test]
fn flushed_scripts_hold_one_line_per_action_in_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut log = ActionLog::start("https://app.test/start");
    log.push_suppressed(ActionRecord::click("//*[@id='go']"));
    log.push_suppressed(ActionRecord::send_keys("//*[@name='q']", "hello"));

    let paths =
        script::flush_scripts(dir.path(), "https://app.test/start", &log, fixed_now())
            .expect("script paths");

    let selenium = std::fs::read_to_string(&paths.selenium).expect("read selenium script");
    let lines: Vec<&str> = selenium.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "driver.get('https://app.test/start')");
    assert!(lines[1].contains("//*[@id='go']"));
    assert!(lines[2].contains("send_keys('hello')"));

    let uft = std::fs::read_to_string(&paths.uft).expect("read uft script");
    assert_eq!(uft.lines().count(), 3);
    assert!(uft.lines().nth(1).is_some_and(|l| l.contains("xpath://*[@id='go']")
        || l.contains("xpath:=//*[@id='go']")));
}

#[test]
fn failure_artifacts_follow_the_error_naming_convention() {
    let dir = tempfile::tempdir().expect("temp dir");
    let console = vec![ConsoleEntry {
        level: ConsoleLevel::Severe,
        message: "Uncaught Error: boom".to_owned(),
    }];

    let report = script::write_failure_artifacts(
        dir.path(),
        "https://app.test/broken",
        &console,
        b"not-really-a-png",
        fixed_now(),
    )
    .expect("failure report");

    assert_eq!(report.url, "https://app.test/broken");
    assert_eq!(report.timestamp, "20240305102030");
    assert!(report
        .screenshot_path
        .to_string_lossy()
        .ends_with("Error_https___app.test_broken_20240305102030.png"));

    let log_contents =
        std::fs::read_to_string(&report.console_log_path).expect("read console artifact");
    assert_eq!(log_contents, "[SEVERE] - Uncaught Error: boom\n");
}
