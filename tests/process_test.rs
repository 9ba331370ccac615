#![cfg(unix)]

use expectio::{ExternalCommand, HarnessConfig, Mismatch, Program, Runner, parse_str};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn command(program: &str, args: &[&str]) -> Arc<dyn Program> {
    Arc::new(ExternalCommand::new(
        program,
        args.iter().map(|a| a.to_string()).collect(),
    ))
}

#[tokio::test]
async fn test_child_echoes_every_input() {
    let transcript = parse_str("\"hello\" : \"hello\"\n\"two words\" : \"two words\"\n").unwrap();

    let report = Runner::silent(HarnessConfig::default())
        .run(command("cat", &[]), &transcript, None)
        .await
        .unwrap();

    assert!(report.passed(), "{:?}", report.diagnostics());
    assert_eq!(report.inputs_consumed, 2);
}

#[tokio::test]
async fn test_child_exiting_before_reading_leaves_input_pending() {
    let transcript = parse_str("null : \"x\"\nnull : \"y\"\nnull : \"z\"\n").unwrap();

    let report = Runner::silent(HarnessConfig::default())
        .run(command("true", &[]), &transcript, None)
        .await
        .unwrap();

    assert!(!report.passed());
    assert_eq!(
        report.mismatches,
        vec![Mismatch::PendingInput {
            consumed: 0,
            total: 3
        }]
    );
    assert!(report.invocation_error.is_none());
}

#[tokio::test]
async fn test_child_reading_part_of_the_input() {
    // Reads and answers one line, then exits.
    let transcript = parse_str("\"a\" : \"a\"\nnull : \"b\"\nnull : \"c\"\n").unwrap();

    let report = Runner::silent(HarnessConfig::default())
        .run(command("head", &["-n", "1"]), &transcript, None)
        .await
        .unwrap();

    assert!(
        report
            .mismatches
            .iter()
            .any(|m| matches!(m, Mismatch::PendingInput { total: 3, .. })),
        "{:?}",
        report.mismatches
    );
}

#[test]
fn test_run_timeout_kills_child() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let config = HarnessConfig {
        run_timeout: Duration::from_millis(200),
        ..HarnessConfig::default()
    };
    let transcript = parse_str("null : \"x\"\n").unwrap();
    let started = Instant::now();

    let report = runtime
        .block_on(Runner::silent(config).run(command("sleep", &["5"]), &transcript, None))
        .unwrap();
    // Dropping the runtime waits for the worker, which only ends once the child is gone.
    drop(runtime);

    assert!(
        report
            .invocation_error
            .as_deref()
            .is_some_and(|e| e.contains("still running"))
    );
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "took {:?}",
        started.elapsed()
    );
}
