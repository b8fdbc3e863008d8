#![cfg(unix)]

use std::path::Path;

use arrowtest::config::DEFAULT_MAX_OUTPUT_BYTES as CAP;
use arrowtest::{run_with_side_channel, ExecCommand};

fn sh(script: &str) -> ExecCommand {
    ExecCommand {
        program: "sh".into(),
        args: vec!["-c".into(), script.into()],
    }
}

#[test]
fn expectation_stream_is_captured_separately() {
    let res = run_with_side_channel(&sh("printf out; printf err >&2; printf exp >&3"), CAP)
        .expect("run ok");
    assert_eq!(res.exit_status, 0);
    assert_eq!(res.exit_signal, None);
    assert_eq!(res.stdout, b"out");
    assert_eq!(res.stderr, b"err");
    assert_eq!(res.expect, b"exp");
}

#[test]
fn silent_program_has_empty_streams() {
    let res = run_with_side_channel(&sh("exit 0"), CAP).expect("run ok");
    assert_eq!(res.exit_status, 0);
    assert!(res.stdout.is_empty());
    assert!(res.stderr.is_empty());
    assert!(res.expect.is_empty());
}

#[test]
fn exit_code_is_propagated() {
    let res = run_with_side_channel(&sh("printf partial >&3; exit 7"), CAP).expect("run ok");
    assert_eq!(res.exit_status, 7);
    assert_eq!(res.expect, b"partial");
}

#[test]
fn signal_exit_maps_to_128_plus_signal() {
    let res = run_with_side_channel(&sh("kill -9 $$"), CAP).expect("run ok");
    assert_eq!(res.exit_signal, Some(9));
    assert_eq!(res.exit_status, 137);
}

#[test]
fn large_outputs_do_not_deadlock() {
    let script = "i=0; while [ $i -lt 20000 ]; do echo 0123456789abcdef; echo 0123456789abcdef >&3; echo e >&2; i=$((i+1)); done";
    let res = run_with_side_channel(&sh(script), CAP).expect("run ok");
    assert_eq!(res.exit_status, 0);
    assert_eq!(res.stdout.len(), 17 * 20000);
    assert_eq!(res.stdout, res.expect);
    assert_eq!(res.stderr.len(), 2 * 20000);
}

#[test]
fn exceeding_the_cap_is_an_error() {
    let err = run_with_side_channel(&sh("printf 0123456789 >&3"), 4).unwrap_err();
    assert!(
        format!("{err:#}").contains("expectation stream exceeded max_output_bytes=4"),
        "err={err:#}"
    );
}

#[test]
fn expectation_descriptor_survives_an_exec_wrapper() {
    let wrapper = vec![
        "sh".to_string(),
        "-c".to_string(),
        "printf wrapped >&3; exec \"$0\"".to_string(),
    ];
    let cmd = ExecCommand::wrapped(&wrapper, Path::new("true"));
    let res = run_with_side_channel(&cmd, CAP).expect("run ok");
    assert_eq!(res.exit_status, 0);
    assert_eq!(res.expect, b"wrapped");
}

#[test]
fn missing_program_is_an_error() {
    let cmd = ExecCommand::direct(Path::new("/nonexistent/arrowtest-missing-binary"));
    let err = run_with_side_channel(&cmd, CAP).unwrap_err();
    assert!(format!("{err:#}").contains("spawn test program"), "err={err:#}");
}
