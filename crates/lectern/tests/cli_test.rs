//! End-to-end tests of the `lectern` binary
#![cfg(unix)]

use lectern_test_utils::{fixtures::data, strip_ansi, TestFixtures};
use pretty_assertions::assert_eq;
use std::process::{Command, Output, Stdio};

fn lectern(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lectern"))
        .args(args)
        .env_remove("LECTERN_PROTOCOL")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run lectern")
}

fn stdout(output: &Output) -> String {
    strip_ansi(&String::from_utf8_lossy(&output.stdout))
}

#[test]
fn test_show_hides_annotations() {
    let fixtures = TestFixtures::new().unwrap();
    let slides = fixtures
        .create_test_file("slides.md", data::ANNOTATED.as_bytes())
        .unwrap();

    let output = lectern(&["show", slides.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "```go\npackage main\n\nfunc main() {\n}\n```\n"
    );
}

#[test]
fn test_run_prints_output_and_footer() {
    let fixtures = TestFixtures::new().unwrap();
    let languages = fixtures
        .create_test_file(
            "languages.toml",
            b"[languages.text]\nextension = \"txt\"\ncommands = [[\"cat\", \"<file>\"]]\n",
        )
        .unwrap();
    let slides = fixtures
        .create_test_file(
            "slides.md",
            b"# Demo\n\n```text\nhello from lectern\n/// and the hidden line\n```\n",
        )
        .unwrap();

    let output = lectern(&[
        "run",
        slides.to_str().unwrap(),
        "--languages",
        languages.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "hello from lectern");
    assert_eq!(lines[1], " and the hidden line");
    assert!(lines[2].starts_with("exit 0 · "));
    assert!(lines[2].ends_with("ms"));
}

#[test]
fn test_run_reports_failures_inline() {
    let fixtures = TestFixtures::new().unwrap();
    let slides = fixtures
        .create_test_file("slides.md", b"```sh\necho oops >&2\nexit 7\n```\n")
        .unwrap();

    let output = lectern(&["run", slides.to_str().unwrap()]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("oops"));
    assert!(text.contains("exit 7 · "));
}

#[test]
fn test_run_unsupported_language() {
    let fixtures = TestFixtures::new().unwrap();
    let slides = fixtures
        .create_test_file("slides.md", b"```brainfuck\n+[-]\n```\n")
        .unwrap();

    let output = lectern(&["run", slides.to_str().unwrap()]);
    let text = stdout(&output);
    assert!(text.starts_with("Error: unsupported language\n"));
    assert!(text.contains("exit -1 · "));
}

#[test]
fn test_run_auto_only_renders_builtins() {
    let fixtures = TestFixtures::new().unwrap();
    let slides = fixtures
        .create_test_file(
            "slides.md",
            b"```sh\necho should-not-run\n```\n\n```qr\nhttps://example.com\n```\n",
        )
        .unwrap();

    let output = lectern(&["run", "--auto", slides.to_str().unwrap()]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("https://example.com"));
    assert!(!text.contains("should-not-run"));
}

#[test]
fn test_run_without_code_succeeds_quietly() {
    let fixtures = TestFixtures::new().unwrap();
    let slides = fixtures
        .create_test_file("slides.md", data::NO_CODE.as_bytes())
        .unwrap();

    let output = lectern(&["run", slides.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_run_unclosed_fence_reported_inline() {
    let fixtures = TestFixtures::new().unwrap();
    let slides = fixtures
        .create_test_file("slides.md", b"```sh\necho never closed\n")
        .unwrap();

    let output = lectern(&["run", slides.to_str().unwrap()]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.starts_with("\ncould not parse code block"));
    assert!(text.contains("never closed"));
    assert!(!text.contains("exit "));
}

#[test]
fn test_bad_image_does_not_stop_later_blocks() {
    let fixtures = TestFixtures::new().unwrap();
    let slides = fixtures
        .create_test_file(
            "slides.md",
            b"```img\n/nonexistent/lectern.png\n```\n\n```sh\necho still running\n```\n",
        )
        .unwrap();

    let output = lectern(&["--protocol", "kitty", "run", slides.to_str().unwrap()]);
    assert!(output.status.success());

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("Error: Failed to open image /nonexistent/lectern.png"));
    assert!(lines[1].starts_with("exit -1 · "));
    assert_eq!(lines[2], "still running");
    assert!(lines[3].starts_with("exit 0 · "));
}

#[test]
fn test_run_image_with_forced_protocol() {
    let fixtures = TestFixtures::new().unwrap();
    let png = fixtures.create_test_png("chart.png", 32, 16).unwrap();
    let slides = fixtures
        .create_test_file("slides.md", format!("```img\n{}\n```\n", png.display()).as_bytes())
        .unwrap();

    let output = lectern(&["run", slides.to_str().unwrap(), "--protocol", "kitty"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("\x1b_Ga=T,f=100,"));
}

#[test]
fn test_missing_file_fails() {
    let output = lectern(&["show", "/nonexistent/slides.md"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}

#[test]
fn test_detection_without_terminal() {
    let output = lectern(&["probe"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("probe failed: input is not an interactive terminal"));
    assert!(text.contains("inline images: false\n"));
    assert!(text.ends_with("protocol: other\n"));
}

#[test]
fn test_detection_honours_overrides() {
    let output = lectern(&["probe", "--protocol", "kitty"]);
    assert!(stdout(&output).ends_with("inline images: true\nprotocol: kitty\n"));

    let output = Command::new(env!("CARGO_BIN_EXE_lectern"))
        .arg("probe")
        .env("LECTERN_PROTOCOL", "iterm2")
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(stdout(&output).ends_with("protocol: iterm\n"));
}

#[test]
fn test_languages_lists_registry() {
    let output = lectern(&["languages"]);
    assert!(output.status.success());

    let text = stdout(&output);
    let python = text.lines().find(|l| l.starts_with("python ")).unwrap();
    assert!(python.contains(".py"));
    assert!(python.contains("python3 <file>"));
    assert!(text.contains("rustc <file> -o <path>/<name>.run && <path>/<name>.run"));
    assert!(text.lines().any(|l| l.starts_with("qr ") && l.ends_with("(built-in)")));
}
