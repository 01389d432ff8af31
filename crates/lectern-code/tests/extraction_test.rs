//! Block extraction and annotation filtering

use lectern_code::{hide_annotations, parse, strip_annotation_markers, CodeBlock, ParseError};
use lectern_test_utils::fixtures::data;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn block_strategy() -> impl Strategy<Value = (String, String, bool)> {
    (
        "[a-z][a-z0-9_]{0,7}",
        prop::collection::vec("[a-z][a-zA-Z0-9 =+();]{0,20}", 1..4),
        any::<bool>(),
    )
        .prop_map(|(language, lines, tilde)| (language, lines.join("\n"), tilde))
}

proptest! {
    #[test]
    fn prop_extraction_round_trip(
        blocks in prop::collection::vec(block_strategy(), 1..6),
        prose in "[A-Za-z ,.]{0,30}",
    ) {
        let mut text = String::new();
        for (language, body, tilde) in &blocks {
            let fence = if *tilde { "~~~" } else { "```" };
            text.push_str(&prose);
            text.push('\n');
            text.push_str(&format!("{fence}{language}\n{body}\n{fence}\n"));
        }

        let parsed = parse(&text).unwrap();
        prop_assert_eq!(parsed.len(), blocks.len());
        for (block, (language, body, _)) in parsed.iter().zip(&blocks) {
            prop_assert_eq!(&block.language, language);
            prop_assert_eq!(&block.code, body);
        }
    }

    #[test]
    fn prop_prose_without_fences_has_no_code(prose in "[A-Za-z0-9 ,.#\n]{0,200}") {
        prop_assert_eq!(parse(&prose), Err(ParseError::NoCodeBlock));
    }
}

#[test]
fn test_mixed_fence_styles() {
    let blocks = parse(data::TWO_BLOCKS).unwrap();
    assert_eq!(
        blocks,
        vec![
            CodeBlock::new("bash", "echo one"),
            CodeBlock::new("python", "print(\"two\")"),
        ]
    );
}

#[test]
fn test_no_code_fixture() {
    assert_eq!(parse(data::NO_CODE), Err(ParseError::NoCodeBlock));
}

#[test]
fn test_parse_error_message() {
    let message = ParseError::NoCodeBlock.to_string();
    assert!(message.starts_with("could not parse code block"));

    let err = parse("```ruby\nputs 1\n").unwrap_err();
    assert!(err.to_string().contains("line 1"));
}

#[test]
fn test_annotation_divergence() {
    let display = hide_annotations(data::ANNOTATED);
    assert!(!display.contains("hidden"));
    assert_eq!(display, "```go\npackage main\n\nfunc main() {\n}\n```\n");

    let blocks = parse(data::ANNOTATED).unwrap();
    assert_eq!(
        blocks[0].code,
        "package main\n\nfunc main() {\n fmt.Println(\"hidden\")\n}"
    );

    // Same line, same position: only the marker is gone
    let stripped = strip_annotation_markers(data::ANNOTATED);
    assert_eq!(
        stripped.lines().count(),
        data::ANNOTATED.lines().count()
    );
}

#[test]
fn test_hidden_only_block_disappears_from_display() {
    let text = format!("# Setup\n{}Done\n", data::fenced("bash", "/// export X=1"));
    assert_eq!(hide_annotations(&text), "# Setup\nDone\n");
    // but still runs
    assert_eq!(parse(&text).unwrap(), vec![CodeBlock::new("bash", " export X=1")]);
}
