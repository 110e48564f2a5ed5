//! Streaming equivalence: any chunking of the input must produce the same
//! tree as parsing it in one piece, with tokens cut at the chunk boundary
//! resuming when the rest arrives.

use strandhtml::parser::Html5Parser;
use test_case::test_case;

fn one_shot(input: &str) -> String {
    Html5Parser::parse_str(input).document().tree_format()
}

#[test_case("<!DOCTYPE html><p>hello &amp; goodbye</p>"; "entity in text")]
#[test_case("<!DOCTYPE html><p title=\"&copy1 x&#x41;\">t"; "entities in attribute")]
#[test_case("<!DOCTYPE html><!--a comment--><p>x"; "comment")]
#[test_case("<!DOCTYPE html><title>a<b</title><p>x"; "rcdata content")]
#[test_case("<!DOCTYPE html><table><b><tr><td>x</td></tr></table>y"; "table with fostering")]
#[test_case("<!DOCTYPE html><a href=x>1<b>2<a href=y>3</b>4</a>"; "adoption agency")]
#[test_case("<!DOCTYPE html><ul><li>A<li>B</ul>"; "implied end tags")]
#[test_case("<!DOCTYPE html><pre>\nkeep</pre>"; "newline after pre")]
fn every_split_matches_the_one_shot_parse(input: &str) {
    let expected = one_shot(input);
    for (split, _) in input.char_indices().skip(1) {
        let mut parser = Html5Parser::new();
        parser.write(&input[..split]);
        parser.write(&input[split..]);
        parser.end();
        assert_eq!(
            parser.document().tree_format(),
            expected,
            "split at byte {}",
            split
        );
    }
}

#[test]
fn entity_suspended_mid_name() {
    let mut parser = Html5Parser::new();
    parser.write("<!DOCTYPE html><p>x&am");
    parser.write("p;y");
    parser.end();
    assert_eq!(
        parser.document().tree_format(),
        one_shot("<!DOCTYPE html><p>x&amp;y")
    );
}

#[test]
fn single_character_chunks() {
    let input = "<!DOCTYPE html><table><tr><td>a&notin;b</td></tr></table>";
    let expected = one_shot(input);

    let mut parser = Html5Parser::new();
    let mut buffer = [0u8; 4];
    for c in input.chars() {
        parser.write(c.encode_utf8(&mut buffer));
    }
    parser.end();
    assert_eq!(parser.document().tree_format(), expected);
}

#[test]
fn tree_is_inspectable_before_the_input_ends() {
    let mut parser = Html5Parser::new();
    parser.write("<!DOCTYPE html><p>first</p><p>sec");

    // the completed first paragraph is already in the tree
    let partial = parser.document().tree_format();
    assert!(partial.contains("\"first\""));

    parser.write("ond</p>");
    parser.end();
    let full = parser.document().tree_format();
    assert!(full.contains("\"second\""));
}

#[test]
fn end_without_input_yields_the_skeleton() {
    let mut parser = Html5Parser::new();
    parser.end();
    assert_eq!(
        parser.document().tree_format(),
        "| <html>\n|   <head>\n|   <body>\n"
    );
}

#[test]
fn writes_after_end_are_ignored_by_the_finished_parser() {
    let mut parser = Html5Parser::new();
    parser.write("<!DOCTYPE html><p>x");
    parser.end();
    let frozen = parser.document().tree_format();
    parser.write("<p>y");
    assert_eq!(parser.document().tree_format(), frozen);
}
