//! Parser for tree-construction fixtures in the html5lib format: a `#data`
//! section with the input markup, an optional `#errors` section, and a
//! `#document` section holding the expected tree in "| " notation.

use lazy_static::lazy_static;
use regex::Regex;

use crate::parser::Html5Parser;

lazy_static! {
    static ref SECTION: Regex = Regex::new(r"^#(data|errors|new-errors|document)$")
        .expect("section pattern is valid");
}

/// A single tree-construction test case
#[derive(Debug, Clone, Default)]
pub struct Test {
    /// Raw input markup
    pub data: String,
    /// Expected error descriptions; informational only
    pub errors: Vec<String>,
    /// Expected tree lines, each starting with "| "
    pub document: Vec<String>,
}

impl Test {
    /// The expected tree as one string, the way Document::tree_format
    /// produces it
    pub fn expected_tree(&self) -> String {
        let mut out = String::new();
        for line in &self.document {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Parses a fixture string into its test cases
pub fn fixture_from_str(input: &str) -> Vec<Test> {
    let mut tests = Vec::new();
    let mut current: Option<Test> = None;
    let mut section = "";

    for line in input.lines() {
        if let Some(captures) = SECTION.captures(line) {
            let name = captures.get(1).map_or("", |m| m.as_str());
            if name == "data" {
                if let Some(test) = current.take() {
                    tests.push(test);
                }
                current = Some(Test::default());
            }
            section = match name {
                "data" => "data",
                "errors" | "new-errors" => "errors",
                "document" => "document",
                _ => section,
            };
            continue;
        }

        let Some(test) = current.as_mut() else {
            continue;
        };
        match section {
            "data" => {
                if !test.data.is_empty() {
                    test.data.push('\n');
                }
                test.data.push_str(line);
            }
            "errors" => {
                if !line.is_empty() {
                    test.errors.push(line.to_string());
                }
            }
            "document" => {
                if !line.is_empty() {
                    test.document.push(line.to_string());
                }
            }
            _ => {}
        }
    }
    if let Some(test) = current.take() {
        tests.push(test);
    }

    tests
}

/// Parses the test input in one go and asserts the resulting tree
pub fn check(test: &Test) {
    let parser = Html5Parser::parse_str(&test.data);
    assert_eq!(
        parser.document().tree_format(),
        test.expected_tree(),
        "input: {:?}",
        test.data
    );
}

/// Parses the test input twice, split at every possible character boundary,
/// asserting that every split produces the same tree as the one-shot parse
pub fn check_streaming(test: &Test) {
    let expected = Html5Parser::parse_str(&test.data).document().tree_format();
    for (split, _) in test.data.char_indices().skip(1) {
        let mut parser = Html5Parser::new();
        parser.write(&test.data[..split]);
        parser.write(&test.data[split..]);
        parser.end();
        assert_eq!(
            parser.document().tree_format(),
            expected,
            "input {:?} split at byte {}",
            test.data,
            split
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = concat!(
        "#data\n",
        "<p>One\n",
        "#errors\n",
        "missing doctype\n",
        "#document\n",
        "| <html>\n",
        "|   <head>\n",
        "|   <body>\n",
        "|     <p>\n",
        "|       \"One\"\n",
        "\n",
        "#data\n",
        "<!DOCTYPE html>x\n",
        "#errors\n",
        "#document\n",
        "| <!DOCTYPE html>\n",
        "| <html>\n",
        "|   <head>\n",
        "|   <body>\n",
        "|     \"x\"\n",
    );

    #[test]
    fn fixture_parsing() {
        let tests = fixture_from_str(FIXTURE);
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].data, "<p>One");
        assert_eq!(tests[0].errors, vec!["missing doctype"]);
        assert_eq!(tests[0].document.len(), 5);
        assert_eq!(tests[1].data, "<!DOCTYPE html>x");
        assert!(tests[1].errors.is_empty());
    }

    #[test]
    fn fixture_tests_pass_against_the_parser() {
        for test in fixture_from_str(FIXTURE) {
            check(&test);
        }
    }
}
