//! Macro call location for `{{ Name("arg") }}` syntax.

use macrodown_types::{MacroCall, Span};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::argument::normalize;

static MACRO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{ *(\w+) *\(([^{}]*)\) *\}\}").expect("valid macro regex"));

/// Find the next macro call at or after byte offset `from`.
///
/// Malformed macro-like text (missing parentheses, braces inside the
/// argument, unterminated `}}`) simply does not match and stays literal.
pub fn next_call(text: &str, from: usize) -> Option<MacroCall> {
    if from > text.len() {
        return None;
    }
    let caps = MACRO_RE.captures_at(text, from)?;
    let full = caps.get(0)?;
    Some(MacroCall::new(
        &caps[1],
        &caps[2],
        Span::new(full.start(), full.end()),
    ))
}

/// Iterate over every macro call in `text`, in document order.
pub fn calls(text: &str) -> Calls<'_> {
    Calls { text, pos: 0 }
}

/// Iterator over the macro calls in a text buffer.
pub struct Calls<'a> {
    text: &'a str,
    pos: usize,
}

impl Iterator for Calls<'_> {
    type Item = MacroCall;

    fn next(&mut self) -> Option<MacroCall> {
        let call = next_call(self.text, self.pos)?;
        self.pos = call.span.end;
        Some(call)
    }
}

/// Bulk enumeration of all macro calls in `text`.
///
/// Returns `(name, arguments, keyword_arguments)` triples in document order.
/// The grammar takes exactly one argument today, so the argument list always
/// has one (normalized) element and the keyword map is always empty; the
/// shape anticipates a future multi-argument grammar.
pub fn find_macros(text: &str) -> Vec<(String, Vec<String>, BTreeMap<String, String>)> {
    calls(text)
        .map(|call| {
            let arg = normalize(&call.raw_arg).to_string();
            (call.name, vec![arg], BTreeMap::new())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_macros_in_order() {
        let text = r#"
    Let's look at this example:

    {{ Example("example-id") }}

    And solve this exercise:

    {{ Exercise("exercise-id") }}
    "#;

        let macros = find_macros(text);
        assert_eq!(
            macros,
            vec![
                (
                    "Example".to_string(),
                    vec!["example-id".to_string()],
                    BTreeMap::new()
                ),
                (
                    "Exercise".to_string(),
                    vec!["exercise-id".to_string()],
                    BTreeMap::new()
                ),
            ]
        );
    }

    #[test]
    fn test_spans_bound_the_call_exactly() {
        let text = r#"a {{ One("x") }} b {{ Two("y") }} c"#;
        let found: Vec<MacroCall> = calls(text).collect();

        assert_eq!(found.len(), 2);
        assert_eq!(&text[found[0].span.start..found[0].span.end], r#"{{ One("x") }}"#);
        assert_eq!(&text[found[1].span.start..found[1].span.end], r#"{{ Two("y") }}"#);
        assert!(!found[0].span.overlaps(&found[1].span));
    }

    #[test]
    fn test_raw_argument_is_verbatim() {
        let call = next_call(r#"{{ Hello(" 'world' ") }}"#, 0).unwrap();
        assert_eq!(call.name, "Hello");
        assert_eq!(call.raw_arg, r#"" 'world' ""#);
    }

    #[test]
    fn test_malformed_calls_do_not_match() {
        assert!(next_call("{{ Broken(no-quotes-no-close", 0).is_none());
        assert!(next_call("{{ NoParens }}", 0).is_none());
        assert!(next_call("{{ Brace({inner}) }}", 0).is_none());
        assert!(find_macros("nothing here").is_empty());
    }

    #[test]
    fn test_next_call_resumes_after_offset() {
        let text = r#"{{ A("1") }} {{ B("2") }}"#;
        let first = next_call(text, 0).unwrap();
        let second = next_call(text, first.span.end).unwrap();

        assert_eq!(first.name, "A");
        assert_eq!(second.name, "B");
        assert!(next_call(text, second.span.end).is_none());
    }

    #[test]
    fn test_unquoted_argument() {
        let macros = find_macros("{{ YouTubeVideo(abcd1234) }}");
        assert_eq!(macros[0].0, "YouTubeVideo");
        assert_eq!(macros[0].1, vec!["abcd1234".to_string()]);
    }
}
