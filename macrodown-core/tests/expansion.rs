//! End-to-end tests for the macro expansion pipeline
//!
//! These tests drive the public surface the way a host document engine
//! would: locate calls, dispatch them, and splice the results.

use macrodown_core::{
    find_macros, normalize, repair, ConfigError, FunctionTable, MacroDispatcher, MacroProcessor,
    Registry, RegistryConfig,
};

fn uppercase_macro(value: &str) -> String {
    value.to_uppercase()
}

fn youtube_macro(video_id: &str) -> String {
    format!(
        r#"<iframe src="https://www.youtube.com/embed/{video_id}"></iframe>"#
    )
}

fn function_table() -> FunctionTable {
    let mut table = FunctionTable::new();
    table.insert("demo", "uppercase", uppercase_macro);
    table.insert("demo", "youtube", youtube_macro);
    table
}

#[test]
fn test_normalize_idempotent_over_located_arguments() {
    let text = r#"{{ A("quoted") }} {{ B('single') }} {{ C(bare) }} {{ D(" spaced ") }}"#;

    for (_, args, _) in find_macros(text) {
        let arg = &args[0];
        assert_eq!(normalize(arg), arg.as_str());
    }
}

#[test]
fn test_enumeration_shape_and_order() {
    let text = r#"
Watch this:

{{ YouTubeVideo("abcd1234") }}

Then solve:

{{ Exercise("two-circles") }}

{{ Exercise("four-circles") }}
"#;

    let macros = find_macros(text);
    let summary: Vec<(&str, &str, usize)> = macros
        .iter()
        .map(|(name, args, kwargs)| (name.as_str(), args[0].as_str(), kwargs.len()))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("YouTubeVideo", "abcd1234", 0),
            ("Exercise", "two-circles", 0),
            ("Exercise", "four-circles", 0),
        ]
    );
    assert!(macros.iter().all(|(_, args, _)| args.len() == 1));
}

#[test]
fn test_registry_from_yaml_to_rendered_document() {
    let config = RegistryConfig::from_yaml(
        "UpperCase: \"demo:uppercase\"\nYouTubeVideo: \"demo:youtube\"\n",
    )
    .unwrap();
    let registry = Registry::from_config(&config, &function_table()).unwrap();
    let processor = MacroProcessor::new(registry);

    let html = processor
        .render("Intro.\n\n{{ YouTubeVideo(\"abcd1234\") }}\n\nOutro {{ UpperCase('x') }}.")
        .unwrap();

    assert!(html.contains("https://www.youtube.com/embed/abcd1234"));
    assert!(html.contains("X"));
    assert!(html.contains("Intro."));
}

#[test]
fn test_registry_config_from_file() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "UpperCase: \"demo:uppercase\"").unwrap();

    let config = RegistryConfig::from_file(file.path()).unwrap();
    let registry = Registry::from_config(&config, &function_table()).unwrap();
    assert!(registry.contains("UpperCase"));
}

#[test]
fn test_bad_reference_fails_before_any_document() {
    let config = RegistryConfig::from_yaml("Video: \"demo:vimeo\"\n").unwrap();
    let err = Registry::from_config(&config, &function_table())
        .err()
        .unwrap();

    assert!(matches!(err, ConfigError::UnresolvedReference { .. }));
}

#[test]
fn test_unknown_macro_does_not_abort_render() {
    let dispatcher = MacroDispatcher::new(Registry::builder().build());
    let out = dispatcher
        .expand_text(r#"x {{ Foo("anything") }} y"#)
        .unwrap();

    assert!(out.contains("Unknown macro: Foo"));
    assert!(out.starts_with("x "));
    assert!(out.ends_with(" y"));
}

#[test]
fn test_broken_handler_output_yields_well_formed_node() {
    let registry = Registry::builder()
        .register("Bold", |_| "<b>hello".to_string())
        .build();
    let node = MacroDispatcher::new(registry).expand("Bold", "\"_\"").unwrap();

    assert_eq!(node.to_string(), "<div><b>hello</b></div>");
}

#[test]
fn test_repair_snapshot() {
    insta::assert_snapshot!(
        repair("<p>hello, <i>world</p>plain & <b>broken"),
        @"<div><p>hello, <i>world</i></p>\nplain &amp; \n<b>broken</b></div>"
    );
}
