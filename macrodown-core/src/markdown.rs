//! Markdown integration: macro expansion over pulldown-cmark event streams.
//!
//! The transformer walks the event stream, expands macro calls found in text
//! events, and splices each integrated node back as inline HTML. Macro
//! syntax inside code blocks and code spans is left untouched.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::dispatch::{ExpandError, MacroDispatcher};
use crate::locator;
use crate::registry::Registry;

/// Transformer that expands macro calls in a markdown event stream.
pub struct MacroTransformer<'a> {
    dispatcher: &'a MacroDispatcher,
}

impl<'a> MacroTransformer<'a> {
    pub fn new(dispatcher: &'a MacroDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Transform events, replacing `{{ Name("arg") }}` text with the
    /// expanded node as inline HTML. Calls are dispatched in document order.
    pub fn transform<'ev>(
        &self,
        events: Vec<Event<'ev>>,
    ) -> Result<Vec<Event<'ev>>, ExpandError> {
        let mut out = Vec::with_capacity(events.len());
        let mut in_code_block = false;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(_)) => {
                    in_code_block = true;
                    out.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    out.push(event);
                }
                Event::Text(text) if !in_code_block => {
                    self.expand_text_event(&text, &mut out)?;
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }

    fn expand_text_event<'ev>(
        &self,
        text: &CowStr<'_>,
        out: &mut Vec<Event<'ev>>,
    ) -> Result<(), ExpandError> {
        let mut last_end = 0;
        let mut replaced = false;

        for call in locator::calls(text) {
            if call.span.start > last_end {
                out.push(Event::Text(CowStr::Boxed(
                    text[last_end..call.span.start].to_string().into_boxed_str(),
                )));
            }
            let expansion = self.dispatcher.dispatch(&call)?;
            out.push(Event::Html(CowStr::Boxed(
                expansion.node.to_string().into_boxed_str(),
            )));
            last_end = call.span.end;
            replaced = true;
        }

        if replaced && last_end < text.len() {
            out.push(Event::Text(CowStr::Boxed(
                text[last_end..].to_string().into_boxed_str(),
            )));
        }
        if !replaced {
            out.push(Event::Text(CowStr::Boxed(
                text.to_string().into_boxed_str(),
            )));
        }
        Ok(())
    }
}

/// Markdown processor with macro expansion.
pub struct MacroProcessor {
    dispatcher: MacroDispatcher,
    options: Options,
}

impl MacroProcessor {
    pub fn new(registry: Registry) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        Self {
            dispatcher: MacroDispatcher::new(registry),
            options,
        }
    }

    pub fn dispatcher(&self) -> &MacroDispatcher {
        &self.dispatcher
    }

    /// Convert markdown to HTML, expanding macro calls along the way.
    pub fn render(&self, markdown: &str) -> Result<String, ExpandError> {
        let parser = Parser::new_ext(markdown, self.options);
        let events: Vec<Event> = parser.collect();

        let transformer = MacroTransformer::new(&self.dispatcher);
        let events = transformer.transform(events)?;

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        Ok(html_output)
    }
}
