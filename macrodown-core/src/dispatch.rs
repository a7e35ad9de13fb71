//! Macro dispatch and fragment integration.

use macrodown_types::{MacroCall, Span};
use thiserror::Error;
use tracing::{debug, warn};

use crate::argument::normalize;
use crate::locator;
use crate::node::{Element, NodeError};
use crate::registry::Registry;
use crate::repair::repair;

#[derive(Error, Debug)]
pub enum ExpandError {
    /// Repair must always produce well-formed markup, so a strict-parse
    /// failure here is a defect in the repair step rather than bad handler
    /// output or user input.
    #[error("Repaired fragment failed strict parse (repair defect): {source}")]
    Internal {
        #[source]
        source: NodeError,
    },
}

/// One integrated macro expansion: a well-formed node plus the source span
/// it replaces.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub node: Element,
    pub span: Span,
}

/// Dispatches located macro calls to registered handlers and integrates
/// their output into well-formed nodes.
pub struct MacroDispatcher {
    registry: Registry,
}

impl MacroDispatcher {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Expand one located call into a node ready for splicing at its span.
    pub fn dispatch(&self, call: &MacroCall) -> Result<Expansion, ExpandError> {
        let node = self.expand(&call.name, &call.raw_arg)?;
        Ok(Expansion {
            node,
            span: call.span,
        })
    }

    /// Expand a `(name, raw argument)` pair into a well-formed node.
    ///
    /// Unknown names render a visible placeholder instead of failing the
    /// expansion. Handler panics are not caught: a macro author's bug fails
    /// the whole render with the original panic intact.
    pub fn expand(&self, name: &str, raw_arg: &str) -> Result<Element, ExpandError> {
        let arg = normalize(raw_arg);
        let fragment = match self.registry.get(name) {
            Some(handler) => {
                debug!("Dispatching macro '{}' with argument '{}'", name, arg);
                handler(arg)
            }
            None => {
                warn!("Unknown macro '{}'", name);
                format!("<p>Unknown macro: {name}</p>")
            }
        };

        let repaired = repair(&fragment);
        Element::parse(&repaired).map_err(|source| ExpandError::Internal { source })
    }

    /// Run the scan-dispatch-splice loop over raw text, replacing every
    /// macro call with its serialized node. Calls are expanded strictly in
    /// document order; non-matching text passes through untouched.
    pub fn expand_text(&self, text: &str) -> Result<String, ExpandError> {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;

        while let Some(call) = locator::next_call(text, pos) {
            out.push_str(&text[pos..call.span.start]);
            let expansion = self.dispatch(&call)?;
            out.push_str(&expansion.node.to_string());
            pos = call.span.end;
        }
        out.push_str(&text[pos..]);
        Ok(out)
    }
}
