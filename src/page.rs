use std::fmt;
use std::time::Duration;

use anyhow::Result;

use crate::profile::LayoutVariant;

/// One step of a location path: a CSS selector and an optional position
/// among its matches (first match when unset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
    pub index: Option<usize>,
}

impl Rule {
    pub fn css(selector: &str) -> Self {
        Rule {
            selector: selector.to_string(),
            index: None,
        }
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn position(&self) -> usize {
        self.index.unwrap_or(0)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.selector, i),
            None => f.write_str(&self.selector),
        }
    }
}

/// How the session is given back once a pass ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    CloseTab,
    QuitSession,
}

pub trait Page {
    /// Opaque handle to an element. Handles never borrow the page, so the
    /// page can be scrolled or reloaded while the engine holds some.
    type Node: Clone + fmt::Debug;

    /// Root element of the current document, absent once released.
    fn document(&self) -> Option<Self::Node>;

    /// All matches of `rule.selector` below `scope`, in document order.
    /// `rule.index` is ignored here.
    fn find_all(&self, scope: &Self::Node, rule: &Rule) -> Vec<Self::Node>;

    /// The match of `rule` at `rule.index` below `scope`.
    fn find(&self, scope: &Self::Node, rule: &Rule) -> Option<Self::Node> {
        self.find_all(scope, rule).into_iter().nth(rule.position())
    }

    /// Rendered text of a node, untrimmed.
    fn text_of(&self, node: &Self::Node) -> String;

    /// Block until `rule` matches anywhere in the document or `timeout` runs out.
    fn wait_for(&self, rule: &Rule, timeout: Duration) -> Option<Self::Node>;

    /// Scroll the viewport to `fraction` (0..=1) of the document height.
    fn scroll_to_fraction(&self, fraction: f64);

    /// Activate a control, e.g. click a "show more" button.
    fn trigger(&self, control: &Self::Node) -> Result<()>;

    fn navigate(&mut self, url: &str) -> Result<()>;

    fn release(&mut self, mode: ReleaseMode) -> Result<()>;

    fn classify_layout(&self) -> LayoutVariant
    where
        Self: Sized,
    {
        crate::parser::layout::classify(self)
    }
}
