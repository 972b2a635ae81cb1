use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::page::{Page, ReleaseMode, Rule};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Child-index path from the document root to an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

/// Saved rendered page. Nothing populates later, so waits never sleep.
#[derive(Debug)]
pub struct SnapshotPage {
    source: Option<PathBuf>,
    doc: Option<Html>,
    scrolls: RefCell<Vec<f64>>,
    triggered: RefCell<Vec<NodePath>>,
}

impl SnapshotPage {
    /// Load a snapshot from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut page = SnapshotPage::empty();
        page.load(path.as_ref())?;
        Ok(page)
    }

    /// Wrap an in-memory document (no backing file, `navigate` still loads paths).
    pub fn from_html(html: &str) -> Self {
        let mut page = SnapshotPage::empty();
        page.doc = Some(Html::parse_document(html));
        page
    }

    fn empty() -> Self {
        SnapshotPage {
            source: None,
            doc: None,
            scrolls: RefCell::new(Vec::new()),
            triggered: RefCell::new(Vec::new()),
        }
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {:?}", path))?;
        self.doc = Some(Html::parse_document(&html));
        self.source = Some(path.to_path_buf());
        self.scrolls.borrow_mut().clear();
        self.triggered.borrow_mut().clear();
        debug!(path = ?path, bytes = html.len(), "snapshot loaded");
        Ok(())
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Every scroll fraction requested since the last load, in order.
    pub fn scroll_history(&self) -> Vec<f64> {
        self.scrolls.borrow().clone()
    }

    pub fn triggered_count(&self) -> usize {
        self.triggered.borrow().len()
    }

    pub fn is_released(&self) -> bool {
        self.doc.is_none()
    }

    fn resolve(&self, path: &NodePath) -> Option<ElementRef<'_>> {
        let doc = self.doc.as_ref()?;
        let mut node = doc.tree.root();
        for &step in &path.0 {
            node = node.children().nth(step)?;
        }
        ElementRef::wrap(node)
    }
}

fn locate(el: ElementRef<'_>) -> NodePath {
    let mut steps = Vec::new();
    let mut node = *el;
    while let Some(parent) = node.parent() {
        steps.push(node.prev_siblings().count());
        node = parent;
    }
    steps.reverse();
    NodePath(steps)
}

fn parse_selector(rule: &Rule) -> Option<Selector> {
    match Selector::parse(&rule.selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector = %rule.selector, error = ?e, "invalid selector");
            None
        }
    }
}

/// Rendered text: text nodes concatenated, whitespace runs collapsed.
fn rendered_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    WHITESPACE_RE.replace_all(&raw, " ").into_owned()
}

impl Page for SnapshotPage {
    type Node = NodePath;

    fn document(&self) -> Option<NodePath> {
        self.doc.as_ref().map(|d| locate(d.root_element()))
    }

    fn find_all(&self, scope: &NodePath, rule: &Rule) -> Vec<NodePath> {
        let (Some(scope), Some(sel)) = (self.resolve(scope), parse_selector(rule)) else {
            return Vec::new();
        };
        scope.select(&sel).map(locate).collect()
    }

    fn text_of(&self, node: &NodePath) -> String {
        self.resolve(node).map(rendered_text).unwrap_or_default()
    }

    fn wait_for(&self, rule: &Rule, timeout: Duration) -> Option<NodePath> {
        let found = self.document().and_then(|root| self.find(&root, rule));
        if found.is_none() {
            debug!(rule = %rule, timeout_ms = timeout.as_millis() as u64, "wait timed out on static snapshot");
        }
        found
    }

    fn scroll_to_fraction(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        debug!(fraction, "scroll");
        self.scrolls.borrow_mut().push(fraction);
    }

    fn trigger(&self, control: &NodePath) -> Result<()> {
        if self.resolve(control).is_none() {
            anyhow::bail!("control {:?} is not attached to the document", control);
        }
        debug!(control = ?control, "trigger");
        self.triggered.borrow_mut().push(control.clone());
        Ok(())
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        self.load(Path::new(path))
    }

    fn release(&mut self, mode: ReleaseMode) -> Result<()> {
        debug!(mode = ?mode, source = ?self.source, "releasing snapshot");
        self.doc = None;
        Ok(())
    }
}
