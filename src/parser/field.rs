use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::page::{Page, Rule};

/// Trim and collapse to absence when nothing is left.
pub fn normalize(raw: &str) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Walk `path` below `scope`; each rule narrows the scope for the next one.
pub fn locate<P: Page>(page: &P, scope: &P::Node, path: &[Rule]) -> Option<P::Node> {
    let mut node = scope.clone();
    for rule in path {
        node = page.find(&node, rule)?;
    }
    Some(node)
}

/// Text at `path`, or `FieldAbsent` for a missing node, index or empty text.
pub fn text_at<P: Page>(
    page: &P,
    scope: &P::Node,
    path: &[Rule],
    section: &'static str,
    field: &'static str,
) -> ExtractResult<String> {
    locate(page, scope, path)
        .and_then(|node| normalize(&page.text_of(&node)))
        .ok_or(ExtractError::FieldAbsent { section, field })
}

/// `text_at` for optional fields: absence is logged at debug and becomes `None`.
pub fn optional<P: Page>(
    page: &P,
    scope: &P::Node,
    path: &[Rule],
    section: &'static str,
    field: &'static str,
) -> Option<String> {
    match text_at(page, scope, path, section, field) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(section, field, path = %describe(path), "{}", e);
            None
        }
    }
}

fn describe(path: &[Rule]) -> String {
    path.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(" > ")
}
