use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::page::{Page, Rule};
use crate::parser::field::normalize;
use crate::parser::sections::{locate_container, SectionKind};
use crate::settings::Settings;

static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const SECTION: &str = "summary";

/// The About text. Clamped summaries show a few visible lines and a
/// "see more" control on the last one; clicking it populates the full text
/// in a raw-line node.
pub fn authenticated<P: Page>(page: &P, settings: &Settings) -> Option<String> {
    let container = locate_container(
        page,
        &Rule::css(".pv-about__summary-text"),
        SectionKind::Summary,
        settings.section_wait(),
    )
    .ok()?;

    let lines = page.find_all(&container, &Rule::css(".lt-line-clamp__line"));
    let Some(last) = lines.last() else {
        debug!(section = SECTION, "no clamped lines, reading container text");
        return normalize(&page.text_of(&container));
    };

    if let Some(button) = page.find(last, &Rule::css("#line-clamp-show-more-button")) {
        match expand(page, &container, &button, settings) {
            Some(full) => return Some(full),
            None => debug!(section = SECTION, "expanded text unavailable, joining visible lines"),
        }
    }

    join_lines(page, &lines)
}

fn expand<P: Page>(page: &P, container: &P::Node, button: &P::Node, settings: &Settings) -> Option<String> {
    if let Err(e) = page.trigger(button) {
        warn!(section = SECTION, error = %e, "failed to trigger show-more control");
        return None;
    }
    let raw_line = Rule::css(".lt-line-clamp__raw-line");
    page.wait_for(&raw_line, settings.expand_wait())?;
    // Other sections clamp their text too; only the About raw line counts.
    let raw = page.find(container, &raw_line)?;
    strip_breaks(&page.text_of(&raw))
}

/// Literal `<br>` markers survive into the raw text; they separate sentences.
fn strip_breaks(raw: &str) -> Option<String> {
    let text = BR_RE.replace_all(raw, " ");
    normalize(&SPACES_RE.replace_all(&text, " "))
}

fn join_lines<P: Page>(page: &P, lines: &[P::Node]) -> Option<String> {
    let parts: Vec<String> = lines
        .iter()
        .filter_map(|line| normalize(&page.text_of(line)))
        .collect();
    normalize(&parts.join(" "))
}
