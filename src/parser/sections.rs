use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::page::{Page, Rule};
use crate::profile::{LayoutVariant, SectionData};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    TopCard,
    Summary,
    Experience,
    Education,
    Interests,
    Accomplishments,
}

impl SectionKind {
    pub fn name(&self) -> &'static str {
        match self {
            SectionKind::TopCard => "top_card",
            SectionKind::Summary => "summary",
            SectionKind::Experience => "experience",
            SectionKind::Education => "education",
            SectionKind::Interests => "interests",
            SectionKind::Accomplishments => "accomplishments",
        }
    }

    /// Empty output used when the section's container is missing.
    pub fn empty(&self) -> SectionData {
        match self {
            SectionKind::TopCard => SectionData::Identity(Default::default()),
            SectionKind::Summary => SectionData::Summary(None),
            SectionKind::Experience => SectionData::Experiences(Vec::new()),
            SectionKind::Education => SectionData::Educations(Vec::new()),
            SectionKind::Interests => SectionData::Interests(Vec::new()),
            SectionKind::Accomplishments => SectionData::Accomplishments(Vec::new()),
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One layout's way of reading profile sections.
///
/// Implementations never fail: a missing container or field degrades to an
/// empty section or an absent value. Fatal conditions are the assembler's.
pub trait SectionExtractor {
    fn layout(&self) -> LayoutVariant;

    /// Sections this layout carries, in extraction order.
    fn sections(&self) -> &'static [SectionKind];

    fn extract<P: Page>(&self, page: &P, section: SectionKind, settings: &Settings) -> SectionData;
}

/// Wait for a section container. A container that never shows up is a
/// structural mismatch, logged here and recovered by the caller.
pub fn locate_container<P: Page>(
    page: &P,
    rule: &Rule,
    section: SectionKind,
    timeout: Duration,
) -> ExtractResult<P::Node> {
    match page.wait_for(rule, timeout) {
        Some(node) => {
            debug!(section = section.name(), container = %rule, "container ready");
            Ok(node)
        }
        None => {
            let err = ExtractError::StructuralMismatch { section: section.name() };
            warn!(section = section.name(), container = %rule, "{}", err);
            Err(err)
        }
    }
}

/// Container → entries → one parsed item per entry, in document order.
/// Entries the parser rejects are skipped.
pub fn collect_entries<P, T, F>(
    page: &P,
    section: SectionKind,
    container: &Rule,
    entry: &Rule,
    timeout: Duration,
    mut parse: F,
) -> Vec<T>
where
    P: Page,
    F: FnMut(&P::Node) -> Option<T>,
{
    let Ok(node) = locate_container(page, container, section, timeout) else {
        return Vec::new();
    };
    let entries = page.find_all(&node, entry);
    let items: Vec<T> = entries.iter().filter_map(|e| parse(e)).collect();
    debug!(
        section = section.name(),
        entries = entries.len(),
        kept = items.len(),
        "section extracted"
    );
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::field::optional;
    use crate::snapshot::SnapshotPage;

    const HTML: &str = r#"<html><body>
        <ul id="list"><li>one</li><li> </li><li>three</li></ul>
    </body></html>"#;

    fn text_entries(page: &SnapshotPage, container: &str) -> Vec<String> {
        collect_entries(
            page,
            SectionKind::Interests,
            &Rule::css(container),
            &Rule::css("li"),
            Duration::from_millis(10),
            |li| optional(page, li, &[], "interests", "label"),
        )
    }

    #[test]
    fn entries_keep_order_and_skip_rejects() {
        let page = SnapshotPage::from_html(HTML);
        assert_eq!(text_entries(&page, "#list"), vec!["one", "three"]);
    }

    #[test]
    fn missing_container_is_structural_and_empty() {
        let page = SnapshotPage::from_html(HTML);
        let err = locate_container(&page, &Rule::css("#nope"), SectionKind::Education, Duration::ZERO)
            .unwrap_err();
        assert_eq!(err, ExtractError::StructuralMismatch { section: "education" });
        assert!(text_entries(&page, "#nope").is_empty());
    }

    #[test]
    fn empty_outputs_match_kind() {
        assert_eq!(SectionKind::Summary.empty(), SectionData::Summary(None));
        assert_eq!(SectionKind::Experience.empty(), SectionData::Experiences(vec![]));
    }
}
