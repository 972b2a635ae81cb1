use tracing::debug;

use crate::page::{Page, Rule};
use crate::parser::field::{normalize, optional};
use crate::parser::sections::{collect_entries, SectionKind};
use crate::profile::Accomplishment;
use crate::settings::Settings;

const SECTION: &str = "accomplishments";

/// One entry per listed item, each paired with its block's category heading.
pub fn authenticated<P: Page>(page: &P, settings: &Settings) -> Vec<Accomplishment> {
    let blocks = collect_entries(
        page,
        SectionKind::Accomplishments,
        &Rule::css(".pv-accomplishments-section"),
        &Rule::css(".pv-accomplishments-block__content"),
        settings.section_wait(),
        |block| Some(category_items(page, block)),
    );
    blocks.into_iter().flatten().collect()
}

fn category_items<P: Page>(page: &P, block: &P::Node) -> Vec<Accomplishment> {
    let Some(category) = optional(page, block, &[Rule::css("h3")], SECTION, "category") else {
        return Vec::new();
    };
    let Some(list) = page.find(block, &Rule::css("ul")) else {
        debug!(section = SECTION, category = %category, "category without items");
        return Vec::new();
    };

    page.find_all(&list, &Rule::css("li"))
        .iter()
        .filter_map(|li| normalize(&page.text_of(li)))
        .map(|title| Accomplishment {
            category: category.clone(),
            title,
        })
        .collect()
}
