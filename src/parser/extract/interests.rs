use crate::page::{Page, Rule};
use crate::parser::field::optional;
use crate::parser::sections::{collect_entries, SectionKind};
use crate::profile::Interest;
use crate::settings::Settings;

pub fn authenticated<P: Page>(page: &P, settings: &Settings) -> Vec<Interest> {
    collect_entries(
        page,
        SectionKind::Interests,
        &Rule::css(".pv-interests-section"),
        &Rule::css(".pv-entity__summary-info"),
        settings.section_wait(),
        |entry| {
            optional(page, entry, &[Rule::css("h3")], "interests", "label").map(|label| Interest { label })
        },
    )
}
