use crate::page::{Page, Rule};
use crate::parser::position::{parse_position, parse_public_position};
use crate::parser::sections::{collect_entries, SectionKind};
use crate::profile::Experience;
use crate::settings::Settings;

pub fn authenticated<P: Page>(page: &P, settings: &Settings) -> Vec<Experience> {
    collect_entries(
        page,
        SectionKind::Experience,
        &Rule::css("#experience-section"),
        &Rule::css(".pv-position-entity"),
        settings.section_wait(),
        |block| Some(parse_position(page, block)),
    )
}

pub fn public<P: Page>(page: &P, settings: &Settings) -> Vec<Experience> {
    collect_entries(
        page,
        SectionKind::Experience,
        &Rule::css(".experience"),
        &Rule::css(".experience-item__contents"),
        settings.section_wait(),
        |item| Some(parse_public_position(page, item)),
    )
}
