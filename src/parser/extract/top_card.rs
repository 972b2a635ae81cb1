use crate::page::{Page, Rule};
use crate::parser::field::optional;
use crate::parser::sections::{locate_container, SectionKind};
use crate::profile::Identity;
use crate::settings::Settings;

const SECTION: &str = "top_card";

pub fn authenticated<P: Page>(page: &P, settings: &Settings) -> Identity {
    let Ok(card) = locate_container(page, &Rule::css(".pv-top-card"), SectionKind::TopCard, settings.section_wait())
    else {
        return Identity::default();
    };

    let name = optional(page, &card, &[Rule::css("div > div > div > ul > li")], SECTION, "name");
    let title = optional(page, &card, &[Rule::css("div > div > div > h2")], SECTION, "title");
    let location = optional(page, &card, &[Rule::css(".pv-top-card--list-bullet li")], SECTION, "location")
        .or_else(|| {
            optional(
                page,
                &card,
                &[Rule::css("div > div > div > ul").nth(1), Rule::css("li")],
                SECTION,
                "location",
            )
        });

    Identity { name, title, location }
}

pub fn public<P: Page>(page: &P, settings: &Settings) -> Identity {
    let Ok(card) =
        locate_container(page, &Rule::css(".top-card-layout"), SectionKind::TopCard, settings.section_wait())
    else {
        return Identity::default();
    };

    Identity {
        name: optional(page, &card, &[Rule::css(".top-card-layout__title")], SECTION, "name"),
        title: optional(page, &card, &[Rule::css(".top-card-layout__headline")], SECTION, "title"),
        location: optional(page, &card, &[Rule::css(".top-card__subline-item")], SECTION, "location"),
    }
}
