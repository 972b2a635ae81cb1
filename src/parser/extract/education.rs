use crate::page::{Page, Rule};
use crate::parser::field::optional;
use crate::parser::position::parse_education_period;
use crate::parser::sections::{collect_entries, SectionKind};
use crate::profile::Education;
use crate::settings::Settings;

const SECTION: &str = "education";

pub fn authenticated<P: Page>(page: &P, settings: &Settings) -> Vec<Education> {
    collect_entries(
        page,
        SectionKind::Education,
        &Rule::css("#education-section"),
        &Rule::css(".pv-profile-section__list-item"),
        settings.section_wait(),
        |entry| {
            let institution = optional(page, entry, &[Rule::css(".pv-entity__school-name")], SECTION, "institution");
            let degree = optional(
                page,
                entry,
                &[Rule::css(".pv-entity__degree-name"), Rule::css("span").nth(1)],
                SECTION,
                "degree",
            );
            let (from_date, to_date) = optional(
                page,
                entry,
                &[Rule::css(".pv-entity__dates"), Rule::css("span").nth(1)],
                SECTION,
                "dates",
            )
            .map(|raw| parse_education_period(&raw))
            .unwrap_or_default();

            Some(Education {
                institution,
                degree,
                from_date,
                to_date,
            })
        },
    )
}

pub fn public<P: Page>(page: &P, settings: &Settings) -> Vec<Education> {
    collect_entries(
        page,
        SectionKind::Education,
        &Rule::css(".education__list"),
        &Rule::css(".result-card"),
        settings.section_wait(),
        |card| {
            let range = Rule::css(".date-range");
            Some(Education {
                institution: optional(page, card, &[Rule::css(".result-card__title")], SECTION, "institution"),
                degree: optional(page, card, &[Rule::css(".education__item--degree-info")], SECTION, "degree"),
                from_date: optional(
                    page,
                    card,
                    &[range.clone(), Rule::css(".date-range__start-date")],
                    SECTION,
                    "from_date",
                ),
                to_date: optional(page, card, &[range, Rule::css(".date-range__end-date")], SECTION, "to_date"),
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotPage;

    #[test]
    fn authenticated_schools() {
        let page = SnapshotPage::open("tests/fixtures/authenticated.html").unwrap();
        let edus = authenticated(&page, &Settings::default());
        assert_eq!(edus.len(), 2);

        assert_eq!(edus[0].institution.as_deref(), Some("Stanford University"));
        assert_eq!(edus[0].degree.as_deref(), Some("Master of Science - MS"));
        assert_eq!(edus[0].from_date.as_deref(), Some("2013"));
        assert_eq!(edus[0].to_date.as_deref(), Some("2015"));

        // No degree node; dates still read.
        assert_eq!(edus[1].institution.as_deref(), Some("University of Waterloo"));
        assert_eq!(edus[1].degree, None);
        assert_eq!(edus[1].from_date.as_deref(), Some("2009"));
        assert_eq!(edus[1].to_date.as_deref(), Some("2013"));
    }

    #[test]
    fn public_schools() {
        let page = SnapshotPage::open("tests/fixtures/public.html").unwrap();
        let edus = public(&page, &Settings::default());
        assert_eq!(edus.len(), 2);
        assert_eq!(edus[0].institution.as_deref(), Some("Imperial College London"));
        assert_eq!(edus[0].degree.as_deref(), Some("MSc, Statistics"));
        assert_eq!(edus[0].from_date.as_deref(), Some("2015"));
        assert_eq!(edus[0].to_date.as_deref(), Some("2016"));
        assert_eq!(
            edus[1],
            Education {
                institution: Some("University of Leeds".to_string()),
                ..Default::default()
            }
        );
    }
}
