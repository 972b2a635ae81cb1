use tracing::debug;

use super::field::{normalize, optional};
use crate::page::{Page, Rule};
use crate::profile::Experience;

const SECTION: &str = "experience";

/// Checked in order; the first marker present decides.
const VARIANT_MARKERS: &[(&str, PositionVariant)] = &[
    (".pv-entity__summary-info-v2", PositionVariant::Multiple),
    (".pv-entity__summary-info", PositionVariant::Single),
];

const SEPARATORS: &[&str] = &["–", "-", "—"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionVariant {
    Single,
    Multiple,
}

/// Start/end/duration split out of `"<start> – <end> · <duration>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Period {
    pub start: Option<String>,
    pub end: Option<String>,
    pub duration: Option<String>,
}

pub fn detect_variant<P: Page>(page: &P, block: &P::Node) -> PositionVariant {
    VARIANT_MARKERS
        .iter()
        .find(|(marker, _)| page.find(block, &Rule::css(marker)).is_some())
        .map(|(_, variant)| *variant)
        .unwrap_or(PositionVariant::Single)
}

pub fn title_path(variant: PositionVariant) -> Vec<Rule> {
    match variant {
        PositionVariant::Single => vec![Rule::css("h3")],
        PositionVariant::Multiple => vec![Rule::css("h3").nth(1), Rule::css("span").nth(1)],
    }
}

pub fn company_path(variant: PositionVariant) -> Vec<Rule> {
    match variant {
        PositionVariant::Single => vec![Rule::css("p").nth(1)],
        PositionVariant::Multiple => vec![Rule::css("h3").nth(0), Rule::css("span").nth(1)],
    }
}

/// Second span of the `n`th `h4`: dates, duration and location sit at fixed offsets.
fn h4_span(n: usize) -> [Rule; 2] {
    [Rule::css("h4").nth(n), Rule::css("span").nth(1)]
}

/// Fixed-offset split: tokens 0..2 are the start, token 2 the dash, the
/// rest up to `·` the end and whatever follows the duration. Fewer than four
/// tokens means the whole thing is unrecognised.
pub fn parse_period(raw: &str) -> Period {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() < 4 {
        return Period::default();
    }

    let rest = &tokens[3..];
    let (end, duration) = match rest.iter().position(|t| *t == "·") {
        Some(dot) => (&rest[..dot], &rest[dot + 1..]),
        None => (rest, &[][..]),
    };

    Period {
        start: normalize(&tokens[..2].join(" ")),
        end: normalize(&end.join(" ")),
        duration: normalize(&duration.join(" ")),
    }
}

/// `"2013 – 2015"`: whatever sits on either side of the dash token.
pub fn parse_education_period(raw: &str) -> (Option<String>, Option<String>) {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    match tokens.iter().position(|t| SEPARATORS.contains(t)) {
        Some(dash) if dash > 0 && dash + 1 < tokens.len() => (
            normalize(&tokens[..dash].join(" ")),
            normalize(&tokens[dash + 1..].join(" ")),
        ),
        _ => (None, None),
    }
}

/// One `.pv-position-entity` block of the signed-in layout.
pub fn parse_position<P: Page>(page: &P, block: &P::Node) -> Experience {
    let variant = detect_variant(page, block);
    let position_title = optional(page, block, &title_path(variant), SECTION, "position_title");
    let company = optional(page, block, &company_path(variant), SECTION, "company");

    let period = match optional(page, block, &h4_span(0), SECTION, "dates") {
        Some(raw) => {
            let period = parse_period(&raw);
            if period == Period::default() {
                debug!(section = SECTION, raw = %raw, "unrecognised period");
            }
            period
        }
        None => Period::default(),
    };
    let duration = period
        .duration
        .or_else(|| optional(page, block, &h4_span(1), SECTION, "duration"));
    let location = optional(page, block, &h4_span(2), SECTION, "location");

    Experience {
        position_title,
        company,
        from_date: period.start,
        to_date: period.end,
        duration,
        location,
    }
}

/// One `.experience-item__contents` entry of the public layout, which
/// exposes explicit date-range nodes instead of a period string.
pub fn parse_public_position<P: Page>(page: &P, item: &P::Node) -> Experience {
    let position_title = optional(page, item, &[Rule::css(".experience-item__title")], SECTION, "position_title");
    let company = optional(page, item, &[Rule::css(".experience-item__subtitle")], SECTION, "company");

    let dates = Rule::css(".experience-item__duration");
    let from_date = optional(
        page,
        item,
        &[dates.clone(), Rule::css(".date-range__start-date")],
        SECTION,
        "from_date",
    );
    // A started role with no end date is still running.
    let to_date = optional(page, item, &[dates, Rule::css(".date-range__end-date")], SECTION, "to_date")
        .or_else(|| from_date.as_ref().map(|_| "Present".to_string()));
    let duration = optional(page, item, &[Rule::css(".date-range__duration")], SECTION, "duration");
    let location = optional(page, item, &[Rule::css(".experience-item__location")], SECTION, "location");

    Experience {
        position_title,
        company,
        from_date,
        to_date,
        duration,
        location,
    }
}
