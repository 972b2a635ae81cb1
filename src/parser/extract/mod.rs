pub mod accomplishments;
pub mod education;
pub mod experience;
pub mod interests;
pub mod summary;
pub mod top_card;

use super::sections::{SectionExtractor, SectionKind};
use crate::page::Page;
use crate::profile::{LayoutVariant, SectionData};
use crate::settings::Settings;

/// Signed-in profile page: every section is present and lazily populated.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthenticatedLayout;

/// Logged-out public profile: identity, experience and education only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublicLayout;

impl SectionExtractor for AuthenticatedLayout {
    fn layout(&self) -> LayoutVariant {
        LayoutVariant::Authenticated
    }

    fn sections(&self) -> &'static [SectionKind] {
        &[
            SectionKind::TopCard,
            SectionKind::Summary,
            SectionKind::Experience,
            SectionKind::Education,
            SectionKind::Interests,
            SectionKind::Accomplishments,
        ]
    }

    fn extract<P: Page>(&self, page: &P, section: SectionKind, settings: &Settings) -> SectionData {
        match section {
            SectionKind::TopCard => SectionData::Identity(top_card::authenticated(page, settings)),
            SectionKind::Summary => SectionData::Summary(summary::authenticated(page, settings)),
            SectionKind::Experience => SectionData::Experiences(experience::authenticated(page, settings)),
            SectionKind::Education => SectionData::Educations(education::authenticated(page, settings)),
            SectionKind::Interests => SectionData::Interests(interests::authenticated(page, settings)),
            SectionKind::Accomplishments => {
                SectionData::Accomplishments(accomplishments::authenticated(page, settings))
            }
        }
    }
}

impl SectionExtractor for PublicLayout {
    fn layout(&self) -> LayoutVariant {
        LayoutVariant::Public
    }

    fn sections(&self) -> &'static [SectionKind] {
        &[SectionKind::TopCard, SectionKind::Experience, SectionKind::Education]
    }

    fn extract<P: Page>(&self, page: &P, section: SectionKind, settings: &Settings) -> SectionData {
        match section {
            SectionKind::TopCard => SectionData::Identity(top_card::public(page, settings)),
            SectionKind::Experience => SectionData::Experiences(experience::public(page, settings)),
            SectionKind::Education => SectionData::Educations(education::public(page, settings)),
            // Not rendered for logged-out viewers.
            other => other.empty(),
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotPage;

    fn fixture(name: &str) -> SnapshotPage {
        SnapshotPage::open(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn authenticated_runs_every_section() {
        let page = fixture("authenticated");
        let settings = Settings::default();
        let layout = AuthenticatedLayout;
        assert_eq!(layout.sections().len(), 6);

        let SectionData::Experiences(exps) = layout.extract(&page, SectionKind::Experience, &settings) else {
            panic!("wrong section data");
        };
        assert_eq!(exps.len(), 3);
        let SectionData::Accomplishments(accs) = layout.extract(&page, SectionKind::Accomplishments, &settings)
        else {
            panic!("wrong section data");
        };
        assert_eq!(accs.len(), 4);
    }

    #[test]
    fn public_skips_signed_in_sections() {
        let page = fixture("public");
        let settings = Settings::default();
        let layout = PublicLayout;
        assert!(!layout.sections().contains(&SectionKind::Summary));
        assert_eq!(
            layout.extract(&page, SectionKind::Interests, &settings),
            SectionData::Interests(vec![])
        );
        let SectionData::Educations(edus) = layout.extract(&page, SectionKind::Education, &settings) else {
            panic!("wrong section data");
        };
        assert_eq!(edus.len(), 2);
    }

    #[test]
    fn same_selectors_miss_on_the_other_layout() {
        let settings = Settings::default();
        let public = fixture("public");
        assert_eq!(
            AuthenticatedLayout.extract(&public, SectionKind::Experience, &settings),
            SectionData::Experiences(vec![])
        );
        let authed = fixture("authenticated");
        assert_eq!(
            PublicLayout.extract(&authed, SectionKind::Education, &settings),
            SectionData::Educations(vec![])
        );
    }
}
