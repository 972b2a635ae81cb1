use std::fmt;

use tracing::{debug, info, warn};

use super::extract::{AuthenticatedLayout, PublicLayout};
use super::sections::{SectionExtractor, SectionKind};
use crate::error::{ExtractError, ExtractResult};
use crate::page::{Page, ReleaseMode};
use crate::profile::{LayoutVariant, ProfileRecord, SectionData};
use crate::resolver::HumanResolver;
use crate::settings::Settings;

/// Scroll position before each lazily loaded section.
const EXPERIENCE_SCROLL: f64 = 1.0 / 2.0;
const EDUCATION_SCROLL: f64 = 1.0 / 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Start,
    Blocked { attempts: u32 },
    Classified(LayoutVariant),
    SectionsExtracted,
    Done,
    Failed,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassState::Start => f.write_str("start"),
            PassState::Blocked { attempts } => write!(f, "blocked({})", attempts),
            PassState::Classified(layout) => write!(f, "classified({})", layout),
            PassState::SectionsExtracted => f.write_str("sections_extracted"),
            PassState::Done => f.write_str("done"),
            PassState::Failed => f.write_str("failed"),
        }
    }
}

/// Owns the record while a pass runs and borrows the session exclusively.
pub struct Assembler<'a, P: Page, R: HumanResolver> {
    page: &'a mut P,
    resolver: &'a mut R,
    settings: &'a Settings,
    target: Option<String>,
    navigate_first: bool,
    state: PassState,
}

impl<'a, P: Page, R: HumanResolver> Assembler<'a, P, R> {
    pub fn new(page: &'a mut P, resolver: &'a mut R, settings: &'a Settings) -> Self {
        Assembler {
            page,
            resolver,
            settings,
            target: None,
            navigate_first: false,
            state: PassState::Start,
        }
    }

    /// URL the record is attributed to, also reloaded after an interstitial
    /// is cleared.
    pub fn target(mut self, url: impl Into<String>) -> Self {
        self.target = Some(url.into());
        self
    }

    /// Like `target`, and navigate there before classifying.
    pub fn open(mut self, url: impl Into<String>) -> Self {
        self.target = Some(url.into());
        self.navigate_first = true;
        self
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// Drive the pass to `Done` or `Failed`. Releases the session at the end
    /// when `release_on_complete` is set.
    pub fn run(&mut self) -> ExtractResult<ProfileRecord> {
        let outcome = self.drive();
        match &outcome {
            Ok(record) => {
                self.transition(PassState::Done);
                info!(
                    layout = %record.layout,
                    name = record.name.as_deref().unwrap_or("-"),
                    experiences = record.experiences.len(),
                    educations = record.educations.len(),
                    "profile extracted"
                );
                let mode = match record.layout {
                    LayoutVariant::Public => ReleaseMode::CloseTab,
                    _ => ReleaseMode::QuitSession,
                };
                self.finish(mode);
            }
            Err(e) => {
                self.transition(PassState::Failed);
                warn!(target_url = self.target.as_deref().unwrap_or("-"), kind = e.kind(), "{}", e);
                self.finish(ReleaseMode::QuitSession);
            }
        }
        outcome
    }

    fn drive(&mut self) -> ExtractResult<ProfileRecord> {
        if self.navigate_first {
            if let Some(url) = self.target.clone() {
                if let Err(e) = self.page.navigate(&url) {
                    warn!(url = %url, error = %e, "initial navigation failed");
                }
            }
        }

        let layout = self.classify_until_unblocked()?;
        let record = self.extract_sections(layout)?;
        self.transition(PassState::SectionsExtracted);
        Ok(record)
    }

    /// Classify; while blocked, hand over to the resolver, reload and
    /// classify again, up to `blocked_retry_limit` attempts.
    fn classify_until_unblocked(&mut self) -> ExtractResult<LayoutVariant> {
        let limit = self.settings.blocked_retry_limit;
        let mut attempts = 0;

        loop {
            let layout = self.page.classify_layout();
            if layout != LayoutVariant::Blocked {
                self.transition(PassState::Classified(layout));
                return Ok(layout);
            }

            self.transition(PassState::Blocked { attempts });
            if attempts >= limit {
                return Err(ExtractError::InterstitialBlocked { attempts });
            }
            attempts += 1;

            let resolution = self.resolver.await_resolution(attempts);
            debug!(attempt = attempts, resolution = ?resolution, "interstitial resolution");

            if let Some(url) = self.target.as_deref() {
                if let Err(e) = self.page.navigate(url) {
                    warn!(url, attempt = attempts, error = %e, "reload after interstitial failed");
                }
            }
        }
    }

    fn extract_sections(&mut self, layout: LayoutVariant) -> ExtractResult<ProfileRecord> {
        match layout {
            LayoutVariant::Authenticated => self.run_strategy(&AuthenticatedLayout),
            LayoutVariant::Public => self.run_strategy(&PublicLayout),
            LayoutVariant::Blocked => Err(ExtractError::InterstitialBlocked { attempts: 0 }),
        }
    }

    fn run_strategy<S: SectionExtractor>(&mut self, strategy: &S) -> ExtractResult<ProfileRecord> {
        let layout = strategy.layout();
        let mut record = ProfileRecord::new(self.target.clone(), layout);
        let page: &P = &*self.page;
        let settings = self.settings;

        for &section in strategy.sections() {
            match section {
                SectionKind::Experience => page.scroll_to_fraction(EXPERIENCE_SCROLL),
                SectionKind::Education => page.scroll_to_fraction(EDUCATION_SCROLL),
                _ => {}
            }

            let data = strategy.extract(page, section, settings);
            if let SectionData::Identity(identity) = &data {
                if identity.name.is_none() {
                    return Err(ExtractError::MandatoryFieldMissing { layout, field: "name" });
                }
            }
            debug!(section = section.name(), "section absorbed");
            record.absorb(data);
        }

        Ok(record)
    }

    fn finish(&mut self, mode: ReleaseMode) {
        if !self.settings.release_on_complete {
            return;
        }
        match self.page.release(mode) {
            Ok(()) => debug!(mode = ?mode, "session released"),
            Err(e) => warn!(mode = ?mode, error = %e, "failed to release session"),
        }
    }

    fn transition(&mut self, next: PassState) {
        debug!(from = %self.state, to = %next, "pass transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{NonInteractive, Resolution};
    use crate::snapshot::SnapshotPage;

    fn fixture(name: &str) -> SnapshotPage {
        SnapshotPage::open(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn keep_open() -> Settings {
        Settings {
            release_on_complete: false,
            ..Default::default()
        }
    }

    /// Counts calls and always claims success.
    #[derive(Default)]
    struct Counting {
        calls: Vec<u32>,
    }

    impl HumanResolver for Counting {
        fn await_resolution(&mut self, attempt: u32) -> Resolution {
            self.calls.push(attempt);
            Resolution::Resolved
        }
    }

    #[test]
    fn authenticated_profile() {
        let mut page = fixture("authenticated");
        let settings = keep_open();
        let mut resolver = NonInteractive;
        let mut asm = Assembler::new(&mut page, &mut resolver, &settings).target("https://example.com/in/jane-doe");
        let record = asm.run().unwrap();
        assert_eq!(asm.state(), PassState::Done);

        assert_eq!(record.url.as_deref(), Some("https://example.com/in/jane-doe"));
        assert_eq!(record.layout, LayoutVariant::Authenticated);
        assert_eq!(record.name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.location.as_deref(), Some("San Francisco Bay Area"));
        assert!(record.summary.as_deref().unwrap().starts_with("Engineer building"));
        assert_eq!(record.experiences.len(), 3);
        assert_eq!(record.educations.len(), 2);
        assert_eq!(record.interests.len(), 2);
        assert_eq!(record.accomplishments.len(), 4);
    }

    #[test]
    fn scrolls_before_lazy_sections() {
        let mut page = fixture("authenticated");
        let settings = keep_open();
        let mut resolver = NonInteractive;
        Assembler::new(&mut page, &mut resolver, &settings).run().unwrap();
        assert_eq!(page.scroll_history(), vec![EXPERIENCE_SCROLL, EDUCATION_SCROLL]);
    }

    #[test]
    fn public_profile_has_no_signed_in_sections() {
        let mut page = fixture("public");
        let settings = keep_open();
        let mut resolver = NonInteractive;
        let record = Assembler::new(&mut page, &mut resolver, &settings).run().unwrap();
        assert_eq!(record.layout, LayoutVariant::Public);
        assert_eq!(record.name.as_deref(), Some("Ravi Patel"));
        assert_eq!(record.experiences.len(), 2);
        assert_eq!(record.educations.len(), 2);
        assert_eq!(record.summary, None);
        assert!(record.interests.is_empty());
        assert!(record.accomplishments.is_empty());
    }

    #[test]
    fn missing_experience_section_still_produces_record() {
        let mut page = fixture("authenticated_sparse");
        let settings = keep_open();
        let mut resolver = NonInteractive;
        let record = Assembler::new(&mut page, &mut resolver, &settings).run().unwrap();
        assert_eq!(record.name.as_deref(), Some("Sam Lee"));
        assert!(record.experiences.is_empty());
        assert!(record.educations.is_empty());
        assert_eq!(record.summary.as_deref(), Some("Builds compilers. Likes parsers."));
    }

    #[test]
    fn two_passes_are_identical() {
        let settings = keep_open();
        let mut resolver = NonInteractive;
        let mut first = fixture("authenticated");
        let a = Assembler::new(&mut first, &mut resolver, &settings).run().unwrap();
        let mut second = fixture("authenticated");
        let b = Assembler::new(&mut second, &mut resolver, &settings).run().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn blocked_exhausts_retry_limit() {
        let mut page = fixture("challenge");
        let settings = keep_open();
        let mut resolver = Counting::default();
        let mut asm = Assembler::new(&mut page, &mut resolver, &settings);
        let err = asm.run().unwrap_err();
        assert_eq!(asm.state(), PassState::Failed);
        assert_eq!(err, ExtractError::InterstitialBlocked { attempts: 10 });
        assert_eq!(resolver.calls, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn timed_out_resolutions_count_as_attempts() {
        let mut page = fixture("challenge");
        let settings = Settings {
            blocked_retry_limit: 3,
            ..keep_open()
        };
        let mut resolver = NonInteractive;
        let err = Assembler::new(&mut page, &mut resolver, &settings).run().unwrap_err();
        assert_eq!(err, ExtractError::InterstitialBlocked { attempts: 3 });
    }

    #[test]
    fn blocked_then_resolved() {
        let mut page = fixture("challenge");
        let settings = keep_open();
        let mut resolver = Counting::default();
        let record = Assembler::new(&mut page, &mut resolver, &settings)
            .target("tests/fixtures/authenticated.html")
            .run()
            .unwrap();
        assert_eq!(resolver.calls, vec![1]);
        assert_eq!(record.name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn missing_name_is_fatal() {
        let mut page = SnapshotPage::from_html(
            r#"<html><body><a class="global-nav__primary-link">Home</a>
                <section id="experience-section"></section></body></html>"#,
        );
        let settings = keep_open();
        let mut resolver = NonInteractive;
        let err = Assembler::new(&mut page, &mut resolver, &settings).run().unwrap_err();
        assert_eq!(
            err,
            ExtractError::MandatoryFieldMissing {
                layout: LayoutVariant::Authenticated,
                field: "name"
            }
        );
    }

    #[test]
    fn public_card_without_title_is_fatal() {
        let mut page = SnapshotPage::from_html(
            r#"<html><body><section class="top-card-layout">
                <h2 class="top-card-layout__headline">Data Scientist</h2>
            </section></body></html>"#,
        );
        let settings = keep_open();
        let mut resolver = NonInteractive;
        let mut asm = Assembler::new(&mut page, &mut resolver, &settings);
        let err = asm.run().unwrap_err();
        assert_eq!(asm.state(), PassState::Failed);
        assert_eq!(
            err,
            ExtractError::MandatoryFieldMissing {
                layout: LayoutVariant::Public,
                field: "name"
            }
        );
    }

    #[test]
    fn open_navigates_before_classifying() {
        let mut page = SnapshotPage::from_html("<html><body></body></html>");
        let settings = keep_open();
        let mut resolver = Counting::default();
        let record = Assembler::new(&mut page, &mut resolver, &settings)
            .open("file://tests/fixtures/public.html")
            .run()
            .unwrap();
        assert!(resolver.calls.is_empty());
        assert_eq!(record.url.as_deref(), Some("file://tests/fixtures/public.html"));
        assert_eq!(record.layout, LayoutVariant::Public);
    }

    #[test]
    fn releases_on_completion_when_asked() {
        let settings = Settings::default();
        let mut resolver = NonInteractive;

        let mut done = fixture("public");
        Assembler::new(&mut done, &mut resolver, &settings).run().unwrap();
        assert!(done.is_released());

        let mut failed = fixture("challenge");
        Assembler::new(&mut failed, &mut resolver, &Settings { blocked_retry_limit: 1, ..settings.clone() })
            .run()
            .unwrap_err();
        assert!(failed.is_released());

        let mut kept = fixture("public");
        Assembler::new(&mut kept, &mut resolver, &keep_open()).run().unwrap();
        assert!(!kept.is_released());
    }
}
