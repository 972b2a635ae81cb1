use tracing::debug;

use crate::page::{Page, Rule};
use crate::profile::LayoutVariant;

/// Verification or sign-in walls that hide the profile entirely.
const INTERSTITIAL_MARKERS: &[&str] = &[
    "#captcha-internal",
    ".challenge-dialog",
    "form[action*='checkpoint/challenge']",
    ".authwall-join-form",
];

/// Only rendered for a signed-in viewer.
const AUTHENTICATED_MARKERS: &[&str] = &[".global-nav__primary-link", "#profile-nav-item"];

const PUBLIC_MARKERS: &[&str] = &[".top-card-layout", ".top-card-layout__title"];

/// Decide which layout the page currently shows. Read-only.
pub fn classify<P: Page>(page: &P) -> LayoutVariant {
    let Some(root) = page.document() else {
        debug!("no document to classify");
        return LayoutVariant::Blocked;
    };

    let first_present = |markers: &[&'static str]| {
        markers
            .iter()
            .copied()
            .find(|m| page.find(&root, &Rule::css(m)).is_some())
    };

    if let Some(marker) = first_present(INTERSTITIAL_MARKERS) {
        debug!(marker, "interstitial marker present");
        return LayoutVariant::Blocked;
    }
    if let Some(marker) = first_present(AUTHENTICATED_MARKERS) {
        debug!(marker, "authenticated layout");
        return LayoutVariant::Authenticated;
    }
    if let Some(marker) = first_present(PUBLIC_MARKERS) {
        debug!(marker, "public layout");
        return LayoutVariant::Public;
    }

    debug!("neither authenticated nor public markers present");
    LayoutVariant::Blocked
}
