pub mod assembler;
pub mod extract;
pub mod field;
pub mod layout;
pub mod position;
pub mod sections;

use anyhow::Result;

use crate::db::SnapshotRow;
use crate::error::ExtractResult;
use crate::page::Page;
use crate::profile::ProfileRecord;
use crate::resolver::{HumanResolver, NonInteractive};
use crate::settings::Settings;
use crate::snapshot::SnapshotPage;
use assembler::Assembler;

/// One full pass: classify → sections → record.
pub fn extract_profile<P: Page, R: HumanResolver>(
    page: &mut P,
    resolver: &mut R,
    settings: &Settings,
    url: Option<&str>,
) -> ExtractResult<ProfileRecord> {
    let mut asm = Assembler::new(page, resolver, settings);
    if let Some(url) = url {
        asm = asm.target(url);
    }
    asm.run()
}

pub struct ProcessedSnapshot {
    pub snapshot_id: i64,
    pub result: Result<ProfileRecord>,
}

/// Batch worker: loads the stored snapshot file and runs an unattended pass.
pub fn process_snapshot(snapshot: &SnapshotRow, settings: &Settings) -> ProcessedSnapshot {
    let result = SnapshotPage::open(&snapshot.path).and_then(|mut page| {
        let url = snapshot.url.as_deref().unwrap_or(&snapshot.path);
        extract_profile(&mut page, &mut NonInteractive, settings, Some(url)).map_err(anyhow::Error::from)
    });
    ProcessedSnapshot {
        snapshot_id: snapshot.id,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;

    fn row(id: i64, path: &str) -> SnapshotRow {
        SnapshotRow {
            id,
            path: path.to_string(),
            url: None,
        }
    }

    #[test]
    fn batch_worker_extracts_and_attributes() {
        let done = process_snapshot(&row(7, "tests/fixtures/public.html"), &Settings::default());
        assert_eq!(done.snapshot_id, 7);
        let record = done.result.unwrap();
        assert_eq!(record.url.as_deref(), Some("tests/fixtures/public.html"));
        assert_eq!(record.name.as_deref(), Some("Ravi Patel"));
    }

    #[test]
    fn batch_worker_reports_typed_failures() {
        let settings = Settings {
            blocked_retry_limit: 2,
            ..Default::default()
        };
        let failed = process_snapshot(&row(1, "tests/fixtures/challenge.html"), &settings);
        let err = failed.result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ExtractError>(),
            Some(&ExtractError::InterstitialBlocked { attempts: 2 })
        );

        let missing = process_snapshot(&row(2, "tests/fixtures/nope.html"), &settings);
        let err = missing.result.unwrap_err();
        assert!(err.downcast_ref::<ExtractError>().is_none());
    }
}
