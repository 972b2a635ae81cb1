use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::error::ExtractError;
use crate::profile::{Accomplishment, Education, Experience, Interest, LayoutVariant, ProfileRecord};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS snapshots (
            id          INTEGER PRIMARY KEY,
            path        TEXT UNIQUE NOT NULL,
            url         TEXT,
            imported_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id           INTEGER PRIMARY KEY,
            snapshot_id  INTEGER UNIQUE NOT NULL REFERENCES snapshots(id),
            url          TEXT,
            layout       TEXT NOT NULL CHECK(layout IN ('authenticated','public')),
            name         TEXT,
            title        TEXT,
            location     TEXT,
            summary      TEXT,
            extracted_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_profiles_layout ON profiles(layout);

        CREATE TABLE IF NOT EXISTS experiences (
            id             INTEGER PRIMARY KEY,
            profile_id     INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            seq            INTEGER NOT NULL,
            position_title TEXT,
            company        TEXT,
            from_date      TEXT,
            to_date        TEXT,
            duration       TEXT,
            location       TEXT,
            UNIQUE(profile_id, seq)
        );

        CREATE TABLE IF NOT EXISTS educations (
            id          INTEGER PRIMARY KEY,
            profile_id  INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            seq         INTEGER NOT NULL,
            institution TEXT,
            degree      TEXT,
            from_date   TEXT,
            to_date     TEXT,
            UNIQUE(profile_id, seq)
        );

        CREATE TABLE IF NOT EXISTS interests (
            id         INTEGER PRIMARY KEY,
            profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            seq        INTEGER NOT NULL,
            label      TEXT NOT NULL,
            UNIQUE(profile_id, seq)
        );

        CREATE TABLE IF NOT EXISTS accomplishments (
            id         INTEGER PRIMARY KEY,
            profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            seq        INTEGER NOT NULL,
            category   TEXT NOT NULL,
            title      TEXT NOT NULL,
            UNIQUE(profile_id, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_accomplishments_category ON accomplishments(category);

        CREATE TABLE IF NOT EXISTS extraction_failures (
            id          INTEGER PRIMARY KEY,
            snapshot_id INTEGER UNIQUE NOT NULL REFERENCES snapshots(id),
            kind        TEXT NOT NULL,
            message     TEXT NOT NULL,
            failed_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Snapshots ──

pub fn insert_snapshots(conn: &Connection, snapshots: &[(String, Option<String>)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO snapshots (path, url) VALUES (?1, ?2)")?;
        for (path, url) in snapshots {
            count += stmt.execute(rusqlite::params![path, url])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub struct SnapshotRow {
    pub id: i64,
    pub path: String,
    pub url: Option<String>,
}

/// Snapshots with neither a stored profile nor a recorded failure.
pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<SnapshotRow>> {
    let sql = format!(
        "SELECT s.id, s.path, s.url
         FROM snapshots s
         LEFT JOIN profiles p ON p.snapshot_id = s.id
         LEFT JOIN extraction_failures f ON f.snapshot_id = s.id
         WHERE p.id IS NULL AND f.id IS NULL
         ORDER BY s.id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SnapshotRow {
                id: row.get(0)?,
                path: row.get(1)?,
                url: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Extracted profiles ──

/// Store records keyed by snapshot, replacing earlier results for the same
/// snapshot. Returns the number of profiles written.
pub fn save_profiles(conn: &Connection, profiles: &[(i64, ProfileRecord)]) -> Result<usize> {
    let extracted_at = chrono::Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;
    {
        let mut clear_stmt = tx.prepare("DELETE FROM profiles WHERE snapshot_id = ?1")?;
        let mut unfail_stmt = tx.prepare("DELETE FROM extraction_failures WHERE snapshot_id = ?1")?;
        let mut p_stmt = tx.prepare(
            "INSERT INTO profiles
             (snapshot_id, url, layout, name, title, location, summary, extracted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        let mut e_stmt = tx.prepare(
            "INSERT INTO experiences
             (profile_id, seq, position_title, company, from_date, to_date, duration, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        let mut ed_stmt = tx.prepare(
            "INSERT INTO educations (profile_id, seq, institution, degree, from_date, to_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        let mut i_stmt = tx.prepare("INSERT INTO interests (profile_id, seq, label) VALUES (?1, ?2, ?3)")?;
        let mut a_stmt = tx.prepare(
            "INSERT INTO accomplishments (profile_id, seq, category, title) VALUES (?1, ?2, ?3, ?4)",
        )?;

        for (snapshot_id, r) in profiles {
            clear_stmt.execute([snapshot_id])?;
            unfail_stmt.execute([snapshot_id])?;
            p_stmt.execute(rusqlite::params![
                snapshot_id, r.url, r.layout.as_str(), r.name, r.title, r.location, r.summary, extracted_at,
            ])?;
            let profile_id = tx.last_insert_rowid();

            for (seq, e) in r.experiences.iter().enumerate() {
                e_stmt.execute(rusqlite::params![
                    profile_id, seq, e.position_title, e.company, e.from_date, e.to_date, e.duration, e.location,
                ])?;
            }
            for (seq, e) in r.educations.iter().enumerate() {
                ed_stmt.execute(rusqlite::params![
                    profile_id, seq, e.institution, e.degree, e.from_date, e.to_date,
                ])?;
            }
            for (seq, i) in r.interests.iter().enumerate() {
                i_stmt.execute(rusqlite::params![profile_id, seq, i.label])?;
            }
            for (seq, a) in r.accomplishments.iter().enumerate() {
                a_stmt.execute(rusqlite::params![profile_id, seq, a.category, a.title])?;
            }
        }
    }
    tx.commit()?;
    Ok(profiles.len())
}

pub struct FailureRow {
    pub snapshot_id: i64,
    pub kind: String,
    pub message: String,
}

impl FailureRow {
    /// Engine errors keep their own kind; anything else (unreadable file,
    /// I/O) is recorded as `io`.
    pub fn new(snapshot_id: i64, err: &anyhow::Error) -> Self {
        let kind = err
            .downcast_ref::<ExtractError>()
            .map(|e| e.kind())
            .unwrap_or("io");
        FailureRow {
            snapshot_id,
            kind: kind.to_string(),
            message: format!("{:#}", err),
        }
    }
}

pub fn save_failures(conn: &Connection, rows: &[FailureRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO extraction_failures (snapshot_id, kind, message)
             VALUES (?1, ?2, ?3)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![r.snapshot_id, r.kind, r.message])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Rebuild a stored record. `None` when no profile has that id.
pub fn fetch_profile(conn: &Connection, id: i64) -> Result<Option<ProfileRecord>> {
    let head = conn
        .query_row(
            "SELECT url, layout, name, title, location, summary FROM profiles WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            },
        )
        .optional()?;
    let Some((url, layout, name, title, location, summary)) = head else {
        return Ok(None);
    };

    let layout: LayoutVariant = layout.parse().with_context(|| format!("Profile {} has a bad layout", id))?;
    let mut record = ProfileRecord::new(url, layout);
    record.name = name;
    record.title = title;
    record.set_location(location);
    record.summary = summary;

    let mut stmt = conn.prepare(
        "SELECT position_title, company, from_date, to_date, duration, location
         FROM experiences WHERE profile_id = ?1 ORDER BY seq",
    )?;
    let experiences = stmt
        .query_map([id], |row| {
            Ok(Experience {
                position_title: row.get(0)?,
                company: row.get(1)?,
                from_date: row.get(2)?,
                to_date: row.get(3)?,
                duration: row.get(4)?,
                location: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    experiences.into_iter().for_each(|e| record.add_experience(e));

    let mut stmt = conn.prepare(
        "SELECT institution, degree, from_date, to_date
         FROM educations WHERE profile_id = ?1 ORDER BY seq",
    )?;
    let educations = stmt
        .query_map([id], |row| {
            Ok(Education {
                institution: row.get(0)?,
                degree: row.get(1)?,
                from_date: row.get(2)?,
                to_date: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    educations.into_iter().for_each(|e| record.add_education(e));

    let mut stmt = conn.prepare("SELECT label FROM interests WHERE profile_id = ?1 ORDER BY seq")?;
    let interests = stmt
        .query_map([id], |row| Ok(Interest { label: row.get(0)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    interests.into_iter().for_each(|i| record.add_interest(i));

    let mut stmt =
        conn.prepare("SELECT category, title FROM accomplishments WHERE profile_id = ?1 ORDER BY seq")?;
    let accomplishments = stmt
        .query_map([id], |row| {
            Ok(Accomplishment {
                category: row.get(0)?,
                title: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    accomplishments.into_iter().for_each(|a| record.add_accomplishment(a));

    Ok(Some(record))
}

// ── Overview ──

pub struct OverviewRow {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub layout: String,
    pub location: String,
    pub experience_count: usize,
    pub education_count: usize,
}

pub fn fetch_overview(
    conn: &Connection,
    layout: Option<LayoutVariant>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let where_clause = match layout {
        Some(l) => {
            params.push(Box::new(l.as_str()));
            " WHERE p.layout = ?1"
        }
        None => "",
    };

    let sql = format!(
        "SELECT p.id, COALESCE(p.name,''), COALESCE(p.title,''), p.layout, COALESCE(p.location,''),
                (SELECT COUNT(*) FROM experiences e WHERE e.profile_id = p.id),
                (SELECT COUNT(*) FROM educations ed WHERE ed.profile_id = p.id)
         FROM profiles p{}
         ORDER BY p.id
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                id: row.get(0)?,
                name: row.get(1)?,
                title: row.get(2)?,
                layout: row.get(3)?,
                location: row.get(4)?,
                experience_count: row.get(5)?,
                education_count: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub snapshots: usize,
    pub profiles: usize,
    pub authenticated: usize,
    pub public: usize,
    pub failures: usize,
    pub pending: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let snapshots: usize = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |r| r.get(0))?;
    let profiles: usize = conn.query_row("SELECT COUNT(*) FROM profiles", [], |r| r.get(0))?;
    let authenticated: usize = conn.query_row(
        "SELECT COUNT(*) FROM profiles WHERE layout = 'authenticated'",
        [],
        |r| r.get(0),
    )?;
    let failures: usize =
        conn.query_row("SELECT COUNT(*) FROM extraction_failures", [], |r| r.get(0))?;
    Ok(Stats {
        snapshots,
        profiles,
        authenticated,
        public: profiles - authenticated,
        failures,
        pending: snapshots.saturating_sub(profiles + failures),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_profile;
    use crate::resolver::NonInteractive;
    use crate::settings::Settings;
    use crate::snapshot::SnapshotPage;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn extracted(fixture: &str) -> ProfileRecord {
        let path = format!("tests/fixtures/{}.html", fixture);
        let mut page = SnapshotPage::open(&path).unwrap();
        extract_profile(&mut page, &mut NonInteractive, &Settings::default(), Some(&path)).unwrap()
    }

    fn profile_id(conn: &Connection, snapshot_id: i64) -> i64 {
        conn.query_row("SELECT id FROM profiles WHERE snapshot_id = ?1", [snapshot_id], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn import_is_idempotent() {
        let conn = memory();
        let snaps: Vec<(String, Option<String>)> =
            vec![("a.html".to_string(), None), ("b.html".to_string(), Some("https://x/in/b".into()))];
        assert_eq!(insert_snapshots(&conn, &snaps).unwrap(), 2);
        assert_eq!(insert_snapshots(&conn, &snaps).unwrap(), 0);
        let pending = fetch_unprocessed(&conn, None).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].url.as_deref(), Some("https://x/in/b"));
        assert_eq!(fetch_unprocessed(&conn, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn stored_record_reads_back_identically() {
        let conn = memory();
        insert_snapshots(&conn, &[("tests/fixtures/authenticated.html".to_string(), None)]).unwrap();
        let record = extracted("authenticated");
        save_profiles(&conn, &[(1, record.clone())]).unwrap();

        let id = profile_id(&conn, 1);
        assert_eq!(fetch_profile(&conn, id).unwrap(), Some(record));
        assert_eq!(fetch_profile(&conn, id + 100).unwrap(), None);
    }

    #[test]
    fn reprocessing_replaces_children() {
        let conn = memory();
        insert_snapshots(&conn, &[("p.html".to_string(), None)]).unwrap();
        let record = extracted("public");
        save_profiles(&conn, &[(1, record.clone())]).unwrap();
        save_profiles(&conn, &[(1, record)]).unwrap();

        let experiences: usize = conn.query_row("SELECT COUNT(*) FROM experiences", [], |r| r.get(0)).unwrap();
        assert_eq!(experiences, 2);
        assert_eq!(get_stats(&conn).unwrap().profiles, 1);
    }

    #[test]
    fn failures_are_typed_and_leave_the_queue() {
        let conn = memory();
        insert_snapshots(&conn, &[("c.html".to_string(), None), ("d.html".to_string(), None)]).unwrap();
        let blocked = anyhow::Error::from(ExtractError::InterstitialBlocked { attempts: 10 });
        let io = anyhow::anyhow!("Failed to read snapshot");
        save_failures(&conn, &[FailureRow::new(1, &blocked), FailureRow::new(2, &io)]).unwrap();

        let kinds: Vec<String> = conn
            .prepare("SELECT kind FROM extraction_failures ORDER BY snapshot_id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(kinds, vec!["interstitial_blocked", "io"]);
        assert!(fetch_unprocessed(&conn, None).unwrap().is_empty());

        let s = get_stats(&conn).unwrap();
        assert_eq!((s.snapshots, s.failures, s.pending), (2, 2, 0));
    }

    #[test]
    fn overview_filters_by_layout() {
        let conn = memory();
        insert_snapshots(&conn, &[("a.html".to_string(), None), ("p.html".to_string(), None)]).unwrap();
        save_profiles(&conn, &[(1, extracted("authenticated")), (2, extracted("public"))]).unwrap();

        let all = fetch_overview(&conn, None, 50).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Jane Doe");
        assert_eq!(all[0].experience_count, 3);

        let public = fetch_overview(&conn, Some(LayoutVariant::Public), 50).unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].name, "Ravi Patel");
        assert_eq!(public[0].education_count, 2);

        let s = get_stats(&conn).unwrap();
        assert_eq!((s.authenticated, s.public), (1, 1));
    }
}
