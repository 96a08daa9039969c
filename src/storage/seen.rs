// src/storage/seen.rs

//! Persistent dedup store.
//!
//! One row per `(company, canonical_url)` in `seen_jobs`, holding the content
//! hash of the last recorded version, plus an append-only `sightings` log
//! used for daily statistics. Recording the same job twice on the same day
//! leaves the store unchanged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{AtsType, HashPolicy, Job, Seniority, Sighting};

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS seen_jobs (
    company TEXT NOT NULL,
    canonical_url TEXT NOT NULL,
    title TEXT NOT NULL,
    location TEXT NOT NULL DEFAULT '',
    team TEXT,
    source TEXT NOT NULL,
    remote INTEGER NOT NULL DEFAULT 0,
    content_hash TEXT NOT NULL,
    first_seen_at TEXT NOT NULL,
    last_seen_at TEXT NOT NULL,
    updated_at TEXT,
    PRIMARY KEY (company, canonical_url)
);

CREATE TABLE IF NOT EXISTS sightings (
    company TEXT NOT NULL,
    canonical_url TEXT NOT NULL,
    seen_on TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('new', 'updated', 'unchanged')),
    UNIQUE (company, canonical_url, seen_on, content_hash)
);

CREATE INDEX IF NOT EXISTS idx_seen_first ON seen_jobs(first_seen_at);
CREATE INDEX IF NOT EXISTS idx_sightings_day ON sightings(seen_on);
"#;

/// Hash of the fields that make a posting "changed" under `policy`.
pub fn content_hash(job: &Job, policy: HashPolicy) -> String {
    let norm = |s: &str| s.trim().to_lowercase();
    let mut hasher = Sha256::new();

    hasher.update(norm(&job.title).as_bytes());
    if matches!(policy, HashPolicy::TitleLocation | HashPolicy::TitleLocationTeam) {
        hasher.update([0x1f]);
        hasher.update(norm(&job.location).as_bytes());
    }
    if policy == HashPolicy::TitleLocationTeam {
        hasher.update([0x1f]);
        hasher.update(norm(job.team.as_deref().unwrap_or_default()).as_bytes());
    }

    hex::encode(hasher.finalize())
}

/// Aggregate counts for the `stats` command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    pub total: usize,
    pub by_company: BTreeMap<String, usize>,
    /// New postings per day, oldest first
    pub daily_new: BTreeMap<NaiveDate, usize>,
}

/// SQLite-backed record of every posting seen so far.
pub struct DedupStore {
    conn: Mutex<Connection>,
    path: PathBuf,
    policy: HashPolicy,
}

impl DedupStore {
    /// Open (creating if needed) and verify the store at `path`.
    pub fn open(path: impl AsRef<Path>, policy: HashPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::store(format!("{}: {}", parent.display(), e)))?;
        }

        let conn = Connection::open(&path)?;
        Self::init(conn, path, policy)
    }

    /// In-memory store, used by tests and dry runs.
    pub fn in_memory(policy: HashPolicy) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, PathBuf::from(":memory:"), policy)
    }

    fn init(conn: Connection, path: PathBuf, policy: HashPolicy) -> Result<Self> {
        let check: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
        if check != "ok" {
            return Err(AppError::store(format!("{}: {}", path.display(), check)));
        }

        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(AppError::store(format!(
                "{}: schema version {} is newer than supported {}",
                path.display(),
                version,
                SCHEMA_VERSION
            )));
        }

        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        log::debug!("Dedup store opened at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            policy,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> HashPolicy {
        self.policy
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::store("store lock poisoned"))
    }

    fn stored_hash(conn: &Connection, job: &Job) -> Result<Option<String>> {
        Ok(conn
            .query_row(
                "SELECT content_hash FROM seen_jobs WHERE company = ?1 AND canonical_url = ?2",
                params![job.company, job.canonical_url],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn compare(stored: Option<&str>, hash: &str) -> Sighting {
        match stored {
            None => Sighting::New,
            Some(h) if h == hash => Sighting::Unchanged,
            Some(_) => Sighting::Updated,
        }
    }

    /// How `job` relates to what has been recorded. Does not write.
    pub fn classify(&self, job: &Job) -> Result<Sighting> {
        let conn = self.lock()?;
        let stored = Self::stored_hash(&conn, job)?;
        Ok(Self::compare(
            stored.as_deref(),
            &content_hash(job, self.policy),
        ))
    }

    /// Whether `job` is unrecorded or its content changed since last seen.
    /// Use [`classify`](Self::classify) to tell the two apart.
    pub fn is_new(&self, job: &Job) -> Result<bool> {
        Ok(self.classify(job)?.is_fresh())
    }

    /// Record a sighting at `now` and return how it compared to the store.
    pub fn record(&self, job: &Job, now: DateTime<Utc>) -> Result<Sighting> {
        let hash = content_hash(job, self.policy);
        let stamp = now.to_rfc3339();
        let day = now.date_naive().to_string();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let stored = Self::stored_hash(&tx, job)?;
        let sighting = Self::compare(stored.as_deref(), &hash);

        match sighting {
            Sighting::New => {
                tx.execute(
                    "INSERT INTO seen_jobs (company, canonical_url, title, location, team, source, \
                     remote, content_hash, first_seen_at, last_seen_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                    params![
                        job.company,
                        job.canonical_url,
                        job.title,
                        job.location,
                        job.team,
                        job.source.as_str(),
                        job.remote,
                        hash,
                        stamp
                    ],
                )?;
            }
            Sighting::Updated => {
                tx.execute(
                    "UPDATE seen_jobs SET title = ?3, location = ?4, team = ?5, remote = ?6, \
                     content_hash = ?7, last_seen_at = ?8, updated_at = ?8 \
                     WHERE company = ?1 AND canonical_url = ?2",
                    params![
                        job.company,
                        job.canonical_url,
                        job.title,
                        job.location,
                        job.team,
                        job.remote,
                        hash,
                        stamp
                    ],
                )?;
            }
            Sighting::Unchanged => {
                tx.execute(
                    "UPDATE seen_jobs SET last_seen_at = MAX(last_seen_at, ?3) \
                     WHERE company = ?1 AND canonical_url = ?2",
                    params![job.company, job.canonical_url, stamp],
                )?;
            }
        }

        tx.execute(
            "INSERT OR IGNORE INTO sightings (company, canonical_url, seen_on, content_hash, kind) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![job.company, job.canonical_url, day, hash, sighting.as_str()],
        )?;
        tx.commit()?;

        Ok(sighting)
    }

    /// Totals across all companies.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;
        let mut stats = StoreStats::default();

        let mut stmt =
            conn.prepare("SELECT company, COUNT(*) FROM seen_jobs GROUP BY company ORDER BY company")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (company, count) = row?;
            stats.total += count as usize;
            stats.by_company.insert(company, count as usize);
        }

        let mut stmt = conn.prepare(
            "SELECT seen_on, COUNT(*) FROM sightings WHERE kind = 'new' GROUP BY seen_on ORDER BY seen_on",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (day, count) = row?;
            let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d").map_err(AppError::store)?;
            stats.daily_new.insert(day, count as usize);
        }

        Ok(stats)
    }

    /// Jobs first seen on or after `since`, newest first.
    pub fn recent(&self, since: NaiveDate) -> Result<Vec<Job>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT company, title, location, team, canonical_url, source, remote, first_seen_at \
             FROM seen_jobs WHERE first_seen_at >= ?1 ORDER BY first_seen_at DESC, company",
        )?;

        let rows = stmt.query_map([since.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, bool>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut jobs = Vec::new();
        for row in rows {
            let (company, title, location, team, canonical_url, source, remote, first_seen) = row?;
            let discovered_at = DateTime::parse_from_rfc3339(&first_seen)
                .map_err(AppError::store)?
                .with_timezone(&Utc);
            let seniority = Seniority::infer(&title);

            jobs.push(Job {
                company,
                title,
                location,
                team,
                canonical_url,
                source: source.parse().unwrap_or(AtsType::Unknown),
                discovered_at,
                remote,
                seniority,
            });
        }

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn job(title: &str) -> Job {
        Job {
            company: "Acme".into(),
            title: title.into(),
            location: "San Francisco, CA".into(),
            team: Some("Research".into()),
            canonical_url: "https://jobs.ashbyhq.com/acme/123".into(),
            source: AtsType::Ashby,
            discovered_at: Utc::now(),
            remote: false,
            seniority: Seniority::infer(title),
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_new_then_unchanged_then_updated() {
        let store = DedupStore::in_memory(HashPolicy::default()).unwrap();
        let original = job("ML Engineer");

        assert_eq!(store.record(&original, at(1)).unwrap(), Sighting::New);
        assert!(!store.is_new(&original).unwrap());
        assert_eq!(store.record(&original, at(2)).unwrap(), Sighting::Unchanged);

        let renamed = job("Senior ML Engineer");
        assert_eq!(store.classify(&renamed).unwrap(), Sighting::Updated);
        assert_eq!(store.record(&renamed, at(3)).unwrap(), Sighting::Updated);
        assert_eq!(store.classify(&renamed).unwrap(), Sighting::Unchanged);
    }

    #[test]
    fn test_is_new_is_stable() {
        let store = DedupStore::in_memory(HashPolicy::default()).unwrap();
        let j = job("ML Engineer");

        assert!(store.is_new(&j).unwrap());
        assert!(store.is_new(&j).unwrap());
        store.record(&j, at(1)).unwrap();
        assert!(!store.is_new(&j).unwrap());
        assert!(!store.is_new(&j).unwrap());
    }

    #[test]
    fn test_record_is_idempotent_within_a_day() {
        let store = DedupStore::in_memory(HashPolicy::default()).unwrap();
        let j = job("ML Engineer");

        store.record(&j, at(1)).unwrap();
        let before = store.stats().unwrap();
        store.record(&j, at(1)).unwrap();
        assert_eq!(store.stats().unwrap(), before);
        assert_eq!(before.total, 1);
        assert_eq!(before.daily_new.values().sum::<usize>(), 1);
    }

    #[test]
    fn test_same_url_different_company_is_distinct() {
        let store = DedupStore::in_memory(HashPolicy::default()).unwrap();
        let a = job("ML Engineer");
        let mut b = a.clone();
        b.company = "Other".into();

        store.record(&a, at(1)).unwrap();
        assert!(store.is_new(&b).unwrap());
    }

    #[test]
    fn test_is_new_for_changed_content() {
        let store = DedupStore::in_memory(HashPolicy::default()).unwrap();
        store.record(&job("ML Engineer"), at(1)).unwrap();

        let renamed = job("Senior ML Engineer");
        assert_eq!(store.classify(&renamed).unwrap(), Sighting::Updated);
        assert!(store.is_new(&renamed).unwrap());

        store.record(&renamed, at(2)).unwrap();
        assert!(!store.is_new(&renamed).unwrap());
    }

    #[test]
    fn test_hash_policy_scope() {
        let base = job("ML Engineer");
        let mut moved = base.clone();
        moved.location = "Seattle, WA".into();
        let mut reteamed = base.clone();
        reteamed.team = Some("Ads".into());

        let full = HashPolicy::TitleLocationTeam;
        assert_ne!(content_hash(&base, full), content_hash(&moved, full));
        assert_ne!(content_hash(&base, full), content_hash(&reteamed, full));

        let title_location = HashPolicy::TitleLocation;
        assert_eq!(content_hash(&base, title_location), content_hash(&reteamed, title_location));

        let title = HashPolicy::TitleOnly;
        assert_eq!(content_hash(&base, title), content_hash(&moved, title));
    }

    #[test]
    fn test_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/seen.db");
        let j = job("ML Engineer");

        {
            let store = DedupStore::open(&path, HashPolicy::default()).unwrap();
            store.record(&j, at(1)).unwrap();
        }

        let store = DedupStore::open(&path, HashPolicy::default()).unwrap();
        assert!(!store.is_new(&j).unwrap());
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seen.db");
        std::fs::write(&path, b"this is definitely not a sqlite database, just some text padding it out").unwrap();

        let err = DedupStore::open(&path, HashPolicy::default()).err().unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_stats_and_recent() {
        let store = DedupStore::in_memory(HashPolicy::default()).unwrap();
        let mut first = job("ML Engineer");
        first.canonical_url = "https://jobs.ashbyhq.com/acme/1".into();
        let mut second = job("Data Engineer");
        second.canonical_url = "https://jobs.ashbyhq.com/acme/2".into();
        let mut third = job("Research Engineer");
        third.company = "Beta".into();

        store.record(&first, at(1)).unwrap();
        store.record(&second, at(5)).unwrap();
        store.record(&third, at(5) + Duration::hours(1)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_company.get("Acme"), Some(&2));
        assert_eq!(stats.by_company.get("Beta"), Some(&1));
        assert_eq!(stats.daily_new.get(&at(5).date_naive()), Some(&2));

        let recent = store.recent(at(3).date_naive()).unwrap();
        let titles: Vec<_> = recent.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Research Engineer", "Data Engineer"]);
        assert_eq!(recent[0].source, AtsType::Ashby);
        assert_eq!(recent[0].discovered_at, at(5) + Duration::hours(1));
    }
}
