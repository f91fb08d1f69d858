use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::{
    Application, ApplicationStatus, ApplicationSummary, Document, Education, Job, Language,
    NewDocument, NewEducation, NewExperience, NewJob, Profile, ProfileDetails, Research, Skill,
    WorkExperience,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT,
    location TEXT,
    linkedin_url TEXT,
    github_url TEXT,
    summary TEXT,
    interests TEXT
);

CREATE TABLE IF NOT EXISTS work_experiences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    company TEXT NOT NULL,
    title TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT,
    description TEXT
);

CREATE TABLE IF NOT EXISTS educations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    institution TEXT NOT NULL,
    degree TEXT NOT NULL,
    field TEXT,
    start_date TEXT NOT NULL,
    end_date TEXT
);

CREATE TABLE IF NOT EXISTS skills (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    category TEXT
);

CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    url TEXT,
    deadline TEXT,
    language TEXT NOT NULL DEFAULT 'NO' CHECK (language IN ('NO', 'EN')),
    notes TEXT
);

CREATE TABLE IF NOT EXISTS research (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL UNIQUE REFERENCES jobs(id),
    scraped_at TEXT NOT NULL DEFAULT (datetime('now')),
    company_website TEXT,
    review_site TEXT,
    news TEXT,
    social TEXT,
    summary TEXT
);

CREATE TABLE IF NOT EXISTS applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL UNIQUE REFERENCES jobs(id),
    status TEXT NOT NULL DEFAULT 'draft'
        CHECK (status IN ('draft', 'sent', 'interview', 'rejected', 'offer')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    notes TEXT
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id INTEGER NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    type TEXT NOT NULL CHECK (type IN ('cv', 'cover_letter')),
    language TEXT NOT NULL CHECK (language IN ('NO', 'EN')),
    markdown_content TEXT NOT NULL,
    pdf_path TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_experiences_profile ON work_experiences(profile_id);
CREATE INDEX IF NOT EXISTS idx_educations_profile ON educations(profile_id);
CREATE INDEX IF NOT EXISTS idx_skills_profile ON skills(profile_id);
CREATE INDEX IF NOT EXISTS idx_documents_application ON documents(application_id);
"#;

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let db = Self {
            conn,
            path: path.to_path_buf(),
        };
        db.init()?;
        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to create database schema")?;
        Ok(())
    }

    /// Starts the storage session for one command.
    ///
    /// Nothing is persisted until [`Session::commit`]. A session dropped
    /// without committing (early return, error, panic) is rolled back.
    pub fn session(&mut self) -> Result<Session<'_>> {
        let tx = self.conn.transaction().context("Failed to begin session")?;
        Ok(Session { tx })
    }
}

pub struct Session<'a> {
    tx: Transaction<'a>,
}

impl Session<'_> {
    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("Failed to commit session")
    }

    // --- Profile operations ---

    /// Loads the singleton profile with its experiences, educations and skills.
    pub fn load_profile(&self) -> Result<Option<Profile>> {
        let row = self
            .tx
            .query_row(
                "SELECT id, full_name, email, phone, location, linkedin_url, github_url,
                        summary, interests
                 FROM profiles ORDER BY id LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        ProfileDetails {
                            full_name: row.get(1)?,
                            email: row.get(2)?,
                            phone: row.get(3)?,
                            location: row.get(4)?,
                            linkedin_url: row.get(5)?,
                            github_url: row.get(6)?,
                            summary: row.get(7)?,
                            interests: row.get(8)?,
                        },
                    ))
                },
            )
            .optional()?;

        let Some((id, details)) = row else {
            return Ok(None);
        };

        Ok(Some(Profile {
            id,
            details,
            work_experiences: self.list_experiences(id)?,
            educations: self.list_educations(id)?,
            skills: self.list_skills(id)?,
        }))
    }

    /// Creates the profile or overwrites the existing one's details in place.
    pub fn upsert_profile(&self, details: &ProfileDetails) -> Result<i64> {
        let existing: Option<i64> = self
            .tx
            .query_row("SELECT id FROM profiles ORDER BY id LIMIT 1", [], |row| row.get(0))
            .optional()?;

        match existing {
            Some(id) => {
                self.tx.execute(
                    "UPDATE profiles SET full_name = ?1, email = ?2, phone = ?3, location = ?4,
                            linkedin_url = ?5, github_url = ?6, summary = ?7, interests = ?8
                     WHERE id = ?9",
                    params![
                        details.full_name,
                        details.email,
                        details.phone,
                        details.location,
                        details.linkedin_url,
                        details.github_url,
                        details.summary,
                        details.interests,
                        id
                    ],
                )?;
                Ok(id)
            }
            None => {
                self.tx.execute(
                    "INSERT INTO profiles (full_name, email, phone, location, linkedin_url,
                                           github_url, summary, interests)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        details.full_name,
                        details.email,
                        details.phone,
                        details.location,
                        details.linkedin_url,
                        details.github_url,
                        details.summary,
                        details.interests
                    ],
                )?;
                Ok(self.tx.last_insert_rowid())
            }
        }
    }

    pub fn add_experience(&self, profile_id: i64, exp: &NewExperience) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO work_experiences (profile_id, company, title, start_date, end_date, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                profile_id,
                exp.company,
                exp.title,
                exp.start_date,
                exp.end_date,
                exp.description
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn add_education(&self, profile_id: i64, edu: &NewEducation) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO educations (profile_id, institution, degree, field, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                profile_id,
                edu.institution,
                edu.degree,
                edu.field,
                edu.start_date,
                edu.end_date
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn add_skill(&self, profile_id: i64, name: &str, category: Option<&str>) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO skills (profile_id, name, category) VALUES (?1, ?2, ?3)",
            params![profile_id, name, category],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn add_skills(&self, profile_id: i64, names: &[String], category: Option<&str>) -> Result<usize> {
        let mut stmt = self
            .tx
            .prepare("INSERT INTO skills (profile_id, name, category) VALUES (?1, ?2, ?3)")?;
        for name in names {
            stmt.execute(params![profile_id, name, category])?;
        }
        Ok(names.len())
    }

    fn list_experiences(&self, profile_id: i64) -> Result<Vec<WorkExperience>> {
        let mut stmt = self.tx.prepare(
            "SELECT id, profile_id, company, title, start_date, end_date, description
             FROM work_experiences WHERE profile_id = ?1
             ORDER BY start_date DESC, id DESC",
        )?;
        let rows = stmt.query_map([profile_id], |row| {
            Ok(WorkExperience {
                id: row.get(0)?,
                profile_id: row.get(1)?,
                company: row.get(2)?,
                title: row.get(3)?,
                start_date: row.get(4)?,
                end_date: row.get(5)?,
                description: row.get(6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list work experiences")
    }

    fn list_educations(&self, profile_id: i64) -> Result<Vec<Education>> {
        let mut stmt = self.tx.prepare(
            "SELECT id, profile_id, institution, degree, field, start_date, end_date
             FROM educations WHERE profile_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([profile_id], |row| {
            Ok(Education {
                id: row.get(0)?,
                profile_id: row.get(1)?,
                institution: row.get(2)?,
                degree: row.get(3)?,
                field: row.get(4)?,
                start_date: row.get(5)?,
                end_date: row.get(6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list educations")
    }

    fn list_skills(&self, profile_id: i64) -> Result<Vec<Skill>> {
        let mut stmt = self.tx.prepare(
            "SELECT id, profile_id, name, category FROM skills WHERE profile_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([profile_id], |row| {
            Ok(Skill {
                id: row.get(0)?,
                profile_id: row.get(1)?,
                name: row.get(2)?,
                category: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list skills")
    }

    // --- Job operations ---

    pub fn add_job(&self, job: &NewJob) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO jobs (company, title, description, url, deadline, language, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job.company,
                job.title,
                job.description,
                job.url,
                job.deadline,
                job.language.code(),
                job.notes
            ],
        )?;
        let id = self.tx.last_insert_rowid();
        debug!(job_id = id, company = %job.company, "job inserted");
        Ok(id)
    }

    pub fn get_job(&self, id: i64) -> Result<Option<Job>> {
        self.tx
            .query_row(
                "SELECT j.id, j.company, j.title, j.description, j.url, j.deadline, j.language,
                        j.notes, a.id IS NOT NULL
                 FROM jobs j
                 LEFT JOIN applications a ON a.job_id = j.id
                 WHERE j.id = ?1",
                [id],
                row_to_job,
            )
            .optional()
            .context("Failed to load job")
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        let mut stmt = self.tx.prepare(
            "SELECT j.id, j.company, j.title, j.description, j.url, j.deadline, j.language,
                    j.notes, a.id IS NOT NULL
             FROM jobs j
             LEFT JOIN applications a ON a.job_id = j.id
             ORDER BY j.id",
        )?;
        let rows = stmt.query_map([], row_to_job)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list jobs")
    }

    // --- Research operations ---

    pub fn get_research(&self, job_id: i64) -> Result<Option<Research>> {
        self.tx
            .query_row(
                "SELECT id, job_id, summary, company_website, review_site, news, social, scraped_at
                 FROM research WHERE job_id = ?1",
                [job_id],
                |row| {
                    Ok(Research {
                        id: row.get(0)?,
                        job_id: row.get(1)?,
                        summary: row.get(2)?,
                        company_website: row.get(3)?,
                        review_site: row.get(4)?,
                        news: row.get(5)?,
                        social: row.get(6)?,
                        scraped_at: row.get(7)?,
                    })
                },
            )
            .optional()
            .context("Failed to load research")
    }

    /// Stores the research summary for a job, replacing any earlier one and
    /// refreshing `scraped_at`.
    pub fn upsert_research(&self, job_id: i64, summary: &str) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO research (job_id, summary, scraped_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(job_id) DO UPDATE SET
                 summary = excluded.summary,
                 scraped_at = excluded.scraped_at",
            params![job_id, summary],
        )?;
        let id = self
            .tx
            .query_row("SELECT id FROM research WHERE job_id = ?1", [job_id], |row| row.get(0))?;
        info!(job_id, research_id = id, "research stored");
        Ok(id)
    }

    // --- Application operations ---

    pub fn get_application_for_job(&self, job_id: i64) -> Result<Option<Application>> {
        self.tx
            .query_row(
                "SELECT id, job_id, status, notes, created_at, updated_at
                 FROM applications WHERE job_id = ?1",
                [job_id],
                row_to_application,
            )
            .optional()
            .context("Failed to load application")
    }

    /// Returns the job's application id, creating a draft when there is none.
    pub fn get_or_create_application(&self, job_id: i64) -> Result<i64> {
        if let Some(app) = self.get_application_for_job(job_id)? {
            return Ok(app.id);
        }
        self.tx.execute(
            "INSERT INTO applications (job_id, status) VALUES (?1, ?2)",
            params![job_id, ApplicationStatus::Draft.as_str()],
        )?;
        let id = self.tx.last_insert_rowid();
        info!(job_id, application_id = id, "application created");
        Ok(id)
    }

    pub fn update_status(
        &self,
        application_id: i64,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> Result<()> {
        self.tx.execute(
            "UPDATE applications
             SET status = ?1, notes = COALESCE(?2, notes), updated_at = datetime('now')
             WHERE id = ?3",
            params![status.as_str(), notes, application_id],
        )?;
        Ok(())
    }

    pub fn list_applications(&self) -> Result<Vec<ApplicationSummary>> {
        let mut stmt = self.tx.prepare(
            "SELECT a.id, a.job_id, a.status, a.notes, a.created_at, a.updated_at,
                    j.company, j.title
             FROM applications a
             JOIN jobs j ON j.id = a.job_id
             ORDER BY a.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ApplicationSummary {
                application: row_to_application(row)?,
                company: row.get(6)?,
                title: row.get(7)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list applications")
    }

    /// Deletes an application; its documents go with it.
    pub fn delete_application(&self, application_id: i64) -> Result<()> {
        self.tx
            .execute("DELETE FROM applications WHERE id = ?1", [application_id])?;
        Ok(())
    }

    // --- Document operations ---

    pub fn add_document(&self, doc: &NewDocument) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO documents (application_id, type, language, markdown_content, pdf_path)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                doc.application_id,
                doc.doc_type.as_str(),
                doc.language.code(),
                doc.content,
                doc.pdf_path
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn list_documents(&self, application_id: i64) -> Result<Vec<Document>> {
        let mut stmt = self.tx.prepare(
            "SELECT id, application_id, type, language, markdown_content, pdf_path, created_at
             FROM documents WHERE application_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([application_id], |row| {
            Ok(Document {
                id: row.get(0)?,
                application_id: row.get(1)?,
                doc_type: parse_column(row, 2)?,
                language: parse_column(row, 3)?,
                content: row.get(4)?,
                pdf_path: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list documents")
    }
}

fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        company: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        url: row.get(4)?,
        deadline: row.get(5)?,
        language: parse_column::<Language>(row, 6)?,
        notes: row.get(7)?,
        has_application: row.get(8)?,
    })
}

fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<Application> {
    Ok(Application {
        id: row.get(0)?,
        job_id: row.get(1)?,
        status: parse_column(row, 2)?,
        notes: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Reads a TEXT column into one of the enumerated model types.
fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
