//! One handler per subcommand. Each opens a single storage session and
//! commits it only once every step of the command has succeeded.

use anyhow::Result;
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::{StyledContent, Stylize};
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use tracing::info;

use crate::ai::AIProvider;
use crate::config::Config;
use crate::db::{Database, Session};
use crate::error::AppError;
use crate::generation::generate_application;
use crate::models::{
    group_skills, ApplicationStatus, DocumentType, Job, Language, NewDocument, NewEducation,
    NewExperience, NewJob, Profile, ProfileDetails,
};
use crate::prompt::Prompter;
use crate::render::{self, Renderer};
use crate::research::research_company;

const RESEARCH_PREVIEW_CHARS: usize = 700;
const WRAP_WIDTH: usize = 80;

fn require_profile(session: &Session<'_>) -> Result<Profile> {
    session.load_profile()?.ok_or_else(|| {
        AppError::NotFound("No profile found. Run 'jobb profile setup' first.".to_string()).into()
    })
}

fn require_job(session: &Session<'_>, job_id: i64) -> Result<Job> {
    session
        .get_job(job_id)?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found.", job_id)).into())
}

fn wrapped(text: &str) -> String {
    let options = textwrap::Options::new(WRAP_WIDTH)
        .initial_indent("  ")
        .subsequent_indent("  ");
    textwrap::fill(text, options)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn period(start: chrono::NaiveDate, end: Option<chrono::NaiveDate>) -> String {
    let end = end.map(|d| d.to_string()).unwrap_or_else(|| "present".to_string());
    format!("[{} - {}]", start, end)
}

/// A dim progress line shown while a slow step runs. On a terminal it is
/// erased when replaced or dropped, including on early return.
struct TransientLine<W: Write> {
    out: W,
    transient: bool,
}

impl<W: Write> TransientLine<W> {
    fn show(out: W, transient: bool, message: &str) -> Self {
        let mut line = Self { out, transient };
        line.write(message);
        line
    }

    fn write(&mut self, message: &str) {
        let _ = if self.transient {
            write!(self.out, "{}", message.dim())
        } else {
            writeln!(self.out, "{}", message.dim())
        };
        let _ = self.out.flush();
    }

    fn clear(&mut self) {
        if self.transient {
            let _ = queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine));
            let _ = self.out.flush();
        }
    }

    fn update(&mut self, message: &str) {
        self.clear();
        self.write(message);
    }
}

impl<W: Write> Drop for TransientLine<W> {
    fn drop(&mut self) {
        self.clear();
    }
}

fn progress(message: &str) -> TransientLine<io::Stdout> {
    let transient = io::stdout().is_terminal();
    TransientLine::show(io::stdout(), transient, message)
}

// --- profile ---

pub fn profile_setup<R: BufRead, W: Write>(
    db: &mut Database,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let session = db.session()?;
    let current = session
        .load_profile()?
        .map(|p| p.details)
        .unwrap_or_default();

    prompter.say(&format!(
        "{} (press Enter to keep existing)\n",
        "Profile setup".bold()
    ))?;
    let full_name = prompter.ask("Full name", Some(&current.full_name))?;
    let email = prompter.ask("Email", Some(&current.email))?;
    let phone = prompter.ask_optional("Phone", current.phone.as_deref())?;
    let location = prompter.ask_optional("Location (city, country)", current.location.as_deref())?;
    let linkedin_url = prompter.ask_optional("LinkedIn URL", current.linkedin_url.as_deref())?;
    let github_url = prompter.ask_optional("GitHub URL", current.github_url.as_deref())?;

    prompter.say(&format!(
        "\n{}",
        "Write a short personal summary. It gets tailored per application.".dim()
    ))?;
    let summary = prompter.ask_optional("Summary", current.summary.as_deref())?;

    prompter.say(&format!(
        "\n{}",
        "Hobbies, sports, volunteer work, anything that makes you a person.".dim()
    ))?;
    let interests = prompter.ask_optional("Interests", current.interests.as_deref())?;

    let details = ProfileDetails {
        full_name,
        email,
        phone,
        location,
        linkedin_url,
        github_url,
        summary,
        interests,
    };
    session.upsert_profile(&details)?;
    session.commit()?;

    println!("\n{}", "Profile saved.".green());
    Ok(())
}

pub fn profile_show(db: &mut Database) -> Result<()> {
    let session = db.session()?;
    let Some(profile) = session.load_profile()? else {
        println!(
            "{}",
            "No profile found. Run 'jobb profile setup' to create one.".yellow()
        );
        return Ok(());
    };
    let d = &profile.details;

    println!(
        "\n{}  {}  {}",
        d.full_name.as_str().cyan().bold(),
        d.email,
        d.phone.as_deref().unwrap_or_default()
    );
    if let Some(location) = &d.location {
        println!("{}", location.as_str().dim());
    }
    if let Some(url) = &d.linkedin_url {
        println!("LinkedIn: {}", url);
    }
    if let Some(url) = &d.github_url {
        println!("GitHub:   {}", url);
    }
    if let Some(summary) = &d.summary {
        println!("\n{}\n{}", "Summary".bold(), wrapped(summary));
    }
    if let Some(interests) = &d.interests {
        println!("\n{}\n{}", "Interests".bold(), wrapped(interests));
    }

    if !profile.work_experiences.is_empty() {
        println!("\n{}", "Work Experience".bold());
        for w in &profile.work_experiences {
            println!(
                "  {} {} @ {}",
                period(w.start_date, w.end_date),
                w.title.as_str().cyan(),
                w.company
            );
            if let Some(desc) = &w.description {
                let options = textwrap::Options::new(WRAP_WIDTH)
                    .initial_indent("    ")
                    .subsequent_indent("    ");
                println!("{}", textwrap::fill(desc, options));
            }
        }
    }

    if !profile.educations.is_empty() {
        println!("\n{}", "Education".bold());
        for e in &profile.educations {
            let field = e.field.as_deref().map(|f| format!(", {}", f)).unwrap_or_default();
            println!(
                "  {} {} @ {}",
                period(e.start_date, e.end_date),
                format!("{}{}", e.degree, field).cyan(),
                e.institution
            );
        }
    }

    if !profile.skills.is_empty() {
        println!("\n{}", "Skills".bold());
        for (category, names) in group_skills(&profile.skills) {
            println!("  {}: {}", category.cyan(), names.join(", "));
        }
    }
    Ok(())
}

pub fn profile_add_experience<R: BufRead, W: Write>(
    db: &mut Database,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let session = db.session()?;
    let profile = require_profile(&session)?;

    prompter.say(&format!("{}\n", "Add work experience".bold()))?;
    let company = prompter.ask("Company", None)?;
    let title = prompter.ask("Job title", None)?;
    let start_date = prompter.ask_date("Start date (YYYY-MM-DD)")?;
    let end_date = prompter.ask_optional_date("End date (YYYY-MM-DD, leave blank if current)")?;
    prompter.say(&format!(
        "{}",
        "Describe your role, responsibilities, and achievements:".dim()
    ))?;
    let description = prompter.ask_optional("Description", None)?;

    let exp = NewExperience {
        company,
        title,
        start_date,
        end_date,
        description,
    };
    session.add_experience(profile.id, &exp)?;
    session.commit()?;

    println!("{}", "Experience added.".green());
    Ok(())
}

pub fn profile_add_education<R: BufRead, W: Write>(
    db: &mut Database,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let session = db.session()?;
    let profile = require_profile(&session)?;

    prompter.say(&format!("{}\n", "Add education".bold()))?;
    let institution = prompter.ask("Institution", None)?;
    let degree = prompter.ask("Degree (e.g. Bachelor, Master, PhD)", None)?;
    let field = prompter.ask_optional("Field of study (optional)", None)?;
    let start_date = prompter.ask_date("Start date (YYYY-MM-DD)")?;
    let end_date = prompter.ask_optional_date("End date (YYYY-MM-DD, blank if ongoing)")?;

    let edu = NewEducation {
        institution,
        degree,
        field,
        start_date,
        end_date,
    };
    session.add_education(profile.id, &edu)?;
    session.commit()?;

    println!("{}", "Education added.".green());
    Ok(())
}

pub fn profile_add_skill<R: BufRead, W: Write>(
    db: &mut Database,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let session = db.session()?;
    let profile = require_profile(&session)?;

    let name = prompter.ask("Skill name", None)?;
    let category = prompter.ask_optional(
        "Category (e.g. Programming, Language, Tool, Soft skill)",
        Some("General"),
    )?;
    session.add_skill(profile.id, &name, category.as_deref())?;
    session.commit()?;

    println!("{}", format!("Skill '{}' added.", name).green());
    Ok(())
}

/// Splits a comma-separated skill list, dropping blanks.
pub fn split_skill_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn profile_add_skills<R: BufRead, W: Write>(
    db: &mut Database,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let session = db.session()?;
    let profile = require_profile(&session)?;

    let category = prompter.ask_optional("Category for all these skills", Some("General"))?;
    let raw = prompter.ask("Skills (comma-separated)", None)?;
    let names = split_skill_list(&raw);
    let added = session.add_skills(profile.id, &names, category.as_deref())?;
    session.commit()?;

    println!("{}", format!("{} skills added.", added).green());
    Ok(())
}

// --- job ---

pub fn job_add<R: BufRead, W: Write>(
    db: &mut Database,
    prompter: &mut Prompter<R, W>,
) -> Result<i64> {
    prompter.say(&format!("{}\n", "Add a new job".bold()))?;
    let company = prompter.ask("Company name", None)?;
    let title = prompter.ask("Job title", None)?;
    let url = prompter.ask_optional("Job posting URL (optional)", None)?;
    let language = prompter.choose("Language", &Language::ALL, Language::Norwegian)?;
    let deadline = prompter.ask_optional_date("Deadline (YYYY-MM-DD, optional)")?;

    prompter.say(&format!(
        "\nPaste the job description below. When done, enter a line with just {}:",
        "END".bold()
    ))?;
    let description = prompter.read_block("END")?;
    let notes = prompter.ask_optional("\nNotes (optional)", None)?;

    let job = NewJob {
        company,
        title,
        description,
        url,
        deadline,
        language,
        notes,
    };
    let session = db.session()?;
    let job_id = session.add_job(&job)?;
    session.commit()?;

    println!("\n{}", format!("Job saved with ID {}.", job_id).green());
    println!("Next: {}", format!("jobb research {}", job_id).cyan());
    Ok(job_id)
}

pub fn job_list(db: &mut Database) -> Result<()> {
    let session = db.session()?;
    let jobs = session.list_jobs()?;
    if jobs.is_empty() {
        println!("{}", "No jobs found. Run 'jobb job add' to add one.".yellow());
        return Ok(());
    }

    println!(
        "{:<6} {:<24} {:<30} {:<5} {:<11} {}",
        "ID", "COMPANY", "TITLE", "LANG", "DEADLINE", "APPLIED"
    );
    println!("{}", "-".repeat(86));
    for job in jobs {
        let deadline = job
            .deadline
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let applied = if job.has_application {
            "Yes".green()
        } else {
            "No".stylize()
        };
        println!(
            "{:<6} {:<24} {:<30} {:<5} {:<11} {}",
            job.id,
            truncate(&job.company, 22),
            truncate(&job.title, 28),
            job.language,
            deadline,
            applied
        );
    }
    Ok(())
}

pub fn job_show(db: &mut Database, job_id: i64) -> Result<()> {
    let session = db.session()?;
    let job = require_job(&session, job_id)?;
    let research = session.get_research(job_id)?;
    let application = session.get_application_for_job(job_id)?;

    println!("{} {}", format!("Job #{}", job.id).bold(), job.title.as_str().cyan());
    println!("Company:  {}", job.company);
    println!("Language: {}", job.language);
    if let Some(url) = &job.url {
        println!("URL:      {}", url);
    }
    if let Some(deadline) = job.deadline {
        println!("Deadline: {}", deadline);
    }
    match &application {
        Some(app) => println!("Status:   {}", styled_status(app.status)),
        None => println!("Status:   {}", "not applied".dim()),
    }
    if let Some(notes) = &job.notes {
        println!("\n{}\n{}", "Notes".bold(), wrapped(notes));
    }
    if !job.description.is_empty() {
        println!("\n{}\n{}", "Description".bold(), wrapped(&job.description));
    }
    match research {
        Some(r) => println!(
            "\n{}",
            format!("Researched at {}.", r.scraped_at).dim()
        ),
        None => println!(
            "\n{}",
            format!("Not researched yet. Run 'jobb research {}'.", job_id).dim()
        ),
    }
    Ok(())
}

// --- research ---

/// First `RESEARCH_PREVIEW_CHARS` characters of a summary, with a trailing
/// marker when something was cut.
pub fn research_preview(summary: &str) -> String {
    if summary.chars().count() <= RESEARCH_PREVIEW_CHARS {
        return summary.to_string();
    }
    let head: String = summary.chars().take(RESEARCH_PREVIEW_CHARS).collect();
    format!("{}\n{}", head, "...".dim())
}

pub fn research<F>(db: &mut Database, job_id: i64, make_provider: F) -> Result<()>
where
    F: FnOnce() -> Result<Box<dyn AIProvider>>,
{
    let session = db.session()?;
    let job = require_job(&session, job_id)?;
    let provider = make_provider()?;

    println!("{} {} - {}\n", "Researching:".bold(), job.company, job.title);
    let line = progress("Searching the web...");
    let summary = research_company(provider.as_ref(), &job)?;
    drop(line);

    session.upsert_research(job_id, &summary)?;
    session.commit()?;

    println!("{}\n", "Research complete.".green());
    println!("{}", research_preview(&summary));
    println!(
        "\n{}",
        format!("Run 'jobb apply {}' to generate your application.", job_id).dim()
    );
    Ok(())
}

// --- apply ---

#[derive(Debug)]
pub struct ApplyOutcome {
    pub application_id: i64,
    pub cv: render::RenderedPair,
    pub cover_letter: render::RenderedPair,
}

pub fn apply<F>(
    db: &mut Database,
    config: &Config,
    renderer: &Renderer,
    job_id: i64,
    feedback: Option<&str>,
    make_provider: F,
) -> Result<ApplyOutcome>
where
    F: FnOnce() -> Result<Box<dyn AIProvider>>,
{
    let session = db.session()?;
    let job = require_job(&session, job_id)?;
    let profile = require_profile(&session)?;
    let provider = make_provider()?;

    let research = session.get_research(job_id)?;
    if research.is_none() {
        println!(
            "{}",
            "No research found for this job. Generating without company context.".yellow()
        );
        println!(
            "{}\n",
            "Tip: run 'jobb research <job-id>' first for better results.".dim()
        );
    }

    println!(
        "{} {} @ {}  [{}]\n",
        "Generating application:".bold(),
        job.title,
        job.company,
        job.language
    );
    if let Some(feedback) = feedback {
        println!("{}\n", format!("Cover letter feedback: {}", feedback).dim());
    }

    let guidelines = config.load_guidelines()?;
    let mut line = progress("Writing your CV and cover letter...");
    let generated = generate_application(
        provider.as_ref(),
        &profile,
        &job,
        research.as_ref(),
        guidelines.as_deref(),
        feedback,
    )?;

    line.update("Rendering HTML and PDFs...");
    let subdir = render::output_subdir(&job.company, &job.title, job.id);
    let cv = renderer.render_cv(&generated.cv, &subdir)?;
    let cover_letter = renderer.render_cover_letter(
        &generated.cv,
        &generated.cover_letter,
        &job.title,
        &job.company,
        &subdir,
    )?;
    drop(line);

    let application_id = session.get_or_create_application(job_id)?;
    session.add_document(&NewDocument {
        application_id,
        doc_type: DocumentType::Cv,
        language: job.language,
        content: generated.cv.summary.clone(),
        pdf_path: Some(cv.pdf.display().to_string()),
    })?;
    session.add_document(&NewDocument {
        application_id,
        doc_type: DocumentType::CoverLetter,
        language: job.language,
        content: generated.cover_letter.clone(),
        pdf_path: Some(cover_letter.pdf.display().to_string()),
    })?;
    session.commit()?;
    info!(job_id, application_id, "application documents stored");

    println!("{}", "Done.".green());
    println!("  CV PDF:              {}", cv.pdf.display().to_string().cyan());
    println!("  CV HTML:             {}", cv.html.display().to_string().cyan());
    println!("  Cover letter PDF:    {}", cover_letter.pdf.display().to_string().cyan());
    println!("  Cover letter HTML:   {}", cover_letter.html.display().to_string().cyan());
    println!(
        "\n{}",
        "Edit the HTML then run 'jobb render <html-file>' to re-export as PDF.".dim()
    );
    println!(
        "{}",
        format!("Run 'jobb apply {} --feedback \"your notes\"' to regenerate with guidance.", job_id).dim()
    );
    println!(
        "{}",
        format!("Run 'jobb status update {} --status sent' when you send it.", job_id).dim()
    );

    Ok(ApplyOutcome {
        application_id,
        cv,
        cover_letter,
    })
}

// --- render ---

pub fn render(renderer: &Renderer, html_file: &Path) -> Result<()> {
    if !html_file.exists() {
        return Err(AppError::NotFound(format!("File not found: {}", html_file.display())).into());
    }
    let name = html_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    println!("Rendering {} -> PDF...", name.cyan());
    let pdf_path = renderer.html_to_pdf(html_file)?;
    println!(
        "{} PDF saved to {}",
        "Done.".green(),
        pdf_path.display().to_string().cyan()
    );
    Ok(())
}

// --- status ---

fn styled_status(status: ApplicationStatus) -> StyledContent<String> {
    let text = format!("{:<10}", status.as_str());
    match status {
        ApplicationStatus::Draft => text.dim(),
        ApplicationStatus::Sent => text.cyan(),
        ApplicationStatus::Interview => text.yellow(),
        ApplicationStatus::Rejected => text.red(),
        ApplicationStatus::Offer => text.green(),
    }
}

pub fn status_list(db: &mut Database) -> Result<()> {
    let session = db.session()?;
    let applications = session.list_applications()?;
    if applications.is_empty() {
        println!(
            "{}",
            "No applications yet. Run 'jobb apply <job-id>' to generate one.".yellow()
        );
        return Ok(());
    }

    println!(
        "{:<6} {:<6} {:<22} {:<28} {:<10} {}",
        "ID", "JOB", "COMPANY", "TITLE", "STATUS", "UPDATED"
    );
    println!("{}", "-".repeat(86));
    for summary in applications {
        let app = &summary.application;
        let updated: String = app.updated_at.chars().take(10).collect();
        println!(
            "{:<6} {:<6} {:<22} {:<28} {} {}",
            app.id,
            app.job_id,
            truncate(&summary.company, 20),
            truncate(&summary.title, 26),
            styled_status(app.status),
            updated
        );
        if let Some(notes) = &app.notes {
            println!("{:<14}{}", "", truncate(notes, 70).dim());
        }
    }
    Ok(())
}

/// Validates `status` before touching storage, so a bad value changes nothing.
pub fn status_update(
    db: &mut Database,
    job_id: i64,
    status: &str,
    notes: Option<&str>,
) -> Result<()> {
    let status: ApplicationStatus = status.parse()?;

    let session = db.session()?;
    let app = session
        .get_application_for_job(job_id)?
        .ok_or_else(|| AppError::NotFound(format!("No application found for job {}.", job_id)))?;
    session.update_status(app.id, status, notes)?;
    session.commit()?;

    println!("{}", format!("Status updated to '{}'.", status).green());
    Ok(())
}

/// Deletes the job's application and its document records. Rendered files
/// stay on disk.
pub fn status_remove(db: &mut Database, job_id: i64) -> Result<()> {
    let session = db.session()?;
    let app = session
        .get_application_for_job(job_id)?
        .ok_or_else(|| AppError::NotFound(format!("No application found for job {}.", job_id)))?;
    let documents = session.list_documents(app.id)?.len();
    session.delete_application(app.id)?;
    session.commit()?;

    println!(
        "{}",
        format!(
            "Removed application {} for job {} ({} document records).",
            app.id, job_id, documents
        )
        .green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedProvider;
    use crate::generation::fixtures::CV_JSON;
    use crate::render::testing::FakePrinter;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn seed_profile(db: &mut Database) {
        let session = db.session().unwrap();
        session
            .upsert_profile(&ProfileDetails {
                full_name: "Kari Nordmann".to_string(),
                email: "kari@example.no".to_string(),
                summary: Some("Backend developer".to_string()),
                ..Default::default()
            })
            .unwrap();
        session.commit().unwrap();
    }

    fn seed_job(db: &mut Database) -> i64 {
        let session = db.session().unwrap();
        let id = session
            .add_job(&NewJob {
                company: "Acme & Co".to_string(),
                title: "Senior Dev/Ops".to_string(),
                description: "Run our platform.".to_string(),
                url: None,
                deadline: None,
                language: Language::English,
                notes: None,
            })
            .unwrap();
        session.commit().unwrap();
        id
    }

    fn generating_provider() -> Result<Box<dyn AIProvider>> {
        Ok(Box::new(
            ScriptedProvider::new()
                .reply_text(CV_JSON)
                .reply_text("Dear hiring team,\n\nI run platforms.\n\nRegards"),
        ))
    }

    fn no_provider() -> Result<Box<dyn AIProvider>> {
        panic!("provider must not be built")
    }

    fn missing_credential() -> Result<Box<dyn AIProvider>> {
        Err(AppError::Config("ANTHROPIC_API_KEY is not set.".to_string()).into())
    }

    struct Workspace {
        _dir: tempfile::TempDir,
        config: Config,
        renderer: Renderer,
        printer: FakePrinter,
    }

    fn workspace() -> Workspace {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_tests(dir.path(), Some("test-key"));
        let printer = FakePrinter::default();
        let renderer = Renderer::new(
            config.output_dir(),
            config.photo_dir(),
            Box::new(printer.clone()),
        );
        Workspace {
            _dir: dir,
            config,
            renderer,
            printer,
        }
    }

    fn kind(err: &anyhow::Error) -> Option<&AppError> {
        crate::error::classify(err)
    }

    #[test]
    fn test_apply_creates_application_and_two_documents() {
        let mut db = test_db();
        let ws = workspace();
        seed_profile(&mut db);
        let job_id = seed_job(&mut db);

        let outcome = apply(&mut db, &ws.config, &ws.renderer, job_id, None, generating_provider).unwrap();
        assert!(outcome.cv.pdf.exists());
        assert!(outcome.cover_letter.html.exists());
        assert_eq!(outcome.cv.html.parent(), outcome.cover_letter.html.parent());
        assert_eq!(ws.printer.printed.borrow().len(), 2);

        let session = db.session().unwrap();
        let app = session.get_application_for_job(job_id).unwrap().unwrap();
        assert_eq!(app.id, outcome.application_id);
        assert_eq!(app.status, ApplicationStatus::Draft);

        let docs = session.list_documents(app.id).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].doc_type, DocumentType::Cv);
        assert_eq!(docs[0].content, "Platform-minded backend developer.");
        assert_eq!(docs[0].pdf_path.as_deref(), Some(outcome.cv.pdf.display().to_string().as_str()));
        assert_eq!(docs[1].doc_type, DocumentType::CoverLetter);
        assert!(docs[1].content.starts_with("Dear hiring team,"));
        assert!(docs.iter().all(|d| d.language == Language::English));
    }

    #[test]
    fn test_second_apply_reuses_application() {
        let mut db = test_db();
        let ws = workspace();
        seed_profile(&mut db);
        let job_id = seed_job(&mut db);

        let first = apply(&mut db, &ws.config, &ws.renderer, job_id, None, generating_provider).unwrap();
        let second = apply(
            &mut db,
            &ws.config,
            &ws.renderer,
            job_id,
            Some("less formal"),
            generating_provider,
        )
        .unwrap();
        assert_eq!(first.application_id, second.application_id);

        let session = db.session().unwrap();
        assert_eq!(session.list_applications().unwrap().len(), 1);
        assert_eq!(session.list_documents(first.application_id).unwrap().len(), 4);
    }

    #[test]
    fn test_apply_missing_job_before_profile_and_credential() {
        let mut db = test_db();
        let ws = workspace();
        let err = apply(&mut db, &ws.config, &ws.renderer, 99, None, no_provider).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::NotFound(m)) if m == "Job 99 not found."));
    }

    #[test]
    fn test_apply_missing_profile_before_credential() {
        let mut db = test_db();
        let ws = workspace();
        let job_id = seed_job(&mut db);
        let err = apply(&mut db, &ws.config, &ws.renderer, job_id, None, no_provider).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::NotFound(m)) if m.contains("No profile found")));
    }

    #[test]
    fn test_apply_missing_credential_writes_nothing() {
        let mut db = test_db();
        let ws = workspace();
        seed_profile(&mut db);
        let job_id = seed_job(&mut db);

        let err = apply(&mut db, &ws.config, &ws.renderer, job_id, None, missing_credential).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::Config(_))));
        let session = db.session().unwrap();
        assert!(session.get_application_for_job(job_id).unwrap().is_none());
    }

    #[test]
    fn test_apply_bad_cv_json_persists_nothing() {
        let mut db = test_db();
        let ws = workspace();
        seed_profile(&mut db);
        let job_id = seed_job(&mut db);

        let err = apply(&mut db, &ws.config, &ws.renderer, job_id, None, || {
            Ok(Box::new(ScriptedProvider::new().reply_text(r#"{"experiences": []}"#)) as Box<dyn AIProvider>)
        })
        .unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::Parse(_))));
        assert!(ws.printer.printed.borrow().is_empty());

        let session = db.session().unwrap();
        assert!(session.get_application_for_job(job_id).unwrap().is_none());
    }

    #[test]
    fn test_research_upserts_single_row() {
        let mut db = test_db();
        let job_id = seed_job(&mut db);

        research(&mut db, job_id, || {
            Ok(Box::new(ScriptedProvider::new().reply_text("Acme builds anvils.")) as Box<dyn AIProvider>)
        })
        .unwrap();
        research(&mut db, job_id, || {
            Ok(Box::new(ScriptedProvider::new().reply_text("Acme now builds rockets.")) as Box<dyn AIProvider>)
        })
        .unwrap();

        let session = db.session().unwrap();
        let row = session.get_research(job_id).unwrap().unwrap();
        assert_eq!(row.summary.as_deref(), Some("Acme now builds rockets."));
        assert_eq!(row.job_id, job_id);
    }

    #[test]
    fn test_research_missing_job() {
        let mut db = test_db();
        let err = research(&mut db, 5, no_provider).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::NotFound(_))));
    }

    #[test]
    fn test_research_preview_caps_length() {
        assert_eq!(research_preview("short"), "short");
        let long = "å".repeat(1000);
        let preview = research_preview(&long);
        assert_eq!(preview.matches('å').count(), 700);
        assert!(preview.contains("..."));
    }

    #[test]
    fn test_status_update_validates_before_writing() {
        let mut db = test_db();
        let job_id = seed_job(&mut db);
        {
            let session = db.session().unwrap();
            session.get_or_create_application(job_id).unwrap();
            session.commit().unwrap();
        }

        let err = status_update(&mut db, job_id, "ghosted", None).unwrap_err();
        assert!(matches!(
            kind(&err),
            Some(AppError::Validation(m)) if m == "Invalid status. Choose from: draft, sent, interview, rejected, offer"
        ));
        let err = status_update(&mut db, job_id, "Sent", None).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::Validation(_))));

        let session = db.session().unwrap();
        let app = session.get_application_for_job(job_id).unwrap().unwrap();
        assert_eq!(app.status, ApplicationStatus::Draft);
    }

    #[test]
    fn test_status_update_sets_status_and_notes() {
        let mut db = test_db();
        let job_id = seed_job(&mut db);
        {
            let session = db.session().unwrap();
            session.get_or_create_application(job_id).unwrap();
            session.commit().unwrap();
        }

        status_update(&mut db, job_id, "interview", Some("Tuesday 10:00")).unwrap();
        status_update(&mut db, job_id, "offer", None).unwrap();

        let session = db.session().unwrap();
        let app = session.get_application_for_job(job_id).unwrap().unwrap();
        assert_eq!(app.status, ApplicationStatus::Offer);
        assert_eq!(app.notes.as_deref(), Some("Tuesday 10:00"));
    }

    #[test]
    fn test_status_update_without_application() {
        let mut db = test_db();
        let job_id = seed_job(&mut db);
        let err = status_update(&mut db, job_id, "sent", None).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::NotFound(_))));
    }

    #[test]
    fn test_status_remove_drops_documents() {
        let mut db = test_db();
        let ws = workspace();
        seed_profile(&mut db);
        let job_id = seed_job(&mut db);
        let outcome = apply(&mut db, &ws.config, &ws.renderer, job_id, None, generating_provider).unwrap();

        status_remove(&mut db, job_id).unwrap();

        let session = db.session().unwrap();
        assert!(session.get_application_for_job(job_id).unwrap().is_none());
        assert!(session.list_documents(outcome.application_id).unwrap().is_empty());
        assert!(session.get_job(job_id).unwrap().is_some());
        assert!(outcome.cv.pdf.exists());
    }

    #[test]
    fn test_render_checks_existence_then_extension() {
        let ws = workspace();
        let missing = PathBuf::from("/definitely/not/here.html");
        let err = render(&ws.renderer, &missing).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::NotFound(_))));

        let txt = ws.config.data_dir.join("notes.txt");
        std::fs::write(&txt, "x").unwrap();
        let err = render(&ws.renderer, &txt).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::Validation(m)) if m == "File must be an .html file."));

        let html = ws.config.data_dir.join("cv.HTML");
        std::fs::write(&html, "<p>x</p>").unwrap();
        render(&ws.renderer, &html).unwrap();
        assert!(ws.config.data_dir.join("cv.pdf").exists());
    }

    #[test]
    fn test_job_add_reads_description_until_end() {
        let mut db = test_db();
        let input = "Acme\nBackend Developer\n\nen\n2026-12-01\nWe build anvils.\n\nRust.\nEND\nReferral from Ola\n";
        let id = job_add(&mut db, &mut prompter(input)).unwrap();

        let session = db.session().unwrap();
        let job = session.get_job(id).unwrap().unwrap();
        assert_eq!(job.company, "Acme");
        assert_eq!(job.url, None);
        assert_eq!(job.language, Language::English);
        assert_eq!(job.deadline, chrono::NaiveDate::from_ymd_opt(2026, 12, 1));
        assert_eq!(job.description, "We build anvils.\n\nRust.");
        assert_eq!(job.notes.as_deref(), Some("Referral from Ola"));
        assert!(!job.has_application);
    }

    #[test]
    fn test_job_add_bad_deadline_saves_nothing() {
        let mut db = test_db();
        let input = "Acme\nDev\n\n\n01.12.2026\n";
        let err = job_add(&mut db, &mut prompter(input)).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::Validation(_))));
        let session = db.session().unwrap();
        assert!(session.list_jobs().unwrap().is_empty());
    }

    #[test]
    fn test_job_show_missing() {
        let mut db = test_db();
        let err = job_show(&mut db, 3).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::NotFound(_))));
    }

    #[test]
    fn test_profile_setup_keeps_existing_on_blank() {
        let mut db = test_db();
        profile_setup(
            &mut db,
            &mut prompter("Kari Nordmann\nkari@example.no\n\nOslo\n\n\nBackend dev\nSkiing\n"),
        )
        .unwrap();
        profile_setup(&mut db, &mut prompter("\nkari@new.no\n\n\n\n\n\n\n")).unwrap();

        let session = db.session().unwrap();
        let details = session.load_profile().unwrap().unwrap().details;
        assert_eq!(details.full_name, "Kari Nordmann");
        assert_eq!(details.email, "kari@new.no");
        assert_eq!(details.phone, None);
        assert_eq!(details.location.as_deref(), Some("Oslo"));
        assert_eq!(details.summary.as_deref(), Some("Backend dev"));
        assert_eq!(details.interests.as_deref(), Some("Skiing"));
    }

    #[test]
    fn test_profile_additions_require_profile() {
        let mut db = test_db();
        let err = profile_add_experience(&mut db, &mut prompter("Acme\n")).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::NotFound(_))));
        let err = profile_add_skills(&mut db, &mut prompter("\nRust\n")).unwrap_err();
        assert!(matches!(kind(&err), Some(AppError::NotFound(_))));
    }

    #[test]
    fn test_profile_add_entries() {
        let mut db = test_db();
        seed_profile(&mut db);

        profile_add_experience(
            &mut db,
            &mut prompter("Fjord Bank\nDeveloper\n2017-08-01\n2020-12-31\nPayments\n"),
        )
        .unwrap();
        profile_add_education(
            &mut db,
            &mut prompter("NTNU\nMaster\n\n2012-08-01\n\n"),
        )
        .unwrap();
        profile_add_skill(&mut db, &mut prompter("Rust\nProgramming\n")).unwrap();
        profile_add_skills(&mut db, &mut prompter("\nSQL, , Docker ,\n")).unwrap();

        let session = db.session().unwrap();
        let profile = session.load_profile().unwrap().unwrap();
        assert_eq!(profile.work_experiences.len(), 1);
        assert_eq!(profile.work_experiences[0].description.as_deref(), Some("Payments"));
        assert_eq!(profile.educations[0].field, None);
        assert_eq!(profile.educations[0].end_date, None);
        let skills: Vec<(&str, Option<&str>)> = profile
            .skills
            .iter()
            .map(|s| (s.name.as_str(), s.category.as_deref()))
            .collect();
        assert_eq!(
            skills,
            vec![
                ("Rust", Some("Programming")),
                ("SQL", Some("General")),
                ("Docker", Some("General")),
            ]
        );
    }

    #[test]
    fn test_split_skill_list() {
        assert_eq!(split_skill_list(" Rust,SQL , ,Go "), vec!["Rust", "SQL", "Go"]);
        assert!(split_skill_list(" , ").is_empty());
    }

    #[test]
    fn test_transient_line_erases_itself() {
        let mut out = Vec::new();
        {
            let mut line = TransientLine::show(&mut out, true, "Working...");
            line.update("Rendering...");
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Working..."));
        assert!(text.contains("Rendering..."));
        assert_eq!(text.matches("\x1b[2K").count(), 2);
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_transient_line_plain_when_not_a_terminal() {
        let mut out = Vec::new();
        {
            let mut line = TransientLine::show(&mut out, false, "Working...");
            line.update("Rendering...");
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Working..."));
        assert!(!text.contains("\x1b[2K"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Bølgen", 10), "Bølgen");
        assert_eq!(truncate("Bølgeblikk AS", 8), "Bølge...");
    }
}
