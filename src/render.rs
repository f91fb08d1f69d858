//! HTML and PDF rendering for generated CVs and cover letters.
//!
//! Every document is written as HTML first and then printed to a PDF next to
//! it, so the user can edit the HTML and re-export with `jobb render`.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDateTime;
use headless_chrome::browser::default_executable;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, LazyLock, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::generation::CvContent;
use crate::models::Language;

const CV_TEMPLATE: &str = include_str!("../templates/cv.html");
const COVER_LETTER_TEMPLATE: &str = include_str!("../templates/cover_letter.html");

const PHOTO_CANDIDATES: [&str; 4] = ["photo.jpg", "photo.jpeg", "photo.png", "photo.webp"];

// A4 in inches
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;

const NETWORK_IDLE_EVENT: &str = "networkIdle";
const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(20);

static UNSAFE_DIR_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-]").expect("valid regex"));
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid regex"));
static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("valid regex"));

// --- PDF printing ---

pub trait PdfPrinter {
    /// Prints the HTML file at `html_path` to `pdf_path`.
    fn print(&self, html_path: &Path, pdf_path: &Path) -> Result<()>;
}

/// Set once the page reports the `networkIdle` lifecycle event.
#[derive(Clone, Default)]
struct IdleLatch {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl IdleLatch {
    fn observe(&self, lifecycle_name: &str) {
        if lifecycle_name != NETWORK_IDLE_EVENT {
            return;
        }
        let (lock, cvar) = &*self.state;
        if let Ok(mut idle) = lock.lock() {
            *idle = true;
            cvar.notify_all();
        }
    }

    /// Blocks until idle or `timeout`. Returns whether idle was reached.
    fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.state;
        let Ok(idle) = lock.lock() else {
            return false;
        };
        match cvar.wait_timeout_while(idle, timeout, |idle| !*idle) {
            Ok((idle, _)) => *idle,
            Err(_) => false,
        }
    }
}

/// Prints through a throwaway headless Chrome: one browser process per
/// document, torn down when the call returns.
pub struct ChromePrinter;

fn render_error(stage: &str, err: impl std::fmt::Display) -> AppError {
    AppError::Render(format!("{}: {}", stage, err))
}

impl PdfPrinter for ChromePrinter {
    fn print(&self, html_path: &Path, pdf_path: &Path) -> Result<()> {
        let abs = std::fs::canonicalize(html_path)
            .with_context(|| format!("Failed to resolve {}", html_path.display()))?;
        let url = reqwest::Url::from_file_path(&abs)
            .map_err(|_| render_error("Invalid file path", abs.display()))?;

        let launch_options = LaunchOptions {
            headless: true,
            sandbox: true,
            path: default_executable().ok(),
            ..Default::default()
        };
        let browser = Browser::new(launch_options)
            .map_err(|e| render_error("Failed to launch Chrome. Make sure Chrome or Chromium is installed", e))?;
        let tab = browser
            .new_tab()
            .map_err(|e| render_error("Failed to create browser tab", e))?;

        tab.call_method(Page::SetLifecycleEventsEnabled { enabled: true })
            .map_err(|e| render_error("Failed to enable page lifecycle events", e))?;
        let latch = IdleLatch::default();
        let observer = latch.clone();
        let listener = tab
            .add_event_listener(Arc::new(move |event: &Event| {
                if let Event::PageLifecycleEvent(lifecycle) = event {
                    observer.observe(&lifecycle.params.name);
                }
            }))
            .map_err(|e| render_error("Failed to watch page lifecycle", e))?;

        debug!(url = %url, "loading document");
        tab.navigate_to(url.as_str())
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| render_error("Failed to load HTML", e))?;
        if !latch.wait(NETWORK_IDLE_TIMEOUT) {
            warn!(url = %url, "network did not go idle; printing what has loaded");
        }
        let _ = tab.remove_event_listener(&listener);

        let options = PrintToPdfOptions {
            paper_width: Some(A4_WIDTH_IN),
            paper_height: Some(A4_HEIGHT_IN),
            margin_top: Some(0.0),
            margin_bottom: Some(0.0),
            margin_left: Some(0.0),
            margin_right: Some(0.0),
            print_background: Some(true),
            ..Default::default()
        };
        let bytes = tab
            .print_to_pdf(Some(options))
            .map_err(|e| render_error("Failed to print PDF", e))?;

        std::fs::write(pdf_path, bytes)
            .with_context(|| format!("Failed to write {}", pdf_path.display()))?;
        Ok(())
    }
}

// --- Renderer ---

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPair {
    pub html: PathBuf,
    pub pdf: PathBuf,
}

pub struct Renderer {
    output_dir: PathBuf,
    photo_dir: PathBuf,
    printer: Box<dyn PdfPrinter>,
}

impl Renderer {
    pub fn new(output_dir: PathBuf, photo_dir: PathBuf, printer: Box<dyn PdfPrinter>) -> Self {
        Self {
            output_dir,
            photo_dir,
            printer,
        }
    }

    fn ensure_output_dir(&self, subdir: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(subdir);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create output directory {}", path.display()))?;
        Ok(path)
    }

    /// Writes `<stem>.html`, then prints `<stem>.pdf`. A failed print leaves
    /// the HTML in place.
    fn write_and_print(&self, html: &str, dir: &Path, stem: &str) -> Result<RenderedPair> {
        let html_path = dir.join(format!("{}.html", stem));
        let pdf_path = dir.join(format!("{}.pdf", stem));
        std::fs::write(&html_path, html)
            .with_context(|| format!("Failed to write {}", html_path.display()))?;
        self.printer.print(&html_path, &pdf_path)?;
        info!(pdf = %pdf_path.display(), "rendered");
        Ok(RenderedPair {
            html: html_path,
            pdf: pdf_path,
        })
    }

    pub fn render_cv(&self, cv: &CvContent, output_subdir: &str) -> Result<RenderedPair> {
        let photo = photo_data_uri(&self.photo_dir)?;
        let html = cv_html(cv, photo.as_deref());
        let dir = self.ensure_output_dir(output_subdir)?;
        self.write_and_print(&html, &dir, "cv")
    }

    pub fn render_cover_letter(
        &self,
        cv: &CvContent,
        cover_letter_text: &str,
        job_title: &str,
        job_company: &str,
        output_subdir: &str,
    ) -> Result<RenderedPair> {
        let paragraphs = split_paragraphs(cover_letter_text);
        let date = format_letter_date(cv.language, chrono::Local::now().date_naive());
        let html = cover_letter_html(cv, &paragraphs, job_title, job_company, &date);
        let dir = self.ensure_output_dir(output_subdir)?;
        self.write_and_print(&html, &dir, "cover_letter")
    }

    /// Re-exports an edited HTML file as a PDF with the same stem, in the same
    /// directory.
    pub fn html_to_pdf(&self, html_path: &Path) -> Result<PathBuf> {
        let is_html = html_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html"));
        if !is_html {
            return Err(AppError::Validation("File must be an .html file.".to_string()).into());
        }
        if !html_path.is_file() {
            return Err(AppError::NotFound(format!("File not found: {}", html_path.display())).into());
        }

        let pdf_path = html_path.with_extension("pdf");
        self.printer.print(html_path, &pdf_path)?;
        Ok(pdf_path)
    }
}

// --- Output naming ---

/// Output folder name for one generation run, e.g.
/// `acme___co_senior_dev_ops_7_20261016_142501`.
pub fn safe_dirname(company: &str, title: &str, job_id: i64, at: NaiveDateTime) -> String {
    let raw = format!("{}_{}_{}", company, title, job_id);
    let base = UNSAFE_DIR_CHARS.replace_all(&raw, "_").to_lowercase();
    format!("{}_{}", base, at.format("%Y%m%d_%H%M%S"))
}

pub fn output_subdir(company: &str, title: &str, job_id: i64) -> String {
    safe_dirname(company, title, job_id, chrono::Local::now().naive_local())
}

// --- Photo ---

/// The first profile photo found in `dir`, inlined as a data URI.
pub fn photo_data_uri(dir: &Path) -> Result<Option<String>> {
    for name in PHOTO_CANDIDATES {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        let ext = name.rsplit('.').next().unwrap_or_default();
        let mime = match ext {
            "jpg" | "jpeg" => "image/jpeg".to_string(),
            other => format!("image/{}", other),
        };
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read photo {}", path.display()))?;
        debug!(photo = %path.display(), "embedding profile photo");
        return Ok(Some(format!("data:{};base64,{}", mime, BASE64.encode(bytes))));
    }
    Ok(None)
}

// --- HTML assembly ---

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replaces `{{key}}` placeholders in one pass. Values are inserted verbatim,
/// so they must already be escaped. Unknown keys are left untouched.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

pub fn split_paragraphs(text: &str) -> Vec<String> {
    BLANK_LINE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

struct Labels {
    contact: &'static str,
    skills: &'static str,
    interests: &'static str,
    profile: &'static str,
    experience: &'static str,
    education: &'static str,
    closing: &'static str,
}

fn labels(language: Language) -> Labels {
    match language {
        Language::Norwegian => Labels {
            contact: "Kontakt",
            skills: "Ferdigheter",
            interests: "Interesser",
            profile: "Profil",
            experience: "Arbeidserfaring",
            education: "Utdanning",
            closing: "Med vennlig hilsen",
        },
        Language::English => Labels {
            contact: "Contact",
            skills: "Skills",
            interests: "Interests",
            profile: "Profile",
            experience: "Experience",
            education: "Education",
            closing: "Kind regards",
        },
    }
}

fn contact_items(cv: &CvContent) -> Vec<&str> {
    [
        cv.email.as_str(),
        cv.phone.as_str(),
        cv.location.as_str(),
        cv.linkedin_url.as_str(),
        cv.github_url.as_str(),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect()
}

pub fn cv_html(cv: &CvContent, photo: Option<&str>) -> String {
    let l = labels(cv.language);

    let photo_html = photo
        .map(|uri| format!(r#"<img class="photo" src="{}" alt="">"#, escape_html(uri)))
        .unwrap_or_default();

    let contact = contact_items(cv)
        .into_iter()
        .map(|item| format!("      <li>{}</li>", escape_html(item)))
        .collect::<Vec<_>>()
        .join("\n");

    let skills = cv
        .skills
        .iter()
        .map(|group| {
            format!(
                r#"    <div class="skill-group"><span class="cat">{}</span>{}</div>"#,
                escape_html(&group.category),
                escape_html(&group.names.join(", "))
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let experiences = cv
        .experiences
        .iter()
        .map(|exp| {
            let bullets = exp
                .bullets
                .iter()
                .map(|b| format!("<li>{}</li>", escape_html(b)))
                .collect::<String>();
            format!(
                r#"    <div class="entry">
      <div class="head"><span>{}</span><span>{}</span></div>
      <div class="sub">{}</div>
      <ul>{}</ul>
    </div>"#,
                escape_html(&exp.title),
                escape_html(&exp.period),
                escape_html(&exp.company),
                bullets
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let educations = cv
        .educations
        .iter()
        .map(|edu| {
            let degree = [Some(edu.degree.as_str()), edu.field.as_deref()]
                .into_iter()
                .flatten()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                r#"    <div class="entry">
      <div class="head"><span>{}</span><span>{}</span></div>
      <div class="sub">{}</div>
    </div>"#,
                escape_html(&degree),
                escape_html(&edu.period),
                escape_html(&edu.institution)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    fill_template(
        CV_TEMPLATE,
        &[
            ("lang", lang_attr(cv.language).to_string()),
            ("name", escape_html(&cv.name)),
            ("photo", photo_html),
            ("heading_contact", l.contact.to_string()),
            ("contact", contact),
            ("heading_skills", l.skills.to_string()),
            ("skills", skills),
            ("heading_interests", l.interests.to_string()),
            ("interests", escape_html(&cv.interests)),
            ("heading_profile", l.profile.to_string()),
            ("summary", escape_html(&cv.summary)),
            ("heading_experience", l.experience.to_string()),
            ("experiences", experiences),
            ("heading_education", l.education.to_string()),
            ("educations", educations),
        ],
    )
}

pub fn cover_letter_html(
    cv: &CvContent,
    paragraphs: &[String],
    job_title: &str,
    job_company: &str,
    date: &str,
) -> String {
    let l = labels(cv.language);
    let subject = match cv.language {
        Language::Norwegian => format!("Søknad på stillingen som {} hos {}", job_title, job_company),
        Language::English => format!("Application for {} at {}", job_title, job_company),
    };
    let contact = contact_items(cv)
        .into_iter()
        .map(escape_html)
        .collect::<Vec<_>>()
        .join(" · ");
    let body = paragraphs
        .iter()
        .map(|p| format!("  <p>{}</p>", escape_html(p)))
        .collect::<Vec<_>>()
        .join("\n");

    fill_template(
        COVER_LETTER_TEMPLATE,
        &[
            ("lang", lang_attr(cv.language).to_string()),
            ("name", escape_html(&cv.name)),
            ("job_title", escape_html(job_title)),
            ("contact", contact),
            ("date", escape_html(date)),
            ("subject", escape_html(&subject)),
            ("paragraphs", body),
            ("closing", l.closing.to_string()),
        ],
    )
}

fn lang_attr(language: Language) -> &'static str {
    match language {
        Language::Norwegian => "nb",
        Language::English => "en",
    }
}

fn format_letter_date(language: Language, date: chrono::NaiveDate) -> String {
    match language {
        Language::Norwegian => date.format("%d.%m.%Y").to_string(),
        Language::English => date.format("%-d %B %Y").to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{BrokenPrinter, FakePrinter};
    use super::*;
    use crate::generation::{EducationEntry, ExperienceEntry, SkillGroup};
    use chrono::NaiveDate;

    fn sample_cv(language: Language) -> CvContent {
        CvContent {
            name: "Kari <Nordmann>".to_string(),
            email: "kari@example.no".to_string(),
            phone: String::new(),
            location: "Oslo".to_string(),
            linkedin_url: String::new(),
            github_url: "https://github.com/kari".to_string(),
            language,
            summary: "Builds & ships.".to_string(),
            experiences: vec![ExperienceEntry {
                company: "Nordic Rail".to_string(),
                title: "Senior Developer".to_string(),
                period: "2021 – present".to_string(),
                bullets: vec!["Cut latency".to_string(), "Mentored two juniors".to_string()],
            }],
            educations: vec![EducationEntry {
                institution: "NTNU".to_string(),
                degree: "Master".to_string(),
                field: Some("Computer Science".to_string()),
                period: "2012 – 2017".to_string(),
            }],
            skills: vec![SkillGroup {
                category: "Programming".to_string(),
                names: vec!["Rust".to_string(), "SQL".to_string()],
            }],
            interests: "Skiing".to_string(),
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn renderer(dir: &Path, printer: Box<dyn PdfPrinter>) -> Renderer {
        Renderer::new(dir.join("output"), dir.join("profile"), printer)
    }

    #[test]
    fn test_idle_latch_waits_for_network_idle() {
        let latch = IdleLatch::default();
        latch.observe("load");
        latch.observe("DOMContentLoaded");
        assert!(!latch.wait(Duration::from_millis(20)));

        let observer = latch.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            observer.observe("networkIdle");
        });
        assert!(latch.wait(Duration::from_secs(5)));
        handle.join().unwrap();
        assert!(latch.wait(Duration::ZERO));
    }

    #[test]
    fn test_safe_dirname_sanitizes() {
        let name = safe_dirname("Acme & Co", "Senior Dev/Ops", 7, at(14, 25, 1));
        assert_eq!(name, "acme___co_senior_dev_ops_7_20261016_142501");
        assert!(name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'));
        assert!(!name.contains(['&', '/', ' ']));
    }

    #[test]
    fn test_safe_dirname_timestamp_differs_between_runs() {
        let a = safe_dirname("Acme", "Dev", 1, at(9, 0, 0));
        let b = safe_dirname("Acme", "Dev", 1, at(9, 0, 1));
        assert_ne!(a, b);
        assert!(a.starts_with("acme_dev_1_"));
    }

    #[test]
    fn test_safe_dirname_keeps_unicode_word_chars() {
        let name = safe_dirname("Bølgen AS", "Utvikler-Team", 3, at(0, 0, 0));
        assert_eq!(name, "bølgen_as_utvikler-team_3_20261016_000000");
    }

    #[test]
    fn test_split_paragraphs() {
        let text = "\nFirst line\ncontinues.\n\n  Second.  \n \nThird.\r\n\r\n\n";
        assert_eq!(
            split_paragraphs(text),
            vec!["First line\ncontinues.", "Second.", "Third."]
        );
        assert!(split_paragraphs("   ").is_empty());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_fill_template_single_pass() {
        let out = fill_template(
            "<p>{{a}}</p><p>{{b}}</p><p>{{missing}}</p>",
            &[("a", "{{b}}".to_string()), ("b", "B".to_string())],
        );
        assert_eq!(out, "<p>{{b}}</p><p>B</p><p>{{missing}}</p>");
    }

    #[test]
    fn test_cv_html_escapes_and_localizes() {
        let html = cv_html(&sample_cv(Language::Norwegian), None);
        assert!(html.contains("Kari &lt;Nordmann&gt;"));
        assert!(html.contains("Builds &amp; ships."));
        assert!(html.contains("Arbeidserfaring"));
        assert!(html.contains("<li>Cut latency</li><li>Mentored two juniors</li>"));
        assert!(html.contains("Master, Computer Science"));
        assert!(html.contains(r#"<span class="cat">Programming</span>Rust, SQL"#));
        assert!(html.contains(r#"lang="nb""#));
        assert!(!html.contains("<img"));
        assert!(!html.contains("{{"));

        let html = cv_html(&sample_cv(Language::English), Some("data:image/png;base64,AAAA"));
        assert!(html.contains("Experience"));
        assert!(html.contains(r#"<img class="photo" src="data:image/png;base64,AAAA""#));
    }

    #[test]
    fn test_cv_html_renders_blank_entry_fields() {
        let mut cv = sample_cv(Language::English);
        cv.experiences = vec![ExperienceEntry {
            company: "Acme".to_string(),
            title: String::new(),
            period: String::new(),
            bullets: Vec::new(),
        }];
        cv.educations = vec![EducationEntry {
            institution: "NTNU".to_string(),
            degree: String::new(),
            field: Some("Physics".to_string()),
            period: String::new(),
        }];
        let html = cv_html(&cv, None);
        assert!(html.contains(r#"<div class="sub">Acme</div>"#));
        assert!(html.contains("<span>Physics</span>"));
        assert!(!html.contains(", Physics"));
    }

    #[test]
    fn test_cover_letter_html() {
        let paragraphs = vec!["Hello there.".to_string(), "Hire me & see.".to_string()];
        let html = cover_letter_html(
            &sample_cv(Language::English),
            &paragraphs,
            "Senior Dev/Ops",
            "Acme & Co",
            "16 October 2026",
        );
        assert!(html.contains("<p>Hello there.</p>"));
        assert!(html.contains("<p>Hire me &amp; see.</p>"));
        assert!(html.contains("Application for Senior Dev/Ops at Acme &amp; Co"));
        assert!(html.contains("Kind regards"));
        assert!(html.contains("kari@example.no · Oslo · https://github.com/kari"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_letter_date_format() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        assert_eq!(format_letter_date(Language::Norwegian, d), "05.03.2026");
        assert_eq!(format_letter_date(Language::English, d), "5 March 2026");
    }

    #[test]
    fn test_photo_data_uri_first_match_wins() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(photo_data_uri(dir.path()).unwrap(), None);

        std::fs::write(dir.path().join("photo.png"), [1u8, 2, 3]).unwrap();
        assert_eq!(
            photo_data_uri(dir.path()).unwrap().as_deref(),
            Some("data:image/png;base64,AQID")
        );

        std::fs::write(dir.path().join("photo.jpeg"), [1u8, 2, 3]).unwrap();
        assert_eq!(
            photo_data_uri(dir.path()).unwrap().as_deref(),
            Some("data:image/jpeg;base64,AQID")
        );
    }

    #[test]
    fn test_render_cv_and_cover_letter_side_by_side() {
        let dir = tempfile::tempdir().unwrap();
        let printer = FakePrinter::default();
        let r = renderer(dir.path(), Box::new(printer.clone()));
        let cv = sample_cv(Language::English);

        let cv_pair = r.render_cv(&cv, "acme_run").unwrap();
        let cl_pair = r
            .render_cover_letter(&cv, "One.\n\nTwo.", "Dev", "Acme", "acme_run")
            .unwrap();

        let out = dir.path().join("output").join("acme_run");
        assert_eq!(cv_pair.html, out.join("cv.html"));
        assert_eq!(cv_pair.pdf, out.join("cv.pdf"));
        assert_eq!(cl_pair.html, out.join("cover_letter.html"));
        assert_eq!(cl_pair.pdf, out.join("cover_letter.pdf"));
        for path in [&cv_pair.html, &cv_pair.pdf, &cl_pair.html, &cl_pair.pdf] {
            assert!(path.exists(), "{} missing", path.display());
        }
        let letter = std::fs::read_to_string(&cl_pair.html).unwrap();
        assert!(letter.contains("<p>One.</p>"));
        assert!(letter.contains("<p>Two.</p>"));
        assert_eq!(printer.printed.borrow().len(), 2);
    }

    #[test]
    fn test_failed_print_keeps_html() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), Box::new(BrokenPrinter));
        let err = r.render_cv(&sample_cv(Language::English), "run").unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Render(_))));

        let out = dir.path().join("output").join("run");
        assert!(out.join("cv.html").exists());
        assert!(!out.join("cv.pdf").exists());
    }

    #[test]
    fn test_html_to_pdf_same_stem() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("report.html");
        std::fs::write(&html, "<p>edited</p>").unwrap();
        let printer = FakePrinter::default();
        let r = renderer(dir.path(), Box::new(printer.clone()));

        let pdf = r.html_to_pdf(&html).unwrap();
        assert_eq!(pdf, dir.path().join("report.pdf"));
        assert!(pdf.exists());
    }

    #[test]
    fn test_html_to_pdf_rejects_non_html_before_printing() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("report.txt");
        std::fs::write(&txt, "plain").unwrap();
        let printer = FakePrinter::default();
        let r = renderer(dir.path(), Box::new(printer.clone()));

        let err = r.html_to_pdf(&txt).unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Validation(_))));
        assert!(printer.printed.borrow().is_empty());
        assert!(!dir.path().join("report.pdf").exists());
    }

    #[test]
    fn test_html_to_pdf_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), Box::new(FakePrinter::default()));
        let err = r.html_to_pdf(&dir.path().join("gone.HTML")).unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::NotFound(_))));
    }
}
