//! Tailored CV content and cover letters.
//!
//! The model receives the full profile and job description and returns a JSON
//! payload that drops straight into the CV template. The cover letter is a
//! second, free-text call seeded with the tailored summary.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::ai::{complete, AIProvider};
use crate::error::AppError;
use crate::models::{group_skills, Job, Language, Profile, Research};

const CV_MAX_TOKENS: u32 = 4096;
const COVER_LETTER_MAX_TOKENS: u32 = 2048;

// Entry fields tolerate `null` and omission; a blank field renders empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub period: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EducationEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub institution: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub degree: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SkillGroup {
    pub category: String,
    pub names: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// What the model must return for the CV step. `summary` is required; the
/// list sections may be omitted and then count as empty.
#[derive(Debug, Clone, Deserialize)]
pub struct CvPayload {
    pub summary: String,
    pub experiences: Option<Vec<ExperienceEntry>>,
    pub educations: Option<Vec<EducationEntry>>,
    pub skills: Option<Vec<SkillGroup>>,
    pub interests: Option<String>,
}

impl CvPayload {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let payload: CvPayload = serde_json::from_str(raw.trim())?;
        for (section, missing) in [
            ("experiences", payload.experiences.is_none()),
            ("educations", payload.educations.is_none()),
            ("skills", payload.skills.is_none()),
        ] {
            if missing {
                warn!(section, "CV payload omitted section; rendering it empty");
            }
        }
        Ok(payload)
    }
}

/// Everything the CV and cover-letter templates need.
#[derive(Debug, Clone)]
pub struct CvContent {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin_url: String,
    pub github_url: String,
    pub language: Language,
    pub summary: String,
    pub experiences: Vec<ExperienceEntry>,
    pub educations: Vec<EducationEntry>,
    pub skills: Vec<SkillGroup>,
    pub interests: String,
}

impl CvContent {
    fn from_payload(profile: &Profile, language: Language, payload: CvPayload) -> Self {
        let d = &profile.details;
        Self {
            name: d.full_name.clone(),
            email: d.email.clone(),
            phone: d.phone.clone().unwrap_or_default(),
            location: d.location.clone().unwrap_or_default(),
            linkedin_url: d.linkedin_url.clone().unwrap_or_default(),
            github_url: d.github_url.clone().unwrap_or_default(),
            language,
            summary: payload.summary,
            experiences: payload.experiences.unwrap_or_default(),
            educations: payload.educations.unwrap_or_default(),
            skills: payload.skills.unwrap_or_default(),
            interests: payload
                .interests
                .or_else(|| d.interests.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedApplication {
    pub cv: CvContent,
    pub cover_letter: String,
}

pub fn serialize_profile(profile: &Profile) -> String {
    let d = &profile.details;
    let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());

    let mut lines = vec![
        format!("Name: {}", d.full_name),
        format!("Email: {}", d.email),
        format!("Phone: {}", or_na(&d.phone)),
        format!("Location: {}", or_na(&d.location)),
        format!("LinkedIn: {}", or_na(&d.linkedin_url)),
        format!("GitHub: {}", or_na(&d.github_url)),
        format!("Summary: {}", or_na(&d.summary)),
        format!("Interests/Hobbies: {}", or_na(&d.interests)),
        String::new(),
        "## Work Experience".to_string(),
    ];

    for w in &profile.work_experiences {
        let end = w
            .end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "present".to_string());
        lines.push(format!("- {} at {} ({} – {})", w.title, w.company, w.start_date, end));
        if let Some(desc) = &w.description {
            lines.push(format!("  {}", desc));
        }
    }

    lines.push(String::new());
    lines.push("## Education".to_string());
    for e in &profile.educations {
        let end = e
            .end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "present".to_string());
        let field = e
            .field
            .as_ref()
            .map(|f| format!(" in {}", f))
            .unwrap_or_default();
        lines.push(format!(
            "- {}{} at {} ({} – {})",
            e.degree, field, e.institution, e.start_date, end
        ));
    }

    lines.push(String::new());
    lines.push("## Skills".to_string());
    for (category, names) in group_skills(&profile.skills) {
        lines.push(format!("- {}: {}", category, names.join(", ")));
    }

    lines.join("\n")
}

fn research_section(research_summary: Option<&str>) -> String {
    research_summary
        .map(|s| format!("\n\n## Company Research\n{}", s))
        .unwrap_or_default()
}

pub fn build_cv_prompt(profile_text: &str, job: &Job, research_summary: Option<&str>) -> String {
    let lang_instruction = match job.language {
        Language::Norwegian => "Write everything in Norwegian (Bokmål).",
        Language::English => "Write everything in English.",
    };
    let research = research_section(research_summary);

    format!(
        r#"You are an expert career coach and CV writer.

{lang_instruction}

Given the candidate's profile and the job description, generate a tailored CV in JSON format.

The CV should:
- Highlight experiences and skills most relevant to this specific job
- Rewrite the work experience descriptions as 2–4 concise bullet points per role, tailored to the job
- Write a sharp 2–3 sentence professional summary specifically for this role
- Be honest - do not invent skills or experience

Return ONLY valid JSON, no markdown code fences, with this exact structure:
{{
  "summary": "tailored professional summary",
  "experiences": [
    {{
      "company": "Company Name",
      "title": "Job Title",
      "period": "Jan 2020 – present",
      "bullets": ["Achievement or responsibility", "..."]
    }}
  ],
  "educations": [
    {{
      "institution": "University Name",
      "degree": "Master",
      "field": "Computer Science",
      "period": "2015 – 2019"
    }}
  ],
  "skills": [
    {{
      "category": "Programming",
      "names": ["Python", "JavaScript"]
    }}
  ],
  "interests": "short interests text"
}}

---

## Candidate Profile
{profile_text}

## Job Description
Title: {title}
Company: {company}
{research}

Description:
{description}
"#,
        title = job.title,
        company = job.company,
        description = job.description,
    )
}

pub fn build_cover_letter_prompt(
    profile_text: &str,
    job: &Job,
    cv_summary: &str,
    research_summary: Option<&str>,
    guidelines: Option<&str>,
    feedback: Option<&str>,
) -> String {
    let lang_instruction = match job.language {
        Language::Norwegian => "Write the cover letter in Norwegian (Bokmål).",
        Language::English => "Write the cover letter in English.",
    };
    let research = research_section(research_summary);
    let guidelines_section = guidelines
        .map(|g| {
            format!(
                "\n\n## Writing Style Guidelines (from previous cover letters - use as inspiration, not a template)\n{}",
                g
            )
        })
        .unwrap_or_default();
    let feedback_section = feedback
        .map(|f| format!("\n\n## Specific Feedback to Apply\n{}", f))
        .unwrap_or_default();

    format!(
        r#"You are an expert career coach.

{lang_instruction}

Write a compelling, genuine cover letter for this job application. It should:
- Be 3–4 paragraphs, conversational but professional
- Open with a strong hook - not "I am applying for..."
- Reference specific things about the company that make this candidate a good fit
- Connect the candidate's actual experience to the job's needs
- Close with confidence, not desperation
- Sound like a real person, not a template
{guidelines_section}
{feedback_section}

Return ONLY the cover letter text. No subject line, no date, no salutation header needed.

---

## Candidate Profile
{profile_text}

## Tailored Summary (already generated for CV)
{cv_summary}

## Job
Title: {title}
Company: {company}
{research}

Description:
{description}
"#,
        title = job.title,
        company = job.company,
        description = job.description,
    )
}

/// Runs the two generation calls: structured CV first, then the cover letter.
///
/// Nothing is retried. Any failure in either call is returned as is, and no
/// partial result is produced.
pub fn generate_application(
    provider: &dyn AIProvider,
    profile: &Profile,
    job: &Job,
    research: Option<&Research>,
    guidelines: Option<&str>,
    feedback: Option<&str>,
) -> Result<GeneratedApplication> {
    let profile_text = serialize_profile(profile);
    let research_summary = research.and_then(|r| r.summary.as_deref());

    info!(job_id = job.id, language = %job.language, "generating CV content");
    let cv_prompt = build_cv_prompt(&profile_text, job, research_summary);
    let cv_raw = complete(provider, &cv_prompt, CV_MAX_TOKENS)?;
    let payload = CvPayload::parse(&cv_raw).context("CV generation step")?;

    info!(job_id = job.id, "generating cover letter");
    let cl_prompt = build_cover_letter_prompt(
        &profile_text,
        job,
        &payload.summary,
        research_summary,
        guidelines,
        feedback,
    );
    let cover_letter = complete(provider, &cl_prompt, COVER_LETTER_MAX_TOKENS)?
        .trim()
        .to_string();

    Ok(GeneratedApplication {
        cv: CvContent::from_payload(profile, job.language, payload),
        cover_letter,
    })
}
