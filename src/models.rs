use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Norwegian,
    English,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Norwegian, Language::English];

    pub fn code(self) -> &'static str {
        match self {
            Language::Norwegian => "NO",
            Language::English => "EN",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NO" => Ok(Language::Norwegian),
            "EN" => Ok(Language::English),
            other => Err(AppError::Validation(format!(
                "Invalid language '{}'. Choose from: NO, EN",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    Draft,
    Sent,
    Interview,
    Rejected,
    Offer,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Draft,
        ApplicationStatus::Sent,
        ApplicationStatus::Interview,
        ApplicationStatus::Rejected,
        ApplicationStatus::Offer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Sent => "sent",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Offer => "offer",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                AppError::Validation(format!(
                    "Invalid status. Choose from: {}",
                    valid.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Cv,
    CoverLetter,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Cv => "cv",
            DocumentType::CoverLetter => "cover_letter",
        }
    }
}

impl FromStr for DocumentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cv" => Ok(DocumentType::Cv),
            "cover_letter" => Ok(DocumentType::CoverLetter),
            other => Err(AppError::Validation(format!("Unknown document type '{}'", other))),
        }
    }
}

/// Contact and free-text fields of the profile, without its child lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDetails {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub summary: Option<String>,
    pub interests: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub id: i64,
    pub details: ProfileDetails,
    pub work_experiences: Vec<WorkExperience>, // most recent first
    pub educations: Vec<Education>,
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone)]
pub struct WorkExperience {
    pub id: i64,
    pub profile_id: i64,
    pub company: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>, // None = current
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Education {
    pub id: i64,
    pub profile_id: i64,
    pub institution: String,
    pub degree: String,
    pub field: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct Skill {
    pub id: i64,
    pub profile_id: i64,
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewExperience {
    pub company: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEducation {
    pub institution: String,
    pub degree: String,
    pub field: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: i64,
    pub company: String,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub language: Language,
    pub notes: Option<String>,
    pub has_application: bool, // derived from the applications table
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub company: String,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub language: Language,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Research {
    pub id: i64,
    pub job_id: i64,
    pub summary: Option<String>,
    pub company_website: Option<String>,
    pub review_site: Option<String>,
    pub news: Option<String>,
    pub social: Option<String>,
    pub scraped_at: String,
}

#[derive(Debug, Clone)]
pub struct Application {
    pub id: i64,
    pub job_id: i64,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// An application joined with the job it belongs to, for listings.
#[derive(Debug, Clone)]
pub struct ApplicationSummary {
    pub application: Application,
    pub company: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: i64,
    pub application_id: i64,
    pub doc_type: DocumentType,
    pub language: Language,
    pub content: String,
    pub pdf_path: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub application_id: i64,
    pub doc_type: DocumentType,
    pub language: Language,
    pub content: String,
    pub pdf_path: Option<String>,
}

/// Groups skills by category label, keeping first-seen order of categories
/// and of names within a category. Uncategorised skills go under "General".
pub fn group_skills(skills: &[Skill]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for skill in skills {
        let category = skill.category.as_deref().unwrap_or("General");
        match groups.iter_mut().find(|(cat, _)| cat == category) {
            Some((_, names)) => names.push(skill.name.clone()),
            None => groups.push((category.to_string(), vec![skill.name.clone()])),
        }
    }
    groups
}

/// Parses a `YYYY-MM-DD` date typed by the user.
pub fn parse_date(input: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!(
            "Invalid date '{}'. Expected YYYY-MM-DD.",
            input.trim()
        ))
    })
}
