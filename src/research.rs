//! Company research through the model's built-in web search tool.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::ai::{AIProvider, ContentBlock, MessageRequest, Tool};
use crate::models::Job;

const DESCRIPTION_EXCERPT_CHARS: usize = 800;
const MAX_SEARCHES: u32 = 5;
const RESEARCH_MAX_TOKENS: u32 = 4096;

pub fn build_research_prompt(job: &Job) -> String {
    let mut job_context = format!("Job title: {}\n", job.title);
    if !job.description.is_empty() {
        let excerpt: String = job
            .description
            .chars()
            .take(DESCRIPTION_EXCERPT_CHARS)
            .collect();
        job_context.push_str(&format!("\nJob description excerpt:\n{}", excerpt));
    }

    format!(
        r#"Research the company "{company}" for a job applicant who is applying for the role of {title}.

{job_context}

Search for and gather:
1. What the company does - products, services, industry, size, customers
2. Company culture, values, and work environment
3. Recent news or developments (last 12 months)
4. Technology stack or tools they use (if relevant to this role)
5. Reputation as an employer - Glassdoor ratings or employee sentiment if available
6. Key leadership, notable projects, or recent milestones

Then write a structured research summary with clear sections. Be specific and factual - only include what you found. This summary will be used when writing a tailored CV and cover letter for this job application."#,
        company = job.company,
        title = job.title,
    )
}

/// Joins the text blocks of a response with a blank line, skipping tool
/// records, in their original order.
pub fn collect_text_blocks(blocks: &[ContentBlock]) -> String {
    let mut parts = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::Text { text } => parts.push(text.as_str()),
            ContentBlock::ServerToolUse { name } => debug!(tool = %name, "skipping tool use block"),
            ContentBlock::WebSearchToolResult { tool_use_id } => {
                debug!(tool_use_id = %tool_use_id, "skipping search result block")
            }
            ContentBlock::Other => {}
        }
    }
    parts.join("\n\n").trim().to_string()
}

pub fn research_company(provider: &dyn AIProvider, job: &Job) -> Result<String> {
    let prompt = build_research_prompt(job);
    let request = MessageRequest::user(provider.model_name(), &prompt, RESEARCH_MAX_TOKENS)
        .with_tool(Tool::web_search(MAX_SEARCHES));

    info!(job_id = job.id, company = %job.company, "researching company");
    let response = provider
        .send(&request)
        .with_context(|| format!("Research request for '{}' failed", job.company))?;

    let summary = collect_text_blocks(&response.content);
    debug!(chars = summary.len(), "research summary assembled");
    Ok(summary)
}
