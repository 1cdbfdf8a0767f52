//! Turning uploads and repositories into project description text

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser, TagEnd};
use quick_xml::Reader;
use quick_xml::events::Event as XmlEvent;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::providers::types::truncate_chars;

const SOURCE_EXTENSIONS: &[&str] = &["py", "js", "java", "cpp", "html", "css", "tsx", "jsx", "rs", "go", "ts"];

/// Only the first pages of a PDF are read
pub const PDF_MAX_PAGES: usize = 10;
/// Extracted PDF text is cut to this many characters
pub const PDF_MAX_CHARS: usize = 15_000;

const PDF_PAGES_TRUNCATED: &str = "\n\n[Remaining pages truncated - only first 10 pages processed]";
const PDF_CHARS_TRUNCATED: &str = "\n\n[Content truncated to fit API limits]";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File is not valid UTF-8 text: {0}")]
    InvalidUtf8(String),

    #[error("Failed to parse PDF: {0}")]
    Pdf(String),

    #[error("Failed to parse DOCX: {0}")]
    Docx(String),

    #[error("Invalid GitHub URL format")]
    InvalidGithubUrl,

    #[error("Failed to fetch GitHub repo: {0}")]
    Github(String),
}

/// Extract plain text from an uploaded document, dispatching on its extension
pub fn parse_document(filename: &str, bytes: &[u8]) -> Result<String, IngestError> {
    let lower = filename.to_lowercase();
    let extension = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

    let decode = || {
        String::from_utf8(bytes.to_vec()).map_err(|_| IngestError::InvalidUtf8(filename.to_string()))
    };

    match extension {
        "pdf" => parse_pdf(bytes),
        "docx" => parse_docx(bytes),
        "txt" => decode(),
        "md" | "markdown" => decode().map(|md| markdown_to_text(&md)),
        ext if SOURCE_EXTENSIONS.contains(&ext) => decode(),
        _ => Err(IngestError::UnsupportedFileType(filename.to_string())),
    }
}

/// Text of the first [`PDF_MAX_PAGES`] pages, capped at [`PDF_MAX_CHARS`]
pub fn parse_pdf(bytes: &[u8]) -> Result<String, IngestError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| IngestError::Pdf(e.to_string()))?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();

    let mut text = String::new();
    for &page in pages.iter().take(PDF_MAX_PAGES) {
        match doc.extract_text(&[page]) {
            Ok(page_text) if !page_text.trim().is_empty() => {
                text.push_str(page_text.trim_end());
                text.push('\n');
            }
            Ok(_) => {}
            Err(e) => debug!("No extractable text on PDF page {}: {}", page, e),
        }
    }

    let mut text = text.trim().to_string();
    if text.is_empty() {
        return Err(IngestError::Pdf(
            "PDF appears to be empty or contains only images".to_string(),
        ));
    }
    if pages.len() > PDF_MAX_PAGES {
        text.push_str(PDF_PAGES_TRUNCATED);
    }
    if text.chars().count() > PDF_MAX_CHARS {
        text = truncate_chars(&text, PDF_MAX_CHARS);
        text.push_str(PDF_CHARS_TRUNCATED);
    }

    info!(
        "PDF parsed: {} characters, {} words",
        text.len(),
        text.split_whitespace().count()
    );
    Ok(text)
}

/// Paragraph text of a Word document, one paragraph per line
pub fn parse_docx(bytes: &[u8]) -> Result<String, IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(docx_error)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(docx_error)?
        .read_to_string(&mut xml)
        .map_err(docx_error)?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event().map_err(docx_error)? {
            XmlEvent::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            XmlEvent::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            XmlEvent::Empty(e) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" => current.push('\n'),
                b"w:p" => paragraphs.push(String::new()),
                _ => {}
            },
            XmlEvent::Text(t) if in_text => {
                current.push_str(&t.unescape().map_err(docx_error)?);
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

fn docx_error(e: impl std::fmt::Display) -> IngestError {
    IngestError::Docx(e.to_string())
}

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<]+?>").expect("static regex is valid"));

/// Render Markdown to its readable text, dropping markup and link targets
pub fn markdown_to_text(md: &str) -> String {
    let mut text = String::new();
    for event in Parser::new(md) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::Html(html) | Event::InlineHtml(html) => {
                text.push_str(&HTML_TAG.replace_all(&html, ""));
            }
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                if !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }
    text.trim().to_string()
}

/// Split a GitHub repository URL into owner and repo
pub fn parse_github_url(raw: &str) -> Result<(String, String), IngestError> {
    let url = Url::parse(raw.trim()).map_err(|_| IngestError::InvalidGithubUrl)?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str() != Some("github.com") {
        return Err(IngestError::InvalidGithubUrl);
    }
    let mut segments = url
        .path_segments()
        .ok_or(IngestError::InvalidGithubUrl)?
        .filter(|s| !s.is_empty());
    let owner = segments.next().ok_or(IngestError::InvalidGithubUrl)?;
    let repo = segments
        .next()
        .map(|r| r.trim_end_matches(".git"))
        .filter(|r| !r.is_empty())
        .ok_or(IngestError::InvalidGithubUrl)?;
    Ok((owner.to_string(), repo.to_string()))
}

/// README text and languages of a public repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    pub readme: String,
    /// Languages ordered by bytes of code, largest first
    pub languages: Vec<String>,
}

/// Minimal GitHub REST client for repository summaries
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    api_base: String,
}

impl GithubClient {
    pub fn new() -> Result<Self, IngestError> {
        Self::with_api_base("https://api.github.com")
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("hackhelper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IngestError::Github(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch README and languages. Missing pieces come back empty rather than failing.
    pub async fn fetch_repo(&self, url: &str) -> Result<RepoSummary, IngestError> {
        let (owner, repo) = parse_github_url(url)?;
        debug!("Fetching GitHub repo {}/{}", owner, repo);

        let readme_resp = self
            .client
            .get(format!("{}/repos/{}/{}/readme", self.api_base, owner, repo))
            .header("Accept", "application/vnd.github.v3.raw")
            .send()
            .await
            .map_err(|e| IngestError::Github(e.to_string()))?;

        let readme = if readme_resp.status().is_success() {
            readme_resp
                .text()
                .await
                .map_err(|e| IngestError::Github(e.to_string()))?
        } else {
            warn!("README for {}/{} unavailable: {}", owner, repo, readme_resp.status());
            String::new()
        };

        let languages_resp = self
            .client
            .get(format!("{}/repos/{}/{}/languages", self.api_base, owner, repo))
            .send()
            .await
            .map_err(|e| IngestError::Github(e.to_string()))?;

        let languages = if languages_resp.status().is_success() {
            let bytes_by_language: HashMap<String, u64> = languages_resp
                .json()
                .await
                .map_err(|e| IngestError::Github(e.to_string()))?;
            let mut ranked: Vec<(String, u64)> = bytes_by_language.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            ranked.into_iter().map(|(name, _)| name).collect()
        } else {
            warn!("Languages for {}/{} unavailable: {}", owner, repo, languages_resp.status());
            Vec::new()
        };

        info!(
            "Fetched {}/{}: readme_chars={}, languages={}",
            owner,
            repo,
            readme.len(),
            languages.len()
        );

        Ok(RepoSummary { readme, languages })
    }
}
