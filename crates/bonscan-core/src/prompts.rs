//! Prompt library for the provider chain
//!
//! Each prompt is a markdown file with YAML frontmatter and `# System` /
//! `# User` sections. Resolution is two-layered: an override file in the
//! user's data dir wins, otherwise the copy embedded at compile time is
//! used, so upgrades ship new defaults without touching user overrides.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const EXTRACT_RECEIPT: &str = include_str!("../../../prompts/extract_receipt.md");
    pub const CLASSIFY_PRODUCTS: &str = include_str!("../../../prompts/classify_products.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Extract items from receipt text
    ExtractReceipt,
    /// Classify free-text product descriptions into keyword/category pairs
    ClassifyProducts,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractReceipt => "extract_receipt",
            Self::ClassifyProducts => "classify_products",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[Self::ExtractReceipt, Self::ClassifyProducts]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::ExtractReceipt => defaults::EXTRACT_RECEIPT,
            Self::ClassifyProducts => defaults::CLASSIFY_PRODUCTS,
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
}

/// A loaded prompt: frontmatter metadata plus the section body
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        section(&self.content, "# User")
    }

    /// Render the user section, substituting `{{var}}` placeholders. A
    /// prompt without a `# User` section renders its whole body.
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        let mut rendered = self.user_section().unwrap_or(&self.content).to_string();
        for (name, value) in vars {
            rendered = rendered.replace(&format!("{{{{{}}}}}", name), value);
        }
        rendered
    }
}

/// Loads prompts lazily and caches the parsed result per ID
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    /// A library that ignores override files (embedded prompts only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        if !self.cache.contains_key(&id) {
            let prompt = self.load(id)?;
            self.cache.insert(id, prompt);
        }
        Ok(&self.cache[&id])
    }

    fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(path) = self
            .override_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.md", id.as_str())))
            .filter(|p| p.exists())
        {
            let raw = fs::read_to_string(&path).map_err(|e| {
                Error::InvalidData(format!("Failed to read prompt override: {}", e))
            })?;
            let (metadata, content) = parse_prompt(&raw)?;
            return Ok(Prompt {
                metadata,
                content,
                is_override: true,
            });
        }

        let (metadata, content) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content,
            is_override: false,
        })
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("bonscan").join("prompts").join("overrides"))
}

/// Split a prompt file into its YAML frontmatter and markdown body
fn parse_prompt(raw: &str) -> Result<(PromptMetadata, String)> {
    let rest = raw.trim_start().strip_prefix("---").ok_or_else(|| {
        Error::InvalidData("Prompt must start with YAML frontmatter (---)".into())
    })?;
    let (frontmatter, body) = rest.split_once("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.trim().to_string()))
}

/// The text between `header` and the next top-level markdown heading
fn section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let after = &content[content.find(header)? + header.len()..];
    let end = after.find("\n# ").unwrap_or(after.len());
    Some(after[..end].trim())
}
