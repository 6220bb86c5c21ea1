//! AI text provider client
//!
//! Two operations against a configured provider (OpenAI or Gemini):
//! - `classify_clarity`: is this filename unambiguous enough for unattended
//!   registration?
//! - `synthesize_metadata`: produce structured candidate metadata for a
//!   normalized software name.
//!
//! Failures are explicit: synthesis returns `Result<ProviderMetadata,
//! SynthesisError>` and the caller decides whether to fall back to
//! heuristic metadata. Clarity classification fails open (a provider error
//! or missing key classifies as clear) so an unavailable provider degrades
//! to the pre-AI behavior instead of stalling the backlog.

use crate::models::metadata::{InstallationInfo, SoftwareMetadata, SystemRequirements};
use crate::services::filename_parser::ParsedFilename;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);
const CLARITY_TIMEOUT: Duration = Duration::from_secs(30);

/// AI provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    OpenAi,
    Gemini,
}

impl AiProvider {
    /// Parse a provider name; unknown names fall back to OpenAI.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "gemini" => AiProvider::Gemini,
            _ => AiProvider::OpenAi,
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "gpt-4o",
            AiProvider::Gemini => "gemini-2.5-flash",
        }
    }
}

/// Synthesis errors. All are non-fatal to a batch: the matcher records them
/// and continues with heuristic metadata.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// No API key configured
    #[error("AI provider not configured")]
    NotConfigured,

    /// Transport-level failure (connect, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider returned a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Provider response was not the JSON we asked for
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Clarity judgment for a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clarity {
    Clear,
    Unclear,
}

/// Raw metadata as the provider names its fields.
///
/// Kept separate from [`SoftwareMetadata`] so the provider-to-catalog field
/// mapping lives in exactly one place: [`ProviderMetadata::into_catalog`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub developer: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub official_website: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub license_type: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub description_short: String,
    #[serde(default)]
    pub description_detailed: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub supported_formats: Vec<String>,
    #[serde(default)]
    pub system_requirements: Option<SystemRequirements>,
    #[serde(default)]
    pub installation_info: Option<InstallationInfo>,
    #[serde(default)]
    pub release_notes: String,
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

impl ProviderMetadata {
    /// Map provider field names onto catalog field names.
    ///
    /// `developer` becomes `vendor`, the short/detailed description pair
    /// becomes `description`/`detailed_description`. Category validity is
    /// deliberately not coerced here; the confidence scorer penalizes
    /// unknown categories instead.
    pub fn into_catalog(self) -> SoftwareMetadata {
        let mut meta = SoftwareMetadata {
            title: self.title.trim_matches(|c| c == '"' || c == '\'').to_string(),
            subtitle: None,
            description: self.description_short,
            vendor: self.developer,
            category: self.category,
            icon_url: self.icon_url,
            official_website: self.official_website,
            version: non_empty(self.version),
            license_type: non_empty(self.license_type),
            platform: non_empty(self.platform),
            detailed_description: non_empty(self.description_detailed),
            features: if self.features.is_empty() {
                None
            } else {
                Some(self.features)
            },
            system_requirements: self.system_requirements,
            supported_formats: if self.supported_formats.is_empty() {
                None
            } else {
                Some(self.supported_formats)
            },
            installation_info: self.installation_info,
            release_notes: non_empty(self.release_notes),
            release_date: None,
            patch_links: None,
        };
        meta.clamp_limits();
        meta
    }
}

/// Heuristic fallback metadata when synthesis is unavailable or fails.
pub fn fallback_metadata(parsed: &ParsedFilename) -> SoftwareMetadata {
    SoftwareMetadata {
        title: parsed.software_name.clone(),
        description: format!("{} software", parsed.software_name),
        vendor: parsed.vendor.clone().unwrap_or_default(),
        category: "Utility".to_string(),
        platform: Some("Windows".to_string()),
        version: parsed.version.clone(),
        ..Default::default()
    }
}

/// Client for the configured AI text provider.
pub struct TextSynthClient {
    http: reqwest::Client,
    provider: AiProvider,
    model: String,
    api_key: Option<String>,
}

impl TextSynthClient {
    /// Create a client. `model` empty selects the provider default; a
    /// missing key leaves the client in unconfigured (fallback-only) mode.
    pub fn new(
        provider: AiProvider,
        model: &str,
        api_key: Option<String>,
    ) -> Result<Self, SynthesisError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        let model = if model.trim().is_empty() {
            provider.default_model().to_string()
        } else {
            model.to_string()
        };

        Ok(Self {
            http,
            provider,
            model,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Whether an API key is available.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Classify whether a filename identifies its software unambiguously.
    ///
    /// Fails open: no key or an unparseable answer classifies as clear.
    pub async fn classify_clarity(
        &self,
        filename: &str,
        folder_hint: &str,
        parsed: &ParsedFilename,
    ) -> Result<Clarity, SynthesisError> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(Clarity::Clear);
        };

        let mut context = format!("Filename: {}", filename);
        if !folder_hint.is_empty() {
            context.push_str(&format!("\nFolder: {}", folder_hint));
        }
        context.push_str(&format!("\nParsed name: {}", parsed.software_name));
        if let Some(version) = &parsed.version {
            context.push_str(&format!(" (version {})", version));
        }

        let prompt = format!(
            "{}\n\n\
             Judge whether this filename unambiguously identifies a specific software product.\n\
             A clear filename contains the product's actual name (vendor and version help);\n\
             examples: \"Adobe Photoshop 2024 v25.0.iso\", \"Visual Studio Code 1.85.exe\".\n\
             An unclear filename is generic or meaningless on its own;\n\
             examples: \"setup.exe\", \"installer.zip\", \"abc123.exe\".\n\n\
             Answer with exactly one word: CLEAR or UNCLEAR.",
            context
        );

        let answer = match self.provider {
            AiProvider::OpenAi => {
                self.openai_completion(key, CLARITY_PERSONA, &prompt, 0.1, 10, CLARITY_TIMEOUT)
                    .await?
            }
            AiProvider::Gemini => {
                self.gemini_completion(key, &prompt, 0.1, 10, CLARITY_TIMEOUT)
                    .await?
            }
        };

        let answer = answer.to_uppercase();
        tracing::debug!(filename = %filename, answer = %answer, "Clarity classification");
        if answer.contains("UNCLEAR") {
            Ok(Clarity::Unclear)
        } else {
            Ok(Clarity::Clear)
        }
    }

    /// Synthesize structured candidate metadata for a software name.
    pub async fn synthesize_metadata(
        &self,
        parsed: &ParsedFilename,
    ) -> Result<ProviderMetadata, SynthesisError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(SynthesisError::NotConfigured);
        };

        let mut context = parsed.software_name.clone();
        if let Some(version) = &parsed.version {
            context.push_str(&format!(" version {}", version));
        }
        if let Some(year) = &parsed.year {
            context.push_str(&format!(" ({})", year));
        }

        let prompt = synthesis_prompt(&context);

        let content = match self.provider {
            AiProvider::OpenAi => {
                self.openai_completion(key, SYNTHESIS_PERSONA, &prompt, 0.2, 4096, SYNTHESIS_TIMEOUT)
                    .await?
            }
            AiProvider::Gemini => {
                self.gemini_completion(key, &prompt, 0.2, 8192, SYNTHESIS_TIMEOUT)
                    .await?
            }
        };

        let json = extract_json(&content);
        let metadata: ProviderMetadata =
            serde_json::from_str(json).map_err(|e| SynthesisError::Parse(e.to_string()))?;

        tracing::debug!(
            software = %parsed.software_name,
            title = %metadata.title,
            "Synthesized metadata"
        );

        Ok(metadata)
    }

    async fn openai_completion(
        &self,
        key: &str,
        persona: &str,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String, SynthesisError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": persona },
                { "role": "user", "content": prompt }
            ],
            "temperature": temperature,
            "max_tokens": max_tokens
        });

        let response = self
            .http
            .post(OPENAI_CHAT_URL)
            .timeout(timeout)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Api(status.as_u16(), text));
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }
        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }
        #[derive(Deserialize)]
        struct ChatMessage {
            content: String,
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| SynthesisError::Parse("Empty choices in response".to_string()))
    }

    async fn gemini_completion(
        &self,
        key: &str,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String, SynthesisError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, key
        );

        let body = serde_json::json!({
            "contents": [ { "parts": [ { "text": prompt } ] } ],
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens
            }
        });

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Api(status.as_u16(), text));
        }

        #[derive(Deserialize)]
        struct GeminiResponse {
            #[serde(default)]
            candidates: Vec<GeminiCandidate>,
        }
        #[derive(Deserialize)]
        struct GeminiCandidate {
            content: GeminiContent,
        }
        #[derive(Deserialize)]
        struct GeminiContent {
            #[serde(default)]
            parts: Vec<GeminiPart>,
        }
        #[derive(Deserialize)]
        struct GeminiPart {
            #[serde(default)]
            text: String,
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Parse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .ok_or_else(|| SynthesisError::Parse("Empty candidates in response".to_string()))
    }
}

const SYNTHESIS_PERSONA: &str =
    "You are an expert software analyst. You provide comprehensive, accurate metadata about \
     software applications in JSON format. Always include all required fields, using empty \
     strings or arrays for unknown information.";

const CLARITY_PERSONA: &str =
    "You are a software filename analyzer. Answer only with CLEAR or UNCLEAR.";

fn synthesis_prompt(software_context: &str) -> String {
    format!(
        "Provide metadata for the software: {}\n\n\
         Return a single JSON object with ALL of the following fields; use empty strings \"\" \
         or empty arrays [] when information is unknown:\n\
         - title: official software name\n\
         - version: version number if known\n\
         - platform: Windows, macOS, Linux, or Cross-platform\n\
         - developer: official developer/vendor name\n\
         - category: the best match by primary function, one of Graphics, Media, Office, \
         Business, Development, Utility, Security, Network, OS, Engineering, Hardware\n\
         - official_website: full URL with https://\n\
         - icon_url: official logo/icon image URL, or \"\"\n\
         - license_type: Free, Freemium, Trial, Commercial, or Open Source\n\
         - language: supported languages\n\
         - description_short: 50-100 character one-sentence description\n\
         - description_detailed: 200-300 character description of main features and purpose\n\
         - features: array of 5-10 key features\n\
         - supported_formats: array of supported file formats\n\
         - system_requirements: object with os, cpu, ram, disk_space, gpu, additional\n\
         - installation_info: object with installer_type, file_size, internet_required\n\
         - release_notes: 2-3 lines of major release notes if known\n\n\
         Rules: return ONLY valid JSON with no markdown fences, no comments, and no \
         explanations; include every field listed above; be specific for well-known software.",
        software_context
    )
}

/// Strip markdown code fences around a JSON payload.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let without_open = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    };
    without_open
        .trim_end()
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parsing_defaults_to_openai() {
        assert_eq!(AiProvider::parse("gemini"), AiProvider::Gemini);
        assert_eq!(AiProvider::parse("OpenAI"), AiProvider::OpenAi);
        assert_eq!(AiProvider::parse("something-else"), AiProvider::OpenAi);
    }

    #[test]
    fn empty_model_selects_provider_default() {
        let client = TextSynthClient::new(AiProvider::Gemini, "", None).unwrap();
        assert_eq!(client.model, "gemini-2.5-flash");
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn unconfigured_synthesis_is_not_configured() {
        let client = TextSynthClient::new(AiProvider::OpenAi, "", None).unwrap();
        let parsed = ParsedFilename {
            software_name: "Some Tool".to_string(),
            ..Default::default()
        };
        match client.synthesize_metadata(&parsed).await {
            Err(SynthesisError::NotConfigured) => {}
            other => panic!("expected NotConfigured, got {:?}", other.map(|m| m.title)),
        }
    }

    #[tokio::test]
    async fn unconfigured_clarity_fails_open() {
        let client = TextSynthClient::new(AiProvider::OpenAi, "", None).unwrap();
        let parsed = ParsedFilename::default();
        let clarity = client
            .classify_clarity("setup.exe", "SomeFolder", &parsed)
            .await
            .unwrap();
        assert_eq!(clarity, Clarity::Clear);
    }

    #[test]
    fn extract_json_strips_fences() {
        assert_eq!(extract_json("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn adapter_maps_provider_fields_onto_catalog_fields() {
        let provider = ProviderMetadata {
            title: "\"VMware Workstation Pro\"".to_string(),
            developer: "VMware, Inc.".to_string(),
            description_short: "Professional desktop virtualization.".to_string(),
            description_detailed: "Run multiple operating systems on one PC.".to_string(),
            category: "Utility".to_string(),
            official_website: "https://www.vmware.com".to_string(),
            features: vec!["Snapshots".to_string()],
            ..Default::default()
        };

        let meta = provider.into_catalog();
        assert_eq!(meta.title, "VMware Workstation Pro");
        assert_eq!(meta.vendor, "VMware, Inc.");
        assert_eq!(meta.description, "Professional desktop virtualization.");
        assert_eq!(
            meta.detailed_description.as_deref(),
            Some("Run multiple operating systems on one PC.")
        );
        assert_eq!(meta.features.as_deref(), Some(&["Snapshots".to_string()][..]));
        assert!(meta.release_notes.is_none());
    }

    #[test]
    fn fallback_metadata_uses_parsed_identity() {
        let parsed = ParsedFilename {
            software_name: "Total Commander".to_string(),
            vendor: Some("Ghisler".to_string()),
            version: Some("10.51".to_string()),
            ..Default::default()
        };
        let meta = fallback_metadata(&parsed);
        assert_eq!(meta.title, "Total Commander");
        assert_eq!(meta.vendor, "Ghisler");
        assert_eq!(meta.category, "Utility");
        assert_eq!(meta.version.as_deref(), Some("10.51"));
        assert!(meta.official_website.is_empty());
    }
}
