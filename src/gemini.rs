//! PDF to question-file extraction through the Google Generative AI API.

use base64::Engine;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::{MkquizError, Result};
use crate::questions::{self, Question};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MODEL: &str = "gemini-2.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fence pattern is valid")
});

const EXTRACTION_PROMPT: &str = r#"You are an expert at extracting quiz questions from documents.

Analyze the provided document and extract ALL quiz questions you find. For each question:

1. Extract the question text exactly as it appears
2. Extract all answer options
3. Identify the correct answer
4. Convert mathematical formulas or symbols to KaTeX (LaTeX syntax), e.g. \frac{a}{b}, x^{10}, x_{1}, \alpha, \sqrt{x}, \sum_{i=1}^{n}, \int_{a}^{b}

Return ONLY a valid JSON array in this exact format:
[
  {
    "id": 1,
    "question": "What does HTML stand for?",
    "options": {
      "a": "Hyper Text Markup Language",
      "b": "Home Tool Markup Language",
      "c": "Hyperlinks and Text Markup Language"
    },
    "answer": "a"
  },
  {
    "id": 2,
    "question": "What is the derivative of $x^2$?",
    "options": {
      "a": "$2x$",
      "b": "$x$",
      "c": "$x^2$"
    },
    "answer": "a"
  }
]

Rules:
- Use sequential IDs starting from 1
- Option keys must be lowercase letters (a, b, c, d, ...)
- The "answer" field must match one of the option keys
- Wrap math in $ for inline math or $$ for display math
- Return ONLY the JSON array, no additional text or explanation
- If no questions are found, return an empty array []"#;

// Response shapes, only the parts we read.

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Client for the `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MkquizError::validation("Gemini API key is required", "geminiApiKey"));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MkquizError::Extraction(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, MODEL)
    }

    /// Sends the PDF inline with the extraction prompt and validates the
    /// questions in the reply.
    pub async fn extract_questions(&self, pdf: &[u8]) -> Result<Vec<Question>> {
        tracing::info!(bytes = pdf.len(), model = MODEL, "extracting questions from PDF");
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": EXTRACTION_PROMPT },
                    {
                        "inline_data": {
                            "mime_type": "application/pdf",
                            "data": base64::engine::general_purpose::STANDARD.encode(pdf),
                        }
                    }
                ]
            }]
        });

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| MkquizError::Extraction(format!("request to Gemini API failed: {}", e)))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| MkquizError::Extraction(format!("failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            tracing::error!(%status, "Gemini API returned an error");
            return Err(MkquizError::Extraction(format!(
                "Gemini API returned {}: {}",
                status, message
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&raw)
            .map_err(|e| MkquizError::Extraction(format!("unexpected Gemini response: {}", e)))?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        tracing::debug!(preview = %text.chars().take(200).collect::<String>(), "received Gemini response");

        let questions = parse_questions_response(&text)?;
        tracing::info!(count = questions.len(), "extracted questions from PDF");
        Ok(questions)
    }
}

/// Pulls the JSON array out of a model reply and validates it. A fenced
/// block wins; otherwise the span from the first `[` to the last `]` is used.
pub fn parse_questions_response(text: &str) -> Result<Vec<Question>> {
    let mut body = text.trim();
    if let Some(inner) = FENCED_BLOCK.captures(body).and_then(|c| c.get(1)) {
        body = inner.as_str();
    }
    if let (Some(start), Some(end)) = (body.find('['), body.rfind(']')) {
        if start < end {
            body = &body[start..=end];
        }
    }

    let value: Value = serde_json::from_str(body).map_err(|e| {
        MkquizError::Extraction(format!("Failed to parse questions from response: {}", e))
    })?;
    if !value.is_array() {
        return Err(MkquizError::Extraction(
            "Failed to parse questions from response: Response is not an array".into(),
        ));
    }
    questions::validate(&value).map_err(|e| {
        MkquizError::Extraction(format!("Failed to parse questions from response: {}", e))
    })
}

// ---- Tests ----
