use anyhow::{bail, Context, Result};

use crate::analysis::orchestrator::ScannedPdfStrategy;
use crate::extraction::ocr::OcrConfig;
use crate::llm_client::DEFAULT_MODEL;

/// Application configuration loaded from environment variables.
///
/// The Anthropic key is deliberately optional: when absent the service runs
/// in heuristic-only mode, selected here at the composition root rather
/// than probed anywhere deeper in the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub scanned_pdf_strategy: ScannedPdfStrategy,
    pub ocr: OcrConfig,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let anthropic_api_key =
            std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.trim().is_empty());

        let scanned_pdf_strategy =
            match std::env::var("SCANNED_PDF_STRATEGY").as_deref().unwrap_or("direct") {
                "direct" => ScannedPdfStrategy::DirectModel,
                "ocr" => ScannedPdfStrategy::Ocr,
                other => bail!("SCANNED_PDF_STRATEGY must be 'direct' or 'ocr', got '{other}'"),
            };

        let ocr = OcrConfig {
            languages: env_or("OCR_LANGUAGES", "fra+eng"),
            tesseract_path: env_or("TESSERACT_PATH", "tesseract"),
            pdftoppm_path: env_or("PDFTOPPM_PATH", "pdftoppm"),
        };

        Ok(Config {
            anthropic_api_key,
            anthropic_model: env_or("ANTHROPIC_MODEL", DEFAULT_MODEL),
            scanned_pdf_strategy,
            ocr,
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
