//! Optical text recognition for scanned PDFs.
//!
//! Shells out to `pdftoppm` (poppler) to rasterize pages and to the
//! `tesseract` CLI to recognize them. Both tools are probed at startup;
//! the service runs fine without them — the orchestrator's default scanned
//! routing goes straight to direct-document model analysis, and OCR is only
//! used when explicitly selected as the scanned-PDF strategy.

use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info, warn};

/// Rasterization resolution. Moderate on purpose: favors speed over maximum
/// recognition accuracy.
const RASTER_DPI: u32 = 150;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("PDF rasterization failed: {0}")]
    Rasterization(String),

    #[error("OCR recognized no text on any page")]
    NoTextRecognized,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract language pack spec, e.g. "fra+eng".
    pub languages: String,
    pub tesseract_path: String,
    pub pdftoppm_path: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "fra+eng".to_string(),
            tesseract_path: "tesseract".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
        }
    }
}

/// A probed, ready-to-use OCR capability.
#[derive(Debug, Clone)]
pub struct OcrEngine {
    config: OcrConfig,
}

impl OcrEngine {
    /// Probes both external tools. Returns `None` (with a log line) when the
    /// capability is absent — never an error, since OCR is optional.
    pub fn detect(config: OcrConfig) -> Option<Self> {
        let tesseract_ok = probe(&config.tesseract_path, "--version");
        let pdftoppm_ok = probe(&config.pdftoppm_path, "-v");
        if tesseract_ok && pdftoppm_ok {
            info!(languages = %config.languages, "OCR capability detected");
            Some(Self { config })
        } else {
            info!(
                tesseract = tesseract_ok,
                pdftoppm = pdftoppm_ok,
                "OCR capability absent, scanned PDFs will use direct model analysis"
            );
            None
        }
    }

    /// Rasterizes every page of the PDF and recognizes each one. Page-level
    /// recognition failures are logged and skipped; the document fails only
    /// when no page yields any text.
    pub fn extract(&self, bytes: &[u8]) -> Result<String, OcrError> {
        let workdir = tempfile::tempdir()
            .map_err(|e| OcrError::Rasterization(format!("temp dir creation failed: {e}")))?;

        let pdf_path = workdir.path().join("input.pdf");
        std::fs::write(&pdf_path, bytes)
            .map_err(|e| OcrError::Rasterization(format!("staging PDF failed: {e}")))?;

        let page_images = self.rasterize(&pdf_path, workdir.path())?;
        debug!(pages = page_images.len(), "rasterized PDF for OCR");

        let mut page_texts = Vec::new();
        for (index, image) in page_images.iter().enumerate() {
            match self.recognize_page(image) {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(page = index + 1, chars = text.len(), "OCR page complete");
                    page_texts.push(text.trim().to_string());
                }
                Ok(_) => debug!(page = index + 1, "OCR page yielded no text"),
                Err(err) => {
                    warn!(page = index + 1, "OCR page failed, skipping: {err}");
                }
            }
        }

        if page_texts.is_empty() {
            return Err(OcrError::NoTextRecognized);
        }

        Ok(page_texts.join("\n\n"))
    }

    fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<std::path::PathBuf>, OcrError> {
        let prefix = out_dir.join("page");
        let output = Command::new(&self.config.pdftoppm_path)
            .arg("-png")
            .arg("-r")
            .arg(RASTER_DPI.to_string())
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|e| {
                OcrError::EngineUnavailable(format!(
                    "failed to run {}: {e}",
                    self.config.pdftoppm_path
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Rasterization(stderr.trim().to_string()));
        }

        let mut images: Vec<_> = std::fs::read_dir(out_dir)
            .map_err(|e| OcrError::Rasterization(format!("reading raster output failed: {e}")))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        images.sort();
        Ok(images)
    }

    fn recognize_page(&self, image: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.config.tesseract_path)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.languages)
            .arg("--psm")
            .arg("6")
            .output()
            .map_err(|e| {
                OcrError::EngineUnavailable(format!(
                    "failed to run {}: {e}",
                    self.config.tesseract_path
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Rasterization(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn probe(binary: &str, version_flag: &str) -> bool {
    Command::new(binary)
        .arg(version_flag)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
