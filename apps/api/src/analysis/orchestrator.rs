//! Analysis pipeline orchestration.
//!
//! Routes a document through structural text extraction, then the injected
//! model extractor, and finally the heuristic synthesizer. Model failures of
//! any kind degrade to the heuristic path; the only errors that escape are
//! unreadable input bytes and missing files.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::heuristic::heuristic_profile;
use crate::extraction::ocr::OcrEngine;
use crate::extraction::{extract_pdf_text, DocumentText, ExtractionError};
use crate::llm_client::{LlmError, ProfileExtractor};
use crate::models::profile::CandidateProfile;

/// Stand-in text fed to the heuristic when a document yields no text at all.
const UNPARSEABLE_MARKER: &str = "unparseable PDF document";

/// Which stage actually produced the profile. Persisted alongside
/// `model_version` so downstream consumers can filter or re-queue
/// heuristic-quality records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    ModelDerived,
    HeuristicFallback,
}

/// Final pipeline product: a validated profile plus attribution.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub profile: CandidateProfile,
    pub model_version: String,
    pub provenance: Provenance,
}

/// How to handle documents with no extractable text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScannedPdfStrategy {
    /// Send the raw PDF bytes to the model as a base64 document.
    #[default]
    DirectModel,
    /// Rasterize and OCR locally, then run the text path on the output.
    Ocr,
}

/// Orchestrates the extraction pipeline. Construction is explicit: a `None`
/// extractor means heuristic-only operation, chosen by the caller rather
/// than discovered through a global flag.
pub struct CvAnalyzer {
    extractor: Option<Arc<dyn ProfileExtractor>>,
    scanned_strategy: ScannedPdfStrategy,
    ocr: Option<OcrEngine>,
}

impl CvAnalyzer {
    pub fn new(
        extractor: Option<Arc<dyn ProfileExtractor>>,
        scanned_strategy: ScannedPdfStrategy,
        ocr: Option<OcrEngine>,
    ) -> Self {
        Self {
            extractor,
            scanned_strategy,
            ocr,
        }
    }

    /// Analyzes already-extracted text. Infallible: any model-side failure
    /// degrades to the heuristic synthesizer.
    pub async fn analyze_text(&self, cv_text: &str, filename: Option<&str>) -> AnalysisOutcome {
        if let Some(extractor) = &self.extractor {
            match extractor.extract_from_text(cv_text).await {
                Ok(profile) => {
                    return AnalysisOutcome {
                        profile,
                        model_version: extractor.model_version(),
                        provenance: Provenance::ModelDerived,
                    };
                }
                Err(err) => log_model_failure("text", &err),
            }
        }
        self.heuristic_outcome(cv_text, filename)
    }

    /// Analyzes raw document bytes. Only `ExtractionError::Unreadable`
    /// escapes; structural failures and missing text layers are treated as
    /// scanned-document signals and routed per the configured strategy.
    pub async fn analyze_bytes(
        &self,
        bytes: &[u8],
        filename: Option<&str>,
    ) -> Result<AnalysisOutcome, ExtractionError> {
        match extract_pdf_text(bytes) {
            Ok(DocumentText::Extracted(text)) => Ok(self.analyze_text(&text, filename).await),
            Ok(DocumentText::NoTextLayer) => {
                info!(?filename, "document has no text layer, treating as scanned");
                Ok(self.analyze_scanned(bytes, filename).await)
            }
            Err(ExtractionError::MalformedStructure(reason)) => {
                info!(?filename, %reason, "malformed document structure, treating as scanned");
                Ok(self.analyze_scanned(bytes, filename).await)
            }
            Err(err @ ExtractionError::Unreadable(_)) => Err(err),
        }
    }

    /// Reads a file from disk and analyzes it. I/O errors propagate. Not
    /// reachable from the HTTP surface; kept as a programmatic entry point.
    #[allow(dead_code)]
    pub async fn analyze_file(&self, path: &Path) -> Result<AnalysisOutcome, ExtractionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ExtractionError::Unreadable(format!("{}: {e}", path.display())))?;
        let filename = path.file_name().and_then(|n| n.to_str());
        self.analyze_bytes(&bytes, filename).await
    }

    async fn analyze_scanned(&self, bytes: &[u8], filename: Option<&str>) -> AnalysisOutcome {
        if self.scanned_strategy == ScannedPdfStrategy::Ocr {
            if let Some(ocr) = &self.ocr {
                match ocr.extract(bytes) {
                    Ok(text) => return self.analyze_text(&text, filename).await,
                    Err(err) => {
                        warn!(error = %err, "OCR failed, falling back to direct document mode")
                    }
                }
            } else {
                warn!("OCR strategy selected but no engine available, using direct document mode");
            }
        }

        if let Some(extractor) = &self.extractor {
            match extractor.extract_from_pdf(bytes).await {
                Ok(profile) => {
                    return AnalysisOutcome {
                        profile,
                        model_version: extractor.model_version(),
                        provenance: Provenance::ModelDerived,
                    };
                }
                Err(err) => log_model_failure("document", &err),
            }
        }

        // Nothing left that can read the bytes; synthesize from the marker
        // so the filename still drives name extraction.
        self.heuristic_outcome(UNPARSEABLE_MARKER, filename)
    }

    /// The version string stays the configured model identifier even for
    /// fallback output; `provenance` is the field that distinguishes paths.
    fn heuristic_outcome(&self, cv_text: &str, filename: Option<&str>) -> AnalysisOutcome {
        let model_version = match &self.extractor {
            Some(extractor) => extractor.model_version(),
            None => crate::llm_client::default_model_version(),
        };
        AnalysisOutcome {
            profile: heuristic_profile(cv_text, filename),
            model_version,
            provenance: Provenance::HeuristicFallback,
        }
    }
}

#[cfg(test)]
impl CvAnalyzer {
    /// Analyzer with no extractor wired, the shape heuristic-only
    /// deployments get from `main`.
    fn heuristic_only() -> Self {
        Self::new(None, ScannedPdfStrategy::default(), None)
    }
}

fn log_model_failure(mode: &str, err: &LlmError) {
    match err {
        LlmError::Provider { kind, message } => {
            warn!(mode, ?kind, %message, "provider rejected extraction, using heuristic")
        }
        LlmError::Http(e) => warn!(mode, error = %e, "model request failed, using heuristic"),
        LlmError::InvalidResponseFormat(reason) => {
            warn!(mode, %reason, "model returned non-JSON output, using heuristic")
        }
        LlmError::SchemaValidation(reason) => {
            warn!(mode, %reason, "model output failed schema validation, using heuristic")
        }
        LlmError::EmptyContent => warn!(mode, "model returned no content, using heuristic"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ProviderErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test double that records which extraction mode was used and replies
    /// from a script.
    struct ScriptedExtractor {
        text_calls: AtomicUsize,
        pdf_calls: AtomicUsize,
        reply: Result<CandidateProfile, LlmError>,
    }

    impl ScriptedExtractor {
        fn succeeding() -> Self {
            Self {
                text_calls: AtomicUsize::new(0),
                pdf_calls: AtomicUsize::new(0),
                reply: Ok(CandidateProfile::sample()),
            }
        }

        fn failing(err: LlmError) -> Self {
            Self {
                text_calls: AtomicUsize::new(0),
                pdf_calls: AtomicUsize::new(0),
                reply: Err(err),
            }
        }

        fn clone_reply(&self) -> Result<CandidateProfile, LlmError> {
            match &self.reply {
                Ok(profile) => Ok(profile.clone()),
                Err(LlmError::EmptyContent) => Err(LlmError::EmptyContent),
                Err(LlmError::InvalidResponseFormat(r)) => {
                    Err(LlmError::InvalidResponseFormat(r.clone()))
                }
                Err(LlmError::SchemaValidation(r)) => Err(LlmError::SchemaValidation(r.clone())),
                Err(LlmError::Provider { kind, message }) => Err(LlmError::Provider {
                    kind: *kind,
                    message: message.clone(),
                }),
                Err(LlmError::Http(_)) => Err(LlmError::EmptyContent),
            }
        }
    }

    #[async_trait]
    impl ProfileExtractor for ScriptedExtractor {
        async fn extract_from_text(&self, _cv_text: &str) -> Result<CandidateProfile, LlmError> {
            self.text_calls.fetch_add(1, Ordering::SeqCst);
            self.clone_reply()
        }

        async fn extract_from_pdf(&self, _bytes: &[u8]) -> Result<CandidateProfile, LlmError> {
            self.pdf_calls.fetch_add(1, Ordering::SeqCst);
            self.clone_reply()
        }

        fn model_version(&self) -> String {
            "scripted-v1".to_string()
        }
    }

    fn analyzer_with(extractor: Arc<ScriptedExtractor>) -> CvAnalyzer {
        CvAnalyzer::new(Some(extractor), ScannedPdfStrategy::DirectModel, None)
    }

    #[tokio::test]
    async fn test_text_path_uses_model_and_tags_provenance() {
        let extractor = Arc::new(ScriptedExtractor::succeeding());
        let analyzer = analyzer_with(extractor.clone());

        let outcome = analyzer.analyze_text("some cv text", None).await;

        assert_eq!(outcome.provenance, Provenance::ModelDerived);
        assert_eq!(outcome.model_version, "scripted-v1");
        assert_eq!(extractor.text_calls.load(Ordering::SeqCst), 1);
        assert_eq!(extractor.pdf_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model_failure_degrades_to_heuristic() {
        let extractor = Arc::new(ScriptedExtractor::failing(LlmError::Provider {
            kind: ProviderErrorKind::QuotaExhausted,
            message: "credit balance is too low".to_string(),
        }));
        let analyzer = analyzer_with(extractor);

        let outcome = analyzer
            .analyze_text("Jean Martin\nDéveloppeur Python", None)
            .await;

        assert_eq!(outcome.provenance, Provenance::HeuristicFallback);
        // Version still names the configured model; provenance tells the paths apart.
        assert_eq!(outcome.model_version, "scripted-v1");
        assert!(outcome.profile.validate().is_ok());
    }

    #[tokio::test]
    async fn test_malformed_json_reply_degrades_to_heuristic() {
        let extractor = Arc::new(ScriptedExtractor::failing(
            LlmError::InvalidResponseFormat("expected value at line 1".to_string()),
        ));
        let analyzer = analyzer_with(extractor);

        let outcome = analyzer.analyze_text("cv text", Some("marie_dupont_cv.pdf")).await;

        assert_eq!(outcome.provenance, Provenance::HeuristicFallback);
        assert_eq!(outcome.profile.first_name, "Marie");
    }

    #[tokio::test]
    async fn test_heuristic_only_analyzer_never_calls_out() {
        let analyzer = CvAnalyzer::heuristic_only();

        let outcome = analyzer.analyze_text("5 years of experience in Python", None).await;

        assert_eq!(outcome.provenance, Provenance::HeuristicFallback);
        assert_eq!(outcome.model_version, crate::llm_client::default_model_version());
        assert_eq!(outcome.profile.years_experience, 5.0);
        assert!(outcome.profile.fit_score_overall <= 95.0);
    }

    const TEXT_LAYER_PDF: &[u8] = include_bytes!("../../tests/fixtures/text_layer.pdf");
    const IMAGE_ONLY_PDF: &[u8] = include_bytes!("../../tests/fixtures/image_only.pdf");

    #[tokio::test]
    async fn test_text_layer_pdf_stays_in_text_mode() {
        let extractor = Arc::new(ScriptedExtractor::succeeding());
        let analyzer = analyzer_with(extractor.clone());

        let outcome = analyzer
            .analyze_bytes(TEXT_LAYER_PDF, Some("cv.pdf"))
            .await
            .unwrap();

        assert_eq!(outcome.provenance, Provenance::ModelDerived);
        assert_eq!(extractor.text_calls.load(Ordering::SeqCst), 1);
        assert_eq!(extractor.pdf_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_textless_pdf_routes_to_direct_document_mode() {
        let extractor = Arc::new(ScriptedExtractor::succeeding());
        let analyzer = analyzer_with(extractor.clone());

        // Parses fine but has an empty content stream: the no-text-layer
        // signal, not an error.
        let outcome = analyzer
            .analyze_bytes(IMAGE_ONLY_PDF, Some("scan.pdf"))
            .await
            .unwrap();

        assert_eq!(outcome.provenance, Provenance::ModelDerived);
        assert_eq!(extractor.pdf_calls.load(Ordering::SeqCst), 1);
        assert_eq!(extractor.text_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_text_layer_pdf_content_reaches_heuristic() {
        let analyzer = CvAnalyzer::heuristic_only();

        let outcome = analyzer.analyze_bytes(TEXT_LAYER_PDF, None).await.unwrap();

        assert_eq!(outcome.provenance, Provenance::HeuristicFallback);
        assert!(outcome.profile.skills_primary.iter().any(|s| s == "Python"));
    }

    #[tokio::test]
    async fn test_junk_bytes_route_to_direct_document_mode() {
        let extractor = Arc::new(ScriptedExtractor::succeeding());
        let analyzer = analyzer_with(extractor.clone());

        // Not a PDF at all: structural failure, handled as a scanned doc.
        let outcome = analyzer
            .analyze_bytes(b"definitely not a pdf", Some("scan.pdf"))
            .await
            .unwrap();

        assert_eq!(outcome.provenance, Provenance::ModelDerived);
        assert_eq!(extractor.pdf_calls.load(Ordering::SeqCst), 1);
        assert_eq!(extractor.text_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_junk_bytes_without_model_yield_heuristic_from_filename() {
        let analyzer = CvAnalyzer::heuristic_only();

        let outcome = analyzer
            .analyze_bytes(b"\x00\x01\x02", Some("Marie-Dupont-CV.pdf"))
            .await
            .unwrap();

        assert_eq!(outcome.provenance, Provenance::HeuristicFallback);
        assert_eq!(outcome.profile.first_name, "Marie");
        assert_eq!(outcome.profile.last_name, "Dupont");
        assert!(outcome.profile.validate().is_ok());
    }

    #[tokio::test]
    async fn test_direct_mode_failure_still_yields_profile() {
        let extractor = Arc::new(ScriptedExtractor::failing(LlmError::Provider {
            kind: ProviderErrorKind::InvalidDocument,
            message: "could not process document".to_string(),
        }));
        let analyzer = analyzer_with(extractor);

        let outcome = analyzer
            .analyze_bytes(b"garbage", Some("jean_martin_cv.pdf"))
            .await
            .unwrap();

        assert_eq!(outcome.provenance, Provenance::HeuristicFallback);
        assert_eq!(outcome.profile.first_name, "Jean");
    }

    #[tokio::test]
    async fn test_ocr_strategy_without_engine_falls_back_to_direct_mode() {
        let extractor = Arc::new(ScriptedExtractor::succeeding());
        let analyzer = CvAnalyzer::new(
            Some(extractor.clone()),
            ScannedPdfStrategy::Ocr,
            None,
        );

        let outcome = analyzer
            .analyze_bytes(b"not a pdf", Some("scan.pdf"))
            .await
            .unwrap();

        assert_eq!(outcome.provenance, Provenance::ModelDerived);
        assert_eq!(extractor.pdf_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_file_propagates_error() {
        let analyzer = CvAnalyzer::heuristic_only();
        let result = analyzer
            .analyze_file(Path::new("/nonexistent/path/cv.pdf"))
            .await;
        assert!(matches!(result, Err(ExtractionError::Unreadable(_))));
    }

    #[test]
    fn test_provenance_serialization() {
        assert_eq!(
            serde_json::to_string(&Provenance::ModelDerived).unwrap(),
            "\"ModelDerived\""
        );
        assert_eq!(
            serde_json::to_string(&Provenance::HeuristicFallback).unwrap(),
            "\"HeuristicFallback\""
        );
    }
}
