//! Response assembly: wrap an [`AnalysisOutput`] into the JSON reply.
//!
//! This stage cannot fail. Anything that goes wrong upstream has already
//! been turned into an `Err` before an output exists to assemble.

use crate::config::AnalysisMode;
use crate::output::{AnalysisOutput, AnalysisResponse, ProcessingInfo};

/// Build the success reply for `output`.
pub fn assemble(output: &AnalysisOutput, disclaimer: &str) -> AnalysisResponse {
    let result = &output.result;
    AnalysisResponse {
        status: "success".to_string(),
        message: success_message(result.mode).to_string(),
        query: result.echoed_query.clone(),
        analysis_type: result.mode,
        analysis: result.body_text.clone(),
        file_processed: output.filename.clone(),
        file_size: format!("{} bytes", output.file_size),
        markers_detected: output.markers.names(),
        processing_info: ProcessingInfo {
            text_source: output.stats.text_source.clone(),
            extraction_succeeded: output.extraction.extraction_succeeded,
            pages: output.extraction.page_count,
            processing_id: output.processing_id.clone(),
        },
        disclaimer: disclaimer.to_string(),
    }
}

fn success_message(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Comprehensive => "Blood test report analyzed successfully",
        AnalysisMode::Nutrition => "Nutrition recommendations generated successfully",
        AnalysisMode::Exercise => "Exercise plan generated successfully",
        AnalysisMode::Verification => "Document verified successfully",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{AnalysisResult, AnalysisStats, ExtractionSummary};
    use crate::pipeline::classify::MarkerCategory;
    use chrono::Utc;

    fn output(mode: AnalysisMode) -> AnalysisOutput {
        AnalysisOutput {
            result: AnalysisResult {
                mode,
                body_text: "BODY".into(),
                generated_at: Utc::now(),
                echoed_query: "Is my iron low?".into(),
            },
            processing_id: "1A2B3C4D".into(),
            filename: "labs.pdf".into(),
            file_size: 4096,
            extraction: ExtractionSummary {
                page_count: 2,
                extraction_succeeded: false,
                text_chars: 35,
            },
            markers: [MarkerCategory::IronRelated, MarkerCategory::GlucoseRelated]
                .into_iter()
                .collect(),
            stats: AnalysisStats {
                text_source: "template".into(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn wraps_output_fields() {
        let r = assemble(&output(AnalysisMode::Nutrition), "Not medical advice.");
        assert_eq!(r.status, "success");
        assert_eq!(r.query, "Is my iron low?");
        assert_eq!(r.analysis_type, AnalysisMode::Nutrition);
        assert_eq!(r.analysis, "BODY");
        assert_eq!(r.file_processed, "labs.pdf");
        assert_eq!(r.file_size, "4096 bytes");
        assert_eq!(r.markers_detected, vec!["glucose_related", "iron_related"]);
        assert!(!r.processing_info.extraction_succeeded);
        assert_eq!(r.processing_info.pages, 2);
        assert_eq!(r.disclaimer, "Not medical advice.");
    }

    #[test]
    fn serialises_mode_in_lowercase() {
        let r = assemble(&output(AnalysisMode::Verification), "d");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["analysis_type"], "verification");
        assert_eq!(json["processing_info"]["text_source"], "template");
        assert_eq!(json["message"], "Document verified successfully");
    }
}
