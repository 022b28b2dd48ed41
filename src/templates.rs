//! Canned report fragments used by the template text source.
//!
//! Every piece of wording the template source can emit lives here, so the
//! selector in [`crate::pipeline::select`] is pure lookup and concatenation.
//!
//! Fragments may contain these placeholders, filled by [`render`]:
//!
//! | Placeholder | Value |
//! |-------------|-------|
//! | `{query}` | caller query, verbatim |
//! | `{timestamp}` | generation time, `%Y-%m-%d %H:%M:%S` UTC |
//! | `{file_size}` | upload size in bytes |
//! | `{pages}` | pages reported by the parser |
//! | `{extraction}` | `Successful` or `Fallback text used` |
//! | `{processing_id}` | 8-char uppercase request id |

use crate::config::AnalysisMode;
use crate::pipeline::classify::MarkerCategory;
use chrono::{DateTime, Utc};

/// Runtime values substituted into fragments.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub query: String,
    pub generated_at: DateTime<Utc>,
    pub file_size: usize,
    pub page_count: usize,
    pub extraction_succeeded: bool,
    pub processing_id: String,
}

/// Fill every placeholder in `template` from `ctx`.
///
/// `{query}` is substituted last so a query that itself contains a
/// placeholder name is echoed literally.
pub fn render(template: &str, ctx: &RenderContext) -> String {
    let extraction = if ctx.extraction_succeeded {
        "Successful"
    } else {
        "Fallback text used"
    };
    template
        .replace("{timestamp}", &ctx.generated_at.format("%Y-%m-%d %H:%M:%S").to_string())
        .replace("{file_size}", &ctx.file_size.to_string())
        .replace("{pages}", &ctx.page_count.to_string())
        .replace("{extraction}", extraction)
        .replace("{processing_id}", &ctx.processing_id)
        .replace("{query}", &ctx.query)
}

/// Opening fragment for a mode.
pub fn header(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Comprehensive => COMPREHENSIVE_HEADER,
        AnalysisMode::Nutrition => NUTRITION_HEADER,
        AnalysisMode::Exercise => EXERCISE_HEADER,
        AnalysisMode::Verification => VERIFICATION_APPROVED,
    }
}

/// Closing fragment for a mode (empty for verification, whose template is complete).
pub fn footer(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Comprehensive => COMPREHENSIVE_FOOTER,
        AnalysisMode::Nutrition => NUTRITION_FOOTER,
        AnalysisMode::Exercise => EXERCISE_FOOTER,
        AnalysisMode::Verification => "",
    }
}

/// Fragment used when no matched category contributes anything.
pub fn default_fragment(mode: AnalysisMode) -> Option<&'static str> {
    match mode {
        AnalysisMode::Comprehensive => Some(COMPREHENSIVE_GENERAL),
        AnalysisMode::Nutrition => Some(NUTRITION_GENERAL),
        AnalysisMode::Exercise => Some(EXERCISE_GENERAL),
        AnalysisMode::Verification => None,
    }
}

/// Marker-specific fragment, if the mode has one for `category`.
pub fn category_fragment(mode: AnalysisMode, category: MarkerCategory) -> Option<&'static str> {
    use MarkerCategory::*;
    match (mode, category) {
        (AnalysisMode::Comprehensive, GlucoseRelated) => Some(
            "GLUCOSE METABOLISM:\n\
             • Glucose-related markers were found in your report\n\
             • Fasting glucose is normally 70-100 mg/dL; HbA1c below 5.7%\n\
             • Discuss any out-of-range value with your physician",
        ),
        (AnalysisMode::Comprehensive, LipidRelated) => Some(
            "LIPID PROFILE:\n\
             • Cholesterol or lipid markers were found in your report\n\
             • Desirable total cholesterol is below 200 mg/dL, LDL below 130 mg/dL\n\
             • HDL above 40 mg/dL helps protect the heart",
        ),
        (AnalysisMode::Comprehensive, IronRelated) => Some(
            "IRON & HEMOGLOBIN:\n\
             • Iron or hemoglobin markers were found in your report\n\
             • Low values can indicate anemia and fatigue\n\
             • Ferritin and transferrin help tell storage from intake problems",
        ),
        (AnalysisMode::Comprehensive, VitaminRelated) => Some(
            "VITAMIN STATUS:\n\
             • Vitamin markers were found in your report\n\
             • Vitamin D and B12 deficiencies are common and easy to correct\n\
             • Retest after 8-12 weeks of any supplementation",
        ),
        (AnalysisMode::Comprehensive, BloodPressureRelated) => Some(
            "BLOOD PRESSURE:\n\
             • Blood pressure readings were found in your report\n\
             • Normal is below 120/80 mmHg\n\
             • Home monitoring gives a clearer picture than a single reading",
        ),
        (AnalysisMode::Comprehensive, BoneRelated) => Some(
            "BONE & CALCIUM:\n\
             • Calcium or bone markers were found in your report\n\
             • Normal serum calcium is roughly 8.5-10.5 mg/dL\n\
             • Vitamin D status strongly affects calcium absorption",
        ),

        (AnalysisMode::Nutrition, GlucoseRelated) => Some(
            "• Focus on complex carbohydrates and limit simple sugars\n\
             • Include fiber-rich foods like oats, beans, and vegetables",
        ),
        (AnalysisMode::Nutrition, LipidRelated) => Some(
            "• Include omega-3 rich foods like salmon, walnuts, and flaxseeds\n\
             • Choose lean proteins and limit saturated fats",
        ),
        (AnalysisMode::Nutrition, IronRelated) => Some(
            "• Include iron-rich foods like lean red meat, spinach, and lentils\n\
             • Combine iron-rich foods with vitamin C sources for better absorption",
        ),
        (AnalysisMode::Nutrition, VitaminRelated) => Some(
            "• Ensure adequate intake of fruits and vegetables for essential vitamins\n\
             • Consider a balanced multivitamin if deficiencies are present",
        ),
        (AnalysisMode::Nutrition, BoneRelated) => Some(
            "• Include calcium-rich foods like dairy, leafy greens, and fortified foods",
        ),

        (AnalysisMode::Exercise, GlucoseRelated) => Some(
            "• Moderate cardio exercises like brisk walking (30-45 min, 5x/week)\n\
             • Resistance training with light weights (2-3x per week)\n\
             • Post-meal walks to help with glucose control",
        ),
        (AnalysisMode::Exercise, LipidRelated) => Some(
            "• Aerobic exercises like swimming, cycling, or dancing\n\
             • Aim for 150 minutes of moderate-intensity exercise per week\n\
             • Include activities that elevate heart rate consistently",
        ),
        (AnalysisMode::Exercise, BloodPressureRelated) => Some(
            "• Low-impact exercises like yoga, tai chi, or gentle swimming\n\
             • Avoid high-intensity exercises initially\n\
             • Focus on stress-reducing activities",
        ),
        (AnalysisMode::Exercise, BoneRelated) => Some(
            "• Weight-bearing exercises like walking, hiking, or light jogging\n\
             • Resistance training to strengthen bones and muscles",
        ),

        _ => None,
    }
}

// ── Comprehensive ────────────────────────────────────────────────────────

const COMPREHENSIVE_HEADER: &str = "COMPREHENSIVE BLOOD TEST ANALYSIS REPORT

DOCUMENT PROCESSING:
• File Size: {file_size} bytes
• Pages Processed: {pages}
• Content Extraction: {extraction}

MARKER FINDINGS:";

const COMPREHENSIVE_GENERAL: &str = "GENERAL HEALTH OVERVIEW:
• No specific marker keywords were recognised in this report
• Metabolic, lipid, and blood count panels are best reviewed together with your physician
• Keep copies of past reports so trends can be compared";

const COMPREHENSIVE_FOOTER: &str = "RECOMMENDATIONS:
1. Balanced nutrition emphasising whole, unprocessed foods
2. Regular physical activity appropriate for your fitness level
3. 7-9 hours of sleep and 8-10 glasses of water daily
4. Routine blood work again in 6-12 months

IMPORTANT: This analysis is generated automatically for informational purposes only.

Query Addressed: {query}
Analysis Date: {timestamp}";

// ── Nutrition ────────────────────────────────────────────────────────────

const NUTRITION_HEADER: &str = "NUTRITION RECOMMENDATIONS

Based on the markers in your blood test report:";

const NUTRITION_GENERAL: &str = "• Maintain a balanced diet with variety of nutrients
• Include 5-9 servings of fruits and vegetables daily
• Choose whole grains over refined carbohydrates
• Stay adequately hydrated with 8-10 glasses of water daily";

const NUTRITION_FOOTER: &str = "Always consult a registered dietitian for personalised nutrition planning.

Query: {query}
Report Date: {timestamp}";

// ── Exercise ─────────────────────────────────────────────────────────────

const EXERCISE_HEADER: &str = "EXERCISE PLAN RECOMMENDATIONS

Based on the markers in your blood test report:";

const EXERCISE_GENERAL: &str = "• General fitness routine with mix of cardio and strength training
• Start with 20-30 minutes of exercise 3-4 times per week
• Gradually increase intensity and duration as fitness improves";

const EXERCISE_FOOTER: &str = "• Always consult with healthcare provider before starting new exercise routine

Query: {query}
Report Date: {timestamp}";

// ── Verification ─────────────────────────────────────────────────────────

// Acceptance-only: there is no rejecting counterpart to this template.
const VERIFICATION_APPROVED: &str = "DOCUMENT VERIFICATION REPORT

VERIFICATION STATUS: APPROVED

TECHNICAL ANALYSIS:
• File Size: {file_size} bytes
• Document Pages: {pages}
• Content Extraction: {extraction}

VERIFICATION CHECKLIST:
• Document Format: PDF format confirmed
• Processing Ready: Suitable for analysis

FINAL STATUS: APPROVED FOR COMPREHENSIVE ANALYSIS

Verification Date: {timestamp}
Processing ID: {processing_id}";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx(query: &str) -> RenderContext {
        RenderContext {
            query: query.to_string(),
            generated_at: Utc.with_ymd_and_hms(2024, 12, 15, 9, 30, 0).unwrap(),
            file_size: 2048,
            page_count: 2,
            extraction_succeeded: true,
            processing_id: "AB12CD34".into(),
        }
    }

    #[test]
    fn render_fills_all_placeholders() {
        let out = render(VERIFICATION_APPROVED, &ctx("q"));
        assert!(out.contains("File Size: 2048 bytes"));
        assert!(out.contains("Document Pages: 2"));
        assert!(out.contains("Content Extraction: Successful"));
        assert!(out.contains("Verification Date: 2024-12-15 09:30:00"));
        assert!(out.contains("Processing ID: AB12CD34"));
        assert!(!out.contains('{'), "unfilled placeholder in: {out}");
    }

    #[test]
    fn query_is_echoed_literally() {
        let out = render(NUTRITION_FOOTER, &ctx("what is {timestamp}?"));
        assert!(out.contains("Query: what is {timestamp}?"));
    }

    #[test]
    fn degraded_extraction_is_labelled() {
        let mut c = ctx("q");
        c.extraction_succeeded = false;
        assert!(render(COMPREHENSIVE_HEADER, &c).contains("Fallback text used"));
    }

    #[test]
    fn every_non_verification_mode_has_a_default() {
        for mode in [AnalysisMode::Comprehensive, AnalysisMode::Nutrition, AnalysisMode::Exercise] {
            assert!(default_fragment(mode).is_some(), "{mode}");
        }
        assert!(default_fragment(AnalysisMode::Verification).is_none());
    }

    #[test]
    fn verification_has_no_category_fragments() {
        for c in MarkerCategory::ALL {
            assert!(category_fragment(AnalysisMode::Verification, c).is_none());
        }
    }

    #[test]
    fn comprehensive_covers_every_category() {
        for c in MarkerCategory::ALL {
            assert!(category_fragment(AnalysisMode::Comprehensive, c).is_some(), "{c}");
        }
    }
}
