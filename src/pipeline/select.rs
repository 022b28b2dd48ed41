//! Recommendation selection: `(mode, markers, context) → body text`.
//!
//! For comprehensive, nutrition, and exercise modes the body is
//!
//! ```text
//! header ─▶ one fragment per matched category that has one ─▶ footer
//!              (or the mode's default fragment if none did)
//! ```
//!
//! Verification ignores the markers entirely and always returns the static
//! approval template: this service accepts every document it can stage.

use crate::config::AnalysisMode;
use crate::pipeline::classify::MarkerCategorySet;
use crate::templates::{self, RenderContext};

/// Build the rendered body for `mode`.
pub fn select_body(mode: AnalysisMode, markers: &MarkerCategorySet, ctx: &RenderContext) -> String {
    let fragments = select_fragments(mode, markers);
    let body = fragments.join("\n\n");
    templates::render(&body, ctx)
}

/// The ordered, unrendered fragments for `mode` and `markers`.
pub fn select_fragments(mode: AnalysisMode, markers: &MarkerCategorySet) -> Vec<&'static str> {
    if mode == AnalysisMode::Verification {
        return vec![templates::header(mode)];
    }

    let mut fragments = vec![templates::header(mode)];

    let matched: Vec<&'static str> = markers
        .iter()
        .filter_map(|category| templates::category_fragment(mode, category))
        .collect();

    if matched.is_empty() {
        fragments.extend(templates::default_fragment(mode));
    } else {
        fragments.extend(matched);
    }

    fragments.push(templates::footer(mode));
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::{classify, KeywordTable, MarkerCategory};
    use chrono::Utc;

    fn ctx() -> RenderContext {
        RenderContext {
            query: "How is my heart health?".into(),
            generated_at: Utc::now(),
            file_size: 512,
            page_count: 1,
            extraction_succeeded: true,
            processing_id: "0000ABCD".into(),
        }
    }

    fn set(cats: &[MarkerCategory]) -> MarkerCategorySet {
        cats.iter().copied().collect()
    }

    #[test]
    fn verification_ignores_markers() {
        let empty = select_body(AnalysisMode::Verification, &set(&[]), &ctx());
        let full = select_body(
            AnalysisMode::Verification,
            &MarkerCategory::ALL.into_iter().collect(),
            &ctx(),
        );
        assert_eq!(empty, full);
        assert!(empty.contains("APPROVED"));
    }

    #[test]
    fn lipid_marker_adds_lipid_nutrition_fragment() {
        let markers = classify("Cholesterol: 245 mg/dL", &KeywordTable::default());
        let body = select_body(AnalysisMode::Nutrition, &markers, &ctx());
        let lipid =
            templates::category_fragment(AnalysisMode::Nutrition, MarkerCategory::LipidRelated)
                .unwrap();
        assert!(body.contains(lipid));
        assert!(!body.contains(templates::default_fragment(AnalysisMode::Nutrition).unwrap()));
    }

    #[test]
    fn no_markers_uses_exactly_the_default() {
        let frags = select_fragments(AnalysisMode::Exercise, &set(&[]));
        assert_eq!(
            frags,
            vec![
                templates::header(AnalysisMode::Exercise),
                templates::default_fragment(AnalysisMode::Exercise).unwrap(),
                templates::footer(AnalysisMode::Exercise),
            ]
        );
    }

    #[test]
    fn categories_without_a_fragment_contribute_nothing() {
        // Nutrition has no blood-pressure fragment; alone it falls back to the default.
        let frags = select_fragments(
            AnalysisMode::Nutrition,
            &set(&[MarkerCategory::BloodPressureRelated]),
        );
        assert_eq!(frags.len(), 3);
        assert_eq!(frags[1], templates::default_fragment(AnalysisMode::Nutrition).unwrap());

        // Alongside a contributing category it simply adds nothing.
        let frags = select_fragments(
            AnalysisMode::Nutrition,
            &set(&[MarkerCategory::BloodPressureRelated, MarkerCategory::IronRelated]),
        );
        assert_eq!(frags.len(), 3);
        assert_eq!(
            frags[1],
            templates::category_fragment(AnalysisMode::Nutrition, MarkerCategory::IronRelated)
                .unwrap()
        );
    }

    #[test]
    fn fragments_follow_category_order() {
        let frags = select_fragments(
            AnalysisMode::Exercise,
            &set(&[MarkerCategory::BoneRelated, MarkerCategory::GlucoseRelated]),
        );
        let glucose =
            templates::category_fragment(AnalysisMode::Exercise, MarkerCategory::GlucoseRelated)
                .unwrap();
        let bone =
            templates::category_fragment(AnalysisMode::Exercise, MarkerCategory::BoneRelated)
                .unwrap();
        assert_eq!(frags[1], glucose);
        assert_eq!(frags[2], bone);
    }

    #[test]
    fn body_echoes_query() {
        let body = select_body(AnalysisMode::Comprehensive, &set(&[]), &ctx());
        assert!(body.contains("How is my heart health?"));
        assert!(body.starts_with("COMPREHENSIVE BLOOD TEST ANALYSIS REPORT"));
    }
}
