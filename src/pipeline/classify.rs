//! Marker-keyword classification: map report text to marker categories.
//!
//! A "marker" here is only a keyword trigger, never a parsed clinical value.
//! A category matches when any of its keywords occurs as a case-insensitive
//! substring of the text. There is no stemming and no word-boundary check, so
//! `"iron"` matches `"ironic"` and `"bone"` matches `"trombone"`. Callers that
//! need stricter matching should tune the [`KeywordTable`] instead.
//!
//! The table is data, not code: the same function serves every analysis mode
//! and a deployment can swap the table for one loaded from JSON.

use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A laboratory marker family used to pick recommendation fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCategory {
    GlucoseRelated,
    LipidRelated,
    IronRelated,
    VitaminRelated,
    BloodPressureRelated,
    BoneRelated,
}

impl MarkerCategory {
    /// Every category, in the order fragments are emitted.
    pub const ALL: [MarkerCategory; 6] = [
        MarkerCategory::GlucoseRelated,
        MarkerCategory::LipidRelated,
        MarkerCategory::IronRelated,
        MarkerCategory::VitaminRelated,
        MarkerCategory::BloodPressureRelated,
        MarkerCategory::BoneRelated,
    ];

    /// The snake_case name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerCategory::GlucoseRelated => "glucose_related",
            MarkerCategory::LipidRelated => "lipid_related",
            MarkerCategory::IronRelated => "iron_related",
            MarkerCategory::VitaminRelated => "vitamin_related",
            MarkerCategory::BloodPressureRelated => "blood_pressure_related",
            MarkerCategory::BoneRelated => "bone_related",
        }
    }
}

impl fmt::Display for MarkerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of categories matched in one document. Empty is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerCategorySet(BTreeSet<MarkerCategory>);

impl MarkerCategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: MarkerCategory) -> bool {
        self.0.insert(category)
    }

    pub fn contains(&self, category: MarkerCategory) -> bool {
        self.0.contains(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate in [`MarkerCategory`] order.
    pub fn iter(&self) -> impl Iterator<Item = MarkerCategory> + '_ {
        self.0.iter().copied()
    }

    /// Wire names of the matched categories, in category order.
    pub fn names(&self) -> Vec<String> {
        self.iter().map(|c| c.as_str().to_string()).collect()
    }
}

impl FromIterator<MarkerCategory> for MarkerCategorySet {
    fn from_iter<I: IntoIterator<Item = MarkerCategory>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// `category -> keywords` configuration for [`classify`].
///
/// Keywords are stored lowercased so matching only lowercases the haystack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTable(BTreeMap<MarkerCategory, Vec<String>>);

impl Default for KeywordTable {
    fn default() -> Self {
        Self::from_pairs([
            (
                MarkerCategory::GlucoseRelated,
                &["glucose", "blood sugar", "diabetes"][..],
            ),
            (
                MarkerCategory::LipidRelated,
                &["cholesterol", "lipid", "triglyceride", "cardiovascular"][..],
            ),
            (
                MarkerCategory::IronRelated,
                &["iron", "hemoglobin", "anemia"][..],
            ),
            (MarkerCategory::VitaminRelated, &["vitamin", "deficiency"][..]),
            (
                MarkerCategory::BloodPressureRelated,
                &["blood pressure", "hypertension"][..],
            ),
            (MarkerCategory::BoneRelated, &["calcium", "bone", "osteo"][..]),
        ])
    }
}

impl KeywordTable {
    /// Build a table from `(category, keywords)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (MarkerCategory, &'a [&'a str])>,
    {
        let mut map = BTreeMap::new();
        for (category, keywords) in pairs {
            map.insert(category, keywords.iter().map(|k| k.to_lowercase()).collect());
        }
        Self(map).normalised()
    }

    /// Parse a table such as `{"glucose_related": ["glucose", "a1c"]}`.
    ///
    /// Categories missing from the JSON have no keywords and never match.
    pub fn from_json(json: &str) -> Result<Self, AnalyzerError> {
        let map: BTreeMap<MarkerCategory, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| AnalyzerError::InvalidConfig(format!("keyword table: {e}")))?;
        let table = Self(map).normalised();
        if table.0.values().all(|kws| kws.is_empty()) {
            return Err(AnalyzerError::InvalidConfig(
                "keyword table has no keywords".into(),
            ));
        }
        Ok(table)
    }

    /// Keywords configured for `category` (empty slice if none).
    pub fn keywords(&self, category: MarkerCategory) -> &[String] {
        self.0.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    // Lowercase, trim, and drop empty keywords: an empty needle would match everything.
    fn normalised(self) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|(c, kws)| {
                    let kws = kws
                        .into_iter()
                        .map(|k| k.trim().to_lowercase())
                        .filter(|k| !k.is_empty())
                        .collect();
                    (c, kws)
                })
                .collect(),
        )
    }
}

/// Classify `text` into the set of marker categories it mentions.
///
/// Pure: identical input and table always give an identical set.
pub fn classify(text: &str, table: &KeywordTable) -> MarkerCategorySet {
    let haystack = text.to_lowercase();
    MarkerCategory::ALL
        .into_iter()
        .filter(|&category| {
            table
                .keywords(category)
                .iter()
                .any(|kw| haystack.contains(kw.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitively() {
        let set = classify("GLUCOSE: 92 mg/dL\nCholesterol: 245", &KeywordTable::default());
        assert!(set.contains(MarkerCategory::GlucoseRelated));
        assert!(set.contains(MarkerCategory::LipidRelated));
        assert!(!set.contains(MarkerCategory::IronRelated));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn substring_match_has_no_word_boundaries() {
        // Accepted imprecision: "ironic" triggers the iron family.
        let set = classify("an ironic twist", &KeywordTable::default());
        assert!(set.contains(MarkerCategory::IronRelated));
    }

    #[test]
    fn multi_word_keywords_match() {
        let set = classify("Blood Pressure 150/95", &KeywordTable::default());
        assert!(set.contains(MarkerCategory::BloodPressureRelated));
    }

    #[test]
    fn no_keywords_gives_empty_set() {
        let set = classify("Patient: John Doe\nDate: 2024-01-15", &KeywordTable::default());
        assert!(set.is_empty());
    }

    #[test]
    fn classification_is_idempotent() {
        let table = KeywordTable::default();
        let text = "Hemoglobin 11.2 (low), Vitamin D 18 ng/mL, calcium 9.1";
        assert_eq!(classify(text, &table), classify(text, &table));
    }

    #[test]
    fn names_follow_category_order() {
        let set = classify("vitamin d, glucose", &KeywordTable::default());
        assert_eq!(set.names(), vec!["glucose_related", "vitamin_related"]);
    }

    #[test]
    fn custom_table_from_json() {
        let table = KeywordTable::from_json(r#"{"glucose_related": ["HbA1c", "  "]}"#).unwrap();
        assert_eq!(table.keywords(MarkerCategory::GlucoseRelated), &["hba1c".to_string()]);
        assert!(table.keywords(MarkerCategory::LipidRelated).is_empty());

        let set = classify("HBA1C 6.1%, glucose 130", &table);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![MarkerCategory::GlucoseRelated]);
    }

    #[test]
    fn empty_or_bad_json_table_is_rejected() {
        assert!(KeywordTable::from_json(r#"{"glucose_related": []}"#).is_err());
        assert!(KeywordTable::from_json(r#"{"sodium_related": ["na"]}"#).is_err());
        assert!(KeywordTable::from_json("not json").is_err());
    }

    #[test]
    fn set_serialises_as_name_list() {
        let set: MarkerCategorySet =
            [MarkerCategory::BoneRelated, MarkerCategory::LipidRelated].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["lipid_related","bone_related"]"#);
    }
}
