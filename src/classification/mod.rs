// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Heuristic derivation of structured furniture attributes
//!
//! Maps a merged label set to category, condition, color, material and
//! style via fixed rule tables. Pure and deterministic: identical input
//! always yields identical output, which keeps golden-output tests honest.
//! Every field has a defined fallback; nothing here is ever null.

use serde::{Deserialize, Serialize};

use crate::recognition::RecognitionResult;

/// Category rules, checked in this order; first match wins
const CATEGORY_RULES: &[(&str, &[&str])] = &[
    ("chair", &["chair", "seat", "stool", "armchair", "recliner"]),
    ("table", &["table", "desk", "counter", "workbench"]),
    ("sofa", &["sofa", "couch", "loveseat", "futon", "sectional"]),
    ("bed", &["bed", "mattress", "bunk", "headboard"]),
    (
        "storage",
        &["cabinet", "dresser", "wardrobe", "shelf", "bookcase", "drawer", "storage", "chest"],
    ),
];

/// Condition tiers, checked best-first; first match wins; default "good"
const CONDITION_TIERS: &[(&str, &[&str])] = &[
    ("excellent", &["new", "excellent", "pristine", "mint", "unused"]),
    ("good", &["good", "clean", "solid", "sturdy"]),
    ("fair", &["fair", "used", "worn", "faded", "secondhand"]),
    (
        "poor",
        &["poor", "damaged", "broken", "torn", "stained", "scratched", "cracked"],
    ),
];

/// Color groups; default "unknown"
const COLOR_RULES: &[(&str, &[&str])] = &[
    ("black", &["black"]),
    ("white", &["white", "ivory"]),
    ("gray", &["gray", "grey", "charcoal"]),
    ("brown", &["brown", "walnut", "chestnut", "mahogany"]),
    ("beige", &["beige", "cream", "tan", "sand"]),
    ("red", &["red", "burgundy", "maroon"]),
    ("orange", &["orange", "amber"]),
    ("yellow", &["yellow", "gold", "mustard"]),
    ("green", &["green", "olive", "sage"]),
    ("blue", &["blue", "navy", "teal"]),
    ("purple", &["purple", "violet", "lavender"]),
    ("pink", &["pink", "rose", "blush"]),
];

/// Material groups; default "unknown"
const MATERIAL_RULES: &[(&str, &[&str])] = &[
    (
        "wood",
        &["wood", "wooden", "oak", "pine", "walnut", "mahogany", "teak", "birch", "plywood"],
    ),
    ("metal", &["metal", "steel", "iron", "aluminum", "brass", "chrome"]),
    ("glass", &["glass", "mirror"]),
    ("leather", &["leather", "suede"]),
    (
        "fabric",
        &["fabric", "upholstered", "upholstery", "linen", "cotton", "velvet", "wool", "textile"],
    ),
    ("plastic", &["plastic", "acrylic", "polypropylene"]),
    ("rattan", &["rattan", "wicker", "bamboo", "cane"]),
    ("marble", &["marble", "granite", "stone"]),
];

/// Style groups; default "modern"
const STYLE_RULES: &[(&str, &[&str])] = &[
    ("vintage", &["vintage", "retro"]),
    ("antique", &["antique", "classical", "ornate"]),
    ("rustic", &["rustic", "farmhouse", "reclaimed"]),
    ("industrial", &["industrial", "loft"]),
    ("scandinavian", &["scandinavian", "nordic"]),
    ("minimalist", &["minimalist", "minimal"]),
    ("mid-century", &["mid-century", "midcentury"]),
    ("traditional", &["traditional", "colonial"]),
    ("modern", &["modern", "contemporary", "sleek"]),
];

const DEFAULT_CONDITION: &str = "good";
const DEFAULT_COLOR: &str = "unknown";
const DEFAULT_MATERIAL: &str = "unknown";
const DEFAULT_STYLE: &str = "modern";

/// Heuristic-derived attributes for a listing draft
///
/// All fields carry a defined fallback, never null/absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub category: String,
    pub condition: String,
    pub metadata: FurnitureMetadata,
}

/// Independently matched descriptive attributes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FurnitureMetadata {
    pub color: String,
    pub material: String,
    pub style: String,
}

/// Derive structured attributes from a recognition result
///
/// Category falls back to the orchestrator's primary guess when no keyword
/// rule matches; the metadata fields each default independently.
pub fn classify(recognition: &RecognitionResult) -> ClassificationResult {
    let labels: Vec<String> = recognition
        .labels
        .iter()
        .map(|l| l.to_lowercase())
        .collect();

    let category = match_rules(&labels, CATEGORY_RULES)
        .unwrap_or_else(|| recognition.primary_category.clone());
    let condition =
        match_rules(&labels, CONDITION_TIERS).unwrap_or_else(|| DEFAULT_CONDITION.to_string());

    ClassificationResult {
        category,
        condition,
        metadata: FurnitureMetadata {
            color: match_rules(&labels, COLOR_RULES).unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            material: match_rules(&labels, MATERIAL_RULES)
                .unwrap_or_else(|| DEFAULT_MATERIAL.to_string()),
            style: match_rules(&labels, STYLE_RULES).unwrap_or_else(|| DEFAULT_STYLE.to_string()),
        },
    }
}

/// First rule whose keyword set hits any lower-cased label wins
fn match_rules(labels: &[String], rules: &[(&str, &[&str])]) -> Option<String> {
    for (outcome, keywords) in rules {
        for label in labels {
            if keywords.iter().any(|keyword| label.contains(keyword)) {
                return Some((*outcome).to_string());
            }
        }
    }
    None
}
