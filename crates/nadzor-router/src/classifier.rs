// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic request classification for construction-supervision queries.
//!
//! Assigns each inbound request to one of four categories (defect photo,
//! drawing request, technical-normative question, generic) using keyword and
//! regex tables. No LLM pre-call, no network, no latency.

use std::sync::LazyLock;

use regex::Regex;
use strum::{Display, EnumString};

/// Request categories driving provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RequestCategory {
    /// Photo of a construction element to analyze for defects.
    DefectPhoto,
    /// Explicit request to generate a schematic or technical drawing.
    Drawing,
    /// Question about normative documents, materials, or structural terms.
    Technical,
    /// Everything else, served by the generalist default provider.
    Generic,
}

/// Result of classifying an inbound request.
#[derive(Debug, Clone)]
pub struct Classification {
    /// The classified category.
    pub category: RequestCategory,
    /// Human-readable reason for the classification.
    pub reason: &'static str,
    /// Keywords or code references that triggered the match.
    pub matched: Vec<String>,
    /// Whether the text carries urgency markers (logging only).
    pub urgent: bool,
}

/// Drawing-generation triggers (contains, case-insensitive).
const DRAWING_TRIGGERS: &[&str] = &[
    "нарисуй",
    "начерти",
    "чертёж",
    "чертеж",
    "сгенерируй",
    "создай изображение",
    "создай картинку",
    "создай схему",
    "как выглядит",
    "визуализируй",
    "сделай рисунок",
    "изобрази",
    "пришли картинку",
    "пришли изображение",
    "отправь картинку",
    "отправь изображение",
    "нужна картинка",
    "нужно изображение",
    "хочу увидеть",
    "хочу картинку",
];

/// Normative and technical-terminology markers (contains, case-insensitive).
const TECHNICAL_KEYWORDS: &[&str] = &[
    "норматив",
    "по нормам",
    "требование",
    "допускается",
    "не допускается",
    "запрещается",
    "регламент",
    "стандарт",
    "бетон",
    "железобетон",
    "арматур",
    "армирование",
    "защитный слой",
    "фундамент",
    "основание",
    "свая",
    "несущая способность",
    "прочность",
    "нагрузка",
    "прогиб",
    "трещин",
    "сварка",
    "кладка",
    "перекрытие",
    "гидроизоляция",
    "теплоизоляция",
    "огнестойкость",
    "морозостойкость",
    "отмостка",
    "опалубка",
];

/// Urgency markers surfaced as a priority flag (contains, case-insensitive).
const URGENT_MARKERS: &[&str] = &[
    "срочно",
    "немедленно",
    "авари",
    "обрушение",
    "опасност",
    "угроза",
];

/// Freshness triggers that enable live web search on generic questions
/// (contains, case-insensitive).
const LIVE_SEARCH_TRIGGERS: &[&str] = &[
    "актуальн",
    "новый",
    "новая",
    "свежий",
    "последн",
    "изменени",
    "обновлен",
    "действует",
    "отменен",
    "проверь",
    "найди",
    "поищи",
];

/// Normative document code patterns (СП 63, ГОСТ 27751, СНиП 2.01, ...).
static NORMATIVE_CODE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)СП\s*\d+").unwrap(),
        Regex::new(r"(?i)ГОСТ\s*\d+").unwrap(),
        Regex::new(r"(?i)СНиП\s*[\d.]+").unwrap(),
        Regex::new(r"(?i)СанПиН\s*[\d.]+").unwrap(),
        Regex::new(r"(?i)ФЗ[\-\s]*\d+").unwrap(),
        Regex::new(r"(?i)пункт\s*[\d.]+").unwrap(),
        Regex::new(r"(?i)п\.\s*[\d.]+").unwrap(),
    ]
});

/// Extract normative document code references from a text.
pub fn extract_normative_codes(text: &str) -> Vec<String> {
    let mut codes = Vec::new();
    for pattern in NORMATIVE_CODE_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            codes.push(m.as_str().to_string());
        }
    }
    codes
}

/// Whether a generic question asks about current or recently changed
/// documents and should be answered with live web search.
pub fn needs_live_search(text: &str) -> bool {
    let lower = text.to_lowercase();
    LIVE_SEARCH_TRIGGERS.iter().any(|t| lower.contains(t))
}

fn has_drawing_trigger(lower: &str) -> Vec<String> {
    DRAWING_TRIGGERS
        .iter()
        .filter(|t| lower.contains(*t))
        .map(|t| t.to_string())
        .collect()
}

fn technical_matches(text: &str, lower: &str) -> Vec<String> {
    let mut matched = extract_normative_codes(text);
    matched.extend(
        TECHNICAL_KEYWORDS
            .iter()
            .filter(|k| lower.contains(*k))
            .map(|k| k.to_string()),
    );
    matched
}

fn is_urgent(lower: &str) -> bool {
    URGENT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Heuristic request classifier with configurable category precedence.
pub struct RequestClassifier {
    precedence: Vec<RequestCategory>,
}

impl RequestClassifier {
    /// Create a classifier with the default precedence
    /// (defect photo, then drawing, then technical).
    pub fn new() -> Self {
        Self {
            precedence: vec![
                RequestCategory::DefectPhoto,
                RequestCategory::Drawing,
                RequestCategory::Technical,
            ],
        }
    }

    /// Create a classifier from configured precedence names.
    ///
    /// Entries are validated at config load time; anything unparseable here
    /// is skipped rather than failing classification.
    pub fn with_precedence(precedence: &[String]) -> Self {
        use std::str::FromStr;
        let parsed: Vec<RequestCategory> = precedence
            .iter()
            .filter_map(|name| RequestCategory::from_str(name).ok())
            .collect();
        if parsed.is_empty() {
            Self::new()
        } else {
            Self { precedence: parsed }
        }
    }

    /// Classify a request from its text and photo flag.
    ///
    /// Pure and deterministic. Never errors: a request with neither text nor
    /// photo is a generic question.
    pub fn classify(&self, text: Option<&str>, has_photo: bool) -> Classification {
        let raw = text.unwrap_or("").trim();
        let lower = raw.to_lowercase();
        let urgent = is_urgent(&lower);

        let drawing_matched = has_drawing_trigger(&lower);

        for category in &self.precedence {
            match category {
                RequestCategory::DefectPhoto => {
                    // A drawing trigger overrides the photo: the photo is
                    // then context for the drawing request, not the subject.
                    if has_photo && drawing_matched.is_empty() {
                        return Classification {
                            category: RequestCategory::DefectPhoto,
                            reason: "photo attached without drawing trigger",
                            matched: Vec::new(),
                            urgent,
                        };
                    }
                }
                RequestCategory::Drawing => {
                    if !drawing_matched.is_empty() {
                        return Classification {
                            category: RequestCategory::Drawing,
                            reason: "drawing trigger matched",
                            matched: drawing_matched,
                            urgent,
                        };
                    }
                }
                RequestCategory::Technical => {
                    let matched = technical_matches(raw, &lower);
                    if !matched.is_empty() {
                        return Classification {
                            category: RequestCategory::Technical,
                            reason: "normative or technical markers matched",
                            matched,
                            urgent,
                        };
                    }
                }
                RequestCategory::Generic => {}
            }
        }

        Classification {
            category: RequestCategory::Generic,
            reason: "no category markers matched",
            matched: Vec::new(),
            urgent,
        }
    }
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new()
    }
}
