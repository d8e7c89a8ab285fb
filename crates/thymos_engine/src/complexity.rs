//! Message complexity scoring for the hybrid router: cheap additive feature
//! weights decide whether a message deserves the LLM.

use crate::emotions::{emotional_keyword_count, sentiment_hits};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingPath {
    Fast,
    Deep,
}

#[derive(Debug, Clone)]
pub struct ComplexityReport {
    /// Additive feature score, clamped [0, 1].
    pub score: f32,
    /// One short reason per contributing feature.
    pub reasons: Vec<String>,
    pub recommended_path: ProcessingPath,
}

static RE_NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(no|not|never|nunca|jam[áa]s|don'?t|can'?t|won'?t|tampoco|ni)\b").unwrap()
});

static RE_RELATIONSHIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(nuestra\s+relaci[óo]n|our\s+relationship|entre\s+nosotros|between\s+us|t[úu]\s+y\s+yo|you\s+and\s+(?:me|i)|juntos|together|lo\s+nuestro)\b").unwrap()
});

static RE_PAST_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(recuerd[ao]s?|acu[ée]rdate|remember|la\s+[úu]ltima\s+vez|last\s+time|aquel\s+d[íi]a|that\s+day|antes\s+(?:de|sol[íi]as)|used\s+to|sol[íi]as?)\b").unwrap()
});

static RE_CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(si|if|unless|a\s+menos\s+que|y\s+si|what\s+if|imagina(?:te)?|imagine)\b")
        .unwrap()
});

/// Score a message and recommend a processing path: Deep iff score reaches
/// `threshold`.
pub fn analyze(message: &str, threshold: f32) -> ComplexityReport {
    let mut score = 0.0f32;
    let mut reasons = Vec::new();

    let chars = message.chars().count();
    if chars > 240 {
        score += 0.2;
        reasons.push("long message (+0.20)".to_string());
    } else if chars > 120 {
        score += 0.1;
        reasons.push("medium length (+0.10)".to_string());
    }

    let questions = message.chars().filter(|c| *c == '?' || *c == '¿').count();
    if questions > 0 {
        let bump = (questions as f32 * 0.1).min(0.2);
        score += bump;
        reasons.push(format!("questions (+{:.2})", bump));
    }

    let keyword_hits = emotional_keyword_count(message);
    if keyword_hits > 0 {
        let bump = (keyword_hits as f32 * 0.05).min(0.3);
        score += bump;
        reasons.push(format!("emotional keywords (+{:.2})", bump));
    }

    if RE_NEGATION.is_match(message) {
        score += 0.1;
        reasons.push("negations (+0.10)".to_string());
    }

    let (positive, negative) = sentiment_hits(message);
    if positive > 0 && negative > 0 {
        score += 0.2;
        reasons.push("mixed sentiment (+0.20)".to_string());
    }

    if RE_RELATIONSHIP.is_match(message) {
        score += 0.15;
        reasons.push("relationship reference (+0.15)".to_string());
    }

    if RE_PAST_REFERENCE.is_match(message) {
        score += 0.15;
        reasons.push("references the past (+0.15)".to_string());
    }

    if RE_CONDITIONAL.is_match(message) {
        score += 0.1;
        reasons.push("conditional phrasing (+0.10)".to_string());
    }

    let score = score.clamp(0.0, 1.0);
    let recommended_path = if score >= threshold {
        ProcessingPath::Deep
    } else {
        ProcessingPath::Fast
    };

    ComplexityReport {
        score,
        reasons,
        recommended_path,
    }
}
