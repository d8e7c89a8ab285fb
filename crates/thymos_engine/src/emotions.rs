//! Fast-path message analysis: keyword and emoji counting turned into
//! per-emotion deltas. Deterministic, no I/O, good enough for the short
//! low-stakes messages the router keeps off the LLM.

use thymos_core::{Emotion, EmotionDeltas};

const JOY_WORDS: &[&str] = &[
    "feliz", "happy", "genial", "great", "awesome", "encanta", "alegr", "contento", "contenta",
    "jaja", "haha", "lol", "yay", "wonderful", "amazing", "divertido", "😊", "😄", "😁", "🎉",
    "❤️", "🥰",
];

const TRUST_WORDS: &[&str] = &[
    "gracias", "thank", "confío", "trust", "seguro contigo", "apoyo", "support", "cuento contigo",
    "believe you", "te creo", "appreciate", "aprecio", "🙏", "🤝",
];

const FEAR_WORDS: &[&str] = &[
    "miedo", "afraid", "scared", "terror", "asustad", "worried", "preocupad", "ansiedad",
    "anxious", "nervios", "nervous", "pánico", "panic", "😨", "😰", "😱",
];

const SURPRISE_WORDS: &[&str] = &[
    "sorpresa", "surprise", "wow", "increíble", "unbelievable", "no puedo creer", "can't believe",
    "inesperado", "unexpected", "de repente", "suddenly", "😮", "😲", "🤯",
];

const SADNESS_WORDS: &[&str] = &[
    "triste", "sad", "llorar", "cry", "crying", "deprimid", "depressed", "solo", "sola", "lonely",
    "extraño", "miss you", "duele", "hurts", "pena", "heartbroken", "😢", "😭", "💔",
];

const DISGUST_WORDS: &[&str] = &[
    "asco", "disgust", "repugnante", "gross", "horrible", "awful", "odio esto", "hate this",
    "desagradable", "nasty", "🤢", "🤮",
];

const ANGER_WORDS: &[&str] = &[
    "enojad", "enfadad", "angry", "furious", "furios", "rabia", "mad at", "molest", "irritad",
    "annoyed", "harto", "harta", "fed up", "😡", "😠", "🤬",
];

const ANTICIPATION_WORDS: &[&str] = &[
    "espero", "hope", "ojalá", "looking forward", "can't wait", "no puedo esperar", "mañana",
    "tomorrow", "pronto", "soon", "planes", "plans", "excited for", "🤞",
];

const WORD_TABLE: &[(Emotion, &[&str])] = &[
    (Emotion::Joy, JOY_WORDS),
    (Emotion::Trust, TRUST_WORDS),
    (Emotion::Fear, FEAR_WORDS),
    (Emotion::Surprise, SURPRISE_WORDS),
    (Emotion::Sadness, SADNESS_WORDS),
    (Emotion::Disgust, DISGUST_WORDS),
    (Emotion::Anger, ANGER_WORDS),
    (Emotion::Anticipation, ANTICIPATION_WORDS),
];

/// Per-keyword-hit raise, capped per emotion.
const HIT_DELTA: f32 = 0.1;
const HIT_CAP: f32 = 0.4;
/// Raising an emotion pulls its opposite down by half the raise.
const OPPOSITE_FACTOR: f32 = 0.5;

/// Analyze a message into emotion deltas. A message with no signal at all
/// still yields a small positive joy/trust baseline: being talked to is
/// mildly pleasant.
pub fn analyze_message(message: &str) -> EmotionDeltas {
    let text = message.to_lowercase();
    let mut raises = [0f32; 8];

    for (emotion, words) in WORD_TABLE {
        let hits = words.iter().filter(|w| text.contains(*w)).count();
        if hits > 0 {
            raises[*emotion as usize] = (hits as f32 * HIT_DELTA).min(HIT_CAP);
        }
    }

    let questions = message.chars().filter(|c| *c == '?' || *c == '¿').count() as f32;
    if questions > 0.0 {
        raises[Emotion::Surprise as usize] += 0.06 * questions.min(2.0);
        raises[Emotion::Trust as usize] += 0.04 * questions.min(2.0);
    }

    let exclamations = message.chars().filter(|c| *c == '!' || *c == '¡').count() as f32;
    if exclamations > 0.0 {
        raises[Emotion::Joy as usize] += 0.05 * exclamations.min(3.0);
    }

    let mut deltas = EmotionDeltas::new();
    if raises.iter().all(|r| *r == 0.0) {
        deltas.add(Emotion::Joy, 0.03);
        deltas.add(Emotion::Trust, 0.02);
        return deltas;
    }

    for emotion in Emotion::ALL {
        let raise = raises[emotion as usize];
        if raise > 0.0 {
            deltas.add(emotion, raise);
            deltas.add(emotion.opposite(), -raise * OPPOSITE_FACTOR);
        }
    }
    deltas
}

/// How many emotional keywords (any emotion) the message contains.
/// Shared with the complexity scorer.
pub(crate) fn emotional_keyword_count(message: &str) -> usize {
    let text = message.to_lowercase();
    WORD_TABLE
        .iter()
        .flat_map(|(_, words)| words.iter())
        .filter(|w| text.contains(*w))
        .count()
}

/// (positive, negative) keyword hit counts, for mixed-sentiment detection.
pub(crate) fn sentiment_hits(message: &str) -> (usize, usize) {
    let text = message.to_lowercase();
    let count = |words: &[&str]| words.iter().filter(|w| text.contains(*w)).count();
    let positive = count(JOY_WORDS) + count(TRUST_WORDS) + count(ANTICIPATION_WORDS);
    let negative = count(SADNESS_WORDS) + count(FEAR_WORDS) + count(ANGER_WORDS) + count(DISGUST_WORDS);
    (positive, negative)
}
