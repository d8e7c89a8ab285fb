//! Textual and temporal trigger detection.
//!
//! Each trigger type carries a list of regex patterns (Spanish and English);
//! the first pattern that matches wins for that type. A type is only
//! evaluated when it maps to at least one active profile, so an agent with no
//! narcissistic profile never pays for criticism scanning.
//!
//! `delayed_response` is not textual: it fires off the gap since the previous
//! message in the conversation.

use crate::intensity::{affected_behaviors, base_weight};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use serde::Serialize;
use thymos_core::{BehaviorType, TriggerType};

/// One trigger found in (or around) a message.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedTrigger {
    pub trigger_type: TriggerType,
    pub weight: f32,
    pub confidence: f32,
    pub detected_text: String,
}

/// (hours elapsed, weight) — highest met threshold wins.
const DELAYED_THRESHOLDS: &[(i64, f32)] = &[(48, 0.9), (24, 0.8), (12, 0.6), (6, 0.4), (3, 0.2)];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

static ABANDONMENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\bnecesito\s+(?:un\s+)?(?:poco\s+de\s+)?(?:espacio|tiempo)\b",
        r"(?i)\bquiero\s+(?:un\s+)?(?:poco\s+de\s+)?(?:espacio|tiempo)\b",
        r"(?i)\bdame\s+(?:un\s+)?(?:espacio|tiempo)\b",
        r"(?i)\b(?:necesito|quiero)\s+estar\s+sol[oa]\b",
        r"(?i)\b(?:dame|necesito|quiero)\s+distancia\b",
        r"(?i)\bvamos\s+(?:muy\s+|demasiado\s+)?(?:r[áa]pido|deprisa)\b",
        r"(?i)\b(?:ir|vayamos|vamos)\s+(?:m[áa]s\s+)?despacio\b",
        r"(?i)\b(?:necesito|hagamos)\s+(?:una\s+)?pausa\b",
        r"(?i)\besto\s+es\s+(?:demasiado|mucho)\s+para\s+m[íi]\b",
        r"(?i)\bme\s+est[áa]s\s+(?:agobiando|asfixiando|presionando)\b",
        r"(?i)\bno\s+(?:puedo|voy\s+a\s+poder)\s+(?:hablar|escribir|responder)\b",
        r"(?i)\b(?:estoy|voy\s+a\s+estar)\s+(?:ocupad[oa]|liad[oa])\b",
        r"(?i)\bi\s+need\s+(?:some\s+)?(?:space|time)(?:\s+alone)?\b",
        r"(?i)\bgive\s+me\s+(?:some\s+)?(?:space|room|time)\b",
        r"(?i)\bi\s+(?:want|need)\s+to\s+be\s+alone\b",
        r"(?i)\bwe(?:'re|\s+are)\s+(?:moving|going)\s+too\s+fast\b",
        r"(?i)\blet'?s\s+slow\s+down\b",
        r"(?i)\bi\s+need\s+a\s+break\b",
        r"(?i)\byou(?:'re|\s+are)\s+(?:smothering|suffocating|crowding)\s+me\b",
        r"(?i)\bthis\s+is\s+too\s+much\s+for\s+me\b",
        r"(?i)\bi\s+can'?t\s+(?:talk|text|reply|respond)\s+(?:right\s+now|today|for\s+a\s+while)\b",
    ])
});

static CRITICISM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:est[áa]s|eres)\s+(?:muy\s+|demasiado\s+)?equivocad[oa]\b",
        r"(?i)\bte\s+equivocaste\b",
        r"(?i)\b(?:eso|esto)\s+est[áa]\s+mal\b",
        r"(?i)\b(?:eres|est[áa]s)\s+(?:muy|demasiado)\s+(?:intens[oa]|celos[oa]|controladora?|posesiv[oa]|exigente|dram[áa]tic[oa]|exagerad[oa])\b",
        r"(?i)\bme\s+(?:agobias|asfixias|presionas)\b",
        r"(?i)\b(?:eres|est[áa]s)\s+(?:como|igual\s+que)\s+(?:todos|todas|los\s+dem[áa]s)\b",
        r"(?i)\bno\s+eres\s+(?:tan|lo\s+suficientemente)\b",
        r"(?i)\bpor\s+qu[ée]\s+(?:siempre\s+)?(?:eres|est[áa]s)\s+(?:as[íi]|tan)\b",
        r"(?i)\bqu[ée]\s+(?:te\s+)?pasa\s+(?:contigo|ahora)\b",
        r"(?i)\bno\s+me\s+(?:entiendes|comprendes|escuchas)\b",
        r"(?i)\bno\s+me\s+(?:valoras|aprecias|respetas)\b",
        r"(?i)\byou(?:'re|\s+are)\s+(?:so\s+|completely\s+)?wrong\b",
        r"(?i)\bthat'?s\s+(?:just\s+)?(?:wrong|not\s+right)\b",
        r"(?i)\byou(?:'re|\s+are)\s+(?:too|so)\s+(?:intense|jealous|controlling|possessive|clingy|needy|demanding|dramatic)\b",
        r"(?i)\byou\s+(?:never|don'?t)\s+(?:listen|understand)\b",
        r"(?i)\bwhy\s+are\s+you\s+(?:always\s+)?like\s+this\b",
        r"(?i)\bwhat(?:'s|\s+is)\s+wrong\s+with\s+you\b",
        r"(?i)\byou\s+don'?t\s+(?:value|appreciate|respect)\s+me\b",
        r"(?i)\byou(?:'re|\s+are)\s+not\s+being\s+(?:normal|reasonable|fair)\b",
    ])
});

static MENTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // Capitalized proper names stay case-sensitive; everything else folds.
        r"\b(?:con|de|sobre)\s+[A-ZÁÉÍÓÚÑ][a-záéíóúñ]{2,}\b",
        r"\b[A-ZÁÉÍÓÚÑ][a-záéíóúñ]{2,}\s+me\s+(?:dijo|pregunt[óo]|llam[óo]|escribi[óo])\b",
        r"\b(?:with|about)\s+[A-Z][a-z]{2,}\b",
        r"\b[A-Z][a-z]{2,}\s+(?:told|asked|called|texted)\s+me\b",
        r"(?i)\b(?:mi|un|una)\s+(?:amig[oa]|compañer[oa]|colega)\b",
        r"(?i)\b(?:sal[íi]|qued[ée]|me\s+junt[ée]|me\s+encontr[ée])\s+con\b",
        r"(?i)\b(?:voy|vamos)\s+a\s+(?:salir|quedar|juntarnos|encontrarnos)\s+con\b",
        r"(?i)\bmi\s+ex(?:\s+(?:novi[oa]|pareja|espos[oa]))?\b",
        r"(?i)\bme\s+gusta\s+(?:alguien|otra\s+persona)\b",
        r"(?i)\bhay\s+alguien\s+m[áa]s\b",
        r"(?i)\bconoc[íi]\s+a\s+alguien\b",
        r"(?i)\bmy\s+(?:friend|buddy|coworker|colleague|classmate|roommate)\b",
        r"(?i)\b(?:hung|hanging|went)\s+out\s+with\b",
        r"(?i)\bi\s+met\s+(?:someone|somebody|a\s+(?:guy|girl))\b",
        r"(?i)\bmy\s+ex(?:\s*-?\s*(?:boyfriend|girlfriend|partner|husband|wife))?\b",
        r"(?i)\bi\s+like\s+(?:someone|somebody)(?:\s+else)?\b",
        r"(?i)\bthere(?:'s|\s+is)\s+someone\s+else\b",
    ])
});

static BOUNDARY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\bno\s+quiero\s+que\b",
        r"(?i)\bno\s+puedes\s+(?:decirme|controlarme|prohibirme|decidir)\b",
        r"(?i)\bno\s+me\s+(?:digas|hables|escribas|mandes|preguntes)\b",
        r"(?i)\bdeja\s+de\b",
        r"(?i)\bpara\s+de\b",
        r"(?i)\bbasta\s+(?:de|ya)\b",
        r"(?i)\bno\s+me\s+(?:llames|contactes|molestes|busques)\b",
        r"(?i)\bd[ée]jame\s+(?:en\s+paz|tranquil[oa]|sol[oa])\b",
        r"(?i)\bes\s+mi\s+(?:vida|decisi[óo]n|elecci[óo]n)\b",
        r"(?i)\bd[ée]jame\s+decidir\b",
        r"(?i)\bno\s+quiero\s+(?:hablar|pensar|saber)\s+(?:de|sobre)\b",
        r"(?i)\bno\s+es\s+(?:tu|de\s+tu)\s+(?:asunto|problema|incumbencia)\b",
        r"(?i)\bi\s+don'?t\s+want\s+you\s+to\b",
        r"(?i)\byou\s+can'?t\s+(?:tell|control|stop|make)\s+me\b",
        r"(?i)\bstop\s+(?:doing|saying|asking|texting|calling|checking)\b",
        r"(?i)\bleave\s+me\s+alone\b",
        r"(?i)\bdon'?t\s+(?:call|contact|text|message)\s+me\b",
        r"(?i)\b(?:that'?s|it'?s)\s+(?:none\s+of\s+your|not\s+your)\s+business\b",
        r"(?i)\bit'?s\s+my\s+(?:life|decision|choice)\b",
        r"(?i)\bi\s+don'?t\s+want\s+to\s+talk\s+about\b",
        r"(?i)\bthat'?s\s+enough\b",
        r"(?i)\bback\s+off\b",
    ])
});

static REASSURANCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\bte\s+(?:quiero|amo|adoro|aprecio)\b",
        r"(?i)\beres\s+(?:importante|especial|únic[oa])\s+para\s+m[íi]\b",
        r"(?i)\b(?:estoy|voy\s+a\s+estar)\s+(?:aqu[íi]|contigo)\b",
        r"(?i)\bno\s+(?:te\s+)?voy\s+a\s+(?:dejar|abandonar|irme)\b",
        r"(?i)\bsiempre\s+(?:voy\s+a\s+)?estar[ée]?\b",
        r"(?i)\bconf[íi]o\s+en\s+ti\b",
        r"(?i)\b(?:cuento|puedo\s+contar)\s+contigo\b",
        r"(?i)\btodo\s+(?:est[áa]|va\s+a\s+estar)\s+bien\b",
        r"(?i)\bno\s+te\s+preocupes\b",
        r"(?i)\bte\s+(?:entiendo|comprendo)\b",
        r"(?i)\btienes\s+raz[óo]n\b",
        r"(?i)\bi\s+(?:love|adore)\s+you\b",
        r"(?i)\byou(?:'re|\s+are)\s+(?:so\s+)?(?:important|special)\s+to\s+me\b",
        r"(?i)\bi(?:'m|\s+am)\s+(?:right\s+)?here\s+(?:for|with)\s+you\b",
        r"(?i)\bi\s+(?:won'?t|will\s+never)\s+(?:leave|abandon)\s+you\b",
        r"(?i)\bi\s+trust\s+you\b",
        r"(?i)\bdon'?t\s+worry\b",
        r"(?i)\beverything(?:'s|\s+is|\s+will\s+be)\s+(?:fine|okay|ok|alright)\b",
        r"(?i)\bi\s+understand\s+you\b",
        r"(?i)\byou(?:'re|\s+are)\s+right\b",
        r"(?i)\bi\s+appreciate\s+you\b",
    ])
});

static REJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:terminamos|se\s+acab[óo])\b",
        r"(?i)\b(?:quiero|voy\s+a)\s+terminar\s+(?:esto|la\s+relaci[óo]n|contigo)\b",
        r"(?i)\bno\s+quiero\s+(?:seguir|continuar)\s+(?:con\s+esto|contigo|as[íi])\b",
        r"(?i)\bno\s+me\s+(?:gustas|interesas|atraes)\b",
        r"(?i)\bno\s+(?:siento|tengo)\s+(?:nada|lo\s+mismo)\s+por\s+ti\b",
        r"(?i)\bno\s+te\s+(?:quiero|amo)\b",
        r"(?i)\bno\s+(?:me\s+)?vuelvas\s+a\s+(?:hablar|escribir|contactar|buscar)(?:me)?\b",
        r"(?i)\bte\s+voy\s+a\s+bloquear\b",
        r"(?i)\badi[óo]s\s+(?:para\s+)?siempre\b",
        r"(?i)\b(?:esto|nosotros)\s+no\s+(?:funciona|va\s+a\s+funcionar)\b",
        r"(?i)\bya\s+no\s+(?:quiero|puedo|podemos)\b",
        r"(?i)\bes\s+mejor\s+(?:que|si)\s+(?:no\s+)?(?:sigamos|continuemos)\b",
        r"(?i)\bwe(?:'re|\s+are)\s+(?:done|over|through|finished)\b",
        r"(?i)\bit'?s\s+over(?:\s+between\s+us)?\b",
        r"(?i)\bi\s+(?:want|need)\s+to\s+break\s+up\b",
        r"(?i)\bi(?:'m|\s+am)\s+(?:breaking\s+up\s+with|leaving)\s+you\b",
        r"(?i)\bi\s+don'?t\s+(?:love|like)\s+you(?:\s+anymore)?\b",
        r"(?i)\bi\s+don'?t\s+want\s+to\s+(?:see|talk\s+to)\s+you\s+(?:again|anymore)\b",
        r"(?i)\bnever\s+(?:talk|text|write)\s+to\s+me\s+again\b",
        r"(?i)\bgoodbye\s+forever\b",
        r"(?i)\bthis\s+(?:isn'?t|is\s+not)\s+working\b",
        r"(?i)\bi(?:'m|\s+am)\s+blocking\s+you\b",
    ])
});

fn patterns_for(trigger_type: TriggerType) -> Option<&'static [Regex]> {
    match trigger_type {
        TriggerType::AbandonmentSignal => Some(&ABANDONMENT_PATTERNS),
        TriggerType::DelayedResponse => None,
        TriggerType::Criticism => Some(&CRITICISM_PATTERNS),
        TriggerType::MentionOtherPerson => Some(&MENTION_PATTERNS),
        TriggerType::BoundaryAssertion => Some(&BOUNDARY_PATTERNS),
        TriggerType::Reassurance => Some(&REASSURANCE_PATTERNS),
        TriggerType::ExplicitRejection => Some(&REJECTION_PATTERNS),
    }
}

/// Detection confidence for a textual match: base 0.7, bumped for matches
/// that cover a large share of the message or open it, clamped to [0.5, 1.0].
fn confidence(message: &str, matched: &str) -> f32 {
    let msg_len = message.trim().chars().count().max(1) as f32;
    let match_len = matched.chars().count() as f32;
    let ratio = match_len / msg_len;

    let mut score: f32 = 0.7;
    if ratio > 0.5 {
        score += 0.2;
    } else if ratio > 0.3 {
        score += 0.1;
    }
    if message
        .trim()
        .to_lowercase()
        .starts_with(&matched.to_lowercase())
    {
        score += 0.1;
    }
    score.clamp(0.5, 1.0)
}

/// Scan a message for every textual trigger type that maps to at least one
/// active behavior. One detection per type at most (first pattern wins).
pub fn detect(message: &str, active: &[BehaviorType]) -> Vec<DetectedTrigger> {
    let mut detections = Vec::new();
    if active.is_empty() || message.trim().is_empty() {
        return detections;
    }

    for trigger_type in TriggerType::ALL {
        let Some(patterns) = patterns_for(trigger_type) else {
            continue;
        };
        if !affected_behaviors(trigger_type)
            .iter()
            .any(|b| active.contains(b))
        {
            continue;
        }

        for pattern in patterns {
            if let Some(m) = pattern.find(message) {
                detections.push(DetectedTrigger {
                    trigger_type,
                    weight: base_weight(trigger_type),
                    confidence: confidence(message, m.as_str()),
                    detected_text: m.as_str().to_string(),
                });
                break;
            }
        }
    }

    detections
}

/// Time-based delayed-response trigger: the highest met threshold supplies
/// the weight; confidence is always 1.0 because elapsed time is not fuzzy.
pub fn detect_delayed(
    previous_message_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DetectedTrigger> {
    let elapsed_hours = (now - previous_message_at).num_hours();
    let (_, weight) = DELAYED_THRESHOLDS
        .iter()
        .find(|(hours, _)| elapsed_hours >= *hours)?;

    Some(DetectedTrigger {
        trigger_type: TriggerType::DelayedResponse,
        weight: *weight,
        confidence: 1.0,
        detected_text: format!("no reply for {}h", elapsed_hours),
    })
}
