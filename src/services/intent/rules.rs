use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::IntentCategory;

/// Static keyword/pattern table for one generic intent.
pub struct IntentRule {
    pub category: IntentCategory,
    pub keywords: &'static [&'static str],
    pub patterns: &'static [&'static str],
    pub response: &'static str,
}

/// Generic intents in the order they are scored. Ties keep the earlier entry.
pub static INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        category: IntentCategory::AppointmentBooking,
        keywords: &[
            "schedule",
            "book",
            "appointment",
            "visit",
            "see doctor",
            "make appointment",
            "need appointment",
            "available times",
            "next available",
            "when can i come",
            "need to see dentist",
            "checkup",
            "cleaning",
            "consultation",
            "emergency visit",
        ],
        patterns: &[
            r"(?:schedule|book|make)\s+(?:an?\s+)?appointment",
            r"(?:need|want)\s+(?:to\s+)?(?:schedule|book)",
            r"available\s+(?:times?|slots?|appointments?)",
            r"next\s+(?:available|open)\s+(?:slot|time|appointment)",
            r"(?:when|what\s+time)\s+can\s+i\s+(?:come|visit|see)",
        ],
        response: "I'd be happy to help you schedule an appointment. Let me gather some information to find the best time for you.",
    },
    IntentRule {
        category: IntentCategory::AppointmentCancel,
        keywords: &["cancel", "cancellation", "can't make it", "need to cancel"],
        patterns: &[
            r"(?:need\s+to\s+|want\s+to\s+)?cancel",
            r"can'?t\s+make\s+(?:it|my\s+appointment)",
        ],
        response: "I can help you cancel your appointment. May I have your name and appointment date to locate your booking?",
    },
    IntentRule {
        category: IntentCategory::AppointmentReschedule,
        keywords: &[
            "reschedule",
            "change appointment",
            "move appointment",
            "different time",
        ],
        patterns: &[
            r"(?:reschedule|change|move)\s+(?:my\s+)?appointment",
            r"different\s+(?:time|day|date)",
        ],
        response: "I can help you reschedule your appointment. What would be a better time for you?",
    },
    IntentRule {
        category: IntentCategory::HoursInquiry,
        keywords: &[
            "hours",
            "open",
            "close",
            "operating hours",
            "office hours",
            "what time",
        ],
        patterns: &[
            r"(?:office|operating|business)\s+hours",
            r"what\s+time\s+(?:do\s+you\s+)?(?:open|close)",
            r"are\s+you\s+open",
        ],
        response: "Our office hours vary by day. Let me provide you with our current schedule. Is there a specific day you'd like to visit?",
    },
    IntentRule {
        category: IntentCategory::InsuranceInquiry,
        keywords: &["insurance", "coverage", "accept", "covered", "plan", "benefits"],
        patterns: &[
            r"(?:do\s+you\s+)?(?:accept|take)\s+(?:my\s+)?insurance",
            r"insurance\s+(?:coverage|plans?|benefits)",
            r"(?:is|am)\s+(?:this|i)\s+covered",
        ],
        response: "We work with most major insurance plans. What insurance provider do you have? I can verify your coverage.",
    },
    IntentRule {
        category: IntentCategory::ServicesInquiry,
        keywords: &["services", "treatment", "procedure", "cleaning", "filling", "crown"],
        patterns: &[
            r"what\s+(?:services|treatments?|procedures?)",
            r"do\s+you\s+(?:do|offer|provide)",
            r"(?:cleaning|filling|crown|root\s+canal|whitening)",
        ],
        response: "We offer comprehensive dental services including cleanings, fillings, crowns, and more. What specific treatment are you interested in?",
    },
    IntentRule {
        category: IntentCategory::LocationInquiry,
        keywords: &["location", "address", "where", "directions", "parking"],
        patterns: &[
            r"where\s+(?:are\s+you\s+)?(?:located|at)",
            r"(?:your\s+)?(?:address|location)",
            r"directions\s+to",
        ],
        response: "We're conveniently located with easy access and parking. Would you like our address and directions?",
    },
    IntentRule {
        category: IntentCategory::Emergency,
        keywords: &["emergency", "pain", "urgent", "broke", "lost filling", "swollen"],
        patterns: &[
            r"(?:dental\s+)?emergency",
            r"(?:severe|bad|terrible)\s+(?:pain|toothache)",
            r"(?:broke|lost|fell\s+out)\s+(?:tooth|filling|crown)",
        ],
        response: "I understand this is urgent. For dental emergencies, please call our emergency line or visit the nearest hospital if severe. Can you describe what happened?",
    },
    IntentRule {
        category: IntentCategory::PaymentInquiry,
        keywords: &["payment", "cost", "price", "how much", "financing", "payment plan"],
        patterns: &[
            r"(?:how\s+much|what\s+(?:does|is)\s+the\s+cost)",
            r"payment\s+(?:plans?|options?)",
            r"(?:financing|credit|payment)\s+available",
        ],
        response: "We offer flexible payment options and financing plans. Costs vary by treatment. Would you like information about a specific procedure?",
    },
];

const PATTERN_SCORE: f64 = 0.8;
const KEYWORD_WEIGHT: f64 = 0.6;
const PATTERN_WEIGHT: f64 = 0.4;

pub struct CompiledRule {
    pub rule: &'static IntentRule,
    patterns: Vec<Regex>,
}

pub static COMPILED_RULES: Lazy<Vec<CompiledRule>> = Lazy::new(|| {
    INTENT_RULES
        .iter()
        .map(|rule| CompiledRule {
            rule,
            patterns: rule
                .patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("intent pattern must compile"))
                .collect(),
        })
        .collect()
});

/// Looks up the canned reply for a generic category.
pub fn canned_response(category: IntentCategory) -> Option<&'static str> {
    INTENT_RULES
        .iter()
        .find(|r| r.category == category)
        .map(|r| r.response)
}

impl CompiledRule {
    /// Scores normalised text against this rule and returns the confidence
    /// together with the keywords that were found.
    pub fn score(&self, text: &str) -> (f64, Vec<String>) {
        let matched: Vec<String> = self
            .rule
            .keywords
            .iter()
            .filter(|k| text.contains(&k.to_lowercase()))
            .map(|k| k.to_string())
            .collect();

        let keyword_score = if self.rule.keywords.is_empty() {
            0.0
        } else {
            matched.len() as f64 / self.rule.keywords.len() as f64
        };

        let pattern_score = if self.patterns.iter().any(|re| re.is_match(text)) {
            PATTERN_SCORE
        } else {
            0.0
        };

        let confidence =
            (keyword_score * KEYWORD_WEIGHT + pattern_score * PATTERN_WEIGHT).max(pattern_score);
        (confidence, matched)
    }
}
