//! Rule tables for the offline classifier
//!
//! Everything here is ordered data: phrase and word lookups for the
//! normalization pass, keyword lists for category scoring and priority
//! escalation, and the canned main-issue sentences. Tables are slices rather
//! than maps because enumeration order is part of the contract — category
//! ties resolve to the earliest entry.

/// Romanized Tamil markers used to flag a text as Tamil-mixed
pub const LANGUAGE_MARKERS: &[&str] = &[
    "thanni", "romba", "kastam", "iruku", "irukku", "illa", "varala", "naal", "kuppai", "sutham",
    "mosam", "saalai", "arasu", "thappu", "velai", "office", "current", "cut", "seri illa",
    "neraya", "konjam", "problem", "varudhu",
];

/// Whole-phrase replacements, applied before per-word lookup
pub const PHRASE_TABLE: &[(&str, &str)] = &[
    ("thanni varala", "water is not coming"),
    ("romba kastama iruku", "it is very difficult"),
    ("sutham illa", "there is no cleanliness"),
    ("current cut", "power cut"),
    ("velai illa", "no work"),
];

/// Single-word lexicon for the best-effort translation pass
pub const WORD_LEXICON: &[(&str, &str)] = &[
    ("thanni", "water"),
    ("varala", "not coming"),
    ("varudhu", "is coming"),
    ("romba", "very"),
    ("kastam", "difficult"),
    ("iruku", "is"),
    ("illa", "no"),
    ("kuppai", "garbage"),
    ("sutham", "cleanliness"),
    ("mosam", "bad"),
    ("road", "road"),
    ("current", "power"),
    ("cut", "cut"),
    ("velai", "work"),
    ("office", "office"),
    ("neraya", "a lot"),
    ("konjam", "little"),
    ("problem", "problem"),
    ("seri", "okay"),
    ("worst", "worst"),
    ("danger", "danger"),
    ("school", "school"),
    ("hospital", "hospital"),
];

/// Category keyword lists, scored by substring hits
///
/// Order matters: a tie between categories resolves to the earlier entry.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Water",
        &["water", "thanni", "pipe", "tap", "supply", "leak", "varala"],
    ),
    (
        "Sanitation",
        &["garbage", "trash", "waste", "dirty", "smell", "drain", "kuppai"],
    ),
    (
        "Road",
        &["road", "pothole", "street", "saalai", "traffic", "damaged"],
    ),
    (
        "Electricity",
        &["current", "power", "electric", "light", "cut", "voltage"],
    ),
    (
        "Services",
        &["service", "office", "staff", "delay", "response", "rude", "delivery"],
    ),
    ("Health", &["hospital", "doctor", "medicine", "sick", "clinic"]),
    (
        "Education",
        &["school", "college", "teacher", "student", "fees"],
    ),
    ("Transport", &["bus", "train", "transport", "driver", "ticket"]),
    (
        "Safety",
        &["danger", "accident", "risk", "theft", "police", "dark"],
    ),
];

/// Fallback category when no keyword list scores
pub const CATEGORY_OTHER: &str = "Other";

/// Terms that escalate a feedback straight to High priority
pub const HIGH_URGENCY_TERMS: &[&str] = &[
    "urgent",
    "danger",
    "accident",
    "risk",
    "critical",
    "worst",
    "life threat",
];

/// Terms that raise a feedback to Medium priority
pub const MEDIUM_URGENCY_TERMS: &[&str] =
    &["problem", "issue", "bad", "delay", "ignored", "kastam"];

/// Canned main-issue sentence per category
pub const MAIN_ISSUES: &[(&str, &str)] = &[
    ("Water", "Water supply issue in the area"),
    ("Sanitation", "Poor cleanliness and waste management"),
    ("Road", "Bad road condition causing inconvenience"),
    ("Electricity", "Power supply disruption in the area"),
    ("Services", "Poor response from public services"),
    ("Health", "Healthcare service issue"),
    ("Education", "Education related issue"),
    ("Transport", "Public transport issue"),
    ("Safety", "Public safety concern"),
];

/// Main-issue sentence for uncategorized feedback
pub const GENERIC_ISSUE: &str = "General issue reported";
