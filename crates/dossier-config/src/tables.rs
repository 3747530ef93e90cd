//! Reference tables for marking and grading reports.

use serde::Serialize;

/// A classification marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassificationLevel {
    pub name: &'static str,
    /// Short code used in derived report identifiers.
    pub code: &'static str,
    /// Banner colour as `#RRGGBB`.
    pub color: &'static str,
    /// Higher is more restrictive.
    pub level: u8,
    pub description: &'static str,
    /// Dissemination control appended to the handling line.
    pub handling: &'static str,
    /// Consequence of unauthorized disclosure.
    pub caveat: &'static str,
}

/// Known classification markings, most restrictive first.
pub const CLASSIFICATIONS: &[ClassificationLevel] = &[
    ClassificationLevel {
        name: "TOP SECRET // NOFORN",
        code: "TSN",
        color: "#FF0000",
        level: 5,
        description: "Top Secret - No Foreign Distribution",
        handling: "NOFORN // ORCON",
        caveat: "Unauthorized disclosure subject to criminal sanctions",
    },
    ClassificationLevel {
        name: "TOP SECRET",
        code: "TS",
        color: "#FF3300",
        level: 4,
        description: "Top Secret",
        handling: "NOFORN // ORCON",
        caveat: "Unauthorized disclosure subject to criminal sanctions",
    },
    ClassificationLevel {
        name: "SECRET",
        code: "S",
        color: "#FFCC00",
        level: 3,
        description: "Secret",
        handling: "NOFORN",
        caveat: "Unauthorized disclosure subject to administrative and criminal sanctions",
    },
    ClassificationLevel {
        name: "CONFIDENTIAL",
        code: "C",
        color: "#0066FF",
        level: 2,
        description: "Confidential",
        handling: "RELEASABLE",
        caveat: "For Official Use Only",
    },
    ClassificationLevel {
        name: "UNCLASSIFIED",
        code: "U",
        color: "#00AA00",
        level: 1,
        description: "Unclassified",
        handling: "PUBLIC",
        caveat: "Public Release Authorized",
    },
];

/// Colour used for markings not in a table.
pub const UNKNOWN_COLOR: &str = "#000000";

/// Look up a classification marking (case-insensitive, surrounding
/// whitespace ignored).
pub fn classification(name: &str) -> Option<&'static ClassificationLevel> {
    let name = name.trim();
    CLASSIFICATIONS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
}

/// A Traffic Light Protocol level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TlpLevel {
    pub name: &'static str,
    pub color: &'static str,
    pub level: u8,
    pub description: &'static str,
}

pub const TLP_LEVELS: &[TlpLevel] = &[
    TlpLevel {
        name: "RED",
        color: "#FF0000",
        level: 4,
        description: "Not for distribution. Information should not be shared.",
    },
    TlpLevel {
        name: "AMBER",
        color: "#FFAA00",
        level: 3,
        description: "Limited sharing. Information may be shared within organizations.",
    },
    TlpLevel {
        name: "GREEN",
        color: "#00AA00",
        level: 2,
        description: "Community willing to share. Information may be shared with communities.",
    },
    TlpLevel {
        name: "WHITE",
        color: "#FFFFFF",
        level: 1,
        description: "Unrestricted sharing. Information is not sensitive.",
    },
];

/// Look up a TLP level. Accepts an optional `TLP:` prefix.
pub fn tlp(name: &str) -> Option<&'static TlpLevel> {
    let name = name.trim();
    let name = name
        .strip_prefix("TLP:")
        .or_else(|| name.strip_prefix("tlp:"))
        .unwrap_or(name)
        .trim();
    TLP_LEVELS.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

/// A threat level with its response expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThreatLevel {
    pub name: &'static str,
    pub priority: &'static str,
    pub description: &'static str,
    pub response_time: &'static str,
    pub action: &'static str,
}

pub const THREAT_LEVELS: &[ThreatLevel] = &[
    ThreatLevel {
        name: "CRITICAL",
        priority: "P1",
        description: "Imminent threat requiring immediate action",
        response_time: "< 24 hours",
        action: "IMMEDIATE ACTION REQUIRED: deploy response team and begin continuous monitoring",
    },
    ThreatLevel {
        name: "HIGH",
        priority: "P2",
        description: "Significant threat requiring priority attention",
        response_time: "< 72 hours",
        action: "PRIORITY ACTION: increase surveillance and coordinate with law enforcement",
    },
    ThreatLevel {
        name: "MEDIUM",
        priority: "P3",
        description: "Moderate threat requiring standard monitoring",
        response_time: "< 7 days",
        action: "STANDARD ACTION: continue monitoring and update assessments",
    },
    ThreatLevel {
        name: "LOW",
        priority: "P4",
        description: "Minimal threat, routine surveillance adequate",
        response_time: "< 30 days",
        action: "ROUTINE ACTION: periodic review",
    },
];

/// Look up a threat level by name.
pub fn threat_level(name: &str) -> Option<&'static ThreatLevel> {
    let name = name.trim();
    THREAT_LEVELS
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
}

/// Collection disciplines, abbreviation first.
pub const SOURCE_TYPES: &[(&str, &str)] = &[
    ("HUMINT", "Human Intelligence"),
    ("SIGINT", "Signals Intelligence"),
    ("MASINT", "Measurement and Signature Intelligence"),
    ("OSINT", "Open Source Intelligence"),
    ("GEOINT", "Geospatial Intelligence"),
    ("TECHINT", "Technical Intelligence"),
    ("CYBINT", "Cyber Intelligence"),
    ("FININT", "Financial Intelligence"),
    ("IMINT", "Imagery Intelligence"),
];

pub fn source_type(code: &str) -> Option<&'static str> {
    let code = code.trim();
    SOURCE_TYPES
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// Analytic confidence levels.
pub const CONFIDENCE_LEVELS: &[(&str, &str)] = &[
    ("CONFIRMED", "Information verified by multiple independent sources"),
    ("HIGH", "Information from reliable source(s) with corroborating evidence"),
    ("MODERATE", "Information from reliable source(s), limited corroboration"),
    ("LOW", "Information from single source, uncorroborated"),
    ("SPECULATIVE", "Analysis based on limited information, requires validation"),
];

pub fn confidence(name: &str) -> Option<&'static str> {
    let name = name.trim();
    CONFIDENCE_LEVELS
        .iter()
        .find(|(level, _)| level.eq_ignore_ascii_case(name))
        .map(|(_, description)| *description)
}

/// Meaning of a two-character source reliability code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reliability {
    /// How reliable the source is (the letter).
    pub source: &'static str,
    /// How credible the information is (the digit).
    pub information: &'static str,
}

const SOURCE_GRADES: [&str; 6] = [
    "Completely Reliable",
    "Usually Reliable",
    "Fairly Reliable",
    "Unreliable",
    "Reliability Cannot Be Judged",
    "Reporting Agency Cannot Be Judged",
];

const INFORMATION_GRADES: [&str; 4] = [
    "Confirmed by Other Sources",
    "Probably True",
    "Possibly True",
    "Doubtful",
];

/// Describe a reliability code such as `B2`.
pub fn reliability(code: &str) -> Option<Reliability> {
    let code = code.trim().to_ascii_uppercase();
    let mut chars = code.chars();
    let (letter, digit) = (chars.next()?, chars.next()?);
    if chars.next().is_some() {
        return None;
    }
    let source = match letter {
        'A'..='F' => SOURCE_GRADES[(letter as u8 - b'A') as usize],
        _ => return None,
    };
    let information = match digit {
        '1'..='4' => INFORMATION_GRADES[(digit as u8 - b'1') as usize],
        _ => return None,
    };
    Some(Reliability {
        source,
        information,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_lookup() {
        let c = classification(" secret ").unwrap();
        assert_eq!(c.name, "SECRET");
        assert_eq!(c.code, "S");
        assert!(classification("COSMIC").is_none());
        assert_eq!(classification("TOP SECRET // NOFORN").unwrap().level, 5);
    }

    #[test]
    fn test_tlp_lookup() {
        assert_eq!(tlp("amber").unwrap().color, "#FFAA00");
        assert_eq!(tlp("TLP:RED").unwrap().level, 4);
        assert!(tlp("CLEAR").is_none());
    }

    #[test]
    fn test_threat_and_source_lookups() {
        assert_eq!(threat_level("high").unwrap().priority, "P2");
        assert!(threat_level("EXTREME").is_none());
        assert_eq!(source_type("sigint"), Some("Signals Intelligence"));
        assert_eq!(source_type("RUMINT"), None);
        assert!(confidence("moderate").unwrap().contains("limited corroboration"));
        assert_eq!(classification("SECRET").unwrap().handling, "NOFORN");
    }

    #[test]
    fn test_reliability() {
        let r = reliability("b2").unwrap();
        assert_eq!(r.source, "Usually Reliable");
        assert_eq!(r.information, "Probably True");
        assert_eq!(reliability("F4").unwrap().information, "Doubtful");
        assert!(reliability("G1").is_none());
        assert!(reliability("A5").is_none());
        assert!(reliability("A").is_none());
        assert!(reliability("A12").is_none());
    }

    #[test]
    fn test_classification_levels_strictly_ordered() {
        for pair in CLASSIFICATIONS.windows(2) {
            assert!(pair[0].level > pair[1].level);
        }
    }
}
