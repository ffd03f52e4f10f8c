//! Topic taxonomy for knowledge documents.

use serde::{Deserialize, Serialize};

/// Category tag attached to every document.
///
/// Serialized as its snake_case name (`"privilege_escalation"`). Parsing with
/// [`str::parse`] is more lenient and accepts any case as well as `-` or a
/// space in place of `_`, which is what dataset files tend to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Material that fits no narrower tag
    General,
    /// Network scanning, services, protocols
    Network,
    /// Web application security
    Web,
    /// Open-source intelligence gathering
    Osint,
    /// Exploitation techniques and payloads
    Exploitation,
    /// Local and domain privilege escalation
    PrivilegeEscalation,
    /// Cryptography and password attacks
    Cryptography,
    /// Digital forensics
    Forensics,
    /// Malware analysis
    Malware,
    /// Broad cybersecurity knowledge
    Cybersecurity,
}

impl Topic {
    /// Every recognized tag, in declaration order.
    pub const ALL: [Topic; 10] = [
        Topic::General,
        Topic::Network,
        Topic::Web,
        Topic::Osint,
        Topic::Exploitation,
        Topic::PrivilegeEscalation,
        Topic::Cryptography,
        Topic::Forensics,
        Topic::Malware,
        Topic::Cybersecurity,
    ];

    /// Canonical tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::General => "general",
            Topic::Network => "network",
            Topic::Web => "web",
            Topic::Osint => "osint",
            Topic::Exploitation => "exploitation",
            Topic::PrivilegeEscalation => "privilege_escalation",
            Topic::Cryptography => "cryptography",
            Topic::Forensics => "forensics",
            Topic::Malware => "malware",
            Topic::Cybersecurity => "cybersecurity",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known [`Topic`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic: {0:?}")]
pub struct UnknownTopic(pub String);

impl std::str::FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        Topic::ALL
            .into_iter()
            .find(|topic| topic.as_str() == normalized)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}
