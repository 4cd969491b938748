use super::pattern::Pattern;
use crate::error::EraseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of supported erase standards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardId {
    #[serde(rename = "BSI_VS_A")]
    BsiVsA,
    #[serde(rename = "NIST_800_88")]
    Nist80088,
    #[serde(rename = "DOD_5220_22_M")]
    Dod522022M,
}

impl StandardId {
    pub const ALL: [StandardId; 3] = [StandardId::BsiVsA, StandardId::Nist80088, StandardId::Dod522022M];

    pub fn as_str(&self) -> &'static str {
        match self {
            StandardId::BsiVsA => "BSI_VS_A",
            StandardId::Nist80088 => "NIST_800_88",
            StandardId::Dod522022M => "DOD_5220_22_M",
        }
    }

    pub fn definition(&self) -> &'static StandardDefinition {
        match self {
            StandardId::BsiVsA => &CATALOG[0],
            StandardId::Nist80088 => &CATALOG[1],
            StandardId::Dod522022M => &CATALOG[2],
        }
    }
}

impl fmt::Display for StandardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StandardId {
    type Err = EraseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        StandardId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EraseError::UnknownStandard(wanted.to_string()))
    }
}

/// One entry of a standard's step list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Overwrite the whole device with a pattern
    Write(Pattern),
    /// Marker only: a read-back follows the writes. Never a pass by itself.
    Verify,
}

/// Immutable description of an erase standard
#[derive(Debug, Serialize)]
pub struct StandardDefinition {
    pub id: StandardId,
    pub name: &'static str,
    pub steps: &'static [Step],
    /// Read back the last written pattern when it is verifiable
    pub verify: bool,
    pub description: &'static str,
    pub mandatory_for: &'static str,
    pub requirements: &'static [&'static str],
    pub explanation: &'static str,
}

impl StandardDefinition {
    /// Patterns that are actually written, in order
    pub fn write_patterns(&self) -> impl Iterator<Item = Pattern> + '_ {
        self.steps.iter().filter_map(|step| match step {
            Step::Write(pattern) => Some(*pattern),
            Step::Verify => None,
        })
    }

    pub fn write_pass_count(&self) -> usize {
        self.write_patterns().count()
    }

    /// Pattern a verification would compare against: the last one written
    pub fn verification_target(&self) -> Option<Pattern> {
        self.write_patterns().last()
    }
}

/// Look up a standard by its textual identifier
pub fn definition(id: &str) -> Result<&'static StandardDefinition, EraseError> {
    id.parse::<StandardId>().map(|id| id.definition())
}

pub static CATALOG: [StandardDefinition; 3] = [
    StandardDefinition {
        id: StandardId::BsiVsA,
        name: "BSI VS-A (Verschlusssache - Allgemein)",
        steps: &[
            Step::Write(Pattern::Zeros),
            Step::Write(Pattern::Ones),
            Step::Write(Pattern::Random),
        ],
        verify: true,
        description: "German standard for data classified VS-A",
        mandatory_for: "GDPR personal data (recommended)",
        requirements: &[
            "Pass 1: overwrite with a fixed bit pattern (zeros)",
            "Pass 2: overwrite with the complement of pass 1 (ones)",
            "Pass 3: overwrite with a random bit pattern",
            "Verification: the last write should be checked (recommended for VS-A)",
        ],
        explanation: "Data is overwritten three times: zeros, then ones, then random bytes.",
    },
    StandardDefinition {
        id: StandardId::Nist80088,
        name: "NIST SP 800-88 Rev. 1 - Clear",
        steps: &[Step::Write(Pattern::Zeros)],
        verify: true,
        description: "US standard for unclassified data",
        mandatory_for: "GDPR minimum requirement (acceptable)",
        requirements: &[
            "Pass 1: overwrite every addressable location with a fixed value (zeros)",
            "Verification: a full or sampled read-back of the overwrite is recommended",
        ],
        explanation: "Every byte is overwritten once with zeros and then read back.",
    },
    StandardDefinition {
        id: StandardId::Dod522022M,
        name: "DoD 5220.22-M (7-Pass)",
        steps: &[
            Step::Write(Pattern::Zeros),
            Step::Write(Pattern::Ones),
            Step::Write(Pattern::Random),
            Step::Write(Pattern::Zeros),
            Step::Write(Pattern::Ones),
            Step::Write(Pattern::Random),
            Step::Verify,
        ],
        verify: true,
        description: "US military standard (superseded, still frequently requested)",
        mandatory_for: "Highest security requirements",
        requirements: &[
            "Pass 1: overwrite with a fixed bit pattern (zeros)",
            "Pass 2: overwrite with the complement (ones)",
            "Pass 3: overwrite with a random bit pattern",
            "Pass 4: overwrite with another fixed bit pattern",
            "Pass 5: overwrite with the complement of pass 4",
            "Pass 6: overwrite with another random bit pattern",
            "Pass 7: verify the last write",
        ],
        explanation: "Six alternating fixed and random overwrites followed by a verification step.",
    },
];
