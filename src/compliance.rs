// Compliance assessment
//
// Compares what a session actually did with what its standard asks for.
// Pure function of the session's facts; no I/O.

use crate::algorithms::StandardDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the device was erased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EraseMethod {
    /// Pass executor on the raw device
    Direct,
    /// External whole-disk utility (single zero pass, no read-back)
    Fallback,
    /// Nothing was written
    None,
}

impl fmt::Display for EraseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EraseMethod::Direct => write!(f, "direct"),
            EraseMethod::Fallback => write!(f, "fallback"),
            EraseMethod::None => write!(f, "none"),
        }
    }
}

/// Result of the read-back step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Passed,
    Failed { offset: Option<u64> },
    /// Last pattern was random; there is nothing to compare against
    Skipped,
    NotRequested,
    NotPerformed,
}

impl VerificationOutcome {
    fn acceptable(&self) -> bool {
        matches!(
            self,
            VerificationOutcome::Passed | VerificationOutcome::Skipped | VerificationOutcome::NotRequested
        )
    }

    fn performed(&self) -> bool {
        matches!(self, VerificationOutcome::Passed | VerificationOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conformity {
    Full,
    Partial,
    NotConformant,
}

impl fmt::Display for Conformity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conformity::Full => write!(f, "fully conformant"),
            Conformity::Partial => write!(f, "partially conformant"),
            Conformity::NotConformant => write!(f, "not conformant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceAssessment {
    pub conformity: Conformity,
    pub required_passes: usize,
    pub executed_passes: usize,
    pub verification_required: bool,
    pub verification_performed: bool,
    pub summary: String,
}

/// Facts about a finished session needed for the assessment
#[derive(Debug, Clone, Copy)]
pub struct SessionFacts {
    pub method: EraseMethod,
    pub passes_completed: usize,
    pub verification: VerificationOutcome,
    /// Session ended erased (not failed or cancelled)
    pub erased: bool,
}

pub fn assess(standard: &StandardDefinition, facts: &SessionFacts) -> ComplianceAssessment {
    let required = standard.write_pass_count();
    let executed = match facts.method {
        // The utility performs one zeroing pass
        EraseMethod::Fallback if facts.erased => 1,
        EraseMethod::Fallback | EraseMethod::None => 0,
        EraseMethod::Direct => facts.passes_completed,
    };

    let (conformity, summary) = if !facts.erased {
        (
            Conformity::NotConformant,
            format!(
                "Session did not complete; {} of {} required passes were executed.",
                executed, required
            ),
        )
    } else {
        match facts.method {
            EraseMethod::Direct if executed >= required && facts.verification.acceptable() => (
                Conformity::Full,
                format!(
                    "All {} passes of {} were executed directly on the device{}.",
                    required,
                    standard.name,
                    match facts.verification {
                        VerificationOutcome::Passed => " and the final pass was verified",
                        VerificationOutcome::Skipped => "; the final random pass cannot be verified",
                        _ => "",
                    }
                ),
            ),
            EraseMethod::Direct => (
                Conformity::NotConformant,
                format!(
                    "{} of {} passes executed; verification did not confirm the final pass.",
                    executed, required
                ),
            ),
            EraseMethod::Fallback if required > 1 => (
                Conformity::Partial,
                format!(
                    "The external utility performs a single zero pass, the first of {} passes required by {}. \
                     Multi-pass erasure needs direct device access.",
                    required, standard.name
                ),
            ),
            EraseMethod::Fallback => (
                Conformity::Partial,
                format!(
                    "The external utility overwrote the device once with zeros as {} requires, \
                     but no read-back verification was performed.",
                    standard.name
                ),
            ),
            EraseMethod::None => (Conformity::NotConformant, "No data was overwritten.".to_string()),
        }
    };

    ComplianceAssessment {
        conformity,
        required_passes: required,
        executed_passes: executed,
        verification_required: standard.verify,
        verification_performed: facts.verification.performed(),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::StandardId;
    use test_case::test_case;

    fn facts(method: EraseMethod, passes: usize, verification: VerificationOutcome, erased: bool) -> SessionFacts {
        SessionFacts {
            method,
            passes_completed: passes,
            verification,
            erased,
        }
    }

    #[test]
    fn test_direct_nist_with_passing_verification_is_full() {
        let result = assess(
            StandardId::Nist80088.definition(),
            &facts(EraseMethod::Direct, 1, VerificationOutcome::Passed, true),
        );
        assert_eq!(result.conformity, Conformity::Full);
        assert!(result.verification_performed);
    }

    #[test]
    fn test_direct_with_skipped_random_verification_is_full() {
        let result = assess(
            StandardId::BsiVsA.definition(),
            &facts(EraseMethod::Direct, 3, VerificationOutcome::Skipped, true),
        );
        assert_eq!(result.conformity, Conformity::Full);
        assert!(!result.verification_performed);
    }

    #[test_case(StandardId::BsiVsA ; "bsi")]
    #[test_case(StandardId::Dod522022M ; "dod")]
    #[test_case(StandardId::Nist80088 ; "nist")]
    fn test_fallback_is_partial(id: StandardId) {
        let result = assess(
            id.definition(),
            &facts(EraseMethod::Fallback, 0, VerificationOutcome::NotPerformed, true),
        );
        assert_eq!(result.conformity, Conformity::Partial);
        assert_eq!(result.executed_passes, 1);
    }

    #[test]
    fn test_failed_session_is_not_conformant() {
        let result = assess(
            StandardId::Dod522022M.definition(),
            &facts(EraseMethod::Direct, 3, VerificationOutcome::NotPerformed, false),
        );
        assert_eq!(result.conformity, Conformity::NotConformant);
        assert_eq!(result.executed_passes, 3);
        assert_eq!(result.required_passes, 6);
    }

    #[test]
    fn test_verification_failure_is_not_conformant() {
        let result = assess(
            StandardId::Nist80088.definition(),
            &facts(EraseMethod::Direct, 1, VerificationOutcome::Failed { offset: Some(7) }, true),
        );
        assert_eq!(result.conformity, Conformity::NotConformant);
        assert!(result.verification_performed);
    }

    #[test]
    fn test_verification_outcome_serialization() {
        let json = serde_json::to_value(VerificationOutcome::Failed { offset: Some(42) }).unwrap();
        assert_eq!(json["result"], "failed");
        assert_eq!(json["offset"], 42);
    }
}
