use serde::{Deserialize, Serialize};

/// A string that does not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: {value}")]
pub struct InvalidEnumValue {
    pub field: &'static str,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Wire names are the SCREAMING_CASE strings used in the JSON contract.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnumValue {
                        field: stringify!($name),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// Decision as produced by the model, before the confidence gate.
    ModelDecision {
        Approved => "APPROVED",
        Denied => "DENIED",
        NeedsInfo => "NEEDS_INFO",
    }
);

str_enum!(
    /// Decision recorded in the audit trail, after the confidence gate.
    FinalDecision {
        Approved => "APPROVED",
        Denied => "DENIED",
        PendingReview => "PENDING_REVIEW",
    }
);

str_enum!(
    /// Whether a run finished automatically or awaits a reviewer.
    ReviewStatus {
        Completed => "COMPLETED",
        PendingHumanReview => "PENDING_HUMAN_REVIEW",
    }
);

impl ModelDecision {
    /// Lenient lookup for model output: trims, ignores case, and accepts
    /// `NEEDS INFO` / `NEEDS-INFO` spellings.
    pub fn from_model_text(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        normalized.parse().ok()
    }
}

impl FinalDecision {
    /// The review status implied by this decision. Status is never chosen
    /// independently of the decision.
    pub fn status(self) -> ReviewStatus {
        match self {
            Self::PendingReview => ReviewStatus::PendingHumanReview,
            Self::Approved | Self::Denied => ReviewStatus::Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_decision_round_trips_wire_names() {
        for (variant, wire) in [
            (ModelDecision::Approved, "APPROVED"),
            (ModelDecision::Denied, "DENIED"),
            (ModelDecision::NeedsInfo, "NEEDS_INFO"),
        ] {
            assert_eq!(variant.as_str(), wire);
            assert_eq!(wire.parse::<ModelDecision>().unwrap(), variant);
            assert_eq!(serde_json::to_string(&variant).unwrap(), format!("\"{wire}\""));
        }
    }

    #[test]
    fn unknown_value_is_rejected() {
        let err = "MAYBE".parse::<ModelDecision>().unwrap_err();
        assert_eq!(err.field, "ModelDecision");
        assert_eq!(err.value, "MAYBE");
    }

    #[test]
    fn from_model_text_is_lenient() {
        assert_eq!(ModelDecision::from_model_text(" approved "), Some(ModelDecision::Approved));
        assert_eq!(ModelDecision::from_model_text("Needs Info"), Some(ModelDecision::NeedsInfo));
        assert_eq!(ModelDecision::from_model_text("needs-info"), Some(ModelDecision::NeedsInfo));
        assert_eq!(ModelDecision::from_model_text("perhaps"), None);
    }

    #[test]
    fn pending_review_implies_human_review_status() {
        assert_eq!(FinalDecision::PendingReview.status(), ReviewStatus::PendingHumanReview);
        assert_eq!(FinalDecision::Approved.status(), ReviewStatus::Completed);
        assert_eq!(FinalDecision::Denied.status(), ReviewStatus::Completed);
    }

    #[test]
    fn review_status_serializes_screaming_case() {
        let json = serde_json::to_string(&ReviewStatus::PendingHumanReview).unwrap();
        assert_eq!(json, "\"PENDING_HUMAN_REVIEW\"");
    }
}
