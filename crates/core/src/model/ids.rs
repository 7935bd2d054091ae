use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an id from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

/// Integer id as issued by the quiz backend; serialized as a bare number.
macro_rules! backend_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

backend_id!(
    /// A subject such as "Python Programming".
    SubjectId
);
backend_id!(
    /// A level within a subject.
    LevelId
);
backend_id!(
    /// A quiz served outside the subject/level tree.
    QuizId
);
backend_id!(
    /// A question, unique within its quiz.
    QuestionId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_id_display() {
        let id = SubjectId::new(4);
        assert_eq!(id.to_string(), "4");
    }

    #[test]
    fn test_level_id_from_str() {
        let id: LevelId = "12".parse().unwrap();
        assert_eq!(id, LevelId::new(12));
    }

    #[test]
    fn test_quiz_id_from_str_invalid() {
        let result = "quiz-7".parse::<QuizId>();
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "failed to parse QuizId from string"
        );
    }

    #[test]
    fn test_question_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&QuestionId::new(3)).unwrap();
        assert_eq!(json, "3");
    }

    #[test]
    fn test_from_str_trims_whitespace() {
        assert_eq!(" 5 ".parse::<SubjectId>(), Ok(SubjectId::new(5)));
        assert_eq!(
            "".parse::<QuestionId>().unwrap_err().to_string(),
            "failed to parse QuestionId from string"
        );
    }

    #[test]
    fn test_debug_names_the_kind() {
        assert_eq!(format!("{:?}", QuizId::new(9)), "QuizId(9)");
    }
}
