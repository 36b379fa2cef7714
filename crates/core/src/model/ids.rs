use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a string.
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

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying row id.
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
                    .map($name::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

row_id!(
    /// Unique identifier for a player.
    PlayerId
);
row_id!(
    /// Unique identifier for a game session.
    SessionId
);
row_id!(
    /// Unique identifier for a catalog question.
    QuestionId
);
row_id!(
    /// Unique identifier for an answer log row.
    AnswerLogId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_display_and_parse() {
        let id = SessionId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<SessionId>().unwrap(), id);
    }

    #[test]
    fn question_id_rejects_garbage() {
        let err = "not-a-number".parse::<QuestionId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse QuestionId from string");
    }

    #[test]
    fn debug_names_the_kind() {
        assert_eq!(format!("{:?}", PlayerId::new(7)), "PlayerId(7)");
    }
}
