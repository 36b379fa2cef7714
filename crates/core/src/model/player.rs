use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::PlayerId;

/// Longest accepted player name, in characters.
pub const MAX_NAME_LEN: usize = 120;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("player name cannot be empty")]
    EmptyName,

    #[error("player name is too long ({len} > {max} characters)")]
    NameTooLong { len: usize, max: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct RoleError(pub String);

//
// ─── ROLES & PERKS ─────────────────────────────────────────────────────────────
//

/// One-shot action a role may use once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Perk {
    /// Swap the displayed question for another one of the same stage.
    SkipQuestion,
    /// Recover points and streak after a wrong answer.
    CatchUp,
    /// Reveal the hint of the current question.
    Hint,
}

impl Perk {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Perk::SkipQuestion => "Changer de question",
            Perk::CatchUp => "Rattrapage automatique",
            Perk::Hint => "Indice",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Perk::SkipQuestion => "Passe à la question suivante une fois par partie.",
            Perk::CatchUp => "Annule une mauvaise réponse une fois par partie.",
            Perk::Hint => "Affiche un indice une fois par partie.",
        }
    }

    /// Short label for the button/command that triggers the perk.
    #[must_use]
    pub fn action_label(self) -> &'static str {
        match self {
            Perk::SkipQuestion => "Changer",
            Perk::CatchUp => "Rattrapage",
            Perk::Hint => "Indice",
        }
    }
}

impl fmt::Display for Perk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Capability variant picked by the player at game start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Front,
    Back,
    Mobile,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Front, Role::Back, Role::Mobile];

    /// The single perk granted by this role.
    #[must_use]
    pub fn perk(self) -> Perk {
        match self {
            Role::Front => Perk::SkipQuestion,
            Role::Back => Perk::CatchUp,
            Role::Mobile => Perk::Hint,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Role::Front => "Développeur Front",
            Role::Back => "Développeur Back",
            Role::Mobile => "Développeur Mobile",
        }
    }

    /// Stable storage key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Front => "front",
            Role::Back => "back",
            Role::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" => Ok(Role::Front),
            "back" => Ok(Role::Back),
            "mobile" => Ok(Role::Mobile),
            other => Err(RoleError(other.to_owned())),
        }
    }
}

//
// ─── PLAYER ────────────────────────────────────────────────────────────────────
//

/// Validates and normalizes a player name.
///
/// # Errors
///
/// Returns `PlayerError::EmptyName` for blank input and
/// `PlayerError::NameTooLong` past [`MAX_NAME_LEN`] characters.
pub fn normalize_name(raw: &str) -> Result<String, PlayerError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PlayerError::EmptyName);
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(PlayerError::NameTooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }
    Ok(name.to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    name: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl Player {
    /// Builds a player, normalizing the name.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if the name is blank or too long.
    pub fn new(
        id: PlayerId,
        name: impl AsRef<str>,
        role: Role,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PlayerError> {
        Ok(Self {
            id,
            name: normalize_name(name.as_ref())?,
            role,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }
}
