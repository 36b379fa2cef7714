//! Built-in question catalog and the idempotent seeding step.

use clavier_core::model::{Choice, QuestionDraft, QuestionError};
use thiserror::Error;

use crate::repository::{QuestionRepository, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error("invalid catalog entry {index}: {source}")]
    InvalidEntry {
        index: usize,
        #[source]
        source: QuestionError,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One catalog entry as authored.
#[derive(Debug, Clone, Copy)]
pub struct SeedQuestion {
    pub prompt: &'static str,
    pub choices: [&'static str; 4],
    pub correct: Choice,
    pub stage: u8,
    pub hint: &'static str,
}

impl SeedQuestion {
    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            prompt: self.prompt.to_owned(),
            choices: self.choices.map(str::to_owned),
            correct_choice: self.correct,
            stage: self.stage,
            hint: self.hint.to_owned(),
        }
    }
}

pub const CATALOG: &[SeedQuestion] = &[
    SeedQuestion {
        prompt: "Quel est le résultat de 2 ** 3 en Python ?",
        choices: ["6", "8", "9", "12"],
        correct: Choice::B,
        stage: 1,
        hint: "L'opérateur ** signifie puissance.",
    },
    SeedQuestion {
        prompt: "Quelle commande Git permet de lister les branches locales ?",
        choices: ["git status", "git branch", "git log", "git checkout"],
        correct: Choice::B,
        stage: 1,
        hint: "C'est la commande la plus courte de la liste.",
    },
    SeedQuestion {
        prompt: "Quel langage est utilisé pour écrire des styles web modernes ?",
        choices: ["HTML", "CSS", "SQL", "Bash"],
        correct: Choice::B,
        stage: 1,
        hint: "Il contrôle les couleurs, tailles et dispositions.",
    },
    SeedQuestion {
        prompt: "Quel protocole est utilisé par défaut pour sécuriser HTTP ?",
        choices: ["FTP", "SSH", "HTTPS", "SMTP"],
        correct: Choice::C,
        stage: 2,
        hint: "Ajoutez un 'S' à HTTP.",
    },
    SeedQuestion {
        prompt: "Quel langage est principalement utilisé pour le développement iOS natif ?",
        choices: ["Kotlin", "Swift", "Ruby", "Go"],
        correct: Choice::B,
        stage: 2,
        hint: "Un langage créé par Apple en 2014.",
    },
    SeedQuestion {
        prompt: "Quel outil est utilisé pour gérer des dépendances Python ?",
        choices: ["pip", "node", "docker", "gradle"],
        correct: Choice::A,
        stage: 2,
        hint: "Il s'exécute souvent avec 'install'.",
    },
    SeedQuestion {
        prompt: "Quel design pattern favorise une instance unique et globale ?",
        choices: ["Singleton", "Observer", "Strategy", "Decorator"],
        correct: Choice::A,
        stage: 3,
        hint: "Il signifie littéralement 'unique'.",
    },
    SeedQuestion {
        prompt: "Quelle méthode HTTP est utilisée pour créer une ressource ?",
        choices: ["GET", "POST", "DELETE", "PATCH"],
        correct: Choice::B,
        stage: 3,
        hint: "On l'utilise souvent pour envoyer un formulaire.",
    },
    SeedQuestion {
        prompt: "Quel est le principal avantage de l'indexation en base de données ?",
        choices: [
            "Augmenter la taille des tables",
            "Accélérer les recherches",
            "Empêcher les suppressions",
            "Chiffrer automatiquement les données",
        ],
        correct: Choice::B,
        stage: 3,
        hint: "Elle améliore la performance des requêtes.",
    },
    SeedQuestion {
        prompt: "Quel protocole permet la communication en temps réel via le web ?",
        choices: ["WebSocket", "Telnet", "IMAP", "POP3"],
        correct: Choice::A,
        stage: 4,
        hint: "Il commence par 'Web'.",
    },
    SeedQuestion {
        prompt: "Quelle architecture isole l'interface, la logique et les données ?",
        choices: ["MVC", "FTP", "REST", "CLI"],
        correct: Choice::A,
        stage: 4,
        hint: "Un acronyme en 3 lettres souvent enseigné.",
    },
];

/// Inserts [`CATALOG`] when the question table is empty.
///
/// Returns how many questions were inserted; 0 means the catalog was already there.
///
/// # Errors
///
/// Returns `SeedError` if an entry fails validation or storage fails.
pub async fn ensure_seeded(questions: &dyn QuestionRepository) -> Result<usize, SeedError> {
    seed_with(questions, CATALOG).await
}

/// Same as [`ensure_seeded`] with a caller-provided catalog.
///
/// # Errors
///
/// Returns `SeedError` if an entry fails validation or storage fails.
pub async fn seed_with(
    questions: &dyn QuestionRepository,
    catalog: &[SeedQuestion],
) -> Result<usize, SeedError> {
    if questions.has_questions().await? {
        tracing::debug!("question catalog already seeded");
        return Ok(0);
    }

    // Validate everything first so a bad entry leaves the table untouched.
    let validated = catalog
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry
                .to_draft()
                .validate()
                .map_err(|source| SeedError::InvalidEntry { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    questions.insert_questions(&validated).await?;

    tracing::info!(count = validated.len(), "seeded question catalog");
    Ok(validated.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use clavier_core::scoring::STAGE_MAX;

    #[test]
    fn catalog_covers_every_stage_twice() {
        for stage in 1..=STAGE_MAX {
            let count = CATALOG.iter().filter(|q| q.stage == stage).count();
            assert!(count >= 2, "stage {stage} has {count} questions");
        }
    }

    #[test]
    fn catalog_entries_validate() {
        for entry in CATALOG {
            entry.to_draft().validate().unwrap();
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let repo = InMemoryRepository::new();
        assert_eq!(ensure_seeded(&repo).await.unwrap(), CATALOG.len());
        assert_eq!(ensure_seeded(&repo).await.unwrap(), 0);
        assert_eq!(repo.list_questions().await.unwrap().len(), CATALOG.len());
    }

    #[tokio::test]
    async fn invalid_entry_inserts_nothing() {
        let repo = InMemoryRepository::new();
        let catalog = [
            CATALOG[0],
            SeedQuestion {
                stage: 9,
                ..CATALOG[1]
            },
        ];
        let err = seed_with(&repo, &catalog).await.unwrap_err();
        assert!(matches!(err, SeedError::InvalidEntry { index: 1, .. }));
        assert!(!repo.has_questions().await.unwrap());
    }
}
