use std::io::Write;

use clavier_core::model::{Choice, Perk, Role};
use clavier_core::scoring::STAGE_MAX;
use services::{GameService, QuestionView, SessionState};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Answer(Choice),
    Perk,
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if let Ok(choice) = line.parse::<Choice>() {
        return Input::Answer(choice);
    }
    match line.to_ascii_lowercase().as_str() {
        "perk" | "joker" | "p" => Input::Perk,
        "quit" | "exit" | "q" => Input::Quit,
        _ => Input::Unknown,
    }
}

/// Plays `state` interactively until completion, `quit` or end of input.
pub async fn run(game: &GameService, mut state: SessionState) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        render(&state);
        if state.completed {
            println!("Partie terminée ! Score final : {}", state.score);
            return Ok(());
        }
        let Some(question) = state.current_question.clone() else {
            println!("Aucune question disponible pour cette étape.");
            return Ok(());
        };

        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };

        match parse_input(&line) {
            Input::Answer(choice) => {
                let next = game
                    .submit_answer(state.session_id, question.id, choice)
                    .await?;
                if choice == question.correct_choice {
                    println!("Bonne réponse ! (+{})", next.score.saturating_sub(state.score));
                } else {
                    println!(
                        "Mauvaise réponse. La bonne réponse était {}.",
                        question.correct_choice
                    );
                }
                state = next;
            }
            Input::Perk => state = use_perk(game, state, &question).await?,
            Input::Quit => {
                println!("Partie sauvegardée. Reprenez-la avec `clavier resume`.");
                return Ok(());
            }
            Input::Unknown => println!("Entrez a, b, c, d, perk ou quit."),
        }
    }
}

async fn use_perk(
    game: &GameService,
    mut state: SessionState,
    question: &QuestionView,
) -> anyhow::Result<SessionState> {
    let perk = state.role.perk();
    if state.perk_used() {
        println!("{} déjà utilisé.", perk.label());
        return Ok(state);
    }

    match state.role {
        Role::Front => {
            state = game
                .use_front_joker(state.session_id, Some(question.id))
                .await?;
        }
        Role::Back => {
            let before = state.score;
            state = game.use_back_joker(state.session_id).await?;
            if state.score == before {
                println!("Rattrapage sans effet : la dernière réponse n'était pas fausse.");
            }
        }
        Role::Mobile => {
            let outcome = game.use_mobile_joker(state.session_id).await?;
            println!("Indice : {outcome}");
            state.perks.mark_used(Perk::Hint);
        }
    }
    Ok(state)
}

fn render(state: &SessionState) {
    println!();
    println!(
        "{} ({}) | Étape {}/{STAGE_MAX} : {} | Score {} | Série {} | Précision {:.0}%",
        state.player_name,
        state.role,
        state.stage,
        state.stage_label(),
        state.score,
        state.streak,
        state.accuracy(),
    );

    let perk = state.role.perk();
    let status = if state.perk_used() { "utilisé" } else { "disponible" };
    println!("Joker {} ({status}) : {}", perk.action_label(), perk.description());

    if let Some(question) = state.current_question.as_ref().filter(|_| !state.completed) {
        println!();
        println!("{}", question.prompt);
        for (choice, text) in &question.choices {
            println!("  {}. {text}", choice.as_str().to_ascii_lowercase());
        }
    }
}
