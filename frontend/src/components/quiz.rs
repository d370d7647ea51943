use leptos::prelude::*;

use crate::state::AppState;
use crate::transcript::{QuizCard, QuizOutcome};

/// One selectable multiple-choice question card. Selection state lives on the
/// transcript entry, keyed by entry id and card index.
#[component]
pub fn QuizCardView(entry_id: usize, card_index: usize) -> impl IntoView {
    let state = expect_context::<AppState>();

    let card = move || -> Option<QuizCard> {
        state
            .transcript
            .get()
            .entries()
            .iter()
            .find(|e| e.id == entry_id)
            .and_then(|e| e.quiz.get(card_index).cloned())
    };

    view! {
        {move || {
            card().map(|card| {
                let question = card.data.question.clone();
                let options = card.data.options.clone();
                let outcome = card.outcome();
                let answered = card.is_answered();
                let selected = card.selected.clone();
                let correct_answer = card.data.correct_answer.clone();

                view! {
                    <div class="quiz-card">
                        <div class="quiz-question">{question}</div>
                        <div class="quiz-options">
                            {options
                                .into_iter()
                                .map(|option| {
                                    let choice = option.clone();
                                    let css_class = option_class(
                                        &option,
                                        selected.as_deref(),
                                        &correct_answer,
                                        answered,
                                    );
                                    view! {
                                        <button
                                            class=css_class
                                            disabled=answered
                                            on:click=move |_| {
                                                state.set_transcript.update(|t| {
                                                    t.answer_quiz(entry_id, card_index, &choice);
                                                });
                                            }
                                        >
                                            {option}
                                        </button>
                                    }
                                })
                                .collect_view()}
                        </div>
                        {outcome
                            .map(|outcome| match outcome {
                                QuizOutcome::Correct => view! {
                                    <div class="quiz-result correct">"Correct!"</div>
                                }.into_any(),
                                QuizOutcome::Incorrect { correct_answer, explanation } => view! {
                                    <div class="quiz-result incorrect">
                                        {format!("Not quite. The answer is {correct_answer}.")}
                                        {explanation.map(|why| view! {
                                            <div class="quiz-explanation">{why}</div>
                                        })}
                                    </div>
                                }.into_any(),
                            })}
                    </div>
                }
            })
        }}
    }
}

/// Reveal styling after an answer: the correct option is highlighted, a wrong
/// pick is marked, the rest stay neutral.
fn option_class(
    option: &str,
    selected: Option<&str>,
    correct_answer: &str,
    answered: bool,
) -> &'static str {
    if !answered {
        return "quiz-option";
    }
    if option == correct_answer {
        "quiz-option correct"
    } else if Some(option) == selected {
        "quiz-option incorrect"
    } else {
        "quiz-option"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_neutral_until_answered() {
        assert_eq!(option_class("A", None, "B", false), "quiz-option");
    }

    #[test]
    fn reveal_marks_correct_and_picked_options() {
        assert_eq!(option_class("B", Some("A"), "B", true), "quiz-option correct");
        assert_eq!(option_class("A", Some("A"), "B", true), "quiz-option incorrect");
        assert_eq!(option_class("C", Some("A"), "B", true), "quiz-option");
    }
}
