use serde::Serialize;

use crate::models::McqData;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryRole {
    User,
    Model,
    /// Local UI notice (errors, soft-blocks). Never replayed as history.
    Notice,
}

/// One rendered row of the chat thread. Message content is immutable once
/// appended; only the quiz selection state attached to an entry changes.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatEntry {
    pub id: usize,
    pub role: EntryRole,
    pub content: String,
    pub quiz: Vec<QuizCard>,
    pub graph_expressions: Vec<String>,
}

/// A prior turn as the chat API expects it.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct HistoryTurn {
    pub role: &'static str,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuizCard {
    pub data: McqData,
    pub selected: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QuizOutcome {
    Correct,
    Incorrect {
        correct_answer: String,
        explanation: Option<String>,
    },
}

impl QuizCard {
    pub fn new(data: McqData) -> Self {
        Self { data, selected: None }
    }

    pub fn is_answered(&self) -> bool {
        self.selected.is_some()
    }

    /// Records the student's pick. An incorrect pick reveals the stored
    /// correct answer and explanation.
    pub fn answer(&mut self, choice: &str) -> QuizOutcome {
        self.selected = Some(choice.to_string());
        if choice == self.data.correct_answer {
            QuizOutcome::Correct
        } else {
            QuizOutcome::Incorrect {
                correct_answer: self.data.correct_answer.clone(),
                explanation: self.data.explanation.clone(),
            }
        }
    }

    pub fn outcome(&self) -> Option<QuizOutcome> {
        let selected = self.selected.as_deref()?;
        if selected == self.data.correct_answer {
            Some(QuizOutcome::Correct)
        } else {
            Some(QuizOutcome::Incorrect {
                correct_answer: self.data.correct_answer.clone(),
                explanation: self.data.explanation.clone(),
            })
        }
    }
}

/// Append-only, chronologically ordered chat log. The user's turn is appended
/// before the network call goes out; the model's (or an error notice) after
/// it resolves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    entries: Vec<ChatEntry>,
    next_id: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push_user(&mut self, content: String) -> usize {
        self.push(EntryRole::User, content, Vec::new(), Vec::new())
    }

    pub fn push_model(
        &mut self,
        content: String,
        mcqs: Vec<McqData>,
        graph_expressions: Vec<String>,
    ) -> usize {
        let quiz = mcqs.into_iter().map(QuizCard::new).collect();
        self.push(EntryRole::Model, content, quiz, graph_expressions)
    }

    pub fn push_notice(&mut self, content: String) -> usize {
        self.push(EntryRole::Notice, content, Vec::new(), Vec::new())
    }

    fn push(
        &mut self,
        role: EntryRole,
        content: String,
        quiz: Vec<QuizCard>,
        graph_expressions: Vec<String>,
    ) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(ChatEntry { id, role, content, quiz, graph_expressions });
        id
    }

    /// Answers option `choice` on quiz card `card` of entry `entry_id`.
    pub fn answer_quiz(&mut self, entry_id: usize, card: usize, choice: &str) -> Option<QuizOutcome> {
        let entry = self.entries.iter_mut().find(|e| e.id == entry_id)?;
        let card = entry.quiz.get_mut(card)?;
        if card.is_answered() {
            return card.outcome();
        }
        Some(card.answer(choice))
    }

    /// Prior turns for the chat API. Notices are local-only and skipped, so a
    /// transcript built through push_user/push_model replays as a strictly
    /// alternating user/model sequence.
    pub fn to_history(&self) -> Vec<HistoryTurn> {
        self.entries
            .iter()
            .filter_map(|e| match e.role {
                EntryRole::User => Some(HistoryTurn { role: "user", content: e.content.clone() }),
                EntryRole::Model => Some(HistoryTurn { role: "model", content: e.content.clone() }),
                EntryRole::Notice => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq() -> McqData {
        McqData {
            question: "1/2 + 1/4 = ?".into(),
            options: vec!["A".into(), "B".into(), "C".into()],
            correct_answer: "B".into(),
            explanation: Some("Use a common denominator.".into()),
        }
    }

    #[test]
    fn user_turn_is_visible_before_the_reply_arrives() {
        let mut t = Transcript::new();
        t.push_user("plot y=x^2".into());
        assert_eq!(t.entries().len(), 1);
        assert_eq!(t.entries()[0].role, EntryRole::User);

        t.push_model("done".into(), Vec::new(), vec!["y=x^2".into()]);
        assert_eq!(t.entries().len(), 2);
        assert_eq!(t.entries()[1].graph_expressions, vec!["y=x^2".to_string()]);
    }

    #[test]
    fn history_alternates_and_skips_notices() {
        let mut t = Transcript::new();
        t.push_user("hi".into());
        t.push_model("hello".into(), Vec::new(), Vec::new());
        t.push_notice("Model request failed. Try again.".into());
        t.push_user("again".into());
        t.push_model("sure".into(), Vec::new(), Vec::new());

        let history = t.to_history();
        let roles: Vec<_> = history.iter().map(|h| h.role).collect();
        assert_eq!(roles, vec!["user", "model", "user", "model"]);
    }

    #[test]
    fn correct_selection_is_correct() {
        let mut card = QuizCard::new(mcq());
        assert_eq!(card.answer("B"), QuizOutcome::Correct);
        assert!(card.is_answered());
    }

    #[test]
    fn incorrect_selection_reveals_answer_and_explanation() {
        let mut card = QuizCard::new(mcq());
        let outcome = card.answer("A");
        assert_eq!(
            outcome,
            QuizOutcome::Incorrect {
                correct_answer: "B".into(),
                explanation: Some("Use a common denominator.".into()),
            }
        );
    }

    #[test]
    fn first_answer_sticks() {
        let mut t = Transcript::new();
        let entry = t.push_model("quiz time".into(), vec![mcq()], Vec::new());

        let first = t.answer_quiz(entry, 0, "A").unwrap();
        assert!(matches!(first, QuizOutcome::Incorrect { .. }));

        // A second click does not overwrite the recorded selection.
        let second = t.answer_quiz(entry, 0, "B").unwrap();
        assert!(matches!(second, QuizOutcome::Incorrect { .. }));
        assert_eq!(t.entries()[0].quiz[0].selected.as_deref(), Some("A"));
    }

    #[test]
    fn answering_a_missing_card_is_a_no_op() {
        let mut t = Transcript::new();
        assert_eq!(t.answer_quiz(99, 0, "A"), None);
    }

    #[test]
    fn two_question_scenario_marks_each_independently() {
        let mut t = Transcript::new();
        let second_mcq = McqData {
            question: "Which is larger?".into(),
            options: vec!["1/3".into(), "1/4".into()],
            correct_answer: "1/3".into(),
            explanation: None,
        };
        let entry = t.push_model("two questions".into(), vec![mcq(), second_mcq], Vec::new());

        assert_eq!(t.answer_quiz(entry, 0, "B").unwrap(), QuizOutcome::Correct);
        assert!(matches!(
            t.answer_quiz(entry, 1, "1/4").unwrap(),
            QuizOutcome::Incorrect { .. }
        ));
    }
}
