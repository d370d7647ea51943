//! Builds the system instruction and the augmented user message for a chat
//! turn. Tag detection is case-insensitive substring matching against fixed
//! trigger sets; each elaboration block is independently gated and appended
//! in a fixed order (graph, then quiz, then canvas-only, then document).

const CANVAS_TAG: &str = "@canvas";

const GRAPH_TRIGGERS: &[&str] = &[
    "@graph",
    "graph",
    "plot",
    "equation",
    "function",
    "sine wave",
    "linear function",
    "quadratic",
    "trigonometric",
];

const QUIZ_TRIGGERS: &[&str] = &["@mcq", "generate mcqs"];

/// Tutor persona plus the two structured-output fence shapes the extractor
/// looks for. Sent as the model's system instruction on every request.
pub const SYSTEM_PROMPT: &str = "You are Studypad, a patient and encouraging AI tutor. \
Explain concepts step by step, check the student's understanding, and keep answers \
focused on the question asked. Use plain language and concrete examples.\n\
\n\
When the student asks you to graph or plot something, include exactly one fenced code \
block tagged `json` containing an object of the form \
{\"desmos_expressions\": [\"y=x^2\"], \"description\": \"...\"} where each expression \
uses Desmos calculator syntax. Keep the rest of your explanation outside the fence.\n\
\n\
When the student asks for multiple-choice questions, include exactly one fenced code \
block tagged `json` containing an object of the form \
{\"mcqs\": [{\"question\": \"...\", \"options\": [\"...\"], \"correctAnswer\": \"...\", \
\"explanation\": \"...\"}]} where every correctAnswer is copied verbatim from its \
options list.";

const GRAPH_INSTRUCTION: &str = "\n\nThe student is asking about something plottable. \
Include the `desmos_expressions` JSON fence described in your instructions with every \
expression needed to illustrate your answer.";

const QUIZ_INSTRUCTION: &str = "\n\nThe student is asking for practice questions. \
Include the `mcqs` JSON fence described in your instructions with the requested \
questions, each with three to four options and a short explanation.";

const CANVAS_INSTRUCTION: &str = "\n\nThe student has attached a snapshot of their \
drawing canvas. Look at the drawing carefully, describe what you see, and work through \
the problem it shows. If the work contains a mistake, point to the exact step where it \
goes wrong before correcting it.";

const DOCUMENT_INSTRUCTION: &str = "\n\nThe student has attached a document. Summarize \
it briefly, list the key points, and extract any formulas or definitions worth \
remembering. Answer the student's question with reference to the document content.";

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    pub system_instruction: String,
    pub message: String,
}

pub fn wants_canvas(message: &str) -> bool {
    message.to_lowercase().contains(CANVAS_TAG)
}

pub fn wants_graph(message: &str) -> bool {
    let lower = message.to_lowercase();
    GRAPH_TRIGGERS.iter().any(|t| lower.contains(t))
}

pub fn wants_quiz(message: &str) -> bool {
    let lower = message.to_lowercase();
    QUIZ_TRIGGERS.iter().any(|t| lower.contains(t))
}

/// Augments the raw user message. `has_canvas` is whether a canvas snapshot
/// accompanies this turn, `has_document` whether a non-image attachment (or
/// its extracted text) does.
pub fn compose(message: &str, has_canvas: bool, has_document: bool) -> ComposedPrompt {
    let mut augmented = message.to_string();

    if wants_graph(message) {
        augmented.push_str(GRAPH_INSTRUCTION);
    }
    if wants_quiz(message) {
        augmented.push_str(QUIZ_INSTRUCTION);
    }
    // The canvas branch takes a distinct narrative instruction, but only when
    // the turn is not also asking for a graph.
    if has_canvas && wants_canvas(message) && !wants_graph(message) {
        augmented.push_str(CANVAS_INSTRUCTION);
    }
    if has_document {
        augmented.push_str(DOCUMENT_INSTRUCTION);
    }

    ComposedPrompt {
        system_instruction: SYSTEM_PROMPT.to_string(),
        message: augmented,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_triggers_are_case_insensitive_substrings() {
        assert!(wants_graph("@graph y=x"));
        assert!(wants_graph("Plot a SINE WAVE for me"));
        assert!(wants_graph("what does a quadratic look like"));
        assert!(wants_graph("explain this Function"));
        assert!(!wants_graph("help me with fractions"));
    }

    #[test]
    fn quiz_triggers() {
        assert!(wants_quiz("@mcq on photosynthesis"));
        assert!(wants_quiz("please Generate MCQs about WW2"));
        assert!(!wants_quiz("what is an mc escher drawing"));
    }

    #[test]
    fn canvas_tag_detection() {
        assert!(wants_canvas("look at my work @canvas"));
        assert!(wants_canvas("@CANVAS"));
        assert!(!wants_canvas("canvas painting history"));
    }

    #[test]
    fn plain_message_is_unchanged() {
        let p = compose("what is a prime number", false, false);
        assert_eq!(p.message, "what is a prime number");
        assert_eq!(p.system_instruction, SYSTEM_PROMPT);
    }

    #[test]
    fn graph_request_appends_graph_instruction() {
        let p = compose("@graph plot y=x^2", false, false);
        assert!(p.message.starts_with("@graph plot y=x^2"));
        assert!(p.message.contains("desmos_expressions"));
    }

    #[test]
    fn canvas_instruction_only_without_graph() {
        let p = compose("@canvas check my work", true, false);
        assert!(p.message.contains("drawing canvas"));

        // Canvas plus graph takes the graph branch only.
        let p = compose("@canvas @graph plot this", true, false);
        assert!(p.message.contains("desmos_expressions"));
        assert!(!p.message.contains("drawing canvas"));
    }

    #[test]
    fn canvas_instruction_requires_a_snapshot() {
        let p = compose("@canvas check my work", false, false);
        assert!(!p.message.contains("drawing canvas"));
    }

    #[test]
    fn quiz_request_appends_quiz_instruction() {
        let p = compose("@mcq quiz me on fractions", false, false);
        assert!(p.message.contains("practice questions"));
    }

    #[test]
    fn document_instruction_is_independent() {
        let p = compose("summarize this", false, true);
        assert!(p.message.contains("attached a document"));
    }

    #[test]
    fn blocks_append_in_fixed_order() {
        let p = compose("plot the equation in this file", true, true);
        let graph_at = p.message.find("plottable").unwrap();
        let doc_at = p.message.find("attached a document").unwrap();
        assert!(graph_at < doc_at);
    }
}
