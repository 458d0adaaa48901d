//! Prompt construction for relevance scoring

use super::scale::RelevanceLevel;
use super::RetrievalContext;
use crate::paper::Paper;

/// Build the scoring prompt for one (paper, concept) pair.
///
/// Context concepts are listed in the order given, most specific first; the
/// first entry is the concept being judged.
pub fn build_prompt(paper: &Paper, context: &RetrievalContext, max_excerpt_words: usize) -> String {
    let levels = RelevanceLevel::ALL
        .iter()
        .map(|l| format!("\"{}\"", l.label()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    prompt.push_str(
        "You assess whether a scientific paper is relevant to a concept from an \
         infectious disease ontology.\n\n",
    );

    prompt.push_str(&format!(
        "Target concept: {} ({})\n",
        context.target.display_label(),
        context.target.id
    ));

    prompt.push_str("Ontology context, most specific first:\n");
    for (i, concept) in context.concepts.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, concept.context_text()));
    }

    prompt.push_str(&format!("\nPaper title: {}\n", paper.title));
    prompt.push_str("Paper abstract:\n");
    prompt.push_str(&paper.excerpt(max_excerpt_words));
    prompt.push_str("\n\n");

    prompt.push_str(&format!(
        "How relevant is the paper to the target concept? Respond with a JSON object \
         only, in the form {{\"relevance\": <one of {}>, \"rationale\": \"<one or two \
         sentences>\"}}.\n",
        levels
    ));
    prompt
}
