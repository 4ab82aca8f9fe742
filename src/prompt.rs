//! Retrieval-augmented prompt assembly.
//!
//! [`build_prompt`] produces the single string sent to the completion
//! endpoint: persona preamble, instruction, retrieved context, question, and
//! a trailing `Answer:` cue. Chunk texts are used in the order given and are
//! never deduplicated here.

use clap::ValueEnum;

use crate::models::Chunk;

/// Preamble style for prompts and chat system messages. Text only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Persona {
    #[default]
    Default,
    Academic,
    Casual,
    Sarcastic,
}

impl Persona {
    pub fn preamble(self) -> &'static str {
        match self {
            Persona::Default => {
                "You are a helpful AI assistant who answers questions about the user's documents."
            }
            Persona::Academic => {
                "You're a formal, scholarly AI assistant who provides concise and citation-style explanations."
            }
            Persona::Casual => {
                "You're a relaxed, relatable AI who chats like a helpful friend explaining things casually."
            }
            Persona::Sarcastic => {
                "You are a witty, sarcastic AI assistant who answers questions with humor, but still provides accurate and well-researched information."
            }
        }
    }
}

const INSTRUCTION: &str =
    "Use the following context to answer the question as accurately as possible.";

const MARKDOWN_INSTRUCTION: &str = "**IMPORTANT:** Format your responses concisely and use Markdown for readability. \
Use bold (`**text**`) for emphasis, fenced code blocks for code, \
and leave a blank line between paragraphs.";

/// Assemble the completion prompt for `query` over `chunks`.
pub fn build_prompt(query: &str, chunks: &[Chunk], persona: Persona) -> String {
    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n{}\n\nContext:\n{}\n\nQuestion: {}\n\nAnswer:",
        persona.preamble(),
        INSTRUCTION,
        context,
        query
    )
}

/// System message for the terminal chat loop.
pub fn chat_system_prompt(persona: Persona, markdown: bool) -> String {
    let mut prompt = format!(
        "{}\nAnswer clearly and accurately. If you do not know, say so.",
        persona.preamble()
    );
    if markdown {
        prompt.push_str("\n\n");
        prompt.push_str(MARKDOWN_INSTRUCTION);
    }
    prompt
}
