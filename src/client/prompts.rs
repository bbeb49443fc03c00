//! Prompt builders for the task modes.
//!
//! Each task renders to the message list sent through the relay, and to a
//! follow-up seed that continues the conversation in free-form chat.

use crate::upstream::ChatMessage;

/// A one-shot task the front end offers besides chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Analyze { language: String, code: String },
    Generate { language: String, description: String },
    Debug { error: String, code: Option<String> },
    Learn { topic: String },
}

/// Opening state for a chat that follows up on a task result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

/// Longest topic prefix used in a learning follow-up title.
const TOPIC_TITLE_CHARS: usize = 40;

fn fenced(code: &str) -> String {
    format!("```\n{code}\n```")
}

/// Related code only counts when it has non-whitespace content.
fn non_blank(code: &Option<String>) -> Option<&str> {
    code.as_deref().map(str::trim).filter(|c| !c.is_empty())
}

impl Task {
    /// Messages sent to the model for this task.
    pub fn messages(&self) -> Vec<ChatMessage> {
        match self {
            Task::Analyze { language, code } => vec![
                ChatMessage::user(format!(
                    "You are a code reviewer. Analyze the following {language} code and provide:\n\
                     1. A brief summary of what the code does\n\
                     2. Code review and suggestions for improvement\n\
                     3. Potential bugs or edge cases\n\
                     4. Performance improvements if applicable\n\
                     5. Security considerations if relevant\n\
                     6. Best practices recommendations\n\
                     \n\
                     Format your response in clear sections with markdown. Be concise but thorough."
                )),
                ChatMessage::user(format!(
                    "Language: {language}\n\nCode:\n{}",
                    fenced(code.trim())
                )),
            ],
            Task::Generate {
                language,
                description,
            } => vec![ChatMessage::user(format!(
                "You are a code generator. The user wants code in {language}.\n\
                 \n\
                 User request: {}\n\
                 \n\
                 Respond with:\n\
                 1. A very brief explanation of the approach (1-2 sentences).\n\
                 2. Working code in a markdown code block with the correct language tag (e.g. ```python).\n\
                 3. Short usage notes if helpful.\n\
                 \n\
                 Output only the explanation and code. Be concise.",
                description.trim()
            ))],
            Task::Debug { error, code } => {
                let related = non_blank(code)
                    .map(|c| format!("Related code:\n{}", fenced(c)))
                    .unwrap_or_default();
                vec![ChatMessage::user(format!(
                    "You are a debugging assistant. The user is seeing an error and may have pasted related code.\n\
                     \n\
                     Error message or stack trace:\n\
                     {}\n\
                     {related}\n\
                     \n\
                     Provide:\n\
                     1. A clear explanation of what the error means\n\
                     2. The most likely cause(s)\n\
                     3. A concrete fix with code example if applicable\n\
                     4. Step-by-step debugging tips if helpful\n\
                     \n\
                     Use markdown and code blocks. Be concise and actionable.",
                    fenced(error.trim())
                ))]
            }
            Task::Learn { topic } => vec![ChatMessage::user(format!(
                "You are a patient programming tutor. The user wants to learn about: \"{topic}\".\n\
                 \n\
                 Provide:\n\
                 1. A clear, concise explanation of the concept (2-4 short paragraphs)\n\
                 2. A simple code example with comments\n\
                 3. One or two \"key takeaway\" bullets\n\
                 4. Optional: one practice idea they can try\n\
                 \n\
                 Use markdown. Keep the tone friendly and avoid overwhelming detail."
            ))],
        }
    }

    /// Seed for continuing in chat, including the task result if there is one.
    pub fn follow_up(&self, result: Option<&str>) -> FollowUp {
        let (title, opener) = match self {
            Task::Analyze { language, code } => (
                "Code analysis follow-up".to_string(),
                format!("Analyze this {language} code:\n{}", fenced(code.trim())),
            ),
            Task::Generate {
                language,
                description,
            } => (
                "Code generation follow-up".to_string(),
                format!("Generate {language} code for: {}", description.trim()),
            ),
            Task::Debug { error, code } => {
                let code = non_blank(code)
                    .map(|c| format!("Code:\n{}", fenced(c)))
                    .unwrap_or_default();
                (
                    "Debug follow-up".to_string(),
                    format!("Error:\n{}\n{code}", fenced(error.trim())),
                )
            }
            Task::Learn { topic } => (
                format!(
                    "Learning: {}",
                    topic.chars().take(TOPIC_TITLE_CHARS).collect::<String>()
                ),
                format!("Explain: {topic}"),
            ),
        };

        let mut messages = vec![ChatMessage::user(opener)];
        if let Some(result) = result.filter(|r| !r.is_empty()) {
            messages.push(ChatMessage::assistant(result));
        }
        FollowUp { title, messages }
    }
}
