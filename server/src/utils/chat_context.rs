use crate::{
    db::models::{TrainingChatMessage, TrainingDocument},
    provider::LlmMessage,
};

/// Maximum characters of each document included in the system prompt
pub const MAX_DOCUMENT_CONTEXT_CHARS: usize = 8000;
/// Number of previous messages given as conversation history
pub const HISTORY_WINDOW: usize = 10;

const SYSTEM_PROMPT: &str = "You are a helpful employee training assistant for a company.
Your role is to answer questions about company policies, procedures, and training materials.
Be professional, helpful, and accurate in your responses.
If you don't know the answer or if the information isn't in the provided documents,
say so honestly and suggest the employee contact HR or their manager for more information.

";

const NO_DOCUMENTS_NOTE: &str = "Note: No training documents have been uploaded yet.
Please let the employee know that training documents need to be uploaded by an administrator
before you can provide specific company information.";

/// Concatenate the documents that have text, each truncated to [MAX_DOCUMENT_CONTEXT_CHARS]
pub fn build_document_context(documents: &[TrainingDocument]) -> String {
    let mut context = String::new();
    for document in documents {
        let Some(content) = document.content.as_deref().filter(|c| !c.trim().is_empty()) else {
            continue;
        };
        let excerpt = match content.char_indices().nth(MAX_DOCUMENT_CONTEXT_CHARS) {
            Some((cut, _)) => &content[..cut],
            None => content,
        };
        context.push_str(&format!(
            "\n--- Document: {} ---\n{}\n",
            document.original_filename, excerpt
        ));
    }
    context
}

pub fn build_system_message(documents: &[TrainingDocument]) -> String {
    let document_context = build_document_context(documents);
    let mut system_message = SYSTEM_PROMPT.to_owned();
    if document_context.is_empty() {
        system_message.push_str(NO_DOCUMENTS_NOTE);
    } else {
        system_message.push_str(&format!(
            "Here are the company training documents you can reference:

{document_context}

Use the information from these documents to answer employee questions accurately.
Always cite which document your information comes from when possible."
        ));
    }
    system_message
}

/// Assemble the messages for the provider: the system message, the recent history
/// (given newest first, at most [HISTORY_WINDOW] entries used) in chronological
/// order, and finally the new question.
pub fn build_chat_messages(
    documents: &[TrainingDocument],
    recent_history: &[TrainingChatMessage],
    question: &str,
) -> Vec<LlmMessage> {
    let mut messages = vec![LlmMessage::system(build_system_message(documents))];
    for past in recent_history.iter().take(HISTORY_WINDOW).rev() {
        messages.push(LlmMessage::user(past.message.as_str()));
        if let Some(response) = &past.response {
            messages.push(LlmMessage::assistant(response.as_str()));
        }
    }
    messages.push(LlmMessage::user(question));
    messages
}
