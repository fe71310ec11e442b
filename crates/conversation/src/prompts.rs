pub const CONTEXTUALIZE_SYSTEM_PROMPT: &str = "Given a chat history and the latest user question \
which might reference context in the chat history, formulate a standalone question which can be \
understood without the chat history. Do NOT answer the question, just reformulate it if needed \
and otherwise return it as is.";

/// `{context}` is replaced by the retrieved fragments.
pub const ANSWER_SYSTEM_PROMPT: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. If you don't know the \
answer, say that you don't know. Use three sentences maximum and keep the answer concise.\
\n\n{context}";

pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Places `context` at the `{context}` placeholder, or after the prompt when
/// the placeholder is missing.
pub fn render_answer_prompt(template: &str, context: &str) -> String {
    if template.contains(CONTEXT_PLACEHOLDER) {
        template.replace(CONTEXT_PLACEHOLDER, context)
    } else {
        format!("{}\n\n{}", template, context)
    }
}
