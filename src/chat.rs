//! The canonical answer pipeline: retrieve → assemble → generate → finalize.
//!
//! One pipeline serves the CLI and the HTTP boundary. The embedding and
//! generation stages are injected as trait objects so tests can drive the
//! whole path with fakes.

use anyhow::Result;

use crate::answer::finalize_answer;
use crate::assemble::{assemble_context, ContextBundle};
use crate::embedding::{embed_query, Embedder};
use crate::generate::Generator;
use crate::store::PassageStore;

/// Prompt rendered for every query. The closing flag instruction pairs with
/// the post-processor's `has_references` handling.
const PROMPT_TEMPLATE: &str = r#"
You are a helpful AI assistant specializing in scientific literature and Material Science.
Your task is to answer the user's question based ONLY on the following numbered context from Material Science research papers.
If the user asks a general question or gives a statement, then reply user with a statement that you are a Material Science assistant and you can only answer questions related to Material Science.
Provide a detailed, comprehensive, and user-friendly explanation using proper Markdown syntax, including support for mathematical expressions if present in the context (e.g., $\sigma_{VM}$ or E = mc^2).
if the user asked a general question related to Material Science, provide a detailed answer based on the context.
When you use information from a specific source in the context, cite it using its corresponding number in square brackets, like [1], [2], etc.
If multiple sources support a statement, you can cite them together, like [1][3].
If the context does not contain information to answer the question, clearly state that there is not enough information found from the Material Science Research papers to answer this question and do not cite any sources, ask user to ask questions only Related to Material Science.
Do not make up information or use external knowledge.

IMPORTANT: At the very end of your response, on a new line, include the following flag:
- If your answer contains citation numbers (like [1], [2], etc.): `has_references: true`
- If your answer does NOT contain any citation numbers: `has_references: false`

CONTEXT:
{context_with_numbers}

USER QUESTION:
{question}

DETAILED ANSWER WITH INLINE CITATION NUMBERS (e.g., [1], [2]):
"#;

/// Render the full prompt for one query.
pub fn render_prompt(context_block: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context_with_numbers}", context_block)
        .replace("{question}", question)
}

/// Retrieve the top-k passages for a query and assemble the numbered
/// context and source list.
pub async fn retrieve_context(
    store: &PassageStore,
    embedder: &dyn Embedder,
    question: &str,
    top_k: usize,
) -> Result<ContextBundle> {
    let query_embedding = embed_query(embedder, question).await?;
    let passages = store.query(&query_embedding, top_k).await?;
    Ok(assemble_context(&passages))
}

/// Answer a question end to end: retrieve, assemble, generate, finalize.
pub async fn answer_question(
    store: &PassageStore,
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    question: &str,
    top_k: usize,
) -> Result<String> {
    let bundle = retrieve_context(store, embedder, question, top_k).await?;
    let prompt = render_prompt(&bundle.context_block, question);
    let raw = generator.generate(&prompt).await?;
    Ok(finalize_answer(&raw, &bundle.sources))
}
