//! Instruction templates for every model call, and fixed user-facing messages
//!
//! Templates are rendered with plain `format!` by the small helpers below so
//! each call site states exactly which inputs it supplies.

pub const CLASSIFIER_SYSTEM: &str =
    "You classify developer questions for an SDK assistant. Reply with a single JSON object and nothing else.";

pub fn classification_prompt(query: &str) -> String {
    format!(
        r#"Decide what this developer question needs.

Question: {query}

Fields:
- needs_documentation: the question is about the SDK itself (its functions, instrumentation, signals, tracking, context, configuration)
- needs_framework: the question is about a third-party AI framework (langchain, llamaindex, crewai, autogen, haystack, or another one)
- needs_code: the user wants a code example (asks to show, implement, write, "how to", example)
- framework_name: the framework named in the question, one of "langchain", "llamaindex", "crewai", "autogen", "haystack", "generic", or null when none is named

Reply with exactly this JSON shape, no markdown:
{{"needs_documentation": true|false, "needs_framework": true|false, "needs_code": true|false, "framework_name": "langchain"|"llamaindex"|"crewai"|"autogen"|"haystack"|"generic"|null}}"#
    )
}

pub const DOCUMENTATION_SYSTEM: &str = "You are an expert assistant for the SDK documented below.";

pub fn documentation_prompt(context: &str, question: &str) -> String {
    format!(
        r#"Answer the question using only the documentation excerpts.

Documentation excerpts:
{context}
Question: {question}

Rules:
1. Use only the excerpts; if they do not contain the answer, say "I don't have that information in the documentation".
2. Be concise and precise.
3. Include a short code example when it helps.
4. Mention related functions or concepts when useful.

Layout: a brief explanation, then a code example if applicable, then notes or gotchas if applicable."#
    )
}

pub fn framework_system(framework: &str) -> String {
    format!("You are a {} expert.", display_framework(framework))
}

pub fn framework_prompt(framework: &str, search_results: &str, question: &str) -> String {
    format!(
        r#"Answer the question about {name} using the web search results.

Web search results:
{search_results}
Question: {question}

Rules:
1. Synthesize from the search results; do not invent APIs they do not show.
2. Give framework-specific guidance.
3. Include code examples where relevant.
4. Cite the URLs you relied on.
5. Be concise but complete."#,
        name = display_framework(framework)
    )
}

pub const CODE_SYSTEM: &str =
    "You write working integration code that combines the SDK with AI frameworks.";

pub fn code_prompt(query: &str, doc_context: &str, framework_context: &str) -> String {
    let doc_context = if doc_context.trim().is_empty() {
        "(no documentation context was retrieved; rely on general SDK knowledge and say so)"
    } else {
        doc_context
    };
    let framework_context = if framework_context.trim().is_empty() {
        "(no framework context was retrieved; rely on general framework knowledge and say so)"
    } else {
        framework_context
    };
    format!(
        r#"Requirement: {query}

SDK documentation context:
{doc_context}

Framework context from web search:
{framework_context}

Write one complete, runnable code example that:
1. Imports and initialises the SDK correctly, instrumenting the model provider before its client is imported
2. Implements the requirement
3. Attaches tracking context (user, session, tenant)
4. Explains the SDK integration points in inline comments
5. Handles errors

Reply in exactly this layout:

```python
# complete working code
```

**Explanation:**
what the code does

**Estimated Cost:**
approximate cost per invocation (for example "$0.002 per query")

**Gotchas:**
important pitfalls and warnings"#
    )
}

pub const SYNTHESIS_SYSTEM: &str =
    "You merge answers from several specialist assistants into one answer for a developer.";

pub fn synthesis_prompt(query: &str, agent_responses: &str) -> String {
    format!(
        r#"Question: {query}

Specialist answers:
{agent_responses}

Merge them into one clear answer:
1. Order: SDK documentation explanation, then framework guidance, then the code example.
2. Remove repeated explanations but keep every important detail.
3. Keep code blocks and source citations intact.
4. Keep warnings and gotchas.
5. Do not claim anything a specialist marked as unavailable."#
    )
}

/// Canonical display name for a framework identifier
pub fn display_framework(framework: &str) -> &str {
    match framework {
        "langchain" => "LangChain",
        "llamaindex" => "LlamaIndex",
        "crewai" => "CrewAI",
        "autogen" => "AutoGen",
        "haystack" => "Haystack",
        "generic" => "AI framework",
        other => other,
    }
}

pub const WELCOME_MESSAGE: &str = r#"Welcome to the SDK Assistant!

I can help with:
  - SDK questions (functions, usage, best practices)
  - Framework integration (LangChain, LlamaIndex, CrewAI, AutoGen, Haystack)
  - Working code examples with cost estimates
  - Troubleshooting instrumentation

Try:
  "What does signal() do?"
  "How do I instrument a LangChain agent?"
  "Show me code for tracking custom tools"

Type /helpful or /not-helpful after an answer to rate it, /quit to leave."#;

pub const CLARIFICATION_MESSAGE: &str = "I'm not sure what you need yet. Could you rephrase the question, for example by naming the SDK function, the framework you use, or the code you want to see?";

pub const EMPTY_QUERY: &str = "Please enter a question about the SDK or your framework.";

pub const DOCS_NOT_INDEXED: &str =
    "Documentation is not indexed yet. Please wait for indexing to complete and ask again.";

pub const DOCS_NOT_FOUND: &str =
    "Not found: I couldn't find relevant information in the SDK documentation for this question.";

pub fn framework_not_found(framework: &str) -> String {
    format!(
        "Not found: I couldn't find information about {}. Web search quota may be exceeded.",
        display_framework(framework)
    )
}

pub const NO_SPECIALIST_ANSWER: &str =
    "No specialist could answer this question with confidence.";

pub const LOW_CONFIDENCE_CODE_NOTE: &str = "Note: no documentation or framework context was available, so this example is based on general knowledge and may need adjustment.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_prompt_embeds_query_and_schema() {
        let p = classification_prompt("How do I use signal()?");
        assert!(p.contains("Question: How do I use signal()?"));
        assert!(p.contains(r#"{"needs_documentation": true|false"#));
    }

    #[test]
    fn test_code_prompt_marks_missing_context() {
        let p = code_prompt("track tools", "", "  ");
        assert!(p.contains("no documentation context was retrieved"));
        assert!(p.contains("no framework context was retrieved"));
        assert!(p.contains("**Estimated Cost:**"));
    }

    #[test]
    fn test_not_found_messages_say_not_found() {
        assert!(DOCS_NOT_FOUND.starts_with("Not found"));
        assert!(framework_not_found("crewai").contains("CrewAI"));
    }
}
