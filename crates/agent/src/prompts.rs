//! Fixed texts used by the orchestrator.

pub const SYSTEM_PROMPT: &str = "You are a GenAIOps Documentation Assistant Agent, specialized in helping DevOps teams with NVIDIA deployment questions and operations.

You have access to these tools:
1. internal_docs_search - Search internal documentation for deployment guides and technical information
2. security_policy_checker - Verify if a library or component is approved for production use
3. cost_estimator - Calculate estimated GPU inference costs for different model sizes

Use the ReAct (Reasoning + Acting) approach:
1. **Reason** about what information you need to answer the user's question
2. **Act** by calling the appropriate tool(s)
3. **Observe** the tool results
4. **Repeat** if you need more information, or provide a final answer

Important guidelines:
- Always check security policies before recommending any deployment
- Provide cost estimates when discussing infrastructure
- Use the documentation search to back up your recommendations with official guides
- Be concise and actionable in your responses
- If you don't have enough information, ask clarifying questions

When you have gathered all necessary information, provide a clear, well-structured final answer.";

/// Content of an assistant message that only carries tool calls.
/// Some endpoints reject empty assistant content.
pub const TOOL_CALL_PLACEHOLDER: &str = "Calling tools...";

/// Answer when the budget ran out before any final content.
pub const NO_ANSWER: &str = "Unable to generate answer";

/// Replacement for an answer the output check flagged.
pub const OUTPUT_REFUSAL: &str = "I cannot provide this response as it violates our safety policies.";

pub fn input_refusal(reason: &str) -> String {
    format!("I cannot process this request. {reason}")
}

/// One observation line for a tool result.
pub fn observation(tool_name: &str, result: &genaiops_core::ToolResult) -> String {
    if result.success {
        let data = result.data.as_ref().cloned().unwrap_or(serde_json::Value::Null);
        let pretty = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
        format!("Tool '{tool_name}' returned: {pretty}")
    } else {
        format!(
            "Tool '{tool_name}' failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )
    }
}
