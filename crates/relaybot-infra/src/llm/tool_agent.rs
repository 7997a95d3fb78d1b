//! Tool-augmented chat backend.
//!
//! [`ToolAugmentedBackend`] layers tool use on top of any other backend.
//! The underlying model requests a tool by emitting a fenced block:
//!
//! ````text
//! ```tool_call
//! {"tool": "search", "input": {"query": "rust async"}}
//! ```
//! ````
//!
//! The wrapper invokes the named [`Tool`], feeds the result back into the
//! conversation as a user-role message, and asks the model again. The loop
//! is bounded; callers see an ordinary [`ChatBackend`] that happens to take
//! a few extra round trips.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use relaybot_core::llm::{BoxChatBackend, ChatBackend};
use relaybot_types::llm::{CompletionOutcome, CompletionRequest, Message, ProviderError};

/// Tool rounds per completion. The loop stops asking after this many
/// invocations and returns whatever the model last produced.
const MAX_TOOL_ROUNDS: usize = 4;

/// Error from a tool invocation.
///
/// Tool failures are reported back to the model as text rather than
/// aborting the completion, so the variant set stays small.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool execution failed: {0}")]
    Failed(String),
}

/// An external capability the model can invoke mid-completion.
///
/// Object-safe so tools can live in a heterogeneous registry.
pub trait Tool: Send + Sync {
    /// Registry name the model uses to address this tool.
    fn name(&self) -> &str;

    /// One-line description injected into the system prompt.
    fn description(&self) -> &str;

    /// Run the tool with the model-supplied JSON input.
    fn invoke<'a>(
        &'a self,
        input: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;
}

/// A tool invocation request parsed from the model's reply.
#[derive(Debug, Deserialize)]
struct ToolCall {
    tool: String,
    #[serde(default)]
    input: Value,
}

/// Extract a fenced ```tool_call block from reply text, if any.
fn parse_tool_call(text: &str) -> Option<ToolCall> {
    let start = text.find("```tool_call")?;
    let body = &text[start + "```tool_call".len()..];
    let end = body.find("```")?;
    serde_json::from_str(body[..end].trim()).ok()
}

/// Backend wrapper that resolves tool calls before returning.
pub struct ToolAugmentedBackend {
    inner: BoxChatBackend,
    tools: Vec<Box<dyn Tool>>,
}

impl ToolAugmentedBackend {
    pub fn new(inner: BoxChatBackend, tools: Vec<Box<dyn Tool>>) -> Self {
        Self { inner, tools }
    }

    /// System prompt addendum describing the available tools and the fenced
    /// call convention.
    fn tool_instructions(&self) -> String {
        let mut out = String::from(
            "You may call a tool by replying with only a fenced block:\n\
             ```tool_call\n{\"tool\": \"<name>\", \"input\": {...}}\n```\n\
             Available tools:\n",
        );
        for tool in &self.tools {
            out.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
        }
        out
    }

    async fn run_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == call.tool) else {
            return format!("[tool error] no such tool: {}", call.tool);
        };
        match tool.invoke(&call.input).await {
            Ok(result) => format!("[tool result from {}] {}", call.tool, result),
            Err(e) => format!("[tool error] {e}"),
        }
    }
}

impl ChatBackend for ToolAugmentedBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionOutcome, ProviderError> {
        let mut req = request.clone();
        let instructions = self.tool_instructions();
        req.system = Some(match req.system.take() {
            Some(system) => format!("{system}\n\n{instructions}"),
            None => instructions,
        });

        let mut outcome = self.inner.complete(&req).await?;
        for round in 0..MAX_TOOL_ROUNDS {
            let Some(call) = parse_tool_call(&outcome.text) else {
                return Ok(outcome);
            };
            tracing::debug!(tool = %call.tool, round, "resolving tool call");
            let result = self.run_tool(&call).await;
            req.messages.push(Message::assistant(&outcome.text));
            req.messages.push(Message::user(&result));
            outcome = self.inner.complete(&req).await?;
        }

        // Round budget spent. Whatever the model said last goes out, tool
        // call fence and all, rather than looping forever.
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool;

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "repeats its input"
        }

        fn invoke<'a>(
            &'a self,
            input: &'a Value,
        ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>> {
            Box::pin(async move { Ok(input["text"].as_str().unwrap_or_default().to_string()) })
        }
    }

    struct ScriptedBackend {
        replies: Mutex<VecDeque<String>>,
        calls: AtomicUsize,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<&str>) -> std::sync::Arc<Self> {
            std::sync::Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }
    }

    /// Local handle so the trait impl stays inside this crate.
    struct SharedBackend(std::sync::Arc<ScriptedBackend>);

    impl ChatBackend for SharedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionOutcome, ProviderError> {
            self.0.calls.fetch_add(1, Ordering::SeqCst);
            *self.0.last_request.lock().unwrap() = Some(request.clone());
            let text = self
                .0
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "out of script".to_string());
            Ok(CompletionOutcome {
                text,
                truncated: false,
            })
        }
    }

    fn make_request() -> CompletionRequest {
        CompletionRequest {
            model: "m".to_string(),
            messages: vec![Message::user("hi")],
            system: Some("be brief".to_string()),
            max_tokens: 256,
            temperature: None,
        }
    }

    const CALL_ECHO: &str =
        "```tool_call\n{\"tool\": \"echo\", \"input\": {\"text\": \"pong\"}}\n```";

    #[test]
    fn test_parse_tool_call() {
        let call = parse_tool_call(CALL_ECHO).unwrap();
        assert_eq!(call.tool, "echo");
        assert_eq!(call.input["text"], "pong");
    }

    #[test]
    fn test_parse_ignores_plain_text() {
        assert!(parse_tool_call("just an answer").is_none());
        assert!(parse_tool_call("```rust\nfn main() {}\n```").is_none());
    }

    #[tokio::test]
    async fn test_plain_reply_passes_through() {
        let inner = ScriptedBackend::new(vec!["plain answer"]);
        let agent =
            ToolAugmentedBackend::new(BoxChatBackend::new(SharedBackend(inner.clone())), vec![Box::new(EchoTool)]);

        let outcome = agent.complete(&make_request()).await.unwrap();
        assert_eq!(outcome.text, "plain answer");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tool_round_then_final_answer() {
        let inner = ScriptedBackend::new(vec![CALL_ECHO, "the echo said pong"]);
        let agent =
            ToolAugmentedBackend::new(BoxChatBackend::new(SharedBackend(inner.clone())), vec![Box::new(EchoTool)]);

        let outcome = agent.complete(&make_request()).await.unwrap();
        assert_eq!(outcome.text, "the echo said pong");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        // The second call saw the tool result as a user message.
        let last = inner.last_request.lock().unwrap().clone().unwrap();
        let tool_msg = last.messages.last().unwrap();
        assert!(tool_msg.content.contains("[tool result from echo] pong"));
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_to_model() {
        let call = "```tool_call\n{\"tool\": \"nope\", \"input\": {}}\n```";
        let inner = ScriptedBackend::new(vec![call, "ok then"]);
        let agent =
            ToolAugmentedBackend::new(BoxChatBackend::new(SharedBackend(inner.clone())), vec![Box::new(EchoTool)]);

        let outcome = agent.complete(&make_request()).await.unwrap();
        assert_eq!(outcome.text, "ok then");
        let last = inner.last_request.lock().unwrap().clone().unwrap();
        assert!(
            last.messages
                .last()
                .unwrap()
                .content
                .contains("no such tool: nope")
        );
    }

    #[tokio::test]
    async fn test_round_budget_bounds_the_loop() {
        // Every reply asks for another tool call; the loop must still stop.
        let inner = ScriptedBackend::new(vec![CALL_ECHO; 10]);
        let agent =
            ToolAugmentedBackend::new(BoxChatBackend::new(SharedBackend(inner.clone())), vec![Box::new(EchoTool)]);

        let outcome = agent.complete(&make_request()).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1 + MAX_TOOL_ROUNDS);
        assert!(outcome.text.contains("tool_call"));
    }

    #[tokio::test]
    async fn test_system_prompt_lists_tools() {
        let inner = ScriptedBackend::new(vec!["fine"]);
        let agent =
            ToolAugmentedBackend::new(BoxChatBackend::new(SharedBackend(inner.clone())), vec![Box::new(EchoTool)]);

        agent.complete(&make_request()).await.unwrap();
        let seen = inner.last_request.lock().unwrap().clone().unwrap();
        let system = seen.system.unwrap();
        assert!(system.starts_with("be brief"));
        assert!(system.contains("echo: repeats its input"));
    }
}
