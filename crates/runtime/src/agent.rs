//! The agent loop.
//!
//! An [`Agent`] resolves one user request at a time by alternating between
//! model inference and tool execution:
//!
//! ```text
//! AwaitingModel ──(tool calls)──▶ HandlingTools ──▶ AwaitingModel
//!       │
//!       └──(text only)──▶ Done
//! ```
//!
//! Each model turn appends exactly one assistant message, and each tool turn
//! appends exactly one user message holding a result for every call of the
//! preceding turn, in the order the calls were made.

use crate::conversation::Conversation;
use crate::model::{Backend, Message, ModelRequest, ToolCall, ToolOutcome, ToolResult, Usage};
use crate::tools::ToolHost;
use crate::{Error, Result};
use tokio_util::sync::CancellationToken;

/// Default bound on model calls per request.
pub const DEFAULT_MAX_CYCLES: usize = 50;

/// Progress notifications emitted while a request is being resolved.
#[derive(Debug, Clone, Copy)]
pub enum AgentEvent<'a> {
    /// About to call the model for the given cycle (1-based).
    ModelCall { cycle: usize },
    /// About to execute a tool.
    ToolCall { call: &'a ToolCall },
    /// A tool finished.
    ToolResult {
        call: &'a ToolCall,
        outcome: &'a ToolOutcome,
    },
    /// The model produced its final answer.
    Finished { answer: &'a str },
}

/// The result of a completed run.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Concatenated text of the final assistant message.
    pub answer: String,
    /// The full history of the run.
    pub conversation: Conversation,
    /// Number of model calls made.
    pub cycles: usize,
    /// Token usage summed across all model calls.
    pub usage: Usage,
}

enum State {
    AwaitingModel,
    HandlingTools(Vec<ToolCall>),
    Done(String),
}

/// Drives the conversation between a backend and a tool host.
pub struct Agent<B, H> {
    backend: B,
    tools: H,
    max_cycles: Option<usize>,
}

impl<B: Backend, H: ToolHost> Agent<B, H> {
    pub fn new(backend: B, tools: H) -> Self {
        Self {
            backend,
            tools,
            max_cycles: Some(DEFAULT_MAX_CYCLES),
        }
    }

    /// Bound the number of model calls per request. `None` removes the bound.
    pub fn with_max_cycles(mut self, max_cycles: Option<usize>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn tools(&self) -> &H {
        &self.tools
    }

    /// Resolve a request to a final answer.
    pub async fn run(&self, request: &str, cancel: &CancellationToken) -> Result<Completion> {
        self.run_with(request, cancel, |_| {}).await
    }

    /// Resolve a request, reporting progress to `on_event`.
    ///
    /// `cancel` is checked before every model call and raced against the
    /// call itself. A tool turn, once started, always runs to completion.
    pub async fn run_with(
        &self,
        request: &str,
        cancel: &CancellationToken,
        mut on_event: impl FnMut(AgentEvent<'_>),
    ) -> Result<Completion> {
        let mut conversation = Conversation::new(request);
        let mut usage = Usage::default();
        let mut cycles = 0;
        let mut state = State::AwaitingModel;

        loop {
            state = match state {
                State::AwaitingModel => {
                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    if let Some(max) = self.max_cycles.filter(|&max| cycles >= max) {
                        tracing::warn!(max, "cycle limit reached");
                        return Err(Error::CycleLimit(max));
                    }

                    cycles += 1;
                    on_event(AgentEvent::ModelCall { cycle: cycles });
                    tracing::debug!(cycle = cycles, messages = conversation.len(), "calling model");

                    let model_request = ModelRequest {
                        messages: conversation.messages(),
                        tools: self.tools.specs(),
                    };
                    let response = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                        response = self.backend.call(model_request) => response?,
                    };
                    usage += response.usage;

                    let calls: Vec<ToolCall> =
                        response.message.tool_calls().into_iter().cloned().collect();
                    let next = if calls.is_empty() {
                        State::Done(response.message.text())
                    } else {
                        State::HandlingTools(calls)
                    };
                    conversation.push(response.message);
                    next
                }
                State::HandlingTools(calls) => {
                    tracing::debug!(count = calls.len(), "handling tool calls");
                    let mut results = Vec::with_capacity(calls.len());
                    for call in &calls {
                        on_event(AgentEvent::ToolCall { call });
                        let outcome = self.tools.execute(call).await;
                        on_event(AgentEvent::ToolResult {
                            call,
                            outcome: &outcome,
                        });
                        results.push(ToolResult::new(call.id.clone(), outcome));
                    }
                    conversation.push(Message::tool_results(results));
                    State::AwaitingModel
                }
                State::Done(answer) => {
                    on_event(AgentEvent::Finished { answer: &answer });
                    tracing::info!(cycles, tokens = usage.total_tokens(), "request resolved");
                    return Ok(Completion {
                        answer,
                        conversation,
                        cycles,
                        usage,
                    });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, ModelResponse, Part, Role, ToolSpec};
    use crate::tools::LocalToolHost;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Replays canned assistant messages and records every request.
    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<VecDeque<std::result::Result<Message, ModelError>>>,
        seen: Mutex<Vec<Vec<Message>>>,
        tools_offered: Mutex<Vec<Vec<ToolSpec>>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<std::result::Result<Message, ModelError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        fn requests(&self) -> Vec<Vec<Message>> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Backend for ScriptedBackend {
        async fn call(
            &self,
            request: ModelRequest<'_>,
        ) -> std::result::Result<ModelResponse, ModelError> {
            self.seen.lock().unwrap().push(request.messages.to_vec());
            self.tools_offered
                .lock()
                .unwrap()
                .push(request.tools.to_vec());
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Ok(message)) => Ok(ModelResponse {
                    message,
                    usage: Usage {
                        input_tokens: 10,
                        output_tokens: 5,
                    },
                }),
                Some(Err(e)) => Err(e),
                None => Err(ModelError::InvalidResponse("script exhausted".into())),
            }
        }
    }

    /// Asks for a tool on every turn, forever.
    #[derive(Default)]
    struct InsistentBackend {
        calls: AtomicUsize,
    }

    impl Backend for InsistentBackend {
        async fn call(
            &self,
            _request: ModelRequest<'_>,
        ) -> std::result::Result<ModelResponse, ModelError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let id = format!("toolu_{n}");
            Ok(ModelResponse {
                message: tool_use(&[(id.as_str(), "list_files", json!({}))]),
                usage: Usage::default(),
            })
        }
    }

    /// Never answers.
    struct StalledBackend;

    impl Backend for StalledBackend {
        async fn call(
            &self,
            _request: ModelRequest<'_>,
        ) -> std::result::Result<ModelResponse, ModelError> {
            std::future::pending().await
        }
    }

    fn tool_use(calls: &[(&str, &str, Value)]) -> Message {
        Message::from_parts(
            Role::Assistant,
            calls
                .iter()
                .map(|(id, name, input)| {
                    Part::ToolCall(ToolCall {
                        id: (*id).to_string(),
                        name: (*name).to_string(),
                        input: input.clone(),
                    })
                })
                .collect(),
        )
    }

    fn workspace() -> (TempDir, LocalToolHost) {
        let dir = TempDir::new().unwrap();
        let host = LocalToolHost::new(dir.path());
        (dir, host)
    }

    /// Every tool call is answered by the very next message, 1:1 and in
    /// order, and no result appears without a call.
    fn assert_results_pair_with_calls(messages: &[Message]) {
        for (i, message) in messages.iter().enumerate() {
            let results: Vec<_> = message.tool_results_iter().collect();
            if !results.is_empty() {
                assert!(i > 0, "tool results before any model turn");
                let prev = &messages[i - 1];
                assert_eq!(prev.role, Role::Assistant);
                let call_ids: Vec<_> = prev.tool_calls().iter().map(|c| c.id.clone()).collect();
                let result_ids: Vec<_> = results.iter().map(|r| r.tool_call_id.clone()).collect();
                assert_eq!(call_ids, result_ids);
            }

            let calls = message.tool_calls();
            if !calls.is_empty() {
                let next = messages
                    .get(i + 1)
                    .expect("tool calls must be followed by results");
                assert_eq!(next.role, Role::User);
                assert_eq!(next.tool_results_iter().count(), calls.len());
            }
        }
    }

    #[tokio::test]
    async fn text_reply_finishes_in_one_cycle() {
        let (_dir, host) = workspace();
        let agent = Agent::new(
            ScriptedBackend::new(vec![Ok(Message::assistant("Hi there"))]),
            host,
        );

        let completion = agent.run("hello", &CancellationToken::new()).await.unwrap();

        assert_eq!(completion.answer, "Hi there");
        assert_eq!(completion.cycles, 1);
        assert_eq!(completion.conversation.len(), 2);
        assert_eq!(completion.usage.total_tokens(), 15);
    }

    #[tokio::test]
    async fn every_request_offers_the_registry() {
        let (_dir, host) = workspace();
        let agent = Agent::new(
            ScriptedBackend::new(vec![Ok(Message::assistant("ok"))]),
            host,
        );
        agent.run("hi", &CancellationToken::new()).await.unwrap();

        let offered = agent.backend().tools_offered.lock().unwrap().clone();
        let names: Vec<_> = offered[0].iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["list_files", "read_file", "run_bash", "edit_file"]);
    }

    #[tokio::test]
    async fn creates_greeting_file_then_answers() {
        let (dir, host) = workspace();
        let backend = ScriptedBackend::new(vec![
            Ok(tool_use(&[(
                "toolu_1",
                "edit_file",
                json!({"path": "greet.txt", "search_string": "", "replace_string": "Hello"}),
            )])),
            Ok(Message::assistant("Created greet.txt with Hello.")),
        ]);
        let agent = Agent::new(backend, host);

        let mut finished = Vec::new();
        let completion = agent
            .run_with(
                "create a file greet.txt containing Hello",
                &CancellationToken::new(),
                |event| {
                    if let AgentEvent::Finished { answer } = event {
                        finished.push(answer.to_string());
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("greet.txt")).unwrap(),
            "Hello"
        );
        assert_eq!(finished, ["Created greet.txt with Hello."]);
        assert_eq!(completion.answer, "Created greet.txt with Hello.");
        assert_eq!(completion.cycles, 2);

        let messages = completion.conversation.messages();
        assert_eq!(messages.len(), 4);
        let result = messages[2].tool_results_iter().next().unwrap();
        assert_eq!(result.tool_call_id, "toolu_1");
        assert_eq!(
            result.outcome,
            ToolOutcome::success("File 'greet.txt' created/overwritten successfully.")
        );
        assert_results_pair_with_calls(messages);

        // The second inference call saw the tool result.
        let requests = agent.backend().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].len(), 3);
        assert_eq!(&requests[1][2], &messages[2]);
    }

    #[tokio::test]
    async fn multiple_calls_run_in_order_into_one_message() {
        let (dir, host) = workspace();
        std::fs::write(dir.path().join("readme.txt"), "read me").unwrap();
        let backend = ScriptedBackend::new(vec![
            Ok(tool_use(&[
                ("toolu_a", "list_files", json!({"path": "."})),
                ("toolu_b", "read_file", json!({"path": "readme.txt"})),
            ])),
            Ok(Message::assistant("There is one file and it says: read me")),
        ]);
        let agent = Agent::new(backend, host);

        let mut order = Vec::new();
        let completion = agent
            .run_with("what's here?", &CancellationToken::new(), |event| {
                if let AgentEvent::ToolCall { call } = event {
                    order.push(call.name.clone());
                }
            })
            .await
            .unwrap();

        assert_eq!(order, ["list_files", "read_file"]);

        let messages = completion.conversation.messages();
        assert_eq!(messages.len(), 4);
        let results: Vec<_> = messages[2].tool_results_iter().collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].tool_call_id, "toolu_a");
        assert_eq!(results[0].outcome.content(), "[\n  \"readme.txt\"\n]");
        assert_eq!(results[1].tool_call_id, "toolu_b");
        assert_eq!(results[1].outcome.content(), "read me");
        assert_results_pair_with_calls(messages);
    }

    #[tokio::test]
    async fn tool_failures_are_fed_back_not_raised() {
        let (_dir, host) = workspace();
        let backend = ScriptedBackend::new(vec![
            Ok(tool_use(&[
                ("toolu_1", "read_file", json!({"path": "missing.txt"})),
                ("toolu_2", "no_such_tool", json!({})),
            ])),
            Ok(Message::assistant("That file does not exist.")),
        ]);
        let agent = Agent::new(backend, host);

        let completion = agent
            .run("read missing.txt", &CancellationToken::new())
            .await
            .unwrap();

        let messages = completion.conversation.messages();
        let results: Vec<_> = messages[2].tool_results_iter().collect();
        assert!(results.iter().all(|r| r.outcome.is_error()));
        assert_eq!(
            results[1].outcome.content(),
            "Error: unknown tool 'no_such_tool'"
        );
        assert_eq!(completion.answer, "That file does not exist.");
        assert_results_pair_with_calls(messages);
    }

    #[tokio::test]
    async fn answer_joins_all_text_parts() {
        let (_dir, host) = workspace();
        let reply = Message::assistant("Done. ").with_part(Part::text("Bye."));
        let agent = Agent::new(ScriptedBackend::new(vec![Ok(reply)]), host);
        let completion = agent.run("x", &CancellationToken::new()).await.unwrap();
        assert_eq!(completion.answer, "Done. Bye.");
    }

    #[tokio::test]
    async fn model_error_aborts_the_request() {
        let (_dir, host) = workspace();
        let backend = ScriptedBackend::new(vec![
            Ok(tool_use(&[("toolu_1", "list_files", json!({}))])),
            Err(ModelError::Api("529: overloaded".into())),
        ]);
        let agent = Agent::new(backend, host);

        let err = agent.run("hi", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Model(ModelError::Api(_))));
    }

    #[tokio::test]
    async fn cycle_limit_stops_a_runaway_model() {
        let (_dir, host) = workspace();
        let agent = Agent::new(InsistentBackend::default(), host).with_max_cycles(Some(3));

        let err = agent.run("loop", &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, Error::CycleLimit(3)));
        assert_eq!(agent.backend().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_model_call() {
        let (_dir, host) = workspace();
        let agent = Agent::new(ScriptedBackend::new(vec![]), host);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = agent.run("hi", &cancel).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(agent.backend().requests().is_empty());
    }

    #[tokio::test]
    async fn cancel_interrupts_a_stalled_model_call() {
        let (_dir, host) = workspace();
        let agent = Agent::new(StalledBackend, host).with_max_cycles(None);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = agent.run("hi", &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn each_run_starts_a_fresh_history() {
        let (_dir, host) = workspace();
        let backend = ScriptedBackend::new(vec![
            Ok(Message::assistant("first")),
            Ok(Message::assistant("second")),
        ]);
        let agent = Agent::new(backend, host);
        let cancel = CancellationToken::new();

        agent.run("one", &cancel).await.unwrap();
        agent.run("two", &cancel).await.unwrap();

        let requests = agent.backend().requests();
        assert_eq!(requests[1].len(), 1);
        assert_eq!(requests[1][0].text(), "two");
    }
}
