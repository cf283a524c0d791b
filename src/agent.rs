//! ReAct reasoning loop.
//!
//! The executor is a finite state machine driven by the model's text:
//!
//! ```text
//!            ┌──────────── Observe ◀──── Act
//!            ▼                           ▲
//!   start ─▶ Think ──(action)────────────┘
//!            │  ▲
//!            │  └──────── ParseError ◀──(unparseable)
//!            ├──(final answer)──▶ Finish
//!            └──(cap reached)───▶ MaxIterStop
//! ```
//!
//! Every `Think` is one model call and counts against `max_iterations`.
//! Parse failures and unknown tools become observations, so the model gets
//! a chance to correct itself; only a failing model call ends the run with
//! an error.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{LlmError, ParseError};
use crate::llm::LanguageModel;
use crate::tools::ToolRegistry;

/// Result text when the cap is hit without a final answer.
pub const ITERATION_LIMIT_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

/// Action name recorded for steps whose output could not be parsed.
pub const PARSE_ERROR_ACTION: &str = "_Exception";

const FINAL_ANSWER_MARKER: &str = "Final Answer:";
const STOP_SEQUENCES: &[&str] = &["\nObservation:"];

const PROMPT_TEMPLATE: &str = "Answer the following question as best you can. \
You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

Question: {input}
Thought:{scratchpad}";

/// What the model asked for on one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOutput {
    Action { tool: String, input: String },
    Finish { answer: String },
}

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
            .expect("valid action regex")
    })
}

fn action_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Action\s*\d*\s*:").expect("valid action marker regex"))
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{(tools|tool_names|input|scratchpad)\}").expect("valid placeholder regex")
    })
}

/// Strictly parse one model turn.
///
/// An action is `Action: <tool>` followed by `Action Input: <input>`; a
/// finish is any text containing `Final Answer:`. Text holding both is
/// rejected, as is text holding neither.
pub fn parse_output(text: &str) -> Result<ParsedOutput, ParseError> {
    let includes_answer = text.contains(FINAL_ANSWER_MARKER);

    if let Some(caps) = action_regex().captures(text) {
        if includes_answer {
            return Err(ParseError::ActionAndFinalAnswer);
        }
        let tool = caps[1].trim().to_string();
        let mut input = &caps[2];
        // The model sometimes keeps going and invents its own observation.
        if let Some(pos) = input.find("\nObservation") {
            input = &input[..pos];
        }
        let input = strip_quotes(input.trim()).to_string();
        return Ok(ParsedOutput::Action { tool, input });
    }

    if includes_answer {
        let answer = text
            .rsplit(FINAL_ANSWER_MARKER)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        return Ok(ParsedOutput::Finish { answer });
    }

    if !action_marker_regex().is_match(text) {
        Err(ParseError::MissingAction)
    } else {
        Err(ParseError::MissingActionInput)
    }
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}

/// One Thought/Action/Observation cycle.
#[derive(Debug, Clone)]
pub struct Step {
    /// Raw model output for this turn.
    pub log: String,
    pub action: String,
    pub action_input: String,
    pub observation: String,
}

impl Step {
    /// The model's reasoning text preceding its action.
    pub fn thought(&self) -> &str {
        let end = action_marker_regex()
            .find(&self.log)
            .map(|m| m.start())
            .unwrap_or(self.log.len());
        self.log[..end].trim()
    }
}

/// Steps accumulated during one question. Dropped when the run ends.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    steps: Vec<Step>,
}

impl Transcript {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Render as the prompt scratchpad continuing after `Thought:`.
    pub fn scratchpad(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push_str(&step.log);
            out.push_str("\nObservation: ");
            out.push_str(&step.observation);
            out.push_str("\nThought: ");
        }
        out
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    Answer(String),
    IterationLimit { iterations: usize },
}

impl AgentOutcome {
    /// Text for the user: the answer, or the bounded-failure message.
    pub fn into_text(self) -> String {
        match self {
            AgentOutcome::Answer(answer) => answer,
            AgentOutcome::IterationLimit { .. } => ITERATION_LIMIT_MESSAGE.to_string(),
        }
    }
}

enum State {
    Think,
    Act {
        log: String,
        tool: String,
        input: String,
    },
    Observe(Step),
    ParseError {
        log: String,
        error: ParseError,
    },
    Finish(String),
    MaxIterStop,
}

/// Drives the model through tool calls to a final answer.
pub struct AgentExecutor<'a> {
    llm: &'a dyn LanguageModel,
    tools: &'a ToolRegistry,
    max_iterations: usize,
}

impl<'a> AgentExecutor<'a> {
    pub fn new(llm: &'a dyn LanguageModel, tools: &'a ToolRegistry, max_iterations: usize) -> Self {
        Self {
            llm,
            tools,
            max_iterations,
        }
    }

    pub async fn run(&self, query: &str) -> Result<AgentOutcome, LlmError> {
        self.run_with_transcript(query)
            .await
            .map(|(outcome, _)| outcome)
    }

    /// Like [`run`](Self::run), also returning the steps taken.
    pub async fn run_with_transcript(
        &self,
        query: &str,
    ) -> Result<(AgentOutcome, Transcript), LlmError> {
        let mut transcript = Transcript::default();
        let mut iterations = 0usize;
        let mut state = State::Think;

        loop {
            state = match state {
                State::Think if iterations >= self.max_iterations => State::MaxIterStop,
                State::Think => {
                    iterations += 1;
                    let prompt = self.render_prompt(query, &transcript);
                    let output = self.llm.complete(&prompt, STOP_SEQUENCES).await?;
                    tracing::debug!(iteration = iterations, output = %output, "model turn");
                    match parse_output(&output) {
                        Ok(ParsedOutput::Finish { answer }) => State::Finish(answer),
                        Ok(ParsedOutput::Action { tool, input }) => State::Act {
                            log: output,
                            tool,
                            input,
                        },
                        Err(error) => State::ParseError { log: output, error },
                    }
                }
                State::Act { log, tool, input } => {
                    let observation = match self.tools.find(&tool) {
                        Some(t) => t.invoke(&input).await,
                        None => format!(
                            "{} is not a valid tool, try one of [{}].",
                            tool,
                            self.tools.names()
                        ),
                    };
                    tracing::debug!(tool = %tool, input = %input, observation = %observation, "tool step");
                    State::Observe(Step {
                        log,
                        action: tool,
                        action_input: input,
                        observation,
                    })
                }
                State::ParseError { log, error } => {
                    tracing::debug!(error = %error, "unparseable model output");
                    transcript.push(Step {
                        action: PARSE_ERROR_ACTION.to_string(),
                        action_input: log.clone(),
                        log,
                        observation: error.to_string(),
                    });
                    State::Think
                }
                State::Observe(step) => {
                    transcript.push(step);
                    State::Think
                }
                State::Finish(answer) => {
                    tracing::debug!(iterations, "final answer");
                    return Ok((AgentOutcome::Answer(answer), transcript));
                }
                State::MaxIterStop => {
                    tracing::warn!(iterations, "iteration limit reached without a final answer");
                    return Ok((AgentOutcome::IterationLimit { iterations }, transcript));
                }
            };
        }
    }

    /// Fill every placeholder in one pass; substituted text is never
    /// scanned again, so braces in the question stay literal.
    fn render_prompt(&self, query: &str, transcript: &Transcript) -> String {
        let tools = self.tools.render_descriptions();
        let tool_names = self.tools.names();
        let scratchpad = transcript.scratchpad();
        placeholder_regex()
            .replace_all(PROMPT_TEMPLATE, |caps: &regex::Captures<'_>| match &caps[1] {
                "tools" => tools.clone(),
                "tool_names" => tool_names.clone(),
                "input" => query.to_string(),
                _ => scratchpad.clone(),
            })
            .into_owned()
    }
}
