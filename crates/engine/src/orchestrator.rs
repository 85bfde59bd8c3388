//! Chat orchestrator - coordinates one chat turn
//!
//! Drives the turn state machine: Idle -> Retrieving -> Assembling ->
//! Prompting -> Generating -> Completed, with Failed reachable from
//! the prompting and generating states. Failures are turn-scoped: the
//! caller gets a generic apology and the session stays usable.

use crate::llm::CompletionClient;
use crate::{EngineConfig, PromptBuilder, Result, Retriever, SessionStore};
use chrono::Utc;
use quotemaster_core::{AssembledContext, ChatTurn, QuoteEstimate};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// States of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Retrieving,
    Assembling,
    Prompting,
    Generating,
    Completed,
    Failed,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnState::Idle => "idle",
            TurnState::Retrieving => "retrieving",
            TurnState::Assembling => "assembling",
            TurnState::Prompting => "prompting",
            TurnState::Generating => "generating",
            TurnState::Completed => "completed",
            TurnState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// What a turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub content: String,
    pub quote: Option<QuoteEstimate>,
    pub state: TurnState,
    pub context_used: AssembledContext,
}

const FAILURE_REPLY: &str =
    "I apologize, but I couldn't generate a response right now. Please try again.";

const NON_BUSINESS_REPLY: &str = "**Only Business-Related Content Access**\n\n\
This system is designed exclusively for business-related queries including:\n\n\
- Project Estimation & Services\n\
- Pricing & Plans\n\
- Business Strategy & Planning\n\
- Technology Recommendations\n\n\
Please ask about project costs, timelines, service quotations, or pricing.";

const UIUX_DIRECTIVE: &str = "This is a UI/UX design request. Break the estimate into \
Research & Discovery, Wireframing, UI Design, Prototyping, and Testing & Iteration \
phases, each with deliverables, estimated cost, and timeline, as markdown tables.";

/// Top-level coordinator for chat turns. Shared across sessions;
/// concurrent turns are bounded by the LLM slot pool.
pub struct ChatOrchestrator {
    retriever: Retriever,
    prompt_builder: PromptBuilder,
    llm: Arc<dyn CompletionClient>,
    sessions: Arc<dyn SessionStore>,
    llm_slots: Arc<Semaphore>,
    recent_estimates: Mutex<VecDeque<QuoteEstimate>>,
    max_recent_estimates: usize,
}

impl ChatOrchestrator {
    pub fn new(
        retriever: Retriever,
        prompt_builder: PromptBuilder,
        llm: Arc<dyn CompletionClient>,
        sessions: Arc<dyn SessionStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            retriever,
            prompt_builder,
            llm,
            sessions,
            llm_slots: Arc::new(Semaphore::new(config.llm_pool_size)),
            recent_estimates: Mutex::new(VecDeque::new()),
            max_recent_estimates: config.max_recent_estimates,
        }
    }

    /// Run one chat turn. Never returns an error: failures surface as
    /// a `Failed` outcome carrying the apology reply.
    #[instrument(skip(self, content))]
    pub async fn chat(&self, session_id: Option<String>, content: &str) -> TurnOutcome {
        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        debug!("Turn {}: idle", session_id);

        // Intake shortcut: a bare "quotation" returns the template
        // without touching retrieval or the model.
        if content.trim().eq_ignore_ascii_case("quotation") {
            let reply = quotation_template();
            self.persist(&session_id, content, &reply, AssembledContext::empty())
                .await;
            return self.completed(session_id, reply, None, AssembledContext::empty());
        }

        if !is_business_related(content) {
            debug!("Non-business query, returning fixed reply");
            let reply = NON_BUSINESS_REPLY.to_string();
            self.persist(&session_id, content, &reply, AssembledContext::empty())
                .await;
            return self.completed(session_id, reply, None, AssembledContext::empty());
        }

        debug!("Turn {}: retrieving", session_id);
        let retrieval = self.retriever.retrieve(content).await;

        debug!("Turn {}: assembling", session_id);
        let history = self.sessions.get_history(&session_id).await;

        let user_message = if is_uiux_request(content) {
            format!("{}\n\n{}", content, UIUX_DIRECTIVE)
        } else {
            content.to_string()
        };

        debug!("Turn {}: prompting", session_id);
        let (prompt, context_used) =
            match self.prompt_builder.build(&history, &retrieval, &user_message) {
                Ok(built) => built,
                Err(e) => {
                    warn!("Prompt build failed, turn fails: {}", e);
                    return self.failed(session_id);
                }
            };

        debug!("Turn {}: generating", session_id);
        let _permit = match self.llm_slots.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("LLM slot pool closed, turn fails");
                return self.failed(session_id);
            }
        };

        let raw = match self.llm.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("LLM call failed after retries, turn fails: {}", e);
                return self.failed(session_id);
            }
        };

        let reply = repair_tables(&raw);
        let quote = extract_quote(&reply);
        if let Some(ref quote) = quote {
            self.push_recent(quote.clone());
        }

        self.persist(&session_id, content, &reply, context_used.clone())
            .await;

        debug!("Turn {}: completed", session_id);
        self.completed(session_id, reply, quote, context_used)
    }

    /// Structured UI/UX estimate, bypassing free-text retrieval.
    #[instrument(skip(self))]
    pub async fn uiux_estimate(
        &self,
        client_name: Option<String>,
        project_name: Option<String>,
    ) -> Result<QuoteEstimate> {
        let prompt = uiux_estimate_prompt(
            client_name.as_deref().unwrap_or("[Client's Name]"),
            project_name.as_deref().unwrap_or("[Project Title]"),
        );

        let _permit = self
            .llm_slots
            .acquire()
            .await
            .map_err(|_| crate::EngineError::Processing("LLM slot pool closed".into()))?;

        let raw = self.llm.complete(&prompt).await?;
        let payload = normalize_json_payload(&raw);
        let quote = QuoteEstimate::from_json(&payload)
            .map_err(|e| crate::EngineError::Processing(format!("Invalid quote payload: {}", e)))?;

        self.push_recent(quote.clone());
        Ok(quote)
    }

    /// Most recent structured quotes, newest first.
    pub fn recent_estimates(&self, limit: usize) -> Vec<QuoteEstimate> {
        let recent = self.recent_estimates.lock().expect("estimates lock poisoned");
        recent.iter().rev().take(limit).cloned().collect()
    }

    fn push_recent(&self, quote: QuoteEstimate) {
        let mut recent = self.recent_estimates.lock().expect("estimates lock poisoned");
        recent.push_back(quote);
        while recent.len() > self.max_recent_estimates {
            recent.pop_front();
        }
    }

    /// Persist the turn; failure to persist never fails the reply.
    async fn persist(
        &self,
        session_id: &str,
        user_message: &str,
        reply: &str,
        context: AssembledContext,
    ) {
        let turn = ChatTurn::new(session_id, user_message, reply).with_context(context);
        if let Err(e) = self.sessions.save_turn(turn).await {
            warn!("Failed to persist turn for {}: {}", session_id, e);
        }
    }

    fn completed(
        &self,
        session_id: String,
        content: String,
        quote: Option<QuoteEstimate>,
        context_used: AssembledContext,
    ) -> TurnOutcome {
        TurnOutcome {
            session_id,
            content,
            quote,
            state: TurnState::Completed,
            context_used,
        }
    }

    fn failed(&self, session_id: String) -> TurnOutcome {
        TurnOutcome {
            session_id,
            content: FAILURE_REPLY.to_string(),
            quote: None,
            state: TurnState::Failed,
            context_used: AssembledContext::empty(),
        }
    }
}

/// Keyword gate for the business-only policy. Non-business topics
/// override business keywords.
fn is_business_related(query: &str) -> bool {
    const BUSINESS_KEYWORDS: &[&str] = &[
        "cost", "price", "pricing", "estimate", "quotation", "quote", "budget", "timeline",
        "ui/ux", "ui ux", "design", "development", "software", "app", "website", "web",
        "mobile", "frontend", "backend", "prototype", "wireframe", "service", "package",
        "project", "deliverable", "milestone", "plan", "payment", "discount", "startup",
        "enterprise", "subscription", "billing", "strategy", "business", "tech stack",
        "consulting", "maintenance", "branding", "client", "invoice",
    ];

    const NON_BUSINESS_TOPICS: &[&str] = &[
        "weather", "joke", "recipe", "movie", "homework", "guitar", "hobby",
        "meaning of life", "capital of",
    ];

    let query = query.to_lowercase();

    if NON_BUSINESS_TOPICS.iter().any(|t| query.contains(t)) {
        return false;
    }

    BUSINESS_KEYWORDS.iter().any(|k| query.contains(k))
}

fn is_uiux_request(query: &str) -> bool {
    const UIUX_KEYWORDS: &[&str] = &[
        "ui/ux", "ui ux", "wireframe", "prototype", "user interface", "user experience",
    ];
    let query = query.to_lowercase();
    UIUX_KEYWORDS.iter().any(|k| query.contains(k))
}

/// The fixed intake template returned for a bare "quotation" message.
fn quotation_template() -> String {
    let today = Utc::now().format("%Y-%m-%d");
    format!(
        "| Section         | Details         |\n\
         |-----------------|-----------------|\n\
         | **Client Name** | [Client's Name] |\n\
         | **Project Name**| [Project Title] |\n\
         | **Date**        | {} |\n\n\
         Please provide the following details to generate your quotation:\n\
         1. Project description\n\
         2. Required services\n\
         3. Expected timeline\n\
         4. Any specific requirements",
        today
    )
}

fn uiux_estimate_prompt(client_name: &str, project_name: &str) -> String {
    format!(
        "Generate a detailed UI/UX estimate.\n\n\
         Client Name: {client_name}\n\
         Project Name: {project_name}\n\n\
         Scope of Work:\n\
         - User Research (persona creation, surveys, interviews)\n\
         - Competitive Analysis\n\
         - Information Architecture (sitemap and user flows)\n\
         - Wireframes (low-fidelity and high-fidelity)\n\
         - Interactive Prototypes\n\
         - Visual Design (color palette, typography, UI components)\n\
         - Design Handoff (style guide and assets)\n\n\
         Timeline: 3 to 4 weeks\n\n\
         Pricing in INR:\n\
         - Research & Discovery: 10000\n\
         - Wireframes: 7500\n\
         - UI Design: 15000\n\
         - Prototyping & Revisions: 5000\n\
         - Design Handoff: 2500\n\n\
         Return ONLY valid JSON matching this schema:\n\
         {{\"client_name\": string, \"project_name\": string, \
         \"scope_of_work\": {{\"Phase\": [\"Activity\"]}}, \"timeline\": string, \
         \"pricing\": {{\"Item\": number}}, \"total\": number, \"notes\": string, \
         \"payment_terms\": string}}"
    )
}

/// Strip markdown fences and slice to the outermost JSON object.
fn normalize_json_payload(payload: &str) -> String {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }

    let without_fence = if trimmed.starts_with("```") {
        let mut lines = trimmed.lines();
        let _ = lines.next(); // drop ``` or ```json
        let mut content = lines.collect::<Vec<_>>().join("\n");
        if content.ends_with("```") {
            content.truncate(content.len().saturating_sub(3));
        }
        content.trim().to_string()
    } else {
        trimmed.to_string()
    };

    if let (Some(start), Some(end)) = (without_fence.find('{'), without_fence.rfind('}')) {
        if start < end {
            return without_fence[start..=end].to_string();
        }
    }

    without_fence
}

/// Pull a structured quote out of a reply, if one is embedded.
fn extract_quote(reply: &str) -> Option<QuoteEstimate> {
    if !reply.contains('{') {
        return None;
    }
    let payload = normalize_json_payload(reply);
    QuoteEstimate::from_json(&payload).ok()
}

/// Fix common table formatting issues in model output: missing
/// leading/trailing pipes and missing separator rows.
fn repair_tables(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut fixed: Vec<String> = Vec::new();
    let mut in_table = false;

    for (i, line) in lines.iter().enumerate() {
        if line.contains('|') {
            let mut row = line.trim().to_string();
            if !row.starts_with('|') {
                row = format!("| {}", row);
            }
            if !row.ends_with('|') {
                row = format!("{} |", row);
            }

            let starting_table = !in_table;
            in_table = true;
            fixed.push(row.clone());

            if starting_table {
                let next_is_separator = lines
                    .get(i + 1)
                    .map(|next| is_separator_row(next))
                    .unwrap_or(false);
                let next_is_row = lines.get(i + 1).map(|n| n.contains('|')).unwrap_or(false);
                if next_is_row && !next_is_separator {
                    let columns = row.matches('|').count().saturating_sub(1);
                    let separator = format!("|{}", " --- |".repeat(columns));
                    fixed.push(separator);
                }
            }
        } else {
            in_table = false;
            fixed.push(line.to_string());
        }
    }

    fixed.join("\n")
}

fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.chars().all(|c| matches!(c, '-' | '|' | ':' | ' '))
}
