//! Engine configuration
//!
//! Loaded once at startup from environment variables and passed into
//! the pipeline as an owned value; no ambient globals.

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_CHAT_MODEL: &str = "mistral:latest";
const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text:latest";

const DEFAULT_TOP_K: usize = 3;
const DEFAULT_TOP_N: usize = 8;
const DEFAULT_GRAPH_DEPTH: usize = 2;

const DEFAULT_CONTEXT_BUDGET_TOKENS: usize = 1500;
const DEFAULT_MAX_PROMPT_TOKENS: usize = 4000;
const DEFAULT_HISTORY_LIMIT: usize = 20;

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
const DEFAULT_LLM_RETRIES: u32 = 1;
const DEFAULT_LLM_POOL_SIZE: usize = 4;
const DEFAULT_MAX_RECENT_ESTIMATES: usize = 10;

fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

/// Tunables for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the local Ollama server
    pub ollama_url: String,
    /// Completion model
    pub chat_model: String,
    /// Embedding model
    pub embed_model: String,

    /// Maximum chunks returned per query
    pub top_k: usize,
    /// Maximum entities returned per query
    pub top_n: usize,
    /// Graph traversal depth from each matched entity
    pub graph_depth: usize,

    /// Token budget for the assembled context block
    pub context_budget_tokens: usize,
    /// Model context window, in tokens
    pub max_prompt_tokens: usize,
    /// Most recent history turns considered per prompt
    pub history_limit: usize,

    /// Per-call timeout for LLM and embedding requests
    pub llm_timeout_secs: u64,
    /// Retries after a failed LLM call
    pub llm_retries: u32,
    /// Concurrent LLM calls allowed across sessions
    pub llm_pool_size: usize,
    /// Recent structured quotes kept in memory
    pub max_recent_estimates: usize,

    /// Optional path to a system prompt file
    pub system_prompt_file: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            top_n: DEFAULT_TOP_N,
            graph_depth: DEFAULT_GRAPH_DEPTH,
            context_budget_tokens: DEFAULT_CONTEXT_BUDGET_TOKENS,
            max_prompt_tokens: DEFAULT_MAX_PROMPT_TOKENS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            llm_retries: DEFAULT_LLM_RETRIES,
            llm_pool_size: DEFAULT_LLM_POOL_SIZE,
            max_recent_estimates: DEFAULT_MAX_RECENT_ESTIMATES,
            system_prompt_file: None,
        }
    }
}

impl EngineConfig {
    /// Read configuration from the environment, falling back to the
    /// defaults above.
    pub fn from_env() -> Self {
        Self {
            ollama_url: env_or_default("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            chat_model: env_or_default("CHAT_MODEL", DEFAULT_CHAT_MODEL),
            embed_model: env_or_default("EMBED_MODEL", DEFAULT_EMBED_MODEL),
            top_k: env_usize("RETRIEVAL_TOP_K", DEFAULT_TOP_K),
            top_n: env_usize("RETRIEVAL_TOP_N", DEFAULT_TOP_N),
            graph_depth: env_usize("GRAPH_DEPTH", DEFAULT_GRAPH_DEPTH),
            context_budget_tokens: env_usize("CONTEXT_BUDGET_TOKENS", DEFAULT_CONTEXT_BUDGET_TOKENS),
            max_prompt_tokens: env_usize("MAX_PROMPT_TOKENS", DEFAULT_MAX_PROMPT_TOKENS),
            history_limit: env_usize("CHAT_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT),
            llm_timeout_secs: env_u64("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS),
            llm_retries: std::env::var("LLM_RETRIES")
                .ok()
                .and_then(|value| value.parse::<u32>().ok())
                .unwrap_or(DEFAULT_LLM_RETRIES),
            llm_pool_size: env_usize("LLM_POOL_SIZE", DEFAULT_LLM_POOL_SIZE),
            max_recent_estimates: env_usize("MAX_RECENT_ESTIMATES", DEFAULT_MAX_RECENT_ESTIMATES),
            system_prompt_file: std::env::var("SYSTEM_PROMPT_FILE").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.graph_depth, 2);
        assert_eq!(config.llm_retries, 1);
        assert!(config.context_budget_tokens < config.max_prompt_tokens);
    }
}
