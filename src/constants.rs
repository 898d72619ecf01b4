/// Constants module to avoid magic numbers in the codebase

// Backend Configuration
pub const DEFAULT_MODEL_NAME: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_MAX_TOKENS: usize = 1000;

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 600; // 10 minutes for large model requests

// Streaming
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;
pub const DEFAULT_DEMO_PACING_MS: u64 = 50;
pub const SSE_DATA_PREFIX: &str = "data:";
pub const SSE_DONE_MARKER: &str = "[DONE]";
pub const ERROR_CHUNK_PREFIX: &str = "Error: ";

// Context Rendering
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";
pub const TITLE_MAX_CHARS: usize = 50;
pub const TITLE_TRUNCATED_CHARS: usize = 47;
pub const TITLE_ELLIPSIS: &str = "...";
pub const TEXT_ITEM_ICON: &str = "📝";
pub const FILE_ITEM_ICON: &str = "📄";

// Config Locations
pub const CONFIG_DIR_NAME: &str = "mark";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOCAL_CONFIG_PATH: &str = ".mark/config.toml";
pub const ENV_PREFIX: &str = "MARK_";
