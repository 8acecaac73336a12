pub mod openai {
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
    pub const API_BASE: &str = "https://api.openai.com/v1";
    pub const CHAT_COMPLETIONS_ENDPOINT: &str = "/chat/completions";
    pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
}

pub mod fireworks {
    pub const API_BASE: &str = "https://api.fireworks.ai/inference/v1";
}

pub mod together {
    pub const API_BASE: &str = "https://api.together.xyz/v1";
}

/// Base URLs whose structured-output requests use the embedded-schema
/// `json_object` form instead of the named `json_schema` form.
pub const JSON_OBJECT_BASE_URLS: [&str; 2] = [fireworks::API_BASE, together::API_BASE];
