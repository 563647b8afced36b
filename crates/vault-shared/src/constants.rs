//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 86_400;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const DEFAULT_UPLOAD_ATTEMPTS: u32 = 5;
pub const ALLOWED_DOCUMENT_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];
pub const DEFAULT_CHAT_SESSION_TITLE: &str = "New Chat";
pub const DEFAULT_CHAT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_CHAT_MAX_TOKENS: u32 = 1000;
