pub mod sportmonks;
pub mod telegram;

// Re-export commonly used types
pub use sportmonks::SportMonksClient;
pub use telegram::{BotUser, TelegramClient};
