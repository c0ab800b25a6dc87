mod core;
pub use core::{Message, OpenAiGateway, completion, completion_payload};
