mod core;
pub use core::{Chat, ChatBuilder, Submission};
mod gateway;
pub use gateway::{CompletionGateway, CompletionOptions, SharedCompletionGateway};
mod models;
pub use models::{Role, Transcript, Turn};
mod persist;
pub use persist::{LogPolicy, PersistenceLogger, RowFormat, SharedTabularLog, TabularLog};
