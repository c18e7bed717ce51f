pub mod extension_file;
pub mod member;
pub mod message;
pub mod thread;

pub use extension_file::ExtensionFile;
pub use member::{MemberRole, ThreadMember, WorkspaceOutcome};
pub use message::{MessageRole, MessageRow, NewMessage};
pub use thread::{NewThread, ThreadDetail, ThreadSummary};
