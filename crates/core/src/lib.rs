pub mod category;
pub mod completion;
pub mod greeting;
pub mod location;
pub mod models;
pub mod severity;
pub mod summary;

pub use category::{resolve_category, CategoryResolution, CategoryRule};
pub use completion::{derive_knowledge_flags, next_question, KnowledgeFlags, SafetyStatus};
pub use greeting::is_bare_greeting;
pub use location::extract_location;
pub use models::*;
pub use severity::{base_severity, escalate_severity, merge_severity};
pub use summary::{conversation_text, fallback_summary, latest_user_text, normalize_text, user_texts};
