pub mod analysis;
pub mod audit_event;
pub mod conversation;
pub mod event;
pub mod followup;
pub mod organization;
pub mod profile;
pub mod role;
pub mod team;
pub mod user;

pub use analysis::AnalysisRecord;
pub use audit_event::AuditEvent;
pub use conversation::{Conversation, Message};
pub use event::{Event, FollowUpDetection, SalesStageMetrics};
pub use followup::{FollowUpTask, TrackedLink};
pub use organization::{ApiKey, Organization};
pub use profile::{Member, UserProfile};
pub use role::Role;
pub use team::Team;
pub use user::User;
