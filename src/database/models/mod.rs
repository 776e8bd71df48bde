pub mod article;
pub mod audit_log;
pub mod category;
pub mod contact;
pub mod content;
pub mod job;
pub mod privilege;
pub mod role;

pub use article::Article;
pub use audit_log::AuditLog;
pub use category::Category;
pub use contact::Contact;
pub use content::Content;
pub use job::Job;
pub use privilege::Privilege;
pub use role::{Role, RoleModule, UserRole};
