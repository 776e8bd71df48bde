pub mod audit_service;
pub mod entity_service;
pub mod role_service;

pub use audit_service::{AuditContext, AuditService};
pub use entity_service::EntityService;
pub use role_service::RoleService;
