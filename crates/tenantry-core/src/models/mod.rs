pub mod lead;
pub mod org_config;
pub mod report;
pub mod tenant;

pub use lead::{CreateLeadRequest, Lead, LeadStatus};
pub use org_config::{Group, Member, OrganizationConfig, SubChannel, Visibility};
pub use report::{EntityKind, EntityOutcome, Outcome, SeedReport};
pub use tenant::{NewTenant, Tenant, TenantStatus};
