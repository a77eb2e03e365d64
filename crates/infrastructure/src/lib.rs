//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_organization_service;
mod in_memory_organization_service;

pub use http_organization_service::{HttpOrganizationService, HttpOrganizationServiceConfig};
pub use in_memory_organization_service::InMemoryOrganizationService;
