//! Controllers behind the vulnfusion console views.
//!
//! Each controller is an explicit state machine: views feed it input and
//! render its state, the async gateway is only touched at well-defined call
//! sites, and nothing here depends on any UI framework's lifecycle.

pub mod catalog;
pub mod config_form;
pub mod filter;
pub mod route_guard;

pub use catalog::{Catalog, CatalogController, FetchTicket, NoticeCatalog, VulnCatalog};
pub use config_form::{ConfigEndpoint, ConfigFormController, DingBotEndpoint, SyncTaskEndpoint};
pub use filter::{FilterEdit, FilterState, DEFAULT_PAGE_SIZE};
pub use route_guard::{GuardDecision, GuardState, RouteGuard};
