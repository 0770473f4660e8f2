//! Client core for the vulnfusion admin console.
//!
//! Everything the console shells (CLI today, other frontends later) share:
//! the session store with its persistence seam, the HTTP gateway that owns
//! credential attachment and 401 interception, and the wire types of the
//! `/api` contract.

pub mod error;
pub mod gateway;
pub mod session;
pub mod types;

pub use error::ConsoleError;
pub use reqwest::StatusCode;
pub use gateway::{ConsoleApi, ConsoleClient, resolve_base_url, normalize_base_url};
pub use session::{FileTokenStore, MemoryTokenStore, SessionStore, TokenStore};
pub use types::{
    DingBotConfig, LoginResponse, NoticeSummary, Page, PluginDescriptor, SaveReceipt, Severity,
    SyncTaskConfig, VulnerabilityDetail, VulnerabilitySummary,
};
