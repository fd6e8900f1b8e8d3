//! Core traits for the synchronizer
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Discover the current public IP
//! - [`GroupGateway`]: Describe and mutate security groups
//! - [`StateStore`]: Persist the last authorized CIDR

pub mod gateway;
pub mod ip_source;
pub mod state_store;

pub use gateway::{AuthorizeOutcome, GroupGateway, IngressRule, RevokeOutcome, SecurityGroup};
pub use ip_source::{DottedQuad, IpSource};
pub use state_store::StateStore;
