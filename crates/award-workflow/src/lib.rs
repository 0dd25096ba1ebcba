//! Academic term management and award nomination workflow.
//!
//! Two subsystems live here: the term registry, which keeps exactly one current term and at most
//! one term open for registration, and the award workflow, which files nominations against the
//! open term, stores their attachments, and audits every classification or status change.

pub mod config;
pub mod error;
pub mod persistence;
pub mod telemetry;
pub mod workflows;
