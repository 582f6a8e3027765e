//! Query construction and data access for LINCS perturbation-response
//! documents held in Couchbase.
//!
//! [`app::Lincs`] is the entry point: it turns domain requests (by key,
//! plate, cell line, perturbagen, or compound z-score key) into N1QL
//! statements or view range scans, submits them through a
//! [`store::QueryService`], and validates documents before they are written.

pub mod app;
pub mod callback;
pub mod config;
pub mod couchbase;
pub mod document;
pub mod domain;
pub mod error;
pub mod literal;
pub mod n1ql;
pub mod output;
pub mod projection;
pub mod range;
pub mod store;
