//! Data-access layer: the authoritative session store, the quiz catalog
//! collaborator, and the best-effort session audit log.

pub mod catalog;
pub mod session_log;
pub mod session_store;
