//! docflow: a content connector ETL engine. Crawls a content source,
//! transforms each document through a configurable pipeline, and publishes
//! the result to a search index, coordinating the three phases through a
//! filesystem-backed, lockfile-protected crawl queue.

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod external;
pub mod hashing;
pub mod model;
pub mod orchestrator;
pub mod policy;
pub mod publish;
pub mod queue;
pub mod transform;
