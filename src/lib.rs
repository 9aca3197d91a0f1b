pub mod config;
pub mod error;
pub mod job;
pub mod job_builder;
pub mod memory_size;
pub mod model;
pub mod pipeline;
pub mod protein;
pub mod protein_table;
pub mod scheduler;
pub mod submission_outcome;
pub mod submitter;
pub mod template;
pub mod workflow;
