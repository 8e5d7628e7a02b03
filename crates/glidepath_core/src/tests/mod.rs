//! Integration tests for the glidepath engine
//!
//! Tests are organized by topic:
//! - `builder_dsl` - Fluent construction of simulation params
//! - `determinism` - Seeding, worker-count independence and cancellation
//! - `invariants` - Per-year properties every trajectory must satisfy
//! - `scenarios` - End-to-end household scenarios and sensitivity checks
//! - `protocol` - Worker task and result message shapes

mod builder_dsl;
mod scenarios;
