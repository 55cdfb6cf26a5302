//! Fit long documents into an LLM prompt under a model's token budget.
//!
//! The core is [`truncation`] and [`pipeline`]; [`extract`] and [`providers`]
//! are the I/O on either side of it.

pub mod config;
pub mod extract;
pub mod pipeline;
pub mod providers;
pub mod templating;
pub mod truncation;
