//! Domain Layer - Quote styles, answer states and the error taxonomy.
//!
//! This layer contains the core types shared by the inference client and the
//! delivery pipeline. Nothing here touches the network, the clock or the
//! filesystem.

/// Quote styles and their fixed prompts.
pub mod quote;

/// Answer lifecycle and generation outcomes.
pub mod generation;
