//! # compass-rs
//!
//! Capability-based routing of natural-language queries across independently
//! operated agents.
//!
//! A query is analyzed into an intent and the capabilities it needs, agents
//! advertising those capabilities are ranked from a directory, the best few
//! are invoked concurrently, and their answers are merged into one response.
//! A slow or failing agent never blocks or fails the others.
//!
//! ## Example
//!
//! ```no_run
//! use compass_rs::routing::{CompassConfig, RouteOptions, build_compass};
//!
//! # async fn run() -> Result<(), compass_rs::Error> {
//! let config = CompassConfig::builder().from_env().build()?;
//! let compass = build_compass(&config, Some(std::path::Path::new("agents.json")))?;
//!
//! let result = compass
//!     .route(&RouteOptions::new("Generate a photorealistic mountain landscape"))
//!     .await?;
//! println!("{}", result.synthesized_response);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: domain types (agents, analyses, scores, responses)
//! - [`routing`]: the analyze → match → dispatch → synthesize pipeline
//! - [`cli`]: the `compass-rs` command-line interface
//! - [`error`]: error types

pub mod cli;
pub mod core;
pub mod error;
pub mod routing;

pub use core::{
    Agent, AgentResponse, AgentSearchCriteria, QueryAnalysis, RankedAgent, RelevanceScore,
    RouteResult, SearchResult,
};
pub use error::{CommandError, Error, Result, RoutingError};
pub use routing::{Compass, CompassConfig, RouteOptions, SearchOptions};
