//! # Gatsling
//!
//! Bot client and swarm controller for a browser shooter's undocumented
//! positional text protocol.
//!
//! The layers live in their own crates and are re-exported here:
//! `gatsling-transport` (text WebSockets), `gatsling-protocol` (the wire
//! codec), `gatsling-client` (one stateful bot). This crate adds the
//! [`Swarm`] controller and the [`ServerDirectory`] boundary.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use gatsling::prelude::*;
//!
//! # async fn run() -> Result<(), GatslingError> {
//! let directory =
//!     StaticDirectory::from_addresses(["wss://eu1.example:443"], "ffa");
//! let swarm = Swarm::new(SwarmConfig::default());
//! swarm.start(&directory).await?;
//! // ... later
//! swarm.stop().await;
//! # Ok(())
//! # }
//! ```

mod directory;
mod error;
mod swarm;

pub use directory::{ServerDirectory, ServerRecord, StaticDirectory};
pub use error::GatslingError;
pub use swarm::{Swarm, SwarmConfig};

// The sub-crates, re-exported for single-dependency consumers.
pub use gatsling_client as client;
pub use gatsling_protocol as protocol;
pub use gatsling_transport as transport;

/// The common imports, in one place.
pub mod prelude {
    pub use crate::{
        GatslingError, ServerDirectory, ServerRecord, StaticDirectory,
        Swarm, SwarmConfig,
    };
    pub use gatsling_client::{
        Client, ClientConfig, ClientEvent, Compass, Player,
    };
    pub use gatsling_protocol::{Armor, Color, Skill, Weapon};
}
