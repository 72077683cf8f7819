//! fleetpack-api: Shared API types and schemas
//!
//! Contains the packet metadata, deployment spec and desired-state types that
//! travel between the server, the agent and the management CLI, together with
//! their OpenAPI schema definitions.

pub mod labels;
pub mod packet;
pub mod responses;
pub mod spec;
pub mod state;

pub use labels::{LabelParseError, Labels, format_labels, parse_labels};
pub use packet::{ControlInfo, Scripts};
pub use responses::{HealthResponse, PacketListing};
pub use spec::{App, Spec};
pub use state::{DesiredApp, DesiredState, ResolutionError};
