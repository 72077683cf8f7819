//! fleetpack-client: HTTP client library
//!
//! Typed access to every endpoint of the fleetpack server.
//!
//! # Examples
//!
//! ```no_run
//! use fleetpack_client::HttpClient;
//! use fleetpack_api::parse_labels;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new("http://localhost:8080")?.with_token("secret");
//!
//! // What should a device with these labels run?
//! let state = client
//!     .compute_desired_state(&parse_labels("arch=arm64,site=lab")?)
//!     .await?;
//!
//! for app in &state.apps {
//!     let bytes = client.packet_data(&app.hash).await?;
//!     println!("{} -> {} bytes", app.name, bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;

pub use error::{ClientError, Result};
pub use http::HttpClient;
