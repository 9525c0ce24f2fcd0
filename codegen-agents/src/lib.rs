//! Per-user agent sessions.
//!
//! An [`Agent`] pairs an [`AgentProfile`] with a [`SessionRegistry`]. Each
//! turn appends to the user's session history and either returns the visible
//! history or a [`TurnStream`] of events ending with [`TurnEvent::Done`].

pub mod agent;
pub mod cache;
pub mod error;
pub mod profile;
pub mod registry;
pub mod session;
pub mod stream;
pub mod turn;

pub use agent::Agent;
pub use cache::{FileProjectCache, InMemoryProjectCache, ProjectCache, ProjectDetails};
pub use error::{AgentError, FALLBACK_MESSAGE};
pub use profile::{AgentKind, AgentProfile, ProfileContext};
pub use registry::{EvictionPolicy, SessionRegistry, SharedSession};
pub use session::{Session, SessionConfig};
pub use stream::{StreamAssembler, TurnEvent, TurnStream};
pub use turn::{TurnMode, TurnOutput, TurnRunner};
