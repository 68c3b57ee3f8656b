//! Help Desk Simulation Library
//!
//! A bounded-capacity help desk ("sleeping barber") coordination core:
//!
//! - Seekers repeatedly ask for help until each has received `quota` sessions
//! - Helpers serve the waiting seeker with the fewest sessions received
//! - A fixed number of chairs bounds how many seekers can wait at once
//! - A single coordinator serializes every admission into the wait room
//!
//! # Architecture
//!
//! ```text
//! Simulation
//! ├── AdmissionCoordinator (singleton, only caller of WaitRoom::admit)
//! ├── N HelperActors  ── occupied permit ──► WaitRoom::take_highest_priority
//! └── M SeekerActors  ── free-chair permit ──► AdmissionHandle::request_admission
//!         └── ShutdownCounter: the last seeker to finish stops everyone
//! ```
//!
//! # Key Guarantees
//!
//! - **No lost wake-ups**: seekers wait on `watch` transitions, never on flags
//! - **No double occupancy**: a seeker holds at most one slot and is taken at
//!   most once per admission
//! - **Deterministic priority**: strictly fewest sessions, ties to the lowest slot
//! - **Clean termination**: exactly `seekers × quota` sessions, then every actor exits
//!
//! # Modules
//!
//! - [`wait_room`] - Fixed-capacity priority slot table
//! - [`coordinator`] - Admission rendezvous actor
//! - [`seeker`] / [`helper`] - The two actor kinds
//! - [`simulation`] - Wiring, joining, and the final report
//! - [`config`] - Parameters from arguments and environment

pub mod config;
pub mod coordinator;
pub mod desk;
pub mod errors;
pub mod events;
pub mod helper;
pub mod observability;
pub mod seeker;
pub mod shutdown;
pub mod simulation;
pub mod stats;
pub mod wait_room;

pub use config::{Config, ConfigError};
pub use errors::DeskError;
pub use events::{DeskEvent, EventSink};
pub use simulation::{Simulation, SimulationReport};
