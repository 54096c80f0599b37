//! Packet server: lifecycle, registry, accept loop, and workers.
//!
//! # Task Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ Server                                                    │
//! │                                                           │
//! │  accept supervisor ──new connections──► orchestration     │
//! │  (owns listener)                        task              │
//! │                                          │                │
//! │                              register + spawn             │
//! │                                          │                │
//! │                        ┌────────────┬────┴───────┐        │
//! │                        ▼            ▼            ▼        │
//! │                    worker 1     worker 2     worker N     │
//! │                   (1 client)   (1 client)   (1 client)    │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The orchestration task is the only place clients are registered; the
//! registry lock and the id counter are the only cross-task shared state.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent server configuration |
//! | `core` | Lifecycle coordinator and orchestration task |
//! | `registry` | Table of live clients plus id generator |
//! | `accept` | Accept supervisor task |
//! | `worker` | Per-connection worker task |

// ============================================================================
// Submodules
// ============================================================================

/// Accept supervisor task.
pub(crate) mod accept;

/// Fluent builder pattern for server configuration.
pub mod builder;

/// Core server implementation.
pub mod core;

/// Registry of currently connected clients.
pub(crate) mod registry;

/// Per-connection worker task.
pub(crate) mod worker;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ServerBuilder;
pub use core::Server;
