//! WebSocket adapters for live chat delivery.
//!
//! # Architecture
//!
//! ```text
//!  after-commit effects
//!     │                         │
//!     │ NotificationPublisher   │ RoomMessagePublisher
//!     ▼                         ▼
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │ RegistryNotification │  │ RoomChannels         │
//! │ Publisher            │  │ broadcast per room   │
//! └──────────────────────┘  └──────────────────────┘
//!     │ try_send                │ subscribe
//!     ▼                         ▼
//! ┌─────────────────────────────────────────────────┐
//! │ Live connection (one per socket)                │
//! │   registered in InMemoryConnectionRegistry      │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - WebSocket frame types
//! - [`rooms`] - Room-scoped broadcast channels
//! - [`registry`] - Process-local connection registry
//! - [`notifier`] - Recipient-scoped publisher over the registry
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod handler;
pub mod messages;
pub mod notifier;
pub mod registry;
pub mod rooms;

pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{ClientMessage, ServerMessage};
pub use notifier::RegistryNotificationPublisher;
pub use registry::InMemoryConnectionRegistry;
pub use rooms::RoomChannels;
