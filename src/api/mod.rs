// =============================================================================
// Dashboard API Module
// =============================================================================
//
// REST endpoints plus the push-based WebSocket feed. Everything is public:
// the engine simulates a market for a single local dashboard, so there is no
// authentication layer.

pub mod rest;
pub mod ws;
