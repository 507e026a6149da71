//! # REST API Module
//!
//! This module defines all HTTP endpoints for the settlement backend.
//!
//! ## Endpoint Overview
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/api/investments` | Create a subscription investment |
//! | GET | `/api/investments/plans` | List available plans |
//! | GET | `/api/investments/portfolio` | Client portfolio view |
//! | GET | `/api/admin/subscription-investments` | List investments (admin) |
//! | PUT | `/api/admin/subscription-investments/:id/daily-return` | Override effective rate |
//! | PUT | `/api/admin/subscription-investments/:id/status` | Force status change |
//! | PUT | `/api/admin/investments/:id/manual-adjust` | Set/clear earnings override |
//! | GET | `/api/admin/commissions` | List commissions |
//! | GET | `/api/admin/commissions/export.csv` | CSV export |
//! | PUT | `/api/admin/commissions/:id/pay` | Mark commission paid |
//! | POST | `/api/admin/settlement/run` | Run a settlement pass now |
//! | GET | `/health` | Health check |
//!
//! ## Request/Response Format
//!
//! All JSON endpoints share the same envelope:
//!
//! ```json
//! // Success response
//! {
//!     "success": true,
//!     "data": { ... }
//! }
//!
//! // Error response
//! {
//!     "success": false,
//!     "error": {
//!         "code": "ERROR_CODE",
//!         "message": "Human readable message"
//!     }
//! }
//! ```
//!
//! The CSV export is the one exception: it streams `text/csv` directly.

pub mod routes;
pub mod handlers;

pub use routes::configure_routes;
