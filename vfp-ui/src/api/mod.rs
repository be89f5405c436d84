//! HTTP surface of the front portal
//!
//! The render layer is a thin consumer of these routes: it registers a
//! batch to watch, applies row patches off the SSE stream, and pages
//! through aggregated reports.

pub mod health;
pub mod report;
pub mod sse;
pub mod watch;

pub use health::health_routes;
pub use report::{export_group, get_report_page};
pub use sse::{patch_stream, PatchBroadcaster, PatchEvent};
pub use watch::{delete_watch, post_watch};
