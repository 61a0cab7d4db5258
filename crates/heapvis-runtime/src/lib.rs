//! Interactive runtime for heapvis.
//!
//! A single reactor task owns all structural state. Callers talk to it
//! through a [`Handle`]: structural requests become [`Signal`]s on a
//! one-slot channel, while pointer and keyboard input adjust the viewport
//! in place and ask the [`Host`] for repaints.
//!
//! ```text
//! Handle ──Signal──▶ Reactor ──▶ SnapshotProvider ──▶ build_graph
//!                       │                                  │
//!                       ▼                                  ▼
//!                    History ◀──────── Snapshot ◀──── (pruned, laid out
//!                       │                               by the view)
//!                       ▼
//!                 Views ──▶ Host::request_redraw
//! ```

mod collab;
mod config;
mod handle;
mod history;
mod reactor;
mod registry;
mod signal;
mod state;
pub mod surface;
mod view;
mod viewport;

#[cfg(test)]
pub(crate) mod testing;

pub use collab::{Canvas, Headless, Host, SnapshotProvider};
pub use config::RuntimeConfig;
pub use handle::Handle;
pub use history::{History, Snapshot};
pub use reactor::start;
pub use registry::Registry;
pub use signal::Signal;
pub use state::{AppState, Collaborators};
pub use surface::{ExportFormat, FileBackend, Surface, SurfaceBackend};
pub use view::{Frame, GraphView, ListView, Scene, ViewContext, ViewKind, Views, legend_layout};
pub use viewport::{
    Key, KeyPress, MAX_ZOOM, MIN_ZOOM, PAN_STEP, PAN_STEP_LARGE, ScrollDirection, ViewState, ZOOM_STEP,
    ZoomAnchor,
};
