use std::path::PathBuf;

use heapvis_types::TrackedObject;

use crate::surface::ExportFormat;

/// A request for the reactor. Everything that changes the registry, the
/// history or the active view goes through one of these.
#[derive(Debug, Clone)]
pub enum Signal {
    NewObject(TrackedObject),
    Clear,
    Update,
    SwitchView,
    MoveHistory(isize),
    Export(ExportFormat, PathBuf),
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Signal::NewObject(_) => "new_object",
            Signal::Clear => "clear",
            Signal::Update => "update",
            Signal::SwitchView => "switch_view",
            Signal::MoveHistory(_) => "move_history",
            Signal::Export(..) => "export",
        }
    }
}
