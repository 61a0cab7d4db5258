//! Deterministic collaborators for tests.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use heapvis_layout::{Layout, LayoutEngine, LayoutError};
use heapvis_types::{Closure, DrawOp, Entry, HeapSnapshot, ObjectRef, Size};
use parking_lot::Mutex;

use crate::collab::{Canvas, Host, SnapshotProvider};
use crate::state::Collaborators;
use crate::surface::{ExportFormat, Surface, SurfaceBackend};

/// `dot -Txdot` output for one name node `-1` bound to entry `0`.
pub(crate) const LIST_XDOT: &str = r#"digraph heap {
	graph [bb="0,0,62,116"];
	"-1"	[height=0.05, pos="27,112", shape=point, style=invis, width=0.05];
	"0"	[_draw_="c 7 -#000000 p 4 0 0 0 36 54 36 54 0 ",
		_ldraw_="F 10 9 -Helvetica T 9 14.3 0 7 1 -: ",
		height=0.5, pos="27,18", shape=record, width=0.75];
	"-1" -> "0"	[_draw_="c 7 -#000000 B 4 27 107 27 98 27 77 27 57 ", label=xs];
}
"#;

/// Text of a layout's text operations, one string per baseline.
pub(crate) fn text_of(layout: &Layout) -> Vec<String> {
    let mut lines: Vec<(f64, String)> = Vec::new();
    for item in &layout.items {
        let DrawOp::Text { at, text, .. } = &item.op else {
            continue;
        };
        match lines.last_mut() {
            Some((y, line)) if *y == at.y => line.push_str(text),
            _ => lines.push((at.y, text.clone())),
        }
    }
    lines.into_iter().map(|(_, line)| line).collect()
}

// ── Layout engine ───────────────────────────────────────────────

pub(crate) struct FakeEngine {
    xdot: String,
    available: AtomicBool,
    calls: AtomicUsize,
}

impl FakeEngine {
    pub(crate) fn new(xdot: &str) -> Self {
        Self {
            xdot: xdot.to_string(),
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn unavailable() -> Self {
        let engine = Self::new("");
        engine.set_available(false);
        engine
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LayoutEngine for FakeEngine {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn layout(&self, _dot: &str) -> Result<String, LayoutError> {
        if !self.is_available() {
            return Err(LayoutError::Unavailable("fake engine switched off".into()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.xdot.clone())
    }
}

// ── Snapshot provider ───────────────────────────────────────────

/// One pointer-free entry per live root, numbered in root order.
#[derive(Default)]
pub(crate) struct FakeProvider {
    pub(crate) forced: Mutex<Vec<ObjectRef>>,
    pub(crate) snapshots: AtomicUsize,
    /// How long each snapshot takes.
    pub(crate) delay: Mutex<Duration>,
}

impl SnapshotProvider for FakeProvider {
    fn snapshot(&self, roots: &[ObjectRef], _depth: usize) -> Result<HeapSnapshot, String> {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        Ok(HeapSnapshot::new(
            roots
                .iter()
                .filter(|root| root.is_live())
                .enumerate()
                .map(|(id, root)| {
                    Entry::new(id, Closure::Fields(vec!["Obj".into()]), vec![])
                        .with_object(root.clone())
                }),
        ))
    }

    fn force(&self, object: &ObjectRef) -> Result<(), String> {
        self.forced.lock().push(object.clone());
        Ok(())
    }
}

// ── Host ────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct RecordingHost {
    pub(crate) requests: Mutex<Vec<Canvas>>,
}

impl RecordingHost {
    pub(crate) fn count(&self, canvas: Canvas) -> usize {
        self.requests.lock().iter().filter(|c| **c == canvas).count()
    }
}

impl Host for RecordingHost {
    fn request_redraw(&self, canvas: Canvas) {
        self.requests.lock().push(canvas);
    }
}

// ── Surfaces ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Export {
    pub(crate) format: ExportFormat,
    pub(crate) path: PathBuf,
    pub(crate) size: Size,
    pub(crate) ops: usize,
}

/// Records finished exports instead of writing files.
#[derive(Default)]
pub(crate) struct MemoryBackend {
    pub(crate) exports: Arc<Mutex<Vec<Export>>>,
    pub(crate) fail: AtomicBool,
    pub(crate) refused: Mutex<Vec<ExportFormat>>,
}

struct MemorySurface {
    export: Export,
    sink: Arc<Mutex<Vec<Export>>>,
}

impl SurfaceBackend for MemoryBackend {
    fn supports(&self, format: ExportFormat) -> bool {
        !self.refused.lock().contains(&format)
    }

    fn open(&self, format: ExportFormat, path: &Path, size: Size) -> io::Result<Box<dyn Surface>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        Ok(Box::new(MemorySurface {
            export: Export {
                format,
                path: path.to_path_buf(),
                size,
                ops: 0,
            },
            sink: self.exports.clone(),
        }))
    }
}

impl Surface for MemorySurface {
    fn draw(&mut self, _op: &DrawOp) -> io::Result<()> {
        self.export.ops += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        let MemorySurface { export, sink } = *self;
        sink.lock().push(export);
        Ok(())
    }
}

// ── Wiring ──────────────────────────────────────────────────────

pub(crate) struct Fakes {
    pub(crate) provider: Arc<FakeProvider>,
    pub(crate) engine: Arc<FakeEngine>,
    pub(crate) host: Arc<RecordingHost>,
    pub(crate) backend: Arc<MemoryBackend>,
}

impl Fakes {
    pub(crate) fn new() -> Self {
        Self {
            provider: Arc::default(),
            engine: Arc::new(FakeEngine::new(LIST_XDOT)),
            host: Arc::default(),
            backend: Arc::default(),
        }
    }

    pub(crate) fn collaborators(&self) -> Collaborators {
        Collaborators {
            provider: self.provider.clone(),
            engine: self.engine.clone(),
            host: self.host.clone(),
            backend: self.backend.clone(),
        }
    }
}
