use heapvis_layout::Layout;
use heapvis_types::TrackedObject;

use super::text::LineWriter;
use crate::Snapshot;

/// The legend canvas: history position of the displayed snapshot, then one
/// line per tracked object.
pub fn legend_layout(snapshot: &Snapshot, cursor: usize, len: usize, font: &str, font_size: f64) -> Layout {
    let mut writer = LineWriter::new(font, font_size);
    let age = match cursor {
        0 => "latest".to_string(),
        1 => "1 step back".to_string(),
        n => format!("{n} steps back"),
    };
    writer.plain(&format!(
        "snapshot #{} ({} of {len}, {age})",
        snapshot.sequence,
        cursor + 1
    ));
    writer.newline();
    for TrackedObject { object, label } in &snapshot.tracked {
        let status = if object.is_live() { "" } else { " (collected)" };
        writer.plain(&format!("{label}{status}"));
        writer.newline();
    }
    writer.finish()
}
