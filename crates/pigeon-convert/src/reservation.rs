//! Output name reservation for a batch.

use std::path::{Path, PathBuf};

use pigeon_assets::{OutputSlot, SlotReservations};

/// Reserve one [`OutputSlot`] per source, in input order.
///
/// The document name is the file stem. Outputs go to `output_dir`, or next to
/// each source when it is `None`. Sources whose names clash in the same
/// directory (case-insensitively, however the directory is spelled) get `_2`, `_3`, ... suffixes. Runs before
/// any document is converted, so parallel conversions never share a name.
#[must_use]
pub fn reserve_slots(sources: &[PathBuf], output_dir: Option<&Path>) -> Vec<OutputSlot> {
    let mut reservations = SlotReservations::new();
    sources
        .iter()
        .map(|source| {
            let dir = output_dir.unwrap_or_else(|| match source.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            });
            let stem = source
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            reservations.reserve(dir, &stem)
        })
        .collect()
}
