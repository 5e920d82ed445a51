//! # Camera Device Selection
//!
//! Picks the camera a scan session should open.
//!
//! The platform only gives us free-text labels, so the default choice is a
//! label heuristic: prefer anything that looks rear-facing, otherwise take the
//! first device. The heuristic is best-effort and kept separate from the
//! session so an explicit user choice (see [`choose_device`]) can override it.
//!
//! ## Selection Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  devices = [Front Camera, Back Camera, USB Webcam]                      │
//! │                                                                         │
//! │  1. preferred id configured and present?  → that device                 │
//! │  2. first label containing a hint         → "Back Camera"               │
//! │     (case-insensitive: back / rear / environment)                       │
//! │  3. otherwise                             → devices[0]                  │
//! │  4. empty list                            → CoreError::NoCameraFound    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::CameraDevice;
use crate::DEFAULT_LABEL_HINTS;

/// Selects a camera using the default rear-facing label hints.
///
/// ## Example
/// ```rust
/// use shelf_core::{select_device, CameraDevice};
///
/// let devices = vec![
///     CameraDevice::new("a", "Front Camera"),
///     CameraDevice::new("b", "Back Camera"),
/// ];
/// assert_eq!(select_device(&devices).unwrap().label, "Back Camera");
/// assert!(select_device(&[]).is_err());
/// ```
pub fn select_device(devices: &[CameraDevice]) -> CoreResult<&CameraDevice> {
    select_device_with(devices, &DEFAULT_LABEL_HINTS)
}

/// Selects a camera using caller-supplied label hints.
///
/// The first device (in list order) whose label contains ANY hint wins;
/// hint order does not matter. Falls back to the first device.
pub fn select_device_with<'a, S: AsRef<str>>(
    devices: &'a [CameraDevice],
    hints: &[S],
) -> CoreResult<&'a CameraDevice> {
    let first = devices.first().ok_or(CoreError::NoCameraFound)?;

    let hints: Vec<String> = hints
        .iter()
        .map(|h| h.as_ref().to_lowercase())
        .filter(|h| !h.is_empty())
        .collect();

    let matched = devices.iter().find(|device| {
        let label = device.label.to_lowercase();
        hints.iter().any(|hint| label.contains(hint.as_str()))
    });

    Ok(matched.unwrap_or(first))
}

/// Selects a camera, honouring an explicit device id when it is available.
///
/// A preferred id that is not in the list (camera unplugged since it was
/// chosen) falls back to the label heuristic rather than failing.
pub fn choose_device<'a, S: AsRef<str>>(
    devices: &'a [CameraDevice],
    preferred_id: Option<&str>,
    hints: &[S],
) -> CoreResult<&'a CameraDevice> {
    if let Some(id) = preferred_id {
        if let Some(device) = devices.iter().find(|d| d.id == id) {
            return Ok(device);
        }
    }

    select_device_with(devices, hints)
}

// =============================================================================
// Unit Tests
// =============================================================================
