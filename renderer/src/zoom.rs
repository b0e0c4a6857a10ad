use std::collections::BTreeSet;

use parking_lot::Mutex;

/// Settings for the image zoom overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomOptions {
    /// Selector of the scroll container the overlay is bounded by.
    pub container: String,
    pub background: String,
    /// Gap around a zoomed image, in pixels.
    pub margin: u32,
}

impl ZoomOptions {
    pub fn for_viewport(width: u32) -> Self {
        ZoomOptions {
            container: ".notion-viewport".to_string(),
            background: "rgba(0, 0, 0, 0.8)".to_string(),
            margin: margin_for_viewport(width),
        }
    }
}

pub fn margin_for_viewport(width: u32) -> u32 {
    match width {
        0..500 => 8,
        500..800 => 20,
        800..1280 => 30,
        1280..1600 => 40,
        1600..1920 => 48,
        _ => 72,
    }
}

/// Image zoom controller shared by every image of one render tree.
///
/// Holds no external resources; dropping the last handle tears it down.
#[derive(Debug)]
pub struct ZoomController {
    options: ZoomOptions,
    attached: Mutex<BTreeSet<String>>,
}

impl ZoomController {
    pub fn new(options: ZoomOptions) -> Self {
        ZoomController {
            options,
            attached: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn options(&self) -> &ZoomOptions {
        &self.options
    }

    /// Register an image block as zoomable. Repeat attaches are no-ops.
    pub fn attach(&self, block_id: &str) {
        self.attached.lock().insert(block_id.to_string());
    }

    pub fn is_attached(&self, block_id: &str) -> bool {
        self.attached.lock().contains(block_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_breakpoints() {
        assert_eq!(margin_for_viewport(320), 8);
        assert_eq!(margin_for_viewport(500), 20);
        assert_eq!(margin_for_viewport(1024), 30);
        assert_eq!(margin_for_viewport(1440), 40);
        assert_eq!(margin_for_viewport(1919), 48);
        assert_eq!(margin_for_viewport(2560), 72);
    }

    #[test]
    fn attach_is_idempotent() {
        let zoom = ZoomController::new(ZoomOptions::for_viewport(1024));
        zoom.attach("img");
        zoom.attach("img");
        assert!(zoom.is_attached("img"));
        assert!(!zoom.is_attached("other"));
        assert_eq!(zoom.options().margin, 30);
    }
}
