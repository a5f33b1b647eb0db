use textgrab_types::{DisplayGeometry, SelectionRect, SourceRect};

/// Map a selection drawn on the overlay into captured bitmap pixels.
///
/// The overlay shows the bitmap stretched to `display`, so each axis is scaled by
/// `bitmap / display`. Coordinates are floored and the result is clamped to the
/// bitmap. Returns `None` when nothing selectable remains (a click without drag,
/// a selection fully outside the bitmap, or an empty display).
pub fn map_to_source(
    selection: &SelectionRect,
    display: &DisplayGeometry,
    bitmap_width: u32,
    bitmap_height: u32,
) -> Option<SourceRect> {
    if selection.is_degenerate()
        || display.width == 0
        || display.height == 0
        || bitmap_width == 0
        || bitmap_height == 0
    {
        return None;
    }

    let sx = f64::from(bitmap_width) / f64::from(display.width);
    let sy = f64::from(bitmap_height) / f64::from(display.height);

    let (left, right) = scale_span(selection.x, selection.width, sx, bitmap_width);
    let (top, bottom) = scale_span(selection.y, selection.height, sy, bitmap_height);

    let rect = SourceRect::new(left, top, right - left, bottom - top);
    (!rect.is_empty()).then_some(rect)
}

/// Scale one axis and clamp both ends into `[0, limit]`
fn scale_span(start: f64, len: f64, scale: f64, limit: u32) -> (u32, u32) {
    let first = (start * scale).floor();
    let last = first + (len * scale).floor();
    let clamp = |v: f64| v.clamp(0.0, f64::from(limit)) as u32;
    (clamp(first), clamp(last))
}
