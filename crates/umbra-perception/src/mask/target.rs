use log::trace;

use crate::config::Color;

use super::texture::MaskTexture;

/// Tracks which buffer is the active render destination.
///
/// Binding pushes a destination and returns a guard; dropping the guard
/// restores the previous destination. Because restoration lives in `Drop`,
/// a draw callback that panics still unwinds through the restore — skipping
/// it would corrupt every subsequent draw, so it must not be possible.
#[derive(Debug, Default)]
pub struct TargetStack {
    stack: Vec<String>,
}

impl TargetStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Currently bound destination label, if any ("the screen" otherwise).
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    /// Binds `label` as the active destination until the guard drops.
    #[must_use = "dropping the guard restores the previous destination"]
    pub fn bind(&mut self, label: &str) -> BoundTarget<'_> {
        trace!("bind render target '{label}'");
        self.stack.push(label.to_string());
        BoundTarget { stack: self }
    }
}

/// Guard for a bound render destination; restores the prior destination on
/// drop, including during unwinding.
pub struct BoundTarget<'a> {
    stack: &'a mut TargetStack,
}

impl Drop for BoundTarget<'_> {
    fn drop(&mut self) {
        self.stack.stack.pop();
    }
}

/// A named secondary render pass owned by a [`RenderTargetCache`].
pub struct SecondaryPass {
    pub name: String,
    pub texture: MaskTexture,
    /// Clear color applied before the callback; `None` keeps prior contents.
    pub clear_color: Option<Color>,
    render: Box<dyn FnMut(&mut MaskTexture)>,
}

/// A reusable off-screen buffer for a subtree of drawable content.
///
/// The subtree renders into the buffer only when `auto_render` is set or
/// the cache was marked dirty; otherwise the buffer from the previous frame
/// is reused as-is. A bound display proxy composites the buffer to the
/// screen; `displayed` additionally renders the subtree live.
pub struct RenderTargetCache {
    label: String,
    texture: MaskTexture,
    dirty: bool,
    pub auto_render: bool,
    pub displayed: bool,
    clear_color: Color,
    proxy_bound: bool,
    passes: Vec<SecondaryPass>,
}

impl RenderTargetCache {
    pub fn new(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            texture: MaskTexture::new(width, height),
            dirty: true,
            auto_render: false,
            displayed: false,
            clear_color: Color::TRANSPARENT,
            proxy_bound: false,
            passes: Vec::new(),
        }
    }

    #[inline]
    pub fn texture(&self) -> &MaskTexture {
        &self.texture
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forces a re-render on the next `render` call.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Attaches a display proxy that composites the cached buffer to the
    /// screen target during `render`.
    pub fn bind_proxy(&mut self) {
        self.proxy_bound = true;
    }

    /// Registers a secondary named pass, invoked after the primary pass in
    /// registration order.
    pub fn add_pass(
        &mut self,
        name: impl Into<String>,
        clear_color: Option<Color>,
        render: impl FnMut(&mut MaskTexture) + 'static,
    ) {
        self.passes.push(SecondaryPass {
            name: name.into(),
            texture: MaskTexture::new(self.texture.width(), self.texture.height()),
            clear_color,
            render: Box::new(render),
        });
    }

    pub fn pass(&self, name: &str) -> Option<&SecondaryPass> {
        self.passes.iter().find(|p| p.name == name)
    }

    /// Renders the subtree into the cached buffer (when needed), then the
    /// secondary passes, the display proxy, and the optional live copy.
    ///
    /// `draw` receives the destination buffer; `screen` is the composition
    /// target for proxy/display output.
    pub fn render(
        &mut self,
        targets: &mut TargetStack,
        mut draw: impl FnMut(&mut MaskTexture),
        mut screen: Option<&mut MaskTexture>,
    ) {
        if self.auto_render || self.dirty {
            let _bound = targets.bind(&self.label);
            self.texture.clear(self.clear_color);
            draw(&mut self.texture);
            self.dirty = false;
            // _bound drops here, restoring the prior destination even if
            // `draw` unwound.
        }

        for pass in &mut self.passes {
            let _bound = targets.bind(&pass.name);
            if let Some(color) = pass.clear_color {
                pass.texture.clear(color);
            }
            (pass.render)(&mut pass.texture);
        }

        if self.proxy_bound
            && let Some(screen) = screen.as_deref_mut()
        {
            screen.blend_max(&self.texture);
        }

        if self.displayed
            && let Some(screen) = screen.as_deref_mut()
        {
            draw(screen);
        }
    }

    /// Resizes every owned buffer after a viewport change and marks dirty.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.texture.resize(width, height);
        for pass in &mut self.passes {
            pass.texture.resize(width, height);
        }
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rect;
    use crate::geometry::Polygon;
    use crate::mask::Channel;

    fn fill_all(tex: &mut MaskTexture) {
        let full = Polygon::from_rect(Rect::new(0.0, 0.0, 64.0, 64.0));
        tex.fill_polygon(&full, Color::WHITE);
    }

    // ── bind/restore ──────────────────────────────────────────────────────

    #[test]
    fn bind_restores_on_drop() {
        let mut targets = TargetStack::new();
        {
            let _a = targets.bind("a");
        }
        assert_eq!(targets.depth(), 0);
        assert_eq!(targets.current(), None);
    }

    #[test]
    fn bind_restores_on_panic() {
        let mut targets = TargetStack::new();
        let mut cache = RenderTargetCache::new("mask", 8, 8);
        cache.mark_dirty();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.render(&mut targets, |_| panic!("draw failed"), None);
        }));
        assert!(result.is_err());
        // The destination stack is balanced even after the unwind.
        assert_eq!(targets.depth(), 0);
    }

    // ── dirty / auto_render ───────────────────────────────────────────────

    #[test]
    fn renders_only_when_dirty() {
        let mut targets = TargetStack::new();
        let mut cache = RenderTargetCache::new("mask", 64, 64);
        let mut draws = 0;

        cache.render(&mut targets, |t| { draws += 1; fill_all(t); }, None);
        cache.render(&mut targets, |t| { draws += 1; fill_all(t); }, None);
        assert_eq!(draws, 1);

        cache.mark_dirty();
        cache.render(&mut targets, |t| { draws += 1; fill_all(t); }, None);
        assert_eq!(draws, 2);
    }

    #[test]
    fn auto_render_draws_every_frame() {
        let mut targets = TargetStack::new();
        let mut cache = RenderTargetCache::new("mask", 64, 64);
        cache.auto_render = true;
        let mut draws = 0;

        cache.render(&mut targets, |_| draws += 1, None);
        cache.render(&mut targets, |_| draws += 1, None);
        assert_eq!(draws, 2);
    }

    // ── proxy / displayed ─────────────────────────────────────────────────

    #[test]
    fn proxy_composites_cache_to_screen() {
        let mut targets = TargetStack::new();
        let mut cache = RenderTargetCache::new("mask", 64, 64);
        cache.bind_proxy();
        let mut screen = MaskTexture::new(64, 64);

        cache.render(&mut targets, fill_all, Some(&mut screen));
        assert!(screen.any_coverage(Channel::Red));
    }

    #[test]
    fn displayed_renders_subtree_to_screen_even_when_clean() {
        let mut targets = TargetStack::new();
        let mut cache = RenderTargetCache::new("mask", 64, 64);
        let mut screen = MaskTexture::new(64, 64);

        // Warm the cache, then clear dirty.
        cache.render(&mut targets, fill_all, None);
        cache.displayed = true;
        cache.render(&mut targets, fill_all, Some(&mut screen));
        assert!(screen.any_coverage(Channel::Red));
    }

    // ── secondary passes / resize ─────────────────────────────────────────

    #[test]
    fn secondary_pass_runs_after_primary() {
        let mut targets = TargetStack::new();
        let mut cache = RenderTargetCache::new("mask", 64, 64);
        cache.add_pass("glow", Some(Color::TRANSPARENT), |t| {
            let dot = Polygon::from_rect(Rect::new(0.0, 0.0, 4.0, 4.0));
            t.fill_polygon_channel(&dot, Channel::Green, 9);
        });

        cache.render(&mut targets, |_| {}, None);
        let pass = cache.pass("glow").unwrap();
        assert!(pass.texture.any_coverage(Channel::Green));
    }

    #[test]
    fn resize_marks_dirty_and_resizes_passes() {
        let mut targets = TargetStack::new();
        let mut cache = RenderTargetCache::new("mask", 64, 64);
        cache.add_pass("aux", None, |_| {});
        cache.render(&mut targets, |_| {}, None);
        assert!(!cache.is_dirty());

        cache.resize(32, 32);
        assert!(cache.is_dirty());
        assert_eq!(cache.texture().width(), 32);
        assert_eq!(cache.pass("aux").unwrap().texture.width(), 32);
    }
}
