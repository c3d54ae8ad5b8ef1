//! Two-phase lifecycle shared by every perception layer.
//!
//! A layer moves between exactly two states: torn down and drawn. `draw`
//! always tears down previous state first, so a failed or repeated draw can
//! never leave a half-initialized layer behind. Children are registered once
//! at construction, drawn in declaration order, and torn down in reverse.

use anyhow::Result;
use log::{debug, warn};

/// Lifecycle position of a layer group.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LifecycleState {
    TornDown,
    Drawn,
}

/// One member of a layer group.
///
/// `draw` builds the layer's state from scratch; `tear_down` reverses it and
/// must be a no-op when nothing was drawn.
pub trait Layer {
    fn name(&self) -> &str;

    fn draw(&mut self) -> Result<()>;

    fn tear_down(&mut self);
}

/// Ordered container of layers with serialized draw/tear-down.
///
/// Re-entrancy is excluded by `&mut self`; the generation counter makes the
/// remaining hazard visible: a caller holding state from generation N can
/// detect that a full redraw happened underneath it and must not mix old and
/// new state.
pub struct LayerGroup {
    name: String,
    children: Vec<Box<dyn Layer>>,
    state: LifecycleState,
    generation: u64,
    visible: bool,
}

impl LayerGroup {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Layer>>) -> Self {
        Self {
            name: name.into(),
            children,
            state: LifecycleState::TornDown,
            generation: 0,
            visible: true,
        }
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Bumped once per completed `draw`. Equal generations mean the drawn
    /// state has not been replaced in between.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Visibility is a cheap per-frame flag, independent of the lifecycle:
    /// a hidden group stays fully drawn.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Draws all children in declaration order, tearing down any previous
    /// state first.
    ///
    /// On a child failure the already-drawn children are torn down again so
    /// the group lands back in `TornDown`, never in a mixed state.
    pub fn draw(&mut self) -> Result<()> {
        if self.state == LifecycleState::Drawn {
            self.tear_down();
        }

        for i in 0..self.children.len() {
            if let Err(err) = self.children[i].draw() {
                warn!(
                    "group '{}': child '{}' failed to draw; unwinding",
                    self.name,
                    self.children[i].name()
                );
                for child in self.children[..i].iter_mut().rev() {
                    child.tear_down();
                }
                return Err(err);
            }
        }

        self.state = LifecycleState::Drawn;
        self.generation = self.generation.wrapping_add(1);
        debug!("group '{}' drawn (generation {})", self.name, self.generation);
        Ok(())
    }

    /// Tears children down in reverse declaration order. A no-op when the
    /// group is not drawn.
    pub fn tear_down(&mut self) {
        if self.state == LifecycleState::TornDown {
            return;
        }
        for child in self.children.iter_mut().rev() {
            child.tear_down();
        }
        self.state = LifecycleState::TornDown;
        debug!("group '{}' torn down", self.name);
    }
}

impl Drop for LayerGroup {
    fn drop(&mut self) {
        self.tear_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type EventLog = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: String,
        log: EventLog,
        fail: bool,
    }

    impl Layer for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn draw(&mut self) -> Result<()> {
            if self.fail {
                anyhow::bail!("{} refused to draw", self.name);
            }
            self.log.borrow_mut().push(format!("draw {}", self.name));
            Ok(())
        }

        fn tear_down(&mut self) {
            self.log.borrow_mut().push(format!("down {}", self.name));
        }
    }

    fn recorder(name: &str, log: &EventLog, fail: bool) -> Box<dyn Layer> {
        Box::new(Recorder {
            name: name.into(),
            log: log.clone(),
            fail,
        })
    }

    fn group(log: &EventLog) -> LayerGroup {
        LayerGroup::new(
            "g",
            vec![recorder("a", log, false), recorder("b", log, false)],
        )
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn draws_in_order_tears_down_in_reverse() {
        let log: EventLog = Rc::default();
        let mut g = group(&log);

        g.draw().unwrap();
        g.tear_down();
        assert_eq!(
            *log.borrow(),
            vec!["draw a", "draw b", "down b", "down a"]
        );
    }

    #[test]
    fn redraw_tears_down_previous_state_first() {
        let log: EventLog = Rc::default();
        let mut g = group(&log);

        g.draw().unwrap();
        let first = g.generation();
        g.draw().unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["draw a", "draw b", "down b", "down a", "draw a", "draw b"]
        );
        assert!(g.generation() > first);
    }

    #[test]
    fn tear_down_when_not_drawn_is_a_noop() {
        let log: EventLog = Rc::default();
        let mut g = group(&log);
        g.tear_down();
        assert!(log.borrow().is_empty());
    }

    // ── failure ───────────────────────────────────────────────────────────

    #[test]
    fn failed_child_unwinds_already_drawn_children() {
        let log: EventLog = Rc::default();
        let mut g = LayerGroup::new(
            "g",
            vec![
                recorder("a", &log, false),
                recorder("bad", &log, true),
                recorder("c", &log, false),
            ],
        );

        assert!(g.draw().is_err());
        assert_eq!(g.state(), LifecycleState::TornDown);
        assert_eq!(*log.borrow(), vec!["draw a", "down a"]);
    }

    #[test]
    fn visibility_does_not_affect_lifecycle() {
        let log: EventLog = Rc::default();
        let mut g = group(&log);
        g.draw().unwrap();
        g.set_visible(false);
        assert_eq!(g.state(), LifecycleState::Drawn);
        assert!(!g.is_visible());
    }
}
