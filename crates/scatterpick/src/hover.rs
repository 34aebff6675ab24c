//! Hover state machine fed by per-frame picking results.
//!
//! Selection is owned by the host and never touched here.

use crate::picking::PickOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Hovering(usize),
}

impl HoverState {
    #[inline]
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Idle => None,
            Self::Hovering(i) => Some(i),
        }
    }
}

/// A change of hovered point. `from` must be restored before `to` is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverTransition {
    pub from: Option<usize>,
    pub to: Option<usize>,
}

impl HoverTransition {
    /// Indices whose visual entries the transition rewrites.
    pub fn touched(self) -> impl Iterator<Item = usize> {
        self.from.into_iter().chain(self.to)
    }
}

#[derive(Debug, Default)]
pub struct HoverMachine {
    state: HoverState,
}

impl HoverMachine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> HoverState {
        self.state
    }

    #[inline]
    pub fn hovered(&self) -> Option<usize> {
        self.state.index()
    }

    /// Feeds one frame's picking result. Returns the transition, if the
    /// hovered point changed.
    pub fn apply(&mut self, outcome: PickOutcome) -> Option<HoverTransition> {
        let next = match outcome {
            PickOutcome::Hit(index) => HoverState::Hovering(index),
            PickOutcome::Miss => HoverState::Idle,
            PickOutcome::Unchanged => return None,
        };
        self.transition_to(next)
    }

    /// The pointer left the drawing surface entirely.
    pub fn pointer_left(&mut self) -> Option<HoverTransition> {
        self.transition_to(HoverState::Idle)
    }

    /// Forgets the hovered point without reporting a transition; used when
    /// the dataset is replaced and visual state is rebuilt from scratch.
    pub fn reset(&mut self) {
        self.state = HoverState::Idle;
    }

    fn transition_to(&mut self, next: HoverState) -> Option<HoverTransition> {
        if next == self.state {
            return None;
        }
        let transition = HoverTransition {
            from: self.state.index(),
            to: next.index(),
        };
        log::debug!("hover {:?} -> {:?}", self.state, next);
        self.state = next;
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::{Selection, StyleConfig, VisualState, VisualStateBuilder};

    #[test]
    fn starts_idle_and_follows_hits() {
        let mut m = HoverMachine::new();
        assert_eq!(m.state(), HoverState::Idle);

        assert_eq!(
            m.apply(PickOutcome::Hit(3)),
            Some(HoverTransition { from: None, to: Some(3) })
        );
        assert_eq!(m.apply(PickOutcome::Hit(3)), None);
        assert_eq!(
            m.apply(PickOutcome::Hit(7)),
            Some(HoverTransition { from: Some(3), to: Some(7) })
        );
        assert_eq!(m.hovered(), Some(7));
    }

    #[test]
    fn unchanged_keeps_stale_hover() {
        let mut m = HoverMachine::new();
        m.apply(PickOutcome::Hit(2));
        assert_eq!(m.apply(PickOutcome::Unchanged), None);
        assert_eq!(m.state(), HoverState::Hovering(2));

        assert_eq!(
            m.pointer_left(),
            Some(HoverTransition { from: Some(2), to: None })
        );
        assert_eq!(m.pointer_left(), None);
    }

    #[test]
    fn miss_restores_pre_hover_color() {
        let style = VisualStateBuilder::new()
            .resolve(&StyleConfig::default())
            .unwrap();
        let selection: Selection = [5].into_iter().collect();
        let mut m = HoverMachine::new();
        let mut vs = VisualState::build(8, &selection, None, &style);

        let t = m.apply(PickOutcome::Hit(5)).unwrap();
        vs.apply_transition(t, &selection, &style);
        assert_eq!(vs.colors[5], style.hover.to_array());

        let t = m.apply(PickOutcome::Miss).unwrap();
        assert_eq!(t, HoverTransition { from: Some(5), to: None });
        assert_eq!(m.state(), HoverState::Idle);
        vs.apply_transition(t, &selection, &style);
        assert_eq!(vs.colors[5], style.selected.to_array());
        assert_eq!(vs.scales[5], style.scale_selected);

        // Same point, unselected this time.
        let selection = Selection::new();
        let mut vs = VisualState::build(8, &selection, Some(5), &style);
        vs.apply_transition(t, &selection, &style);
        assert_eq!(vs.colors[5], style.no_selection.to_array());
    }

    #[test]
    fn touched_lists_previous_then_next() {
        let t = HoverTransition { from: Some(4), to: Some(1) };
        assert_eq!(t.touched().collect::<Vec<_>>(), vec![4, 1]);
        let t = HoverTransition { from: None, to: Some(1) };
        assert_eq!(t.touched().collect::<Vec<_>>(), vec![1]);
    }
}
