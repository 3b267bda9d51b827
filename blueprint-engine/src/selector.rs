use blueprint_core::geometry::{Point2, Rect};
use tracing::debug;

use crate::action::{self, Action};
use crate::editor::EditorState;
use crate::input::{FrameInput, KeyBinding};
use crate::mode::{Mode, Resets};
use crate::selection::SelectionAction;

#[derive(Debug, Clone, PartialEq)]
pub enum SelectorAction {
    Init(Point2),
    MoveTo(Point2),
    Select(Point2),
    Reset,
}

/// 框选矩形。只在普通模式下活动。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Selector {
    active: bool,
    start: Point2,
    end: Point2,
}

impl Selector {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.start, self.end)
    }

    pub fn init(&mut self, pos: Point2) {
        self.active = true;
        self.start = pos;
        self.end = pos;
    }

    pub fn move_to(&mut self, pos: Point2) {
        self.end = pos;
    }
}

pub(crate) fn dispatch(state: &mut EditorState, action: SelectorAction) -> Option<Action> {
    match action {
        SelectorAction::Init(pos) => {
            state.selector.init(pos);
            // 从选择模式点到空白处：放弃旧选择，回到普通模式
            if state.mode.is_selection() {
                action::switch_mode(Mode::Normal, Resets::all().with_selector(false))
            } else {
                None
            }
        }
        SelectorAction::MoveTo(pos) => {
            state.mode.assert_is(Mode::Normal);
            state.selector.move_to(pos);
            None
        }
        SelectorAction::Select(pos) => {
            state.mode.assert_is(Mode::Normal);
            state.selector.move_to(pos);
            let rect = state.selector.rect();
            let subset = state
                .scene
                .objects()
                .select_in_rect(&rect, state.scene.catalog());
            debug!(
                x = rect.x(),
                y = rect.y(),
                width = rect.width(),
                height = rect.height(),
                selected = subset.len(),
                "框选完成"
            );
            state.selector.reset();
            Some(Action::Selection(SelectionAction::InitFromSubset(subset)))
        }
        SelectorAction::Reset => {
            state.selector.reset();
            None
        }
    }
}

/// 普通模式的输入映射。
pub(crate) fn input_action(state: &EditorState, input: &FrameInput) -> Option<Action> {
    if input.key == Some(KeyBinding::Escape) && state.selector.is_active() {
        return Some(Action::Selector(SelectorAction::Reset));
    }
    if !state.selector.is_active() {
        if let Some(action) = state.app_key_action(input) {
            return Some(action);
        }
    }

    if state.selector.is_active() {
        if input.left.released {
            return Some(Action::Selector(SelectorAction::Select(input.release_pos())));
        }
        if input.left.down && input.pointer != state.selector.end {
            return Some(Action::Selector(SelectorAction::MoveTo(input.pointer)));
        }
        return None;
    }

    if !(input.in_viewport && input.left.pressed) {
        return None;
    }
    let pointer = input.pointer;
    let action = match state.scene.object_at(pointer, state.selection.subset()) {
        None => Action::Selector(SelectorAction::Init(pointer)),
        Some(object) => Action::Selection(SelectionAction::InitFromObject { object, at: pointer }),
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalizes_drag_direction() {
        let mut selector = Selector::default();
        selector.init(Point2::new(5.0, 5.0));
        selector.move_to(Point2::new(1.0, 2.0));
        assert!(selector.is_active());
        assert_eq!(selector.rect(), Rect::new(1.0, 2.0, 4.0, 3.0));
        selector.reset();
        assert!(!selector.is_active());
    }
}
