use tracing::{debug, info};

use crate::editor::{EditorState, HostRequest};
use crate::mode::{Mode, Resets};
use crate::scene::{HistoryStep, Scene};
use crate::selection::{self, SelectionAction};
use crate::selector::{self, SelectorAction};
use crate::tools::{self, NewBuildingAction, NewPathAction, NewTextBoxAction};

/// 按目标组件分类的动作。每个处理函数至多返回一个后续动作。
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    App(AppAction),
    Selector(SelectorAction),
    Selection(SelectionAction),
    NewPath(NewPathAction),
    NewBuilding(NewBuildingAction),
    NewTextBox(NewTextBoxAction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    SwitchMode { mode: Mode, resets: Resets },
    NewProject,
    Open,
    Save,
    SaveAs,
    Undo,
    Redo,
    SelectCategory(Option<String>),
}

/// 把动作交给所属组件处理。
pub fn dispatch(state: &mut EditorState, action: Action) -> Option<Action> {
    match action {
        Action::App(action) => dispatch_app(state, action),
        Action::Selector(action) => selector::dispatch(state, action),
        Action::Selection(action) => selection::dispatch(state, action),
        Action::NewPath(action) => tools::dispatch_new_path(state, action),
        Action::NewBuilding(action) => tools::dispatch_new_building(state, action),
        Action::NewTextBox(action) => tools::dispatch_new_text_box(state, action),
    }
}

fn dispatch_app(state: &mut EditorState, action: AppAction) -> Option<Action> {
    match action {
        AppAction::SwitchMode { mode, resets } => {
            state.switch_mode(mode, resets);
            None
        }
        AppAction::NewProject => {
            let catalog = state.scene.shared_catalog();
            state.scene = Scene::new(catalog);
            info!("已新建空白项目");
            switch_to_normal()
        }
        AppAction::Open => request(state, HostRequest::Open),
        AppAction::Save => request(state, HostRequest::Save),
        AppAction::SaveAs => request(state, HostRequest::SaveAs),
        AppAction::Undo => history_followup(state.scene.undo()),
        AppAction::Redo => history_followup(state.scene.redo()),
        AppAction::SelectCategory(category) => {
            debug!(category = ?category, "切换建筑分类");
            state.panel.category = category;
            None
        }
    }
}

fn request(state: &mut EditorState, request: HostRequest) -> Option<Action> {
    debug!(request = ?request, "登记宿主请求");
    state.requests.push(request);
    None
}

/// 撤销/重做后：有需要显示的对象则进入选择模式，否则回到普通模式。
fn history_followup(step: HistoryStep) -> Option<Action> {
    match step {
        HistoryStep::Nothing => None,
        HistoryStep::Applied { show: Some(subset) } => {
            Some(Action::Selection(SelectionAction::InitFromSubset(subset)))
        }
        HistoryStep::Applied { show: None } => switch_to_normal(),
    }
}

#[inline]
pub(crate) fn switch_mode(mode: Mode, resets: Resets) -> Option<Action> {
    Some(Action::App(AppAction::SwitchMode { mode, resets }))
}

#[inline]
pub(crate) fn switch_to_normal() -> Option<Action> {
    switch_mode(Mode::Normal, Resets::all())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use blueprint_core::catalog::Catalog;
    use blueprint_core::geometry::Point2;
    use blueprint_core::objects::{Building, ObjectCollection};

    use super::*;
    use crate::editor::EditorSettings;
    use crate::errors::EngineError;
    use crate::mode::SelectionMode;

    fn state() -> EditorState {
        EditorState::new(Arc::new(Catalog::builtin()), EditorSettings::default())
    }

    #[test]
    fn undo_of_add_returns_to_normal_and_redo_selects() {
        let mut state = state();
        let f = state.scene().catalog().building_index("Foundation").expect("foundation");
        state.scene.add_objects(ObjectCollection::from_buildings(vec![Building::new(
            f,
            Point2::ORIGIN,
            0,
        )]));

        state.run(Action::App(AppAction::Undo)).expect("undo");
        assert_eq!(state.mode(), Mode::Normal);
        assert!(state.scene().objects().is_empty());

        let steps = state.run(Action::App(AppAction::Redo)).expect("redo");
        assert_eq!(steps, 3);
        assert_eq!(state.mode(), Mode::Selection(SelectionMode::Normal));
        assert_eq!(state.selection().subset().buildings(), &[0]);
    }

    #[test]
    fn undo_at_boundary_is_a_no_op() {
        let mut state = state();
        assert_eq!(state.run(Action::App(AppAction::Undo)).expect("undo"), 1);
        assert_eq!(state.mode(), Mode::Normal);
    }

    #[test]
    fn host_requests_are_queued() {
        let mut state = state();
        state.run(Action::App(AppAction::Save)).expect("save");
        state.run(Action::App(AppAction::Open)).expect("open");
        assert_eq!(state.take_requests(), vec![HostRequest::Save, HostRequest::Open]);
        assert!(state.take_requests().is_empty());
    }

    #[test]
    fn switch_mode_applies_resets() {
        let mut state = state();
        state
            .run(Action::App(AppAction::SelectCategory(Some("Production".into()))))
            .expect("category");
        assert_eq!(state.panel().category.as_deref(), Some("Production"));
        state
            .run(Action::App(AppAction::SwitchMode {
                mode: Mode::Normal,
                resets: Resets::none(),
            }))
            .expect("switch");
        assert!(state.panel().category.is_some());
        state
            .run(Action::App(AppAction::SwitchMode {
                mode: Mode::Normal,
                resets: Resets::all(),
            }))
            .expect("switch");
        assert!(state.panel().category.is_none());
    }

    #[test]
    fn chain_guard_reports_overflow() {
        let mut state = EditorState::new(
            Arc::new(Catalog::builtin()),
            EditorSettings {
                max_action_chain: 1,
                ..EditorSettings::default()
            },
        );
        let f = state.scene().catalog().building_index("Foundation").expect("foundation");
        state.scene.add_objects(ObjectCollection::from_buildings(vec![Building::new(
            f,
            Point2::ORIGIN,
            0,
        )]));
        let err = state.run(Action::App(AppAction::Undo)).unwrap_err();
        assert!(matches!(err, EngineError::ActionChainOverflow { limit: 1 }));
    }
}
