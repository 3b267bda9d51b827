use blueprint_core::geometry::{Point2, Rect};
use blueprint_core::objects::{Building, ObjectCollection, ObjectSelection, Path, TextBox};
use tracing::{debug, info};

use crate::action::{self, Action};
use crate::editor::EditorState;
use crate::input::{FrameInput, KeyBinding};
use crate::mode::{Mode, Resets};
use crate::selection::SelectionAction;

#[derive(Debug, Clone, PartialEq)]
pub enum NewPathAction {
    Init(usize),
    /// 以已有端点为起点继续画路径。
    InitFrom { def_idx: usize, anchor: Point2 },
    MoveTo(Point2),
    Reverse,
    Place(Point2),
    Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NewBuildingAction {
    Init(usize),
    MoveTo(Point2),
    Rotate,
    Place(Point2),
    Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NewTextBoxAction {
    Init,
    MoveTo(Point2),
    Place(Point2),
    Escape,
}

/// 路径放置工具。第一次放置确定起点，第二次放置提交一段，然后重新等待起点。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPathTool {
    def_idx: usize,
    anchor: Point2,
    cursor: Point2,
    first_placed: bool,
    reversed: bool,
    is_valid: bool,
}

impl NewPathTool {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn def_idx(&self) -> usize {
        self.def_idx
    }

    #[inline]
    pub fn is_first_placed(&self) -> bool {
        self.first_placed
    }

    #[inline]
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// 当前草稿路径。反向时锚点成为终点。
    pub fn path(&self) -> Path {
        let path = Path::new(self.def_idx, self.anchor, self.cursor);
        if self.reversed { path.reversed() } else { path }
    }

    fn start(&mut self, def_idx: usize, anchor: Point2, cursor: Point2, first_placed: bool) {
        self.def_idx = def_idx;
        self.anchor = anchor;
        self.cursor = cursor;
        self.first_placed = first_placed;
        self.revalidate();
    }

    fn move_to(&mut self, pos: Point2) {
        if !self.first_placed {
            self.anchor = pos;
        }
        self.cursor = pos;
        self.revalidate();
    }

    fn revalidate(&mut self) {
        self.is_valid = self.first_placed && self.path().is_valid();
    }
}

/// 建筑放置工具。草稿建筑跟随指针，放置时与场景中所有建筑做碰撞检查。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewBuildingTool {
    def_idx: usize,
    pos: Point2,
    rot: i32,
    is_valid: bool,
}

impl NewBuildingTool {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn building(&self) -> Building {
        Building::new(self.def_idx, self.pos, self.rot)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }
}

/// 文本框放置工具：两次放置确定对角点。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTextBoxTool {
    anchor: Point2,
    cursor: Point2,
    first_placed: bool,
}

impl NewTextBoxTool {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn is_first_placed(&self) -> bool {
        self.first_placed
    }

    /// 草稿矩形，宽高不小于 `min_size`。
    pub fn bounds(&self, min_size: f64) -> Rect {
        let rect = Rect::from_corners(self.anchor, self.cursor);
        Rect::new(
            rect.x(),
            rect.y(),
            rect.width().max(min_size),
            rect.height().max(min_size),
        )
    }

    fn move_to(&mut self, pos: Point2) {
        if !self.first_placed {
            self.anchor = pos;
        }
        self.cursor = pos;
    }
}

pub(crate) fn dispatch_new_path(state: &mut EditorState, action: NewPathAction) -> Option<Action> {
    let tool_resets = Resets::all().with_new_path(false).with_panel(false);
    match action {
        NewPathAction::Init(def_idx) => {
            let cursor = state.settings.grid.snap(state.pointer);
            state.new_path.reset();
            state.new_path.start(def_idx, cursor, cursor, false);
            debug!(class = %state.scene.catalog().path(def_idx).class, "开始放置路径");
            action::switch_mode(Mode::NewPath, tool_resets)
        }
        NewPathAction::InitFrom { def_idx, anchor } => {
            let cursor = state.settings.grid.snap(state.pointer);
            state.new_path.reset();
            state.new_path.start(def_idx, anchor, cursor, true);
            debug!(x = anchor.x(), y = anchor.y(), "从端点继续放置路径");
            action::switch_mode(Mode::NewPath, tool_resets)
        }
        NewPathAction::MoveTo(pos) => {
            state.mode.assert_is(Mode::NewPath);
            state.new_path.move_to(pos);
            None
        }
        NewPathAction::Reverse => {
            state.mode.assert_is(Mode::NewPath);
            let tool = &mut state.new_path;
            tool.reversed = !tool.reversed;
            tool.revalidate();
            None
        }
        NewPathAction::Place(pos) => {
            state.mode.assert_is(Mode::NewPath);
            let tool = &mut state.new_path;
            if !tool.first_placed {
                tool.move_to(pos);
                tool.first_placed = true;
                tool.revalidate();
                return None;
            }
            tool.move_to(pos);
            if !tool.is_valid {
                debug!(x = pos.x(), y = pos.y(), "路径长度为零，忽略放置");
                return None;
            }
            let path = tool.path();
            // 提交后回到第一步，落点作为下一条路径的候选起点
            let def_idx = tool.def_idx;
            tool.start(def_idx, pos, pos, false);
            state.scene.add_objects(ObjectCollection::from_paths(vec![path]));
            None
        }
        NewPathAction::Escape => {
            state.mode.assert_is(Mode::NewPath);
            if state.new_path.first_placed {
                Some(Action::NewPath(NewPathAction::Init(state.new_path.def_idx)))
            } else {
                action::switch_to_normal()
            }
        }
    }
}

fn revalidate_building(state: &mut EditorState) {
    let building = state.new_building.building();
    state.new_building.is_valid = state.scene.is_building_valid(&building, None);
}

pub(crate) fn dispatch_new_building(
    state: &mut EditorState,
    action: NewBuildingAction,
) -> Option<Action> {
    match action {
        NewBuildingAction::Init(def_idx) => {
            state.new_building.reset();
            state.new_building.def_idx = def_idx;
            state.new_building.pos = state.settings.grid.snap(state.pointer);
            revalidate_building(state);
            debug!(class = %state.scene.catalog().building(def_idx).class, "开始放置建筑");
            action::switch_mode(
                Mode::NewBuilding,
                Resets::all().with_new_building(false).with_panel(false),
            )
        }
        NewBuildingAction::MoveTo(pos) => {
            state.mode.assert_is(Mode::NewBuilding);
            state.new_building.pos = pos;
            revalidate_building(state);
            None
        }
        NewBuildingAction::Rotate => {
            state.mode.assert_is(Mode::NewBuilding);
            state.new_building.rot = (state.new_building.rot + 90).rem_euclid(360);
            revalidate_building(state);
            None
        }
        NewBuildingAction::Place(pos) => {
            state.mode.assert_is(Mode::NewBuilding);
            state.new_building.pos = pos;
            revalidate_building(state);
            if !state.new_building.is_valid {
                debug!(x = pos.x(), y = pos.y(), "建筑位置被占用，忽略放置");
                return None;
            }
            let building = state.new_building.building();
            state
                .scene
                .add_objects(ObjectCollection::from_buildings(vec![building]));
            revalidate_building(state);
            None
        }
        NewBuildingAction::Escape => {
            state.mode.assert_is(Mode::NewBuilding);
            action::switch_to_normal()
        }
    }
}

pub(crate) fn dispatch_new_text_box(
    state: &mut EditorState,
    action: NewTextBoxAction,
) -> Option<Action> {
    match action {
        NewTextBoxAction::Init => {
            state.new_text_box.reset();
            state
                .new_text_box
                .move_to(state.settings.grid.snap(state.pointer));
            action::switch_mode(
                Mode::NewTextBox,
                Resets::all().with_new_text_box(false).with_panel(false),
            )
        }
        NewTextBoxAction::MoveTo(pos) => {
            state.mode.assert_is(Mode::NewTextBox);
            state.new_text_box.move_to(pos);
            None
        }
        NewTextBoxAction::Place(pos) => {
            state.mode.assert_is(Mode::NewTextBox);
            let tool = &mut state.new_text_box;
            if !tool.first_placed {
                tool.move_to(pos);
                tool.first_placed = true;
                return None;
            }
            tool.move_to(pos);
            let bounds = tool.bounds(state.settings.text_box_min_size);
            let idx = state.scene.objects().text_boxes.len();
            state.scene.add_objects(ObjectCollection::from_text_boxes(vec![TextBox::new(
                bounds,
                state.settings.text_box_default_text.clone(),
            )]));
            info!(
                x = bounds.x(),
                y = bounds.y(),
                width = bounds.width(),
                height = bounds.height(),
                "已添加文本框"
            );
            let subset = ObjectSelection::from_ranges(0..0, 0..0, idx..idx + 1);
            Some(Action::Selection(SelectionAction::InitFromSubset(subset)))
        }
        NewTextBoxAction::Escape => {
            state.mode.assert_is(Mode::NewTextBox);
            if state.new_text_box.first_placed {
                let pos = state.new_text_box.cursor;
                state.new_text_box.reset();
                state.new_text_box.move_to(pos);
                None
            } else {
                action::switch_to_normal()
            }
        }
    }
}

/// 放置类工具共用的指针映射：松开即放置，未按下时跟随吸附后的指针。
fn placement<A>(
    state: &EditorState,
    input: &FrameInput,
    current: Point2,
    place: impl FnOnce(Point2) -> A,
    move_to: impl FnOnce(Point2) -> A,
) -> Option<A> {
    let grid = &state.settings.grid;
    if input.left.released && input.in_viewport {
        return Some(place(grid.snap(input.release_pos())));
    }
    let snapped = grid.snap(input.pointer);
    (!input.left.down && snapped != current).then(|| move_to(snapped))
}

pub(crate) fn new_path_input_action(state: &EditorState, input: &FrameInput) -> Option<Action> {
    match input.key {
        Some(KeyBinding::Escape) => return Some(Action::NewPath(NewPathAction::Escape)),
        Some(KeyBinding::Rotate) => return Some(Action::NewPath(NewPathAction::Reverse)),
        _ => {}
    }
    placement(
        state,
        input,
        state.new_path.cursor,
        NewPathAction::Place,
        NewPathAction::MoveTo,
    )
    .map(Action::NewPath)
}

pub(crate) fn new_building_input_action(state: &EditorState, input: &FrameInput) -> Option<Action> {
    match input.key {
        Some(KeyBinding::Escape) => return Some(Action::NewBuilding(NewBuildingAction::Escape)),
        Some(KeyBinding::Rotate) => return Some(Action::NewBuilding(NewBuildingAction::Rotate)),
        _ => {}
    }
    placement(
        state,
        input,
        state.new_building.pos,
        NewBuildingAction::Place,
        NewBuildingAction::MoveTo,
    )
    .map(Action::NewBuilding)
}

pub(crate) fn new_text_box_input_action(state: &EditorState, input: &FrameInput) -> Option<Action> {
    if input.key == Some(KeyBinding::Escape) {
        return Some(Action::NewTextBox(NewTextBoxAction::Escape));
    }
    placement(
        state,
        input,
        state.new_text_box.cursor,
        NewTextBoxAction::Place,
        NewTextBoxAction::MoveTo,
    )
    .map(Action::NewTextBox)
}
