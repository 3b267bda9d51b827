use blueprint_core::geometry::{Matrix, Point2, Rect, Vector2};
use blueprint_core::objects::{Direction, ObjectCollection, ObjectRef, ObjectSelection};
use tracing::{debug, trace};

use crate::action::{self, Action};
use crate::editor::{EditorSettings, EditorState};
use crate::input::{FrameInput, KeyBinding};
use crate::mode::{Mode, Resets, SelectionMode};
use crate::scene::Scene;
use crate::selector::SelectorAction;
use crate::tools::NewPathAction;

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionAction {
    /// 以给定子集进入选择模式；子集为空则回到普通模式。
    InitFromSubset(ObjectSelection),
    /// 以单个对象替换选择并立即开始拖动。
    InitFromObject { object: ObjectRef, at: Point2 },
    BeginDrag(Point2),
    BeginDuplicate,
    BeginResize(Point2),
    MoveTo(Point2),
    Rotate,
    MoveBy(Direction),
    Delete,
    SetText(String),
    End(Point2),
    Discard,
    Leave,
}

/// 选择集上尚未提交的几何变换。只在暂存区计算，提交前从不写入场景。
#[derive(Debug, Clone, Default)]
pub struct SelectionTransform {
    active: bool,
    rot: i32,
    start: Point2,
    end: Point2,
    objects: ObjectCollection,
    building_bounds: Vec<Rect>,
    invalid_buildings: Vec<bool>,
    invalid_paths: Vec<bool>,
    is_valid: bool,
    is_identity: bool,
    bounds: Rect,
}

impl SelectionTransform {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn rotation(&self) -> i32 {
        self.rot
    }

    #[inline]
    pub fn start(&self) -> Point2 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Point2 {
        self.end
    }

    /// 变换后的对象副本，顺序与选择集一致。
    #[inline]
    pub fn objects(&self) -> &ObjectCollection {
        &self.objects
    }

    #[inline]
    pub fn is_building_invalid(&self, i: usize) -> bool {
        self.invalid_buildings.get(i).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_path_invalid(&self, i: usize) -> bool {
        self.invalid_paths.get(i).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.is_identity
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}

/// 当前选中的对象子集及其进行中的变换。
#[derive(Debug, Clone, Default)]
pub struct Selection {
    subset: ObjectSelection,
    transform: SelectionTransform,
}

impl Selection {
    pub fn reset(&mut self) {
        self.subset = ObjectSelection::new();
        self.transform = SelectionTransform::default();
    }

    #[inline]
    pub fn subset(&self) -> &ObjectSelection {
        &self.subset
    }

    #[inline]
    pub fn transform(&self) -> &SelectionTransform {
        &self.transform
    }

    /// 替换选择子集并重算包围盒，同时丢弃进行中的变换。
    pub fn set_subset(&mut self, mut subset: ObjectSelection, scene: &Scene) {
        subset.recompute_bounds(scene.objects(), scene.catalog());
        debug!(
            buildings = subset.buildings().len(),
            paths = subset.paths().len(),
            text_boxes = subset.text_boxes().len(),
            "更新选择集"
        );
        self.subset = subset;
        self.transform = SelectionTransform::default();
    }

    /// 恰好只选中一个文本框时返回其下标。
    pub fn single_text_box(&self) -> Option<usize> {
        let subset = &self.subset;
        (subset.buildings().is_empty() && subset.paths().is_empty() && subset.text_boxes().len() == 1)
            .then(|| subset.text_boxes()[0])
    }

    /// 指针是否落在唯一选中文本框的缩放手柄内。
    pub fn hits_resize_handle(&self, scene: &Scene, point: Point2, handle_size: f64) -> bool {
        self.single_text_box().is_some_and(|idx| {
            scene.objects().text_boxes[idx]
                .handle_rect(handle_size)
                .contains_point(point)
        })
    }

    /// 以 `anchor` 为起止点开始一次变换。
    pub fn begin(&mut self, scene: &Scene, settings: &EditorSettings, mode: SelectionMode, anchor: Point2) {
        self.transform = SelectionTransform {
            active: true,
            start: anchor,
            end: anchor,
            ..SelectionTransform::default()
        };
        self.recompute(scene, settings, mode);
    }

    /// 更新变换终点，位置变化时重算。
    pub fn move_to(&mut self, scene: &Scene, settings: &EditorSettings, mode: SelectionMode, pos: Point2) {
        if self.transform.end == pos {
            return;
        }
        self.transform.end = pos;
        self.recompute(scene, settings, mode);
    }

    /// 累加 90 度旋转。
    pub fn rotate(&mut self, scene: &Scene, settings: &EditorSettings, mode: SelectionMode) {
        self.transform.rot = (self.transform.rot + 90).rem_euclid(360);
        self.recompute(scene, settings, mode);
    }

    /// 根据起止点与旋转角重算变换后的对象、逐对象有效性与包围盒。
    pub fn recompute(&mut self, scene: &Scene, settings: &EditorSettings, mode: SelectionMode) {
        if mode == SelectionMode::Resize {
            self.recompute_resize(scene, settings);
            return;
        }

        let catalog = scene.catalog();
        let duplicating = mode == SelectionMode::Duplicate;
        let t = &mut self.transform;
        let delta = settings.grid.snap_vector(t.start.vector_to(t.end));
        t.objects = scene.objects().gather(&self.subset);
        t.is_identity = delta == Vector2::ZERO && t.rot.rem_euclid(360) == 0;

        if t.is_identity {
            // 原地复制会与原对象完全重叠
            t.invalid_buildings = vec![duplicating; t.objects.buildings.len()];
            t.invalid_paths = vec![duplicating; t.objects.paths.len()];
            t.building_bounds = t.objects.buildings.iter().map(|b| b.bounds(catalog)).collect();
            t.is_valid = !duplicating;
            t.bounds = self.subset.bounds();
            trace!(duplicating, "恒等变换");
            return;
        }

        let center = self.subset.bounds().center().to_vector();
        let mat = Matrix::translation(delta + center)
            .rotate(t.rot)
            .translate(-center);

        for building in &mut t.objects.buildings {
            building.pos = mat.apply(building.pos);
            building.rot = (building.rot + t.rot).rem_euclid(360);
        }
        for (path, sel) in t.objects.paths.iter_mut().zip(self.subset.paths()) {
            if sel.start {
                path.start = mat.apply(path.start);
            }
            if sel.end {
                path.end = mat.apply(path.end);
            }
        }
        for text_box in &mut t.objects.text_boxes {
            text_box.bounds = mat.apply_rect(&text_box.bounds);
        }
        t.bounds = mat.apply_rect(&self.subset.bounds());

        t.building_bounds = t.objects.buildings.iter().map(|b| b.bounds(catalog)).collect();
        t.invalid_buildings = vec![false; t.objects.buildings.len()];
        for (i, other) in scene.objects().buildings.iter().enumerate() {
            if !duplicating && self.subset.contains_building(i) {
                continue;
            }
            let other_bounds = other.bounds(catalog);
            if !other_bounds.overlaps(&t.bounds) {
                continue;
            }
            for (k, bounds) in t.building_bounds.iter().enumerate() {
                if !t.invalid_buildings[k] && bounds.overlaps(&other_bounds) {
                    t.invalid_buildings[k] = true;
                }
            }
        }
        t.invalid_paths = t.objects.paths.iter().map(|p| !p.is_valid()).collect();
        t.is_valid = !t.invalid_buildings.iter().chain(&t.invalid_paths).any(|&bad| bad);
        trace!(
            dx = delta.x(),
            dy = delta.y(),
            rot = t.rot,
            valid = t.is_valid,
            "重算选择变换"
        );
    }

    /// 缩放只移动右下角：新包围盒从原左上角到吸附后的指针位置，且不小于最小尺寸。
    fn recompute_resize(&mut self, scene: &Scene, settings: &EditorSettings) {
        let Some(idx) = self.single_text_box() else {
            panic!("resize requires exactly one selected text box");
        };
        let t = &mut self.transform;
        t.objects = scene.objects().gather(&self.subset);
        let original = scene.objects().text_boxes[idx].bounds;
        let resized = if t.start == t.end {
            original
        } else {
            let corner = settings.grid.snap(t.end);
            let min = settings.text_box_min_size;
            Rect::new(
                original.x(),
                original.y(),
                (corner.x() - original.x()).max(min),
                (corner.y() - original.y()).max(min),
            )
        };
        t.objects.text_boxes[0].bounds = resized;
        t.building_bounds.clear();
        t.invalid_buildings.clear();
        t.invalid_paths.clear();
        t.is_identity = resized == original;
        t.is_valid = true;
        t.bounds = resized;
    }

    /// 提交变换。复制模式追加对象并保持变换继续可用，其余模式就地修改并结束变换。
    /// 返回是否写入了场景。
    pub fn commit(&mut self, scene: &mut Scene, settings: &EditorSettings, mode: SelectionMode) -> bool {
        if !self.transform.active {
            return false;
        }
        let duplicating = mode == SelectionMode::Duplicate;
        let committed = if !self.transform.is_valid {
            debug!(mode = ?mode, "变换无效，放弃提交");
            false
        } else if self.transform.is_identity {
            debug!(mode = ?mode, "恒等变换，无需提交");
            false
        } else if !duplicating && self.transform.objects == scene.objects().gather(&self.subset) {
            // 例如单个端点绕自身旋转
            debug!(mode = ?mode, "变换后对象未改变，无需提交");
            false
        } else if duplicating {
            scene.add_objects(self.transform.objects.clone());
            true
        } else {
            scene.modify_objects(&self.subset, self.transform.objects.clone());
            self.subset.recompute_bounds(scene.objects(), scene.catalog());
            true
        };

        if duplicating {
            // 新副本已进入场景，需要据此刷新有效性
            self.recompute(scene, settings, mode);
        } else {
            self.transform = SelectionTransform::default();
        }
        committed
    }

    pub fn discard(&mut self) {
        debug!("放弃选择变换");
        self.transform = SelectionTransform::default();
    }
}

#[track_caller]
fn sub_mode(mode: Mode) -> SelectionMode {
    match mode {
        Mode::Selection(sub) => sub,
        other => panic!("selection handler called in {other} mode"),
    }
}

pub(crate) fn dispatch(state: &mut EditorState, action: SelectionAction) -> Option<Action> {
    let mode = state.mode;
    match action {
        SelectionAction::InitFromSubset(subset) => {
            if subset.is_empty() {
                return action::switch_to_normal();
            }
            state.selection.set_subset(subset, &state.scene);
            action::switch_mode(
                Mode::Selection(SelectionMode::Normal),
                Resets::all().with_selection(false),
            )
        }
        SelectionAction::InitFromObject { object, at } => {
            assert!(mode.is_idle(), "cannot pick an object in {mode} mode");
            let subset =
                ObjectSelection::from_object(object, state.scene.objects(), state.scene.catalog());
            state.selection.set_subset(subset, &state.scene);
            state
                .selection
                .begin(&state.scene, &state.settings, SelectionMode::Drag, at);
            action::switch_mode(
                Mode::Selection(SelectionMode::Drag),
                Resets::all().with_selection(false),
            )
        }
        SelectionAction::BeginDrag(at) => {
            mode.assert_is(Mode::Selection(SelectionMode::Normal));
            state
                .selection
                .begin(&state.scene, &state.settings, SelectionMode::Drag, at);
            action::switch_mode(Mode::Selection(SelectionMode::Drag), Resets::none())
        }
        SelectionAction::BeginDuplicate => {
            mode.assert_is(Mode::Selection(SelectionMode::Normal));
            let subset = state.selection.subset();
            if subset.is_endpoints_only() {
                if subset.paths().len() != 1 {
                    debug!(endpoints = subset.paths().len(), "多个孤立端点无法复制");
                    return None;
                }
                let sel = subset.paths()[0];
                let path = state.scene.objects().paths[sel.idx];
                let anchor = if sel.start { path.end } else { path.start };
                return Some(Action::NewPath(NewPathAction::InitFrom {
                    def_idx: path.def_idx,
                    anchor,
                }));
            }
            let center = subset.bounds().center();
            state
                .selection
                .begin(&state.scene, &state.settings, SelectionMode::Duplicate, center);
            action::switch_mode(Mode::Selection(SelectionMode::Duplicate), Resets::none())
        }
        SelectionAction::BeginResize(at) => {
            mode.assert_is(Mode::Selection(SelectionMode::Normal));
            state
                .selection
                .begin(&state.scene, &state.settings, SelectionMode::Resize, at);
            action::switch_mode(Mode::Selection(SelectionMode::Resize), Resets::none())
        }
        SelectionAction::MoveTo(pos) => {
            let sub = sub_mode(mode);
            assert_ne!(sub, SelectionMode::Normal, "no transform in progress");
            state.selection.move_to(&state.scene, &state.settings, sub, pos);
            None
        }
        SelectionAction::Rotate => {
            let sub = sub_mode(mode);
            let selection = &mut state.selection;
            match sub {
                SelectionMode::Normal => {
                    let center = selection.subset().bounds().center();
                    selection.begin(&state.scene, &state.settings, sub, center);
                    selection.rotate(&state.scene, &state.settings, sub);
                    selection.commit(&mut state.scene, &state.settings, sub);
                }
                SelectionMode::Drag | SelectionMode::Duplicate => {
                    selection.rotate(&state.scene, &state.settings, sub);
                }
                SelectionMode::Resize => debug!("缩放时忽略旋转"),
            }
            None
        }
        SelectionAction::MoveBy(direction) => {
            mode.assert_is(Mode::Selection(SelectionMode::Normal));
            let selection = &mut state.selection;
            let center = selection.subset().bounds().center();
            let target = center.translate(direction.offset(state.settings.grid.nudge_step()));
            selection.begin(&state.scene, &state.settings, SelectionMode::Normal, center);
            selection.move_to(&state.scene, &state.settings, SelectionMode::Normal, target);
            selection.commit(&mut state.scene, &state.settings, SelectionMode::Normal);
            None
        }
        SelectionAction::Delete => {
            mode.assert_is(Mode::Selection(SelectionMode::Normal));
            state.scene.delete_objects(state.selection.subset());
            action::switch_to_normal()
        }
        SelectionAction::SetText(content) => {
            mode.assert_is(Mode::Selection(SelectionMode::Normal));
            let Some(idx) = state.selection.single_text_box() else {
                debug!("未选中单个文本框，忽略文本修改");
                return None;
            };
            let mut text_box = state.scene.objects().text_boxes[idx].clone();
            if text_box.content == content {
                return None;
            }
            text_box.content = content;
            state.scene.modify_objects(
                state.selection.subset(),
                ObjectCollection::from_text_boxes(vec![text_box]),
            );
            None
        }
        SelectionAction::End(pos) => {
            let sub = sub_mode(mode);
            assert_ne!(sub, SelectionMode::Normal, "no transform in progress");
            let selection = &mut state.selection;
            selection.move_to(&state.scene, &state.settings, sub, pos);
            selection.commit(&mut state.scene, &state.settings, sub);
            if sub == SelectionMode::Duplicate {
                None
            } else {
                action::switch_mode(Mode::Selection(SelectionMode::Normal), Resets::none())
            }
        }
        SelectionAction::Discard => {
            let sub = sub_mode(mode);
            assert_ne!(sub, SelectionMode::Normal, "no transform in progress");
            state.selection.discard();
            action::switch_mode(Mode::Selection(SelectionMode::Normal), Resets::none())
        }
        SelectionAction::Leave => {
            mode.assert_is(Mode::Selection(SelectionMode::Normal));
            action::switch_to_normal()
        }
    }
}

/// 选择模式空闲时的输入映射。
pub(crate) fn idle_input_action(state: &EditorState, input: &FrameInput) -> Option<Action> {
    if let Some(key) = input.key {
        let action = match key {
            KeyBinding::Escape => Some(SelectionAction::Leave),
            KeyBinding::Delete => Some(SelectionAction::Delete),
            KeyBinding::Duplicate => Some(SelectionAction::BeginDuplicate),
            KeyBinding::Rotate => Some(SelectionAction::Rotate),
            KeyBinding::Drag => Some(SelectionAction::BeginDrag(input.pointer)),
            other => other.direction().map(SelectionAction::MoveBy),
        };
        if let Some(action) = action {
            return Some(Action::Selection(action));
        }
        if let Some(action) = state.app_key_action(input) {
            return Some(action);
        }
    }

    if !input.in_viewport || !input.left.pressed {
        return None;
    }
    let pointer = input.pointer;
    if state
        .selection
        .hits_resize_handle(&state.scene, pointer, state.handle_size())
    {
        return Some(Action::Selection(SelectionAction::BeginResize(pointer)));
    }
    let subset = state.selection.subset();
    let action = match state.scene.object_at(pointer, subset) {
        None => return Some(Action::Selector(SelectorAction::Init(pointer))),
        Some(object) if subset.contains(object) => SelectionAction::BeginDrag(pointer),
        Some(object) => SelectionAction::InitFromObject { object, at: pointer },
    };
    Some(Action::Selection(action))
}

/// 拖动、复制、缩放期间的输入映射。
pub(crate) fn transform_input_action(
    state: &EditorState,
    input: &FrameInput,
    sub: SelectionMode,
) -> Option<Action> {
    let action = match input.key {
        Some(KeyBinding::Escape) => Some(SelectionAction::Discard),
        Some(KeyBinding::Rotate) if sub != SelectionMode::Resize => Some(SelectionAction::Rotate),
        _ => None,
    };
    if let Some(action) = action {
        return Some(Action::Selection(action));
    }

    let ends = match sub {
        SelectionMode::Duplicate => input.left.released && input.in_viewport,
        _ => input.left.released || input.left.pressed,
    };
    if ends {
        return Some(Action::Selection(SelectionAction::End(input.release_pos())));
    }
    (input.pointer != state.selection.transform().end())
        .then(|| Action::Selection(SelectionAction::MoveTo(input.pointer)))
}
