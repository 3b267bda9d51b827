use blueprint_core::geometry::{Point2, Rect};
use blueprint_core::objects::{Building, ObjectRef, Path, TextBox};
use tracing::trace;

use crate::editor::EditorState;
use crate::mode::{Mode, SelectionMode};

/// 渲染器读取的对象状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Normal,
    Selected,
    /// 正在拖动、旋转或缩放的对象在目标位置的样子。
    Dragged,
    /// 尚未提交的新对象：放置工具的草稿或复制的副本。
    New,
    Invalid,
    /// 变换期间对象在原位置留下的影子。
    Shadow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawModifier {
    Hovered,
    Clicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawState {
    pub kind: DrawKind,
    pub modifier: Option<DrawModifier>,
}

impl DrawState {
    #[inline]
    pub fn new(kind: DrawKind) -> Self {
        Self {
            kind,
            modifier: None,
        }
    }

    #[inline]
    pub fn with_modifier(mut self, modifier: Option<DrawModifier>) -> Self {
        self.modifier = modifier;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawShape {
    Building(Building),
    Path(Path),
    PathEndpoint { point: Point2, def_idx: usize },
    TextBox(TextBox),
    SelectionBounds(Rect),
    SelectorRect(Rect),
    ResizeHandle(Rect),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub shape: DrawShape,
    pub state: DrawState,
    /// 对应的场景对象；草稿与变换结果为 `None`。
    pub object: Option<ObjectRef>,
}

/// 一帧的绘制数据。渲染器只读取它，不回写任何状态。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    items: Vec<DrawItem>,
}

impl DrawList {
    #[inline]
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 查找某个场景对象的绘制状态。
    pub fn state_of(&self, object: ObjectRef) -> Option<DrawState> {
        self.items
            .iter()
            .find(|item| item.object == Some(object))
            .map(|item| item.state)
    }

    pub fn count(&self, kind: DrawKind) -> usize {
        self.items.iter().filter(|item| item.state.kind == kind).count()
    }

    fn push(&mut self, shape: DrawShape, state: DrawState, object: Option<ObjectRef>) {
        self.items.push(DrawItem {
            shape,
            state,
            object,
        });
    }
}

impl EditorState {
    fn modifier_for(&self, object: ObjectRef) -> Option<DrawModifier> {
        (self.hovered == Some(object)).then_some(if self.pointer_down {
            DrawModifier::Clicked
        } else {
            DrawModifier::Hovered
        })
    }

    /// 生成视口 `view`（世界坐标）内的绘制列表。
    pub fn draw_list(&self, view: &Rect) -> DrawList {
        let mut list = DrawList::default();
        let catalog = self.scene.catalog();
        let objects = self.scene.objects();
        let subset = self.selection.subset();
        let transform = self.selection.transform();
        let duplicating = self.mode == Mode::Selection(SelectionMode::Duplicate);
        // 复制时原对象保持选中样式，其余变换在原位置留下影子
        let shadowed = transform.is_active() && !duplicating;
        let base_kind = |selected: bool| match (selected, shadowed) {
            (true, true) => DrawKind::Shadow,
            (true, false) => DrawKind::Selected,
            (false, _) => DrawKind::Normal,
        };

        for (i, building) in objects.buildings.iter().enumerate() {
            if !building.bounds(catalog).overlaps(view) {
                continue;
            }
            let object = ObjectRef::Building(i);
            let state = DrawState::new(base_kind(subset.contains_building(i)))
                .with_modifier(self.modifier_for(object));
            list.push(DrawShape::Building(*building), state, Some(object));
        }

        for (i, path) in objects.paths.iter().enumerate() {
            if !view.overlaps_segment(path.start, path.end) {
                continue;
            }
            let sel = subset.path(i);
            let object = ObjectRef::Path(i);
            let body_kind = match sel {
                Some(sel) if sel.is_full() => base_kind(true),
                Some(_) if shadowed => DrawKind::Shadow,
                _ => DrawKind::Normal,
            };
            list.push(
                DrawShape::Path(*path),
                DrawState::new(body_kind).with_modifier(self.modifier_for(object)),
                Some(object),
            );
            for (point, picked, endpoint) in [
                (path.start, sel.is_some_and(|s| s.start), ObjectRef::PathStart(i)),
                (path.end, sel.is_some_and(|s| s.end), ObjectRef::PathEnd(i)),
            ] {
                let modifier = self.modifier_for(endpoint);
                if !picked && modifier.is_none() {
                    continue;
                }
                list.push(
                    DrawShape::PathEndpoint {
                        point,
                        def_idx: path.def_idx,
                    },
                    DrawState::new(base_kind(picked)).with_modifier(modifier),
                    Some(endpoint),
                );
            }
        }

        for (i, text_box) in objects.text_boxes.iter().enumerate() {
            if !text_box.bounds.overlaps(view) {
                continue;
            }
            let object = ObjectRef::TextBox(i);
            let state = DrawState::new(base_kind(subset.contains_text_box(i)))
                .with_modifier(self.modifier_for(object));
            list.push(DrawShape::TextBox(text_box.clone()), state, Some(object));
        }

        if transform.is_active() {
            let moved = if duplicating { DrawKind::New } else { DrawKind::Dragged };
            let kind_for = |invalid: bool| if invalid { DrawKind::Invalid } else { moved };
            let staged = transform.objects();
            for (k, building) in staged.buildings.iter().enumerate() {
                list.push(
                    DrawShape::Building(*building),
                    DrawState::new(kind_for(transform.is_building_invalid(k))),
                    None,
                );
            }
            for (k, path) in staged.paths.iter().enumerate() {
                list.push(
                    DrawShape::Path(*path),
                    DrawState::new(kind_for(transform.is_path_invalid(k))),
                    None,
                );
            }
            for text_box in &staged.text_boxes {
                list.push(DrawShape::TextBox(text_box.clone()), DrawState::new(moved), None);
            }
        }

        if self.mode.is_selection() && !subset.is_empty() {
            let bounds = if transform.is_active() {
                transform.bounds()
            } else {
                subset.bounds()
            };
            list.push(
                DrawShape::SelectionBounds(bounds),
                DrawState::new(DrawKind::Selected),
                None,
            );
            if self.mode == Mode::Selection(SelectionMode::Normal) {
                if let Some(idx) = self.selection.single_text_box() {
                    let handle = objects.text_boxes[idx].handle_rect(self.handle_size());
                    list.push(
                        DrawShape::ResizeHandle(handle),
                        DrawState::new(DrawKind::Selected),
                        None,
                    );
                }
            }
        }

        if self.selector.is_active() {
            list.push(
                DrawShape::SelectorRect(self.selector.rect()),
                DrawState::new(DrawKind::Selected),
                None,
            );
        }

        match self.mode {
            Mode::NewBuilding => {
                let tool = &self.new_building;
                let kind = if tool.is_valid() { DrawKind::New } else { DrawKind::Invalid };
                list.push(DrawShape::Building(tool.building()), DrawState::new(kind), None);
            }
            Mode::NewPath => {
                let tool = &self.new_path;
                let path = tool.path();
                if tool.is_first_placed() {
                    let kind = if tool.is_valid() { DrawKind::New } else { DrawKind::Invalid };
                    list.push(DrawShape::Path(path), DrawState::new(kind), None);
                } else {
                    list.push(
                        DrawShape::PathEndpoint {
                            point: path.end,
                            def_idx: tool.def_idx(),
                        },
                        DrawState::new(DrawKind::New),
                        None,
                    );
                }
            }
            Mode::NewTextBox => {
                let bounds = self.new_text_box.bounds(self.settings.text_box_min_size);
                list.push(
                    DrawShape::TextBox(TextBox::new(bounds, self.settings.text_box_default_text.clone())),
                    DrawState::new(DrawKind::New),
                    None,
                );
            }
            _ => {}
        }

        trace!(items = list.len(), "生成绘制列表");
        list
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use blueprint_core::catalog::Catalog;
    use blueprint_core::objects::ObjectCollection;

    use super::*;
    use crate::editor::EditorSettings;
    use crate::input::FrameInput;

    fn view() -> Rect {
        Rect::new(-50.0, -50.0, 100.0, 100.0)
    }

    fn state_with_two_buildings() -> EditorState {
        let mut state = EditorState::new(Arc::new(Catalog::builtin()), EditorSettings::default());
        let f = state.scene().catalog().building_index("Foundation").expect("foundation");
        state.scene.add_objects(ObjectCollection::from_buildings(vec![
            Building::new(f, Point2::new(0.0, 0.0), 0),
            Building::new(f, Point2::new(200.0, 0.0), 0),
        ]));
        state
    }

    #[test]
    fn objects_outside_view_are_culled() {
        let state = state_with_two_buildings();
        let list = state.draw_list(&view());
        assert!(list.state_of(ObjectRef::Building(0)).is_some());
        assert!(list.state_of(ObjectRef::Building(1)).is_none());
    }

    #[test]
    fn hover_and_click_modifiers() {
        let mut state = state_with_two_buildings();
        state.step(&FrameInput::at(Point2::new(0.5, 0.5))).expect("hover");
        let hovered = state.draw_list(&view()).state_of(ObjectRef::Building(0));
        assert_eq!(
            hovered,
            Some(DrawState::new(DrawKind::Normal).with_modifier(Some(DrawModifier::Hovered)))
        );
    }

    #[test]
    fn drag_leaves_shadow_and_draws_target() {
        let mut state = state_with_two_buildings();
        state
            .step(&FrameInput::at(Point2::new(0.0, 0.0)).pressed())
            .expect("press");
        assert_eq!(state.mode(), Mode::Selection(SelectionMode::Drag));
        state
            .step(&FrameInput::at(Point2::new(5.0, 0.0)).held())
            .expect("drag");

        let list = state.draw_list(&view());
        assert_eq!(list.state_of(ObjectRef::Building(0)).map(|s| s.kind), Some(DrawKind::Shadow));
        assert_eq!(list.count(DrawKind::Dragged), 1);
        assert!(
            list.items()
                .iter()
                .any(|item| matches!(item.shape, DrawShape::SelectionBounds(_)))
        );
    }

    #[test]
    fn building_tool_draft_is_drawn() {
        let mut state = state_with_two_buildings();
        state.start_building_tool("Foundation").expect("tool");
        // 指针在原点，与已有建筑重叠
        assert_eq!(state.draw_list(&view()).count(DrawKind::Invalid), 1);
    }
}
