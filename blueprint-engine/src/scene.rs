use std::sync::Arc;

use blueprint_core::catalog::Catalog;
use blueprint_core::geometry::Point2;
use blueprint_core::objects::{Building, ObjectCollection, ObjectRef, ObjectSelection};
use tracing::{debug, trace};

/// 一次可撤销的场景编辑，携带足以自我逆转的快照。
#[derive(Debug, Clone, PartialEq)]
pub enum SceneOp {
    Add {
        new: ObjectCollection,
    },
    Delete {
        selection: ObjectSelection,
        old: ObjectCollection,
    },
    Modify {
        selection: ObjectSelection,
        old: ObjectCollection,
        new: ObjectCollection,
    },
}

impl SceneOp {
    pub fn name(&self) -> &'static str {
        match self {
            SceneOp::Add { .. } => "add",
            SceneOp::Delete { .. } => "delete",
            SceneOp::Modify { .. } => "modify",
        }
    }
}

/// 撤销/重做的结果。
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryStep {
    /// 已到历史边界，没有可执行的操作。
    Nothing,
    /// 操作已执行；`show` 为调用方此后应显示的选择。
    Applied { show: Option<ObjectSelection> },
}

/// 场景：权威对象集合与游标式操作历史。
/// `history[..history_pos]` 已生效，其余为已撤销的尾部。
#[derive(Debug, Clone)]
pub struct Scene {
    catalog: Arc<Catalog>,
    objects: ObjectCollection,
    history: Vec<SceneOp>,
    history_pos: usize,
    saved_history_pos: Option<usize>,
}

impl Scene {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_objects(catalog, ObjectCollection::new())
    }

    /// 以已加载的对象初始化场景，历史为空且视为已保存。
    pub fn with_objects(catalog: Arc<Catalog>, objects: ObjectCollection) -> Self {
        Self {
            catalog,
            objects,
            history: Vec::new(),
            history_pos: 0,
            saved_history_pos: Some(0),
        }
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[inline]
    pub fn shared_catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[inline]
    pub fn objects(&self) -> &ObjectCollection {
        &self.objects
    }

    #[inline]
    pub fn history(&self) -> &[SceneOp] {
        &self.history
    }

    #[inline]
    pub fn history_pos(&self) -> usize {
        self.history_pos
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        self.history_pos > 0
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        self.history_pos < self.history.len()
    }

    #[inline]
    pub fn is_modified(&self) -> bool {
        self.saved_history_pos != Some(self.history_pos)
    }

    pub fn mark_saved(&mut self) {
        self.saved_history_pos = Some(self.history_pos);
        debug!(history_pos = self.history_pos, "场景已标记为已保存");
    }

    /// 追加一条操作，丢弃已撤销的尾部。保存点若在尾部中则永久失效。
    fn push_op(&mut self, op: SceneOp) {
        if self.history_pos < self.history.len() {
            debug!(
                dropped = self.history.len() - self.history_pos,
                "丢弃重做历史"
            );
            self.history.truncate(self.history_pos);
            if self.saved_history_pos.is_some_and(|saved| saved > self.history_pos) {
                self.saved_history_pos = None;
            }
        }
        debug!(op = op.name(), history_pos = self.history_pos + 1, "已追加场景操作");
        self.history.push(op);
        self.history_pos += 1;
    }

    /// 追加新对象（拼接到各序列末尾）。空集合不产生操作。
    pub fn add_objects(&mut self, new: ObjectCollection) {
        if new.is_empty() {
            debug!("忽略空的追加操作");
            return;
        }
        apply_add(&mut self.objects, &new);
        self.push_op(SceneOp::Add { new });
    }

    /// 删除选中对象：按降序下标做交换删除，不保持剩余对象的相对顺序。
    /// 部分选中的路径整条删除。
    pub fn delete_objects(&mut self, selection: &ObjectSelection) {
        assert_selection(selection, &self.objects);
        if selection.is_empty() {
            debug!("忽略空的删除操作");
            return;
        }
        let old = self.objects.gather(selection);
        apply_delete(&mut self.objects, selection);
        self.push_op(SceneOp::Delete {
            selection: selection.clone(),
            old,
        });
    }

    /// 就地覆盖选中对象，`new` 的顺序与选择集遍历顺序一致。
    pub fn modify_objects(&mut self, selection: &ObjectSelection, new: ObjectCollection) {
        assert_selection(selection, &self.objects);
        assert_eq!(selection.buildings().len(), new.buildings.len());
        assert_eq!(selection.paths().len(), new.paths.len());
        assert_eq!(selection.text_boxes().len(), new.text_boxes.len());
        if selection.is_empty() {
            debug!("忽略空的修改操作");
            return;
        }
        let old = self.objects.gather(selection);
        apply_overwrite(&mut self.objects, selection, &new);
        self.push_op(SceneOp::Modify {
            selection: selection.clone(),
            old,
            new,
        });
    }

    pub fn undo(&mut self) -> HistoryStep {
        if self.history_pos == 0 {
            debug!("没有可撤销的操作");
            return HistoryStep::Nothing;
        }
        self.history_pos -= 1;
        let op = &self.history[self.history_pos];
        debug!(op = op.name(), history_pos = self.history_pos, "撤销");
        let show = match op {
            SceneOp::Add { new } => {
                let objects = &mut self.objects;
                objects
                    .buildings
                    .truncate(objects.buildings.len() - new.buildings.len());
                objects.paths.truncate(objects.paths.len() - new.paths.len());
                objects
                    .text_boxes
                    .truncate(objects.text_boxes.len() - new.text_boxes.len());
                None
            }
            SceneOp::Delete { selection, old } => {
                apply_reinsert(&mut self.objects, selection, old);
                Some(selection.clone())
            }
            SceneOp::Modify { selection, old, .. } => {
                apply_overwrite(&mut self.objects, selection, old);
                Some(selection.clone())
            }
        };
        HistoryStep::Applied {
            show: show.map(|sel| self.with_bounds(sel)),
        }
    }

    pub fn redo(&mut self) -> HistoryStep {
        if self.history_pos >= self.history.len() {
            debug!("没有可重做的操作");
            return HistoryStep::Nothing;
        }
        let op = &self.history[self.history_pos];
        self.history_pos += 1;
        debug!(op = op.name(), history_pos = self.history_pos, "重做");
        let show = match op {
            SceneOp::Add { new } => {
                let objects = &self.objects;
                let show = ObjectSelection::from_ranges(
                    objects.buildings.len()..objects.buildings.len() + new.buildings.len(),
                    objects.paths.len()..objects.paths.len() + new.paths.len(),
                    objects.text_boxes.len()..objects.text_boxes.len() + new.text_boxes.len(),
                );
                apply_add(&mut self.objects, new);
                Some(show)
            }
            SceneOp::Delete { selection, .. } => {
                apply_delete(&mut self.objects, selection);
                None
            }
            SceneOp::Modify { selection, new, .. } => {
                apply_overwrite(&mut self.objects, selection, new);
                Some(selection.clone())
            }
        };
        HistoryStep::Applied {
            show: show.map(|sel| self.with_bounds(sel)),
        }
    }

    fn with_bounds(&self, mut selection: ObjectSelection) -> ObjectSelection {
        selection.recompute_bounds(&self.objects, &self.catalog);
        selection
    }

    /// 点选命中测试。优先级：已选路径（端点先于线身）→ 已选建筑 → 全部路径 →
    /// 全部建筑 → 已选文本框 → 全部文本框，各组内按下标倒序。
    pub fn object_at(&self, point: Point2, selection: &ObjectSelection) -> Option<ObjectRef> {
        let catalog = self.catalog();
        let objects = &self.objects;

        let path_hit = |idx: usize| {
            let path = &objects.paths[idx];
            if path.hits_start(point, catalog) {
                Some(ObjectRef::PathStart(idx))
            } else if path.hits_end(point, catalog) {
                Some(ObjectRef::PathEnd(idx))
            } else if path.hits_body(point, catalog) {
                Some(ObjectRef::Path(idx))
            } else {
                None
            }
        };
        let building_hit = |idx: usize| {
            objects.buildings[idx]
                .bounds(catalog)
                .contains_point(point)
                .then_some(ObjectRef::Building(idx))
        };
        let text_box_hit = |idx: usize| {
            objects.text_boxes[idx]
                .bounds
                .contains_point(point)
                .then_some(ObjectRef::TextBox(idx))
        };

        let hit = selection
            .paths()
            .iter()
            .rev()
            .find_map(|sel| path_hit(sel.idx))
            .or_else(|| selection.buildings().iter().rev().find_map(|&i| building_hit(i)))
            .or_else(|| (0..objects.paths.len()).rev().find_map(path_hit))
            .or_else(|| (0..objects.buildings.len()).rev().find_map(building_hit))
            .or_else(|| {
                selection
                    .text_boxes()
                    .iter()
                    .rev()
                    .find_map(|&i| text_box_hit(i))
            })
            .or_else(|| (0..objects.text_boxes.len()).rev().find_map(text_box_hit));
        trace!(x = point.x(), y = point.y(), hit = ?hit, "命中测试");
        hit
    }

    /// 候选建筑与其余建筑均不相交（边缘相接视为相交）。
    pub fn is_building_valid(&self, building: &Building, ignore: Option<usize>) -> bool {
        let bounds = building.bounds(&self.catalog);
        !self
            .objects
            .buildings
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != ignore)
            .any(|(_, other)| other.bounds(&self.catalog).overlaps(&bounds))
    }
}

fn assert_sorted(idxs: impl Iterator<Item = usize>, len: usize, kind: &str) {
    let mut prev: Option<usize> = None;
    for idx in idxs {
        assert!(idx < len, "{kind} index {idx} out of range (len {len})");
        assert!(
            prev.is_none_or(|p| p < idx),
            "{kind} indices must be strictly ascending"
        );
        prev = Some(idx);
    }
}

fn assert_selection(selection: &ObjectSelection, objects: &ObjectCollection) {
    assert_sorted(
        selection.buildings().iter().copied(),
        objects.buildings.len(),
        "building",
    );
    assert_sorted(
        selection.paths().iter().map(|p| p.idx),
        objects.paths.len(),
        "path",
    );
    assert_sorted(
        selection.text_boxes().iter().copied(),
        objects.text_boxes.len(),
        "text box",
    );
}

fn apply_add(objects: &mut ObjectCollection, new: &ObjectCollection) {
    objects.buildings.extend_from_slice(&new.buildings);
    objects.paths.extend_from_slice(&new.paths);
    objects.text_boxes.extend(new.text_boxes.iter().cloned());
}

fn apply_delete(objects: &mut ObjectCollection, selection: &ObjectSelection) {
    swap_delete_many(&mut objects.buildings, selection.buildings().iter().copied());
    swap_delete_many(&mut objects.paths, selection.paths().iter().map(|p| p.idx));
    swap_delete_many(
        &mut objects.text_boxes,
        selection.text_boxes().iter().copied(),
    );
}

fn apply_reinsert(objects: &mut ObjectCollection, selection: &ObjectSelection, old: &ObjectCollection) {
    swap_insert_many(
        &mut objects.buildings,
        selection.buildings().iter().copied(),
        old.buildings.iter().copied(),
    );
    swap_insert_many(
        &mut objects.paths,
        selection.paths().iter().map(|p| p.idx),
        old.paths.iter().copied(),
    );
    swap_insert_many(
        &mut objects.text_boxes,
        selection.text_boxes().iter().copied(),
        old.text_boxes.iter().cloned(),
    );
}

fn apply_overwrite(objects: &mut ObjectCollection, selection: &ObjectSelection, values: &ObjectCollection) {
    for (&i, building) in selection.buildings().iter().zip(&values.buildings) {
        objects.buildings[i] = *building;
    }
    for (sel, path) in selection.paths().iter().zip(&values.paths) {
        objects.paths[sel.idx] = *path;
    }
    for (&i, text_box) in selection.text_boxes().iter().zip(&values.text_boxes) {
        objects.text_boxes[i] = text_box.clone();
    }
}

/// 按升序下标集合做交换删除；实际按降序处理，保证较小下标不受影响。
pub fn swap_delete_many<T>(items: &mut Vec<T>, idxs: impl DoubleEndedIterator<Item = usize>) {
    for idx in idxs.rev() {
        items.swap_remove(idx);
    }
}

/// `swap_remove` 的逆操作：把 `idx` 处的元素移到末尾，再把 `value` 放回 `idx`。
pub fn swap_insert<T>(items: &mut Vec<T>, idx: usize, value: T) {
    assert!(idx <= items.len(), "swap insert index {idx} out of range");
    if idx == items.len() {
        items.push(value);
    } else {
        let moved = std::mem::replace(&mut items[idx], value);
        items.push(moved);
    }
}

/// `swap_delete_many` 的逆操作，按升序下标逐个回填。
pub fn swap_insert_many<T>(
    items: &mut Vec<T>,
    idxs: impl Iterator<Item = usize>,
    values: impl Iterator<Item = T>,
) {
    for (idx, value) in idxs.zip(values) {
        swap_insert(items, idx, value);
    }
}

#[cfg(test)]
mod tests {
    use blueprint_core::geometry::Rect;
    use blueprint_core::objects::{Path, PathSel, TextBox};

    use super::*;

    fn scene() -> Scene {
        Scene::new(Arc::new(Catalog::builtin()))
    }

    fn foundation(scene: &Scene) -> usize {
        scene.catalog().building_index("Foundation").expect("foundation")
    }

    fn belt(scene: &Scene) -> usize {
        scene.catalog().path_index("Conveyor Belt").expect("belt")
    }

    fn populated() -> Scene {
        let mut scene = scene();
        let f = foundation(&scene);
        let b = belt(&scene);
        let buildings = (0..5)
            .map(|i| Building::new(f, Point2::new(f64::from(i) * 10.0, 0.0), 0))
            .collect();
        scene.add_objects(ObjectCollection {
            buildings,
            paths: vec![
                Path::new(b, Point2::new(0.0, 5.0), Point2::new(10.0, 5.0)),
                Path::new(b, Point2::new(0.0, 8.0), Point2::new(10.0, 8.0)),
            ],
            text_boxes: vec![TextBox::new(Rect::new(0.0, 20.0, 4.0, 2.0), "hello")],
        });
        scene
    }

    fn selection(buildings: &[usize], paths: &[usize]) -> ObjectSelection {
        let mut sel = ObjectSelection::new();
        for &i in buildings {
            sel.insert_building(i);
        }
        for &i in paths {
            sel.insert_path(PathSel::full(i));
        }
        sel
    }

    #[test]
    fn swap_delete_then_swap_insert_restores_positions() {
        let original = vec!['a', 'b', 'c', 'd', 'e'];
        for idxs in [vec![1, 3], vec![0, 4], vec![3, 4], vec![1, 2], vec![0, 1, 2, 3, 4]] {
            let mut items = original.clone();
            swap_delete_many(&mut items, idxs.iter().copied());
            let removed: Vec<char> = idxs.iter().map(|&i| original[i]).collect();
            swap_insert_many(&mut items, idxs.iter().copied(), removed.into_iter());
            assert_eq!(items, original, "idxs {idxs:?}");
        }
    }

    #[test]
    fn delete_is_not_order_preserving() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        swap_delete_many(&mut items, [1].into_iter());
        assert_eq!(items, vec!['a', 'd', 'c']);
    }

    #[test]
    fn add_and_undo_redo() {
        let mut scene = populated();
        let before = ObjectCollection::new();
        let after = scene.objects().clone();
        assert!(scene.is_modified());

        let step = scene.undo();
        assert_eq!(step, HistoryStep::Applied { show: None });
        assert_eq!(scene.objects(), &before);
        assert!(!scene.is_modified());

        match scene.redo() {
            HistoryStep::Applied { show: Some(show) } => {
                assert_eq!(show.buildings(), &[0, 1, 2, 3, 4]);
                assert_eq!(show.paths().len(), 2);
                assert_eq!(show.text_boxes(), &[0]);
                assert!(!show.bounds().is_empty());
            }
            other => panic!("unexpected redo result: {other:?}"),
        }
        assert_eq!(scene.objects(), &after);
        assert_eq!(scene.redo(), HistoryStep::Nothing);
    }

    #[test]
    fn delete_undo_redo_restores_exact_positions() {
        let mut scene = populated();
        let original = scene.objects().clone();
        let sel = selection(&[0, 2, 3], &[0]);

        scene.delete_objects(&sel);
        let deleted = scene.objects().clone();
        assert_eq!(deleted.buildings.len(), 2);
        assert_eq!(deleted.paths.len(), 1);
        assert_eq!(deleted.paths[0], original.paths[1]);

        match scene.undo() {
            HistoryStep::Applied { show: Some(show) } => {
                assert_eq!(show.buildings(), sel.buildings());
            }
            other => panic!("unexpected undo result: {other:?}"),
        }
        assert_eq!(scene.objects(), &original);

        scene.redo();
        assert_eq!(scene.objects(), &deleted);
    }

    #[test]
    fn modify_undo_restores_old_values() {
        let mut scene = populated();
        let original = scene.objects().clone();
        let sel = selection(&[1], &[]);
        let moved = Building::new(original.buildings[1].def_idx, Point2::new(50.0, 50.0), 90);

        scene.modify_objects(&sel, ObjectCollection::from_buildings(vec![moved]));
        assert_eq!(scene.objects().buildings[1], moved);

        scene.undo();
        assert_eq!(scene.objects(), &original);
        scene.redo();
        assert_eq!(scene.objects().buildings[1], moved);
    }

    #[test]
    fn every_mutation_is_exactly_invertible() {
        let mut scene = populated();
        let f = foundation(&scene);
        let mut snapshots = vec![ObjectCollection::new(), scene.objects().clone()];

        scene.delete_objects(&selection(&[4], &[1]));
        snapshots.push(scene.objects().clone());
        scene.modify_objects(
            &selection(&[0], &[]),
            ObjectCollection::from_buildings(vec![Building::new(f, Point2::new(-9.0, -9.0), 180)]),
        );
        snapshots.push(scene.objects().clone());
        scene.add_objects(ObjectCollection::from_buildings(vec![Building::new(
            f,
            Point2::new(99.0, 99.0),
            0,
        )]));
        snapshots.push(scene.objects().clone());

        for expected in snapshots.iter().rev().skip(1) {
            scene.undo();
            assert_eq!(scene.objects(), expected);
        }
        assert_eq!(scene.undo(), HistoryStep::Nothing);
        for expected in snapshots.iter().skip(1) {
            scene.redo();
            assert_eq!(scene.objects(), expected);
        }
    }

    #[test]
    fn select_delete_undo_redo_matches_delete_only() {
        let mut scene = populated();
        let sel = selection(&[0, 1, 4], &[]);
        scene.delete_objects(&sel);
        let delete_only = scene.objects().clone();
        scene.undo();
        scene.redo();
        assert_eq!(scene.objects(), &delete_only);
    }

    #[test]
    fn new_edit_truncates_redo_tail_and_invalidates_save_point() {
        let mut scene = populated();
        let f = foundation(&scene);
        scene.mark_saved();
        assert!(!scene.is_modified());

        scene.delete_objects(&selection(&[0], &[]));
        scene.mark_saved();
        scene.undo();
        assert!(scene.is_modified());

        scene.add_objects(ObjectCollection::from_buildings(vec![Building::new(
            f,
            Point2::new(99.0, 99.0),
            0,
        )]));
        assert_eq!(scene.history().len(), 2);
        assert!(!scene.can_redo());
        // 原保存点已被截断，回到相同的历史长度也不应视为未修改
        assert!(scene.is_modified());
        scene.undo();
        assert!(scene.is_modified());
    }

    #[test]
    fn object_at_prefers_selected_then_paths_then_buildings() {
        let mut scene = scene();
        let f = foundation(&scene);
        let b = belt(&scene);
        scene.add_objects(ObjectCollection {
            buildings: vec![
                Building::new(f, Point2::new(1.0, 1.0), 0),
                Building::new(f, Point2::new(2.0, 1.0), 0),
            ],
            paths: vec![Path::new(b, Point2::new(0.0, 1.0), Point2::new(4.0, 1.0))],
            text_boxes: vec![TextBox::new(Rect::new(10.0, 10.0, 2.0, 2.0), "t")],
        });
        let empty = ObjectSelection::new();

        assert_eq!(scene.object_at(Point2::new(0.2, 1.0), &empty), Some(ObjectRef::PathStart(0)));
        assert_eq!(scene.object_at(Point2::new(2.0, 1.2), &empty), Some(ObjectRef::Path(0)));
        // 两栋建筑重叠处取下标较大者
        assert_eq!(scene.object_at(Point2::new(1.5, 0.2), &empty), Some(ObjectRef::Building(1)));

        let sel = selection(&[0], &[]);
        assert_eq!(scene.object_at(Point2::new(1.5, 0.2), &sel), Some(ObjectRef::Building(0)));
        assert_eq!(scene.object_at(Point2::new(11.0, 11.0), &sel), Some(ObjectRef::TextBox(0)));
        assert_eq!(scene.object_at(Point2::new(50.0, 50.0), &sel), None);
    }

    #[test]
    fn building_validity_counts_touching_edges() {
        let mut scene = scene();
        let f = foundation(&scene);
        scene.add_objects(ObjectCollection::from_buildings(vec![Building::new(
            f,
            Point2::new(0.0, 0.0),
            0,
        )]));
        // 2x2 建筑中心相距 1：重叠
        assert!(!scene.is_building_valid(&Building::new(f, Point2::new(1.0, 0.0), 0), None));
        // 中心相距 2：边缘相接，同样无效
        assert!(!scene.is_building_valid(&Building::new(f, Point2::new(2.0, 0.0), 0), None));
        assert!(scene.is_building_valid(&Building::new(f, Point2::new(3.0, 0.0), 0), None));
        assert!(scene.is_building_valid(&Building::new(f, Point2::new(1.0, 0.0), 0), Some(0)));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn delete_with_out_of_range_index_panics() {
        let mut scene = populated();
        scene.delete_objects(&selection(&[42], &[]));
    }
}
