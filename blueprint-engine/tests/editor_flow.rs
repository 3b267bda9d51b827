use std::sync::Arc;

use blueprint_core::catalog::Catalog;
use blueprint_core::geometry::{Point2, Rect};
use blueprint_core::objects::{Building, ObjectCollection, Path};
use blueprint_engine::action::{Action, AppAction};
use blueprint_engine::selection::SelectionAction;
use blueprint_engine::{EditorSettings, EditorState, FrameInput, KeyBinding, Mode, Scene, SelectionMode};

fn editor_with(objects: ObjectCollection) -> EditorState {
    let scene = Scene::with_objects(Arc::new(Catalog::builtin()), objects);
    EditorState::with_scene(scene, EditorSettings::default())
}

fn foundations(catalog: &Catalog, positions: &[(f64, f64)]) -> ObjectCollection {
    let f = catalog.building_index("Foundation").expect("foundation");
    ObjectCollection::from_buildings(
        positions
            .iter()
            .map(|&(x, y)| Building::new(f, Point2::new(x, y), 0))
            .collect(),
    )
}

fn at(x: f64, y: f64) -> FrameInput {
    FrameInput::at(Point2::new(x, y))
}

fn step(editor: &mut EditorState, input: FrameInput) {
    editor.step(&input).expect("frame");
}

fn key(editor: &mut EditorState, binding: KeyBinding) {
    let pointer = editor.pointer();
    step(editor, FrameInput::at(pointer).with_key(binding));
}

/// 从 `from` 拖出选框到 `to` 并松开。
fn box_select(editor: &mut EditorState, from: (f64, f64), to: (f64, f64)) {
    step(editor, at(from.0, from.1).pressed());
    step(editor, at(to.0, to.1).held());
    step(editor, at(to.0, to.1).released());
}

#[test]
fn box_select_drag_snaps_and_undoes() {
    let catalog = Catalog::builtin();
    let mut editor = editor_with(foundations(&catalog, &[(0.0, 0.0), (4.0, 0.0), (20.0, 20.0)]));

    box_select(&mut editor, (-2.0, -2.0), (6.0, 2.0));
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Normal));
    assert_eq!(editor.selection().subset().buildings(), &[0, 1]);

    step(&mut editor, at(0.0, 0.0).pressed());
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Drag));
    step(&mut editor, at(0.4, 0.6).held());
    step(&mut editor, at(0.4, 0.6).released());
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Normal));

    let buildings = &editor.scene().objects().buildings;
    assert_eq!(buildings[0].pos, Point2::new(0.0, 1.0));
    assert_eq!(buildings[1].pos, Point2::new(4.0, 1.0));
    assert_eq!(buildings[2].pos, Point2::new(20.0, 20.0));
    assert_eq!(editor.scene().history().len(), 1);

    key(&mut editor, KeyBinding::Undo);
    assert_eq!(editor.scene().objects(), &foundations(&catalog, &[(0.0, 0.0), (4.0, 0.0), (20.0, 20.0)]));
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Normal));
    assert_eq!(editor.selection().subset().buildings(), &[0, 1]);

    key(&mut editor, KeyBinding::Redo);
    assert_eq!(editor.scene().objects().buildings[0].pos, Point2::new(0.0, 1.0));
}

#[test]
fn drag_onto_neighbour_is_rejected_without_mutation() {
    let catalog = Catalog::builtin();
    let mut editor = editor_with(foundations(&catalog, &[(0.0, 0.0), (10.0, 0.0)]));
    let before = editor.scene().objects().clone();

    step(&mut editor, at(0.0, 0.0).pressed());
    step(&mut editor, at(9.0, 0.0).held());
    assert!(!editor.selection().transform().is_valid());
    step(&mut editor, at(9.0, 0.0).released());

    assert_eq!(editor.scene().objects(), &before);
    assert!(editor.scene().history().is_empty());
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Normal));
}

#[test]
fn second_overlapping_placement_is_rejected() {
    let mut editor = editor_with(ObjectCollection::new());
    editor.start_building_tool("Foundation").expect("tool");

    step(&mut editor, at(0.0, 0.0).released());
    assert_eq!(editor.scene().objects().buildings.len(), 1);

    step(&mut editor, at(1.0, 0.0));
    assert!(!editor.new_building().is_valid());
    step(&mut editor, at(1.0, 0.0).released());
    assert_eq!(editor.scene().objects().buildings.len(), 1);
    assert_eq!(editor.scene().history().len(), 1);

    key(&mut editor, KeyBinding::Escape);
    assert_eq!(editor.mode(), Mode::Normal);
}

#[test]
fn duplicate_rejects_identity_then_stamps_copies() {
    let catalog = Catalog::builtin();
    let mut editor = editor_with(foundations(&catalog, &[(0.0, 0.0)]));

    step(&mut editor, at(0.0, 0.0).pressed());
    step(&mut editor, at(0.0, 0.0).released());
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Normal));
    assert!(editor.scene().history().is_empty());

    key(&mut editor, KeyBinding::Duplicate);
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Duplicate));
    assert!(!editor.selection().transform().is_valid());
    step(&mut editor, at(0.0, 0.0).released());
    assert_eq!(editor.scene().objects().buildings.len(), 1);

    step(&mut editor, at(5.0, 0.0));
    step(&mut editor, at(5.0, 0.0).released());
    step(&mut editor, at(10.0, 0.0));
    step(&mut editor, at(10.0, 0.0).released());
    assert_eq!(editor.scene().objects().buildings.len(), 3);
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Duplicate));

    key(&mut editor, KeyBinding::Escape);
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Normal));
    assert_eq!(editor.selection().subset().buildings(), &[0]);
}

#[test]
fn delete_undo_redo_matches_delete_only_result() {
    let catalog = Catalog::builtin();
    let mut editor = editor_with(foundations(
        &catalog,
        &[(0.0, 0.0), (4.0, 0.0), (8.0, 0.0), (30.0, 30.0)],
    ));

    box_select(&mut editor, (-2.0, -2.0), (10.0, 2.0));
    assert_eq!(editor.selection().subset().buildings().len(), 3);
    key(&mut editor, KeyBinding::Delete);
    assert_eq!(editor.mode(), Mode::Normal);
    let deleted = editor.scene().objects().clone();
    assert_eq!(deleted.buildings.len(), 1);

    key(&mut editor, KeyBinding::Undo);
    assert_eq!(editor.scene().objects().buildings.len(), 4);
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Normal));

    key(&mut editor, KeyBinding::Redo);
    assert_eq!(editor.scene().objects(), &deleted);
    assert_eq!(editor.mode(), Mode::Normal);
}

#[test]
fn arrow_keys_nudge_and_rotate_commits_immediately() {
    let catalog = Catalog::builtin();
    let mut editor = editor_with(foundations(&catalog, &[(0.0, 0.0)]));
    step(&mut editor, at(0.0, 0.0).pressed());
    step(&mut editor, at(0.0, 0.0).released());

    key(&mut editor, KeyBinding::Right);
    key(&mut editor, KeyBinding::Up);
    assert_eq!(editor.scene().objects().buildings[0].pos, Point2::new(1.0, -1.0));

    key(&mut editor, KeyBinding::Rotate);
    assert_eq!(editor.scene().objects().buildings[0].rot, 90);
    assert_eq!(editor.scene().history().len(), 3);
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Normal));

    key(&mut editor, KeyBinding::Escape);
    assert_eq!(editor.mode(), Mode::Normal);
    assert!(editor.selection().subset().is_empty());
}

#[test]
fn text_box_is_created_resized_and_edited() {
    let mut editor = editor_with(ObjectCollection::new());
    editor.start_text_box_tool().expect("tool");
    step(&mut editor, at(2.0, 2.0).released());
    step(&mut editor, at(6.0, 4.0).released());
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Normal));
    assert_eq!(
        editor.scene().objects().text_boxes[0].bounds,
        Rect::new(2.0, 2.0, 4.0, 2.0)
    );

    // 缩放 10 时手柄为 2 个世界单位
    step(&mut editor, at(5.5, 3.5).pressed().with_zoom(10.0));
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Resize));
    step(&mut editor, at(9.2, 7.7).held().with_zoom(10.0));
    step(&mut editor, at(9.2, 7.7).released().with_zoom(10.0));
    assert_eq!(editor.mode(), Mode::Selection(SelectionMode::Normal));
    assert_eq!(
        editor.scene().objects().text_boxes[0].bounds,
        Rect::new(2.0, 2.0, 7.0, 6.0)
    );

    editor
        .run(Action::Selection(SelectionAction::SetText("Storage".into())))
        .expect("edit");
    assert_eq!(editor.scene().objects().text_boxes[0].content, "Storage");
    editor.run(Action::App(AppAction::Undo)).expect("undo");
    assert_eq!(editor.scene().objects().text_boxes[0].content, "Text");
}

#[test]
fn duplicating_a_lone_endpoint_continues_the_path() {
    let catalog = Catalog::builtin();
    let belt = catalog.path_index("Conveyor Belt").expect("belt");
    let mut editor = editor_with(ObjectCollection::from_paths(vec![Path::new(
        belt,
        Point2::new(0.0, 0.0),
        Point2::new(4.0, 0.0),
    )]));

    box_select(&mut editor, (3.0, -1.0), (5.0, 1.0));
    let sel = editor.selection().subset().path(0).expect("endpoint");
    assert!(!sel.start && sel.end);

    key(&mut editor, KeyBinding::Duplicate);
    assert_eq!(editor.mode(), Mode::NewPath);
    assert!(editor.new_path().is_first_placed());

    step(&mut editor, at(0.0, 5.0).released());
    let paths = &editor.scene().objects().paths;
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[1].start, Point2::new(0.0, 0.0));
    assert_eq!(paths[1].end, Point2::new(0.0, 5.0));
    assert_eq!(editor.mode(), Mode::NewPath);
    assert!(!editor.new_path().is_first_placed());
}

#[test]
fn new_project_request_and_save_point() {
    let catalog = Catalog::builtin();
    let mut editor = editor_with(foundations(&catalog, &[(0.0, 0.0)]));
    key(&mut editor, KeyBinding::Save);
    assert_eq!(editor.take_requests(), vec![blueprint_engine::HostRequest::Save]);

    editor.start_building_tool("Foundation").expect("tool");
    step(&mut editor, at(10.0, 0.0).released());
    assert!(editor.scene().is_modified());
    editor.mark_saved();
    assert!(!editor.scene().is_modified());

    key(&mut editor, KeyBinding::Escape);
    key(&mut editor, KeyBinding::New);
    assert!(editor.scene().objects().is_empty());
    assert_eq!(editor.mode(), Mode::Normal);
}
