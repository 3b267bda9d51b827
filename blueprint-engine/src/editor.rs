use std::sync::Arc;

use blueprint_core::catalog::Catalog;
use blueprint_core::geometry::{Grid, Point2};
use blueprint_core::objects::{ObjectCollection, ObjectRef};
use tracing::{debug, error, trace};

use crate::action::{self, Action, AppAction};
use crate::errors::EngineError;
use crate::input::FrameInput;
use crate::mode::{Mode, Resets, SelectionMode};
use crate::scene::Scene;
use crate::selection::{self, Selection};
use crate::selector::{self, Selector};
use crate::tools::{self, NewBuildingAction, NewBuildingTool, NewPathAction, NewPathTool, NewTextBoxTool};

/// 编辑器运行参数，由配置层填充。
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    pub grid: Grid,
    pub text_box_min_size: f64,
    /// 文本框缩放手柄的屏幕像素边长。
    pub text_box_handle_px: f64,
    pub text_box_default_text: String,
    /// 单帧内动作链的最大长度。
    pub max_action_chain: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            grid: Grid::default(),
            text_box_min_size: 1.0,
            text_box_handle_px: 20.0,
            text_box_default_text: "Text".to_string(),
            max_action_chain: 64,
        }
    }
}

/// 面板（即时模式 UI）在核心中保留的状态。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelState {
    pub category: Option<String>,
}

/// 需要宿主（文件对话框、磁盘读写）完成的请求。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    Open,
    Save,
    SaveAs,
}

/// 编辑器的全部可变状态。所有处理函数都通过它访问场景、选择与工具。
#[derive(Debug)]
pub struct EditorState {
    pub(crate) mode: Mode,
    pub(crate) scene: Scene,
    pub(crate) selection: Selection,
    pub(crate) selector: Selector,
    pub(crate) new_path: NewPathTool,
    pub(crate) new_building: NewBuildingTool,
    pub(crate) new_text_box: NewTextBoxTool,
    pub(crate) panel: PanelState,
    pub(crate) settings: EditorSettings,
    pub(crate) hovered: Option<ObjectRef>,
    pub(crate) pointer: Point2,
    pub(crate) pointer_down: bool,
    pub(crate) zoom: f64,
    pub(crate) requests: Vec<HostRequest>,
}

impl EditorState {
    pub fn new(catalog: Arc<Catalog>, settings: EditorSettings) -> Self {
        Self::with_scene(Scene::new(catalog), settings)
    }

    pub fn with_scene(scene: Scene, settings: EditorSettings) -> Self {
        Self {
            mode: Mode::Normal,
            scene,
            selection: Selection::default(),
            selector: Selector::default(),
            new_path: NewPathTool::default(),
            new_building: NewBuildingTool::default(),
            new_text_box: NewTextBoxTool::default(),
            panel: PanelState::default(),
            settings,
            hovered: None,
            pointer: Point2::ORIGIN,
            pointer_down: false,
            zoom: 1.0,
            requests: Vec::new(),
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[inline]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[inline]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    #[inline]
    pub fn new_path(&self) -> &NewPathTool {
        &self.new_path
    }

    #[inline]
    pub fn new_building(&self) -> &NewBuildingTool {
        &self.new_building
    }

    #[inline]
    pub fn new_text_box(&self) -> &NewTextBoxTool {
        &self.new_text_box
    }

    #[inline]
    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    #[inline]
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    #[inline]
    pub fn hovered(&self) -> Option<ObjectRef> {
        self.hovered
    }

    #[inline]
    pub fn pointer(&self) -> Point2 {
        self.pointer
    }

    /// 取出并清空待处理的宿主请求。
    pub fn take_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.requests)
    }

    /// 用新加载的对象整体替换场景，并回到普通模式。
    pub fn replace_scene(&mut self, objects: ObjectCollection) {
        let catalog = self.scene.shared_catalog();
        self.scene = Scene::with_objects(catalog, objects);
        self.hovered = None;
        self.switch_mode(Mode::Normal, Resets::all());
        debug!(
            buildings = self.scene.objects().buildings.len(),
            paths = self.scene.objects().paths.len(),
            text_boxes = self.scene.objects().text_boxes.len(),
            "场景已替换"
        );
    }

    pub fn mark_saved(&mut self) {
        self.scene.mark_saved();
    }

    /// 所有模式切换的唯一入口：先按 `resets` 重置组件，再切换模式。
    pub(crate) fn switch_mode(&mut self, mode: Mode, resets: Resets) {
        if resets.selector {
            self.selector.reset();
        }
        if resets.new_path {
            self.new_path.reset();
        }
        if resets.new_building {
            self.new_building.reset();
        }
        if resets.new_text_box {
            self.new_text_box.reset();
        }
        if resets.selection {
            self.selection.reset();
        }
        if resets.panel {
            self.panel = PanelState::default();
        }
        if self.mode != mode {
            debug!(from = %self.mode, to = %mode, "切换模式");
        }
        self.mode = mode;
    }

    /// 处理一帧输入：询问当前模式产生至多一个动作，执行完整动作链后刷新悬停对象。
    pub fn step(&mut self, input: &FrameInput) -> Result<(), EngineError> {
        self.pointer = input.pointer;
        self.pointer_down = input.left.down;
        if input.zoom > 0.0 {
            self.zoom = input.zoom;
        }

        let result = match self.input_action(input) {
            Some(action) => self.run(action).map(|_| ()),
            None => Ok(()),
        };
        self.refresh_hover(input);
        result
    }

    /// 执行动作链直到处理函数不再返回后续动作，返回实际分发次数。
    pub fn run(&mut self, first: Action) -> Result<usize, EngineError> {
        let limit = self.settings.max_action_chain;
        let mut next = Some(first);
        let mut count = 0;
        while let Some(action) = next {
            if count >= limit {
                error!(limit, action = ?action, "动作链超过上限，疑似循环");
                return Err(EngineError::ActionChainOverflow { limit });
            }
            count += 1;
            trace!(action = ?action, "分发动作");
            next = action::dispatch(self, action);
        }
        Ok(count)
    }

    /// 以类名启动建筑放置工具。
    pub fn start_building_tool(&mut self, class: &str) -> Result<(), EngineError> {
        let def_idx = self
            .scene
            .catalog()
            .building_index(class)
            .ok_or_else(|| EngineError::UnknownDefinition(class.to_string()))?;
        self.run(Action::NewBuilding(NewBuildingAction::Init(def_idx)))
            .map(|_| ())
    }

    /// 以类名启动路径放置工具。
    pub fn start_path_tool(&mut self, class: &str) -> Result<(), EngineError> {
        let def_idx = self
            .scene
            .catalog()
            .path_index(class)
            .ok_or_else(|| EngineError::UnknownDefinition(class.to_string()))?;
        self.run(Action::NewPath(NewPathAction::Init(def_idx)))
            .map(|_| ())
    }

    pub fn start_text_box_tool(&mut self) -> Result<(), EngineError> {
        self.run(Action::NewTextBox(tools::NewTextBoxAction::Init))
            .map(|_| ())
    }

    /// 按当前模式把输入快照映射为至多一个动作。
    pub fn input_action(&self, input: &FrameInput) -> Option<Action> {
        match self.mode {
            Mode::Normal => selector::input_action(self, input),
            Mode::Selection(SelectionMode::Normal) => selection::idle_input_action(self, input),
            Mode::Selection(sub) => selection::transform_input_action(self, input, sub),
            Mode::NewPath => tools::new_path_input_action(self, input),
            Mode::NewBuilding => tools::new_building_input_action(self, input),
            Mode::NewTextBox => tools::new_text_box_input_action(self, input),
        }
    }

    /// 空闲模式下的通用快捷键：撤销、重做与文件操作。
    pub(crate) fn app_key_action(&self, input: &FrameInput) -> Option<Action> {
        use crate::input::KeyBinding;

        let action = match input.key? {
            KeyBinding::Undo => AppAction::Undo,
            KeyBinding::Redo => AppAction::Redo,
            KeyBinding::New => AppAction::NewProject,
            KeyBinding::Open => AppAction::Open,
            KeyBinding::Save => AppAction::Save,
            KeyBinding::SaveAs => AppAction::SaveAs,
            _ => return None,
        };
        Some(Action::App(action))
    }

    /// 结构变化后立即重新计算悬停对象，避免持有失效下标。
    fn refresh_hover(&mut self, input: &FrameInput) {
        self.hovered = if self.mode.is_idle() && input.in_viewport && !self.selector.is_active() {
            self.scene.object_at(self.pointer, self.selection.subset())
        } else {
            None
        };
    }

    /// 世界坐标下的缩放手柄边长。
    #[inline]
    pub(crate) fn handle_size(&self) -> f64 {
        self.settings.text_box_handle_px / self.zoom
    }
}
