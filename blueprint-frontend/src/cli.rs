use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use blueprint_core::geometry::{Point2, Vector2};
use blueprint_engine::selection::SelectionAction;
use blueprint_engine::{
    Action, AppAction, EditorSettings, EditorState, FrameInput, HostRequest, KeyBinding, Mode,
    Scene, SelectionMode,
};
use blueprint_io::{ProjectLoader, ProjectSaver, TextFormat};
use glam::DVec2;
use tracing::{debug, info, warn};

use crate::errors::FrontendError;
use crate::loader::{LoadedScene, ProjectSource};

/// 脚本中的一条输入事件。
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    Move(Point2),
    Press,
    Release,
    /// 移动到该点后按下并松开，共三帧。
    Click(Point2),
    Key(KeyBinding),
    Tool(ToolKind),
    Zoom(f64),
    /// 修改当前单独选中的文本框内容，`\n` 表示换行。
    Text(String),
    Category(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolKind {
    Building(String),
    Path(String),
    TextBox,
}

/// 解析整份脚本，返回 `(行号, 命令)`。空行与 `#` 开头的注释行被跳过。
pub fn parse_script(text: &str) -> Result<Vec<(usize, ScriptCommand)>, FrontendError> {
    let mut commands = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if let Some(command) = parse_line(line, raw)? {
            commands.push((line, command));
        }
    }
    Ok(commands)
}

fn parse_line(line: usize, raw: &str) -> Result<Option<ScriptCommand>, FrontendError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = trimmed
        .split_once(char::is_whitespace)
        .map(|(word, rest)| (word, rest.trim()))
        .unwrap_or((trimmed, ""));

    let command = match word {
        "move" => ScriptCommand::Move(parse_point(line, rest)?),
        "click" => ScriptCommand::Click(parse_point(line, rest)?),
        "press" | "release" if !rest.is_empty() => {
            return Err(FrontendError::script(line, format!("`{word}` 不接受参数")));
        }
        "press" => ScriptCommand::Press,
        "release" => ScriptCommand::Release,
        "key" => KeyBinding::from_name(rest)
            .map(ScriptCommand::Key)
            .ok_or_else(|| FrontendError::script(line, format!("未知按键 `{rest}`")))?,
        "tool" => ScriptCommand::Tool(parse_tool(line, rest)?),
        "zoom" => match rest.parse::<f64>() {
            Ok(zoom) if zoom > 0.0 => ScriptCommand::Zoom(zoom),
            _ => return Err(FrontendError::script(line, "缩放必须是正数")),
        },
        "text" => ScriptCommand::Text(rest.replace("\\n", "\n")),
        "category" => match rest {
            "" | "none" => ScriptCommand::Category(None),
            name => ScriptCommand::Category(Some(name.to_string())),
        },
        other => return Err(FrontendError::script(line, format!("未知命令 `{other}`"))),
    };
    Ok(Some(command))
}

fn parse_point(line: usize, rest: &str) -> Result<Point2, FrontendError> {
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let &[x, y] = fields.as_slice() else {
        return Err(FrontendError::script(line, "需要两个坐标"));
    };
    match (x.parse::<f64>(), y.parse::<f64>()) {
        (Ok(x), Ok(y)) => Ok(Point2::new(x, y)),
        _ => Err(FrontendError::script(line, format!("无效坐标 `{rest}`"))),
    }
}

fn parse_tool(line: usize, rest: &str) -> Result<ToolKind, FrontendError> {
    let (kind, class) = rest
        .split_once(char::is_whitespace)
        .map(|(kind, class)| (kind, class.trim()))
        .unwrap_or((rest, ""));
    match (kind, class) {
        ("text", _) => Ok(ToolKind::TextBox),
        ("building" | "path", "") => Err(FrontendError::script(line, "缺少类名")),
        ("building", class) => Ok(ToolKind::Building(class.to_string())),
        ("path", class) => Ok(ToolKind::Path(class.to_string())),
        (other, _) => Err(FrontendError::script(line, format!("未知工具 `{other}`"))),
    }
}

/// 无界面的编辑会话：把脚本事件逐帧喂给编辑器，并代为完成宿主请求。
pub struct Session {
    editor: EditorState,
    source: ProjectSource,
    /// 保存与重新打开使用的项目文件。
    project_path: Option<PathBuf>,
    /// 另存为的目标；没有文件对话框时代替用户选择。
    save_as_target: Option<PathBuf>,
    pointer: Point2,
    down: bool,
    zoom: f64,
    frames: usize,
}

impl Session {
    pub fn new(loaded: LoadedScene, settings: EditorSettings) -> Self {
        let project_path = loaded.path().map(Path::to_path_buf);
        let scene = Scene::with_objects(loaded.catalog, loaded.objects);
        Self {
            editor: EditorState::with_scene(scene, settings),
            source: loaded.source,
            project_path,
            save_as_target: None,
            pointer: Point2::ORIGIN,
            down: false,
            zoom: 1.0,
            frames: 0,
        }
    }

    pub fn with_save_as_target(mut self, target: Option<PathBuf>) -> Self {
        self.save_as_target = target;
        self
    }

    #[inline]
    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    pub fn run_script(&mut self, text: &str) -> Result<(), FrontendError> {
        let commands = parse_script(text)?;
        info!(commands = commands.len(), "开始执行脚本");
        for (line, command) in commands {
            self.apply(line, command)?;
        }
        Ok(())
    }

    /// 执行一条命令；`line` 只用于错误信息。
    pub fn apply(&mut self, line: usize, command: ScriptCommand) -> Result<(), FrontendError> {
        debug!(line, command = ?command, "执行脚本命令");
        match command {
            ScriptCommand::Move(point) => {
                let input = self.frame(point);
                self.step(input)?;
            }
            ScriptCommand::Press => {
                self.down = true;
                let input = self.frame(self.pointer).pressed();
                self.step(input)?;
            }
            ScriptCommand::Release => {
                self.down = false;
                let input = self.frame(self.pointer).released();
                self.step(input)?;
            }
            ScriptCommand::Click(point) => {
                self.apply(line, ScriptCommand::Move(point))?;
                self.apply(line, ScriptCommand::Press)?;
                self.apply(line, ScriptCommand::Release)?;
            }
            ScriptCommand::Key(key) => {
                let input = self.frame(self.pointer).with_key(key);
                self.step(input)?;
            }
            ScriptCommand::Zoom(zoom) => {
                self.zoom = zoom;
                let input = self.frame(self.pointer);
                self.step(input)?;
            }
            ScriptCommand::Tool(ToolKind::Building(class)) => {
                self.editor.start_building_tool(&class)?;
            }
            ScriptCommand::Tool(ToolKind::Path(class)) => {
                self.editor.start_path_tool(&class)?;
            }
            ScriptCommand::Tool(ToolKind::TextBox) => {
                self.editor.start_text_box_tool()?;
            }
            ScriptCommand::Text(content) => {
                if self.editor.mode() != Mode::Selection(SelectionMode::Normal)
                    || self.editor.selection().single_text_box().is_none()
                {
                    return Err(FrontendError::script(line, "当前没有单独选中的文本框"));
                }
                self.editor
                    .run(Action::Selection(SelectionAction::SetText(content)))?;
            }
            ScriptCommand::Category(category) => {
                self.editor
                    .run(Action::App(AppAction::SelectCategory(category)))?;
            }
        }
        self.handle_requests()
    }

    /// 指针移到 `point` 的一帧；按键保持按下时带上 `held`。
    fn frame(&mut self, point: Point2) -> FrameInput {
        let delta: DVec2 = (point.as_vec2() - self.pointer.as_vec2()) * self.zoom;
        self.pointer = point;
        let input = FrameInput {
            pointer_screen_delta: Vector2(delta),
            ..FrameInput::at(point).with_zoom(self.zoom)
        };
        if self.down { input.held() } else { input }
    }

    fn step(&mut self, input: FrameInput) -> Result<(), FrontendError> {
        self.frames += 1;
        self.editor.step(&input)?;
        Ok(())
    }

    fn handle_requests(&mut self) -> Result<(), FrontendError> {
        for request in self.editor.take_requests() {
            match request {
                HostRequest::Save => match self
                    .project_path
                    .clone()
                    .or_else(|| self.save_as_target.clone())
                {
                    Some(path) => self.save_as(&path)?,
                    None => warn!("没有项目文件可供保存，忽略保存请求"),
                },
                HostRequest::SaveAs => match self.save_as_target.clone() {
                    Some(path) => self.save_as(&path)?,
                    None => warn!("未指定另存为目标，忽略另存为请求"),
                },
                HostRequest::Open => match self.project_path.clone() {
                    Some(path) => self.reopen(&path)?,
                    None => warn!("没有项目文件可供打开，忽略打开请求"),
                },
            }
        }
        Ok(())
    }

    /// 保存当前场景并把目标记为项目文件。
    pub fn save_as(&mut self, path: &Path) -> Result<(), FrontendError> {
        let scene = self.editor.scene();
        TextFormat::new(scene.catalog()).save(scene.objects(), path)?;
        self.editor.mark_saved();
        self.project_path = Some(path.to_path_buf());
        self.source = ProjectSource::File(path.to_path_buf());
        Ok(())
    }

    fn reopen(&mut self, path: &Path) -> Result<(), FrontendError> {
        let objects = TextFormat::new(self.editor.scene().catalog()).load(path)?;
        self.editor.replace_scene(objects);
        self.editor.mark_saved();
        Ok(())
    }

    /// 场景概览文本。
    pub fn report(&self) -> String {
        let scene = self.editor.scene();
        let catalog = scene.catalog();
        let objects = scene.objects();
        let subset = self.editor.selection().subset();
        let mut out = String::new();

        // 写入 String 不会失败
        let _ = writeln!(out, "工厂蓝图编辑会话");
        match &self.source {
            ProjectSource::File(path) => {
                let _ = writeln!(out, "项目来源：{}", path.display());
            }
            ProjectSource::Demo => {
                let _ = writeln!(out, "项目来源：内置示例");
            }
        }
        let _ = writeln!(
            out,
            "当前模式={}, 已处理帧数={}, 缩放={:.3}",
            self.editor.mode(),
            self.frames,
            self.zoom
        );

        let _ = writeln!(out, "建筑（{} 个）：", objects.buildings.len());
        for (i, building) in objects.buildings.iter().enumerate() {
            let mark = if subset.contains_building(i) { "*" } else { " " };
            let _ = writeln!(
                out,
                " {mark} #{i} {} 位置=({:.2}, {:.2}) 旋转={}",
                catalog.building(building.def_idx).class,
                building.pos.x(),
                building.pos.y(),
                building.rot
            );
        }

        let _ = writeln!(out, "路径（{} 条）：", objects.paths.len());
        for (i, path) in objects.paths.iter().enumerate() {
            let mark = match subset.path(i) {
                Some(sel) if sel.is_full() => "*",
                Some(_) => "~",
                None => " ",
            };
            let _ = writeln!(
                out,
                " {mark} #{i} {} ({:.2}, {:.2}) -> ({:.2}, {:.2})",
                catalog.path(path.def_idx).class,
                path.start.x(),
                path.start.y(),
                path.end.x(),
                path.end.y()
            );
        }

        let _ = writeln!(out, "文本框（{} 个）：", objects.text_boxes.len());
        for (i, text_box) in objects.text_boxes.iter().enumerate() {
            let mark = if subset.contains_text_box(i) { "*" } else { " " };
            let b = text_box.bounds;
            let _ = writeln!(
                out,
                " {mark} #{i} ({:.2}, {:.2}) {:.2}x{:.2} {:?}",
                b.x(),
                b.y(),
                b.width(),
                b.height(),
                text_box.content
            );
        }

        let _ = writeln!(
            out,
            "历史记录 {}/{}，未保存的修改：{}",
            scene.history_pos(),
            scene.history().len(),
            if scene.is_modified() { "有" } else { "无" }
        );
        out
    }
}
