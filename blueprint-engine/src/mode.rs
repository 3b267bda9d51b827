use std::fmt;

/// 编辑器顶层模式。选择模式自带子模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    NewPath,
    NewBuilding,
    NewTextBox,
    Selection(SelectionMode),
}

/// 选择模式的子状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Normal,
    Drag,
    Duplicate,
    /// 仅当恰好选中一个文本框时可用。
    Resize,
}

impl Mode {
    /// 撤销/重做与文件操作只在空闲状态下响应。
    #[inline]
    pub fn is_idle(self) -> bool {
        matches!(self, Mode::Normal | Mode::Selection(SelectionMode::Normal))
    }

    #[inline]
    pub fn is_selection(self) -> bool {
        matches!(self, Mode::Selection(_))
    }

    /// 断言当前处于期望模式；不匹配说明调用方存在缺陷。
    #[track_caller]
    pub fn assert_is(self, expected: Mode) {
        assert_eq!(self, expected, "handler called in the wrong mode");
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Normal => f.write_str("normal"),
            Mode::NewPath => f.write_str("new-path"),
            Mode::NewBuilding => f.write_str("new-building"),
            Mode::NewTextBox => f.write_str("new-text-box"),
            Mode::Selection(SelectionMode::Normal) => f.write_str("selection"),
            Mode::Selection(SelectionMode::Drag) => f.write_str("selection/drag"),
            Mode::Selection(SelectionMode::Duplicate) => f.write_str("selection/duplicate"),
            Mode::Selection(SelectionMode::Resize) => f.write_str("selection/resize"),
        }
    }
}

/// 模式切换时需要重置的组件。相机不在其中，切换模式从不影响视图。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resets {
    pub selector: bool,
    pub new_path: bool,
    pub new_building: bool,
    pub new_text_box: bool,
    pub selection: bool,
    pub panel: bool,
}

impl Resets {
    pub fn all() -> Self {
        Self {
            selector: true,
            new_path: true,
            new_building: true,
            new_text_box: true,
            selection: true,
            panel: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_selector(mut self, value: bool) -> Self {
        self.selector = value;
        self
    }

    pub fn with_new_path(mut self, value: bool) -> Self {
        self.new_path = value;
        self
    }

    pub fn with_new_building(mut self, value: bool) -> Self {
        self.new_building = value;
        self
    }

    pub fn with_new_text_box(mut self, value: bool) -> Self {
        self.new_text_box = value;
        self
    }

    pub fn with_selection(mut self, value: bool) -> Self {
        self.selection = value;
        self
    }

    pub fn with_panel(mut self, value: bool) -> Self {
        self.panel = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_toggle_single_flags() {
        let resets = Resets::all().with_selection(false).with_panel(false);
        assert!(resets.selector && resets.new_path && resets.new_building && resets.new_text_box);
        assert!(!resets.selection);
        assert!(!resets.panel);
        assert_eq!(Resets::none().with_selector(true), Resets {
            selector: true,
            ..Resets::default()
        });
    }

    #[test]
    fn idle_modes() {
        assert!(Mode::Normal.is_idle());
        assert!(Mode::Selection(SelectionMode::Normal).is_idle());
        assert!(!Mode::Selection(SelectionMode::Drag).is_idle());
        assert!(!Mode::NewPath.is_idle());
        assert_eq!(Mode::Selection(SelectionMode::Resize).to_string(), "selection/resize");
    }

    #[test]
    #[should_panic(expected = "wrong mode")]
    fn assert_is_panics_on_mismatch() {
        Mode::NewBuilding.assert_is(Mode::NewPath);
    }
}
