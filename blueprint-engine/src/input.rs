use blueprint_core::geometry::{Point2, Rect, Vector2};
use blueprint_core::objects::Direction;

/// 单个鼠标按键在本帧的状态。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ButtonState {
    pub down: bool,
    pub pressed: bool,
    pub released: bool,
    /// 最近一次松开时的世界坐标。
    pub last_released: Option<Point2>,
}

/// 上游已完成去抖与重复处理的按键绑定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBinding {
    Escape,
    New,
    Open,
    Save,
    SaveAs,
    Undo,
    Redo,
    Delete,
    Duplicate,
    Rotate,
    Drag,
    Up,
    Down,
    Left,
    Right,
}

impl KeyBinding {
    pub fn direction(self) -> Option<Direction> {
        match self {
            KeyBinding::Up => Some(Direction::Up),
            KeyBinding::Down => Some(Direction::Down),
            KeyBinding::Left => Some(Direction::Left),
            KeyBinding::Right => Some(Direction::Right),
            _ => None,
        }
    }

    /// 按名称解析，供脚本与配置使用。
    pub fn from_name(name: &str) -> Option<Self> {
        let key = match name.to_ascii_lowercase().as_str() {
            "escape" | "esc" => KeyBinding::Escape,
            "new" => KeyBinding::New,
            "open" => KeyBinding::Open,
            "save" => KeyBinding::Save,
            "save-as" | "saveas" => KeyBinding::SaveAs,
            "undo" => KeyBinding::Undo,
            "redo" => KeyBinding::Redo,
            "delete" | "del" => KeyBinding::Delete,
            "duplicate" | "dup" => KeyBinding::Duplicate,
            "rotate" => KeyBinding::Rotate,
            "drag" => KeyBinding::Drag,
            "up" => KeyBinding::Up,
            "down" => KeyBinding::Down,
            "left" => KeyBinding::Left,
            "right" => KeyBinding::Right,
            _ => return None,
        };
        Some(key)
    }
}

/// 每帧一次、不可变的输入快照。
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    /// 指针的世界坐标。
    pub pointer: Point2,
    pub pointer_screen_delta: Vector2,
    pub left: ButtonState,
    pub middle: ButtonState,
    pub right: ButtonState,
    pub scroll: f64,
    pub in_viewport: bool,
    pub key: Option<KeyBinding>,
    /// 每个世界单位对应的屏幕像素数。
    pub zoom: f64,
    /// 屏幕坐标下的视口矩形。
    pub viewport: Rect,
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            pointer: Point2::ORIGIN,
            pointer_screen_delta: Vector2::ZERO,
            left: ButtonState::default(),
            middle: ButtonState::default(),
            right: ButtonState::default(),
            scroll: 0.0,
            in_viewport: true,
            key: None,
            zoom: 1.0,
            viewport: Rect::new(0.0, 0.0, 1280.0, 720.0),
        }
    }
}

impl FrameInput {
    /// 指针位于 `pointer`、无按键的一帧。
    pub fn at(pointer: Point2) -> Self {
        Self {
            pointer,
            ..Self::default()
        }
    }

    pub fn pressed(mut self) -> Self {
        self.left.pressed = true;
        self.left.down = true;
        self
    }

    pub fn held(mut self) -> Self {
        self.left.down = true;
        self
    }

    pub fn released(mut self) -> Self {
        self.left.released = true;
        self.left.down = false;
        self.left.last_released = Some(self.pointer);
        self
    }

    pub fn with_key(mut self, key: KeyBinding) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    /// 松开位置，缺省为当前指针。
    #[inline]
    pub fn release_pos(&self) -> Point2 {
        self.left.last_released.unwrap_or(self.pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_round_trip_common_aliases() {
        assert_eq!(KeyBinding::from_name("ESC"), Some(KeyBinding::Escape));
        assert_eq!(KeyBinding::from_name("save-as"), Some(KeyBinding::SaveAs));
        assert_eq!(KeyBinding::from_name("jump"), None);
        assert_eq!(KeyBinding::Left.direction(), Some(Direction::Left));
        assert_eq!(KeyBinding::Rotate.direction(), None);
    }

    #[test]
    fn release_builder_records_position() {
        let input = FrameInput::at(Point2::new(3.0, 4.0)).released();
        assert!(input.left.released);
        assert!(!input.left.down);
        assert_eq!(input.release_pos(), Point2::new(3.0, 4.0));
    }
}
