pub mod action;
pub mod draw;
pub mod editor;
pub mod input;
pub mod mode;
pub mod scene;
pub mod selection;
pub mod selector;
pub mod tools;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("action chain exceeded {limit} steps")]
        ActionChainOverflow { limit: usize },
        #[error("definition `{0}` not found in catalog")]
        UnknownDefinition(String),
    }
}

pub use action::{Action, AppAction};
pub use editor::{EditorSettings, EditorState, HostRequest};
pub use errors::EngineError;
pub use input::{ButtonState, FrameInput, KeyBinding};
pub use mode::{Mode, Resets, SelectionMode};
pub use scene::Scene;
