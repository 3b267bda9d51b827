pub mod cli;
pub mod errors;
pub mod loader;
pub mod resource_locator;

use std::fs;
use std::path::PathBuf;

use blueprint_config::{AppConfig, EditorConfig};
use blueprint_core::geometry::Grid;
use blueprint_engine::EditorSettings;
use errors::FrontendError;
use tracing::info;

pub use cli::Session;

/// 一次无界面运行的参数。
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub project: Option<PathBuf>,
    pub script: Option<PathBuf>,
    /// 运行结束后保存到此路径，同时作为另存为请求的目标。
    pub save_to: Option<PathBuf>,
}

/// 由配置构造编辑器参数。
pub fn editor_settings_from(config: &EditorConfig) -> EditorSettings {
    EditorSettings {
        grid: Grid::new(config.grid_step),
        text_box_min_size: config.text_box_min_size,
        text_box_handle_px: config.text_box_handle_px,
        text_box_default_text: config.text_box_default_text.clone(),
        max_action_chain: config.max_action_chain,
    }
}

/// 加载项目，执行脚本，打印场景概览，按需保存。
pub fn run_headless(config: &AppConfig, options: &RunOptions) -> Result<(), FrontendError> {
    info!("启动无界面编辑会话");
    let loaded = loader::load_scene(options.project.as_deref(), config)?;
    let mut session = Session::new(loaded, editor_settings_from(&config.editor))
        .with_save_as_target(options.save_to.clone());

    if let Some(path) = &options.script {
        let script = fs::read_to_string(path).map_err(|source| FrontendError::ScriptRead {
            path: path.clone(),
            source,
        })?;
        session.run_script(&script)?;
    }

    if let Some(path) = &options.save_to {
        session.save_as(path)?;
    }

    print!("{}", session.report());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let config = EditorConfig {
            grid_step: 0.0,
            text_box_default_text: "Note".to_string(),
            ..EditorConfig::default()
        };
        let settings = editor_settings_from(&config);
        assert!(!settings.grid.is_enabled());
        assert_eq!(settings.text_box_default_text, "Note");
        assert_eq!(settings.max_action_chain, 64);
    }

    #[test]
    fn headless_run_saves_script_result() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let script = dir.path().join("session.txt");
        fs::write(&script, "click 1 1\nkey delete\n").expect("写入脚本失败");
        let project = dir.path().join("factory.txt");
        fs::write(&project, "#VERSION=1\nFoundation 0 0 0\nFoundation 10 0 0\n")
            .expect("写入项目失败");
        let out = dir.path().join("out.txt");

        let options = RunOptions {
            project: Some(project),
            script: Some(script),
            save_to: Some(out.clone()),
        };
        run_headless(&AppConfig::default(), &options).expect("运行失败");

        let saved = fs::read_to_string(&out).expect("读取保存结果失败");
        assert_eq!(saved, "#VERSION=1\nFoundation 10 0 0\n");
    }

    #[test]
    fn missing_script_is_reported() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let options = RunOptions {
            script: Some(dir.path().join("absent.txt")),
            ..RunOptions::default()
        };
        let err = run_headless(&AppConfig::default(), &options).unwrap_err();
        assert!(matches!(err, FrontendError::ScriptRead { .. }));
    }
}
