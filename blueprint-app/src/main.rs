use std::path::PathBuf;

use blueprint_config::{AppConfig, ConfigError};
use blueprint_frontend::RunOptions;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;
    let mut options = RunOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_override = Some(path_arg(&mut args, "--config")),
            "--script" => options.script = Some(path_arg(&mut args, "--script")),
            "--save-to" => options.save_to = Some(path_arg(&mut args, "--save-to")),
            other if other.starts_with("--") => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
            project => {
                if options.project.is_some() {
                    eprintln!("只能指定一个项目文件");
                    std::process::exit(1);
                }
                options.project = Some(PathBuf::from(project));
            }
        }
    }

    let config = load_configuration(config_override);
    init_logging(&config);
    info!("启动工厂蓝图编辑器");

    if let Err(err) = blueprint_frontend::run_headless(&config, &options) {
        error!(error = %err, "编辑会话失败");
        std::process::exit(1);
    }
}

fn path_arg(args: &mut impl Iterator<Item = String>, flag: &str) -> PathBuf {
    let Some(path) = args.next() else {
        eprintln!("`{flag}` 需要提供路径");
        std::process::exit(1);
    };
    PathBuf::from(path)
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Invalid(_) | ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 重复初始化时忽略
    let _ = fmt().with_env_filter(filter).try_init();
}
