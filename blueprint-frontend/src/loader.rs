use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blueprint_config::AppConfig;
use blueprint_core::catalog::Catalog;
use blueprint_core::geometry::{Point2, Rect};
use blueprint_core::objects::{Building, ObjectCollection, Path as PathObject, TextBox};
use blueprint_io::{ProjectLoader, TextFormat};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::resource_locator::CatalogLocator;

/// 未显式指定项目时读取的环境变量。
pub const PROJECT_ENV: &str = "BLUEPRINT_PROJECT";

/// 项目来源，便于前端呈现加载信息。
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectSource {
    File(PathBuf),
    Demo,
}

/// 加载后的定义表与对象。
#[derive(Debug)]
pub struct LoadedScene {
    pub catalog: Arc<Catalog>,
    pub objects: ObjectCollection,
    pub source: ProjectSource,
}

impl LoadedScene {
    #[inline]
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            ProjectSource::File(path) => Some(path.as_path()),
            ProjectSource::Demo => None,
        }
    }
}

/// 显式路径加载失败直接报错；来自环境变量 `BLUEPRINT_PROJECT` 的路径失败时回退到内置示例。
pub fn load_scene(explicit: Option<&Path>, config: &AppConfig) -> Result<LoadedScene, FrontendError> {
    if let Some(path) = explicit {
        let catalog = locate_catalog(Some(path), config);
        let objects = TextFormat::new(&catalog).load(path)?;
        return Ok(LoadedScene {
            catalog: Arc::new(catalog),
            objects,
            source: ProjectSource::File(path.to_path_buf()),
        });
    }

    if let Some(path) = env::var_os(PROJECT_ENV) {
        let path = PathBuf::from(path);
        let catalog = locate_catalog(Some(path.as_path()), config);
        match TextFormat::new(&catalog).load(&path) {
            Ok(objects) => {
                return Ok(LoadedScene {
                    catalog: Arc::new(catalog),
                    objects,
                    source: ProjectSource::File(path),
                });
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载项目失败，回退到内置示例");
            }
        }
    }

    let catalog = locate_catalog(None, config);
    let objects = demo_objects(&catalog);
    info!(objects = objects.len(), "已构建内置示例场景");
    Ok(LoadedScene {
        catalog: Arc::new(catalog),
        objects,
        source: ProjectSource::Demo,
    })
}

fn locate_catalog(project: Option<&Path>, config: &AppConfig) -> Catalog {
    let base_dir = project.and_then(Path::parent);
    CatalogLocator::from_config(base_dir, &config.resources).load_catalog(&config.resources)
}

/// 内置示例：两台建筑由一条路径相连，外加一个说明文本框。定义表缺少对应类名时跳过该对象。
pub fn demo_objects(catalog: &Catalog) -> ObjectCollection {
    let mut objects = ObjectCollection::new();
    if let Some(idx) = catalog.building_index("Constructor") {
        objects
            .buildings
            .push(Building::new(idx, Point2::new(0.0, 0.0), 0));
        objects
            .buildings
            .push(Building::new(idx, Point2::new(20.0, 0.0), 0));
    }
    if let Some(idx) = catalog.path_index("Conveyor Belt") {
        objects.paths.push(PathObject::new(
            idx,
            Point2::new(4.0, 10.0),
            Point2::new(24.0, 10.0),
        ));
    }
    objects.text_boxes.push(TextBox::new(
        Rect::new(0.0, -8.0, 12.0, 4.0),
        "Iron line",
    ));
    objects
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn demo_scene_without_project() {
        let loaded = load_scene(None, &AppConfig::default()).expect("示例场景不会失败");
        if loaded.source == ProjectSource::Demo {
            assert_eq!(loaded.objects.buildings.len(), 2);
            assert_eq!(loaded.objects.paths.len(), 1);
            assert_eq!(loaded.objects.text_boxes.len(), 1);
            assert!(loaded.path().is_none());
        }
    }

    #[test]
    fn demo_skips_unknown_classes() {
        let objects = demo_objects(&Catalog::default());
        assert!(objects.buildings.is_empty());
        assert!(objects.paths.is_empty());
        assert_eq!(objects.text_boxes.len(), 1);
    }

    #[test]
    fn explicit_project_is_loaded() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("factory.txt");
        fs::write(&path, "#VERSION=1\nFoundation 4 6 90\n").expect("写入失败");

        let loaded = load_scene(Some(&path), &AppConfig::default()).expect("加载项目失败");
        assert_eq!(loaded.source, ProjectSource::File(path.clone()));
        assert_eq!(loaded.objects.buildings.len(), 1);
        assert_eq!(loaded.objects.buildings[0].rot, 90);
    }

    #[test]
    fn explicit_project_errors_are_reported() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("broken.txt");
        fs::write(&path, "#VERSION=9\n").expect("写入失败");

        let err = load_scene(Some(&path), &AppConfig::default()).unwrap_err();
        assert!(matches!(err, FrontendError::Io(_)));
    }
}
