use std::collections::HashSet;
use std::fs;
use std::path::Path;

use blueprint_core::catalog::{BuildingDef, Catalog, MAX_CONNECTORS, PathDef};
use serde::de::DeserializeOwned;
use tracing::{debug, info, trace};

use crate::IoError;

/// 从两份 JSON 数组（建筑定义、路径定义）读取定义表并校验。
pub struct CatalogLoader;

impl CatalogLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn load(&self, building_defs: &Path, path_defs: &Path) -> Result<Catalog, IoError> {
        let buildings: Vec<BuildingDef> = read_json(building_defs)?;
        debug!(count = buildings.len(), path = %building_defs.display(), "建筑定义已解析");
        let paths: Vec<PathDef> = read_json(path_defs)?;
        debug!(count = paths.len(), path = %path_defs.display(), "路径定义已解析");

        let catalog = self.assemble(buildings, paths)?;
        info!(
            buildings = catalog.buildings().len(),
            paths = catalog.paths().len(),
            "定义表加载完成"
        );
        Ok(catalog)
    }

    /// 校验并组装定义表。
    pub fn assemble(
        &self,
        buildings: Vec<BuildingDef>,
        paths: Vec<PathDef>,
    ) -> Result<Catalog, IoError> {
        validate_buildings(&buildings)?;
        validate_paths(&paths)?;
        Ok(Catalog::new(buildings, paths))
    }
}

fn validate_buildings(buildings: &[BuildingDef]) -> Result<(), IoError> {
    let mut seen = HashSet::new();
    for def in buildings {
        trace!(class = %def.class, category = %def.category, "校验建筑定义");
        if def.class.trim().is_empty() {
            return Err(invalid("building with an empty class name"));
        }
        if !seen.insert(def.class.as_str()) {
            return Err(invalid(format!("duplicate building class `{}`", def.class)));
        }
        if !(def.dims.x() > 0.0 && def.dims.y() > 0.0) {
            return Err(invalid(format!(
                "building `{}` must have positive dimensions",
                def.class
            )));
        }
        for (kind, list) in [
            ("belt_in", &def.belt_in),
            ("belt_out", &def.belt_out),
            ("pipe_in", &def.pipe_in),
            ("pipe_out", &def.pipe_out),
        ] {
            if list.len() > MAX_CONNECTORS {
                return Err(invalid(format!(
                    "building `{}` declares {} {kind} connectors (max {MAX_CONNECTORS})",
                    def.class,
                    list.len()
                )));
            }
        }
    }
    Ok(())
}

fn validate_paths(paths: &[PathDef]) -> Result<(), IoError> {
    let mut seen = HashSet::new();
    for def in paths {
        if def.class.trim().is_empty() {
            return Err(invalid("path with an empty class name"));
        }
        if !seen.insert(def.class.as_str()) {
            return Err(invalid(format!("duplicate path class `{}`", def.class)));
        }
        if !(def.width > 0.0) {
            return Err(invalid(format!("path `{}` must have a positive width", def.class)));
        }
    }
    Ok(())
}

impl Default for CatalogLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(message: impl Into<String>) -> IoError {
    IoError::InvalidCatalog(message.into())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, IoError> {
    let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| IoError::Catalog {
        path: path.to_path_buf(),
        source,
    })
}
