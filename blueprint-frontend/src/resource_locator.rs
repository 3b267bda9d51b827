use std::env;
use std::path::{Path, PathBuf};

use blueprint_config::ResourceConfig;
use blueprint_core::catalog::Catalog;
use blueprint_io::CatalogLoader;
use tracing::{debug, info, trace, warn};

/// 追加定义表搜索根目录的环境变量，按平台路径分隔符拆分。
pub const CATALOG_ROOTS_ENV: &str = "BLUEPRINT_CATALOG_ROOTS";

/// 在若干根目录中查找定义表 JSON。
pub struct CatalogLocator {
    search_roots: Vec<PathBuf>,
}

impl CatalogLocator {
    /// 搜索顺序：`base_dir`（通常是项目文件所在目录）、配置中的根目录、环境变量中的根目录。
    pub fn from_config(base_dir: Option<&Path>, resources: &ResourceConfig) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();

        if let Some(dir) = base_dir {
            roots.push(dir.to_path_buf());
        }

        roots.extend(
            resources
                .catalog_roots
                .iter()
                .filter(|path| path.is_dir())
                .cloned(),
        );

        if let Some(env_paths) = env::var_os(CATALOG_ROOTS_ENV) {
            roots.extend(env::split_paths(&env_paths).filter(|path| path.is_dir()));
        }

        Self::with_roots(roots)
    }

    /// 直接给定根目录列表，重复项只保留第一次出现的位置。
    pub fn with_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut deduped: Vec<PathBuf> = Vec::new();
        for root in roots {
            if !deduped.contains(&root) {
                deduped.push(root);
            }
        }
        Self {
            search_roots: deduped,
        }
    }

    #[inline]
    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    pub fn resolve(&self, file: &Path) -> Option<PathBuf> {
        if file.is_absolute() {
            if file.is_file() {
                return Some(file.to_path_buf());
            }
            debug!(path = %file.display(), "定义表路径为绝对路径但文件不存在");
            return None;
        }
        self.search_roots.iter().find_map(|root| {
            let candidate = root.join(file);
            trace!(candidate = %candidate.display(), "定义表候选路径");
            candidate.is_file().then_some(candidate)
        })
    }

    /// 两份定义文件都找到时加载它们，否则（或加载失败时）使用内置定义表。
    pub fn load_catalog(&self, resources: &ResourceConfig) -> Catalog {
        let building_defs = self.resolve(&resources.building_defs);
        let path_defs = self.resolve(&resources.path_defs);
        let (Some(building_defs), Some(path_defs)) = (building_defs, path_defs) else {
            info!(
                roots = self.search_roots.len(),
                "未找到定义表文件，使用内置定义表"
            );
            return Catalog::builtin();
        };

        match CatalogLoader::new().load(&building_defs, &path_defs) {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!(error = %err, "加载定义表失败，回退到内置定义表");
                Catalog::builtin()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn resources() -> ResourceConfig {
        ResourceConfig::default()
    }

    #[test]
    fn roots_are_deduplicated_in_order() {
        let locator = CatalogLocator::with_roots([
            PathBuf::from("a"),
            PathBuf::from("b"),
            PathBuf::from("a"),
        ]);
        assert_eq!(locator.search_roots(), &[PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn earlier_root_wins() {
        let first = tempfile::tempdir().expect("创建临时目录失败");
        let second = tempfile::tempdir().expect("创建临时目录失败");
        fs::write(second.path().join("building_defs.json"), "[]").expect("写入失败");
        fs::write(first.path().join("building_defs.json"), "[]").expect("写入失败");

        let locator = CatalogLocator::with_roots([
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let found = locator
            .resolve(Path::new("building_defs.json"))
            .expect("应找到定义文件");
        assert!(found.starts_with(first.path()));
        assert!(locator.resolve(Path::new("path_defs.json")).is_none());
    }

    #[test]
    fn missing_files_fall_back_to_builtin() {
        let empty = tempfile::tempdir().expect("创建临时目录失败");
        let locator = CatalogLocator::with_roots([empty.path().to_path_buf()]);
        assert_eq!(locator.load_catalog(&resources()), Catalog::builtin());
    }

    #[test]
    fn loads_catalog_from_root() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        fs::write(
            dir.path().join("building_defs.json"),
            r#"[{"class": "Smelter", "category": "Production", "dims": [6.0, 9.0]}]"#,
        )
        .expect("写入失败");
        fs::write(
            dir.path().join("path_defs.json"),
            r#"[{"class": "Conveyor Belt", "width": 1.0}]"#,
        )
        .expect("写入失败");

        let catalog = CatalogLocator::with_roots([dir.path().to_path_buf()]).load_catalog(&resources());
        assert_eq!(catalog.building_index("Smelter"), Some(0));
        assert_eq!(catalog.path_index("Conveyor Belt"), Some(0));
        assert!(catalog.building_index("Constructor").is_none());
    }

    #[test]
    fn invalid_catalog_falls_back_to_builtin() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        fs::write(
            dir.path().join("building_defs.json"),
            r#"[{"class": "Flat", "dims": [3.0, 0.0]}]"#,
        )
        .expect("写入失败");
        fs::write(dir.path().join("path_defs.json"), "[]").expect("写入失败");

        let catalog = CatalogLocator::with_roots([dir.path().to_path_buf()]).load_catalog(&resources());
        assert_eq!(catalog, Catalog::builtin());
    }
}
