//! Runtime Configuration - 런타임 설정 로더
//!
//! `.modbot/config.toml`을 검색 경로에서 로드하고 병합합니다.
//! User-level 설정 위에 Project-level 설정이 오버라이드됩니다.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 설정 파일명
pub const CONFIG_FILE: &str = "config.toml";

/// 설정 디렉토리명
pub const CONFIG_DIR: &str = ".modbot";

// ============================================================================
// RuntimeConfig - 런타임 설정
// ============================================================================

/// ModBot 런타임 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// 핸들러 모듈 루트 디렉토리 (스크립트 키의 상대 경로 기준)
    pub modules_dir: PathBuf,

    /// 로그 필터 (EnvFilter 문법, RUST_LOG가 우선)
    pub log_filter: String,

    /// 인프로세스 이벤트 소스의 채널 용량
    pub event_channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            modules_dir: PathBuf::from("modules"),
            log_filter: "info".to_string(),
            event_channel_capacity: 256,
        }
    }
}

impl RuntimeConfig {
    /// 오버레이 적용 - 파일에 명시된 필드만 덮어씀
    ///
    /// 값 비교가 아니라 필드 존재 여부로 판단하므로, 기본값과 같은 값을
    /// 명시적으로 적어도 하위 우선순위 설정을 덮어씁니다.
    fn apply(self, overlay: ConfigOverlay) -> Self {
        Self {
            modules_dir: overlay.modules_dir.unwrap_or(self.modules_dir),
            log_filter: overlay.log_filter.unwrap_or(self.log_filter),
            event_channel_capacity: overlay
                .event_channel_capacity
                .unwrap_or(self.event_channel_capacity),
        }
    }
}

/// 설정 파일 하나의 내용 - 생략된 필드는 None
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverlay {
    pub modules_dir: Option<PathBuf>,
    pub log_filter: Option<String>,
    pub event_channel_capacity: Option<usize>,
}

// ============================================================================
// ConfigLoader - 설정 로더
// ============================================================================

/// 런타임 설정 로더
pub struct ConfigLoader {
    /// 검색 경로 (뒤쪽이 높은 우선순위)
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// 새 로더 생성 (기본 검색 경로)
    pub fn new(working_dir: &Path) -> Self {
        let mut paths = Vec::new();

        // 1. User-level (낮은 우선순위)
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_DIR));
        }

        // 2. Project-level (높은 우선순위)
        paths.push(working_dir.join(CONFIG_DIR));

        Self {
            search_paths: paths,
        }
    }

    /// 커스텀 검색 경로로 생성
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths: paths,
        }
    }

    /// 모든 경로에서 config.toml 로드하여 병합
    pub fn load_all(&self) -> Result<RuntimeConfig> {
        let mut merged = RuntimeConfig::default();

        for search_path in &self.search_paths {
            let config_file = search_path.join(CONFIG_FILE);

            if config_file.exists() {
                match load_overlay_from_file(&config_file) {
                    Ok(overlay) => {
                        info!("Loaded config from: {}", config_file.display());
                        merged = merged.apply(overlay);
                    }
                    Err(e) => {
                        warn!(
                            "Failed to load config from {}: {}",
                            config_file.display(),
                            e
                        );
                    }
                }
            }
        }

        Ok(merged)
    }
}

// ============================================================================
// 유틸리티 함수
// ============================================================================

/// 파일에서 오버레이 로드 (명시된 필드만 담김)
pub fn load_overlay_from_file(path: &Path) -> Result<ConfigOverlay> {
    let content = std::fs::read_to_string(path)?;
    let overlay: ConfigOverlay = toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Invalid config.toml at {}: {}", path.display(), e))
    })?;

    debug!("Loaded runtime config from {}", path.display());

    Ok(overlay)
}

/// 파일에서 설정 로드 - 기본값 위에 파일 내용을 적용
pub fn load_config_from_file(path: &Path) -> Result<RuntimeConfig> {
    Ok(RuntimeConfig::default().apply(load_overlay_from_file(path)?))
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.modules_dir, PathBuf::from("modules"));
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.event_channel_capacity, 256);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let config_file = dir.path().join(CONFIG_FILE);

        let content = r#"
            modules_dir = "handlers"
            log_filter = "debug"
        "#;
        fs::write(&config_file, content).unwrap();

        let config = load_config_from_file(&config_file).unwrap();
        assert_eq!(config.modules_dir, PathBuf::from("handlers"));
        assert_eq!(config.log_filter, "debug");
        // 명시되지 않은 필드는 기본값
        assert_eq!(config.event_channel_capacity, 256);
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = tempdir().unwrap();
        let config_file = dir.path().join(CONFIG_FILE);
        fs::write(&config_file, "modules_dir = [not toml").unwrap();

        let result = load_config_from_file(&config_file);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_loader_merge_priority() {
        let user = tempdir().unwrap();
        let project = tempdir().unwrap();

        fs::write(
            user.path().join(CONFIG_FILE),
            r#"
                log_filter = "warn"
                event_channel_capacity = 64
            "#,
        )
        .unwrap();
        fs::write(
            project.path().join(CONFIG_FILE),
            r#"log_filter = "trace""#,
        )
        .unwrap();

        let loader = ConfigLoader::with_paths(vec![
            user.path().to_path_buf(),
            project.path().to_path_buf(),
        ]);
        let config = loader.load_all().unwrap();

        // Project가 user를 오버라이드, 나머지는 user 값 유지
        assert_eq!(config.log_filter, "trace");
        assert_eq!(config.event_channel_capacity, 64);
    }

    #[test]
    fn test_explicit_default_value_still_overrides() {
        let user = tempdir().unwrap();
        let project = tempdir().unwrap();

        fs::write(user.path().join(CONFIG_FILE), r#"log_filter = "warn""#).unwrap();
        // 기본값과 같은 값이라도 명시되었으면 이김
        fs::write(project.path().join(CONFIG_FILE), r#"log_filter = "info""#).unwrap();

        let loader = ConfigLoader::with_paths(vec![
            user.path().to_path_buf(),
            project.path().to_path_buf(),
        ]);
        let config = loader.load_all().unwrap();

        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_loader_missing_files() {
        let loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/path")]);
        let config = loader.load_all().unwrap();
        assert_eq!(config.log_filter, "info");
    }
}
