//! modbot-foundation: Foundation Layer for ModBot
//!
//! Layer1 - 에러 타입, 런타임 설정, 로깅 부트스트랩
//!
//! # 주요 모듈
//!
//! - `error`: 중앙 에러 타입 및 Result alias
//! - `config`: 런타임 설정 (`.modbot/config.toml`) 로더
//! - `logging`: tracing subscriber 설치

pub mod config;
pub mod error;
pub mod logging;

// Re-exports: Error
pub use error::{Error, Result};

// Re-exports: Config
pub use config::{
    load_config_from_file, load_overlay_from_file, ConfigLoader, ConfigOverlay, RuntimeConfig,
    CONFIG_DIR, CONFIG_FILE,
};

/// Layer1 버전
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
