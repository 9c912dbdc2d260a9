//! Error types for ModBot
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ModBot 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 컴파일 관련 (정의 구조 오류 - 호출자에게 전달되는 유일한 구조적 실패)
    // ========================================================================
    #[error("Compile error: {0}")]
    Compile(String),

    // ========================================================================
    // 실행 관련 (엔벨로프 내부에서 기록 후 소멸)
    // ========================================================================
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Execution failed: {key} - {message}")]
    Execution { key: String, message: String },

    #[error("Cleanup error: {0}")]
    Cleanup(String),

    #[error("Load hook error: {0}")]
    LoadHook(String),

    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 엔벨로프/레지스트리 경계에서 삼켜지는(로그만 남는) 에러인지 확인
    pub fn is_contained(&self) -> bool {
        matches!(
            self,
            Error::Setup(_) | Error::Execution { .. } | Error::Cleanup(_)
        )
    }

    /// 호출자에게 구조적 실패로 전달되는 에러인지 확인
    pub fn is_surfaced(&self) -> bool {
        matches!(self, Error::Compile(_) | Error::LoadHook(_))
    }

    /// Compile 에러 생성 헬퍼
    pub fn compile(message: impl Into<String>) -> Self {
        Error::Compile(message.into())
    }

    /// Execution 에러 생성 헬퍼
    pub fn execution(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Execution {
            key: key.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
