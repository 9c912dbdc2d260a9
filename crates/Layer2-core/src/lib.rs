//! modbot-core: Runtime Registry for ModBot
//!
//! Layer2 - 핸들러 모듈 런타임 레이어
//!
//! 장수 프로세스 안에서 명령어/이벤트/스크립트 핸들러 모듈을 프로세스
//! 재시작 없이 로드·언로드·교체합니다.
//!
//! # 주요 모듈
//!
//! - `key`: 계층 키 빌더 (cmd/auto/usr/msg 태그)
//! - `definition`: 원시 핸들러 정의 (파일 로딩이 생성)
//! - `compiler`: 정의 평탄화 → (키, 핸들러) 쌍
//! - `envelope`: 균일한 실행 래퍼 (상관 ID, 호출별 의존성, 에러 격리)
//! - `registry`: 네 개의 핸들러 스토어 + 이벤트 소스 연동
//! - `lifecycle`: 파일 단위 로드/언로드/리로드 조율
//! - `source`: 이벤트 소스 포트 및 인프로세스 구현
//!
//! # 사용 예시
//!
//! ```ignore
//! use modbot_core::{
//!     CommandDefinition, InProcessEventSource, LifecycleCoordinator, ModuleFile, Registry,
//! };
//! use std::sync::Arc;
//!
//! let source = Arc::new(InProcessEventSource::new());
//! let registry = Arc::new(Registry::new(source));
//! let coordinator = LifecycleCoordinator::new(Arc::clone(&registry));
//!
//! // 파일 배치 로드 - 실패한 파일만 건너뜀
//! let summary = coordinator.load_batch(files).await;
//!
//! // 디스패치
//! registry.dispatch_command("cmd:ping", vec![]).await;
//!
//! // 핫 리로드
//! coordinator.reload_file(updated_file).await?;
//! ```

// Core modules
pub mod compiler;
pub mod definition;
pub mod envelope;
pub mod key;
pub mod lifecycle;
pub mod registry;
pub mod source;

#[cfg(test)]
mod testutil;

// Re-exports: Key
pub use key::{build_key, HandlerKind, KEY_SEPARATOR};

// Re-exports: Definitions
pub use definition::{
    CleanupFn, CommandDefinition, CommandKind, CommandOption, DependencyContext, EventDefinition,
    InvocationArgs, LoadHook, OptionKind, RawHandler, ScriptContext, ScriptModule, SetupFn,
};

// Re-exports: Envelope
pub use envelope::{CompiledHandler, Envelope, HandlerLogger};

// Re-exports: Compiler
pub use compiler::compile;

// Re-exports: Registry
pub use registry::{EventEntry, ModuleContribution, Registry, RegistryStats};

// Re-exports: Lifecycle
pub use lifecycle::{LifecycleCoordinator, LoadSummary, ModuleFile};

// Re-exports: Event Source
pub use source::{EventSource, InProcessEventSource, ListenerFn};

/// 크레이트 버전
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
