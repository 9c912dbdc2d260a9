//! Handler Definitions - 원시 핸들러 정의 형태
//!
//! 파일 로딩(외부 협력자)이 생성하는 명령어/이벤트/스크립트 정의와
//! 핸들러 함수 타입 alias를 정의합니다.

use crate::source::EventSource;
use futures::future::BoxFuture;
use modbot_foundation::Result;
use std::any::Any;
use std::sync::Arc;

// ============================================================================
// 함수 타입 alias
// ============================================================================

/// 플랫폼별 가변 인자 (이벤트 페이로드, 인터랙션 컨텍스트 등)
pub type InvocationArgs = Vec<serde_json::Value>;

/// 호출마다 새로 생성되는 의존성 컨텍스트
///
/// `setup` 팩토리가 생성하며, 한 호출의 시작에 만들어지고 끝에 버려집니다.
/// 호출 간에 공유되지 않습니다.
pub type DependencyContext = Box<dyn Any + Send>;

/// 의존성 팩토리 - 호출마다 새로 실행됨
pub type SetupFn = Arc<dyn Fn() -> BoxFuture<'static, Result<DependencyContext>> + Send + Sync>;

/// 원시 핸들러 함수
///
/// 의존성 컨텍스트를 명시적 첫 인자로 받습니다 (암묵적 수신자 없음).
pub type RawHandler =
    Arc<dyn Fn(DependencyContext, InvocationArgs) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// 스크립트 load 훅이 반환하는 정리 함수
pub type CleanupFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// 스크립트 load 훅
pub type LoadHook =
    Arc<dyn Fn(ScriptContext) -> BoxFuture<'static, Result<Option<CleanupFn>>> + Send + Sync>;

// ============================================================================
// CommandDefinition - 명령어 정의
// ============================================================================

/// 명령어 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// 슬래시 명령어 (옵션/서브커맨드 중첩 가능)
    Slash,

    /// 유저 컨텍스트 명령어 (중첩 불가)
    User,

    /// 메시지 컨텍스트 명령어 (중첩 불가)
    Message,
}

/// 원시 명령어 정의
#[derive(Clone)]
pub struct CommandDefinition {
    /// 명령어 이름
    pub name: String,

    /// 명령어 종류
    pub kind: CommandKind,

    /// 옵션 트리 (Slash 전용)
    pub options: Vec<CommandOption>,

    /// 실행 함수 (서브커맨드가 있는 Slash 명령어에서는 미사용)
    pub execute: Option<RawHandler>,

    /// 의존성 팩토리
    pub setup: Option<SetupFn>,
}

impl CommandDefinition {
    /// 슬래시 명령어 정의 생성
    pub fn slash(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CommandKind::Slash,
            options: Vec::new(),
            execute: None,
            setup: None,
        }
    }

    /// 유저 컨텍스트 명령어 정의 생성
    pub fn user(name: impl Into<String>, execute: RawHandler) -> Self {
        Self {
            name: name.into(),
            kind: CommandKind::User,
            options: Vec::new(),
            execute: Some(execute),
            setup: None,
        }
    }

    /// 메시지 컨텍스트 명령어 정의 생성
    pub fn message(name: impl Into<String>, execute: RawHandler) -> Self {
        Self {
            name: name.into(),
            kind: CommandKind::Message,
            options: Vec::new(),
            execute: Some(execute),
            setup: None,
        }
    }

    /// 실행 함수 설정
    pub fn with_execute(mut self, execute: RawHandler) -> Self {
        self.execute = Some(execute);
        self
    }

    /// 의존성 팩토리 설정
    pub fn with_setup(mut self, setup: SetupFn) -> Self {
        self.setup = Some(setup);
        self
    }

    /// 옵션 추가
    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }
}

// ============================================================================
// CommandOption - 옵션 트리
// ============================================================================

/// 옵션 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// 서브커맨드 (자체 실행 함수를 가짐)
    SubCommand,

    /// 서브커맨드 그룹 (자식은 서브커맨드만 허용)
    SubCommandGroup,

    /// 값 옵션 (자동완성 핸들러 부착 가능)
    Value,
}

/// 명령어 옵션 정의
#[derive(Clone)]
pub struct CommandOption {
    /// 옵션 이름
    pub name: String,

    /// 옵션 종류
    pub kind: OptionKind,

    /// 자식 옵션 (SubCommand의 값 옵션, SubCommandGroup의 서브커맨드)
    pub options: Vec<CommandOption>,

    /// 실행 함수 (SubCommand 전용)
    pub execute: Option<RawHandler>,

    /// 의존성 팩토리 (없으면 부모의 것을 사용)
    pub setup: Option<SetupFn>,

    /// 자동완성 핸들러 (Value 전용)
    pub autocomplete: Option<RawHandler>,
}

impl CommandOption {
    /// 서브커맨드 옵션 생성
    pub fn subcommand(name: impl Into<String>, execute: RawHandler) -> Self {
        Self {
            name: name.into(),
            kind: OptionKind::SubCommand,
            options: Vec::new(),
            execute: Some(execute),
            setup: None,
            autocomplete: None,
        }
    }

    /// 서브커맨드 그룹 옵션 생성
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OptionKind::SubCommandGroup,
            options: Vec::new(),
            execute: None,
            setup: None,
            autocomplete: None,
        }
    }

    /// 값 옵션 생성
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OptionKind::Value,
            options: Vec::new(),
            execute: None,
            setup: None,
            autocomplete: None,
        }
    }

    /// 자식 옵션 추가
    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// 의존성 팩토리 설정
    pub fn with_setup(mut self, setup: SetupFn) -> Self {
        self.setup = Some(setup);
        self
    }

    /// 자동완성 핸들러 설정
    pub fn with_autocomplete(mut self, autocomplete: RawHandler) -> Self {
        self.autocomplete = Some(autocomplete);
        self
    }
}

// ============================================================================
// EventDefinition - 이벤트 정의
// ============================================================================

/// 원시 이벤트 정의
#[derive(Clone)]
pub struct EventDefinition {
    /// 이벤트 소스에서의 이벤트 이름
    pub name: String,

    /// 1회성 리스너 여부 (`once` vs `on`)
    pub once: bool,

    /// 실행 함수
    pub execute: RawHandler,

    /// 의존성 팩토리
    pub setup: Option<SetupFn>,
}

impl EventDefinition {
    /// 새 이벤트 정의 생성
    pub fn new(name: impl Into<String>, execute: RawHandler) -> Self {
        Self {
            name: name.into(),
            once: false,
            execute,
            setup: None,
        }
    }

    /// 1회성 리스너로 설정
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// 의존성 팩토리 설정
    pub fn with_setup(mut self, setup: SetupFn) -> Self {
        self.setup = Some(setup);
        self
    }
}

// ============================================================================
// ScriptModule - 스크립트 정의
// ============================================================================

/// load 훅에 전달되는 최소 컨텍스트
#[derive(Clone)]
pub struct ScriptContext {
    /// 이벤트 소스 핸들
    pub source: Arc<dyn EventSource>,

    /// 로그 네임스페이스 (스크립트 상대 경로 기반)
    pub namespace: String,
}

/// 원시 스크립트 모듈
#[derive(Clone, Default)]
pub struct ScriptModule {
    /// load 훅 (없으면 로드 시 아무 일도 하지 않음)
    pub load: Option<LoadHook>,
}

impl ScriptModule {
    /// load 훅 없는 스크립트 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// load 훅과 함께 생성
    pub fn with_load(load: LoadHook) -> Self {
        Self { load: Some(load) }
    }
}
