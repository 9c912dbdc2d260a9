//! Execution Envelope - 균일한 핸들러 실행 래퍼
//!
//! 모든 원시 핸들러를 동일한 실행 규약으로 감쌉니다:
//! 호출별 상관 ID, 호출별 의존성 생성, 소요 시간 기록, 에러 격리.
//!
//! 엔벨로프가 반환하는 future는 핸들러 실패와 무관하게 항상 정상 완료합니다.
//! 실패하는 핸들러 하나가 디스패처나 이벤트 소스로 전파되는 일은 없습니다.

use crate::definition::{DependencyContext, InvocationArgs, RawHandler, SetupFn};
use futures::future::BoxFuture;
use modbot_foundation::Error;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, Instrument, Span};
use uuid::Uuid;

/// 컴파일된 핸들러의 실행 함수
pub type ExecuteFn = Arc<dyn Fn(InvocationArgs) -> BoxFuture<'static, ()> + Send + Sync>;

// ============================================================================
// HandlerLogger - 핸들러별 로거 핸들
// ============================================================================

/// 핸들러에 부착되는 로거 핸들
///
/// 호출 시점에 상관 ID를 담은 스코프 span을 파생합니다.
/// 공유 상태를 변경하지 않습니다.
#[derive(Debug, Clone)]
pub struct HandlerLogger {
    namespace: String,
}

impl HandlerLogger {
    /// 새 로거 핸들 생성
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// 네임스페이스
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 한 호출 동안만 유효한 스코프 span 파생
    pub fn scoped(&self, key: &str, correlation_id: &Uuid) -> Span {
        tracing::info_span!(
            "invoke",
            namespace = %self.namespace,
            key = %key,
            correlation_id = %correlation_id,
        )
    }
}

// ============================================================================
// CompiledHandler - 컴파일된 핸들러
// ============================================================================

/// 레지스트리에 저장되는 실행 단위
///
/// 생성 후 불변입니다. 핫 리로드는 같은 키 아래 새 CompiledHandler를
/// 삽입하는 것으로 이루어지며, 기존 값을 제자리에서 변경하지 않습니다.
pub struct CompiledHandler {
    execute: ExecuteFn,
    logger: HandlerLogger,
}

impl CompiledHandler {
    /// 핸들러 실행 - 항상 정상 완료
    pub async fn execute(&self, args: InvocationArgs) {
        (self.execute)(args).await;
    }

    /// 로거 핸들
    pub fn logger(&self) -> &HandlerLogger {
        &self.logger
    }
}

// ============================================================================
// Envelope - 래핑 로직
// ============================================================================

/// 실행 엔벨로프
pub struct Envelope;

impl Envelope {
    /// 원시 핸들러를 CompiledHandler로 래핑
    ///
    /// 반환된 `execute`는 호출마다:
    /// 1. 새 상관 ID(UUID v4)를 생성하고 스코프 span에 담음
    /// 2. `setup()`을 새로 실행하여 의존성 컨텍스트 생성 - 캐시 없음
    /// 3. 시작 시각을 기록하고 원시 핸들러를 호출
    /// 4. 성공 시 소요 시간(ms)을 로그
    /// 5. 실패(setup 또는 핸들러)는 스코프 밖 로거로 error 레벨 기록 후 소멸
    pub fn wrap(
        key: impl Into<String>,
        raw: RawHandler,
        setup: Option<SetupFn>,
        namespace: impl Into<String>,
    ) -> CompiledHandler {
        let key: Arc<str> = Arc::from(key.into());
        let logger = HandlerLogger::new(namespace);
        let call_logger = logger.clone();

        let execute: ExecuteFn = Arc::new(move |args: InvocationArgs| {
            let key = Arc::clone(&key);
            let raw = Arc::clone(&raw);
            let setup = setup.clone();
            let logger = call_logger.clone();

            Box::pin(async move {
                let correlation_id = Uuid::new_v4();
                let span = logger.scoped(&key, &correlation_id);

                let outcome = async {
                    let deps: DependencyContext = match &setup {
                        Some(factory) => factory()
                            .await
                            .map_err(|e| Error::Setup(e.to_string()))?,
                        None => Box::new(()),
                    };

                    let started = Instant::now();
                    raw(deps, args)
                        .await
                        .map_err(|e| Error::execution(key.as_ref(), e.to_string()))?;

                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    debug!(elapsed_ms, "handler completed");
                    Ok::<(), Error>(())
                }
                .instrument(span)
                .await;

                // 실패는 상관 ID 스코프 밖의 로거로 기록하고 소멸시킴
                if let Err(e) = outcome {
                    debug_assert!(e.is_contained(), "envelope only swallows contained errors");
                    error!(key = %key, error = %e, "handler invocation failed");
                }
            })
        });

        CompiledHandler { execute, logger }
    }
}
