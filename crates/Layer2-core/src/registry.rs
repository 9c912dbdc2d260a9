//! Registry - 핸들러 스토어 및 이벤트 소스 연동
//!
//! 네 개의 독립 스토어(명령어, 이벤트, 스크립트 정리, 모듈 인덱스)를
//! 단독 소유하며, 이벤트 소스의 리스너 테이블은 attach/detach 포트를
//! 통해서만 변경합니다.
//!
//! 핫 리로드 시 같은 키에 대해 detach-before-attach 순서가 중복 리스너를
//! 막는 유일한 장치입니다. 디스패치는 Arc 참조를 캡처한 뒤 락을 놓으므로,
//! 실행 중 키가 교체되어도 진행 중인 호출은 캡처한 핸들러로 완주합니다.

use crate::definition::{CleanupFn, EventDefinition, InvocationArgs};
use crate::envelope::{CompiledHandler, Envelope};
use crate::source::{EventSource, ListenerFn};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// 이벤트 핸들러의 로그 네임스페이스
const NS_EVENTS: &str = "events";

// ============================================================================
// 스토어 엔트리 타입
// ============================================================================

/// 이벤트 스토어 엔트리
///
/// detach에 필요한 (이벤트 이름, 리스너 Arc)를 보관합니다.
pub struct EventEntry {
    /// 이벤트 소스에서의 이벤트 이름
    pub name: String,

    /// attach에 사용한 리스너 (Arc 동일성으로 detach)
    pub listener: ListenerFn,

    /// 1회성 리스너 여부
    pub once: bool,
}

/// 한 소스 파일이 기여한 엔트리들
#[derive(Debug, Clone)]
pub struct ModuleContribution {
    /// 등록된 명령어/자동완성 키
    pub command_keys: Vec<String>,

    /// 등록된 이벤트 키
    pub event_keys: Vec<String>,

    /// 스크립트 정리 함수 등록 여부
    pub script: bool,

    /// 로드 시각
    pub loaded_at: DateTime<Utc>,
}

impl ModuleContribution {
    /// 빈 기여 생성
    pub fn new() -> Self {
        Self {
            command_keys: Vec::new(),
            event_keys: Vec::new(),
            script: false,
            loaded_at: Utc::now(),
        }
    }

    /// 기여한 엔트리가 없는지 확인
    pub fn is_empty(&self) -> bool {
        self.command_keys.is_empty() && self.event_keys.is_empty() && !self.script
    }
}

impl Default for ModuleContribution {
    fn default() -> Self {
        Self::new()
    }
}

/// 레지스트리 통계
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub commands: usize,
    pub events: usize,
    pub scripts: usize,
    pub modules: usize,
}

// ============================================================================
// Registry
// ============================================================================

/// 핸들러 레지스트리
pub struct Registry {
    /// 이벤트 소스 포트 (소유하지 않음 - 리스너 분리에 필요한 정보만 보관)
    source: Arc<dyn EventSource>,

    /// CommandStore: 키 → 컴파일된 핸들러 (명령어 + 자동완성, 접두 태그로 구분)
    commands: RwLock<HashMap<String, Arc<CompiledHandler>>>,

    /// EventStore: 키 → 부착된 리스너 정보
    events: RwLock<HashMap<String, EventEntry>>,

    /// ScriptCleanupStore: 상대 경로 → 정리 함수
    cleanups: RwLock<HashMap<String, CleanupFn>>,

    /// ModuleDefinitionStore: 상대 경로 → 기여 내역
    modules: RwLock<HashMap<String, ModuleContribution>>,
}

impl Registry {
    /// 새 레지스트리 생성
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            source,
            commands: RwLock::new(HashMap::new()),
            events: RwLock::new(HashMap::new()),
            cleanups: RwLock::new(HashMap::new()),
            modules: RwLock::new(HashMap::new()),
        }
    }

    /// 이벤트 소스 핸들
    pub fn source(&self) -> Arc<dyn EventSource> {
        Arc::clone(&self.source)
    }

    // ========================================================================
    // CommandStore
    // ========================================================================

    /// 명령어 핸들러 등록 - 같은 키는 교체 (last-write-wins)
    pub async fn set_command(&self, key: impl Into<String>, handler: CompiledHandler) {
        let key = key.into();
        let mut commands = self.commands.write().await;
        if commands.insert(key.clone(), Arc::new(handler)).is_some() {
            debug!(key = %key, "replacing command handler");
        } else {
            debug!(key = %key, "command handler registered");
        }
    }

    /// 명령어 핸들러 조회
    pub async fn get_command(&self, key: &str) -> Option<Arc<CompiledHandler>> {
        let commands = self.commands.read().await;
        commands.get(key).map(Arc::clone)
    }

    /// 명령어 존재 여부
    pub async fn contains_command(&self, key: &str) -> bool {
        let commands = self.commands.read().await;
        commands.contains_key(key)
    }

    /// 명령어 제거
    pub async fn remove_command(&self, key: &str) -> bool {
        let mut commands = self.commands.write().await;
        let removed = commands.remove(key).is_some();
        if removed {
            debug!(key = %key, "command handler removed");
        }
        removed
    }

    /// 등록된 명령어 키 목록
    pub async fn command_keys(&self) -> Vec<String> {
        let commands = self.commands.read().await;
        commands.keys().cloned().collect()
    }

    /// 명령어/자동완성 디스패치
    ///
    /// 조회가 Arc 참조를 캡처하고 락을 놓은 뒤 실행하므로, 실행 도중
    /// 키가 교체되어도 이 호출은 캡처한 핸들러로 완주합니다.
    /// 알 수 없는 키는 경고를 남기고 false를 반환합니다.
    pub async fn dispatch_command(&self, key: &str, args: InvocationArgs) -> bool {
        let handler = self.get_command(key).await;
        match handler {
            Some(handler) => {
                handler.execute(args).await;
                true
            }
            None => {
                warn!(key = %key, "no handler registered for dispatch");
                false
            }
        }
    }

    // ========================================================================
    // EventStore
    // ========================================================================

    /// 이벤트 리스너 등록
    ///
    /// 같은 키에 기존 엔트리가 있으면 먼저 detach한 뒤 새 리스너를
    /// attach합니다. write 락 안에서 전 과정이 수행되므로 호출자 관점에서
    /// Registered→Unregistered→Registered 전이는 원자적입니다.
    pub async fn set_event(&self, key: impl Into<String>, definition: EventDefinition) {
        let key = key.into();
        let compiled = Arc::new(Envelope::wrap(
            &key,
            Arc::clone(&definition.execute),
            definition.setup.clone(),
            NS_EVENTS,
        ));

        let listener: ListenerFn = Arc::new(move |args: InvocationArgs| {
            let handler = Arc::clone(&compiled);
            Box::pin(async move { handler.execute(args).await })
        });

        let mut events = self.events.write().await;

        if let Some(previous) = events.remove(&key) {
            self.source.detach(&previous.name, &previous.listener).await;
            debug!(key = %key, "detached previous listener before replacement");
        }

        if definition.once {
            self.source
                .attach_once(&definition.name, Arc::clone(&listener))
                .await;
        } else {
            self.source
                .attach(&definition.name, Arc::clone(&listener))
                .await;
        }

        info!(key = %key, event = %definition.name, once = definition.once, "event listener registered");

        events.insert(
            key,
            EventEntry {
                name: definition.name,
                listener,
                once: definition.once,
            },
        );
    }

    /// 이벤트 리스너 해제
    ///
    /// 엔트리가 없으면 경고 하나만 남기고 no-op.
    pub async fn unset_event(&self, key: &str) {
        let mut events = self.events.write().await;
        match events.remove(key) {
            Some(entry) => {
                self.source.detach(&entry.name, &entry.listener).await;
                info!(key = %key, event = %entry.name, "event listener unregistered");
            }
            None => {
                warn!(key = %key, "no event listener registered, nothing to detach");
            }
        }
    }

    /// 이벤트 키 존재 여부
    pub async fn contains_event(&self, key: &str) -> bool {
        let events = self.events.read().await;
        events.contains_key(key)
    }

    // ========================================================================
    // ScriptCleanupStore
    // ========================================================================

    /// 스크립트 정리 함수 등록
    pub async fn set_script_cleanup(&self, relpath: impl Into<String>, cleanup: CleanupFn) {
        let relpath = relpath.into();
        let mut cleanups = self.cleanups.write().await;
        cleanups.insert(relpath.clone(), cleanup);
        debug!(path = %relpath, "script cleanup registered");
    }

    /// 스크립트 정리 함수 실행 및 제거
    ///
    /// 정리 실패는 기록만 하고 엔트리는 무조건 제거합니다 (재시도 없음).
    /// 엔트리가 없으면 조용한 no-op.
    pub async fn unset_script(&self, relpath: &str) {
        let cleanup = {
            let mut cleanups = self.cleanups.write().await;
            cleanups.remove(relpath)
        };

        match cleanup {
            Some(cleanup) => {
                if let Err(e) = cleanup().await {
                    error!(path = %relpath, error = %e, "script cleanup failed");
                } else {
                    debug!(path = %relpath, "script cleanup completed");
                }
            }
            None => {
                debug!(path = %relpath, "no cleanup registered, skipping");
            }
        }
    }

    /// 스크립트 정리 함수 존재 여부
    pub async fn contains_script(&self, relpath: &str) -> bool {
        let cleanups = self.cleanups.read().await;
        cleanups.contains_key(relpath)
    }

    // ========================================================================
    // ModuleDefinitionStore
    // ========================================================================

    /// 파일의 기여 내역 기록
    pub async fn record_contribution(
        &self,
        relpath: impl Into<String>,
        contribution: ModuleContribution,
    ) {
        let mut modules = self.modules.write().await;
        modules.insert(relpath.into(), contribution);
    }

    /// 파일의 기여 내역 꺼내기 (파일 단위 언로드용)
    pub async fn take_contribution(&self, relpath: &str) -> Option<ModuleContribution> {
        let mut modules = self.modules.write().await;
        modules.remove(relpath)
    }

    /// 기여 내역 조회
    pub async fn get_contribution(&self, relpath: &str) -> Option<ModuleContribution> {
        let modules = self.modules.read().await;
        modules.get(relpath).cloned()
    }

    /// 로드된 파일 경로 목록
    pub async fn module_paths(&self) -> Vec<String> {
        let modules = self.modules.read().await;
        modules.keys().cloned().collect()
    }

    // ========================================================================
    // 통계
    // ========================================================================

    /// 스토어별 엔트리 수
    pub async fn stats(&self) -> RegistryStats {
        RegistryStats {
            commands: self.commands.read().await.len(),
            events: self.events.read().await.len(),
            scripts: self.cleanups.read().await.len(),
            modules: self.modules.read().await.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{DependencyContext, RawHandler};
    use crate::source::InProcessEventSource;
    use crate::testutil::LogCapture;
    use modbot_foundation::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Level;

    fn counting_handler(counter: Arc<AtomicUsize>) -> RawHandler {
        Arc::new(move |_deps: DependencyContext, _args: InvocationArgs| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    fn setup() -> (Arc<InProcessEventSource>, Registry) {
        let source = Arc::new(InProcessEventSource::new());
        let registry = Registry::new(Arc::clone(&source) as Arc<dyn EventSource>);
        (source, registry)
    }

    #[tokio::test]
    async fn test_set_event_twice_single_listener() {
        let (source, registry) = setup();
        let counter = Arc::new(AtomicUsize::new(0));

        registry
            .set_event(
                "messageCreate",
                EventDefinition::new("messageCreate", counting_handler(Arc::clone(&counter))),
            )
            .await;
        registry
            .set_event(
                "messageCreate",
                EventDefinition::new("messageCreate", counting_handler(Arc::clone(&counter))),
            )
            .await;

        // 재등록 후에도 활성 리스너는 정확히 하나
        assert_eq!(source.listener_count("messageCreate").await, 1);
        assert_eq!(source.emit("messageCreate", vec![]).await, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unset_event_detaches() {
        let (source, registry) = setup();
        let counter = Arc::new(AtomicUsize::new(0));

        registry
            .set_event(
                "guildCreate",
                EventDefinition::new("guildCreate", counting_handler(Arc::clone(&counter))),
            )
            .await;
        assert_eq!(source.listener_count("guildCreate").await, 1);

        registry.unset_event("guildCreate").await;
        assert_eq!(source.listener_count("guildCreate").await, 0);
        assert!(!registry.contains_event("guildCreate").await);

        assert_eq!(source.emit("guildCreate", vec![]).await, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unset_event_missing_logs_one_warning() {
        let (_source, registry) = setup();
        let (capture, _guard) = LogCapture::install();

        registry.unset_event("nonexistent").await;

        assert_eq!(capture.count_at(Level::WARN), 1);
        assert_eq!(capture.count_at(Level::ERROR), 0);
    }

    #[tokio::test]
    async fn test_once_event_attached_via_once() {
        let (source, registry) = setup();
        let counter = Arc::new(AtomicUsize::new(0));

        registry
            .set_event(
                "ready",
                EventDefinition::new("ready", counting_handler(Arc::clone(&counter))).once(),
            )
            .await;

        assert_eq!(source.emit("ready", vec![]).await, 1);
        // 1회성 리스너는 첫 emit 후 제거됨
        assert_eq!(source.emit("ready", vec![]).await, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_command_last_write_wins() {
        let (_source, registry) = setup();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        registry
            .set_command(
                "cmd:ping",
                Envelope::wrap(
                    "cmd:ping",
                    counting_handler(Arc::clone(&first)),
                    None,
                    "commands",
                ),
            )
            .await;
        registry
            .set_command(
                "cmd:ping",
                Envelope::wrap(
                    "cmd:ping",
                    counting_handler(Arc::clone(&second)),
                    None,
                    "commands",
                ),
            )
            .await;

        assert!(registry.dispatch_command("cmd:ping", vec![]).await);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_key() {
        let (_source, registry) = setup();
        let (capture, _guard) = LogCapture::install();

        assert!(!registry.dispatch_command("cmd:ghost", vec![]).await);
        assert_eq!(capture.count_at(Level::WARN), 1);
    }

    #[tokio::test]
    async fn test_inflight_invocation_survives_replacement() {
        let (_source, registry) = setup();

        // 조회 후 핸들러 참조를 캡처
        registry
            .set_command(
                "cmd:slow",
                Envelope::wrap(
                    "cmd:slow",
                    Arc::new(|_deps: DependencyContext, _args: InvocationArgs| {
                        Box::pin(async { Ok(()) })
                    }),
                    None,
                    "commands",
                ),
            )
            .await;
        let captured = registry.get_command("cmd:slow").await.unwrap();

        // 캡처 후 키를 교체해도
        registry.remove_command("cmd:slow").await;
        assert!(!registry.contains_command("cmd:slow").await);

        // 캡처된 참조로 실행은 완주
        captured.execute(vec![]).await;
    }

    #[tokio::test]
    async fn test_script_cleanup_invoked_on_unset() {
        let (_source, registry) = setup();
        let cleaned = Arc::new(AtomicUsize::new(0));

        let cleaned_clone = Arc::clone(&cleaned);
        let cleanup: CleanupFn = Arc::new(move || {
            let cleaned = Arc::clone(&cleaned_clone);
            Box::pin(async move {
                cleaned.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });

        registry.set_script_cleanup("scripts/presence.rs", cleanup).await;
        assert!(registry.contains_script("scripts/presence.rs").await);

        registry.unset_script("scripts/presence.rs").await;
        assert_eq!(cleaned.load(Ordering::SeqCst), 1);
        assert!(!registry.contains_script("scripts/presence.rs").await);
    }

    #[tokio::test]
    async fn test_failing_cleanup_still_removed() {
        let (_source, registry) = setup();
        let (capture, _guard) = LogCapture::install();

        let cleanup: CleanupFn = Arc::new(|| {
            Box::pin(async { Err(Error::Cleanup("socket already closed".to_string())) })
        });

        registry.set_script_cleanup("scripts/socket.rs", cleanup).await;
        registry.unset_script("scripts/socket.rs").await;

        // 실패해도 엔트리는 제거되고 에러는 기록만 됨
        assert!(!registry.contains_script("scripts/socket.rs").await);
        assert_eq!(capture.count_at(Level::ERROR), 1);
    }

    #[tokio::test]
    async fn test_unset_script_missing_is_silent() {
        let (_source, registry) = setup();
        let (capture, _guard) = LogCapture::install();

        registry.unset_script("scripts/never-loaded.rs").await;

        assert_eq!(capture.count_at(Level::WARN), 0);
        assert_eq!(capture.count_at(Level::ERROR), 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let (_source, registry) = setup();

        registry
            .set_command(
                "cmd:ping",
                Envelope::wrap(
                    "cmd:ping",
                    counting_handler(Arc::new(AtomicUsize::new(0))),
                    None,
                    "commands",
                ),
            )
            .await;
        registry
            .set_event(
                "ready",
                EventDefinition::new("ready", counting_handler(Arc::new(AtomicUsize::new(0)))),
            )
            .await;

        let stats = registry.stats().await;
        assert_eq!(stats.commands, 1);
        assert_eq!(stats.events, 1);
        assert_eq!(stats.scripts, 0);
        assert_eq!(stats.modules, 0);
    }
}
