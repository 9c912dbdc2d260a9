//! Event Source Port - 외부 이벤트 소스 추상화
//!
//! 챗 플랫폼 클라이언트의 `on`/`once`/`off` 의미론을 포트로 추상화합니다.
//! 레지스트리는 이 포트를 통해서만 리스너 테이블을 변경하며,
//! 테스트에서는 인프로세스 구현으로 대체됩니다.
//!
//! 리스너 식별은 `Arc::ptr_eq` - attach에 사용한 것과 동일한 Arc를
//! detach에 넘겨야 합니다.

use crate::definition::InvocationArgs;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// 이벤트 리스너 함수
pub type ListenerFn = Arc<dyn Fn(InvocationArgs) -> BoxFuture<'static, ()> + Send + Sync>;

// ============================================================================
// EventSource - 포트 트레이트
// ============================================================================

/// 이벤트 소스 포트
#[async_trait]
pub trait EventSource: Send + Sync {
    /// 리스너 부착 (`on`)
    async fn attach(&self, name: &str, listener: ListenerFn);

    /// 1회성 리스너 부착 (`once`)
    async fn attach_once(&self, name: &str, listener: ListenerFn);

    /// 리스너 분리 (`off`) - attach에 사용한 동일한 Arc로 식별
    async fn detach(&self, name: &str, listener: &ListenerFn);
}

// ============================================================================
// InProcessEventSource - 인프로세스 구현
// ============================================================================

struct ListenerSlot {
    listener: ListenerFn,
    once: bool,
}

/// 인프로세스 이벤트 소스
///
/// 테스트와, 실제 챗 클라이언트를 브릿지하는 임베더가 사용합니다.
/// `emit`은 부착 순서대로 리스너를 순차 실행합니다.
#[derive(Default)]
pub struct InProcessEventSource {
    listeners: RwLock<HashMap<String, Vec<ListenerSlot>>>,
}

impl InProcessEventSource {
    /// 새 이벤트 소스 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 이벤트 발생 - 리스너 실행, 1회성 리스너는 실행 전에 제거
    ///
    /// 실행된 리스너 수를 반환합니다.
    pub async fn emit(&self, name: &str, args: InvocationArgs) -> usize {
        let to_invoke: Vec<ListenerFn> = {
            let mut listeners = self.listeners.write().await;
            match listeners.get_mut(name) {
                Some(slots) => {
                    let invoked: Vec<ListenerFn> =
                        slots.iter().map(|s| Arc::clone(&s.listener)).collect();
                    slots.retain(|s| !s.once);
                    if slots.is_empty() {
                        listeners.remove(name);
                    }
                    invoked
                }
                None => Vec::new(),
            }
        };

        trace!(event = name, count = to_invoke.len(), "emitting event");

        // 락 해제 후 실행 (리스너가 소스를 다시 만질 수 있음)
        let count = to_invoke.len();
        for listener in to_invoke {
            listener(args.clone()).await;
        }
        count
    }

    /// 특정 이벤트의 활성 리스너 수
    pub async fn listener_count(&self, name: &str) -> usize {
        let listeners = self.listeners.read().await;
        listeners.get(name).map_or(0, Vec::len)
    }

    async fn insert(&self, name: &str, listener: ListenerFn, once: bool) {
        let mut listeners = self.listeners.write().await;
        listeners
            .entry(name.to_string())
            .or_default()
            .push(ListenerSlot { listener, once });
        debug!(event = name, once, "listener attached");
    }
}

#[async_trait]
impl EventSource for InProcessEventSource {
    async fn attach(&self, name: &str, listener: ListenerFn) {
        self.insert(name, listener, false).await;
    }

    async fn attach_once(&self, name: &str, listener: ListenerFn) {
        self.insert(name, listener, true).await;
    }

    async fn detach(&self, name: &str, listener: &ListenerFn) {
        let mut listeners = self.listeners.write().await;
        if let Some(slots) = listeners.get_mut(name) {
            slots.retain(|s| !Arc::ptr_eq(&s.listener, listener));
            if slots.is_empty() {
                listeners.remove(name);
            }
            debug!(event = name, "listener detached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(counter: Arc<AtomicUsize>) -> ListenerFn {
        Arc::new(move |_args: InvocationArgs| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn test_attach_and_emit() {
        let source = InProcessEventSource::new();
        let counter = Arc::new(AtomicUsize::new(0));

        source
            .attach("messageCreate", counting_listener(Arc::clone(&counter)))
            .await;

        assert_eq!(source.emit("messageCreate", vec![]).await, 1);
        assert_eq!(source.emit("messageCreate", vec![]).await, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_once_listener_removed_before_invocation() {
        let source = InProcessEventSource::new();
        let counter = Arc::new(AtomicUsize::new(0));

        source
            .attach_once("ready", counting_listener(Arc::clone(&counter)))
            .await;

        assert_eq!(source.emit("ready", vec![]).await, 1);
        assert_eq!(source.listener_count("ready").await, 0);

        // 두 번째 emit은 아무도 받지 않음
        assert_eq!(source.emit("ready", vec![]).await, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detach_by_identity() {
        let source = InProcessEventSource::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = counting_listener(Arc::clone(&counter));
        let second = counting_listener(Arc::clone(&counter));

        source.attach("guildCreate", Arc::clone(&first)).await;
        source.attach("guildCreate", Arc::clone(&second)).await;
        assert_eq!(source.listener_count("guildCreate").await, 2);

        // 동일한 Arc만 제거됨
        source.detach("guildCreate", &first).await;
        assert_eq!(source.listener_count("guildCreate").await, 1);

        assert_eq!(source.emit("guildCreate", vec![]).await, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detach_unknown_event_is_noop() {
        let source = InProcessEventSource::new();
        let listener = counting_listener(Arc::new(AtomicUsize::new(0)));
        source.detach("nonexistent", &listener).await;
        assert_eq!(source.listener_count("nonexistent").await, 0);
    }

    #[tokio::test]
    async fn test_emit_passes_args() {
        let source = InProcessEventSource::new();
        let seen: Arc<tokio::sync::Mutex<Vec<InvocationArgs>>> =
            Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let listener: ListenerFn = Arc::new(move |args| {
            let seen = Arc::clone(&seen_clone);
            Box::pin(async move {
                seen.lock().await.push(args);
            })
        });
        source.attach("interactionCreate", listener).await;

        source
            .emit(
                "interactionCreate",
                vec![serde_json::json!({"id": "123"})],
            )
            .await;

        let seen = seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0]["id"], "123");
    }
}
