//! Test Utilities - 로그 레코드 캡처
//!
//! 에러 격리/경고 속성 테스트를 위해 tracing 이벤트를 수집합니다.

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// 캡처된 로그 레코드 저장소
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<(Level, String)>>>,
}

impl LogCapture {
    /// 현재 스레드에 캡처 subscriber 설치
    ///
    /// 반환된 guard가 drop될 때까지 유효합니다. 테스트는
    /// current-thread 런타임(#[tokio::test] 기본값)에서 실행되어야 합니다.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let layer = CaptureLayer {
            records: Arc::clone(&capture.records),
        };
        let subscriber = tracing_subscriber::registry().with(layer);
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    /// 특정 레벨의 레코드 수
    pub fn count_at(&self, level: Level) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }

    /// 특정 레벨에 메시지 부분 문자열이 있는지 확인
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .lock()
            .unwrap()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

struct CaptureLayer {
    records: Arc<Mutex<Vec<(Level, String)>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.records
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.message));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}
