//! Logging - tracing 부트스트랩
//!
//! fmt subscriber를 EnvFilter와 함께 설치합니다.
//! RUST_LOG 환경 변수가 있으면 설정 파일의 필터보다 우선합니다.

use crate::{Error, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// 전역 subscriber 설치
///
/// 프로세스당 한 번만 호출해야 합니다. 이미 설치된 경우 에러를 반환합니다.
pub fn init(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install subscriber: {}", e)))
}
