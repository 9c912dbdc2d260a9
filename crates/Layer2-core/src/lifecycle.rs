//! Lifecycle Coordinator - 파일 단위 로드/언로드 오케스트레이션
//!
//! 명령어/이벤트/스크립트 모듈 파일의 다단계 로드·언로드 순서를 조율합니다.
//! 배치 로딩은 파일별로 독립적이며, 한 파일의 실패가 나머지 파일의 로드를
//! 막지 않습니다. 파일 간 로드 순서는 보장되지 않습니다.

use crate::compiler;
use crate::definition::{CommandDefinition, EventDefinition, ScriptContext, ScriptModule};
use crate::registry::{ModuleContribution, Registry};
use modbot_foundation::{Error, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

// ============================================================================
// ModuleFile - 로드 대상 파일
// ============================================================================

/// 로드할 모듈 파일 (외부 파일 로딩이 생성)
pub enum ModuleFile {
    /// 명령어 정의 파일
    Command {
        path: String,
        definition: CommandDefinition,
    },

    /// 이벤트 정의 파일
    Event {
        path: String,
        definition: EventDefinition,
    },

    /// 라이프사이클 스크립트 파일
    Script {
        path: String,
        module: ScriptModule,
    },
}

impl ModuleFile {
    /// 파일 경로 (모듈 루트 기준 상대 경로)
    pub fn path(&self) -> &str {
        match self {
            Self::Command { path, .. } | Self::Event { path, .. } | Self::Script { path, .. } => {
                path
            }
        }
    }
}

// ============================================================================
// LoadSummary - 배치 결과
// ============================================================================

/// 배치 로드 결과
#[derive(Default)]
pub struct LoadSummary {
    /// 성공한 파일 경로
    pub loaded: Vec<String>,

    /// 실패한 파일과 원인
    pub failed: Vec<(String, Error)>,
}

impl LoadSummary {
    /// 성공 파일 수
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// 실패 파일 수
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// 전부 성공했는지 확인
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

// ============================================================================
// LifecycleCoordinator
// ============================================================================

/// 라이프사이클 코디네이터
pub struct LifecycleCoordinator {
    registry: Arc<Registry>,
}

impl LifecycleCoordinator {
    /// 새 코디네이터 생성
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// 레지스트리 접근
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // ========================================================================
    // 파일 단위 로드/언로드
    // ========================================================================

    /// 파일 하나 로드
    ///
    /// 구조적 실패(`Error::Compile`, `Error::LoadHook`)만 호출자에게
    /// 반환됩니다. 등록된 엔트리는 모듈 인덱스에 기록됩니다.
    pub async fn load_file(&self, file: ModuleFile) -> Result<()> {
        match file {
            ModuleFile::Command { path, definition } => {
                let entries = compiler::compile(&definition)?;

                let mut contribution = ModuleContribution::new();
                for (key, handler) in entries {
                    contribution.command_keys.push(key.clone());
                    self.registry.set_command(key, handler).await;
                }

                info!(
                    path = %path,
                    count = contribution.command_keys.len(),
                    "command module loaded"
                );
                self.registry.record_contribution(path, contribution).await;
                Ok(())
            }
            ModuleFile::Event { path, definition } => {
                let key = definition.name.clone();
                self.registry.set_event(key.clone(), definition).await;

                let mut contribution = ModuleContribution::new();
                contribution.event_keys.push(key);

                info!(path = %path, "event module loaded");
                self.registry.record_contribution(path, contribution).await;
                Ok(())
            }
            ModuleFile::Script { path, module } => self.load_script(&path, module).await,
        }
    }

    /// 파일 하나가 기여한 모든 엔트리 언로드
    ///
    /// 기여 내역이 없으면 조용한 no-op.
    pub async fn unload_file(&self, path: &str) {
        let Some(contribution) = self.registry.take_contribution(path).await else {
            debug!(path = %path, "no recorded contribution, nothing to unload");
            return;
        };

        for key in &contribution.command_keys {
            self.registry.remove_command(key).await;
        }
        for key in &contribution.event_keys {
            self.registry.unset_event(key).await;
        }
        if contribution.script {
            self.registry.unset_script(path).await;
        }

        info!(
            path = %path,
            commands = contribution.command_keys.len(),
            events = contribution.event_keys.len(),
            "module unloaded"
        );
    }

    /// 파일 리로드 - 기존 기여를 내린 뒤 새 정의를 올림
    pub async fn reload_file(&self, file: ModuleFile) -> Result<()> {
        self.unload_file(file.path()).await;
        self.load_file(file).await
    }

    // ========================================================================
    // 스크립트
    // ========================================================================

    /// 스크립트 로드
    ///
    /// load 훅이 없으면 아무 것도 추적하지 않습니다. 훅 실패는 기록 후
    /// `Error::LoadHook`으로 반환되며 정리 함수는 등록되지 않습니다 -
    /// 이후 언로드 관점에서 이 파일은 로드되지 않은 것으로 취급됩니다.
    pub async fn load_script(&self, relpath: &str, module: ScriptModule) -> Result<()> {
        let Some(load) = module.load else {
            debug!(path = %relpath, "script exposes no load hook");
            return Ok(());
        };

        let context = ScriptContext {
            source: self.registry.source(),
            namespace: format!("scripts:{}", relpath),
        };

        match load(context).await {
            Ok(Some(cleanup)) => {
                self.registry.set_script_cleanup(relpath, cleanup).await;

                let mut contribution = ModuleContribution::new();
                contribution.script = true;
                self.registry
                    .record_contribution(relpath, contribution)
                    .await;

                info!(path = %relpath, "script loaded with cleanup");
                Ok(())
            }
            Ok(None) => {
                debug!(path = %relpath, "script load hook returned no cleanup");
                Ok(())
            }
            Err(e) => {
                let err = Error::LoadHook(format!("{}: {}", relpath, e));
                error!(path = %relpath, error = %e, "script load hook failed");
                Err(err)
            }
        }
    }

    /// 스크립트 언로드
    ///
    /// 등록된 정리 함수가 없으면 조용한 no-op.
    pub async fn unload_script(&self, relpath: &str) {
        self.registry.take_contribution(relpath).await;
        self.registry.unset_script(relpath).await;
    }

    // ========================================================================
    // 배치 로드
    // ========================================================================

    /// 여러 파일을 독립적으로 로드
    ///
    /// 한 파일의 실패는 결과에 기록될 뿐 나머지 파일의 로드를 막지 않습니다.
    pub async fn load_batch(&self, files: Vec<ModuleFile>) -> LoadSummary {
        let mut summary = LoadSummary::default();

        for file in files {
            let path = file.path().to_string();
            match self.load_file(file).await {
                Ok(()) => summary.loaded.push(path),
                Err(e) => {
                    debug_assert!(e.is_surfaced(), "only structural failures reach the batch");
                    error!(path = %path, error = %e, "module failed to load, skipping");
                    summary.failed.push((path, e));
                }
            }
        }

        info!(
            loaded = summary.loaded_count(),
            failed = summary.failed_count(),
            "batch load completed"
        );
        summary
    }
}
