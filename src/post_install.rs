//! Post-install 큐: 전체 활성화(의존성 포함)가 성공한 뒤에만 실행되는 지연 작업
//!
//! ## 특징
//! - 등록 순서대로 실행 (FIFO)
//! - 작업 하나가 실패해도 나머지는 계속 실행 (best-effort)
//! - drain 후 큐는 비어 있으므로 같은 작업이 두 번 실행되지 않음

use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex};

/// 인자 없는 지연 작업
pub type PostInstallAction = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

struct QueuedAction {
    label: String,
    action: PostInstallAction,
}

/// drain 결과
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    /// 실행된 작업 수 (실패 포함)
    pub ran: usize,
    /// (label, error) 목록
    pub failed: Vec<(String, String)>,
}

impl DrainReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 복제 가능한 큐 핸들. 엔진과 훅 서비스가 같은 큐를 공유합니다.
#[derive(Clone, Default)]
pub struct PostInstallQueue {
    actions: Arc<Mutex<Vec<QueuedAction>>>,
}

impl PostInstallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, label: impl Into<String>, action: PostInstallAction) {
        let label = label.into();
        tracing::info!("Registering post-install '{}'", label);
        let mut actions = self.actions.lock().unwrap_or_else(|e| e.into_inner());
        actions.push(QueuedAction { label, action });
    }

    pub fn len(&self) -> usize {
        self.actions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn labels(&self) -> Vec<String> {
        self.actions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|a| a.label.clone())
            .collect()
    }

    /// 등록 순서대로 모든 작업 실행. 실패는 로그만 남기고 계속 진행.
    pub async fn drain(&self) -> DrainReport {
        let pending = {
            let mut actions = self.actions.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *actions)
        };

        let mut report = DrainReport::default();
        if pending.is_empty() {
            return report;
        }

        tracing::info!("Running {} post-install action(s)", pending.len());
        for QueuedAction { label, action } in pending {
            report.ran += 1;
            match action().await {
                Ok(()) => tracing::info!("Post-install '{}' finished", label),
                Err(e) => {
                    tracing::error!("Post-install '{}' failed: {:#}", label, e);
                    report.failed.push((label, format!("{:#}", e)));
                }
            }
        }
        report
    }
}
