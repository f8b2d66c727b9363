//! 커맨드라인 인터페이스
//!
//! ```text
//! suitectl [--root DIR] [-v] [--restart] activate <module|bundle>
//! suitectl deactivate <module|bundle> [--delete]
//! suitectl list | status | generate
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compose::ComposeController;
use crate::config::{self, normalize_lexically, SuiteConfig};
use crate::engine::{DeactivationOutcome, LifecycleEngine};
use crate::generate;
use crate::process::SystemRunner;
use crate::registry::ModuleStatus;

/// 멀티 서비스 개발 환경의 선택 모듈 관리 도구
#[derive(Parser, Debug)]
#[command(name = "suitectl")]
#[command(version, about = "Manage optional modules of a multi-service development environment", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// 환경 루트 (기본값: SUITECTL_ROOT 또는 suitectl.toml이 있는 상위 디렉토리)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// 디버그 로그 출력
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 작업 후 docker-compose 재시작
    #[arg(long, global = true)]
    pub restart: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 모듈 또는 번들 활성화
    #[command(visible_aliases = ["install", "i"])]
    Activate {
        /// 모듈 또는 번들 이름
        module: String,
    },

    /// 모듈 또는 번들 비활성화
    #[command(visible_alias = "uninstall")]
    Deactivate {
        module: String,

        /// 모듈 작업 디렉토리도 삭제
        #[arg(long)]
        delete: bool,
    },

    /// 사용 가능한 모듈과 번들 목록
    List,

    /// 모듈별 활성 상태
    Status,

    /// 모듈 조각 파일로 설정 파일 생성
    #[command(visible_aliases = ["gen", "g"])]
    Generate,
}

/// 명시 경로/환경 변수/상위 탐색 순으로 루트를 찾고 절대 경로로 정규화
pub fn resolve_root(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let root = config::find_root(explicit)?;
    let root = if root.is_absolute() {
        root
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(root)
    };
    Ok(normalize_lexically(&root))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let root = resolve_root(cli.root.as_deref())?;
    let config = SuiteConfig::load(&root)?;
    tracing::debug!("Environment root: {}", root.display());

    let mut engine = LifecycleEngine::new(&root, config, Arc::new(SystemRunner))?;

    match &cli.command {
        Commands::Activate { module } => {
            let report = engine
                .activate_request(module)
                .await
                .with_context(|| format!("Could not activate module {}", module))?;
            for name in &report.deactivated {
                println!("- {}", name);
            }
            for name in &report.activated {
                println!("+ {}", name);
            }

            run_generate(&engine)?;

            let drained = engine.drain_post_install().await;
            for (label, reason) in &drained.failed {
                eprintln!("⚠ Post-install '{}' failed: {}", label, reason);
            }

            maybe_restart(&cli, &engine).await?;
        }
        Commands::Deactivate { module, delete } => {
            let outcomes = engine.deactivate_request(module, *delete).await?;
            for (name, outcome) in &outcomes {
                match outcome {
                    DeactivationOutcome::Deactivated => println!("- {}", name),
                    DeactivationOutcome::NotActive => println!("  {} is not active", name),
                    DeactivationOutcome::Forced => {
                        println!("  {} is a mandatory module and will not be deactivated", name)
                    }
                    DeactivationOutcome::NotFound => println!("  {} is unknown", name),
                }
            }

            run_generate(&engine)?;
            maybe_restart(&cli, &engine).await?;
        }
        Commands::List => {
            println!("Modules:");
            for module in engine.list_modules() {
                println!("  {}", module.name);
            }
            let bundles: Vec<&str> = engine.bundles().names().collect();
            if !bundles.is_empty() {
                println!("Bundles:");
                for name in bundles {
                    let members = engine.bundles().get(name).unwrap_or_default();
                    println!("  {} ({})", name, members.join(", "));
                }
            }
        }
        Commands::Status => {
            println!("Module status");
            for module in engine.list_modules() {
                let marker = match module.status {
                    ModuleStatus::Active => "●",
                    ModuleStatus::Inactive => "○",
                };
                println!("{} {}: {}", marker, module.name, module.status);
            }
        }
        Commands::Generate => {
            run_generate(&engine)?;
            maybe_restart(&cli, &engine).await?;
        }
    }

    Ok(())
}

fn run_generate(engine: &LifecycleEngine) -> anyhow::Result<()> {
    let outputs = generate::generate_all(
        engine.root(),
        &engine.config().generate,
        &engine.list_modules(),
    )?;
    for out in &outputs {
        tracing::debug!(
            "{}: {} fragment(s) -> {}",
            out.name,
            out.sources.len(),
            out.output.display()
        );
    }
    Ok(())
}

async fn maybe_restart(cli: &Cli, engine: &LifecycleEngine) -> anyhow::Result<()> {
    if !cli.restart {
        return Ok(());
    }
    ComposeController::new(engine.root(), engine.runner())
        .restart()
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_and_flags() {
        let cli = Cli::try_parse_from(["suitectl", "i", "gateway", "--restart"]).unwrap();
        assert!(cli.restart);
        assert!(matches!(cli.command, Commands::Activate { ref module } if module == "gateway"));

        let cli = Cli::try_parse_from(["suitectl", "uninstall", "gateway", "--delete"]).unwrap();
        assert!(matches!(cli.command, Commands::Deactivate { delete: true, .. }));

        let cli = Cli::try_parse_from(["suitectl", "-v", "--root", "/srv/env", "g"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.root, Some(PathBuf::from("/srv/env")));
        assert!(matches!(cli.command, Commands::Generate));
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["suitectl"]).is_err());
    }

    #[test]
    fn test_resolve_explicit_root() {
        let root = resolve_root(Some(Path::new("/srv/env/./a/.."))).unwrap();
        assert_eq!(root, PathBuf::from("/srv/env"));
    }
}
