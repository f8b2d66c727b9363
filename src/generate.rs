//! `generate`: 모듈별 조각 파일을 모아 하나의 설정 파일로 합치기
//!
//! 각 `[[generate]]` 지시마다 모듈 디렉토리에서 `find` 후보 중 처음 존재하는 파일을
//! 골라(`{status}`는 `active`/`inactive`로 치환) 이름순으로 이어 붙입니다.

use anyhow::Context;
use std::path::{Path, PathBuf};

use crate::config::GenerateInstruction;
use crate::registry::{Module, ModuleStatus};

const STATUS_PLACEHOLDER: &str = "{status}";

/// 지시 하나의 처리 결과
#[derive(Debug, Clone)]
pub struct GeneratedOutput {
    pub name: String,
    pub output: PathBuf,
    pub sources: Vec<PathBuf>,
}

/// 후보 목록 중 모듈 디렉토리 안에 처음 존재하는 파일
pub fn existing_fragment(module_dir: &Path, candidates: &[String], status: ModuleStatus) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|c| module_dir.join(c.replace(STATUS_PLACEHOLDER, status.as_str())))
        .find(|p| p.is_file())
}

pub fn render(instruction: &GenerateInstruction, modules: &[Module]) -> anyhow::Result<(String, Vec<PathBuf>)> {
    let mut sorted: Vec<&Module> = modules.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let sources: Vec<PathBuf> = sorted
        .iter()
        .filter_map(|m| existing_fragment(&m.path, &instruction.find, m.status))
        .collect();

    let mut contents = Vec::with_capacity(sources.len());
    for file in &sources {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read fragment {}", file.display()))?;
        contents.push(content);
    }

    Ok((format!("\n{}\n", contents.join(instruction.separator.as_str())), sources))
}

/// 모든 지시를 처리하여 `<root>/<output>`에 기록
pub fn generate_all(
    root: &Path,
    instructions: &[GenerateInstruction],
    modules: &[Module],
) -> anyhow::Result<Vec<GeneratedOutput>> {
    if instructions.is_empty() {
        tracing::debug!("No generate instructions configured");
        return Ok(Vec::new());
    }

    tracing::info!("Generating dynamic configs...");
    let mut results = Vec::with_capacity(instructions.len());

    for instruction in instructions {
        tracing::info!("Processing instruction '{}'", instruction.name);
        let (content, sources) = render(instruction, modules)
            .with_context(|| format!("generate[{}]", instruction.name))?;
        tracing::debug!("{} found {} fragment(s)", instruction.name, sources.len());

        let output = root.join(&instruction.output);
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&output, content)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        tracing::info!("{} - written {}", instruction.name, instruction.output);

        results.push(GeneratedOutput {
            name: instruction.name.clone(),
            output,
            sources,
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModuleSource;
    use std::fs;

    fn module(root: &Path, name: &str, status: ModuleStatus) -> Module {
        let path = root.join("modules").join(name);
        fs::create_dir_all(&path).unwrap();
        Module {
            name: name.to_string(),
            path,
            source: ModuleSource::Internal,
            status,
        }
    }

    fn instruction(find: &[&str], separator: &str) -> GenerateInstruction {
        GenerateInstruction {
            name: "compose".into(),
            find: find.iter().map(|s| s.to_string()).collect(),
            output: "out/docker-compose.yml".into(),
            separator: separator.into(),
        }
    }

    #[test]
    fn test_status_substitution_picks_first_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let api = module(tmp.path(), "api", ModuleStatus::Active);
        fs::write(api.path.join("compose.active.yml"), "api-on").unwrap();
        fs::write(api.path.join("compose.yml"), "api-any").unwrap();

        let db = module(tmp.path(), "db", ModuleStatus::Inactive);
        fs::write(db.path.join("compose.active.yml"), "db-on").unwrap();
        fs::write(db.path.join("compose.yml"), "db-any").unwrap();

        let find = instruction(&["compose.{status}.yml", "compose.yml"], "\n");
        let (content, sources) = render(&find, &[db, api]).unwrap();

        assert_eq!(content, "\napi-on\ndb-any\n");
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn test_modules_without_fragment_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let a = module(tmp.path(), "a", ModuleStatus::Active);
        let b = module(tmp.path(), "b", ModuleStatus::Active);
        fs::write(a.path.join("routes.conf"), "a").unwrap();

        let (content, sources) = render(&instruction(&["routes.conf"], ",\n"), &[a, b]).unwrap();
        assert_eq!(content, "\na\n");
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn test_generate_all_writes_output() {
        let tmp = tempfile::tempdir().unwrap();
        let a = module(tmp.path(), "a", ModuleStatus::Active);
        let b = module(tmp.path(), "b", ModuleStatus::Inactive);
        fs::write(a.path.join("part.active"), "one").unwrap();
        fs::write(b.path.join("part.inactive"), "two").unwrap();

        let results =
            generate_all(tmp.path(), &[instruction(&["part.{status}"], " | ")], &[a, b]).unwrap();
        assert_eq!(results.len(), 1);

        let written = fs::read_to_string(tmp.path().join("out/docker-compose.yml")).unwrap();
        assert_eq!(written, "\none | two\n");
    }
}
