//! Handler Compiler - 정의 평탄화 및 키 파생
//!
//! 원시 명령어 정의 하나를 (키, 컴파일된 핸들러) 쌍의 집합으로 변환합니다.
//! 서브커맨드/서브커맨드 그룹/자동완성 옵션을 평면 엔트리로 펼칩니다.
//!
//! 구조가 잘못된 정의는 `Error::Compile`로 호출자에게 반환되며,
//! 배치 로딩이 해당 파일만 건너뛸 수 있게 합니다. 패닉 없음.

use crate::definition::{CommandDefinition, CommandKind, CommandOption, OptionKind, SetupFn};
use crate::envelope::{CompiledHandler, Envelope};
use crate::key::{build_key, HandlerKind, KEY_SEPARATOR};
use modbot_foundation::{Error, Result};
use std::sync::Arc;

/// 명령어 핸들러의 로그 네임스페이스
const NS_COMMANDS: &str = "commands";

/// 자동완성 핸들러의 로그 네임스페이스
const NS_AUTOCOMPLETE: &str = "autocomplete";

// ============================================================================
// compile - 정의 → (키, 핸들러) 쌍
// ============================================================================

/// 원시 명령어 정의를 레지스트리 엔트리로 컴파일
///
/// 같은 논리 경로가 한 배치에서 두 번 컴파일되면 스토어 삽입 시점에
/// 나중 것이 이깁니다 (last-write-wins) - 핫 리로드가 의존하는 메커니즘.
pub fn compile(definition: &CommandDefinition) -> Result<Vec<(String, CompiledHandler)>> {
    validate_segment(&definition.name, "command name")?;

    match definition.kind {
        CommandKind::User => compile_context(definition, HandlerKind::User),
        CommandKind::Message => compile_context(definition, HandlerKind::Message),
        CommandKind::Slash => compile_slash(definition),
    }
}

// ============================================================================
// 컨텍스트 명령어 (usr / msg)
// ============================================================================

fn compile_context(
    definition: &CommandDefinition,
    kind: HandlerKind,
) -> Result<Vec<(String, CompiledHandler)>> {
    if !definition.options.is_empty() {
        return Err(Error::compile(format!(
            "context command '{}' must not declare options",
            definition.name
        )));
    }

    let execute = definition.execute.clone().ok_or_else(|| {
        Error::compile(format!(
            "context command '{}' is missing an execute function",
            definition.name
        ))
    })?;

    let key = build_key(kind, &[&definition.name]);
    let handler = Envelope::wrap(&key, execute, definition.setup.clone(), NS_COMMANDS);
    Ok(vec![(key, handler)])
}

// ============================================================================
// 슬래시 명령어
// ============================================================================

fn compile_slash(definition: &CommandDefinition) -> Result<Vec<(String, CompiledHandler)>> {
    let nested = definition
        .options
        .iter()
        .any(|o| matches!(o.kind, OptionKind::SubCommand | OptionKind::SubCommandGroup));

    if nested {
        compile_nested(definition)
    } else {
        compile_flat(definition)
    }
}

/// 평면 슬래시 명령어: cmd:<name> + 옵션별 auto:<name>:<option>
fn compile_flat(definition: &CommandDefinition) -> Result<Vec<(String, CompiledHandler)>> {
    let execute = definition.execute.clone().ok_or_else(|| {
        Error::compile(format!(
            "command '{}' is missing an execute function",
            definition.name
        ))
    })?;

    let mut entries = Vec::new();
    let key = build_key(HandlerKind::Command, &[&definition.name]);
    entries.push((
        key.clone(),
        Envelope::wrap(&key, execute, definition.setup.clone(), NS_COMMANDS),
    ));

    compile_value_options(
        &[&definition.name],
        &definition.options,
        definition.setup.as_ref(),
        &mut entries,
    )?;

    Ok(entries)
}

/// 중첩 슬래시 명령어: 서브커맨드/그룹을 평면 엔트리로 펼침
fn compile_nested(definition: &CommandDefinition) -> Result<Vec<(String, CompiledHandler)>> {
    let mut entries = Vec::new();

    for option in &definition.options {
        match option.kind {
            OptionKind::SubCommand => {
                compile_subcommand(
                    &[&definition.name],
                    option,
                    definition.setup.as_ref(),
                    &mut entries,
                )?;
            }
            OptionKind::SubCommandGroup => {
                validate_segment(&option.name, "subcommand group name")?;
                for sub in &option.options {
                    if sub.kind != OptionKind::SubCommand {
                        return Err(Error::compile(format!(
                            "group '{}' of command '{}' may only contain subcommands",
                            option.name, definition.name
                        )));
                    }
                    compile_subcommand(
                        &[&definition.name, &option.name],
                        sub,
                        option.setup.as_ref().or(definition.setup.as_ref()),
                        &mut entries,
                    )?;
                }
            }
            OptionKind::Value => {
                return Err(Error::compile(format!(
                    "command '{}' mixes value options with subcommands",
                    definition.name
                )));
            }
        }
    }

    Ok(entries)
}

/// 서브커맨드 하나: cmd:<prefix>:<sub> + 값 옵션별 자동완성
fn compile_subcommand(
    prefix: &[&str],
    option: &CommandOption,
    parent_setup: Option<&SetupFn>,
    entries: &mut Vec<(String, CompiledHandler)>,
) -> Result<()> {
    validate_segment(&option.name, "subcommand name")?;

    let execute = option.execute.clone().ok_or_else(|| {
        Error::compile(format!(
            "subcommand '{}' is missing an execute function",
            option.name
        ))
    })?;

    let setup = option.setup.as_ref().or(parent_setup);

    let mut segments: Vec<&str> = prefix.to_vec();
    segments.push(&option.name);

    let key = build_key(HandlerKind::Command, &segments);
    entries.push((
        key.clone(),
        Envelope::wrap(&key, execute, setup.cloned(), NS_COMMANDS),
    ));

    compile_value_options(&segments, &option.options, setup, entries)
}

/// 값 옵션들의 자동완성 엔트리: auto:<prefix>:<option>
fn compile_value_options(
    prefix: &[&str],
    options: &[CommandOption],
    setup: Option<&SetupFn>,
    entries: &mut Vec<(String, CompiledHandler)>,
) -> Result<()> {
    for option in options {
        if option.kind != OptionKind::Value {
            return Err(Error::compile(format!(
                "option '{}' nests subcommands below a subcommand",
                option.name
            )));
        }
        validate_segment(&option.name, "option name")?;
        if !option.options.is_empty() {
            return Err(Error::compile(format!(
                "value option '{}' must not nest options",
                option.name
            )));
        }

        if let Some(autocomplete) = &option.autocomplete {
            let mut segments: Vec<&str> = prefix.to_vec();
            segments.push(&option.name);
            let key = build_key(HandlerKind::Autocomplete, &segments);
            entries.push((
                key.clone(),
                Envelope::wrap(
                    &key,
                    Arc::clone(autocomplete),
                    option.setup.as_ref().or(setup).cloned(),
                    NS_AUTOCOMPLETE,
                ),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// 검증
// ============================================================================

/// 키 세그먼트 검증 - 비어있지 않고 구분자를 포함하지 않아야 함
fn validate_segment(segment: &str, what: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::compile(format!("{} must not be empty", what)));
    }
    if segment.contains(KEY_SEPARATOR) {
        return Err(Error::compile(format!(
            "{} '{}' must not contain '{}'",
            what, segment, KEY_SEPARATOR
        )));
    }
    Ok(())
}
