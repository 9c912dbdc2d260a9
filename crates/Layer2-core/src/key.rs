//! Key Builder - 핸들러 키 생성
//!
//! 중첩된 핸들러 정의의 경로 세그먼트를 하나의 정규화된 문자열 키로 합칩니다.
//! 세그먼트에 구분자가 들어갈 수 없으므로 (kind, segments) 튜플에 대해 단사입니다.

use std::fmt;

/// 키 세그먼트 구분자 - 세그먼트 내부에서는 금지됨 (compiler가 검증)
pub const KEY_SEPARATOR: char = ':';

// ============================================================================
// HandlerKind - 키 접두 태그
// ============================================================================

/// 핸들러 종류 (키의 접두 태그)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// 슬래시 명령어
    Command,

    /// 자동완성 핸들러
    Autocomplete,

    /// 유저 컨텍스트 명령어
    User,

    /// 메시지 컨텍스트 명령어
    Message,
}

impl HandlerKind {
    /// 키 접두 태그
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Command => "cmd",
            Self::Autocomplete => "auto",
            Self::User => "usr",
            Self::Message => "msg",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

// ============================================================================
// build_key - 키 생성
// ============================================================================

/// (kind, segments)를 정규화된 키로 합침
///
/// 순수 함수. 세그먼트는 호출자가 비어있지 않고 구분자를 포함하지 않음을
/// 보장해야 합니다.
pub fn build_key(kind: HandlerKind, segments: &[&str]) -> String {
    let mut key = String::from(kind.tag());
    for segment in segments {
        key.push(KEY_SEPARATOR);
        key.push_str(segment);
    }
    key
}
