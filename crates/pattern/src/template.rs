//! 템플릿 생성 -- 원시 라인을 정규화된 단어 시퀀스와 지문으로 변환합니다.
//!
//! # 처리 순서
//! 1. 따옴표 구간(`'...'`, `"..."`)과 괄호 구간(`[]`, `()`, `{}`)을 통째로 제거
//! 2. 공백 기준으로 후보 단어 분리
//! 3. 후보마다 끝의 `= : ] , ;` 제거, 2자 미만 / 16진수(4자 이상) / UUID 제거,
//!    ASCII 숫자 제거 후 "단어" 조건을 만족하는 것만 유지
//! 4. 남은 단어를 공백 하나로 이어 템플릿 문자열 생성
//! 5. 템플릿 문자열의 xxh3-128 해시가 지문
//!
//! ```
//! use logsieve_pattern::template::Template;
//!
//! let a = Template::of("ERROR connection refused from 10.0.0.1");
//! let b = Template::of("ERROR connection refused from 10.0.0.2");
//! assert_eq!(a.as_str(), "ERROR connection refused from");
//! assert_eq!(a.fingerprint(), b.fingerprint());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_128;

use crate::error::PatternError;

/// 유지할 단어의 최소 길이 (바이트)
const MIN_WORD_LEN: usize = 2;

/// 16진수 토큰으로 간주하는 최소 길이
const MIN_HEX_LEN: usize = 4;

/// 후보 단어 끝에서 잘라내는 문자
const TRAILING_PUNCT: &[char] = &['=', ':', ']', ',', ';'];

/// 템플릿 문자열의 128비트 지문
///
/// 32자리 소문자 16진수로 표시/직렬화됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// 템플릿 문자열의 지문을 계산합니다.
    pub fn of(text: &str) -> Self {
        Self(xxh3_128(text.as_bytes()))
    }

    /// 원시 128비트 값
    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl From<u128> for Fingerprint {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PatternError::InvalidFingerprint {
            value: s.to_owned(),
            reason: reason.to_owned(),
        };
        if s.len() != 32 {
            return Err(invalid("expected 32 hex characters"));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid("contains non-hex characters"));
        }
        u128::from_str_radix(s, 16)
            .map(Self)
            .map_err(|e| invalid(&e.to_string()))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_string()
    }
}

/// 정규화된 메시지 템플릿
///
/// 단어 시퀀스, 템플릿 문자열, 지문을 함께 보관합니다.
/// 레코드마다 새로 만들어지며 생성 후에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    words: Vec<String>,
    text: String,
    fingerprint: Fingerprint,
}

impl Template {
    /// 원시 라인에서 템플릿을 생성합니다.
    ///
    /// 모든 입력(빈 문자열, 비 ASCII 포함)에 대해 실패하지 않습니다.
    pub fn of(line: &str) -> Self {
        let stripped = strip_variable_spans(line);
        let words: Vec<String> = stripped.split_whitespace().filter_map(stable_word).collect();
        let text = words.join(" ");
        let fingerprint = Fingerprint::of(&text);
        Self {
            words,
            text,
            fingerprint,
        }
    }

    /// 단어 시퀀스
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// 템플릿 문자열 (단어를 공백 하나로 연결)
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// 지문
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// 단어 수
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// 안정적인 단어가 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// 약한 동등성 -- 단어 수가 같고 다른 단어가 최대 하나인지 확인합니다.
    ///
    /// 추이적이지 않은 근사 관계입니다.
    pub fn weak_equal(&self, other: &Template) -> bool {
        if self.words.len() != other.words.len() {
            return false;
        }
        let matches = self
            .words
            .iter()
            .zip(&other.words)
            .filter(|(a, b)| a == b)
            .count();
        matches + 1 >= self.words.len()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// `Template::of`의 함수형 별칭
pub fn template_of(line: &str) -> Template {
    Template::of(line)
}

/// `a.weak_equal(b)`의 함수형 별칭
pub fn weak_equal(a: &Template, b: &Template) -> bool {
    a.weak_equal(b)
}

/// 후보 단어 하나를 정규화합니다. 버려야 하면 `None`.
fn stable_word(raw: &str) -> Option<String> {
    let word = raw.trim_end_matches(TRAILING_PUNCT);
    if word.len() < MIN_WORD_LEN || is_hex_token(word) || is_uuid(word) {
        return None;
    }
    let word: String = word.chars().filter(|c| !c.is_ascii_digit()).collect();
    is_word(&word).then_some(word)
}

fn is_hex_token(s: &str) -> bool {
    s.len() >= MIN_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// 8-4-4-4-12 형식의 UUID인지 확인합니다.
fn is_uuid(s: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let mut parts = s.split('-');
    for expected in GROUPS {
        match parts.next() {
            Some(part) if part.len() == expected && part.bytes().all(|b| b.is_ascii_hexdigit()) => {}
            _ => return false,
        }
    }
    parts.next().is_none()
}

/// 첫/끝 글자는 ASCII 영문자, 중간 글자는 영문자 또는 `. _ -`.
fn is_word(s: &str) -> bool {
    let bytes = s.as_bytes();
    let [first, middle @ .., last] = bytes else {
        return false;
    };
    first.is_ascii_alphabetic()
        && last.is_ascii_alphabetic()
        && middle
            .iter()
            .all(|b| b.is_ascii_alphabetic() || matches!(b, b'.' | b'_' | b'-'))
}

/// 따옴표 구간과 균형 잡힌 괄호 구간을 내용째 제거합니다.
///
/// 따옴표는 바로 앞 바이트가 `\`가 아니고 괄호 스택이 비어 있을 때만 열리고 닫힙니다.
/// 여는 괄호는 따옴표 밖에서만 스택에 쌓입니다.
fn strip_variable_spans(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut stack: Vec<char> = Vec::new();

    for (i, c) in line.char_indices() {
        match c {
            '[' | '(' | '{' => {
                if quote.is_none() {
                    stack.push(c);
                }
            }
            ']' | ')' | '}' => {
                let open = match c {
                    ']' => '[',
                    ')' => '(',
                    _ => '{',
                };
                if stack.last() == Some(&open) {
                    stack.pop();
                    continue;
                }
            }
            '"' | '\'' => {
                let escaped = i > 0 && bytes[i - 1] == b'\\';
                if !escaped && stack.is_empty() {
                    match quote {
                        None => quote = Some(c),
                        Some(q) if q == c => {
                            quote = None;
                            continue;
                        }
                        Some(_) => {}
                    }
                }
            }
            _ => {}
        }
        if quote.is_some() || !stack.is_empty() {
            continue;
        }
        out.push(c);
    }
    out
}
