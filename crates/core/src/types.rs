//! 도메인 타입 — 패키지 참조, 리포트 형식, 비밀값, 스캔 대상

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

/// 엔진이 생성할 수 있는 리포트 형식
pub const REPORT_FORMATS: &[&str] = &[
    "cyclonedx",
    "sarif",
    "spdx",
    "rl-checks",
    "rl-cve",
    "rl-json",
    "rl-summary-pdf",
    "rl-uri",
];

/// rl-safe 아카이브(pack)가 지원하는 리포트 형식
pub const PACK_FORMATS: &[&str] = &["cyclonedx", "sarif", "spdx", "rl-cve", "rl-uri", "all"];

/// 모든 리포트 형식을 뜻하는 선택자
pub const ALL_FORMATS: &str = "all";

/// 로그와 에러 메시지에 노출되면 안 되는 문자열
///
/// `Debug`는 항상 마스킹되며 `Display`는 구현하지 않습니다.
/// 원본 값은 [`SecretString::expose`]로만 꺼낼 수 있습니다.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 원본 값을 반환합니다. 외부 엔진 인자 구성에만 사용합니다.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// 분석 대상 패키지 참조 (`pkg:` PURL 또는 URL 형태)
///
/// 쿼리 파라미터 `build=repro`가 있으면 재현 빌드 검증 모드로 동작합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRef(String);

impl PackageRef {
    /// 문자열에서 패키지 참조를 파싱합니다.
    pub fn parse(raw: &str) -> Result<Self, ParameterError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParameterError::invalid("--purl", "must not be empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ParameterError::invalid(
                "--purl",
                "must not contain whitespace",
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 주어진 키의 쿼리 값들을 반환합니다. 빈 값은 건너뜁니다.
    pub fn query_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let (_, query, _) = split_reference(&self.0);
        query
            .unwrap_or_default()
            .split(['&', ';'])
            .filter_map(|pair| pair.split_once('='))
            .filter(move |(k, v)| *k == key && !v.is_empty())
            .map(|(_, v)| v)
    }

    /// `build=repro` 쿼리 파라미터가 있는지 확인합니다.
    pub fn is_reproducible_build(&self) -> bool {
        self.query_values("build").any(|v| v == "repro")
    }

    /// `build` 쿼리 파라미터를 제거한 기준 참조를 반환합니다.
    ///
    /// 다른 쿼리 파라미터와 `#` 이후 부분은 그대로 유지됩니다.
    pub fn without_build_param(&self) -> Self {
        let (base, query, fragment) = split_reference(&self.0);
        let remaining: Vec<&str> = query
            .unwrap_or_default()
            .split(['&', ';'])
            .filter(|pair| !pair.is_empty())
            .filter(|pair| pair.split('=').next() != Some("build"))
            .collect();

        let mut out = base.to_owned();
        if !remaining.is_empty() {
            out.push('?');
            out.push_str(&remaining.join("&"));
        }
        if let Some(fragment) = fragment {
            out.push('#');
            out.push_str(fragment);
        }
        Self(out)
    }

    /// 소스 이름으로 기본 참조를 만듭니다 (`rl-scanner/<name>@latest`).
    pub fn derived_from_source(source_name: &str) -> Self {
        let sanitized: String = source_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        let name = if sanitized.is_empty() {
            "package".to_owned()
        } else {
            sanitized
        };
        Self(format!("rl-scanner/{name}@latest"))
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 참조를 (base, query, fragment)로 분리합니다.
fn split_reference(raw: &str) -> (&str, Option<&str>, Option<&str>) {
    let (rest, fragment) = match raw.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (raw, None),
    };
    match rest.split_once('?') {
        Some((base, query)) => (base, Some(query), fragment),
        None => (rest, None, fragment),
    }
}

/// 요청된 리포트 형식 목록 (쉼표 구분)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFormats(Vec<String>);

impl ReportFormats {
    /// 쉼표 구분 목록을 파싱하고 허용 목록으로 검증합니다.
    pub fn parse(selector: &str) -> Result<Self, ParameterError> {
        let formats: Vec<String> = selector
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();

        if formats.is_empty() {
            return Err(ParameterError::invalid(
                "--report-format",
                "at least one report format is required",
            ));
        }

        for format in &formats {
            if format != ALL_FORMATS && !REPORT_FORMATS.contains(&format.as_str()) {
                return Err(ParameterError::invalid(
                    "--report-format",
                    format!(
                        "unsupported format '{format}' (supported: {}, {ALL_FORMATS})",
                        REPORT_FORMATS.join(", ")
                    ),
                ));
            }
        }

        Ok(Self(formats))
    }

    /// 모든 형식 선택
    pub fn all() -> Self {
        Self(vec![ALL_FORMATS.to_owned()])
    }

    /// 엔진에 전달할 쉼표 구분 선택자
    pub fn selector(&self) -> String {
        self.0.join(",")
    }

    /// pack 단계에서 지원되는 형식만 남깁니다. 지원되지 않는 형식은 조용히 버립니다.
    pub fn pack_subset(&self) -> Option<Self> {
        let kept: Vec<String> = self
            .0
            .iter()
            .filter(|f| PACK_FORMATS.contains(&f.as_str()))
            .cloned()
            .collect();
        if kept.is_empty() { None } else { Some(Self(kept)) }
    }
}

impl Default for ReportFormats {
    fn default() -> Self {
        Self::all()
    }
}

/// 원격 다운로드 인증 정보
#[derive(Debug, Clone, Default)]
pub struct RemoteAuth {
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub bearer_token: Option<SecretString>,
}

impl RemoteAuth {
    /// bearer 토큰과 basic 인증은 함께 쓸 수 없습니다.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.bearer_token.is_some() && (self.user.is_some() || self.password.is_some()) {
            return Err(ParameterError::invalid(
                "--bearer-token",
                "cannot be used in combination with --auth-user or --auth-pass",
            ));
        }
        Ok(())
    }

    /// 엔진 인자로 변환합니다.
    pub fn engine_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(user) = &self.user {
            args.push(format!("--auth-user={user}"));
        }
        if let Some(password) = &self.password {
            args.push(format!("--auth-pass={}", password.expose()));
        }
        if let Some(token) = &self.bearer_token {
            args.push(format!("--bearer-token={}", token.expose()));
        }
        args
    }
}

/// 스캔 대상 패키지의 출처
#[derive(Debug, Clone)]
pub enum PackageSource {
    /// 로컬 파일
    LocalFile(PathBuf),
    /// http(s) URL
    Url { url: String, auth: RemoteAuth },
    /// 레지스트리 PURL
    Purl { purl: String, auth: RemoteAuth },
    /// 컨테이너 이미지 (`pkg:docker/...`)
    Docker { image: String, auth: RemoteAuth },
}

/// `--import-purl`에 허용되는 PURL 접두사
pub const IMPORT_PURL_PREFIXES: &[&str] =
    &["pkg:npm/", "pkg:pypi/", "pkg:gem/", "pkg:nuget/", "pkg:vsx/"];

/// `--import-docker`에 허용되는 접두사
pub const IMPORT_DOCKER_PREFIXES: &[&str] = &["pkg:docker/"];

impl PackageSource {
    /// URL 소스를 검증하여 생성합니다.
    pub fn url(url: &str, auth: RemoteAuth) -> Result<Self, ParameterError> {
        if !url.contains("://") {
            return Err(ParameterError::invalid(
                "--import-url",
                "needs to be a url <proto>://<host>[:<port>]/<path>",
            ));
        }
        let lower = url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(ParameterError::invalid(
                "--import-url",
                "'<proto>://' must be http or https",
            ));
        }
        auth.validate()?;
        Ok(Self::Url {
            url: url.to_owned(),
            auth,
        })
    }

    /// PURL 소스를 검증하여 생성합니다.
    pub fn purl(purl: &str, auth: RemoteAuth) -> Result<Self, ParameterError> {
        check_prefix("--import-purl", purl, IMPORT_PURL_PREFIXES)?;
        auth.validate()?;
        Ok(Self::Purl {
            purl: purl.to_owned(),
            auth,
        })
    }

    /// 컨테이너 이미지 소스를 검증하여 생성합니다.
    pub fn docker(image: &str, auth: RemoteAuth) -> Result<Self, ParameterError> {
        check_prefix("--import-docker", image, IMPORT_DOCKER_PREFIXES)?;
        auth.validate()?;
        Ok(Self::Docker {
            image: image.to_owned(),
            auth,
        })
    }

    /// 기본 패키지 참조를 만들 때 쓰는 이름
    pub fn name(&self) -> String {
        let last_segment = |s: &str| {
            let without_query = s.split(['?', '#']).next().unwrap_or(s);
            without_query
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(without_query)
                .split('@')
                .next()
                .unwrap_or_default()
                .to_owned()
        };
        match self {
            Self::LocalFile(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Self::Url { url, .. } => last_segment(url),
            Self::Purl { purl, .. } => last_segment(purl),
            Self::Docker { image, .. } => last_segment(image),
        }
    }

    /// 엔진 scan 명령에 넘길 소스 인자
    pub fn engine_args(&self) -> Vec<String> {
        match self {
            Self::LocalFile(path) => vec![format!("--file-path={}", path.display())],
            Self::Url {
                url: reference,
                auth,
            }
            | Self::Purl {
                purl: reference,
                auth,
            }
            | Self::Docker {
                image: reference,
                auth,
            } => {
                let mut args = vec![format!("--import={reference}")];
                args.extend(auth.engine_args());
                args
            }
        }
    }
}

fn check_prefix(field: &str, value: &str, prefixes: &[&str]) -> Result<(), ParameterError> {
    let lower = value.to_lowercase();
    if prefixes.iter().any(|p| lower.starts_with(p)) {
        Ok(())
    } else {
        Err(ParameterError::invalid(
            field,
            format!("currently supports only one of: {}", prefixes.join(", ")),
        ))
    }
}
