//! 비밀값 수집 — `RLSECURE_*` 환경변수와 반복 CLI 인자
//!
//! 여기서 수집한 값은 [`SecretString`]으로만 보관되며, 엔진 인자로 변환될 때만
//! 원본이 노출됩니다. 인자 렌더링 시 마스킹은 scanner 크레이트의 runner가 담당합니다.

use std::path::PathBuf;

use crate::types::SecretString;

/// 볼트 키 환경변수
pub const ENV_VAULT_KEY: &str = "RLSECURE_VAULT_KEY";
/// 패키지 비밀번호 환경변수
pub const ENV_PACKAGE_PASSWORD: &str = "RLSECURE_PACKAGE_PASSWORD";
/// base64 인코딩된 비밀번호 목록 환경변수
pub const ENV_PACKAGE_ENCODED_LIST: &str = "RLSECURE_PACKAGE_ENCODED_LIST";
/// 비밀번호 목록 파일 경로 환경변수
pub const ENV_PASSWORD_LIST: &str = "RLSECURE_PASSWORD_LIST";

/// 설치 시 전달되는 (엔진 인자명, 환경변수) 목록
const INSTALL_ARGS: &[(&str, &str)] = &[
    ("encoded-key", "RLSECURE_ENCODED_LICENSE"),
    ("site-key", "RLSECURE_SITE_KEY"),
    ("proxy-server", "RLSECURE_PROXY_SERVER"),
    ("proxy-port", "RLSECURE_PROXY_PORT"),
    ("proxy-user", "RLSECURE_PROXY_USER"),
    ("proxy-password", "RLSECURE_PROXY_PASSWORD"),
];

/// 프로세스 환경변수 조회
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// 환경변수에서 볼트 키를 읽습니다. 빈 값은 없는 것으로 취급합니다.
pub fn vault_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<SecretString> {
    lookup(ENV_VAULT_KEY)
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

/// 패키지 압축 해제용 비밀번호 세 종류
///
/// 환경변수 값이 먼저, CLI 인자가 그 뒤에 붙습니다.
#[derive(Debug, Clone, Default)]
pub struct PackagePasswords {
    /// 평문 비밀번호
    pub passwords: Vec<SecretString>,
    /// base64 인코딩된 비밀번호 목록
    pub encoded_lists: Vec<SecretString>,
    /// 비밀번호 목록 파일 경로
    pub password_lists: Vec<PathBuf>,
}

impl PackagePasswords {
    /// 환경변수와 CLI 인자를 병합합니다.
    pub fn collect(
        lookup: impl Fn(&str) -> Option<String>,
        passwords: Vec<String>,
        encoded_lists: Vec<String>,
        password_lists: Vec<PathBuf>,
    ) -> Self {
        let mut merged = Self::default();

        if let Some(v) = lookup(ENV_PACKAGE_PASSWORD).filter(|v| !v.is_empty()) {
            merged.passwords.push(SecretString::from(v));
        }
        if let Some(v) = lookup(ENV_PACKAGE_ENCODED_LIST).filter(|v| !v.is_empty()) {
            merged.encoded_lists.push(SecretString::from(v));
        }
        if let Some(v) = lookup(ENV_PASSWORD_LIST).filter(|v| !v.is_empty()) {
            merged.password_lists.push(PathBuf::from(v));
        }

        merged
            .passwords
            .extend(passwords.into_iter().map(SecretString::from));
        merged
            .encoded_lists
            .extend(encoded_lists.into_iter().map(SecretString::from));
        merged.password_lists.extend(password_lists);
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty() && self.encoded_lists.is_empty() && self.password_lists.is_empty()
    }

    /// scan 명령 인자로 변환합니다.
    pub fn engine_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(
            self.passwords.len() + self.encoded_lists.len() + self.password_lists.len(),
        );
        args.extend(
            self.passwords
                .iter()
                .map(|p| format!("--password={}", p.expose())),
        );
        args.extend(
            self.password_lists
                .iter()
                .map(|p| format!("--password-list={}", p.display())),
        );
        args.extend(
            self.encoded_lists
                .iter()
                .map(|p| format!("--encoded-list={}", p.expose())),
        );
        args
    }
}

/// 엔진 설치 시 필요한 라이선스/프록시 자격 증명
#[derive(Debug, Clone, Default)]
pub struct InstallCredentials {
    entries: Vec<(&'static str, SecretString)>,
}

impl InstallCredentials {
    /// 설정된 환경변수만 수집합니다.
    pub fn collect(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let entries = INSTALL_ARGS
            .iter()
            .filter_map(|(arg, env)| lookup(env).map(|v| (*arg, SecretString::from(v))))
            .collect();
        Self { entries }
    }

    /// `--<arg>=<value>` 형식의 install 인자
    pub fn engine_args(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(arg, value)| format!("--{arg}={}", value.expose()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn passwords_empty_by_default() {
        let p = PackagePasswords::collect(lookup_from(&[]), vec![], vec![], vec![]);
        assert!(p.is_empty());
        assert!(p.engine_args().is_empty());
    }

    #[test]
    fn env_passwords_come_before_flags() {
        let lookup = lookup_from(&[
            (ENV_PACKAGE_PASSWORD, "from-env"),
            (ENV_PACKAGE_ENCODED_LIST, "ZW52"),
            (ENV_PASSWORD_LIST, "/env/list.txt"),
        ]);
        let p = PackagePasswords::collect(
            lookup,
            vec!["flag-1".to_owned(), "flag-2".to_owned()],
            vec!["ZmxhZw==".to_owned()],
            vec![PathBuf::from("/flag/list.txt")],
        );
        assert!(!p.is_empty());
        assert_eq!(
            p.engine_args(),
            vec![
                "--password=from-env",
                "--password=flag-1",
                "--password=flag-2",
                "--password-list=/env/list.txt",
                "--password-list=/flag/list.txt",
                "--encoded-list=ZW52",
                "--encoded-list=ZmxhZw==",
            ]
        );
    }

    #[test]
    fn only_password_list_is_not_empty() {
        let p = PackagePasswords::collect(
            lookup_from(&[]),
            vec![],
            vec![],
            vec![PathBuf::from("/x")],
        );
        assert!(!p.is_empty());
    }

    #[test]
    fn debug_output_hides_passwords() {
        let p = PackagePasswords::collect(lookup_from(&[]), vec!["s3cret".to_owned()], vec![], vec![]);
        assert!(!format!("{p:?}").contains("s3cret"));
    }

    #[test]
    fn install_credentials_only_for_present_vars() {
        let creds = InstallCredentials::collect(lookup_from(&[
            ("RLSECURE_SITE_KEY", "site"),
            ("RLSECURE_PROXY_PORT", "3128"),
        ]));
        assert_eq!(
            creds.engine_args(),
            vec!["--site-key=site", "--proxy-port=3128"]
        );
        assert!(InstallCredentials::collect(lookup_from(&[])).engine_args().is_empty());
    }

    #[test]
    fn empty_vault_key_env_is_ignored() {
        assert!(vault_key_from(lookup_from(&[(ENV_VAULT_KEY, "")])).is_none());
        let key = vault_key_from(lookup_from(&[(ENV_VAULT_KEY, "k")])).unwrap();
        assert_eq!(key.expose(), "k");
    }

    #[test]
    #[serial]
    fn env_lookup_reads_process_environment() {
        // SAFETY: #[serial]로 환경변수를 조작하는 테스트끼리 동시에 실행되지 않습니다.
        unsafe { std::env::set_var(ENV_VAULT_KEY, "process-key") };
        let key = vault_key_from(env_lookup);
        unsafe { std::env::remove_var(ENV_VAULT_KEY) };
        assert_eq!(key.map(|k| k.expose().to_owned()).as_deref(), Some("process-key"));
    }
}
