//! Request validation.
//!
//! Turns raw multipart fields plus the `Authorization` header into an
//! [`AnalysisRequest`], or rejects the request before anything touches the
//! disk.

use crate::error::{ErrorKind, Result};
use axum::http::HeaderValue;
use bytes::Bytes;
use sonargate_scanner::{Credential, Project};

const BEARER_PREFIX: &str = "bearer ";

/// Multipart fields as received, before any validation.
#[derive(Debug, Default)]
pub struct RawFields {
    pub repo_zip: Option<Bytes>,
    pub project_key: Option<String>,
    pub organization: Option<String>,
    pub branch: Option<String>,
}

/// A validated analysis request.
#[derive(Debug)]
pub struct AnalysisRequest {
    pub archive: Bytes,
    pub project: Project,
    pub credential: Credential,
}

impl AnalysisRequest {
    /// Validate raw fields and the authorization header.
    ///
    /// Presence is checked first, so a request missing both a field and a
    /// valid scheme reports the missing field.
    pub fn validate(fields: RawFields, authorization: Option<&HeaderValue>, default_branch: &str) -> Result<Self> {
        let archive = fields.repo_zip.filter(|bytes| !bytes.is_empty());
        let project_key = non_empty(fields.project_key);
        let organization = non_empty(fields.organization);
        let (Some(archive), Some(project_key), Some(organization), Some(authorization)) =
            (archive, project_key, organization, authorization)
        else {
            exn::bail!(ErrorKind::MissingParameters);
        };
        let credential = parse_bearer(authorization)?;
        let branch = non_empty(fields.branch).unwrap_or_else(|| default_branch.to_string());
        Ok(Self {
            archive,
            project: Project { key: project_key, organization, branch },
            credential,
        })
    }
}

/// Extract the token from `Bearer <token>`; the scheme is case-insensitive and
/// surrounding whitespace around the token is ignored.
pub fn parse_bearer(header: &HeaderValue) -> Result<Credential> {
    let Ok(value) = header.to_str() else {
        exn::bail!(ErrorKind::InvalidAuthorization);
    };
    let token = value
        .get(..BEARER_PREFIX.len())
        .filter(|scheme| scheme.eq_ignore_ascii_case(BEARER_PREFIX))
        .map(|_| value[BEARER_PREFIX.len()..].trim());
    match token {
        Some(token) if !token.is_empty() => Ok(Credential::new(token)),
        _ => exn::bail!(ErrorKind::InvalidAuthorization),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn fields() -> RawFields {
        RawFields {
            repo_zip: Some(Bytes::from_static(b"PK\x03\x04")),
            project_key: Some("acme_widgets".to_string()),
            organization: Some("acme".to_string()),
            branch: None,
        }
    }

    fn bearer() -> HeaderValue {
        HeaderValue::from_static("Bearer squ_token")
    }

    #[test]
    fn test_valid_request_defaults_branch() {
        let request = AnalysisRequest::validate(fields(), Some(&bearer()), "main").unwrap();
        assert_eq!(request.project.key, "acme_widgets");
        assert_eq!(request.project.organization, "acme");
        assert_eq!(request.project.branch, "main");
        assert_eq!(request.credential.expose(), "squ_token");
        assert_eq!(request.archive.as_ref(), b"PK\x03\x04");
    }

    #[rstest]
    #[case(Some("develop"), "develop")]
    #[case(Some(""), "main")]
    #[case(None, "main")]
    fn test_branch(#[case] branch: Option<&str>, #[case] expected: &str) {
        let mut raw = fields();
        raw.branch = branch.map(str::to_string);
        let request = AnalysisRequest::validate(raw, Some(&bearer()), "main").unwrap();
        assert_eq!(request.project.branch, expected);
    }

    #[rstest]
    #[case(|f: &mut RawFields| f.repo_zip = None)]
    #[case(|f: &mut RawFields| f.repo_zip = Some(Bytes::new()))]
    #[case(|f: &mut RawFields| f.project_key = None)]
    #[case(|f: &mut RawFields| f.project_key = Some(String::new()))]
    #[case(|f: &mut RawFields| f.organization = None)]
    #[case(|f: &mut RawFields| f.organization = Some("  ".to_string()))]
    fn test_missing_fields(#[case] mutate: fn(&mut RawFields)) {
        let mut raw = fields();
        mutate(&mut raw);
        let err = AnalysisRequest::validate(raw, Some(&bearer()), "main").unwrap_err();
        assert!(matches!(*err, ErrorKind::MissingParameters));
    }

    #[test]
    fn test_missing_authorization() {
        let err = AnalysisRequest::validate(fields(), None, "main").unwrap_err();
        assert!(matches!(*err, ErrorKind::MissingParameters));
    }

    #[test]
    fn test_missing_field_wins_over_bad_scheme() {
        let mut raw = fields();
        raw.project_key = None;
        let header = HeaderValue::from_static("Basic dXNlcjpwYXNz");
        let err = AnalysisRequest::validate(raw, Some(&header), "main").unwrap_err();
        assert!(matches!(*err, ErrorKind::MissingParameters));
    }

    #[rstest]
    #[case("Bearer abc", "abc")]
    #[case("bearer abc", "abc")]
    #[case("BEARER abc", "abc")]
    #[case("bEaReR   abc  ", "abc")]
    fn test_parse_bearer(#[case] header: &'static str, #[case] expected: &str) {
        let credential = parse_bearer(&HeaderValue::from_static(header)).unwrap();
        assert_eq!(credential.expose(), expected);
    }

    #[rstest]
    #[case("Basic dXNlcjpwYXNz")]
    #[case("Token abc")]
    #[case("Bearer")]
    #[case("Bearer ")]
    #[case("Bearer    ")]
    #[case("Bearerabc")]
    #[case("abc")]
    #[case("")]
    fn test_parse_bearer_rejects(#[case] header: &'static str) {
        let err = parse_bearer(&HeaderValue::from_static(header)).unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidAuthorization));
    }

    #[test]
    fn test_parse_bearer_rejects_non_utf8() {
        let header = HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap();
        let err = parse_bearer(&header).unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidAuthorization));
    }
}
