//! Process exit codes for errors that escape a command.

use rtpack_core::config::ConfigError;
use rtpack_core::hooks::HookError;
use rtpack_core::integrity::IntegrityError;
use rtpack_core::io::{ExtractError, FetchError};
use rtpack_core::packager::PackagerError;
use rtpack_core::pipeline::ErrorKind;
use rtpack_core::{BuildError, ResolveError};
use rtpack_schema::UnsupportedPlatform;

/// Classify `err` by the first typed error in its chain.
pub fn kind_of(err: &anyhow::Error) -> ErrorKind {
    err.chain().find_map(classify).unwrap_or(ErrorKind::Other)
}

pub fn code_for(err: &anyhow::Error) -> i32 {
    kind_of(err).exit_code()
}

fn classify(cause: &(dyn std::error::Error + 'static)) -> Option<ErrorKind> {
    if let Some(e) = cause.downcast_ref::<BuildError>() {
        return Some(e.kind());
    }
    if let Some(e) = cause.downcast_ref::<ResolveError>() {
        return Some(match e {
            ResolveError::UnsupportedPlatform(_) => ErrorKind::Usage,
            _ => ErrorKind::Upstream,
        });
    }
    if cause.is::<UnsupportedPlatform>() || cause.is::<ConfigError>() {
        return Some(ErrorKind::Usage);
    }
    if let Some(e) = cause.downcast_ref::<FetchError>() {
        return Some(match e {
            FetchError::Cancelled { .. } => ErrorKind::Cancelled,
            _ => ErrorKind::Transfer,
        });
    }
    if let Some(e) = cause.downcast_ref::<ExtractError>() {
        return Some(match e {
            ExtractError::Cancelled { .. } => ErrorKind::Cancelled,
            _ => ErrorKind::Transfer,
        });
    }
    if cause.is::<IntegrityError>() {
        return Some(ErrorKind::Integrity);
    }
    if cause.is::<PackagerError>() || cause.is::<HookError>() {
        return Some(ErrorKind::Tool);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn unsupported_platform_is_usage() {
        let err: anyhow::Error = UnsupportedPlatform::new("solaris-sparc").into();
        assert_eq!(code_for(&err), 2);
    }

    #[test]
    fn context_does_not_hide_the_cause() {
        let result: Result<(), ResolveError> = Err(ResolveError::ManifestUnavailable {
            url: "http://x/justj.manifest".to_string(),
            reason: "HTTP 503".to_string(),
        });
        let err = result.context("resolving linux-x64").unwrap_err();
        assert_eq!(code_for(&err), 3);
    }

    #[test]
    fn integrity_errors_exit_5() {
        let err: anyhow::Error = IntegrityError::SigningKey("bad passphrase".to_string()).into();
        assert_eq!(code_for(&err), 5);
    }

    #[test]
    fn signature_failures_are_integrity_errors() {
        let err: anyhow::Error = IntegrityError::Signature("unsupported algorithm".to_string()).into();
        assert_eq!(code_for(&err), 5);
        assert!(err.to_string().starts_with("failed to create signature"));
    }

    #[test]
    fn untyped_errors_exit_1() {
        assert_eq!(code_for(&anyhow::anyhow!("boom")), 1);
    }
}
