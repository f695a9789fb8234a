use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a remote entry.
///
/// An empty id denotes an entry that was staged but never stored.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct IdBuf {
    inner: String,
}

impl IdBuf {
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn into_string(self) -> String {
        self.inner
    }

    pub fn is_staged(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<String> for IdBuf {
    fn from(value: String) -> Self {
        IdBuf { inner: value }
    }
}

impl From<&str> for IdBuf {
    fn from(value: &str) -> Self {
        IdBuf {
            inner: value.to_string(),
        }
    }
}

impl AsRef<str> for IdBuf {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Debug for IdBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdBuf(")?;
        fmt::Debug::fmt(&self.inner, f)?;
        f.write_str(")")
    }
}

impl fmt::Display for IdBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

#[test]
fn test_staged_id() {
    assert!(IdBuf::default().is_staged());
    assert!(!IdBuf::from("1a2b3c").is_staged());
    assert_eq!(format!("{:?}", IdBuf::from("root")), r#"IdBuf("root")"#);
}
