use serde::{Deserialize, Serialize};
use std::fmt;

// Remote identifiers are opaque strings. Each kind gets its own wrapper so an
// assistant id can never be passed where a thread id is expected.
macro_rules! remote_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

remote_id!(
    /// Identifier of a remote assistant (`asst_...`)
    AssistantId
);

remote_id!(
    /// Identifier of a remote conversation thread (`thread_...`)
    ThreadId
);

remote_id!(
    /// Identifier of an uploaded file (`file-...`)
    FileId
);

remote_id!(
    /// Identifier of a single run of an assistant against a thread (`run_...`)
    RunId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_raw_id() {
        let id = ThreadId::new("thread_abc");
        assert_eq!(id.to_string(), "thread_abc");
        assert_eq!(id.as_str(), "thread_abc");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = FileId::new("file-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"file-123\"");

        let back: FileId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
