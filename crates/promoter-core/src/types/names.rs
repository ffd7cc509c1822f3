//! Primitive semantic names used to describe registry state

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new value from anything string-like
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the underlying string
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the value is the empty string
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_name!(
    /// The leading part of an image reference that includes the domain, i.e.
    /// everything that is not the image name itself (e.g. "gcr.io/google-containers")
    RegistryName
);

string_name!(
    /// Image path inside a registry, without the registry prefix
    /// (e.g. "addon-builder" or "foo/bar/baz")
    ImageName
);

string_name!(
    /// Content hash of an image (e.g. "sha256:0123...")
    Digest
);

string_name!(
    /// A mutable label pointing at exactly one digest of an image
    Tag
);

impl RegistryName {
    /// Full reference of a tagged image in this registry
    pub fn tag_ref(&self, image: &ImageName, tag: &Tag) -> String {
        format!("{}/{}:{}", self.0, image, tag)
    }

    /// Full reference of a digest in this registry
    pub fn digest_ref(&self, image: &ImageName, digest: &Digest) -> String {
        format!("{}/{}@{}", self.0, image, digest)
    }
}
