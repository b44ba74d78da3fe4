//! Identity primitives shared across the workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CelleryError, Result};

/// Identity of a cell image plus the instance it is deployed as.
///
/// Supplied by the caller of a resolution pass. The image triple feeds the
/// manifest annotations; the instance name replaces the declared name at
/// run time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellImageInfo {
    /// Organization owning the image.
    pub org: String,
    /// Image name; also the build-time identity of the cell.
    pub name: String,
    /// Image version.
    pub ver: String,
    /// Concrete instance name used at run time.
    pub instance_name: String,
}

impl CellImageInfo {
    /// Creates image info from its four parts.
    #[must_use]
    pub fn new(
        org: impl Into<String>,
        name: impl Into<String>,
        ver: impl Into<String>,
        instance_name: impl Into<String>,
    ) -> Self {
        Self {
            org: org.into(),
            name: name.into(),
            ver: ver.into(),
            instance_name: instance_name.into(),
        }
    }

    /// Returns the `org/name:ver` reference of this image.
    #[must_use]
    pub fn image_ref(&self) -> ImageRef {
        ImageRef {
            org: self.org.clone(),
            name: self.name.clone(),
            ver: self.ver.clone(),
        }
    }
}

/// Reference to a cell image in `org/name:ver` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageRef {
    /// Organization owning the image.
    pub org: String,
    /// Image name.
    pub name: String,
    /// Image version.
    pub ver: String,
}

impl FromStr for ImageRef {
    type Err = CelleryError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            CelleryError::validation(format!(
                "invalid cell image reference \"{s}\": expected org/name:version"
            ))
        };
        let (org, rest) = s.split_once('/').ok_or_else(invalid)?;
        let (name, ver) = rest.split_once(':').ok_or_else(invalid)?;
        if [org, name, ver]
            .iter()
            .any(|part| part.is_empty() || part.contains(['/', ':']))
        {
            return Err(invalid());
        }
        Ok(Self {
            org: org.into(),
            name: name.into(),
            ver: ver.into(),
        })
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.org, self.name, self.ver)
    }
}
