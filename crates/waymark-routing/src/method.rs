//! The HTTP verbs a route can be registered under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use waymark_core::{WaymarkError, WaymarkResult};

/// A supported HTTP method.
///
/// Each method owns its own bucket in the route registry.
///
/// # Examples
///
/// ```
/// use waymark_routing::HttpMethod;
///
/// let method: HttpMethod = "post".parse().unwrap();
/// assert_eq!(method, HttpMethod::Post);
/// assert_eq!(method.to_string(), "POST");
/// assert!("TRACE".parse::<HttpMethod>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Every supported method, in bucket order. `any` registers under all of them.
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Head,
        Self::Options,
    ];

    /// Returns the upper-case wire name of the method.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Parses a list of verb names, expanding `any` to every method.
    ///
    /// Duplicates are dropped; the first occurrence keeps its position.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::UnsupportedHttpMethod`] for a name outside the
    /// supported set.
    pub fn parse_list(names: &[&str]) -> WaymarkResult<Vec<Self>> {
        let mut methods = Vec::with_capacity(names.len());
        for name in names {
            let parsed: Vec<Self> = if name.eq_ignore_ascii_case("any") {
                Self::ALL.to_vec()
            } else {
                vec![name.parse()?]
            };
            for method in parsed {
                if !methods.contains(&method) {
                    methods.push(method);
                }
            }
        }
        Ok(methods)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = WaymarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WaymarkError::UnsupportedHttpMethod(s.to_string()))
    }
}

impl TryFrom<&http::Method> for HttpMethod {
    type Error = WaymarkError;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}
