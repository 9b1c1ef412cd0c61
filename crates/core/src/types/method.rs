//! HTTP methods understood by the dispatch table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base path every API route is served under.
pub const API_PATH: &str = "/api/2.0/";

/// Same as [`API_PATH`] without the trailing slash, for building client URLs.
pub const API_BASE: &str = "/api/2.0";

/// An HTTP method a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl ApiMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a method name is not one of the five API methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMethod(pub String);

impl fmt::Display for InvalidMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INVALID method: {}", self.0)
    }
}

impl std::error::Error for InvalidMethod {}

impl FromStr for ApiMethod {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(InvalidMethod(s.to_string())),
        }
    }
}

/// Ordered list of methods, rendered the way `Allow` style headers expect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiMethods(pub Vec<ApiMethod>);

impl ApiMethods {
    pub fn contains(&self, method: ApiMethod) -> bool {
        self.0.contains(&method)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApiMethod> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ApiMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ApiMethod::as_str)
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}

impl FromIterator<ApiMethod> for ApiMethods {
    fn from_iter<I: IntoIterator<Item = ApiMethod>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
