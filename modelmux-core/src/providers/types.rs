//! Provider value types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::impl_sql_text;
use crate::error::ParseEnumError;

/// Wire format spoken by an upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFormat {
    Openai,
    Deepseek,
    Anthropic,
    Google,
}

impl ProviderFormat {
    pub const ALL: [ProviderFormat; 4] = [
        ProviderFormat::Openai,
        ProviderFormat::Deepseek,
        ProviderFormat::Anthropic,
        ProviderFormat::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFormat::Openai => "openai",
            ProviderFormat::Deepseek => "deepseek",
            ProviderFormat::Anthropic => "anthropic",
            ProviderFormat::Google => "google",
        }
    }
}

impl fmt::Display for ProviderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ParseEnumError::new("provider format", s, &Self::ALL.map(|f| f.as_str()))
            })
    }
}

impl_sql_text!(ProviderFormat);
