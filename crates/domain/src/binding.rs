use serde::{Deserialize, Serialize};

// =============================================================================
// Binding Names
// =============================================================================

/// A named slot in the test environment that resolves to either a live
/// implementation or a substitute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingName {
    HttpGet,
    HttpPut,
    HttpPost,
    HttpPatch,
    HttpDelete,
    StoreConnector,
}

impl BindingName {
    /// Name as reported in violation messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingName::HttpGet => "get",
            BindingName::HttpPut => "put",
            BindingName::HttpPost => "post",
            BindingName::HttpPatch => "patch",
            BindingName::HttpDelete => "delete",
            BindingName::StoreConnector => "store_connector",
        }
    }

    pub fn is_http_verb(&self) -> bool {
        !matches!(self, BindingName::StoreConnector)
    }

    /// The five HTTP verb bindings, in check order.
    pub fn http_verbs() -> [BindingName; 5] {
        [
            BindingName::HttpGet,
            BindingName::HttpPut,
            BindingName::HttpPost,
            BindingName::HttpPatch,
            BindingName::HttpDelete,
        ]
    }

    /// Every monitored binding, in check order.
    pub fn all() -> [BindingName; 6] {
        [
            BindingName::HttpGet,
            BindingName::HttpPut,
            BindingName::HttpPost,
            BindingName::HttpPatch,
            BindingName::HttpDelete,
            BindingName::StoreConnector,
        ]
    }
}

impl std::fmt::Display for BindingName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BindingName {
    type Err = crate::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(BindingName::HttpGet),
            "put" => Ok(BindingName::HttpPut),
            "post" => Ok(BindingName::HttpPost),
            "patch" => Ok(BindingName::HttpPatch),
            "delete" => Ok(BindingName::HttpDelete),
            "store_connector" => Ok(BindingName::StoreConnector),
            other => Err(crate::DomainError::UnknownBinding(other.to_string())),
        }
    }
}

// =============================================================================
// Binding Kind
// =============================================================================

/// What a binding currently resolves to.
///
/// Every port implementation reports its kind; this tag is what the
/// isolation guard inspects instead of runtime type introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// Performs real network or service I/O.
    Live,
    /// Records calls and returns configured values without I/O.
    Substitute,
}

impl BindingKind {
    pub fn is_substitute(&self) -> bool {
        matches!(self, BindingKind::Substitute)
    }
}

impl std::fmt::Display for BindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingKind::Live => write!(f, "live"),
            BindingKind::Substitute => write!(f, "substitute"),
        }
    }
}

// =============================================================================
// Monitored Set
// =============================================================================

/// The fixed list of bindings a check inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredSet {
    names: Vec<BindingName>,
}

impl MonitoredSet {
    /// All five HTTP verbs plus the store connector.
    pub fn standard() -> Self {
        Self {
            names: BindingName::all().to_vec(),
        }
    }

    pub fn http() -> Self {
        Self {
            names: BindingName::http_verbs().to_vec(),
        }
    }

    pub fn store() -> Self {
        Self {
            names: vec![BindingName::StoreConnector],
        }
    }

    pub fn names(&self) -> &[BindingName] {
        &self.names
    }

    pub fn contains(&self, name: BindingName) -> bool {
        self.names.contains(&name)
    }

    /// Names from `observed` that belong to this set but are not substitutes,
    /// in the set's order.
    pub fn violations<I>(&self, observed: I) -> Vec<BindingName>
    where
        I: IntoIterator<Item = (BindingName, BindingKind)>,
    {
        let live: Vec<BindingName> = observed
            .into_iter()
            .filter(|(_, kind)| !kind.is_substitute())
            .map(|(name, _)| name)
            .collect();

        self.names
            .iter()
            .copied()
            .filter(|name| live.contains(name))
            .collect()
    }
}

impl Default for MonitoredSet {
    fn default() -> Self {
        Self::standard()
    }
}
