//! Models for remote ref advertisements and per-URL fetch reports

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Suffix the advertisement uses for the dereferenced object of a tag
pub const PEELED_SUFFIX: &str = "^{}";

/// One `<oid> <name>` line of a ref advertisement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisedRef {
    /// Full ref name, e.g. "refs/tags/v1.0" or "refs/tags/v1.0^{}"
    pub name: String,

    /// Object id the ref points to
    pub oid: String,
}

impl AdvertisedRef {
    /// Returns the base ref name when this entry is a peeled tag
    pub fn peeled_base(&self) -> Option<&str> {
        self.name.strip_suffix(PEELED_SUFFIX)
    }
}

/// Everything a remote tells us in its initial ref advertisement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInfo {
    /// Target of the `HEAD` symref, e.g. "refs/heads/main"
    pub head: Option<String>,

    /// Capabilities sent with the first ref
    pub capabilities: Vec<String>,

    /// Advertised refs in the order the remote sent them
    pub refs: Vec<AdvertisedRef>,
}

impl RemoteInfo {
    /// Looks up the object id advertised under a full ref name
    pub fn oid_of(&self, name: &str) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.oid.as_str())
    }
}

/// A ref as returned by the `/git/refs` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRef {
    /// Full ref name
    #[serde(rename = "ref")]
    pub ref_name: String,

    /// Object id the ref points to
    pub oid: String,

    /// Commit id of an annotated tag, when the remote advertised it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peeled: Option<String>,
}

/// Per-URL outcome of a multi-URL ref fetch
///
/// Successes and failures are kept apart so one bad URL never hides the
/// others. Keys are sorted to keep the JSON output stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefFetchReport<T> {
    pub data: BTreeMap<String, T>,
    pub errors: BTreeMap<String, String>,
}

/// Tag name → object id, plus `HEAD` when the remote reports a default branch
pub type RefMap = BTreeMap<String, String>;
