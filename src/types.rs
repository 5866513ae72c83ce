//! Core types for the repobatch pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicate attached to every draft, pointing at its parent container.
pub const IS_MEMBER_OF: &str = "isMemberOf";

/// Persistent identifier for a repository object (`namespace:serial`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pid(pub String);

impl Pid {
    /// Build a PID from a namespace prefix and a serial number
    pub fn new(namespace: &Namespace, serial: u64) -> Self {
        Pid(format!("{}:{}", namespace.as_str(), serial))
    }

    /// Get the underlying string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace prefix, i.e. everything before the first `:`
    pub fn namespace(&self) -> Namespace {
        match self.0.split_once(':') {
            Some((ns, _)) => Namespace::new(ns),
            None => Namespace::new(self.0.as_str()),
        }
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Pid {
    fn from(s: &str) -> Self {
        Pid(s.to_string())
    }
}

impl From<Pid> for String {
    fn from(pid: Pid) -> Self {
        pid.0
    }
}

/// Prefix scoping persistent-identifier allocation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace(pub String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Namespace(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content-model tag carried by items and declared by collection policies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentModel(pub String);

impl ContentModel {
    pub fn new(name: impl Into<String>) -> Self {
        ContentModel(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed relationship from a draft to another repository object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub predicate: String,
    pub object: Pid,
}

impl Relationship {
    pub fn new(predicate: impl Into<String>, object: Pid) -> Self {
        Self {
            predicate: predicate.into(),
            object,
        }
    }

    /// The mandatory parent-membership relationship
    pub fn is_member_of(parent: Pid) -> Self {
        Self::new(IS_MEMBER_OF, parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_namespace() {
        let pid = Pid::from("ir:42");
        assert_eq!(pid.namespace(), Namespace::new("ir"));
        assert_eq!(pid.as_str(), "ir:42");
    }

    #[test]
    fn test_pid_from_namespace_and_serial() {
        let pid = Pid::new(&Namespace::new("ns1"), 7);
        assert_eq!(pid.as_str(), "ns1:7");
    }

    #[test]
    fn test_membership_relationship() {
        let rel = Relationship::is_member_of(Pid::from("collection:root"));
        assert_eq!(rel.predicate, IS_MEMBER_OF);
        assert_eq!(rel.object.as_str(), "collection:root");
    }
}
