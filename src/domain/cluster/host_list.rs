use std::collections::HashSet;

use crate::domain::utils::id::HostId;
use crate::error::{Error, Result};

/// Ordered cluster membership. The position of a host in this list is the
/// only source of its role and task indices, so every node must receive the
/// same list in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostList {
    hosts: Vec<HostId>,
}

impl HostList {
    pub fn new(hosts: Vec<HostId>) -> Result<Self> {
        if hosts.is_empty() {
            return Err(Error::ConfigError("host list must contain at least one host".to_string()));
        }

        let mut seen = HashSet::with_capacity(hosts.len());
        for host in &hosts {
            if !seen.insert(host) {
                return Err(Error::ConfigError(format!("host '{}' appears more than once in the host list", host)));
            }
        }

        Ok(HostList { hosts })
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostId> {
        self.hosts.iter()
    }

    pub fn master(&self) -> &HostId {
        &self.hosts[0]
    }

    pub fn workers(&self) -> &[HostId] {
        &self.hosts[1..]
    }

    pub fn position(&self, host: &HostId) -> Option<usize> {
        self.hosts.iter().position(|h| h == host)
    }

    pub fn contains(&self, host: &HostId) -> bool {
        self.position(host).is_some()
    }

    pub fn is_master(&self, host: &HostId) -> bool {
        self.master() == host
    }

    pub fn as_strings(&self) -> Vec<String> {
        self.hosts.iter().map(|h| h.to_string()).collect()
    }
}

impl TryFrom<Vec<String>> for HostList {
    type Error = Error;

    fn try_from(hosts: Vec<String>) -> Result<Self> {
        HostList::new(hosts.into_iter().map(HostId::new).collect())
    }
}

impl<'a> IntoIterator for &'a HostList {
    type Item = &'a HostId;
    type IntoIter = std::slice::Iter<'a, HostId>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.iter()
    }
}
