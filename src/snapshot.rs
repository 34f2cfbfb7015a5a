//! The structured configuration snapshot delivered to consumers.
//!
//! A [`Snapshot`] is built fresh on every successful reload and is immutable
//! once constructed; consumers never observe a partially-built value.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::SchemaError;

/// Complete structured configuration state for one deployment.
///
/// Field names serialize in camelCase, which is the consumer-facing contract
/// for exported snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Identifier of the deployment.
    pub deployment_id: String,
    /// Identifier of this running instance.
    pub instance_id: String,
    /// Application setting name to value.
    pub application_settings: BTreeMap<String, String>,
    /// Resource name to resolved reference.
    pub resource_references: BTreeMap<String, ResourceReference>,
    /// All roles in the deployment, ordered by first appearance of each role
    /// name in the source document.
    pub roles: Vec<Role>,
}

impl Snapshot {
    /// Look up a role by name.
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }
}

/// A named resource with its resolved on-disk location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    /// Resource root joined with the resource's relative path.
    pub path: PathBuf,
    /// Declared size, verbatim from the document.
    pub size: String,
}

/// Logical grouping of instances sharing an identifier prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// The shared instance-id prefix preceding the first underscore.
    pub name: String,
    /// Instances belonging to this role, in document order.
    pub instances: Vec<Instance>,
}

/// One running instance of a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Instance identifier, e.g. `role1_IN_0`.
    pub id: String,
    /// Input endpoints exposed by this instance, in document order.
    pub endpoints: Vec<Endpoint>,
}

/// A network endpoint of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Endpoint name.
    pub name: String,
    /// Transport protocol, verbatim from the document.
    pub protocol: String,
    /// Host part of the address.
    pub host: String,
    /// Port part of the address, kept as a string verbatim.
    pub port: String,
}

impl Endpoint {
    /// Build an endpoint from an `address` of the form `host:port`, split at
    /// the first colon. Both parts must be non-empty.
    pub(crate) fn from_address(
        name: &str,
        protocol: &str,
        address: &str,
    ) -> Result<Self, SchemaError> {
        let (host, port) = address
            .split_once(':')
            .filter(|(host, port)| !host.is_empty() && !port.is_empty())
            .ok_or_else(|| SchemaError::MalformedAddress {
                endpoint: name.to_string(),
                address: address.to_string(),
            })?;

        Ok(Self {
            name: name.to_string(),
            protocol: protocol.to_string(),
            host: host.to_string(),
            port: port.to_string(),
        })
    }
}

/// Role name of an instance id: the prefix before the first underscore, or
/// the whole id when it has none.
pub(crate) fn role_name(instance_id: &str) -> &str {
    instance_id.split('_').next().unwrap_or(instance_id)
}

/// Group instances into roles by id prefix, preserving the order in which
/// each role name first appears.
pub(crate) fn group_by_role(instances: Vec<Instance>) -> Vec<Role> {
    let mut roles: Vec<Role> = Vec::new();
    for instance in instances {
        let name = role_name(&instance.id).to_string();
        match roles.iter_mut().find(|r| r.name == name) {
            Some(role) => role.instances.push(instance),
            None => roles.push(Role {
                name,
                instances: vec![instance],
            }),
        }
    }
    roles
}
