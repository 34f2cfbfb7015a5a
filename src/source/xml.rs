//! Parsing provisioning XML into a [`Snapshot`].
//!
//! The document is first parsed into a generic attributed tree, then a fixed
//! schema walk lifts it into typed values. Missing elements or attributes and
//! malformed addresses surface as [`SchemaError`]s instead of being trusted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::error::{ConfigError, Result, SchemaError};
use crate::snapshot::{self, Endpoint, Instance, ResourceReference, Snapshot};

/// Root under which resource-relative paths are resolved.
fn resource_root() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\resources\directory")
    } else {
        PathBuf::from("/var/lib/resources/directory")
    }
}

/// Parse raw file content and transform it into a snapshot.
pub(crate) fn parse_snapshot(content: &str, path: &Path) -> Result<Snapshot> {
    let doc = Document::parse(content).map_err(|source| ConfigError::XmlParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(transform(&doc)?)
}

/// Walk the fixed provisioning schema.
///
/// Repeating elements are collected by tag name, so a single occurrence and a
/// sequence of occurrences both come out as a proper sequence. A document
/// with exactly one `Instance` or one `Endpoint` transforms the same way as a
/// plural one.
fn transform(doc: &Document<'_>) -> std::result::Result<Snapshot, SchemaError> {
    let deployment_id = required_attr(required_element(doc, "Deployment")?, "name")?.to_string();
    let instance_id = required_attr(required_element(doc, "Incarnation")?, "instance")?.to_string();

    let mut application_settings = BTreeMap::new();
    for setting in named_children(required_element(doc, "ApplicationSettings")?, "Setting") {
        application_settings.insert(
            required_attr(setting, "name")?.to_string(),
            required_attr(setting, "value")?.to_string(),
        );
    }

    let mut resource_references = BTreeMap::new();
    for resource in named_children(required_element(doc, "ResourceReferences")?, "Resource") {
        let name = required_attr(resource, "name")?.to_string();
        let relative = required_attr(resource, "path")?;
        let size = required_attr(resource, "size")?.to_string();
        resource_references.insert(
            name,
            ResourceReference {
                path: resource_root().join(relative),
                size,
            },
        );
    }

    let mut instances = Vec::new();
    for instance in named_children(required_element(doc, "Instances")?, "Instance") {
        let id = required_attr(instance, "id")?.to_string();

        let input_endpoints = named_children(instance, "InputEndpoints")
            .next()
            .ok_or(SchemaError::MissingElement("InputEndpoints"))?;
        let mut endpoints = Vec::new();
        for endpoint in named_children(input_endpoints, "Endpoint") {
            endpoints.push(Endpoint::from_address(
                required_attr(endpoint, "name")?,
                required_attr(endpoint, "protocol")?,
                required_attr(endpoint, "address")?,
            )?);
        }

        instances.push(Instance { id, endpoints });
    }

    Ok(Snapshot {
        deployment_id,
        instance_id,
        application_settings,
        resource_references,
        roles: snapshot::group_by_role(instances),
    })
}

fn required_element<'a, 'input>(
    doc: &'a Document<'input>,
    name: &'static str,
) -> std::result::Result<Node<'a, 'input>, SchemaError> {
    doc.root()
        .descendants()
        .find(|node| node.is_element() && node.has_tag_name(name))
        .ok_or(SchemaError::MissingElement(name))
}

fn required_attr<'a>(
    node: Node<'a, '_>,
    name: &'static str,
) -> std::result::Result<&'a str, SchemaError> {
    node.attribute(name)
        .ok_or_else(|| SchemaError::MissingAttribute {
            element: node.tag_name().name().to_string(),
            attribute: name,
        })
}

fn named_children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && child.has_tag_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        <RDConfig>
          <Deployment name="deployment42" />
          <Incarnation instance="role1_IN_0" />
          <ApplicationSettings>
            <Setting name="logLevel" value="debug" />
            <Setting name="region" value="west" />
          </ApplicationSettings>
          <ResourceReferences>
            <Resource name="scratch" path="scratch" size="1024" />
          </ResourceReferences>
          <Instances>
            <Instance id="role1_IN_0">
              <InputEndpoints>
                <Endpoint name="web" protocol="tcp" address="10.0.0.4:8080" />
                <Endpoint name="admin" protocol="tcp" address="10.0.0.4:9090" />
              </InputEndpoints>
            </Instance>
            <Instance id="role1_IN_1">
              <InputEndpoints>
                <Endpoint name="web" protocol="tcp" address="10.0.0.5:8080" />
              </InputEndpoints>
            </Instance>
            <Instance id="role2_IN_0">
              <InputEndpoints>
                <Endpoint name="worker" protocol="udp" address="10.0.0.6:7000" />
              </InputEndpoints>
            </Instance>
          </Instances>
        </RDConfig>"#;

    fn parse(content: &str) -> Result<Snapshot> {
        parse_snapshot(content, Path::new("test.xml"))
    }

    #[test]
    fn transforms_full_document() {
        let snapshot = parse(FULL).unwrap();

        assert_eq!(snapshot.deployment_id, "deployment42");
        assert_eq!(snapshot.instance_id, "role1_IN_0");
        assert_eq!(snapshot.application_settings["logLevel"], "debug");
        assert_eq!(snapshot.application_settings["region"], "west");

        let scratch = &snapshot.resource_references["scratch"];
        assert!(scratch.path.ends_with("scratch"));
        assert!(scratch.path.starts_with(resource_root()));
        assert_eq!(scratch.size, "1024");

        assert_eq!(snapshot.roles.len(), 2);
        assert_eq!(snapshot.roles[0].name, "role1");
        assert_eq!(snapshot.roles[0].instances.len(), 2);
        assert_eq!(snapshot.roles[1].name, "role2");
        assert_eq!(snapshot.roles[1].instances[0].endpoints[0].port, "7000");
    }

    #[test]
    fn single_instance_and_endpoint_become_one_element_sequences() {
        let snapshot = parse(
            r#"
            <RDConfig>
              <Deployment name="d" />
              <Incarnation instance="solo_IN_0" />
              <ApplicationSettings />
              <ResourceReferences />
              <Instances>
                <Instance id="solo_IN_0">
                  <InputEndpoints>
                    <Endpoint name="web" protocol="tcp" address="host:80" />
                  </InputEndpoints>
                </Instance>
              </Instances>
            </RDConfig>"#,
        )
        .unwrap();

        assert_eq!(snapshot.roles.len(), 1);
        assert_eq!(snapshot.roles[0].instances.len(), 1);
        assert_eq!(snapshot.roles[0].instances[0].endpoints.len(), 1);
        assert_eq!(snapshot.roles[0].instances[0].endpoints[0].host, "host");
    }

    #[test]
    fn missing_required_element_is_a_schema_error() {
        let err = parse(
            r#"
            <RDConfig>
              <Incarnation instance="a_IN_0" />
              <ApplicationSettings />
              <ResourceReferences />
              <Instances />
            </RDConfig>"#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Schema(SchemaError::MissingElement("Deployment"))
        ));
    }

    #[test]
    fn missing_required_attribute_is_a_schema_error() {
        let err = parse(
            r#"
            <RDConfig>
              <Deployment />
              <Incarnation instance="a_IN_0" />
              <ApplicationSettings />
              <ResourceReferences />
              <Instances />
            </RDConfig>"#,
        )
        .unwrap_err();

        match err {
            ConfigError::Schema(SchemaError::MissingAttribute { element, attribute }) => {
                assert_eq!(element, "Deployment");
                assert_eq!(attribute, "name");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_address_is_a_schema_error() {
        let err = parse(
            r#"
            <RDConfig>
              <Deployment name="d" />
              <Incarnation instance="a_IN_0" />
              <ApplicationSettings />
              <ResourceReferences />
              <Instances>
                <Instance id="a_IN_0">
                  <InputEndpoints>
                    <Endpoint name="web" protocol="tcp" address="noport" />
                  </InputEndpoints>
                </Instance>
              </Instances>
            </RDConfig>"#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Schema(SchemaError::MalformedAddress { .. })
        ));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = parse("<RDConfig><Deployment").unwrap_err();
        assert!(matches!(err, ConfigError::XmlParse { .. }));
    }

    #[test]
    fn instance_without_endpoint_container_is_a_schema_error() {
        let err = parse(
            r#"
            <RDConfig>
              <Deployment name="d" />
              <Incarnation instance="a_IN_0" />
              <ApplicationSettings />
              <ResourceReferences />
              <Instances>
                <Instance id="a_IN_0" />
              </Instances>
            </RDConfig>"#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Schema(SchemaError::MissingElement("InputEndpoints"))
        ));
    }

    #[test]
    fn empty_endpoint_container_yields_no_endpoints() {
        let snapshot = parse(
            r#"
            <RDConfig>
              <Deployment name="d" />
              <Incarnation instance="a_IN_0" />
              <ApplicationSettings />
              <ResourceReferences />
              <Instances>
                <Instance id="a_IN_0">
                  <InputEndpoints />
                </Instance>
              </Instances>
            </RDConfig>"#,
        )
        .unwrap();

        assert!(snapshot.roles[0].instances[0].endpoints.is_empty());
    }
}
