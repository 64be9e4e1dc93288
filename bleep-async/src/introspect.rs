use async_trait::async_trait;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Introspectable;
use serde_derive::Deserialize;

use crate::error::CoreError;

/// A child object reference from a `<node>` introspection element. BlueZ
/// only ever nests child nodes one level at a time (an adapter's children
/// are devices, a device's children are services, and so on), so this is
/// all the introspection XML schema this crate needs to model.
#[derive(Debug, Deserialize, Default)]
pub struct Node {
    #[serde(rename = "name", default)]
    pub name: Option<String>,
    #[serde(rename = "node", default)]
    pub nodes: Vec<Node>,
}

/// Introspects an object and parses the response XML into a [`Node`] tree. `path` is used only
/// to label [`CoreError::IntrospectionFailed`] if the D-Bus call itself fails; a malformed XML
/// response is still reported as [`CoreError::XmlParseError`].
#[async_trait]
pub trait IntrospectParse {
    async fn introspect_parse(&self, path: &str) -> Result<Node, CoreError>;
}

#[async_trait]
impl<T> IntrospectParse for T
where
    T: Introspectable + Sync,
{
    async fn introspect_parse(&self, path: &str) -> Result<Node, CoreError> {
        let xml = self
            .introspect()
            .await
            .map_err(|source| CoreError::IntrospectionFailed { path: path.to_string(), source })?;
        Ok(serde_xml_rs::from_str(&xml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_children_with_names() {
        let xml = r#"
            <node>
                <node name="service0010"/>
                <node name="service0011"/>
                <interface name="org.bluez.Device1"/>
            </node>
        "#;
        let node: Node = serde_xml_rs::from_str(xml).unwrap();
        assert_eq!(node.nodes.len(), 2);
        assert_eq!(node.nodes[0].name.as_deref(), Some("service0010"));
    }
}
