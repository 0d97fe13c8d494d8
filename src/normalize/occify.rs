/// Namespace OpenStack templates and images are published under.
pub const OPENSTACK_NAMESPACE: &str = "http://schemas.openstack.org/template/";

/// Occifies a term so that it is compliant with GFD 185.
pub fn occify(term: &str) -> String {
    term.trim().replace(' ', "_").replace('.', "-").to_lowercase()
}

/// `<namespace><schema>#<occified term>`. The namespace keeps its own
/// trailing separator.
pub fn synthesize_id(namespace: &str, schema: &str, term: &str) -> String {
    format!("{namespace}{schema}#{}", occify(term))
}

/// rOCCI names OpenNebula objects `uuid_<name>_<id>`.
pub fn rocci_term(name: &str, id: &str) -> String {
    format!("uuid_{name}_{id}")
}

/// Namespace rOCCI publishes OpenNebula objects under for a given host.
pub fn opennebula_namespace(host: &str) -> String {
    format!("http://occi.{host}/occi/infrastructure/")
}
