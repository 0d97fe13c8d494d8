use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::cloud::{ApiType, Attributes, EndpointRecord};

pub const UNKNOWN_VERSION: &str = "UNKNOWN";

/// Path appended to an OCCI endpoint to reach its query interface.
pub const PROBE_PATH_SUFFIX: &str = "/-/";

/// One service group of a Keystone-style catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEndpoint {
    pub id: String,
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

/// Hard-coded, type-specific defaults for a supported catalog type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointProfile {
    pub catalog_type: &'static str,
    pub api_type: ApiType,
    pub middleware: &'static str,
    pub developer: &'static str,
    /// Infix of the `endpoint_<infix>_api_version` static default.
    pub defaults_key: &'static str,
    pub default_api_version: &'static str,
    pub probed: bool,
}

impl EndpointProfile {
    fn api_version_key(&self) -> String {
        format!("endpoint_{}_api_version", self.defaults_key)
    }

    fn middleware_version_key(&self) -> String {
        format!("endpoint_{}_middleware_version", self.defaults_key)
    }
}

pub const OPENSTACK_PROFILES: &[EndpointProfile] = &[
    EndpointProfile {
        catalog_type: "compute",
        api_type: ApiType::OpenStack,
        middleware: "OpenStack Nova",
        developer: "OpenStack",
        defaults_key: "openstack",
        default_api_version: "2",
        probed: false,
    },
    EndpointProfile {
        catalog_type: "occi",
        api_type: ApiType::Occi,
        middleware: "ooi",
        developer: "CSIC",
        defaults_key: "occi",
        default_api_version: "1.1",
        probed: true,
    },
];

pub const OPENNEBULA_PROFILES: &[EndpointProfile] = &[EndpointProfile {
    catalog_type: "occi",
    api_type: ApiType::Occi,
    middleware: "rOCCI-server",
    developer: "EGI",
    defaults_key: "occi",
    default_api_version: "1.1",
    probed: false,
}];

/// Raw answer of a version probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub server: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbedVersions {
    pub middleware_version: Option<String>,
    pub api_version: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("probe request failed: {0}")]
    Transport(String),
    #[error("probe returned HTTP {0}")]
    Status(u16),
    #[error("probe response has no Server header")]
    MissingHeader,
    #[error("no version in Server header '{0}'")]
    NoMatch(String),
}

/// Authenticated GET against a live endpoint.
#[async_trait::async_trait]
pub trait VersionProbe: Send + Sync {
    async fn probe_endpoint_version(&self, url: &str) -> Result<ProbeResponse, ProbeError>;
}

fn middleware_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ooi/([0-9.]+)").expect("invalid middleware version regex"))
}

fn api_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"OCCI/([0-9.]+)").expect("invalid OCCI version regex"))
}

/// Pull middleware and protocol versions out of a `Server` header. The two
/// extractions are independent; only a header matching neither is an error.
pub fn parse_server_header(header: &str) -> Result<ProbedVersions, ProbeError> {
    let capture = |re: &Regex| re.captures(header).map(|c| c[1].to_string());
    let versions = ProbedVersions {
        middleware_version: capture(middleware_version_regex()),
        api_version: capture(api_version_regex()),
    };
    if versions.middleware_version.is_none() && versions.api_version.is_none() {
        return Err(ProbeError::NoMatch(header.to_string()));
    }
    Ok(versions)
}

pub async fn probe_versions(probe: &dyn VersionProbe, url: &str) -> Result<ProbedVersions, ProbeError> {
    let probe_url = format!("{}{PROBE_PATH_SUFFIX}", url.trim_end_matches('/'));
    let response = probe.probe_endpoint_version(&probe_url).await?;
    if response.status != 200 {
        return Err(ProbeError::Status(response.status));
    }
    let server = response.server.ok_or(ProbeError::MissingHeader)?;
    parse_server_header(&server)
}

/// Walks a service catalog and turns every supported published URL into an
/// endpoint record.
pub struct EndpointResolver<'a> {
    defaults: &'a Attributes,
    profiles: &'a [EndpointProfile],
    probe: Option<&'a dyn VersionProbe>,
}

impl<'a> EndpointResolver<'a> {
    pub fn new(defaults: &'a Attributes, profiles: &'a [EndpointProfile]) -> Self {
        Self {
            defaults,
            profiles,
            probe: None,
        }
    }

    /// Enable live probing for profiles that support it.
    pub fn with_probe(mut self, probe: &'a dyn VersionProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    fn profile_for(&self, kind: &str) -> Option<&'a EndpointProfile> {
        self.profiles.iter().find(|p| p.catalog_type == kind)
    }

    /// Never fails: probe problems fall back to the baseline versions.
    pub async fn resolve(&self, catalog: &[CatalogEntry]) -> BTreeMap<String, EndpointRecord> {
        let mut pending = Vec::new();
        for entry in catalog {
            let Some(profile) = self.profile_for(&entry.kind) else {
                debug!(kind = %entry.kind, "skipping unsupported catalog entry");
                continue;
            };
            for endpoint in &entry.endpoints {
                pending.push(self.resolve_one(profile, endpoint));
            }
        }

        let mut out = BTreeMap::new();
        for (id, record) in futures::future::join_all(pending).await {
            if out.insert(id.clone(), record).is_some() {
                debug!(endpoint = %id, "duplicate endpoint id in catalog, keeping the last one");
            }
        }
        out
    }

    async fn resolve_one(&self, profile: &EndpointProfile, endpoint: &CatalogEndpoint) -> (String, EndpointRecord) {
        let probe = self.probe.filter(|_| profile.probed);

        let api_baseline = if probe.is_some() {
            UNKNOWN_VERSION
        } else {
            profile.default_api_version
        };
        let mut api_version = self
            .defaults
            .get_str(&profile.api_version_key())
            .unwrap_or_else(|| api_baseline.to_string());
        let mut middleware_version = self
            .defaults
            .get_str(&profile.middleware_version_key())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());

        if let Some(probe) = probe {
            match probe_versions(probe, &endpoint.public_url).await {
                Ok(versions) => {
                    if let Some(v) = versions.middleware_version {
                        middleware_version = v;
                    }
                    if let Some(v) = versions.api_version {
                        api_version = v;
                    }
                }
                Err(err) => {
                    warn!(endpoint = %endpoint.public_url, error = %err, "version probe failed, keeping defaults");
                }
            }
        }

        let mut extensions = self.defaults.clone();
        for key in [
            "compute_api_type",
            "compute_middleware",
            "compute_middleware_developer",
            "compute_middleware_version",
            "compute_api_version",
            "compute_endpoint_url",
        ] {
            extensions.remove(key);
        }

        let record = EndpointRecord {
            compute_api_type: profile.api_type,
            compute_middleware: profile.middleware.to_string(),
            compute_middleware_developer: profile.developer.to_string(),
            compute_middleware_version: middleware_version,
            compute_api_version: api_version,
            compute_endpoint_url: endpoint.public_url.clone(),
            extensions,
        };
        (endpoint.id.clone(), record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeProbe {
        answer: Result<ProbeResponse, ProbeError>,
        seen: Mutex<Vec<String>>,
    }

    impl FakeProbe {
        fn new(answer: Result<ProbeResponse, ProbeError>) -> Self {
            Self {
                answer,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl VersionProbe for FakeProbe {
        async fn probe_endpoint_version(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
            self.seen.lock().unwrap().push(url.to_string());
            self.answer.clone()
        }
    }

    fn catalog() -> Vec<CatalogEntry> {
        serde_json::from_value(json!([
            {"type": "compute", "endpoints": [{"id": "nova-1", "publicURL": "https://nova:8774/v2/t"}]},
            {"type": "occi", "endpoints": [{"id": "occi-1", "publicURL": "https://occi:8787/occi1.1"}]},
            {"type": "identity", "endpoints": [{"id": "ks-1", "publicURL": "https://keystone:5000/v2.0"}]}
        ]))
        .unwrap()
    }

    #[test]
    fn server_header_versions() {
        let versions = parse_server_header("ooi/1.4 OCCI/1.1").unwrap();
        assert_eq!(versions.middleware_version.as_deref(), Some("1.4"));
        assert_eq!(versions.api_version.as_deref(), Some("1.1"));

        let partial = parse_server_header("nginx OCCI/1.2").unwrap();
        assert_eq!(partial.middleware_version, None);
        assert_eq!(partial.api_version.as_deref(), Some("1.2"));

        assert!(matches!(parse_server_header("nginx/1.10"), Err(ProbeError::NoMatch(_))));
    }

    #[tokio::test]
    async fn unsupported_types_are_dropped() {
        let defaults = Attributes::new();
        let endpoints = EndpointResolver::new(&defaults, OPENSTACK_PROFILES)
            .resolve(&catalog())
            .await;

        assert_eq!(endpoints.len(), 2);
        assert!(!endpoints.contains_key("ks-1"));

        let nova = &endpoints["nova-1"];
        assert_eq!(nova.compute_api_type, ApiType::OpenStack);
        assert_eq!(nova.compute_middleware, "OpenStack Nova");
        assert_eq!(nova.compute_api_version, "2");
        assert_eq!(nova.compute_middleware_version, UNKNOWN_VERSION);

        let occi = &endpoints["occi-1"];
        assert_eq!(occi.compute_api_type, ApiType::Occi);
        assert_eq!(occi.compute_api_version, "1.1");
    }

    #[tokio::test]
    async fn static_defaults_sit_below_discovered_values() {
        let defaults: Attributes = [
            ("endpoint_production_level".to_string(), json!("production")),
            ("endpoint_openstack_api_version".to_string(), json!("2.1")),
            ("compute_endpoint_url".to_string(), json!("https://stale")),
        ]
        .into_iter()
        .collect();

        let endpoints = EndpointResolver::new(&defaults, OPENSTACK_PROFILES)
            .resolve(&catalog())
            .await;

        let nova = &endpoints["nova-1"];
        assert_eq!(nova.compute_api_version, "2.1");
        assert_eq!(nova.compute_endpoint_url, "https://nova:8774/v2/t");
        assert_eq!(
            nova.extensions.get_str("endpoint_production_level").as_deref(),
            Some("production")
        );
        assert!(!nova.extensions.contains_key("compute_endpoint_url"));
    }

    #[tokio::test]
    async fn probe_overrides_versions_of_occi_endpoints() {
        let probe = FakeProbe::new(Ok(ProbeResponse {
            status: 200,
            server: Some("ooi/1.4 OCCI/1.1".to_string()),
        }));
        let defaults = Attributes::new();

        let endpoints = EndpointResolver::new(&defaults, OPENSTACK_PROFILES)
            .with_probe(&probe)
            .resolve(&catalog())
            .await;

        let occi = &endpoints["occi-1"];
        assert_eq!(occi.compute_middleware_version, "1.4");
        assert_eq!(occi.compute_api_version, "1.1");
        assert_eq!(
            *probe.seen.lock().unwrap(),
            vec!["https://occi:8787/occi1.1/-/".to_string()]
        );
    }

    #[tokio::test]
    async fn probe_failures_keep_unknown_versions() {
        let defaults = Attributes::new();
        for answer in [
            Err(ProbeError::Transport("connection refused".to_string())),
            Ok(ProbeResponse { status: 500, server: Some("ooi/1.4 OCCI/1.1".to_string()) }),
            Ok(ProbeResponse { status: 200, server: None }),
            Ok(ProbeResponse { status: 200, server: Some("Apache".to_string()) }),
        ] {
            let probe = FakeProbe::new(answer);
            let endpoints = EndpointResolver::new(&defaults, OPENSTACK_PROFILES)
                .with_probe(&probe)
                .resolve(&catalog())
                .await;

            let occi = &endpoints["occi-1"];
            assert_eq!(occi.compute_middleware_version, UNKNOWN_VERSION);
            assert_eq!(occi.compute_api_version, UNKNOWN_VERSION);
            assert_eq!(endpoints["nova-1"].compute_api_version, "2");
        }
    }

    /// Fails every URL on `broken_host`, answers `server` everywhere else.
    struct PerHost {
        broken_host: &'static str,
        server: &'static str,
    }

    #[async_trait::async_trait]
    impl VersionProbe for PerHost {
        async fn probe_endpoint_version(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
            if url.contains(self.broken_host) {
                return Err(ProbeError::Transport("connection reset".to_string()));
            }
            Ok(ProbeResponse {
                status: 200,
                server: Some(self.server.to_string()),
            })
        }
    }

    #[tokio::test]
    async fn one_failing_endpoint_does_not_affect_the_others() {
        let catalog: Vec<CatalogEntry> = serde_json::from_value(json!([
            {"type": "occi", "endpoints": [
                {"id": "occi-a", "publicURL": "https://occi-a.example.org:8787"},
                {"id": "occi-b", "publicURL": "https://occi-b.example.org:8787"}
            ]}
        ]))
        .unwrap();
        let probe = PerHost {
            broken_host: "occi-b",
            server: "ooi/1.4 OCCI/1.2",
        };
        let defaults = Attributes::new();

        let endpoints = EndpointResolver::new(&defaults, OPENSTACK_PROFILES)
            .with_probe(&probe)
            .resolve(&catalog)
            .await;

        let good = &endpoints["occi-a"];
        assert_eq!(good.compute_middleware_version, "1.4");
        assert_eq!(good.compute_api_version, "1.2");

        let bad = &endpoints["occi-b"];
        assert_eq!(bad.compute_middleware_version, UNKNOWN_VERSION);
        assert_eq!(bad.compute_api_version, UNKNOWN_VERSION);
    }
}
