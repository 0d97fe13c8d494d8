#![allow(dead_code)]

use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;

use cloud_info::ProviderError;
use cloud_info::normalize::{CatalogEntry, ProbeError, ProbeResponse, VersionProbe};
use cloud_info::providers::opennebula::OneSource;
use cloud_info::providers::openstack::{Flavor, NovaSource, Server, ServerImage};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

pub fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).unwrap()
}

/// In-memory Keystone + Nova.
pub struct FakeNova {
    pub catalog: Vec<CatalogEntry>,
    pub flavors: Vec<Flavor>,
    pub images: Vec<ServerImage>,
    pub servers: Vec<Server>,
    pub probe: Result<ProbeResponse, ProbeError>,
}

impl FakeNova {
    pub fn new() -> Self {
        Self {
            catalog: from_json(json!([
                {"type": "compute", "endpoints": [{"id": "nova-1", "publicURL": "https://nova.example.org:8774/v2/tenant"}]},
                {"type": "occi", "endpoints": [{"id": "occi-1", "publicURL": "https://occi.example.org:8787/occi1.1"}]},
                {"type": "image", "endpoints": [{"id": "glance-1", "publicURL": "https://glance.example.org:9292"}]}
            ])),
            flavors: from_json(json!([
                {"id": "1", "name": "m1.small", "ram": 2048, "vcpus": 1, "disk": 20,
                 "os-flavor-access:is_public": true},
                {"id": "42", "name": "m1.large", "ram": 8192, "vcpus": 4, "disk": 80,
                 "os-flavor-access:is_public": true},
                {"id": "99", "name": "internal", "ram": 512, "vcpus": 1, "disk": 1,
                 "os-flavor-access:is_public": false}
            ])),
            images: from_json(json!([
                {
                    "id": "img-appdb",
                    "name": "CentOS 7",
                    "links": [{"rel": "alternate", "type": "application/vnd.openstack.image",
                               "href": "https://glance.example.org/images/img-appdb"}],
                    "metadata": {
                        "vmcatcher_event_ad_mpuri": "https://appdb.egi.eu/store/vm/image/centos7",
                        "marketplace": "https://other.example.org/centos7",
                        "vmcatcher_event_dc_title": "CentOS 7 base",
                        "vmcatcher_event_hv_version": "2017.01",
                        "os_distro": "centos",
                        "os_version": "7"
                    }
                },
                {
                    "id": "img-market",
                    "name": "Ubuntu 16.04",
                    "links": [{"rel": "alternate", "type": "application/vnd.openstack.image",
                               "href": "https://glance.example.org/images/img-market"}],
                    "metadata": {
                        "marketplace": "https://market.example.org/ubuntu",
                        "image_version": "16.04.3",
                        "vmcatcher_event_hv_version": "ignored"
                    }
                },
                {
                    "id": "img-plain",
                    "name": "scratch",
                    "links": [{"rel": "alternate", "type": "application/vnd.openstack.image",
                               "href": "https://glance.example.org/images/img-plain"}],
                    "metadata": {}
                }
            ])),
            servers: from_json(json!([
                {"id": "vm-1", "name": "web", "status": "ACTIVE",
                 "image": {"id": "img-appdb"}, "flavor": {"id": "1"}},
                {"id": "vm-2", "name": "db", "status": "SHUTOFF",
                 "image": "", "flavor": {"id": "42"}}
            ])),
            probe: Ok(ProbeResponse {
                status: 200,
                server: Some("ooi/1.4 OCCI/1.1".to_string()),
            }),
        }
    }
}

fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

#[async_trait::async_trait]
impl VersionProbe for FakeNova {
    async fn probe_endpoint_version(&self, _url: &str) -> Result<ProbeResponse, ProbeError> {
        self.probe.clone()
    }
}

#[async_trait::async_trait]
impl NovaSource for FakeNova {
    fn auth_url(&self) -> &str {
        "https://keystone.example.org:5000/v2.0"
    }

    async fn service_catalog(&self) -> Result<Vec<CatalogEntry>, ProviderError> {
        Ok(self.catalog.clone())
    }

    async fn list_flavors(&self, _detailed: bool) -> Result<Vec<Flavor>, ProviderError> {
        Ok(self.flavors.clone())
    }

    async fn list_images(&self, _detailed: bool) -> Result<Vec<ServerImage>, ProviderError> {
        Ok(self.images.clone())
    }

    async fn list_instances(&self) -> Result<Vec<Server>, ProviderError> {
        Ok(self.servers.clone())
    }

    async fn find_image(&self, id: &str) -> Result<ServerImage, ProviderError> {
        self.images
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                kind: "image",
                id: id.to_string(),
            })
    }

    async fn find_flavor(&self, id: &str) -> Result<Flavor, ProviderError> {
        self.flavors
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                kind: "flavor",
                id: id.to_string(),
            })
    }
}

/// OpenNebula pools served from the fixture directory.
pub struct FakeOne {
    pub template_pool: String,
    pub image_pool: String,
    pub document_pool: String,
    pub vm_pool: String,
}

impl FakeOne {
    pub fn new() -> Self {
        Self {
            template_pool: fixture("templatepool.xml"),
            image_pool: fixture("imagepool.xml"),
            document_pool: fixture("documentpool.xml"),
            vm_pool: fixture("vmpool.xml"),
        }
    }
}

#[async_trait::async_trait]
impl OneSource for FakeOne {
    fn endpoint(&self) -> &str {
        "http://one.example.org:2633/RPC2"
    }

    async fn template_pool(&self) -> Result<String, ProviderError> {
        Ok(self.template_pool.clone())
    }

    async fn image_pool(&self) -> Result<String, ProviderError> {
        Ok(self.image_pool.clone())
    }

    async fn document_pool(&self) -> Result<String, ProviderError> {
        Ok(self.document_pool.clone())
    }

    async fn vm_pool(&self) -> Result<String, ProviderError> {
        Ok(self.vm_pool.clone())
    }
}
