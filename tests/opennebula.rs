mod common;

use pretty_assertions::assert_eq;
use std::fs;

use cloud_info::cloud::ApiType;
use cloud_info::providers::{OneVariant, OpenNebulaOptions, OpenNebulaProvider};
use cloud_info::{Provider, ProviderError, StaticProvider, collect};
use common::{FakeOne, fixture, fixture_path};

const NAMESPACE: &str = "http://occi.one.example.org/occi/infrastructure/";

fn options() -> OpenNebulaOptions {
    OpenNebulaOptions {
        auth: Some("oneadmin:opennebula".to_string()),
        rpcxml_endpoint: Some("http://one.example.org:2633/RPC2".to_string()),
        ..Default::default()
    }
}

fn provider(variant: OneVariant, options: &OpenNebulaOptions) -> OpenNebulaProvider<FakeOne> {
    let static_defaults = StaticProvider::from_json_str(&fixture("static.json")).unwrap();
    OpenNebulaProvider::with_source(variant, FakeOne::new(), static_defaults, options).unwrap()
}

#[tokio::test]
async fn images_come_from_vm_templates() {
    let images = provider(OneVariant::OpenNebula, &options()).get_images().await.unwrap();
    assert_eq!(images.keys().collect::<Vec<_>>(), vec!["4", "5", "6"]);

    let centos = &images["4"];
    assert_eq!(centos.image_id, format!("{NAMESPACE}os_tpl#uuid_centos_7_4"));
    assert_eq!(centos.image_native_id, "4");
    assert_eq!(centos.image_name.as_deref(), Some("CentOS 7"));
    assert_eq!(
        centos.image_marketplace_id.as_deref(),
        Some("https://appdb.egi.eu/store/vo/image/centos7/")
    );
    assert_eq!(centos.image_description.as_deref(), Some("CentOS 7 EGI"));
    assert_eq!(centos.image_version.as_deref(), Some("2018.05.14"));
    assert_eq!(centos.image_os_name.as_deref(), Some("CentOS"));
    assert_eq!(centos.image_os_version.as_deref(), Some("7"));
    assert_eq!(centos.image_os_family.as_deref(), Some("linux"));
    assert_eq!(centos.image_platform, "x86_64");
    assert!(centos.extensions.contains_key("cloudkeeper_appliance_title"));
    assert!(!centos.extensions.contains_key("memory"));

    let ubuntu = &images["5"];
    assert_eq!(ubuntu.image_description.as_deref(), Some("Ubuntu 16.04 LTS"));
    assert_eq!(ubuntu.image_version.as_deref(), Some("16.04.3"));
    assert_eq!(ubuntu.image_platform, "amd64");

    assert_eq!(images["6"].image_marketplace_id, None);
}

#[tokio::test]
async fn cloudkeeper_images_only_keeps_registered_templates() {
    let options = OpenNebulaOptions {
        cloudkeeper_images: true,
        ..options()
    };
    let images = provider(OneVariant::OpenNebula, &options).get_images().await.unwrap();
    assert_eq!(images.keys().collect::<Vec<_>>(), vec!["4"]);
}

#[tokio::test]
async fn plain_opennebula_publishes_no_templates() {
    let templates = provider(OneVariant::OpenNebula, &options()).get_templates().await.unwrap();
    assert!(templates.is_empty());
}

#[tokio::test]
async fn rocci_local_templates() {
    let options = OpenNebulaOptions {
        rocci_template_dir: Some(fixture_path("rocci")),
        ..options()
    };
    let templates = provider(OneVariant::Rocci, &options).get_templates().await.unwrap();
    assert_eq!(templates.len(), 2);

    let small = &templates["http://fedcloud.egi.eu/occi/infrastructure/resource_tpl#small"];
    assert_eq!(small.template_native_id, "small");
    assert_eq!(small.template_cpu, Some(1));
    assert_eq!(small.template_memory, Some(2048));
    assert_eq!(small.template_platform, "amd64");
    assert_eq!(small.template_network, "public");
}

#[tokio::test]
async fn rocci_local_templates_read_every_json_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::copy(fixture_path("rocci/resource_tpls.json"), dir.path().join("a.json")).unwrap();
    fs::write(
        dir.path().join("b.json"),
        r#"{"resource_tpl": [{"term": "huge", "scheme": "http://example.org/tpl#",
            "attributes": {"occi": {"compute": {"cores": {"Default": 32}}}}}]}"#,
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let options = OpenNebulaOptions {
        rocci_template_dir: Some(dir.path().to_path_buf()),
        ..options()
    };
    let templates = provider(OneVariant::Rocci, &options).get_templates().await.unwrap();
    assert_eq!(templates.len(), 3);
    let huge = &templates["http://example.org/tpl#huge"];
    assert_eq!(huge.template_cpu, Some(32));
    assert_eq!(huge.template_memory, None);
}

#[tokio::test]
async fn rocci_remote_templates() {
    let options = OpenNebulaOptions {
        rocci_remote_templates: true,
        ..options()
    };
    let templates = provider(OneVariant::Rocci, &options).get_templates().await.unwrap();
    assert_eq!(templates.len(), 2);

    let small = &templates["http://fedcloud.egi.eu/occi/compute/flavour/1.0#small_instance"];
    assert_eq!(small.template_cpu, Some(1));
    assert_eq!(small.template_memory, Some(2048));

    let large = &templates["http://fedcloud.egi.eu/occi/compute/flavour/1.0#large_instance"];
    assert_eq!(large.template_cpu, Some(4));
    assert_eq!(large.template_native_id, "2");
}

#[tokio::test]
async fn rocci_without_template_source_is_a_config_error() {
    let result = OpenNebulaProvider::with_source(OneVariant::Rocci, FakeOne::new(), StaticProvider::empty(), &options());
    assert!(matches!(result, Err(ProviderError::Config(_))));
}

#[tokio::test]
async fn indigo_templates_take_disk_size_from_the_image_pool() {
    let templates = provider(OneVariant::Indigo, &options()).get_templates().await.unwrap();
    assert_eq!(templates.len(), 3);

    let centos = &templates[&format!("{NAMESPACE}resource_tpl#uuid_centos_7_4")];
    assert_eq!(centos.template_native_id, "4");
    assert_eq!(centos.template_cpu, Some(2));
    assert_eq!(centos.template_memory, Some(2048));
    assert_eq!(centos.template_disk, Some(10));

    let ubuntu = &templates[&format!("{NAMESPACE}resource_tpl#uuid_ubuntu_16-04_5")];
    assert_eq!(ubuntu.template_cpu, Some(1));
    assert_eq!(ubuntu.template_disk, Some(3));

    let scratch = &templates[&format!("{NAMESPACE}resource_tpl#uuid_scratch_6")];
    assert_eq!(scratch.template_disk, None);
}

#[tokio::test]
async fn endpoints_come_from_the_static_catalog() {
    let endpoints = provider(OneVariant::OpenNebula, &options())
        .get_compute_endpoints()
        .await
        .unwrap();
    assert_eq!(endpoints.keys().collect::<Vec<_>>(), vec!["rocci-1"]);

    let rocci = &endpoints["rocci-1"];
    assert_eq!(rocci.compute_api_type, ApiType::Occi);
    assert_eq!(rocci.compute_middleware, "rOCCI-server");
    assert_eq!(rocci.compute_middleware_developer, "EGI");
    assert_eq!(rocci.compute_api_version, "1.1");
    assert_eq!(rocci.compute_middleware_version, "UNKNOWN");
    assert_eq!(rocci.compute_endpoint_url, "https://rocci.example.org:11443");
    assert_eq!(
        rocci.extensions.get_str("compute_service_name").as_deref(),
        Some("http://one.example.org:2633/RPC2")
    );
    assert_eq!(
        rocci.extensions.get_str("endpoint_production_level").as_deref(),
        Some("production")
    );
}

#[tokio::test]
async fn instances_resolve_pool_references() {
    let instances = provider(OneVariant::OpenNebula, &options())
        .get_instances()
        .await
        .unwrap();

    let web = &instances["20"];
    assert_eq!(web.instance_name, "web");
    assert_eq!(web.instance_status, "ACTIVE");
    assert_eq!(web.instance_image_name.as_deref(), Some("centos7-disk"));
    assert_eq!(web.instance_template_name.as_deref(), Some("CentOS 7"));

    assert_eq!(instances["21"].instance_status, "POWEROFF");
}

#[tokio::test]
async fn instance_with_dangling_template_fails_the_call() {
    let mut one = FakeOne::new();
    one.vm_pool = "<VM_POOL><VM><ID>30</ID><NAME>lost</NAME><STATE>3</STATE>\
        <TEMPLATE><TEMPLATE_ID>77</TEMPLATE_ID></TEMPLATE></VM></VM_POOL>"
        .to_string();
    let provider =
        OpenNebulaProvider::with_source(OneVariant::OpenNebula, one, StaticProvider::empty(), &options()).unwrap();

    let err = provider.get_instances().await.unwrap_err();
    assert!(matches!(err, ProviderError::NotFound { kind: "template", .. }));
}

#[tokio::test]
async fn shares_are_static() {
    let shares = provider(OneVariant::OpenNebula, &options()).get_compute_shares().await.unwrap();
    assert_eq!(shares["ops"].get_u64("instances_max"), Some(10));
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let provider = provider(OneVariant::Indigo, &options());
    let first = serde_json::to_string(&collect(&provider).await.unwrap()).unwrap();
    let second = serde_json::to_string(&collect(&provider).await.unwrap()).unwrap();
    assert_eq!(first, second);
}
