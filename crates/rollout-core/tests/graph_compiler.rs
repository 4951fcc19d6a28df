use rollout_core::graph::{compile, compile_desired_state, ProviderContext, RenderOptions};
use rollout_core::model::{DesiredState, ImageReference, NetworkAttachment, PoolRole, ResourceDeclaration, ResourceRef,
                          ScaleGroupDescriptor};
use rollout_core::GraphError;
use serde_json::json;

const LB: &str = "Microsoft.Network/loadBalancers";
const VNET: &str = "Microsoft.Network/virtualNetworks";
const NSG: &str = "Microsoft.Network/networkSecurityGroups";
const IP: &str = "Microsoft.Network/publicIPAddresses";

fn ctx() -> ProviderContext { ProviderContext::new("sub", "rg") }

fn id(resource_type: &str, name: &str) -> String { ctx().resource_id(resource_type, name).unwrap() }

#[test]
fn chain_dependencies_are_resolved_without_self_edges() {
    // A = public ip, B = load balancer embedding A's id,
    // C = nsg embedding a sub-resource id of B.
    let a = ResourceDeclaration::new(IP, "ip-a", json!({"publicIPAllocationMethod": "Static"}));
    let b = ResourceDeclaration::new(LB,
                                     "lb-b",
                                     json!({"frontendIPConfigurations": [{
                                         "name": "fe",
                                         "properties": {"publicIPAddress": {"id": id(IP, "ip-a")}}
                                     }],
                                     "self": id(LB, "lb-b")}));
    let c = ResourceDeclaration::new(NSG,
                                     "nsg-c",
                                     json!({"note": format!("{}/backendAddressPools/pool", id(LB, "lb-b"))}));

    let graph = compile(&ctx(), vec![a, b, c]).expect("graph should compile");
    let deps = |t: &str, n: &str| graph.find(t, n).unwrap().depends_on.iter().cloned().collect::<Vec<_>>();

    assert!(deps(IP, "ip-a").is_empty());
    assert_eq!(deps(LB, "lb-b"), vec![id(IP, "ip-a")]);
    assert_eq!(deps(NSG, "nsg-c"), vec![id(LB, "lb-b")]);
    for node in graph.nodes() {
        assert!(!node.depends_on.contains(&node.id), "{} depends on itself", node.id);
    }
}

#[test]
fn external_and_malformed_references_are_ignored() {
    let lb = ResourceDeclaration::new(LB,
                                      "lb",
                                      json!({"a": "/subscriptions/other/resourceGroups/x/providers/Microsoft.Network/publicIPAddresses/ip",
                                             "b": "/subscriptions/sub/resourceGroups",
                                             "c": "not an id"}));
    let graph = compile(&ctx(), vec![lb]).unwrap();
    assert!(graph.nodes().all(|n| n.depends_on.is_empty()));
    let doc = graph.to_document();
    assert!(doc["resources"][0].get("dependsOn").is_none());
}

#[test]
fn child_resources_depend_on_their_parent() {
    let vnet = ResourceDeclaration::new(VNET, "vnet", json!({"addressSpace": {"addressPrefixes": ["10.0.0.0/8"]}}));
    let subnet = ResourceDeclaration::new("Microsoft.Network/virtualNetworks/subnets",
                                          "vnet/default",
                                          json!({"addressPrefix": "10.0.0.0/24"}));
    let graph = compile(&ctx(), vec![subnet, vnet]).unwrap();
    let child = graph.find("Microsoft.Network/virtualNetworks/subnets", "vnet/default").unwrap();
    assert_eq!(child.depends_on.iter().next().unwrap(), &id(VNET, "vnet"));

    let order: Vec<&str> = graph.topological_order().unwrap().iter().map(|n| n.name()).collect();
    assert_eq!(order, vec!["vnet", "vnet/default"]);
}

#[test]
fn explicit_dependencies_merge_and_must_exist() {
    let ip = ResourceDeclaration::new(IP, "ip", json!({}));
    let nsg = ResourceDeclaration::new(NSG, "nsg", json!({})).depends_on(ResourceRef::new(IP, "ip"));
    let graph = compile(&ctx(), vec![ip.clone(), nsg]).unwrap();
    assert!(graph.find(NSG, "nsg").unwrap().depends_on.contains(&id(IP, "ip")));

    let dangling = ResourceDeclaration::new(NSG, "nsg", json!({})).depends_on(ResourceRef::new(IP, "missing"));
    let err = compile(&ctx(), vec![ip, dangling]).unwrap_err();
    assert!(matches!(err, GraphError::UnknownDependency { ref dependency, .. } if dependency == &id(IP, "missing")));
}

#[test]
fn unknown_types_duplicates_and_cycles_are_fatal() {
    let web = ResourceDeclaration::new("Microsoft.Web/sites", "site", json!({}));
    assert_eq!(compile(&ctx(), vec![web]).unwrap_err(),
               GraphError::UnknownResourceType("Microsoft.Web/sites".into()));

    let dup = ResourceDeclaration::new(IP, "ip", json!({}));
    assert!(matches!(compile(&ctx(), vec![dup.clone(), dup]), Err(GraphError::DuplicateResource(_))));

    let a = ResourceDeclaration::new(IP, "a", json!({"peer": id(NSG, "b")}));
    let b = ResourceDeclaration::new(NSG, "b", json!({"peer": id(IP, "a")}));
    assert!(matches!(compile(&ctx(), vec![a, b]), Err(GraphError::DependencyCycle(_))));
}

fn desired() -> DesiredState {
    let subnet = id("Microsoft.Network/virtualNetworks/subnets", "vnet/default");
    let pool = |name: &str, role: PoolRole, count: u32| ScaleGroupDescriptor {
        name: name.into(),
        role,
        count,
        vm_size: "Standard_D4s_v3".into(),
        image: ImageReference { publisher: "redhat".into(), offer: "osa".into(), sku: "osa_311".into(), version: "1".into() },
        startup_payload: format!("start {name}"),
        network: NetworkAttachment { subnet_id: subnet.clone(), load_balancer_backend_pools: vec![] },
        tags: Default::default(),
    };
    DesiredState { subscription_id: "sub".into(),
                   resource_group: "rg".into(),
                   location: "eastus".into(),
                   public_hostname: "api.example.com".into(),
                   ca_bundle: None,
                   pools: vec![pool("compute", PoolRole::Compute, 2), pool("master", PoolRole::ControlPlane, 3)],
                   resources: vec![ResourceDeclaration::new(VNET, "vnet", json!({})),
                                   ResourceDeclaration::new("Microsoft.Network/virtualNetworks/subnets", "vnet/default", json!({}))] }
}

#[test]
fn desired_state_document_has_template_shell_and_scale_sets() {
    let graph = compile_desired_state(&desired(), &RenderOptions::default()).unwrap();
    let doc = graph.to_document();
    assert_eq!(doc["contentVersion"], "1.0.0.0");
    assert!(doc["$schema"].as_str().unwrap().ends_with("deploymentTemplate.json#"));
    let resources = doc["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 4);

    let master = resources.iter().find(|r| r["name"] == "ss-master").unwrap();
    assert_eq!(master["apiVersion"], "2017-12-01");
    assert_eq!(master["sku"]["capacity"], 3);
    assert_eq!(master["tags"]["role"], "master");
    // subnet id is trimmed to the vnet
    assert_eq!(master["dependsOn"], json!([id(VNET, "vnet")]));
}

#[test]
fn restore_backup_only_touches_control_plane_custom_data() {
    let state = desired();
    let normal = compile_desired_state(&state, &RenderOptions::default()).unwrap();
    let restore = compile_desired_state(&state, &RenderOptions { restore_backup: Some("backup-1") }).unwrap();
    let custom = |g: &rollout_core::DeploymentGraph, ss: &str| {
        g.find("Microsoft.Compute/virtualMachineScaleSets", ss).unwrap().declaration.properties["virtualMachineProfile"]
            ["osProfile"]["customData"]
            .as_str()
            .unwrap()
            .to_string()
    };
    assert!(custom(&restore, "ss-master").contains("RESTORE_FROM_BACKUP=backup-1"));
    assert_eq!(custom(&normal, "ss-compute"), custom(&restore, "ss-compute"));
}
