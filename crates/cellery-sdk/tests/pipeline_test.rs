//! End-to-end tests of the build and run passes over the bundled samples.
//!
//! Each test copies a sample into its own temporary directory, compiles it
//! through the public exit-code boundary and reads the artifacts back.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cellery_common::constants::{
    ANNOTATION_IMAGE_NAME, ANNOTATION_IMAGE_ORG, ANNOTATION_IMAGE_VERSION, CELLERY_MESH_VERSION,
};
use cellery_common::types::CellImageInfo;
use cellery_manifest::writer::{read_cell_yaml, read_metadata};
use cellery_sdk::pipeline::{self, EXIT_FAILURE, EXIT_SUCCESS};
use tempfile::TempDir;

fn sample(name: &str) -> TempDir {
    let from = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../samples")
        .join(name);
    let dir = tempfile::tempdir().expect("tempdir");
    for entry in std::fs::read_dir(&from).expect("read sample dir") {
        let entry = entry.expect("dir entry");
        let _ = std::fs::copy(entry.path(), dir.path().join(entry.file_name())).expect("copy");
    }
    dir
}

fn build_dir(source: &Path) -> PathBuf {
    source.join("target").join("cellery")
}

fn employee_info() -> CellImageInfo {
    CellImageInfo::new("myorg", "employee", "1.0.0", "emp-inst")
}

fn petservice_info() -> CellImageInfo {
    CellImageInfo::new("myorg", "petservice", "1.0.0", "petsvc-inst")
}

// ── Employee: build ──────────────────────────────────────────────────

#[test]
fn employee_build_manifest() {
    let src = sample("employee");
    assert_eq!(
        pipeline::build(src.path(), "employee.cell", &employee_info()),
        EXIT_SUCCESS
    );

    let cell = read_cell_yaml(&build_dir(src.path()).join("employee.yaml")).expect("yaml");
    assert_eq!(cell.api_version, CELLERY_MESH_VERSION);
    assert_eq!(cell.kind, "Cell");
    assert_eq!(cell.metadata.name, "employee");
    assert_eq!(cell.metadata.annotations[ANNOTATION_IMAGE_ORG], "myorg");
    assert_eq!(cell.metadata.annotations[ANNOTATION_IMAGE_NAME], "employee");
    assert_eq!(cell.metadata.annotations[ANNOTATION_IMAGE_VERSION], "1.0.0");

    let http = &cell.spec.gateway.spec.ingress.http;
    assert_eq!(http[0].destination.host, "employee");
    assert_eq!(http[0].context, "employee");
    assert_eq!(http[0].definitions[0].method, "GET");
    assert_eq!(http[0].definitions[0].path, "/details");
    assert_eq!(http[1].destination.host, "salary");
    assert_eq!(http[1].context, "payroll");
    assert_eq!(http[1].definitions[0].path, "salary");

    let components = &cell.spec.components;
    assert_eq!(components[0].metadata.name, "employee");
    assert_eq!(components[0].metadata.labels["team"], "HR");
    let container = &components[0].spec.template.containers[0];
    assert_eq!(container.env[0].name, "SALARY_HOST");
    assert_eq!(container.env[0].value, "{{instance_name}}--salary-service");
    assert_eq!(container.image, "wso2cellery/sampleapp-employee:0.3.0");
    assert_eq!(container.ports[0].container_port, 8080);
    assert_eq!(components[1].metadata.name, "salary");
    assert_eq!(components[1].metadata.labels["owner"], "Alice");
    assert_eq!(components[1].metadata.labels["team"], "Finance");
    assert_eq!(
        components[1].spec.template.containers[0].ports[0].container_port,
        8080
    );
}

#[test]
fn employee_build_metadata() {
    let src = sample("employee");
    assert_eq!(
        pipeline::build(src.path(), "employee.cell", &employee_info()),
        EXIT_SUCCESS
    );

    let path = build_dir(src.path()).join("metadata.json");
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(raw.as_object().expect("object").len(), 7);

    let meta = read_metadata(&path).expect("metadata");
    assert_eq!(meta.org, "myorg");
    assert_eq!(meta.name, "employee");
    assert_eq!(meta.ver, "1.0.0");
    assert!(!meta.zero_scaling_required);
    assert!(!meta.auto_scaling_required);
    assert_eq!(meta.components.len(), 2);

    let employee = &meta.components["employee"];
    assert_eq!(employee.docker_image, "wso2cellery/sampleapp-employee:0.3.0");
    assert!(!employee.is_docker_push_required);
    assert_eq!(employee.labels.len(), 1);
    assert_eq!(employee.dependencies.components, ["salary"]);
    assert!(employee.dependencies.cells.is_empty());

    let salary = &meta.components["salary"];
    assert_eq!(salary.labels.len(), 2);
    assert!(salary.dependencies.components.is_empty());
    assert!(salary.dependencies.cells.is_empty());
}

// ── Employee: run ────────────────────────────────────────────────────

#[test]
fn employee_run_manifest() {
    let src = sample("employee");
    let out = tempfile::tempdir().expect("tempdir");
    assert_eq!(
        pipeline::run(
            src.path(),
            "employee.cell",
            &employee_info(),
            &BTreeMap::new(),
            out.path()
        ),
        EXIT_SUCCESS
    );

    let yaml = out
        .path()
        .join("artifacts")
        .join("cellery")
        .join("employee.yaml");
    let cell = read_cell_yaml(&yaml).expect("yaml");
    assert_eq!(cell.api_version, CELLERY_MESH_VERSION);
    assert_eq!(cell.metadata.name, "emp-inst");
    assert_eq!(cell.metadata.annotations[ANNOTATION_IMAGE_NAME], "employee");

    let http = &cell.spec.gateway.spec.ingress.http;
    assert_eq!(http[0].destination.host, "employee");
    assert_eq!(http[1].destination.host, "salary");

    let components = &cell.spec.components;
    assert_eq!(components[0].metadata.name, "emp-inst");
    assert_eq!(components[0].metadata.labels["team"], "HR");
    let container = &components[0].spec.template.containers[0];
    assert_eq!(container.env[0].value, "emp-inst--salary-service");
    assert_eq!(container.image, "wso2cellery/sampleapp-employee:0.3.0");
    assert_eq!(components[1].metadata.name, "salary");
}

#[test]
fn build_and_run_metadata_agree() {
    let src = sample("employee");
    let out = tempfile::tempdir().expect("tempdir");
    let built = pipeline::build_artifacts(src.path(), "employee.cell", &employee_info())
        .expect("build");
    let ran = pipeline::run_artifacts(
        src.path(),
        "employee.cell",
        &employee_info(),
        &BTreeMap::new(),
        out.path(),
    )
    .expect("run");
    assert_eq!(
        std::fs::read_to_string(built.metadata_path).expect("read"),
        std::fs::read_to_string(ran.metadata_path).expect("read")
    );
}

#[test]
fn rebuild_is_byte_identical() {
    let src = sample("employee");
    let first = pipeline::build_artifacts(src.path(), "employee.cell", &employee_info())
        .expect("build");
    let manifest = std::fs::read(&first.manifest_path).expect("read");
    let metadata = std::fs::read(&first.metadata_path).expect("read");

    let second = pipeline::build_artifacts(src.path(), "employee.cell", &employee_info())
        .expect("rebuild");
    assert_eq!(std::fs::read(second.manifest_path).expect("read"), manifest);
    assert_eq!(std::fs::read(second.metadata_path).expect("read"), metadata);
}

// ── Pet service: build ───────────────────────────────────────────────

#[test]
fn petservice_build_scaling_policies() {
    let src = sample("pet-service");
    assert_eq!(
        pipeline::build(src.path(), "pet-cell.cell", &petservice_info()),
        EXIT_SUCCESS
    );

    let cell = read_cell_yaml(&build_dir(src.path()).join("petservice.yaml")).expect("yaml");
    assert_eq!(cell.kind, "Cell");
    assert_eq!(cell.metadata.name, "petservice");
    assert_eq!(cell.spec.gateway.spec.ingress.http[0].context, "petsvc");

    let debug = &cell.spec.components[0];
    assert_eq!(debug.metadata.name, "debug");
    assert_eq!(
        debug.spec.template.containers[0].image,
        "docker.io/mirage20/k8s-debug-tools"
    );
    assert!(debug.spec.template.containers[0].ports.is_empty());
    let policy = debug.spec.scaling_policy.as_ref().expect("policy");
    assert!(policy.overridable);
    let hpa = policy.hpa.as_ref().expect("hpa");
    assert_eq!(hpa.max_replicas, 10);
    assert_eq!(hpa.min_replicas, 1);
    assert_eq!(hpa.metrics[0].metric_type, "Resource");
    assert_eq!(hpa.metrics[0].resource.name, "cpu");
    assert_eq!(
        hpa.metrics[0].resource.target.average_value.as_deref(),
        Some("500m")
    );
    assert_eq!(hpa.metrics[1].resource.name, "memory");
    assert_eq!(hpa.metrics[1].resource.target.average_utilization, Some(50));

    let pet = &cell.spec.components[1];
    assert_eq!(pet.metadata.name, "pet-service");
    assert_eq!(
        pet.spec.template.containers[0].image,
        "docker.io/isurulucky/pet-service"
    );
    assert_eq!(pet.spec.template.containers[0].ports[0].container_port, 9090);
    let policy = pet.spec.scaling_policy.as_ref().expect("policy");
    assert!(!policy.overridable);
    let kpa = policy.kpa.as_ref().expect("kpa");
    assert_eq!(kpa.max_replicas, 10);
    assert_eq!(kpa.concurrency, 25);
    assert_eq!(kpa.min_replicas, 0);

    let meta = read_metadata(&build_dir(src.path()).join("metadata.json")).expect("metadata");
    assert!(meta.zero_scaling_required);
    assert!(meta.auto_scaling_required);
}

// ── Failures ─────────────────────────────────────────────────────────

#[test]
fn invalid_source_leaves_no_artifacts() {
    let src = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        src.path().join("broken.cell"),
        r#"
COMPONENT a { image = "a" INGRESS api { GET "/" } }
COMPONENT b { image = "b" INGRESS api { GET "/" } }
"#,
    )
    .expect("write");

    let info = CellImageInfo::new("myorg", "broken", "1.0.0", "broken-inst");
    assert_eq!(
        pipeline::build(src.path(), "broken.cell", &info),
        EXIT_FAILURE
    );
    assert!(!src.path().join("target").exists());
}

#[test]
fn run_without_dependency_instance_fails() {
    let src = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        src.path().join("portal.cell"),
        r#"
COMPONENT portal {
    image = "myorg/portal:1.0.0"
    env = { EMPLOYEE_HOST = host(hr) }
    DEPENDS CELL hr = "myorg/employee:1.0.0"
}
"#,
    )
    .expect("write");
    let info = CellImageInfo::new("myorg", "portal", "1.0.0", "portal-inst");

    assert_eq!(
        pipeline::build(src.path(), "portal.cell", &info),
        EXIT_SUCCESS
    );
    assert_eq!(
        pipeline::run(src.path(), "portal.cell", &info, &BTreeMap::new(), out.path()),
        EXIT_FAILURE
    );
    assert!(!out.path().join("artifacts").exists());

    let mut deps = BTreeMap::new();
    let _ = deps.insert("hr".to_owned(), employee_info());
    let artifacts =
        pipeline::run_artifacts(src.path(), "portal.cell", &info, &deps, out.path()).expect("run");
    let cell = read_cell_yaml(&artifacts.manifest_path).expect("yaml");
    assert_eq!(cell.metadata.name, "portal-inst");
    assert_eq!(
        cell.spec.components[0].spec.template.containers[0].env[0].value,
        "emp-inst--gateway-service"
    );
}
