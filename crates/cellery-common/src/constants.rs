//! Mesh identifiers, naming conventions, and default artifact paths.

/// API version stamped on every emitted cell manifest.
pub const CELLERY_MESH_VERSION: &str = "mesh.cellery.io/v1alpha1";

/// Kind of the emitted manifest document.
pub const CELL_KIND: &str = "Cell";

/// Annotation carrying the cell image organization.
pub const ANNOTATION_IMAGE_ORG: &str = "mesh.cellery.io/cell-image-org";
/// Annotation carrying the cell image name.
pub const ANNOTATION_IMAGE_NAME: &str = "mesh.cellery.io/cell-image-name";
/// Annotation carrying the cell image version.
pub const ANNOTATION_IMAGE_VERSION: &str = "mesh.cellery.io/cell-image-version";

/// Template token replaced by the cell instance name at run time.
pub const INSTANCE_NAME_TOKEN: &str = "{{instance_name}}";
/// Placeholder name inside [`INSTANCE_NAME_TOKEN`].
pub const INSTANCE_NAME_PLACEHOLDER: &str = "instance_name";

/// Separator between an instance name and a service name.
pub const INSTANCE_SEPARATOR: &str = "--";
/// Suffix appended to a component name to form its service host.
pub const SERVICE_SUFFIX: &str = "-service";
/// Service name of a cell's gateway, used for cross-cell hosts.
pub const GATEWAY_SERVICE: &str = "gateway-service";

/// HPA metric type for resource metrics.
pub const METRIC_TYPE_RESOURCE: &str = "Resource";
/// CPU resource metric name.
pub const AUTO_SCALING_METRIC_RESOURCE_CPU: &str = "cpu";
/// Memory resource metric name.
pub const AUTO_SCALING_METRIC_RESOURCE_MEMORY: &str = "memory";

/// HTTP methods accepted in API definitions.
pub const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// File extension for cell source files.
pub const CELL_EXTENSION: &str = ".cell";
/// Extension of the emitted manifest file.
pub const YAML_EXTENSION: &str = ".yaml";
/// File name of the emitted metadata document.
pub const METADATA_FILE: &str = "metadata.json";

/// Build-mode output directory, relative to the source directory.
pub const DEFAULT_TARGET_DIR: &str = "target";
/// Run-mode output directory, relative to the caller's output directory.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
/// Sub-directory holding the cell artifacts in both modes.
pub const DEFAULT_CELLERY_DIR: &str = "cellery";

/// Maximum length of a DNS-1123 label or a label key name segment.
pub const MAX_NAME_LENGTH: usize = 63;
/// Maximum length of a DNS-1123 subdomain used as a label key prefix.
pub const MAX_PREFIX_LENGTH: usize = 253;
