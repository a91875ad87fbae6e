//! Validation checks for a generated cluster configuration.
//!
//! Each check re-queries the full document collection and never mutates it,
//! so checks are independent of each other and of evaluation order.
//!
//! | Check | Invariant |
//! |-------|-----------|
//! | `k8s-as-cloud-service` | the single `epiphany-cluster` enables `cloud.k8s_as_cloud_service` |
//! | `virtual-machine-assignments` | enabled components list `count` known machines |
//! | `component-configs` | every enabled component has one `configuration/<name>` document |
//! | `local-image-registry` | no application uses the local image registry |
//! | `provider-defined` | every document carries the expected `provider` |

pub mod report;

pub use report::{CheckOutcome, Outcome, Report};

use crate::document::node::YamlValue;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::query::{by_kind, select_many, select_one};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

/// Kind of the cluster specification document.
pub const CLUSTER_KIND: &str = "epiphany-cluster";
/// Kind of the per-node documents.
pub const MACHINE_KIND: &str = "infrastructure/machine";
/// Kind of the application configuration document.
pub const APPLICATIONS_KIND: &str = "configuration/applications";

/// Parameters that vary between deployment scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Value every document's `provider` must have
    pub expected_provider: String,
    /// Stop at the first check that does not pass
    pub fail_fast: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            expected_provider: "any".to_string(),
            fail_fast: true,
        }
    }
}

/// Result of a check that could be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// The invariant does not hold; each reason names what broke it
    Fail(Vec<String>),
}

impl Verdict {
    fn from_reasons(reasons: Vec<String>) -> Self {
        if reasons.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail(reasons)
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// The validation checks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Check {
    K8sAsCloudService,
    VirtualMachineAssignments,
    ComponentConfigs,
    LocalImageRegistry,
    ProviderDefined,
}

impl Check {
    pub const ALL: [Check; 5] = [
        Check::K8sAsCloudService,
        Check::VirtualMachineAssignments,
        Check::ComponentConfigs,
        Check::LocalImageRegistry,
        Check::ProviderDefined,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Check::K8sAsCloudService => "k8s-as-cloud-service",
            Check::VirtualMachineAssignments => "virtual-machine-assignments",
            Check::ComponentConfigs => "component-configs",
            Check::LocalImageRegistry => "local-image-registry",
            Check::ProviderDefined => "provider-defined",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Check::K8sAsCloudService => "managed Kubernetes handling is enabled",
            Check::VirtualMachineAssignments => "each component gets all required machines",
            Check::ComponentConfigs => "each enabled component has its configuration document",
            Check::LocalImageRegistry => "the internal image registry is not used",
            Check::ProviderDefined => "every document defines the expected provider",
        }
    }

    pub fn evaluate(&self, documents: &[Document], settings: &Settings) -> Result<Verdict> {
        match self {
            Check::K8sAsCloudService => check_k8s_as_cloud_service(documents),
            Check::VirtualMachineAssignments => check_virtual_machine_assignments(documents),
            Check::ComponentConfigs => check_component_configs(documents),
            Check::LocalImageRegistry => check_local_image_registry(documents),
            Check::ProviderDefined => check_provider(documents, &settings.expected_provider),
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Evaluates every check and collects the outcomes.
///
/// With `settings.fail_fast`, checks after the first failure or error are
/// reported as skipped.
pub fn run_checks(documents: &[Document], settings: &Settings) -> Report {
    let mut outcomes = Vec::with_capacity(Check::ALL.len());
    let mut stopped = false;

    for check in Check::ALL {
        if stopped {
            outcomes.push(CheckOutcome::new(check, Outcome::Skipped));
            continue;
        }

        let outcome = match check.evaluate(documents, settings) {
            Ok(Verdict::Pass) => {
                info!(check = check.name(), "check passed");
                Outcome::Passed
            }
            Ok(Verdict::Fail(reasons)) => {
                warn!(check = check.name(), reasons = ?reasons, "check failed");
                Outcome::Failed { reasons }
            }
            Err(err) => {
                warn!(check = check.name(), error = %err, "check could not be evaluated");
                Outcome::Errored {
                    message: err.to_string(),
                }
            }
        };

        stopped = settings.fail_fast && !matches!(outcome, Outcome::Passed);
        outcomes.push(CheckOutcome::new(check, outcome));
    }

    Report::new(outcomes)
}

/// Managed Kubernetes handling must be enabled.
pub fn k8s_as_cloud_service(documents: &[Document]) -> Result<bool> {
    check_k8s_as_cloud_service(documents).map(|v| v.passed())
}

/// Each enabled component must list `count` known machines.
pub fn virtual_machine_assignments(documents: &[Document]) -> Result<bool> {
    check_virtual_machine_assignments(documents).map(|v| v.passed())
}

/// Each enabled component must have exactly one configuration document.
pub fn component_configs_present(documents: &[Document]) -> Result<bool> {
    check_component_configs(documents).map(|v| v.passed())
}

/// No application may use the local image registry.
pub fn local_image_registry_disabled(documents: &[Document]) -> Result<bool> {
    check_local_image_registry(documents).map(|v| v.passed())
}

/// Every document must carry `provider: <expected>`.
pub fn provider_defined(documents: &[Document], expected: &str) -> Result<bool> {
    check_provider(documents, expected).map(|v| v.passed())
}

fn check_k8s_as_cloud_service(documents: &[Document]) -> Result<Verdict> {
    let cluster = select_one(documents, &by_kind(CLUSTER_KIND))?;
    let flag = cluster.require(&["specification", "cloud", "k8s_as_cloud_service"])?;

    let reasons = match flag {
        YamlValue::Boolean(true) => vec![],
        other => vec![format!(
            "{}: specification.cloud.k8s_as_cloud_service is {}, expected boolean true",
            cluster.label(),
            describe_value(other)
        )],
    };
    Ok(Verdict::from_reasons(reasons))
}

fn check_virtual_machine_assignments(documents: &[Document]) -> Result<Verdict> {
    let cluster = select_one(documents, &by_kind(CLUSTER_KIND))?;

    let mut machine_names = HashSet::new();
    for machine in select_many(documents, &by_kind(MACHINE_KIND)) {
        let name = machine.require(&["name"])?;
        let name = name.scalar_text().ok_or_else(|| {
            Error::type_mismatch(format!("{} name", machine.label()), "scalar", name.type_name())
        })?;
        machine_names.insert(name);
    }

    let mut reasons = Vec::new();
    for component in enabled_components(cluster)? {
        let machines = component.machines(cluster)?;

        if machines.len() as i64 != component.count {
            reasons.push(format!(
                "component `{}` declares count {} but lists {} machine(s)",
                component.key,
                component.count,
                machines.len()
            ));
        }

        for name in machines {
            let text = name.scalar_text().unwrap_or_else(|| describe_value(name));
            if !machine_names.contains(&text) {
                reasons.push(format!(
                    "component `{}` references unknown machine `{}`",
                    component.key, text
                ));
            }
        }
    }

    Ok(Verdict::from_reasons(reasons))
}

fn check_component_configs(documents: &[Document]) -> Result<Verdict> {
    let cluster = select_one(documents, &by_kind(CLUSTER_KIND))?;

    let mut reasons = Vec::new();
    for component in enabled_components(cluster)? {
        let kind = format!("configuration/{}", component.key);
        let found = select_many(documents, &by_kind(kind.as_str())).len();
        if found != 1 {
            reasons.push(format!(
                "enabled component `{}` needs exactly one `{}` document, found {}",
                component.key, kind, found
            ));
        }
    }

    Ok(Verdict::from_reasons(reasons))
}

fn check_local_image_registry(documents: &[Document]) -> Result<Verdict> {
    let applications = select_one(documents, &by_kind(APPLICATIONS_KIND))?;
    let list = applications.require(&["specification", "applications"])?;
    let list = list.as_sequence().ok_or_else(|| {
        Error::type_mismatch(
            format!("{} specification.applications", applications.label()),
            "sequence",
            list.type_name(),
        )
    })?;

    let mut reasons = Vec::new();
    for (idx, item) in list.iter().enumerate() {
        let name = item
            .get("name")
            .and_then(YamlValue::scalar_text)
            .unwrap_or_else(|| format!("#{}", idx));
        match item.get("use_local_image_registry") {
            Some(YamlValue::Boolean(false)) => {}
            Some(other) => reasons.push(format!(
                "application `{}` has use_local_image_registry {}, expected boolean false",
                name,
                describe_value(other)
            )),
            None => {
                return Err(Error::missing_field(
                    applications.label(),
                    format!("specification.applications[{}].use_local_image_registry", idx),
                ))
            }
        }
    }

    Ok(Verdict::from_reasons(reasons))
}

fn check_provider(documents: &[Document], expected: &str) -> Result<Verdict> {
    let reasons = documents
        .iter()
        .filter_map(|doc| match doc.get("provider") {
            Some(YamlValue::String(p)) if p == expected => None,
            Some(other) => Some(format!(
                "{} has provider {}, expected {:?}",
                doc.label(),
                describe_value(other),
                expected
            )),
            None => Some(format!("{} has no provider", doc.label())),
        })
        .collect();

    Ok(Verdict::from_reasons(reasons))
}

/// An entry of `specification.components` with a positive `count`.
struct Component<'a> {
    key: &'a str,
    count: i64,
    value: &'a YamlValue,
}

impl<'a> Component<'a> {
    fn machines(&self, cluster: &Document) -> Result<&'a [YamlValue]> {
        let machines = self.value.get("machines").ok_or_else(|| {
            Error::missing_field(
                cluster.label(),
                format!("specification.components.{}.machines", self.key),
            )
        })?;
        machines.as_sequence().ok_or_else(|| {
            Error::type_mismatch(
                format!("specification.components.{}.machines", self.key),
                "sequence",
                machines.type_name(),
            )
        })
    }
}

fn enabled_components(cluster: &Document) -> Result<Vec<Component<'_>>> {
    let components = cluster.require(&["specification", "components"])?;
    let components = components.as_mapping().ok_or_else(|| {
        Error::type_mismatch(
            "specification.components",
            "mapping",
            components.type_name(),
        )
    })?;

    let mut enabled = Vec::new();
    for (key, value) in components {
        let count = value.get("count").ok_or_else(|| {
            Error::missing_field(
                cluster.label(),
                format!("specification.components.{}.count", key),
            )
        })?;
        let count = count.coerce_integer().ok_or_else(|| {
            Error::type_mismatch(
                format!("specification.components.{}.count", key),
                "integer",
                count.type_name(),
            )
        })?;
        if count > 0 {
            enabled.push(Component {
                key: key.as_str(),
                count,
                value,
            });
        }
    }
    Ok(enabled)
}

fn describe_value(value: &YamlValue) -> String {
    match value {
        YamlValue::String(s) => format!("{:?}", s),
        other => other
            .scalar_text()
            .unwrap_or_else(|| format!("a {}", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parser::load_documents;

    const MINIMAL: &str = "---
kind: epiphany-cluster
provider: any
specification:
  cloud:
    k8s_as_cloud_service: true
  components:
    postgresql:
      count: '2'
      machines: [vm-0, vm-1]
    kafka:
      count: 0
---
kind: infrastructure/machine
provider: any
name: vm-0
---
kind: infrastructure/machine
provider: any
name: vm-1
---
kind: configuration/postgresql
provider: any
---
kind: configuration/applications
provider: any
specification:
  applications:
    - name: auth-service
      use_local_image_registry: false
";

    fn docs(yaml: &str) -> Vec<Document> {
        load_documents(yaml, "test").unwrap()
    }

    #[test]
    fn test_all_checks_pass_on_minimal_stream() {
        let report = run_checks(&docs(MINIMAL), &Settings::default());
        assert!(report.passed(), "{}", report);
    }

    #[test]
    fn test_string_flag_is_not_true() {
        let yaml = MINIMAL.replace("k8s_as_cloud_service: true", "k8s_as_cloud_service: 'true'");
        let verdict = Check::K8sAsCloudService
            .evaluate(&docs(&yaml), &Settings::default())
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::Fail(vec![
                "`epiphany-cluster` document #0: specification.cloud.k8s_as_cloud_service is \"true\", expected boolean true"
                    .to_string()
            ])
        );
    }

    #[test]
    fn test_missing_cloud_section_is_error() {
        let yaml = MINIMAL.replace("  cloud:\n    k8s_as_cloud_service: true\n", "");
        let err = k8s_as_cloud_service(&docs(&yaml)).unwrap_err();
        assert!(matches!(err, Error::MissingField { .. }));
    }

    #[test]
    fn test_count_mismatch() {
        let yaml = MINIMAL.replace("count: '2'", "count: 3");
        let verdict = Check::VirtualMachineAssignments
            .evaluate(&docs(&yaml), &Settings::default())
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::Fail(vec![
                "component `postgresql` declares count 3 but lists 2 machine(s)".to_string()
            ])
        );
    }

    #[test]
    fn test_unknown_machine() {
        let yaml = MINIMAL.replace("machines: [vm-0, vm-1]", "machines: [vm-0, vm-9]");
        let verdict = Check::VirtualMachineAssignments
            .evaluate(&docs(&yaml), &Settings::default())
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::Fail(vec![
                "component `postgresql` references unknown machine `vm-9`".to_string()
            ])
        );
    }

    #[test]
    fn test_non_integer_count_is_error() {
        let yaml = MINIMAL.replace("count: '2'", "count: two");
        let err = virtual_machine_assignments(&docs(&yaml)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected integer at `specification.components.postgresql.count`, found string"
        );
    }

    #[test]
    fn test_disabled_component_needs_no_config() {
        // kafka has count 0 and no configuration/kafka document
        assert!(component_configs_present(&docs(MINIMAL)).unwrap());
    }

    #[test]
    fn test_duplicate_component_config() {
        let yaml = format!("{}---\nkind: configuration/postgresql\nprovider: any\n", MINIMAL);
        let verdict = Check::ComponentConfigs
            .evaluate(&docs(&yaml), &Settings::default())
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::Fail(vec![
                "enabled component `postgresql` needs exactly one `configuration/postgresql` document, found 2"
                    .to_string()
            ])
        );
    }

    #[test]
    fn test_missing_registry_flag_is_error() {
        let yaml = MINIMAL.replace("      use_local_image_registry: false\n", "");
        let err = local_image_registry_disabled(&docs(&yaml)).unwrap_err();
        assert!(err
            .to_string()
            .contains("specification.applications[0].use_local_image_registry"));
    }

    #[test]
    fn test_missing_provider() {
        let yaml = format!("{}---\nkind: configuration/shared-config\n", MINIMAL);
        let verdict = Check::ProviderDefined
            .evaluate(&docs(&yaml), &Settings::default())
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::Fail(vec![
                "`configuration/shared-config` document #5 has no provider".to_string()
            ])
        );
    }

    #[test]
    fn test_expected_provider_is_configurable() {
        let yaml = MINIMAL.replace("provider: any", "provider: azure");
        assert!(provider_defined(&docs(&yaml), "azure").unwrap());
        assert!(!provider_defined(&docs(&yaml), "any").unwrap());
    }

    #[test]
    fn test_fail_fast_skips_remaining_checks() {
        let yaml = MINIMAL.replace("k8s_as_cloud_service: true", "k8s_as_cloud_service: false");
        let report = run_checks(&docs(&yaml), &Settings::default());
        assert!(!report.passed());
        assert!(matches!(report.outcomes()[0].outcome, Outcome::Failed { .. }));
        assert!(report.outcomes()[1..]
            .iter()
            .all(|o| o.outcome == Outcome::Skipped));
    }

    #[test]
    fn test_keep_going_evaluates_every_check() {
        let yaml = MINIMAL.replace("k8s_as_cloud_service: true", "k8s_as_cloud_service: false");
        let settings = Settings {
            fail_fast: false,
            ..Settings::default()
        };
        let report = run_checks(&docs(&yaml), &settings);
        assert_eq!(report.failures().count(), 1);
        assert!(report.outcomes()[1..]
            .iter()
            .all(|o| o.outcome == Outcome::Passed));
    }
}
