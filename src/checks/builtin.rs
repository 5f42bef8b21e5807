//! Built-in check definitions.

use crate::config::{CheckSpec, ObjectKindsDesc};

/// Names of the built-in checks enabled when a config does not opt out of defaults.
pub const DEFAULT_CHECKS: &[&str] = &[
    "dangling-service",
    "latest-tag",
    "mismatching-selector",
    "no-anti-affinity",
    "privileged-container",
];

/// Get all built-in check specifications, sorted by name.
pub fn builtin_checks() -> Vec<CheckSpec> {
    vec![
        CheckSpec::new(
            "dangling-service",
            "Indicates when services do not have any associated deployments.",
            "Confirm that your service's selector correctly matches the labels on one of your deployments.",
            "dangling-service",
        )
        .with_scope(ObjectKindsDesc::new(&["Service"])),
        CheckSpec::new(
            "default-service-account",
            "Indicates when pods use the default service account.",
            "Create a dedicated service account for your pod. Refer to https://kubernetes.io/docs/tasks/configure-pod-container/configure-service-account/ for details.",
            "service-account",
        )
        .with_param("serviceAccount", "^(|default)$"),
        CheckSpec::new(
            "drop-net-raw-capability",
            "Indicates when containers do not drop NET_RAW capability",
            "NET_RAW makes it so that an application within the container is able to craft raw packets, use raw sockets, and bind to any address. Remove this capability in the containers under containers security contexts.",
            "verify-container-capabilities",
        )
        .with_param(
            "forbiddenCapabilities",
            serde_yaml::Value::Sequence(vec!["NET_RAW".into()]),
        ),
        CheckSpec::new(
            "env-var-secret",
            "Indicates when objects use a secret in an environment variable.",
            "Do not use raw secrets in environment variables. Instead, either mount the secret as a file or use a secretKeyRef. Refer to https://kubernetes.io/docs/concepts/configuration/secret/#using-secrets for details.",
            "env-var",
        )
        .with_param("name", "(?i).*secret.*")
        .with_param("value", ".+"),
        CheckSpec::new(
            "host-ipc",
            "Alert on pods/deployment-likes with sharing host's IPC namespace",
            "Ensure the host's IPC namespace is not shared.",
            "host-ipc",
        ),
        CheckSpec::new(
            "host-network",
            "Alert on pods/deployment-likes with sharing host's network namespace",
            "Ensure the host's network namespace is not shared.",
            "host-network",
        ),
        CheckSpec::new(
            "host-pid",
            "Alert on pods/deployment-likes with sharing host's process namespace",
            "Ensure the host's process namespace is not shared.",
            "host-pid",
        ),
        CheckSpec::new(
            "hpa-minimum-three-replicas",
            "Indicates when a HorizontalPodAutoscaler specifies less than three minReplicas",
            "Increase the number of replicas in the HorizontalPodAutoscaler to at least three to increase fault tolerance.",
            "hpa-minimum-replicas",
        )
        .with_param("minReplicas", 3),
        CheckSpec::new(
            "job-ttl-seconds-after-finished",
            "Indicates when standalone jobs do not set ttlSecondsAfterFinished and when jobs managed by cronjob set ttlSecondsAfterFinished.",
            "Set Job.spec.ttlSecondsAfterFinished. Unset CronJob.Spec.JobTemplate.Spec.ttlSecondsAfterFinished.",
            "job-ttl-seconds-after-finished",
        ),
        CheckSpec::new(
            "latest-tag",
            "Indicates when a deployment-like object is running a container with an invalid container image",
            "Use a container image with a specific tag other than latest.",
            "latest-tag",
        )
        .with_param(
            "blockList",
            serde_yaml::Value::Sequence(vec![
                ".*:(latest)$".into(),
                "^[^:]*$".into(),
                "(.*/[^:]+)$".into(),
            ]),
        ),
        CheckSpec::new(
            "minimum-three-replicas",
            "Indicates when a deployment uses less than three replicas",
            "Increase the number of replicas in your deployment to at least three to increase the fault tolerance of the deployment.",
            "minimum-replicas",
        )
        .with_param("minReplicas", 3),
        CheckSpec::new(
            "mismatching-selector",
            "Indicates when deployment selectors fail to match the pod template labels.",
            "Confirm that your deployment selector correctly matches the labels in its pod template.",
            "mismatching-selector",
        ),
        CheckSpec::new(
            "no-anti-affinity",
            "Indicates when deployments with multiple replicas fail to specify inter-pod anti-affinity, to ensure that the orchestrator attempts to schedule replicas on different nodes.",
            "Specify anti-affinity in your pod specification to ensure that the orchestrator attempts to schedule replicas on different nodes. Using podAntiAffinity, specify a labelSelector that matches pods for the deployment, and set the topologyKey to kubernetes.io/hostname.",
            "anti-affinity",
        )
        .with_param("minReplicas", 2),
        CheckSpec::new(
            "no-liveness-probe",
            "Indicates when containers fail to specify a liveness probe.",
            "Specify a liveness probe in your container. Refer to https://kubernetes.io/docs/tasks/configure-pod-container/configure-liveness-readiness-startup-probes/ for details.",
            "liveness-probe",
        ),
        CheckSpec::new(
            "no-read-only-root-fs",
            "Indicates when containers are running without a read-only root filesystem.",
            "Set readOnlyRootFilesystem to true in the container securityContext.",
            "read-only-root-fs",
        ),
        CheckSpec::new(
            "no-readiness-probe",
            "Indicates when containers fail to specify a readiness probe.",
            "Specify a readiness probe in your container. Refer to https://kubernetes.io/docs/tasks/configure-pod-container/configure-liveness-readiness-startup-probes/ for details.",
            "readiness-probe",
        ),
        CheckSpec::new(
            "no-rolling-update-strategy",
            "Indicates when a deployment doesn't use a rolling update strategy",
            "Use a rolling update strategy to avoid service disruption during an update. A rolling update strategy allows for pods to be systematically replaced in a controlled fashion to ensure no service disruption.",
            "update-configuration",
        )
        .with_param("strategyTypeRegex", "^(RollingUpdate|Rolling)$"),
        CheckSpec::new(
            "privilege-escalation-container",
            "Alert on containers of allowing privilege escalation that could gain more privileges than its parent process.",
            "Ensure containers do not allow privilege escalation by setting allowPrivilegeEscalation=false, privileged=false and removing CAP_SYS_ADMIN capability. See https://kubernetes.io/docs/tasks/configure-pod-container/security-context/ for more details.",
            "privilege-escalation-container",
        ),
        CheckSpec::new(
            "privileged-container",
            "Indicates when deployments have containers running in privileged mode.",
            "Do not run your container as privileged unless it is required.",
            "privileged",
        ),
        CheckSpec::new(
            "required-label-owner",
            "Indicates when objects do not have an owner label.",
            "Add an owner label to your object naming the team or person responsible for it.",
            "required-label",
        )
        .with_param("key", "owner"),
        CheckSpec::new(
            "run-as-non-root",
            "Indicates when containers are not set to runAsNonRoot.",
            "Set runAsUser to a non-zero number and runAsNonRoot to true in your pod or container securityContext. Refer to https://kubernetes.io/docs/tasks/configure-pod-container/security-context/ for details.",
            "run-as-non-root",
        ),
        CheckSpec::new(
            "sensitive-host-mounts",
            "Alert on deployments with sensitive host system directories mounted in containers",
            "Ensure sensitive host system directories are not mounted in containers by removing those Volumes and VolumeMounts.",
            "host-mounts",
        )
        .with_param(
            "dirs",
            serde_yaml::Value::Sequence(vec!["^/$".into(), "^/boot$".into(), "^/dev$".into(), "^/etc$".into(), "^/lib$".into(), "^/proc$".into(), "^/sys$".into(), "^/usr$".into()]),
        ),
        CheckSpec::new(
            "ssh-port",
            "Indicates when deployments expose port 22, which is commonly reserved for SSH access.",
            "Ensure that non-SSH services are not using port 22. Confirm that any actual SSH servers have been vetted.",
            "ports",
        )
        .with_param("port", 22)
        .with_param("protocol", "TCP"),
        CheckSpec::new(
            "unsafe-proc-mount",
            "Alert on deployments with unsafe /proc mount (procMount=Unmasked) that will bypass the default masking behavior of the container runtime",
            "Ensure container does not unsafely exposes parts of /proc by setting procMount=Default. Unmasked ProcMount bypasses the default masking behavior of the container runtime.",
            "unsafe-proc-mount",
        ),
    ]
}
