//! Host network, PID and IPC namespace sharing templates.

use k8s_openapi::api::core::v1::PodSpec;

use crate::context::{LintContext, Object};
use crate::extract;
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::NoParams;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

#[derive(Debug, Clone, Copy)]
enum HostNamespace {
    Network,
    Pid,
    Ipc,
}

impl HostNamespace {
    fn shared(self, pod_spec: &PodSpec) -> bool {
        let flag = match self {
            Self::Network => pod_spec.host_network,
            Self::Pid => pod_spec.host_pid,
            Self::Ipc => pod_spec.host_ipc,
        };
        flag.unwrap_or(false)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Pid => "process",
            Self::Ipc => "IPC",
        }
    }

    fn field(self) -> &'static str {
        match self {
            Self::Network => "hostNetwork",
            Self::Pid => "hostPID",
            Self::Ipc => "hostIPC",
        }
    }
}

struct HostNamespaceCheck(HostNamespace);

impl CheckFunc for HostNamespaceCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        match extract::pod_spec(object.k8s_object()) {
            Some(pod_spec) if self.0.shared(&pod_spec) => vec![Diagnostic::new(format!(
                "resource {} shares the host's {} namespace (via {}=true).",
                object.name(),
                self.0.label(),
                self.0.field()
            ))],
            _ => Vec::new(),
        }
    }
}

fn parse(params: &ParamBag) -> Result<ParsedParams, TemplateError> {
    let params: NoParams = decode_params(&[], params)?;
    Ok(ParsedParams::new(params))
}

macro_rules! host_namespace_template {
    ($name:ident, $ns:expr, $key:literal, $human:literal, $description:literal) => {
        pub struct $name;

        impl Template for $name {
            fn key(&self) -> &str {
                $key
            }

            fn human_name(&self) -> &str {
                $human
            }

            fn description(&self) -> &str {
                $description
            }

            fn supported_object_kinds(&self) -> &'static [&'static str] {
                &[DEPLOYMENT_LIKE]
            }

            fn parameters(&self) -> Vec<ParameterDesc> {
                Vec::new()
            }

            fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
                parse(params)
            }

            fn instantiate(&self, _params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
                Ok(Box::new(HostNamespaceCheck($ns)))
            }
        }
    };
}

host_namespace_template!(
    HostNetworkTemplate,
    HostNamespace::Network,
    "host-network",
    "Host Network",
    "Flag Pod sharing host's network namespace"
);
host_namespace_template!(
    HostPidTemplate,
    HostNamespace::Pid,
    "host-pid",
    "Host PID",
    "Flag Pod sharing host's process namespace"
);
host_namespace_template!(
    HostIpcTemplate,
    HostNamespace::Ipc,
    "host-ipc",
    "Host IPC",
    "Flag Pod sharing host's IPC namespace"
);
