//! Output formatting for JSON, YAML and human-readable text

use crate::hooks::HookRegistry;
use crate::output::AppBundle;
use crate::stack::{Phase, RuntimeSpec};
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Machine-readable
    Json,
    Yaml,
    Human,
}

#[derive(Debug, Serialize)]
struct HookSummary<'a> {
    id: &'a str,
    description: &'a str,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_spec(&self, spec: &RuntimeSpec) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(spec, "runtime spec"),
            OutputFormat::Yaml => to_yaml(spec, "runtime spec"),
            OutputFormat::Human => Ok(spec_human(spec)),
        }
    }

    pub fn format_bundle(&self, bundle: &AppBundle) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(bundle, "bundle"),
            OutputFormat::Yaml => to_yaml(bundle, "bundle"),
            OutputFormat::Human => Ok(bundle_human(bundle)),
        }
    }

    pub fn format_hooks(&self, hooks: &HookRegistry) -> Result<String> {
        let summaries: Vec<HookSummary> = hooks
            .hooks()
            .map(|hook| HookSummary {
                id: hook.id(),
                description: hook.description(),
            })
            .collect();

        match self.format {
            OutputFormat::Json => to_json(&summaries, "hook list"),
            OutputFormat::Yaml => to_yaml(&summaries, "hook list"),
            OutputFormat::Human => {
                let width = summaries.iter().map(|s| s.id.len()).max().unwrap_or(0);
                Ok(summaries
                    .iter()
                    .map(|s| format!("{:width$}  {}\n", s.id, s.description, width = width))
                    .collect())
            }
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn to_yaml<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
}

fn spec_human(spec: &RuntimeSpec) -> String {
    let mut output = String::new();

    output.push_str("\u{2713} Discovery Result\n\n");
    output.push_str(&format!("Runtime:          {}\n", spec.id().name()));
    output.push_str(&format!("Base Image:       {}\n", spec.base_image()));
    output.push_str(&format!(
        "Package Manager:  {}\n",
        spec.package_manager().unwrap_or("(none)")
    ));
    output.push_str(&format!(
        "Framework:        {}\n\n",
        spec.framework().unwrap_or("(none)")
    ));

    output.push_str("Commands:\n");
    if let Some(bootstrap) = spec.package_manager_install_command() {
        output.push_str(&format!("\u{251C}\u{2500} Bootstrap: {}\n", bootstrap));
    }
    output.push_str(&format!(
        "\u{251C}\u{2500} Install:   {}\n",
        spec.install_command().unwrap_or("(not specified)")
    ));
    for (i, phase) in Phase::ALL.iter().enumerate() {
        let branch = if i == Phase::ALL.len() - 1 {
            "\u{2514}\u{2500}"
        } else {
            "\u{251C}\u{2500}"
        };
        let label = match phase {
            Phase::Build => "Build:",
            Phase::Dev => "Dev:",
            Phase::Run => "Run:",
        };
        let command = spec
            .detected_commands()
            .get(*phase)
            .map(|c| c.cmd.as_str())
            .unwrap_or("(not specified)");
        output.push_str(&format!("{} {:<10} {}\n", branch, label, command));
    }

    let hooks = spec.framework_hooks();
    if !hooks.is_empty() {
        output.push_str("\nHooks:\n");
        if let Some(hook) = &hooks.after_install {
            output.push_str(&format!("  afterInstall: {}\n", hook));
        }
        if let Some(hook) = &hooks.after_build {
            output.push_str(&format!("  afterBuild:   {}\n", hook));
        }
    }

    output
}

fn bundle_human(bundle: &AppBundle) -> String {
    let mut output = format!("Bundle {}\n", bundle.version);
    match &bundle.server {
        None => output.push_str("No server (static output)\n"),
        Some(server) => {
            output.push_str(&format!("Start:       {}\n", server.start.cmd.join(" ")));
            let fields = [
                ("Concurrency", server.concurrency.map(|v| v.to_string())),
                ("CPU", server.cpu.map(|v| v.to_string())),
                ("Memory", server.memory.map(|v| format!("{} MiB", v))),
                ("Timeout", server.timeout_seconds.map(|v| format!("{}s", v))),
                ("Min", server.min_instances.map(|v| v.to_string())),
                ("Max", server.max_instances.map(|v| v.to_string())),
            ];
            for (label, value) in fields {
                if let Some(value) = value {
                    output.push_str(&format!("{:<12} {}\n", format!("{}:", label), value));
                }
            }
        }
    }
    output
}
