//! Build stages and the hub commands that drive them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{EnvironmentsConfig, StageTemplate};
use crate::utils::template::{self, TemplateVars};

/// Literal the hub console understands as "no value".
pub const NONE_LITERAL: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Dump,
    Merge,
    Index,
    Snapshot,
    Publish,
    Install,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Dump,
        Stage::Merge,
        Stage::Index,
        Stage::Snapshot,
        Stage::Publish,
        Stage::Install,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Dump => "dump",
            Stage::Merge => "merge",
            Stage::Index => "index",
            Stage::Snapshot => "snapshot",
            Stage::Publish => "publish",
            Stage::Install => "install",
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            Stage::Dump => "dump(src='{{source_name}}')",
            Stage::Merge => {
                "merge(build_name='{{plugin}}', target_name='{{build_name}}', force=False)"
            }
            Stage::Index => {
                "index(indexer_env='{{indexer_env}}', target_name='{{build_name}}', index_name=None)"
            }
            Stage::Snapshot => {
                "snapshot(snapshot_env='{{snapshot_env}}', index='{{build_name}}', snapshot=None)"
            }
            Stage::Publish => {
                "publish_snapshot(publisher_env='{{publisher_env}}', snapshot='{{build_name}}', build_name='{{build_name}}', previous_build='{{previous_build_name}}')"
            }
            Stage::Install => "install('{{release_name}}')",
        }
    }
}

/// Values substituted into stage templates for one source.
#[derive(Debug, Clone, Serialize)]
pub struct StageVars {
    pub plugin: String,
    pub source_name: String,
    pub build_name: String,
    pub previous_build_name: Option<String>,
    pub release_name: String,
    pub indexer_env: String,
    pub snapshot_env: String,
    pub publisher_env: String,
}

impl StageVars {
    pub fn new(
        plugin: &str,
        source_name: &str,
        build_name: &str,
        previous_build_name: Option<String>,
        release_name: &str,
        environments: &EnvironmentsConfig,
    ) -> Self {
        Self {
            plugin: plugin.to_string(),
            source_name: source_name.to_string(),
            build_name: build_name.to_string(),
            previous_build_name,
            release_name: release_name.to_string(),
            indexer_env: environments.indexer.clone(),
            snapshot_env: environments.snapshot.clone(),
            publisher_env: environments.publisher.clone(),
        }
    }
}

/// A stage with its command rendered for one source.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedStage {
    pub stage: Stage,
    pub command: String,
}

impl RenderedStage {
    /// The hub call being made, e.g. `publish_snapshot`.
    pub fn call_name(&self) -> &str {
        call_name(&self.command)
    }
}

/// Text before the first `(` of a command.
pub fn call_name(command: &str) -> &str {
    command.split('(').next().unwrap_or(command).trim()
}

pub fn render(template: &str, vars: &StageVars) -> String {
    let previous = vars
        .previous_build_name
        .as_deref()
        .unwrap_or(NONE_LITERAL);

    template::render(
        template,
        &[
            (TemplateVars::PLUGIN, vars.plugin.as_str()),
            (TemplateVars::SOURCE_NAME, vars.source_name.as_str()),
            (TemplateVars::BUILD_NAME, vars.build_name.as_str()),
            (TemplateVars::PREVIOUS_BUILD_NAME, previous),
            (TemplateVars::RELEASE_NAME, vars.release_name.as_str()),
            (TemplateVars::INDEXER_ENV, vars.indexer_env.as_str()),
            (TemplateVars::SNAPSHOT_ENV, vars.snapshot_env.as_str()),
            (TemplateVars::PUBLISHER_ENV, vars.publisher_env.as_str()),
        ],
    )
}

pub fn render_all(stages: &[StageTemplate], vars: &StageVars) -> Vec<RenderedStage> {
    stages
        .iter()
        .map(|s| RenderedStage {
            stage: s.stage,
            command: render(&s.template, vars),
        })
        .collect()
}

/// Name the plugin's dumper is registered under on the hub.
pub fn source_name<'a>(plugin: &'a str, dumpers: &'a BTreeMap<String, String>) -> &'a str {
    dumpers.get(plugin).map(String::as_str).unwrap_or(plugin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(previous: Option<&str>) -> StageVars {
        StageVars::new(
            "pdb",
            "covid_pdb_datasets",
            "pdb_20240101120000_ab12cd34",
            previous.map(str::to_string),
            "outbreak-pdb",
            &EnvironmentsConfig::default(),
        )
    }

    #[test]
    fn renders_default_commands() {
        let v = vars(Some("pdb_20231201000000_zzzzzzzz"));
        assert_eq!(
            render(Stage::Dump.default_template(), &v),
            "dump(src='covid_pdb_datasets')"
        );
        assert_eq!(
            render(Stage::Merge.default_template(), &v),
            "merge(build_name='pdb', target_name='pdb_20240101120000_ab12cd34', force=False)"
        );
        assert_eq!(
            render(Stage::Index.default_template(), &v),
            "index(indexer_env='su07', target_name='pdb_20240101120000_ab12cd34', index_name=None)"
        );
        assert_eq!(
            render(Stage::Snapshot.default_template(), &v),
            "snapshot(snapshot_env='s3_outbreak_from_su07', index='pdb_20240101120000_ab12cd34', snapshot=None)"
        );
        assert_eq!(
            render(Stage::Publish.default_template(), &v),
            "publish_snapshot(publisher_env='s3_outbreak', snapshot='pdb_20240101120000_ab12cd34', build_name='pdb_20240101120000_ab12cd34', previous_build='pdb_20231201000000_zzzzzzzz')"
        );
        assert_eq!(
            render(Stage::Install.default_template(), &v),
            "install('outbreak-pdb')"
        );
    }

    #[test]
    fn missing_previous_build_renders_none_literal() {
        let cmd = render(Stage::Publish.default_template(), &vars(None));
        assert!(cmd.ends_with("previous_build='None')"));
    }

    #[test]
    fn call_name_is_text_before_paren() {
        assert_eq!(call_name("publish_snapshot(publisher_env='x')"), "publish_snapshot");
        assert_eq!(call_name("install('outbreak-pdb')"), "install");
        assert_eq!(call_name("noargs"), "noargs");
    }

    #[test]
    fn source_name_falls_back_to_plugin() {
        let mut dumpers = BTreeMap::new();
        dumpers.insert("figshare".to_string(), "covid_figshare".to_string());
        assert_eq!(source_name("figshare", &dumpers), "covid_figshare");
        assert_eq!(source_name("biorxiv", &dumpers), "biorxiv");
    }

    #[test]
    fn stage_serializes_snake_case() {
        let json = serde_json::to_string(&Stage::Publish).unwrap();
        assert_eq!(json, "\"publish\"");
        let parsed: Stage = serde_json::from_str("\"snapshot\"").unwrap();
        assert_eq!(parsed, Stage::Snapshot);
    }
}
