//! `tsnctl check`: replay a project file through an in-memory controller.
//!
//! The topology is imported without streams, then every stream is created
//! one at a time in file order, so each one is checked against the
//! streams accepted before it.

use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, info};

use tsnctl_config::Config;
use tsnctl_core::validate::check_cycle_setting;
use tsnctl_core::{Command, CommandResult, Controller, CoreConfig, CoreError, Project};

use crate::cli::{GlobalOpts, ProjectArgs};
use crate::commands::load_project;
use crate::error::CliError;
use crate::output::{self, Verdict};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckItem {
    pub id: Option<i64>,
    pub name: String,
    pub status_code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CheckItem {
    fn from_result(id: Option<i64>, name: String, result: Result<(), CoreError>) -> Self {
        match result {
            Ok(()) => Self {
                id,
                name,
                status_code: 200,
                reason: None,
            },
            Err(e) => Self {
                id,
                name,
                status_code: e.status_code(),
                reason: Some(e.to_string()),
            },
        }
    }

    pub fn verdict(&self) -> Verdict {
        match self.status_code {
            200 => Verdict::Ok,
            2101 => Verdict::Infeasible,
            _ => Verdict::Rejected,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckReport {
    pub project: String,
    pub items: Vec<CheckItem>,
}

impl CheckReport {
    pub fn rejected(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.verdict() != Verdict::Ok)
            .count()
    }
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Item")]
    name: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Check the cycle setting and every stream of `project`.
pub async fn check_project(project: Project, core: CoreConfig) -> Result<CheckReport, CliError> {
    let mut items = vec![CheckItem::from_result(
        None,
        "cycle setting".into(),
        check_cycle_setting(&project.name, &project.cycle_setting),
    )];

    let controller = Controller::in_memory(core);
    controller.start().await?;

    let mut topology = project.clone();
    topology.streams.clear();
    let imported = controller
        .execute(Command::ImportProject {
            project: Box::new(topology),
        })
        .await;
    let project_id = match imported {
        Ok(CommandResult::Project(p)) => p.id,
        Ok(other) => {
            controller.shutdown().await;
            return Err(CliError::Internal(format!("unexpected import result: {other:?}")));
        }
        Err(e) => {
            controller.shutdown().await;
            return Err(e.into());
        }
    };

    for stream in project.streams.into_values() {
        let (id, name) = (stream.id, stream.name.clone());
        let result = controller
            .execute(Command::CreateStreams {
                project_id,
                streams: vec![stream],
            })
            .await
            .map(|_| ());
        debug!(stream = %name, ok = result.is_ok(), "stream checked");
        items.push(CheckItem::from_result(Some(id), name, result));
    }

    controller.shutdown().await;
    let report = CheckReport {
        project: project.name,
        items,
    };
    info!(
        project = %report.project,
        checked = report.items.len(),
        rejected = report.rejected(),
        "project checked"
    );
    Ok(report)
}

pub async fn handle(args: &ProjectArgs, global: &GlobalOpts, config: &Config) -> Result<(), CliError> {
    let project = load_project(&args.project)?;
    let report = check_project(project, config.core_config()).await?;

    let color = output::should_color(global.color);
    let rendered = output::render(global.output, &report, || {
        report
            .items
            .iter()
            .map(|item| CheckRow {
                id: item.id.map(|id| id.to_string()).unwrap_or_default(),
                name: item.name.clone(),
                verdict: item.verdict().label(color),
                reason: item.reason.clone().unwrap_or_default(),
            })
            .collect()
    })?;
    output::print_output(&rendered, global.quiet);

    match report.rejected() {
        0 => Ok(()),
        rejected => Err(CliError::CheckFailed {
            rejected,
            total: report.items.len(),
        }),
    }
}
