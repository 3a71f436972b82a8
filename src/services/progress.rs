//! Progress reporting for import and export pipelines

use serde::Serialize;
use std::fmt;

use crate::models::OperationId;

/// Import pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportStage {
    Initializing,
    ReadingFile,
    ParsingData,
    Validating,
    DetectingConflicts,
    ResolvingConflicts,
    Importing,
    Completed,
}

impl ImportStage {
    /// Position of the stage in the pipeline, starting at 1
    pub fn step(&self) -> u32 {
        match self {
            Self::Initializing => 1,
            Self::ReadingFile => 2,
            Self::ParsingData => 3,
            Self::Validating => 4,
            Self::DetectingConflicts => 5,
            Self::ResolvingConflicts => 6,
            Self::Importing => 7,
            Self::Completed => 8,
        }
    }

    pub const TOTAL: u32 = 8;
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::ReadingFile => "reading file",
            Self::ParsingData => "parsing data",
            Self::Validating => "validating",
            Self::DetectingConflicts => "detecting conflicts",
            Self::ResolvingConflicts => "resolving conflicts",
            Self::Importing => "importing",
            Self::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

/// Export pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportStage {
    Initializing,
    CollectingData,
    Filtering,
    Formatting,
    GeneratingFile,
    Completed,
}

impl ExportStage {
    /// Position of the stage in the pipeline, starting at 1
    pub fn step(&self) -> u32 {
        match self {
            Self::Initializing => 1,
            Self::CollectingData => 2,
            Self::Filtering => 3,
            Self::Formatting => 4,
            Self::GeneratingFile => 5,
            Self::Completed => 6,
        }
    }

    pub const TOTAL: u32 = 6;
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::CollectingData => "collecting data",
            Self::Filtering => "filtering",
            Self::Formatting => "formatting",
            Self::GeneratingFile => "generating file",
            Self::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

/// Stage of either pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Stage {
    Import(ImportStage),
    Export(ExportStage),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Import(stage) => stage.fmt(f),
            Self::Export(stage) => stage.fmt(f),
        }
    }
}

/// One progress notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub operation_id: OperationId,
    pub stage: Stage,
    pub current: u32,
    pub total: u32,
    pub percentage: f64,
    pub message: String,
}

impl ProgressEvent {
    pub fn import(operation_id: OperationId, stage: ImportStage, message: impl Into<String>) -> Self {
        Self::new(operation_id, Stage::Import(stage), stage.step(), ImportStage::TOTAL, message)
    }

    pub fn export(operation_id: OperationId, stage: ExportStage, message: impl Into<String>) -> Self {
        Self::new(operation_id, Stage::Export(stage), stage.step(), ExportStage::TOTAL, message)
    }

    fn new(operation_id: OperationId, stage: Stage, current: u32, total: u32, message: impl Into<String>) -> Self {
        Self {
            operation_id,
            stage,
            current,
            total,
            percentage: f64::from(current) / f64::from(total) * 100.0,
            message: message.into(),
        }
    }
}

/// Receiver of progress events
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}
