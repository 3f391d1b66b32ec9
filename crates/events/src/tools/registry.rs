use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::{arguments::ArgumentFormatter, outputs::OutputFormatter};

/// Every tool whose events may reach a client. A name that does not parse into this enum is not
/// allowed and its events are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ToolName {
    ResolveDateRange,
    ExecuteQuery,
    CreativeTool,
    QueryTableSchemaInfo,
    SimilaritySearch,
    Gsutil,
    ValidateQuestion,
    CodeExecutor,
    ComputerUse,
    Vision,
    ExecuteForecast,
    PrepareData,
    SaveInlineTimeseries,
    ManageAudiences,
    ManageCreative,
    ManageOptimization,
    ManagePromotions,
    ManageStructure,
    GetMetrics,
    WebSearch,
    Memory,
    GetMetricDetails,
    SummaryPage,
    FileManager,
    SearchVerifiedSqlExamples,
    GetKnowledgeBaseSources,
    GetKnowledgeBaseDetails,
    CodeInterpreter,
    QueryKnowledgeBase,
    PrepareTimeseries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolFormatters {
    pub arguments: ArgumentFormatter,
    pub output: OutputFormatter,
}

impl ToolName {
    pub fn lookup(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    pub fn formatters(self) -> ToolFormatters {
        let (arguments, output) = match self {
            ToolName::ResolveDateRange => (ArgumentFormatter::Passthrough, OutputFormatter::DateRange),
            ToolName::ExecuteQuery => (ArgumentFormatter::Query, OutputFormatter::Query),
            ToolName::CreativeTool => (ArgumentFormatter::Passthrough, OutputFormatter::CreativeAssets),
            ToolName::QueryTableSchemaInfo
            | ToolName::SimilaritySearch
            | ToolName::Gsutil
            | ToolName::ValidateQuestion
            | ToolName::CodeExecutor
            | ToolName::ComputerUse
            | ToolName::Vision
            | ToolName::ExecuteForecast
            | ToolName::PrepareData
            | ToolName::SaveInlineTimeseries
            | ToolName::ManageAudiences
            | ToolName::ManageCreative
            | ToolName::ManageOptimization
            | ToolName::ManagePromotions
            | ToolName::ManageStructure
            | ToolName::GetMetrics
            | ToolName::WebSearch
            | ToolName::Memory
            | ToolName::GetMetricDetails
            | ToolName::SummaryPage
            | ToolName::FileManager
            | ToolName::SearchVerifiedSqlExamples
            | ToolName::GetKnowledgeBaseSources
            | ToolName::GetKnowledgeBaseDetails
            | ToolName::CodeInterpreter
            | ToolName::QueryKnowledgeBase
            | ToolName::PrepareTimeseries => {
                (ArgumentFormatter::Passthrough, OutputFormatter::Passthrough)
            }
        };

        ToolFormatters { arguments, output }
    }
}
