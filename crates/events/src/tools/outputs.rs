use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use ts_rs::TS;

use super::registry::ToolName;
use crate::{context::StreamContext, storage::StorageRoot};

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatter {
    Passthrough,
    DateRange,
    Query,
    CreativeAssets,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(untagged)]
pub enum ParsedOutput {
    DateRange(DateRangeOutput),
    Query(QueryOutput),
    Creative(CreativeOutput),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeOutput {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    pub message: String,
    pub filenames: Option<Vec<String>>,
    pub data: Vec<ColumnValues>,
    pub bq: i64,
    pub data_columns: DataColumns,
    pub parameters: Vec<Value>,
    pub total_rows: Option<i64>,
    pub error: Option<String>,
}

/// One result column in columnar form.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct ColumnValues {
    pub name: String,
    pub value: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
pub struct DataColumns {
    pub x: Vec<String>,
    pub y: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct CreativeOutput {
    #[serde(rename = "inputUrls")]
    pub input_urls: Vec<String>,
    #[serde(rename = "outputUrls")]
    pub output_urls: Vec<String>,
    pub output: Vec<SignedFile>,
    pub summary_result: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SignedFile {
    pub filename: String,
    pub signed_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedOutput {
    pub raw_output: String,
    pub parsed_output: Option<ParsedOutput>,
}

pub struct OutputContext<'a> {
    pub tool: ToolName,
    pub raw_output: &'a str,
    pub typed_output: Option<&'a Value>,
    pub stream: &'a StreamContext,
}

impl OutputContext<'_> {
    /// Typed output decoded into the tool's schema. A missing, null or mismatched value counts
    /// as absent, which formatters treat as an upstream failure.
    fn typed<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.typed_output.filter(|value| !value.is_null())?;
        match serde_json::from_value(value.clone()) {
            Ok(typed) => Some(typed),
            Err(error) => {
                tracing::warn!(tool = %self.tool, %error, "typed tool output has unexpected shape");
                None
            }
        }
    }

    fn error_message(&self) -> String {
        if self.raw_output.is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            self.raw_output.to_string()
        }
    }
}

impl OutputFormatter {
    pub async fn format(self, ctx: OutputContext<'_>) -> FormattedOutput {
        let parsed_output = match self {
            OutputFormatter::Passthrough => None,
            OutputFormatter::DateRange => Some(ParsedOutput::DateRange(format_date_range(&ctx))),
            OutputFormatter::Query => Some(ParsedOutput::Query(format_query(&ctx))),
            OutputFormatter::CreativeAssets => {
                Some(ParsedOutput::Creative(format_creative(&ctx).await))
            }
        };

        FormattedOutput {
            raw_output: ctx.raw_output.to_string(),
            parsed_output,
        }
    }
}

#[derive(Deserialize)]
struct DateRangeTyped {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

fn format_date_range(ctx: &OutputContext<'_>) -> DateRangeOutput {
    let Some(typed) = ctx.typed::<DateRangeTyped>() else {
        return DateRangeOutput::default();
    };

    DateRangeOutput {
        start_date: typed.start_date.unwrap_or_default(),
        end_date: typed.end_date.unwrap_or_default(),
    }
}

#[derive(Deserialize)]
struct QueryTyped {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    file_paths: Option<Vec<String>>,
    #[serde(default)]
    data_snippet: Option<DataSnippet>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct DataSnippet {
    #[serde(default)]
    columns: Option<Vec<String>>,
    #[serde(default)]
    rows: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    total_rows: Option<i64>,
}

fn format_query(ctx: &OutputContext<'_>) -> QueryOutput {
    let Some(typed) = ctx.typed::<QueryTyped>() else {
        return QueryOutput {
            message: String::new(),
            filenames: None,
            data: Vec::new(),
            bq: 0,
            data_columns: DataColumns::default(),
            parameters: Vec::new(),
            total_rows: None,
            error: Some(ctx.error_message()),
        };
    };

    let snippet = typed.data_snippet;
    let columns = snippet
        .as_ref()
        .and_then(|snippet| snippet.columns.clone())
        .unwrap_or_default();

    let data = match snippet.as_ref().and_then(|snippet| snippet.rows.as_ref()) {
        Some(rows) => columns_from_rows(&columns, rows),
        None => Vec::new(),
    };

    QueryOutput {
        message: typed.message.unwrap_or_default(),
        filenames: typed.file_paths,
        data,
        bq: 0,
        data_columns: DataColumns {
            x: columns,
            y: Vec::new(),
        },
        parameters: Vec::new(),
        total_rows: snippet.and_then(|snippet| snippet.total_rows),
        error: typed.error,
    }
}

/// Pivot row-major cells into one entry per column. Short rows and null cells read as `""`.
fn columns_from_rows(columns: &[String], rows: &[Vec<Value>]) -> Vec<ColumnValues> {
    columns
        .iter()
        .enumerate()
        .map(|(index, name)| ColumnValues {
            name: name.clone(),
            value: rows
                .iter()
                .map(|row| match row.get(index) {
                    None | Some(Value::Null) => Value::String(String::new()),
                    Some(cell) => cell.clone(),
                })
                .collect(),
        })
        .collect()
}

#[derive(Deserialize)]
struct CreativeTyped {
    #[serde(default)]
    output_files: Option<Vec<String>>,
    #[serde(default)]
    input_files: Option<Vec<Value>>,
    #[serde(default)]
    summary_result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

async fn format_creative(ctx: &OutputContext<'_>) -> CreativeOutput {
    let Some(typed) = ctx.typed::<CreativeTyped>() else {
        return CreativeOutput {
            input_urls: Vec::new(),
            output_urls: Vec::new(),
            output: Vec::new(),
            summary_result: String::new(),
            error: Some(ctx.error_message()),
        };
    };

    let output_urls = typed.output_files.unwrap_or_default();
    let output = sign_files(ctx.stream, &output_urls).await;

    let input_urls = typed
        .input_files
        .unwrap_or_default()
        .iter()
        .filter_map(|file| file.get("path").and_then(Value::as_str))
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect();

    CreativeOutput {
        input_urls,
        output_urls,
        output,
        summary_result: typed.summary_result.unwrap_or_default(),
        error: typed.error.filter(|error| !error.is_empty()),
    }
}

/// Signs each file relative to the stream's working directory. Files that fail to sign are
/// logged and left out.
async fn sign_files(stream: &StreamContext, files: &[String]) -> Vec<SignedFile> {
    if files.is_empty() {
        return Vec::new();
    }

    let (Some(working_dir), Some(signer)) = (stream.working_dir.as_deref(), &stream.signer) else {
        tracing::warn!(
            file_count = files.len(),
            "cannot sign tool output files without a working directory and storage signer"
        );
        return Vec::new();
    };

    let Some(root) = StorageRoot::parse(working_dir) else {
        tracing::warn!(%working_dir, "invalid storage URL for working directory");
        return Vec::new();
    };

    let mut signed = Vec::with_capacity(files.len());
    for file in files {
        match signer.signed_read_url(&root.object(file)).await {
            Ok(signed_url) => signed.push(SignedFile {
                filename: file.clone(),
                signed_url,
            }),
            Err(error) => {
                tracing::error!(?error, file_path = %file, %working_dir, "failed to generate signed URL");
            }
        }
    }
    signed
}
