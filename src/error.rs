use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("Cash flow sheet has {0} usable columns, expected exactly 2 (line item, amount)")]
    CashFlowShape(usize),

    #[error("Workbook contains no sheets")]
    EmptyWorkbook,

    #[error("Workbook error: {0}")]
    WorkbookError(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NormalizerError>;
