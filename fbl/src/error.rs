#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Error reading AST")]
    Ast(#[from] fbl_ast::Error),
    #[error("Error generating module")]
    Write(#[from] fbl_write::error::Error),
    #[error("Failed to read config \"{path}\"")]
    FailedToReadConfig {
        path: String,
        source: Box<dyn std::error::Error + 'static + Send + Sync>,
    },
    #[error("Failed to write \"{path}\"")]
    FailedToWriteOutput { path: String, source: std::io::Error },
}
