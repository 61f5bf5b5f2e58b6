use thiserror::Error;

/// 索引查询 / 加载过程中需要调用方区分处理的错误。
/// 其余致命错误（配置错误、非法字母表编码）直接 fail fast。
#[derive(Debug, Error)]
pub enum IndexError {
    /// A named chromosome is not present in the index.
    #[error("chromosome '{0}' is not in the index")]
    ChromNotFound(String),

    /// The persisted index stream is truncated, has trailing bytes,
    /// or carries an unknown format version.
    #[error("corrupt or incompatible index: {0}")]
    CorruptIndex(String),
}
