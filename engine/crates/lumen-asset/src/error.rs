use std::path::{Path, PathBuf};

/// 资源加载的错误
///
/// 三类错误都可以由调用方区分处理，引擎本身在遇到任何一种时都会记录日志并退出
#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    /// 文件无法打开
    #[error("asset not found: {}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 容器或者描述文件被截断、格式错误
    #[error("asset corrupt: {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// 缺少必需字段，或者引用越界
    #[error("structural parse error: {}: {reason}", path.display())]
    StructuralParse { path: PathBuf, reason: String },

    /// 写出资源文件失败
    #[error("failed to write asset {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetErrorKind {
    NotFound,
    Corrupt,
    StructuralParse,
    Write,
}

pub type AssetResult<T> = Result<T, AssetError>;

// 构造
impl AssetError {
    #[inline]
    pub fn not_found(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::NotFound {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    #[inline]
    pub fn corrupt(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn structural(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::StructuralParse {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

// getters
impl AssetError {
    pub fn kind(&self) -> AssetErrorKind {
        match self {
            Self::NotFound { .. } => AssetErrorKind::NotFound,
            Self::Corrupt { .. } => AssetErrorKind::Corrupt,
            Self::StructuralParse { .. } => AssetErrorKind::StructuralParse,
            Self::Write { .. } => AssetErrorKind::Write,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path, .. }
            | Self::Corrupt { path, .. }
            | Self::StructuralParse { path, .. }
            | Self::Write { path, .. } => path,
        }
    }
}
