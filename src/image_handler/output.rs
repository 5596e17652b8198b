//! # 输出落盘模块
//!
//! ## 设计思路
//!
//! 结果先写入目标目录中的 `.picverter-*.part` 临时文件，完整写入并 `fsync` 后再原子重命名到最终路径。
//! 任一步失败时临时文件随 `NamedTempFile` 的 `Drop` 删除，
//! 因此磁盘上永远不会出现半截或空的输出文件。
//!
//! 重命名前必须通过 `CancelToken::try_commit`：已超时的请求在此处放弃，临时文件随之删除。
//!
//! ## 命名规则
//!
//! - 本地文件输入：`<输入目录>/<文件名主干>_processed.<格式>`
//! - Base64 输入：`<输出目录>/picverter_<随机串>_processed.<格式>`，不覆盖已有文件

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use super::{CancelToken, ImageError, OutputFormat};

const UPLOAD_PREFIX: &str = "picverter_";
const PROCESSED_SUFFIX: &str = "_processed";
const TEMP_PREFIX: &str = ".picverter-";
const TEMP_SUFFIX: &str = ".part";
/// 唯一文件名冲突时的重试次数。
const MAX_NAME_ATTEMPTS: u32 = 16;

/// 根据输入路径推导输出路径。
///
/// # 示例
/// ```rust
/// use std::path::Path;
/// use picverter::image_handler::{output::processed_path_for, OutputFormat};
///
/// let out = processed_path_for(Path::new("/photos/cat.PNG"), OutputFormat::Jpeg);
/// assert_eq!(out, Path::new("/photos/cat_processed.jpeg"));
/// ```
pub fn processed_path_for(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());

    let file_name = format!("{}{}.{}", stem, PROCESSED_SUFFIX, format.as_str());
    match input.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// 原子写入到指定路径，已存在的同名文件被替换。
///
/// 请求已取消时返回 `Timeout`，目标路径保持原状。
pub fn persist_to(path: &Path, bytes: &[u8], token: &CancelToken) -> Result<PathBuf, ImageError> {
    let temp = write_temp(parent_dir(path), bytes)?;
    commit(token)?;

    temp.persist(path).map_err(|e| {
        ImageError::IoFailure(format!("无法写入输出文件 '{}'：{}", path.display(), e.error))
    })?;

    Ok(path.to_path_buf())
}

/// 在目录下生成唯一文件名并写入。
pub fn persist_unique_in(
    dir: &Path,
    format: OutputFormat,
    bytes: &[u8],
    token: &CancelToken,
) -> Result<PathBuf, ImageError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ImageError::IoFailure(format!("无法创建输出目录 '{}'：{}", dir.display(), e))
    })?;

    let mut temp = write_temp(dir, bytes)?;
    commit(token)?;

    // 复用临时文件的随机串，冲突时追加序号
    let random = random_part(temp.path());
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = match attempt {
            0 => format!("{}{}{}.{}", UPLOAD_PREFIX, random, PROCESSED_SUFFIX, format.as_str()),
            n => format!(
                "{}{}-{}{}.{}",
                UPLOAD_PREFIX,
                random,
                n,
                PROCESSED_SUFFIX,
                format.as_str()
            ),
        };
        let path = dir.join(name);

        match temp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => temp = e.file,
            Err(e) => {
                return Err(ImageError::IoFailure(format!(
                    "无法写入输出文件 '{}'：{}",
                    path.display(),
                    e.error
                )));
            }
        }
    }

    Err(ImageError::IoFailure(format!(
        "无法在 '{}' 生成唯一输出文件名",
        dir.display()
    )))
}

fn commit(token: &CancelToken) -> Result<(), ImageError> {
    if token.try_commit() {
        Ok(())
    } else {
        Err(ImageError::Timeout("请求已超时，放弃写出结果".to_string()))
    }
}

fn write_temp(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile, ImageError> {
    let mut temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| {
            ImageError::IoFailure(format!("无法在 '{}' 创建输出文件：{}", dir.display(), e))
        })?;

    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| ImageError::IoFailure(format!("写入输出文件失败：{}", e)))?;

    Ok(temp)
}

fn random_part(temp_path: &Path) -> String {
    temp_path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix(TEMP_PREFIX))
        .and_then(|n| n.strip_suffix(TEMP_SUFFIX))
        .filter(|n| !n.is_empty())
        .unwrap_or("upload")
        .to_string()
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
