//! Fragment Descriptor - 分片序列解析
//!
//! 形如 `<prefix-tokens>-<num>.<ext>` 的分片路径，例如 `/seg-3.ts`：
//! - prefix: `/seg-`
//! - num: `3`
//! - suffix: `.ts`
//!
//! 不符合该形状的路径（如 `index.m3u8`）不是顺序分片，解析结果为 `None`。

use std::fmt;

/// 顺序分片描述
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fragment {
    prefix: String,
    num: u64,
    suffix: String,
}

impl Fragment {
    /// 解析分片路径
    pub fn parse(path: &str) -> Option<Self> {
        let (stem, ext) = path.rsplit_once('.')?;
        let (head, last) = stem.rsplit_once('-')?;
        let num = last.parse::<u64>().ok()?;

        Some(Self {
            prefix: format!("{}-", head),
            num,
            suffix: format!(".{}", ext),
        })
    }

    /// 序号偏移 `offset` 后的分片（prefix / suffix 不变）
    ///
    /// 序号溢出时返回 `None`
    pub fn inc(&self, offset: u64) -> Option<Self> {
        Some(Self {
            prefix: self.prefix.clone(),
            num: self.num.checked_add(offset)?,
            suffix: self.suffix.clone(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, self.num, self.suffix)
    }
}
