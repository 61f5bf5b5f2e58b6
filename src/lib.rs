//! # fmseed-rust
//!
//! 面向短读精确匹配种子查询的基因组坐标 FM 索引。
//!
//! 本 crate 提供从多染色体参考序列构建压缩全文索引的完整链路：
//!
//! - **后缀数组构建**：并行 SA-IS 族实现（类型划分 + 有界 LMS 排序 +
//!   诱导排序），另有稳定排序参考实现，构造期可插拔选择
//! - **FM 索引核心**：BWT、累计计数表、occ 检查点、采样后缀数组、
//!   定长前缀种子查找表；反向搜索 + locate
//! - **基因组坐标层**：多染色体无分隔拼接、染色体边界翻译、
//!   跨染色体命中过滤、整体持久化（带版本与流完整性校验）
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use fmseed_rust::index::genome::{GenomeIndex, IndexOpts};
//! use fmseed_rust::util::dna;
//!
//! // 构建索引
//! let idx = GenomeIndex::make_index(
//!     [("chr1", "CGATCGATCGATGCATCGATAGGGGGGGG")],
//!     &IndexOpts::default(),
//! )
//! .unwrap();
//!
//! // 精确匹配查询：染色体坐标区间（半开 0-based）
//! for hit in idx.find_intervals(&dna::encode_seq(b"GGGGGGGG")) {
//!     println!("{}\t{}\t{}", hit.chrom, hit.begin, hit.end);
//! }
//!
//! // 持久化与加载互为逆操作
//! idx.save("ref.fm").unwrap();
//! let reloaded = GenomeIndex::load("ref.fm").unwrap();
//! assert_eq!(reloaded.get_chr_size("chr1").unwrap(), 29);
//! ```
//!
//! ## 模块说明
//!
//! - [`io`] — FASTA / FASTQ 文件解析（CLI 粘合层）
//! - [`index`] — 后缀数组、BWT、FM 核心与基因组坐标索引
//! - [`util`] — DNA 编码 / 解码 / 反向互补
//! - [`error`] — 调用方需要区分处理的索引错误

pub mod error;
pub mod index;
pub mod io;
pub mod util;
