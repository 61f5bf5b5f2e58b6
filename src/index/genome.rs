use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::time::Instant;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::index::fm::FmIndex;
use crate::index::sa::{PsaisBuilder, SaBuilder, SaStrategy};
use crate::util::dna::{self, SIGMA};

/// 持久化格式版本；加载时不匹配视为索引损坏。
pub const FORMAT_VERSION: u32 = 2;

/// 染色体在扁平坐标系中的累计终点（exclusive），严格递增，
/// 把整个坐标空间切成连续不重叠的分段。make_index 一次建成，之后只读。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChromBound {
    pub chrom: String,
    pub end: u32,
}

/// 构建溯源信息（写入索引文件，便于排查线上索引的来历）。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexMeta {
    pub reference_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 染色体坐标命中区间，半开 0-based，保证不跨染色体。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChromInterval {
    pub chrom: String,
    pub begin: u32,
    pub end: u32,
}

/// 索引构建旋钮。
#[derive(Debug, Clone, Copy)]
pub struct IndexOpts {
    /// occ 检查点与 SA 采样步长
    pub sa_intv: u32,
    /// 种子查找表前缀长度（0 = 关闭）
    pub lookup_len: u32,
    /// 后缀排序策略（含 sort_len 比较长度界）
    pub strategy: SaStrategy,
}

impl Default for IndexOpts {
    fn default() -> Self {
        Self {
            sa_intv: 8,
            lookup_len: 8,
            strategy: SaStrategy::Psais(PsaisBuilder::default()),
        }
    }
}

/// 基因组坐标 FM 索引：所有染色体按输入顺序无分隔拼接成单一编码文本，
/// FM 行区间经 locate 还原为扁平偏移后，再经 ChromBound 翻译回
/// 每染色体坐标。整个结构是一个原子构件：一次构建、整体持久化、
/// 加载后只读共享。
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenomeIndex {
    version: u32,
    pub meta: IndexMeta,
    pub fm: FmIndex,
    pub bounds: Vec<ChromBound>,
}

impl GenomeIndex {
    /// 拼接全部命名序列并建索引。
    /// 字母表是封闭的：简并符号在编码时确定性折叠（见 util::dna）。
    /// 空输入与空序列属配置错误，立即失败。
    pub fn make_index<N, S>(
        records: impl IntoIterator<Item = (N, S)>,
        opts: &IndexOpts,
    ) -> Result<Self>
    where
        N: Into<String>,
        S: AsRef<[u8]>,
    {
        let mut text: Vec<u8> = Vec::new();
        let mut bounds: Vec<ChromBound> = Vec::new();
        for (name, seq) in records {
            let name = name.into();
            let seq = seq.as_ref();
            if seq.is_empty() {
                anyhow::bail!("sequence '{}' is empty", name);
            }
            text.reserve(seq.len());
            for &b in seq {
                text.push(dna::to_code(b));
            }
            bounds.push(ChromBound {
                chrom: name,
                end: text.len() as u32,
            });
        }
        if bounds.is_empty() {
            anyhow::bail!("reference contains no sequences");
        }

        let t0 = Instant::now();
        let sa = opts.strategy.build_sa(&text, SIGMA as u8);
        log::info!(
            "suffix array built: {} rows, {} sequences, {:.2?}",
            sa.len(),
            bounds.len(),
            t0.elapsed()
        );

        let t1 = Instant::now();
        let fm = FmIndex::build(&text, &sa, opts.sa_intv, opts.lookup_len);
        log::info!("fm tables built in {:.2?}", t1.elapsed());

        Ok(Self {
            version: FORMAT_VERSION,
            meta: IndexMeta::default(),
            fm,
            bounds,
        })
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    /// 按名称查染色体长度；未知名称返回可区分的 ChromNotFound。
    pub fn get_chr_size(&self, chrom: &str) -> Result<u32, IndexError> {
        let idx = self
            .bounds
            .iter()
            .position(|b| b.chrom == chrom)
            .ok_or_else(|| IndexError::ChromNotFound(chrom.to_string()))?;
        let begin = if idx == 0 { 0 } else { self.bounds[idx - 1].end };
        Ok(self.bounds[idx].end - begin)
    }

    /// 把 FM 行区间 [begin, end) 还原成染色体坐标命中。
    /// 起点与含端终点分别二分定位分段：落在不同分段（生物学上不可能的
    /// 跨染色体匹配）或越过索引末尾的命中直接丢弃。
    pub fn get_intervals(&self, begin: u32, end: u32, match_len: u32) -> Vec<ChromInterval> {
        assert!(match_len >= 1, "match length must be positive");
        let mut intvs = Vec::with_capacity((end - begin) as usize);
        for row in begin..end {
            let pos = self.fm.sa_at(row);
            let first = self.bounds.partition_point(|b| b.end <= pos);
            let last = self.bounds.partition_point(|b| b.end <= pos + match_len - 1);
            if first == self.bounds.len() || first != last {
                continue;
            }
            let seg_begin = if first == 0 { 0 } else { self.bounds[first - 1].end };
            let local = pos - seg_begin;
            intvs.push(ChromInterval {
                chrom: self.bounds[first].chrom.clone(),
                begin: local,
                end: local + match_len,
            });
        }
        intvs
    }

    /// 完整查询流：反向搜索 -> locate -> 坐标翻译。
    /// pat 为编码模式（util::dna::encode_seq 的输出）。
    pub fn find_intervals(&self, pat: &[u8]) -> Vec<ChromInterval> {
        match self.fm.backward_search(pat) {
            Some((l, r)) => self.get_intervals(l, r, pat.len() as u32),
            None => Vec::new(),
        }
    }

    /// 整体序列化到文件（FM 表 + 染色体边界 + 元信息，单一 bincode 流）。
    pub fn save(&self, path: &str) -> Result<()> {
        let mut f = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut f, self)?;
        Ok(())
    }

    /// 从文件加载并校验：流必须恰好被消费完、版本必须匹配，
    /// 否则索引不变量无法保证，按损坏处理。
    pub fn load(path: &str) -> Result<Self> {
        let f = File::open(path)?;
        let mut reader = BufReader::new(f);
        let idx: Self = bincode::deserialize_from(&mut reader)
            .map_err(|e| IndexError::CorruptIndex(e.to_string()))?;
        let mut probe = [0u8; 1];
        if reader.read(&mut probe)? != 0 {
            return Err(IndexError::CorruptIndex("trailing bytes after index stream".into()).into());
        }
        if idx.version != FORMAT_VERSION {
            return Err(IndexError::CorruptIndex(format!(
                "format version {} (expected {})",
                idx.version, FORMAT_VERSION
            ))
            .into());
        }
        log::info!(
            "index loaded: {} rows, {} sequences",
            idx.fm.rows(),
            idx.bounds.len()
        );
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::dna::encode_seq;
    use std::path::PathBuf;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fmseed-test-{}-{}", std::process::id(), tag))
    }

    fn build_two_chrom_index() -> GenomeIndex {
        GenomeIndex::make_index(
            [
                ("chr1", "CGATCGATCGATGCATCGATAGGGGGGGG"),
                ("chr2", "TTTTGGGGGGGGTTTT"),
            ],
            &IndexOpts::default(),
        )
        .unwrap()
    }

    #[test]
    fn poly_g_run_maps_to_expected_intervals() {
        let idx = build_two_chrom_index();
        let mut hits = idx.find_intervals(&encode_seq(b"GGGGGGGG"));
        hits.sort();
        assert_eq!(
            hits,
            vec![
                ChromInterval { chrom: "chr1".into(), begin: 21, end: 29 },
                ChromInterval { chrom: "chr2".into(), begin: 4, end: 12 },
            ]
        );
    }

    #[test]
    fn chr_sizes_are_exact() {
        let idx = build_two_chrom_index();
        assert_eq!(idx.get_chr_size("chr1").unwrap(), 29);
        assert_eq!(idx.get_chr_size("chr2").unwrap(), 16);
    }

    #[test]
    fn unknown_chromosome_is_reported_not_found() {
        let idx = build_two_chrom_index();
        match idx.get_chr_size("chrX") {
            Err(IndexError::ChromNotFound(name)) => assert_eq!(name, "chrX"),
            other => panic!("expected ChromNotFound, got {other:?}"),
        }
    }

    #[test]
    fn cross_chromosome_matches_are_discarded() {
        let idx = GenomeIndex::make_index(
            [("chr1", "AAAAC"), ("chr2", "GTTTT")],
            &IndexOpts::default(),
        )
        .unwrap();
        let pat = encode_seq(b"CG");
        // 拼接文本里确实存在 "CG"（跨越 chr1/chr2 边界）……
        assert!(idx.fm.backward_search(&pat).is_some());
        // ……但坐标翻译必须把它丢弃
        assert!(idx.find_intervals(&pat).is_empty());
        // 不跨界的匹配正常返回
        assert_eq!(
            idx.find_intervals(&encode_seq(b"AAC")),
            vec![ChromInterval { chrom: "chr1".into(), begin: 2, end: 5 }]
        );
    }

    #[test]
    fn intervals_never_cross_segment_bounds() {
        let idx = build_two_chrom_index();
        for pat in [&b"GAT"[..], b"TTT", b"GGG", b"ATG"] {
            for hit in idx.find_intervals(&encode_seq(pat)) {
                let size = idx.get_chr_size(&hit.chrom).unwrap();
                assert!(hit.end <= size, "{hit:?} escapes {size}");
            }
        }
    }

    #[test]
    fn empty_reference_is_rejected() {
        let empty: [(&str, &[u8]); 0] = [];
        assert!(GenomeIndex::make_index(empty, &IndexOpts::default()).is_err());
        assert!(
            GenomeIndex::make_index([("chr1", &b""[..])], &IndexOpts::default()).is_err()
        );
    }

    #[test]
    fn save_load_roundtrip_is_byte_identical() {
        let idx = build_two_chrom_index();
        let p1 = temp_path("roundtrip-1.fm");
        let p2 = temp_path("roundtrip-2.fm");
        idx.save(p1.to_str().unwrap()).unwrap();

        let loaded = GenomeIndex::load(p1.to_str().unwrap()).unwrap();
        assert_eq!(loaded, idx);
        // 查询结果与原索引一致
        assert_eq!(
            loaded.find_intervals(&encode_seq(b"GGGGGGGG")),
            idx.find_intervals(&encode_seq(b"GGGGGGGG"))
        );

        // 重新保存必须产生字节一致的流
        loaded.save(p2.to_str().unwrap()).unwrap();
        let b1 = std::fs::read(&p1).unwrap();
        let b2 = std::fs::read(&p2).unwrap();
        assert_eq!(b1, b2);

        std::fs::remove_file(&p1).ok();
        std::fs::remove_file(&p2).ok();
    }

    #[test]
    fn trailing_bytes_fail_load() {
        let idx = build_two_chrom_index();
        let p = temp_path("trailing.fm");
        idx.save(p.to_str().unwrap()).unwrap();
        let mut bytes = std::fs::read(&p).unwrap();
        bytes.push(0xAB);
        std::fs::write(&p, &bytes).unwrap();

        let err = GenomeIndex::load(p.to_str().unwrap()).unwrap_err();
        let err = err.downcast::<IndexError>().unwrap();
        assert!(matches!(err, IndexError::CorruptIndex(_)));
        std::fs::remove_file(&p).ok();
    }

    #[test]
    fn truncated_stream_fails_load() {
        let idx = build_two_chrom_index();
        let p = temp_path("truncated.fm");
        idx.save(p.to_str().unwrap()).unwrap();
        let bytes = std::fs::read(&p).unwrap();
        std::fs::write(&p, &bytes[..bytes.len() / 2]).unwrap();

        let err = GenomeIndex::load(p.to_str().unwrap()).unwrap_err();
        let err = err.downcast::<IndexError>().unwrap();
        assert!(matches!(err, IndexError::CorruptIndex(_)));
        std::fs::remove_file(&p).ok();
    }

    #[test]
    fn version_mismatch_fails_load() {
        let mut idx = build_two_chrom_index();
        idx.version = FORMAT_VERSION + 1;
        let p = temp_path("version.fm");
        idx.save(p.to_str().unwrap()).unwrap();

        let err = GenomeIndex::load(p.to_str().unwrap()).unwrap_err();
        let err = err.downcast::<IndexError>().unwrap();
        assert!(matches!(err, IndexError::CorruptIndex(_)));
        std::fs::remove_file(&p).ok();
    }

    #[test]
    fn ambiguous_bases_are_indexed_as_fixed_base() {
        // N 折叠为 A：索引里查 "AAA" 能命中 "ANA" 的位置
        let idx = GenomeIndex::make_index([("chr1", "GGANAGG")], &IndexOpts::default()).unwrap();
        assert_eq!(
            idx.find_intervals(&encode_seq(b"AAA")),
            vec![ChromInterval { chrom: "chr1".into(), begin: 2, end: 5 }]
        );
    }
}
