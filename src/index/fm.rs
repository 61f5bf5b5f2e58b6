use serde::{Deserialize, Serialize};

use crate::index::bwt::build_bwt;
use crate::util::dna::SIGMA;

/// FM 索引核心：
/// - 闭合字母表 [0, SIGMA)，0 为哨兵（只出现在 BWT 的 primary 行）。
/// - occ 检查点与采样 SA 共用同一个步长 `sa_intv`（空间/时间权衡旋钮）。
/// - `lookup` 预存全部定长前缀的行区间，短模式种子查询 O(1) 起步。
/// - build 一次成型，之后只读；查询不分配共享状态，可并发使用。
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FmIndex {
    /// occ 检查点与 SA 采样步长
    pub sa_intv: u32,
    /// 种子查找表前缀长度（0 = 关闭）
    pub lookup_len: u32,
    /// cnt[c] = BWT 中严格小于 c 的符号个数
    pub cnt: Vec<u32>,
    /// BWT 序列（长度 = 文本长度 + 1）
    pub bwt: Vec<u8>,
    /// SA 值为 0 的行；该行 BWT 单元是哨兵，LF 在此回绕
    pub primary: u32,
    /// occ 检查点（行优先展平）：occ[k * SIGMA + c] = bwt[0..k*sa_intv) 中 c 的个数
    pub occ: Vec<u32>,
    /// 采样 SA：ssa[k] = sa[k * sa_intv]
    pub ssa: Vec<u32>,
    /// 查找表区间下界 / 上界；begin == end 表示该前缀不存在
    pub lookup_begin: Vec<u32>,
    pub lookup_end: Vec<u32>,
}

impl FmIndex {
    /// 从编码文本与后缀数组构建全部表。`build` 是唯一构造途径，
    /// 不存在"未构建即查询"的状态。
    pub fn build(text: &[u8], sa: &[u32], sa_intv: u32, lookup_len: u32) -> Self {
        assert_eq!(sa.len(), text.len() + 1, "suffix array must cover the virtual empty suffix");
        assert!(sa_intv >= 1, "sampling stride must be positive");
        assert!(lookup_len <= 16, "lookup prefix longer than 16 bases does not fit the hash");

        let (bwt, primary) = build_bwt(text, sa);
        let n_rows = bwt.len();

        // C 表
        let mut hist = vec![0u32; SIGMA];
        for &c in &bwt {
            hist[c as usize] += 1;
        }
        let mut cnt = vec![0u32; SIGMA];
        let mut acc = 0u32;
        for c in 0..SIGMA {
            cnt[c] = acc;
            acc += hist[c];
        }

        // occ 检查点
        let intv = sa_intv as usize;
        let num_ckpt = n_rows / intv + 1;
        let mut occ = vec![0u32; num_ckpt * SIGMA];
        let mut running = vec![0u32; SIGMA];
        for k in 0..num_ckpt {
            occ[k * SIGMA..(k + 1) * SIGMA].copy_from_slice(&running);
            let start = k * intv;
            let end = ((k + 1) * intv).min(n_rows);
            for &c in &bwt[start..end] {
                running[c as usize] += 1;
            }
        }

        // 采样 SA
        let ssa: Vec<u32> = sa.iter().step_by(intv).copied().collect();

        // 种子查找表：行按字典序排列，同一前缀的行天然连续；
        // 行号从 1 起，0 可用作"未见"标记
        let ll = lookup_len as usize;
        let (mut lookup_begin, mut lookup_end) = if ll > 0 {
            let slots = 1usize << (2 * ll);
            (vec![0u32; slots], vec![0u32; slots])
        } else {
            (Vec::new(), Vec::new())
        };
        if ll > 0 {
            for (row, &p) in sa.iter().enumerate() {
                let p = p as usize;
                if p + ll <= text.len() {
                    let h = prefix_hash(&text[p..p + ll]);
                    if lookup_begin[h] == 0 {
                        lookup_begin[h] = row as u32;
                    }
                    lookup_end[h] = row as u32 + 1;
                }
            }
        }

        log::debug!(
            "fm-index built: rows={}, checkpoints={}, sampled_sa={}, lookup_slots={}",
            n_rows,
            num_ckpt,
            ssa.len(),
            lookup_begin.len()
        );

        Self {
            sa_intv,
            lookup_len,
            cnt,
            bwt,
            primary,
            occ,
            ssa,
            lookup_begin,
            lookup_end,
        }
    }

    /// 索引行数（文本长度 + 1）。
    #[inline]
    pub fn rows(&self) -> u32 {
        self.bwt.len() as u32
    }

    /// 被索引文本的长度。
    #[inline]
    pub fn text_len(&self) -> u32 {
        self.rows() - 1
    }

    /// rank(c, pos) = bwt[0..pos) 中 c 的出现次数。
    /// 最近检查点 + 不超过 sa_intv-1 个单元的顺扫补偿。
    #[inline]
    pub fn rank(&self, c: u8, pos: u32) -> u32 {
        let intv = self.sa_intv as usize;
        let pos = pos as usize;
        let k = pos / intv;
        let mut r = self.occ[k * SIGMA + c as usize];
        for &ch in &self.bwt[k * intv..pos] {
            if ch == c {
                r += 1;
            }
        }
        r
    }

    /// LF 映射：当前行的后缀去掉首符号后所在的行。
    /// primary 行（BWT 单元为哨兵）没有前驱，调用方必须先行检查。
    #[inline]
    pub fn lf(&self, row: u32) -> u32 {
        let c = self.bwt[row as usize];
        self.cnt[c as usize] + self.rank(c, row)
    }

    /// 反向搜索：返回与 pat 精确匹配的 SA 行区间 [begin, end)。
    /// pat 长度不小于 lookup_len 时由查找表直接跳过末尾 lookup_len 步；
    /// 区间一旦为空立即返回 None。运行时间只与模式长度相关。
    pub fn backward_search(&self, pat: &[u8]) -> Option<(u32, u32)> {
        if pat.is_empty() {
            return None;
        }
        let ll = self.lookup_len as usize;
        let (mut l, mut r, rest) = if ll > 0 && pat.len() >= ll {
            let h = prefix_hash(&pat[pat.len() - ll..]);
            (self.lookup_begin[h], self.lookup_end[h], pat.len() - ll)
        } else {
            (0, self.rows(), pat.len())
        };
        if l >= r {
            return None;
        }
        for &c in pat[..rest].iter().rev() {
            l = self.cnt[c as usize] + self.rank(c, l);
            r = self.cnt[c as usize] + self.rank(c, r);
            if l >= r {
                return None;
            }
        }
        Some((l, r))
    }

    /// 还原单行的 SA 值：沿 LF 走到采样行（或 primary 行），
    /// 步数即与采样值的距离。
    pub fn sa_at(&self, row: u32) -> u32 {
        let mut row = row;
        let mut steps = 0u32;
        loop {
            if row % self.sa_intv == 0 {
                return self.ssa[(row / self.sa_intv) as usize] + steps;
            }
            if row == self.primary {
                return steps;
            }
            row = self.lf(row);
            steps += 1;
        }
    }

    /// 还原区间内全部行的文本偏移。
    pub fn locate(&self, begin: u32, end: u32) -> Vec<u32> {
        (begin..end).map(|row| self.sa_at(row)).collect()
    }
}

/// 2-bit 前缀哈希，首符号在最高位：数值序与字典序一致。
#[inline]
pub fn prefix_hash(codes: &[u8]) -> usize {
    let mut h = 0usize;
    for &c in codes {
        h = (h << 2) | (c as usize - 1);
    }
    h
}
