use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU32, Ordering::Relaxed};

/// 诱导排序中的空槽标记。
const EMPTY: u32 = u32::MAX;

/// 诱导排序的流水线块大小。
const BLOCK: usize = 1 << 16;

/// 后缀排序策略接口。
///
/// 输入为编码文本（字母编码必须落在 [1, sigma)，0 预留给哨兵），
/// 输出长度为 n+1 的后缀数组，`sa[0] == n` 恒为虚拟空后缀。
///
/// `sort_len` 限制后缀比较的最大长度：排序代价与顺序完整性的权衡。
/// 超出该长度的并列后缀按原始位置稳定排序，因此只保证前 `sort_len`
/// 个符号以内的字典序；对种子长度不超过该界的精确匹配调用方无影响。
pub trait SaBuilder {
    fn build_sa(&self, text: &[u8], sigma: u8) -> Vec<u32>;
}

/// 朴素策略：对全部后缀做并行稳定排序。小输入与测试基准用。
#[derive(Debug, Clone, Copy)]
pub struct StableBuilder {
    pub sort_len: usize,
}

impl Default for StableBuilder {
    fn default() -> Self {
        Self { sort_len: usize::MAX }
    }
}

impl SaBuilder for StableBuilder {
    fn build_sa(&self, text: &[u8], sigma: u8) -> Vec<u32> {
        validate_codes(text, sigma);
        let n = text.len() as u32;
        let mut sa: Vec<u32> = (0..=n).collect();
        sa.par_sort_by(|&i, &j| suffix_cmp(text, i, j, self.sort_len));
        sa
    }
}

/// 并行 SA-IS 族策略：类型划分 -> LMS 提取 -> 有界并行 LMS 排序 ->
/// 桶表 -> 两趟诱导排序。大基因组输入的主力实现。
#[derive(Debug, Clone, Copy)]
pub struct PsaisBuilder {
    pub sort_len: usize,
}

impl Default for PsaisBuilder {
    fn default() -> Self {
        Self { sort_len: 256 }
    }
}

impl SaBuilder for PsaisBuilder {
    fn build_sa(&self, text: &[u8], sigma: u8) -> Vec<u32> {
        validate_codes(text, sigma);
        let n = text.len();
        if n == 0 {
            return vec![0];
        }

        // 1. S/L 类型划分（并行分块）
        let types = classify_types(text);

        // 2. LMS 位置提取
        let mut lms = collect_lms(&types);

        // 3. LMS 排序：有界后缀比较，运行时间主要花在这里
        lms.par_sort_by(|&i, &j| suffix_cmp(text, i, j, self.sort_len));

        // 4. 桶表（行 0 预留给空后缀，所有桶整体偏移 1）
        let heads = bucket_heads(text, sigma);
        let tails = bucket_tails(text, sigma);

        // 5. 诱导排序：LMS 落桶尾，L 趟正向、S 趟反向，趟间全同步
        let sa: Vec<AtomicU32> = (0..=n).map(|_| AtomicU32::new(EMPTY)).collect();
        sa[0].store(n as u32, Relaxed);

        let mut tail = tails.clone();
        for &p in lms.iter().rev() {
            let c = text[p as usize] as usize;
            tail[c] -= 1;
            sa[tail[c] as usize].store(p, Relaxed);
        }

        induce_l_pass(text, &types, &heads, &sa);

        // L 趟结束后清掉 S 型槽位（含 LMS），由 S 趟重新归位
        (1..sa.len()).into_par_iter().for_each(|i| {
            let v = sa[i].load(Relaxed);
            if v != EMPTY && (v as usize) < n && types[v as usize] {
                sa[i].store(EMPTY, Relaxed);
            }
        });

        induce_s_pass(text, &types, &tails, &sa);

        sa.into_iter().map(AtomicU32::into_inner).collect()
    }
}

/// 策略选择（构造期决定，tagged variant）。
#[derive(Debug, Clone, Copy)]
pub enum SaStrategy {
    Psais(PsaisBuilder),
    Stable(StableBuilder),
}

impl SaBuilder for SaStrategy {
    fn build_sa(&self, text: &[u8], sigma: u8) -> Vec<u32> {
        match self {
            Self::Psais(b) => b.build_sa(text, sigma),
            Self::Stable(b) => b.build_sa(text, sigma),
        }
    }
}

/// 有界后缀比较；空后缀（i == n）天然最小。
#[inline]
fn suffix_cmp(text: &[u8], i: u32, j: u32, sort_len: usize) -> Ordering {
    let a = &text[i as usize..];
    let b = &text[j as usize..];
    let a = &a[..a.len().min(sort_len)];
    let b = &b[..b.len().min(sort_len)];
    a.cmp(b)
}

/// 字母编码越界是编程错误：静默截断会破坏桶边界，必须立即失败。
fn validate_codes(text: &[u8], sigma: u8) {
    assert!(sigma >= 2, "alphabet must have at least one symbol besides the sentinel");
    if let Some(pos) = text.iter().position(|&c| c == 0 || c >= sigma) {
        panic!(
            "alphabet code {} at position {} out of range 1..{}",
            text[pos], pos, sigma
        );
    }
}

/// S/L 类型划分。true = S 型（后缀小于右邻后缀）。
///
/// 分块并行：块内自右向左递推；块末位置的类型跨越块边界，
/// 沿相同符号的 run 向前扫描直接判定（run 结束处的比较决定整段类型）。
fn classify_types(text: &[u8]) -> Vec<bool> {
    let n = text.len();
    let mut types = vec![false; n];
    let nt = rayon::current_num_threads();
    let chunk = ((n + nt - 1) / nt).max(1);
    types
        .par_chunks_mut(chunk)
        .enumerate()
        .for_each(|(bi, tblock)| {
            let base = bi * chunk;
            let last = tblock.len() - 1;
            let mut next_type = boundary_type(text, base + last);
            tblock[last] = next_type;
            for i in (0..last).rev() {
                let x = base + i;
                let t = if text[x] == text[x + 1] {
                    next_type
                } else {
                    text[x] < text[x + 1]
                };
                tblock[i] = t;
                next_type = t;
            }
        });
    types
}

/// 位置 i 的类型：跳过等符号 run 后由第一个不等比较决定；
/// 文本末位恒为 L（空后缀更小）。
fn boundary_type(text: &[u8], i: usize) -> bool {
    let n = text.len();
    let mut j = i;
    while j + 1 < n && text[j + 1] == text[j] {
        j += 1;
    }
    j + 1 < n && text[j] < text[j + 1]
}

/// LMS 位置：S 型且左邻为 L 型。
fn collect_lms(types: &[bool]) -> Vec<u32> {
    (1..types.len())
        .into_par_iter()
        .filter(|&i| types[i] && !types[i - 1])
        .map(|i| i as u32)
        .collect()
}

fn histogram(text: &[u8], sigma: u8) -> Vec<u32> {
    let mut hist = vec![0u32; sigma as usize];
    for &c in text {
        hist[c as usize] += 1;
    }
    hist
}

/// 桶起始行（含行 0 的哨兵偏移）。
fn bucket_heads(text: &[u8], sigma: u8) -> Vec<u32> {
    let hist = histogram(text, sigma);
    let mut heads = vec![0u32; sigma as usize];
    let mut acc = 1u32;
    for c in 0..sigma as usize {
        heads[c] = acc;
        acc += hist[c];
    }
    heads
}

/// 桶结束行（exclusive）。
fn bucket_tails(text: &[u8], sigma: u8) -> Vec<u32> {
    let hist = histogram(text, sigma);
    let mut tails = vec![0u32; sigma as usize];
    let mut acc = 1u32;
    for c in 0..sigma as usize {
        acc += hist[c];
        tails[c] = acc;
    }
    tails
}

/// 预取块：提前读出 `sa[lo..lo+BLOCK)` 各槽位被诱导候选的 (符号, 类型)。
/// 槽位当时为空则留 None，诱导时回退为直接读取。
fn prepare_block(
    text: &[u8],
    types: &[bool],
    sa: &[AtomicU32],
    lo: usize,
    buf: &mut Vec<Option<(u8, bool)>>,
) {
    buf.clear();
    if lo >= sa.len() {
        return;
    }
    let hi = (lo + BLOCK).min(sa.len());
    buf.resize(hi - lo, None);
    buf.par_iter_mut().enumerate().for_each(|(k, slot)| {
        let v = sa[lo + k].load(Relaxed);
        if v != EMPTY && v != 0 {
            let p = (v - 1) as usize;
            *slot = Some((text[p], types[p]));
        }
    });
}

/// L 趟：正向扫描，把每个已归位后缀左邻的 L 型后缀推进桶头。
/// 块内诱导与下一块的预取并行（SA 槽为原子单元，陈旧预取回退直读）。
fn induce_l_pass(text: &[u8], types: &[bool], heads: &[u32], sa: &[AtomicU32]) {
    let n1 = sa.len();
    let mut heads = heads.to_vec();
    let mut cur = Vec::new();
    let mut nxt = Vec::new();
    prepare_block(text, types, sa, 0, &mut cur);

    let mut lo = 0usize;
    while lo < n1 {
        let hi = (lo + BLOCK).min(n1);
        rayon::join(
            || {
                for i in lo..hi {
                    let v = sa[i].load(Relaxed);
                    if v == EMPTY || v == 0 {
                        continue;
                    }
                    let p = (v - 1) as usize;
                    let (c, is_s) = cur[i - lo].unwrap_or((text[p], types[p]));
                    if is_s {
                        continue;
                    }
                    let dst = heads[c as usize];
                    heads[c as usize] += 1;
                    sa[dst as usize].store(v - 1, Relaxed);
                }
            },
            || prepare_block(text, types, sa, hi, &mut nxt),
        );
        std::mem::swap(&mut cur, &mut nxt);
        lo = hi;
    }
}

/// S 趟：反向扫描，把 S 型后缀从桶尾向前归位。结构与 L 趟对称。
fn induce_s_pass(text: &[u8], types: &[bool], tails: &[u32], sa: &[AtomicU32]) {
    let n1 = sa.len();
    let mut tails = tails.to_vec();
    let mut cur = Vec::new();
    let mut nxt = Vec::new();

    let last_lo = (n1 - 1) / BLOCK * BLOCK;
    prepare_block(text, types, sa, last_lo, &mut cur);

    let mut lo = last_lo;
    loop {
        let hi = (lo + BLOCK).min(n1);
        let next_lo = lo.checked_sub(BLOCK);
        rayon::join(
            || {
                for i in (lo..hi).rev() {
                    let v = sa[i].load(Relaxed);
                    if v == EMPTY || v == 0 {
                        continue;
                    }
                    let p = (v - 1) as usize;
                    let (c, is_s) = cur[i - lo].unwrap_or((text[p], types[p]));
                    if !is_s {
                        continue;
                    }
                    tails[c as usize] -= 1;
                    sa[tails[c as usize] as usize].store(v - 1, Relaxed);
                }
            },
            || {
                if let Some(nl) = next_lo {
                    prepare_block(text, types, sa, nl, &mut nxt);
                } else {
                    nxt.clear();
                }
            },
        );
        std::mem::swap(&mut cur, &mut nxt);
        match next_lo {
            Some(nl) => lo = nl,
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_sa(text: &[u8]) -> Vec<u32> {
        let n = text.len() as u32;
        let mut sa: Vec<u32> = (0..=n).collect();
        sa.sort_by(|&i, &j| text[i as usize..].cmp(&text[j as usize..]));
        sa
    }

    fn make_text(len: usize) -> Vec<u8> {
        let mut x: u32 = 1_234_567;
        let mut v = Vec::with_capacity(len);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            v.push((x % 4) as u8 + 1);
        }
        v
    }

    #[test]
    fn sa_basic() {
        // 文本：A C G T -> 1 2 3 4，空后缀排最前
        let text = [1u8, 2, 3, 4];
        for builder in [
            SaStrategy::Psais(PsaisBuilder { sort_len: usize::MAX }),
            SaStrategy::Stable(StableBuilder::default()),
        ] {
            assert_eq!(builder.build_sa(&text, 5), vec![4, 0, 1, 2, 3]);
        }
    }

    #[test]
    fn sa_empty_text() {
        let builder = PsaisBuilder::default();
        assert_eq!(builder.build_sa(&[], 5), vec![0]);
    }

    #[test]
    fn sa_single_symbol_runs() {
        // 全等符号文本：后缀越短越小
        let text = [3u8; 9];
        let sa = PsaisBuilder { sort_len: usize::MAX }.build_sa(&text, 5);
        assert_eq!(sa, (0..=9).rev().collect::<Vec<u32>>());
    }

    #[test]
    fn psais_matches_naive_on_small_random_texts() {
        for len in 1..=40 {
            let text = make_text(len);
            let fast = PsaisBuilder { sort_len: usize::MAX }.build_sa(&text, 5);
            assert_eq!(fast, naive_sa(&text), "mismatch on len={len}");
        }
    }

    #[test]
    fn stable_matches_naive_on_small_random_texts() {
        for len in 1..=40 {
            let text = make_text(len);
            let fast = StableBuilder::default().build_sa(&text, 5);
            assert_eq!(fast, naive_sa(&text), "mismatch on len={len}");
        }
    }

    #[test]
    fn builders_agree_on_larger_text() {
        let text = make_text(2000);
        let a = PsaisBuilder { sort_len: usize::MAX }.build_sa(&text, 5);
        let b = StableBuilder::default().build_sa(&text, 5);
        assert_eq!(a, b);
        // 置换性质：覆盖 {0..n} 恰好一次
        let mut seen = vec![false; text.len() + 1];
        for &p in &a {
            assert!(!seen[p as usize]);
            seen[p as usize] = true;
        }
    }

    #[test]
    fn psais_handles_repetitive_tail_run() {
        // 末尾 8xG 的 run（种子查询场景里最常见的退化输入）
        let mut text = make_text(64);
        text.extend(std::iter::repeat(3u8).take(8));
        let fast = PsaisBuilder { sort_len: usize::MAX }.build_sa(&text, 5);
        assert_eq!(fast, naive_sa(&text));
    }

    #[test]
    fn bounded_sort_len_orders_prefixes() {
        let text = make_text(300);
        let bound = 4usize;
        let sa = PsaisBuilder { sort_len: bound }.build_sa(&text, 5);
        // 有界排序只保证前 bound 个符号内的字典序
        for w in sa.windows(2) {
            let a = &text[w[0] as usize..];
            let b = &text[w[1] as usize..];
            let a = &a[..a.len().min(bound)];
            let b = &b[..b.len().min(bound)];
            assert!(a <= b);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_code_fails_fast() {
        let text = [1u8, 2, 7, 4];
        PsaisBuilder::default().build_sa(&text, 5);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn sentinel_code_in_text_fails_fast() {
        let text = [1u8, 0, 2];
        StableBuilder::default().build_sa(&text, 5);
    }
}
