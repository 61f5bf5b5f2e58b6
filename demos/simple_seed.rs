//! 演示如何在 library 模式下使用 fmseed-rust 构建索引并做精确匹配种子查询。
//!
//! 运行方式：
//! ```bash
//! cargo run --example simple_seed
//! ```

use fmseed_rust::index::genome::{GenomeIndex, IndexOpts};
use fmseed_rust::util::dna;

fn main() {
    // 1. 构建参考（两条染色体，各含一段 8xG 的 run）
    let chroms = [
        ("chr1", "CGATCGATCGATGCATCGATAGGGGGGGG"),
        ("chr2", "TTTTGGGGGGGGTTTTACGTACGTACGT"),
    ];
    for (name, seq) in &chroms {
        println!("{}: {} bp", name, seq.len());
    }

    // 2. 构建基因组坐标 FM 索引
    let idx = GenomeIndex::make_index(chroms, &IndexOpts::default()).unwrap();
    println!(
        "索引构建完成：rows={}, sa_intv={}, lookup_len={}",
        idx.fm.rows(),
        idx.fm.sa_intv,
        idx.fm.lookup_len
    );

    // 3. 精确匹配查询
    let pattern = b"GGGGGGGG";
    let hits = idx.find_intervals(&dna::encode_seq(pattern));
    println!(
        "\n精确匹配 '{}': 找到 {} 处",
        std::str::from_utf8(pattern).unwrap(),
        hits.len()
    );
    for hit in &hits {
        println!("  {}:[{}, {})", hit.chrom, hit.begin, hit.end);
    }

    // 4. 双链种子查询（read 取自 chr2 的反向互补）
    let read = dna::revcomp(b"TTTTACGT");
    for (strand, pat) in [('+', read.clone()), ('-', dna::revcomp(&read))] {
        for hit in idx.find_intervals(&dna::encode_seq(&pat)) {
            println!("  链{}: {}:[{}, {})", strand, hit.chrom, hit.begin, hit.end);
        }
    }

    // 5. 染色体尺寸查询（未知名称会得到可区分的 ChromNotFound）
    println!("\nchr1 大小: {}", idx.get_chr_size("chr1").unwrap());
    println!("chrX 查询: {:?}", idx.get_chr_size("chrX"));

    println!("\n完成！");
}
