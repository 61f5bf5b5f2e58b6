use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;

mod error;
mod index;
mod io;
mod util;

use index::genome::{GenomeIndex, IndexMeta, IndexOpts};
use index::sa::{PsaisBuilder, SaStrategy, StableBuilder};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "fmseed-rust",
    author,
    version,
    about = "Genome-coordinate FM-index for exact-match read seeding",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BuilderKind {
    /// Parallel SA-IS family construction (default)
    Psais,
    /// Plain parallel stable sort (small inputs / debugging)
    Stable,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an FM index from a reference FASTA
    Index {
        /// Reference FASTA file
        reference: String,
        /// Output prefix for the index file
        #[arg(short, long, default_value = "ref")]
        output: String,
        /// Occurrence checkpoint / SA sampling stride
        #[arg(long = "sa-intv", default_value_t = 8)]
        sa_intv: u32,
        /// Seed lookup table prefix length (0 disables the table)
        #[arg(long = "lookup-len", default_value_t = 8)]
        lookup_len: u32,
        /// Suffix comparison bound for sorting (0 = unbounded)
        #[arg(long = "sort-len", default_value_t = 256)]
        sort_len: usize,
        /// Suffix array construction strategy
        #[arg(long, value_enum, default_value = "psais")]
        builder: BuilderKind,
    },
    /// Locate exact occurrences of a pattern in the index
    Locate {
        /// Path to FM index (.fm)
        #[arg(short = 'i', long = "index")]
        index: String,
        /// Pattern to search (ACGT; ambiguous bases collapse to A)
        pattern: String,
    },
    /// Seed FASTQ reads against the index (exact matches, both strands)
    Seed {
        /// Path to FM index (.fm)
        #[arg(short = 'i', long = "index")]
        index: String,
        /// Reads FASTQ file
        reads: String,
        /// Output TSV path (stdout if omitted)
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Print chromosome table and index parameters
    Stats {
        /// Path to FM index (.fm)
        #[arg(short = 'i', long = "index")]
        index: String,
        /// Report a single chromosome
        #[arg(long)]
        chrom: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Index {
            reference,
            output,
            sa_intv,
            lookup_len,
            sort_len,
            builder,
        } => run_index(&reference, &output, sa_intv, lookup_len, sort_len, builder),
        Commands::Locate { index, pattern } => run_locate(&index, &pattern),
        Commands::Seed { index, reads, out } => run_seed(&index, &reads, out.as_deref()),
        Commands::Stats { index, chrom } => run_stats(&index, chrom.as_deref()),
    }
}

fn run_index(
    reference: &str,
    output: &str,
    sa_intv: u32,
    lookup_len: u32,
    sort_len: usize,
    builder: BuilderKind,
) -> Result<()> {
    let fh = std::fs::File::open(reference)
        .map_err(|e| anyhow::anyhow!("cannot open reference FASTA '{}': {}", reference, e))?;
    let mut reader = io::fasta::FastaReader::new(std::io::BufReader::new(fh));
    let records = reader.read_all()?;
    if records.is_empty() {
        anyhow::bail!("FASTA file '{}' contains no sequences", reference);
    }

    let total_len: usize = records.iter().map(|r| r.seq.len()).sum();
    println!("reference: {}", reference);
    println!("sequences: {}", records.len());
    println!("total_len: {}", total_len);

    let sort_len = if sort_len == 0 { usize::MAX } else { sort_len };
    let strategy = match builder {
        BuilderKind::Psais => SaStrategy::Psais(PsaisBuilder { sort_len }),
        BuilderKind::Stable => SaStrategy::Stable(StableBuilder { sort_len }),
    };
    let opts = IndexOpts {
        sa_intv,
        lookup_len,
        strategy,
    };

    let mut idx = GenomeIndex::make_index(
        records.iter().map(|r| (r.id.as_str(), r.seq.as_slice())),
        &opts,
    )?;
    idx.set_meta(IndexMeta {
        reference_file: Some(reference.to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    });

    let out_path = format!("{}.fm", output);
    idx.save(&out_path)
        .map_err(|e| anyhow::anyhow!("cannot write index to '{}': {}", out_path, e))?;
    println!("FM index saved: {}", out_path);
    Ok(())
}

fn run_locate(index_path: &str, pattern: &str) -> Result<()> {
    let idx = GenomeIndex::load(index_path)?;
    let pat = util::dna::encode_seq(pattern.as_bytes());
    let hits = idx.find_intervals(&pat);
    for hit in &hits {
        println!("{}\t{}\t{}", hit.chrom, hit.begin, hit.end);
    }
    log::info!("pattern '{}': {} hit(s)", pattern, hits.len());
    Ok(())
}

fn run_seed(index_path: &str, reads_path: &str, out_path: Option<&str>) -> Result<()> {
    let idx = GenomeIndex::load(index_path)?;

    let fq = std::fs::File::open(reads_path)
        .map_err(|e| anyhow::anyhow!("cannot open reads FASTQ '{}': {}", reads_path, e))?;
    let mut reader = io::fastq::FastqReader::new(std::io::BufReader::new(fq));

    let mut out: Box<dyn Write> = match out_path {
        Some(p) => Box::new(std::io::BufWriter::new(std::fs::File::create(p)?)),
        None => Box::new(std::io::BufWriter::new(std::io::stdout())),
    };

    let mut n_reads = 0usize;
    let mut n_seeded = 0usize;
    while let Some(rec) = reader.next_record()? {
        n_reads += 1;
        let fwd = util::dna::encode_seq(&rec.seq);
        let rev = util::dna::encode_seq(&util::dna::revcomp(&rec.seq));

        let mut seeded = false;
        for (strand, pat) in [('+', &fwd), ('-', &rev)] {
            for hit in idx.find_intervals(pat) {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}",
                    rec.id, strand, hit.chrom, hit.begin, hit.end
                )?;
                seeded = true;
            }
        }
        if seeded {
            n_seeded += 1;
        }
    }
    out.flush()?;
    log::info!("seeded {}/{} reads", n_seeded, n_reads);
    Ok(())
}

fn run_stats(index_path: &str, chrom: Option<&str>) -> Result<()> {
    let idx = GenomeIndex::load(index_path)?;
    match chrom {
        Some(name) => {
            let size = idx.get_chr_size(name)?;
            println!("{}\t{}", name, size);
        }
        None => {
            println!("rows: {}", idx.fm.rows());
            println!("sa_intv: {}", idx.fm.sa_intv);
            println!("lookup_len: {}", idx.fm.lookup_len);
            if let Some(ts) = &idx.meta.build_timestamp {
                println!("built: {}", ts);
            }
            for bound in &idx.bounds {
                let size = idx.get_chr_size(&bound.chrom)?;
                println!("{}\t{}", bound.chrom, size);
            }
        }
    }
    Ok(())
}
