use anyhow::{bail, Result};
use std::io::BufRead;

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

/// 逐条拉取的 FASTA reader：容忍 CRLF、折行序列与行内空白，
/// 序列统一转大写。
pub struct FastaReader<R: BufRead> {
    reader: R,
    line: String,
    line_no: usize,
    pending_header: Option<String>,
    eof: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            pending_header: None,
            eof: false,
        }
    }

    /// 读下一行（去掉行尾换行），EOF 返回 false。
    fn fill_line(&mut self) -> Result<bool> {
        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            self.eof = true;
            return Ok(false);
        }
        self.line_no += 1;
        while self.line.ends_with('\n') || self.line.ends_with('\r') {
            self.line.pop();
        }
        Ok(true)
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.eof && self.pending_header.is_none() {
            return Ok(None);
        }

        let header = match self.pending_header.take() {
            Some(h) => h,
            None => loop {
                if !self.fill_line()? {
                    return Ok(None);
                }
                if let Some(h) = self.line.strip_prefix('>') {
                    break h.trim().to_string();
                }
                if !self.line.trim().is_empty() {
                    bail!("line {}: sequence data before any FASTA header", self.line_no);
                }
            },
        };

        let (id, desc) = split_header(&header);
        if id.is_empty() {
            bail!("line {}: FASTA header has no sequence name", self.line_no);
        }

        let mut seq: Vec<u8> = Vec::new();
        while self.fill_line()? {
            if let Some(h) = self.line.strip_prefix('>') {
                self.pending_header = Some(h.trim().to_string());
                break;
            }
            seq.extend(
                self.line
                    .bytes()
                    .filter(|b| !b.is_ascii_whitespace())
                    .map(|b| b.to_ascii_uppercase()),
            );
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }

    /// 读完整个文件。
    pub fn read_all(&mut self) -> Result<Vec<FastaRecord>> {
        let mut records = Vec::new();
        while let Some(rec) = self.next_record()? {
            records.push(rec);
        }
        Ok(records)
    }
}

fn split_header(header: &str) -> (String, Option<String>) {
    let mut parts = header.splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or("").to_string();
    let desc = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    (id, desc)
}
