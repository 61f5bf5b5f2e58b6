use anyhow::{bail, Result};
use std::io::BufRead;

#[derive(Debug, Clone)]
pub struct FastqRecord {
    pub id: String,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

/// 4 行一组的 FASTQ reader（不支持折行序列）。
pub struct FastqReader<R: BufRead> {
    reader: R,
    line: String,
    record_no: usize,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            record_no: 0,
        }
    }

    fn fill_line(&mut self) -> Result<bool> {
        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            return Ok(false);
        }
        while self.line.ends_with('\n') || self.line.ends_with('\r') {
            self.line.pop();
        }
        Ok(true)
    }

    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        if !self.fill_line()? {
            return Ok(None);
        }
        self.record_no += 1;

        let Some(header) = self.line.strip_prefix('@') else {
            bail!("record {}: FASTQ header must start with '@'", self.record_no);
        };
        let id = header
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();

        if !self.fill_line()? {
            bail!("record {}: unexpected EOF after header", self.record_no);
        }
        let seq = self.line.as_bytes().to_vec();

        if !self.fill_line()? || !self.line.starts_with('+') {
            bail!("record {}: missing '+' separator line", self.record_no);
        }

        if !self.fill_line()? {
            bail!("record {}: missing quality line", self.record_no);
        }
        let qual = self.line.as_bytes().to_vec();
        if qual.len() != seq.len() {
            bail!(
                "record {}: quality length {} does not match sequence length {}",
                self.record_no,
                qual.len(),
                seq.len()
            );
        }

        Ok(Some(FastqRecord { id, seq, qual }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_two_records() {
        let data = b"@r1 extra\nACGT\n+\nIIII\n@r2\nTT\n+r2\nII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "r1");
        assert_eq!(r1.seq, b"ACGT");
        assert_eq!(r1.qual, b"IIII");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "r2");
        assert_eq!(r2.seq, b"TT");

        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn qual_length_mismatch_is_an_error() {
        let data = b"@r1\nACGT\n+\nII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        assert!(r.next_record().is_err());
    }

    #[test]
    fn missing_plus_line_is_an_error() {
        let data = b"@r1\nACGT\nIIII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        assert!(r.next_record().is_err());
    }
}
