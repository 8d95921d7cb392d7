//! Text formats for recommendation artifacts.
//!
//! | Format | Line                                                  |
//! |--------|-------------------------------------------------------|
//! | simple | `user \t item \t score`                               |
//! | trec   | `user \t Q0 \t item \t rank \t score \t rankbench`    |
//!
//! Lines of one user are consecutive; readers group on that.

use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

use crate::recommend::Recommendation;

const TREC_RUN_TAG: &str = "rankbench";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationFormat {
    Simple,
    Trec,
}

impl FromStr for RecommendationFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(Self::Simple),
            "trec" => Ok(Self::Trec),
            other => Err(anyhow!("Unknown recommendation format: {other}")),
        }
    }
}

impl fmt::Display for RecommendationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simple => "simple",
            Self::Trec => "trec",
        })
    }
}

impl RecommendationFormat {
    /// Write one user's list. Empty lists write nothing.
    pub fn write<W: Write>(&self, out: &mut W, rec: &Recommendation) -> std::io::Result<()> {
        for (rank, (item, score)) in rec.items.iter().enumerate() {
            match self {
                Self::Simple => writeln!(out, "{}\t{}\t{:?}", rec.user, item, score)?,
                Self::Trec => writeln!(
                    out,
                    "{}\tQ0\t{}\t{}\t{:?}\t{}",
                    rec.user,
                    item,
                    rank + 1,
                    score,
                    TREC_RUN_TAG
                )?,
            }
        }
        Ok(())
    }

    /// Read every list back, in file order.
    pub fn read_all<R: BufRead>(&self, input: R) -> Result<Vec<Recommendation>> {
        let mut out: Vec<Recommendation> = Vec::new();
        for (n, line) in input.lines().enumerate() {
            let line = line.context("Failed to read recommendation line")?;
            if line.trim().is_empty() {
                continue;
            }
            let (user, item, score) = self
                .parse_line(&line)
                .with_context(|| format!("Malformed {self} line {}: {line:?}", n + 1))?;

            match out.last_mut() {
                Some(last) if last.user == user => last.items.push((item, score)),
                _ => out.push(Recommendation {
                    user,
                    items: vec![(item, score)],
                }),
            }
        }
        Ok(out)
    }

    fn parse_line(&self, line: &str) -> Result<(String, String, f64)> {
        let fields: Vec<&str> = line.split('\t').collect();
        let (user, item, score) = match (self, fields.as_slice()) {
            (Self::Simple, [user, item, score]) => (user, item, score),
            (Self::Trec, [user, _, item, _, score, ..]) => (user, item, score),
            _ => bail!("unexpected field count {}", fields.len()),
        };
        let score = score.trim().parse::<f64>().context("score is not a number")?;
        Ok((user.to_string(), item.to_string(), score))
    }
}
